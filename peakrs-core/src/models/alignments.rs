use rand::Rng;

use crate::errors::TrackError;
use crate::models::{FragmentTrack, ReadTrack};

///
/// Either kind of alignment track, so that pipelines can treat single-end
/// and paired-end input alike.
///
#[derive(Debug, Clone)]
pub enum Alignments {
    Single(ReadTrack),
    Paired(FragmentTrack),
}

impl Alignments {
    pub fn is_paired(&self) -> bool {
        matches!(self, Alignments::Paired(_))
    }

    pub fn finalize(&mut self) {
        match self {
            Alignments::Single(track) => track.finalize(),
            Alignments::Paired(track) => track.finalize(),
        }
    }

    pub fn total(&self) -> Result<u64, TrackError> {
        match self {
            Alignments::Single(track) => track.total(),
            Alignments::Paired(track) => track.total(),
        }
    }

    pub fn length(&self) -> Result<u64, TrackError> {
        match self {
            Alignments::Single(track) => track.length(),
            Alignments::Paired(track) => track.length(),
        }
    }

    pub fn chromosomes(&self) -> Vec<&str> {
        match self {
            Alignments::Single(track) => track.chromosomes(),
            Alignments::Paired(track) => track.chromosomes(),
        }
    }

    /// Chromosome names present in both tracks, sorted.
    pub fn common_chromosomes(&self, other: &Alignments) -> Vec<String> {
        let theirs = other.chromosomes();
        self.chromosomes()
            .into_iter()
            .filter(|c| theirs.contains(c))
            .map(|c| c.to_string())
            .collect()
    }

    pub fn filter_dup(&mut self, max_dup: u64) -> Result<u64, TrackError> {
        match self {
            Alignments::Single(track) => track.filter_dup(max_dup),
            Alignments::Paired(track) => track.filter_dup(max_dup),
        }
    }

    pub fn separate_dup(&mut self, max_dup: u64) -> Result<u64, TrackError> {
        match self {
            Alignments::Single(track) => track.separate_dup(max_dup),
            Alignments::Paired(track) => track.separate_dup(max_dup),
        }
    }

    pub fn addback_dups(&mut self) -> Result<u64, TrackError> {
        match self {
            Alignments::Single(track) => track.addback_dups(),
            Alignments::Paired(track) => track.addback_dups(),
        }
    }

    pub fn sample_num<R: Rng + ?Sized>(&mut self, k: u64, rng: &mut R) -> Result<(), TrackError> {
        match self {
            Alignments::Single(track) => track.sample_num(k, rng),
            Alignments::Paired(track) => track.sample_num(k, rng),
        }
    }

    pub fn sample_percent<R: Rng + ?Sized>(
        &mut self,
        fraction: f64,
        rng: &mut R,
    ) -> Result<(), TrackError> {
        match self {
            Alignments::Single(track) => track.sample_percent(fraction, rng),
            Alignments::Paired(track) => track.sample_percent(fraction, rng),
        }
    }

    ///
    /// Width used by the peak caller as the default gap: the read width for
    /// single-end data, the mean fragment span for paired-end data.
    ///
    pub fn tag_width(&self) -> Result<u32, TrackError> {
        match self {
            Alignments::Single(track) => Ok(track.read_width()),
            Alignments::Paired(track) => Ok(track.mean_fragment_length()?.round() as u32),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    use crate::models::Strand;

    #[rstest]
    fn test_common_chromosomes() {
        let mut treat = ReadTrack::new(36);
        treat.add("chr1", 1, Strand::Plus);
        treat.add("chr2", 1, Strand::Plus);
        let mut control = FragmentTrack::new();
        control.add("chr2", 0, 10);
        control.add("chr3", 0, 10);

        let treat = Alignments::Single(treat);
        let control = Alignments::Paired(control);
        assert_eq!(treat.common_chromosomes(&control), vec!["chr2".to_string()]);
        assert!(control.is_paired());
    }
}
