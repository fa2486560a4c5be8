use std::io::Write;

use anyhow::Result;
use clap::ArgMatches;
use log::info;

use peakrs_core::models::Alignments;
use peakrs_signal::bedgraph::StepTrack;
use peakrs_signal::pileup::{pileup, pileup_fragments};

use crate::common::{arg, create_writer, load_inputs};

///
/// Reads are extended by `extsize` downstream, or `extsize` to each side
/// with `both_directions`. Fragments cover exactly their span.
///
pub fn coverage(alignments: &Alignments, extsize: u32, both_directions: bool, scale: f64) -> Result<StepTrack> {
    let track = match alignments {
        Alignments::Single(reads) if both_directions => pileup(reads, 2 * extsize, scale, false, false)?,
        Alignments::Single(reads) => pileup(reads, extsize, scale, true, false)?,
        Alignments::Paired(fragments) => pileup_fragments(fragments, scale)?,
    };
    Ok(track)
}

pub fn run_pileup(matches: &ArgMatches) -> Result<()> {
    let alignments = load_inputs(matches, "input")?;
    let track = coverage(
        &alignments,
        *arg::<u32>(matches, "extsize")?,
        matches.get_flag("both-direction"),
        *arg::<f64>(matches, "scale")?,
    )?;
    let summary = track.summary();
    info!("Pileup covers {} bp, maximum {:.2}", track.total_length(), summary.max);

    let mut writer = create_writer(arg::<String>(matches, "ofile")?)?;
    track.write_bedgraph(&mut writer, None, None)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    use peakrs_core::models::{ReadTrack, Strand};

    #[fixture]
    fn reads() -> Alignments {
        let mut track = ReadTrack::new(10);
        track.add("chr1", 100, Strand::Plus);
        track.add("chr1", 300, Strand::Minus);
        track.finalize();
        Alignments::Single(track)
    }

    #[rstest]
    fn test_directional_coverage(reads: Alignments) {
        let track = coverage(&reads, 50, false, 1.0).unwrap();
        assert_eq!(track.value_at("chr1", 120), 1.0);
        assert_eq!(track.value_at("chr1", 160), 0.0);
        assert_eq!(track.value_at("chr1", 260), 1.0);
    }

    #[rstest]
    fn test_both_directions(reads: Alignments) {
        let track = coverage(&reads, 50, true, 1.0).unwrap();
        assert_eq!(track.value_at("chr1", 60), 1.0);
        assert_eq!(track.value_at("chr1", 140), 1.0);
        assert_eq!(track.value_at("chr1", 340), 1.0);
        assert_eq!(track.value_at("chr1", 40), 0.0);
    }
}
