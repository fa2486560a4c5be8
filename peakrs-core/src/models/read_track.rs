use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::str::FromStr;

use rand::Rng;

use crate::errors::TrackError;
use crate::models::sorted::{cap_duplicates, sample_in_place};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    Plus,
    Minus,
}

impl FromStr for Strand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Strand::Plus),
            "-" => Ok(Strand::Minus),
            _ => Err(format!("Invalid strand: {}", s)),
        }
    }
}

impl Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strand::Plus => write!(f, "+"),
            Strand::Minus => write!(f, "-"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct StrandPositions {
    plus: Vec<u32>,
    minus: Vec<u32>,
}

impl StrandPositions {
    fn len(&self) -> u64 {
        (self.plus.len() + self.minus.len()) as u64
    }

    fn sort(&mut self) {
        self.plus.sort_unstable();
        self.minus.sort_unstable();
    }
}

///
/// Single-end reads of a fixed width, stored as 5' positions per chromosome
/// and strand.
///
/// A plus read is stored by its left coordinate, a minus read by its right
/// coordinate. Every query requires [ReadTrack::finalize] to have been called
/// after the last mutation.
///
#[derive(Debug, Clone, Default)]
pub struct ReadTrack {
    chroms: BTreeMap<String, StrandPositions>,
    duplicates: BTreeMap<String, StrandPositions>,
    read_width: u32,
    total: u64,
    finalized: bool,
}

impl ReadTrack {
    pub fn new(read_width: u32) -> Self {
        ReadTrack {
            read_width,
            ..Default::default()
        }
    }

    pub fn add(&mut self, chrom: &str, position: u32, strand: Strand) {
        let entry = self.chroms.entry(chrom.to_string()).or_default();
        match strand {
            Strand::Plus => entry.plus.push(position),
            Strand::Minus => entry.minus.push(position),
        }
        self.finalized = false;
    }

    /// Sort every sequence and recount the total.
    pub fn finalize(&mut self) {
        for positions in self.chroms.values_mut() {
            positions.sort();
        }
        self.recount();
        self.finalized = true;
    }

    fn recount(&mut self) {
        self.total = self.chroms.values().map(|p| p.len()).sum();
    }

    fn ensure_finalized(&self) -> Result<(), TrackError> {
        if self.finalized {
            Ok(())
        } else {
            Err(TrackError::NotFinalized)
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn total(&self) -> Result<u64, TrackError> {
        self.ensure_finalized()?;
        Ok(self.total)
    }

    /// Bases covered by the reads, `total * read_width`.
    pub fn length(&self) -> Result<u64, TrackError> {
        self.ensure_finalized()?;
        Ok(self.total * self.read_width as u64)
    }

    pub fn read_width(&self) -> u32 {
        self.read_width
    }

    pub fn set_read_width(&mut self, read_width: u32) {
        self.read_width = read_width;
    }

    /// Chromosome names in sorted order.
    pub fn chromosomes(&self) -> Vec<&str> {
        self.chroms.keys().map(|k| k.as_str()).collect()
    }

    pub fn plus(&self, chrom: &str) -> Result<&[u32], TrackError> {
        self.ensure_finalized()?;
        Ok(self
            .chroms
            .get(chrom)
            .map(|p| p.plus.as_slice())
            .unwrap_or(&[]))
    }

    pub fn minus(&self, chrom: &str) -> Result<&[u32], TrackError> {
        self.ensure_finalized()?;
        Ok(self
            .chroms
            .get(chrom)
            .map(|p| p.minus.as_slice())
            .unwrap_or(&[]))
    }

    /// Number of reads moved aside by [ReadTrack::separate_dup].
    pub fn duplicate_count(&self) -> u64 {
        self.duplicates.values().map(|p| p.len()).sum()
    }

    ///
    /// Keep at most `max_dup` reads per chromosome, strand and position,
    /// discarding the rest.
    ///
    /// Returns the number of reads removed.
    ///
    pub fn filter_dup(&mut self, max_dup: u64) -> Result<u64, TrackError> {
        self.ensure_finalized()?;
        let mut removed = 0;
        for positions in self.chroms.values_mut() {
            removed += cap_duplicates(&mut positions.plus, max_dup, None);
            removed += cap_duplicates(&mut positions.minus, max_dup, None);
        }
        self.total -= removed;
        Ok(removed)
    }

    ///
    /// Like [ReadTrack::filter_dup], but keeps the removed reads so that
    /// [ReadTrack::addback_dups] can restore them.
    ///
    pub fn separate_dup(&mut self, max_dup: u64) -> Result<u64, TrackError> {
        self.ensure_finalized()?;
        let mut removed = 0;
        for (chrom, positions) in self.chroms.iter_mut() {
            let side = self.duplicates.entry(chrom.clone()).or_default();
            removed += cap_duplicates(&mut positions.plus, max_dup, Some(&mut side.plus));
            removed += cap_duplicates(&mut positions.minus, max_dup, Some(&mut side.minus));
        }
        self.duplicates.retain(|_, side| side.len() > 0);
        self.total -= removed;
        Ok(removed)
    }

    /// Put back every read moved aside by [ReadTrack::separate_dup].
    pub fn addback_dups(&mut self) -> Result<u64, TrackError> {
        self.ensure_finalized()?;
        let duplicates = std::mem::take(&mut self.duplicates);
        let mut restored = 0;
        for (chrom, side) in duplicates {
            restored += side.len();
            let positions = self.chroms.entry(chrom).or_default();
            positions.plus.extend(side.plus);
            positions.minus.extend(side.minus);
            positions.sort();
        }
        self.total += restored;
        Ok(restored)
    }

    ///
    /// Keep exactly `k` reads chosen uniformly without replacement.
    ///
    /// The result depends only on the state of `rng`; sort order is kept.
    ///
    pub fn sample_num<R: Rng + ?Sized>(&mut self, k: u64, rng: &mut R) -> Result<(), TrackError> {
        self.ensure_finalized()?;
        if k > self.total {
            return Err(TrackError::Sampling {
                requested: k,
                available: self.total,
            });
        }
        let mut groups: Vec<&mut Vec<u32>> = self
            .chroms
            .values_mut()
            .flat_map(|positions| {
                let StrandPositions { plus, minus } = positions;
                [plus, minus]
            })
            .collect();
        sample_in_place(&mut groups, k as usize, rng);
        self.recount();
        Ok(())
    }

    /// Keep `round(fraction * total)` reads, see [ReadTrack::sample_num].
    pub fn sample_percent<R: Rng + ?Sized>(
        &mut self,
        fraction: f64,
        rng: &mut R,
    ) -> Result<(), TrackError> {
        self.ensure_finalized()?;
        if !(0.0..=1.0).contains(&fraction) {
            return Err(TrackError::InvalidFraction(fraction));
        }
        let k = (fraction * self.total as f64).round() as u64;
        self.sample_num(k, rng)
    }
}
