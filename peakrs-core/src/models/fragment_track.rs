use std::collections::BTreeMap;

use rand::Rng;

use crate::errors::TrackError;
use crate::models::sorted::{cap_duplicates, sample_in_place};

///
/// Paired-end fragments as half-open `(start, end)` spans per chromosome.
///
/// Fragments are sorted by start, then end, once [FragmentTrack::finalize]
/// has been called. Duplicates are fragments sharing chromosome, start and
/// end.
///
#[derive(Debug, Clone, Default)]
pub struct FragmentTrack {
    chroms: BTreeMap<String, Vec<(u32, u32)>>,
    duplicates: BTreeMap<String, Vec<(u32, u32)>>,
    total: u64,
    length: u64,
    finalized: bool,
}

impl FragmentTrack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, chrom: &str, start: u32, end: u32) {
        if !self.chroms.contains_key(chrom) {
            self.chroms.insert(chrom.to_string(), Vec::new());
        }
        if let Some(fragments) = self.chroms.get_mut(chrom) {
            fragments.push((start, end));
        }
        self.finalized = false;
    }

    pub fn finalize(&mut self) {
        for fragments in self.chroms.values_mut() {
            fragments.sort_unstable();
        }
        self.recount();
        self.finalized = true;
    }

    fn recount(&mut self) {
        self.total = self.chroms.values().map(|f| f.len() as u64).sum();
        self.length = self
            .chroms
            .values()
            .flat_map(|f| f.iter())
            .map(|(s, e)| (e - s) as u64)
            .sum();
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

    /// Sum of all fragment spans.
    pub fn length(&self) -> Result<u64, TrackError> {
        self.ensure_finalized()?;
        Ok(self.length)
    }

    /// Mean fragment span, zero for an empty track.
    pub fn mean_fragment_length(&self) -> Result<f64, TrackError> {
        self.ensure_finalized()?;
        if self.total == 0 {
            return Ok(0.0);
        }
        Ok(self.length as f64 / self.total as f64)
    }

    pub fn chromosomes(&self) -> Vec<&str> {
        self.chroms.keys().map(|k| k.as_str()).collect()
    }

    pub fn fragments(&self, chrom: &str) -> Result<&[(u32, u32)], TrackError> {
        self.ensure_finalized()?;
        Ok(self.chroms.get(chrom).map(|f| f.as_slice()).unwrap_or(&[]))
    }

    pub fn duplicate_count(&self) -> u64 {
        self.duplicates.values().map(|f| f.len() as u64).sum()
    }

    pub fn filter_dup(&mut self, max_dup: u64) -> Result<u64, TrackError> {
        self.ensure_finalized()?;
        let mut removed = 0;
        for fragments in self.chroms.values_mut() {
            removed += cap_duplicates(fragments, max_dup, None);
        }
        self.recount();
        Ok(removed)
    }

    pub fn separate_dup(&mut self, max_dup: u64) -> Result<u64, TrackError> {
        self.ensure_finalized()?;
        let mut removed = 0;
        for (chrom, fragments) in self.chroms.iter_mut() {
            let side = self.duplicates.entry(chrom.clone()).or_default();
            removed += cap_duplicates(fragments, max_dup, Some(side));
        }
        self.duplicates.retain(|_, side| !side.is_empty());
        self.recount();
        Ok(removed)
    }

    pub fn addback_dups(&mut self) -> Result<u64, TrackError> {
        self.ensure_finalized()?;
        let duplicates = std::mem::take(&mut self.duplicates);
        let mut restored = 0;
        for (chrom, side) in duplicates {
            restored += side.len() as u64;
            let fragments = self.chroms.entry(chrom).or_default();
            fragments.extend(side);
            fragments.sort_unstable();
        }
        self.recount();
        Ok(restored)
    }

    pub fn sample_num<R: Rng + ?Sized>(&mut self, k: u64, rng: &mut R) -> Result<(), TrackError> {
        self.ensure_finalized()?;
        if k > self.total {
            return Err(TrackError::Sampling {
                requested: k,
                available: self.total,
            });
        }
        let mut groups: Vec<&mut Vec<(u32, u32)>> = self.chroms.values_mut().collect();
        sample_in_place(&mut groups, k as usize, rng);
        self.recount();
        Ok(())
    }

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
