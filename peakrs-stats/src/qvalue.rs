//! Benjamini-Hochberg correction of Poisson scores.
//!
//! Scores and q-scores are both `-log10` values. Every run contributes its
//! length as the number of tests carrying its score, so the correction is the
//! same one a per-base table would give without ever expanding a track.

use std::collections::HashMap;

///
/// Lookup from a p-score to its q-score.
///
#[derive(Debug, Clone, Default)]
pub struct PqTable {
    // descending by p-score
    entries: Vec<(f64, f64)>,
    total_length: u64,
}

impl PqTable {
    ///
    /// Build the table from `(p_score, run_length)` pairs.
    ///
    /// Unique scores are walked in descending order with a rank `k` that starts
    /// at 1 and grows by the length carrying each score. The q-score is
    /// `p + log10(k) - log10(N)`, never allowed to rise above the previous one.
    /// Once it drops to zero every smaller score maps to zero.
    ///
    pub fn build<I>(scores: I) -> Self
    where
        I: IntoIterator<Item = (f64, u64)>,
    {
        let mut lengths: HashMap<u64, (f64, u64)> = HashMap::new();
        let mut total_length: u64 = 0;
        for (score, length) in scores {
            if length == 0 || score.is_nan() {
                continue;
            }
            let entry = lengths.entry(score.to_bits()).or_insert((score, 0));
            entry.1 += length;
            total_length += length;
        }

        let mut unique: Vec<(f64, u64)> = lengths.into_values().collect();
        unique.sort_by(|a, b| b.0.total_cmp(&a.0));

        let log_total = (total_length.max(1) as f64).log10();
        let mut entries = Vec::with_capacity(unique.len());
        let mut rank: u64 = 1;
        let mut previous_q = f64::INFINITY;
        let mut exhausted = false;

        for (p, length) in unique {
            if exhausted {
                entries.push((p, 0.0));
                continue;
            }
            let mut q = p + (rank as f64).log10() - log_total;
            if q > previous_q {
                q = previous_q;
            }
            if q <= 0.0 {
                exhausted = true;
                entries.push((p, 0.0));
                continue;
            }
            entries.push((p, q));
            previous_q = q;
            rank += length;
        }

        PqTable {
            entries,
            total_length,
        }
    }

    ///
    /// q-score for a p-score.
    ///
    /// Scores absent from the table take the q-score of the closest smaller
    /// score present, zero if there is none.
    ///
    pub fn get(&self, p_score: f64) -> f64 {
        let idx = self.entries.partition_point(|(p, _)| *p > p_score);
        self.entries.get(idx).map(|(_, q)| *q).unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of tests (bases) the table was built from.
    pub fn total_length(&self) -> u64 {
        self.total_length
    }
}
