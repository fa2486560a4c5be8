//! Treatment against control, scored per run.
//!
//! A [ScoreTrack] owns the raw overlay of a treatment and a control pileup.
//! Scoring is a chain of pure stages:
//!
//! ```text
//! ScoreTrack --normalize(Normalization, pseudocount)--> NormalizedTrack
//!            --score(ScoreMethod)--> ScoredTrack --> peaks / bedGraph
//! ```
//!
//! The stored arrays are never touched, so any number of normalizations or
//! methods can be taken from one overlay. Every stage costs one pass over the
//! runs, never over bases.

use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::str::FromStr;
use std::sync::OnceLock;

use log::debug;

use peakrs_core::models::{BroadPeak, BroadPeakSet, Peak, PeakSet};
use peakrs_stats::{PqTable, log_lr_asym, log_lr_diff, log_lr_sym, poisson_score};

use crate::bedgraph::{ChromRuns, StepTrack, sweep_pair, weighted_mean};
use crate::caller::{self, BroadParams, CallerParams, run_start};
use crate::errors::ScoreError;

/// Per-side depth correction, applied when values are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Normalization {
    #[default]
    Raw,
    /// Treatment scaled to the control depth.
    TreatToControl,
    /// Control scaled to the treatment depth.
    ControlToTreat,
    /// Both scaled to the mean of the two depths.
    MeanDepth,
}

impl Normalization {
    ///
    /// `(treat_factor, control_factor)` for the given depths. A side with no
    /// depth is left unscaled.
    ///
    pub fn factors(&self, treat_depth: f64, control_depth: f64) -> (f64, f64) {
        if treat_depth <= 0.0 || control_depth <= 0.0 {
            return (1.0, 1.0);
        }
        match self {
            Normalization::Raw => (1.0, 1.0),
            Normalization::TreatToControl => (control_depth / treat_depth, 1.0),
            Normalization::ControlToTreat => (1.0, treat_depth / control_depth),
            Normalization::MeanDepth => {
                let mean = (treat_depth + control_depth) / 2.0;
                (mean / treat_depth, mean / control_depth)
            }
        }
    }
}

impl FromStr for Normalization {
    type Err = ScoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(Normalization::Raw),
            "treat-to-control" => Ok(Normalization::TreatToControl),
            "control-to-treat" => Ok(Normalization::ControlToTreat),
            "mean" => Ok(Normalization::MeanDepth),
            other => Err(ScoreError::UnknownNormalization(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreMethod {
    PPois,
    QPois,
    Subtract,
    FE,
    LogFE,
    Log2FE,
    LogLR,
    SymLogLR,
    DiffLogLR,
    Max,
}

impl FromStr for ScoreMethod {
    type Err = ScoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ppois" => Ok(ScoreMethod::PPois),
            "qpois" => Ok(ScoreMethod::QPois),
            "subtract" => Ok(ScoreMethod::Subtract),
            "FE" => Ok(ScoreMethod::FE),
            "logFE" => Ok(ScoreMethod::LogFE),
            "log2FE" => Ok(ScoreMethod::Log2FE),
            "logLR" => Ok(ScoreMethod::LogLR),
            "slogLR" => Ok(ScoreMethod::SymLogLR),
            "dlogLR" => Ok(ScoreMethod::DiffLogLR),
            "max" => Ok(ScoreMethod::Max),
            other => Err(ScoreError::UnknownMethod(other.to_string())),
        }
    }
}

impl Display for ScoreMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScoreMethod::PPois => "ppois",
            ScoreMethod::QPois => "qpois",
            ScoreMethod::Subtract => "subtract",
            ScoreMethod::FE => "FE",
            ScoreMethod::LogFE => "logFE",
            ScoreMethod::Log2FE => "log2FE",
            ScoreMethod::LogLR => "logLR",
            ScoreMethod::SymLogLR => "slogLR",
            ScoreMethod::DiffLogLR => "dlogLR",
            ScoreMethod::Max => "max",
        };
        write!(f, "{}", name)
    }
}

/// Parallel run arrays of one chromosome.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreRuns {
    pub ends: Vec<u32>,
    pub treat: Vec<f64>,
    pub control: Vec<f64>,
}

impl ScoreRuns {
    pub fn len(&self) -> usize {
        self.ends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }
}

///
/// The overlay of a treatment and a control pileup with the depths that
/// produced them.
///
#[derive(Debug, Clone, Default)]
pub struct ScoreTrack {
    chroms: BTreeMap<String, ScoreRuns>,
    treat_depth: f64,
    control_depth: f64,
}

impl ScoreTrack {
    ///
    /// Overlay two pileups. Only chromosomes present in both are kept, each
    /// up to the shorter of its two ends.
    ///
    pub fn from_pileups(
        treat: &StepTrack,
        control: &StepTrack,
        treat_depth: f64,
        control_depth: f64,
    ) -> Self {
        let mut chroms = BTreeMap::new();
        for (chrom, t) in treat.iter() {
            let Some(c) = control.chrom(chrom) else {
                debug!("{} has no control pileup, skipped", chrom);
                continue;
            };
            let mut runs = ScoreRuns::default();
            sweep_pair(t, c, |end, tv, cv| {
                runs.ends.push(end);
                runs.treat.push(tv);
                runs.control.push(cv);
            });
            chroms.insert(chrom.to_string(), runs);
        }
        ScoreTrack {
            chroms,
            treat_depth,
            control_depth,
        }
    }

    pub fn chromosomes(&self) -> Vec<&str> {
        self.chroms.keys().map(|k| k.as_str()).collect()
    }

    pub fn chrom(&self, chrom: &str) -> Option<&ScoreRuns> {
        self.chroms.get(chrom)
    }

    pub fn treat_depth(&self) -> f64 {
        self.treat_depth
    }

    pub fn control_depth(&self) -> f64 {
        self.control_depth
    }

    /// Total number of runs over all chromosomes.
    pub fn num_runs(&self) -> usize {
        self.chroms.values().map(|r| r.len()).sum()
    }

    pub fn normalize(&self, normalization: Normalization, pseudocount: f64) -> NormalizedTrack<'_> {
        let (treat_factor, control_factor) =
            normalization.factors(self.treat_depth, self.control_depth);
        debug!(
            "Normalization {:?}: treat x{}, control x{}, pseudocount {}",
            normalization, treat_factor, control_factor, pseudocount
        );
        NormalizedTrack {
            track: self,
            treat_factor,
            control_factor,
            pseudocount,
            pq: OnceLock::new(),
        }
    }
}

///
/// A [ScoreTrack] read through depth factors and a pseudocount.
///
/// The p-score to q-score table is built the first time it is needed and
/// shared by every later query.
///
#[derive(Debug)]
pub struct NormalizedTrack<'a> {
    track: &'a ScoreTrack,
    treat_factor: f64,
    control_factor: f64,
    pseudocount: f64,
    pq: OnceLock<PqTable>,
}

impl<'a> NormalizedTrack<'a> {
    pub fn factors(&self) -> (f64, f64) {
        (self.treat_factor, self.control_factor)
    }

    pub fn pseudocount(&self) -> f64 {
        self.pseudocount
    }

    /// Depth-scaled treatment pileup of run `i`, without the pseudocount.
    pub fn scaled_treat(&self, runs: &ScoreRuns, i: usize) -> f64 {
        runs.treat[i] * self.treat_factor
    }

    /// Depth-scaled control of run `i`, without the pseudocount.
    pub fn scaled_control(&self, runs: &ScoreRuns, i: usize) -> f64 {
        runs.control[i] * self.control_factor
    }

    /// Normalized treatment value of run `i`, pseudocount included.
    pub fn treat(&self, runs: &ScoreRuns, i: usize) -> f64 {
        self.scaled_treat(runs, i) + self.pseudocount
    }

    /// Normalized control value of run `i`, pseudocount included.
    pub fn control(&self, runs: &ScoreRuns, i: usize) -> f64 {
        self.scaled_control(runs, i) + self.pseudocount
    }

    fn ppois(&self, runs: &ScoreRuns, i: usize) -> f64 {
        poisson_score(self.treat(runs, i), self.control(runs, i))
    }

    pub fn pq_table(&self) -> &PqTable {
        self.pq.get_or_init(|| {
            let scores = self.track.chroms.values().flat_map(|runs| {
                (0..runs.len()).map(move |i| {
                    let length = runs.ends[i] - run_start(&runs.ends, i);
                    (self.ppois(runs, i), length as u64)
                })
            });
            let table = PqTable::build(scores);
            debug!(
                "p-score to q-score table: {} scores over {}bp",
                table.len(),
                table.total_length()
            );
            table
        })
    }

    fn score_run(&self, method: ScoreMethod, runs: &ScoreRuns, i: usize) -> f64 {
        let t = self.treat(runs, i);
        let c = self.control(runs, i);
        match method {
            ScoreMethod::PPois => poisson_score(t, c),
            ScoreMethod::QPois => self.pq_table().get(poisson_score(t, c)),
            ScoreMethod::Subtract => self.scaled_treat(runs, i) - self.scaled_control(runs, i),
            ScoreMethod::FE => t / c,
            ScoreMethod::LogFE => (t / c).log10(),
            ScoreMethod::Log2FE => (t / c).log2(),
            ScoreMethod::LogLR => log_lr_asym(t, c),
            ScoreMethod::SymLogLR => log_lr_sym(t, c),
            ScoreMethod::DiffLogLR => log_lr_diff(t, c),
            ScoreMethod::Max => self.scaled_treat(runs, i).max(self.scaled_control(runs, i)),
        }
    }

    /// One score per run.
    pub fn score(&self, method: ScoreMethod) -> ScoredTrack<'_> {
        let scores = self
            .track
            .chroms
            .iter()
            .map(|(chrom, runs)| {
                let values: Vec<f64> = (0..runs.len())
                    .map(|i| self.score_run(method, runs, i))
                    .collect();
                (chrom.clone(), values)
            })
            .collect();
        ScoredTrack {
            normalized: self,
            method,
            scores,
        }
    }
}

///
/// Scores of every run under one method, ready to be called or written.
///
#[derive(Debug)]
pub struct ScoredTrack<'a> {
    normalized: &'a NormalizedTrack<'a>,
    method: ScoreMethod,
    scores: BTreeMap<String, Vec<f64>>,
}

impl<'a> ScoredTrack<'a> {
    pub fn method(&self) -> ScoreMethod {
        self.method
    }

    pub fn scores(&self, chrom: &str) -> Option<&[f64]> {
        self.scores.get(chrom).map(|s| s.as_slice())
    }

    /// The score as a step track, adjacent equal scores merged.
    pub fn to_bedgraph(&self) -> StepTrack {
        let mut track = StepTrack::new(0.0);
        for (chrom, scores) in &self.scores {
            let Some(runs) = self.normalized.track.chrom(chrom) else {
                continue;
            };
            let mut out = ChromRuns::default();
            for (end, score) in runs.ends.iter().zip(scores.iter()) {
                out.push(*end, *score);
            }
            track.insert_chrom(chrom, out);
        }
        track
    }

    // p, q and fold enrichment at one run
    fn annotate(&self, peak: &mut Peak, runs: &ScoreRuns, scores: &[f64], i: usize) {
        let t = self.normalized.treat(runs, i);
        let c = self.normalized.control(runs, i);
        let p = poisson_score(t, c);
        peak.summit_value = scores[i];
        peak.pileup = self.normalized.scaled_treat(runs, i);
        peak.fold_enrichment = t / c;
        peak.neglog10_pvalue = p;
        peak.neglog10_qvalue = self.normalized.pq_table().get(p);
    }

    ///
    /// Threshold-scan the scores into narrow peaks.
    ///
    /// Summits are placed on the scaled treatment pileup. With a
    /// `summit_window` every credible local maximum of a region becomes its
    /// own peak, smoothed over that many bases. Peaks are not named.
    ///
    pub fn call_peaks(&self, params: &CallerParams, summit_window: Option<usize>) -> PeakSet {
        let mut peaks = Vec::new();
        for (chrom, scores) in &self.scores {
            let Some(runs) = self.normalized.track.chrom(chrom) else {
                continue;
            };
            let pileup: Vec<f64> = (0..runs.len())
                .map(|i| self.normalized.scaled_treat(runs, i))
                .collect();
            let regions = caller::scan(&runs.ends, scores, &pileup, params);
            debug!("{}: {} regions at {} >= {}", chrom, regions.len(), self.method, params.cutoff);

            for region in regions {
                let summits = match summit_window {
                    Some(window) => caller::refine_summits(
                        &runs.ends,
                        scores,
                        &pileup,
                        &region,
                        params.cutoff,
                        window,
                    ),
                    None => vec![(region.summit, region.summit_index)],
                };
                for (summit, idx) in summits {
                    let mut peak = Peak::new(chrom, region.start, region.end, summit);
                    self.annotate(&mut peak, runs, scores, idx);
                    peaks.push(peak);
                }
            }
        }
        PeakSet::new(peaks)
    }

    ///
    /// Two-level scan into broad peaks. Envelope annotations are
    /// length-weighted means over the envelope; `summit_value` is the score at
    /// the summit of the highest block.
    ///
    pub fn call_broad_peaks(&self, params: &BroadParams) -> BroadPeakSet {
        let normalized = self.normalized;
        let pq = normalized.pq_table();
        let mut peaks = Vec::new();
        for (chrom, scores) in &self.scores {
            let Some(runs) = normalized.track.chrom(chrom) else {
                continue;
            };
            let pileup: Vec<f64> = (0..runs.len()).map(|i| normalized.scaled_treat(runs, i)).collect();
            let ppois: Vec<f64> = (0..runs.len()).map(|i| normalized.ppois(runs, i)).collect();

            for region in caller::scan_broad(&runs.ends, scores, &pileup, params) {
                let envelope = &region.envelope;
                let (start, end) = (envelope.start, envelope.end);
                let mut peak = Peak::new(chrom, start, end, envelope.summit);
                peak.summit_value = scores[envelope.summit_index];
                peak.pileup = weighted_mean(&runs.ends, start, end, |i| pileup[i]);
                peak.fold_enrichment = weighted_mean(&runs.ends, start, end, |i| {
                    normalized.treat(runs, i) / normalized.control(runs, i)
                });
                peak.neglog10_pvalue = weighted_mean(&runs.ends, start, end, |i| ppois[i]);
                peak.neglog10_qvalue = weighted_mean(&runs.ends, start, end, |i| pq.get(ppois[i]));
                peaks.push(BroadPeak {
                    peak,
                    blocks: region.blocks.iter().map(|b| (b.start, b.end)).collect(),
                });
            }
            debug!("{}: {} broad peaks so far", chrom, peaks.len());
        }
        BroadPeakSet::new(peaks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    use crate::bedgraph::from_intervals;

    fn round2(values: &[f64]) -> Vec<f64> {
        values.iter().map(|v| (v * 100.0).round() / 100.0).collect()
    }

    #[fixture]
    fn literal_track() -> ScoreTrack {
        let treat = from_intervals(
            [
                ("chrY", 0, 10, 100.0),
                ("chrY", 10, 20, 10.0),
                ("chrY", 20, 30, 15.0),
                ("chrY", 30, 40, 5.0),
                ("chrY", 40, 50, 20.0),
            ],
            0.0,
        )
        .unwrap();
        let control = from_intervals(
            [
                ("chrY", 0, 10, 10.0),
                ("chrY", 10, 20, 10.0),
                ("chrY", 20, 30, 20.0),
                ("chrY", 30, 40, 20.0),
                ("chrY", 40, 50, 5.0),
            ],
            0.0,
        )
        .unwrap();
        ScoreTrack::from_pileups(&treat, &control, 10.0, 5.0)
    }

    #[rstest]
    fn test_overlay_keeps_parallel_arrays(literal_track: ScoreTrack) {
        let runs = literal_track.chrom("chrY").unwrap();
        assert_eq!(runs.ends, vec![10, 20, 30, 40, 50]);
        assert_eq!(runs.treat, vec![100.0, 10.0, 15.0, 5.0, 20.0]);
        assert_eq!(runs.control, vec![10.0, 10.0, 20.0, 20.0, 5.0]);
    }

    #[rstest]
    fn test_ppois_literal(literal_track: ScoreTrack) {
        let normalized = literal_track.normalize(Normalization::Raw, 0.0);
        let scored = normalized.score(ScoreMethod::PPois);
        assert_eq!(
            round2(scored.scores("chrY").unwrap()),
            vec![63.27, 0.38, 0.07, 0.0, 7.09]
        );
    }

    #[rstest]
    fn test_log_fe_literal(literal_track: ScoreTrack) {
        let normalized = literal_track.normalize(Normalization::Raw, 1.0);
        let scored = normalized.score(ScoreMethod::LogFE);
        assert_eq!(
            round2(scored.scores("chrY").unwrap()),
            vec![0.96, 0.0, -0.12, -0.54, 0.54]
        );
    }

    #[rstest]
    fn test_llr_literal(literal_track: ScoreTrack) {
        let normalized = literal_track.normalize(Normalization::Raw, 1.0);
        let asym = normalized.score(ScoreMethod::LogLR);
        assert_eq!(
            round2(asym.scores("chrY").unwrap()),
            vec![58.17, 0.0, -0.28, -3.25, 4.91]
        );
        let sym = normalized.score(ScoreMethod::SymLogLR);
        assert_eq!(round2(&sym.scores("chrY").unwrap()[3..4]), vec![-4.91]);
    }

    #[rstest]
    fn test_subtract_and_max_skip_pseudocount(literal_track: ScoreTrack) {
        let normalized = literal_track.normalize(Normalization::Raw, 1.0);
        assert_eq!(
            normalized.score(ScoreMethod::Subtract).scores("chrY").unwrap(),
            &[90.0, 0.0, -5.0, -15.0, 15.0]
        );
        assert_eq!(
            normalized.score(ScoreMethod::Max).scores("chrY").unwrap(),
            &[100.0, 10.0, 20.0, 20.0, 20.0]
        );
    }

    #[rstest]
    #[case(Normalization::Raw, (1.0, 1.0))]
    #[case(Normalization::TreatToControl, (0.5, 1.0))]
    #[case(Normalization::ControlToTreat, (1.0, 2.0))]
    #[case(Normalization::MeanDepth, (0.75, 1.5))]
    fn test_normalization_factors(#[case] normalization: Normalization, #[case] expected: (f64, f64)) {
        assert_eq!(normalization.factors(10.0, 5.0), expected);
        assert_eq!(normalization.factors(0.0, 5.0), (1.0, 1.0));
    }

    #[rstest]
    fn test_normalization_never_mutates(literal_track: ScoreTrack) {
        let halved = literal_track.normalize(Normalization::TreatToControl, 0.0);
        assert_eq!(
            halved.score(ScoreMethod::Subtract).scores("chrY").unwrap()[0],
            40.0
        );
        let raw = literal_track.normalize(Normalization::Raw, 0.0);
        assert_eq!(raw.score(ScoreMethod::Subtract).scores("chrY").unwrap()[0], 90.0);
    }

    #[rstest]
    fn test_method_names_round_trip() {
        for name in [
            "ppois", "qpois", "subtract", "logFE", "log2FE", "FE", "logLR", "slogLR", "dlogLR", "max",
        ] {
            let method: ScoreMethod = name.parse().unwrap();
            assert_eq!(method.to_string(), name);
        }
        assert_eq!(
            "pois".parse::<ScoreMethod>(),
            Err(ScoreError::UnknownMethod("pois".to_string()))
        );
    }

    #[rstest]
    fn test_qpois_never_exceeds_ppois(literal_track: ScoreTrack) {
        let normalized = literal_track.normalize(Normalization::Raw, 1.0);
        let p = normalized.score(ScoreMethod::PPois);
        let q = normalized.score(ScoreMethod::QPois);
        for (pv, qv) in p.scores("chrY").unwrap().iter().zip(q.scores("chrY").unwrap()) {
            assert!(qv <= pv);
            assert!(*qv >= 0.0);
        }
        assert_eq!(normalized.pq_table().total_length(), 50);
    }

    #[rstest]
    fn test_call_peaks_annotates_summit(literal_track: ScoreTrack) {
        let normalized = literal_track.normalize(Normalization::Raw, 0.0);
        let scored = normalized.score(ScoreMethod::PPois);
        let params = CallerParams {
            cutoff: 5.0,
            min_length: 5,
            max_gap: 5,
        };
        let peaks = scored.call_peaks(&params, None);
        let called: Vec<(u32, u32, u32)> = peaks.iter().map(|p| (p.start, p.end, p.summit)).collect();
        assert_eq!(called, vec![(0, 10, 5), (40, 50, 45)]);

        let first = peaks.iter().next().unwrap();
        assert_eq!(first.pileup, 100.0);
        assert_eq!(first.fold_enrichment, 10.0);
        assert_eq!((first.neglog10_pvalue * 100.0).round() / 100.0, 63.27);
        assert_eq!(first.summit_value, first.neglog10_pvalue);
        assert!(first.neglog10_qvalue <= first.neglog10_pvalue);
    }

    #[rstest]
    fn test_pileup_excludes_pseudocount(literal_track: ScoreTrack) {
        let normalized = literal_track.normalize(Normalization::Raw, 1.0);
        let scored = normalized.score(ScoreMethod::PPois);
        let params = CallerParams {
            cutoff: 10.0,
            min_length: 5,
            max_gap: 5,
        };
        let peaks = scored.call_peaks(&params, None);
        assert_eq!(peaks.len(), 1);
        let peak = peaks.iter().next().unwrap();
        assert_eq!(peak.pileup, 100.0);
        assert_eq!(peak.fold_enrichment, 101.0 / 11.0);

        let broad = scored.call_broad_peaks(&BroadParams {
            lvl1_cutoff: 10.0,
            lvl2_cutoff: 10.0,
            min_length: 5,
            lvl1_max_gap: 5,
            lvl2_max_gap: 5,
        });
        assert_eq!(broad.len(), 1);
        let envelope = &broad.iter().next().unwrap().peak;
        assert_eq!((envelope.start, envelope.end), (0, 10));
        assert_eq!(envelope.pileup, 100.0);
        assert!((envelope.fold_enrichment - 101.0 / 11.0).abs() < 1e-9);
    }

    #[rstest]
    fn test_to_bedgraph_merges_equal_scores() {
        let treat = from_intervals([("chr1", 0, 10, 4.0), ("chr1", 10, 20, 8.0)], 0.0).unwrap();
        let control = from_intervals([("chr1", 0, 10, 2.0), ("chr1", 10, 20, 4.0)], 0.0).unwrap();
        let track = ScoreTrack::from_pileups(&treat, &control, 1.0, 1.0);
        let normalized = track.normalize(Normalization::Raw, 0.0);
        let bedgraph = normalized.score(ScoreMethod::FE).to_bedgraph();
        assert_eq!(
            bedgraph.chrom("chr1").unwrap().runs().collect::<Vec<_>>(),
            vec![(0, 20, 2.0)]
        );
    }
}
