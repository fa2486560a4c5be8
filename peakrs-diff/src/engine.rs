use std::collections::BTreeMap;

use log::{debug, info};
use rand::Rng;

use peakrs_core::models::{Peak, PeakSet};
use peakrs_signal::bedgraph::StepTrack;
use peakrs_signal::caller::CallerParams;
use peakrs_signal::score_track::{Normalization, ScoreMethod, ScoreTrack};
use peakrs_stats::{Gfold, GfoldOptions, GfoldTable};

use crate::errors::DiffError;
use crate::overlap::OverlapIndex;

/// Which condition is rescaled when the depths differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepthScaling {
    /// The deeper condition is scaled down.
    #[default]
    ToSmaller,
    /// The shallower condition is scaled up.
    ToLarger,
}

impl DepthScaling {
    /// `(factor1, factor2)` applied to the tracks of each condition.
    pub fn factors(&self, depth1: f64, depth2: f64) -> (f64, f64) {
        match self {
            DepthScaling::ToSmaller if depth1 > depth2 => (depth2 / depth1, 1.0),
            DepthScaling::ToSmaller => (1.0, depth1 / depth2),
            DepthScaling::ToLarger if depth1 > depth2 => (1.0, depth1 / depth2),
            DepthScaling::ToLarger => (depth2 / depth1, 1.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiffOptions {
    pub scaling: DepthScaling,
    /// log10 likelihood ratio a condition peak must reach.
    pub peak_cutoff: f64,
    pub peak_min_length: u32,
    pub peak_max_gap: u32,
    /// log10 likelihood ratio a differential region must reach.
    pub diff_cutoff: f64,
    pub diff_min_length: u32,
    pub diff_max_gap: u32,
    pub pseudocount: f64,
    pub prefix: String,
    pub gfold: GfoldOptions,
}

impl Default for DiffOptions {
    fn default() -> Self {
        DiffOptions {
            scaling: DepthScaling::ToSmaller,
            peak_cutoff: 3.0,
            peak_min_length: 200,
            peak_max_gap: 100,
            diff_cutoff: 3.0,
            diff_min_length: 200,
            diff_max_gap: 100,
            pseudocount: 1.0,
            prefix: "diff".to_string(),
            gfold: GfoldOptions::default(),
        }
    }
}

impl DiffOptions {
    pub fn validate(&self) -> Result<(), DiffError> {
        if !(self.peak_cutoff > 0.0 && self.diff_cutoff > 0.0) {
            return Err(DiffError::InvalidOptions(format!(
                "cutoffs must be positive, got {} and {}",
                self.peak_cutoff, self.diff_cutoff
            )));
        }
        if !(self.pseudocount > 0.0) {
            return Err(DiffError::InvalidOptions(format!(
                "pseudocount must be positive, got {}",
                self.pseudocount
            )));
        }
        self.gfold.validate()?;
        Ok(())
    }
}

/// The four pileups of a two-condition comparison and the depth of each condition.
#[derive(Debug, Clone, Copy)]
pub struct DiffInput<'a> {
    pub treat1: &'a StepTrack,
    pub control1: &'a StepTrack,
    pub treat2: &'a StepTrack,
    pub control2: &'a StepTrack,
    pub depth1: f64,
    pub depth2: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffAnnotation {
    /// Comparison score at the summit; positive when condition 1 is higher.
    pub log_lr: f64,
    pub treat1: f64,
    pub treat2: f64,
    pub gfold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiffClass {
    Unique1,
    Unique2,
    Common,
}

impl DiffClass {
    pub fn label(&self) -> &'static str {
        match self {
            DiffClass::Unique1 => "cond1",
            DiffClass::Unique2 => "cond2",
            DiffClass::Common => "common",
        }
    }
}

///
/// Classified regions, each set with one annotation per peak in iteration
/// order.
///
#[derive(Debug, Clone)]
pub struct DiffResult {
    pub unique1: PeakSet,
    pub unique2: PeakSet,
    pub common: PeakSet,
    pub annotations: BTreeMap<DiffClass, Vec<DiffAnnotation>>,
    pub peaks1: PeakSet,
    pub peaks2: PeakSet,
    /// Symmetric log10 likelihood ratio of treat1 against treat2.
    pub comparison: StepTrack,
}

impl DiffResult {
    pub fn set(&self, class: DiffClass) -> &PeakSet {
        match class {
            DiffClass::Unique1 => &self.unique1,
            DiffClass::Unique2 => &self.unique2,
            DiffClass::Common => &self.common,
        }
    }

    pub fn annotations(&self, class: DiffClass) -> &[DiffAnnotation] {
        self.annotations.get(&class).map(|a| a.as_slice()).unwrap_or(&[])
    }
}

// direction of a differential region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

///
/// Two-condition comparison owning its gfold estimator. The estimate cache
/// lives for one [DiffEngine::run].
///
#[derive(Debug, Clone)]
pub struct DiffEngine {
    options: DiffOptions,
    gfold: Gfold,
}

impl DiffEngine {
    pub fn new(options: DiffOptions) -> Result<Self, DiffError> {
        options.validate()?;
        let gfold = Gfold::new(options.gfold.clone());
        Ok(DiffEngine { options, gfold })
    }

    pub fn with_gfold_table(mut self, table: GfoldTable) -> Self {
        self.gfold = self.gfold.with_table(table);
        self
    }

    pub fn options(&self) -> &DiffOptions {
        &self.options
    }

    ///
    /// Compare two conditions.
    ///
    /// # Arguments
    /// - input: pileups and depths of both conditions
    /// - peaks: condition peak sets to use instead of calling them
    /// - rng: drawn from for gfold estimates the table cannot answer
    ///
    pub fn run<R: Rng + ?Sized>(
        &mut self,
        input: &DiffInput<'_>,
        peaks: Option<(PeakSet, PeakSet)>,
        rng: &mut R,
    ) -> Result<DiffResult, DiffError> {
        if !(input.depth1 > 0.0 && input.depth2 > 0.0) {
            return Err(DiffError::InvalidDepth {
                depth1: input.depth1,
                depth2: input.depth2,
            });
        }
        self.gfold.clear();
        let (f1, f2) = self.options.scaling.factors(input.depth1, input.depth2);
        info!("Scaling condition 1 by {:.5} and condition 2 by {:.5}", f1, f2);

        let mut tracks = [
            input.treat1.scale(f1),
            input.control1.scale(f1),
            input.treat2.scale(f2),
            input.control2.scale(f2),
        ];
        let shared: Vec<String> = tracks[0]
            .chromosomes()
            .into_iter()
            .filter(|c| tracks[1..].iter().all(|t| t.chrom(c).is_some()))
            .map(|c| c.to_string())
            .collect();
        if shared.is_empty() {
            return Err(DiffError::NoCommonChromosomes);
        }
        let mut domain: BTreeMap<String, u32> = BTreeMap::new();
        for track in tracks.iter_mut() {
            track.retain_chroms(&shared);
            for (chrom, end) in track.chrom_ends() {
                let current = domain.entry(chrom).or_insert(0);
                *current = (*current).max(end);
            }
        }
        for track in tracks.iter_mut() {
            track.pad_to(&domain);
        }
        let [treat1, control1, treat2, control2] = tracks;
        let depth = input.depth1 * f1;

        let (peaks1, peaks2) = match peaks {
            Some(given) => given,
            None => (
                self.condition_peaks(&treat1, &control1, depth),
                self.condition_peaks(&treat2, &control2, depth),
            ),
        };
        info!("{} condition 1 peaks, {} condition 2 peaks", peaks1.len(), peaks2.len());

        let versus = ScoreTrack::from_pileups(&treat1, &treat2, depth, depth);
        let comparison = versus
            .normalize(Normalization::Raw, self.options.pseudocount)
            .score(ScoreMethod::SymLogLR)
            .to_bedgraph();

        let up = comparison.call_regions(
            self.options.diff_cutoff,
            self.options.diff_min_length,
            self.options.diff_max_gap,
            false,
        );
        let down = comparison.map_values(|v| -v).call_regions(
            self.options.diff_cutoff,
            self.options.diff_min_length,
            self.options.diff_max_gap,
            false,
        );
        debug!("{} regions higher in condition 1, {} higher in condition 2", up.len(), down.len());

        let index1 = OverlapIndex::new(&peaks1);
        let index2 = OverlapIndex::new(&peaks2);
        let mut unique1 = Vec::new();
        let mut unique2 = Vec::new();
        let regions = up
            .iter()
            .map(|r| (r, Direction::Up))
            .chain(down.iter().map(|r| (r, Direction::Down)));
        for (region, direction) in regions {
            let in1 = index1.overlaps(&region.chr, region.start, region.end);
            let in2 = index2.overlaps(&region.chr, region.start, region.end);
            let class = match (in1, in2, direction) {
                (true, false, _) | (true, true, Direction::Up) => DiffClass::Unique1,
                (false, true, _) | (true, true, Direction::Down) => DiffClass::Unique2,
                (false, false, _) => continue,
            };
            let peak = Peak::new(&region.chr, region.start, region.end, region.summit);
            match class {
                DiffClass::Unique1 => unique1.push(peak),
                _ => unique2.push(peak),
            }
        }
        let mut unique1 = PeakSet::new(unique1);
        let mut unique2 = PeakSet::new(unique2);

        let mut classified = unique1.clone();
        classified.extend(unique2.clone());
        let classified = OverlapIndex::new(&classified);
        let mut common = Vec::new();
        for p1 in peaks1.iter() {
            for (s2, e2) in index2.overlapping(&p1.chr, p1.start, p1.end) {
                let start = p1.start.max(s2);
                let end = p1.end.min(e2);
                if !classified.overlaps(&p1.chr, start, end) {
                    common.push(Peak::new(&p1.chr, start, end, start + (end - start) / 2));
                }
            }
        }
        common.sort_by(|a, b| (&a.chr, a.start, a.end).cmp(&(&b.chr, b.start, b.end)));
        common.dedup_by(|a, b| a.chr == b.chr && a.start == b.start && a.end == b.end);
        let mut common = PeakSet::new(common);

        let prefix = self.options.prefix.clone();
        let mut annotations = BTreeMap::new();
        for (class, set) in [
            (DiffClass::Unique1, &mut unique1),
            (DiffClass::Unique2, &mut unique2),
            (DiffClass::Common, &mut common),
        ] {
            set.assign_names(&format!("{}_{}", prefix, class.label()));
            let annotated = self.annotate(set, &comparison, &treat1, &treat2, rng)?;
            annotations.insert(class, annotated);
        }
        info!(
            "{} regions unique to condition 1, {} unique to condition 2, {} common",
            unique1.len(),
            unique2.len(),
            common.len()
        );

        Ok(DiffResult {
            unique1,
            unique2,
            common,
            annotations,
            peaks1,
            peaks2,
            comparison,
        })
    }

    fn condition_peaks(&self, treat: &StepTrack, control: &StepTrack, depth: f64) -> PeakSet {
        let track = ScoreTrack::from_pileups(treat, control, depth, depth);
        let normalized = track.normalize(Normalization::Raw, self.options.pseudocount);
        let params = CallerParams {
            cutoff: self.options.peak_cutoff,
            min_length: self.options.peak_min_length,
            max_gap: self.options.peak_max_gap,
        };
        normalized.score(ScoreMethod::LogLR).call_peaks(&params, None)
    }

    // fills summit_value and pileup, leaves q at 0
    fn annotate<R: Rng + ?Sized>(
        &mut self,
        set: &mut PeakSet,
        comparison: &StepTrack,
        treat1: &StepTrack,
        treat2: &StepTrack,
        rng: &mut R,
    ) -> Result<Vec<DiffAnnotation>, DiffError> {
        let mut annotated = Vec::with_capacity(set.len());
        let mut peaks: Vec<Peak> = set.iter().cloned().collect();
        for peak in peaks.iter_mut() {
            let t1 = treat1.value_at(&peak.chr, peak.summit);
            let t2 = treat2.value_at(&peak.chr, peak.summit);
            let log_lr = comparison.value_at(&peak.chr, peak.summit);
            let gfold = self.gfold.get(t1.round() as u64, t2.round() as u64, rng)?;
            peak.summit_value = log_lr;
            peak.pileup = t1;
            peak.fold_enrichment = gfold;
            peak.neglog10_qvalue = 0.0;
            annotated.push(DiffAnnotation {
                log_lr,
                treat1: t1,
                treat2: t2,
                gfold,
            });
        }
        *set = PeakSet::new(peaks);
        Ok(annotated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rstest::*;

    use peakrs_signal::bedgraph::from_intervals;

    #[rstest]
    #[case(DepthScaling::ToSmaller, 10.0, 5.0, (0.5, 1.0))]
    #[case(DepthScaling::ToSmaller, 5.0, 10.0, (1.0, 0.5))]
    #[case(DepthScaling::ToLarger, 10.0, 5.0, (1.0, 2.0))]
    #[case(DepthScaling::ToLarger, 5.0, 5.0, (1.0, 1.0))]
    fn test_depth_scaling(
        #[case] scaling: DepthScaling,
        #[case] d1: f64,
        #[case] d2: f64,
        #[case] expected: (f64, f64),
    ) {
        assert_eq!(scaling.factors(d1, d2), expected);
    }

    #[rstest]
    fn test_validate_rejects_zero_pseudocount() {
        let options = DiffOptions {
            pseudocount: 0.0,
            ..Default::default()
        };
        assert!(matches!(DiffEngine::new(options), Err(DiffError::InvalidOptions(_))));
    }

    #[rstest]
    fn test_no_common_chromosomes() {
        let a = from_intervals([("chr1", 0, 100, 1.0)], 0.0).unwrap();
        let b = from_intervals([("chr2", 0, 100, 1.0)], 0.0).unwrap();
        let input = DiffInput {
            treat1: &a,
            control1: &a,
            treat2: &b,
            control2: &b,
            depth1: 1.0,
            depth2: 1.0,
        };
        let mut engine = DiffEngine::new(DiffOptions::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            engine.run(&input, None, &mut rng),
            Err(DiffError::NoCommonChromosomes)
        ));
    }
}
