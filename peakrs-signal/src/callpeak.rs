//! The peak-calling pipeline, from alignments to named peaks.
//!
//! 1. duplicate filtering
//! 2. fragment length, from the strand model, `extsize` or the fragments
//! 3. depth scaling of the deeper sample down (or the shallower one up)
//! 4. treatment pileup and local lambda
//! 5. scoring against the lambda and threshold calling

use std::fmt::{self, Display};
use std::str::FromStr;

use log::{debug, info, warn};

use peakrs_core::models::{Alignments, BroadPeakSet, PeakSet};
use peakrs_stats::max_dup_reads;

use crate::bedgraph::{ChromRuns, StepTrack};
use crate::caller::{BroadParams, CallerParams};
use crate::errors::{CallPeakError, ModelError};
use crate::model::{ModelOptions, ModelResult, PeakModel};
use crate::pileup::{
    pileup, pileup_fragments, pileup_fragments_with_multiple_extensions,
    pileup_with_multiple_extensions,
};
use crate::score_track::{Normalization, ScoreMethod, ScoreTrack};

const DUP_P_TAIL: f64 = 1e-5;

/// How many reads may share one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DupPolicy {
    /// The binomial cap for the sample's depth and genome size.
    #[default]
    Auto,
    /// Keep everything.
    All,
    Max(u64),
}

impl FromStr for DupPolicy {
    type Err = CallPeakError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(DupPolicy::Auto),
            "all" => Ok(DupPolicy::All),
            n => n
                .parse::<u64>()
                .ok()
                .filter(|n| *n > 0)
                .map(DupPolicy::Max)
                .ok_or_else(|| {
                    CallPeakError::InvalidOptions(format!(
                        "duplicate policy must be auto, all or a positive integer, got '{}'",
                        s
                    ))
                }),
        }
    }
}

impl Display for DupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DupPolicy::Auto => write!(f, "auto"),
            DupPolicy::All => write!(f, "all"),
            DupPolicy::Max(n) => write!(f, "{}", n),
        }
    }
}

impl DupPolicy {
    /// The cap for a sample of `total` reads, `None` when nothing is removed.
    pub fn max_dup(&self, genome_size: f64, total: u64) -> Option<u64> {
        match self {
            DupPolicy::Auto => Some(max_dup_reads(genome_size, total, DUP_P_TAIL)),
            DupPolicy::All => None,
            DupPolicy::Max(n) => Some(*n),
        }
    }
}

/// Significance threshold, as a plain p or q value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cutoff {
    QValue(f64),
    PValue(f64),
}

impl Default for Cutoff {
    fn default() -> Self {
        Cutoff::QValue(0.05)
    }
}

impl Cutoff {
    pub fn value(&self) -> f64 {
        match self {
            Cutoff::QValue(v) | Cutoff::PValue(v) => *v,
        }
    }

    pub fn method(&self) -> ScoreMethod {
        match self {
            Cutoff::QValue(_) => ScoreMethod::QPois,
            Cutoff::PValue(_) => ScoreMethod::PPois,
        }
    }

    /// The `-log10` score the threshold corresponds to.
    pub fn score(&self) -> f64 {
        -self.value().log10()
    }

    fn with_value(&self, value: f64) -> Cutoff {
        match self {
            Cutoff::QValue(_) => Cutoff::QValue(value),
            Cutoff::PValue(_) => Cutoff::PValue(value),
        }
    }
}

/// Which sample is rescaled when depths differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleTo {
    /// The deeper sample is scaled down.
    #[default]
    Small,
    /// The shallower sample is scaled up.
    Large,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallPeakOptions {
    pub name: String,
    pub genome_size: f64,
    pub keep_dup: DupPolicy,
    pub cutoff: Cutoff,
    pub model: ModelOptions,
    /// Skip the model and extend every read to `extsize`.
    pub nomodel: bool,
    /// Fail instead of falling back to `extsize` when the model cannot be built.
    pub require_model: bool,
    pub extsize: u32,
    pub slocal: u32,
    pub llocal: u32,
    /// Use the genome background as the only lambda.
    pub nolambda: bool,
    pub scale_to: ScaleTo,
    pub broad: bool,
    /// Loose cutoff of broad calling, same kind as `cutoff`.
    pub broad_cutoff: f64,
    pub call_summits: bool,
    /// Defaults to `d`.
    pub min_length: Option<u32>,
    /// Defaults to the tag width.
    pub max_gap: Option<u32>,
    pub pseudocount: f64,
}

impl Default for CallPeakOptions {
    fn default() -> Self {
        CallPeakOptions {
            name: "NA".to_string(),
            genome_size: 2.7e9,
            keep_dup: DupPolicy::Auto,
            cutoff: Cutoff::default(),
            model: ModelOptions::default(),
            nomodel: false,
            require_model: false,
            extsize: 200,
            slocal: 1000,
            llocal: 10000,
            nolambda: false,
            scale_to: ScaleTo::Small,
            broad: false,
            broad_cutoff: 0.1,
            call_summits: false,
            min_length: None,
            max_gap: None,
            pseudocount: 1.0,
        }
    }
}

impl CallPeakOptions {
    ///
    /// Check the options before any input is read.
    ///
    pub fn validate(&self) -> Result<(), CallPeakError> {
        let invalid = |msg: String| Err(CallPeakError::InvalidOptions(msg));
        if !(self.genome_size > 0.0) {
            return invalid(format!("genome size must be positive, got {}", self.genome_size));
        }
        let cutoff = self.cutoff.value();
        if !(cutoff > 0.0 && cutoff <= 1.0) {
            return invalid(format!("cutoff must lie in (0, 1], got {}", cutoff));
        }
        if self.broad && self.call_summits {
            return invalid("broad calling and subpeak summits cannot be combined".to_string());
        }
        if self.broad && !(self.broad_cutoff >= cutoff && self.broad_cutoff <= 1.0) {
            return invalid(format!(
                "broad cutoff {} must lie between the cutoff {} and 1",
                self.broad_cutoff, cutoff
            ));
        }
        if self.extsize == 0 {
            return invalid("extsize must be positive".to_string());
        }
        if self.slocal > 0 && self.llocal > 0 && self.slocal > self.llocal {
            return invalid(format!(
                "slocal {} must not exceed llocal {}",
                self.slocal, self.llocal
            ));
        }
        if !(self.pseudocount >= 0.0) {
            return invalid(format!("pseudocount must not be negative, got {}", self.pseudocount));
        }
        if !self.nomodel {
            let model = ModelOptions {
                genome_size: self.genome_size,
                ..self.model.clone()
            };
            model.validate()?;
        }
        Ok(())
    }

    fn broad_cutoff(&self) -> Cutoff {
        self.cutoff.with_value(self.broad_cutoff)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CalledPeaks {
    Narrow(PeakSet),
    Broad(BroadPeakSet),
}

impl CalledPeaks {
    pub fn len(&self) -> usize {
        match self {
            CalledPeaks::Narrow(peaks) => peaks.len(),
            CalledPeaks::Broad(peaks) => peaks.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct CallPeakResult {
    pub d: u32,
    /// Present when the strand model was built.
    pub model: Option<ModelResult>,
    pub treat_total: u64,
    pub control_total: Option<u64>,
    pub treat_duplicates: u64,
    pub control_duplicates: u64,
    pub treat_scale: f64,
    pub control_scale: f64,
    pub lambda_bg: f64,
    pub min_length: u32,
    pub max_gap: u32,
    pub treat_pileup: StepTrack,
    pub control_lambda: StepTrack,
    pub peaks: CalledPeaks,
}

impl CallPeakResult {
    ///
    /// Run description for the head of the XLS table.
    ///
    pub fn comments(&self, options: &CallPeakOptions) -> Vec<String> {
        let mut lines = vec![
            format!("name = {}", options.name),
            format!("effective genome size = {:.2e}", options.genome_size),
            format!("duplicates kept = {}", options.keep_dup),
            match options.cutoff {
                Cutoff::QValue(q) => format!("qvalue cutoff = {:.2e}", q),
                Cutoff::PValue(p) => format!("pvalue cutoff = {:.2e}", p),
            },
        ];
        if options.broad {
            lines.push(format!("broad region cutoff = {:.2e}", options.broad_cutoff));
        }
        lines.push(format!("total tags in treatment: {}", self.treat_total));
        lines.push(format!("redundant tags removed from treatment: {}", self.treat_duplicates));
        if let Some(control) = self.control_total {
            lines.push(format!("total tags in control: {}", control));
            lines.push(format!("redundant tags removed from control: {}", self.control_duplicates));
        }
        lines.push(format!("d = {}", self.d));
        if let Some(model) = &self.model {
            if !model.alternative_d.is_empty() {
                let alternatives: Vec<String> = model.alternative_d.iter().map(|d| d.to_string()).collect();
                lines.push(format!("alternative fragment length(s) may be {}", alternatives.join(",")));
            }
            lines.push(format!("paired peaks = {}", model.num_pairs()));
        }
        lines.push(format!("treatment scale = {:.5}, control scale = {:.5}", self.treat_scale, self.control_scale));
        lines.push(format!("genome background lambda = {:.5}", self.lambda_bg));
        lines.push(format!("min length = {}, max gap = {}", self.min_length, self.max_gap));
        lines
    }
}

fn dedup(alignments: &mut Alignments, policy: DupPolicy, genome_size: f64, label: &str) -> Result<u64, CallPeakError> {
    let total = alignments.total()?;
    let Some(cap) = policy.max_dup(genome_size, total) else {
        info!("Keeping all duplicate {} tags", label);
        return Ok(0);
    };
    let removed = alignments.filter_dup(cap)?;
    info!(
        "{} {} tags, {} kept at most {} per position",
        total,
        label,
        total - removed,
        cap
    );
    Ok(removed)
}

fn fragment_length(treat: &Alignments, options: &CallPeakOptions) -> Result<(u32, Option<ModelResult>), CallPeakError> {
    let track = match treat {
        Alignments::Paired(fragments) => {
            let d = fragments.mean_fragment_length()?.round() as u32;
            info!("Mean fragment length d = {}", d);
            return Ok((d, None));
        }
        Alignments::Single(track) => track,
    };
    if options.nomodel {
        info!("Skipping the model, d = extsize = {}", options.extsize);
        return Ok((options.extsize, None));
    }
    let model_options = ModelOptions {
        genome_size: options.genome_size,
        ..options.model.clone()
    };
    match PeakModel::build(track, &model_options) {
        Ok(model) => Ok((model.d, Some(model))),
        Err(e @ (ModelError::NotEnoughPairs { .. } | ModelError::NoCorrelationPeak { .. }))
            if !options.require_model =>
        {
            warn!("{}; falling back to extsize = {}", e, options.extsize);
            Ok((options.extsize, None))
        }
        Err(e) => Err(e.into()),
    }
}

///
/// `(treat_scale, control_scale)` bringing both samples to one depth.
///
pub fn depth_scales(treat_total: u64, control_total: u64, scale_to: ScaleTo) -> (f64, f64) {
    if treat_total == 0 || control_total == 0 {
        return (1.0, 1.0);
    }
    let t = treat_total as f64;
    let c = control_total as f64;
    match scale_to {
        ScaleTo::Small if t > c => (c / t, 1.0),
        ScaleTo::Small => (1.0, t / c),
        ScaleTo::Large if t > c => (1.0, t / c),
        ScaleTo::Large => (c / t, 1.0),
    }
}

///
/// Maximum over windows of `scale * d / w` times the reads in a `w` window,
/// floored at `baseline`. Single-end windows are centred on the reads; for
/// fragments the `d` window is the fragment itself.
///
fn local_lambda(
    alignments: &Alignments,
    windows: &[u32],
    d: u32,
    scale: f64,
    baseline: f64,
) -> Result<StepTrack, CallPeakError> {
    let scales: Vec<f64> = windows.iter().map(|w| scale * d as f64 / *w as f64).collect();
    let track = match alignments {
        Alignments::Single(reads) => {
            pileup_with_multiple_extensions(reads, windows, &scales, baseline, false, false)?
        }
        Alignments::Paired(fragments) => {
            let widths: Vec<u32> = windows.iter().map(|w| if *w == d { 0 } else { *w }).collect();
            pileup_fragments_with_multiple_extensions(fragments, &widths, &scales, baseline)?
        }
    };
    Ok(track)
}

// constant lambda over the treatment domain
fn flat_lambda(treat_pileup: &StepTrack, lambda_bg: f64) -> StepTrack {
    let mut track = StepTrack::new(lambda_bg);
    for (chrom, end) in treat_pileup.chrom_ends() {
        let mut runs = ChromRuns::default();
        runs.push(end, lambda_bg);
        track.insert_chrom(&chrom, runs);
    }
    track
}

///
/// Call peaks on a treatment, against a control when one is given.
///
/// Both inputs must be finalized. Duplicates are removed in place.
///
pub fn run_callpeak(
    treat: &mut Alignments,
    mut control: Option<&mut Alignments>,
    options: &CallPeakOptions,
) -> Result<CallPeakResult, CallPeakError> {
    options.validate()?;

    let common = match control.as_deref() {
        Some(control) => {
            let common = treat.common_chromosomes(control);
            if common.is_empty() {
                return Err(CallPeakError::NoCommonChromosomes {
                    treat: treat.chromosomes().iter().map(|c| c.to_string()).collect(),
                    control: control.chromosomes().iter().map(|c| c.to_string()).collect(),
                });
            }
            common
        }
        None => treat.chromosomes().iter().map(|c| c.to_string()).collect(),
    };
    debug!("{} chromosomes shared by treatment and control", common.len());

    let treat_duplicates = dedup(treat, options.keep_dup, options.genome_size, "treatment")?;
    let control_duplicates = match control.as_deref_mut() {
        Some(control) => dedup(control, options.keep_dup, options.genome_size, "control")?,
        None => 0,
    };

    let (d, model) = fragment_length(treat, options)?;
    let tag_width = treat.tag_width()?;

    let treat_total = treat.total()?;
    let control_total = match control.as_deref() {
        Some(control) => Some(control.total()?),
        None => None,
    };
    let (treat_scale, control_scale) = match control_total {
        Some(c) => depth_scales(treat_total, c, options.scale_to),
        None => (1.0, 1.0),
    };
    info!("Scaling treatment by {:.5} and control by {:.5}", treat_scale, control_scale);

    let mut treat_pileup = match &*treat {
        Alignments::Single(reads) => pileup(reads, d, treat_scale, true, false)?,
        Alignments::Paired(fragments) => pileup_fragments(fragments, treat_scale)?,
    };

    let covered = match &*treat {
        Alignments::Single(_) => d as f64 * treat_total as f64,
        Alignments::Paired(_) => treat.length()? as f64,
    };
    let lambda_bg = covered * treat_scale / options.genome_size;
    info!("Genome background lambda {:.5}", lambda_bg);

    let mut control_lambda = if options.nolambda {
        flat_lambda(&treat_pileup, lambda_bg)
    } else {
        match control.as_deref() {
            Some(control) => {
                let windows: Vec<u32> = [d, options.slocal, options.llocal]
                    .into_iter()
                    .filter(|w| *w > 0)
                    .collect();
                local_lambda(control, &windows, d, control_scale, lambda_bg)?
            }
            None if options.llocal > 0 => {
                local_lambda(treat, &[options.llocal], d, treat_scale, lambda_bg)?
            }
            None => flat_lambda(&treat_pileup, lambda_bg),
        }
    };

    treat_pileup.retain_chroms(&common);
    control_lambda.retain_chroms(&common);
    let mut domain = treat_pileup.chrom_ends();
    for (chrom, end) in control_lambda.chrom_ends() {
        let current = domain.entry(chrom).or_insert(0);
        *current = (*current).max(end);
    }
    treat_pileup.pad_to(&domain);
    control_lambda.pad_to(&domain);

    let score_track = ScoreTrack::from_pileups(
        &treat_pileup,
        &control_lambda,
        treat_total as f64 * treat_scale,
        control_total.unwrap_or(treat_total) as f64 * control_scale,
    );
    debug!("Score track holds {} runs", score_track.num_runs());
    let normalized = score_track.normalize(Normalization::Raw, options.pseudocount);
    let scored = normalized.score(options.cutoff.method());

    let min_length = options.min_length.unwrap_or(d);
    let max_gap = options.max_gap.unwrap_or(tag_width);
    let peaks = if options.broad {
        let params = BroadParams {
            lvl1_cutoff: options.cutoff.score(),
            lvl2_cutoff: options.broad_cutoff().score(),
            min_length,
            lvl1_max_gap: max_gap,
            lvl2_max_gap: 4 * max_gap,
        };
        let mut peaks = scored.call_broad_peaks(&params);
        peaks.assign_names(&format!("{}_peak", options.name));
        CalledPeaks::Broad(peaks)
    } else {
        let params = CallerParams {
            cutoff: options.cutoff.score(),
            min_length,
            max_gap,
        };
        let window = options.call_summits.then_some(d as usize);
        let mut peaks = scored.call_peaks(&params, window);
        peaks.assign_names(&format!("{}_peak", options.name));
        CalledPeaks::Narrow(peaks)
    };
    info!("Called {} peaks", peaks.len());

    Ok(CallPeakResult {
        d,
        model,
        treat_total,
        control_total,
        treat_duplicates,
        control_duplicates,
        treat_scale,
        control_scale,
        lambda_bg,
        min_length,
        max_gap,
        treat_pileup,
        control_lambda,
        peaks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    use peakrs_core::models::{ReadTrack, Strand};

    #[rstest]
    #[case("auto", DupPolicy::Auto)]
    #[case("all", DupPolicy::All)]
    #[case("3", DupPolicy::Max(3))]
    fn test_dup_policy_parse(#[case] input: &str, #[case] expected: DupPolicy) {
        assert_eq!(input.parse::<DupPolicy>().unwrap(), expected);
        assert_eq!(expected.to_string(), input);
    }

    #[rstest]
    #[case("0")]
    #[case("some")]
    fn test_dup_policy_rejects(#[case] input: &str) {
        assert!(input.parse::<DupPolicy>().is_err());
    }

    #[rstest]
    #[case(100, 50, ScaleTo::Small, (0.5, 1.0))]
    #[case(50, 100, ScaleTo::Small, (1.0, 0.5))]
    #[case(100, 50, ScaleTo::Large, (1.0, 2.0))]
    #[case(50, 100, ScaleTo::Large, (2.0, 1.0))]
    #[case(0, 100, ScaleTo::Small, (1.0, 1.0))]
    fn test_depth_scales(
        #[case] t: u64,
        #[case] c: u64,
        #[case] scale_to: ScaleTo,
        #[case] expected: (f64, f64),
    ) {
        assert_eq!(depth_scales(t, c, scale_to), expected);
    }

    #[rstest]
    fn test_cutoff_score() {
        assert_eq!(Cutoff::PValue(0.01).score(), 2.0);
        assert_eq!(Cutoff::QValue(0.05).method(), ScoreMethod::QPois);
    }

    #[rstest]
    fn test_validate_rejects_broad_summits() {
        let options = CallPeakOptions {
            broad: true,
            call_summits: true,
            ..Default::default()
        };
        assert!(matches!(options.validate(), Err(CallPeakError::InvalidOptions(_))));
    }

    #[rstest]
    fn test_validate_rejects_inverted_mfold() {
        let options = CallPeakOptions {
            model: ModelOptions {
                mfold: (50.0, 5.0),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            options.validate(),
            Err(CallPeakError::Model(ModelError::InvalidOptions(_)))
        ));
    }

    #[rstest]
    fn test_no_common_chromosomes() {
        let mut treat = ReadTrack::new(36);
        treat.add("chr1", 10, Strand::Plus);
        treat.finalize();
        let mut control = ReadTrack::new(36);
        control.add("chr2", 10, Strand::Plus);
        control.finalize();

        let mut treat = Alignments::Single(treat);
        let mut control = Alignments::Single(control);
        let err = run_callpeak(&mut treat, Some(&mut control), &CallPeakOptions::default()).unwrap_err();
        match err {
            CallPeakError::NoCommonChromosomes { treat, control } => {
                assert_eq!(treat, vec!["chr1".to_string()]);
                assert_eq!(control, vec!["chr2".to_string()]);
            }
            other => panic!("unexpected error {}", other),
        }
    }

    #[rstest]
    fn test_flat_lambda_covers_treatment() {
        let mut treat = StepTrack::new(0.0);
        treat.add("chr1", 0, 500, 2.0).unwrap();
        let lambda = flat_lambda(&treat, 0.25);
        assert_eq!(lambda.chrom("chr1").unwrap().runs().collect::<Vec<_>>(), vec![(0, 500, 0.25)]);
    }
}
