use std::path::Path;

use anyhow::{Context, Result};
use clap::ArgMatches;
use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;

use peakrs_core::io::load_peaks;
use peakrs_core::utils::get_dynamic_reader;
use peakrs_diff::{DiffEngine, DiffInput, DiffOptions};
use peakrs_signal::callpeak::{CallPeakOptions, CallPeakResult, DupPolicy, run_callpeak};
use peakrs_stats::GfoldTable;

use crate::bdgdiff::handlers::{depth_scaling, write_diff_outputs};
use crate::callpeak::handlers::load_samples;
use crate::common::{arg, genome_size};

// pileup and local lambda of one condition
fn condition_tracks(
    matches: &ArgMatches,
    treatment: &str,
    control: &str,
    options: &CallPeakOptions,
) -> Result<CallPeakResult> {
    let (mut treat, mut ctrl) = load_samples(matches, treatment, control)?;
    run_callpeak(&mut treat, ctrl.as_mut(), options)
        .with_context(|| format!("Failed to build the --{} pileup", treatment))
}

pub fn run_diffpeak(matches: &ArgMatches) -> Result<()> {
    let prefix = arg::<String>(matches, "o-prefix")?;
    let min_length = *arg::<u32>(matches, "min-length")?;
    let max_gap = *arg::<u32>(matches, "max-gap")?;
    let diff_cutoff = *arg::<f64>(matches, "diff-cutoff")?;
    let options = DiffOptions {
        scaling: depth_scaling(matches)?,
        peak_cutoff: *arg::<f64>(matches, "peak-cutoff")?,
        peak_min_length: min_length,
        peak_max_gap: max_gap,
        diff_cutoff,
        diff_min_length: min_length,
        diff_max_gap: max_gap,
        prefix: prefix.clone(),
        ..Default::default()
    };
    let mut engine = DiffEngine::new(options)?;
    if let Some(path) = matches.get_one::<String>("gfold-table") {
        let table = GfoldTable::from_reader(get_dynamic_reader(Path::new(path))?)
            .with_context(|| format!("Failed to parse gfold table {}", path))?;
        engine = engine.with_gfold_table(table);
    }

    let keep_dup: DupPolicy = arg::<String>(matches, "keep-dup")?.parse()?;
    let pileup_options = CallPeakOptions {
        genome_size: genome_size(matches)?,
        keep_dup,
        nomodel: matches.get_flag("nomodel"),
        extsize: *arg::<u32>(matches, "extsize")?,
        ..Default::default()
    };
    pileup_options.validate()?;

    let cond1 = condition_tracks(matches, "t1", "c1", &pileup_options)?;
    let cond2 = condition_tracks(matches, "t2", "c2", &pileup_options)?;
    info!("Fragment lengths: condition 1 d = {}, condition 2 d = {}", cond1.d, cond2.d);

    let peaks = match (
        matches.get_one::<String>("peaks1"),
        matches.get_one::<String>("peaks2"),
    ) {
        (Some(p1), Some(p2)) => Some((load_peaks(Path::new(p1))?, load_peaks(Path::new(p2))?)),
        _ => None,
    };

    let input = DiffInput {
        treat1: &cond1.treat_pileup,
        control1: &cond1.control_lambda,
        treat2: &cond2.treat_pileup,
        control2: &cond2.control_lambda,
        depth1: cond1.treat_total as f64 * cond1.treat_scale,
        depth2: cond2.treat_total as f64 * cond2.treat_scale,
    };
    let mut rng = StdRng::seed_from_u64(*arg::<u64>(matches, "seed")?);
    let result = engine
        .run(&input, peaks, &mut rng)
        .context("Differential calling failed")?;

    let comments = vec![
        format!("condition 1: {} tags, d = {}", cond1.treat_total, cond1.d),
        format!("condition 2: {} tags, d = {}", cond2.treat_total, cond2.d),
        format!("differential cutoff = {}", diff_cutoff),
        format!("min length = {}, max gap = {}", min_length, max_gap),
    ];
    write_diff_outputs(arg::<String>(matches, "outdir")?, prefix, &result, &comments)
}
