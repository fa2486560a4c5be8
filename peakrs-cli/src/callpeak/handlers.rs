use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use log::info;

use peakrs_core::io::{
    PeakScore, write_broad_peak, write_broad_xls, write_gapped_peak, write_narrow_peak,
    write_summits_bed, write_xls,
};
use peakrs_core::models::Alignments;
use peakrs_signal::callpeak::{
    CallPeakOptions, CallPeakResult, CalledPeaks, Cutoff, DupPolicy, ScaleTo,
};
use peakrs_signal::model::ModelOptions;

use crate::common::{arg, genome_size, load_inputs, mfold, output_path, write_to};

///
/// Translate the parsed arguments into pipeline options.
///
pub fn callpeak_options(matches: &ArgMatches) -> Result<CallPeakOptions> {
    let genome_size = genome_size(matches)?;
    let cutoff = match (
        matches.get_one::<f64>("pvalue"),
        matches.get_one::<f64>("qvalue"),
    ) {
        (Some(p), _) => Cutoff::PValue(*p),
        (None, Some(q)) => Cutoff::QValue(*q),
        (None, None) => Cutoff::default(),
    };
    let keep_dup: DupPolicy = arg::<String>(matches, "keep-dup")?.parse()?;
    let scale_to = match arg::<String>(matches, "scale-to")?.as_str() {
        "large" => ScaleTo::Large,
        _ => ScaleTo::Small,
    };

    Ok(CallPeakOptions {
        name: arg::<String>(matches, "name")?.clone(),
        genome_size,
        keep_dup,
        cutoff,
        model: ModelOptions {
            bandwidth: *arg::<u32>(matches, "bw")?,
            mfold: mfold(matches)?,
            genome_size,
            d_min: *arg::<u32>(matches, "d-min")?,
            ..Default::default()
        },
        nomodel: matches.get_flag("nomodel"),
        require_model: matches.get_flag("require-model"),
        extsize: *arg::<u32>(matches, "extsize")?,
        slocal: *arg::<u32>(matches, "slocal")?,
        llocal: *arg::<u32>(matches, "llocal")?,
        nolambda: matches.get_flag("nolambda"),
        scale_to,
        broad: matches.get_flag("broad"),
        broad_cutoff: *arg::<f64>(matches, "broad-cutoff")?,
        call_summits: matches.get_flag("call-summits"),
        min_length: matches.get_one::<u32>("min-length").copied(),
        max_gap: matches.get_one::<u32>("max-gap").copied(),
        ..Default::default()
    })
}

/// Treatment and, when given, control reads in one format.
pub fn load_samples(
    matches: &ArgMatches,
    treatment: &str,
    control: &str,
) -> Result<(Alignments, Option<Alignments>)> {
    let treat = load_inputs(matches, treatment)?;
    let loaded = match matches.get_many::<String>(control) {
        Some(_) => Some(load_inputs(matches, control)?),
        None => None,
    };
    if let Some(c) = &loaded {
        if c.is_paired() != treat.is_paired() {
            bail!("--{} and --{} must be in the same format", treatment, control);
        }
    }
    Ok((treat, loaded))
}

pub fn run_callpeak(matches: &ArgMatches) -> Result<()> {
    let options = callpeak_options(matches)?;
    options.validate()?;
    let outdir = arg::<String>(matches, "outdir")?;

    let (mut treat, mut control) = load_samples(matches, "treatment", "control")?;
    let result = peakrs_signal::callpeak::run_callpeak(&mut treat, control.as_mut(), &options)
        .context("Peak calling failed")?;

    write_peaks(outdir, &options, &result)?;

    if matches.get_flag("bdg") {
        let treat_name = format!("{}_treat_pileup", options.name);
        write_to(&output_path(outdir, &format!("{}.bdg", treat_name))?, |w| {
            result
                .treat_pileup
                .write_bedgraph(w, Some(treat_name.as_str()), Some("treatment pileup"))
        })?;
        let control_name = format!("{}_control_lambda", options.name);
        write_to(&output_path(outdir, &format!("{}.bdg", control_name))?, |w| {
            result
                .control_lambda
                .write_bedgraph(w, Some(control_name.as_str()), Some("local lambda"))
        })?;
    }

    if let Some(model) = &result.model {
        write_to(&output_path(outdir, &format!("{}_model.tsv", options.name))?, |w| {
            model.write_tsv(w)
        })?;
    }

    info!("Done, {} peaks written to {}", result.peaks.len(), outdir);
    Ok(())
}

fn write_peaks(outdir: &str, options: &CallPeakOptions, result: &CallPeakResult) -> Result<()> {
    let name = &options.name;
    let comments = result.comments(options);
    let score = match options.cutoff {
        Cutoff::QValue(_) => PeakScore::QValue,
        Cutoff::PValue(_) => PeakScore::PValue,
    };

    match &result.peaks {
        CalledPeaks::Narrow(peaks) => {
            write_to(&output_path(outdir, &format!("{}_peaks.narrowPeak", name))?, |w| {
                write_narrow_peak(w, peaks, score)
            })?;
            write_to(&output_path(outdir, &format!("{}_summits.bed", name))?, |w| {
                write_summits_bed(w, peaks, score)
            })?;
            write_to(&output_path(outdir, &format!("{}_peaks.xls", name))?, |w| {
                write_xls(w, peaks, &comments)
            })?;
        }
        CalledPeaks::Broad(peaks) => {
            write_to(&output_path(outdir, &format!("{}_peaks.broadPeak", name))?, |w| {
                write_broad_peak(w, peaks, score)
            })?;
            write_to(&output_path(outdir, &format!("{}_peaks.gappedPeak", name))?, |w| {
                write_gapped_peak(w, peaks, score)
            })?;
            write_to(&output_path(outdir, &format!("{}_peaks.xls", name))?, |w| {
                write_broad_xls(w, peaks, &comments)
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    use crate::callpeak::cli::create_callpeak_cli;

    fn parse(args: &[&str]) -> ArgMatches {
        let mut full = vec!["callpeak", "-t", "treat.bed"];
        full.extend_from_slice(args);
        create_callpeak_cli().try_get_matches_from(full).unwrap()
    }

    #[rstest]
    fn test_defaults() {
        let options = callpeak_options(&parse(&[])).unwrap();
        assert_eq!(options.genome_size, 2.7e9);
        assert_eq!(options.cutoff, Cutoff::QValue(0.05));
        assert_eq!(options.keep_dup, DupPolicy::Max(1));
        assert_eq!(options.model.mfold, (5.0, 50.0));
        assert_eq!(options.min_length, None);
    }

    #[rstest]
    fn test_overrides() {
        let options = callpeak_options(&parse(&[
            "-g", "mm", "-p", "0.01", "--keep-dup", "all", "--nomodel", "--extsize", "147",
            "--broad", "--scale-to", "large", "-m", "10", "30",
        ]))
        .unwrap();
        assert_eq!(options.genome_size, 1.87e9);
        assert_eq!(options.cutoff, Cutoff::PValue(0.01));
        assert_eq!(options.keep_dup, DupPolicy::All);
        assert!(options.nomodel && options.broad);
        assert_eq!(options.extsize, 147);
        assert_eq!(options.scale_to, ScaleTo::Large);
        assert_eq!(options.model.mfold, (10.0, 30.0));
    }

    #[rstest]
    #[case(&["-p", "0.01", "-q", "0.05"])]
    #[case(&["--broad", "--call-summits"])]
    fn test_conflicting_arguments(#[case] args: &[&str]) {
        let mut full = vec!["callpeak", "-t", "treat.bed"];
        full.extend_from_slice(args);
        assert!(create_callpeak_cli().try_get_matches_from(full).is_err());
    }

    #[rstest]
    fn test_bad_keep_dup() {
        assert!(callpeak_options(&parse(&["--keep-dup", "many"])).is_err());
    }
}
