use anyhow::{Context, Result};
use clap::ArgMatches;
use rand::SeedableRng;
use rand::rngs::StdRng;

use peakrs_diff::{
    DepthScaling, DiffClass, DiffEngine, DiffInput, DiffOptions, DiffResult, write_diff_bed,
    write_diff_xls,
};

use crate::common::{arg, output_path, read_track, write_to};

pub fn depth_scaling(matches: &ArgMatches) -> Result<DepthScaling> {
    Ok(match arg::<String>(matches, "scale-to")?.as_str() {
        "large" => DepthScaling::ToLarger,
        _ => DepthScaling::ToSmaller,
    })
}

///
/// `{stem}_cond1.bed`, `{stem}_cond2.bed`, `{stem}_common.bed` and the
/// combined `{stem}_diff.xls`.
///
pub fn write_diff_outputs(outdir: &str, stem: &str, result: &DiffResult, comments: &[String]) -> Result<()> {
    for class in [DiffClass::Unique1, DiffClass::Unique2, DiffClass::Common] {
        let path = output_path(outdir, &format!("{}_{}.bed", stem, class.label()))?;
        write_to(&path, |w| {
            write_diff_bed(w, result.set(class), result.annotations(class))
        })?;
    }
    write_to(&output_path(outdir, &format!("{}_diff.xls", stem))?, |w| {
        write_diff_xls(w, result, comments)
    })
}

pub fn run_bdgdiff(matches: &ArgMatches) -> Result<()> {
    let cutoff = *arg::<f64>(matches, "cutoff")?;
    let min_length = *arg::<u32>(matches, "min-length")?;
    let max_gap = *arg::<u32>(matches, "max-gap")?;
    let prefix = arg::<String>(matches, "o-prefix")?;
    let options = DiffOptions {
        scaling: depth_scaling(matches)?,
        peak_cutoff: cutoff,
        peak_min_length: min_length,
        peak_max_gap: max_gap,
        diff_cutoff: cutoff,
        diff_min_length: min_length,
        diff_max_gap: max_gap,
        prefix: prefix.clone(),
        ..Default::default()
    };
    let mut engine = DiffEngine::new(options)?;

    let treat1 = read_track(arg::<String>(matches, "t1")?, false)?;
    let control1 = read_track(arg::<String>(matches, "c1")?, false)?;
    let treat2 = read_track(arg::<String>(matches, "t2")?, false)?;
    let control2 = read_track(arg::<String>(matches, "c2")?, false)?;
    let input = DiffInput {
        treat1: &treat1,
        control1: &control1,
        treat2: &treat2,
        control2: &control2,
        depth1: *arg::<f64>(matches, "d1")?,
        depth2: *arg::<f64>(matches, "d2")?,
    };

    let mut rng = StdRng::seed_from_u64(*arg::<u64>(matches, "seed")?);
    let result = engine
        .run(&input, None, &mut rng)
        .context("Differential calling failed")?;

    let comments = vec![
        format!("cutoff = {}", cutoff),
        format!("min length = {}, max gap = {}", min_length, max_gap),
        format!("depth 1 = {}, depth 2 = {}", input.depth1, input.depth2),
    ];
    write_diff_outputs(
        arg::<String>(matches, "outdir")?,
        &format!("{}_c{}", prefix, cutoff),
        &result,
        &comments,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs::read_to_string;

    use pretty_assertions::assert_eq;
    use rstest::*;
    use tempfile::tempdir;

    use peakrs_signal::bedgraph::from_intervals;

    use crate::bdgdiff::cli::create_bdgdiff_cli;

    fn write_track(path: &std::path::Path, intervals: &[(u32, u32, f64)]) {
        let track = from_intervals(intervals.iter().map(|(s, e, v)| ("chr1", *s, *e, *v)), 0.0).unwrap();
        write_to(path, |w| track.write_bedgraph(w, None, None)).unwrap();
    }

    #[rstest]
    fn test_bdgdiff_end_to_end() {
        let dir = tempdir().unwrap();
        let path = |name: &str| dir.path().join(name);
        write_track(&path("t1.bdg"), &[(0, 1000, 1.0), (1000, 1500, 50.0), (1500, 5000, 1.0)]);
        write_track(&path("t2.bdg"), &[(0, 3000, 1.0), (3000, 3500, 50.0), (3500, 5000, 1.0)]);
        write_track(&path("c.bdg"), &[(0, 5000, 1.0)]);

        let outdir = dir.path().join("out");
        let (t1, t2, c) = (path("t1.bdg"), path("t2.bdg"), path("c.bdg"));
        let args = [
            "bdgdiff",
            "--t1", t1.to_str().unwrap(),
            "--t2", t2.to_str().unwrap(),
            "--c1", c.to_str().unwrap(),
            "--c2", c.to_str().unwrap(),
            "--outdir", outdir.to_str().unwrap(),
        ];
        let matches = create_bdgdiff_cli().try_get_matches_from(args).unwrap();
        run_bdgdiff(&matches).unwrap();

        let cond1 = read_to_string(outdir.join("diff_c3_cond1.bed")).unwrap();
        assert!(cond1.starts_with("chr1\t1000\t1500\tdiff_cond1_1\t"));
        let cond2 = read_to_string(outdir.join("diff_c3_cond2.bed")).unwrap();
        assert!(cond2.starts_with("chr1\t3000\t3500\tdiff_cond2_1\t"));
        let common = read_to_string(outdir.join("diff_c3_common.bed")).unwrap();
        assert_eq!(common, "");
    }
}
