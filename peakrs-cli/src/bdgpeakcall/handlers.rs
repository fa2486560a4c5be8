use std::path::Path;

use anyhow::Result;
use clap::ArgMatches;
use log::info;

use peakrs_core::io::{PeakScore, write_narrow_peak};
use peakrs_core::models::PeakSet;

use crate::common::{arg, output_path, read_track, write_to};

/// Name of an output derived from the input file and a suffix.
pub fn derived_name(input: &str, suffix: &str) -> String {
    let stem = Path::new(input)
        .file_name()
        .and_then(|f| f.to_str())
        .map(|f| f.trim_end_matches(".gz"))
        .map(|f| f.trim_end_matches(".bdg").trim_end_matches(".bedGraph"))
        .filter(|f| !f.is_empty() && *f != "-")
        .unwrap_or("stdin");
    format!("{}_{}", stem, suffix)
}

///
/// A bedGraph carries no significance, so fold enrichment holds the summit
/// score and both significance columns are -1.
///
pub fn annotate_score_peaks(peaks: &mut PeakSet, prefix: &str) {
    for peak in peaks.peaks.iter_mut() {
        peak.fold_enrichment = peak.summit_value;
        peak.neglog10_pvalue = -1.0;
        peak.neglog10_qvalue = -1.0;
    }
    peaks.assign_names(prefix);
}

pub fn run_bdgpeakcall(matches: &ArgMatches) -> Result<()> {
    let input = arg::<String>(matches, "input")?;
    let cutoff = *arg::<f64>(matches, "cutoff")?;
    let min_length = *arg::<u32>(matches, "min-length")?;
    let max_gap = *arg::<u32>(matches, "max-gap")?;

    let track = read_track(input, true)?;
    let mut peaks = track.call_regions(cutoff, min_length, max_gap, matches.get_flag("call-summits"));
    info!("{} peaks at cutoff {}", peaks.len(), cutoff);

    let ofile = match matches.get_one::<String>("ofile") {
        Some(name) => name.clone(),
        None => derived_name(input, &format!("c{}_l{}_g{}_peaks.narrowPeak", cutoff, min_length, max_gap)),
    };
    annotate_score_peaks(&mut peaks, "peak");
    write_to(&output_path(arg::<String>(matches, "outdir")?, &ofile)?, |w| {
        write_narrow_peak(w, &peaks, PeakScore::SummitValue)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    use peakrs_signal::bedgraph::from_intervals;

    #[rstest]
    #[case("data/sample_FE.bdg", "sample_FE_peaks")]
    #[case("sample.bdg.gz", "sample_peaks")]
    #[case("-", "stdin_peaks")]
    fn test_derived_name(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(derived_name(input, "peaks"), expected);
    }

    #[rstest]
    fn test_annotate_score_peaks() {
        let track = from_intervals(
            [("chr1", 0, 100, 0.0), ("chr1", 100, 400, 8.0), ("chr1", 400, 500, 0.0)],
            0.0,
        )
        .unwrap();
        let mut peaks = track.call_regions(5.0, 200, 30, false);
        annotate_score_peaks(&mut peaks, "peak");

        let peak = peaks.iter().next().unwrap();
        assert_eq!((peak.start, peak.end), (100, 400));
        assert_eq!(peak.fold_enrichment, 8.0);
        assert_eq!(peak.neglog10_qvalue, -1.0);
        assert_eq!(peak.name, "peak_1");
    }
}
