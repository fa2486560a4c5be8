use anyhow::{Result, bail};
use clap::ArgMatches;
use log::info;

use peakrs_core::io::{PeakScore, write_gapped_peak};

use crate::bdgpeakcall::handlers::derived_name;
use crate::common::{arg, output_path, read_track, write_to};

pub fn run_bdgbroadcall(matches: &ArgMatches) -> Result<()> {
    let input = arg::<String>(matches, "input")?;
    let cutoff_peak = *arg::<f64>(matches, "cutoff-peak")?;
    let cutoff_link = *arg::<f64>(matches, "cutoff-link")?;
    if cutoff_link > cutoff_peak {
        bail!(
            "--cutoff-link {} must not exceed --cutoff-peak {}",
            cutoff_link,
            cutoff_peak
        );
    }
    let min_length = *arg::<u32>(matches, "min-length")?;

    let track = read_track(input, true)?;
    let mut peaks = track.call_broad_regions(
        cutoff_peak,
        cutoff_link,
        min_length,
        *arg::<u32>(matches, "lvl1-max-gap")?,
        *arg::<u32>(matches, "lvl2-max-gap")?,
    );
    info!("{} broad regions", peaks.len());

    for broad in peaks.peaks.iter_mut() {
        broad.peak.fold_enrichment = broad.peak.pileup;
        broad.peak.neglog10_pvalue = -1.0;
        broad.peak.neglog10_qvalue = -1.0;
    }
    peaks.assign_names("peak");

    let ofile = match matches.get_one::<String>("ofile") {
        Some(name) => name.clone(),
        None => derived_name(
            input,
            &format!("c{}_C{}_l{}_broad.gappedPeak", cutoff_peak, cutoff_link, min_length),
        ),
    };
    write_to(&output_path(arg::<String>(matches, "outdir")?, &ofile)?, |w| {
        write_gapped_peak(w, &peaks, PeakScore::SummitValue)
    })
}
