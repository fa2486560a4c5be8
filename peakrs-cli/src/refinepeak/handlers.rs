use std::path::Path;

use anyhow::{Result, bail};
use clap::ArgMatches;
use log::info;

use peakrs_core::io::{PeakScore, load_peaks, write_summits_bed};
use peakrs_core::models::Alignments;
use peakrs_signal::refine::{RefineOptions, refine_peaks};

use crate::common::{arg, load_inputs, output_path, write_to};

pub fn run_refinepeak(matches: &ArgMatches) -> Result<()> {
    let options = RefineOptions {
        window: *arg::<u32>(matches, "window")?,
    };
    let peaks = load_peaks(Path::new(arg::<String>(matches, "peaks")?))?;
    let Alignments::Single(reads) = load_inputs(matches, "input")? else {
        bail!("refinepeak needs single-end reads with strands");
    };

    let refined = refine_peaks(&peaks, &reads, &options)?;
    info!("Refined {} summits", refined.len());

    let file = format!("{}_refinepeak.bed", arg::<String>(matches, "o-prefix")?);
    write_to(&output_path(arg::<String>(matches, "outdir")?, &file)?, |w| {
        write_summits_bed(w, &refined, PeakScore::SummitValue)
    })
}
