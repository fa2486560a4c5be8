use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use log::info;

use peakrs_core::models::Alignments;
use peakrs_signal::model::{ModelOptions, PeakModel};

use crate::common::{arg, genome_size, load_inputs, mfold, write_to};

pub fn run_predictd(matches: &ArgMatches) -> Result<()> {
    let options = ModelOptions {
        bandwidth: *arg::<u32>(matches, "bw")?,
        mfold: mfold(matches)?,
        genome_size: genome_size(matches)?,
        max_pairs: *arg::<usize>(matches, "max-pairs")?,
        d_min: *arg::<u32>(matches, "d-min")?,
        ..Default::default()
    };
    options.validate()?;

    let Alignments::Single(track) = load_inputs(matches, "input")? else {
        bail!("predictd needs single-end reads, BEDPE fragments carry their length");
    };
    let model = PeakModel::build(&track, &options).context("Could not build the strand model")?;

    info!("{} paired peaks", model.num_pairs());
    if !model.alternative_d.is_empty() {
        info!("Alternative fragment lengths: {:?}", model.alternative_d);
    }
    println!("predicted fragment length is {} bps", model.d);

    if let Some(rfile) = matches.get_one::<String>("rfile") {
        write_to(Path::new(rfile), |w| model.write_tsv(w))?;
    }
    Ok(())
}
