use std::io::Write;

use anyhow::{Result, bail};
use clap::ArgMatches;
use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;

use peakrs_core::io::write_alignments;

use crate::common::{arg, create_writer, load_inputs};

pub fn run_randsample(matches: &ArgMatches) -> Result<()> {
    let mut rng = match matches.get_one::<u64>("seed") {
        Some(seed) => StdRng::seed_from_u64(*seed),
        None => StdRng::from_os_rng(),
    };
    let mut alignments = load_inputs(matches, "input")?;
    let total = alignments.total()?;

    match (
        matches.get_one::<f64>("percentage"),
        matches.get_one::<u64>("number"),
    ) {
        (Some(percentage), _) => {
            if !(0.0..=100.0).contains(percentage) {
                bail!("--percentage must lie in [0, 100], got {}", percentage);
            }
            alignments.sample_percent(percentage / 100.0, &mut rng)?;
        }
        (None, Some(number)) => alignments.sample_num(*number, &mut rng)?,
        (None, None) => bail!("Either --percentage or --number is required"),
    }
    info!("Kept {} of {} reads", alignments.total()?, total);

    let mut writer = create_writer(arg::<String>(matches, "ofile")?)?;
    write_alignments(&mut writer, &alignments)?;
    writer.flush()?;
    Ok(())
}
