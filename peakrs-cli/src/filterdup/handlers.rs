use std::io::Write;

use anyhow::{Context, Result};
use clap::ArgMatches;
use log::info;

use peakrs_core::io::write_alignments;
use peakrs_core::models::Alignments;
use peakrs_signal::callpeak::DupPolicy;

use crate::common::{arg, create_writer, genome_size, load_inputs};

/// Cap duplicates in place, returning how many reads were removed.
pub fn filter_duplicates(alignments: &mut Alignments, policy: DupPolicy, genome_size: f64) -> Result<u64> {
    let total = alignments.total()?;
    let Some(cap) = policy.max_dup(genome_size, total) else {
        return Ok(0);
    };
    info!("Keeping at most {} reads per position", cap);
    Ok(alignments.filter_dup(cap)?)
}

pub fn run_filterdup(matches: &ArgMatches) -> Result<()> {
    let policy: DupPolicy = arg::<String>(matches, "keep-dup")?.parse()?;
    let genome_size = genome_size(matches)?;
    let mut alignments = load_inputs(matches, "input")?;

    let total = alignments.total()?;
    let removed = filter_duplicates(&mut alignments, policy, genome_size)?;
    info!(
        "{} of {} reads kept, redundant rate {:.4}",
        total - removed,
        total,
        if total > 0 { removed as f64 / total as f64 } else { 0.0 }
    );
    if matches.get_flag("dry-run") {
        return Ok(());
    }

    let ofile = arg::<String>(matches, "ofile")?;
    let mut writer = create_writer(ofile)?;
    write_alignments(&mut writer, &alignments).with_context(|| format!("Failed to write {}", ofile))?;
    writer.flush()?;
    Ok(())
}
