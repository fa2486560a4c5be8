mod bdgbroadcall;
mod bdgcmp;
mod bdgdiff;
mod bdgpeakcall;
mod callpeak;
mod common;
mod diffpeak;
mod filterdup;
mod pileup;
mod predictd;
mod randsample;
mod refinepeak;

use anyhow::Result;
use clap::{Arg, Command};

pub mod consts {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const PKG_NAME: &str = "peakrs";
    pub const BIN_NAME: &str = "peakrs";
}

fn build_parser() -> Command {
    Command::new(consts::BIN_NAME)
        .bin_name(consts::BIN_NAME)
        .version(consts::VERSION)
        .author("Databio")
        .about("Model-based peak calling and differential occupancy for ChIP-seq and ATAC-seq reads.")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .global(true)
                .value_parser(clap::value_parser!(u8).range(0..=3))
                .default_value("2")
                .help("0: errors only, 1: warnings, 2: progress, 3: debug. RUST_LOG overrides this."),
        )
        .subcommand(callpeak::cli::create_callpeak_cli())
        .subcommand(bdgcmp::cli::create_bdgcmp_cli())
        .subcommand(bdgpeakcall::cli::create_bdgpeakcall_cli())
        .subcommand(bdgbroadcall::cli::create_bdgbroadcall_cli())
        .subcommand(bdgdiff::cli::create_bdgdiff_cli())
        .subcommand(diffpeak::cli::create_diffpeak_cli())
        .subcommand(filterdup::cli::create_filterdup_cli())
        .subcommand(pileup::cli::create_pileup_cli())
        .subcommand(predictd::cli::create_predictd_cli())
        .subcommand(randsample::cli::create_randsample_cli())
        .subcommand(refinepeak::cli::create_refinepeak_cli())
}

fn main() -> Result<()> {
    let app = build_parser();
    let matches = app.get_matches();

    let verbosity = matches.get_one::<u8>("verbose").copied().unwrap_or(2);
    common::init_logging(verbosity);

    match matches.subcommand() {
        //
        // PEAK CALLING
        //
        Some((callpeak::cli::CALLPEAK_CMD, matches)) => {
            callpeak::handlers::run_callpeak(matches)?;
        }
        Some((refinepeak::cli::REFINEPEAK_CMD, matches)) => {
            refinepeak::handlers::run_refinepeak(matches)?;
        }

        //
        // BEDGRAPH TOOLS
        //
        Some((bdgcmp::cli::BDGCMP_CMD, matches)) => {
            bdgcmp::handlers::run_bdgcmp(matches)?;
        }
        Some((bdgpeakcall::cli::BDGPEAKCALL_CMD, matches)) => {
            bdgpeakcall::handlers::run_bdgpeakcall(matches)?;
        }
        Some((bdgbroadcall::cli::BDGBROADCALL_CMD, matches)) => {
            bdgbroadcall::handlers::run_bdgbroadcall(matches)?;
        }

        //
        // DIFFERENTIAL
        //
        Some((bdgdiff::cli::BDGDIFF_CMD, matches)) => {
            bdgdiff::handlers::run_bdgdiff(matches)?;
        }
        Some((diffpeak::cli::DIFFPEAK_CMD, matches)) => {
            diffpeak::handlers::run_diffpeak(matches)?;
        }

        //
        // READ UTILITIES
        //
        Some((filterdup::cli::FILTERDUP_CMD, matches)) => {
            filterdup::handlers::run_filterdup(matches)?;
        }
        Some((pileup::cli::PILEUP_CMD, matches)) => {
            pileup::handlers::run_pileup(matches)?;
        }
        Some((predictd::cli::PREDICTD_CMD, matches)) => {
            predictd::handlers::run_predictd(matches)?;
        }
        Some((randsample::cli::RANDSAMPLE_CMD, matches)) => {
            randsample::handlers::run_randsample(matches)?;
        }

        _ => unreachable!("Subcommand not found"),
    };

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_parser_is_consistent() {
        build_parser().debug_assert();
    }

    #[rstest]
    #[case(&["peakrs", "callpeak", "-t", "a.bed"], "callpeak")]
    #[case(&["peakrs", "bdgcmp", "-t", "t.bdg", "-c", "c.bdg"], "bdgcmp")]
    #[case(&["peakrs", "--verbose", "3", "randsample", "-i", "a.bed", "-n", "10"], "randsample")]
    fn test_subcommands_parse(#[case] args: &[&str], #[case] expected: &str) {
        let matches = build_parser().try_get_matches_from(args).unwrap();
        assert_eq!(matches.subcommand_name(), Some(expected));
    }

    #[rstest]
    fn test_verbose_out_of_range() {
        let result = build_parser().try_get_matches_from(["peakrs", "--verbose", "4", "callpeak", "-t", "a.bed"]);
        assert!(result.is_err());
    }
}
