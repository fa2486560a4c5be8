use clap::{Arg, ArgAction, Command};

use crate::common::{format_arg, gsize_arg, keep_dup_arg};

pub const DIFFPEAK_CMD: &str = "diffpeak";

fn reads_arg(id: &'static str, help: &'static str) -> Arg {
    Arg::new(id).long(id).num_args(1..).help(help)
}

pub fn create_diffpeak_cli() -> Command {
    Command::new(DIFFPEAK_CMD)
        .author("Databio")
        .about("Differential occupancy between two conditions, starting from their reads.")
        .arg(reads_arg("t1", "Treatment reads of condition 1").required(true))
        .arg(reads_arg("c1", "Control reads of condition 1"))
        .arg(reads_arg("t2", "Treatment reads of condition 2").required(true))
        .arg(reads_arg("c2", "Control reads of condition 2"))
        .arg(
            Arg::new("peaks1")
                .long("peaks1")
                .requires("peaks2")
                .help("Peaks of condition 1 (narrowPeak or BED), called from the pileups when absent"),
        )
        .arg(
            Arg::new("peaks2")
                .long("peaks2")
                .requires("peaks1")
                .help("Peaks of condition 2"),
        )
        .arg(format_arg())
        .arg(gsize_arg())
        .arg(keep_dup_arg("1"))
        .arg(
            Arg::new("nomodel")
                .long("nomodel")
                .action(ArgAction::SetTrue)
                .help("Skip the strand model and extend reads to --extsize"),
        )
        .arg(
            Arg::new("extsize")
                .long("extsize")
                .value_parser(clap::value_parser!(u32))
                .default_value("200")
                .help("Fragment length used without a model"),
        )
        .arg(
            Arg::new("peak-cutoff")
                .long("peak-cutoff")
                .value_parser(clap::value_parser!(f64))
                .default_value("3.0")
                .help("log10 likelihood ratio cutoff of condition peaks"),
        )
        .arg(
            Arg::new("diff-cutoff")
                .long("diff-cutoff")
                .short('C')
                .value_parser(clap::value_parser!(f64))
                .default_value("3.0")
                .help("log10 likelihood ratio cutoff of differential regions"),
        )
        .arg(
            Arg::new("min-length")
                .long("min-length")
                .short('l')
                .value_parser(clap::value_parser!(u32))
                .default_value("200")
                .help("Minimum region length"),
        )
        .arg(
            Arg::new("max-gap")
                .long("max-gap")
                .value_parser(clap::value_parser!(u32))
                .default_value("100")
                .help("Gaps up to this length are merged"),
        )
        .arg(
            Arg::new("scale-to")
                .long("scale-to")
                .value_parser(["small", "large"])
                .default_value("small")
                .help("Scale the deeper condition down (small) or the shallower one up (large)"),
        )
        .arg(
            Arg::new("gfold-table")
                .long("gfold-table")
                .help("Precomputed 'count1 count2 gfold' table, sampled estimates fill the gaps"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_parser(clap::value_parser!(u64))
                .default_value("0")
                .help("Seed of the gfold sampler"),
        )
        .arg(
            Arg::new("outdir")
                .long("outdir")
                .default_value(".")
                .help("Directory the outputs are written to"),
        )
        .arg(
            Arg::new("o-prefix")
                .long("o-prefix")
                .default_value("diffpeak")
                .help("Prefix of the output files and region names"),
        )
}
