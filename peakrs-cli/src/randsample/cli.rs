use clap::{Arg, ArgGroup, Command};

use crate::common::format_arg;

pub const RANDSAMPLE_CMD: &str = "randsample";

pub fn create_randsample_cli() -> Command {
    Command::new(RANDSAMPLE_CMD)
        .author("Databio")
        .about("Randomly keep a fixed share or number of reads.")
        .arg(
            Arg::new("input")
                .long("ifile")
                .short('i')
                .num_args(1..)
                .required(true)
                .help("BED or BEDPE files, plain or gzipped"),
        )
        .arg(format_arg())
        .arg(
            Arg::new("percentage")
                .long("percentage")
                .short('p')
                .value_parser(clap::value_parser!(f64))
                .help("Percentage of reads to keep, 0 to 100"),
        )
        .arg(
            Arg::new("number")
                .long("number")
                .short('n')
                .value_parser(clap::value_parser!(u64))
                .help("Number of reads to keep"),
        )
        .group(
            ArgGroup::new("amount")
                .args(["percentage", "number"])
                .required(true),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_parser(clap::value_parser!(u64))
                .help("Random seed, drawn from the OS when absent"),
        )
        .arg(
            Arg::new("ofile")
                .long("ofile")
                .short('o')
                .default_value("-")
                .help("Output file, '-' for stdout"),
        )
}
