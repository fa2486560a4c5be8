use clap::{Arg, Command};

use crate::common::{format_arg, gsize_arg, mfold_arg};

pub const PREDICTD_CMD: &str = "predictd";

pub fn create_predictd_cli() -> Command {
    Command::new(PREDICTD_CMD)
        .author("Databio")
        .about("Estimate the fragment length of single-end reads from the strand shift.")
        .arg(
            Arg::new("input")
                .long("ifile")
                .short('i')
                .num_args(1..)
                .required(true)
                .help("Single-end BED files, plain or gzipped"),
        )
        .arg(format_arg())
        .arg(gsize_arg())
        .arg(
            Arg::new("bw")
                .long("bw")
                .value_parser(clap::value_parser!(u32))
                .default_value("300")
                .help("Band width of the strand model"),
        )
        .arg(mfold_arg())
        .arg(
            Arg::new("d-min")
                .long("d-min")
                .value_parser(clap::value_parser!(u32))
                .default_value("20")
                .help("Smallest fragment length reported"),
        )
        .arg(
            Arg::new("max-pairs")
                .long("max-pairs")
                .value_parser(clap::value_parser!(usize))
                .default_value("1000")
                .help("Paired peaks used to build the profiles"),
        )
        .arg(
            Arg::new("rfile")
                .long("rfile")
                .help("Write the strand profiles and correlation curve to this file"),
        )
}
