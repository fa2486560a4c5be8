use clap::{Arg, ArgAction, Command};

use crate::common::format_arg;

pub const PILEUP_CMD: &str = "pileup";

pub fn create_pileup_cli() -> Command {
    Command::new(PILEUP_CMD)
        .author("Databio")
        .about("Pile up reads or fragments into a coverage bedGraph.")
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
            Arg::new("extsize")
                .long("extsize")
                .value_parser(clap::value_parser!(u32))
                .default_value("200")
                .help("Length each read is extended to, ignored for BEDPE"),
        )
        .arg(
            Arg::new("both-direction")
                .long("both-direction")
                .short('B')
                .action(ArgAction::SetTrue)
                .help("Extend around the 5' end instead of downstream of it"),
        )
        .arg(
            Arg::new("scale")
                .long("scale")
                .value_parser(clap::value_parser!(f64))
                .default_value("1.0")
                .help("Weight of one read"),
        )
        .arg(
            Arg::new("ofile")
                .long("ofile")
                .short('o')
                .default_value("-")
                .help("Output bedGraph, '-' for stdout"),
        )
}
