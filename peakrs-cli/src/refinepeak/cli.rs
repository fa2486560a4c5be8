use clap::{Arg, Command};

use crate::common::format_arg;

pub const REFINEPEAK_CMD: &str = "refinepeak";

pub fn create_refinepeak_cli() -> Command {
    Command::new(REFINEPEAK_CMD)
        .author("Databio")
        .about("Move peak summits to where the plus and minus strand reads balance.")
        .arg(
            Arg::new("peaks")
                .long("bedfile")
                .short('b')
                .required(true)
                .help("Peaks as narrowPeak or BED"),
        )
        .arg(
            Arg::new("input")
                .long("ifile")
                .short('i')
                .num_args(1..)
                .required(true)
                .help("Single-end BED reads, plain or gzipped"),
        )
        .arg(format_arg())
        .arg(
            Arg::new("window")
                .long("window")
                .short('w')
                .value_parser(clap::value_parser!(u32))
                .default_value("100")
                .help("Reads are counted this far to each side of a candidate summit"),
        )
        .arg(
            Arg::new("outdir")
                .long("outdir")
                .default_value(".")
                .help("Directory the output is written to"),
        )
        .arg(
            Arg::new("o-prefix")
                .long("o-prefix")
                .default_value("refined")
                .help("Output is written to '{prefix}_refinepeak.bed'"),
        )
}
