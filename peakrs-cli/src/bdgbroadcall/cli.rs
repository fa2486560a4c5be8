use clap::{Arg, Command};

pub const BDGBROADCALL_CMD: &str = "bdgbroadcall";

pub fn create_bdgbroadcall_cli() -> Command {
    Command::new(BDGBROADCALL_CMD)
        .author("Databio")
        .about("Call broad regions from a score bedGraph with a strict and a loose cutoff.")
        .arg(
            Arg::new("input")
                .long("ifile")
                .short('i')
                .required(true)
                .help("Score bedGraph, '-' for stdin"),
        )
        .arg(
            Arg::new("cutoff-peak")
                .long("cutoff-peak")
                .short('c')
                .value_parser(clap::value_parser!(f64))
                .allow_negative_numbers(true)
                .default_value("2.0")
                .help("Strict cutoff of the sub-peaks"),
        )
        .arg(
            Arg::new("cutoff-link")
                .long("cutoff-link")
                .short('C')
                .value_parser(clap::value_parser!(f64))
                .allow_negative_numbers(true)
                .default_value("1.0")
                .help("Loose cutoff of the regions linking sub-peaks"),
        )
        .arg(
            Arg::new("min-length")
                .long("min-length")
                .short('l')
                .value_parser(clap::value_parser!(u32))
                .default_value("200")
                .help("Minimum length of sub-peaks and regions"),
        )
        .arg(
            Arg::new("lvl1-max-gap")
                .long("lvl1-max-gap")
                .short('g')
                .value_parser(clap::value_parser!(u32))
                .default_value("30")
                .help("Gaps merged between strict sub-peaks"),
        )
        .arg(
            Arg::new("lvl2-max-gap")
                .long("lvl2-max-gap")
                .short('G')
                .value_parser(clap::value_parser!(u32))
                .default_value("800")
                .help("Gaps merged between loose regions"),
        )
        .arg(
            Arg::new("outdir")
                .long("outdir")
                .default_value(".")
                .help("Directory the output is written to"),
        )
        .arg(
            Arg::new("ofile")
                .long("ofile")
                .short('o')
                .help("Output gappedPeak name, derived from the input and cutoffs when absent"),
        )
}
