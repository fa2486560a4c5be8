use clap::{Arg, ArgAction, Command};

pub const BDGPEAKCALL_CMD: &str = "bdgpeakcall";

pub fn create_bdgpeakcall_cli() -> Command {
    Command::new(BDGPEAKCALL_CMD)
        .author("Databio")
        .about("Call narrow peaks from a score bedGraph.")
        .arg(
            Arg::new("input")
                .long("ifile")
                .short('i')
                .required(true)
                .help("Score bedGraph, such as a bdgcmp output, '-' for stdin"),
        )
        .arg(
            Arg::new("cutoff")
                .long("cutoff")
                .short('c')
                .value_parser(clap::value_parser!(f64))
                .allow_negative_numbers(true)
                .default_value("5.0")
                .help("Score a position must reach"),
        )
        .arg(
            Arg::new("min-length")
                .long("min-length")
                .short('l')
                .value_parser(clap::value_parser!(u32))
                .default_value("200")
                .help("Minimum peak length"),
        )
        .arg(
            Arg::new("max-gap")
                .long("max-gap")
                .short('g')
                .value_parser(clap::value_parser!(u32))
                .default_value("30")
                .help("Gaps up to this length are merged"),
        )
        .arg(
            Arg::new("call-summits")
                .long("call-summits")
                .action(ArgAction::SetTrue)
                .help("Report every credible summit of a peak as its own record"),
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
                .help("Output narrowPeak name, derived from the input and cutoff when absent"),
        )
}
