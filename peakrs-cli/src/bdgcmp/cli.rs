use clap::{Arg, Command};

pub const BDGCMP_CMD: &str = "bdgcmp";

pub fn create_bdgcmp_cli() -> Command {
    Command::new(BDGCMP_CMD)
        .author("Databio")
        .about("Score a treatment bedGraph against a control bedGraph.")
        .arg(
            Arg::new("treatment")
                .long("tfile")
                .short('t')
                .required(true)
                .help("Treatment pileup bedGraph, '-' for stdin"),
        )
        .arg(
            Arg::new("control")
                .long("cfile")
                .short('c')
                .required(true)
                .help("Control lambda bedGraph"),
        )
        .arg(
            Arg::new("method")
                .long("method")
                .short('m')
                .num_args(1..)
                .default_value("ppois")
                .help("ppois, qpois, subtract, FE, logFE, log2FE, logLR, slogLR, dlogLR or max"),
        )
        .arg(
            Arg::new("scaling-factor")
                .long("scaling-factor")
                .short('S')
                .value_parser(clap::value_parser!(f64))
                .default_value("1.0")
                .help("Applied to both tracks before scoring"),
        )
        .arg(
            Arg::new("pseudocount")
                .long("pseudocount")
                .short('p')
                .value_parser(clap::value_parser!(f64))
                .default_value("0.0")
                .help("Added to both values before scoring"),
        )
        .arg(
            Arg::new("normalization")
                .long("normalization")
                .default_value("raw")
                .help("raw, treat-to-control, control-to-treat or mean"),
        )
        .arg(
            Arg::new("treat-depth")
                .long("treat-depth")
                .value_parser(clap::value_parser!(f64))
                .default_value("1.0")
                .help("Treatment depth used by --normalization"),
        )
        .arg(
            Arg::new("control-depth")
                .long("control-depth")
                .value_parser(clap::value_parser!(f64))
                .default_value("1.0")
                .help("Control depth used by --normalization"),
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
                .default_value("bdgcmp")
                .help("Output file prefix, one '{prefix}_{method}.bdg' per method"),
        )
        .arg(
            Arg::new("ofile")
                .long("ofile")
                .short('o')
                .num_args(1..)
                .conflicts_with("o-prefix")
                .help("Output file names, one per method in the same order"),
        )
}
