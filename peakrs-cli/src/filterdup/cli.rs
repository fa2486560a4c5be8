use clap::{Arg, ArgAction, Command};

use crate::common::{format_arg, gsize_arg, keep_dup_arg};

pub const FILTERDUP_CMD: &str = "filterdup";

pub fn create_filterdup_cli() -> Command {
    Command::new(FILTERDUP_CMD)
        .author("Databio")
        .about("Remove duplicate reads above the per-position cap.")
        .arg(
            Arg::new("input")
                .long("ifile")
                .short('i')
                .num_args(1..)
                .required(true)
                .help("BED or BEDPE files, plain or gzipped"),
        )
        .arg(format_arg())
        .arg(gsize_arg())
        .arg(keep_dup_arg("auto"))
        .arg(
            Arg::new("ofile")
                .long("ofile")
                .short('o')
                .default_value("-")
                .help("Output file, '-' for stdout"),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .short('d')
                .action(ArgAction::SetTrue)
                .help("Only report how many reads would be kept"),
        )
}
