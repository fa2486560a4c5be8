use clap::{Arg, ArgAction, Command};

use crate::common::{format_arg, gsize_arg, keep_dup_arg, mfold_arg};

pub const CALLPEAK_CMD: &str = "callpeak";

pub fn create_callpeak_cli() -> Command {
    Command::new(CALLPEAK_CMD)
        .author("Databio")
        .about("Call narrow or broad peaks from treatment reads, against a control when one is given.")
        .arg(
            Arg::new("treatment")
                .long("treatment")
                .short('t')
                .num_args(1..)
                .required(true)
                .help("Treatment BED or BEDPE files, plain or gzipped"),
        )
        .arg(
            Arg::new("control")
                .long("control")
                .short('c')
                .num_args(1..)
                .help("Control BED or BEDPE files, in the same format as the treatment"),
        )
        .arg(format_arg())
        .arg(gsize_arg())
        .arg(keep_dup_arg("1"))
        .arg(
            Arg::new("name")
                .long("name")
                .short('n')
                .default_value("NA")
                .help("Prefix of every output file and peak name"),
        )
        .arg(
            Arg::new("outdir")
                .long("outdir")
                .default_value(".")
                .help("Directory the outputs are written to"),
        )
        .arg(
            Arg::new("qvalue")
                .long("qvalue")
                .short('q')
                .value_parser(clap::value_parser!(f64))
                .help("q-value cutoff, 0.05 when neither cutoff is given")
                .conflicts_with("pvalue"),
        )
        .arg(
            Arg::new("pvalue")
                .long("pvalue")
                .short('p')
                .value_parser(clap::value_parser!(f64))
                .help("p-value cutoff, replaces the q-value cutoff"),
        )
        .arg(
            Arg::new("nomodel")
                .long("nomodel")
                .action(ArgAction::SetTrue)
                .help("Skip the strand model and extend reads to --extsize"),
        )
        .arg(
            Arg::new("require-model")
                .long("require-model")
                .action(ArgAction::SetTrue)
                .help("Fail when the model cannot be built instead of using --extsize"),
        )
        .arg(
            Arg::new("extsize")
                .long("extsize")
                .value_parser(clap::value_parser!(u32))
                .default_value("200")
                .help("Fragment length used without a model"),
        )
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
                .help("Smallest fragment length the model may report"),
        )
        .arg(
            Arg::new("slocal")
                .long("slocal")
                .value_parser(clap::value_parser!(u32))
                .default_value("1000")
                .help("Small local lambda window, 0 to disable"),
        )
        .arg(
            Arg::new("llocal")
                .long("llocal")
                .value_parser(clap::value_parser!(u32))
                .default_value("10000")
                .help("Large local lambda window, 0 to disable"),
        )
        .arg(
            Arg::new("nolambda")
                .long("nolambda")
                .action(ArgAction::SetTrue)
                .help("Use the genome background as the only lambda"),
        )
        .arg(
            Arg::new("scale-to")
                .long("scale-to")
                .value_parser(["small", "large"])
                .default_value("small")
                .help("Scale the deeper sample down (small) or the shallower one up (large)"),
        )
        .arg(
            Arg::new("broad")
                .long("broad")
                .action(ArgAction::SetTrue)
                .help("Call broad regions made of strict sub-peaks"),
        )
        .arg(
            Arg::new("broad-cutoff")
                .long("broad-cutoff")
                .value_parser(clap::value_parser!(f64))
                .default_value("0.1")
                .help("Loose cutoff linking broad sub-peaks, same kind as the main cutoff"),
        )
        .arg(
            Arg::new("call-summits")
                .long("call-summits")
                .action(ArgAction::SetTrue)
                .conflicts_with("broad")
                .help("Report every credible summit of a peak as its own record"),
        )
        .arg(
            Arg::new("min-length")
                .long("min-length")
                .value_parser(clap::value_parser!(u32))
                .help("Minimum peak length, defaults to the fragment length"),
        )
        .arg(
            Arg::new("max-gap")
                .long("max-gap")
                .value_parser(clap::value_parser!(u32))
                .help("Maximum gap merged into one peak, defaults to the read length"),
        )
        .arg(
            Arg::new("bdg")
                .long("bdg")
                .short('B')
                .action(ArgAction::SetTrue)
                .help("Also write the treatment pileup and control lambda as bedGraph"),
        )
}
