use clap::{Arg, Command};

pub const BDGDIFF_CMD: &str = "bdgdiff";

fn track_arg(id: &'static str, help: &'static str) -> Arg {
    Arg::new(id).long(id).required(true).help(help)
}

fn depth_arg(id: &'static str, help: &'static str) -> Arg {
    Arg::new(id)
        .long(id)
        .value_parser(clap::value_parser!(f64))
        .default_value("1.0")
        .help(help)
}

pub fn create_bdgdiff_cli() -> Command {
    Command::new(BDGDIFF_CMD)
        .author("Databio")
        .about("Differential regions between two conditions from their pileup and lambda bedGraphs.")
        .arg(track_arg("t1", "Treatment pileup of condition 1"))
        .arg(track_arg("c1", "Control lambda of condition 1"))
        .arg(track_arg("t2", "Treatment pileup of condition 2"))
        .arg(track_arg("c2", "Control lambda of condition 2"))
        .arg(depth_arg("d1", "Sequencing depth of condition 1, in millions of reads"))
        .arg(depth_arg("d2", "Sequencing depth of condition 2, in millions of reads"))
        .arg(
            Arg::new("cutoff")
                .long("cutoff")
                .short('C')
                .value_parser(clap::value_parser!(f64))
                .default_value("3.0")
                .help("log10 likelihood ratio cutoff of peaks and differential regions"),
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
                .short('g')
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
                .default_value("diff")
                .help("Prefix of the output files and region names"),
        )
}
