use std::collections::BTreeMap;
use std::fs::{File, create_dir_all};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Arg, ArgMatches};
use log::{LevelFilter, info};

use peakrs_core::io::load_alignments;
use peakrs_core::models::Alignments;
use peakrs_core::utils::{FileType, get_dynamic_reader_w_stdin, get_file_info, parse_genome_size};
use peakrs_signal::bedgraph::StepTrack;

pub const STDOUT: &str = "-";

pub fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Error,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

pub fn format_arg() -> Arg {
    Arg::new("format")
        .long("format")
        .short('f')
        .default_value("AUTO")
        .help("AUTO, BED or BEDPE. AUTO looks at the file extension")
}

pub fn gsize_arg() -> Arg {
    Arg::new("gsize")
        .long("gsize")
        .short('g')
        .default_value("hs")
        .help("Effective genome size: hs, mm, ce, dm or a number such as 1.0e9")
}

pub fn keep_dup_arg(default: &'static str) -> Arg {
    Arg::new("keep-dup")
        .long("keep-dup")
        .default_value(default)
        .help("Reads kept per position: auto, all or an integer")
}

pub fn mfold_arg() -> Arg {
    Arg::new("mfold")
        .long("mfold")
        .short('m')
        .num_args(2)
        .value_parser(clap::value_parser!(f64))
        .default_values(["5", "50"])
        .help("Lower and upper enrichment of the windows the strand model is built from")
}

pub fn mfold(matches: &ArgMatches) -> Result<(f64, f64)> {
    let values: Vec<f64> = matches
        .get_many::<f64>("mfold")
        .map(|v| v.copied().collect())
        .unwrap_or_default();
    match values.as_slice() {
        [lower, upper] => Ok((*lower, *upper)),
        _ => bail!("--mfold takes exactly two values"),
    }
}

/// A value clap guarantees through a default or `required(true)`.
pub fn arg<'a, T: Clone + Send + Sync + 'static>(matches: &'a ArgMatches, id: &str) -> Result<&'a T> {
    matches
        .get_one::<T>(id)
        .ok_or_else(|| anyhow!("Missing required argument: --{}", id))
}

pub fn args_many(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

pub fn genome_size(matches: &ArgMatches) -> Result<f64> {
    let value = arg::<String>(matches, "gsize")?;
    parse_genome_size(value).with_context(|| format!("Invalid --gsize '{}'", value))
}

///
/// `AUTO` looks at the extension of the first file.
///
pub fn resolve_format<P: AsRef<Path>>(format: &str, paths: &[P]) -> Result<FileType> {
    let file_type = if format.eq_ignore_ascii_case("auto") {
        let first = paths
            .first()
            .ok_or_else(|| anyhow!("No input files given"))?;
        get_file_info(first.as_ref()).file_type
    } else {
        FileType::from_str(format)?
    };
    match file_type {
        FileType::BED | FileType::BEDPE => Ok(file_type),
        _ if format.eq_ignore_ascii_case("auto") => {
            bail!("Could not detect the input format, pass --format BED or BEDPE")
        }
        _ => bail!("Unsupported input format '{}', expected BED or BEDPE", format),
    }
}

/// Load every file passed to `id`, in the format given by `--format`.
pub fn load_inputs(matches: &ArgMatches, id: &str) -> Result<Alignments> {
    let paths = args_many(matches, id);
    let format = resolve_format(arg::<String>(matches, "format")?, &paths)?;
    load_alignments(&paths, format).with_context(|| format!("Failed to load --{} files", id))
}

pub fn read_track(path: &str, allow_negative: bool) -> Result<StepTrack> {
    let reader = get_dynamic_reader_w_stdin(path)?;
    StepTrack::read_bedgraph(reader, 0.0, allow_negative)
        .with_context(|| format!("Failed to parse bedGraph {}", path))
}

/// `outdir/file`, creating `outdir` when needed.
pub fn output_path(outdir: &str, file: &str) -> Result<PathBuf> {
    let dir = Path::new(outdir);
    create_dir_all(dir).with_context(|| format!("Failed to create output directory {:?}", dir))?;
    Ok(dir.join(file))
}

pub fn create_file(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    Ok(BufWriter::new(file))
}

///
/// Create `path`, fill it with `write` and flush it.
///
pub fn write_to<F, E>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), E>,
    E: Into<anyhow::Error>,
{
    let mut writer = create_file(path)?;
    write(&mut writer)
        .map_err(Into::into)
        .with_context(|| format!("Failed to write {:?}", path))?;
    writer.flush()?;
    info!("Wrote {:?}", path);
    Ok(())
}

/// A file, or stdout for `-`.
pub fn create_writer(path: &str) -> Result<Box<dyn Write>> {
    if path == STDOUT {
        return Ok(Box::new(BufWriter::new(std::io::stdout())));
    }
    Ok(Box::new(create_file(Path::new(path))?))
}

///
/// Keep the chromosomes every track has and pad them all to the longest
/// extent, so the tracks can be combined run by run.
///
pub fn align_tracks(tracks: &mut [StepTrack]) -> Result<()> {
    let Some((first, rest)) = tracks.split_first() else {
        return Ok(());
    };
    let shared: Vec<String> = first
        .chromosomes()
        .into_iter()
        .filter(|c| rest.iter().all(|t| t.chrom(c).is_some()))
        .map(|c| c.to_string())
        .collect();
    if shared.is_empty() {
        bail!("The bedGraph files share no chromosome");
    }

    let mut domain: BTreeMap<String, u32> = BTreeMap::new();
    for track in tracks.iter_mut() {
        track.retain_chroms(&shared);
        for (chrom, end) in track.chrom_ends() {
            let current = domain.entry(chrom).or_insert(0);
            *current = (*current).max(end);
        }
    }
    for track in tracks.iter_mut() {
        track.pad_to(&domain);
    }
    Ok(())
}
