use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{Result, bail};
use log::{debug, info, warn};

use crate::models::{Alignments, FragmentTrack, ReadTrack, Strand};
use crate::utils::{FileType, get_dynamic_reader};

/// Counters collected while parsing one alignment file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseStats {
    pub records: u64,
    pub skipped: u64,
    pub width_sum: u64,
}

impl ParseStats {
    fn merge(&mut self, other: &ParseStats) {
        self.records += other.records;
        self.skipped += other.skipped;
        self.width_sum += other.width_sum;
    }

    /// Mean record width, rounded.
    pub fn mean_width(&self) -> u32 {
        if self.records == 0 {
            return 0;
        }
        (self.width_sum as f64 / self.records as f64).round() as u32
    }
}

fn is_header(line: &str) -> bool {
    line.is_empty()
        || line.starts_with('#')
        || line.starts_with("track")
        || line.starts_with("browser")
}

fn parse_interval<'a>(fields: &[&'a str]) -> Option<(&'a str, u32, u32)> {
    if fields.len() < 3 {
        return None;
    }
    let start = fields[1].parse::<u32>().ok()?;
    let end = fields[2].parse::<u32>().ok()?;
    if end <= start {
        return None;
    }
    Some((fields[0], start, end))
}

///
/// Add the reads of a BED file to `track`.
///
/// A read is stored by its 5' end: `start` on the plus strand, `end` on the
/// minus strand. A missing or unrecognized strand column counts as plus.
/// Malformed lines are logged and skipped.
///
pub fn read_bed_reads<R: BufRead>(reader: R, track: &mut ReadTrack) -> io::Result<ParseStats> {
    let mut stats = ParseStats::default();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end();
        if is_header(line) {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let Some((chrom, start, end)) = parse_interval(&fields) else {
            warn!("Skipping malformed BED line {}: '{}'", idx + 1, line);
            stats.skipped += 1;
            continue;
        };
        let strand = fields
            .get(5)
            .and_then(|s| s.parse::<Strand>().ok())
            .unwrap_or(Strand::Plus);
        match strand {
            Strand::Plus => track.add(chrom, start, Strand::Plus),
            Strand::Minus => track.add(chrom, end, Strand::Minus),
        }
        stats.records += 1;
        stats.width_sum += (end - start) as u64;
    }
    Ok(stats)
}

///
/// Add the fragments of a BEDPE file to `track`. Only the first three
/// columns are read: chromosome, leftmost and rightmost mate coordinate.
///
pub fn read_bedpe_fragments<R: BufRead>(
    reader: R,
    track: &mut FragmentTrack,
) -> io::Result<ParseStats> {
    let mut stats = ParseStats::default();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end();
        if is_header(line) {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let Some((chrom, start, end)) = parse_interval(&fields) else {
            warn!("Skipping malformed BEDPE line {}: '{}'", idx + 1, line);
            stats.skipped += 1;
            continue;
        };
        track.add(chrom, start, end);
        stats.records += 1;
        stats.width_sum += (end - start) as u64;
    }
    Ok(stats)
}

///
/// Load and finalize every file into one track of the requested format.
///
/// # Arguments
/// - paths: plain or gzipped files, all in the same format
/// - format: [FileType::BED] or [FileType::BEDPE]
///
pub fn load_alignments<P: AsRef<Path>>(paths: &[P], format: FileType) -> Result<Alignments> {
    let mut stats = ParseStats::default();
    let mut alignments = match format {
        FileType::BED => Alignments::Single(ReadTrack::new(0)),
        FileType::BEDPE => Alignments::Paired(FragmentTrack::new()),
        other => bail!("Unsupported alignment format: {:?}", other),
    };

    for path in paths {
        let path = path.as_ref();
        let reader = get_dynamic_reader(path)?;
        let file_stats = match &mut alignments {
            Alignments::Single(track) => read_bed_reads(reader, track)?,
            Alignments::Paired(track) => read_bedpe_fragments(reader, track)?,
        };
        debug!(
            "{:?}: {} records, {} skipped",
            path, file_stats.records, file_stats.skipped
        );
        stats.merge(&file_stats);
    }

    if let Alignments::Single(track) = &mut alignments {
        track.set_read_width(stats.mean_width());
    }
    alignments.finalize();
    info!(
        "Loaded {} records ({} skipped) from {} file(s)",
        stats.records,
        stats.skipped,
        paths.len()
    );
    Ok(alignments)
}

///
/// Write reads back as BED6, one line per read, each `read_width` wide.
///
pub fn write_reads_bed<W: Write>(writer: &mut W, track: &ReadTrack) -> Result<()> {
    let width = track.read_width();
    for chrom in track.chromosomes() {
        let mut plus = track.plus(chrom)?.iter().peekable();
        let mut minus = track.minus(chrom)?.iter().peekable();
        // interleave both strands by left coordinate
        loop {
            let next_plus = plus.peek().map(|p| **p);
            let next_minus = minus.peek().map(|m| m.saturating_sub(width));
            match (next_plus, next_minus) {
                (Some(p), Some(m)) if p <= m => {
                    writeln!(writer, "{}\t{}\t{}\t.\t0\t+", chrom, p, p + width)?;
                    plus.next();
                }
                (Some(p), None) => {
                    writeln!(writer, "{}\t{}\t{}\t.\t0\t+", chrom, p, p + width)?;
                    plus.next();
                }
                (_, Some(m)) => {
                    let end = minus.next().copied().unwrap_or(m);
                    writeln!(writer, "{}\t{}\t{}\t.\t0\t-", chrom, m, end)?;
                }
                (None, None) => break,
            }
        }
    }
    Ok(())
}

pub fn write_fragments_bedpe<W: Write>(writer: &mut W, track: &FragmentTrack) -> Result<()> {
    for chrom in track.chromosomes() {
        for (start, end) in track.fragments(chrom)? {
            writeln!(writer, "{}\t{}\t{}", chrom, start, end)?;
        }
    }
    Ok(())
}

pub fn write_alignments<W: Write>(writer: &mut W, alignments: &Alignments) -> Result<()> {
    match alignments {
        Alignments::Single(track) => write_reads_bed(writer, track),
        Alignments::Paired(track) => write_fragments_bedpe(writer, track),
    }
}
