//! Text serializations of peak sets.
//!
//! Coordinates are 0-based half-open everywhere except in the XLS tables,
//! which report 1-based starts and summits.

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::Result;
use log::warn;

use crate::models::{BroadPeakSet, Peak, PeakSet};
use crate::utils::get_dynamic_reader;

/// Which significance goes into the integer score column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeakScore {
    PValue,
    #[default]
    QValue,
    /// The raw score at the summit, for tracks that carry no significance.
    SummitValue,
}

impl PeakScore {
    fn of(&self, peak: &Peak) -> f64 {
        match self {
            PeakScore::PValue => peak.neglog10_pvalue,
            PeakScore::QValue => peak.neglog10_qvalue,
            PeakScore::SummitValue => peak.summit_value,
        }
    }
}

fn int_score(value: f64) -> i64 {
    (10.0 * value) as i64
}

///
/// Write narrowPeak: BED6 plus fold enrichment, -log10 p, -log10 q and the
/// summit offset from the start.
///
pub fn write_narrow_peak<W: Write>(
    writer: &mut W,
    peaks: &PeakSet,
    score: PeakScore,
) -> io::Result<()> {
    for p in peaks.iter() {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t.\t{:.5}\t{:.5}\t{:.5}\t{}",
            p.chr,
            p.start,
            p.end,
            p.name,
            int_score(score.of(p)),
            p.fold_enrichment,
            p.neglog10_pvalue,
            p.neglog10_qvalue,
            p.summit_offset()
        )?;
    }
    Ok(())
}

/// One line per summit: `chr summit summit+1 name score`.
pub fn write_summits_bed<W: Write>(
    writer: &mut W,
    peaks: &PeakSet,
    score: PeakScore,
) -> io::Result<()> {
    for p in peaks.iter() {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{:.5}",
            p.chr,
            p.summit,
            p.summit + 1,
            p.name,
            score.of(p)
        )?;
    }
    Ok(())
}

pub fn write_broad_peak<W: Write>(
    writer: &mut W,
    peaks: &BroadPeakSet,
    score: PeakScore,
) -> io::Result<()> {
    for broad in peaks.iter() {
        let p = &broad.peak;
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t.\t{:.5}\t{:.5}\t{:.5}",
            p.chr,
            p.start,
            p.end,
            p.name,
            int_score(score.of(p)),
            p.fold_enrichment,
            p.neglog10_pvalue,
            p.neglog10_qvalue
        )?;
    }
    Ok(())
}

///
/// Write gappedPeak: BED12 whose blocks are the strict sub-peaks, followed by
/// fold enrichment, -log10 p and -log10 q.
///
/// Browsers expect the first and last block to touch the envelope, so 1bp
/// blocks are added at either edge a sub-peak does not reach.
///
pub fn write_gapped_peak<W: Write>(
    writer: &mut W,
    peaks: &BroadPeakSet,
    score: PeakScore,
) -> io::Result<()> {
    for broad in peaks.iter() {
        let p = &broad.peak;
        let mut blocks = broad.blocks.clone();
        if blocks.first().is_none_or(|b| b.0 != p.start) {
            blocks.insert(0, (p.start, p.start + 1));
        }
        if blocks.last().is_none_or(|b| b.1 != p.end) {
            blocks.push((p.end - 1, p.end));
        }
        let sizes: Vec<String> = blocks.iter().map(|(s, e)| (e - s).to_string()).collect();
        let starts: Vec<String> = blocks.iter().map(|(s, _)| (s - p.start).to_string()).collect();
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t.\t{}\t{}\t0\t{}\t{}\t{}\t{:.5}\t{:.5}\t{:.5}",
            p.chr,
            p.start,
            p.end,
            p.name,
            int_score(score.of(p)),
            p.start,
            p.end,
            blocks.len(),
            sizes.join(","),
            starts.join(","),
            p.fold_enrichment,
            p.neglog10_pvalue,
            p.neglog10_qvalue
        )?;
    }
    Ok(())
}

fn write_comments<W: Write>(writer: &mut W, comments: &[String]) -> io::Result<()> {
    for line in comments {
        writeln!(writer, "# {}", line)?;
    }
    if !comments.is_empty() {
        writeln!(writer)?;
    }
    Ok(())
}

///
/// Write the tabular peak summary, led by `# ` comment lines describing the
/// run.
///
pub fn write_xls<W: Write>(writer: &mut W, peaks: &PeakSet, comments: &[String]) -> io::Result<()> {
    write_comments(writer, comments)?;
    writeln!(
        writer,
        "chr\tstart\tend\tlength\tabs_summit\tpileup\t-log10(pvalue)\tfold_enrichment\t-log10(qvalue)\tname"
    )?;
    for p in peaks.iter() {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{:.2}\t{:.5}\t{:.5}\t{:.5}\t{}",
            p.chr,
            p.start + 1,
            p.end,
            p.width(),
            p.summit + 1,
            p.pileup,
            p.neglog10_pvalue,
            p.fold_enrichment,
            p.neglog10_qvalue,
            p.name
        )?;
    }
    Ok(())
}

/// Same as [write_xls] without the summit column.
pub fn write_broad_xls<W: Write>(
    writer: &mut W,
    peaks: &BroadPeakSet,
    comments: &[String],
) -> io::Result<()> {
    write_comments(writer, comments)?;
    writeln!(
        writer,
        "chr\tstart\tend\tlength\tpileup\t-log10(pvalue)\tfold_enrichment\t-log10(qvalue)\tname"
    )?;
    for broad in peaks.iter() {
        let p = &broad.peak;
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{:.2}\t{:.5}\t{:.5}\t{:.5}\t{}",
            p.chr,
            p.start + 1,
            p.end,
            p.width(),
            p.pileup,
            p.neglog10_pvalue,
            p.fold_enrichment,
            p.neglog10_qvalue,
            p.name
        )?;
    }
    Ok(())
}

fn parse_narrow_peak_fields(fields: &[&str]) -> Option<Peak> {
    let start = fields[1].parse::<u32>().ok()?;
    let end = fields[2].parse::<u32>().ok()?;
    let width = end.checked_sub(start).filter(|w| *w > 0)?;
    let offset = fields[9].parse::<i64>().ok()?;
    let summit = if offset < 0 {
        start + width / 2
    } else {
        // the summit must land inside the peak
        let offset = u32::try_from(offset).ok().filter(|o| *o < width)?;
        start.checked_add(offset)?
    };
    Some(Peak {
        chr: fields[0].to_string(),
        start,
        end,
        summit,
        summit_value: fields[4].parse::<f64>().ok()? / 10.0,
        pileup: 0.0,
        fold_enrichment: fields[6].parse().ok()?,
        neglog10_pvalue: fields[7].parse().ok()?,
        neglog10_qvalue: fields[8].parse().ok()?,
        name: fields[3].to_string(),
    })
}

fn parse_bed_fields(fields: &[&str], n: usize) -> Option<Peak> {
    let start = fields[1].parse::<u32>().ok()?;
    let end = fields[2].parse::<u32>().ok()?;
    let mut peak = Peak::new(fields[0], start, end, start + end.checked_sub(start)? / 2);
    peak.name = fields
        .get(3)
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("peak_{}", n));
    peak.summit_value = fields.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.0);
    Some(peak)
}

///
/// Read peaks from narrowPeak or plain BED text.
///
/// Lines with ten or more columns are read as narrowPeak and keep their
/// summit; shorter lines are BED intervals summited at their midpoint.
/// Malformed lines are logged and skipped.
///
pub fn read_peaks<R: BufRead>(reader: R) -> io::Result<PeakSet> {
    let mut peaks = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end();
        if line.is_empty()
            || line.starts_with('#')
            || line.starts_with("track")
            || line.starts_with("browser")
        {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let parsed = match fields.len() {
            n if n >= 10 => parse_narrow_peak_fields(&fields),
            n if n >= 3 => parse_bed_fields(&fields, peaks.len() + 1),
            _ => None,
        };
        match parsed {
            Some(peak) if peak.end > peak.start => peaks.push(peak),
            _ => warn!("Skipping malformed peak line {}: '{}'", idx + 1, line),
        }
    }
    Ok(PeakSet::new(peaks))
}

pub fn load_peaks(path: &Path) -> Result<PeakSet> {
    let reader = get_dynamic_reader(path)?;
    Ok(read_peaks(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    use crate::models::BroadPeak;

    fn peak(chr: &str, start: u32, end: u32, summit: u32, name: &str) -> Peak {
        Peak {
            chr: chr.to_string(),
            start,
            end,
            summit,
            summit_value: 12.5,
            pileup: 31.0,
            fold_enrichment: 4.25,
            neglog10_pvalue: 15.125,
            neglog10_qvalue: 12.5,
            name: name.to_string(),
        }
    }

    #[fixture]
    fn peaks() -> PeakSet {
        PeakSet::new(vec![
            peak("chr1", 100, 400, 250, "run_peak_1"),
            peak("chr2", 1000, 1200, 1001, "run_peak_2"),
        ])
    }

    #[rstest]
    fn test_write_narrow_peak(peaks: PeakSet) {
        let mut out = Vec::new();
        write_narrow_peak(&mut out, &peaks, PeakScore::QValue).unwrap();
        let text = String::from_utf8(out).unwrap();
        let first = text.lines().next().unwrap();
        assert_eq!(
            first,
            "chr1\t100\t400\trun_peak_1\t125\t.\t4.25000\t15.12500\t12.50000\t150"
        );
    }

    #[rstest]
    fn test_write_xls_is_one_based(peaks: PeakSet) {
        let mut out = Vec::new();
        write_xls(&mut out, &peaks, &["name = run".to_string()]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "# name = run");
        assert_eq!(lines[1], "");
        assert!(lines[2].starts_with("chr\tstart\tend\tlength\tabs_summit"));
        assert_eq!(
            lines[3],
            "chr1\t101\t400\t300\t251\t31.00\t15.12500\t4.25000\t12.50000\trun_peak_1"
        );
    }

    #[rstest]
    fn test_write_gapped_peak_adds_edge_blocks() {
        let set = BroadPeakSet::new(vec![BroadPeak {
            peak: peak("chr1", 100, 500, 250, "run_peak_1"),
            blocks: vec![(150, 200), (300, 500)],
        }]);
        let mut out = Vec::new();
        write_gapped_peak(&mut out, &set, PeakScore::QValue).unwrap();
        let text = String::from_utf8(out).unwrap();
        let fields: Vec<&str> = text.trim_end().split('\t').collect();
        assert_eq!(fields.len(), 15);
        assert_eq!(fields[9], "3");
        assert_eq!(fields[10], "1,50,200");
        assert_eq!(fields[11], "0,50,200");
    }

    #[rstest]
    fn test_write_broad_peak_has_nine_columns() {
        let set = BroadPeakSet::new(vec![BroadPeak {
            peak: peak("chr1", 100, 500, 250, "run_peak_1"),
            blocks: vec![(100, 500)],
        }]);
        let mut out = Vec::new();
        write_broad_peak(&mut out, &set, PeakScore::PValue).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "chr1\t100\t500\trun_peak_1\t151\t.\t4.25000\t15.12500\t12.50000\n"
        );
    }

    #[rstest]
    fn test_narrow_peak_round_trip(peaks: PeakSet) {
        let mut out = Vec::new();
        write_narrow_peak(&mut out, &peaks, PeakScore::QValue).unwrap();
        let parsed = read_peaks(out.as_slice()).unwrap();

        assert_eq!(parsed.len(), peaks.len());
        for (a, b) in parsed.iter().zip(peaks.iter()) {
            assert_eq!(
                (&a.chr, a.start, a.end, a.summit, &a.name),
                (&b.chr, b.start, b.end, b.summit, &b.name)
            );
            assert_eq!(a.fold_enrichment, b.fold_enrichment);
            assert_eq!(a.neglog10_pvalue, b.neglog10_pvalue);
            assert_eq!(a.neglog10_qvalue, b.neglog10_qvalue);
        }
    }

    #[rstest]
    #[case::reversed("chr1\t500\t100\tx\t0\t.\t1.0\t1.0\t1.0\t-1")]
    #[case::empty("chr1\t100\t100\tx\t0\t.\t1.0\t1.0\t1.0\t-1")]
    #[case::offset_past_u32("chr1\t4294967000\t4294967200\tx\t0\t.\t1.0\t1.0\t1.0\t5000")]
    #[case::offset_past_end("chr1\t100\t200\tx\t0\t.\t1.0\t1.0\t1.0\t100")]
    #[case::offset_not_u32("chr1\t100\t200\tx\t0\t.\t1.0\t1.0\t1.0\t99999999999")]
    fn test_read_peaks_skips_bad_narrow_peak(#[case] bad: &str) {
        let text = format!("{}\nchr1\t10\t30\tgood\t50\t.\t2.0\t3.0\t4.0\t5\n", bad);
        let parsed = read_peaks(text.as_bytes()).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.peaks[0].name, "good");
        assert_eq!(parsed.peaks[0].summit, 15);
    }

    #[rstest]
    fn test_read_narrow_peak_without_offset_uses_midpoint() {
        let text = "chr1\t100\t201\tx\t0\t.\t1.0\t1.0\t1.0\t-1\n";
        let parsed = read_peaks(text.as_bytes()).unwrap();
        assert_eq!(parsed.peaks[0].summit, 150);
    }

    #[rstest]
    fn test_read_plain_bed_peaks() {
        let text = "chr1\t10\t30\nchr1\t50\t40\nchr1\t100\t200\tmine\t3.5\n";
        let parsed = read_peaks(text.as_bytes()).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.peaks[0].summit, 20);
        assert_eq!(parsed.peaks[0].name, "peak_1");
        assert_eq!(parsed.peaks[1].name, "mine");
        assert_eq!(parsed.peaks[1].summit_value, 3.5);
    }
}
