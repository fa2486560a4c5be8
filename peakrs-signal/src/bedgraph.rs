use std::collections::BTreeMap;
use std::io::{BufRead, Write};

use log::{debug, warn};

use peakrs_core::models::{BroadPeak, BroadPeakSet, Peak, PeakSet};

use crate::caller::{self, BroadParams, CallerParams, run_start};
use crate::errors::BedGraphError;

///
/// Runs of one chromosome: `values[i]` holds on `[ends[i - 1], ends[i])`,
/// the first run starting at 0.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChromRuns {
    pub ends: Vec<u32>,
    pub values: Vec<f64>,
}

impl ChromRuns {
    pub fn len(&self) -> usize {
        self.ends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }

    pub fn last_end(&self) -> u32 {
        self.ends.last().copied().unwrap_or(0)
    }

    ///
    /// Append a run ending at `end`, extending the last run instead when it
    /// carries the same value. `end` must lie past the current last end.
    ///
    pub fn push(&mut self, end: u32, value: f64) {
        if end <= self.last_end() {
            return;
        }
        match self.values.last() {
            Some(last) if *last == value => {
                if let Some(e) = self.ends.last_mut() {
                    *e = end;
                }
            }
            _ => {
                self.ends.push(end);
                self.values.push(value);
            }
        }
    }

    /// `(start, end, value)` per run.
    pub fn runs(&self) -> impl Iterator<Item = (u32, u32, f64)> + '_ {
        (0..self.ends.len()).map(|i| (run_start(&self.ends, i), self.ends[i], self.values[i]))
    }

    /// Index of the run holding `position`, if any.
    pub fn index_of(&self, position: u32) -> Option<usize> {
        let idx = self.ends.partition_point(|&e| e <= position);
        (idx < self.ends.len()).then_some(idx)
    }
}

///
/// Walk two run sequences together, calling `emit(end, a, b)` for every
/// piece of their common refinement up to the shorter of the two.
///
pub fn sweep_pair<F: FnMut(u32, f64, f64)>(a: &ChromRuns, b: &ChromRuns, mut emit: F) {
    let (mut i, mut j) = (0usize, 0usize);
    while i < a.ends.len() && j < b.ends.len() {
        let end = a.ends[i].min(b.ends[j]);
        emit(end, a.values[i], b.values[j]);
        if a.ends[i] == end {
            i += 1;
        }
        if b.ends[j] == end {
            j += 1;
        }
    }
}

/// Length-weighted description of a track's values.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrackSummary {
    pub total_length: u64,
    pub sum: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub std: f64,
}

///
/// Right-continuous step function per chromosome, the in-memory form of a
/// bedGraph.
///
/// Adjacent runs never share a value. Positions not covered by any run are
/// implicitly at `baseline`.
///
#[derive(Debug, Clone, PartialEq)]
pub struct StepTrack {
    chroms: BTreeMap<String, ChromRuns>,
    baseline: f64,
}

impl Default for StepTrack {
    fn default() -> Self {
        StepTrack::new(0.0)
    }
}

impl StepTrack {
    pub fn new(baseline: f64) -> Self {
        StepTrack {
            chroms: BTreeMap::new(),
            baseline,
        }
    }

    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    pub fn chromosomes(&self) -> Vec<&str> {
        self.chroms.keys().map(|k| k.as_str()).collect()
    }

    pub fn chrom(&self, chrom: &str) -> Option<&ChromRuns> {
        self.chroms.get(chrom)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ChromRuns)> {
        self.chroms.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Replace a whole chromosome.
    pub fn insert_chrom(&mut self, chrom: &str, runs: ChromRuns) {
        self.chroms.insert(chrom.to_string(), runs);
    }

    /// Last covered position per chromosome.
    pub fn chrom_ends(&self) -> BTreeMap<String, u32> {
        self.chroms
            .iter()
            .map(|(k, v)| (k.clone(), v.last_end()))
            .collect()
    }

    ///
    /// Add `[start, end)` at `value`.
    ///
    /// A gap before `start` is filled with the baseline. Runs must arrive in
    /// order; a start before the current end is an error. Empty intervals are
    /// ignored.
    ///
    pub fn add(&mut self, chrom: &str, start: u32, end: u32, value: f64) -> Result<(), BedGraphError> {
        if end <= start {
            return Ok(());
        }
        let baseline = self.baseline;
        let runs = self.chroms.entry(chrom.to_string()).or_default();
        let current = runs.last_end();
        if start < current {
            return Err(BedGraphError::Unordered {
                chrom: chrom.to_string(),
                start,
                end,
                current,
            });
        }
        if start > current {
            runs.push(start, baseline);
        }
        runs.push(end, value);
        Ok(())
    }

    ///
    /// Combine two tracks run by run.
    ///
    /// Only chromosomes present in both are kept, each up to the shorter of
    /// the two. The new baseline is `combine(baseline, other.baseline)`.
    ///
    pub fn overlay<F: Fn(f64, f64) -> f64>(&self, other: &StepTrack, combine: F) -> StepTrack {
        let mut result = StepTrack::new(combine(self.baseline, other.baseline));
        for (chrom, a) in &self.chroms {
            let Some(b) = other.chroms.get(chrom) else {
                continue;
            };
            let mut runs = ChromRuns::default();
            sweep_pair(a, b, |end, x, y| runs.push(end, combine(x, y)));
            result.chroms.insert(chrom.clone(), runs);
        }
        result
    }

    /// Apply `f` to every value, merging runs that become equal.
    pub fn map_values<F: Fn(f64) -> f64>(&self, f: F) -> StepTrack {
        let mut result = StepTrack::new(f(self.baseline));
        for (chrom, runs) in &self.chroms {
            let mut mapped = ChromRuns::default();
            for (end, value) in runs.ends.iter().zip(runs.values.iter()) {
                mapped.push(*end, f(*value));
            }
            result.chroms.insert(chrom.clone(), mapped);
        }
        result
    }

    pub fn scale(&self, factor: f64) -> StepTrack {
        self.map_values(|v| v * factor)
    }

    ///
    /// Extend chromosomes with the baseline up to the given ends, creating
    /// missing chromosomes. Chromosomes already longer are left untouched.
    ///
    pub fn pad_to(&mut self, ends: &BTreeMap<String, u32>) {
        for (chrom, end) in ends {
            let runs = self.chroms.entry(chrom.clone()).or_default();
            if *end > runs.last_end() {
                runs.push(*end, self.baseline);
            }
        }
    }

    /// Keep only the named chromosomes.
    pub fn retain_chroms(&mut self, keep: &[String]) {
        self.chroms.retain(|k, _| keep.contains(k));
    }

    /// Value at a position; the baseline outside covered runs.
    pub fn value_at(&self, chrom: &str, position: u32) -> f64 {
        self.chroms
            .get(chrom)
            .and_then(|runs| runs.index_of(position).map(|i| runs.values[i]))
            .unwrap_or(self.baseline)
    }

    /// Covered bases over all chromosomes.
    pub fn total_length(&self) -> u64 {
        self.chroms.values().map(|r| r.last_end() as u64).sum()
    }

    pub fn summary(&self) -> TrackSummary {
        let mut summary = TrackSummary {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            ..Default::default()
        };
        let mut sum_sq = 0.0;
        for runs in self.chroms.values() {
            for (start, end, value) in runs.runs() {
                let length = (end - start) as f64;
                summary.total_length += (end - start) as u64;
                summary.sum += value * length;
                sum_sq += value * value * length;
                summary.min = summary.min.min(value);
                summary.max = summary.max.max(value);
            }
        }
        if summary.total_length == 0 {
            return TrackSummary::default();
        }
        let n = summary.total_length as f64;
        summary.mean = summary.sum / n;
        summary.std = (sum_sq / n - summary.mean * summary.mean).max(0.0).sqrt();
        summary
    }

    ///
    /// Threshold-scan the values into peaks.
    ///
    /// Summits sit at the highest value; with `call_summits` every credible
    /// local maximum of a region gives its own peak. Peaks carry the value at
    /// their summit as `summit_value` and `pileup`, and are not named.
    ///
    pub fn call_regions(&self, cutoff: f64, min_length: u32, max_gap: u32, call_summits: bool) -> PeakSet {
        let params = CallerParams {
            cutoff,
            min_length,
            max_gap,
        };
        let mut peaks = Vec::new();
        for (chrom, runs) in &self.chroms {
            let regions = caller::scan(&runs.ends, &runs.values, &runs.values, &params);
            debug!("{}: {} regions above {}", chrom, regions.len(), cutoff);
            for region in regions {
                let summits = if call_summits {
                    caller::refine_summits(
                        &runs.ends,
                        &runs.values,
                        &runs.values,
                        &region,
                        cutoff,
                        min_length as usize,
                    )
                } else {
                    vec![(region.summit, region.summit_index)]
                };
                for (summit, idx) in summits {
                    let mut peak = Peak::new(chrom, region.start, region.end, summit);
                    peak.summit_value = runs.values[idx];
                    peak.pileup = runs.values[idx];
                    peaks.push(peak);
                }
            }
        }
        PeakSet::new(peaks)
    }

    ///
    /// Two-level scan into broad peaks whose annotations are length-weighted
    /// means of the values over the envelope.
    ///
    pub fn call_broad_regions(
        &self,
        lvl1_cutoff: f64,
        lvl2_cutoff: f64,
        min_length: u32,
        lvl1_max_gap: u32,
        lvl2_max_gap: u32,
    ) -> BroadPeakSet {
        let params = BroadParams {
            lvl1_cutoff,
            lvl2_cutoff,
            min_length,
            lvl1_max_gap,
            lvl2_max_gap,
        };
        let mut peaks = Vec::new();
        for (chrom, runs) in &self.chroms {
            for region in caller::scan_broad(&runs.ends, &runs.values, &runs.values, &params) {
                let envelope = &region.envelope;
                let mean = weighted_mean(&runs.ends, envelope.start, envelope.end, |i| runs.values[i]);
                let mut peak = Peak::new(chrom, envelope.start, envelope.end, envelope.summit);
                peak.summit_value = runs.values[envelope.summit_index];
                peak.pileup = mean;
                peaks.push(BroadPeak {
                    peak,
                    blocks: region.blocks.iter().map(|b| (b.start, b.end)).collect(),
                });
            }
        }
        BroadPeakSet::new(peaks)
    }

    ///
    /// Write as bedGraph, omitting runs at the baseline value.
    ///
    /// A `track type=bedGraph` line is written first when `name` is given.
    ///
    pub fn write_bedgraph<W: Write>(
        &self,
        writer: &mut W,
        name: Option<&str>,
        description: Option<&str>,
    ) -> std::io::Result<()> {
        if let Some(name) = name {
            writeln!(
                writer,
                "track type=bedGraph name=\"{}\" description=\"{}\"",
                name,
                description.unwrap_or(name)
            )?;
        }
        for (chrom, runs) in &self.chroms {
            for (start, end, value) in runs.runs() {
                if value == self.baseline {
                    continue;
                }
                writeln!(writer, "{}\t{}\t{}\t{:.5}", chrom, start, end, value)?;
            }
        }
        Ok(())
    }

    ///
    /// Parse bedGraph text. `track`, `browser` and `#` lines are ignored and
    /// gaps between runs are left at the baseline. Runs must be ordered and
    /// non-overlapping per chromosome; negative values are rejected unless
    /// `allow_negative` is set.
    ///
    pub fn read_bedgraph<R: BufRead>(
        reader: R,
        baseline: f64,
        allow_negative: bool,
    ) -> Result<StepTrack, BedGraphError> {
        let mut track = StepTrack::new(baseline);
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty()
                || line.starts_with('#')
                || line.starts_with("track")
                || line.starts_with("browser")
            {
                continue;
            }
            let format_error = |reason: String| BedGraphError::Format {
                line: idx + 1,
                reason,
            };
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 {
                return Err(format_error(format!("expected 4 columns, found {}", fields.len())));
            }
            let start = fields[1]
                .parse::<u32>()
                .map_err(|e| format_error(format!("bad start '{}': {}", fields[1], e)))?;
            let end = fields[2]
                .parse::<u32>()
                .map_err(|e| format_error(format!("bad end '{}': {}", fields[2], e)))?;
            let value = fields[3]
                .parse::<f64>()
                .map_err(|e| format_error(format!("bad value '{}': {}", fields[3], e)))?;
            if !allow_negative && value < 0.0 {
                return Err(format_error(format!("negative value {}", value)));
            }
            if end <= start {
                warn!("Skipping empty bedGraph run at line {}", idx + 1);
                continue;
            }
            track.add(fields[0], start, end, value).map_err(|e| match e {
                BedGraphError::Unordered { .. } => format_error(e.to_string()),
                other => other,
            })?;
        }
        Ok(track)
    }
}

/// Mean of `value(i)` over `[start, end)`, weighted by run overlap.
pub(crate) fn weighted_mean<F: Fn(usize) -> f64>(ends: &[u32], start: u32, end: u32, value: F) -> f64 {
    let mut sum = 0.0;
    let mut length = 0u64;
    let mut i = ends.partition_point(|&e| e <= start);
    while i < ends.len() && run_start(ends, i) < end {
        let s = run_start(ends, i).max(start);
        let e = ends[i].min(end);
        sum += value(i) * (e - s) as f64;
        length += (e - s) as u64;
        i += 1;
    }
    if length == 0 { 0.0 } else { sum / length as f64 }
}

/// Build a track from `(chrom, start, end, value)` tuples given in order.
pub fn from_intervals<'a, I>(intervals: I, baseline: f64) -> Result<StepTrack, BedGraphError>
where
    I: IntoIterator<Item = (&'a str, u32, u32, f64)>,
{
    let mut track = StepTrack::new(baseline);
    for (chrom, start, end, value) in intervals {
        track.add(chrom, start, end, value)?;
    }
    Ok(track)
}
