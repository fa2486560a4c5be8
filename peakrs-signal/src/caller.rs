//! Threshold scan over run-length encoded scores.
//!
//! A chromosome is a sequence of runs `(end, score)` with a matching pileup
//! per run. The scan is a two-state machine: outside any region until a run
//! reaches the cutoff, then inside until a sub-cutoff stretch of at least
//! `max_gap` bases (or the chromosome end) closes the region. Only regions at
//! least `min_length` long are kept.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallerParams {
    pub cutoff: f64,
    pub min_length: u32,
    pub max_gap: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BroadParams {
    /// Strict cutoff, used for the blocks.
    pub lvl1_cutoff: f64,
    /// Loose cutoff, used for the envelopes.
    pub lvl2_cutoff: f64,
    pub min_length: u32,
    pub lvl1_max_gap: u32,
    pub lvl2_max_gap: u32,
}

///
/// One closed region.
///
/// `runs` holds the indices of the above-cutoff runs inside the region, in
/// order; `summit_index` is the run holding the summit.
///
#[derive(Debug, Clone, PartialEq)]
pub struct CalledRegion {
    pub start: u32,
    pub end: u32,
    pub summit: u32,
    pub summit_index: usize,
    pub runs: Vec<usize>,
}

impl CalledRegion {
    /// Index range of every run covered by the region, below-cutoff gaps
    /// included.
    pub fn run_span(&self) -> std::ops::RangeInclusive<usize> {
        let first = self.runs.first().copied().unwrap_or(self.summit_index);
        let last = self.runs.last().copied().unwrap_or(self.summit_index);
        first..=last
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BroadRegion {
    pub envelope: CalledRegion,
    pub blocks: Vec<CalledRegion>,
}

#[inline]
pub(crate) fn run_start(ends: &[u32], i: usize) -> u32 {
    if i == 0 { 0 } else { ends[i - 1] }
}

enum ScanState {
    Outside,
    Inside(Vec<usize>),
}

fn close_region(
    ends: &[u32],
    pileup: &[f64],
    runs: Vec<usize>,
    min_length: u32,
) -> Option<CalledRegion> {
    let first = *runs.first()?;
    let last = *runs.last()?;
    let start = run_start(ends, first);
    let end = ends[last];
    if end - start < min_length {
        return None;
    }

    let top = runs
        .iter()
        .map(|&i| pileup[i])
        .fold(f64::NEG_INFINITY, f64::max);
    let tops: Vec<usize> = runs.iter().copied().filter(|&i| pileup[i] == top).collect();
    // middle-most of the tied candidates
    let summit_index = tops[(tops.len() + 1) / 2 - 1];
    let summit = (run_start(ends, summit_index) + ends[summit_index]) / 2;

    Some(CalledRegion {
        start,
        end,
        summit,
        summit_index,
        runs,
    })
}

///
/// Call regions on one chromosome.
///
/// # Arguments
/// - ends: run end positions, strictly increasing
/// - scores: score per run, compared against the cutoff
/// - pileup: value per run used to place summits
/// - params: cutoff, minimum length and maximum gap
///
pub fn scan(ends: &[u32], scores: &[f64], pileup: &[f64], params: &CallerParams) -> Vec<CalledRegion> {
    let mut regions = Vec::new();
    let mut state = ScanState::Outside;

    for i in 0..ends.len() {
        // NaN never opens or extends a region
        if !(scores[i] >= params.cutoff) {
            continue;
        }
        let start = run_start(ends, i);
        state = match state {
            ScanState::Outside => ScanState::Inside(vec![i]),
            ScanState::Inside(mut runs) => {
                let previous_end = runs.last().map(|&j| ends[j]).unwrap_or(start);
                let gap = start - previous_end;
                if gap == 0 || gap < params.max_gap {
                    runs.push(i);
                    ScanState::Inside(runs)
                } else {
                    if let Some(region) = close_region(ends, pileup, runs, params.min_length) {
                        regions.push(region);
                    }
                    ScanState::Inside(vec![i])
                }
            }
        };
    }

    if let ScanState::Inside(runs) = state {
        if let Some(region) = close_region(ends, pileup, runs, params.min_length) {
            regions.push(region);
        }
    }
    regions
}

///
/// Two-level scan: envelopes from the loose cutoff, each kept only if it
/// overlaps at least one strict region. The strict regions, clipped to the
/// envelope, become its blocks.
///
pub fn scan_broad(
    ends: &[u32],
    scores: &[f64],
    pileup: &[f64],
    params: &BroadParams,
) -> Vec<BroadRegion> {
    let strict = scan(
        ends,
        scores,
        pileup,
        &CallerParams {
            cutoff: params.lvl1_cutoff,
            min_length: params.min_length,
            max_gap: params.lvl1_max_gap,
        },
    );
    let loose = scan(
        ends,
        scores,
        pileup,
        &CallerParams {
            cutoff: params.lvl2_cutoff,
            min_length: params.min_length,
            max_gap: params.lvl2_max_gap,
        },
    );

    let mut broad = Vec::new();
    let mut j = 0usize;
    for envelope in loose {
        while j < strict.len() && strict[j].end <= envelope.start {
            j += 1;
        }
        let mut blocks = Vec::new();
        let mut k = j;
        while k < strict.len() && strict[k].start < envelope.end {
            let mut block = strict[k].clone();
            block.start = block.start.max(envelope.start);
            block.end = block.end.min(envelope.end);
            block.summit = block.summit.clamp(block.start, block.end - 1);
            block.runs.retain(|&r| r >= envelope.runs[0] && r <= envelope.runs[envelope.runs.len() - 1]);
            blocks.push(block);
            k += 1;
        }
        if blocks.is_empty() {
            continue;
        }

        let mut envelope = envelope;
        if let Some(best) = blocks
            .iter()
            .max_by(|a, b| pileup[a.summit_index].total_cmp(&pileup[b.summit_index]))
        {
            envelope.summit = best.summit;
            envelope.summit_index = best.summit_index;
        }
        broad.push(BroadRegion { envelope, blocks });
    }
    broad
}

/// Per-base values over the full span of a region.
pub fn expand_region(ends: &[u32], values: &[f64], region: &CalledRegion) -> Vec<f64> {
    let mut per_base = Vec::with_capacity((region.end - region.start) as usize);
    for i in region.run_span() {
        let start = run_start(ends, i).max(region.start);
        let end = ends[i].min(region.end);
        per_base.extend(std::iter::repeat_n(values[i], end.saturating_sub(start) as usize));
    }
    per_base
}

///
/// Summits of a region after multi-summit refinement, as `(position, run)`
/// pairs. Maxima whose run scores below the cutoff are dropped; when none
/// survive the region keeps its single summit.
///
pub fn refine_summits(
    ends: &[u32],
    scores: &[f64],
    pileup: &[f64],
    region: &CalledRegion,
    cutoff: f64,
    window: usize,
) -> Vec<(u32, usize)> {
    let per_base = expand_region(ends, pileup, region);
    let span = region.run_span();
    let found: Vec<(u32, usize)> = subpeak_summits(&per_base, window)
        .into_iter()
        .filter_map(|offset| {
            let position = region.start + offset as u32;
            let idx = ends.partition_point(|&e| e <= position);
            (span.contains(&idx) && scores[idx] >= cutoff).then_some((position, idx))
        })
        .collect();
    if found.is_empty() {
        vec![(region.summit, region.summit_index)]
    } else {
        found
    }
}

fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let half = window / 2;
    let mut prefix = Vec::with_capacity(values.len() + 1);
    prefix.push(0.0);
    for v in values {
        prefix.push(prefix[prefix.len() - 1] + v);
    }
    (0..values.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(values.len());
            (prefix[hi] - prefix[lo]) / (hi - lo) as f64
        })
        .collect()
}

///
/// Offsets of the credible local maxima of a per-base signal.
///
/// The signal is smoothed with a centered moving average of `window` bases.
/// Extrema are taken where the derivative changes sign, in the middle of any
/// plateau. A maximum survives when it exceeds `m + sqrt(m)`, `m` being the
/// larger of its two neighbouring minima; the signal edges count as minima.
///
pub fn subpeak_summits(values: &[f64], window: usize) -> Vec<usize> {
    if values.len() < 3 {
        return Vec::new();
    }
    let smoothed = moving_average(values, window.max(1));
    let n = smoothed.len();

    // (position, is_maximum), alternating
    let mut extrema: Vec<(usize, bool)> = vec![(0, false)];
    let mut last_sign = 0i8;
    let mut last_nonzero = 0usize;
    for i in 0..n - 1 {
        let d = smoothed[i + 1] - smoothed[i];
        let sign = if d > 0.0 {
            1
        } else if d < 0.0 {
            -1
        } else {
            0
        };
        if sign == 0 {
            continue;
        }
        if last_sign != 0 && sign != last_sign {
            let position = (last_nonzero + 1 + i) / 2;
            extrema.push((position, last_sign > 0));
        }
        last_sign = sign;
        last_nonzero = i;
    }
    extrema.push((n - 1, false));

    let mut summits = Vec::new();
    for (idx, &(position, is_max)) in extrema.iter().enumerate() {
        if !is_max {
            continue;
        }
        let left = extrema[..idx]
            .iter()
            .rev()
            .find(|(_, m)| !m)
            .map(|(p, _)| smoothed[*p])
            .unwrap_or(smoothed[0]);
        let right = extrema[idx + 1..]
            .iter()
            .find(|(_, m)| !m)
            .map(|(p, _)| smoothed[*p])
            .unwrap_or(smoothed[n - 1]);
        let m = left.max(right).max(0.0);
        if smoothed[position] > m + m.sqrt() {
            summits.push(position);
        }
    }
    summits
}
