//! Read coverage as step functions.
//!
//! Every read is extended into an interval and the intervals are swept left
//! to right with integer counts, so the result is exact whatever the scale.
//! Chromosomes are independent and are piled up in parallel.

use log::debug;
use rayon::prelude::*;

use peakrs_core::models::{FragmentTrack, ReadTrack};

use crate::bedgraph::{ChromRuns, StepTrack};
use crate::errors::PileupError;

///
/// How far an interval reaches upstream and downstream of a read's 5' end,
/// as `(five_shift, three_shift)`.
///
/// Directional extension runs downstream only; symmetric extension centres
/// the interval on the read.
///
pub fn extension_shifts(ext_size: u32, directional: bool, half_extension: bool) -> (u32, u32) {
    match (directional, half_extension) {
        (true, false) => (0, ext_size),
        (true, true) => (0, ext_size / 2),
        (false, false) => (ext_size / 2, ext_size - ext_size / 2),
        (false, true) => (ext_size / 4, ext_size / 4),
    }
}

// sorted starts and ends of every extended read on one chromosome
fn read_intervals(plus: &[u32], minus: &[u32], five: u32, three: u32) -> (Vec<u32>, Vec<u32>) {
    let mut starts = Vec::with_capacity(plus.len() + minus.len());
    let mut ends = Vec::with_capacity(plus.len() + minus.len());
    for &p in plus {
        starts.push(p.saturating_sub(five));
        ends.push(p.saturating_add(three));
    }
    for &p in minus {
        starts.push(p.saturating_sub(three));
        ends.push(p.saturating_add(five));
    }
    starts.sort_unstable();
    ends.sort_unstable();
    (starts, ends)
}

fn fragment_intervals(fragments: &[(u32, u32)]) -> (Vec<u32>, Vec<u32>) {
    // already sorted by start
    let starts: Vec<u32> = fragments.iter().map(|f| f.0).collect();
    let mut ends: Vec<u32> = fragments.iter().map(|f| f.1).collect();
    ends.sort_unstable();
    (starts, ends)
}

// windows of `width` centred on each fragment midpoint
fn centred_intervals(fragments: &[(u32, u32)], width: u32) -> (Vec<u32>, Vec<u32>) {
    let left = width / 2;
    let right = width - left;
    let mut starts = Vec::with_capacity(fragments.len());
    let mut ends = Vec::with_capacity(fragments.len());
    for &(s, e) in fragments {
        let mid = s + (e - s) / 2;
        starts.push(mid.saturating_sub(left));
        ends.push(mid.saturating_add(right));
    }
    starts.sort_unstable();
    ends.sort_unstable();
    (starts, ends)
}

///
/// Sweep one set of sorted interval starts and ends into runs of
/// `count * scale`. The first run starts at 0.
///
fn sweep(starts: &[u32], ends: &[u32], scale: f64) -> ChromRuns {
    let mut runs = ChromRuns::default();
    let (mut i, mut j) = (0usize, 0usize);
    let mut position = 0u32;
    let mut count: i64 = 0;

    while i < starts.len() || j < ends.len() {
        let next = match (starts.get(i), ends.get(j)) {
            (Some(&s), Some(&e)) => s.min(e),
            (Some(&s), None) => s,
            (None, Some(&e)) => e,
            (None, None) => break,
        };
        if next > position {
            runs.push(next, count as f64 * scale);
            position = next;
        }
        while i < starts.len() && starts[i] == next {
            count += 1;
            i += 1;
        }
        while j < ends.len() && ends[j] == next {
            count -= 1;
            j += 1;
        }
    }
    runs
}

///
/// Sweep several interval sets at once, keeping at every position the largest
/// `count_k * scale_k`, never below `baseline`.
///
fn sweep_max(sets: &[(Vec<u32>, Vec<u32>)], scales: &[f64], baseline: f64) -> ChromRuns {
    let k = sets.len();
    let mut runs = ChromRuns::default();
    let mut heads = vec![(0usize, 0usize); k];
    let mut counts = vec![0i64; k];
    let mut position = 0u32;

    loop {
        let mut next: Option<u32> = None;
        for (set, head) in sets.iter().zip(heads.iter()) {
            for candidate in [set.0.get(head.0), set.1.get(head.1)].into_iter().flatten() {
                next = Some(next.map_or(*candidate, |n: u32| n.min(*candidate)));
            }
        }
        let Some(next) = next else {
            break;
        };
        if next > position {
            let value = counts
                .iter()
                .zip(scales.iter())
                .map(|(c, s)| *c as f64 * s)
                .fold(baseline, f64::max);
            runs.push(next, value);
            position = next;
        }
        for (idx, (starts, ends)) in sets.iter().enumerate() {
            while heads[idx].0 < starts.len() && starts[heads[idx].0] == next {
                counts[idx] += 1;
                heads[idx].0 += 1;
            }
            while heads[idx].1 < ends.len() && ends[heads[idx].1] == next {
                counts[idx] -= 1;
                heads[idx].1 += 1;
            }
        }
    }
    runs
}

fn collect_track(results: Vec<(String, ChromRuns)>, baseline: f64) -> StepTrack {
    let mut track = StepTrack::new(baseline);
    for (chrom, runs) in results {
        debug!("{}: {} pileup runs", chrom, runs.len());
        track.insert_chrom(&chrom, runs);
    }
    track
}

///
/// Pile up single-end reads extended to `ext_size`.
///
/// # Arguments
/// - track: finalized reads
/// - ext_size: fragment length each read is extended to
/// - scale: weight of one read
/// - directional: extend downstream of the 5' end instead of around it
/// - half_extension: extend to half the length
///
pub fn pileup(
    track: &ReadTrack,
    ext_size: u32,
    scale: f64,
    directional: bool,
    half_extension: bool,
) -> Result<StepTrack, PileupError> {
    let (five, three) = extension_shifts(ext_size, directional, half_extension);
    let chroms = track.chromosomes();
    let inputs = chroms
        .iter()
        .map(|c| Ok((*c, track.plus(c)?, track.minus(c)?)))
        .collect::<Result<Vec<_>, PileupError>>()?;

    let results: Vec<(String, ChromRuns)> = inputs
        .par_iter()
        .map(|(chrom, plus, minus)| {
            let (starts, ends) = read_intervals(plus, minus, five, three);
            (chrom.to_string(), sweep(&starts, &ends, scale))
        })
        .collect();
    Ok(collect_track(results, 0.0))
}

///
/// Pile up single-end reads at several extension sizes and keep the
/// pointwise maximum, floored at `baseline`.
///
/// This is the local background: each `(ext_sizes[k], scales[k])` pair is a
/// window, and the largest scaled count wins at every position.
///
pub fn pileup_with_multiple_extensions(
    track: &ReadTrack,
    ext_sizes: &[u32],
    scales: &[f64],
    baseline: f64,
    directional: bool,
    half_extension: bool,
) -> Result<StepTrack, PileupError> {
    if ext_sizes.len() != scales.len() {
        return Err(PileupError::MismatchedScales {
            extensions: ext_sizes.len(),
            scales: scales.len(),
        });
    }
    let shifts: Vec<(u32, u32)> = ext_sizes
        .iter()
        .map(|d| extension_shifts(*d, directional, half_extension))
        .collect();
    let chroms = track.chromosomes();
    let inputs = chroms
        .iter()
        .map(|c| Ok((*c, track.plus(c)?, track.minus(c)?)))
        .collect::<Result<Vec<_>, PileupError>>()?;

    let results: Vec<(String, ChromRuns)> = inputs
        .par_iter()
        .map(|(chrom, plus, minus)| {
            let sets: Vec<(Vec<u32>, Vec<u32>)> = shifts
                .iter()
                .map(|(five, three)| read_intervals(plus, minus, *five, *three))
                .collect();
            (chrom.to_string(), sweep_max(&sets, scales, baseline))
        })
        .collect();
    Ok(collect_track(results, baseline))
}

/// Pile up paired-end fragments as they are.
pub fn pileup_fragments(track: &FragmentTrack, scale: f64) -> Result<StepTrack, PileupError> {
    let chroms = track.chromosomes();
    let inputs = chroms
        .iter()
        .map(|c| Ok((*c, track.fragments(c)?)))
        .collect::<Result<Vec<_>, PileupError>>()?;

    let results: Vec<(String, ChromRuns)> = inputs
        .par_iter()
        .map(|(chrom, fragments)| {
            let (starts, ends) = fragment_intervals(fragments);
            (chrom.to_string(), sweep(&starts, &ends, scale))
        })
        .collect();
    Ok(collect_track(results, 0.0))
}

///
/// Multi-window background from paired-end fragments. A width of 0 uses the
/// fragments themselves; any other width is a window centred on each
/// fragment midpoint.
///
pub fn pileup_fragments_with_multiple_extensions(
    track: &FragmentTrack,
    widths: &[u32],
    scales: &[f64],
    baseline: f64,
) -> Result<StepTrack, PileupError> {
    if widths.len() != scales.len() {
        return Err(PileupError::MismatchedScales {
            extensions: widths.len(),
            scales: scales.len(),
        });
    }
    let chroms = track.chromosomes();
    let inputs = chroms
        .iter()
        .map(|c| Ok((*c, track.fragments(c)?)))
        .collect::<Result<Vec<_>, PileupError>>()?;

    let results: Vec<(String, ChromRuns)> = inputs
        .par_iter()
        .map(|(chrom, fragments)| {
            let sets: Vec<(Vec<u32>, Vec<u32>)> = widths
                .iter()
                .map(|w| match w {
                    0 => fragment_intervals(fragments),
                    w => centred_intervals(fragments, *w),
                })
                .collect();
            (chrom.to_string(), sweep_max(&sets, scales, baseline))
        })
        .collect();
    Ok(collect_track(results, baseline))
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    use peakrs_core::errors::TrackError;
    use peakrs_core::models::Strand;

    #[fixture]
    fn reads() -> ReadTrack {
        let mut track = ReadTrack::new(5);
        for p in [0, 1, 3, 4, 5] {
            track.add("chrY", p, Strand::Plus);
        }
        for p in [5, 6, 8, 9, 10] {
            track.add("chrY", p, Strand::Minus);
        }
        track.finalize();
        track
    }

    fn runs_of(track: &StepTrack, chrom: &str) -> Vec<(u32, u32, f64)> {
        track.chrom(chrom).unwrap().runs().collect()
    }

    #[rstest]
    #[case(200, true, false, (0, 200))]
    #[case(200, true, true, (0, 100))]
    #[case(201, false, false, (100, 101))]
    #[case(200, false, true, (50, 50))]
    fn test_extension_shifts(
        #[case] d: u32,
        #[case] directional: bool,
        #[case] half: bool,
        #[case] expected: (u32, u32),
    ) {
        assert_eq!(extension_shifts(d, directional, half), expected);
    }

    #[rstest]
    fn test_pileup_literal(reads: ReadTrack) {
        let track = pileup(&reads, 5, 0.5, true, false).unwrap();
        assert_eq!(
            runs_of(&track, "chrY"),
            vec![
                (0, 1, 1.0),
                (1, 3, 2.0),
                (3, 4, 3.0),
                (4, 6, 4.0),
                (6, 8, 3.0),
                (8, 9, 2.0),
                (9, 10, 1.0),
            ]
        );
    }

    #[rstest]
    fn test_pileup_leading_gap_starts_at_zero() {
        let mut reads = ReadTrack::new(10);
        reads.add("chr1", 100, Strand::Plus);
        reads.finalize();
        let track = pileup(&reads, 50, 1.0, true, false).unwrap();
        assert_eq!(runs_of(&track, "chr1"), vec![(0, 100, 0.0), (100, 150, 1.0)]);
    }

    #[rstest]
    fn test_pileup_clamps_minus_reads_at_zero() {
        let mut reads = ReadTrack::new(10);
        reads.add("chr1", 20, Strand::Minus);
        reads.finalize();
        let track = pileup(&reads, 50, 1.0, true, false).unwrap();
        assert_eq!(runs_of(&track, "chr1"), vec![(0, 20, 1.0)]);
    }

    #[rstest]
    fn test_pileup_requires_finalized_track() {
        let mut reads = ReadTrack::new(10);
        reads.add("chr1", 20, Strand::Minus);
        assert_eq!(
            pileup(&reads, 50, 1.0, true, false),
            Err(PileupError::Track(TrackError::NotFinalized))
        );
    }

    #[rstest]
    fn test_multiple_extensions_take_the_max(reads: ReadTrack) {
        let single = pileup(&reads, 5, 0.5, true, false).unwrap();
        let combined =
            pileup_with_multiple_extensions(&reads, &[5, 5], &[0.5, 0.25], 0.0, true, false).unwrap();
        assert_eq!(runs_of(&combined, "chrY"), runs_of(&single, "chrY"));
    }

    #[rstest]
    fn test_multiple_extensions_floor_at_baseline(reads: ReadTrack) {
        let combined =
            pileup_with_multiple_extensions(&reads, &[5], &[0.5], 2.5, true, false).unwrap();
        assert_eq!(
            runs_of(&combined, "chrY"),
            vec![(0, 3, 2.5), (3, 4, 3.0), (4, 6, 4.0), (6, 8, 3.0), (8, 10, 2.5)]
        );
        assert_eq!(combined.baseline(), 2.5);
    }

    #[rstest]
    fn test_multiple_extensions_checks_lengths(reads: ReadTrack) {
        assert_eq!(
            pileup_with_multiple_extensions(&reads, &[5, 10], &[1.0], 0.0, false, false),
            Err(PileupError::MismatchedScales {
                extensions: 2,
                scales: 1
            })
        );
    }

    #[rstest]
    fn test_pileup_fragments() {
        let mut frags = FragmentTrack::new();
        frags.add("chr1", 10, 30);
        frags.add("chr1", 20, 40);
        frags.finalize();

        let track = pileup_fragments(&frags, 1.0).unwrap();
        assert_eq!(
            runs_of(&track, "chr1"),
            vec![(0, 10, 0.0), (10, 20, 1.0), (20, 30, 2.0), (30, 40, 1.0)]
        );

        // midpoints 20 and 30, 10bp windows
        let wide = pileup_fragments_with_multiple_extensions(&frags, &[10], &[2.0], 0.0).unwrap();
        assert_eq!(
            runs_of(&wide, "chr1"),
            vec![(0, 15, 0.0), (15, 35, 2.0)]
        );
    }
}
