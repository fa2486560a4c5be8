//! Summit refinement from strand-resolved reads.
//!
//! At a binding site plus reads pile up on the left and minus reads on the
//! right. Every position near the called summit is scored by how well the
//! reads around it fit that picture, and the best position becomes the new
//! summit.

use log::{debug, info};

use peakrs_core::errors::TrackError;
use peakrs_core::models::{Peak, PeakSet, ReadTrack};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefineOptions {
    /// Reads are counted this far to each side of a position, and positions
    /// this far to each side of the summit are tried.
    pub window: u32,
}

impl Default for RefineOptions {
    fn default() -> Self {
        RefineOptions { window: 100 }
    }
}

fn count_in(positions: &[u32], start: u32, end: u32) -> u64 {
    (positions.partition_point(|&p| p < end) - positions.partition_point(|&p| p < start)) as u64
}

///
/// `2 * sqrt(plus_left * minus_right) - plus_right - minus_left`, with reads
/// counted in `[position - window, position)` and `[position, position + window)`.
///
pub fn strand_balance(plus: &[u32], minus: &[u32], position: u32, window: u32) -> f64 {
    let lo = position.saturating_sub(window);
    let hi = position.saturating_add(window);
    let plus_left = count_in(plus, lo, position) as f64;
    let plus_right = count_in(plus, position, hi) as f64;
    let minus_left = count_in(minus, lo, position) as f64;
    let minus_right = count_in(minus, position, hi) as f64;
    2.0 * (plus_left * minus_right).sqrt() - plus_right - minus_left
}

///
/// Best position for one peak and its score. Positions within `window` of the
/// summit are tried, never leaving `[peak.start, peak.end)`. Ties go to the
/// middle-most position.
///
pub fn refine_summit(plus: &[u32], minus: &[u32], peak: &Peak, window: u32) -> (u32, f64) {
    let last = peak.end.saturating_sub(1).max(peak.start);
    let summit = peak.summit.clamp(peak.start, last);
    let lo = summit.saturating_sub(window).max(peak.start);
    let hi = summit.saturating_add(window).min(last);
    let mut best = f64::NEG_INFINITY;
    let mut best_positions = Vec::new();
    for position in lo..=hi {
        let score = strand_balance(plus, minus, position, window);
        if score > best {
            best = score;
            best_positions.clear();
        }
        if score == best {
            best_positions.push(position);
        }
    }
    (best_positions[best_positions.len() / 2], best)
}

///
/// Refine the summit of every peak. Peaks on chromosomes without reads keep
/// their summit and score 0.
///
pub fn refine_peaks(peaks: &PeakSet, reads: &ReadTrack, options: &RefineOptions) -> Result<PeakSet, TrackError> {
    let known = reads.chromosomes();
    let mut refined = Vec::with_capacity(peaks.len());
    let mut moved = 0usize;
    for peak in peaks.iter() {
        let mut out = Peak {
            summit_value: 0.0,
            ..peak.clone()
        };
        if known.contains(&peak.chr.as_str()) {
            let plus = reads.plus(&peak.chr)?;
            let minus = reads.minus(&peak.chr)?;
            let (summit, score) = refine_summit(plus, minus, peak, options.window);
            if summit != peak.summit {
                moved += 1;
            }
            out.summit = summit;
            out.summit_value = score;
        } else {
            debug!("No reads on {}, keeping the summit of {}", peak.chr, peak.name);
        }
        refined.push(out);
    }
    info!("Refined {} peaks, {} summits moved", refined.len(), moved);
    Ok(PeakSet::new(refined))
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    use peakrs_core::models::Strand;

    #[fixture]
    fn site_reads() -> ReadTrack {
        // plus reads left of 500, minus reads right of it
        let mut track = ReadTrack::new(36);
        for p in [430, 440, 450, 460, 470, 480, 490] {
            track.add("chr1", p, Strand::Plus);
        }
        for p in [510, 520, 530, 540, 550, 560, 570] {
            track.add("chr1", p, Strand::Minus);
        }
        track.finalize();
        track
    }

    #[rstest]
    fn test_strand_balance() {
        let plus = [10, 20, 30];
        let minus = [60, 70];
        // 3 plus on the left, 2 minus on the right
        assert_eq!(strand_balance(&plus, &minus, 50, 40), 2.0 * 6f64.sqrt());
        // everything on the wrong side
        assert_eq!(strand_balance(&plus, &minus, 0, 100), -3.0);
    }

    #[rstest]
    fn test_refine_moves_summit_between_strands(site_reads: ReadTrack) {
        let peaks = PeakSet::new(vec![Peak {
            name: "p1".to_string(),
            ..Peak::new("chr1", 400, 600, 430)
        }]);
        let refined = refine_peaks(&peaks, &site_reads, &RefineOptions { window: 100 }).unwrap();
        let peak = refined.iter().next().unwrap();
        // 7 and 7 reads on the proper sides anywhere in 491..=510
        assert_eq!(peak.summit, 501);
        assert_eq!(peak.summit_value, 14.0);
        assert_eq!((peak.start, peak.end, peak.name.as_str()), (400, 600, "p1"));
    }

    #[rstest]
    fn test_refined_summit_stays_inside_peak(site_reads: ReadTrack) {
        // the balance point at 501 lies right of the peak; 471..=479 tie
        let peaks = PeakSet::new(vec![Peak::new("chr1", 400, 480, 470)]);
        let refined = refine_peaks(&peaks, &site_reads, &RefineOptions { window: 100 }).unwrap();
        let peak = refined.iter().next().unwrap();
        assert_eq!(peak.summit, 475);
    }

    #[rstest]
    fn test_refine_keeps_peaks_without_reads(site_reads: ReadTrack) {
        let peaks = PeakSet::new(vec![Peak::new("chr9", 0, 100, 42)]);
        let refined = refine_peaks(&peaks, &site_reads, &RefineOptions::default()).unwrap();
        assert_eq!(refined.iter().next().unwrap().summit, 42);
    }
}
