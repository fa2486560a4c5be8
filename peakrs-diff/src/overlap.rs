use std::collections::HashMap;

use peakrs_core::models::PeakSet;

///
/// Interval lookup over a peak set: intervals sorted by start with the running
/// maximum of their ends, so a query only walks intervals that can overlap.
///
#[derive(Debug, Clone, Default)]
pub struct OverlapIndex {
    chroms: HashMap<String, ChromIntervals>,
}

#[derive(Debug, Clone, Default)]
struct ChromIntervals {
    intervals: Vec<(u32, u32)>,
    max_end: Vec<u32>,
}

impl OverlapIndex {
    pub fn new(peaks: &PeakSet) -> Self {
        let mut grouped: HashMap<String, Vec<(u32, u32)>> = HashMap::new();
        for p in peaks.iter() {
            grouped.entry(p.chr.clone()).or_default().push((p.start, p.end));
        }
        let chroms = grouped
            .into_iter()
            .map(|(chrom, mut intervals)| {
                intervals.sort_unstable();
                let mut running = 0;
                let max_end = intervals
                    .iter()
                    .map(|(_, e)| {
                        running = running.max(*e);
                        running
                    })
                    .collect();
                (chrom, ChromIntervals { intervals, max_end })
            })
            .collect();
        OverlapIndex { chroms }
    }

    pub fn overlaps(&self, chrom: &str, start: u32, end: u32) -> bool {
        let Some(c) = self.chroms.get(chrom) else {
            return false;
        };
        let idx = c.intervals.partition_point(|(s, _)| *s < end);
        idx > 0 && c.max_end[idx - 1] > start
    }

    /// Every interval overlapping `[start, end)`, ordered by start.
    pub fn overlapping(&self, chrom: &str, start: u32, end: u32) -> Vec<(u32, u32)> {
        let Some(c) = self.chroms.get(chrom) else {
            return Vec::new();
        };
        let mut found = Vec::new();
        let mut i = c.intervals.partition_point(|(s, _)| *s < end);
        while i > 0 && c.max_end[i - 1] > start {
            i -= 1;
            if c.intervals[i].1 > start {
                found.push(c.intervals[i]);
            }
        }
        found.reverse();
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    use peakrs_core::models::Peak;

    #[fixture]
    fn index() -> OverlapIndex {
        OverlapIndex::new(&PeakSet::new(vec![
            Peak::new("chr1", 0, 1000, 500),
            Peak::new("chr1", 100, 200, 150),
            Peak::new("chr1", 1500, 1600, 1550),
            Peak::new("chr2", 10, 20, 15),
        ]))
    }

    #[rstest]
    #[case("chr1", 900, 1100, true)]
    #[case("chr1", 1000, 1500, false)]
    #[case("chr1", 1599, 1700, true)]
    #[case("chr2", 0, 10, false)]
    #[case("chr3", 0, 100, false)]
    fn test_overlaps(index: OverlapIndex, #[case] chrom: &str, #[case] start: u32, #[case] end: u32, #[case] expected: bool) {
        assert_eq!(index.overlaps(chrom, start, end), expected);
    }

    #[rstest]
    fn test_overlapping_behind_long_interval(index: OverlapIndex) {
        // the short interval is nested in the long one
        assert_eq!(index.overlapping("chr1", 150, 160), vec![(0, 1000), (100, 200)]);
        assert_eq!(index.overlapping("chr1", 300, 1550), vec![(0, 1000), (1500, 1600)]);
    }
}
