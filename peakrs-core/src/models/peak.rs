use std::fmt::{self, Display};

///
/// A called region with its summit and significance annotations.
///
/// `summit_value` is the score at the summit, `pileup` the treatment pileup
/// there. p and q are stored as `-log10` values.
///
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Peak {
    pub chr: String,
    pub start: u32,
    pub end: u32,
    pub summit: u32,
    pub summit_value: f64,
    pub pileup: f64,
    pub fold_enrichment: f64,
    pub neglog10_pvalue: f64,
    pub neglog10_qvalue: f64,
    pub name: String,
}

impl Peak {
    pub fn new(chr: &str, start: u32, end: u32, summit: u32) -> Self {
        Peak {
            chr: chr.to_string(),
            start,
            end,
            summit,
            ..Default::default()
        }
    }

    pub fn width(&self) -> u32 {
        self.end - self.start
    }

    /// Summit relative to the peak start.
    pub fn summit_offset(&self) -> u32 {
        self.summit.saturating_sub(self.start)
    }

    pub fn overlaps(&self, other: &Peak) -> bool {
        self.chr == other.chr && self.start < other.end && other.start < self.end
    }
}

impl Display for Peak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.chr, self.start, self.end)
    }
}

///
/// A loose-cutoff envelope with the strict-cutoff blocks found inside it.
///
/// The envelope carries length-weighted annotations; `peak.summit` is the
/// summit of the highest block.
///
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BroadPeak {
    pub peak: Peak,
    pub blocks: Vec<(u32, u32)>,
}

impl BroadPeak {
    /// Blocks lie inside the envelope, sorted and disjoint.
    pub fn blocks_are_nested(&self) -> bool {
        let inside = self
            .blocks
            .iter()
            .all(|(s, e)| s < e && *s >= self.peak.start && *e <= self.peak.end);
        let ordered = self.blocks.windows(2).all(|w| w[0].1 <= w[1].0);
        inside && ordered
    }
}

fn peak_order(a: &Peak, b: &Peak) -> std::cmp::Ordering {
    a.chr
        .cmp(&b.chr)
        .then(a.start.cmp(&b.start))
        .then(a.end.cmp(&b.end))
        .then(a.summit.cmp(&b.summit))
}

// a, b, ..., z, aa, ab, ...
fn letter_suffix(mut idx: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'a' + (idx % 26) as u8) as char);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    letters.iter().rev().collect()
}

///
/// All narrow peaks of one run, ordered by chromosome then start.
///
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PeakSet {
    pub peaks: Vec<Peak>,
}

impl PeakSet {
    pub fn new(mut peaks: Vec<Peak>) -> Self {
        peaks.sort_by(peak_order);
        PeakSet { peaks }
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Peak> {
        self.peaks.iter()
    }

    pub fn extend(&mut self, other: PeakSet) {
        self.peaks.extend(other.peaks);
        self.peaks.sort_by(peak_order);
    }

    ///
    /// Name peaks `{prefix}_{n}` in order, counting from 1.
    ///
    /// Consecutive peaks sharing the same interval are summits of one region;
    /// they share the number and get letter suffixes `a`, `b`, ...
    ///
    pub fn assign_names(&mut self, prefix: &str) {
        let mut n = 0usize;
        let mut i = 0usize;
        while i < self.peaks.len() {
            let mut j = i + 1;
            while j < self.peaks.len()
                && self.peaks[j].chr == self.peaks[i].chr
                && self.peaks[j].start == self.peaks[i].start
                && self.peaks[j].end == self.peaks[i].end
            {
                j += 1;
            }
            n += 1;
            if j - i == 1 {
                self.peaks[i].name = format!("{}_{}", prefix, n);
            } else {
                for (k, peak) in self.peaks[i..j].iter_mut().enumerate() {
                    peak.name = format!("{}_{}{}", prefix, n, letter_suffix(k));
                }
            }
            i = j;
        }
    }

    /// Total bases covered, counting shared intervals once.
    pub fn total_length(&self) -> u64 {
        let mut total = 0u64;
        let mut last: Option<(&str, u32, u32)> = None;
        for p in &self.peaks {
            if last != Some((p.chr.as_str(), p.start, p.end)) {
                total += p.width() as u64;
            }
            last = Some((p.chr.as_str(), p.start, p.end));
        }
        total
    }
}

impl IntoIterator for PeakSet {
    type Item = Peak;
    type IntoIter = std::vec::IntoIter<Peak>;

    fn into_iter(self) -> Self::IntoIter {
        self.peaks.into_iter()
    }
}

///
/// All broad peaks of one run, ordered by chromosome then start.
///
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BroadPeakSet {
    pub peaks: Vec<BroadPeak>,
}

impl BroadPeakSet {
    pub fn new(mut peaks: Vec<BroadPeak>) -> Self {
        peaks.sort_by(|a, b| peak_order(&a.peak, &b.peak));
        BroadPeakSet { peaks }
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BroadPeak> {
        self.peaks.iter()
    }

    pub fn assign_names(&mut self, prefix: &str) {
        for (i, broad) in self.peaks.iter_mut().enumerate() {
            broad.peak.name = format!("{}_{}", prefix, i + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_peakset_orders_by_chrom_then_start() {
        let set = PeakSet::new(vec![
            Peak::new("chr2", 10, 20, 15),
            Peak::new("chr1", 50, 60, 55),
            Peak::new("chr1", 5, 9, 7),
        ]);
        let coords: Vec<(&str, u32)> = set.iter().map(|p| (p.chr.as_str(), p.start)).collect();
        assert_eq!(coords, vec![("chr1", 5), ("chr1", 50), ("chr2", 10)]);
    }

    #[rstest]
    fn test_assign_names_with_subpeaks() {
        let mut set = PeakSet::new(vec![
            Peak::new("chr1", 0, 100, 20),
            Peak::new("chr1", 0, 100, 70),
            Peak::new("chr1", 200, 300, 250),
        ]);
        set.assign_names("sample_peak");
        let names: Vec<&str> = set.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["sample_peak_1a", "sample_peak_1b", "sample_peak_2"]);
        assert_eq!(set.total_length(), 200);
    }

    #[rstest]
    #[case(0, "a")]
    #[case(25, "z")]
    #[case(26, "aa")]
    #[case(27, "ab")]
    fn test_letter_suffix(#[case] idx: usize, #[case] expected: &str) {
        assert_eq!(letter_suffix(idx), expected);
    }

    #[rstest]
    fn test_broad_blocks_nested() {
        let broad = BroadPeak {
            peak: Peak::new("chr1", 100, 500, 250),
            blocks: vec![(120, 200), (220, 300)],
        };
        assert!(broad.blocks_are_nested());
        let bad = BroadPeak {
            peak: Peak::new("chr1", 100, 500, 250),
            blocks: vec![(220, 300), (120, 230)],
        };
        assert!(!bad.blocks_are_nested());
    }

    #[rstest]
    fn test_overlaps() {
        let a = Peak::new("chr1", 10, 20, 15);
        assert!(a.overlaps(&Peak::new("chr1", 19, 30, 20)));
        assert!(!a.overlaps(&Peak::new("chr1", 20, 30, 25)));
        assert!(!a.overlaps(&Peak::new("chr2", 10, 20, 15)));
    }
}
