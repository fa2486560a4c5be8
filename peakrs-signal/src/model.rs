//! Fragment length from the shift between strands.
//!
//! Enriched sites show a plus-strand mode upstream of a minus-strand mode,
//! about one fragment length apart. Windows with a moderate excess of reads
//! are located on each strand and paired, their reads are stacked into one
//! plus and one minus profile, and the lag that best lines the two profiles up
//! is the fragment length `d`.

use std::io::Write;

use log::{debug, info, warn};

use peakrs_core::models::ReadTrack;

use crate::errors::ModelError;

const FEW_PAIRS: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct ModelOptions {
    /// Half the window used to find strand peaks.
    pub bandwidth: u32,
    /// Accepted enrichment of a window over the genome average, `(lower, upper)`.
    pub mfold: (f64, f64),
    pub genome_size: f64,
    pub max_pairs: usize,
    /// Smallest lag accepted as `d`.
    pub d_min: u32,
    /// Length each read covers when strand peaks and profiles are built.
    pub tag_expansion: u32,
}

impl Default for ModelOptions {
    fn default() -> Self {
        ModelOptions {
            bandwidth: 300,
            mfold: (5.0, 50.0),
            genome_size: 2.7e9,
            max_pairs: 1000,
            d_min: 20,
            tag_expansion: 10,
        }
    }
}

impl ModelOptions {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.bandwidth == 0 {
            return Err(ModelError::InvalidOptions("bandwidth must be positive".to_string()));
        }
        let (lower, upper) = self.mfold;
        if !(lower > 0.0 && lower < upper) {
            return Err(ModelError::InvalidOptions(format!(
                "mfold bounds must satisfy 0 < lower < upper, got ({}, {})",
                lower, upper
            )));
        }
        if !(self.genome_size > 0.0) {
            return Err(ModelError::InvalidOptions(format!(
                "genome size must be positive, got {}",
                self.genome_size
            )));
        }
        if self.max_pairs == 0 {
            return Err(ModelError::InvalidOptions("max_pairs must be positive".to_string()));
        }
        Ok(())
    }

    pub fn peak_size(&self) -> u32 {
        2 * self.bandwidth
    }

    /// `(min_tags, max_tags)` a window must hold to count as a strand peak.
    pub fn tag_bounds(&self, total: u64) -> (u64, u64) {
        let per_window = total as f64 * self.peak_size() as f64 / self.genome_size / 2.0;
        let (lower, upper) = self.mfold;
        ((per_window * lower).round() as u64, (per_window * upper).round() as u64)
    }
}

/// A plus peak with the minus peak downstream of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairedPeak {
    pub plus: u32,
    pub minus: u32,
}

impl PairedPeak {
    pub fn center(&self) -> u32 {
        self.plus + (self.minus - self.plus) / 2
    }

    pub fn distance(&self) -> u32 {
        self.minus - self.plus
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelResult {
    /// Predicted fragment length.
    pub d: u32,
    /// Other local correlation maxima, best first.
    pub alternative_d: Vec<u32>,
    /// Mean distance between paired strand summits.
    pub summit_d: u32,
    pub min_tags: u64,
    pub max_tags: u64,
    pub plus_peaks: usize,
    pub minus_peaks: usize,
    pub pairs: Vec<(String, PairedPeak)>,
    pub plus_profile: Vec<f64>,
    pub minus_profile: Vec<f64>,
    /// Pearson correlation by lag, index 0 being lag 0.
    pub correlation: Vec<f64>,
}

impl ModelResult {
    pub fn num_pairs(&self) -> usize {
        self.pairs.len()
    }

    ///
    /// Write the profiles and the correlation curve as tab-separated tables,
    /// positions relative to the pair centers.
    ///
    pub fn write_tsv<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "# d = {}, summit distance = {}, pairs = {}", self.d, self.summit_d, self.num_pairs())?;
        writeln!(writer, "#position\tplus\tminus")?;
        let half = (self.plus_profile.len() / 2) as i64;
        for (i, (p, m)) in self.plus_profile.iter().zip(self.minus_profile.iter()).enumerate() {
            writeln!(writer, "{}\t{}\t{}", i as i64 - half, p, m)?;
        }
        writeln!(writer, "#lag\tcorrelation")?;
        for (lag, c) in self.correlation.iter().enumerate() {
            writeln!(writer, "{}\t{:.5}", lag, c)?;
        }
        Ok(())
    }
}

pub struct PeakModel;

impl PeakModel {
    ///
    /// Build the model from a finalized single-end track.
    ///
    /// # Arguments
    /// - track: the treatment reads
    /// - options: model options, validated first
    ///
    pub fn build(track: &ReadTrack, options: &ModelOptions) -> Result<ModelResult, ModelError> {
        options.validate()?;
        let total = track.total()?;
        let (min_tags, max_tags) = options.tag_bounds(total);
        let peak_size = options.peak_size();
        info!(
            "Building the model: window {}bp, {} to {} tags per window",
            peak_size, min_tags, max_tags
        );

        let mut pairs = Vec::new();
        let mut plus_peaks = 0;
        let mut minus_peaks = 0;
        for chrom in track.chromosomes() {
            let plus = strand_peaks(track.plus(chrom)?, peak_size, options.tag_expansion, min_tags, max_tags);
            let minus = strand_peaks(track.minus(chrom)?, peak_size, options.tag_expansion, min_tags, max_tags);
            debug!("{}: {} plus and {} minus strand peaks", chrom, plus.len(), minus.len());
            plus_peaks += plus.len();
            minus_peaks += minus.len();
            for pair in pair_peaks(&plus, &minus, peak_size) {
                if pairs.len() < options.max_pairs {
                    pairs.push((chrom.to_string(), pair));
                }
            }
        }

        if pairs.is_empty() {
            return Err(ModelError::NotEnoughPairs {
                plus: plus_peaks,
                minus: minus_peaks,
                pairs: 0,
            });
        }
        if pairs.len() < FEW_PAIRS {
            warn!(
                "Only {} paired peaks were found; the fragment length estimate may be unreliable",
                pairs.len()
            );
        }

        let (plus_profile, minus_profile) = profiles(track, &pairs, peak_size, options.tag_expansion)?;
        let correlation = cross_correlation(&plus_profile, &minus_profile, peak_size as usize);
        let mut maxima = local_maxima(&correlation, options.d_min as usize);
        if maxima.is_empty() {
            return Err(ModelError::NoCorrelationPeak { d_min: options.d_min });
        }
        let d = maxima.remove(0) as u32;
        let alternative_d: Vec<u32> = maxima.into_iter().map(|l| l as u32).collect();

        let summit_d = (pairs.iter().map(|(_, p)| p.distance() as f64).sum::<f64>()
            / pairs.len() as f64)
            .round() as u32;
        info!(
            "Predicted fragment length d = {} from {} pairs (summit distance {})",
            d,
            pairs.len(),
            summit_d
        );

        Ok(ModelResult {
            d,
            alternative_d,
            summit_d,
            min_tags,
            max_tags,
            plus_peaks,
            minus_peaks,
            pairs,
            plus_profile,
            minus_profile,
            correlation,
        })
    }
}

///
/// Summits of windows holding between `min_tags` and `max_tags` reads.
///
/// A window opens at a read and takes every read less than `peak_size` past
/// it; the next read opens the next window.
///
pub fn strand_peaks(positions: &[u32], peak_size: u32, tag_expansion: u32, min_tags: u64, max_tags: u64) -> Vec<u32> {
    let mut summits = Vec::new();
    let mut first = 0usize;
    while first < positions.len() {
        let limit = positions[first].saturating_add(peak_size);
        let last = first + positions[first..].partition_point(|&p| p < limit);
        let count = (last - first) as u64;
        if count >= min_tags && count <= max_tags {
            summits.push(window_summit(&positions[first..last], tag_expansion));
        }
        first = last;
    }
    summits
}

// middle of the highest stretch when each read covers tag_expansion bases
// centred on it
fn window_summit(tags: &[u32], tag_expansion: u32) -> u32 {
    let half = tag_expansion / 2;
    let origin = tags[0].saturating_sub(half);
    let span = (tags[tags.len() - 1] + half + 1 - origin) as usize;
    let mut delta = vec![0i64; span + 1];
    for &t in tags {
        let s = (t.saturating_sub(half) - origin) as usize;
        let e = (t + half + 1 - origin) as usize;
        delta[s] += 1;
        delta[e] -= 1;
    }
    let mut best = 0i64;
    let mut best_positions = Vec::new();
    let mut running = 0i64;
    for (i, d) in delta.iter().take(span).enumerate() {
        running += d;
        if running > best {
            best = running;
            best_positions.clear();
        }
        if running == best {
            best_positions.push(i as u32);
        }
    }
    origin + best_positions[best_positions.len() / 2]
}

///
/// Pair each plus peak with the nearest minus peak downstream of it, no more
/// than `peak_size` away.
///
pub fn pair_peaks(plus: &[u32], minus: &[u32], peak_size: u32) -> Vec<PairedPeak> {
    let mut pairs = Vec::new();
    for &p in plus {
        let idx = minus.partition_point(|&m| m <= p);
        if let Some(&m) = minus.get(idx) {
            if m - p <= peak_size {
                pairs.push(PairedPeak { plus: p, minus: m });
            }
        }
    }
    pairs
}

///
/// Stack the reads around every pair center into a plus and a minus profile
/// of `2 * peak_size + 1` positions. Plus reads cover `[pos, pos + expansion)`,
/// minus reads `[pos - expansion, pos)`.
///
fn profiles(
    track: &ReadTrack,
    pairs: &[(String, PairedPeak)],
    peak_size: u32,
    tag_expansion: u32,
) -> Result<(Vec<f64>, Vec<f64>), ModelError> {
    let width = 2 * peak_size as usize + 1;
    let mut plus_delta = vec![0i64; width + 1];
    let mut minus_delta = vec![0i64; width + 1];
    let clip = |x: i64| x.clamp(0, width as i64) as usize;

    for (chrom, pair) in pairs {
        let origin = pair.center() as i64 - peak_size as i64;
        let lo = origin.max(0) as u32;
        let hi = (origin + width as i64) as u32;

        let plus = track.plus(chrom)?;
        let from = plus.partition_point(|&p| p.saturating_add(tag_expansion) <= lo);
        for &p in plus[from..].iter().take_while(|&&p| p < hi) {
            let s = p as i64 - origin;
            plus_delta[clip(s)] += 1;
            plus_delta[clip(s + tag_expansion as i64)] -= 1;
        }

        let minus = track.minus(chrom)?;
        let from = minus.partition_point(|&m| m <= lo);
        for &m in minus[from..].iter().take_while(|&&m| m.saturating_sub(tag_expansion) < hi) {
            let e = m as i64 - origin;
            minus_delta[clip(e - tag_expansion as i64)] += 1;
            minus_delta[clip(e)] -= 1;
        }
    }

    let accumulate = |delta: &[i64]| -> Vec<f64> {
        let mut running = 0i64;
        delta
            .iter()
            .take(width)
            .map(|d| {
                running += d;
                running as f64
            })
            .collect()
    };
    Ok((accumulate(&plus_delta), accumulate(&minus_delta)))
}

fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    if x.len() < 2 {
        return 0.0;
    }
    let mx = x.iter().sum::<f64>() / n;
    let my = y.iter().sum::<f64>() / n;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y.iter()) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx) * (a - mx);
        syy += (b - my) * (b - my);
    }
    if sxx == 0.0 || syy == 0.0 {
        0.0
    } else {
        sxy / (sxx * syy).sqrt()
    }
}

///
/// Correlation of `plus[0..W-L]` against `minus[L..W]` for every lag `L` up to
/// `max_lag`.
///
pub fn cross_correlation(plus: &[f64], minus: &[f64], max_lag: usize) -> Vec<f64> {
    let width = plus.len().min(minus.len());
    (0..=max_lag.min(width.saturating_sub(2)))
        .map(|lag| pearson(&plus[..width - lag], &minus[lag..width]))
        .collect()
}

// lags of local maxima at or past min_lag, best first
fn local_maxima(correlation: &[f64], min_lag: usize) -> Vec<usize> {
    let n = correlation.len();
    let mut maxima: Vec<usize> = (min_lag..n)
        .filter(|&i| {
            let left = i == 0 || correlation[i] > correlation[i - 1];
            let right = i + 1 == n || correlation[i] >= correlation[i + 1];
            left && right
        })
        .collect();
    maxima.sort_by(|&a, &b| correlation[b].total_cmp(&correlation[a]).then(a.cmp(&b)));
    maxima
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rstest::*;

    use peakrs_core::models::Strand;

    ///
    /// Sites every 5kb: plus reads scattered just upstream of `site`, minus
    /// reads just downstream of `site + d`.
    ///
    fn shifted_sites(d: u32, sites: u32) -> ReadTrack {
        let mut rng = StdRng::seed_from_u64(17);
        let mut track = ReadTrack::new(36);
        for s in 0..sites {
            let site = 10_000 + s * 5_000;
            for _ in 0..40 {
                track.add("chr1", site + rng.random_range(0..30), Strand::Plus);
                track.add("chr1", site + d + rng.random_range(0..30), Strand::Minus);
            }
        }
        track.finalize();
        track
    }

    fn options() -> ModelOptions {
        ModelOptions {
            bandwidth: 150,
            // 40 reads in 300bp against ~0.1 expected
            mfold: (5.0, 1000.0),
            genome_size: 1.0e6,
            ..Default::default()
        }
    }

    #[rstest]
    fn test_tag_bounds() {
        let options = ModelOptions::default();
        // 20M reads, 600bp windows over 2.7Gb
        assert_eq!(options.tag_bounds(20_000_000), (11, 111));
    }

    #[rstest]
    #[case((5.0, 5.0))]
    #[case((0.0, 50.0))]
    fn test_validate_rejects_mfold(#[case] mfold: (f64, f64)) {
        let options = ModelOptions {
            mfold,
            ..Default::default()
        };
        assert!(matches!(options.validate(), Err(ModelError::InvalidOptions(_))));
    }

    #[rstest]
    fn test_strand_peaks_respects_bounds() {
        let positions = [100, 101, 102, 103, 5000, 9000, 9001];
        assert_eq!(strand_peaks(&positions, 200, 10, 2, 4), vec![102, 9001]);
        assert_eq!(strand_peaks(&positions, 200, 10, 3, 3), Vec::<u32>::new());
    }

    #[rstest]
    fn test_pair_peaks_takes_nearest_downstream() {
        let pairs = pair_peaks(&[100, 1000, 5000], &[90, 250, 300, 1700], 600);
        // 1700 lies too far past 1000, nothing follows 5000
        assert_eq!(pairs, vec![PairedPeak { plus: 100, minus: 250 }]);
        assert_eq!(pairs[0].center(), 175);
    }

    #[rstest]
    fn test_model_recovers_shift() {
        let track = shifted_sites(200, 60);
        let model = PeakModel::build(&track, &options()).unwrap();
        assert_eq!(model.num_pairs(), 60);
        assert!(model.d >= 180 && model.d <= 220, "d = {}", model.d);
        assert!(model.summit_d >= 180 && model.summit_d <= 220);
        assert!(model.alternative_d.iter().all(|&d| d >= 20));
    }

    #[rstest]
    fn test_model_caps_pairs() {
        let track = shifted_sites(200, 60);
        let options = ModelOptions {
            max_pairs: 10,
            ..options()
        };
        assert_eq!(PeakModel::build(&track, &options).unwrap().num_pairs(), 10);
    }

    #[rstest]
    fn test_model_without_pairs() {
        let mut track = ReadTrack::new(36);
        for p in [100, 20_000, 40_000] {
            track.add("chr1", p, Strand::Plus);
        }
        track.finalize();
        assert_eq!(
            PeakModel::build(&track, &options()),
            Err(ModelError::NotEnoughPairs {
                plus: 0,
                minus: 0,
                pairs: 0
            })
        );
    }

    #[rstest]
    fn test_cross_correlation_peaks_at_shift() {
        let mut plus = vec![0.0; 101];
        let mut minus = vec![0.0; 101];
        for i in 20..30 {
            plus[i] = 1.0;
            minus[i + 40] = 1.0;
        }
        let correlation = cross_correlation(&plus, &minus, 80);
        assert_eq!(local_maxima(&correlation, 20)[0], 40);
    }
}
