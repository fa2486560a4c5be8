use std::f64::consts::{LN_10, PI};
use std::sync::OnceLock;

/// Upper bound for every open-ended search or series in this module.
pub const MAX_SEARCH: u64 = 100_000;

/// Series terms smaller than this fraction of the running sum are dropped.
const SERIES_EPSILON: f64 = 1e-16;

/// Entries in the exact ln(n!) table; larger arguments use Stirling's series.
const LOG_FACTORIAL_TABLE_SIZE: usize = 1001;

fn log_factorial_table() -> &'static [f64] {
    static TABLE: OnceLock<Vec<f64>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = Vec::with_capacity(LOG_FACTORIAL_TABLE_SIZE);
        let mut acc = 0.0f64;
        table.push(acc);
        for i in 1..LOG_FACTORIAL_TABLE_SIZE {
            acc += (i as f64).ln();
            table.push(acc);
        }
        table
    })
}

///
/// Natural log of n!
///
pub fn log_factorial(n: u64) -> f64 {
    if (n as usize) < LOG_FACTORIAL_TABLE_SIZE {
        return log_factorial_table()[n as usize];
    }
    let x = n as f64;
    let x3 = x * x * x;
    x * x.ln() - x + 0.5 * (2.0 * PI * x).ln() + 1.0 / (12.0 * x) - 1.0 / (360.0 * x3)
        + 1.0 / (1260.0 * x3 * x * x)
}

///
/// n! as a float. Overflows to infinity past 170!.
///
pub fn factorial(n: u64) -> f64 {
    log_factorial(n).exp()
}

fn ln_poisson_pmf(k: u64, lambda: f64) -> f64 {
    k as f64 * lambda.ln() - lambda - log_factorial(k)
}

// ln P(X <= k), summed downward from k. Converges fast when k < lambda.
fn ln_poisson_lower_direct(k: u64, lambda: f64) -> f64 {
    let mut sum = 1.0f64;
    let mut term = 1.0f64;
    let mut i = k;
    while i > 0 {
        term *= i as f64 / lambda;
        sum += term;
        if term < SERIES_EPSILON * sum {
            break;
        }
        i -= 1;
    }
    ln_poisson_pmf(k, lambda) + sum.ln()
}

// ln P(X > k), summed upward from k + 1. Converges fast when k >= lambda.
fn ln_poisson_upper_direct(k: u64, lambda: f64) -> f64 {
    let first = k + 1;
    let mut sum = 1.0f64;
    let mut term = 1.0f64;
    let mut i = first;
    while i < first + MAX_SEARCH {
        i += 1;
        term *= lambda / i as f64;
        sum += term;
        if term < SERIES_EPSILON * sum {
            break;
        }
    }
    ln_poisson_pmf(first, lambda) + sum.ln()
}

///
/// Natural log of a Poisson tail.
///
/// The lower tail is `P(X <= k)`, the upper tail `P(X > k)`. A non-positive
/// rate means no signal: the lower tail is 1 and the upper tail 0.
///
pub fn ln_poisson_cdf(k: u64, lambda: f64, lower: bool) -> f64 {
    if lambda <= 0.0 {
        return if lower { 0.0 } else { f64::NEG_INFINITY };
    }
    let k_is_large = k as f64 >= lambda;
    match (lower, k_is_large) {
        (true, false) => ln_poisson_lower_direct(k, lambda),
        (true, true) => (-ln_poisson_upper_direct(k, lambda).exp()).ln_1p(),
        (false, true) => ln_poisson_upper_direct(k, lambda),
        (false, false) => (-ln_poisson_lower_direct(k, lambda).exp()).ln_1p(),
    }
}

///
/// Log10 of a Poisson tail, see [ln_poisson_cdf].
///
pub fn log10_poisson_cdf(k: u64, lambda: f64, lower: bool) -> f64 {
    ln_poisson_cdf(k, lambda, lower) / LN_10
}

///
/// `log10 P(X > k)`, the quantity behind every Poisson score.
///
pub fn log10_poisson_cdf_upper(k: u64, lambda: f64) -> f64 {
    log10_poisson_cdf(k, lambda, false)
}

///
/// Poisson CDF as a probability, clamped to `[0, 1]`.
///
/// # Arguments
/// - k: observed count
/// - lambda: expected count
/// - lower: `P(X <= k)` if true, `P(X > k)` otherwise
///
pub fn poisson_cdf(k: u64, lambda: f64, lower: bool) -> f64 {
    ln_poisson_cdf(k, lambda, lower).exp().clamp(0.0, 1.0)
}

fn ln_binomial_pmf(k: u64, n: u64, p: f64) -> f64 {
    if k > n {
        return f64::NEG_INFINITY;
    }
    if p <= 0.0 {
        return if k == 0 { 0.0 } else { f64::NEG_INFINITY };
    }
    if p >= 1.0 {
        return if k == n { 0.0 } else { f64::NEG_INFINITY };
    }
    log_factorial(n) - log_factorial(k) - log_factorial(n - k)
        + k as f64 * p.ln()
        + (n - k) as f64 * (-p).ln_1p()
}

///
/// Binomial probability mass `P(X = k)` for `X ~ Binomial(n, p)`.
///
pub fn binomial_pdf(k: u64, n: u64, p: f64) -> f64 {
    ln_binomial_pmf(k, n, p).exp()
}

fn binomial_lower_direct(k: u64, n: u64, p: f64) -> f64 {
    // pmf(i - 1) / pmf(i) = i (1 - p) / ((n - i + 1) p)
    let mut sum = 1.0f64;
    let mut term = 1.0f64;
    let mut i = k;
    while i > 0 {
        term *= i as f64 * (1.0 - p) / ((n - i + 1) as f64 * p);
        sum += term;
        if term < SERIES_EPSILON * sum {
            break;
        }
        i -= 1;
    }
    (ln_binomial_pmf(k, n, p) + sum.ln()).exp()
}

fn binomial_upper_direct(k: u64, n: u64, p: f64) -> f64 {
    // pmf(i + 1) / pmf(i) = (n - i) p / ((i + 1) (1 - p))
    let first = k + 1;
    let mut sum = 1.0f64;
    let mut term = 1.0f64;
    let mut i = first;
    while i < n && i < first + MAX_SEARCH {
        term *= (n - i) as f64 * p / ((i + 1) as f64 * (1.0 - p));
        sum += term;
        if term < SERIES_EPSILON * sum {
            break;
        }
        i += 1;
    }
    (ln_binomial_pmf(first, n, p) + sum.ln()).exp()
}

///
/// Binomial CDF for `X ~ Binomial(n, p)`.
///
/// # Arguments
/// - k: observed successes
/// - n: trials
/// - p: success probability, clamped to `[0, 1]`
/// - lower: `P(X <= k)` if true, `P(X > k)` otherwise
///
pub fn binomial_cdf(k: u64, n: u64, p: f64, lower: bool) -> f64 {
    let p = p.clamp(0.0, 1.0);
    if k >= n {
        return if lower { 1.0 } else { 0.0 };
    }
    if p <= 0.0 {
        return if lower { 1.0 } else { 0.0 };
    }
    if p >= 1.0 {
        return if lower { 0.0 } else { 1.0 };
    }
    let lower_value = if (k as f64) <= n as f64 * p {
        binomial_lower_direct(k, n, p)
    } else {
        1.0 - binomial_upper_direct(k, n, p)
    };
    let lower_value = lower_value.clamp(0.0, 1.0);
    if lower { lower_value } else { 1.0 - lower_value }
}

///
/// Smallest `k` such that `P(X <= k) >= q` for `X ~ Binomial(n, p)`.
///
/// The walk is done in log space so that a vanishing `P(X = 0)` does not stall
/// it, and it never goes past `n` or [MAX_SEARCH].
///
pub fn binomial_cdf_inv(q: f64, n: u64, p: f64) -> u64 {
    let q = q.clamp(0.0, 1.0);
    let p = p.clamp(0.0, 1.0);
    if p <= 0.0 || n == 0 {
        return 0;
    }
    if p >= 1.0 {
        return n;
    }

    let ln_odds = p.ln() - (-p).ln_1p();
    let mut ln_pdf = n as f64 * (-p).ln_1p();
    let mut cdf = ln_pdf.exp();
    let mut x: u64 = 0;

    while cdf < q && x < n && x < MAX_SEARCH {
        ln_pdf += ((n - x) as f64).ln() - ((x + 1) as f64).ln() + ln_odds;
        cdf += ln_pdf.exp();
        x += 1;
    }
    x
}

///
/// Largest number of reads allowed at one exact position before the rest are
/// treated as duplicates.
///
/// Reads are assumed to land uniformly over the genome; the cap is the
/// smallest count whose exceedance probability is at most `p_tail`. At least
/// one read per position is always kept.
///
/// # Arguments
/// - genome_size: effective genome size
/// - total: number of reads in the track
/// - p_tail: tail probability, 1e-5 by default in the pipelines
///
pub fn max_dup_reads(genome_size: f64, total: u64, p_tail: f64) -> u64 {
    if genome_size <= 0.0 {
        return 1;
    }
    binomial_cdf_inv(1.0 - p_tail, total, 1.0 / genome_size).max(1)
}
