use std::f64::consts::LOG10_E;

use crate::probability::log10_poisson_cdf_upper;

///
/// Signed log10 likelihood ratio of observing `x` under rate `x` versus rate `y`.
///
/// Enrichment (`x > y`) is positive, depletion is negative. Both values must be
/// positive; callers add a pseudocount first.
///
pub fn log_lr_asym(x: f64, y: f64) -> f64 {
    let s = if x > y {
        x * (x.ln() - y.ln()) + y - x
    } else if x < y {
        x * (y.ln() - x.ln()) - y + x
    } else {
        0.0
    };
    s * LOG10_E
}

///
/// Symmetric signed log10 likelihood ratio between two observed rates.
///
/// `log_lr_sym(x, y) == -log_lr_sym(y, x)`; the sign says which side is higher.
///
pub fn log_lr_sym(x: f64, y: f64) -> f64 {
    let s = if x > y {
        x * (x.ln() - y.ln()) + y - x
    } else if y > x {
        y * (x.ln() - y.ln()) + y - x
    } else {
        0.0
    };
    s * LOG10_E
}

///
/// Unsigned log10 likelihood ratio, large whenever the two rates differ.
///
pub fn log_lr_diff(x: f64, y: f64) -> f64 {
    let s = if x > y {
        x * (x.ln() - y.ln()) + y - x
    } else if x < y {
        y * (y.ln() - x.ln()) + x - y
    } else {
        0.0
    };
    s * LOG10_E
}

///
/// Poisson score `-log10 P(X > floor(observed); lambda = expected)`.
///
/// An expected rate of zero or less carries no signal and scores 0.
///
pub fn poisson_score(observed: f64, expected: f64) -> f64 {
    if expected <= 0.0 {
        return 0.0;
    }
    let k = if observed > 0.0 {
        observed.floor() as u64
    } else {
        0
    };
    let score = -log10_poisson_cdf_upper(k, expected);
    // -0.0 otherwise
    score.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    fn round2(value: f64) -> f64 {
        (value * 100.0).round() / 100.0
    }

    #[rstest]
    #[case(101.0, 11.0, 58.17)]
    #[case(11.0, 11.0, 0.0)]
    #[case(16.0, 21.0, -0.28)]
    #[case(6.0, 21.0, -3.25)]
    #[case(21.0, 6.0, 4.91)]
    fn test_log_lr_asym(#[case] x: f64, #[case] y: f64, #[case] expected: f64) {
        assert_eq!(round2(log_lr_asym(x, y)), expected);
    }

    #[rstest]
    fn test_log_lr_sym_is_antisymmetric() {
        for (x, y) in [(5.0, 20.0), (16.0, 21.0), (101.0, 11.0)] {
            assert!((log_lr_sym(x, y) + log_lr_sym(y, x)).abs() < 1e-12);
        }
        assert_eq!(round2(log_lr_sym(6.0, 21.0)), -4.91);
        assert_eq!(log_lr_sym(3.0, 3.0), 0.0);
    }

    #[rstest]
    fn test_log_lr_diff_is_unsigned() {
        assert_eq!(round2(log_lr_diff(21.0, 6.0)), 4.91);
        assert_eq!(round2(log_lr_diff(6.0, 21.0)), 4.91);
        assert!(log_lr_diff(16.0, 21.0) > 0.0);
    }

    #[rstest]
    fn test_poisson_score_on_treat_control_pairs() {
        let pairs = [(100.0, 10.0), (10.0, 10.0), (15.0, 20.0), (5.0, 20.0), (20.0, 5.0)];
        let scores: Vec<f64> = pairs
            .iter()
            .map(|(t, c)| round2(poisson_score(*t, *c)))
            .collect();
        assert_eq!(scores, vec![63.27, 0.38, 0.07, 0.0, 7.09]);
    }

    #[rstest]
    fn test_poisson_score_without_background() {
        assert_eq!(poisson_score(12.0, 0.0), 0.0);
        assert_eq!(poisson_score(0.0, 0.5), -log10_poisson_cdf_upper(0, 0.5));
    }
}
