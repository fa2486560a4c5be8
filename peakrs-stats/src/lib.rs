//! Statistics used by the peakrs pipelines.
//!
//! Everything in here is a pure function of its inputs except for [Gfold],
//! which memoizes its estimates and therefore owns a cache.
//!
//! - log-domain Poisson and binomial tails that stay stable when the rate or
//!   the count reaches the thousands
//! - binomial inverse CDF, used to derive the automatic duplicate cap
//! - log10 likelihood ratios between two Poisson rates
//! - the Benjamini-Hochberg p-score to q-score table
//! - the gfold fold-change estimator
//!
//! # Example
//!
//! ```
//! use peakrs_stats::probability::binomial_cdf_inv;
//!
//! assert_eq!(binomial_cdf_inv(0.1, 1000, 0.01), 6);
//! ```

pub mod errors;
pub mod gfold;
pub mod likelihood;
pub mod probability;
pub mod qvalue;

// re-exports
pub use errors::StatsError;
pub use gfold::{Gfold, GfoldOptions, GfoldTable};
pub use likelihood::{log_lr_asym, log_lr_diff, log_lr_sym, poisson_score};
pub use probability::{
    MAX_SEARCH, binomial_cdf, binomial_cdf_inv, binomial_pdf, log_factorial, log10_poisson_cdf_upper,
    max_dup_reads, poisson_cdf,
};
pub use qvalue::PqTable;
