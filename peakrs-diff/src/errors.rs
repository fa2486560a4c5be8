use thiserror::Error;

use peakrs_stats::StatsError;

#[derive(Error, Debug)]
pub enum DiffError {
    #[error("Invalid diff options: {0}")]
    InvalidOptions(String),

    #[error("Condition depths must be positive, got {depth1} and {depth2}")]
    InvalidDepth { depth1: f64, depth2: f64 },

    #[error("No chromosome is shared by all four tracks")]
    NoCommonChromosomes,

    #[error(transparent)]
    Stats(#[from] StatsError),
}
