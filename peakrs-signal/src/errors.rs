use thiserror::Error;

use peakrs_core::errors::TrackError;

#[derive(Error, Debug)]
pub enum BedGraphError {
    #[error("bedGraph format error at line {line}: {reason}")]
    Format { line: usize, reason: String },

    #[error("Run {chrom}:{start}-{end} starts before the current end {current}")]
    Unordered {
        chrom: String,
        start: u32,
        end: u32,
        current: u32,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, PartialEq)]
pub enum PileupError {
    #[error("Got {extensions} extension sizes but {scales} scale factors")]
    MismatchedScales { extensions: usize, scales: usize },

    #[error(transparent)]
    Track(#[from] TrackError),
}

#[derive(Error, Debug, PartialEq)]
pub enum ModelError {
    #[error(
        "Not enough paired peaks to build the fragment model ({plus} plus and {minus} minus strand peaks, {pairs} pairs)"
    )]
    NotEnoughPairs {
        plus: usize,
        minus: usize,
        pairs: usize,
    },

    #[error("Cross-correlation has no maximum at a lag of at least {d_min}bp")]
    NoCorrelationPeak { d_min: u32 },

    #[error("Invalid model options: {0}")]
    InvalidOptions(String),

    #[error(transparent)]
    Track(#[from] TrackError),
}

#[derive(Error, Debug)]
pub enum CallPeakError {
    #[error(
        "No common chromosome names between treatment {treat:?} and control {control:?}"
    )]
    NoCommonChromosomes {
        treat: Vec<String>,
        control: Vec<String>,
    },

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Pileup(#[from] PileupError),

    #[error(transparent)]
    Track(#[from] TrackError),
}

#[derive(Error, Debug, PartialEq)]
pub enum ScoreError {
    #[error(
        "Unknown score method '{0}', expected one of ppois, qpois, subtract, logFE, log2FE, FE, logLR, slogLR, dlogLR, max"
    )]
    UnknownMethod(String),

    #[error("Unknown normalization '{0}', expected one of raw, treat-to-control, control-to-treat, mean")]
    UnknownNormalization(String),
}
