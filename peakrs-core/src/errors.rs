use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum TrackError {
    #[error("Track must be finalized before it can be queried")]
    NotFinalized,

    #[error("Cannot sample {requested} reads from a track holding {available}")]
    Sampling { requested: u64, available: u64 },

    #[error("Sampling fraction must lie in [0, 1], got {0}")]
    InvalidFraction(f64),
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Invalid genome size '{0}': expected hs, mm, ce, dm or a number")]
    InvalidGenomeSize(String),

    #[error("Malformed chrom sizes line {line}: '{content}'")]
    ChromSizesLine { line: usize, content: String },

    #[error("Unknown input format: {0}")]
    UnknownFormat(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
