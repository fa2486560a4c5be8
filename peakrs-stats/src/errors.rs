use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Probability must lie in [0, 1], got {0}")]
    InvalidProbability(f64),

    #[error("Invalid gamma shape parameter: {0}")]
    InvalidShape(f64),

    #[error("Error parsing gfold table line {line}: {reason}")]
    TableParseError { line: usize, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
