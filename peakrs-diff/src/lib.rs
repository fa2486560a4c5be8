//! Differential occupancy between two conditions.
//!
//! Each condition is a treatment pileup with its own control. The
//! [DiffEngine] calls peaks per condition, compares the two treatments with a
//! symmetric likelihood ratio and sorts the differential regions into those
//! unique to condition 1, unique to condition 2, and the peaks both conditions
//! share without a difference.

pub mod engine;
pub mod errors;
pub mod io;
pub mod overlap;

// re-exports
pub use engine::{DepthScaling, DiffAnnotation, DiffClass, DiffEngine, DiffInput, DiffOptions, DiffResult};
pub use errors::DiffError;
pub use io::{write_diff_bed, write_diff_xls};
pub use overlap::OverlapIndex;
