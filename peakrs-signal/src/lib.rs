//! Coverage tracks and peak calling.
//!
//! The crate turns finalized read tracks into [bedgraph::StepTrack] pileups,
//! scores a treatment pileup against a background in [score_track], and calls
//! narrow or broad peaks from the scored runs with the threshold scanner in
//! [caller]. [model] estimates the fragment length, [refine] moves summits to
//! the strand crossover and [callpeak] chains everything into one pipeline.
//!
//! # Example
//!
//! ```
//! use peakrs_signal::bedgraph::from_intervals;
//!
//! let a = from_intervals([("chr1", 0, 10, 1.0), ("chr1", 10, 20, 3.0)], 0.0).unwrap();
//! let b = from_intervals([("chr1", 0, 15, 2.0), ("chr1", 15, 20, 0.0)], 0.0).unwrap();
//! let combined = a.overlay(&b, f64::max);
//! assert_eq!(combined.value_at("chr1", 12), 3.0);
//! ```

pub mod bedgraph;
pub mod callpeak;
pub mod caller;
pub mod errors;
pub mod model;
pub mod pileup;
pub mod refine;
pub mod score_track;

// re-exports
pub use bedgraph::{ChromRuns, StepTrack, TrackSummary};
pub use callpeak::{
    CallPeakOptions, CallPeakResult, CalledPeaks, Cutoff, DupPolicy, ScaleTo, run_callpeak,
};
pub use caller::{BroadParams, CallerParams};
pub use errors::{BedGraphError, CallPeakError, ModelError, PileupError, ScoreError};
pub use model::{ModelOptions, ModelResult, PeakModel};
pub use pileup::{
    pileup, pileup_fragments, pileup_fragments_with_multiple_extensions,
    pileup_with_multiple_extensions,
};
pub use refine::{RefineOptions, refine_peaks};
pub use score_track::{Normalization, NormalizedTrack, ScoreMethod, ScoreTrack, ScoredTrack};
