//! Peak calling and differential occupancy for sequencing data.
//!
//! Each module is one of the peakrs crates, enabled by the feature of the
//! same name. `core`, `stats` and `signal` are on by default.

#[cfg(feature = "core")]
#[doc(inline)]
pub use peakrs_core as core;

#[cfg(feature = "stats")]
#[doc(inline)]
pub use peakrs_stats as stats;

#[cfg(feature = "signal")]
#[doc(inline)]
pub use peakrs_signal as signal;

#[cfg(feature = "diff")]
#[doc(inline)]
pub use peakrs_diff as diff;
