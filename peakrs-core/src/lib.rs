//! Core types shared by the peakrs crates.
//!
//! - [models::ReadTrack] and [models::FragmentTrack] hold sorted single-end
//!   read positions and paired-end fragments, with duplicate capping and
//!   exact subsampling.
//! - [models::Peak], [models::BroadPeak] and their sets are the records the
//!   peak callers produce.
//! - [io] reads alignments given as BED or BEDPE and writes every peak format
//!   the pipelines emit.
//! - [utils] holds gzip-aware readers, chrom sizes and genome size parsing.

pub mod errors;
pub mod io;
pub mod models;
pub mod utils;
