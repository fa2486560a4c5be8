pub mod alignments;
pub mod fragment_track;
pub mod peak;
pub mod read_track;
mod sorted;

// re-export for cleaner imports
pub use self::alignments::Alignments;
pub use self::fragment_track::FragmentTrack;
pub use self::peak::{BroadPeak, BroadPeakSet, Peak, PeakSet};
pub use self::read_track::{ReadTrack, Strand};
