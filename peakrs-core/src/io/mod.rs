pub mod peaks;
pub mod reads;

pub use self::peaks::{
    PeakScore, load_peaks, read_peaks, write_broad_peak, write_broad_xls, write_gapped_peak,
    write_narrow_peak, write_summits_bed, write_xls,
};
pub use self::reads::{
    ParseStats, load_alignments, read_bed_reads, read_bedpe_fragments, write_alignments,
    write_fragments_bedpe, write_reads_bed,
};
