use std::io::{self, Write};

use peakrs_core::models::PeakSet;

use crate::engine::{DiffAnnotation, DiffClass, DiffResult};

/// BED5 with the comparison score at the summit as the score column.
pub fn write_diff_bed<W: Write>(
    writer: &mut W,
    peaks: &PeakSet,
    annotations: &[DiffAnnotation],
) -> io::Result<()> {
    for (p, a) in peaks.iter().zip(annotations.iter()) {
        writeln!(writer, "{}\t{}\t{}\t{}\t{:.5}", p.chr, p.start, p.end, p.name, a.log_lr)?;
    }
    Ok(())
}

///
/// All three classes in one table, 1-based starts and summits.
///
pub fn write_diff_xls<W: Write>(writer: &mut W, result: &DiffResult, comments: &[String]) -> io::Result<()> {
    for line in comments {
        writeln!(writer, "# {}", line)?;
    }
    writeln!(
        writer,
        "chr\tstart\tend\tlength\tabs_summit\tclass\tlog10_LR\ttreat1\ttreat2\tgfold\tname"
    )?;
    for class in [DiffClass::Unique1, DiffClass::Unique2, DiffClass::Common] {
        for (p, a) in result.set(class).iter().zip(result.annotations(class).iter()) {
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{}\t{}\t{:.5}\t{:.2}\t{:.2}\t{:.5}\t{}",
                p.chr,
                p.start + 1,
                p.end,
                p.width(),
                p.summit + 1,
                class.label(),
                a.log_lr,
                a.treat1,
                a.treat2,
                a.gfold,
                p.name
            )?;
        }
    }
    Ok(())
}
