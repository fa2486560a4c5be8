use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs::File;
use std::io::prelude::*;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;

use crate::errors::ParseError;

#[derive(Debug, Clone, Copy, PartialEq)]
#[allow(clippy::upper_case_acronyms)]
pub enum FileType {
    BED,
    BEDPE,
    NARROWPEAK,
    BEDGRAPH,
    UNKNOWN,
}

impl FromStr for FileType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bed" => Ok(FileType::BED),
            "bedpe" => Ok(FileType::BEDPE),
            "narrowpeak" => Ok(FileType::NARROWPEAK),
            "bedgraph" | "bdg" => Ok(FileType::BEDGRAPH),
            _ => Ok(FileType::UNKNOWN),
        }
    }
}

pub struct FileInfo {
    pub file_type: FileType,
    pub is_gzipped: bool,
}

///
/// Guess the file type from its extension, looking through a trailing `.gz`.
///
pub fn get_file_info(path: &Path) -> FileInfo {
    let mut file_type = FileType::UNKNOWN;
    let mut is_gzipped = false;

    if let Some(filename) = path.file_name().and_then(|f| f.to_str()) {
        let base = match filename.strip_suffix(".gz") {
            Some(base) => {
                is_gzipped = true;
                base
            }
            None => filename,
        };
        if let Some(ext) = PathBuf::from(base).extension().and_then(|e| e.to_str()) {
            file_type = FileType::from_str(ext).unwrap_or(FileType::UNKNOWN);
        }
    }

    FileInfo {
        file_type,
        is_gzipped,
    }
}

///
/// Get a reader for either a gzip'd or non-gzip'd file.
///
/// # Arguments
///
/// - path: path to the file to read
///
pub fn get_dynamic_reader(path: &Path) -> Result<BufReader<Box<dyn Read>>> {
    let is_gzipped = path.extension() == Some(OsStr::new("gz"));
    let file = File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;
    let file: Box<dyn Read> = match is_gzipped {
        true => Box::new(MultiGzDecoder::new(file)),
        false => Box::new(file),
    };

    Ok(BufReader::new(file))
}

/// Get a reader for either a gzipped, non-gzipped file, or stdin
///
/// # Arguments
///
/// - file_path: path to the file to read, or '-' for stdin
pub fn get_dynamic_reader_w_stdin(file_path_str: &str) -> Result<BufReader<Box<dyn Read>>> {
    if file_path_str == "-" {
        Ok(BufReader::new(Box::new(std::io::stdin()) as Box<dyn Read>))
    } else {
        get_dynamic_reader(Path::new(file_path_str))
    }
}

///
/// Read a two-column chrom sizes file into a map from name to length.
///
pub fn get_chrom_sizes<T: AsRef<Path>>(path: T) -> Result<HashMap<String, u32>> {
    let reader = get_dynamic_reader(path.as_ref())
        .with_context(|| "Failed to open chrom sizes file.")?;
    read_chrom_sizes(reader).map_err(anyhow::Error::from)
}

pub fn read_chrom_sizes<R: BufRead>(reader: R) -> Result<HashMap<String, u32>, ParseError> {
    let mut chrom_sizes: HashMap<String, u32> = HashMap::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let parsed = match (parts.next(), parts.next().map(|s| s.parse::<u32>())) {
            (Some(name), Some(Ok(size))) => Some((name.to_string(), size)),
            _ => None,
        };
        match parsed {
            Some((name, size)) => {
                chrom_sizes.insert(name, size);
            }
            None => {
                return Err(ParseError::ChromSizesLine {
                    line: idx + 1,
                    content: line,
                });
            }
        }
    }
    Ok(chrom_sizes)
}

///
/// Effective genome size from a shortcut (`hs`, `mm`, `ce`, `dm`) or a number
/// such as `2.7e9` or `1000000`.
///
pub fn parse_genome_size(value: &str) -> Result<f64, ParseError> {
    let size = match value {
        "hs" => 2.7e9,
        "mm" => 1.87e9,
        "ce" => 9e7,
        "dm" => 1.2e8,
        other => other
            .parse::<f64>()
            .map_err(|_| ParseError::InvalidGenomeSize(value.to_string()))?,
    };
    if !(size.is_finite() && size > 0.0) {
        return Err(ParseError::InvalidGenomeSize(value.to_string()));
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::io::Write;

    #[rstest]
    #[case("hs", 2.7e9)]
    #[case("mm", 1.87e9)]
    #[case("ce", 9e7)]
    #[case("dm", 1.2e8)]
    #[case("1e6", 1e6)]
    #[case("12345", 12345.0)]
    fn test_parse_genome_size(#[case] value: &str, #[case] expected: f64) {
        assert_eq!(parse_genome_size(value).unwrap(), expected);
    }

    #[rstest]
    #[case("human")]
    #[case("-5")]
    #[case("0")]
    fn test_parse_genome_size_rejects(#[case] value: &str) {
        assert!(parse_genome_size(value).is_err());
    }

    #[rstest]
    fn test_get_file_info() {
        let info = get_file_info(Path::new("/tmp/reads.bedpe.gz"));
        assert_eq!(info.file_type, FileType::BEDPE);
        assert!(info.is_gzipped);
        let info = get_file_info(Path::new("signal.bdg"));
        assert_eq!(info.file_type, FileType::BEDGRAPH);
        assert!(!info.is_gzipped);
    }

    #[rstest]
    fn test_get_chrom_sizes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "chr1\t1000").unwrap();
        writeln!(file, "chr2 500").unwrap();
        let sizes = get_chrom_sizes(file.path()).unwrap();
        assert_eq!(sizes.get("chr1"), Some(&1000));
        assert_eq!(sizes.get("chr2"), Some(&500));
    }

    #[rstest]
    fn test_read_chrom_sizes_bad_line() {
        let result = read_chrom_sizes("chr1\tlots\n".as_bytes());
        assert!(matches!(result, Err(ParseError::ChromSizesLine { line: 1, .. })));
    }

    #[rstest]
    fn test_dynamic_reader_reads_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sizes.txt.gz");
        let file = File::create(&path).unwrap();
        let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        encoder.write_all(b"chrM\t16569\n").unwrap();
        encoder.finish().unwrap();

        let sizes = get_chrom_sizes(&path).unwrap();
        assert_eq!(sizes.get("chrM"), Some(&16569));
    }
}
