use std::fs::File;
use std::io::{BufReader, BufWriter};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rstest::*;
use tempfile::tempdir;

use peakrs_core::models::{Alignments, ReadTrack, Strand};
use peakrs_signal::bedgraph::StepTrack;
use peakrs_signal::callpeak::{CallPeakOptions, CalledPeaks, Cutoff, DupPolicy, run_callpeak};
use peakrs_signal::model::ModelOptions;

const GENOME: u32 = 1_000_000;
const SITES: [u32; 3] = [100_000, 400_000, 750_000];
const FRAGMENT: u32 = 150;

fn background(rng: &mut StdRng, track: &mut ReadTrack, n: usize) {
    for _ in 0..n {
        let strand = if rng.random_bool(0.5) {
            Strand::Plus
        } else {
            Strand::Minus
        };
        track.add("chr1", rng.random_range(0..GENOME), strand);
    }
}

#[fixture]
fn treatment() -> ReadTrack {
    let mut rng = StdRng::seed_from_u64(42);
    let mut track = ReadTrack::new(36);
    background(&mut rng, &mut track, 2000);
    for site in SITES {
        for _ in 0..200 {
            track.add("chr1", site + rng.random_range(0..50), Strand::Plus);
            track.add("chr1", site + FRAGMENT + rng.random_range(0..50), Strand::Minus);
        }
    }
    track.finalize();
    track
}

#[fixture]
fn control() -> ReadTrack {
    let mut rng = StdRng::seed_from_u64(7);
    let mut track = ReadTrack::new(36);
    background(&mut rng, &mut track, 2000);
    track.finalize();
    track
}

fn options() -> CallPeakOptions {
    CallPeakOptions {
        name: "test".to_string(),
        genome_size: GENOME as f64,
        keep_dup: DupPolicy::All,
        cutoff: Cutoff::QValue(0.01),
        nomodel: true,
        extsize: FRAGMENT,
        ..Default::default()
    }
}

fn site_of(position: u32) -> Option<u32> {
    SITES
        .iter()
        .copied()
        .find(|s| position >= *s && position < s + FRAGMENT + 50)
}

mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[rstest]
    fn test_callpeak_finds_every_site(treatment: ReadTrack, control: ReadTrack) {
        let mut treat = Alignments::Single(treatment);
        let mut ctrl = Alignments::Single(control);
        let result = run_callpeak(&mut treat, Some(&mut ctrl), &options()).unwrap();

        assert_eq!(result.d, FRAGMENT);
        assert_eq!(result.treat_total, 3200);
        assert_eq!(result.control_total, Some(2000));
        let CalledPeaks::Narrow(peaks) = &result.peaks else {
            panic!("expected narrow peaks");
        };
        assert_eq!(peaks.len(), 3);

        let names: Vec<&str> = peaks.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["test_peak_1", "test_peak_2", "test_peak_3"]);
        let found: Vec<Option<u32>> = peaks.iter().map(|p| site_of(p.summit)).collect();
        assert_eq!(found, SITES.iter().map(|s| Some(*s)).collect::<Vec<_>>());
        for peak in peaks.iter() {
            assert!(peak.width() >= FRAGMENT);
            assert!(peak.fold_enrichment > 10.0);
            assert!(peak.neglog10_qvalue >= 2.0);
            assert!(peak.neglog10_qvalue <= peak.neglog10_pvalue);
        }
    }

    #[rstest]
    fn test_callpeak_broad_blocks_are_nested(treatment: ReadTrack, control: ReadTrack) {
        let mut treat = Alignments::Single(treatment);
        let mut ctrl = Alignments::Single(control);
        let options = CallPeakOptions {
            broad: true,
            broad_cutoff: 0.1,
            ..options()
        };
        let result = run_callpeak(&mut treat, Some(&mut ctrl), &options).unwrap();
        let CalledPeaks::Broad(peaks) = &result.peaks else {
            panic!("expected broad peaks");
        };
        assert!(peaks.len() >= 3);
        for broad in peaks.iter() {
            assert!(!broad.blocks.is_empty());
            assert!(broad.blocks_are_nested());
        }
    }

    #[rstest]
    fn test_callpeak_without_control_uses_model(treatment: ReadTrack) {
        let mut treat = Alignments::Single(treatment);
        let options = CallPeakOptions {
            nomodel: false,
            model: ModelOptions {
                mfold: (5.0, 500.0),
                ..Default::default()
            },
            ..options()
        };
        let result = run_callpeak(&mut treat, None, &options).unwrap();
        let model = result.model.as_ref().unwrap();
        assert!(model.num_pairs() >= 3);
        assert!(result.d >= 100 && result.d <= 200, "d = {}", result.d);
        assert_eq!(result.control_total, None);
        assert!(result.peaks.len() >= 3);
    }

    #[rstest]
    fn test_pileup_bedgraph_file_round_trip(treatment: ReadTrack, control: ReadTrack) {
        let mut treat = Alignments::Single(treatment);
        let mut ctrl = Alignments::Single(control);
        let result = run_callpeak(&mut treat, Some(&mut ctrl), &options()).unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("treat_pileup.bdg");
        {
            let mut writer = BufWriter::new(File::create(&path).unwrap());
            result
                .treat_pileup
                .write_bedgraph(&mut writer, Some("treatment"), None)
                .unwrap();
        }
        let reader = BufReader::new(File::open(&path).unwrap());
        let parsed = StepTrack::read_bedgraph(reader, 0.0, false).unwrap();

        // multiples of the 0.625 treatment scale print exactly
        for site in SITES {
            let position = site + FRAGMENT;
            assert_eq!(
                parsed.value_at("chr1", position),
                result.treat_pileup.value_at("chr1", position)
            );
        }
        assert_eq!(parsed.summary().sum, result.treat_pileup.summary().sum);
    }
}
