use std::fs::{File, read_to_string};
use std::io::BufWriter;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rstest::*;
use tempfile::tempdir;

use peakrs_core::models::{Peak, PeakSet};
use peakrs_diff::{DiffClass, DiffEngine, DiffInput, DiffOptions, write_diff_bed, write_diff_xls};
use peakrs_signal::bedgraph::{StepTrack, from_intervals};

const LENGTH: u32 = 10_000;

fn with_sites(sites: &[(u32, u32)]) -> StepTrack {
    let mut intervals = Vec::new();
    let mut position = 0;
    for (start, end) in sites {
        intervals.push(("chr1", position, *start, 1.0));
        intervals.push(("chr1", *start, *end, 50.0));
        position = *end;
    }
    intervals.push(("chr1", position, LENGTH, 1.0));
    from_intervals(intervals, 0.0).unwrap()
}

struct Conditions {
    treat1: StepTrack,
    treat2: StepTrack,
    control: StepTrack,
}

#[fixture]
fn conditions() -> Conditions {
    Conditions {
        // A only in 1, B only in 2, C in both
        treat1: with_sites(&[(1000, 1500), (6000, 6500)]),
        treat2: with_sites(&[(3000, 3500), (6000, 6500)]),
        control: with_sites(&[]),
    }
}

fn input(c: &Conditions) -> DiffInput<'_> {
    DiffInput {
        treat1: &c.treat1,
        control1: &c.control,
        treat2: &c.treat2,
        control2: &c.control,
        depth1: 1000.0,
        depth2: 1000.0,
    }
}

mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn spans(set: &PeakSet) -> Vec<(u32, u32)> {
        set.iter().map(|p| (p.start, p.end)).collect()
    }

    #[rstest]
    fn test_classification(conditions: Conditions) {
        let mut engine = DiffEngine::new(DiffOptions::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let result = engine.run(&input(&conditions), None, &mut rng).unwrap();

        assert_eq!(spans(&result.peaks1), vec![(1000, 1500), (6000, 6500)]);
        assert_eq!(spans(&result.peaks2), vec![(3000, 3500), (6000, 6500)]);
        assert_eq!(spans(&result.unique1), vec![(1000, 1500)]);
        assert_eq!(spans(&result.unique2), vec![(3000, 3500)]);
        assert_eq!(spans(&result.common), vec![(6000, 6500)]);

        let names: Vec<&str> = [DiffClass::Unique1, DiffClass::Unique2, DiffClass::Common]
            .iter()
            .flat_map(|c| result.set(*c).iter().map(|p| p.name.as_str()))
            .collect();
        assert_eq!(names, vec!["diff_cond1_1", "diff_cond2_1", "diff_common_1"]);

        let up = result.annotations(DiffClass::Unique1)[0];
        assert!(up.log_lr > 3.0);
        assert_eq!((up.treat1, up.treat2), (50.0, 1.0));
        assert!(up.gfold > 0.0);

        let down = result.annotations(DiffClass::Unique2)[0];
        assert!(down.log_lr < -3.0);
        assert!(down.gfold < 0.0);

        let shared = result.annotations(DiffClass::Common)[0];
        assert_eq!(shared.log_lr, 0.0);
        assert_eq!(shared.gfold, 0.0);
    }

    #[rstest]
    fn test_external_peaks_drop_unsupported_regions(conditions: Conditions) {
        let mut engine = DiffEngine::new(DiffOptions::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let peaks1 = PeakSet::new(vec![Peak::new("chr1", 6000, 6500, 6250)]);
        let peaks2 = PeakSet::new(vec![Peak::new("chr1", 2900, 3600, 3250), Peak::new("chr1", 6100, 6400, 6250)]);
        let result = engine
            .run(&input(&conditions), Some((peaks1, peaks2)), &mut rng)
            .unwrap();

        // A has no supporting peak in either condition
        assert!(result.unique1.is_empty());
        assert_eq!(spans(&result.unique2), vec![(3000, 3500)]);
        assert_eq!(spans(&result.common), vec![(6100, 6400)]);
    }

    #[rstest]
    fn test_depth_scaling_removes_uniform_difference() {
        // condition 2 is twice as deep everywhere
        let treat1 = with_sites(&[(1000, 1500)]);
        let treat2 = treat1.scale(2.0);
        let control1 = with_sites(&[]);
        let control2 = control1.scale(2.0);
        let input = DiffInput {
            treat1: &treat1,
            control1: &control1,
            treat2: &treat2,
            control2: &control2,
            depth1: 1000.0,
            depth2: 2000.0,
        };
        let mut engine = DiffEngine::new(DiffOptions::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let result = engine.run(&input, None, &mut rng).unwrap();
        assert!(result.unique1.is_empty());
        assert!(result.unique2.is_empty());
        assert_eq!(spans(&result.common), vec![(1000, 1500)]);
    }

    #[rstest]
    fn test_outputs(conditions: Conditions) {
        let mut engine = DiffEngine::new(DiffOptions::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let result = engine.run(&input(&conditions), None, &mut rng).unwrap();

        let dir = tempdir().unwrap();
        let bed = dir.path().join("diff_c1.bed");
        let xls = dir.path().join("diff.xls");
        {
            let mut writer = BufWriter::new(File::create(&bed).unwrap());
            write_diff_bed(&mut writer, &result.unique1, result.annotations(DiffClass::Unique1)).unwrap();
            let mut writer = BufWriter::new(File::create(&xls).unwrap());
            write_diff_xls(&mut writer, &result, &["cutoff = 3".to_string()]).unwrap();
        }

        let bed = read_to_string(&bed).unwrap();
        assert!(bed.starts_with("chr1\t1000\t1500\tdiff_cond1_1\t"));
        let xls = read_to_string(&xls).unwrap();
        let lines: Vec<&str> = xls.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "# cutoff = 3");
        assert!(lines[2].starts_with("chr1\t1001\t1500\t500\t"));
        assert!(lines[4].contains("\tcommon\t"));
    }
}
