use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use log::info;

use peakrs_signal::score_track::{Normalization, ScoreMethod, ScoreTrack};

use crate::common::{align_tracks, arg, args_many, output_path, read_track, write_to};

pub fn parse_methods(names: &[String]) -> Result<Vec<ScoreMethod>> {
    names
        .iter()
        .map(|name| {
            name.parse::<ScoreMethod>()
                .with_context(|| format!("Invalid --method '{}'", name))
        })
        .collect()
}

/// One output file per method, either given or derived from the prefix.
pub fn output_names(methods: &[ScoreMethod], ofiles: &[String], prefix: &str) -> Result<Vec<String>> {
    if ofiles.is_empty() {
        return Ok(methods
            .iter()
            .map(|m| format!("{}_{}.bdg", prefix, m))
            .collect());
    }
    if ofiles.len() != methods.len() {
        bail!(
            "{} output files given for {} methods",
            ofiles.len(),
            methods.len()
        );
    }
    Ok(ofiles.to_vec())
}

pub fn run_bdgcmp(matches: &ArgMatches) -> Result<()> {
    let methods = parse_methods(&args_many(matches, "method"))?;
    let normalization: Normalization = arg::<String>(matches, "normalization")?.parse()?;
    let pseudocount = *arg::<f64>(matches, "pseudocount")?;
    let scaling = *arg::<f64>(matches, "scaling-factor")?;
    let outdir = arg::<String>(matches, "outdir")?;
    let names = output_names(
        &methods,
        &args_many(matches, "ofile"),
        arg::<String>(matches, "o-prefix")?,
    )?;

    let treat = read_track(arg::<String>(matches, "treatment")?, false)?;
    let control = read_track(arg::<String>(matches, "control")?, false)?;
    let mut tracks = [treat.scale(scaling), control.scale(scaling)];
    align_tracks(&mut tracks)?;
    let [treat, control] = tracks;

    let track = ScoreTrack::from_pileups(
        &treat,
        &control,
        *arg::<f64>(matches, "treat-depth")?,
        *arg::<f64>(matches, "control-depth")?,
    );
    info!("{} runs in the combined track", track.num_runs());
    let normalized = track.normalize(normalization, pseudocount);

    for (method, name) in methods.iter().zip(names.iter()) {
        let scores = normalized.score(*method).to_bedgraph();
        let description = format!("{} scores", method);
        write_to(&output_path(outdir, name)?, |w| {
            scores.write_bedgraph(w, Some(name.as_str()), Some(description.as_str()))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_parse_methods() {
        let names = vec!["ppois".to_string(), "logFE".to_string()];
        assert_eq!(
            parse_methods(&names).unwrap(),
            vec![ScoreMethod::PPois, ScoreMethod::LogFE]
        );
        assert!(parse_methods(&["fold".to_string()]).is_err());
    }

    #[rstest]
    fn test_output_names_from_prefix() {
        let names = output_names(&[ScoreMethod::QPois, ScoreMethod::FE], &[], "run").unwrap();
        assert_eq!(names, vec!["run_qpois.bdg", "run_FE.bdg"]);
    }

    #[rstest]
    fn test_output_names_count_mismatch() {
        let ofiles = vec!["a.bdg".to_string()];
        assert!(output_names(&[ScoreMethod::QPois, ScoreMethod::FE], &ofiles, "run").is_err());
    }
}
