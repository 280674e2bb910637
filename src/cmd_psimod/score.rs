use clap::*;
use psimod::libs::modality::{ModalityEngine, Outcome};
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    let cmd = Command::new("score")
        .about("Log-evidence of each model for single PSI vectors")
        .after_help(
            r###"
Each input line holds a name and comma separated PSI values:

    name<TAB>0.01,0.02,NA,0.03

Output columns:
    name n status modality confidence score_excluded ... score_multimodal

Vectors with values outside [0, 1] get the status `invalid`.

Examples:
1. Score a few vectors:
   printf "low\t0.01,0.02,0.03,0.02\n" | psimod score stdin
"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .index(1)
                .help("Input filename. [stdin] for standard input"),
        )
        .arg(
            Arg::new("outfile")
                .short('o')
                .long("outfile")
                .num_args(1)
                .default_value("stdout")
                .help("Output filename. [stdout] for screen"),
        );

    super::model_args(cmd)
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let infile = args.get_one::<String>("infile").unwrap();
    let outfile = args.get_one::<String>("outfile").unwrap();

    let engine = ModalityEngine::new(super::model_config(args))?;
    let modalities = engine.modalities();
    let selector = engine.selector();

    let reader = psimod::reader(infile)?;
    let mut writer = psimod::writer(outfile)?;

    let mut header = vec![
        "name".to_string(),
        "n".to_string(),
        "status".to_string(),
        "modality".to_string(),
        "confidence".to_string(),
    ];
    header.extend(modalities.iter().map(|m| format!("score_{}", m)));
    writeln!(writer, "{}", header.join("\t"))?;

    for line in psimod::libs::io::data_lines(reader) {
        let line = line?;
        let (name, values) = parse_line(&line);

        let mut fields = vec![name.to_string(), values.len().to_string()];
        match engine.assign_one(&values) {
            Ok(outcome) => {
                fields.push(outcome.status().to_string());
                match &outcome {
                    Outcome::Assigned(call) | Outcome::Ambiguous(call) => {
                        fields.push(call.modality.to_string());
                        fields.push(format!("{:.6}", call.confidence));
                    }
                    Outcome::Insufficient(_) => {
                        fields.push("NA".to_string());
                        fields.push("NA".to_string());
                    }
                }
                // Scores are reported even below --min-samples
                for score in selector.scores(&values) {
                    fields.push(format!("{:.4}", score.log_evidence));
                }
            }
            Err(e) => {
                tracing::warn!("{}: {}", name, e);
                fields.push("invalid".to_string());
                fields.extend(std::iter::repeat("NA".to_string()).take(2 + modalities.len()));
            }
        }
        writeln!(writer, "{}", fields.join("\t"))?;
    }
    writer.flush()?;

    Ok(())
}

/// `name<TAB>v1,v2,...`; missing values are dropped, garbage becomes NaN.
fn parse_line(line: &str) -> (&str, Vec<f64>) {
    let (name, list) = line.split_once('\t').unwrap_or((line, ""));
    let values = list
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "NA" && *v != "NaN" && *v != "nan")
        .map(|v| v.parse::<f64>().unwrap_or(f64::NAN))
        .collect();
    (name.trim(), values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        let (name, values) = parse_line("low\t0.01, 0.02,NA,,0.03");
        assert_eq!(name, "low");
        assert_eq!(values, vec![0.01, 0.02, 0.03]);

        let (name, values) = parse_line("bad\t0.1,x");
        assert_eq!(name, "bad");
        assert!(values[1].is_nan());

        let (name, values) = parse_line("empty");
        assert_eq!(name, "empty");
        assert!(values.is_empty());
    }
}
