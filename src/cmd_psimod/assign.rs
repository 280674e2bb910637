use clap::*;
use psimod::libs::modality::ModalityEngine;
use psimod::libs::psi::{PsiMatrix, SampleGroups, Study};
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    let cmd = Command::new("assign")
        .about("Assign a modality to every event in every sample group")
        .after_help(
            r###"
Fits the Beta model family to the PSI values of each (event, group) pair and
reports the best-supported modality.

Input:
* <infile>: PSI matrix, `sample<TAB>event1<TAB>event2...` header, one row per sample.
  Empty cells and NA/NaN are missing values.
* --groups: `sample<TAB>group` lines. Without it, all samples form the group `all`.

Output columns:
    event group n status modality confidence posterior log_bf [score_*]

* status: assigned, ambiguous, insufficient_data or degenerate
* confidence: softmax of the best against the runner-up model
* Pairs with values outside [0, 1] are reported on stderr and left out.

Examples:
1. Assign modalities per phenotype:
   psimod assign psi.tsv -g groups.tsv -o modalities.tsv

2. Keep the per-model log-evidence:
   psimod assign psi.tsv -g groups.tsv --scores
"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .index(1)
                .help("PSI matrix. [stdin] for standard input"),
        )
        .arg(
            Arg::new("groups")
                .long("groups")
                .short('g')
                .num_args(1)
                .help("Sample groups file"),
        )
        .arg(
            Arg::new("scores")
                .long("scores")
                .action(ArgAction::SetTrue)
                .help("Append the log-evidence of every model"),
        )
        .arg(
            Arg::new("parallel")
                .long("parallel")
                .short('p')
                .num_args(1)
                .default_value("1")
                .value_parser(value_parser!(usize))
                .help("Number of threads for parallel processing"),
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
    //----------------------------
    // Args
    //----------------------------
    let infile = args.get_one::<String>("infile").unwrap();
    let outfile = args.get_one::<String>("outfile").unwrap();
    let is_scores = args.get_flag("scores");

    let opt_parallel = *args.get_one::<usize>("parallel").unwrap();
    rayon::ThreadPoolBuilder::new()
        .num_threads(opt_parallel)
        .build_global()?;

    let engine = ModalityEngine::new(super::model_config(args))?;

    //----------------------------
    // Load
    //----------------------------
    let matrix = PsiMatrix::from_path(infile)?;
    let study = match args.get_one::<String>("groups") {
        Some(file) => Study::new(matrix, SampleGroups::from_path(file)?),
        None => Study::ungrouped(matrix),
    };
    tracing::info!(
        samples = study.matrix().n_samples(),
        events = study.matrix().events().len(),
        "PSI matrix loaded"
    );

    //----------------------------
    // Assign
    //----------------------------
    let run = engine.assign_study(&study);
    if !run.failures.is_empty() {
        tracing::warn!(
            "{} event/group pairs rejected for invalid PSI values",
            run.failures.len()
        );
    }

    //----------------------------
    // Output
    //----------------------------
    let mut writer = psimod::writer(outfile)?;
    run.table
        .write_tsv(&mut writer, &engine.modalities(), is_scores)?;
    writer.flush()?;

    Ok(())
}
