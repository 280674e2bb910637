use clap::*;
use psimod::libs::modality::ModalityTable;
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("compare")
        .about("Events whose modality differs between two groups")
        .after_help(
            r###"
Reads the output of `psimod assign` and lists the events resolved in both
groups whose labels differ. This is a label comparison, not a test of
significance.

Output columns, headed by the two group names:
    event label_a label_b

Examples:
1. Events switching modality between conditions:
   psimod compare modalities.tsv ctrl tumor

2. Only confident calls on both sides:
   psimod compare modalities.tsv ctrl tumor --min-confidence 0.9
"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .index(1)
                .help("Modality table. [stdin] for standard input"),
        )
        .arg(
            Arg::new("group_a")
                .required(true)
                .index(2)
                .help("First group"),
        )
        .arg(
            Arg::new("group_b")
                .required(true)
                .index(3)
                .help("Second group"),
        )
        .arg(
            Arg::new("min_confidence")
                .long("min-confidence")
                .num_args(1)
                .default_value("0")
                .value_parser(value_parser!(f64))
                .help("Both calls need at least this confidence"),
        )
        .arg(
            Arg::new("outfile")
                .short('o')
                .long("outfile")
                .num_args(1)
                .default_value("stdout")
                .help("Output filename. [stdout] for screen"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let infile = args.get_one::<String>("infile").unwrap();
    let group_a = args.get_one::<String>("group_a").unwrap();
    let group_b = args.get_one::<String>("group_b").unwrap();
    let opt_min_confidence = *args.get_one::<f64>("min_confidence").unwrap();
    let outfile = args.get_one::<String>("outfile").unwrap();

    let table = ModalityTable::read_tsv(psimod::reader(infile)?)?;
    let groups = table.groups();
    for g in [group_a, group_b] {
        if !groups.contains(g) {
            tracing::warn!(group = %g, "group not found in the modality table");
        }
    }

    let differing = table.compare_groups_confident(group_a, group_b, opt_min_confidence);

    let mut writer = psimod::writer(outfile)?;
    writeln!(writer, "event\t{}\t{}", group_a, group_b)?;
    for event in &differing {
        let label = |group: &str| {
            table
                .get(event, group)
                .and_then(|a| a.outcome.label())
                .unwrap_or("NA")
        };
        writeln!(writer, "{}\t{}\t{}", event, label(group_a.as_str()), label(group_b.as_str()))?;
    }
    writer.flush()?;

    tracing::info!(events = differing.len(), "events differing between groups");

    Ok(())
}
