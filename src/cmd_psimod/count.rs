use clap::*;
use psimod::libs::modality::ModalityTable;
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("count")
        .about("Number of events per modality and group")
        .after_help(
            r###"
Reads the output of `psimod assign`. Every modality is listed for every group,
zero counts included; ambiguous and unresolved pairs are listed when present.

Output columns:
    group modality count

Examples:
   psimod count modalities.tsv
"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .index(1)
                .help("Modality table. [stdin] for standard input"),
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
    let outfile = args.get_one::<String>("outfile").unwrap();

    let table = ModalityTable::read_tsv(psimod::reader(infile)?)?;

    let mut writer = psimod::writer(outfile)?;
    writeln!(writer, "group\tmodality\tcount")?;
    for group in table.groups() {
        for (label, count) in table.counts(&group) {
            writeln!(writer, "{}\t{}\t{}", group, label, count)?;
        }
    }
    writer.flush()?;

    Ok(())
}
