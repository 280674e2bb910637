extern crate clap;
use clap::*;
use tracing_subscriber::EnvFilter;

mod cmd_psimod;

fn main() -> anyhow::Result<()> {
    let app = Command::new("psimod")
        .version(crate_version!())
        .author(crate_authors!())
        .about("`psimod` - PSI modalities of alternative splicing events")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log debug messages to stderr"),
        )
        .subcommand(cmd_psimod::assign::make_subcommand())
        .subcommand(cmd_psimod::score::make_subcommand())
        .subcommand(cmd_psimod::compare::make_subcommand())
        .subcommand(cmd_psimod::count::make_subcommand())
        .after_help(
            r###"Subcommand groups:

* Assignment:
    * assign  - Modality of every event in every sample group
    * score   - Log-evidence of each model for single PSI vectors

* Reports:
    * compare - Events whose modality differs between two groups
    * count   - Number of events per modality and group

"###,
        );

    let matches = app.get_matches();
    let is_verbose = matches.get_flag("verbose")
        || matches
            .subcommand()
            .is_some_and(|(_, sub)| sub.get_flag("verbose"));
    setup_logging(is_verbose);

    // Check which subcommand the user ran...
    match matches.subcommand() {
        Some(("assign", sub_matches)) => cmd_psimod::assign::execute(sub_matches),
        Some(("score", sub_matches)) => cmd_psimod::score::execute(sub_matches),
        Some(("compare", sub_matches)) => cmd_psimod::compare::execute(sub_matches),
        Some(("count", sub_matches)) => cmd_psimod::count::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}

// RUST_LOG takes precedence over --verbose
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
