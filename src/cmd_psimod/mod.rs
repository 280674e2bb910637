//! Subcommand modules for the `psimod` binary.

use clap::{value_parser, Arg, ArgMatches, Command};
use psimod::libs::modality::ModalityConfig;

pub mod assign;
pub mod compare;
pub mod count;
pub mod score;

/// Options shared by the subcommands that run the selector.
pub fn model_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("min_samples")
            .long("min-samples")
            .short('m')
            .num_args(1)
            .default_value("4")
            .value_parser(value_parser!(usize))
            .help("Vectors with fewer values are reported as insufficient_data"),
    )
    .arg(
        Arg::new("epsilon")
            .long("epsilon")
            .num_args(1)
            .default_value("0.001")
            .value_parser(value_parser!(f64))
            .help("PSI values are clamped to [epsilon, 1 - epsilon]"),
    )
    .arg(
        Arg::new("tie_epsilon")
            .long("tie-epsilon")
            .num_args(1)
            .default_value("1e-9")
            .value_parser(value_parser!(f64))
            .help("Log-evidence differences below this are ties"),
    )
    .arg(
        Arg::new("ambiguous")
            .long("ambiguous")
            .num_args(1)
            .value_parser(value_parser!(f64))
            .help("Report calls whose log Bayes factor against a flat Beta(1,1) is below this as ambiguous"),
    )
}

pub fn model_config(args: &ArgMatches) -> ModalityConfig {
    let mut config = ModalityConfig {
        min_samples: *args.get_one::<usize>("min_samples").unwrap(),
        tie_epsilon: *args.get_one::<f64>("tie_epsilon").unwrap(),
        ambiguity_log_bf: args.get_one::<f64>("ambiguous").copied(),
        ..Default::default()
    };
    config.family.epsilon = *args.get_one::<f64>("epsilon").unwrap();

    config
}
