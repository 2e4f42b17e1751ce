mod categorizer;
mod cli;
mod error;
mod export;
mod fmt;
mod importer;
mod models;
mod normalizer;
mod pipeline;
mod reconciler;
mod reports;
mod rules;
mod settings;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, RulesCommands};

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            file,
            rules,
            lookup,
            checks,
            output_dir,
            expenses_only,
        } => cli::run::run(&file, rules, lookup, checks, output_dir, expenses_only),
        Commands::Mia {
            file,
            rules,
            checks,
        } => cli::mia::run(&file, rules, checks),
        Commands::Rules { command } => match command {
            RulesCommands::Check { rules } => cli::rules::check(rules),
            RulesCommands::List { rules } => cli::rules::list(rules),
            RulesCommands::Sort { rules } => cli::rules::sort(rules),
        },
        Commands::Checks { file } => cli::checks::run(&file),
        Commands::Init {
            rules,
            lookup,
            checks,
            output_dir,
        } => cli::init::run(rules, lookup, checks, output_dir),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
