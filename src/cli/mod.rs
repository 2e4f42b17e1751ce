pub mod checks;
pub mod init;
pub mod mia;
pub mod rules;
pub mod run;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "taxmap",
    version,
    about = "Categorize bank transactions against a chart of accounts and build an expense report."
)]
pub struct Cli {
    /// Log debug detail (unmatched rows, skipped lines) to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Categorize a bank export and write the expense report.
    Run {
        /// Bank activity CSV
        file: String,
        /// Rule table CSV (DESCRIPTION, EXPENSE)
        #[arg(long)]
        rules: Option<String>,
        /// Key lookup CSV (KEY, ACCOUNT)
        #[arg(long)]
        lookup: Option<String>,
        /// Check number lookup CSV (check number, key)
        #[arg(long)]
        checks: Option<String>,
        /// Directory for Expense.csv and the transaction files
        #[arg(long = "output-dir")]
        output_dir: Option<String>,
        /// Only report categories with a positive expense total
        #[arg(long = "expenses-only")]
        expenses_only: bool,
    },
    /// List transactions no rule matched.
    Mia {
        /// Bank activity CSV
        file: String,
        /// Rule table CSV (DESCRIPTION, EXPENSE)
        #[arg(long)]
        rules: Option<String>,
        /// Check number lookup CSV (check number, key)
        #[arg(long)]
        checks: Option<String>,
    },
    /// Inspect and maintain the rule table.
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
    /// List the check numbers in a bank export.
    Checks {
        /// Bank activity CSV
        file: String,
    },
    /// Save default file locations.
    Init {
        /// Rule table CSV (DESCRIPTION, EXPENSE)
        #[arg(long)]
        rules: Option<String>,
        /// Key lookup CSV (KEY, ACCOUNT)
        #[arg(long)]
        lookup: Option<String>,
        /// Check number lookup CSV (check number, key)
        #[arg(long)]
        checks: Option<String>,
        /// Default output directory
        #[arg(long = "output-dir")]
        output_dir: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum RulesCommands {
    /// Report rules shadowed by an earlier rule.
    Check {
        /// Rule table CSV (DESCRIPTION, EXPENSE)
        #[arg(long)]
        rules: Option<String>,
    },
    /// List rules in match order.
    List {
        /// Rule table CSV (DESCRIPTION, EXPENSE)
        #[arg(long)]
        rules: Option<String>,
    },
    /// Write a copy of the rule table sorted by key (sorted_<file>).
    Sort {
        /// Rule table CSV (DESCRIPTION, EXPENSE)
        #[arg(long)]
        rules: Option<String>,
    },
}
