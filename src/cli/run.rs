use std::path::PathBuf;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::fmt::money;
use crate::pipeline::{self, PipelineInputs, PipelineOptions};
use crate::settings::Settings;

pub fn run(
    file: &str,
    rules: Option<String>,
    lookup: Option<String>,
    checks: Option<String>,
    output_dir: Option<String>,
    expenses_only: bool,
) -> Result<()> {
    let settings = Settings::load();
    let inputs = PipelineInputs {
        transactions: PathBuf::from(file),
        rules: settings.rules_path(rules)?,
        lookup: settings.lookup_path(lookup)?,
        checks: settings.checks_path(checks),
    };
    let out_dir = settings.output_path(output_dir);

    let output = pipeline::run(&inputs, &PipelineOptions { expenses_only })?;
    let paths = pipeline::write_outputs(&output, &out_dir)?;

    let load = &output.load;
    print!("{} loaded", load.records.len());
    if load.skipped > 0 {
        print!(", {} skipped", load.skipped.to_string().yellow());
    }
    if load.trimmed > 0 {
        print!(", {} with extra trailing columns", load.trimmed);
    }
    println!(" ({} layout)", load.layout.name());

    let rec = &output.reconciled;
    println!(
        "Reconciled: {} in = {} matched + {} unmatched (off by {})",
        money(rec.input_total),
        money(rec.matched_total),
        money(rec.unmatched_total),
        money(rec.discrepancy)
    );

    let mut table = Table::new();
    table.set_header(vec!["Key", "Account", "Amount", "Count"]);
    for row in &output.report.rows {
        let name = if row.known {
            Cell::new(&row.name)
        } else {
            Cell::new(row.name.as_str().red())
        };
        table.add_row(vec![
            Cell::new(row.key),
            name,
            Cell::new(money(row.total)),
            Cell::new(row.count),
        ]);
    }
    table.add_row(vec![
        Cell::new(""),
        Cell::new("Total".bold()),
        Cell::new(money(output.report.total())),
        Cell::new(output.categorized.categorized),
    ]);
    table.add_row(vec![
        Cell::new(""),
        Cell::new("Excluding non-expense"),
        Cell::new(money(output.report.excluding_non_expense())),
        Cell::new(""),
    ]);
    println!("Expense Report\n{table}");

    let unknown: Vec<String> = output.report.unknown().map(|r| r.key.to_string()).collect();
    if !unknown.is_empty() {
        println!(
            "{} {}",
            "Keys missing from the lookup:".yellow(),
            unknown.join(", ")
        );
    }

    let c = &output.categorized;
    println!("{} categorized ({} by check number)", c.categorized, c.by_check);
    if c.still_flagged > 0 {
        println!(
            "{} {} ({})",
            c.still_flagged.to_string().red().bold(),
            "transactions MIA".red(),
            money(rec.unmatched_total)
        );
    } else {
        println!("{}", "No transactions MIA".green());
    }

    println!("Wrote {}", paths.expense.display());
    println!("Wrote {}", paths.unmatched.display());
    println!("Wrote {}", paths.mapped.display());
    Ok(())
}
