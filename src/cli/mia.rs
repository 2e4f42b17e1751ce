use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::categorizer::categorize_transactions;
use crate::error::Result;
use crate::fmt::money;
use crate::importer::load_transactions;
use crate::rules::{load_check_map, load_rules};
use crate::settings::Settings;

pub fn run(file: &str, rules: Option<String>, checks: Option<String>) -> Result<()> {
    let settings = Settings::load();
    let rules_path = settings.rules_path(rules)?;
    let checks_path = settings.checks_path(checks);

    let load = load_transactions(Path::new(file))?;
    let table_rules = load_rules(&rules_path)?;
    let check_map = checks_path.as_deref().map(load_check_map).transpose()?;
    let result = categorize_transactions(&load.records, &table_rules, check_map.as_ref());

    if result.batch.unmatched.is_empty() {
        println!("{}", "No transactions MIA".green());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Date", "Details", "Description", "Amount", "Check"]);
    for txn in &result.batch.unmatched {
        table.add_row(vec![
            Cell::new(
                txn.posting_date
                    .map(|d| d.format("%m/%d/%Y").to_string())
                    .unwrap_or_default(),
            ),
            Cell::new(txn.detail_type.as_str()),
            Cell::new(&txn.description),
            Cell::new(money(txn.amount)),
            Cell::new(txn.check_number.map(|n| n.to_string()).unwrap_or_default()),
        ]);
    }
    println!("Transactions MIA\n{table}");
    println!(
        "{} of {} transactions MIA ({})",
        result.still_flagged.to_string().red().bold(),
        load.records.len(),
        money(result.batch.unmatched_total())
    );
    Ok(())
}
