use std::path::{Path, PathBuf};

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::{Result, TaxmapError};
use crate::rules::{find_ambiguous_rules, load_rules, sort_rules, write_rules};
use crate::settings::Settings;

fn rules_path(rules: Option<String>) -> Result<PathBuf> {
    Settings::load().rules_path(rules)
}

/// `sorted_<name>` next to the input file.
pub fn sorted_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "rules.csv".to_string());
    path.with_file_name(format!("sorted_{name}"))
}

pub fn check(rules: Option<String>) -> Result<()> {
    let table_rules = load_rules(&rules_path(rules)?)?;
    let pairs = find_ambiguous_rules(table_rules.rules());
    if pairs.is_empty() {
        println!(
            "{} ({} rules)",
            "No ambiguous rules".green(),
            table_rules.len()
        );
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Rule #", "Substring", "Key", "Shadows #", "Substring", "Key"]);
    for pair in &pairs {
        let later_key = if pair.same_key() {
            Cell::new(pair.later.category_key)
        } else {
            Cell::new(pair.later.category_key.to_string().red())
        };
        table.add_row(vec![
            Cell::new(pair.earlier_index + 1),
            Cell::new(&pair.earlier.match_substring),
            Cell::new(pair.earlier.category_key),
            Cell::new(pair.later_index + 1),
            Cell::new(&pair.later.match_substring),
            later_key,
        ]);
    }
    println!("Ambiguous rules\n{table}");
    Err(TaxmapError::AmbiguousRules(pairs.len()))
}

pub fn list(rules: Option<String>) -> Result<()> {
    let table_rules = load_rules(&rules_path(rules)?)?;
    let mut table = Table::new();
    table.set_header(vec!["#", "Substring", "Key"]);
    for (i, rule) in table_rules.rules().iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&rule.match_substring),
            Cell::new(rule.category_key),
        ]);
    }
    println!("Rules\n{table}");
    Ok(())
}

pub fn sort(rules: Option<String>) -> Result<()> {
    let path = rules_path(rules)?;
    let mut sorted = load_rules(&path)?.rules().to_vec();
    sort_rules(&mut sorted);
    let out = sorted_path(&path);
    write_rules(&out, &sorted)?;
    println!("Wrote {} rules to {}", sorted.len(), out.display());
    Ok(())
}
