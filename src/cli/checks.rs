use std::path::Path;

use crate::error::Result;
use crate::importer::{list_checks, load_transactions};

pub fn run(file: &str) -> Result<()> {
    let load = load_transactions(Path::new(file))?;
    let numbers = list_checks(&load.records);
    if numbers.is_empty() {
        println!("No checks found.");
        return Ok(());
    }
    for number in &numbers {
        println!("{number}");
    }
    println!("{} checks", numbers.len());
    Ok(())
}
