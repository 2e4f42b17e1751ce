use std::path::{Path, PathBuf};

use csv::Writer;
use rust_decimal::Decimal;
use tracing::info;

use crate::error::Result;
use crate::models::{CategoryLookup, TransactionRecord};
use crate::reports::{ExpenseReport, UNKNOWN_ACCOUNT};

pub const EXPENSE_FILE: &str = "Expense.csv";
pub const UNMATCHED_FILE: &str = "Non_Mapped_Transactions.csv";
pub const MAPPED_FILE: &str = "Mapped_Transactions.csv";

const RECORD_COLUMNS: [&str; 7] = [
    "Details",
    "Posting Date",
    "Description",
    "Amount",
    "Type",
    "Balance",
    "Check",
];

/// Paths of the files one run writes.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub expense: PathBuf,
    pub unmatched: PathBuf,
    pub mapped: PathBuf,
}

impl OutputPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            expense: dir.join(EXPENSE_FILE),
            unmatched: dir.join(UNMATCHED_FILE),
            mapped: dir.join(MAPPED_FILE),
        }
    }
}

fn amount_field(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

fn record_fields(record: &TransactionRecord) -> Vec<String> {
    vec![
        record.detail_type.as_str().to_string(),
        record
            .posting_date
            .map(|d| d.format("%m/%d/%Y").to_string())
            .unwrap_or_default(),
        record.description.clone(),
        amount_field(record.amount),
        record.txn_type.clone(),
        record.balance.map(amount_field).unwrap_or_default(),
        record
            .check_number
            .map(|n| n.to_string())
            .unwrap_or_default(),
    ]
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

/// `KEY, ACCOUNT, Amount`, one row per report row.
pub fn write_expense_report(path: &Path, report: &ExpenseReport) -> Result<()> {
    let mut wtr = Writer::from_path(path)?;
    wtr.write_record(["KEY", "ACCOUNT", "Amount"])?;
    for row in &report.rows {
        wtr.write_record([
            row.key.to_string(),
            row.name.clone(),
            amount_field(row.total),
        ])?;
    }
    wtr.flush()?;
    info!(path = %path.display(), rows = report.rows.len(), "wrote expense report");
    Ok(())
}

/// Unmatched transactions with the same columns they were loaded from.
pub fn write_unmatched(path: &Path, records: &[TransactionRecord]) -> Result<()> {
    let mut wtr = Writer::from_path(path)?;
    wtr.write_record(RECORD_COLUMNS)?;
    for record in records {
        wtr.write_record(record_fields(record))?;
    }
    wtr.flush()?;
    info!(path = %path.display(), rows = records.len(), "wrote unmatched transactions");
    Ok(())
}

/// Categorized transactions with their key and account name appended.
pub fn write_mapped(
    path: &Path,
    records: &[TransactionRecord],
    lookup: &CategoryLookup,
) -> Result<()> {
    let mut wtr = Writer::from_path(path)?;
    let mut header: Vec<&str> = RECORD_COLUMNS.to_vec();
    header.extend(["KEY", "ACCOUNT"]);
    wtr.write_record(&header)?;
    for record in records {
        let mut fields = record_fields(record);
        match record.category_key {
            Some(key) => {
                fields.push(key.to_string());
                fields.push(lookup.name(key).unwrap_or(UNKNOWN_ACCOUNT).to_string());
            }
            None => {
                fields.push(String::new());
                fields.push(String::new());
            }
        }
        wtr.write_record(&fields)?;
    }
    wtr.flush()?;
    info!(path = %path.display(), rows = records.len(), "wrote mapped transactions");
    Ok(())
}
