use std::path::{Path, PathBuf};

use tracing::info;

use crate::categorizer::{categorize_transactions, CategorizeResult};
use crate::error::Result;
use crate::export::{write_expense_report, write_mapped, write_unmatched, OutputPaths};
use crate::importer::{load_transactions, LoadResult};
use crate::models::CategoryLookup;
use crate::reconciler::{reconcile, ReconcileResult};
use crate::reports::{build_expense_report, ExpenseReport};
use crate::rules::{load_check_map, load_lookup, load_rules};

/// Files one run reads from.
#[derive(Debug, Clone)]
pub struct PipelineInputs {
    pub transactions: PathBuf,
    pub rules: PathBuf,
    pub lookup: PathBuf,
    pub checks: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Drop report rows whose expense total is not positive.
    pub expenses_only: bool,
}

pub struct PipelineOutput {
    pub load: LoadResult,
    pub categorized: CategorizeResult,
    pub reconciled: ReconcileResult,
    pub report: ExpenseReport,
    pub lookup: CategoryLookup,
}

/// Load, categorize, reconcile, and aggregate. Nothing is written here, so a
/// reconciliation failure leaves no partial output behind.
pub fn run(inputs: &PipelineInputs, options: &PipelineOptions) -> Result<PipelineOutput> {
    let load = load_transactions(&inputs.transactions)?;
    let rules = load_rules(&inputs.rules)?;
    let lookup = load_lookup(&inputs.lookup)?;
    let checks = inputs.checks.as_deref().map(load_check_map).transpose()?;

    let categorized = categorize_transactions(&load.records, &rules, checks.as_ref());
    let reconciled = reconcile(&load.records, &categorized.batch)?;

    let mut report = build_expense_report(&categorized.batch, &lookup);
    if options.expenses_only {
        report = report.expenses_only();
    }

    info!(
        records = load.records.len(),
        skipped = load.skipped,
        matched = categorized.categorized,
        unmatched = categorized.still_flagged,
        "pipeline finished"
    );

    Ok(PipelineOutput {
        load,
        categorized,
        reconciled,
        report,
        lookup,
    })
}

/// `.<name>.partial` beside the final file.
fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.partial"))
}

/// Write the expense report, unmatched, and mapped files into `dir`.
///
/// All three are written to staging files first and only renamed into place
/// once every write succeeded, so a failed write leaves no report behind.
pub fn write_outputs(output: &PipelineOutput, dir: &Path) -> Result<OutputPaths> {
    std::fs::create_dir_all(dir)?;
    let paths = OutputPaths::in_dir(dir);
    let staged = OutputPaths {
        expense: staging_path(&paths.expense),
        unmatched: staging_path(&paths.unmatched),
        mapped: staging_path(&paths.mapped),
    };
    let batch = &output.categorized.batch;

    let written = write_expense_report(&staged.expense, &output.report)
        .and_then(|_| write_unmatched(&staged.unmatched, &batch.unmatched))
        .and_then(|_| write_mapped(&staged.mapped, &batch.matched, &output.lookup));
    if let Err(e) = written {
        for path in [&staged.expense, &staged.unmatched, &staged.mapped] {
            if path.is_file() {
                let _ = std::fs::remove_file(path);
            }
        }
        return Err(e);
    }

    std::fs::rename(&staged.expense, &paths.expense)?;
    std::fs::rename(&staged.unmatched, &paths.unmatched)?;
    std::fs::rename(&staged.mapped, &paths.mapped)?;
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaxmapError;
    use crate::models::CategoryKey;
    use rust_decimal::Decimal;
    use std::fs;

    const TRANSACTIONS: &str = "\
Details,Posting Date,Description,Amount,Type,Balance,Check or Slip #
DEBIT,01/03/2023,UBER TRIP 44,-20.00,DEBIT_CARD,980.00,,
DEBIT,01/04/2023,AMAZON MKTP,-45.50,DEBIT_CARD,934.50,,
DEBIT,01/05/2023,UNKNOWN VENDOR,-5.00,DEBIT_CARD,929.50,,
";

    fn total(output: &PipelineOutput, key: i64) -> Option<Decimal> {
        output
            .report
            .rows
            .iter()
            .find(|r| r.key == CategoryKey(key))
            .map(|r| r.total)
    }

    fn fixture(dir: &Path) -> PipelineInputs {
        let transactions = dir.join("activity.csv");
        let rules = dir.join("coa.csv");
        let lookup = dir.join("keys.csv");
        fs::write(&transactions, TRANSACTIONS).unwrap();
        fs::write(&rules, "DESCRIPTION,EXPENSE\nUBER,12\nAMAZON,7\n").unwrap();
        fs::write(&lookup, "KEY,ACCOUNT\n12,Transport\n7,Shopping\n0,Non-Expense\n").unwrap();
        PipelineInputs {
            transactions,
            rules,
            lookup,
            checks: None,
        }
    }

    #[test]
    fn test_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = fixture(dir.path());
        let output = run(&inputs, &PipelineOptions::default()).unwrap();

        assert_eq!(output.categorized.categorized, 2);
        assert_eq!(output.categorized.still_flagged, 1);
        assert_eq!(total(&output, 12), Some(Decimal::new(2000, 2)));
        assert_eq!(total(&output, 7), Some(Decimal::new(4550, 2)));
        assert_eq!(total(&output, 0), Some(Decimal::ZERO));

        let out_dir = dir.path().join("out");
        let paths = write_outputs(&output, &out_dir).unwrap();
        let expense = fs::read_to_string(&paths.expense).unwrap();
        assert!(expense.contains("12,Transport,20.00"));
        assert!(expense.contains("7,Shopping,45.50"));
        let unmatched = fs::read_to_string(&paths.unmatched).unwrap();
        assert!(unmatched.contains("UNKNOWN VENDOR"));
        assert!(!unmatched.contains("UBER"));
        let mapped = fs::read_to_string(&paths.mapped).unwrap();
        assert!(mapped.contains("AMAZON MKTP"));
    }

    #[test]
    fn test_failed_write_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = fixture(dir.path());
        let output = run(&inputs, &PipelineOptions::default()).unwrap();

        let out_dir = dir.path().join("out");
        let paths = OutputPaths::in_dir(&out_dir);
        // A directory where the mapped file is staged makes the last write fail.
        fs::create_dir_all(staging_path(&paths.mapped)).unwrap();

        assert!(write_outputs(&output, &out_dir).is_err());
        assert!(!paths.expense.exists());
        assert!(!paths.unmatched.exists());
        assert!(!staging_path(&paths.expense).exists());
        assert!(!staging_path(&paths.unmatched).exists());
    }

    #[test]
    fn test_expenses_only_drops_zero_rows() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = fixture(dir.path());
        let options = PipelineOptions {
            expenses_only: true,
        };
        let output = run(&inputs, &options).unwrap();
        assert!(total(&output, 0).is_none());
        assert_eq!(output.report.rows.len(), 2);
    }

    #[test]
    fn test_missing_rules_file_fails_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let mut inputs = fixture(dir.path());
        inputs.rules = dir.path().join("missing.csv");
        let err = run(&inputs, &PipelineOptions::default()).err().unwrap();
        assert!(matches!(err, TaxmapError::RuleLoad { .. }));
    }

    #[test]
    fn test_check_map_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let mut inputs = fixture(dir.path());
        let mut data = TRANSACTIONS.to_string();
        data.push_str("CHECK,01/06/2023,CHECK 1043,-300.00,CHECK_PAID,629.50,1043,\n");
        fs::write(&inputs.transactions, data).unwrap();
        let checks = dir.path().join("checks.csv");
        fs::write(&checks, "1043,12\n").unwrap();
        inputs.checks = Some(checks);

        let output = run(&inputs, &PipelineOptions::default()).unwrap();
        assert_eq!(output.categorized.by_check, 1);
        assert_eq!(total(&output, 12), Some(Decimal::new(32000, 2)));
    }
}
