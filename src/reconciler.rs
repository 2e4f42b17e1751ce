use rust_decimal::Decimal;

use crate::error::{Result, TaxmapError};
use crate::models::{CategorizedBatch, TransactionRecord};

/// Absolute tolerance, in currency units.
pub fn tolerance() -> Decimal {
    Decimal::new(1, 2)
}

pub struct ReconcileResult {
    pub input_total: Decimal,
    pub matched_total: Decimal,
    pub unmatched_total: Decimal,
    pub discrepancy: Decimal,
}

/// Check that categorization neither dropped nor duplicated a transaction:
/// `sum(all) == sum(matched) + sum(unmatched)` within the tolerance.
///
/// A failure here is a defect in the pipeline, not bad input.
pub fn reconcile(all: &[TransactionRecord], batch: &CategorizedBatch) -> Result<ReconcileResult> {
    let input_total: Decimal = all.iter().map(|r| r.amount).sum();
    let matched_total = batch.matched_total();
    let unmatched_total = batch.unmatched_total();
    let partition_total = matched_total + unmatched_total;
    let discrepancy = (input_total - partition_total).abs();

    if discrepancy > tolerance() || all.len() != batch.len() {
        return Err(TaxmapError::Reconciliation {
            expected: input_total,
            actual: partition_total,
            discrepancy,
        });
    }

    Ok(ReconcileResult {
        input_total,
        matched_total,
        unmatched_total,
        discrepancy,
    })
}
