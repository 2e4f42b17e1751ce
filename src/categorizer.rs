use tracing::{debug, info};

use crate::models::{CategorizedBatch, CategoryKey, CheckMap, DetailType, TransactionRecord};
use crate::rules::RuleTable;

/// Maps a transaction description to a category key.
pub trait RuleMatcher {
    fn category_for(&self, description: &str) -> Option<CategoryKey>;
}

impl RuleMatcher for RuleTable {
    /// Linear scan in file order; case-sensitive substring containment.
    fn category_for(&self, description: &str) -> Option<CategoryKey> {
        self.first_match(description).map(|r| r.category_key)
    }
}

pub struct CategorizeResult {
    pub batch: CategorizedBatch,
    pub categorized: usize,
    pub by_check: usize,
    pub still_flagged: usize,
}

/// Assign a category key to every record. With a check map, `CHECK` rows are
/// keyed by check number instead of by description. Records that get no key
/// go to `unmatched`.
pub fn categorize_transactions<M: RuleMatcher + ?Sized>(
    records: &[TransactionRecord],
    matcher: &M,
    checks: Option<&CheckMap>,
) -> CategorizeResult {
    let mut batch = CategorizedBatch::default();
    let mut by_check = 0usize;

    for record in records {
        let key = match (checks, &record.detail_type) {
            (Some(checks), DetailType::Check) => {
                let key = record.check_number.and_then(|n| checks.get(&n).copied());
                if key.is_some() {
                    by_check += 1;
                }
                key
            }
            _ => matcher.category_for(&record.description),
        };

        let mut record = record.clone();
        record.category_key = key;
        match key {
            Some(_) => batch.matched.push(record),
            None => {
                debug!(
                    description = %record.description,
                    amount = %record.amount,
                    check = ?record.check_number,
                    "no matching rule"
                );
                batch.unmatched.push(record);
            }
        }
    }

    let categorized = batch.matched.len();
    let still_flagged = batch.unmatched.len();
    info!(categorized, by_check, still_flagged, "categorized transactions");

    CategorizeResult {
        batch,
        categorized,
        by_check,
        still_flagged,
    }
}
