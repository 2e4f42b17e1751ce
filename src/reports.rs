use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::models::{CategorizedBatch, CategoryKey, CategoryLookup};

pub const UNKNOWN_ACCOUNT: &str = "UNKNOWN ACCOUNT";

// ---------------------------------------------------------------------------
// Expense report
// ---------------------------------------------------------------------------

pub struct ExpenseItem {
    pub key: CategoryKey,
    pub name: String,
    /// Expenses read positive: the negated sum of the signed amounts.
    pub total: Decimal,
    pub count: usize,
    pub known: bool,
}

pub struct ExpenseReport {
    pub rows: Vec<ExpenseItem>,
}

/// Group matched transactions by key and outer-join against the lookup.
///
/// Every lookup category gets a row, in lookup order, with a zero total when
/// nothing matched it. Keys that the lookup does not know are appended in
/// ascending order under `UNKNOWN ACCOUNT`. The sign flip happens here only;
/// the transactions keep their signed amounts.
pub fn build_expense_report(batch: &CategorizedBatch, lookup: &CategoryLookup) -> ExpenseReport {
    let mut sums: BTreeMap<CategoryKey, (Decimal, usize)> = BTreeMap::new();
    for record in &batch.matched {
        if let Some(key) = record.category_key {
            let entry = sums.entry(key).or_default();
            entry.0 += record.amount;
            entry.1 += 1;
        }
    }

    let mut rows = Vec::with_capacity(lookup.len() + sums.len());
    for (key, name) in lookup.iter() {
        let (sum, count) = sums.remove(&key).unwrap_or_default();
        rows.push(ExpenseItem {
            key,
            name: name.to_string(),
            total: flip(sum),
            count,
            known: true,
        });
    }
    for (key, (sum, count)) in sums {
        rows.push(ExpenseItem {
            key,
            name: UNKNOWN_ACCOUNT.to_string(),
            total: flip(sum),
            count,
            known: false,
        });
    }

    ExpenseReport { rows }
}

fn flip(sum: Decimal) -> Decimal {
    if sum.is_zero() {
        Decimal::ZERO
    } else {
        -sum
    }
}

impl ExpenseReport {
    /// Keep only rows with a positive expense total.
    pub fn expenses_only(self) -> Self {
        Self {
            rows: self
                .rows
                .into_iter()
                .filter(|r| r.total > Decimal::ZERO)
                .collect(),
        }
    }

    pub fn total(&self) -> Decimal {
        self.rows.iter().map(|r| r.total).sum()
    }

    /// Total over every row except the non-expense key.
    pub fn excluding_non_expense(&self) -> Decimal {
        self.rows
            .iter()
            .filter(|r| r.key != CategoryKey::NON_EXPENSE)
            .map(|r| r.total)
            .sum()
    }

    pub fn unknown(&self) -> impl Iterator<Item = &ExpenseItem> {
        self.rows.iter().filter(|r| !r.known)
    }
}
