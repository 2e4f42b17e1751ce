use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Expense category identifier from the chart of accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CategoryKey(pub i64);

impl CategoryKey {
    /// Transactions that are not deductible (transfers, payments, income).
    pub const NON_EXPENSE: CategoryKey = CategoryKey(0);
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The bank's `Details` column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailType {
    Debit,
    Credit,
    Check,
    DepositSlip,
    Other(String),
}

impl DetailType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "DEBIT" => Self::Debit,
            "CREDIT" => Self::Credit,
            "CHECK" => Self::Check,
            "DSLIP" => Self::DepositSlip,
            _ => Self::Other(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Debit => "DEBIT",
            Self::Credit => "CREDIT",
            Self::Check => "CHECK",
            Self::DepositSlip => "DSLIP",
            Self::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub detail_type: DetailType,
    pub posting_date: Option<NaiveDate>,
    pub description: String,
    /// Signed: outflows negative, inflows positive.
    pub amount: Decimal,
    pub txn_type: String,
    pub balance: Option<Decimal>,
    pub check_number: Option<u32>,
    pub category_key: Option<CategoryKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub match_substring: String,
    pub category_key: CategoryKey,
}

/// Check number → category key, maintained by hand for `CHECK` rows.
pub type CheckMap = HashMap<u32, CategoryKey>;

/// Key → account name, in the order the lookup file lists them.
#[derive(Debug, Clone, Default)]
pub struct CategoryLookup {
    entries: Vec<(CategoryKey, String)>,
}

impl CategoryLookup {
    pub fn new(entries: Vec<(CategoryKey, String)>) -> Self {
        Self { entries }
    }

    pub fn name(&self, key: CategoryKey) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, name)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (CategoryKey, &str)> {
        self.entries.iter().map(|(k, n)| (*k, n.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Every input record lands in exactly one of the two lists.
#[derive(Debug, Clone, Default)]
pub struct CategorizedBatch {
    pub matched: Vec<TransactionRecord>,
    pub unmatched: Vec<TransactionRecord>,
}

impl CategorizedBatch {
    pub fn len(&self) -> usize {
        self.matched.len() + self.unmatched.len()
    }

    pub fn matched_total(&self) -> Decimal {
        self.matched.iter().map(|r| r.amount).sum()
    }

    pub fn unmatched_total(&self) -> Decimal {
        self.unmatched.iter().map(|r| r.amount).sum()
    }
}
