use std::path::PathBuf;

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaxmapError {
    #[error("Could not load transactions from {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    #[error("Could not load rule table {}: {reason}", path.display())]
    RuleLoad { path: PathBuf, reason: String },

    #[error(
        "Reconciliation failed: input total {expected}, matched + unmatched {actual} (off by {discrepancy})"
    )]
    Reconciliation {
        expected: Decimal,
        actual: Decimal,
        discrepancy: Decimal,
    },

    #[error("{0} ambiguous rule pair(s) found")]
    AmbiguousRules(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("No {0} file given and none configured (run `taxmap init`)")]
    MissingInput(&'static str),
}

impl TaxmapError {
    pub fn load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Load {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn rule_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::RuleLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TaxmapError>;
