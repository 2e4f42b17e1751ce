use rust_decimal::Decimal;

/// Which amount columns a transaction export carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLayout {
    /// One signed `Amount` column (Chase checking).
    SignedAmount,
    /// Separate `Debit` and `Credit` columns.
    DebitCredit,
}

impl SourceLayout {
    pub fn detect<S: AsRef<str>>(headers: &[S]) -> Option<Self> {
        let has = |name: &str| {
            headers
                .iter()
                .any(|h| h.as_ref().trim().eq_ignore_ascii_case(name))
        };
        if has("Debit") && has("Credit") {
            Some(Self::DebitCredit)
        } else if has("Amount") {
            Some(Self::SignedAmount)
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SignedAmount => "signed amount",
            Self::DebitCredit => "debit/credit",
        }
    }
}

/// Amount columns as read from one row, before and after normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawAmount {
    pub amount: Decimal,
    pub debit: Option<Decimal>,
    pub credit: Option<Decimal>,
}

impl RawAmount {
    pub fn signed(amount: Decimal) -> Self {
        Self {
            amount,
            debit: None,
            credit: None,
        }
    }

    pub fn split(debit: Option<Decimal>, credit: Option<Decimal>) -> Self {
        Self {
            amount: Decimal::ZERO,
            debit,
            credit,
        }
    }
}

/// Fold debit/credit into the signed amount: `debit - credit`, absent sides
/// count as zero. Rows with neither keep their amount. Debit and credit are
/// left in place, so normalizing twice gives the same result.
pub fn normalize(raw: &mut RawAmount) {
    if raw.debit.is_none() && raw.credit.is_none() {
        return;
    }
    raw.amount = raw.debit.unwrap_or_default() - raw.credit.unwrap_or_default();
}
