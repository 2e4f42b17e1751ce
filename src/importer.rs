use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::error::{Result, TaxmapError};
use crate::models::{DetailType, TransactionRecord};
use crate::normalizer::{normalize, RawAmount, SourceLayout};

/// Column set of a Chase checking export. Used when the file has no header.
pub const CHASE_COLUMNS: [&str; 7] = [
    "Details",
    "Posting Date",
    "Description",
    "Amount",
    "Type",
    "Balance",
    "Check or Slip #",
];

/// How many leading rows may be title lines before the header.
const HEADER_SEARCH_ROWS: usize = 2;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a bank amount: strips `$`, quotes, thousands separators and
/// whitespace; `(12.50)` is negative.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let s = raw.replace([',', '"', '$', ' '], "");
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return Decimal::from_str(inner).ok().map(|d| -d);
    }
    Decimal::from_str(s).ok()
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    ["%m/%d/%Y", "%Y-%m-%d", "%m-%d-%Y", "%m/%d/%y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

fn parse_check_number(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse().ok().or_else(|| {
        // Some exports write check numbers as floats ("1043.0").
        raw.parse::<f64>()
            .ok()
            .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= f64::from(u32::MAX))
            .map(|f| f as u32)
    })
}

// ---------------------------------------------------------------------------
// Column map
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct ColumnMap {
    width: usize,
    layout: SourceLayout,
    details: Option<usize>,
    date: Option<usize>,
    description: usize,
    amount: Option<usize>,
    debit: Option<usize>,
    credit: Option<usize>,
    txn_type: Option<usize>,
    balance: Option<usize>,
    check: Option<usize>,
}

impl ColumnMap {
    fn from_headers<S: AsRef<str>>(headers: &[S]) -> Option<Self> {
        let layout = SourceLayout::detect(headers)?;
        let find = |names: &[&str]| {
            headers.iter().position(|h| {
                let h = h.as_ref().trim();
                names.iter().any(|n| h.eq_ignore_ascii_case(n))
            })
        };
        let description = find(&["Description"])?;
        Some(Self {
            width: headers.len(),
            layout,
            details: find(&["Details"]),
            date: find(&["Posting Date", "Date", "Transaction Date"]),
            description,
            amount: find(&["Amount"]),
            debit: find(&["Debit"]),
            credit: find(&["Credit"]),
            txn_type: find(&["Type"]),
            balance: find(&["Balance"]),
            check: find(&["Check or Slip #", "Check-or-Slip#", "Check"]),
        })
    }

    fn chase() -> Self {
        Self {
            width: CHASE_COLUMNS.len(),
            layout: SourceLayout::SignedAmount,
            details: Some(0),
            date: Some(1),
            description: 2,
            amount: Some(3),
            debit: None,
            credit: None,
            txn_type: Some(4),
            balance: Some(5),
            check: Some(6),
        }
    }

    /// Smallest row length that still holds every required field.
    fn min_len(&self) -> usize {
        let required = match self.layout {
            SourceLayout::SignedAmount => vec![Some(self.description), self.amount],
            SourceLayout::DebitCredit => vec![Some(self.description), self.debit, self.credit],
        };
        required.into_iter().flatten().max().unwrap_or(0) + 1
    }
}

/// Does this headerless row have the shape of a Chase data row? Only the
/// `Details` value is checked, so a row with a bad amount or date still
/// selects the layout and is then skipped like any other malformed row.
fn looks_like_chase_row(record: &csv::StringRecord) -> bool {
    record.len() >= 4 && !matches!(DetailType::parse(&record[0]), DetailType::Other(_))
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

pub struct LoadResult {
    pub records: Vec<TransactionRecord>,
    pub skipped: usize,
    pub trimmed: usize,
    pub layout: SourceLayout,
}

/// Read a file as UTF-8, falling back to Windows-1252 (a Latin-1 superset)
/// when it is not valid UTF-8. Bank exports and chart-of-accounts sheets are
/// often saved that way.
pub fn read_text(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(decode_text(bytes))
}

fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(e.as_bytes());
            decoded.into_owned()
        }
    }
}

pub fn load_transactions(path: &Path) -> Result<LoadResult> {
    let text = read_text(path).map_err(|e| TaxmapError::load(path, e))?;
    read_transactions(text.as_bytes(), path)
}

pub fn read_transactions<R: Read>(data: R, path: &Path) -> Result<LoadResult> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let mut columns: Option<ColumnMap> = None;
    let mut leading = 0usize;
    let mut records = Vec::new();
    let mut skipped = 0usize;
    let mut trimmed = 0usize;

    for result in rdr.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "skipping unreadable row");
                skipped += 1;
                continue;
            }
        };
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if columns.is_none() {
            let fields: Vec<&str> = record.iter().collect();
            if let Some(map) = ColumnMap::from_headers(&fields) {
                debug!(line, layout = map.layout.name(), "found header row");
                columns = Some(map);
                continue;
            }
            if leading == 0 && looks_like_chase_row(&record) {
                debug!("no header row; reading as Chase export");
                columns = Some(ColumnMap::chase());
            } else {
                leading += 1;
                if leading >= HEADER_SEARCH_ROWS {
                    return Err(TaxmapError::load(
                        path,
                        "no recognized header (need Description and Amount or Debit/Credit)",
                    ));
                }
                debug!(line, "skipping title row");
                continue;
            }
        }
        let Some(map) = columns.as_ref() else {
            continue;
        };

        if record.len() > map.width {
            trimmed += 1;
        }
        match parse_row(&record, map) {
            Ok(txn) => records.push(txn),
            Err(reason) => {
                warn!(line, reason, "skipping malformed row");
                skipped += 1;
            }
        }
    }

    let Some(map) = columns else {
        return Err(TaxmapError::load(path, "file is empty"));
    };
    if records.is_empty() {
        return Err(TaxmapError::load(
            path,
            format!("no usable rows ({skipped} skipped)"),
        ));
    }
    if trimmed > 0 {
        debug!(trimmed, "dropped trailing columns beyond the header");
    }
    info!(
        loaded = records.len(),
        skipped,
        layout = map.layout.name(),
        "loaded transactions"
    );

    Ok(LoadResult {
        records,
        skipped,
        trimmed,
        layout: map.layout,
    })
}

/// Trimmed field at `idx`; missing columns and anything past the header
/// width read as empty.
fn field<'a>(record: &'a csv::StringRecord, map: &ColumnMap, idx: Option<usize>) -> &'a str {
    idx.filter(|i| *i < map.width)
        .and_then(|i| record.get(i))
        .map(str::trim)
        .unwrap_or("")
}

fn parse_row(
    record: &csv::StringRecord,
    map: &ColumnMap,
) -> std::result::Result<TransactionRecord, &'static str> {
    if record.len() < map.min_len() {
        return Err("too few columns");
    }
    let get = |idx: Option<usize>| field(record, map, idx);

    let posting_date = match get(map.date) {
        "" => None,
        raw => Some(parse_date(raw).ok_or("unparseable date")?),
    };

    let mut raw = match map.layout {
        SourceLayout::SignedAmount => {
            RawAmount::signed(parse_amount(get(map.amount)).ok_or("unparseable amount")?)
        }
        SourceLayout::DebitCredit => {
            let side = |idx| match get(idx) {
                "" => Ok(None),
                s => parse_amount(s).map(Some).ok_or("unparseable debit/credit"),
            };
            let mut raw = RawAmount::split(side(map.debit)?, side(map.credit)?);
            if let Some(existing) = parse_amount(get(map.amount)) {
                raw.amount = existing;
            }
            raw
        }
    };
    normalize(&mut raw);

    Ok(TransactionRecord {
        detail_type: DetailType::parse(get(map.details)),
        posting_date,
        description: get(Some(map.description)).to_string(),
        amount: raw.amount,
        txn_type: get(map.txn_type).to_string(),
        balance: parse_amount(get(map.balance)),
        check_number: parse_check_number(get(map.check)),
        category_key: None,
    })
}

/// Check numbers of every `CHECK` row, ascending. Used to build the
/// check-number lookup by hand.
pub fn list_checks(records: &[TransactionRecord]) -> Vec<u32> {
    let mut checks: Vec<u32> = records
        .iter()
        .filter(|r| r.detail_type == DetailType::Check)
        .filter_map(|r| r.check_number)
        .collect();
    checks.sort_unstable();
    checks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn read(content: &str) -> Result<LoadResult> {
        read_transactions(content.as_bytes(), Path::new("test.csv"))
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1,234.56"), Some(d("1234.56")));
        assert_eq!(parse_amount("\"500.00\""), Some(d("500.00")));
        assert_eq!(parse_amount("  -42.50  "), Some(d("-42.50")));
        assert_eq!(parse_amount("$1,234.56"), Some(d("1234.56")));
        assert_eq!(parse_amount("(75.25)"), Some(d("-75.25")));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("not_a_number"), None);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("01/15/2025"), NaiveDate::from_ymd_opt(2025, 1, 15));
        assert_eq!(parse_date("2025-01-15"), NaiveDate::from_ymd_opt(2025, 1, 15));
        assert_eq!(parse_date("02/30/2025"), None);
        assert_eq!(parse_date("invalid"), None);
    }

    #[test]
    fn test_chase_export_with_trailing_comma() {
        let content = "\
Details,Posting Date,Description,Amount,Type,Balance,Check or Slip #
DEBIT,01/15/2025,UBER TRIP 44,-20.00,ACH_DEBIT,980.00,,
DEBIT,01/16/2025,AMAZON MKTP,-45.50,DEBIT_CARD,934.50,,
CHECK,01/17/2025,CHECK 1043,-300.00,CHECK_PAID,634.50,1043,
";
        let result = read(content).unwrap();
        assert_eq!(result.layout, SourceLayout::SignedAmount);
        assert_eq!(result.records.len(), 3);
        assert_eq!(result.skipped, 0);
        assert_eq!(result.trimmed, 3);
        let uber = &result.records[0];
        assert_eq!(uber.detail_type, DetailType::Debit);
        assert_eq!(uber.description, "UBER TRIP 44");
        assert_eq!(uber.amount, d("-20.00"));
        assert_eq!(uber.balance, Some(d("980.00")));
        assert_eq!(uber.posting_date, NaiveDate::from_ymd_opt(2025, 1, 15));
        assert_eq!(result.records[2].check_number, Some(1043));
        assert!(result.records.iter().all(|r| r.category_key.is_none()));
    }

    #[test]
    fn test_title_row_before_header() {
        let content = "\
Account Activity Export
Details,Posting Date,Description,Amount,Type,Balance,Check or Slip #
DEBIT,01/15/2025,COSTCO GAS #1234,-35.10,DEBIT_CARD,100.00,
";
        let result = read(content).unwrap();
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].description, "COSTCO GAS #1234");
    }

    #[test]
    fn test_headerless_chase_rows() {
        let content = "\
DEBIT,01/15/2025,UBER TRIP 44,-20.00,ACH_DEBIT,980.00,
CHECK,01/17/2025,CHECK 1043,-300.00,CHECK_PAID,680.00,1043
";
        let result = read(content).unwrap();
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[0].description, "UBER TRIP 44");
        assert_eq!(result.records[1].detail_type, DetailType::Check);
    }

    #[test]
    fn test_debit_credit_layout() {
        let content = "\
Date,Description,Debit,Credit
01/15/2025,OFFICE DEPOT,25.00,
01/16/2025,REFUND,,10.00
";
        let result = read(content).unwrap();
        assert_eq!(result.layout, SourceLayout::DebitCredit);
        assert_eq!(result.records[0].amount, d("25.00"));
        assert_eq!(result.records[1].amount, d("-10.00"));
        assert_eq!(result.records[1].detail_type, DetailType::Other(String::new()));
    }

    #[test]
    fn test_malformed_rows_are_skipped_and_counted() {
        let content = "\
Details,Posting Date,Description,Amount,Type,Balance,Check or Slip #
DEBIT,01/15/2025,GOOD ROW,-20.00,ACH_DEBIT,980.00,
DEBIT,01/15/2025
DEBIT,01/16/2025,BAD AMOUNT,abc,ACH_DEBIT,980.00,
DEBIT,13/45/2025,BAD DATE,-1.00,ACH_DEBIT,980.00,
";
        let result = read(content).unwrap();
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.skipped, 3);
    }

    #[test]
    fn test_no_usable_rows_is_load_error() {
        let content = "\
Details,Posting Date,Description,Amount,Type,Balance,Check or Slip #
DEBIT,01/15/2025
";
        assert!(matches!(read(content), Err(TaxmapError::Load { .. })));
        assert!(matches!(read(""), Err(TaxmapError::Load { .. })));
    }

    #[test]
    fn test_unrecognized_header_is_load_error() {
        let content = "Foo,Bar\nBaz,Qux\n1,2\n";
        assert!(matches!(read(content), Err(TaxmapError::Load { .. })));
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_transactions(&dir.path().join("missing.csv")).err().unwrap();
        assert!(matches!(err, TaxmapError::Load { .. }));
        assert!(err.to_string().contains("missing.csv"));
    }

    #[test]
    fn test_load_latin1_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.csv");
        let mut bytes = b"Details,Posting Date,Description,Amount,Type,Balance,Check or Slip #\n".to_vec();
        bytes.extend_from_slice(b"DEBIT,01/15/2025,CAF\xc9 ROMA,-4.50,DEBIT_CARD,10.00,\n");
        std::fs::write(&path, bytes).unwrap();
        let result = load_transactions(&path).unwrap();
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].description, "CAF\u{c9} ROMA");
    }

    #[test]
    fn test_latin1_characters_stay_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.csv");
        let mut bytes = b"Details,Posting Date,Description,Amount,Type,Balance,Check or Slip #\n".to_vec();
        bytes.extend_from_slice(b"DEBIT,01/15/2025,JOS\xd1 TACOS,-9.00,DEBIT_CARD,10.00,\n");
        std::fs::write(&path, bytes).unwrap();
        let result = load_transactions(&path).unwrap();
        let description = &result.records[0].description;
        assert_eq!(description, "JOS\u{d1} TACOS");
        assert!(!description.contains("JOS\u{c9}"));
        assert!(!description.contains('\u{fffd}'));
    }

    #[test]
    fn test_headerless_bad_first_row_is_skipped() {
        let content = "\
DEBIT,01/15/2025,UBER TRIP 44,abc,ACH_DEBIT,980.00,
DEBIT,01/16/2025,AMAZON MKTP,-45.50,DEBIT_CARD,934.50,
CHECK,01/17/2025,CHECK 1043,-300.00,CHECK_PAID,634.50,1043
";
        let result = read(content).unwrap();
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.records[0].description, "AMAZON MKTP");
    }

    #[test]
    fn test_parse_check_number() {
        assert_eq!(parse_check_number("1043"), Some(1043));
        assert_eq!(parse_check_number("1043.0"), Some(1043));
        assert_eq!(parse_check_number(""), None);
        assert_eq!(parse_check_number("4294967297"), None);
        assert_eq!(parse_check_number("4294967297.0"), None);
    }

    #[test]
    fn test_list_checks_sorted() {
        let content = "\
Details,Posting Date,Description,Amount,Type,Balance,Check or Slip #
CHECK,01/17/2025,CHECK 1050,-300.00,CHECK_PAID,634.50,1050
DEBIT,01/15/2025,UBER,-20.00,ACH_DEBIT,980.00,
CHECK,01/18/2025,CHECK 1043,-30.00,CHECK_PAID,604.50,1043
";
        let result = read(content).unwrap();
        assert_eq!(list_checks(&result.records), vec![1043, 1050]);
    }
}
