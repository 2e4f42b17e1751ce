use std::io::Read;
use std::path::Path;

use tracing::{info, warn};

use crate::error::{Result, TaxmapError};
use crate::importer::read_text;
use crate::models::{CategoryKey, CategoryLookup, CheckMap, Rule};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Integer key that may carry thousands separators ("1,010") or a float
/// suffix ("12.0").
pub fn parse_key(raw: &str) -> Option<i64> {
    let s = raw.replace([',', '"', ' '], "");
    let s = s.trim();
    s.parse::<i64>().ok().or_else(|| {
        s.parse::<f64>()
            .ok()
            .filter(|f| f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

fn column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name))
}

// ---------------------------------------------------------------------------
// Rule table
// ---------------------------------------------------------------------------

/// Ordered rules; the first rule whose substring occurs in a description wins.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn first_match(&self, description: &str) -> Option<&Rule> {
        if description.is_empty() {
            return None;
        }
        self.rules
            .iter()
            .find(|r| description.contains(r.match_substring.as_str()))
    }
}

pub fn load_rules(path: &Path) -> Result<RuleTable> {
    let text = read_text(path).map_err(|e| TaxmapError::rule_load(path, e))?;
    read_rules(text.as_bytes(), path)
}

pub fn read_rules<R: Read>(data: R, path: &Path) -> Result<RuleTable> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(data);
    let headers = rdr
        .headers()
        .map_err(|e| TaxmapError::rule_load(path, e))?
        .clone();
    let (Some(desc_idx), Some(key_idx)) =
        (column(&headers, "DESCRIPTION"), column(&headers, "EXPENSE"))
    else {
        return Err(TaxmapError::rule_load(
            path,
            "expected DESCRIPTION and EXPENSE columns",
        ));
    };

    let mut rules = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| TaxmapError::rule_load(path, e))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let description = record.get(desc_idx).unwrap_or("");
        let raw_key = record.get(key_idx).unwrap_or("").trim();
        if description.trim().is_empty() {
            if !raw_key.is_empty() {
                // An empty substring would match every transaction.
                warn!(line, "ignoring rule with empty DESCRIPTION");
            }
            continue;
        }
        let key = parse_key(raw_key).ok_or_else(|| {
            TaxmapError::rule_load(path, format!("line {line}: invalid EXPENSE key '{raw_key}'"))
        })?;
        rules.push(Rule {
            match_substring: description.to_string(),
            category_key: CategoryKey(key),
        });
    }
    info!(rules = rules.len(), path = %path.display(), "loaded rule table");
    Ok(RuleTable::new(rules))
}

pub fn write_rules(path: &Path, rules: &[Rule]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["DESCRIPTION", "EXPENSE"])?;
    for rule in rules {
        let key = rule.category_key.to_string();
        wtr.write_record([rule.match_substring.as_str(), key.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Order rules by key, then substring. Stable, so equal pairs keep file order.
pub fn sort_rules(rules: &mut [Rule]) {
    rules.sort_by(|a, b| {
        a.category_key
            .cmp(&b.category_key)
            .then_with(|| a.match_substring.cmp(&b.match_substring))
    });
}

// ---------------------------------------------------------------------------
// Shadowed rules
// ---------------------------------------------------------------------------

/// An earlier rule whose substring occurs inside a later one, so the later
/// rule can never match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguousRule {
    pub earlier_index: usize,
    pub earlier: Rule,
    pub later_index: usize,
    pub later: Rule,
}

impl AmbiguousRule {
    /// Both rules assign the same key, so nothing is lost.
    pub fn same_key(&self) -> bool {
        self.earlier.category_key == self.later.category_key
    }
}

/// Flag every pair (i, j), i < j, where rule i's substring occurs in rule
/// j's. O(n²); meant as an explicit pre-flight, not part of categorization.
pub fn find_ambiguous_rules(rules: &[Rule]) -> Vec<AmbiguousRule> {
    let mut found = Vec::new();
    for (i, earlier) in rules.iter().enumerate() {
        for (j, later) in rules.iter().enumerate().skip(i + 1) {
            if later.match_substring.contains(earlier.match_substring.as_str()) {
                warn!(
                    earlier = %earlier.match_substring,
                    later = %later.match_substring,
                    "rule is shadowed by an earlier, broader rule"
                );
                found.push(AmbiguousRule {
                    earlier_index: i,
                    earlier: earlier.clone(),
                    later_index: j,
                    later: later.clone(),
                });
            }
        }
    }
    found
}

// ---------------------------------------------------------------------------
// Category lookup & check map
// ---------------------------------------------------------------------------

pub fn load_lookup(path: &Path) -> Result<CategoryLookup> {
    let text = read_text(path).map_err(|e| TaxmapError::rule_load(path, e))?;
    read_lookup(text.as_bytes(), path)
}

pub fn read_lookup<R: Read>(data: R, path: &Path) -> Result<CategoryLookup> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(data);
    let headers = rdr
        .headers()
        .map_err(|e| TaxmapError::rule_load(path, e))?
        .clone();
    let (Some(key_idx), Some(name_idx)) = (column(&headers, "KEY"), column(&headers, "ACCOUNT"))
    else {
        return Err(TaxmapError::rule_load(path, "expected KEY and ACCOUNT columns"));
    };

    let mut entries: Vec<(CategoryKey, String)> = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| TaxmapError::rule_load(path, e))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let raw_key = record.get(key_idx).unwrap_or("").trim();
        if raw_key.is_empty() {
            continue;
        }
        let key = parse_key(raw_key).map(CategoryKey).ok_or_else(|| {
            TaxmapError::rule_load(path, format!("line {line}: invalid KEY '{raw_key}'"))
        })?;
        if entries.iter().any(|(k, _)| *k == key) {
            warn!(line, %key, "duplicate KEY in lookup; keeping the first");
            continue;
        }
        let name = record.get(name_idx).unwrap_or("").trim().to_string();
        entries.push((key, name));
    }
    info!(categories = entries.len(), path = %path.display(), "loaded category lookup");
    Ok(CategoryLookup::new(entries))
}

/// Two integer columns, no header: check number, category key.
pub fn load_check_map(path: &Path) -> Result<CheckMap> {
    let text = read_text(path).map_err(|e| TaxmapError::rule_load(path, e))?;
    read_check_map(text.as_bytes(), path)
}

pub fn read_check_map<R: Read>(data: R, path: &Path) -> Result<CheckMap> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);
    let mut checks = CheckMap::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| TaxmapError::rule_load(path, e))?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let number = record
            .get(0)
            .and_then(parse_key)
            .and_then(|n| u32::try_from(n).ok());
        let key = record.get(1).and_then(parse_key);
        match (number, key) {
            (Some(number), Some(key)) => {
                checks.insert(number, CategoryKey(key));
            }
            // Tolerate a header line.
            _ if idx == 0 => continue,
            _ => {
                return Err(TaxmapError::rule_load(
                    path,
                    format!("line {}: expected 'check number, key'", idx + 1),
                ));
            }
        }
    }
    info!(checks = checks.len(), path = %path.display(), "loaded check lookup");
    Ok(checks)
}
