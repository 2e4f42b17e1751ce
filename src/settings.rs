use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, TaxmapError};

/// Default input and output locations, so routine runs only need the bank
/// export path. Lives in `~/.config/taxmap/settings.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub rules_file: Option<String>,
    pub lookup_file: Option<String>,
    pub checks_file: Option<String>,
    /// Unset means the current directory.
    pub output_dir: Option<String>,
}

impl Settings {
    pub fn path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("taxmap")
            .join("settings.json")
    }

    /// Missing file means defaults; an unreadable one is logged and ignored.
    pub fn load() -> Self {
        let path = Self::path();
        let Ok(content) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "ignoring unreadable settings");
            Self::default()
        })
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::path();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json =
            serde_json::to_string_pretty(self).map_err(|e| TaxmapError::Settings(e.to_string()))?;
        std::fs::write(&path, format!("{json}\n"))?;
        Ok(path)
    }

    /// Store every given path, expanded, leaving the others as they were.
    pub fn update(
        &mut self,
        rules: Option<String>,
        lookup: Option<String>,
        checks: Option<String>,
        output_dir: Option<String>,
    ) {
        let expand = |p: Option<String>| p.map(|p| shellexpand_path(&p));
        self.rules_file = expand(rules).or(self.rules_file.take());
        self.lookup_file = expand(lookup).or(self.lookup_file.take());
        self.checks_file = expand(checks).or(self.checks_file.take());
        self.output_dir = expand(output_dir).or(self.output_dir.take());
    }

    pub fn rules_path(&self, flag: Option<String>) -> Result<PathBuf> {
        resolve(flag, &self.rules_file).ok_or(TaxmapError::MissingInput("rules"))
    }

    pub fn lookup_path(&self, flag: Option<String>) -> Result<PathBuf> {
        resolve(flag, &self.lookup_file).ok_or(TaxmapError::MissingInput("lookup"))
    }

    pub fn checks_path(&self, flag: Option<String>) -> Option<PathBuf> {
        resolve(flag, &self.checks_file)
    }

    pub fn output_path(&self, flag: Option<String>) -> PathBuf {
        resolve(flag, &self.output_dir).unwrap_or_else(|| PathBuf::from("."))
    }
}

fn shellexpand_path(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{rest}", home.to_string_lossy());
        }
    }
    std::fs::canonicalize(path)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| path.to_string())
}

/// A path given on the command line wins over the configured one.
fn resolve(flag: Option<String>, configured: &Option<String>) -> Option<PathBuf> {
    flag.or_else(|| configured.clone())
        .map(|p| PathBuf::from(shellexpand_path(&p)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> Settings {
        Settings {
            rules_file: Some("/tmp/coa.csv".to_string()),
            lookup_file: Some("/tmp/keys.csv".to_string()),
            checks_file: None,
            output_dir: Some("/tmp/out".to_string()),
        }
    }

    #[test]
    fn test_json_roundtrip() {
        let json = serde_json::to_string_pretty(&configured()).unwrap();
        let loaded: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, configured());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let s: Settings = serde_json::from_str(r#"{"rules_file": "/tmp/coa.csv"}"#).unwrap();
        assert_eq!(s.rules_file.as_deref(), Some("/tmp/coa.csv"));
        assert!(s.lookup_file.is_none());
        assert_eq!(s.output_path(None), PathBuf::from("."));
    }

    #[test]
    fn test_flag_overrides_setting() {
        let s = configured();
        let path = s.rules_path(Some("/tmp/flag.csv".to_string())).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/flag.csv"));
        assert_eq!(s.lookup_path(None).unwrap(), PathBuf::from("/tmp/keys.csv"));
        assert!(s.checks_path(None).is_none());
    }

    #[test]
    fn test_missing_required_path() {
        let err = Settings::default().rules_path(None).unwrap_err();
        assert!(matches!(err, TaxmapError::MissingInput("rules")));
    }

    #[test]
    fn test_update_keeps_unset_fields() {
        let mut s = configured();
        s.update(None, Some("/tmp/other-keys.csv".to_string()), None, None);
        assert_eq!(s.rules_file.as_deref(), Some("/tmp/coa.csv"));
        assert_eq!(s.lookup_file.as_deref(), Some("/tmp/other-keys.csv"));
        assert_eq!(s.output_dir.as_deref(), Some("/tmp/out"));
    }
}
