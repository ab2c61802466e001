//! Configuration for FEC imports.

use anyhow::{Context, Result};
use fecledger_core::EntityKind;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Configuration for an import run.
///
/// Every field has a default, so a JSON file only needs the keys it changes:
///
/// ```
/// use fecledger_importer::ImportConfig;
///
/// let config = ImportConfig::from_json_str(r#"{ "journal_code_aliases": { "BANQUE1": "BQ1" } }"#).unwrap();
/// assert_eq!(config.rounding_tolerance, 1);
/// assert_eq!(config.journal_code_aliases["BANQUE1"], "BQ1");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Entity kinds to generate, in order.
    pub kinds: Vec<EntityKind>,
    /// Journal codes that are retried under another code when unknown.
    pub journal_code_aliases: HashMap<String, String>,
    /// Largest per-move residual repaired in place, in minor currency units.
    pub rounding_tolerance: u32,
    /// Journal type inference thresholds.
    pub classifier: ClassifierConfig,
    /// Number of records between two progress log events.
    pub progress_interval: usize,
    /// Field delimiter of the export. Detected from the header when unset.
    pub delimiter: Option<char>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            kinds: vec![EntityKind::Partner, EntityKind::Move],
            journal_code_aliases: HashMap::new(),
            rounding_tolerance: 1,
            classifier: ClassifierConfig::default(),
            progress_interval: 100,
            delimiter: None,
        }
    }
}

/// Thresholds of the journal type heuristic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Minimum share of single-counterpart moves.
    pub ratio: Decimal,
    /// Minimum number of moves in the journal.
    pub min_moves: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            ratio: Decimal::new(7, 1),
            min_moves: 3,
        }
    }
}

impl ImportConfig {
    /// Start from the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON.
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse import configuration")
    }

    /// Load a configuration from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_json_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Set the entity kinds to generate.
    pub fn kinds(mut self, kinds: impl IntoIterator<Item = EntityKind>) -> Self {
        self.kinds = kinds.into_iter().collect();
        self
    }

    /// Add a journal code alias.
    pub fn journal_alias(mut self, code: impl Into<String>, target: impl Into<String>) -> Self {
        self.journal_code_aliases.insert(code.into(), target.into());
        self
    }

    /// Set the rounding tolerance, in minor units.
    pub const fn rounding_tolerance(mut self, units: u32) -> Self {
        self.rounding_tolerance = units;
        self
    }

    /// Set the classifier thresholds.
    pub const fn classifier(mut self, ratio: Decimal, min_moves: usize) -> Self {
        self.classifier = ClassifierConfig { ratio, min_moves };
        self
    }

    /// Set the progress log interval.
    pub const fn progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Set the field delimiter.
    pub const fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = Some(delimiter);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ImportConfig::default();
        assert_eq!(config.kinds, vec![EntityKind::Partner, EntityKind::Move]);
        assert_eq!(config.rounding_tolerance, 1);
        assert_eq!(config.classifier.ratio, dec!(0.7));
        assert_eq!(config.classifier.min_moves, 3);
        assert_eq!(config.progress_interval, 100);
        assert!(config.delimiter.is_none());
    }

    #[test]
    fn test_builder() {
        let config = ImportConfig::new()
            .kinds([EntityKind::Move])
            .journal_alias("BANQUE", "BQ")
            .rounding_tolerance(3)
            .classifier(dec!(0.5), 10)
            .delimiter('|');
        assert_eq!(config.kinds, vec![EntityKind::Move]);
        assert_eq!(config.journal_code_aliases["BANQUE"], "BQ");
        assert_eq!(config.rounding_tolerance, 3);
        assert_eq!(config.classifier.min_moves, 10);
        assert_eq!(config.delimiter, Some('|'));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            ImportConfig::from_json_str(r#"{"kinds": ["move"], "classifier": {"min_moves": 5}}"#)
                .unwrap();
        assert_eq!(config.kinds, vec![EntityKind::Move]);
        assert_eq!(config.classifier.min_moves, 5);
        assert_eq!(config.classifier.ratio, dec!(0.7));
        assert_eq!(config.rounding_tolerance, 1);
    }

    #[test]
    fn test_invalid_json() {
        assert!(ImportConfig::from_json_str("{ not json").is_err());
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"rounding_tolerance": 2, "delimiter": "\t"}}"#).unwrap();

        let config = ImportConfig::from_path(file.path()).unwrap();
        assert_eq!(config.rounding_tolerance, 2);
        assert_eq!(config.delimiter, Some('\t'));
    }

    #[test]
    fn test_from_missing_path() {
        let err = ImportConfig::from_path(Path::new("/nonexistent/fec.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
