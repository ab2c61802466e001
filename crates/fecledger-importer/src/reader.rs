//! Decoding FEC exports into rows.
//!
//! FEC files are delimited text with a header line. The standard allows tab or
//! pipe separators; exports seen in practice also use semicolons and commas.

use crate::ImportConfig;
use anyhow::{Context, Result};
use fecledger_core::Row;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Delimiters tried, in order, when none is configured.
const CANDIDATES: [u8; 4] = [b'\t', b'|', b';', b','];

/// Reads a FEC export into [`Row`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowReader {
    delimiter: Option<u8>,
}

impl RowReader {
    /// Create a reader that detects the delimiter from the header line.
    pub const fn new() -> Self {
        Self { delimiter: None }
    }

    /// Use a fixed delimiter.
    pub const fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Create a reader using the configured delimiter, if any.
    ///
    /// Non-ASCII delimiters cannot be handled by the CSV decoder and fall back
    /// to detection.
    pub fn from_config(config: &ImportConfig) -> Self {
        Self {
            delimiter: config
                .delimiter
                .filter(char::is_ascii)
                .map(|c| c as u8),
        }
    }

    /// Read a FEC export from a file.
    pub fn read_path(&self, path: &Path) -> Result<Vec<Row>> {
        let file =
            File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
        let mut reader = BufReader::new(file);
        let mut content = String::new();
        reader
            .read_to_string(&mut content)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        self.read_str(&content)
            .with_context(|| format!("Failed to decode FEC export: {}", path.display()))
    }

    /// Read a FEC export from string content.
    ///
    /// Values are trimmed. Short lines are padded with empty values, extra
    /// values beyond the header are dropped.
    pub fn read_str(&self, content: &str) -> Result<Vec<Row>> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let delimiter = self
            .delimiter
            .unwrap_or_else(|| detect_delimiter(content));

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .context("Failed to read header line")?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let record = result.with_context(|| format!("Row {index}: parse error"))?;
            if record.iter().all(|value| value.trim().is_empty()) {
                continue;
            }
            let row: Row = headers
                .iter()
                .enumerate()
                .map(|(i, header)| (header.as_str(), record.get(i).unwrap_or_default().trim()))
                .collect();
            rows.push(row);
        }
        Ok(rows)
    }
}

/// Guess the delimiter from the header line: the candidate occurring most
/// often wins, ties going to the earlier candidate. Defaults to tab.
pub fn detect_delimiter(content: &str) -> u8 {
    let header = content.lines().next().unwrap_or_default();
    let mut best = (b'\t', 0);
    for candidate in CANDIDATES {
        let count = header.bytes().filter(|&b| b == candidate).count();
        if count > best.1 {
            best = (candidate, count);
        }
    }
    best.0
}
