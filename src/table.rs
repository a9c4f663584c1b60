//! Raw tabular source read from CSV
//!
//! Every cell is kept as trimmed text; typing happens later in `models`.
//! The delimiter is sniffed: comma, semicolon and tab are tried in order and
//! the first one producing a wide enough header wins.

use crate::config::resolved;
use crate::error::{O2cError, Result};
use csv::{ReaderBuilder, Trim};
use std::path::{Path, PathBuf};
use tracing::debug;

const DELIMITERS: [u8; 3] = [b',', b';', b'\t'];

/// Cell spellings read as missing, in addition to the empty string
const NA_TOKENS: [&str; 14] = [
    "#N/A", "#NA", "N/A", "n/a", "NA", "<NA>", "NULL", "null", "NaN", "nan", "-NaN", "-nan",
    "None", "#N/A N/A",
];

#[derive(Debug, Clone)]
pub struct RawTable {
    pub source: PathBuf,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    /// Read a whole CSV file. The header must have more than `min_columns`
    /// columns under one of the attempted delimiters.
    pub fn read(path: &Path, min_columns: usize) -> Result<Self> {
        if !path.exists() {
            return Err(O2cError::InputMissing {
                path: resolved(path),
            });
        }
        let bytes = std::fs::read(path)?;
        Self::parse_bytes(&bytes, min_columns, path)
    }

    pub fn parse_bytes(bytes: &[u8], min_columns: usize, source: &Path) -> Result<Self> {
        for delimiter in DELIMITERS {
            match Self::parse_with(bytes, delimiter, source) {
                Ok(table) if table.headers.len() > min_columns => {
                    debug!(
                        "Read {} rows x {} columns from {:?} (delimiter {:?})",
                        table.rows.len(),
                        table.headers.len(),
                        source,
                        delimiter as char
                    );
                    return Ok(table);
                }
                Ok(_) => {}
                Err(e) => debug!("Delimiter {:?} rejected: {}", delimiter as char, e),
            }
        }

        Err(O2cError::InputMalformed {
            path: resolved(source),
            reason: format!(
                "no delimiter among ',', ';', tab yields more than {} columns",
                min_columns
            ),
        })
    }

    fn parse_with(bytes: &[u8], delimiter: u8, source: &Path) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| clean_text(h).to_string())
            .collect();

        let width = headers.len();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut row: Vec<Option<String>> = record.iter().take(width).map(clean_cell).collect();
            row.resize(width, None);
            rows.push(row);
        }

        Ok(Self {
            source: source.to_path_buf(),
            headers,
            rows,
        })
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name).ok_or_else(|| O2cError::MissingColumn {
            path: resolved(&self.source),
            column: name.to_string(),
        })
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .and_then(|c| c.as_deref())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn clean_text(raw: &str) -> &str {
    raw.trim().trim_matches('"').trim()
}

fn clean_cell(raw: &str) -> Option<String> {
    let s = clean_text(raw);
    if s.is_empty() || NA_TOKENS.contains(&s) {
        None
    } else {
        Some(s.to_string())
    }
}
