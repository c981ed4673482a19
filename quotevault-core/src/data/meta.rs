//! Committed-range sidecar files.
//!
//! A sidecar is a short text file of `Key value` lines:
//!
//! ```text
//! Symbol intl
//! Start 2002-01-01T00:00:00
//! End 2002-01-31T23:59:59
//! Name Intel Corp
//! ```
//!
//! `Symbol`, `Start` and `End` are required. Descriptive keys are optional and
//! unknown keys are carried through untouched.

use super::provider::DataError;
use crate::domain::{
    format_timestamp, parse_timestamp, DescriptiveInfo, SecurityId, Timestamp,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Keys with a fixed meaning. `DescriptiveInfo::extra` may not shadow them.
const RESERVED_KEYS: [&str; 11] = [
    "Symbol",
    "Start",
    "End",
    "Name",
    "Category",
    "Family",
    "ExpenseRatio",
    "FrontLoad",
    "DeferredLoad",
    "MinInvestment",
    "Inception",
];

fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.iter().any(|r| r.eq_ignore_ascii_case(key))
}

/// The interval the cache asserts it has stored in full for one security.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommittedRange {
    pub id: SecurityId,
    pub info: DescriptiveInfo,
    pub start: Timestamp,
    pub end: Timestamp,
}

impl CommittedRange {
    /// True if `[start, end]` lies inside the committed interval.
    pub fn covers(&self, start: Timestamp, end: Timestamp) -> bool {
        self.start <= start && self.end >= end
    }

    /// Renders the sidecar text.
    pub fn to_sidecar(&self) -> String {
        let mut out = String::new();
        let mut line = |key: &str, value: &str| {
            let value = value.replace(['\n', '\r'], " ");
            let _ = writeln!(out, "{key} {value}");
        };

        line("Symbol", self.id.as_str());
        line("Start", &format_timestamp(&self.start));
        line("End", &format_timestamp(&self.end));

        let info = &self.info;
        if let Some(v) = &info.name {
            line("Name", v);
        }
        if let Some(v) = &info.category {
            line("Category", v);
        }
        if let Some(v) = &info.family {
            line("Family", v);
        }
        if let Some(v) = info.expense_ratio {
            line("ExpenseRatio", &v.to_string());
        }
        if let Some(v) = info.front_load {
            line("FrontLoad", &v.to_string());
        }
        if let Some(v) = info.deferred_load {
            line("DeferredLoad", &v.to_string());
        }
        if let Some(v) = info.min_investment {
            line("MinInvestment", &v.to_string());
        }
        if let Some(v) = info.inception {
            line("Inception", &v.format("%Y-%m-%d").to_string());
        }
        for (key, value) in &info.extra {
            if key.is_empty() || key.contains(char::is_whitespace) || is_reserved(key) {
                continue;
            }
            line(key, value);
        }
        out
    }

    /// Parses sidecar text. `path` only labels errors.
    pub fn parse_sidecar(text: &str, path: &Path) -> Result<Self, DataError> {
        let malformed = |reason: String| DataError::MalformedMetadata {
            path: path.to_path_buf(),
            reason,
        };

        let mut fields: BTreeMap<&str, &str> = BTreeMap::new();
        for raw in text.lines() {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let (key, value) = raw
                .split_once(char::is_whitespace)
                .map_or((raw, ""), |(k, v)| (k, v.trim()));
            if fields.insert(key, value).is_some() {
                return Err(malformed(format!("duplicate key '{key}'")));
            }
        }

        let mut required = |key: &str| {
            fields
                .remove(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| malformed(format!("missing required key '{key}'")))
        };
        let symbol = required("Symbol")?;
        let start = required("Start")?;
        let end = required("End")?;

        let id = SecurityId::new(symbol).map_err(|e| malformed(e.to_string()))?;
        let timestamp = |key: &str, value: &str| {
            parse_timestamp(value).map_err(|e| malformed(format!("bad {key} '{value}': {e}")))
        };
        let start = timestamp("Start", start)?;
        let end = timestamp("End", end)?;

        let number = |key: &str, value: &str| {
            value
                .parse::<f64>()
                .map_err(|e| malformed(format!("bad {key} '{value}': {e}")))
        };

        let mut info = DescriptiveInfo::default();
        for (key, value) in fields {
            match key {
                "Name" => info.name = Some(value.to_string()),
                "Category" => info.category = Some(value.to_string()),
                "Family" => info.family = Some(value.to_string()),
                "ExpenseRatio" => info.expense_ratio = Some(number(key, value)?),
                "FrontLoad" => info.front_load = Some(number(key, value)?),
                "DeferredLoad" => info.deferred_load = Some(number(key, value)?),
                "MinInvestment" => info.min_investment = Some(number(key, value)?),
                "Inception" => {
                    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
                        .map_err(|e| malformed(format!("bad Inception '{value}': {e}")))?;
                    info.inception = Some(date);
                }
                other => {
                    info.extra.insert(other.to_string(), value.to_string());
                }
            }
        }

        Ok(Self {
            id,
            info,
            start,
            end,
        })
    }
}

/// Reads the sidecar at `path`. A missing file is `Ok(None)`.
pub fn read_sidecar(path: &Path) -> Result<Option<CommittedRange>, DataError> {
    match fs::read_to_string(path) {
        Ok(text) => CommittedRange::parse_sidecar(&text, path).map(Some),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(DataError::io(path, e)),
    }
}

/// `{file}.{ext}.tmp` beside `path`.
fn tmp_path_for(path: &Path) -> PathBuf {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => path.with_extension(format!("{ext}.tmp")),
        None => path.with_extension("tmp"),
    }
}

/// Replaces the sidecar at `path` (write to `.tmp`, rename into place).
pub fn write_sidecar(path: &Path, range: &CommittedRange) -> Result<(), DataError> {
    let tmp_path = tmp_path_for(path);
    fs::write(&tmp_path, range.to_sidecar()).map_err(|e| DataError::io(&tmp_path, e))?;
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        DataError::io(path, e)
    })
}
