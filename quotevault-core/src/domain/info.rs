//! Static per-security metadata carried alongside a series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Descriptive metadata for a security.
///
/// The storage layer reads and writes this verbatim and never interprets it.
/// Keys it does not recognise are kept in `extra` so they survive a rewrite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveInfo {
    pub name: Option<String>,
    pub category: Option<String>,
    pub family: Option<String>,
    pub expense_ratio: Option<f64>,
    pub front_load: Option<f64>,
    pub deferred_load: Option<f64>,
    pub min_investment: Option<f64>,
    pub inception: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl DescriptiveInfo {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
