//! Data source capability and structured error types.
//!
//! Every store in this crate, and the remote provider it falls back to,
//! implements [`DataSource`]. Absence of a security is never an error: it comes
//! back as an empty series or `false`.

use crate::domain::{DescriptiveInfo, InvalidSecurityId, SecurityId, Timestamp};
use crate::series::Series;
use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for data operations.
///
/// Not-found is deliberately absent: callers distinguish "no data" (empty
/// result) from "broken data" (`Malformed*`) from "broken I/O" (`Io`).
#[derive(Debug, Error)]
pub enum DataError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed record in {} at line {line}: {reason}", .path.display())]
    MalformedRecord {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("malformed metadata in {}: {reason}", .path.display())]
    MalformedMetadata { path: PathBuf, reason: String },

    #[error("{} exists and is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error(transparent)]
    InvalidId(#[from] InvalidSecurityId),

    #[error("{source_name} does not support {operation}")]
    Unsupported {
        source_name: String,
        operation: &'static str,
    },

    #[error("remote source failed: {0}")]
    Remote(String),
}

impl DataError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DataError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A series together with the descriptive info stored beside it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchResult {
    pub info: DescriptiveInfo,
    pub series: Series,
}

impl FetchResult {
    pub fn new(info: DescriptiveInfo, series: Series) -> Self {
        Self { info, series }
    }
}

/// Read/write contract shared by the file store, the cache and remote providers.
///
/// Write operations default to [`DataError::Unsupported`] so read-only sources
/// only implement the read half.
pub trait DataSource {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    fn list_securities(&self) -> Result<Vec<SecurityId>, DataError>;

    fn has(&self, id: &SecurityId) -> bool;

    /// Everything available for `id`. Unknown ids yield an empty series.
    fn get(&self, id: &SecurityId) -> Result<FetchResult, DataError>;

    /// Whether `[start, end]` can be answered in full from this source.
    fn has_range(&self, id: &SecurityId, start: Timestamp, end: Timestamp) -> bool;

    /// Bars with `start <= trade_time <= end`.
    fn get_range(
        &self,
        id: &SecurityId,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<FetchResult, DataError>;

    fn save(
        &self,
        _id: &SecurityId,
        _start: Timestamp,
        _end: Timestamp,
        _info: &DescriptiveInfo,
        _series: Series,
    ) -> Result<(), DataError> {
        Err(DataError::Unsupported {
            source_name: self.name().to_string(),
            operation: "save",
        })
    }

    fn remove(&self, _id: &SecurityId) -> Result<(), DataError> {
        Err(DataError::Unsupported {
            source_name: self.name().to_string(),
            operation: "remove",
        })
    }
}
