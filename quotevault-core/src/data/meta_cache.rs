//! Metadata-tracked incremental cache.
//!
//! Wraps a [`ShardedFileStore`] and keeps, per security, a sidecar recording
//! the committed range: the interval for which every bar the remote could
//! supply is on disk with no internal gap. Coverage checks read only the
//! sidecar, so every save path below has to keep that promise.
//!
//! Layout: `{root}/{shard}/{id}.{data_ext}` and `{root}/{shard}/{id}.{meta_ext}`.

use super::file_store::{ShardedFileStore, WriteMode};
use super::meta::{read_sidecar, write_sidecar, CommittedRange};
use super::provider::{DataError, DataSource, FetchResult};
use crate::config::StoreConfig;
use crate::domain::{DescriptiveInfo, SecurityId, Timestamp};
use crate::series::Series;
use std::path::{Path, PathBuf};

/// What a save does to the data file, and the committed range afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavePlan {
    /// No sidecar yet: the new series becomes the whole file.
    Overwrite { start: Timestamp, end: Timestamp },
    /// New window starts strictly after the committed end.
    Append { start: Timestamp, end: Timestamp },
    /// Anything else: read back, merge, rewrite.
    Merge { start: Timestamp, end: Timestamp },
}

impl SavePlan {
    /// Committed range after the save.
    pub fn range(&self) -> (Timestamp, Timestamp) {
        match *self {
            SavePlan::Overwrite { start, end }
            | SavePlan::Append { start, end }
            | SavePlan::Merge { start, end } => (start, end),
        }
    }
}

/// Chooses how to persist a write of `[start, end]` given the current sidecar.
///
/// A new window that starts exactly at the committed end overlaps it and
/// merges.
pub fn plan_save(existing: Option<&CommittedRange>, start: Timestamp, end: Timestamp) -> SavePlan {
    match existing {
        None => SavePlan::Overwrite { start, end },
        Some(committed) if committed.end < start => SavePlan::Append {
            start: committed.start,
            end,
        },
        Some(committed) => SavePlan::Merge {
            start: committed.start.min(start),
            end: committed.end.max(end),
        },
    }
}

/// The committed-range cache.
#[derive(Debug, Clone)]
pub struct MetaCache {
    store: ShardedFileStore,
    meta_extension: String,
}

impl MetaCache {
    pub fn new(store: ShardedFileStore, meta_extension: impl Into<String>) -> Self {
        Self {
            store,
            meta_extension: meta_extension.into(),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(
            ShardedFileStore::new(&config.root, &config.data_extension),
            &config.meta_extension,
        )
    }

    pub fn root(&self) -> &Path {
        self.store.root()
    }

    pub fn store(&self) -> &ShardedFileStore {
        &self.store
    }

    pub fn sidecar_path(&self, id: &SecurityId) -> PathBuf {
        self.store.path_for(id, &self.meta_extension)
    }

    /// The committed range for `id`, if one has been recorded.
    pub fn committed_range(&self, id: &SecurityId) -> Result<Option<CommittedRange>, DataError> {
        read_sidecar(&self.sidecar_path(id))
    }

    fn info_for(&self, id: &SecurityId) -> Result<DescriptiveInfo, DataError> {
        Ok(self
            .committed_range(id)?
            .map(|range| range.info)
            .unwrap_or_default())
    }
}

impl DataSource for MetaCache {
    fn name(&self) -> &str {
        "meta_cache"
    }

    fn list_securities(&self) -> Result<Vec<SecurityId>, DataError> {
        self.store.list_securities()
    }

    fn has(&self, id: &SecurityId) -> bool {
        self.store.has(id)
    }

    fn get(&self, id: &SecurityId) -> Result<FetchResult, DataError> {
        let info = self.info_for(id)?;
        Ok(FetchResult::new(info, self.store.read_series(id)?))
    }

    /// Answered from the sidecar alone; the data file is never scanned.
    fn has_range(&self, id: &SecurityId, start: Timestamp, end: Timestamp) -> bool {
        match self.committed_range(id) {
            Ok(Some(range)) => range.covers(start, end),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(security = %id, "unreadable sidecar, treating as uncovered: {e}");
                false
            }
        }
    }

    fn get_range(
        &self,
        id: &SecurityId,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<FetchResult, DataError> {
        let info = self.info_for(id)?;
        Ok(FetchResult::new(info, self.store.read_range(id, start, end)?))
    }

    /// Persists `series` as covering `[start, end]` and widens the committed
    /// range. The data file is written before the sidecar, so a failure part
    /// way never leaves the sidecar claiming bars that are not on disk.
    fn save(
        &self,
        id: &SecurityId,
        start: Timestamp,
        end: Timestamp,
        info: &DescriptiveInfo,
        mut series: Series,
    ) -> Result<(), DataError> {
        if series.is_empty() {
            return Ok(());
        }
        series.sort_by_date();

        let existing = self.committed_range(id)?;
        let mut plan = plan_save(existing.as_ref(), start, end);

        // Appending bars at or before the committed end would break file order.
        if let (SavePlan::Append { .. }, Some(committed), Some(first)) =
            (plan, existing.as_ref(), series.first())
        {
            if first.trade_time <= committed.end {
                tracing::warn!(
                    security = %id,
                    "new bars precede committed end, merging instead of appending"
                );
                plan = SavePlan::Merge {
                    start: committed.start.min(start),
                    end: committed.end.max(end),
                };
            }
        }
        tracing::debug!(security = %id, ?plan, bars = series.len(), "saving series");

        match plan {
            SavePlan::Overwrite { .. } => {
                self.store.write_series(id, &series, WriteMode::Overwrite)?;
            }
            SavePlan::Append { .. } => {
                self.store.write_series(id, &series, WriteMode::Append)?;
            }
            SavePlan::Merge { .. } => {
                let mut stored = self.store.read_series(id)?;
                if !stored.is_sorted() {
                    tracing::warn!(security = %id, "stored series out of order, re-sorting");
                    stored.sort_by_date();
                }
                let merged = Series::merge(stored, series, true);
                self.store.write_series(id, &merged, WriteMode::Overwrite)?;
            }
        }

        let (start, end) = plan.range();
        let range = CommittedRange {
            id: id.clone(),
            info: info.clone(),
            start,
            end,
        };
        write_sidecar(&self.sidecar_path(id), &range)
    }

    /// Deletes both files. Only the data-file removal decides the outcome.
    fn remove(&self, id: &SecurityId) -> Result<(), DataError> {
        if let Err(e) = ShardedFileStore::remove_file(&self.sidecar_path(id)) {
            tracing::warn!(security = %id, "failed to remove sidecar: {e}");
        }
        self.store.remove(id)
    }
}
