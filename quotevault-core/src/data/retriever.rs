//! Retrieval orchestrator: cache first, remote on a miss, then persist.
//!
//! 1. If the cache covers the window → serve it from the cache, no fallback.
//! 2. Otherwise fetch the remote's entire history for the security.
//! 3. Keep the in-window bars as the answer.
//! 4. Save the full history so the same gap is never asked for again. A failed
//!    save is logged, not returned.

use super::meta_cache::MetaCache;
use super::provider::{DataError, DataSource};
use crate::domain::{end_of_day, DescriptiveInfo, SecurityId, Timestamp};
use crate::series::Series;

/// Where a retrieved series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Cache,
    Remote,
}

/// Result of a retrieval, with provenance.
#[derive(Debug, Clone)]
pub struct Retrieved {
    pub info: DescriptiveInfo,
    pub series: Series,
    pub origin: Origin,
}

/// Composes the committed-range cache with a remote source.
pub struct Retriever<R> {
    cache: MetaCache,
    remote: R,
}

impl<R: DataSource> Retriever<R> {
    pub fn new(cache: MetaCache, remote: R) -> Self {
        Self { cache, remote }
    }

    pub fn cache(&self) -> &MetaCache {
        &self.cache
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Bars for `id` with `start <= trade_time <= end`.
    pub fn retrieve(
        &self,
        id: &SecurityId,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Series, DataError> {
        self.retrieve_detailed(id, start, end).map(|r| r.series)
    }

    /// Like [`Retriever::retrieve`], also returning info and origin.
    pub fn retrieve_detailed(
        &self,
        id: &SecurityId,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Retrieved, DataError> {
        if self.cache.has_range(id, start, end) {
            tracing::debug!(security = %id, %start, %end, "cache hit");
            let hit = self.cache.get_range(id, start, end)?;
            return Ok(Retrieved {
                info: hit.info,
                series: hit.series,
                origin: Origin::Cache,
            });
        }

        tracing::debug!(security = %id, %start, %end, remote = self.remote.name(), "cache miss");
        let fetched = self.remote.get(id)?;

        let mut window = Series::new();
        let mut actual: Option<(Timestamp, Timestamp)> = None;
        for bar in &fetched.series {
            let t = bar.trade_time;
            actual = Some(match actual {
                None => (t, t),
                Some((lo, hi)) => (lo.min(t), hi.max(t)),
            });
            if t >= start && t <= end {
                window.add(*bar);
            }
        }

        if let Some((actual_min, actual_max)) = actual {
            // Start at the requested start when the remote has nothing earlier,
            // so that empty stretch is not fetched again next time.
            let committed_start = start.min(actual_min);
            let committed_end = end_of_day(actual_max);
            if let Err(e) = self.cache.save(
                id,
                committed_start,
                committed_end,
                &fetched.info,
                fetched.series,
            ) {
                tracing::warn!(security = %id, "failed to persist fetched bars: {e}");
            }
        } else {
            tracing::debug!(security = %id, remote = self.remote.name(), "remote returned no bars");
        }

        Ok(Retrieved {
            info: fetched.info,
            series: window,
            origin: Origin::Remote,
        })
    }
}
