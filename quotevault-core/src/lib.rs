//! quotevault core: bar series, sharded file store, committed-range cache and
//! retriever.
//!
//! This crate contains:
//! - Domain types (bars, security ids, descriptive info, timestamps)
//! - The `Series` container with merge, summarize and return computations
//! - Pairwise series alignment
//! - The `DataSource` capability shared by stores and remote providers
//! - A sharded flat-file store and the committed-range cache above it
//! - The retriever that serves from cache and falls back to a remote source
//!
//! Everything is synchronous and assumes one writer per security at a time;
//! callers that share a store across threads or processes must serialize
//! access per security themselves.

pub mod config;
pub mod data;
pub mod domain;
pub mod series;

pub use config::{ConfigError, StoreConfig};
pub use data::{
    CommittedRange, CsvSource, DataError, DataSource, FetchResult, MetaCache, Origin, Retrieved,
    Retriever, ShardedFileStore, WriteMode,
};
pub use domain::{Bar, DescriptiveInfo, SecurityId, Timestamp};
pub use series::{find_common, AlignError, Series};
