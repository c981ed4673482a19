//! Storage, caching and retrieval

pub mod codec;
pub mod csv_source;
pub mod file_store;
pub mod meta;
pub mod meta_cache;
pub mod provider;
pub mod retriever;

pub use csv_source::CsvSource;
pub use file_store::{shard_of, ShardedFileStore, WriteMode};
pub use meta::CommittedRange;
pub use meta_cache::{plan_save, MetaCache, SavePlan};
pub use provider::{DataError, DataSource, FetchResult};
pub use retriever::{Origin, Retrieved, Retriever};
