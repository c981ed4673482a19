//! Sharded flat-file store.
//!
//! Layout: `{root}/{shard}/{id}.{ext}` where `shard` is the first letter of the
//! normalized id. Ids starting with anything other than `a`–`z` share the `_`
//! shard. There is no index: every read scans the whole file.

use super::codec::{read_bars, write_bars};
use super::provider::{DataError, DataSource, FetchResult};
use crate::domain::{DescriptiveInfo, SecurityId, Timestamp};
use crate::series::Series;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};

/// Shard directory names, in scan order.
const SHARDS: &str = "abcdefghijklmnopqrstuvwxyz_";

/// How [`ShardedFileStore::write_series`] treats an existing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Add records after the existing ones.
    Append,
    /// Replace the file with exactly the given records.
    Overwrite,
}

/// Shard directory name for `id`.
pub fn shard_of(id: &SecurityId) -> String {
    let c = id.shard();
    if c.is_ascii_lowercase() {
        c.to_string()
    } else {
        "_".to_string()
    }
}

/// The flat-file store.
#[derive(Debug, Clone)]
pub struct ShardedFileStore {
    root: PathBuf,
    extension: String,
}

impl ShardedFileStore {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// `{root}/{shard}`
    pub fn shard_dir(&self, id: &SecurityId) -> PathBuf {
        self.root.join(shard_of(id))
    }

    /// `{root}/{shard}/{id}.{extension}` for an arbitrary extension.
    pub fn path_for(&self, id: &SecurityId, extension: &str) -> PathBuf {
        self.shard_dir(id).join(format!("{id}.{extension}"))
    }

    /// Path of the data file for `id`.
    pub fn data_file(&self, id: &SecurityId) -> PathBuf {
        self.path_for(id, &self.extension)
    }

    /// Creates the shard directory for `id` if needed.
    pub fn ensure_shard_dir(&self, id: &SecurityId) -> Result<PathBuf, DataError> {
        let dir = self.shard_dir(id);
        match fs::metadata(&dir) {
            Ok(meta) if meta.is_dir() => Ok(dir),
            Ok(_) => Err(DataError::NotADirectory(dir)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fs::create_dir_all(&dir).map_err(|e| DataError::io(&dir, e))?;
                Ok(dir)
            }
            Err(e) => Err(DataError::io(&dir, e)),
        }
    }

    /// Writes `series` for `id`, appending or replacing per `mode`.
    ///
    /// Bars are written in the order given. Overwrites go through a temporary
    /// file renamed into place.
    pub fn write_series(
        &self,
        id: &SecurityId,
        series: &Series,
        mode: WriteMode,
    ) -> Result<(), DataError> {
        self.ensure_shard_dir(id)?;
        let path = self.data_file(id);

        match mode {
            WriteMode::Append => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .map_err(|e| DataError::io(&path, e))?;
                write_bars(BufWriter::new(file), series, &path)
            }
            WriteMode::Overwrite => {
                let tmp_path = path.with_extension(format!("{}.tmp", self.extension));
                let file = File::create(&tmp_path).map_err(|e| DataError::io(&tmp_path, e))?;
                if let Err(e) = write_bars(BufWriter::new(file), series, &tmp_path) {
                    let _ = fs::remove_file(&tmp_path);
                    return Err(e);
                }
                fs::rename(&tmp_path, &path).map_err(|e| {
                    let _ = fs::remove_file(&tmp_path);
                    DataError::io(&path, e)
                })
            }
        }
    }

    /// Streams the data file, keeping bars `keep` accepts. Missing file -> empty.
    fn read_filtered<F>(&self, id: &SecurityId, keep: F) -> Result<Series, DataError>
    where
        F: FnMut(&crate::domain::Bar) -> bool,
    {
        let path = self.data_file(id);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Series::new()),
            Err(e) => return Err(DataError::io(&path, e)),
        };
        read_bars(BufReader::new(file), &path, keep)
    }

    /// Reads the stored series for `id` without descriptive info.
    pub fn read_series(&self, id: &SecurityId) -> Result<Series, DataError> {
        self.read_filtered(id, |_| true)
    }

    /// Reads bars in `[start, end]` for `id`.
    pub fn read_range(
        &self,
        id: &SecurityId,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Series, DataError> {
        self.read_filtered(id, |bar| bar.trade_time >= start && bar.trade_time <= end)
    }

    /// Deletes the file at `path`; absence is success.
    pub(crate) fn remove_file(path: &Path) -> Result<(), DataError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DataError::io(path, e)),
        }
    }
}

impl DataSource for ShardedFileStore {
    fn name(&self) -> &str {
        "file_store"
    }

    fn list_securities(&self) -> Result<Vec<SecurityId>, DataError> {
        let mut ids = Vec::new();

        for shard in SHARDS.chars() {
            let dir = self.root.join(shard.to_string());
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(DataError::io(&dir, e)),
            };

            for entry in entries {
                let path = entry.map_err(|e| DataError::io(&dir, e))?.path();
                let matches_ext =
                    path.extension().and_then(|e| e.to_str()) == Some(self.extension.as_str());
                if path.is_dir() || !matches_ext {
                    continue;
                }
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                match SecurityId::new(stem) {
                    Ok(id) => ids.push(id),
                    Err(e) => tracing::debug!(path = %path.display(), "skipping file: {e}"),
                }
            }
        }

        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    fn has(&self, id: &SecurityId) -> bool {
        fs::metadata(self.data_file(id)).is_ok_and(|meta| !meta.is_dir())
    }

    fn get(&self, id: &SecurityId) -> Result<FetchResult, DataError> {
        Ok(FetchResult::new(
            DescriptiveInfo::default(),
            self.read_series(id)?,
        ))
    }

    /// Without a sidecar this scans the file and compares its first and last
    /// timestamps with the request.
    fn has_range(&self, id: &SecurityId, start: Timestamp, end: Timestamp) -> bool {
        match self.read_series(id) {
            Ok(series) => series
                .span()
                .is_some_and(|(lo, hi)| lo <= start && hi >= end),
            Err(e) => {
                tracing::warn!(security = %id, "coverage scan failed: {e}");
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
        Ok(FetchResult::new(
            DescriptiveInfo::default(),
            self.read_range(id, start, end)?,
        ))
    }

    /// Replaces the file with `series`, sorted. Range and info are not stored.
    fn save(
        &self,
        id: &SecurityId,
        _start: Timestamp,
        _end: Timestamp,
        _info: &DescriptiveInfo,
        mut series: Series,
    ) -> Result<(), DataError> {
        series.sort_by_date();
        self.write_series(id, &series, WriteMode::Overwrite)
    }

    fn remove(&self, id: &SecurityId) -> Result<(), DataError> {
        Self::remove_file(&self.data_file(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parse_timestamp;
    use crate::series::test_support::bar;

    fn id(s: &str) -> SecurityId {
        SecurityId::new(s).unwrap()
    }

    fn ts(s: &str) -> Timestamp {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn shard_routing() {
        assert_eq!(shard_of(&id("NYSE")), "n");
        assert_eq!(shard_of(&id("amd")), "a");
        assert_eq!(shard_of(&id("^gspc")), "_");

        let store = ShardedFileStore::new("/data", "dat");
        assert_eq!(store.data_file(&id("intl")), PathBuf::from("/data/i/intl.dat"));
        assert_eq!(store.data_file(&id("INTL")), PathBuf::from("/data/i/intl.dat"));
    }

    #[test]
    fn overwrite_then_append() {
        let dir = tempfile::tempdir().unwrap();
        let store = ShardedFileStore::new(dir.path(), "dat");
        let spy = id("spy");

        let first: Series = vec![bar("2002-01-01", 1.0), bar("2002-01-02", 2.0)].into();
        store.write_series(&spy, &first, WriteMode::Overwrite).unwrap();
        let more: Series = vec![bar("2002-01-03", 3.0)].into();
        store.write_series(&spy, &more, WriteMode::Append).unwrap();

        assert_eq!(store.read_series(&spy).unwrap().len(), 3);

        store.write_series(&spy, &more, WriteMode::Overwrite).unwrap();
        assert_eq!(store.read_series(&spy).unwrap(), more);
        assert!(!store.data_file(&spy).with_extension("dat.tmp").exists());
    }

    #[test]
    fn missing_security_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ShardedFileStore::new(dir.path(), "dat");

        assert!(!store.has(&id("none")));
        assert!(store.get(&id("none")).unwrap().series.is_empty());
        assert!(store
            .get_range(&id("none"), ts("2002-01-01"), ts("2002-12-31"))
            .unwrap()
            .series
            .is_empty());
    }

    #[test]
    fn get_range_filters_inclusively() {
        let dir = tempfile::tempdir().unwrap();
        let store = ShardedFileStore::new(dir.path(), "dat");
        let spy = id("spy");
        let s: Series = vec![
            bar("2002-01-01", 1.0),
            bar("2002-01-02", 2.0),
            bar("2002-01-03", 3.0),
            bar("2002-01-04", 4.0),
        ]
        .into();
        store.write_series(&spy, &s, WriteMode::Overwrite).unwrap();

        let got = store
            .get_range(&spy, ts("2002-01-02"), ts("2002-01-03"))
            .unwrap()
            .series;
        let closes: Vec<f64> = got.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![2.0, 3.0]);

        assert!(store.has_range(&spy, ts("2002-01-01"), ts("2002-01-04")));
        assert!(!store.has_range(&spy, ts("2001-12-31"), ts("2002-01-04")));
    }

    #[test]
    fn list_skips_foreign_files_and_absent_shards() {
        let dir = tempfile::tempdir().unwrap();
        let store = ShardedFileStore::new(dir.path(), "dat");
        let s: Series = vec![bar("2002-01-01", 1.0)].into();

        store.write_series(&id("AMD"), &s, WriteMode::Overwrite).unwrap();
        store.write_series(&id("intl"), &s, WriteMode::Overwrite).unwrap();
        store.write_series(&id("ibm"), &s, WriteMode::Overwrite).unwrap();
        fs::write(dir.path().join("i").join("notes.txt"), "x").unwrap();

        let listed = store.list_securities().unwrap();
        assert_eq!(listed, vec![id("amd"), id("ibm"), id("intl")]);
    }

    #[test]
    fn shard_path_occupied_by_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("s"), "not a dir").unwrap();
        let store = ShardedFileStore::new(dir.path(), "dat");

        let err = store
            .write_series(&id("spy"), &Series::new(), WriteMode::Overwrite)
            .unwrap_err();
        assert!(matches!(err, DataError::NotADirectory(_)));
    }

    #[test]
    fn directory_named_like_data_file_is_not_a_security() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("s").join("spy.dat")).unwrap();
        let store = ShardedFileStore::new(dir.path(), "dat");
        assert!(!store.has(&id("spy")));
    }

    #[test]
    fn remove_is_best_effort() {
        let dir = tempfile::tempdir().unwrap();
        let store = ShardedFileStore::new(dir.path(), "dat");
        let spy = id("spy");

        store.remove(&spy).unwrap();
        store
            .write_series(&spy, &vec![bar("2002-01-01", 1.0)].into(), WriteMode::Overwrite)
            .unwrap();
        assert!(store.has(&spy));
        store.remove(&spy).unwrap();
        assert!(!store.has(&spy));
    }

    #[test]
    fn save_sorts_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ShardedFileStore::new(dir.path(), "dat");
        let spy = id("spy");
        let unsorted: Series = vec![bar("2002-01-02", 2.0), bar("2002-01-01", 1.0)].into();

        store
            .save(
                &spy,
                ts("2002-01-01"),
                ts("2002-01-02"),
                &DescriptiveInfo::default(),
                unsorted,
            )
            .unwrap();
        assert!(store.read_series(&spy).unwrap().is_sorted());
    }
}
