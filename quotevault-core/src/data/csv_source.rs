//! Read-only source over a directory of CSV exports.
//!
//! Expects one `<SYMBOL>.csv` per security with the usual download header
//! `Date,Open,High,Low,Close,Adj Close,Volume`. An optional `<SYMBOL>.toml`
//! next to it supplies [`DescriptiveInfo`]. File names match ids
//! case-insensitively.
//!
//! Rows whose prices are empty or `null` (non-trading days in most exports)
//! are skipped; any other unparsable row is an error.

use super::provider::{DataError, DataSource, FetchResult};
use crate::domain::{parse_timestamp, Bar, DescriptiveInfo, SecurityId, Timestamp};
use crate::series::Series;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Open")]
    open: String,
    #[serde(rename = "High")]
    high: String,
    #[serde(rename = "Low")]
    low: String,
    #[serde(rename = "Close")]
    close: String,
    #[serde(rename = "Adj Close")]
    adj_close: String,
    #[serde(rename = "Volume")]
    volume: String,
}

impl CsvRow {
    fn is_blank(&self) -> bool {
        [&self.open, &self.high, &self.low, &self.close]
            .iter()
            .all(|v| v.is_empty() || v.eq_ignore_ascii_case("null"))
    }

    fn to_bar(&self) -> Result<Bar, String> {
        let number = |name: &str, raw: &str| -> Result<f64, String> {
            raw.parse::<f64>()
                .map_err(|e| format!("bad {name} '{raw}': {e}"))
        };
        let close = number("Close", &self.close)?;
        let adjusted_close = if self.adj_close.is_empty() {
            close
        } else {
            number("Adj Close", &self.adj_close)?
        };
        let volume = if self.volume.is_empty() {
            0.0
        } else {
            number("Volume", &self.volume)?
        };

        Ok(Bar {
            trade_time: parse_timestamp(&self.date)
                .map_err(|e| format!("bad Date '{}': {e}", self.date))?,
            open: number("Open", &self.open)?,
            close,
            min: number("Low", &self.low)?,
            max: number("High", &self.high)?,
            volume,
            adjusted_close,
        })
    }
}

/// A directory of CSV exports acting as a remote source.
#[derive(Debug, Clone)]
pub struct CsvSource {
    dir: PathBuf,
}

impl CsvSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Finds `<id>.csv` ignoring case.
    fn locate(&self, id: &SecurityId) -> Result<Option<PathBuf>, DataError> {
        Ok(self
            .csv_files()?
            .into_iter()
            .find_map(|(found, path)| (found == *id).then_some(path)))
    }

    fn csv_files(&self) -> Result<Vec<(SecurityId, PathBuf)>, DataError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(DataError::io(&self.dir, e)),
        };

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| DataError::io(&self.dir, e))?.path();
            let is_csv = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
            if !is_csv || !path.is_file() {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| SecurityId::new(s).ok())
            {
                files.push((id, path));
            }
        }
        files.sort();
        Ok(files)
    }

    fn read_info(csv_path: &Path) -> Result<DescriptiveInfo, DataError> {
        let info_path = csv_path.with_extension("toml");
        match fs::read_to_string(&info_path) {
            Ok(text) => toml::from_str(&text).map_err(|e| DataError::MalformedMetadata {
                path: info_path,
                reason: e.to_string(),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(DescriptiveInfo::default()),
            Err(e) => Err(DataError::io(&info_path, e)),
        }
    }

    fn read_csv(path: &Path) -> Result<Series, DataError> {
        let malformed = |line: u64, reason: String| DataError::MalformedRecord {
            path: path.to_path_buf(),
            line,
            reason,
        };

        let file = fs::File::open(path).map_err(|e| DataError::io(path, e))?;
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(std::io::BufReader::new(file));
        let headers = reader
            .headers()
            .map_err(|e| malformed(1, e.to_string()))?
            .clone();

        let mut series = Series::new();
        let mut record = csv::StringRecord::new();
        loop {
            match reader.read_record(&mut record) {
                Ok(false) => break,
                Ok(true) => {}
                Err(e) => {
                    let line = e.position().map_or(0, |p| p.line());
                    return Err(malformed(line, e.to_string()));
                }
            }
            let line = record.position().map_or(0, |p| p.line());
            let row: CsvRow = record
                .deserialize(Some(&headers))
                .map_err(|e| malformed(line, e.to_string()))?;
            if row.is_blank() {
                continue;
            }
            series.add(row.to_bar().map_err(|reason| malformed(line, reason))?);
        }
        series.sort_by_date();
        Ok(series)
    }
}

impl DataSource for CsvSource {
    fn name(&self) -> &str {
        "csv_import"
    }

    fn list_securities(&self) -> Result<Vec<SecurityId>, DataError> {
        let mut ids: Vec<SecurityId> = self.csv_files()?.into_iter().map(|(id, _)| id).collect();
        ids.dedup();
        Ok(ids)
    }

    fn has(&self, id: &SecurityId) -> bool {
        matches!(self.locate(id), Ok(Some(_)))
    }

    fn get(&self, id: &SecurityId) -> Result<FetchResult, DataError> {
        match self.locate(id)? {
            Some(path) => Ok(FetchResult::new(
                Self::read_info(&path)?,
                Self::read_csv(&path)?,
            )),
            None => Ok(FetchResult::default()),
        }
    }

    fn has_range(&self, id: &SecurityId, start: Timestamp, end: Timestamp) -> bool {
        self.get(id)
            .ok()
            .and_then(|fetched| fetched.series.span())
            .is_some_and(|(lo, hi)| lo <= start && hi >= end)
    }

    fn get_range(
        &self,
        id: &SecurityId,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<FetchResult, DataError> {
        let fetched = self.get(id)?;
        Ok(FetchResult::new(
            fetched.info,
            fetched.series.filter_range(start, end),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPY_CSV: &str = "\
Date,Open,High,Low,Close,Adj Close,Volume
2002-01-03,115.0,116.5,114.2,116.3,80.1,1500000
2002-01-02,114.0,115.4,112.9,115.1,79.3,1800000
2002-01-04,null,null,null,null,null,null
";

    fn ts(s: &str) -> Timestamp {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn reads_export_sorted_and_skips_null_rows() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("SPY.csv"), SPY_CSV).unwrap();
        let source = CsvSource::new(dir.path());
        let spy = SecurityId::new("spy").unwrap();

        assert!(source.has(&spy));
        let fetched = source.get(&spy).unwrap();
        assert_eq!(fetched.series.len(), 2);
        assert!(fetched.series.is_sorted());

        let first = fetched.series.bars()[0];
        assert_eq!(first.trade_time, ts("2002-01-02"));
        assert_eq!(first.max, 115.4);
        assert_eq!(first.min, 112.9);
        assert_eq!(first.adjusted_close, 79.3);
        assert!(fetched.info.is_empty());
    }

    #[test]
    fn picks_up_info_toml() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("SPY.csv"), SPY_CSV).unwrap();
        fs::write(
            dir.path().join("SPY.toml"),
            "name = \"SPDR S&P 500\"\ncategory = \"Large Blend\"\ninception = \"1993-01-22\"\n",
        )
        .unwrap();

        let source = CsvSource::new(dir.path());
        let info = source.get(&SecurityId::new("SPY").unwrap()).unwrap().info;
        assert_eq!(info.name.as_deref(), Some("SPDR S&P 500"));
        assert_eq!(info.inception.map(|d| d.to_string()).as_deref(), Some("1993-01-22"));
    }

    #[test]
    fn unknown_security_is_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvSource::new(dir.path());
        let id = SecurityId::new("qqq").unwrap();
        assert!(!source.has(&id));
        assert!(source.get(&id).unwrap().series.is_empty());
        assert!(source.list_securities().unwrap().is_empty());
    }

    #[test]
    fn get_range_and_listing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("SPY.csv"), SPY_CSV).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();
        let source = CsvSource::new(dir.path());
        let spy = SecurityId::new("spy").unwrap();

        assert_eq!(source.list_securities().unwrap(), vec![spy.clone()]);
        let window = source
            .get_range(&spy, ts("2002-01-03"), ts("2002-01-31"))
            .unwrap()
            .series;
        assert_eq!(window.len(), 1);
        assert!(source.has_range(&spy, ts("2002-01-02"), ts("2002-01-03")));
        assert!(!source.has_range(&spy, ts("2002-01-01"), ts("2002-01-03")));
    }

    #[test]
    fn bad_number_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("BAD.csv"),
            "Date,Open,High,Low,Close,Adj Close,Volume\n2002-01-02,x,1,1,1,1,1\n",
        )
        .unwrap();
        let source = CsvSource::new(dir.path());
        let err = source.get(&SecurityId::new("bad").unwrap()).unwrap_err();
        assert!(matches!(err, DataError::MalformedRecord { .. }));
    }

    #[test]
    fn is_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvSource::new(dir.path());
        let id = SecurityId::new("spy").unwrap();
        assert!(matches!(
            source.remove(&id),
            Err(DataError::Unsupported { .. })
        ));
    }
}
