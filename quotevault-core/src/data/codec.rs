//! Text codec for bar data files.
//!
//! One headerless record per line:
//! `tradeTime,open,close,min,max,volume,adjustedClose`.
//! Blank lines are ignored anywhere in the file. Any other unparsable line,
//! including one of empty fields, aborts the read.

use super::provider::DataError;
use crate::domain::{format_timestamp, parse_timestamp, Bar};
use crate::series::Series;
use std::io::{Read, Write};
use std::path::Path;

const FIELD_COUNT: usize = 7;

fn reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All);
    builder
}

/// Reads every record from `input`, keeping the bars `keep` accepts.
///
/// `path` only labels errors.
pub fn read_bars<R, F>(input: R, path: &Path, mut keep: F) -> Result<Series, DataError>
where
    R: Read,
    F: FnMut(&Bar) -> bool,
{
    let mut reader = reader_builder().from_reader(input);
    let mut series = Series::new();
    let mut record = csv::StringRecord::new();

    loop {
        match reader.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {}
            Err(e) => return Err(csv_error(path, e)),
        }
        // Whitespace-only line. Empty fields anywhere else are malformed.
        if record.len() == 1 && record[0].is_empty() {
            continue;
        }
        let line = record.position().map_or(0, |p| p.line());
        let bar = parse_record(&record).map_err(|reason| DataError::MalformedRecord {
            path: path.to_path_buf(),
            line,
            reason,
        })?;
        if keep(&bar) {
            series.add(bar);
        }
    }

    Ok(series)
}

/// Writes `bars` as records, one per line.
pub fn write_bars<'a, W, I>(output: W, bars: I, path: &Path) -> Result<(), DataError>
where
    W: Write,
    I: IntoIterator<Item = &'a Bar>,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(output);

    for bar in bars {
        writer
            .write_record(&[
                format_timestamp(&bar.trade_time),
                bar.open.to_string(),
                bar.close.to_string(),
                bar.min.to_string(),
                bar.max.to_string(),
                bar.volume.to_string(),
                bar.adjusted_close.to_string(),
            ])
            .map_err(|e| csv_error(path, e))?;
    }
    writer.flush().map_err(|e| DataError::io(path, e))
}

fn parse_record(record: &csv::StringRecord) -> Result<Bar, String> {
    if record.len() != FIELD_COUNT {
        return Err(format!(
            "expected {FIELD_COUNT} fields, found {}",
            record.len()
        ));
    }

    let number = |idx: usize, name: &str| -> Result<f64, String> {
        let raw = &record[idx];
        raw.parse::<f64>()
            .map_err(|e| format!("bad {name} '{raw}': {e}"))
    };

    Ok(Bar {
        trade_time: parse_timestamp(&record[0])
            .map_err(|e| format!("bad trade time '{}': {e}", &record[0]))?,
        open: number(1, "open")?,
        close: number(2, "close")?,
        min: number(3, "min")?,
        max: number(4, "max")?,
        volume: number(5, "volume")?,
        adjusted_close: number(6, "adjusted close")?,
    })
}

fn csv_error(path: &Path, err: csv::Error) -> DataError {
    let line = err.position().map_or(0, |p| p.line());
    match err.into_kind() {
        csv::ErrorKind::Io(source) => DataError::io(path, source),
        other => DataError::MalformedRecord {
            path: path.to_path_buf(),
            line,
            reason: format!("{other:?}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::test_support::bar;

    fn path() -> &'static Path {
        Path::new("test.dat")
    }

    #[test]
    fn writes_one_line_per_bar() {
        let mut b = bar("2002-01-02", 101.5);
        b.open = 100.0;
        b.volume = 50_000.0;

        let mut buf = Vec::new();
        write_bars(&mut buf, &[b], path()).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "2002-01-02T00:00:00,100,101.5,101.5,101.5,50000,101.5\n"
        );
    }

    #[test]
    fn reads_back_what_it_wrote() {
        let bars = vec![bar("2002-01-02", 1.25), bar("2002-01-03", 2.5)];
        let mut buf = Vec::new();
        write_bars(&mut buf, &bars, path()).unwrap();

        let series = read_bars(buf.as_slice(), path(), |_| true).unwrap();
        assert_eq!(series.bars(), bars.as_slice());
    }

    #[test]
    fn blank_lines_are_skipped() {
        let text = "2002-01-02T00:00:00,1,2,0.5,3,10,2\n\n2002-01-03T00:00:00,2,3,1,4,20,3\n\n";
        let series = read_bars(text.as_bytes(), path(), |_| true).unwrap();
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn line_of_empty_fields_is_a_hard_error() {
        let text = "2002-01-02T00:00:00,1,2,0.5,3,10,2\n,,,,,,\n2002-01-03T00:00:00,2,3,1,4,20,3\n";
        let err = read_bars(text.as_bytes(), path(), |_| true).unwrap_err();
        assert!(matches!(err, DataError::MalformedRecord { line: 2, .. }), "{err}");
    }

    #[test]
    fn whitespace_only_line_is_skipped() {
        let text = "2002-01-02T00:00:00,1,2,0.5,3,10,2\n   \n2002-01-03T00:00:00,2,3,1,4,20,3\n";
        let series = read_bars(text.as_bytes(), path(), |_| true).unwrap();
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn filter_applies_while_reading() {
        let text = "2002-01-02,1,2,0.5,3,10,2\n2002-01-03,2,3,1,4,20,3\n";
        let series = read_bars(text.as_bytes(), path(), |b| b.close > 2.5).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.bars()[0].close, 3.0);
    }

    #[test]
    fn malformed_line_is_a_hard_error() {
        let text = "2002-01-02T00:00:00,1,2,0.5,3,10,2\n2002-01-03T00:00:00,abc,3,1,4,20,3\n";
        let err = read_bars(text.as_bytes(), path(), |_| true).unwrap_err();
        match err {
            DataError::MalformedRecord { line, reason, .. } => {
                assert_eq!(line, 2);
                assert!(reason.contains("open"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn short_record_is_rejected() {
        let text = "2002-01-02T00:00:00,1,2\n";
        let err = read_bars(text.as_bytes(), path(), |_| true).unwrap_err();
        assert!(matches!(err, DataError::MalformedRecord { line: 1, .. }));
    }
}
