use super::Series;
use crate::domain::Bar;
use chrono::Datelike;

impl Series {
    /// Collapses every `n` consecutive bars into one.
    ///
    /// A trailing partial bucket is kept. `n <= 1` returns a copy.
    pub fn summarize(&self, n: usize) -> Series {
        if n <= 1 {
            return self.clone();
        }
        self.bars.chunks(n).filter_map(collapse).collect()
    }

    /// Collapses bars into one per calendar month of `trade_time`.
    ///
    /// Buckets break whenever the (year, month) of consecutive bars differs, so
    /// the input is expected to be sorted.
    pub fn summarize_monthly(&self) -> Series {
        self.bars
            .chunk_by(|a, b| {
                a.trade_time.year() == b.trade_time.year()
                    && a.trade_time.month() == b.trade_time.month()
            })
            .filter_map(collapse)
            .collect()
    }
}

/// open/close from the ends, min/max extrema, average volume, last timestamp.
fn collapse(bucket: &[Bar]) -> Option<Bar> {
    let first = bucket.first()?;
    let last = bucket.last()?;
    let (min, max, volume) = bucket.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, 0.0),
        |(lo, hi, vol), bar| (lo.min(bar.min), hi.max(bar.max), vol + bar.volume),
    );

    Some(Bar {
        trade_time: last.trade_time,
        open: first.open,
        close: last.close,
        min,
        max,
        volume: volume / bucket.len() as f64,
        adjusted_close: last.adjusted_close,
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::bar;
    use super::*;
    use crate::domain::parse_timestamp;

    fn ohlc(date: &str, open: f64, close: f64, min: f64, max: f64, volume: f64) -> Bar {
        Bar {
            trade_time: parse_timestamp(date).unwrap(),
            open,
            close,
            min,
            max,
            volume,
            adjusted_close: close,
        }
    }

    #[test]
    fn summarize_buckets_consecutive_bars() {
        let s: Series = vec![
            ohlc("2002-01-01", 10.0, 11.0, 9.0, 12.0, 100.0),
            ohlc("2002-01-02", 11.0, 13.0, 10.5, 14.0, 300.0),
            ohlc("2002-01-03", 13.0, 12.0, 8.0, 13.5, 200.0),
        ]
        .into();

        let weekly = s.summarize(2);
        assert_eq!(weekly.len(), 2);

        let b = weekly.bars()[0];
        assert_eq!(b.open, 10.0);
        assert_eq!(b.close, 13.0);
        assert_eq!(b.min, 9.0);
        assert_eq!(b.max, 14.0);
        assert_eq!(b.volume, 200.0);
        assert_eq!(b.trade_time, parse_timestamp("2002-01-02").unwrap());

        // Trailing partial bucket survives.
        assert_eq!(weekly.bars()[1].min, 8.0);
    }

    #[test]
    fn summarize_small_n_is_identity() {
        let s: Series = vec![bar("2002-01-01", 1.0), bar("2002-01-02", 2.0)].into();
        assert_eq!(s.summarize(0), s);
        assert_eq!(s.summarize(1), s);
    }

    #[test]
    fn monthly_breaks_on_calendar_month() {
        let s: Series = vec![
            bar("2002-01-30", 1.0),
            bar("2002-01-31", 2.0),
            bar("2002-02-01", 3.0),
            bar("2002-02-28", 4.0),
            bar("2003-02-03", 5.0),
        ]
        .into();

        let monthly = s.summarize_monthly();
        let closes: Vec<f64> = monthly.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![2.0, 4.0, 5.0]);
        assert_eq!(
            monthly.bars()[0].trade_time,
            parse_timestamp("2002-01-31").unwrap()
        );
    }

    #[test]
    fn empty_series_summarizes_to_empty() {
        assert!(Series::new().summarize(5).is_empty());
        assert!(Series::new().summarize_monthly().is_empty());
    }
}
