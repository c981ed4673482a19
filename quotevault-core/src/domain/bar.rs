//! Bar: one trading period for one security.

use super::time::Timestamp;
use serde::{Deserialize, Serialize};

/// Absolute tolerance for comparing prices and volume.
pub const PRICE_TOLERANCE: f64 = 1e-6;

/// OHLC bar with volume and adjusted close.
///
/// Equality is approximate: numeric fields match within [`PRICE_TOLERANCE`],
/// `trade_time` must match exactly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bar {
    pub trade_time: Timestamp,
    pub open: f64,
    pub close: f64,
    pub min: f64,
    pub max: f64,
    pub volume: f64,
    pub adjusted_close: f64,
}

impl Bar {
    pub fn approx_eq(&self, other: &Bar) -> bool {
        fn close_enough(a: f64, b: f64) -> bool {
            (a - b).abs() <= PRICE_TOLERANCE
        }

        self.trade_time == other.trade_time
            && close_enough(self.open, other.open)
            && close_enough(self.close, other.close)
            && close_enough(self.min, other.min)
            && close_enough(self.max, other.max)
            && close_enough(self.volume, other.volume)
            && close_enough(self.adjusted_close, other.adjusted_close)
    }

    /// True if any numeric field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan()
            || self.close.is_nan()
            || self.min.is_nan()
            || self.max.is_nan()
            || self.volume.is_nan()
            || self.adjusted_close.is_nan()
    }
}

impl PartialEq for Bar {
    fn eq(&self, other: &Self) -> bool {
        self.approx_eq(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::time::parse_timestamp;

    fn sample_bar() -> Bar {
        Bar {
            trade_time: parse_timestamp("2002-01-02").unwrap(),
            open: 100.0,
            close: 103.0,
            min: 98.0,
            max: 105.0,
            volume: 50_000.0,
            adjusted_close: 101.5,
        }
    }

    #[test]
    fn equal_within_tolerance() {
        let a = sample_bar();
        let mut b = a;
        b.close += PRICE_TOLERANCE / 2.0;
        assert_eq!(a, b);
    }

    #[test]
    fn price_difference_breaks_equality() {
        let a = sample_bar();
        let mut b = a;
        b.close += 0.01;
        assert_ne!(a, b);
    }

    #[test]
    fn timestamp_compared_exactly() {
        let a = sample_bar();
        let mut b = a;
        b.trade_time += chrono::Duration::seconds(1);
        assert_ne!(a, b);
    }

    #[test]
    fn detects_void() {
        let mut bar = sample_bar();
        assert!(!bar.is_void());
        bar.adjusted_close = f64::NAN;
        assert!(bar.is_void());
    }
}
