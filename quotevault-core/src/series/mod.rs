//! Series: an ordered run of bars for one security.
//!
//! The container does not enforce ordering. Producers keep bars ascending by
//! `trade_time`; [`Series::merge`] relies on that and does not re-check it in
//! release builds.

pub mod align;
mod merge;
mod summarize;

pub use align::{find_common, AlignError};

use crate::domain::{Bar, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Series {
    bars: Vec<Bar>,
}

impl Series {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bars: Vec::with_capacity(capacity),
        }
    }

    pub fn add(&mut self, bar: Bar) {
        self.bars.push(bar);
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn into_bars(self) -> Vec<Bar> {
        self.bars
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bar> {
        self.bars.iter()
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Earliest and latest `trade_time` over the whole series, in any order.
    pub fn span(&self) -> Option<(Timestamp, Timestamp)> {
        let mut iter = self.bars.iter();
        let first = iter.next()?.trade_time;
        Some(iter.fold((first, first), |(lo, hi), bar| {
            (lo.min(bar.trade_time), hi.max(bar.trade_time))
        }))
    }

    /// Stable sort ascending by `trade_time`.
    pub fn sort_by_date(&mut self) {
        self.bars.sort_by_key(|bar| bar.trade_time);
    }

    /// True if `trade_time` never decreases.
    pub fn is_sorted(&self) -> bool {
        self.bars
            .windows(2)
            .all(|pair| pair[0].trade_time <= pair[1].trade_time)
    }

    /// Bars with `start <= trade_time <= end`.
    pub fn filter_range(&self, start: Timestamp, end: Timestamp) -> Series {
        self.bars
            .iter()
            .filter(|bar| bar.trade_time >= start && bar.trade_time <= end)
            .copied()
            .collect()
    }

    /// Simple returns `close[i] / close[i-1] - 1` for `i >= 1`.
    ///
    /// A zero previous close yields `0.0` for that step. The result has one
    /// element fewer than the series (none for fewer than two bars).
    pub fn returns(&self) -> Vec<f64> {
        self.bars
            .windows(2)
            .map(|pair| {
                let prev = pair[0].close;
                if prev == 0.0 {
                    0.0
                } else {
                    pair[1].close / prev - 1.0
                }
            })
            .collect()
    }

    /// Replaces every `close` with its `adjusted_close`. Destructive.
    pub fn use_adjusted(&mut self) {
        for bar in &mut self.bars {
            bar.close = bar.adjusted_close;
        }
    }
}

impl From<Vec<Bar>> for Series {
    fn from(bars: Vec<Bar>) -> Self {
        Self { bars }
    }
}

impl FromIterator<Bar> for Series {
    fn from_iter<I: IntoIterator<Item = Bar>>(iter: I) -> Self {
        Self {
            bars: iter.into_iter().collect(),
        }
    }
}

impl Extend<Bar> for Series {
    fn extend<I: IntoIterator<Item = Bar>>(&mut self, iter: I) {
        self.bars.extend(iter);
    }
}

impl IntoIterator for Series {
    type Item = Bar;
    type IntoIter = std::vec::IntoIter<Bar>;

    fn into_iter(self) -> Self::IntoIter {
        self.bars.into_iter()
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = &'a Bar;
    type IntoIter = std::slice::Iter<'a, Bar>;

    fn into_iter(self) -> Self::IntoIter {
        self.bars.iter()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::domain::{parse_timestamp, Bar};

    /// Flat bar on `date` with every price equal to `close`.
    pub fn bar(date: &str, close: f64) -> Bar {
        Bar {
            trade_time: parse_timestamp(date).unwrap(),
            open: close,
            close,
            min: close,
            max: close,
            volume: 1000.0,
            adjusted_close: close,
        }
    }
}
