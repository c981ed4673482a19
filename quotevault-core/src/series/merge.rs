use super::Series;
use crate::domain::Bar;

impl Series {
    /// Sorted union of two ascending series.
    ///
    /// Both inputs must already be sorted by `trade_time`; unsorted input gives
    /// an unspecified (but memory-safe) ordering. On equal timestamps bars from
    /// `left` come first.
    ///
    /// With `remove_duplicates`, a bar equal to the one just emitted is dropped.
    /// Equality is [`Bar::approx_eq`], so two bars sharing a timestamp but with
    /// different prices are both kept.
    pub fn merge(left: Series, right: Series, remove_duplicates: bool) -> Series {
        debug_assert!(left.is_sorted(), "left merge operand is not sorted");
        debug_assert!(right.is_sorted(), "right merge operand is not sorted");

        let mut out: Vec<Bar> = Vec::with_capacity(left.len() + right.len());
        let mut push = |bar: Bar| {
            if remove_duplicates && out.last().is_some_and(|prev| prev.approx_eq(&bar)) {
                return;
            }
            out.push(bar);
        };

        let mut a = left.into_iter().peekable();
        let mut b = right.into_iter().peekable();
        loop {
            let take_left = match (a.peek(), b.peek()) {
                (Some(x), Some(y)) => x.trade_time <= y.trade_time,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };
            let next = if take_left { a.next() } else { b.next() };
            if let Some(bar) = next {
                push(bar);
            }
        }

        Series::from(out)
    }
}
