//! Pairwise time alignment.
//!
//! Unlike a union-with-gaps alignment, this keeps only the timestamps both
//! series share, so the outputs can be zipped bar for bar.

use super::Series;
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlignError {
    #[error("series have no timestamps in common")]
    NoOverlap,

    #[error("aligned series differ in length ({left} vs {right})")]
    LengthMismatch { left: usize, right: usize },
}

/// Intersects two ascending series on exact `trade_time` matches.
///
/// Returns equal-length outputs where `left[i]` and `right[i]` share a
/// timestamp.
pub fn find_common(a: &Series, b: &Series) -> Result<(Series, Series), AlignError> {
    let (xs, ys) = (a.bars(), b.bars());
    let (mut i, mut j) = (0, 0);
    let mut left = Series::new();
    let mut right = Series::new();

    while i < xs.len() && j < ys.len() {
        match xs[i].trade_time.cmp(&ys[j].trade_time) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                left.add(xs[i]);
                right.add(ys[j]);
                i += 1;
                j += 1;
            }
        }
    }

    if left.len() != right.len() {
        tracing::warn!(
            left = left.len(),
            right = right.len(),
            "aligned series differ in length"
        );
        return Err(AlignError::LengthMismatch {
            left: left.len(),
            right: right.len(),
        });
    }
    if left.is_empty() {
        return Err(AlignError::NoOverlap);
    }

    Ok((left, right))
}
