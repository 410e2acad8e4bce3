//! Partitioning of a packed multi-cloud buffer into per-cloud row ranges.

use std::ops::Range;

use crate::core::error::{Result, SubsampleError};

use super::validate::CloudView;

/// Exclusive prefix sums of the batch sizes: `offsets[i]` is the first row of
/// cloud `i` and `offsets[k]` is the total row count.
///
/// Sizes must already be known to be non-negative.
pub fn batch_offsets(sizes: &[usize]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(sizes.len() + 1);
    let mut acc = 0usize;
    offsets.push(acc);
    for &n in sizes {
        acc += n;
        offsets.push(acc);
    }
    offsets
}

/// Check raw batch sizes against the total point count.
///
/// Every size must be >= 0 and the sizes must sum to `num_points`.
pub fn check_batch_sizes(sizes: &[i32], num_points: usize) -> Result<Vec<usize>> {
    let mut sum: i64 = 0;
    let mut out = Vec::with_capacity(sizes.len());
    for (index, &value) in sizes.iter().enumerate() {
        if value < 0 {
            return Err(SubsampleError::NegativeBatchSize { index, value });
        }
        sum += i64::from(value);
        out.push(value as usize);
    }
    if sum != num_points as i64 {
        return Err(SubsampleError::BatchSumMismatch { sum, num_points });
    }
    Ok(out)
}

/// Contiguous row range of every cloud, in batch order.
pub fn batch_ranges(sizes: &[usize]) -> Vec<Range<usize>> {
    batch_offsets(sizes)
        .windows(2)
        .map(|w| w[0]..w[1])
        .collect()
}

/// Split a validated view into one view per cloud.
///
/// The sizes must sum to the view's row count (see [`check_batch_sizes`]).
pub fn split_view<'a>(view: &CloudView<'a>, sizes: &[usize]) -> Vec<CloudView<'a>> {
    batch_ranges(sizes)
        .into_iter()
        .map(|range| view.slice(range))
        .collect()
}
