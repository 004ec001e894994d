//! Column-index grouping with padding, and payload compaction into group slots.

use crate::dense::BlockShape;
use crate::element::Element;
use crate::error::{Result, SparseError};

/// Grouped column indices plus the per-block-row group offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GroupedIndices {
    pub group_row_ptr: Vec<usize>,
    pub col_indices: Vec<usize>,
}

/// Count the genuine entries in one group of column slots.
///
/// Padding slots repeat their predecessor, while genuine block-columns in a
/// row are strictly increasing, so the first repeat ends the real run.
///
/// # Example
/// ```
/// use tile_sparse::tile::real_count;
///
/// assert_eq!(real_count(&[2, 5, 9, 9]), 3);
/// assert_eq!(real_count(&[2, 5, 9, 11]), 4);
/// ```
pub fn real_count(slots: &[usize]) -> usize {
    if slots.is_empty() {
        return 0;
    }
    1 + slots
        .windows(2)
        .take_while(|pair| pair[1] != pair[0])
        .count()
}

/// Split every block-row's column indices into groups of `group`, padding the
/// last group of a row with its final genuine index.
///
/// Fails if a row's indices are not strictly increasing, since padding could
/// not be told apart from genuine entries.
pub(crate) fn group_indices(row_ptr: &[usize], col_indices: &[usize], group: usize) -> Result<GroupedIndices> {
    let block_rows = row_ptr.len().saturating_sub(1);
    let mut group_row_ptr = Vec::with_capacity(row_ptr.len());
    let mut grouped = Vec::with_capacity(col_indices.len().div_ceil(group) * group);

    for block_row in 0..block_rows {
        group_row_ptr.push(grouped.len() / group);
        let row = &col_indices[row_ptr[block_row]..row_ptr[block_row + 1]];
        if let Some(position) = row.windows(2).position(|pair| pair[1] <= pair[0]) {
            return Err(SparseError::NonIncreasingIndices {
                block_row,
                position: position + 1,
            });
        }
        for chunk in row.chunks(group) {
            grouped.extend_from_slice(chunk);
            if let Some(&last) = chunk.last() {
                grouped.extend(std::iter::repeat(last).take(group - chunk.len()));
            }
        }
    }
    group_row_ptr.push(grouped.len() / group);

    Ok(GroupedIndices {
        group_row_ptr,
        col_indices: grouped,
    })
}

/// Copy each group's genuine blocks into a buffer of `group` block slots per
/// group, leaving padding slots zero.
///
/// `data` is the ungrouped block-contiguous payload addressed by `row_ptr`.
pub(crate) fn compact_payload<T: Element>(
    data: &[T],
    row_ptr: &[usize],
    grouped: &GroupedIndices,
    group: usize,
    block: BlockShape,
) -> Vec<T> {
    let block_size = block.size();
    let mut staged = vec![T::default(); grouped.col_indices.len() * block_size];

    for (block_row, groups) in grouped.group_row_ptr.windows(2).enumerate() {
        let mut src_block = row_ptr[block_row];
        for group_idx in groups[0]..groups[1] {
            let first = group_idx * group;
            let real = real_count(&grouped.col_indices[first..first + group]);
            let len = real * block_size;
            let dst = first * block_size;
            let src = src_block * block_size;
            staged[dst..dst + len].copy_from_slice(&data[src..src + len]);
            src_block += group;
        }
    }
    staged
}
