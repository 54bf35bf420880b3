// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Events carried on a lane queue.
//!
//! Every lane sees the same token sequence per row partition:
//!
//! ```text
//! START(slice 0) rec* NEXT  START(slice 1) rec* NEXT  ...  EXIT
//! ```

use std::sync::Arc;

use crate::codec::layout::Record;

/// Read-only input vector segment for one column partition.
///
/// `index_base` is subtracted from a stored column index before lookup:
/// the partition's first column for global indices, 0 for tile-local ones.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorSlice<T> {
    index_base: usize,
    values: Vec<T>,
}

impl<T: Copy> VectorSlice<T> {
    /// Wrap a vector segment.
    #[must_use]
    pub const fn new(index_base: usize, values: Vec<T>) -> Self {
        Self { index_base, values }
    }

    /// Number of operands in the slice.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the slice is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Operand for a stored column index, if it falls inside the slice.
    #[must_use]
    pub fn resolve(&self, col: u32) -> Option<T> {
        (col as usize)
            .checked_sub(self.index_base)
            .and_then(|i| self.values.get(i))
            .copied()
    }
}

/// One event on a lane queue.
#[derive(Debug, Clone)]
pub enum LaneEvent<T> {
    /// Begin a column-partition block. The slice is shared by every lane.
    Start(Arc<VectorSlice<T>>),
    /// A stored record of this lane.
    Record(Record<T>),
    /// End of the current block.
    Next,
    /// End of the row partition; the lane shuts down.
    Exit,
}
