// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Tile partitioning.
//!
//! Splits a [`CsrMatrix`] into a 2-D grid of row partitions × column
//! partitions. Every cell is itself a row-compressed matrix:
//!
//! ```text
//!               col part 0     col part 1    ...
//! row part 0  | tile (0, 0) | tile (0, 1) |
//! row part 1  | tile (1, 0) | tile (1, 1) |
//! ```
//!
//! Row indices inside a tile are local to its row partition. Column indices
//! are global by default, or rebased to the column partition when
//! [`ColumnIndexing::TileLocal`] is requested. A tile's `num_cols` is always
//! the width of its column partition.

use super::config::ColumnIndexing;
use super::csr::CsrMatrix;
use crate::error::{CodecError, Result};
use crate::scalar::Scalar;

/// One cell of the partition grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile<T> {
    /// Row partition index.
    pub row_partition: usize,
    /// Column partition index.
    pub col_partition: usize,
    /// First matrix row covered by this tile.
    pub row_base: usize,
    /// First matrix column covered by this tile.
    pub col_base: usize,
    /// The tile's non-zeros with tile-local row indices.
    pub matrix: CsrMatrix<T>,
}

impl<T> Tile<T> {
    /// Rows in the tile.
    #[must_use]
    pub const fn num_rows(&self) -> usize {
        self.matrix.num_rows()
    }
}

/// A matrix split into tiles, stored row-partition-major.
#[derive(Debug, Clone, PartialEq)]
pub struct TileGrid<T> {
    /// Rows per full row partition.
    pub row_partition_size: usize,
    /// Columns per full column partition.
    pub col_partition_size: usize,
    /// Number of row partitions.
    pub num_row_partitions: usize,
    /// Number of column partitions.
    pub num_col_partitions: usize,
    /// Rows in the last row partition.
    pub num_rows_last: usize,
    /// Columns in the last column partition.
    pub num_cols_last: usize,
    /// Rows of the source matrix.
    pub total_num_rows: usize,
    /// Columns of the source matrix.
    pub total_num_cols: usize,
    /// Column index convention of every tile.
    pub column_indexing: ColumnIndexing,
    tiles: Vec<Tile<T>>,
}

impl<T> TileGrid<T> {
    /// Tile at `(row_partition, col_partition)`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    #[must_use]
    pub fn tile(&self, row_partition: usize, col_partition: usize) -> &Tile<T> {
        assert!(
            row_partition < self.num_row_partitions && col_partition < self.num_col_partitions,
            "tile ({row_partition}, {col_partition}) out of bounds"
        );
        &self.tiles[row_partition * self.num_col_partitions + col_partition]
    }

    /// All tiles in row-partition-major order.
    #[must_use]
    pub fn tiles(&self) -> &[Tile<T>] {
        &self.tiles
    }

    /// Rows in row partition `i`.
    #[must_use]
    pub fn partition_rows(&self, i: usize) -> usize {
        if i + 1 == self.num_row_partitions {
            self.num_rows_last
        } else {
            self.row_partition_size
        }
    }

    /// Columns in column partition `j`.
    #[must_use]
    pub fn partition_cols(&self, j: usize) -> usize {
        if j + 1 == self.num_col_partitions {
            self.num_cols_last
        } else {
            self.col_partition_size
        }
    }

    /// Non-zeros over all tiles.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.tiles.iter().map(|t| t.matrix.nnz()).sum()
    }
}

/// Partition a matrix with global column indices.
///
/// # Errors
///
/// Returns [`CodecError::InvalidConfig`] if either partition size is zero.
pub fn partition<T: Scalar>(
    matrix: &CsrMatrix<T>,
    row_partition_size: usize,
    col_partition_size: usize,
) -> Result<TileGrid<T>> {
    partition_with_indexing(
        matrix,
        row_partition_size,
        col_partition_size,
        ColumnIndexing::Global,
    )
}

/// Partition a matrix, choosing the column index convention.
///
/// Single pass over the non-zeros, no sorting: entries keep their order
/// within each row.
///
/// # Errors
///
/// Returns [`CodecError::InvalidConfig`] if either partition size is zero.
pub fn partition_with_indexing<T: Scalar>(
    matrix: &CsrMatrix<T>,
    row_partition_size: usize,
    col_partition_size: usize,
    column_indexing: ColumnIndexing,
) -> Result<TileGrid<T>> {
    if row_partition_size == 0 || col_partition_size == 0 {
        return Err(CodecError::InvalidConfig(format!(
            "partition sizes must be positive, got {row_partition_size}x{col_partition_size}"
        )));
    }

    let num_rows = matrix.num_rows();
    let num_cols = matrix.num_cols();
    let num_row_partitions = num_rows.div_ceil(row_partition_size);
    let num_col_partitions = num_cols.div_ceil(col_partition_size);
    let num_rows_last = tail_size(num_rows, row_partition_size);
    let num_cols_last = tail_size(num_cols, col_partition_size);

    let rows_of = |i: usize| {
        if i + 1 == num_row_partitions {
            num_rows_last
        } else {
            row_partition_size
        }
    };
    let cols_of = |j: usize| {
        if j + 1 == num_col_partitions {
            num_cols_last
        } else {
            col_partition_size
        }
    };

    let mut values: Vec<Vec<T>> = vec![Vec::new(); num_row_partitions * num_col_partitions];
    let mut indices: Vec<Vec<u32>> = vec![Vec::new(); num_row_partitions * num_col_partitions];
    let mut row_len: Vec<Vec<usize>> = (0..num_row_partitions * num_col_partitions)
        .map(|cell| vec![0; rows_of(cell / num_col_partitions.max(1))])
        .collect();

    for row in 0..num_rows {
        let part_r = row / row_partition_size;
        let local_row = row % row_partition_size;
        let (cols, vals) = matrix.row(row);
        for (&col, &value) in cols.iter().zip(vals) {
            let part_c = col as usize / col_partition_size;
            let cell = part_r * num_col_partitions + part_c;
            let stored = match column_indexing {
                ColumnIndexing::Global => col,
                ColumnIndexing::TileLocal => col - index_base(part_c * col_partition_size),
            };
            indices[cell].push(stored);
            values[cell].push(value);
            row_len[cell][local_row] += 1;
        }
    }

    let mut tiles = Vec::with_capacity(num_row_partitions * num_col_partitions);
    for (cell, ((vals, idx), lens)) in values.into_iter().zip(indices).zip(row_len).enumerate() {
        let i = cell / num_col_partitions;
        let j = cell % num_col_partitions;
        let mut row_offset = Vec::with_capacity(lens.len() + 1);
        row_offset.push(0);
        let mut acc = 0;
        for len in lens {
            acc += len;
            row_offset.push(acc);
        }
        tiles.push(Tile {
            row_partition: i,
            col_partition: j,
            row_base: i * row_partition_size,
            col_base: j * col_partition_size,
            matrix: CsrMatrix::from_parts_unchecked(rows_of(i), cols_of(j), vals, idx, row_offset),
        });
    }

    tracing::debug!(
        rows = num_rows,
        cols = num_cols,
        row_partitions = num_row_partitions,
        col_partitions = num_col_partitions,
        nnz = matrix.nnz(),
        "partitioned matrix into tiles"
    );

    Ok(TileGrid {
        row_partition_size,
        col_partition_size,
        num_row_partitions,
        num_col_partitions,
        num_rows_last,
        num_cols_last,
        total_num_rows: num_rows,
        total_num_cols: num_cols,
        column_indexing,
        tiles,
    })
}

fn tail_size(total: usize, part: usize) -> usize {
    match total % part {
        0 if total == 0 => 0,
        0 => part,
        rem => rem,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn index_base(base: usize) -> u32 {
    // bases are bounded by a column index that already fits in u32
    base as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_matrix() -> CsrMatrix<f32> {
        CsrMatrix::from_triplets(
            4,
            4,
            &[
                (0, 0, 1.0),
                (0, 2, 2.0),
                (1, 1, 3.0),
                (2, 2, 4.0),
                (3, 0, 5.0),
                (3, 3, 6.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_single_tile_is_identity() -> Result<()> {
        let m = example_matrix();
        let grid = partition(&m, 4, 4)?;
        assert_eq!(grid.tiles().len(), 1);
        assert_eq!(grid.tile(0, 0).matrix, m);
        Ok(())
    }

    #[test]
    fn test_two_by_two_grid() -> Result<()> {
        let m = example_matrix();
        let grid = partition(&m, 2, 2)?;
        assert_eq!(grid.num_row_partitions, 2);
        assert_eq!(grid.num_col_partitions, 2);

        // rows 0-1, cols 2-3: only (0, 2)
        let t01 = grid.tile(0, 1);
        assert_eq!(t01.matrix.row_offset(), &[0, 1, 1]);
        assert_eq!(t01.matrix.col_index(), &[2]);
        assert_eq!(t01.row_base, 0);
        assert_eq!(t01.col_base, 2);

        // rows 2-3, cols 0-1: only (3, 0), at local row 1
        let t10 = grid.tile(1, 0);
        assert_eq!(t10.matrix.row_offset(), &[0, 0, 1]);
        assert_eq!(t10.matrix.values(), &[5.0]);

        assert_eq!(grid.nnz(), m.nnz());
        Ok(())
    }

    #[test]
    fn test_tile_local_indexing() -> Result<()> {
        let m = example_matrix();
        let grid = partition_with_indexing(&m, 4, 2, ColumnIndexing::TileLocal)?;
        assert_eq!(grid.tile(0, 1).matrix.col_index(), &[0, 0, 1]);
        assert_eq!(grid.tile(0, 0).matrix.col_index(), &[0, 1, 0]);
        Ok(())
    }

    #[test]
    fn test_short_last_partitions() -> Result<()> {
        let m = CsrMatrix::uniform(10, 7, 3, 1i32)?;
        let grid = partition(&m, 4, 3)?;
        assert_eq!(grid.num_row_partitions, 3);
        assert_eq!(grid.num_rows_last, 2);
        assert_eq!(grid.num_cols_last, 1);
        assert_eq!(grid.partition_rows(2), 2);
        assert_eq!(grid.partition_cols(2), 1);
        assert_eq!(grid.tile(2, 2).num_rows(), 2);
        assert_eq!(grid.nnz(), m.nnz());
        Ok(())
    }

    #[test]
    fn test_every_nonzero_lands_once() -> Result<()> {
        let m = CsrMatrix::random(24, 40, 5, 3, 1u32, 11)?;
        let grid = partition(&m, 8, 16)?;
        let mut seen = Vec::new();
        for tile in grid.tiles() {
            for r in 0..tile.num_rows() {
                let (cols, _) = tile.matrix.row(r);
                for &c in cols {
                    assert!((c as usize) / 16 == tile.col_partition);
                    seen.push((tile.row_base + r, c));
                }
            }
        }
        seen.sort_unstable();
        let mut expected = Vec::new();
        for r in 0..m.num_rows() {
            expected.extend(m.row(r).0.iter().map(|&c| (r, c)));
        }
        assert_eq!(seen, expected);
        Ok(())
    }

    #[test]
    fn test_zero_partition_size_rejected() {
        let m = example_matrix();
        assert!(matches!(
            partition(&m, 0, 4),
            Err(CodecError::InvalidConfig(_))
        ));
        assert!(partition(&m, 4, 0).is_err());
    }
}
