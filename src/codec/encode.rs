// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Lane-interleaved encoding.
//!
//! ## Algorithm
//!
//! For a tile with `R` rows and `L = channels * pack_size` lanes:
//!
//! ```text
//! for r in 0..R:
//!     lane = r % L
//!     lane.extend(row r non-zeros as (col, value))
//!     lane.push((SENTINEL, 1))          // also emitted for empty rows
//! max_len = max(len(lane))
//! pad every lane with (0, 0) to max_len (rounded up to the tile alignment)
//! ```
//!
//! The table entry keeps each lane's pre-padding length, so the decoder never
//! reads padding. Tiles are appended row-partition-major; every channel's
//! write cursor advances by the same padded length, so a single start offset
//! addresses the tile on all channels.

use super::config::LayoutConfig;
use super::csr::CsrMatrix;
use super::layout::{EncodedMatrix, EncodedTile, LayoutGeometry, PartitionTableEntry, Record};
use super::partition::{partition_with_indexing, Tile, TileGrid};
use crate::error::{CodecError, Result};
use crate::scalar::Scalar;

/// Encode one tile into padded lane streams.
///
/// # Errors
///
/// Returns [`CodecError::InvalidConfig`] if `channels` or `pack_size` is
/// zero, and [`CodecError::IndivisibleRows`] if the tile has rows but their
/// count is not a multiple of the lane count. Nothing is produced on error.
pub fn encode_tile<T: Scalar>(
    tile: &CsrMatrix<T>,
    channels: usize,
    pack_size: usize,
) -> Result<EncodedTile<T>> {
    encode_tile_aligned(tile, channels, pack_size, 1)
}

/// Encode one tile, rounding its padded length up to `alignment` words.
///
/// # Errors
///
/// Same as [`encode_tile`]; additionally rejects a zero `alignment`.
pub fn encode_tile_aligned<T: Scalar>(
    tile: &CsrMatrix<T>,
    channels: usize,
    pack_size: usize,
    alignment: usize,
) -> Result<EncodedTile<T>> {
    let lane_count = match channels.checked_mul(pack_size) {
        Some(n) if n > 0 => n,
        _ => {
            return Err(CodecError::InvalidConfig(format!(
                "lane count must be positive and fit in usize, got {channels} channels x {pack_size} lanes"
            )))
        }
    };
    if alignment == 0 {
        return Err(CodecError::InvalidConfig("tile alignment must be positive".into()));
    }
    let rows = tile.num_rows();
    if !rows.is_multiple_of(lane_count) {
        return Err(CodecError::IndivisibleRows { rows, lane_count });
    }

    // streamize: deal rows round-robin, one marker per row
    let per_lane_hint = (tile.nnz() + rows) / lane_count + 1;
    let mut lanes: Vec<Vec<Record<T>>> = (0..lane_count)
        .map(|_| Vec::with_capacity(per_lane_hint))
        .collect();
    for r in 0..rows {
        let lane = &mut lanes[r % lane_count];
        let (cols, vals) = tile.row(r);
        lane.extend(cols.iter().zip(vals).map(|(&c, &v)| Record::entry(c, v)));
        lane.push(Record::marker(1));
    }

    let lane_lengths = lanes
        .iter()
        .map(|l| {
            u32::try_from(l.len()).map_err(|_| {
                CodecError::InvalidConfig(format!("lane of {} records exceeds u32", l.len()))
            })
        })
        .collect::<Result<Vec<u32>>>()?;

    // pack: pad to the common (aligned) length
    let max_len = lanes.iter().map(Vec::len).max().unwrap_or(0);
    let padded_length = max_len.next_multiple_of(alignment);
    for lane in &mut lanes {
        lane.resize(padded_length, Record::padding());
    }

    Ok(EncodedTile {
        lanes,
        lane_lengths,
        padded_length,
    })
}

/// Incremental builder of an [`EncodedMatrix`].
///
/// Tiles must be pushed in row-partition-major order.
#[derive(Debug)]
pub struct LaneEncoder<T> {
    layout: EncodedMatrix<T>,
    tile_alignment: usize,
    next_tile: usize,
}

impl<T: Scalar> LaneEncoder<T> {
    /// Start an empty layout.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidConfig`] if the geometry has no lanes,
    /// a zero partition size, or `tile_alignment` is zero.
    pub fn new(geometry: LayoutGeometry, tile_alignment: usize) -> Result<Self> {
        geometry.validate()?;
        if tile_alignment == 0 {
            return Err(CodecError::InvalidConfig("tile alignment must be positive".into()));
        }
        Ok(Self {
            layout: EncodedMatrix::new(geometry),
            tile_alignment,
            next_tile: 0,
        })
    }

    /// Encode a tile and append it to the channel stores.
    ///
    /// # Errors
    ///
    /// Returns an error if the tile is out of order, has the wrong row count
    /// for its row partition, or fails [`encode_tile`]. On error the stores
    /// are left untouched.
    pub fn push_tile(&mut self, tile: &Tile<T>) -> Result<&PartitionTableEntry> {
        let geometry = *self.layout.geometry();
        let ncp = geometry.num_col_partitions();
        let expected = (self.next_tile / ncp.max(1), self.next_tile % ncp.max(1));
        if (tile.row_partition, tile.col_partition) != expected {
            return Err(CodecError::InvalidConfig(format!(
                "tile ({}, {}) pushed out of order, expected {expected:?}",
                tile.row_partition, tile.col_partition
            )));
        }
        let rows = geometry.partition_rows(tile.row_partition);
        if tile.num_rows() != rows {
            return Err(CodecError::ShapeMismatch {
                expected: vec![rows],
                actual: vec![tile.num_rows()],
            });
        }

        let encoded = encode_tile_aligned(
            &tile.matrix,
            geometry.channels,
            geometry.pack_size,
            self.tile_alignment,
        )?;
        tracing::debug!(
            row_partition = tile.row_partition,
            col_partition = tile.col_partition,
            nnz = tile.matrix.nnz(),
            padded_length = encoded.padded_length,
            "encoded tile"
        );
        self.next_tile += 1;
        Ok(self.layout.append_tile(encoded))
    }

    /// Finish the layout.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidConfig`] if not every tile was pushed.
    pub fn finish(self) -> Result<EncodedMatrix<T>> {
        let expected = self.layout.geometry().num_tiles();
        if self.next_tile != expected {
            return Err(CodecError::InvalidConfig(format!(
                "layout has {} of {expected} tiles",
                self.next_tile
            )));
        }
        Ok(self.layout)
    }
}

/// Encode an already partitioned matrix.
///
/// # Errors
///
/// Returns an error if `config` is invalid, disagrees with the grid's
/// partition sizes or column indexing, or any tile fails to encode.
pub fn encode_grid<T: Scalar>(grid: &TileGrid<T>, config: &LayoutConfig) -> Result<EncodedMatrix<T>> {
    config.validate_for_rows(grid.total_num_rows)?;
    if grid.row_partition_size != config.row_partition_size
        || grid.col_partition_size != config.col_partition_size
        || grid.column_indexing != config.column_indexing
    {
        return Err(CodecError::InvalidConfig(format!(
            "grid partitioned {}x{} ({:?}), config expects {}x{} ({:?})",
            grid.row_partition_size,
            grid.col_partition_size,
            grid.column_indexing,
            config.row_partition_size,
            config.col_partition_size,
            config.column_indexing
        )));
    }

    let geometry = LayoutGeometry {
        channels: config.channels,
        pack_size: config.pack_size,
        row_partition_size: config.row_partition_size,
        col_partition_size: config.col_partition_size,
        num_rows: grid.total_num_rows,
        num_cols: grid.total_num_cols,
        column_indexing: config.column_indexing,
    };
    let mut encoder = LaneEncoder::new(geometry, config.tile_alignment)?;
    for tile in grid.tiles() {
        encoder.push_tile(tile)?;
    }
    let layout = encoder.finish()?;

    tracing::debug!(
        tiles = layout.table().len(),
        lanes = config.lane_count(),
        words_per_channel = layout.cursor(),
        "encoded lane-interleaved layout"
    );
    Ok(layout)
}

/// Partition and encode a matrix in one step.
///
/// Validation runs before any partitioning, so a bad configuration never
/// produces partial output.
///
/// # Errors
///
/// Returns an error if `config` is invalid for the matrix.
pub fn encode_matrix<T: Scalar>(matrix: &CsrMatrix<T>, config: &LayoutConfig) -> Result<EncodedMatrix<T>> {
    config.validate_for_rows(matrix.num_rows())?;
    let grid = partition_with_indexing(
        matrix,
        config.row_partition_size,
        config.col_partition_size,
        config.column_indexing,
    )?;
    encode_grid(&grid, config)
}
