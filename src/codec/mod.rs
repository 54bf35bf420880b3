// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Sparse-matrix codec.
//!
//! Turns a [`CsrMatrix`] into the lane-interleaved [`EncodedMatrix`] layout:
//!
//! ```text
//! CsrMatrix -> partition -> TileGrid -> encode -> EncodedMatrix
//! ```
//!
//! The decoder in [`crate::pipeline`] depends only on [`layout`].

pub mod config;
pub mod csr;
pub mod encode;
pub mod layout;
pub mod partition;

pub use config::{ColumnIndexing, ConfigError, LayoutConfig};
pub use csr::{compare_outputs, CsrMatrix, Mismatch};
pub use encode::{encode_grid, encode_matrix, encode_tile, encode_tile_aligned, LaneEncoder};
pub use layout::{
    ChannelStore, EncodedMatrix, EncodedTile, LayoutGeometry, PartitionTableEntry, Record,
    RECORD_BYTES, SENTINEL,
};
pub use partition::{partition, partition_with_indexing, Tile, TileGrid};
