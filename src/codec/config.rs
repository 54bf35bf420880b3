// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Configuration for the lane-interleaved layout.
//!
//! This module provides the sizing parameters shared by the partitioner,
//! the encoder and the decoder: channel and lane counts, partition sizes,
//! column-index convention and tile alignment.

/// How column indices are stored inside a tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColumnIndexing {
    /// Column indices keep their position in the full matrix.
    #[default]
    Global,

    /// Column indices are rebased to the start of the tile's column partition.
    TileLocal,
}

/// Configuration for the lane-interleaved layout.
///
/// # Example
///
/// ```rust
/// use lanespmv_rs::codec::LayoutConfig;
///
/// // Default configuration (one channel, eight lanes)
/// let config = LayoutConfig::default();
/// assert_eq!(config.lane_count(), 8);
///
/// // Two lanes, small partitions, handy for hand-checked layouts
/// let config = LayoutConfig::for_lane_count(1, 2, 4, 4);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutConfig {
    /// Number of memory channels the layout is spread over.
    pub channels: usize,

    /// Lanes packed side by side in one channel word.
    pub pack_size: usize,

    /// Rows per row partition. Must be a multiple of the lane count.
    pub row_partition_size: usize,

    /// Columns per column partition (length of one vector slice).
    pub col_partition_size: usize,

    /// Column index convention inside tiles.
    pub column_indexing: ColumnIndexing,

    /// Every tile's padded length is rounded up to a multiple of this many
    /// words. 1 disables extra padding.
    pub tile_alignment: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            channels: 1,
            pack_size: 8,
            row_partition_size: 1024,
            col_partition_size: 1024,
            column_indexing: ColumnIndexing::Global,
            tile_alignment: 1,
        }
    }
}

impl LayoutConfig {
    /// Configuration with explicit lane geometry and partition sizes.
    #[must_use]
    pub fn for_lane_count(
        channels: usize,
        pack_size: usize,
        row_partition_size: usize,
        col_partition_size: usize,
    ) -> Self {
        Self {
            channels,
            pack_size,
            row_partition_size,
            col_partition_size,
            ..Self::default()
        }
    }

    /// Single-channel layout with eight lanes and an 8K-row output buffer.
    #[must_use]
    pub fn single_channel() -> Self {
        Self {
            row_partition_size: 8192,
            ..Self::default()
        }
    }

    /// Multi-channel layout for high-bandwidth memory stacks.
    ///
    /// Spreads 16 channels of 8 lanes each; tiles are aligned to 32 words to
    /// keep bursts full.
    #[must_use]
    pub fn hbm_default() -> Self {
        Self {
            channels: 16,
            pack_size: 8,
            row_partition_size: 16 * 8 * 64,
            col_partition_size: 4096,
            column_indexing: ColumnIndexing::Global,
            tile_alignment: 32,
        }
    }

    /// Total number of parallel lanes (`channels * pack_size`).
    #[must_use]
    pub const fn lane_count(&self) -> usize {
        self.channels * self.pack_size
    }

    /// Validate configuration parameters.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `channels` or `pack_size` is zero
    /// - either partition size is zero
    /// - `row_partition_size` is not a multiple of the lane count
    /// - `tile_alignment` is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channels == 0 {
            return Err(ConfigError::ZeroChannels);
        }
        if self.pack_size == 0 {
            return Err(ConfigError::ZeroPackSize);
        }
        if self.row_partition_size == 0 {
            return Err(ConfigError::ZeroPartitionSize("row_partition_size"));
        }
        if self.col_partition_size == 0 {
            return Err(ConfigError::ZeroPartitionSize("col_partition_size"));
        }
        if !self.row_partition_size.is_multiple_of(self.lane_count()) {
            return Err(ConfigError::IndivisiblePartition {
                rows: self.row_partition_size,
                lane_count: self.lane_count(),
            });
        }
        if self.tile_alignment == 0 {
            return Err(ConfigError::ZeroAlignment);
        }
        Ok(())
    }

    /// Validate the configuration against a matrix with `num_rows` rows.
    ///
    /// On top of [`validate`](Self::validate), the final (short) row
    /// partition must also be a multiple of the lane count.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or the last row
    /// partition cannot be split evenly across lanes.
    pub fn validate_for_rows(&self, num_rows: usize) -> Result<(), ConfigError> {
        self.validate()?;
        let tail = num_rows % self.row_partition_size;
        if tail > 0 && !tail.is_multiple_of(self.lane_count()) {
            return Err(ConfigError::IndivisiblePartition {
                rows: tail,
                lane_count: self.lane_count(),
            });
        }
        Ok(())
    }

    /// Number of row partitions for a matrix with `num_rows` rows.
    #[must_use]
    pub const fn num_row_partitions(&self, num_rows: usize) -> usize {
        num_rows.div_ceil(self.row_partition_size)
    }

    /// Number of column partitions for a matrix with `num_cols` columns.
    #[must_use]
    pub const fn num_col_partitions(&self, num_cols: usize) -> usize {
        num_cols.div_ceil(self.col_partition_size)
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// At least one channel is required.
    ZeroChannels,
    /// At least one lane per channel is required.
    ZeroPackSize,
    /// Partition sizes must be positive.
    ZeroPartitionSize(&'static str),
    /// Row partition cannot be split evenly across lanes.
    IndivisiblePartition {
        /// Rows in the partition
        rows: usize,
        /// Lanes the rows must be spread over
        lane_count: usize,
    },
    /// Tile alignment must be positive.
    ZeroAlignment,
    /// Lane queues need room for at least one event.
    ZeroQueueDepth,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroChannels => write!(f, "channels must be at least 1"),
            Self::ZeroPackSize => write!(f, "pack_size must be at least 1"),
            Self::ZeroPartitionSize(which) => write!(f, "{which} must be at least 1"),
            Self::IndivisiblePartition { rows, lane_count } => {
                write!(f, "row partition of {rows} rows does not divide lane count {lane_count}")
            }
            Self::ZeroAlignment => write!(f, "tile_alignment must be at least 1"),
            Self::ZeroQueueDepth => write!(f, "queue_depth must be at least 1"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = LayoutConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.lane_count(), 8);
    }

    #[test]
    fn test_presets_valid() {
        assert!(LayoutConfig::single_channel().validate().is_ok());
        assert!(LayoutConfig::hbm_default().validate().is_ok());
        assert_eq!(LayoutConfig::hbm_default().lane_count(), 128);
    }

    #[test]
    fn test_zero_partition_size() {
        let config = LayoutConfig {
            col_partition_size: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroPartitionSize("col_partition_size"))
        );
    }

    #[test]
    fn test_indivisible_row_partition() {
        let config = LayoutConfig::for_lane_count(1, 4, 6, 8);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::IndivisiblePartition { rows: 6, lane_count: 4 })
        ));
    }

    #[test]
    fn test_short_tail_partition() {
        let config = LayoutConfig::for_lane_count(1, 4, 8, 8);
        // 20 rows: partitions of 8, 8 and a tail of 4
        assert!(config.validate_for_rows(20).is_ok());
        // exact multiple, no tail
        assert!(config.validate_for_rows(16).is_ok());
        // tail of 2 rows cannot feed 4 lanes
        assert!(matches!(
            config.validate_for_rows(18),
            Err(ConfigError::IndivisiblePartition { rows: 2, lane_count: 4 })
        ));
    }

    #[test]
    fn test_partition_counts() {
        let config = LayoutConfig::for_lane_count(1, 2, 4, 3);
        assert_eq!(config.num_row_partitions(10), 3);
        assert_eq!(config.num_col_partitions(7), 3);
        assert_eq!(config.num_row_partitions(0), 0);
    }
}
