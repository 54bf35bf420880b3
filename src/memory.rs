// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Memory footprint utilities.
//!
//! Estimates how much channel memory a layout needs and how much the lane
//! queues hold in flight, plus a per-channel capacity check.

use std::mem::size_of;

use crate::codec::config::LayoutConfig;
use crate::codec::layout::{EncodedMatrix, RECORD_BYTES};
use crate::error::{CodecError, Result};
use crate::pipeline::{LaneEvent, PipelineConfig};
use crate::scalar::Scalar;

/// Per-channel memory capacity an encoded layout has to fit into.
///
/// Each channel is shipped as its own image, so the check is per channel
/// rather than over the layout as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelBudget {
    /// Bytes available on each channel.
    pub bytes_per_channel: usize,
}

impl ChannelBudget {
    /// Budget of `bytes_per_channel` on every channel.
    #[must_use]
    pub const fn new(bytes_per_channel: usize) -> Self {
        Self { bytes_per_channel }
    }

    /// Check every channel image of `layout` against the budget and return
    /// the largest image size.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Resource`] naming the first channel whose image
    /// does not fit.
    pub fn reserve_layout<T: Scalar>(&self, layout: &EncodedMatrix<T>) -> Result<usize> {
        let mut largest = 0;
        for ch in 0..layout.channels().len() {
            let bytes = layout.channel_image_bytes(ch).unwrap_or(0);
            if bytes > self.bytes_per_channel {
                return Err(CodecError::Resource(format!(
                    "channel {ch} needs {}, budget is {}",
                    format_bytes(bytes),
                    format_bytes(self.bytes_per_channel)
                )));
            }
            largest = largest.max(bytes);
        }
        Ok(largest)
    }
}

/// Lower bound on the channel bytes of a layout, before padding.
///
/// Counts one record per non-zero, one marker per row and column partition,
/// and two table words per tile and channel. Lane imbalance and tile
/// alignment only add to this.
#[must_use]
pub fn estimate_layout_bytes(nnz: usize, num_rows: usize, num_cols: usize, config: &LayoutConfig) -> usize {
    let col_parts = config.num_col_partitions(num_cols);
    let tiles = config.num_row_partitions(num_rows) * col_parts;
    let records = nnz + num_rows * col_parts;
    let table_records = 2 * tiles * config.channels * config.pack_size;
    (records + table_records) * RECORD_BYTES
}

/// Bytes the lane queues can hold in flight at once.
#[must_use]
pub fn estimate_queue_bytes<T: Scalar>(config: &PipelineConfig) -> usize {
    config.lane_count() * config.queue_depth * size_of::<LaneEvent<T>>()
}

/// Format a byte count with binary units, e.g. `1.50 KiB`.
#[must_use]
pub fn format_bytes(bytes: usize) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    #[allow(clippy::cast_precision_loss)]
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{encode_matrix, CsrMatrix};

    #[test]
    fn test_estimate_bounds_real_layout() -> Result<()> {
        let m = CsrMatrix::random(64, 48, 6, 3, 1.0f32, 5)?;
        let config = LayoutConfig::for_lane_count(2, 4, 32, 16);
        let layout = encode_matrix(&m, &config)?;
        let estimate = estimate_layout_bytes(m.nnz(), 64, 48, &config);
        assert!(estimate <= layout.stored_bytes());

        let largest = layout.channel_image(0).len().max(layout.channel_image(1).len());
        assert_eq!(ChannelBudget::new(largest).reserve_layout(&layout)?, largest);
        let err = ChannelBudget::new(largest - 1).reserve_layout(&layout).unwrap_err();
        assert!(matches!(err, CodecError::Resource(_)));
        Ok(())
    }

    #[test]
    fn test_queue_bytes_scale_with_depth() {
        let shallow = PipelineConfig::default();
        let deep = shallow.with_queue_depth(8);
        assert_eq!(
            estimate_queue_bytes::<f32>(&deep),
            4 * estimate_queue_bytes::<f32>(&shallow)
        );
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.50 KiB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.00 MiB");
    }
}
