// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Decoder configuration.

use crate::codec::config::{ConfigError, LayoutConfig};

/// Configuration of the streaming decode pipeline.
///
/// The decoder carries its own lane geometry; it must agree with the lane
/// count the layout was encoded with.
///
/// # Example
///
/// ```rust
/// use lanespmv_rs::codec::LayoutConfig;
/// use lanespmv_rs::pipeline::PipelineConfig;
///
/// let layout = LayoutConfig::for_lane_count(1, 2, 4, 4);
/// let config = PipelineConfig::for_layout(&layout);
/// assert_eq!(config.lane_count(), 2);
/// assert_eq!(config.queue_depth, 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Memory channels the decoder reads from.
    pub channels: usize,

    /// Lanes per channel.
    pub pack_size: usize,

    /// Capacity of each lane's event queue.
    pub queue_depth: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channels: 1,
            pack_size: 8,
            queue_depth: 2,
        }
    }
}

impl PipelineConfig {
    /// Decoder matching a layout configuration.
    #[must_use]
    pub fn for_layout(layout: &LayoutConfig) -> Self {
        Self {
            channels: layout.channels,
            pack_size: layout.pack_size,
            ..Self::default()
        }
    }

    /// Same configuration with a different queue depth.
    #[must_use]
    pub const fn with_queue_depth(mut self, queue_depth: usize) -> Self {
        self.queue_depth = queue_depth;
        self
    }

    /// Total lanes (`channels * pack_size`).
    #[must_use]
    pub const fn lane_count(&self) -> usize {
        self.channels * self.pack_size
    }

    /// Validate configuration parameters.
    ///
    /// # Errors
    ///
    /// Returns error if any field is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channels == 0 {
            return Err(ConfigError::ZeroChannels);
        }
        if self.pack_size == 0 {
            return Err(ConfigError::ZeroPackSize);
        }
        if self.queue_depth == 0 {
            return Err(ConfigError::ZeroQueueDepth);
        }
        Ok(())
    }
}
