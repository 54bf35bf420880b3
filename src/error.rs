// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Error types for lanespmv-rs.

use crate::codec::config::ConfigError;
use thiserror::Error;

/// Result type alias for lanespmv-rs operations.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Coarse classification of a [`CodecError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad sizing or mismatched configuration, detected before any data motion.
    Configuration,
    /// The encoded layout violates the encode/decode contract.
    LayoutCorruption,
    /// The execution environment failed (queues, tensors).
    Resource,
}

/// Errors that can occur in lanespmv-rs operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CodecError {
    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Layout or pipeline configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Encoder and decoder disagree on the number of lanes.
    #[error("lane count mismatch: layout encoded with {encoded} lanes, decoder configured for {configured}")]
    LaneCountMismatch {
        /// Lane count recorded in the layout
        encoded: usize,
        /// Lane count the decoder was configured with
        configured: usize,
    },

    /// A tile's row count is not a multiple of the lane count.
    #[error("row count {rows} is not divisible by lane count {lane_count}")]
    IndivisibleRows {
        /// Number of rows in the offending tile or partition
        rows: usize,
        /// Configured lane count
        lane_count: usize,
    },

    /// Shape mismatch.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Expected shape
        expected: Vec<usize>,
        /// Actual shape
        actual: Vec<usize>,
    },

    /// Row-compressed arrays are inconsistent.
    #[error("invalid matrix: {0}")]
    InvalidMatrix(String),

    /// The stored layout or a lane stream is corrupt.
    #[error("layout corruption: {0}")]
    LayoutCorruption(String),

    /// A non-zero referenced a column outside the block's vector slice.
    #[error("lane {lane}: column index {col} out of range for vector slice of length {len}")]
    ColumnOutOfRange {
        /// Lane that decoded the entry
        lane: usize,
        /// Offending column index as stored
        col: u32,
        /// Length of the vector slice for the block
        len: usize,
    },

    /// Queue or worker failure in the execution environment.
    #[error("resource error: {0}")]
    Resource(String),

    /// Candle error.
    #[error("candle error: {0}")]
    Candle(#[from] candle_core::Error),
}

impl CodecError {
    /// Classify the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfig(_)
            | Self::Config(_)
            | Self::LaneCountMismatch { .. }
            | Self::IndivisibleRows { .. }
            | Self::ShapeMismatch { .. }
            | Self::InvalidMatrix(_) => ErrorKind::Configuration,
            Self::LayoutCorruption(_) | Self::ColumnOutOfRange { .. } => {
                ErrorKind::LayoutCorruption
            }
            Self::Resource(_) | Self::Candle(_) => ErrorKind::Resource,
        }
    }

    /// Whether the error was raised by configuration validation.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self.kind(), ErrorKind::Configuration)
    }

    /// Whether the error indicates a broken layout.
    #[must_use]
    pub const fn is_layout_corruption(&self) -> bool {
        matches!(self.kind(), ErrorKind::LayoutCorruption)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = CodecError::IndivisibleRows {
            rows: 6,
            lane_count: 4,
        };
        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "row count 6 is not divisible by lane count 4");

        let err = CodecError::ColumnOutOfRange {
            lane: 1,
            col: 9,
            len: 4,
        };
        assert!(err.is_layout_corruption());
        assert_eq!(CodecError::Resource("closed".into()).kind(), ErrorKind::Resource);
        assert!(CodecError::from(ConfigError::ZeroChannels).is_configuration());
    }
}
