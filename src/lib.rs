// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! # lanespmv-rs
//!
//! Lane-interleaved sparse-matrix streaming codec and a token-synchronized
//! sparse matrix-vector product that decodes it.
//!
//! This crate provides:
//!
//! - Row-compressed matrices with reference product and fill generators
//! - Tile partitioning into row × column partitions
//! - Lane-interleaved encoding with row-advance sentinels and a partition table
//! - Per-channel binary images of the layout
//! - A streaming decoder: one loader, one worker per lane, bounded queues
//! - Candle tensor interop and memory estimation utilities
//!
//! ## Quick Start
//!
//! ```rust
//! use lanespmv_rs::codec::{encode_matrix, CsrMatrix, LayoutConfig};
//! use lanespmv_rs::pipeline::{PipelineConfig, SpmvPipeline};
//!
//! let m = CsrMatrix::random(64, 64, 6, 2, 1.0f32, 7)?;
//! let config = LayoutConfig::for_lane_count(2, 4, 32, 32);
//! let layout = encode_matrix(&m, &config)?;
//!
//! let pipeline = SpmvPipeline::new(PipelineConfig::for_layout(&config))?;
//! let x = vec![1.0f32; 64];
//! assert_eq!(pipeline.run(&layout, &x)?, m.spmv_reference(&x)?);
//! # Ok::<(), lanespmv_rs::CodecError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]

pub mod codec;
pub mod error;
pub mod memory;
pub mod pipeline;
pub mod scalar;

pub use error::{CodecError, ErrorKind, Result};
pub use scalar::{Fixed32, Scalar};
