// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Streaming decode pipeline.
//!
//! Computes `y = A · x` straight from an [`EncodedMatrix`]. Each row
//! partition runs as one producer and `lane_count` lane workers joined by
//! bounded queues:
//!
//! ```text
//!              +--> [queue 0] --> lane 0 --+
//!   loader ----+--> [queue 1] --> lane 1 --+--> join --> drain into y
//!              +--> [queue L-1] -> lane L-1+
//! ```
//!
//! The loader blocks on a full queue, so memory stays bounded by
//! `lane_count * queue_depth` events. The first failure from any task
//! aborts the whole run; no partial output is returned.
//!
//! ## Example
//!
//! ```rust
//! use lanespmv_rs::codec::{encode_matrix, CsrMatrix, LayoutConfig};
//! use lanespmv_rs::pipeline::{spmv, PipelineConfig};
//!
//! let m = CsrMatrix::from_triplets(
//!     4,
//!     4,
//!     &[(0, 0, 1i32), (0, 2, 2), (1, 1, 3), (2, 2, 4), (3, 0, 5), (3, 3, 6)],
//! )?;
//! let layout_config = LayoutConfig::for_lane_count(1, 2, 4, 4);
//! let layout = encode_matrix(&m, &layout_config)?;
//! let y = spmv(&layout, &[1, 1, 1, 1], &PipelineConfig::for_layout(&layout_config))?;
//! assert_eq!(y, vec![3, 3, 4, 11]);
//! # Ok::<(), lanespmv_rs::CodecError>(())
//! ```

pub mod config;
pub mod interop;
pub mod lane;
pub mod loader;
pub mod token;

use std::sync::OnceLock;
use std::thread;

use crossbeam_channel::bounded;

pub use config::PipelineConfig;
pub use interop::spmv_tensor;
pub use lane::{LaneState, LaneWorker};
pub use token::{LaneEvent, VectorSlice};

use crate::codec::layout::EncodedMatrix;
use crate::error::{CodecError, Result};
use crate::scalar::Scalar;

/// First-error-wins cancellation shared by the loader and the lanes.
#[derive(Debug, Default)]
pub struct AbortSignal {
    first: OnceLock<CodecError>,
}

impl AbortSignal {
    /// Whether a failure has been recorded.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.first.get().is_some()
    }

    /// Record a failure; later failures are dropped.
    pub fn record(&self, error: CodecError) {
        if let Err(later) = self.first.set(error) {
            tracing::debug!("suppressed follow-on failure: {later}");
        }
    }

    /// The recorded failure, if any.
    #[must_use]
    pub fn into_error(self) -> Option<CodecError> {
        self.first.into_inner()
    }
}

/// Sparse matrix-vector product over a lane-interleaved layout.
#[derive(Debug, Clone)]
pub struct SpmvPipeline {
    config: PipelineConfig,
}

impl SpmvPipeline {
    /// Create a pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Pipeline configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Compute `layout · x`.
    ///
    /// Lane count, vector length and the partition table are all checked
    /// before any record is read.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - the layout's lane count differs from the configured one
    /// - `x.len()` differs from the matrix width
    /// - the table or a lane stream is corrupt
    /// - a lane worker cannot be spawned or panics
    pub fn run<T: Scalar>(&self, layout: &EncodedMatrix<T>, x: &[T]) -> Result<Vec<T>> {
        let geometry = *layout.geometry();
        let lane_count = self.config.lane_count();
        if geometry.lane_count() != lane_count {
            return Err(CodecError::LaneCountMismatch {
                encoded: geometry.lane_count(),
                configured: lane_count,
            });
        }
        if x.len() != geometry.num_cols {
            return Err(CodecError::ShapeMismatch {
                expected: vec![geometry.num_cols],
                actual: vec![x.len()],
            });
        }
        loader::check_table(layout)?;

        let mut y = vec![T::ZERO; geometry.num_rows];
        for i in 0..geometry.num_row_partitions() {
            let rows = geometry.partition_rows(i);
            let base = i * geometry.row_partition_size;
            let partials = self.run_row_partition(layout, x, i, rows)?;

            // drain: lane k owns local rows k, k + L, ...
            for (k, lane) in partials.into_iter().enumerate() {
                for (j, value) in lane.into_iter().enumerate() {
                    y[base + k + j * lane_count] = value;
                }
            }
            tracing::debug!(row_partition = i, rows, "row partition drained");
        }
        Ok(y)
    }

    fn run_row_partition<T: Scalar>(
        &self,
        layout: &EncodedMatrix<T>,
        x: &[T],
        row_partition: usize,
        rows: usize,
    ) -> Result<Vec<Vec<T>>> {
        let lane_count = self.config.lane_count();
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..lane_count)
            .map(|_| bounded(self.config.queue_depth))
            .unzip();
        let abort = AbortSignal::default();

        let outputs: Vec<Option<Vec<T>>> = thread::scope(|s| {
            let abort = &abort;
            let mut handles = Vec::with_capacity(lane_count);
            for (k, events) in receivers.into_iter().enumerate() {
                let spawned = thread::Builder::new()
                    .name(format!("lane-{k}"))
                    .spawn_scoped(s, move || {
                        match LaneWorker::new(k, lane_count, rows).run(&events) {
                            Ok(partials) => Some(partials),
                            Err(e) => {
                                tracing::warn!(lane = k, "lane failed: {e}");
                                // recorded before the queue closes, so the loader sees the abort
                                abort.record(e);
                                None
                            }
                        }
                    });
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(e) => {
                        abort.record(CodecError::Resource(format!("cannot spawn lane {k}: {e}")));
                        break;
                    }
                }
            }

            if abort.is_set() {
                drop(senders);
            } else if let Err(e) = loader::stream_row_partition(layout, x, row_partition, senders, abort) {
                abort.record(e);
            }

            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        abort.record(CodecError::Resource("lane worker panicked".into()));
                        None
                    })
                })
                .collect()
        });

        if let Some(error) = abort.into_error() {
            tracing::warn!(row_partition, "pipeline aborted: {error}");
            return Err(error);
        }
        outputs
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| CodecError::Resource("lane finished without output".into()))
    }
}

/// Compute `layout · x` with a one-off pipeline.
///
/// # Errors
///
/// See [`SpmvPipeline::new`] and [`SpmvPipeline::run`].
pub fn spmv<T: Scalar>(layout: &EncodedMatrix<T>, x: &[T], config: &PipelineConfig) -> Result<Vec<T>> {
    SpmvPipeline::new(*config)?.run(layout, x)
}
