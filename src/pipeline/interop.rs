// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Candle tensor interop.
//!
//! ## Key Functions
//!
//! - [`spmv_tensor`] - Run the pipeline on a 1-D tensor, return a 1-D tensor
//! - [`CsrMatrix::from_dense_tensor`] - Build a sparse matrix from a 2-D tensor
//!
//! Only scalar types candle can hold are supported (`f32`, `u32`).
//! Results are placed on the input tensor's device.

use candle_core::{Tensor, WithDType};

use super::SpmvPipeline;
use crate::codec::csr::CsrMatrix;
use crate::codec::layout::EncodedMatrix;
use crate::error::{CodecError, Result};
use crate::scalar::Scalar;

/// Compute `layout · x` for a 1-D tensor `x`.
///
/// # Errors
///
/// Returns [`CodecError::ShapeMismatch`] if `x` is not 1-D, a candle error
/// if its dtype differs from `T`, and any pipeline error.
pub fn spmv_tensor<T: Scalar + WithDType>(
    pipeline: &SpmvPipeline,
    layout: &EncodedMatrix<T>,
    x: &Tensor,
) -> Result<Tensor> {
    if x.rank() != 1 {
        return Err(CodecError::ShapeMismatch {
            expected: vec![layout.geometry().num_cols],
            actual: x.dims().to_vec(),
        });
    }
    let operands = x.to_vec1::<T>()?;
    let y = pipeline.run(layout, &operands)?;
    let len = y.len();
    Ok(Tensor::from_vec(y, len, x.device())?)
}

impl<T: Scalar + WithDType> CsrMatrix<T> {
    /// Sparse copy of a 2-D tensor; entries equal to zero are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::ShapeMismatch`] if the tensor is not 2-D and a
    /// candle error if its dtype differs from `T`.
    pub fn from_dense_tensor(tensor: &Tensor) -> Result<Self> {
        let &[num_rows, num_cols] = tensor.dims() else {
            return Err(CodecError::ShapeMismatch {
                expected: vec![0, 0],
                actual: tensor.dims().to_vec(),
            });
        };
        let rows = tensor.to_vec2::<T>()?;
        let mut triplets = Vec::new();
        for (r, row) in rows.iter().enumerate() {
            for (c, &v) in row.iter().enumerate() {
                if v != <T as Scalar>::ZERO {
                    triplets.push((r, c, v));
                }
            }
        }
        Self::from_triplets(num_rows, num_cols, &triplets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{encode_matrix, LayoutConfig};
    use crate::pipeline::PipelineConfig;
    use candle_core::Device;

    #[test]
    fn test_tensor_round_trip() -> Result<()> {
        let device = Device::Cpu;
        let dense = Tensor::new(
            &[
                [1.0f32, 0.0, 2.0, 0.0],
                [0.0, 3.0, 0.0, 0.0],
                [0.0, 0.0, 4.0, 0.0],
                [5.0, 0.0, 0.0, 6.0],
            ],
            &device,
        )?;
        let m = CsrMatrix::<f32>::from_dense_tensor(&dense)?;
        assert_eq!(m.nnz(), 6);

        let config = LayoutConfig::for_lane_count(1, 2, 4, 4);
        let layout = encode_matrix(&m, &config)?;
        let pipeline = SpmvPipeline::new(PipelineConfig::for_layout(&config))?;
        let x = Tensor::ones(4, candle_core::DType::F32, &device)?;
        let y = spmv_tensor(&pipeline, &layout, &x)?;
        assert_eq!(y.to_vec1::<f32>()?, vec![3.0, 3.0, 4.0, 11.0]);
        Ok(())
    }

    #[test]
    fn test_rank_checked() -> Result<()> {
        let device = Device::Cpu;
        let x = Tensor::zeros((2, 2), candle_core::DType::U32, &device)?;
        assert!(matches!(
            CsrMatrix::<u32>::from_dense_tensor(&Tensor::zeros(4, candle_core::DType::U32, &device)?),
            Err(CodecError::ShapeMismatch { .. })
        ));
        let m = CsrMatrix::<u32>::zeros(4, 2);
        let config = LayoutConfig::for_lane_count(1, 2, 4, 2);
        let layout = encode_matrix(&m, &config)?;
        let pipeline = SpmvPipeline::new(PipelineConfig::for_layout(&config))?;
        assert!(spmv_tensor(&pipeline, &layout, &x).is_err());
        Ok(())
    }
}
