//! Test utilities and fixtures for codec and pipeline integration tests.
//!
//! This module provides reproducible sparse matrices, operand vectors and
//! layout configurations. All data is derived from hashes of a seed, so
//! every run sees the same inputs.

#![allow(dead_code)]

use anyhow::Result;
use lanespmv_rs::codec::{ColumnIndexing, CsrMatrix, LayoutConfig};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Shape and sparsity of a generated test matrix.
#[derive(Debug, Clone)]
pub struct MatrixScenario {
    /// Rows before rounding to the lane count.
    pub rows: usize,
    /// Columns.
    pub cols: usize,
    /// Mean non-zeros per row.
    pub avg_degree: usize,
    /// Degree spread around the mean.
    pub deg_var: usize,
    /// Seed for pattern and values.
    pub seed: u64,
}

impl Default for MatrixScenario {
    fn default() -> Self {
        Self {
            rows: 64,
            cols: 64,
            avg_degree: 4,
            deg_var: 2,
            seed: 42,
        }
    }
}

/// Test fixtures for common matrix patterns.
pub struct TestFixtures;

impl TestFixtures {
    /// The 4×4 worked example; `A · [1, 1, 1, 1] = [3, 3, 4, 11]`.
    pub fn example_matrix() -> Result<CsrMatrix<i32>> {
        Ok(CsrMatrix::from_triplets(
            4,
            4,
            &[(0, 0, 1), (0, 2, 2), (1, 1, 3), (2, 2, 4), (3, 0, 5), (3, 3, 6)],
        )?)
    }

    /// Random sparsity pattern with small non-zero values in `-8..=8`.
    pub fn sparse_matrix(scenario: &MatrixScenario) -> Result<CsrMatrix<i32>> {
        let pattern = CsrMatrix::random(
            scenario.rows,
            scenario.cols,
            scenario.avg_degree,
            scenario.deg_var,
            1i32,
            scenario.seed,
        )?;
        let values = (0..pattern.nnz())
            .map(|i| Self::small_value(scenario.seed ^ 0x5eed, i))
            .collect();
        Ok(CsrMatrix::new(
            pattern.num_rows(),
            pattern.num_cols(),
            values,
            pattern.col_index().to_vec(),
            pattern.row_offset().to_vec(),
        )?)
    }

    /// Operand vector with values in `-8..=8` (zero allowed).
    pub fn vector(len: usize, seed: u64) -> Vec<i32> {
        (0..len)
            .map(|i| i32::try_from(Self::hashed(seed, i) % 17).unwrap_or(0) - 8)
            .collect()
    }

    /// Common matrix shapes, including ragged last partitions.
    pub fn standard_scenarios() -> Vec<(&'static str, MatrixScenario)> {
        vec![
            ("small_square", MatrixScenario::default()),
            (
                "wide",
                MatrixScenario {
                    rows: 32,
                    cols: 200,
                    avg_degree: 10,
                    deg_var: 4,
                    seed: 43,
                },
            ),
            (
                "tall",
                MatrixScenario {
                    rows: 200,
                    cols: 24,
                    avg_degree: 3,
                    deg_var: 3,
                    seed: 44,
                },
            ),
            (
                "ragged",
                MatrixScenario {
                    rows: 97,
                    cols: 53,
                    avg_degree: 5,
                    deg_var: 5,
                    seed: 45,
                },
            ),
            (
                "very_sparse",
                MatrixScenario {
                    rows: 128,
                    cols: 128,
                    avg_degree: 1,
                    deg_var: 1,
                    seed: 46,
                },
            ),
        ]
    }

    /// Layout configurations over a range of lane geometries.
    pub fn layout_configs() -> Vec<(&'static str, LayoutConfig)> {
        vec![
            ("one_lane", LayoutConfig::for_lane_count(1, 1, 16, 16)),
            ("two_lanes", LayoutConfig::for_lane_count(1, 2, 8, 32)),
            ("four_channels", LayoutConfig::for_lane_count(4, 2, 32, 20)),
            (
                "tile_local",
                LayoutConfig {
                    column_indexing: ColumnIndexing::TileLocal,
                    ..LayoutConfig::for_lane_count(2, 4, 16, 12)
                },
            ),
            (
                "aligned",
                LayoutConfig {
                    tile_alignment: 5,
                    ..LayoutConfig::for_lane_count(2, 2, 24, 64)
                },
            ),
        ]
    }

    fn small_value(seed: u64, i: usize) -> i32 {
        let v = i32::try_from(Self::hashed(seed, i) % 16).unwrap_or(0) - 8;
        // keep non-zeros non-zero
        if v >= 0 {
            v + 1
        } else {
            v
        }
    }

    fn hashed(seed: u64, i: usize) -> u64 {
        let mut hasher = DefaultHasher::new();
        (seed, i).hash(&mut hasher);
        hasher.finish()
    }
}
