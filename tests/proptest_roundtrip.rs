//! Property tests: decoding an encoded matrix reproduces the reference
//! product, whatever the lane geometry, partition sizes or padding.

use lanespmv_rs::codec::{encode_matrix, ColumnIndexing, CsrMatrix, LayoutConfig};
use lanespmv_rs::pipeline::{spmv, PipelineConfig};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

/// Arbitrary sparse matrix with up to 48 rows and 40 columns.
fn arb_matrix() -> impl Strategy<Value = CsrMatrix<i32>> {
    (0usize..=48, 1usize..=40).prop_flat_map(|(rows, cols)| {
        let entry = (0..rows.max(1), 0..cols, -9i32..=9);
        prop::collection::vec(entry, 0..=rows * 4).prop_map(move |triplets| {
            let triplets: Vec<_> = triplets.into_iter().filter(|&(r, _, _)| r < rows).collect();
            CsrMatrix::from_triplets(rows, cols, &triplets).unwrap_or_else(|_| CsrMatrix::zeros(rows, cols))
        })
    })
}

/// Arbitrary valid layout: lane geometry, partition sizes, indexing, alignment.
fn arb_config() -> impl Strategy<Value = LayoutConfig> {
    (
        1usize..=3,
        1usize..=4,
        1usize..=4,
        1usize..=24,
        prop_oneof![Just(ColumnIndexing::Global), Just(ColumnIndexing::TileLocal)],
        prop_oneof![3 => Just(1usize), 1 => 2usize..=9],
    )
        .prop_map(|(channels, pack_size, lanes_per_part, cols, indexing, align)| LayoutConfig {
            channels,
            pack_size,
            row_partition_size: channels * pack_size * lanes_per_part,
            col_partition_size: cols,
            column_indexing: indexing,
            tile_alignment: align,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// decode(encode(partition(M))) == M · x, exactly.
    #[test]
    fn prop_round_trip_matches_reference(
        m in arb_matrix(),
        config in arb_config(),
        seed in any::<u64>(),
        depth in 1usize..=4,
    ) {
        let m = m.round_dim(config.lane_count(), 1);
        let x: Vec<i32> = (0..m.num_cols())
            .map(|i| i32::try_from((seed.rotate_left(i as u32 % 64) % 11) as u32).unwrap_or(0) - 5)
            .collect();
        let layout = encode_matrix(&m, &config).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let y = spmv(&layout, &x, &PipelineConfig::for_layout(&config).with_queue_depth(depth))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(y, m.spmv_reference(&x).map_err(|e| TestCaseError::fail(e.to_string()))?);
    }

    /// Tile alignment changes the stored size, never the product.
    #[test]
    fn prop_alignment_is_neutral(m in arb_matrix(), align in 2usize..=16) {
        let base = LayoutConfig::for_lane_count(1, 2, 8, 8);
        let m = m.round_dim(base.lane_count(), 1);
        let aligned = LayoutConfig { tile_alignment: align, ..base };
        let x: Vec<i32> = (0..m.num_cols()).map(|i| i32::try_from(i % 7).unwrap_or(0) - 3).collect();

        let plain = encode_matrix(&m, &base).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let padded = encode_matrix(&m, &aligned).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert!(padded.cursor() >= plain.cursor());
        prop_assert_eq!(plain.table().len(), padded.table().len());

        let pipeline = PipelineConfig::for_layout(&base);
        let a = spmv(&plain, &x, &pipeline).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let b = spmv(&padded, &x, &pipeline).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(a, b);
    }
}
