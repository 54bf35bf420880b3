// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Lane round-trip example: encode a sparse matrix, ship its channel
//! images, decode them and multiply.
//!
//! This example shows how to:
//! - Build a matrix with the fill generators and pad it to the lane count
//! - Encode it with a `LayoutConfig`
//! - Serialise and parse per-channel images
//! - Run the streaming pipeline on a candle tensor and check the result
//!
//! Run with: `cargo run --example lane_roundtrip`

use anyhow::Result;
use candle_core::{Device, Tensor};
use lanespmv_rs::codec::{compare_outputs, encode_matrix, CsrMatrix, EncodedMatrix, LayoutConfig};
use lanespmv_rs::memory::{estimate_queue_bytes, format_bytes};
use lanespmv_rs::pipeline::{spmv_tensor, PipelineConfig, SpmvPipeline};

fn main() -> Result<()> {
    println!("=== Lane Round-Trip Example ===\n");

    // Worked example first: a 4x4 matrix over two lanes
    let small = CsrMatrix::from_triplets(
        4,
        4,
        &[(0, 0, 1.0f32), (0, 2, 2.0), (1, 1, 3.0), (2, 2, 4.0), (3, 0, 5.0), (3, 3, 6.0)],
    )?;
    let small_config = LayoutConfig::for_lane_count(1, 2, 4, 4);
    let small_layout = encode_matrix(&small, &small_config)?;
    println!("{small}");
    println!("{}", small_layout.describe_tile(0)?);

    // A larger random matrix, rows rounded up to the lane count
    let config = LayoutConfig {
        channels: 4,
        row_partition_size: 256,
        col_partition_size: 512,
        tile_alignment: 4,
        ..LayoutConfig::default()
    };
    let m = CsrMatrix::random(1000, 1500, 12, 6, 0.25f32, 2026)?.round_dim(config.lane_count(), 1);
    println!("Matrix: {}x{}, {} non-zeros, sparsity {:.4}", m.num_rows(), m.num_cols(), m.nnz(), m.sparsity());

    let layout = encode_matrix(&m, &config)?;
    println!("Encoded: {layout}");
    println!("  Stored: {}", format_bytes(layout.stored_bytes()));

    // Each channel is shipped as its own image
    let images: Vec<Vec<u8>> = (0..config.channels).map(|ch| layout.channel_image(ch)).collect();
    for (ch, image) in images.iter().enumerate() {
        println!("  Channel {ch}: {}", format_bytes(image.len()));
    }
    let received = EncodedMatrix::<f32>::from_channel_images(*layout.geometry(), &images)?;

    let pipeline_config = PipelineConfig::for_layout(&config);
    println!(
        "\nRunning pipeline: {} lanes, queue depth {} ({} in flight)",
        pipeline_config.lane_count(),
        pipeline_config.queue_depth,
        format_bytes(estimate_queue_bytes::<f32>(&pipeline_config))
    );
    let pipeline = SpmvPipeline::new(pipeline_config)?;
    let x = Tensor::ones(m.num_cols(), candle_core::DType::F32, &Device::Cpu)?;
    let y = spmv_tensor(&pipeline, &received, &x)?.to_vec1::<f32>()?;

    let expected = m.spmv_reference(&vec![1.0f32; m.num_cols()])?;
    match compare_outputs(&y, &expected) {
        None => println!("Result matches the reference product ({} rows).", y.len()),
        Some(mismatch) => anyhow::bail!("pipeline disagrees with reference: {mismatch}"),
    }

    Ok(())
}
