//! Codec and pipeline benchmarks.
//!
//! - Encode: partition + lane interleave of random matrices
//! - Decode: full streaming SpMV over the encoded layout
//! - Reference: direct row-compressed SpMV, as a baseline
//!
//! Lane geometry is varied to show the cost of more lane workers per row
//! partition against the cost of longer lane streams.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lanespmv_rs::codec::{encode_matrix, CsrMatrix, LayoutConfig};
use lanespmv_rs::pipeline::{PipelineConfig, SpmvPipeline};

/// Matrix sizes (square) and mean non-zeros per row.
const SIZES: &[(usize, usize)] = &[(1024, 8), (4096, 16)];

/// (channels, pack_size) pairs.
const LANE_GEOMETRIES: &[(usize, usize)] = &[(1, 4), (2, 8), (4, 8)];

fn benchmark_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    for &(n, degree) in SIZES {
        let Ok(m) = CsrMatrix::random(n, n, degree, degree / 2, 1.0f32, 42) else {
            continue;
        };
        group.throughput(Throughput::Elements(m.nnz() as u64));
        for &(channels, pack_size) in LANE_GEOMETRIES {
            let config = LayoutConfig::for_lane_count(channels, pack_size, 512, 1024);
            let id = format!("n{n}_d{degree}_l{}", config.lane_count());
            group.bench_with_input(BenchmarkId::new("lanes", &id), &(&m, config), |b, (m, config)| {
                b.iter(|| encode_matrix(m, config));
            });
        }
    }

    group.finish();
}

fn benchmark_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for &(n, degree) in SIZES {
        let Ok(m) = CsrMatrix::random(n, n, degree, degree / 2, 1.0f32, 7) else {
            continue;
        };
        let x = vec![0.5f32; n];
        group.throughput(Throughput::Elements(m.nnz() as u64));

        group.bench_with_input(BenchmarkId::new("reference", n), &m, |b, m| {
            b.iter(|| m.spmv_reference(&x));
        });

        for &(channels, pack_size) in LANE_GEOMETRIES {
            let config = LayoutConfig::for_lane_count(channels, pack_size, 512, 1024);
            let Ok(layout) = encode_matrix(&m, &config) else {
                continue;
            };
            for depth in [2, 64] {
                let Ok(pipeline) =
                    SpmvPipeline::new(PipelineConfig::for_layout(&config).with_queue_depth(depth))
                else {
                    continue;
                };
                let id = format!("n{n}_l{}_q{depth}", config.lane_count());
                group.bench_with_input(BenchmarkId::new("pipeline", &id), &layout, |b, layout| {
                    b.iter(|| pipeline.run(layout, &x));
                });
            }
        }
    }

    group.finish();
}

criterion_group!(benches, benchmark_encode, benchmark_decode);
criterion_main!(benches);
