//! Criterion benchmarks for chain resynthesis and route execution.
//!
//! Measures graph overhead independently of DSP cost using a trivial `Scale`
//! node. Two axes:
//!
//! - **Rebuild**: full resynthesis (remove all, add all, Kahn sort, publish)
//! - **Execute**: `process_block()` throughput at varying block sizes
//!
//! Run with: `cargo bench -p rack-core -- routing/`
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rack_core::{AudioNode, ChainController, InsertPosition, RoutingMode};

const SAMPLE_RATE: f32 = 48000.0;
const BLOCK_SIZE: usize = 256;
const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512, 1024];

struct Scale(f32);

impl AudioNode for Scale {
    fn name(&self) -> &str {
        "Scale"
    }

    fn prepare(&mut self, _sample_rate: f32, _block_size: usize) {}

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            *l *= self.0;
            *r *= self.0;
        }
    }

    fn reset(&mut self) {}
}

fn make_chain(n: usize, block_size: usize) -> ChainController {
    let mut chain = ChainController::new(SAMPLE_RATE, block_size).unwrap();
    for _ in 0..n {
        chain
            .insert_node(Box::new(Scale(0.9)), InsertPosition::Append)
            .unwrap();
    }
    chain
}

fn bench_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("routing/rebuild");

    for n in [1, 5, 20] {
        let mut chain = make_chain(n, BLOCK_SIZE);
        group.bench_with_input(BenchmarkId::new("linear", n), &n, |b, _| {
            b.iter(|| black_box(chain.resynthesize().unwrap()));
        });
    }

    // Every other entry bypassed, forced mono
    {
        let mut chain = make_chain(20, BLOCK_SIZE);
        for i in (0..20).step_by(2) {
            chain.set_bypass(i, true).unwrap();
        }
        chain.set_routing_mode(RoutingMode::ForcedMono).unwrap();
        group.bench_function("sparse_mono_20", |b| {
            b.iter(|| black_box(chain.resynthesize().unwrap()));
        });
    }

    group.finish();
}

fn bench_execute(c: &mut Criterion) {
    let mut group = c.benchmark_group("routing/execute");

    for &block_size in BLOCK_SIZES {
        let chain = make_chain(5, block_size);
        let mut processor = chain.processor();
        let left_in = vec![0.5f32; block_size];
        let right_in = vec![0.5f32; block_size];
        let mut left_out = vec![0.0f32; block_size];
        let mut right_out = vec![0.0f32; block_size];

        group.bench_with_input(
            BenchmarkId::new("linear_5", block_size),
            &block_size,
            |b, _| {
                b.iter(|| {
                    processor.process_block(
                        black_box(&left_in),
                        black_box(&right_in),
                        &mut left_out,
                        &mut right_out,
                    );
                    black_box((&left_out, &right_out));
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_rebuild, bench_execute);
criterion_main!(benches);
