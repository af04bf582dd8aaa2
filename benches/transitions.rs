//! Benchmarks for the transition kernels
//!
//! Single-frame blends per transition, plus a full fade window rendered on
//! the worker pool.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use reelsmith::transitions::{Compositor, TransitionRegistry};
use reelsmith::video::types::Frame;

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;

/// A frame with enough variation that no kernel hits a trivial path
fn gradient(seed: u8) -> Frame {
    let mut frame = Frame::new_black(WIDTH, HEIGHT);
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            let r = ((x * 255) / WIDTH) as u8;
            let g = ((y * 255) / HEIGHT) as u8;
            frame.set_pixel(x, y, [r, g, seed]);
        }
    }
    frame
}

fn bench_single_blend(c: &mut Criterion) {
    let registry = TransitionRegistry::new();
    let from = gradient(0);
    let to = gradient(200);

    let mut group = c.benchmark_group("single_blend");
    group.throughput(Throughput::Elements(u64::from(WIDTH * HEIGHT)));

    for name in registry.available() {
        let Some(transition) = registry.get_by_name(&name) else {
            continue;
        };
        group.bench_with_input(BenchmarkId::new(name.as_str(), "720p"), &0.5f32, |b, &alpha| {
            b.iter(|| transition.render(black_box(&from), black_box(&to), black_box(alpha)))
        });
    }
    group.finish();
}

fn bench_transition_window(c: &mut Criterion) {
    let registry = TransitionRegistry::new();
    let pool = Arc::new(
        rayon::ThreadPoolBuilder::new()
            .num_threads(4)
            .build()
            .expect("failed to build bench pool"),
    );
    let compositor = Compositor::new(registry.get_by_name("fade"), pool);
    let from = gradient(0);
    let to = gradient(200);

    // 0.5s at 30 fps
    let alphas: Vec<f32> = (0..15).map(|i| i as f32 / 14.0).collect();

    let mut group = c.benchmark_group("transition_window");
    group.sample_size(20);
    group.throughput(Throughput::Elements(alphas.len() as u64));
    group.bench_function("fade/15_frames", |b| {
        b.iter(|| compositor.render_transition(black_box(&from), black_box(&to), black_box(&alphas)))
    });
    group.finish();
}

criterion_group!(benches, bench_single_blend, bench_transition_window);
criterion_main!(benches);
