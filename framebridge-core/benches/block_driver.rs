// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Block driver microbenchmarks.
//!
//! Measures one real-time callback (scatter, lagged gather and clear across
//! every stream) at common host block sizes.

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use framebridge_core::clock::ManualClock;
use framebridge_core::diagnostics;
use framebridge_core::shm::ring::{gather_channel, scatter_channel};
use framebridge_core::shm::{NUM_INPUT_CHANNELS, RING_CAPACITY};
use framebridge_core::{BlockDriver, BridgeConfig, DriverStatus, OwnedScope, SharedChannel};

/// Host block sizes to benchmark (in frames).
const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512, 1024];

/// Benchmark a full active block.
fn bench_active_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_driver_active");
    group.measurement_time(Duration::from_secs(5));

    for &frames in BLOCK_SIZES {
        group.throughput(Throughput::Elements(frames as u64));

        group.bench_with_input(BenchmarkId::from_parameter(frames), &frames, |b, &frames| {
            let config = BridgeConfig::default();
            let clock = Arc::new(ManualClock::new(48_000.0));
            let channel = Arc::new(SharedChannel::in_process());
            channel.control.set_driver_status(DriverStatus::Started);

            let mut driver = BlockDriver::new(&config, Arc::clone(&channel), Arc::clone(&clock));
            let (mut sink, mut drain) = diagnostics::channel("bench", 1024);
            let mut scope = OwnedScope::new(frames);
            for ch in 0..NUM_INPUT_CHANNELS {
                scope.input_mut(ch).fill(0.5);
            }

            b.iter(|| {
                clock.advance(frames as u64);
                channel
                    .control
                    .set_consumer_write_frame(0, driver.frame_number());
                black_box(driver.process(&mut scope, &mut sink));
                // Keep the queue from filling.
                while drain.pop().is_some() {}
            });
        });
    }

    group.finish();
}

/// Benchmark the idle path (consumer not started).
fn bench_idle_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_driver_idle");

    for &frames in BLOCK_SIZES {
        group.throughput(Throughput::Elements(frames as u64));

        group.bench_with_input(BenchmarkId::from_parameter(frames), &frames, |b, &frames| {
            let config = BridgeConfig::default();
            let channel = Arc::new(SharedChannel::in_process());
            let mut driver = BlockDriver::new(&config, channel, ManualClock::new(48_000.0));
            let (mut sink, _drain) = diagnostics::channel("bench", 16);
            let mut scope = OwnedScope::new(frames);

            b.iter(|| black_box(driver.process(&mut scope, &mut sink)));
        });
    }

    group.finish();
}

/// Benchmark a single-channel scatter and gather straddling the ring end.
fn bench_ring_wrap(c: &mut Criterion) {
    let channel = SharedChannel::in_process();
    let input = vec![0.25f32; 512];
    let mut output = vec![0.0f32; 512];
    let start = (RING_CAPACITY - 256) as i64;

    c.bench_function("ring_scatter_gather_wrap", |b| {
        b.iter(|| {
            scatter_channel(channel.down(0), black_box(start), 0, &input);
            gather_channel(channel.down(0), black_box(start), 0, &mut output);
            black_box(output[0]);
        });
    });
}

criterion_group!(benches, bench_active_block, bench_idle_block, bench_ring_wrap);
criterion_main!(benches);
