//! Criterion benchmarks for polyvox-core DSP primitives
//!
//! Run with: cargo bench -p polyvox-core
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use polyvox_core::{
    AdsrEnvelope, DrivePosition, EnvelopeConfig, FilterConfig, FilterModulation, Lfo, LfoConfig,
    LfoWaveform, ResponseCurve, SaturationType, StateVariableFilter,
};

const SAMPLE_RATE: f32 = 48000.0;
const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512, 1024];

fn generate_test_signal(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE;
            (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5
        })
        .collect()
}

fn bench_svf(c: &mut Criterion) {
    let mut group = c.benchmark_group("SVF");

    for &block_size in BLOCK_SIZES {
        let input = generate_test_signal(block_size);

        group.bench_with_input(
            BenchmarkId::new("process", block_size),
            &block_size,
            |b, _| {
                let mut svf = StateVariableFilter::new(SAMPLE_RATE, FilterConfig::default());
                b.iter(|| {
                    for &sample in &input {
                        black_box(svf.process_sample(black_box(sample)));
                    }
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("process_driven", block_size),
            &block_size,
            |b, _| {
                let mut svf = StateVariableFilter::new(
                    SAMPLE_RATE,
                    FilterConfig {
                        drive: 0.6,
                        saturation: SaturationType::Tube,
                        drive_position: DrivePosition::Post,
                        ..FilterConfig::default()
                    },
                );
                b.iter(|| {
                    for &sample in &input {
                        black_box(svf.process_sample(black_box(sample)));
                    }
                });
            },
        );
    }

    // Per-block coefficient cost
    group.bench_function("set_modulation", |b| {
        let mut svf = StateVariableFilter::new(SAMPLE_RATE, FilterConfig::default());
        let m = FilterModulation {
            note: 67.0,
            envelope: 0.4,
            lfo: -0.2,
            cutoff: 0.1,
            ..FilterModulation::default()
        };
        b.iter(|| svf.set_modulation(black_box(&m)));
    });

    group.finish();
}

fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("ADSR");

    for &block_size in BLOCK_SIZES {
        group.bench_with_input(
            BenchmarkId::new("advance", block_size),
            &block_size,
            |b, &size| {
                let mut env = AdsrEnvelope::new(SAMPLE_RATE, EnvelopeConfig::default());
                env.gate_on(1.0);
                b.iter(|| {
                    for _ in 0..size {
                        black_box(env.advance());
                    }
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("advance_by", block_size),
            &block_size,
            |b, &size| {
                let mut env = AdsrEnvelope::new(SAMPLE_RATE, EnvelopeConfig::default());
                env.gate_on(1.0);
                b.iter(|| black_box(env.advance_by(black_box(size))));
            },
        );
    }

    group.finish();
}

fn bench_lfo(c: &mut Criterion) {
    let mut group = c.benchmark_group("LFO");

    for waveform in LfoWaveform::ALL {
        group.bench_function(waveform.name(), |b| {
            let mut lfo = Lfo::new(
                SAMPLE_RATE,
                LfoConfig::default().with_rate(3.0).with_waveform(waveform),
            );
            b.iter(|| {
                for _ in 0..256 {
                    black_box(lfo.advance());
                }
            });
        });
    }

    group.finish();
}

fn bench_curves(c: &mut Criterion) {
    let mut group = c.benchmark_group("ResponseCurve");

    for curve in ResponseCurve::ALL {
        group.bench_function(curve.name(), |b| {
            b.iter(|| {
                let mut acc = 0.0;
                for i in -64..64 {
                    acc += curve.apply(black_box(i as f32 / 64.0));
                }
                black_box(acc)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_svf, bench_envelope, bench_lfo, bench_curves);
criterion_main!(benches);
