//! Criterion benchmarks for polyvox-synth components
//!
//! Run with: cargo bench -p polyvox-synth

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use polyvox_synth::{
    ModDestination, ModSource, ModulationRouter, ModulationSlot, Oscillator, OscillatorWaveform,
    SourceValues, SynthEngine, SynthPatch, UnisonConfig, sources::CcTable,
};

const SAMPLE_RATE: f32 = 48000.0;
const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512, 1024];

// ============================================================================
// Oscillator benchmarks
// ============================================================================

fn bench_oscillator_waveforms(c: &mut Criterion) {
    let mut group = c.benchmark_group("Oscillator");

    for waveform in OscillatorWaveform::ALL {
        let mut osc = Oscillator::new(SAMPLE_RATE);
        osc.set_frequency(440.0);
        osc.set_waveform(waveform);

        group.bench_with_input(BenchmarkId::new(waveform.name(), 256), &256, |b, &size| {
            b.iter(|| {
                let mut sum = 0.0f32;
                for _ in 0..size {
                    sum += osc.advance();
                }
                black_box(sum)
            })
        });
    }

    group.finish();
}

// ============================================================================
// Router benchmarks
// ============================================================================

fn bench_router(c: &mut Criterion) {
    let mut group = c.benchmark_group("ModulationRouter");
    let cc = CcTable::default();
    let mut sources = SourceValues::new(&cc);
    sources.lfo1 = 0.3;
    sources.velocity = 0.8;

    for active in [0usize, 4, 16] {
        let mut router = ModulationRouter::new();
        for i in 0..active {
            let dst = ModDestination::ALL[i % ModDestination::COUNT];
            router.set_slot(i, ModulationSlot::new(ModSource::Lfo1, dst, 0.5));
        }
        group.bench_with_input(BenchmarkId::new("slots", active), &active, |b, _| {
            b.iter(|| black_box(router.process(black_box(&sources))));
        });
    }

    group.finish();
}

// ============================================================================
// Engine benchmarks
// ============================================================================

fn chord_engine(voices: u8, unison: u8) -> SynthEngine {
    let mut patch = SynthPatch::default();
    patch.polyphony = voices;
    if unison > 1 {
        patch.unison = UnisonConfig::stack(unison, 20.0);
    }
    patch.mod_slots[0] = ModulationSlot::new(ModSource::Lfo1, ModDestination::FilterCutoff, 0.3);
    let mut engine = SynthEngine::new(SAMPLE_RATE);
    // Default-derived patch is known valid
    let _ = engine.load_preset(&patch);
    for i in 0..voices {
        engine.play_note(48 + i * 3, 0.8, 0);
    }
    engine
}

fn bench_engine_block_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("SynthEngine_8voices");

    for &block_size in BLOCK_SIZES {
        let mut engine = chord_engine(8, 1);
        let mut left = vec![0.0f32; block_size];
        let mut right = vec![0.0f32; block_size];

        group.bench_with_input(
            BenchmarkId::from_parameter(block_size),
            &block_size,
            |b, _| {
                b.iter(|| {
                    engine.process_block(&mut left, &mut right);
                    black_box(left[0])
                })
            },
        );
    }

    group.finish();
}

fn bench_engine_polyphony(c: &mut Criterion) {
    let mut group = c.benchmark_group("SynthEngine_Polyphony");

    for voices in [1u8, 4, 8, 16, 32] {
        for unison in [1u8, 4] {
            let mut engine = chord_engine(voices, unison);
            let mut left = [0.0f32; 256];
            let mut right = [0.0f32; 256];
            group.bench_function(format!("{voices}v_x{unison}"), |b| {
                b.iter(|| {
                    engine.process_block(&mut left, &mut right);
                    black_box(right[255])
                })
            });
        }
    }

    group.finish();
}

fn bench_note_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("SynthEngine_Stealing");

    group.bench_function("note_on_at_limit", |b| {
        let mut engine = chord_engine(8, 1);
        let mut note = 0u8;
        b.iter(|| {
            note = (note + 1) % 128;
            black_box(engine.play_note(note, 0.7, 0))
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_oscillator_waveforms,
    bench_router,
    bench_engine_block_sizes,
    bench_engine_polyphony,
    bench_note_churn,
);
criterion_main!(benches);
