//! Integration tests for polyvox-core DSP primitives.
//!
//! Signal-level checks across modules: filter responses measured with sine
//! sweeps, LFO shapes and tempo sync over whole cycles, envelope timing in
//! seconds, and generators driven through the `ModulationSource` trait.

use polyvox_core::{
    AdsrEnvelope, DrivePosition, EnvelopeConfig, EnvelopeState, FilterConfig, FilterMode,
    FilterModulation, Lfo, LfoConfig, LfoWaveform, ModulationSource, Polarity, SaturationType,
    StateVariableFilter, SyncDivision,
};

const SAMPLE_RATE: f32 = 48000.0;
const TAU: f32 = core::f32::consts::TAU;

fn generate_sine(freq_hz: f32, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|n| libm::sinf(TAU * freq_hz * n as f32 / SAMPLE_RATE))
        .collect()
}

fn rms(signal: &[f32]) -> f32 {
    let sum_sq: f32 = signal.iter().map(|&s| s * s).sum();
    libm::sqrtf(sum_sq / signal.len() as f32)
}

fn to_db(linear: f32) -> f32 {
    20.0 * libm::log10f(linear.max(1e-10))
}

// ============================================================================
// 1. Filter frequency responses
// ============================================================================

fn measure_response(config: FilterConfig, freq_hz: f32) -> f32 {
    let num_samples = 9600;
    let settle = 4800;
    let mut filter = StateVariableFilter::new(SAMPLE_RATE, config);
    let input = generate_sine(freq_hz, num_samples);
    let output: Vec<f32> = input.iter().map(|&s| filter.process_sample(s)).collect();
    to_db(rms(&output[settle..]) / rms(&input[settle..]))
}

fn config(mode: FilterMode, cutoff_hz: f32) -> FilterConfig {
    FilterConfig {
        mode,
        cutoff_hz,
        ..FilterConfig::default()
    }
}

#[test]
fn svf_lowpass_frequency_response() {
    let lp = config(FilterMode::Lowpass, 2000.0);
    for &freq in &[50.0, 100.0] {
        let gain = measure_response(lp, freq);
        assert!(gain.abs() < 1.0, "{freq} Hz should pass, got {gain:.1} dB");
    }
    for &freq in &[8000.0, 12000.0] {
        let gain = measure_response(lp, freq);
        assert!(gain < -12.0, "{freq} Hz should be attenuated, got {gain:.1} dB");
    }
}

#[test]
fn svf_highpass_frequency_response() {
    let hp = config(FilterMode::Highpass, 2000.0);
    assert!(measure_response(hp, 50.0) < -24.0);
    let high = measure_response(hp, 12000.0);
    assert!(high.abs() < 2.0, "12 kHz should pass, got {high:.1} dB");
}

#[test]
fn svf_bandpass_peaks_between_extremes() {
    let bp = config(FilterMode::Bandpass, 2000.0);
    let low = measure_response(bp, 50.0);
    let mid = measure_response(bp, 1000.0);
    let high = measure_response(bp, 16000.0);
    assert!(mid > low + 12.0);
    assert!(mid > high + 6.0);
}

#[test]
fn svf_lower_resonance_rings_more() {
    let damped = FilterConfig {
        resonance: 0.707,
        ..config(FilterMode::Bandpass, 1000.0)
    };
    let resonant = FilterConfig {
        resonance: 0.05,
        ..damped
    };
    // Probe at the filter's natural frequency, where the peak sits.
    let mut best_damped = f32::MIN;
    let mut best_resonant = f32::MIN;
    for freq in [300.0, 400.0, 500.0, 600.0, 700.0] {
        best_damped = best_damped.max(measure_response(damped, freq));
        best_resonant = best_resonant.max(measure_response(resonant, freq));
    }
    assert!(best_resonant > best_damped + 6.0);
}

#[test]
fn svf_envelope_sweep_opens_filter() {
    let mut closed = StateVariableFilter::new(
        SAMPLE_RATE,
        FilterConfig {
            cutoff_hz: 200.0,
            env_amount_hz: 8000.0,
            ..FilterConfig::default()
        },
    );
    let mut open = closed.clone();
    open.set_modulation(&FilterModulation {
        envelope: 1.0,
        ..FilterModulation::default()
    });
    closed.set_modulation(&FilterModulation::default());
    assert!(open.cutoff() > closed.cutoff() * 20.0);

    let input = generate_sine(3000.0, 4800);
    let a: Vec<f32> = input.iter().map(|&s| closed.process_sample(s)).collect();
    let b: Vec<f32> = input.iter().map(|&s| open.process_sample(s)).collect();
    assert!(rms(&b[2400..]) > rms(&a[2400..]) * 4.0);
}

#[test]
fn svf_pre_drive_adds_harmonics_post_drive_bounds() {
    let pre = FilterConfig {
        cutoff_hz: 20000.0,
        drive: 1.0,
        saturation: SaturationType::Hard,
        drive_position: DrivePosition::Pre,
        ..FilterConfig::default()
    };
    let mut filter = StateVariableFilter::new(SAMPLE_RATE, pre);
    let out: Vec<f32> = generate_sine(100.0, 4800)
        .iter()
        .map(|&s| filter.process_sample(s))
        .collect();
    let peak = out.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    // Hard clip at 8x pre-gain, compensated by 1/sqrt(8).
    assert!(peak < 0.5, "peak {peak}");
    assert!(peak > 0.25, "peak {peak}");
}

// ============================================================================
// 2. LFO shape and tempo sync
// ============================================================================

fn run_one_cycle(waveform: LfoWaveform, rate_hz: f32) -> Vec<f32> {
    let mut lfo = Lfo::new(
        SAMPLE_RATE,
        LfoConfig::default().with_rate(rate_hz).with_waveform(waveform),
    );
    let samples = (SAMPLE_RATE / rate_hz) as usize;
    (0..samples).map(|_| lfo.advance()).collect()
}

#[test]
fn lfo_sine_peaks_at_plus_minus_one() {
    let cycle = run_one_cycle(LfoWaveform::Sine, 10.0);
    let max = cycle.iter().cloned().fold(f32::MIN, f32::max);
    let min = cycle.iter().cloned().fold(f32::MAX, f32::min);
    assert!((max - 1.0).abs() < 1e-3);
    assert!((min + 1.0).abs() < 1e-3);
}

#[test]
fn lfo_square_duty_cycle_is_half() {
    let cycle = run_one_cycle(LfoWaveform::Square, 10.0);
    let high = cycle.iter().filter(|&&v| v > 0.0).count();
    assert!((high as f32 / cycle.len() as f32 - 0.5).abs() < 0.01);
}

#[test]
fn lfo_saw_rises_then_resets() {
    let cycle = run_one_cycle(LfoWaveform::Saw, 10.0);
    for pair in cycle[..cycle.len() - 1].windows(2) {
        assert!(pair[1] > pair[0]);
    }
}

#[test]
fn lfo_synced_cycle_length_tracks_tempo() {
    // "1/4" at 120 BPM: one cycle every two seconds.
    let division: SyncDivision = "1/4".parse().unwrap();
    let mut lfo = Lfo::new(
        SAMPLE_RATE,
        LfoConfig::default()
            .with_sync(division)
            .with_waveform(LfoWaveform::Saw),
    );
    lfo.set_bpm(120.0);
    assert!((lfo.rate_hz() - 0.5).abs() < 1e-6);

    lfo.advance_by((SAMPLE_RATE * 1.0) as usize);
    assert!((lfo.phase() - 0.5).abs() < 1e-3);

    // Doubling tempo doubles the rate from the current phase.
    lfo.set_bpm(240.0);
    lfo.advance_by((SAMPLE_RATE * 0.5) as usize);
    assert!(lfo.phase() < 1e-3 || lfo.phase() > 0.999);
}

#[test]
fn lfo_dotted_and_triplet_divisions() {
    let cases = [("1/8d", 1.0 / 6.0), ("1/8t", 0.375), ("1/16", 0.125), ("1/2", 1.0)];
    for (label, expected_hz) in cases {
        let division: SyncDivision = label.parse().unwrap();
        assert!(
            (division.to_hz(120.0) - expected_hz).abs() < 1e-5,
            "{label}: {} Hz",
            division.to_hz(120.0)
        );
    }
}

// ============================================================================
// 3. Envelope timing
// ============================================================================

#[test]
fn envelope_default_timing_in_seconds() {
    let mut env = AdsrEnvelope::new(SAMPLE_RATE, EnvelopeConfig::adsr(0.01, 0.1, 0.7, 0.3));
    env.gate_on(0.8);

    env.advance_by(480);
    assert_eq!(env.state(), EnvelopeState::Decay);
    assert!((env.level() - 0.8).abs() < 1e-6);

    env.advance_by(4800);
    assert_eq!(env.state(), EnvelopeState::Sustain);
    assert!((env.level() - 0.56).abs() < 1e-6);

    env.gate_off();
    env.advance_by(14399);
    assert!(env.is_active());
    env.advance();
    assert!(!env.is_active());
}

// ============================================================================
// 4. Sources through the ModulationSource trait
// ============================================================================

#[test]
fn sources_share_one_interface() {
    let mut lfo = Lfo::new(SAMPLE_RATE, LfoConfig::default().with_rate(5.0));
    let mut env = AdsrEnvelope::new(SAMPLE_RATE, EnvelopeConfig::adsr(0.0, 0.0, 0.5, 0.1));
    env.gate_on(1.0);

    let sources: [&mut dyn ModulationSource; 2] = [&mut lfo, &mut env];
    for source in sources {
        for _ in 0..1000 {
            let v = source.mod_advance_bipolar();
            assert!((-1.0..=1.0).contains(&v));
        }
    }
    assert_eq!(env.polarity(), Polarity::Unipolar);
    assert_eq!(lfo.polarity(), Polarity::Bipolar);
}
