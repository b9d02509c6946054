//! Polyvox Core - DSP primitives for the polyvox synthesizer engine
//!
//! This crate provides the per-sample building blocks that a voice is made
//! of, designed for real-time audio with zero allocation in the audio path.
//!
//! # Generators
//!
//! - [`AdsrEnvelope`] - Time-based ADSR with linear or exponential stages
//! - [`Lfo`] - Free-running or tempo-synced LFO with delay and fade-in
//! - [`XorShift32`] - Deterministic PRNG for noise and random modulation
//!
//! # Filtering & Shaping
//!
//! - [`StateVariableFilter`] - Two-integrator SVF with pre/post drive
//! - [`Saturator`] / [`SaturationType`] - Soft, hard, tube and tape curves
//! - [`ResponseCurve`] - Modulation shaping (linear, exponential, log, s-curve)
//!
//! # Modulation Plumbing
//!
//! - [`ModulationSource`] - Common interface over LFOs and envelopes
//! - [`Polarity`] - Bipolar/unipolar mapping for routing slots
//! - [`SyncDivision`] - Musical divisions (`"1/4"`, `"1/8 dotted"`, `"1/16t"`)
//!
//! ## Parameter Smoothing
//!
//! - [`SmoothedParam`] - Exponential smoothing (portamento)
//! - [`BlockRamp`] - Linear ramp across one block of block-rate values
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible. Disable the default `std` feature:
//!
//! ```toml
//! [dependencies]
//! polyvox-core = { version = "0.1", default-features = false }
//! ```
//!
//! Enable `serde` to (de)serialize the config structs, and `tracing` to log
//! from control-path operations.
//!
//! # Example
//!
//! ```rust
//! use polyvox_core::{AdsrEnvelope, EnvelopeConfig, FilterConfig, StateVariableFilter};
//!
//! let mut env = AdsrEnvelope::new(48000.0, EnvelopeConfig::default());
//! let mut filter = StateVariableFilter::new(48000.0, FilterConfig::default());
//!
//! env.gate_on(0.8);
//! let mut out = [0.0f32; 64];
//! for (i, sample) in out.iter_mut().enumerate() {
//!     let x = if i % 32 < 16 { 0.5 } else { -0.5 };
//!     *sample = filter.process_sample(x) * env.advance();
//! }
//! assert!(out.iter().all(|s| s.is_finite()));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

pub mod curve;
pub mod envelope;
pub mod error;
pub mod lfo;
pub mod math;
pub mod modulation;
pub mod param;
pub mod random;
pub mod saturation;
pub mod svf;
pub mod tempo;

// Re-export main types at crate root
pub use curve::ResponseCurve;
pub use envelope::{AdsrEnvelope, EnvelopeConfig, EnvelopeCurve, EnvelopeState};
pub use error::ParseError;
pub use lfo::{Lfo, LfoConfig, LfoWaveform, MAX_LFO_RATE_HZ};
pub use math::{
    cents_to_ratio, constant_power_pan, db_to_linear, flush_denormal, freq_to_midi, hard_clip,
    lerp, linear_to_db, midi_to_freq, seconds_to_samples, semitones_to_ratio, soft_clip,
    tape_clip, tube_clip,
};
pub use modulation::{ModulationSource, Polarity};
pub use param::{BlockRamp, SmoothedParam};
pub use random::XorShift32;
pub use saturation::{SaturationType, Saturator};
pub use svf::{
    DrivePosition, FilterConfig, FilterMode, FilterModulation, MIN_CUTOFF_HZ, MIN_RESONANCE,
    StateVariableFilter,
};
pub use tempo::{DivisionModifier, MAX_BPM, MIN_BPM, SyncDivision};
