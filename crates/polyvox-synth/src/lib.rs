//! Polyvox Synth - Polyphonic synthesis engine
//!
//! This crate turns the DSP primitives of `polyvox-core` into a playable
//! instrument: voices with two oscillators, unison, a filter and three
//! envelopes; a pool that allocates and steals them; a 16-slot modulation
//! router; and an engine that renders blocks for a host.
//!
//! # Core Components
//!
//! ## Voices
//!
//! - [`Voice`] - One note: oscillators, unison stack, filter, envelopes, LFOs
//! - [`VoiceManager`] - Fixed pool with deterministic stealing and mono/legato
//! - [`VoiceMode`] - Poly, mono (retrigger) or legato (no retrigger)
//!
//! ## Modulation
//!
//! - [`ModulationRouter`] - 16 slots, evaluated once per voice per block
//! - [`ModSource`] / [`ModDestination`] - Closed source and destination sets
//! - [`RandomSource`] / [`StepSequencer`] - Engine-wide modulation sources
//!
//! ```rust
//! use polyvox_synth::{ModDestination, ModSource, ModulationRouter, ModulationSlot};
//!
//! let mut router = ModulationRouter::new();
//! router.set_slot(
//!     0,
//!     ModulationSlot::new(ModSource::Lfo1, ModDestination::FilterCutoff, 0.4),
//! );
//! assert_eq!(router.active_slot_count(), 1);
//! ```
//!
//! ## Engine
//!
//! - [`SynthEngine`] - Block renderer; owns voices, router and global sources
//! - [`SynthPatch`] - Complete sound description, validated with [`PatchError`]
//! - [`EngineHandle`] / [`command_channel`] - Lock-free control-thread access
//!   (`std` only)
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible (it needs `alloc`). Disable the default
//! `std` feature:
//!
//! ```toml
//! [dependencies]
//! polyvox-synth = { version = "0.1", default-features = false }
//! ```
//!
//! Without `std` the command queue is unavailable; call
//! [`SynthEngine::apply`] directly between blocks instead.
//!
//! # Example: Playing a Chord
//!
//! ```rust
//! use polyvox_synth::{OscillatorWaveform, SynthEngine, SynthPatch, UnisonConfig};
//!
//! let mut patch = SynthPatch::default();
//! patch.osc1.waveform = OscillatorWaveform::Saw;
//! patch.unison = UnisonConfig::stack(3, 15.0);
//! patch.filter.cutoff_hz = 2000.0;
//!
//! let mut engine = SynthEngine::new(48000.0);
//! engine.load_preset(&patch).unwrap();
//!
//! for note in [60, 64, 67] {
//!     engine.play_note(note, 0.8, 0);
//! }
//!
//! let mut left = vec![0.0; 1024];
//! let mut right = vec![0.0; 1024];
//! engine.process_block(&mut left, &mut right);
//! assert_eq!(engine.active_count(), 3);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod engine;
#[cfg(feature = "std")]
pub mod handle;
pub mod mod_matrix;
pub mod oscillator;
pub mod patch;
pub mod sources;
pub mod unison;
pub mod voice;
pub mod voice_manager;

// Re-export main types at crate root
pub use engine::{EngineCommand, MAX_BLOCK_SIZE, SynthEngine};
#[cfg(feature = "std")]
pub use handle::{CommandQueue, EngineHandle, HandleError, command_channel};
pub use mod_matrix::{
    DestinationValues, MOD_SLOTS, ModDestination, ModulationRouter, ModulationSlot,
};
pub use oscillator::{Oscillator, OscillatorConfig, OscillatorWaveform};
pub use patch::{PatchError, SynthPatch};
pub use sources::{
    CcTable, MOD_WHEEL_CC, ModSource, RandomConfig, RandomSource, SourceValues, StepSequencer,
    StepSequencerConfig,
};
pub use unison::{UnisonConfig, UnisonLayout, UnisonProcessor, UnisonVoice};
pub use voice::{GlobalSources, Voice, VoiceId, VoiceMode};
pub use voice_manager::{MAX_VOICES, VoiceManager};

// Re-export commonly used types from polyvox-core
pub use polyvox_core::{
    EnvelopeConfig, EnvelopeState, FilterConfig, FilterMode, LfoConfig, LfoWaveform,
    ResponseCurve, SyncDivision, midi_to_freq,
};
