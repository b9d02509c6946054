//! The synthesizer engine: voices, global modulation sources and the
//! block-level render loop.
//!
//! ## Block order
//!
//! 1. Drain pending [`EngineCommand`]s (control-thread mutations).
//! 2. Split the host buffer into chunks of at most [`MAX_BLOCK_SIZE`].
//! 3. Per chunk, read the global sources (LFO clocks, random, step
//!    sequencer) at the chunk start, render every voice (source snapshot,
//!    router pass, per-sample DSP), then advance the global sources.
//! 4. Apply master gain.
//!
//! Finished voices are reaped by the voices themselves once their amplitude
//! envelope reaches idle.

use alloc::boxed::Box;

use polyvox_core::{BlockRamp, Lfo, MAX_BPM, MIN_BPM, midi_to_freq};

use crate::mod_matrix::{ModulationRouter, ModulationSlot};
use crate::patch::{PatchError, SynthPatch};
use crate::sources::{CcTable, RandomSource, StepSequencer};
use crate::voice::{GlobalSources, VoiceId};
use crate::voice_manager::{MAX_VOICES, VoiceManager};

#[cfg(feature = "std")]
use crate::handle::CommandQueue;

/// Largest chunk rendered in one voice pass. Longer host buffers are split.
pub const MAX_BLOCK_SIZE: usize = 256;
/// Tempo of a freshly created engine.
pub const DEFAULT_BPM: f32 = 120.0;

/// A control-thread mutation applied at the next block boundary.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Start a note.
    NoteOn {
        /// MIDI note number.
        note: u8,
        /// Velocity in `[0, 1]`.
        velocity: f32,
        /// Host timestamp in samples.
        timestamp: u64,
    },
    /// Release every voice playing `note`.
    NoteOff {
        /// MIDI note number.
        note: u8,
    },
    /// Release every voice.
    AllNotesOff,
    /// Change tempo.
    SetBpm(f32),
    /// MIDI controller value, normalized to `[0, 1]`.
    Control {
        /// Controller number.
        cc: u8,
        /// Normalized value.
        value: f32,
    },
    /// Pitch bend in `[-1, 1]`.
    PitchBend(f32),
    /// Channel aftertouch in `[0, 1]`.
    Aftertouch(f32),
    /// Replace the whole patch. The previous patch box is handed back to
    /// the control thread.
    LoadPatch(Box<SynthPatch>),
    /// Replace one modulation slot.
    SetSlot {
        /// Slot index; out-of-range indices are ignored.
        index: usize,
        /// New slot contents.
        slot: ModulationSlot,
    },
}

/// Polyphonic synthesizer engine.
///
/// Owns a pool of [`MAX_VOICES`] voices (the patch's polyphony limits how
/// many sound at once), the modulation router and the engine-wide sources.
/// No method on the render path allocates.
///
/// # Example
///
/// ```rust
/// use polyvox_synth::SynthEngine;
///
/// let mut engine = SynthEngine::new(48000.0);
/// engine.play_note(60, 0.8, 0);
///
/// let mut left = [0.0f32; 512];
/// let mut right = [0.0f32; 512];
/// engine.process_block(&mut left, &mut right);
/// assert!(left.iter().any(|s| *s != 0.0));
///
/// engine.stop_note(60);
/// assert_eq!(engine.active_count(), 1); // still releasing
/// ```
#[derive(Debug)]
pub struct SynthEngine {
    sample_rate: f32,
    bpm: f32,
    patch: Box<SynthPatch>,
    voices: VoiceManager<MAX_VOICES>,
    router: ModulationRouter,
    lfo1: Lfo,
    lfo2: Lfo,
    random: RandomSource,
    step_sequencer: StepSequencer,
    cc: CcTable,
    pitch_bend: f32,
    aftertouch: f32,
    master: BlockRamp,
    sample_clock: u64,
    last_trigger: u64,
    #[cfg(feature = "std")]
    queue: Option<CommandQueue>,
}

impl SynthEngine {
    /// Create an engine playing the default patch.
    pub fn new(sample_rate: f32) -> Self {
        Self::with_patch(sample_rate, SynthPatch::default())
    }

    /// Create an engine playing `patch`.
    ///
    /// The patch is used as given; call [`SynthPatch::validate`] first, or
    /// use [`load_preset`](Self::load_preset), to reject bad values.
    pub fn with_patch(sample_rate: f32, patch: SynthPatch) -> Self {
        let sample_rate = sample_rate.max(1.0);
        let mut lfo1 = Lfo::new(sample_rate, patch.lfo1);
        let mut lfo2 = Lfo::new(sample_rate, patch.lfo2);
        lfo1.set_bpm(DEFAULT_BPM);
        lfo2.set_bpm(DEFAULT_BPM);
        let mut voices = VoiceManager::new(sample_rate, &patch);
        voices.set_bpm(DEFAULT_BPM);

        Self {
            sample_rate,
            bpm: DEFAULT_BPM,
            router: ModulationRouter::from_slots(patch.mod_slots),
            lfo1,
            lfo2,
            random: RandomSource::new(sample_rate, patch.random),
            step_sequencer: StepSequencer::new(sample_rate, patch.step_sequencer),
            cc: CcTable::default(),
            pitch_bend: 0.0,
            aftertouch: 0.0,
            master: BlockRamp::new(patch.master_gain),
            sample_clock: 0,
            last_trigger: 0,
            voices,
            patch: Box::new(patch),
            #[cfg(feature = "std")]
            queue: None,
        }
    }

    /// Connect the audio side of a command channel.
    ///
    /// Commands sent through the paired
    /// [`EngineHandle`](crate::EngineHandle) are applied at the start of
    /// each [`process_block`](Self::process_block).
    #[cfg(feature = "std")]
    pub fn attach(&mut self, queue: CommandQueue) {
        self.queue = Some(queue);
    }

    /// Current sample rate.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Change the sample rate of every voice and source.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate.max(1.0);
        self.voices.set_sample_rate(self.sample_rate);
        self.lfo1.set_sample_rate(self.sample_rate);
        self.lfo2.set_sample_rate(self.sample_rate);
        self.random.set_sample_rate(self.sample_rate);
        self.step_sequencer.set_sample_rate(self.sample_rate);
    }

    /// Current tempo.
    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    /// Set the tempo used by synced LFOs and the step sequencer.
    ///
    /// Clamped to `[MIN_BPM, MAX_BPM]`; non-finite values are ignored.
    pub fn set_bpm(&mut self, bpm: f32) {
        if !bpm.is_finite() {
            return;
        }
        self.bpm = bpm.clamp(MIN_BPM, MAX_BPM);
        self.lfo1.set_bpm(self.bpm);
        self.lfo2.set_bpm(self.bpm);
        self.step_sequencer.set_bpm(self.bpm);
        self.voices.set_bpm(self.bpm);
        #[cfg(feature = "tracing")]
        tracing::debug!(bpm = self.bpm, "tempo changed");
    }

    /// Start a note. `velocity` is clamped to `[0, 1]`, `note` to `0..=127`.
    ///
    /// Always returns a voice; at the polyphony limit one is stolen.
    ///
    /// `timestamp` is a position in samples on the engine clock (see
    /// [`sample_clock`](Self::sample_clock)); it orders triggers for voice
    /// stealing. Releases are stamped on the same clock.
    pub fn play_note(&mut self, note: u8, velocity: f32, timestamp: u64) -> VoiceId {
        let note = note.min(127);
        self.last_trigger = self.last_trigger.max(timestamp);
        self.voices
            .allocate(note, midi_to_freq(f32::from(note)), velocity, timestamp)
    }

    /// Release every voice playing `note`. Unknown notes are ignored.
    pub fn stop_note(&mut self, note: u8) {
        self.voices.release_note(note, self.event_time());
    }

    /// Release one voice by id. Finished or unknown ids are ignored.
    pub fn stop_voice(&mut self, id: VoiceId) {
        self.voices.release(id, self.event_time());
    }

    /// Release every voice.
    pub fn stop_all_notes(&mut self) {
        self.voices.stop_all(self.event_time());
    }

    /// Silence every voice immediately and rewind the global sources.
    pub fn reset(&mut self) {
        self.voices.kill_all();
        self.lfo1.reset();
        self.lfo2.reset();
        self.random.reset();
        self.step_sequencer.reset();
        self.master.reset(self.patch.master_gain);
        self.sample_clock = 0;
        self.last_trigger = 0;
    }

    // A release never lands before a trigger stamped ahead of the render position.
    fn event_time(&self) -> u64 {
        self.sample_clock.max(self.last_trigger)
    }

    /// Voices currently sounding (held or releasing).
    pub fn active_count(&self) -> usize {
        self.voices.active_count()
    }

    /// Voices stolen since construction.
    pub fn steal_count(&self) -> u64 {
        self.voices.steal_count()
    }

    /// Read access to the voice pool.
    pub fn voices(&self) -> &VoiceManager<MAX_VOICES> {
        &self.voices
    }

    /// Samples rendered since construction or the last [`reset`](Self::reset).
    pub fn sample_clock(&self) -> u64 {
        self.sample_clock
    }

    /// Validate and apply a patch.
    ///
    /// Sounding voices pick up the new settings without restarting. On error
    /// the engine is unchanged.
    pub fn load_preset(&mut self, patch: &SynthPatch) -> Result<(), PatchError> {
        patch.validate()?;
        *self.patch = patch.clone();
        self.apply_patch();
        Ok(())
    }

    /// The patch currently playing, including slot edits made through
    /// [`set_slot`](Self::set_slot).
    pub fn save_preset(&self) -> SynthPatch {
        (*self.patch).clone()
    }

    /// Borrow the patch currently playing.
    pub fn patch(&self) -> &SynthPatch {
        &self.patch
    }

    /// The modulation router.
    pub fn router(&self) -> &ModulationRouter {
        &self.router
    }

    /// Replace one modulation slot. Out-of-range indices are ignored.
    pub fn set_slot(&mut self, index: usize, slot: ModulationSlot) {
        self.router.set_slot(index, slot);
        if let Some(stored) = self.router.slot(index) {
            self.patch.mod_slots[index] = *stored;
        }
    }

    /// Set a MIDI controller from a normalized `[0, 1]` value.
    pub fn set_control(&mut self, cc: u8, value: f32) {
        self.cc.set(cc, value);
    }

    /// Set pitch bend in `[-1, 1]` (scaled by the patch's bend range).
    pub fn set_pitch_bend(&mut self, value: f32) {
        self.pitch_bend = if value.is_finite() {
            value.clamp(-1.0, 1.0)
        } else {
            0.0
        };
    }

    /// Set channel aftertouch in `[0, 1]`.
    pub fn set_aftertouch(&mut self, value: f32) {
        self.aftertouch = if value.is_finite() {
            value.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    /// Apply one command immediately.
    pub fn apply(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::NoteOn {
                note,
                velocity,
                timestamp,
            } => {
                self.play_note(note, velocity, timestamp);
            }
            EngineCommand::NoteOff { note } => self.stop_note(note),
            EngineCommand::AllNotesOff => self.stop_all_notes(),
            EngineCommand::SetBpm(bpm) => self.set_bpm(bpm),
            EngineCommand::Control { cc, value } => self.set_control(cc, value),
            EngineCommand::PitchBend(value) => self.set_pitch_bend(value),
            EngineCommand::Aftertouch(value) => self.set_aftertouch(value),
            EngineCommand::LoadPatch(mut patch) => {
                if patch.validate().is_ok() {
                    core::mem::swap(&mut self.patch, &mut patch);
                    self.apply_patch();
                } else {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("rejected invalid patch from command queue");
                }
                self.retire(patch);
            }
            EngineCommand::SetSlot { index, slot } => self.set_slot(index, slot),
        }
    }

    /// Render one stereo block, replacing the contents of `left` and `right`.
    ///
    /// If the slices differ in length only the common prefix is written.
    pub fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        let len = left.len().min(right.len());
        let left = &mut left[..len];
        let right = &mut right[..len];
        left.fill(0.0);
        right.fill(0.0);

        self.drain_commands();

        for (l, r) in left
            .chunks_mut(MAX_BLOCK_SIZE)
            .zip(right.chunks_mut(MAX_BLOCK_SIZE))
        {
            self.render_chunk(l, r);
        }
    }

    /// Render into an interleaved stereo buffer (`L R L R ...`).
    ///
    /// A trailing odd sample is zeroed.
    pub fn process_interleaved(&mut self, buffer: &mut [f32]) {
        let mut left = [0.0f32; MAX_BLOCK_SIZE];
        let mut right = [0.0f32; MAX_BLOCK_SIZE];
        let mut frames = buffer.chunks_exact_mut(2 * MAX_BLOCK_SIZE);
        for chunk in &mut frames {
            self.process_block(&mut left, &mut right);
            interleave(&left, &right, chunk);
        }
        let rest = frames.into_remainder();
        let n = rest.len() / 2;
        if n > 0 {
            self.process_block(&mut left[..n], &mut right[..n]);
            interleave(&left[..n], &right[..n], rest);
        }
        if rest.len() % 2 == 1 {
            rest[rest.len() - 1] = 0.0;
        }
    }

    fn render_chunk(&mut self, left: &mut [f32], right: &mut [f32]) {
        let n = left.len();
        let globals = GlobalSources {
            lfo1: &self.lfo1,
            lfo2: &self.lfo2,
            random: self.random.value(),
            step_sequencer: self.step_sequencer.value(),
            pitch_bend: self.pitch_bend,
            aftertouch: self.aftertouch,
            cc: &self.cc,
        };
        self.voices.render(&globals, &self.router, left, right);

        self.master.begin_block(self.patch.master_gain, n);
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let g = self.master.advance();
            *l *= g;
            *r *= g;
        }

        self.lfo1.advance_by(n);
        self.lfo2.advance_by(n);
        self.random.advance_by(n);
        self.step_sequencer.advance_by(n);
        self.sample_clock += n as u64;
    }

    fn apply_patch(&mut self) {
        let patch = &*self.patch;
        self.router = ModulationRouter::from_slots(patch.mod_slots);
        self.lfo1.update_config(patch.lfo1);
        self.lfo2.update_config(patch.lfo2);
        self.random.update_config(patch.random);
        self.step_sequencer.update_config(patch.step_sequencer);
        self.voices.apply_patch(patch);
        #[cfg(feature = "tracing")]
        tracing::debug!(
            polyphony = patch.polyphony,
            mode = patch.voice_mode.name(),
            slots = patch.active_slot_count(),
            "patch loaded"
        );
    }

    #[cfg(feature = "std")]
    fn drain_commands(&mut self) {
        while let Some(command) = self.queue.as_ref().and_then(CommandQueue::try_next) {
            self.apply(command);
        }
    }

    #[cfg(not(feature = "std"))]
    fn drain_commands(&mut self) {}

    #[cfg(feature = "std")]
    fn retire(&self, patch: Box<SynthPatch>) {
        if let Some(queue) = &self.queue {
            queue.retire(patch);
        }
    }

    #[cfg(not(feature = "std"))]
    fn retire(&self, patch: Box<SynthPatch>) {
        drop(patch);
    }
}

fn interleave(left: &[f32], right: &[f32], out: &mut [f32]) {
    for ((frame, &l), &r) in out.chunks_exact_mut(2).zip(left).zip(right) {
        frame[0] = l;
        frame[1] = r;
    }
}
