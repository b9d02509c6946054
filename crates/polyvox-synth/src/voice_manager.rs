//! Voice allocation and stealing.
//!
//! The pool is a fixed array created at construction; allocation only
//! re-initializes an existing [`Voice`], so note-ons never touch the heap.
//!
//! ## Steal order
//!
//! When the polyphony limit is reached the manager steals, comparing
//! candidates by, in turn:
//!
//! 1. voices in their release stage before held voices,
//! 2. older trigger time,
//! 3. lower amplitude envelope level,
//! 4. older allocation sequence.
//!
//! The order is total, so stealing is deterministic.

use core::cmp::Ordering;

use crate::mod_matrix::ModulationRouter;
use crate::patch::SynthPatch;
use crate::voice::{GlobalSources, Voice, VoiceId, VoiceMode};

/// Pool capacity of the engine.
pub const MAX_VOICES: usize = 64;
/// Polyphony when none is configured.
pub const DEFAULT_POLYPHONY: usize = 8;
/// Held notes remembered for mono/legato note priority.
pub const NOTE_STACK_SIZE: usize = 16;

/// Held notes, most recent last.
#[derive(Debug, Clone, Copy, Default)]
struct NoteStack {
    notes: [(u8, f32, f32); NOTE_STACK_SIZE],
    len: usize,
}

impl NoteStack {
    /// Push a note (with its frequency and velocity), dropping the oldest
    /// when full. A note already held moves to the top.
    fn push(&mut self, note: u8, frequency: f32, velocity: f32) {
        self.remove(note);
        if self.len == NOTE_STACK_SIZE {
            self.notes.copy_within(1.., 0);
            self.len -= 1;
        }
        self.notes[self.len] = (note, frequency, velocity);
        self.len += 1;
    }

    fn remove(&mut self, note: u8) {
        if let Some(pos) = self.notes[..self.len].iter().position(|n| n.0 == note) {
            self.notes.copy_within(pos + 1..self.len, pos);
            self.len -= 1;
        }
    }

    fn top(&self) -> Option<(u8, f32, f32)> {
        self.len.checked_sub(1).map(|i| self.notes[i])
    }

    fn clear(&mut self) {
        self.len = 0;
    }
}

/// Voice manager for polyphonic synthesis.
///
/// # Example
///
/// ```rust
/// use polyvox_synth::{SynthPatch, VoiceManager};
///
/// let mut manager: VoiceManager<8> = VoiceManager::new(48000.0, &SynthPatch::default());
/// manager.set_polyphony(2);
///
/// manager.allocate(60, 261.63, 0.8, 0);
/// manager.allocate(64, 329.63, 0.8, 1);
/// manager.allocate(67, 392.00, 0.8, 2);
///
/// assert_eq!(manager.active_count(), 2);
/// assert_eq!(manager.steal_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct VoiceManager<const N: usize> {
    voices: [Voice; N],
    polyphony: usize,
    mode: VoiceMode,
    held: NoteStack,
    next_id: u64,
    sequence: u64,
    steal_count: u64,
    last_stolen: Option<VoiceId>,
}

impl<const N: usize> VoiceManager<N> {
    /// Create a manager with `N` idle voices configured from `patch`.
    pub fn new(sample_rate: f32, patch: &SynthPatch) -> Self {
        let mut manager = Self {
            voices: core::array::from_fn(|_| Voice::new(sample_rate, patch)),
            polyphony: DEFAULT_POLYPHONY.min(N).max(1),
            mode: patch.voice_mode,
            held: NoteStack::default(),
            next_id: 1,
            sequence: 0,
            steal_count: 0,
            last_stolen: None,
        };
        manager.set_polyphony(usize::from(patch.polyphony));
        manager
    }

    /// Push a patch to every voice and adopt its mode and polyphony.
    pub fn apply_patch(&mut self, patch: &SynthPatch) {
        for voice in &mut self.voices {
            voice.apply_patch(patch);
        }
        self.set_mode(patch.voice_mode);
        self.set_polyphony(usize::from(patch.polyphony));
    }

    /// Update the sample rate of every voice.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        for voice in &mut self.voices {
            voice.set_sample_rate(sample_rate);
        }
    }

    /// Propagate tempo to every voice.
    pub fn set_bpm(&mut self, bpm: f32) {
        for voice in &mut self.voices {
            voice.set_bpm(bpm);
        }
    }

    /// Pool capacity.
    pub fn capacity(&self) -> usize {
        N
    }

    /// Current polyphony limit.
    pub fn polyphony(&self) -> usize {
        self.polyphony
    }

    /// Set the polyphony limit (clamped to 1..=N).
    ///
    /// Lowering it below the number of sounding voices silences the
    /// excess immediately, in steal order.
    pub fn set_polyphony(&mut self, polyphony: usize) {
        let polyphony = polyphony.clamp(1, N.max(1));
        if polyphony != self.polyphony {
            #[cfg(feature = "tracing")]
            tracing::debug!(from = self.polyphony, to = polyphony, "polyphony changed");
        }
        self.polyphony = polyphony;
        while self.active_count() > self.polyphony {
            match self.steal_candidate() {
                Some(index) => self.steal(index),
                None => break,
            }
        }
    }

    /// Current voice mode.
    pub fn mode(&self) -> VoiceMode {
        self.mode
    }

    /// Switch between poly, mono and legato.
    ///
    /// Changing mode releases everything that is sounding.
    pub fn set_mode(&mut self, mode: VoiceMode) {
        if mode != self.mode {
            #[cfg(feature = "tracing")]
            tracing::debug!(?mode, "voice mode changed");
            self.mode = mode;
            self.stop_all(self.latest_time());
            self.held.clear();
        }
    }

    /// Start a note and return the voice that plays it.
    ///
    /// Never fails: at the polyphony limit a voice is stolen. In mono and
    /// legato modes the sounding voice is retuned and its id returned.
    pub fn allocate(&mut self, note: u8, frequency: f32, velocity: f32, time: u64) -> VoiceId {
        self.held.push(note, frequency, velocity);
        if self.mode.is_monophonic() {
            if let Some(index) = self.sounding_mono_voice() {
                let voice = &mut self.voices[index];
                let retrigger = self.mode == VoiceMode::Mono || !voice.is_gated();
                voice.retune(note, frequency, velocity, time, retrigger);
                return voice.id();
            }
        }

        let limit = if self.mode.is_monophonic() {
            1
        } else {
            self.polyphony
        };
        while self.active_count() >= limit {
            match self.steal_candidate() {
                Some(index) => self.steal(index),
                None => break,
            }
        }

        let index = self.free_slot().unwrap_or(0);
        let id = VoiceId(self.next_id);
        self.next_id += 1;
        self.sequence += 1;
        self.voices[index].start(id, note, frequency, velocity, time, self.sequence);
        id
    }

    /// Release a voice by id. Unknown or finished ids are ignored.
    pub fn release(&mut self, id: VoiceId, time: u64) {
        if let Some(voice) = self.voice_mut(id) {
            let note = voice.note();
            voice.release(time);
            self.held.remove(note);
        }
    }

    /// Note-off by note number.
    ///
    /// Poly: every held voice on that note releases. Mono/legato: if the
    /// note is sounding and others are still held, the voice returns to the
    /// most recent held note; otherwise it releases.
    pub fn release_note(&mut self, note: u8, time: u64) {
        self.held.remove(note);
        if self.mode.is_monophonic() {
            let Some(index) = self.sounding_mono_voice() else {
                return;
            };
            if self.voices[index].note() != note || !self.voices[index].is_gated() {
                return;
            }
            match self.held.top() {
                Some((prev, frequency, velocity)) => {
                    let retrigger = self.mode == VoiceMode::Mono;
                    self.voices[index].retune(prev, frequency, velocity, time, retrigger);
                }
                None => self.voices[index].release(time),
            }
            return;
        }
        for voice in &mut self.voices {
            if voice.is_gated() && voice.note() == note {
                voice.release(time);
            }
        }
    }

    /// Move every sounding voice into release.
    pub fn stop_all(&mut self, time: u64) {
        for voice in &mut self.voices {
            if voice.is_active() {
                voice.release(time);
            }
        }
        self.held.clear();
    }

    /// Silence every voice immediately.
    pub fn kill_all(&mut self) {
        for voice in &mut self.voices {
            voice.kill();
        }
        self.held.clear();
    }

    /// Number of voices producing sound (held or releasing).
    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    /// Voices stolen since construction.
    pub fn steal_count(&self) -> u64 {
        self.steal_count
    }

    /// The most recently stolen voice.
    pub fn last_stolen(&self) -> Option<VoiceId> {
        self.last_stolen
    }

    /// Look up a sounding voice.
    pub fn voice(&self, id: VoiceId) -> Option<&Voice> {
        self.voices.iter().find(|v| v.is_active() && v.id() == id)
    }

    /// Look up a sounding voice mutably.
    pub fn voice_mut(&mut self, id: VoiceId) -> Option<&mut Voice> {
        self.voices.iter_mut().find(|v| v.is_active() && v.id() == id)
    }

    /// Iterate over sounding voices.
    pub fn active_voices(&self) -> impl Iterator<Item = &Voice> {
        self.voices.iter().filter(|v| v.is_active())
    }

    /// Render all sounding voices into `left` / `right` (accumulating).
    pub fn render(
        &mut self,
        globals: &GlobalSources<'_>,
        router: &ModulationRouter,
        left: &mut [f32],
        right: &mut [f32],
    ) {
        for voice in &mut self.voices {
            voice.render(globals, router, left, right);
        }
    }

    fn free_slot(&self) -> Option<usize> {
        self.voices.iter().position(|v| !v.is_active())
    }

    fn sounding_mono_voice(&self) -> Option<usize> {
        self.voices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_active())
            .max_by_key(|(_, v)| v.sequence())
            .map(|(i, _)| i)
    }

    fn steal_candidate(&self) -> Option<usize> {
        self.voices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_active())
            .min_by(|(_, a), (_, b)| steal_order(a, b))
            .map(|(i, _)| i)
    }

    fn steal(&mut self, index: usize) {
        let voice = &mut self.voices[index];
        self.last_stolen = Some(voice.id());
        self.steal_count += 1;
        voice.kill();
    }

    fn latest_time(&self) -> u64 {
        self.voices
            .iter()
            .map(|v| v.release_time().unwrap_or(0).max(v.trigger_time()))
            .max()
            .unwrap_or(0)
    }
}

/// `Less` means `a` is stolen before `b`.
fn steal_order(a: &Voice, b: &Voice) -> Ordering {
    b.is_releasing()
        .cmp(&a.is_releasing())
        .then(a.trigger_time().cmp(&b.trigger_time()))
        .then(a.envelope_value().total_cmp(&b.envelope_value()))
        .then(a.sequence().cmp(&b.sequence()))
}
