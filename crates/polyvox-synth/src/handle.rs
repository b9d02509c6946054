//! Control-thread handle and the lock-free command queue it feeds.
//!
//! ```rust
//! use polyvox_synth::{SynthEngine, SynthPatch, command_channel};
//!
//! let (handle, queue) = command_channel(64);
//! let mut engine = SynthEngine::new(48000.0);
//! engine.attach(queue);
//!
//! handle.note_on(60, 0.8, 0).unwrap();
//! handle.load_patch(&SynthPatch::default()).unwrap();
//!
//! // Audio thread
//! let mut left = [0.0f32; 256];
//! let mut right = [0.0f32; 256];
//! engine.process_block(&mut left, &mut right);
//! assert_eq!(engine.active_count(), 1);
//!
//! // Control thread: free the patch the engine replaced
//! assert_eq!(handle.collect_garbage(), 1);
//! ```

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};
use thiserror::Error;

use crate::engine::EngineCommand;
use crate::mod_matrix::ModulationSlot;
use crate::patch::{PatchError, SynthPatch};

/// Error returned when a command cannot be queued.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum HandleError {
    /// The queue is full; the audio thread has not drained it yet.
    #[error("command queue is full")]
    QueueFull,
    /// The engine side has been dropped.
    #[error("engine is disconnected")]
    Disconnected,
    /// The patch failed validation and was not sent.
    #[error("invalid patch: {0}")]
    InvalidPatch(#[from] PatchError),
}

/// Create a bounded command channel.
///
/// `capacity` bounds both the command queue and the queue of retired
/// patches returned to the control thread.
pub fn command_channel(capacity: usize) -> (EngineHandle, CommandQueue) {
    let capacity = capacity.max(1);
    let (commands_tx, commands_rx) = bounded(capacity);
    let (retired_tx, retired_rx) = bounded(capacity);
    (
        EngineHandle {
            commands: commands_tx,
            retired: retired_rx,
        },
        CommandQueue {
            commands: commands_rx,
            retired: retired_tx,
        },
    )
}

/// Control-thread side: sends commands, receives replaced patches.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    commands: Sender<EngineCommand>,
    retired: Receiver<Box<SynthPatch>>,
}

impl EngineHandle {
    /// Queue a command without blocking.
    pub fn send(&self, command: EngineCommand) -> Result<(), HandleError> {
        self.commands.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("engine command queue full, dropping command");
                HandleError::QueueFull
            }
            TrySendError::Disconnected(_) => HandleError::Disconnected,
        })
    }

    /// Queue a note-on.
    pub fn note_on(&self, note: u8, velocity: f32, timestamp: u64) -> Result<(), HandleError> {
        self.send(EngineCommand::NoteOn {
            note,
            velocity,
            timestamp,
        })
    }

    /// Queue a note-off.
    pub fn note_off(&self, note: u8) -> Result<(), HandleError> {
        self.send(EngineCommand::NoteOff { note })
    }

    /// Queue a release of every voice.
    pub fn all_notes_off(&self) -> Result<(), HandleError> {
        self.send(EngineCommand::AllNotesOff)
    }

    /// Queue a tempo change.
    pub fn set_bpm(&self, bpm: f32) -> Result<(), HandleError> {
        self.send(EngineCommand::SetBpm(bpm))
    }

    /// Queue a controller change (normalized value).
    pub fn set_control(&self, cc: u8, value: f32) -> Result<(), HandleError> {
        self.send(EngineCommand::Control { cc, value })
    }

    /// Queue a pitch bend change.
    pub fn set_pitch_bend(&self, value: f32) -> Result<(), HandleError> {
        self.send(EngineCommand::PitchBend(value))
    }

    /// Queue an aftertouch change.
    pub fn set_aftertouch(&self, value: f32) -> Result<(), HandleError> {
        self.send(EngineCommand::Aftertouch(value))
    }

    /// Replace one modulation slot.
    pub fn set_slot(&self, index: usize, slot: ModulationSlot) -> Result<(), HandleError> {
        self.send(EngineCommand::SetSlot { index, slot })
    }

    /// Validate `patch` and queue it as a boxed snapshot.
    ///
    /// The box is allocated here, on the control thread.
    pub fn load_patch(&self, patch: &SynthPatch) -> Result<(), HandleError> {
        patch.validate()?;
        self.send(EngineCommand::LoadPatch(Box::new(patch.clone())))
    }

    /// Drop every patch the engine has handed back. Returns how many.
    pub fn collect_garbage(&self) -> usize {
        let mut count = 0;
        loop {
            match self.retired.try_recv() {
                Ok(patch) => {
                    drop(patch);
                    count += 1;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        count
    }
}

/// Audio-thread side, owned by the engine via
/// [`SynthEngine::attach`](crate::SynthEngine::attach).
#[derive(Debug)]
pub struct CommandQueue {
    commands: Receiver<EngineCommand>,
    retired: Sender<Box<SynthPatch>>,
}

impl CommandQueue {
    pub(crate) fn try_next(&self) -> Option<EngineCommand> {
        self.commands.try_recv().ok()
    }

    /// Hand a replaced patch back. If the control thread is not collecting
    /// and the queue is full, the box is dropped here instead.
    pub(crate) fn retire(&self, patch: Box<SynthPatch>) {
        if let Err(e) = self.retired.try_send(patch) {
            drop(e.into_inner());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SynthEngine;
    use crate::mod_matrix::ModDestination;
    use crate::sources::ModSource;

    fn block(engine: &mut SynthEngine) {
        let mut l = [0.0f32; 128];
        let mut r = [0.0f32; 128];
        engine.process_block(&mut l, &mut r);
    }

    #[test]
    fn test_commands_applied_at_block_start() {
        let (handle, queue) = command_channel(16);
        let mut engine = SynthEngine::new(48000.0);
        engine.attach(queue);

        handle.note_on(60, 1.0, 0).unwrap();
        handle.note_on(64, 1.0, 0).unwrap();
        assert_eq!(engine.active_count(), 0);
        block(&mut engine);
        assert_eq!(engine.active_count(), 2);

        handle.set_bpm(90.0).unwrap();
        handle.all_notes_off().unwrap();
        block(&mut engine);
        assert_eq!(engine.bpm(), 90.0);
        assert!(engine.voices().active_voices().all(|v| v.is_releasing()));
    }

    #[test]
    fn test_queue_full() {
        let (handle, _queue) = command_channel(2);
        handle.note_off(1).unwrap();
        handle.note_off(2).unwrap();
        assert_eq!(handle.note_off(3), Err(HandleError::QueueFull));
    }

    #[test]
    fn test_disconnected() {
        let (handle, queue) = command_channel(2);
        drop(queue);
        assert_eq!(handle.note_off(1), Err(HandleError::Disconnected));
    }

    #[test]
    fn test_invalid_patch_not_sent() {
        let (handle, _queue) = command_channel(2);
        let mut patch = SynthPatch::default();
        patch.master_gain = -1.0;
        assert!(matches!(
            handle.load_patch(&patch),
            Err(HandleError::InvalidPatch(PatchError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn test_patch_swap_returns_old_box() {
        let (handle, queue) = command_channel(4);
        let mut engine = SynthEngine::new(48000.0);
        engine.attach(queue);

        let mut patch = SynthPatch::default();
        patch.polyphony = 3;
        handle.load_patch(&patch).unwrap();
        assert_eq!(handle.collect_garbage(), 0);
        block(&mut engine);
        assert_eq!(engine.patch().polyphony, 3);
        assert_eq!(handle.collect_garbage(), 1);
    }

    #[test]
    fn test_slot_command() {
        let (handle, queue) = command_channel(4);
        let mut engine = SynthEngine::new(48000.0);
        engine.attach(queue);
        let slot = ModulationSlot::new(ModSource::Aftertouch, ModDestination::Amplitude, 0.5);
        handle.set_slot(0, slot).unwrap();
        handle.set_aftertouch(0.7).unwrap();
        handle.set_control(1, 0.2).unwrap();
        handle.set_pitch_bend(0.1).unwrap();
        block(&mut engine);
        assert_eq!(engine.router().slot(0), Some(&slot));
    }
}
