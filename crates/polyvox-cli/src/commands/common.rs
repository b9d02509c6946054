//! Shared CLI helpers used across multiple commands.

use anyhow::Context;
use polyvox_config::{ConfigError, Preset, get_factory_preset};
use std::path::Path;

/// One note in a render score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    /// MIDI note number.
    pub note: u8,
    /// Start time in seconds.
    pub start_s: f32,
    /// Gate length in seconds.
    pub length_s: f32,
}

impl NoteEvent {
    /// Release time in seconds.
    pub fn end_s(&self) -> f32 {
        self.start_s + self.length_s
    }
}

/// Load a preset by factory name or file path.
///
/// Anything with a `.toml` or `.json` extension, or that exists on disk, is
/// treated as a path; everything else is looked up among the factory presets.
pub fn load_preset(name: &str) -> anyhow::Result<Preset> {
    let path = Path::new(name);
    let looks_like_file = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml") || e.eq_ignore_ascii_case("json"));

    if looks_like_file || path.exists() {
        return Ok(Preset::load(path)?);
    }

    get_factory_preset(name)
        .ok_or_else(|| ConfigError::PresetNotFound(name.to_string()))
        .context("use 'polyvox presets list' to see available presets")
}

/// Parse a note number or a note name such as `C4`, `F#3` or `Bb2`.
///
/// Names use the convention that middle C (60) is `C4`.
pub fn parse_note(s: &str) -> Result<u8, String> {
    let s = s.trim();
    if let Ok(n) = s.parse::<u8>() {
        return if n <= 127 {
            Ok(n)
        } else {
            Err(format!("note {n} is above 127"))
        };
    }

    let mut chars = s.chars();
    let letter = chars
        .next()
        .ok_or_else(|| "empty note".to_string())?
        .to_ascii_uppercase();
    let base: i32 = match letter {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return Err(format!("invalid note '{s}'")),
    };

    let rest = chars.as_str();
    let (accidental, octave) = match rest.as_bytes().first() {
        Some(b'#') => (1, &rest[1..]),
        Some(b'b') => (-1, &rest[1..]),
        _ => (0, rest),
    };
    let octave: i32 = octave
        .parse()
        .map_err(|_| format!("invalid octave in note '{s}'"))?;

    let number = (octave + 1) * 12 + base + accidental;
    u8::try_from(number)
        .ok()
        .filter(|n| *n <= 127)
        .ok_or_else(|| format!("note '{s}' is outside the MIDI range"))
}

/// Parse a comma-separated note list.
///
/// Each entry is `NOTE[@START][:LENGTH]` with times in seconds. `START`
/// defaults to 0 and `LENGTH` to `default_length`. For example
/// `"C4,E4@0.5,G4@1:0.25"` plays a C at once, an E half a second later
/// and a short G at one second.
pub fn parse_notes(spec: &str, default_length: f32) -> Result<Vec<NoteEvent>, String> {
    let mut events = Vec::new();

    for entry in spec.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let (head, length) = match entry.split_once(':') {
            Some((head, len)) => (head, parse_seconds(len, entry)?),
            None => (entry, default_length),
        };
        let (note, start) = match head.split_once('@') {
            Some((note, start)) => (note, parse_seconds(start, entry)?),
            None => (head, 0.0),
        };

        events.push(NoteEvent {
            note: parse_note(note)?,
            start_s: start,
            length_s: length,
        });
    }

    if events.is_empty() {
        return Err("no notes given (example: --notes \"60,64,67\")".to_string());
    }
    Ok(events)
}

fn parse_seconds(s: &str, entry: &str) -> Result<f32, String> {
    let value: f32 = s
        .trim()
        .parse()
        .map_err(|_| format!("invalid time '{s}' in '{entry}'"))?;
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(format!("time '{s}' in '{entry}' must be zero or positive"))
    }
}
