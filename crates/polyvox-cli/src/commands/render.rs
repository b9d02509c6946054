//! Offline rendering of a preset and a note list to WAV.

use clap::{Args, ValueEnum};
use hound::{SampleFormat, WavSpec, WavWriter};
use polyvox_synth::{MOD_WHEEL_CC, SynthEngine, SynthPatch};
use std::path::{Path, PathBuf};

use super::common::{NoteEvent, load_preset, parse_notes};

/// WAV sample encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum BitDepth {
    /// 16-bit integer PCM
    #[default]
    #[value(name = "16")]
    Int16,
    /// 24-bit integer PCM
    #[value(name = "24")]
    Int24,
    /// 32-bit IEEE float
    #[value(name = "32")]
    Float32,
}

impl BitDepth {
    fn bits(self) -> u16 {
        match self {
            Self::Int16 => 16,
            Self::Int24 => 24,
            Self::Float32 => 32,
        }
    }
}

#[derive(Args)]
pub struct RenderArgs {
    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Factory preset name or path to a .toml/.json preset
    #[arg(short, long, default_value = "init")]
    preset: String,

    /// Notes as NOTE[@START][:LENGTH], comma-separated (e.g. "C4,E4@0.5,G4@1:0.25")
    #[arg(short, long, default_value = "60,64,67")]
    notes: String,

    /// Default note length in seconds
    #[arg(long, default_value = "1.0")]
    hold: f32,

    /// Seconds rendered after the last release (default: amp release + 0.1)
    #[arg(long)]
    tail: Option<f32>,

    /// Note velocity (0-1)
    #[arg(long, default_value = "0.8")]
    velocity: f32,

    /// Tempo for synced LFOs and the step sequencer
    #[arg(long, default_value = "120.0")]
    bpm: f32,

    /// Mod wheel position (0-1)
    #[arg(long)]
    mod_wheel: Option<f32>,

    /// Sample rate
    #[arg(long, default_value = "48000")]
    sample_rate: u32,

    /// Sample encoding
    #[arg(long, value_enum, default_value = "16")]
    bits: BitDepth,
}

/// Options for [`render_notes`].
#[derive(Debug, Clone, Copy)]
pub struct RenderSettings {
    /// Output sample rate.
    pub sample_rate: u32,
    /// Velocity for every note.
    pub velocity: f32,
    /// Engine tempo.
    pub bpm: f32,
    /// Mod wheel position, if set.
    pub mod_wheel: Option<f32>,
    /// Seconds rendered after the last release.
    pub tail_s: f32,
}

/// Stereo render result.
#[derive(Debug, Default)]
pub struct Rendered {
    /// Left channel.
    pub left: Vec<f32>,
    /// Right channel.
    pub right: Vec<f32>,
    /// Voices stolen during the render.
    pub stolen: u64,
}

impl Rendered {
    /// Largest absolute sample over both channels.
    pub fn peak(&self) -> f32 {
        self.left
            .iter()
            .chain(&self.right)
            .fold(0.0f32, |m, s| m.max(s.abs()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Action {
    // releases sort first so a note can restart on the same sample
    Off,
    On,
}

/// Render `events` through a fresh engine loaded with `patch`.
pub fn render_notes(
    patch: &SynthPatch,
    events: &[NoteEvent],
    settings: RenderSettings,
) -> anyhow::Result<Rendered> {
    let sr = settings.sample_rate as f32;
    let mut engine = SynthEngine::new(sr);
    engine.load_preset(patch)?;
    engine.set_bpm(settings.bpm);
    if let Some(wheel) = settings.mod_wheel {
        engine.set_control(MOD_WHEEL_CC, wheel);
    }

    let to_samples = |seconds: f32| (seconds * sr).round() as u64;

    let mut schedule: Vec<(u64, Action, u8)> = events
        .iter()
        .flat_map(|e| {
            [
                (to_samples(e.start_s), Action::On, e.note),
                (to_samples(e.end_s()), Action::Off, e.note),
            ]
        })
        .collect();
    schedule.sort_by_key(|&(at, action, _)| (at, action));

    let last_release = events.iter().map(NoteEvent::end_s).fold(0.0f32, f32::max);
    let total = to_samples(last_release + settings.tail_s.max(0.0)) as usize;

    tracing::info!(
        notes = events.len(),
        frames = total,
        sample_rate = settings.sample_rate,
        "rendering"
    );

    let mut out = Rendered {
        left: vec![0.0; total],
        right: vec![0.0; total],
        stolen: 0,
    };
    let mut pos = 0usize;
    for (at, action, note) in schedule {
        let at = (at as usize).min(total);
        if at > pos {
            engine.process_block(&mut out.left[pos..at], &mut out.right[pos..at]);
            pos = at;
        }
        match action {
            Action::On => {
                engine.play_note(note, settings.velocity, at as u64);
            }
            Action::Off => engine.stop_note(note),
        }
    }
    if pos < total {
        engine.process_block(&mut out.left[pos..], &mut out.right[pos..]);
    }

    out.stolen = engine.steal_count();
    Ok(out)
}

/// Write a stereo WAV file.
pub fn write_stereo_wav(
    path: &Path,
    left: &[f32],
    right: &[f32],
    sample_rate: u32,
    bits: BitDepth,
) -> anyhow::Result<()> {
    let spec = WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: bits.bits(),
        sample_format: if bits == BitDepth::Float32 {
            SampleFormat::Float
        } else {
            SampleFormat::Int
        },
    };
    let mut writer = WavWriter::create(path, spec)?;

    if bits == BitDepth::Float32 {
        for (&l, &r) in left.iter().zip(right) {
            writer.write_sample(l)?;
            writer.write_sample(r)?;
        }
    } else {
        let max_val = (1i32 << (bits.bits() - 1)) as f32;
        let quantize = |s: f32| (s * max_val).clamp(-max_val, max_val - 1.0) as i32;
        for (&l, &r) in left.iter().zip(right) {
            writer.write_sample(quantize(l))?;
            writer.write_sample(quantize(r))?;
        }
    }

    writer.finalize()?;
    Ok(())
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    if args.sample_rate == 0 {
        anyhow::bail!("sample rate must be positive");
    }
    if !(args.hold.is_finite() && args.hold > 0.0) {
        anyhow::bail!("--hold must be a positive number of seconds");
    }

    let preset = load_preset(&args.preset)?;
    let events = parse_notes(&args.notes, args.hold).map_err(anyhow::Error::msg)?;
    let tail_s = args
        .tail
        .unwrap_or(preset.patch.amp_env.release_s + 0.1);

    println!("Rendering '{}'...", preset.name);
    println!("  Notes: {}", events.len());
    println!("  Tempo: {:.1} BPM", args.bpm);

    let rendered = render_notes(
        &preset.patch,
        &events,
        RenderSettings {
            sample_rate: args.sample_rate,
            velocity: args.velocity.clamp(0.0, 1.0),
            bpm: args.bpm,
            mod_wheel: args.mod_wheel,
            tail_s,
        },
    )?;

    write_stereo_wav(
        &args.output,
        &rendered.left,
        &rendered.right,
        args.sample_rate,
        args.bits,
    )?;

    let peak = rendered.peak();
    println!(
        "  Duration: {:.2}s",
        rendered.left.len() as f32 / args.sample_rate as f32
    );
    println!("  Peak: {:.3}", peak);
    if rendered.stolen > 0 {
        println!("  Voices stolen: {}", rendered.stolen);
    }
    if peak > 1.0 && args.bits != BitDepth::Float32 {
        tracing::warn!(peak, "output clipped; lower master_gain or use --bits 32");
    }
    println!("Saved to {}", args.output.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyvox_config::get_factory_preset;

    fn settings(tail_s: f32) -> RenderSettings {
        RenderSettings {
            sample_rate: 48000,
            velocity: 0.8,
            bpm: 120.0,
            mod_wheel: None,
            tail_s,
        }
    }

    #[test]
    fn test_render_length_includes_tail() {
        let events = parse_notes("60:0.5", 1.0).unwrap();
        let out = render_notes(&SynthPatch::default(), &events, settings(0.25)).unwrap();
        assert_eq!(out.left.len(), 36000);
        assert_eq!(out.right.len(), 36000);
        assert!(out.peak() > 0.01);
    }

    #[test]
    fn test_render_silent_before_first_note() {
        let events = parse_notes("60@0.5:0.5", 1.0).unwrap();
        let out = render_notes(&SynthPatch::default(), &events, settings(0.4)).unwrap();
        assert!(out.left[..24000].iter().all(|&s| s == 0.0));
        assert!(out.left[24000..].iter().any(|&s| s != 0.0));
    }

    #[test]
    fn test_release_tail_decays() {
        let events = parse_notes("60:0.2", 1.0).unwrap();
        let out = render_notes(&SynthPatch::default(), &events, settings(1.0)).unwrap();
        // default release is well under a second
        let last = &out.left[out.left.len() - 4800..];
        assert!(last.iter().all(|&s| s.abs() < 1e-4));
    }

    #[test]
    fn test_render_counts_steals() {
        let mut patch = SynthPatch::default();
        patch.polyphony = 2;
        let events = parse_notes("60,64,67,71", 0.3).unwrap();
        let out = render_notes(&patch, &events, settings(0.1)).unwrap();
        assert_eq!(out.stolen, 2);
    }

    #[test]
    fn test_invalid_patch_rejected() {
        let mut patch = SynthPatch::default();
        patch.master_gain = 10.0;
        let events = parse_notes("60", 0.1).unwrap();
        assert!(render_notes(&patch, &events, settings(0.1)).is_err());
    }

    #[test]
    fn test_factory_preset_renders() {
        let preset = get_factory_preset("wobble").unwrap();
        let events = parse_notes("C2,C3@0.25", 0.5).unwrap();
        let out = render_notes(&preset.patch, &events, settings(0.3)).unwrap();
        assert!(out.left.iter().chain(&out.right).all(|s| s.is_finite()));
        assert!(out.peak() > 1e-3);
    }

    #[test]
    fn test_write_wav_formats() {
        let dir = tempfile::TempDir::new().unwrap();
        let left = vec![0.5f32, -0.5, 2.0];
        let right = vec![0.25f32, 0.0, -2.0];

        for bits in [BitDepth::Int16, BitDepth::Int24, BitDepth::Float32] {
            let path = dir.path().join(format!("out_{}.wav", bits.bits()));
            write_stereo_wav(&path, &left, &right, 44100, bits).unwrap();

            let reader = hound::WavReader::open(&path).unwrap();
            let spec = reader.spec();
            assert_eq!(spec.channels, 2);
            assert_eq!(spec.sample_rate, 44100);
            assert_eq!(spec.bits_per_sample, bits.bits());
            assert_eq!(reader.duration(), 3);
        }

        let mut reader = hound::WavReader::open(dir.path().join("out_16.wav")).unwrap();
        let samples: Vec<i32> = reader.samples::<i32>().map(Result::unwrap).collect();
        assert_eq!(samples[0], 16384);
        assert_eq!(samples[4], 32767, "clipped to full scale");
        assert_eq!(samples[5], -32768);
    }
}
