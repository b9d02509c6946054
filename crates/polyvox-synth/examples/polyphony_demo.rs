//! Polyphony demo: chords, stealing and release tails.
//!
//! Run with: cargo run -p polyvox-synth --example polyphony_demo

use polyvox_synth::{SynthEngine, SynthPatch, VoiceMode};

const SAMPLE_RATE: f32 = 48000.0;
const BLOCK: usize = 256;

fn peak(engine: &mut SynthEngine, blocks: usize) -> f32 {
    let mut left = [0.0f32; BLOCK];
    let mut right = [0.0f32; BLOCK];
    let mut peak = 0.0f32;
    for _ in 0..blocks {
        engine.process_block(&mut left, &mut right);
        peak = left
            .iter()
            .chain(&right)
            .fold(peak, |m, s| m.max(s.abs()));
    }
    peak
}

fn main() {
    let mut patch = SynthPatch::default();
    patch.polyphony = 4;
    let mut engine = SynthEngine::new(SAMPLE_RATE);
    if let Err(e) = engine.load_preset(&patch) {
        eprintln!("invalid patch: {e}");
        return;
    }

    println!("=== Stealing at polyphony 4 ===\n");
    println!("{:<6} {:>8} {:>8} {:>10}", "note", "active", "stolen", "last");
    for (i, note) in [48u8, 52, 55, 60, 64, 67, 72].into_iter().enumerate() {
        engine.play_note(note, 0.8, engine.sample_clock());
        peak(&mut engine, 4);
        let last = engine
            .voices()
            .last_stolen()
            .map_or_else(|| "-".to_string(), |id| id.to_string());
        println!(
            "{:<6} {:>8} {:>8} {:>10}",
            note,
            engine.active_count(),
            engine.steal_count(),
            last
        );
        if i == 3 {
            // Released voices are stolen before held ones.
            engine.stop_note(52);
        }
    }

    println!("\n=== Release tail ===\n");
    engine.stop_all_notes();
    for step in 0..8 {
        let level = peak(&mut engine, 10);
        println!(
            "{:>6.0} ms  active {:>2}  peak {:.4}",
            (step + 1) as f32 * 10.0 * BLOCK as f32 / SAMPLE_RATE * 1000.0,
            engine.active_count(),
            level
        );
    }

    println!("\n=== Legato ===\n");
    patch.voice_mode = VoiceMode::Legato;
    patch.glide_s = 0.08;
    if engine.load_preset(&patch).is_ok() {
        let id = engine.play_note(48, 0.8, 0);
        peak(&mut engine, 20);
        engine.play_note(60, 0.8, 0);
        for _ in 0..6 {
            peak(&mut engine, 4);
            if let Some(voice) = engine.voices().voice(id) {
                println!(
                    "{id}: note {:.2}  env {:?}",
                    voice.current_note(),
                    voice.amp_envelope().state()
                );
            }
        }
    }
}
