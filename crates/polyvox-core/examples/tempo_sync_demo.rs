//! Tempo sync demo: division parsing, synced LFO rates, and tempo changes.
//!
//! Run with: cargo run -p polyvox-core --example tempo_sync_demo

use polyvox_core::{Lfo, LfoConfig, LfoWaveform, SyncDivision};

fn main() {
    let sample_rate = 48000.0;

    // --- Division table ---
    println!("=== Divisions at 120 BPM ===\n");
    println!(
        "{:<8} {:>14} {:>10} {:>10}",
        "Label", "Beats/cycle", "Hz", "Seconds"
    );
    println!("{:-<8} {:->14} {:->10} {:->10}", "", "", "", "");

    for label in SyncDivision::LABELS {
        match label.parse::<SyncDivision>() {
            Ok(div) => println!(
                "{:<8} {:>14.3} {:>10.3} {:>10.3}",
                label,
                div.beats_per_cycle(),
                div.to_hz(120.0),
                div.to_seconds(120.0)
            ),
            Err(e) => println!("{label:<8} {e}"),
        }
    }

    // --- Long-form names ---
    println!("\n=== Parsing ===\n");
    for text in ["1/4", "1/8 dotted", "1/2t", "3/4", "0/4", "quarter"] {
        match text.parse::<SyncDivision>() {
            Ok(div) => println!("  {text:<12} -> {div}"),
            Err(e) => println!("  {text:<12} -> error: {e}"),
        }
    }

    // --- Synced LFO following the tempo ---
    println!("\n=== Synced LFO ===\n");

    let config = LfoConfig::default()
        .with_waveform(LfoWaveform::Triangle)
        .with_sync(SyncDivision::QUARTER);
    let mut lfo = Lfo::new(sample_rate, config);

    for bpm in [90.0, 120.0, 174.0] {
        lfo.set_bpm(bpm);
        lfo.reset();
        // one beat of audio
        let beat = (sample_rate * 60.0 / bpm) as usize;
        let value = lfo.advance_by(beat);
        println!(
            "  {:>5.1} BPM: {:.3} Hz, phase after one beat {:.3}, value {:+.3}",
            bpm,
            lfo.rate_hz(),
            lfo.phase(),
            value
        );
    }
}
