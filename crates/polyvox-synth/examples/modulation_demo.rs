//! Modulation demo: routing sources to destinations through the router.
//!
//! Run with: cargo run -p polyvox-synth --example modulation_demo

use polyvox_synth::{
    CcTable, ModDestination, ModSource, ModulationRouter, ModulationSlot, ResponseCurve,
    SourceValues, SynthEngine, SynthPatch,
};

fn main() {
    // --- Router in isolation ---
    println!("=== Router: LFO1 and mod wheel into cutoff ===\n");

    let mut router = ModulationRouter::new();
    router.set_slot(
        0,
        ModulationSlot::new(ModSource::Lfo1, ModDestination::FilterCutoff, 0.5),
    );
    router.set_slot(
        1,
        ModulationSlot::new(ModSource::ModWheel, ModDestination::FilterCutoff, 0.4)
            .with_curve(ResponseCurve::Exponential),
    );
    router.set_slot(
        2,
        ModulationSlot::new(ModSource::Velocity, ModDestination::Amplitude, 0.3)
            .with_bipolar(true),
    );

    let mut cc = CcTable::default();
    println!("{:>6} {:>6} {:>10} {:>10}", "lfo", "wheel", "cutoff", "amp");
    for step in 0..5 {
        let wheel = step as f32 / 4.0;
        cc.set(1, wheel);
        let mut sources = SourceValues::new(&cc);
        sources.lfo1 = (step as f32 * 0.8).sin();
        sources.velocity = 0.9;
        let out = router.process(&sources);
        println!(
            "{:>6.2} {:>6.2} {:>10.3} {:>10.3}",
            sources.lfo1,
            wheel,
            out.get(ModDestination::FilterCutoff),
            out.amplitude_factor()
        );
    }

    // --- Through the engine ---
    println!("\n=== Engine: aftertouch into cutoff ===\n");

    let mut patch = SynthPatch::default();
    patch.mod_slots[0] = ModulationSlot::new(ModSource::Aftertouch, ModDestination::FilterCutoff, 0.5);
    let mut engine = SynthEngine::new(48000.0);
    if let Err(e) = engine.load_preset(&patch) {
        eprintln!("invalid patch: {e}");
        return;
    }
    let id = engine.play_note(57, 0.8, 0);
    let mut left = [0.0f32; 256];
    let mut right = [0.0f32; 256];
    for pressure in [0.0, 0.5, 1.0] {
        engine.set_aftertouch(pressure);
        engine.process_block(&mut left, &mut right);
        let cutoff = engine.voices().voice(id).map_or(0.0, |v| v.filter_cutoff());
        let peak = left.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        println!("aftertouch {pressure:.1}: filter cutoff {cutoff:.1} Hz, peak {peak:.4}");
    }
    println!("\nslots in use: {}", engine.router().active_slot_count());
}
