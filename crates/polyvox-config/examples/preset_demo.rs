//! Preset demo: factory sounds, editing, validation, and file formats.
//!
//! Run with: cargo run -p polyvox-config --example preset_demo

use polyvox_config::{
    Preset, PresetCategory, factory_preset_names, get_factory_preset, is_factory_preset,
    preset_issues,
};
use polyvox_synth::{ModDestination, ModSource, ModulationSlot, SynthEngine};

fn main() {
    // --- Factory presets ---
    println!("=== Factory Presets ===\n");

    for name in factory_preset_names() {
        if let Some(preset) = get_factory_preset(name) {
            println!(
                "  {:<12} {:<12} [{}] slots={} unison={}",
                name,
                preset.name,
                preset.category.name(),
                preset.patch.active_slot_count(),
                preset.patch.unison.enabled,
            );
        }
    }

    println!();
    for name in ["wobble", "Super Saw", "my_custom"] {
        println!("  is_factory_preset({name:?}) = {}", is_factory_preset(name));
    }

    // --- Editing a preset ---
    println!("\n=== Editing ===\n");

    let Some(base) = get_factory_preset("warm_pad") else {
        eprintln!("warm_pad missing");
        return;
    };
    let mut preset = base
        .with_description("Warm pad with mod wheel vibrato")
        .with_author("preset_demo")
        .with_category(PresetCategory::Pad);
    preset.name = "Vibrato Pad".to_string();
    preset.patch.mod_slots[2] =
        ModulationSlot::new(ModSource::ModWheel, ModDestination::Pitch, 0.05);

    match preset.to_toml() {
        Ok(toml) => println!("{toml}"),
        Err(e) => eprintln!("TOML error: {e}"),
    }

    // --- Validation ---
    println!("=== Validation ===\n");

    let mut broken = preset.clone();
    broken.name.clear();
    broken.patch.polyphony = 0;
    broken.patch.filter.cutoff_hz = 50_000.0;
    for issue in preset_issues(&broken) {
        println!("  - {issue}");
    }

    // --- Playing it ---
    println!("\n=== Rendering ===\n");

    let mut engine = SynthEngine::new(48000.0);
    if let Err(e) = engine.load_preset(&preset.patch) {
        eprintln!("rejected: {e}");
        return;
    }
    engine.play_note(57, 0.8, 0);
    engine.play_note(60, 0.8, 0);
    engine.play_note(64, 0.8, 0);

    let mut left = vec![0.0f32; 48000];
    let mut right = vec![0.0f32; 48000];
    engine.process_block(&mut left, &mut right);
    let peak = left
        .iter()
        .chain(&right)
        .fold(0.0f32, |m, s| m.max(s.abs()));
    println!(
        "  1 s of '{}': {} voices, peak {:.3}",
        preset.name,
        engine.active_count(),
        peak
    );
}
