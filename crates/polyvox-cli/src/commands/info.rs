//! Display engine capabilities and the names used in preset files.

use clap::Args;
use polyvox_core::{LfoWaveform, MAX_BPM, MIN_BPM, Polarity, ResponseCurve, SaturationType};
use polyvox_synth::{
    MAX_BLOCK_SIZE, MAX_VOICES, MOD_SLOTS, ModDestination, ModSource, OscillatorWaveform,
    SynthPatch,
};

/// Display engine information.
#[derive(Args)]
pub struct InfoArgs {
    /// Only list modulation sources and destinations
    #[arg(long)]
    modulation: bool,
}

/// Run the info command.
pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    if !args.modulation {
        let defaults = SynthPatch::default();
        println!("polyvox {}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Max voices:        {}", MAX_VOICES);
        println!("Default polyphony: {}", defaults.polyphony);
        println!("Modulation slots:  {}", MOD_SLOTS);
        println!("Block size:        {} frames", MAX_BLOCK_SIZE);
        println!("Tempo range:       {:.0}-{:.0} BPM", MIN_BPM, MAX_BPM);
        println!();
        println!("Oscillators: {}", join(OscillatorWaveform::ALL.map(OscillatorWaveform::name)));
        println!("LFO shapes:  {}", join(LfoWaveform::ALL.map(LfoWaveform::name)));
        println!("Saturation:  {}", join(SaturationType::ALL.map(SaturationType::name)));
        println!("Curves:      {}", join(ResponseCurve::ALL.map(ResponseCurve::name)));
        println!();
    }

    println!("Modulation sources:");
    for source in ModSource::FIXED {
        println!("  {:16} ({})", source.name(), polarity_label(source));
    }
    println!("  {:16} (unipolar, n = 0-127)", "cc<n>");
    println!();

    println!("Modulation destinations:");
    for destination in ModDestination::ALL {
        println!("  {}", destination.name());
    }

    Ok(())
}

fn polarity_label(source: ModSource) -> &'static str {
    match source.polarity() {
        Polarity::Bipolar => "bipolar",
        Polarity::Unipolar => "unipolar",
    }
}

fn join<const N: usize>(names: [&'static str; N]) -> String {
    names.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polarity_labels() {
        assert_eq!(polarity_label(ModSource::Lfo1), "bipolar");
        assert_eq!(polarity_label(ModSource::Velocity), "unipolar");
    }

    #[test]
    fn test_join() {
        assert_eq!(join(["a", "b"]), "a, b");
    }
}
