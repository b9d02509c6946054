//! Preset management commands.
//!
//! Provides commands to list, show, validate and export synth presets.

use clap::{Args, Subcommand};
use polyvox_config::{Preset, factory_presets, load_presets_in, preset_issues};
use polyvox_synth::MOD_SLOTS;
use std::path::PathBuf;

use super::common::load_preset;

#[derive(Args)]
pub struct PresetsArgs {
    #[command(subcommand)]
    command: PresetsCommand,
}

#[derive(Subcommand)]
enum PresetsCommand {
    /// List factory presets and, optionally, presets in a directory
    List {
        /// Also list .toml/.json presets in this directory
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Show details of a preset
    Show {
        /// Factory preset name or path
        name: String,

        /// Print the full preset as JSON instead of TOML
        #[arg(long)]
        json: bool,
    },

    /// Check presets for out-of-range values
    Validate {
        /// Factory preset names or paths
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Write a preset to a file (format from the extension)
    Export {
        /// Factory preset name or path
        name: String,

        /// Destination .toml or .json file
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn run(args: PresetsArgs) -> anyhow::Result<()> {
    match args.command {
        PresetsCommand::List { dir } => list_presets(dir),
        PresetsCommand::Show { name, json } => show_preset(&name, json),
        PresetsCommand::Validate { names } => validate_presets(&names),
        PresetsCommand::Export {
            name,
            output,
            force,
        } => export_preset(&name, output, force),
    }
}

fn list_presets(dir: Option<PathBuf>) -> anyhow::Result<()> {
    println!("Factory Presets:");
    println!("================");
    for preset in factory_presets() {
        println!("{}", summary_line(&preset));
    }
    println!();

    if let Some(dir) = dir {
        println!("Presets in {}:", dir.display());
        let found = load_presets_in(&dir)?;
        if found.is_empty() {
            println!("  (none)");
        }
        for (path, result) in found {
            let file = path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default();
            match result {
                Ok(preset) => println!("{}  ({})", summary_line(&preset), file),
                Err(e) => println!("  {:20} - (error loading: {})", file, e),
            }
        }
        println!();
    }

    Ok(())
}

fn summary_line(preset: &Preset) -> String {
    let desc = preset.description.as_deref().unwrap_or("");
    format!(
        "  {:16} [{:7}] - {}",
        preset.name,
        preset.category.name(),
        desc
    )
}

fn show_preset(name: &str, json: bool) -> anyhow::Result<()> {
    let preset = load_preset(name)?;
    let patch = &preset.patch;

    println!("Preset: {}", preset.name);
    println!("{}", "=".repeat(8 + preset.name.len()));
    println!();

    if let Some(desc) = &preset.description {
        println!("Description: {}", desc);
    }
    if let Some(author) = &preset.author {
        println!("Author:      {}", author);
    }
    println!("Category:    {}", preset.category.name());
    println!(
        "Voices:      {} ({}), glide {:.3}s",
        patch.polyphony,
        patch.voice_mode.name(),
        patch.glide_s
    );
    println!(
        "Oscillators: {} / {} (mix {:.2})",
        patch.osc1.waveform.name(),
        patch.osc2.waveform.name(),
        patch.osc_mix
    );
    if patch.unison.enabled {
        println!(
            "Unison:      {} voices, {:.1} cents, spread {:.2}",
            patch.unison.voices, patch.unison.detune_cents, patch.unison.stereo_spread
        );
    }
    println!();

    println!("Modulation ({}/{} slots):", patch.active_slot_count(), MOD_SLOTS);
    for (i, slot) in patch.mod_slots.iter().enumerate() {
        if slot.is_active() {
            println!(
                "  {:2}. {} -> {} ({:+.2}, {}, {})",
                i,
                slot.source,
                slot.destination,
                slot.depth,
                if slot.bipolar { "bipolar" } else { "unipolar" },
                slot.curve.name()
            );
        }
    }
    println!();

    let text = if json {
        preset.to_json()?
    } else {
        preset.to_toml()?
    };
    println!("{text}");

    Ok(())
}

fn validate_presets(names: &[String]) -> anyhow::Result<()> {
    let mut failed = 0usize;

    for name in names {
        match load_preset(name) {
            Ok(preset) => {
                let issues = preset_issues(&preset);
                if issues.is_empty() {
                    println!("OK    {}", name);
                } else {
                    failed += 1;
                    println!("FAIL  {}", name);
                    for issue in issues {
                        println!("        - {}", issue);
                    }
                }
            }
            Err(e) => {
                failed += 1;
                println!("FAIL  {}", name);
                println!("        - {:#}", e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} presets failed validation", failed, names.len());
    }
    Ok(())
}

fn export_preset(name: &str, output: PathBuf, force: bool) -> anyhow::Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "'{}' already exists. Use --force to overwrite.",
            output.display()
        );
    }

    let preset = load_preset(name)?;
    preset.save(&output)?;

    println!("Exported '{}' to {}", preset.name, output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyvox_config::get_factory_preset;

    #[test]
    fn test_summary_line_has_category() {
        let preset = get_factory_preset("wobble").unwrap();
        let line = summary_line(&preset);
        assert!(line.contains("Wobble"));
        assert!(line.contains("[bass"));
    }

    #[test]
    fn test_validate_factory_presets() {
        let names: Vec<String> = ["init", "super_saw", "step_gate"]
            .into_iter()
            .map(String::from)
            .collect();
        assert!(validate_presets(&names).is_ok());
    }

    #[test]
    fn test_validate_reports_failures() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "name = \"Bad\"\n[patch]\npolyphony = 0\n").unwrap();

        let names = vec![
            "init".to_string(),
            path.to_string_lossy().into_owned(),
            "missing_preset".to_string(),
        ];
        let err = validate_presets(&names).unwrap_err();
        assert_eq!(err.to_string(), "2 of 3 presets failed validation");
    }

    #[test]
    fn test_export_refuses_overwrite() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pad.json");

        export_preset("warm_pad", path.clone(), false).unwrap();
        assert_eq!(Preset::load(&path).unwrap().name, "Warm Pad");

        assert!(export_preset("acid_bass", path.clone(), false).is_err());
        export_preset("acid_bass", path.clone(), true).unwrap();
        assert_eq!(Preset::load(&path).unwrap().name, "Acid Bass");
    }
}
