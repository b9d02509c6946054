//! Integration tests for polyvox-cli.
//!
//! Tests invoke the built `polyvox` binary and check its output files and
//! exit codes.

use std::process::Command;
use tempfile::TempDir;

/// Helper to get the path to the `polyvox` binary built by cargo.
fn polyvox_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_polyvox"))
}

// ---------------------------------------------------------------------------
// `polyvox info`
// ---------------------------------------------------------------------------

#[test]
fn cli_info_lists_modulation_names() {
    let output = polyvox_bin()
        .arg("info")
        .output()
        .expect("failed to run polyvox info");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Max voices"));
    for name in ["lfo1", "step_sequencer", "cc<n>", "filter_cutoff", "unison_detune"] {
        assert!(stdout.contains(name), "info should list '{name}'");
    }
}

#[test]
fn cli_info_modulation_only() {
    let output = polyvox_bin().args(["info", "--modulation"]).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("Max voices"));
    assert!(stdout.contains("Modulation destinations"));
}

// ---------------------------------------------------------------------------
// `polyvox presets`
// ---------------------------------------------------------------------------

#[test]
fn cli_presets_list_shows_factory() {
    let output = polyvox_bin().args(["presets", "list"]).output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for name in ["Init", "Warm Pad", "Acid Bass", "Super Saw", "Wobble", "Step Gate"] {
        assert!(stdout.contains(name), "listing should contain '{name}'");
    }
}

#[test]
fn cli_presets_show_prints_toml() {
    let output = polyvox_bin()
        .args(["presets", "show", "legato_lead"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Legato Lead"));
    assert!(stdout.contains("legato"));
    assert!(stdout.contains("lfo1 -> pitch"));
    assert!(stdout.contains("[[patch.mod_slots]]"));
}

#[test]
fn cli_presets_show_unknown_fails() {
    let output = polyvox_bin()
        .args(["presets", "show", "nope_not_real"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not found"));
}

#[test]
fn cli_presets_export_and_validate() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("saw.toml");

    let output = polyvox_bin()
        .args(["presets", "export", "super_saw"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(path.exists());

    let output = polyvox_bin()
        .args(["presets", "validate"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("OK"));

    let output = polyvox_bin()
        .args(["presets", "list", "--dir"])
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("saw.toml"));
}

#[test]
fn cli_presets_validate_rejects_bad_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("loud.toml");
    std::fs::write(&path, "name = \"Loud\"\n[patch]\nmaster_gain = 7.5\n").unwrap();

    let output = polyvox_bin()
        .args(["presets", "validate"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("FAIL"));
    assert!(stdout.contains("master_gain"));
}

// ---------------------------------------------------------------------------
// `polyvox render`
// ---------------------------------------------------------------------------

#[test]
fn cli_render_writes_stereo_wav() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("chord.wav");

    let output = polyvox_bin()
        .arg("render")
        .arg(&path)
        .args(["--preset", "warm_pad", "--notes", "C4,E4,G4", "--hold", "0.5"])
        .args(["--tail", "0.5", "--sample-rate", "44100"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "render failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let reader = hound::WavReader::open(&path).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 44100);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(reader.duration(), 44100);
}

#[test]
fn cli_render_float_output_from_preset_file() {
    let dir = TempDir::new().unwrap();
    let preset = dir.path().join("bass.json");
    let wav = dir.path().join("bass.wav");

    let status = polyvox_bin()
        .args(["presets", "export", "acid_bass"])
        .arg(&preset)
        .status()
        .unwrap();
    assert!(status.success());

    let output = polyvox_bin()
        .arg("render")
        .arg(&wav)
        .arg("--preset")
        .arg(&preset)
        .args(["--notes", "C2:0.2,C3@0.2:0.2,G2@0.4:0.2", "--bits", "32"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let mut reader = hound::WavReader::open(&wav).unwrap();
    assert_eq!(reader.spec().sample_format, hound::SampleFormat::Float);
    let samples: Vec<f32> = reader.samples::<f32>().map(Result::unwrap).collect();
    assert!(samples.iter().all(|s| s.is_finite()));
    assert!(samples.iter().any(|s| s.abs() > 1e-3));
}

#[test]
fn cli_render_rejects_bad_notes() {
    let dir = TempDir::new().unwrap();
    let output = polyvox_bin()
        .arg("render")
        .arg(dir.path().join("x.wav"))
        .args(["--notes", "Q9"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(!dir.path().join("x.wav").exists());
}
