//! polyvox CLI - offline front end for the polyvox synthesizer.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "polyvox")]
#[command(author, version, about = "Polyphonic synthesizer CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a preset and a list of notes to a WAV file
    Render(commands::render::RenderArgs),

    /// List, show, validate and export presets
    Presets(commands::presets::PresetsArgs),

    /// Show engine capabilities and modulation names
    Info(commands::info::InfoArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render(args) => commands::render::run(args),
        Commands::Presets(args) => commands::presets::run(args),
        Commands::Info(args) => commands::info::run(args),
    }
}
