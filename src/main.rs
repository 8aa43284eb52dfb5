//! Stegcore command-line interface.
//!
//! Two usage modes: single-line commands with flags for power users, and
//! `stegcore wizard` for a guided step-by-step flow.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    CiphersCommand, CommandExecutor, EmbedCommand, ExtractCommand, InfoCommand, ScoreCommand,
    WizardCommand,
};

/// Crypto-steganography toolkit.
///
/// Hides authenticated-encrypted payloads inside PNG, BMP, JPEG, and WAV
/// covers. New to the terminal? Run: stegcore wizard
#[derive(Parser)]
#[command(name = "stegcore")]
#[command(version = "2.0.1")]
#[command(about = "Crypto-steganography toolkit - hide encrypted payloads in ordinary media files")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed an encrypted payload inside a cover file
    Embed(EmbedCommand),

    /// Extract and decrypt a hidden payload from a stego file
    Extract(ExtractCommand),

    /// Analyse a cover image's steganographic quality
    Score(ScoreCommand),

    /// Display the metadata stored in a sidecar key file
    Info(InfoCommand),

    /// List all supported encryption ciphers
    Ciphers(CiphersCommand),

    /// Guided step-by-step mode for new users
    Wizard(WizardCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Embed(cmd) => cmd.execute(),
        Commands::Extract(cmd) => cmd.execute(),
        Commands::Score(cmd) => cmd.execute(),
        Commands::Info(cmd) => cmd.execute(),
        Commands::Ciphers(cmd) => cmd.execute(),
        Commands::Wizard(cmd) => cmd.execute(),
    }
}
