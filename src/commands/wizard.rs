//! Wizard command - guided flow for users who don't want to remember flags.

use anyhow::{bail, Result};
use clap::Args;

use stegcore::CipherId;

use super::{
    prompt_path, CommandExecutor, EmbedCommand, ExtractCommand, ScoreCommand,
};

/// Guided step-by-step mode for new users.
///
/// Walks through embedding, extracting, or scoring without needing any
/// flags; internally drives the same code paths as the power commands.
#[derive(Args, Debug)]
pub struct WizardCommand {}

impl CommandExecutor for WizardCommand {
    fn execute(&self) -> Result<()> {
        println!("Stegcore wizard");
        println!();
        println!("  1  Embed   - hide an encrypted payload inside a file");
        println!("  2  Extract - recover a hidden payload from a file");
        println!("  3  Score   - check how good a file is as a cover");
        println!("  4  Exit");
        println!();

        match super::prompt_line("Enter 1, 2, 3, or 4")?.as_str() {
            "1" => wizard_embed(),
            "2" => wizard_extract(),
            "3" => {
                let image = prompt_path("Path to the image file")?;
                ScoreCommand { image }.execute()
            }
            "4" | "" => Ok(()),
            other => bail!("invalid choice '{other}'"),
        }
    }
}

fn wizard_embed() -> Result<()> {
    println!();
    println!("Embed - you will need a payload file, a cover file, and a passphrase.");
    let cover = prompt_path("Path to the cover file (PNG, BMP, JPEG, WAV)")?;
    let payload = prompt_path("Path to the payload file")?;
    let output = prompt_path("Save the stego file as")?;

    println!();
    println!("Ciphers:");
    println!("  1  Ascon-128          (default - lightweight, NIST standard)");
    println!("  2  ChaCha20-Poly1305  (fast on any hardware)");
    println!("  3  AES-256-GCM        (hardware-accelerated)");
    let cipher = match super::prompt_line("Choose 1, 2, or 3 (Enter for default)")?.as_str() {
        "" | "1" => CipherId::Ascon128,
        "2" => CipherId::ChaCha20Poly1305,
        "3" => CipherId::Aes256Gcm,
        other => bail!("invalid choice '{other}'"),
    };

    println!();
    println!("Deniable mode hides a second, decoy payload under its own passphrase.");
    println!("If you are ever forced to reveal a passphrase, reveal the decoy one.");
    let deniable = super::confirm("Enable deniable dual-payload mode?")?;

    EmbedCommand {
        cover,
        payload,
        output,
        key_out: None,
        cipher: cipher.name().to_string(),
        mode: "adaptive".to_string(),
        deniable,
        decoy: None,
        passphrase: None,
        decoy_passphrase: None,
        force: false,
        no_score: false,
    }
    .execute()
}

fn wizard_extract() -> Result<()> {
    println!();
    println!("Extract - you will need the stego file, its key file, and the passphrase.");
    let stego = prompt_path("Path to the stego file")?;
    let key_file = prompt_path("Path to the key file (.json)")?;
    let output = prompt_path("Save the recovered payload as")?;

    ExtractCommand {
        stego,
        key_file,
        output,
        passphrase: None,
        force: false,
    }
    .execute()
}
