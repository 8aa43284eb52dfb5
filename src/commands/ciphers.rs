//! Ciphers command - list the supported AEADs.

use anyhow::Result;
use clap::Args;

use stegcore::CipherId;

use super::CommandExecutor;

/// List all supported encryption ciphers.
#[derive(Args, Debug)]
pub struct CiphersCommand {}

impl CommandExecutor for CiphersCommand {
    fn execute(&self) -> Result<()> {
        println!("{:<20} {:<6} {:<10} Notes", "Cipher", "Type", "Key size");
        for (cipher, notes) in [
            (CipherId::Ascon128, "Lightweight, NIST standard - default"),
            (CipherId::ChaCha20Poly1305, "Fast in software, no AES hardware needed"),
            (CipherId::Aes256Gcm, "Hardware-accelerated on most modern CPUs"),
        ] {
            println!(
                "{:<20} {:<6} {:<10} {}",
                cipher.name(),
                "AEAD",
                format!("{}-bit", cipher.key_len() * 8),
                notes,
            );
        }
        println!();
        println!("All ciphers use Argon2id key derivation.");
        Ok(())
    }
}
