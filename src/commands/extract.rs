//! Extract command - recover and decrypt a hidden payload.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use stegcore::cover::CoverFormat;
use stegcore::{crypto, stego, Sidecar, StegError, StegMode};

use super::{fmt_bytes, resolve_passphrase, CommandExecutor};

/// Extract and decrypt a hidden payload from a stego file.
///
/// Requires the sidecar key file written at embed time and the passphrase.
/// With a deniable sidecar, whichever passphrase/sidecar pair is presented
/// reveals only its own half of the cover.
#[derive(Args, Debug)]
pub struct ExtractCommand {
    /// Stego file to extract from
    pub stego: PathBuf,

    /// Sidecar key file (.json) from embedding
    pub key_file: PathBuf,

    /// Where to save the recovered payload (the sidecar's info_type extension
    /// is appended when omitted)
    pub output: PathBuf,

    /// Passphrase. INSECURE: visible in shell history; omit to be prompted
    #[arg(short, long)]
    pub passphrase: Option<String>,

    /// Overwrite the output file without prompting
    #[arg(short, long)]
    pub force: bool,
}

impl CommandExecutor for ExtractCommand {
    fn execute(&self) -> Result<()> {
        if !self.stego.is_file() {
            bail!("stego file not found: {}", self.stego.display());
        }
        if !self.key_file.is_file() {
            bail!("key file not found: {}", self.key_file.display());
        }

        let sidecar = Sidecar::read(&self.key_file)?;
        let format = CoverFormat::detect(&self.stego)?;
        check_mode_consistency(&sidecar, format)?;

        let output = if self.output.extension().is_none() {
            let hint = sidecar.info_type.trim_start_matches('.');
            self.output.with_extension(hint)
        } else {
            self.output.clone()
        };
        if output.exists() && !self.force {
            return Err(StegError::OutputExists(output).into());
        }

        let passphrase = resolve_passphrase(&self.passphrase, "Passphrase", false)?;

        let key = crypto::derive_key(&passphrase, &sidecar.salt_bytes()?);
        let mut steg_key = [0u8; 32];
        steg_key.copy_from_slice(&*key);

        let ciphertext = if sidecar.deniable {
            let (partition_seed, partition_half) = sidecar.partition()?;
            stego::extract_deniable(&self.stego, &steg_key, &partition_seed, partition_half)?
        } else {
            let mode = match sidecar.steg_mode.as_str() {
                stego::DCT_MODE_NAME => StegMode::Sequential, // unkeyed; mode unused for JPEG
                other => StegMode::from_name(other)?,
            };
            stego::extract(&self.stego, &steg_key, mode)?
        };

        let envelope = sidecar.envelope(ciphertext)?;
        let plaintext = crypto::decrypt_with_key(&envelope, &key)?;

        std::fs::write(&output, &plaintext)
            .with_context(|| format!("failed to write {}", output.display()))?;

        println!("Recovered:  {}", output.display());
        println!("Cipher:     {}", sidecar.cipher);
        println!("Mode:       {}", sidecar.steg_mode);
        println!("Size:       {}", fmt_bytes(plaintext.len()));
        Ok(())
    }
}

/// The sidecar's steg mode must agree with the stego file's format.
fn check_mode_consistency(sidecar: &Sidecar, format: CoverFormat) -> Result<()> {
    let consistent = match sidecar.steg_mode.as_str() {
        stego::DCT_MODE_NAME => format == CoverFormat::Jpeg,
        "adaptive" => format == CoverFormat::Raster,
        "sequential" => matches!(format, CoverFormat::Raster | CoverFormat::Wav),
        _ => false,
    };
    if !consistent {
        return Err(StegError::ModeMismatch(format!(
            "sidecar mode '{}' does not match the stego file type",
            sidecar.steg_mode
        ))
        .into());
    }
    if sidecar.deniable && format != CoverFormat::Raster {
        return Err(
            StegError::ModeMismatch("deniable sidecar with a non-raster stego file".into()).into(),
        );
    }
    Ok(())
}
