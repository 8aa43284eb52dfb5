//! Embed command - encrypt a payload and hide it in a cover file.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use zeroize::Zeroizing;

use stegcore::{
    crypto, score::score_cover, stego, CipherId, CoverScore, Sidecar, StegError, StegMode,
};

use super::{
    confirm, decoy_sidecar_path, default_sidecar_path, fmt_bytes, resolve_passphrase,
    CommandExecutor,
};
use stegcore::cover::CoverFormat;

/// Embed an encrypted payload inside a cover file.
///
/// The cover format is detected from its extension: PNG/BMP use spatial LSB,
/// JPEG uses DCT coefficient LSB, WAV uses sample LSB. A sidecar key file
/// (default `<output>.key.json`) is written next to the stego file; both are
/// needed for extraction, along with the passphrase.
#[derive(Args, Debug)]
pub struct EmbedCommand {
    /// Cover file (PNG, BMP, JPEG, WAV)
    pub cover: PathBuf,

    /// File containing the payload to hide
    pub payload: PathBuf,

    /// Output stego file path (extension must match the cover type)
    pub output: PathBuf,

    /// Sidecar key file save path (default: <output>.key.json)
    #[arg(short = 'k', long = "key")]
    pub key_out: Option<PathBuf>,

    /// Encryption cipher [Ascon-128 | ChaCha20-Poly1305 | AES-256-GCM]
    #[arg(short, long, default_value = "Ascon-128")]
    pub cipher: String,

    /// Steg mode for PNG/BMP covers [adaptive | sequential]
    #[arg(short, long, default_value = "adaptive")]
    pub mode: String,

    /// Deniable dual-payload mode (adaptive PNG/BMP only)
    #[arg(short, long)]
    pub deniable: bool,

    /// Decoy payload file for deniable mode (prompted when omitted)
    #[arg(long, requires = "deniable")]
    pub decoy: Option<PathBuf>,

    /// Passphrase. INSECURE: visible in shell history; omit to be prompted
    #[arg(short, long)]
    pub passphrase: Option<String>,

    /// Decoy passphrase for deniable mode (prompted when omitted)
    #[arg(long, requires = "deniable")]
    pub decoy_passphrase: Option<String>,

    /// Overwrite the output and sidecar files without prompting
    #[arg(short, long)]
    pub force: bool,

    /// Skip cover quality scoring
    #[arg(long)]
    pub no_score: bool,
}

impl CommandExecutor for EmbedCommand {
    fn execute(&self) -> Result<()> {
        if !self.cover.is_file() {
            bail!("cover file not found: {}", self.cover.display());
        }
        if !self.payload.is_file() {
            bail!("payload file not found: {}", self.payload.display());
        }

        let format = CoverFormat::detect(&self.cover)?;
        let cipher = CipherId::from_name(&self.cipher)
            .with_context(|| format!("unknown cipher '{}'", self.cipher))?;
        let mode = StegMode::from_name(&self.mode)?;

        if format != CoverFormat::Raster && mode != StegMode::Adaptive {
            eprintln!("note: this cover type has a single embedding mode; --mode is ignored");
        }
        if self.deniable && (format != CoverFormat::Raster || mode != StegMode::Adaptive) {
            bail!("deniable mode requires an adaptive PNG or BMP cover");
        }

        if self.output.exists() && !self.force {
            return Err(StegError::OutputExists(self.output.clone()).into());
        }
        let sidecar_path = self
            .key_out
            .clone()
            .unwrap_or_else(|| default_sidecar_path(&self.output));

        if !self.no_score && format != CoverFormat::Wav {
            match score_cover(&self.cover) {
                Ok(report) => {
                    print_score_line(&report);
                    if report.score < 35
                        && !confirm("Poor cover - embedding may be detectable. Continue?")?
                    {
                        bail!("cancelled");
                    }
                }
                Err(e) => eprintln!("warning: could not score cover: {e}"),
            }
        }

        let passphrase = resolve_passphrase(&self.passphrase, "Passphrase", true)?;
        let plaintext = Zeroizing::new(
            std::fs::read(&self.payload)
                .with_context(|| format!("failed to read {}", self.payload.display()))?,
        );
        if plaintext.is_empty() {
            bail!("payload file is empty: {}", self.payload.display());
        }
        let info_type = self
            .payload
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_else(|| ".txt".to_string());

        let (envelope, key) = crypto::encrypt(&plaintext, &passphrase, cipher)?;
        let mut steg_key = [0u8; 32];
        steg_key.copy_from_slice(&*key);

        let steg_mode_name = match format {
            CoverFormat::Raster => mode.name(),
            CoverFormat::Jpeg => stego::DCT_MODE_NAME,
            CoverFormat::Wav => StegMode::Sequential.name(),
        };

        if self.deniable {
            self.embed_deniable_flow(
                &envelope,
                &steg_key,
                cipher,
                &passphrase,
                &info_type,
                &sidecar_path,
            )?;
        } else {
            stego::embed(&self.cover, &envelope.ciphertext, &self.output, &steg_key, mode)?;
            Sidecar::new(&envelope, steg_mode_name, &info_type).write(&sidecar_path)?;
        }

        println!("Stego file: {}", self.output.display());
        println!("Key file:   {}", sidecar_path.display());
        if self.deniable {
            println!("Decoy key:  {}", decoy_sidecar_path(&sidecar_path).display());
        }
        println!("Cipher:     {}", cipher.name());
        println!("Mode:       {steg_mode_name}");
        println!("Payload:    {}", fmt_bytes(plaintext.len()));
        Ok(())
    }
}

impl EmbedCommand {
    fn embed_deniable_flow(
        &self,
        real_envelope: &stegcore::Envelope,
        real_key: &[u8; 32],
        cipher: CipherId,
        real_passphrase: &str,
        info_type: &str,
        sidecar_path: &std::path::Path,
    ) -> Result<()> {
        let decoy_path = match &self.decoy {
            Some(p) => p.clone(),
            None => super::prompt_path("Path to the decoy payload file")?,
        };
        let decoy_plaintext = Zeroizing::new(
            std::fs::read(&decoy_path)
                .with_context(|| format!("failed to read {}", decoy_path.display()))?,
        );
        if decoy_plaintext.is_empty() {
            bail!("decoy payload file is empty: {}", decoy_path.display());
        }

        let decoy_passphrase =
            resolve_passphrase(&self.decoy_passphrase, "Decoy passphrase", false)?;
        if decoy_passphrase == real_passphrase {
            bail!("decoy passphrase must differ from the real passphrase");
        }

        let (decoy_envelope, decoy_key) =
            crypto::encrypt(&decoy_plaintext, &decoy_passphrase, cipher)?;
        let mut decoy_steg_key = [0u8; 32];
        decoy_steg_key.copy_from_slice(&*decoy_key);

        let (partition_seed, real_half) = stego::embed_deniable(
            &self.cover,
            &real_envelope.ciphertext,
            &decoy_envelope.ciphertext,
            &self.output,
            real_key,
            &decoy_steg_key,
        )?;

        Sidecar::new_deniable(real_envelope, info_type, &partition_seed, real_half)
            .write(sidecar_path)?;
        Sidecar::new_deniable(&decoy_envelope, info_type, &partition_seed, 1 - real_half)
            .write(&decoy_sidecar_path(sidecar_path))?;
        Ok(())
    }
}

fn print_score_line(report: &CoverScore) {
    eprintln!(
        "Cover score: {}/100 - {} (adaptive capacity: {})",
        report.score,
        report.label.name(),
        fmt_bytes(report.adaptive_capacity),
    );
}
