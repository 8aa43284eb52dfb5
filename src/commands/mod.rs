//! CLI commands - strategy pattern.
//!
//! Each subcommand is its own module with a struct holding the parsed
//! arguments and a `CommandExecutor` implementation for the logic.

mod ciphers;
mod embed;
mod extract;
mod info;
mod score;
mod wizard;

pub use ciphers::CiphersCommand;
pub use embed::EmbedCommand;
pub use extract::ExtractCommand;
pub use info::InfoCommand;
pub use score::ScoreCommand;
pub use wizard::WizardCommand;

use anyhow::{bail, Context, Result};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// Trait for command execution.
pub trait CommandExecutor {
    fn execute(&self) -> Result<()>;
}

/// Read a line from stdin with a prompt on stderr.
///
/// No echo suppression is attempted: when stdin is a pipe there is no
/// terminal to suppress, and the interactive path keeps the dependency
/// surface flat. Passphrases passed via `--passphrase` are warned about
/// separately (shell history).
fn prompt_line(prompt: &str) -> Result<String> {
    eprint!("{prompt}: ");
    std::io::stderr().flush().ok();
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Resolve a passphrase from the flag or by prompting, with validation.
pub(crate) fn resolve_passphrase(
    flag: &Option<String>,
    label: &str,
    confirm: bool,
) -> Result<String> {
    let passphrase = match flag {
        Some(p) => {
            eprintln!("warning: passphrase passed as argument is visible in shell history");
            p.clone()
        }
        None => {
            let p = prompt_line(label)?;
            if confirm {
                let again = prompt_line(&format!("Confirm {}", label.to_lowercase()))?;
                if p != again {
                    bail!("passphrases do not match");
                }
            }
            p
        }
    };

    if passphrase.trim().is_empty() {
        bail!("passphrase cannot be empty");
    }
    if passphrase.len() < 4 {
        bail!("passphrase too short (minimum 4 characters)");
    }
    Ok(passphrase)
}

pub(crate) fn prompt_path(label: &str) -> Result<PathBuf> {
    let raw = prompt_line(label)?;
    if raw.is_empty() {
        bail!("no path provided");
    }
    Ok(PathBuf::from(raw))
}

pub(crate) fn confirm(question: &str) -> Result<bool> {
    let answer = prompt_line(&format!("{question} [y/N]"))?;
    Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
}

pub(crate) fn fmt_bytes(n: usize) -> String {
    if n >= 1_048_576 {
        format!("{:.2} MB", n as f64 / 1_048_576.0)
    } else if n >= 1_024 {
        format!("{:.1} KB", n as f64 / 1_024.0)
    } else {
        format!("{n} B")
    }
}

/// Default sidecar path: `stego.png` -> `stego.key.json`.
pub(crate) fn default_sidecar_path(output: &Path) -> PathBuf {
    output.with_extension("key.json")
}

/// Decoy sidecar path: `stego.key.json` -> `stego.key.decoy.json`.
pub(crate) fn decoy_sidecar_path(sidecar: &Path) -> PathBuf {
    sidecar.with_extension("decoy.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sidecar_paths() {
        let out = PathBuf::from("/tmp/stego.png");
        let key = default_sidecar_path(&out);
        assert_eq!(key, PathBuf::from("/tmp/stego.key.json"));
        assert_eq!(
            decoy_sidecar_path(&key),
            PathBuf::from("/tmp/stego.key.decoy.json")
        );
    }

    #[test]
    fn byte_formatting() {
        assert_eq!(fmt_bytes(512), "512 B");
        assert_eq!(fmt_bytes(2048), "2.0 KB");
        assert_eq!(fmt_bytes(3 * 1_048_576), "3.00 MB");
    }
}
