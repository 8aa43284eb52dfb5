//! Info command - inspect a sidecar key file.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;

use stegcore::Sidecar;

use super::CommandExecutor;

/// Display the metadata stored in a sidecar key file.
///
/// Needs neither the stego file nor the passphrase; sidecars contain no
/// secrets.
#[derive(Args, Debug)]
pub struct InfoCommand {
    /// Sidecar key file to inspect
    pub key_file: PathBuf,
}

impl CommandExecutor for InfoCommand {
    fn execute(&self) -> Result<()> {
        if !self.key_file.is_file() {
            bail!("key file not found: {}", self.key_file.display());
        }

        let sidecar = Sidecar::read(&self.key_file)?;

        println!("File:          {}", self.key_file.display());
        println!("Cipher:        {}", sidecar.cipher);
        println!("Steg mode:     {}", sidecar.steg_mode);
        println!("Deniable:      {}", if sidecar.deniable { "yes" } else { "no" });
        println!("Payload type:  {}", sidecar.info_type);
        if sidecar.deniable {
            let (_, half) = sidecar.partition()?;
            println!("Partition:     half {half}");
        }
        Ok(())
    }
}
