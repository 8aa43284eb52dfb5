//! Sidecar key files.
//!
//! A sidecar is the out-of-band JSON record required for extraction: cipher
//! name, steg mode, nonce and salt (base64, standard alphabet with padding),
//! a payload-type hint, and the partition fields for deniable embeds. It
//! never contains the passphrase or any derived key.
//!
//! For deniable embeds the real and decoy sidecars are structurally
//! identical; nothing in the file reveals which one is which.

use crate::crypto::{CipherId, Envelope, SALT_LEN};
use crate::error::{Result, StegError};
use crate::stego::partition::PARTITION_SEED_LEN;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_steg_mode() -> String {
    "sequential".to_string()
}

/// The sidecar record. Unknown JSON fields are ignored on read.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Sidecar {
    /// AEAD cipher name, e.g. "Ascon-128".
    pub cipher: String,
    /// "adaptive" | "sequential" for raster covers, "dct" for JPEG.
    #[serde(default = "default_steg_mode")]
    pub steg_mode: String,
    #[serde(default)]
    pub deniable: bool,
    /// Base64 AEAD nonce.
    pub nonce: String,
    /// Base64 Argon2 salt.
    pub salt: String,
    /// Filename extension hint for the recovered payload, e.g. ".txt".
    pub info_type: String,
    /// Base64 32-byte partition seed; deniable sidecars only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_seed: Option<String>,
    /// 0 or 1; deniable sidecars only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_half: Option<u8>,
}

impl Sidecar {
    /// Build a non-deniable sidecar from an envelope.
    pub fn new(envelope: &Envelope, steg_mode: &str, info_type: &str) -> Self {
        Self {
            cipher: envelope.cipher.name().to_string(),
            steg_mode: steg_mode.to_string(),
            deniable: false,
            nonce: BASE64.encode(&envelope.nonce),
            salt: BASE64.encode(envelope.salt),
            info_type: info_type.to_string(),
            partition_seed: None,
            partition_half: None,
        }
    }

    /// Build a deniable sidecar carrying the partition fields.
    pub fn new_deniable(
        envelope: &Envelope,
        info_type: &str,
        partition_seed: &[u8; PARTITION_SEED_LEN],
        partition_half: u8,
    ) -> Self {
        let mut sidecar = Self::new(envelope, "adaptive", info_type);
        sidecar.deniable = true;
        sidecar.partition_seed = Some(BASE64.encode(partition_seed));
        sidecar.partition_half = Some(partition_half);
        sidecar
    }

    /// Parse from a JSON string, validating required combinations.
    pub fn from_json(json: &str) -> Result<Self> {
        let sidecar: Sidecar = serde_json::from_str(json)
            .map_err(|e| StegError::MalformedSidecar(e.to_string()))?;
        sidecar.validate()?;
        Ok(sidecar)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).expect("sidecar serialisation cannot fail")
    }

    /// Read and validate a sidecar file.
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| StegError::MalformedSidecar(format!("{}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    /// Write the sidecar as pretty JSON.
    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json() + "\n")?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.deniable {
            if self.partition_seed.is_none() || self.partition_half.is_none() {
                return Err(StegError::MalformedSidecar(
                    "deniable sidecar is missing partition fields".to_string(),
                ));
            }
            if !matches!(self.partition_half, Some(0) | Some(1)) {
                return Err(StegError::MalformedSidecar(
                    "partition_half must be 0 or 1".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn cipher_id(&self) -> Result<CipherId> {
        CipherId::from_name(&self.cipher)
    }

    pub fn nonce_bytes(&self) -> Result<Vec<u8>> {
        BASE64
            .decode(&self.nonce)
            .map_err(|_| StegError::MalformedSidecar("nonce is not valid base64".to_string()))
    }

    pub fn salt_bytes(&self) -> Result<[u8; SALT_LEN]> {
        let bytes = BASE64
            .decode(&self.salt)
            .map_err(|_| StegError::MalformedSidecar("salt is not valid base64".to_string()))?;
        bytes
            .try_into()
            .map_err(|_| StegError::MalformedSidecar("salt must be 16 bytes".to_string()))
    }

    /// The partition seed and half, for deniable sidecars.
    pub fn partition(&self) -> Result<([u8; PARTITION_SEED_LEN], u8)> {
        let seed_b64 = self.partition_seed.as_ref().ok_or_else(|| {
            StegError::MalformedSidecar("deniable sidecar is missing partition_seed".to_string())
        })?;
        let half = self.partition_half.ok_or_else(|| {
            StegError::MalformedSidecar("deniable sidecar is missing partition_half".to_string())
        })?;
        let seed: [u8; PARTITION_SEED_LEN] = BASE64
            .decode(seed_b64)
            .map_err(|_| {
                StegError::MalformedSidecar("partition_seed is not valid base64".to_string())
            })?
            .try_into()
            .map_err(|_| {
                StegError::MalformedSidecar("partition_seed must be 32 bytes".to_string())
            })?;
        Ok((seed, half))
    }

    /// Rebuild the envelope from the sidecar plus the extracted ciphertext.
    pub fn envelope(&self, ciphertext: Vec<u8>) -> Result<Envelope> {
        Ok(Envelope {
            ciphertext,
            nonce: self.nonce_bytes()?,
            salt: self.salt_bytes()?,
            cipher: self.cipher_id()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::encrypt;
    use tempfile::tempdir;

    fn envelope() -> Envelope {
        encrypt(b"data", "pw", CipherId::Ascon128).unwrap().0
    }

    #[test]
    fn write_read_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stego.key.json");

        let sidecar = Sidecar::new(&envelope(), "adaptive", ".txt");
        sidecar.write(&path).unwrap();

        let loaded = Sidecar::read(&path).unwrap();
        assert_eq!(loaded, sidecar);
        assert_eq!(loaded.cipher_id().unwrap(), CipherId::Ascon128);
        assert_eq!(loaded.salt_bytes().unwrap().len(), 16);
    }

    #[test]
    fn reencoding_is_deterministic() {
        let sidecar = Sidecar::new(&envelope(), "sequential", ".bin");
        let json = sidecar.to_json();
        let reparsed = Sidecar::from_json(&json).unwrap();
        assert_eq!(reparsed.to_json(), json);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let mut value: serde_json::Value =
            serde_json::from_str(&Sidecar::new(&envelope(), "adaptive", ".txt").to_json()).unwrap();
        value["future_field"] = serde_json::json!("whatever");
        let sidecar = Sidecar::from_json(&value.to_string()).unwrap();
        assert_eq!(sidecar.steg_mode, "adaptive");
    }

    #[test]
    fn missing_required_field_rejected() {
        assert!(matches!(
            Sidecar::from_json(r#"{"cipher": "Ascon-128"}"#),
            Err(StegError::MalformedSidecar(_))
        ));
    }

    #[test]
    fn deniable_without_partition_fields_rejected() {
        let mut sidecar = Sidecar::new(&envelope(), "adaptive", ".txt");
        sidecar.deniable = true;
        let json = sidecar.to_json();
        assert!(matches!(
            Sidecar::from_json(&json),
            Err(StegError::MalformedSidecar(_))
        ));
    }

    #[test]
    fn deniable_roundtrip_and_structural_symmetry() {
        let seed = [5u8; 32];
        let real = Sidecar::new_deniable(&envelope(), ".txt", &seed, 0);
        let decoy = Sidecar::new_deniable(&envelope(), ".txt", &seed, 1);

        let real = Sidecar::from_json(&real.to_json()).unwrap();
        let (seed_back, half) = real.partition().unwrap();
        assert_eq!(seed_back, seed);
        assert_eq!(half, 0);

        // Field-for-field identical structure.
        let real_keys: Vec<_> = serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(
            &real.to_json(),
        )
        .unwrap()
        .keys()
        .cloned()
        .collect();
        let decoy_keys: Vec<_> = serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(
            &decoy.to_json(),
        )
        .unwrap()
        .keys()
        .cloned()
        .collect();
        assert_eq!(real_keys, decoy_keys);
    }

    #[test]
    fn bad_partition_half_rejected() {
        let seed = [5u8; 32];
        let mut sidecar = Sidecar::new_deniable(&envelope(), ".txt", &seed, 0);
        sidecar.partition_half = Some(7);
        assert!(matches!(
            Sidecar::from_json(&sidecar.to_json()),
            Err(StegError::MalformedSidecar(_))
        ));
    }

    #[test]
    fn default_steg_mode_is_sequential() {
        let json = r#"{"cipher":"AES-256-GCM","nonce":"AAAA","salt":"AAAAAAAAAAAAAAAAAAAAAA==","info_type":".txt"}"#;
        let sidecar = Sidecar::from_json(json).unwrap();
        assert_eq!(sidecar.steg_mode, "sequential");
        assert!(!sidecar.deniable);
    }
}
