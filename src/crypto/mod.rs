//! Passphrase-based authenticated encryption.
//!
//! Payloads are Zstandard-compressed, then sealed with one of three AEADs
//! under a key derived from the passphrase with Argon2id. The full 32 derived
//! bytes double as the steg key that seeds the adaptive position permutation,
//! which ties slot order to the passphrase; Ascon-128 truncates them to its
//! 16-byte cipher key.
//!
//! Decryption failure is always `AuthFail`. Wrong passphrase and tampered
//! ciphertext are indistinguishable, and nothing is ever returned on failure.

pub mod sidecar;

use crate::error::{Result, StegError};
use aes_gcm::Aes256Gcm;
use argon2::{Algorithm, Argon2, Params, Version};
// ascon-aead re-exports its own `aead` traits; import them anonymously so
// they resolve against whichever aead major that crate pins.
use ascon_aead::aead::{Aead as _, KeyInit as _};
use ascon_aead::{AsconAead128, AsconAead128Key, AsconAead128Nonce};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305,
};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

/// Argon2id salt length in bytes.
pub const SALT_LEN: usize = 16;
/// Derived key length; also the steg key length.
pub const DERIVED_KEY_LEN: usize = 32;

const ARGON2_TIME_COST: u32 = 3;
const ARGON2_MEMORY_KIB: u32 = 65536;
const ARGON2_PARALLELISM: u32 = 4;

/// Supported AEAD ciphers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherId {
    /// Ascon-128 AEAD, 16-byte key, 16-byte nonce. The default.
    Ascon128,
    /// IETF ChaCha20-Poly1305, 32-byte key, 12-byte nonce.
    ChaCha20Poly1305,
    /// AES-256-GCM, 32-byte key, 12-byte nonce.
    Aes256Gcm,
}

impl CipherId {
    pub const ALL: [CipherId; 3] = [
        CipherId::Ascon128,
        CipherId::ChaCha20Poly1305,
        CipherId::Aes256Gcm,
    ];

    /// The wire name recorded in sidecar files.
    pub fn name(self) -> &'static str {
        match self {
            CipherId::Ascon128 => "Ascon-128",
            CipherId::ChaCha20Poly1305 => "ChaCha20-Poly1305",
            CipherId::Aes256Gcm => "AES-256-GCM",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| StegError::MalformedSidecar(format!("unsupported cipher '{name}'")))
    }

    pub fn key_len(self) -> usize {
        match self {
            CipherId::Ascon128 => 16,
            CipherId::ChaCha20Poly1305 | CipherId::Aes256Gcm => 32,
        }
    }

    pub fn nonce_len(self) -> usize {
        match self {
            CipherId::Ascon128 => 16,
            CipherId::ChaCha20Poly1305 | CipherId::Aes256Gcm => 12,
        }
    }
}

/// Everything needed to decrypt except the passphrase.
pub struct Envelope {
    /// AEAD output: ciphertext with the authentication tag appended.
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
    pub salt: [u8; SALT_LEN],
    pub cipher: CipherId,
}

/// Derive the 32-byte key from a passphrase and salt with Argon2id
/// (t=3, m=64 MiB, p=4).
pub fn derive_key(passphrase: &str, salt: &[u8]) -> Zeroizing<[u8; DERIVED_KEY_LEN]> {
    let params = Params::new(
        ARGON2_MEMORY_KIB,
        ARGON2_TIME_COST,
        ARGON2_PARALLELISM,
        Some(DERIVED_KEY_LEN),
    )
    .expect("static Argon2 parameters are valid");
    let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; DERIVED_KEY_LEN]);
    argon
        .hash_password_into(passphrase.as_bytes(), salt, &mut *key)
        .expect("Argon2 key derivation with valid lengths cannot fail");
    key
}

/// Compress and encrypt a payload under a fresh salt and nonce.
///
/// Returns the envelope plus the derived key, which the caller feeds to the
/// position engine as the steg key.
pub fn encrypt(
    plaintext: &[u8],
    passphrase: &str,
    cipher: CipherId,
) -> Result<(Envelope, Zeroizing<[u8; DERIVED_KEY_LEN]>)> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let mut nonce = vec![0u8; cipher.nonce_len()];
    OsRng.fill_bytes(&mut nonce);

    let key = derive_key(passphrase, &salt);
    let compressed = Zeroizing::new(zstd::encode_all(
        plaintext,
        zstd::DEFAULT_COMPRESSION_LEVEL,
    )?);

    let ciphertext = seal(cipher, &key, &nonce, &compressed);

    Ok((
        Envelope {
            ciphertext,
            nonce,
            salt,
            cipher,
        },
        key,
    ))
}

/// Decrypt and decompress an envelope. Fails `AuthFail` on any mismatch.
pub fn decrypt(envelope: &Envelope, passphrase: &str) -> Result<Vec<u8>> {
    let key = derive_key(passphrase, &envelope.salt);
    decrypt_with_key(envelope, &key)
}

/// Decrypt with an already-derived key, saving a second KDF pass when the
/// caller needed the key for the position engine anyway.
pub fn decrypt_with_key(envelope: &Envelope, key: &[u8; DERIVED_KEY_LEN]) -> Result<Vec<u8>> {
    let compressed = Zeroizing::new(open(
        envelope.cipher,
        key,
        &envelope.nonce,
        &envelope.ciphertext,
    )?);
    // The AEAD already authenticated the data; a zstd failure here still must
    // not surface partial plaintext or a distinguishable error.
    zstd::decode_all(&compressed[..]).map_err(|_| StegError::AuthFail)
}

fn seal(cipher: CipherId, key: &[u8; DERIVED_KEY_LEN], nonce: &[u8], plaintext: &[u8]) -> Vec<u8> {
    match cipher {
        CipherId::Ascon128 => AsconAead128::new(AsconAead128Key::from_slice(&key[..16]))
            .encrypt(AsconAead128Nonce::from_slice(nonce), plaintext)
            .expect("AEAD encryption cannot fail"),
        CipherId::ChaCha20Poly1305 => ChaCha20Poly1305::new_from_slice(&key[..])
            .expect("valid key length")
            .encrypt(chacha20poly1305::Nonce::from_slice(nonce), plaintext)
            .expect("AEAD encryption cannot fail"),
        CipherId::Aes256Gcm => Aes256Gcm::new_from_slice(&key[..])
            .expect("valid key length")
            .encrypt(aes_gcm::Nonce::from_slice(nonce), plaintext)
            .expect("AEAD encryption cannot fail"),
    }
}

fn open(
    cipher: CipherId,
    key: &[u8; DERIVED_KEY_LEN],
    nonce: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    if nonce.len() != cipher.nonce_len() {
        return Err(StegError::AuthFail);
    }
    let plaintext = match cipher {
        CipherId::Ascon128 => AsconAead128::new(AsconAead128Key::from_slice(&key[..16]))
            .decrypt(AsconAead128Nonce::from_slice(nonce), ciphertext),
        CipherId::ChaCha20Poly1305 => ChaCha20Poly1305::new_from_slice(&key[..])
            .expect("valid key length")
            .decrypt(chacha20poly1305::Nonce::from_slice(nonce), ciphertext),
        CipherId::Aes256Gcm => Aes256Gcm::new_from_slice(&key[..])
            .expect("valid key length")
            .decrypt(aes_gcm::Nonce::from_slice(nonce), ciphertext),
    };
    plaintext.map_err(|_| StegError::AuthFail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_all_ciphers() {
        for cipher in CipherId::ALL {
            let (envelope, _key) = encrypt(b"attack at dawn", "hunter2", cipher).unwrap();
            assert_eq!(envelope.nonce.len(), cipher.nonce_len());
            let plaintext = decrypt(&envelope, "hunter2").unwrap();
            assert_eq!(plaintext, b"attack at dawn", "cipher {}", cipher.name());
        }
    }

    #[test]
    fn wrong_passphrase_is_auth_fail() {
        let (envelope, _) = encrypt(b"secret", "correct horse", CipherId::Ascon128).unwrap();
        assert!(matches!(
            decrypt(&envelope, "wrong"),
            Err(StegError::AuthFail)
        ));
    }

    #[test]
    fn flipped_ciphertext_bit_is_auth_fail() {
        let (mut envelope, _) = encrypt(b"secret", "pw", CipherId::Aes256Gcm).unwrap();
        envelope.ciphertext[0] ^= 0x01;
        assert!(matches!(decrypt(&envelope, "pw"), Err(StegError::AuthFail)));
    }

    #[test]
    fn derived_key_is_deterministic_and_salted() {
        let a = derive_key("pw", &[1u8; 16]);
        let b = derive_key("pw", &[1u8; 16]);
        let c = derive_key("pw", &[2u8; 16]);
        assert_eq!(*a, *b);
        assert_ne!(*a, *c);
    }

    #[test]
    fn repeated_encryption_differs() {
        let (a, _) = encrypt(b"same", "pw", CipherId::ChaCha20Poly1305).unwrap();
        let (b, _) = encrypt(b"same", "pw", CipherId::ChaCha20Poly1305).unwrap();
        assert_ne!(a.ciphertext, b.ciphertext);
        assert_ne!(a.salt, b.salt);
    }

    #[test]
    fn compression_helps_redundant_payloads() {
        let payload = vec![b'A'; 10_000];
        let (envelope, _) = encrypt(&payload, "pw", CipherId::Ascon128).unwrap();
        assert!(envelope.ciphertext.len() < payload.len() / 2);
        assert_eq!(decrypt(&envelope, "pw").unwrap(), payload);
    }

    #[test]
    fn empty_payload_roundtrips() {
        let (envelope, _) = encrypt(b"", "pw", CipherId::Ascon128).unwrap();
        assert_eq!(decrypt(&envelope, "pw").unwrap(), b"");
    }

    #[test]
    fn cipher_names_roundtrip() {
        for cipher in CipherId::ALL {
            assert_eq!(CipherId::from_name(cipher.name()).unwrap(), cipher);
        }
        assert!(matches!(
            CipherId::from_name("ROT13"),
            Err(StegError::MalformedSidecar(_))
        ));
    }
}
