//! # Stegcore - crypto-steganography engine
//!
//! Stegcore hides an arbitrary byte payload inside an ordinary media file so
//! that the cover looks unchanged, the hidden bytes are authenticated-
//! encrypted under a passphrase, and - under coercion - a plausible decoy
//! payload can be revealed from the same cover without exposing the real one.
//!
//! ## Pipeline
//!
//! Embedding: payload -> zstd compress -> AEAD encrypt (Argon2id-derived key)
//! -> 32-bit length framing -> keyed slot sequence over the cover -> LSB
//! writes -> lossless re-encode -> sidecar key file. Extraction inverts it.
//!
//! ## Cover formats
//!
//! - **PNG / BMP** - spatial LSB, either *adaptive* (3x3 variance mask plus a
//!   ChaCha20-keyed slot permutation bound to the passphrase) or
//!   *sequential* (debug).
//! - **JPEG** - LSB of quantised DCT AC coefficients, values outside
//!   {-2, -1, 0, 1}; re-encoded without requantisation.
//! - **PCM WAV** - LSB of raw sample-data bytes; the header is preserved
//!   byte-for-byte.
//!
//! ## Security model
//!
//! The passphrase is the only secret. The same 32 Argon2id-derived bytes key
//! the AEAD and seed the adaptive slot permutation, so an attacker holding
//! the sidecar but not the passphrase can neither decrypt the payload nor
//! reconstruct which pixels carry it. Deniable mode partitions the eligible
//! slots into two indistinguishable halves keyed by independent passphrases.
//!
//! ## Example
//!
//! ```no_run
//! use stegcore::{crypto, stego, CipherId, StegMode};
//! use std::path::Path;
//!
//! # fn main() -> stegcore::Result<()> {
//! let (envelope, key) = crypto::encrypt(b"meet at noon", "passphrase", CipherId::Ascon128)?;
//! let mut steg_key = [0u8; 32];
//! steg_key.copy_from_slice(&*key);
//!
//! stego::embed(
//!     Path::new("cover.png"),
//!     &envelope.ciphertext,
//!     Path::new("stego.png"),
//!     &steg_key,
//!     StegMode::Adaptive,
//! )?;
//! # Ok(())
//! # }
//! ```

pub mod cover;
pub mod crypto;
pub mod error;
pub mod score;
pub mod stego;

pub use crypto::sidecar::Sidecar;
pub use crypto::{decrypt, derive_key, encrypt, CipherId, Envelope};
pub use error::{Result, StegError};
pub use score::{score_cover, CoverScore, ScoreLabel};
pub use stego::{capacity, embed, embed_deniable, extract, extract_deniable, StegMode};
