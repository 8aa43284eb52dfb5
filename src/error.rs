//! Crate-wide error type.
//!
//! Every user-visible failure maps onto one of these variants. Cryptographic
//! failure is always `AuthFail` -- a wrong passphrase and a tampered stego
//! file are deliberately indistinguishable, and no partial plaintext is ever
//! returned alongside an error.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by embedding, extraction, scoring, and sidecar handling.
#[derive(Error, Debug)]
pub enum StegError {
    /// AEAD tag mismatch: wrong passphrase or corrupted stego data.
    #[error("authentication failed: wrong passphrase or corrupted stego data")]
    AuthFail,

    /// The cover does not have enough eligible slots for the framed payload.
    #[error("cover too small: need {needed} bytes, have capacity for {available}")]
    CoverTooSmall { needed: usize, available: usize },

    /// The cover file extension is not one of png/bmp/jpg/jpeg/wav.
    #[error("unsupported format '{0}' (supported: .png, .bmp, .jpg, .jpeg, .wav)")]
    UnsupportedFormat(String),

    /// A required sidecar field is missing or invalid.
    #[error("malformed sidecar: {0}")]
    MalformedSidecar(String),

    /// The decoder rejected the cover file.
    #[error("malformed cover {}: {reason}", path.display())]
    MalformedCover { path: PathBuf, reason: String },

    /// Deniable flags or steg mode inconsistent with the sidecar or cover type.
    #[error("mode mismatch: {0}")]
    ModeMismatch(String),

    /// The output file exists and overwriting was not permitted.
    #[error("output file already exists: {} (use --force to overwrite)", .0.display())]
    OutputExists(PathBuf),

    /// The bit stream ended before the framed payload was complete.
    #[error("bit stream ended before the framed payload was complete")]
    ShortRead,

    /// The frame header declares a length larger than the remaining capacity.
    #[error("frame header length exceeds remaining capacity")]
    OversizeHeader,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StegError>;
