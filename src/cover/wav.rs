//! PCM WAV cover I/O.
//!
//! A minimal RIFF chunk walk: everything before the `data` chunk payload is
//! kept verbatim as the header, everything after it as the trailer, and only
//! the raw sample bytes in between are mutable. Rewriting header bytes
//! untouched means any fmt extensions, LIST/INFO chunks, or odd chunk
//! ordering survive the round trip.
//!
//! Sample-level structure is deliberately ignored: one slot per sample-data
//! byte, whatever the bit depth.

use crate::error::{Result, StegError};
use std::fs;
use std::path::Path;

/// WAVE format tags accepted for embedding. Extensible files must carry the
/// PCM sub-format GUID.
const FORMAT_PCM: u16 = 0x0001;
const FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// KSDATAFORMAT_SUBTYPE_PCM (00000001-0000-0010-8000-00AA00389B71) in its
/// on-disk byte order: the first three GUID fields little-endian, the rest
/// as written.
const PCM_SUBFORMAT_GUID: [u8; 16] = [
    0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, //
    0x80, 0x00, 0x00, 0xAA, 0x00, 0x38, 0x9B, 0x71,
];

/// A WAV file split into verbatim header, mutable sample bytes, and verbatim
/// trailer.
pub struct WavCover {
    header: Vec<u8>,
    samples: Vec<u8>,
    trailer: Vec<u8>,
}

impl WavCover {
    /// Load a PCM WAV file.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes).map_err(|reason| StegError::MalformedCover {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        })
    }

    fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, &'static str> {
        if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
            return Err("not a RIFF/WAVE file");
        }

        let mut pos = 12usize;
        let mut format_tag: Option<u16> = None;

        while pos + 8 <= bytes.len() {
            let chunk_id = &bytes[pos..pos + 4];
            let chunk_len =
                u32::from_le_bytes([bytes[pos + 4], bytes[pos + 5], bytes[pos + 6], bytes[pos + 7]])
                    as usize;
            let body_start = pos + 8;
            if body_start + chunk_len > bytes.len() {
                return Err("truncated chunk");
            }

            match chunk_id {
                b"fmt " => {
                    if chunk_len < 16 {
                        return Err("fmt chunk too short");
                    }
                    let tag = u16::from_le_bytes([bytes[body_start], bytes[body_start + 1]]);
                    if tag == FORMAT_EXTENSIBLE {
                        // The 22-byte extension holds the real sub-format:
                        // cbSize at offset 16, the GUID at offset 24.
                        if chunk_len < 40 {
                            return Err("extensible fmt chunk too short");
                        }
                        let cb_size = u16::from_le_bytes([
                            bytes[body_start + 16],
                            bytes[body_start + 17],
                        ]);
                        if cb_size < 22 {
                            return Err("extensible fmt chunk too short");
                        }
                        if bytes[body_start + 24..body_start + 40] != PCM_SUBFORMAT_GUID {
                            return Err("only PCM WAV is supported");
                        }
                    }
                    format_tag = Some(tag);
                }
                b"data" => {
                    match format_tag {
                        Some(FORMAT_PCM) | Some(FORMAT_EXTENSIBLE) => {}
                        Some(_) => return Err("only PCM WAV is supported"),
                        None => return Err("data chunk before fmt chunk"),
                    }
                    return Ok(Self {
                        header: bytes[..body_start].to_vec(),
                        samples: bytes[body_start..body_start + chunk_len].to_vec(),
                        trailer: bytes[body_start + chunk_len..].to_vec(),
                    });
                }
                _ => {}
            }

            // Chunks are word-aligned; odd lengths carry a pad byte.
            pos = body_start + chunk_len + (chunk_len & 1);
        }

        Err("no data chunk found")
    }

    /// Write the file back: header and trailer verbatim, samples as mutated.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut out = Vec::with_capacity(self.header.len() + self.samples.len() + self.trailer.len());
        out.extend_from_slice(&self.header);
        out.extend_from_slice(&self.samples);
        out.extend_from_slice(&self.trailer);
        fs::write(path, out)?;
        Ok(())
    }

    /// Number of sample-data bytes; one slot each.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [u8] {
        &mut self.samples
    }
}
