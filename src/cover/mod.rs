//! Cover file loading and saving.
//!
//! Three cover variants behind one routing enum:
//! - lossless raster (PNG, BMP) -> spatial LSB
//! - JPEG -> quantised DCT coefficient LSB
//! - PCM WAV -> sample-byte LSB

pub mod jpeg;
pub mod raster;
pub mod wav;

pub use jpeg::CoefImage;
pub use raster::RasterCover;
pub use wav::WavCover;

use crate::error::{Result, StegError};
use std::path::Path;

/// Cover variant, detected from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverFormat {
    /// PNG or BMP.
    Raster,
    /// Baseline JPEG.
    Jpeg,
    /// PCM WAV.
    Wav,
}

impl CoverFormat {
    /// Route a path to its cover variant, or `UnsupportedFormat`.
    pub fn detect(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" | "bmp" => Ok(Self::Raster),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "wav" => Ok(Self::Wav),
            _ => Err(StegError::UnsupportedFormat(format!(".{ext}"))),
        }
    }
}

/// Parse a JPEG cover from disk into coefficient planes.
pub fn load_jpeg(path: &Path) -> Result<CoefImage> {
    let bytes = std::fs::read(path)?;
    CoefImage::from_bytes(&bytes).map_err(|e| StegError::MalformedCover {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Encode a JPEG cover back to disk.
pub fn save_jpeg(jpeg: &CoefImage, path: &Path) -> Result<()> {
    let bytes = jpeg.to_bytes().map_err(|e| StegError::MalformedCover {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    std::fs::write(path, bytes)?;
    Ok(())
}
