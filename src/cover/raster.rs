//! Lossless raster cover I/O (PNG, BMP).
//!
//! The loader always copies the decoded pixels into an owned, contiguous
//! `H x W x 3` buffer and drops the decoder before returning, so embedding
//! mutates exactly one allocation. Alpha channels are discarded; the save
//! path re-encodes losslessly from the same buffer.

use crate::error::{Result, StegError};
use image::RgbImage;
use std::path::Path;

/// An owned RGB pixel buffer, three bytes per pixel in row-major order.
pub struct RasterCover {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl RasterCover {
    /// Load a PNG or BMP cover into an owned buffer.
    pub fn load(path: &Path) -> Result<Self> {
        let decoded = image::open(path).map_err(|e| StegError::MalformedCover {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        // to_rgb8 copies into a fresh buffer; the DynamicImage (and with it
        // the decoder's allocation) is dropped here.
        let rgb = decoded.to_rgb8();
        let (width, height) = rgb.dimensions();
        Ok(Self {
            width: width as usize,
            height: height as usize,
            data: rgb.into_raw(),
        })
    }

    /// Build a cover from raw pixels; `data.len()` must be `height * width * 3`.
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Self {
        assert_eq!(data.len(), width * height * 3, "pixel buffer size mismatch");
        Self {
            width,
            height,
            data,
        }
    }

    /// Save losslessly; the format is chosen from the output extension
    /// (PNG or BMP).
    pub fn save(&self, path: &Path) -> Result<()> {
        let img = RgbImage::from_raw(self.width as u32, self.height as u32, self.data.clone())
            .expect("buffer size invariant");
        img.save(path).map_err(|e| StegError::MalformedCover {
            path: path.to_path_buf(),
            reason: format!("save failed: {e}"),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Total channel count (H * W * 3); one slot per channel byte.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}
