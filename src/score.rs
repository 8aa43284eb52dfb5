//! Cover quality scoring.
//!
//! A pure function of the cover pixels: histogram entropy, texture density
//! (the fraction of pixels passing the adaptive variance mask), and
//! resolution, combined into a 0-100 score. Front-ends use this to steer
//! users toward covers that hide data well; the embedder itself never
//! consults it.

use crate::cover::{CoverFormat, RasterCover};
use crate::error::{Result, StegError};
use crate::stego::{self, bits::HEADER_BITS, position, StegMode};
use std::path::Path;

/// Human-facing quality bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreLabel {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl ScoreLabel {
    fn from_score(score: u8) -> Self {
        match score {
            75.. => ScoreLabel::Excellent,
            55..=74 => ScoreLabel::Good,
            35..=54 => ScoreLabel::Fair,
            _ => ScoreLabel::Poor,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ScoreLabel::Excellent => "Excellent",
            ScoreLabel::Good => "Good",
            ScoreLabel::Fair => "Fair",
            ScoreLabel::Poor => "Poor",
        }
    }
}

/// Score report for one cover image.
#[derive(Debug, Clone)]
pub struct CoverScore {
    pub score: u8,
    pub label: ScoreLabel,
    /// Shannon entropy of the 8-bit sample histogram, in bits (0-8).
    pub entropy: f64,
    /// Fraction of pixels passing the adaptive variance mask (0-1).
    pub texture_density: f64,
    pub width: usize,
    pub height: usize,
    pub adaptive_capacity: usize,
    pub sequential_capacity: usize,
}

const ENTROPY_WEIGHT: f64 = 0.40;
const TEXTURE_WEIGHT: f64 = 0.40;
const RESOLUTION_WEIGHT: f64 = 0.20;
/// Texture density at which the texture term saturates.
const TEXTURE_SATURATION: f64 = 0.5;
/// Pixel count at which the resolution term saturates (full HD).
const RESOLUTION_SATURATION: f64 = 1920.0 * 1080.0;

/// Score a cover image (PNG, BMP, or JPEG; JPEG is scored over its decoded
/// pixels).
pub fn score_cover(path: &Path) -> Result<CoverScore> {
    let format = CoverFormat::detect(path)?;
    let cover = match format {
        CoverFormat::Raster => RasterCover::load(path)?,
        CoverFormat::Jpeg => {
            let decoded = image::open(path).map_err(|e| StegError::MalformedCover {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
            let rgb = decoded.to_rgb8();
            let (w, h) = rgb.dimensions();
            RasterCover::from_raw(w as usize, h as usize, rgb.into_raw())
        }
        CoverFormat::Wav => {
            return Err(StegError::UnsupportedFormat(
                ".wav (scoring applies to image covers)".to_string(),
            ))
        }
    };

    let (width, height) = (cover.width(), cover.height());
    let entropy = histogram_entropy(cover.pixels());

    let mask = position::eligibility_mask(&cover);
    let eligible_pixels = mask.iter().filter(|&&m| m).count();
    let texture_density = eligible_pixels as f64 / (width * height) as f64;

    let (adaptive_capacity, sequential_capacity) = match format {
        CoverFormat::Raster => (
            (eligible_pixels * 3).saturating_sub(HEADER_BITS) / 8,
            cover.len().saturating_sub(HEADER_BITS) / 8,
        ),
        // JPEG capacity lives in the DCT domain, same for either mode name.
        _ => {
            let dct = stego::capacity(path, StegMode::Adaptive)?;
            (dct, dct)
        }
    };

    let raw = ENTROPY_WEIGHT * (entropy / 8.0)
        + TEXTURE_WEIGHT * (texture_density / TEXTURE_SATURATION).min(1.0)
        + RESOLUTION_WEIGHT * ((width * height) as f64 / RESOLUTION_SATURATION).min(1.0);
    let score = (raw * 100.0).round().clamp(0.0, 100.0) as u8;

    Ok(CoverScore {
        score,
        label: ScoreLabel::from_score(score),
        entropy,
        texture_density,
        width,
        height,
        adaptive_capacity,
        sequential_capacity,
    })
}

fn histogram_entropy(samples: &[u8]) -> f64 {
    let mut counts = [0u64; 256];
    for &b in samples {
        counts[b as usize] += 1;
    }
    let total = samples.len() as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{RngCore, SeedableRng};
    use rand_chacha::ChaCha20Rng;
    use tempfile::tempdir;

    #[test]
    fn uniform_cover_scores_poorly() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("flat.png");
        RasterCover::from_raw(64, 64, vec![200u8; 64 * 64 * 3])
            .save(&path)
            .unwrap();

        let report = score_cover(&path).unwrap();
        assert!(report.entropy < 0.01);
        assert_eq!(report.texture_density, 0.0);
        assert_eq!(report.adaptive_capacity, 0);
        assert_eq!(report.label, ScoreLabel::Poor);
    }

    #[test]
    fn noise_cover_scores_well() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("noise.png");
        let mut data = vec![0u8; 256 * 256 * 3];
        ChaCha20Rng::seed_from_u64(1).fill_bytes(&mut data);
        RasterCover::from_raw(256, 256, data).save(&path).unwrap();

        let report = score_cover(&path).unwrap();
        assert!(report.entropy > 7.9);
        assert!(report.texture_density > 0.9);
        assert!(report.score >= 75, "score {}", report.score);
        assert_eq!(report.label, ScoreLabel::Excellent);
        assert!(report.adaptive_capacity > 0);
        assert!(report.sequential_capacity >= report.adaptive_capacity);
    }

    #[test]
    fn wav_is_not_scorable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.wav");
        std::fs::write(&path, b"RIFF").unwrap();
        assert!(matches!(
            score_cover(&path),
            Err(StegError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn label_bands() {
        assert_eq!(ScoreLabel::from_score(75), ScoreLabel::Excellent);
        assert_eq!(ScoreLabel::from_score(74), ScoreLabel::Good);
        assert_eq!(ScoreLabel::from_score(55), ScoreLabel::Good);
        assert_eq!(ScoreLabel::from_score(54), ScoreLabel::Fair);
        assert_eq!(ScoreLabel::from_score(35), ScoreLabel::Fair);
        assert_eq!(ScoreLabel::from_score(34), ScoreLabel::Poor);
    }
}
