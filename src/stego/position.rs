//! Position engine: the deterministic, keyed slot sequences that embedding
//! and extraction must agree on bit-for-bit.
//!
//! Raster adaptive mode derives an eligibility mask from local 3x3 variance
//! computed over the cover with all LSBs zeroed. Because embedding only ever
//! touches LSBs, both sides see the identical masked input and therefore the
//! identical mask, regardless of what was embedded. The eligible slots are
//! then permuted with a ChaCha20-keyed Fisher-Yates shuffle seeded from the
//! steg key, binding slot order to the passphrase.

use crate::cover::{CoefImage, RasterCover};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Fixed eligibility threshold over 8-bit samples.
pub const VARIANCE_THRESHOLD: f64 = 10.0;

/// A slot in a JPEG cover: component index and flat row-major index into that
/// component's coefficient plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoefSlot {
    pub comp: usize,
    pub idx: usize,
}

/// Local 3x3 variance of the channel-mean, one value per pixel.
///
/// LSBs are zeroed before averaging; border pixels clamp to available
/// neighbours (edge replication).
pub fn variance_map(cover: &RasterCover) -> Vec<f64> {
    let (w, h) = (cover.width(), cover.height());
    let pixels = cover.pixels();

    // Channel mean of the LSB-zeroed pixel.
    let mut gray = vec![0f64; w * h];
    for (i, g) in gray.iter_mut().enumerate() {
        let base = i * 3;
        let sum = (pixels[base] & 0xFE) as u32
            + (pixels[base + 1] & 0xFE) as u32
            + (pixels[base + 2] & 0xFE) as u32;
        *g = sum as f64 / 3.0;
    }

    let mut variance = vec![0f64; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut sum = 0f64;
            let mut sum_sq = 0f64;
            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    let ny = (y as i64 + dy).clamp(0, h as i64 - 1) as usize;
                    let nx = (x as i64 + dx).clamp(0, w as i64 - 1) as usize;
                    let v = gray[ny * w + nx];
                    sum += v;
                    sum_sq += v * v;
                }
            }
            let mean = sum / 9.0;
            variance[y * w + x] = sum_sq / 9.0 - mean * mean;
        }
    }
    variance
}

/// Per-pixel eligibility: 3x3 variance at or above the threshold.
pub fn eligibility_mask(cover: &RasterCover) -> Vec<bool> {
    variance_map(cover)
        .into_iter()
        .map(|v| v >= VARIANCE_THRESHOLD)
        .collect()
}

/// Eligible channel slots in row-major pixel x channel (R, G, B) order.
///
/// This enumeration is key-independent; it is the input to both the adaptive
/// keyed shuffle and the deniable partition.
pub fn eligible_slots(cover: &RasterCover) -> Vec<usize> {
    let mask = eligibility_mask(cover);
    let mut slots = Vec::with_capacity(mask.iter().filter(|&&m| m).count() * 3);
    for (pixel, &eligible) in mask.iter().enumerate() {
        if eligible {
            let base = pixel * 3;
            slots.extend([base, base + 1, base + 2]);
        }
    }
    slots
}

/// All channel slots in row-major order. Debug mode, no key input.
pub fn sequential_slots(cover: &RasterCover) -> Vec<usize> {
    (0..cover.len()).collect()
}

/// Keyed Fisher-Yates shuffle driven by a ChaCha20 stream.
///
/// The RNG is freshly seeded per call, so embed and extract always start from
/// the same stream position. `u32` ranges keep the draw sequence identical
/// across 32- and 64-bit targets; `gen_range` rejection-samples internally.
pub fn shuffle_keyed<T>(items: &mut [T], seed: &[u8; 32]) {
    let mut rng = ChaCha20Rng::from_seed(*seed);
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=(i as u32)) as usize;
        items.swap(i, j);
    }
}

/// Adaptive slot sequence: eligible slots, keyed-permuted.
pub fn adaptive_slots(cover: &RasterCover, key: &[u8; 32]) -> Vec<usize> {
    let mut slots = eligible_slots(cover);
    shuffle_keyed(&mut slots, key);
    slots
}

/// A JPEG AC coefficient is usable iff its value lies outside {-2, -1, 0, 1}.
///
/// Writing bit 1 into -2 would produce -1 (`(-2 & !1) | 1 == -1` in two's
/// complement), which the extractor would skip; excluding -2 on both sides
/// keeps the usable set identical before and after embedding.
pub fn coef_usable(value: i16) -> bool {
    !(-2..=1).contains(&value)
}

/// JPEG slot sequence: usable AC coefficients of every component, row-major
/// over each plane, component order Y, Cb, Cr. No permutation.
pub fn dct_slots(jpeg: &CoefImage) -> Vec<CoefSlot> {
    let mut slots = Vec::new();
    for comp in 0..jpeg.num_components() {
        let plane = jpeg.plane(comp);
        for idx in 0..plane.len() {
            if !plane.is_dc(idx) && coef_usable(plane.at(idx)) {
                slots.push(CoefSlot { comp, idx });
            }
        }
    }
    slots
}
