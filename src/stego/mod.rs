//! Steganographic embedding and extraction.
//!
//! One embed or extract call owns its cover buffer for the whole call: the
//! slot sequence is produced, the LSB writes go straight into that buffer,
//! and the buffer is re-encoded, with no aliasing view in between. The slot
//! sequence observed while writing is exactly the one the position engine
//! produced; nothing mutates the cover between enumeration and writing.

pub mod bits;
pub mod partition;
pub mod position;

use crate::cover::{self, CoverFormat, RasterCover, WavCover};
use crate::error::{Result, StegError};
use bits::HEADER_BITS;
use position::CoefSlot;
use rand::rngs::OsRng;
use rand::RngCore;
use std::path::Path;

/// Raster embedding mode. JPEG and WAV covers have a single, implied mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StegMode {
    /// Variance-masked, key-permuted slots. The default.
    Adaptive,
    /// Plain row-major slots; debugging only.
    Sequential,
}

impl StegMode {
    pub fn name(self) -> &'static str {
        match self {
            StegMode::Adaptive => "adaptive",
            StegMode::Sequential => "sequential",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "adaptive" => Ok(StegMode::Adaptive),
            "sequential" => Ok(StegMode::Sequential),
            other => Err(StegError::ModeMismatch(format!(
                "unknown steg mode '{other}'"
            ))),
        }
    }
}

/// Steg mode string recorded in sidecars for JPEG covers.
pub const DCT_MODE_NAME: &str = "dct";

// ---------------------------------------------------------------------------
// Slot-level bit plumbing
// ---------------------------------------------------------------------------

fn check_capacity(slot_count: usize, payload_len: usize) -> Result<()> {
    let needed_bits = HEADER_BITS + payload_len * 8;
    if needed_bits > slot_count {
        return Err(StegError::CoverTooSmall {
            needed: payload_len,
            available: slot_count.saturating_sub(HEADER_BITS) / 8,
        });
    }
    Ok(())
}

/// Write the k-th bit of the stream into the LSB of `buf[slots[k]]`.
fn write_bits_bytes(buf: &mut [u8], slots: &[usize], stream: &[u8]) {
    for (&slot, &bit) in slots.iter().zip(stream.iter()) {
        buf[slot] = (buf[slot] & !1) | bit;
    }
}

/// Read one LSB per slot, up to `n` bits.
fn read_bits_bytes(buf: &[u8], slots: &[usize], n: usize) -> Vec<u8> {
    slots.iter().take(n).map(|&slot| buf[slot] & 1).collect()
}

/// Extract a framed payload from byte-buffer slots.
///
/// An implausible header (zero length or more than the slots can hold) is
/// reported as `AuthFail`: with a keyed slot order it is indistinguishable
/// from a wrong passphrase, and the two must not be told apart.
fn extract_framed_bytes(buf: &[u8], slots: &[usize]) -> Result<Vec<u8>> {
    if slots.len() < HEADER_BITS {
        return Err(StegError::AuthFail);
    }
    let header = bits::bits_to_bytes(&read_bits_bytes(buf, slots, HEADER_BITS));
    let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
    let max = (slots.len() - HEADER_BITS) / 8;
    if len == 0 || len > max {
        return Err(StegError::AuthFail);
    }
    let payload_bits = read_bits_bytes(buf, &slots[HEADER_BITS..], len * 8);
    Ok(bits::bits_to_bytes(&payload_bits))
}

fn write_bits_coefs(jpeg: &mut cover::CoefImage, slots: &[CoefSlot], stream: &[u8]) {
    for (&CoefSlot { comp, idx }, &bit) in slots.iter().zip(stream.iter()) {
        let plane = jpeg.plane_mut(comp);
        let value = plane.at(idx);
        plane.put(idx, (value & !1) | bit as i16);
    }
}

fn extract_framed_coefs(jpeg: &cover::CoefImage, slots: &[CoefSlot]) -> Result<Vec<u8>> {
    if slots.len() < HEADER_BITS {
        return Err(StegError::AuthFail);
    }
    let read = |range: &[CoefSlot], n: usize| -> Vec<u8> {
        range
            .iter()
            .take(n)
            .map(|&CoefSlot { comp, idx }| (jpeg.plane(comp).at(idx) & 1) as u8)
            .collect()
    };
    let header = bits::bits_to_bytes(&read(slots, HEADER_BITS));
    let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
    let max = (slots.len() - HEADER_BITS) / 8;
    if len == 0 || len > max {
        return Err(StegError::AuthFail);
    }
    Ok(bits::bits_to_bytes(&read(&slots[HEADER_BITS..], len * 8)))
}

fn raster_slots(cover: &RasterCover, key: &[u8; 32], mode: StegMode) -> Vec<usize> {
    match mode {
        StegMode::Adaptive => position::adaptive_slots(cover, key),
        StegMode::Sequential => position::sequential_slots(cover),
    }
}

fn expect_output_format(output: &Path, expected: CoverFormat) -> Result<()> {
    if CoverFormat::detect(output)? != expected {
        return Err(StegError::ModeMismatch(format!(
            "output extension of '{}' does not match the cover type",
            output.display()
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Public operations
// ---------------------------------------------------------------------------

/// Embeddable payload bytes for a cover and mode (already net of the 4-byte
/// length header). Capacity never depends on the key: the eligibility mask
/// is key-independent and the permutation only reorders slots.
pub fn capacity(cover_path: &Path, mode: StegMode) -> Result<usize> {
    let slot_count = match CoverFormat::detect(cover_path)? {
        CoverFormat::Raster => {
            let cover = RasterCover::load(cover_path)?;
            match mode {
                StegMode::Adaptive => position::eligible_slots(&cover).len(),
                StegMode::Sequential => cover.len(),
            }
        }
        CoverFormat::Jpeg => {
            let jpeg = cover::load_jpeg(cover_path)?;
            position::dct_slots(&jpeg).len()
        }
        CoverFormat::Wav => WavCover::load(cover_path)?.len(),
    };
    Ok(slot_count.saturating_sub(HEADER_BITS) / 8)
}

/// Embed a payload into a cover file, writing the stego file to `output`.
///
/// `key` is the 32-byte steg key from [`crate::crypto::encrypt`]; it drives
/// the adaptive permutation and is ignored by the unkeyed modes.
pub fn embed(
    cover_path: &Path,
    payload: &[u8],
    output: &Path,
    key: &[u8; 32],
    mode: StegMode,
) -> Result<()> {
    let stream = bits::frame(payload);

    match CoverFormat::detect(cover_path)? {
        CoverFormat::Raster => {
            expect_output_format(output, CoverFormat::Raster)?;
            let mut cover = RasterCover::load(cover_path)?;
            let slots = raster_slots(&cover, key, mode);
            check_capacity(slots.len(), payload.len())?;
            write_bits_bytes(cover.pixels_mut(), &slots, &stream);
            cover.save(output)
        }
        CoverFormat::Jpeg => {
            expect_output_format(output, CoverFormat::Jpeg)?;
            let mut jpeg = cover::load_jpeg(cover_path)?;
            let slots = position::dct_slots(&jpeg);
            check_capacity(slots.len(), payload.len())?;
            write_bits_coefs(&mut jpeg, &slots, &stream);
            cover::save_jpeg(&jpeg, output)
        }
        CoverFormat::Wav => {
            expect_output_format(output, CoverFormat::Wav)?;
            let mut cover = WavCover::load(cover_path)?;
            let slots: Vec<usize> = (0..cover.len()).collect();
            check_capacity(slots.len(), payload.len())?;
            write_bits_bytes(cover.samples_mut(), &slots, &stream);
            cover.save(output)
        }
    }
}

/// Extract a payload from a stego file. The inverse of [`embed`].
pub fn extract(stego_path: &Path, key: &[u8; 32], mode: StegMode) -> Result<Vec<u8>> {
    match CoverFormat::detect(stego_path)? {
        CoverFormat::Raster => {
            let cover = RasterCover::load(stego_path)?;
            let slots = raster_slots(&cover, key, mode);
            extract_framed_bytes(cover.pixels(), &slots)
        }
        CoverFormat::Jpeg => {
            let jpeg = cover::load_jpeg(stego_path)?;
            let slots = position::dct_slots(&jpeg);
            extract_framed_coefs(&jpeg, &slots)
        }
        CoverFormat::Wav => {
            let cover = WavCover::load(stego_path)?;
            let slots: Vec<usize> = (0..cover.len()).collect();
            extract_framed_bytes(cover.samples(), &slots)
        }
    }
}

/// Embed two payloads into one raster cover so that either can be revealed
/// in isolation.
///
/// Returns the partition seed and the half assigned to the real payload; the
/// caller records them in the two sidecars. The half is chosen at random so
/// the assignment itself carries no information.
pub fn embed_deniable(
    cover_path: &Path,
    real_payload: &[u8],
    decoy_payload: &[u8],
    output: &Path,
    real_key: &[u8; 32],
    decoy_key: &[u8; 32],
) -> Result<([u8; partition::PARTITION_SEED_LEN], u8)> {
    if CoverFormat::detect(cover_path)? != CoverFormat::Raster {
        return Err(StegError::ModeMismatch(
            "deniable mode requires a PNG or BMP cover".to_string(),
        ));
    }
    expect_output_format(output, CoverFormat::Raster)?;

    let mut partition_seed = [0u8; partition::PARTITION_SEED_LEN];
    OsRng.fill_bytes(&mut partition_seed);
    let real_half = (OsRng.next_u32() & 1) as u8;

    let mut cover = RasterCover::load(cover_path)?;
    let eligible = position::eligible_slots(&cover);

    let real_slots =
        partition::deniable_slots(eligible.clone(), real_key, &partition_seed, real_half)?;
    let decoy_slots =
        partition::deniable_slots(eligible, decoy_key, &partition_seed, 1 - real_half)?;

    check_capacity(real_slots.len(), real_payload.len())?;
    check_capacity(decoy_slots.len(), decoy_payload.len())?;

    // Two write passes over the same buffer; the halves are disjoint.
    write_bits_bytes(cover.pixels_mut(), &real_slots, &bits::frame(real_payload));
    write_bits_bytes(cover.pixels_mut(), &decoy_slots, &bits::frame(decoy_payload));
    cover.save(output)?;

    Ok((partition_seed, real_half))
}

/// Extract one half of a deniable embed.
pub fn extract_deniable(
    stego_path: &Path,
    key: &[u8; 32],
    partition_seed: &[u8; partition::PARTITION_SEED_LEN],
    partition_half: u8,
) -> Result<Vec<u8>> {
    if CoverFormat::detect(stego_path)? != CoverFormat::Raster {
        return Err(StegError::ModeMismatch(
            "deniable mode requires a PNG or BMP stego file".to_string(),
        ));
    }
    let cover = RasterCover::load(stego_path)?;
    let eligible = position::eligible_slots(&cover);
    let slots = partition::deniable_slots(eligible, key, partition_seed, partition_half)?;
    extract_framed_bytes(cover.pixels(), &slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use tempfile::tempdir;

    fn noise_png(dir: &Path, name: &str, w: usize, h: usize, seed: u64) -> std::path::PathBuf {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let mut data = vec![0u8; w * h * 3];
        rng.fill_bytes(&mut data);
        let path = dir.join(name);
        RasterCover::from_raw(w, h, data).save(&path).unwrap();
        path
    }

    #[test]
    fn raster_adaptive_roundtrip() {
        let dir = tempdir().unwrap();
        let cover = noise_png(dir.path(), "cover.png", 64, 64, 1);
        let stego = dir.path().join("stego.png");
        let key = [11u8; 32];

        embed(&cover, b"hello world", &stego, &key, StegMode::Adaptive).unwrap();
        let recovered = extract(&stego, &key, StegMode::Adaptive).unwrap();
        assert_eq!(recovered, b"hello world");
    }

    #[test]
    fn raster_sequential_roundtrip_and_layout() {
        let dir = tempdir().unwrap();
        let cover = noise_png(dir.path(), "cover.png", 32, 32, 2);
        let stego = dir.path().join("stego.png");
        let key = [0u8; 32];

        embed(&cover, b"x", &stego, &key, StegMode::Sequential).unwrap();
        assert_eq!(extract(&stego, &key, StegMode::Sequential).unwrap(), b"x");

        // First 40 channel LSBs in row-major order spell out the header
        // (length 1, big-endian) followed by 'x'.
        let pixels = RasterCover::load(&stego).unwrap();
        let lsbs: Vec<u8> = pixels.pixels()[..40].iter().map(|b| b & 1).collect();
        let mut expected = bits::bytes_to_bits(&1u32.to_be_bytes());
        expected.extend(bits::bytes_to_bits(b"x"));
        assert_eq!(lsbs, expected);
    }

    #[test]
    fn wrong_key_fails_auth() {
        let dir = tempdir().unwrap();
        let cover = noise_png(dir.path(), "cover.png", 64, 64, 3);
        let stego = dir.path().join("stego.png");

        embed(&cover, b"payload", &stego, &[1u8; 32], StegMode::Adaptive).unwrap();
        let result = extract(&stego, &[2u8; 32], StegMode::Adaptive);
        match result {
            Err(StegError::AuthFail) => {}
            Ok(garbage) => assert_ne!(garbage, b"payload"),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn low_variance_cover_is_too_small() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("flat.png");
        RasterCover::from_raw(64, 64, vec![128u8; 64 * 64 * 3])
            .save(&path)
            .unwrap();
        let stego = dir.path().join("stego.png");

        let result = embed(
            &path,
            &vec![0u8; 10_000],
            &stego,
            &[0u8; 32],
            StegMode::Adaptive,
        );
        assert!(matches!(result, Err(StegError::CoverTooSmall { .. })));
        assert!(!stego.exists());
    }

    #[test]
    fn capacity_matches_achievable_embed() {
        let dir = tempdir().unwrap();
        let cover = noise_png(dir.path(), "cover.png", 48, 48, 4);
        let stego = dir.path().join("stego.png");
        let key = [5u8; 32];

        let cap = capacity(&cover, StegMode::Adaptive).unwrap();
        assert!(cap > 0);

        // Exactly at capacity succeeds, one past fails.
        embed(&cover, &vec![0xA5; cap], &stego, &key, StegMode::Adaptive).unwrap();
        assert_eq!(
            extract(&stego, &key, StegMode::Adaptive).unwrap(),
            vec![0xA5; cap]
        );
        assert!(matches!(
            embed(&cover, &vec![0xA5; cap + 1], &stego, &key, StegMode::Adaptive),
            Err(StegError::CoverTooSmall { .. })
        ));
    }

    #[test]
    fn position_equivalence_cover_vs_stego() {
        let dir = tempdir().unwrap();
        let cover_path = noise_png(dir.path(), "cover.png", 40, 40, 5);
        let stego_path = dir.path().join("stego.png");
        let key = [9u8; 32];

        embed(&cover_path, b"equivalence", &stego_path, &key, StegMode::Adaptive).unwrap();

        let cover = RasterCover::load(&cover_path).unwrap();
        let stego = RasterCover::load(&stego_path).unwrap();
        assert_eq!(
            position::adaptive_slots(&cover, &key),
            position::adaptive_slots(&stego, &key)
        );
    }

    #[test]
    fn deniable_both_halves_roundtrip() {
        let dir = tempdir().unwrap();
        let cover = noise_png(dir.path(), "cover.png", 96, 96, 6);
        let stego = dir.path().join("stego.png");
        let real_key = [21u8; 32];
        let decoy_key = [22u8; 32];

        let (seed, real_half) = embed_deniable(
            &cover,
            b"real",
            b"decoy content that is plausible",
            &stego,
            &real_key,
            &decoy_key,
        )
        .unwrap();

        assert_eq!(
            extract_deniable(&stego, &real_key, &seed, real_half).unwrap(),
            b"real"
        );
        assert_eq!(
            extract_deniable(&stego, &decoy_key, &seed, 1 - real_half).unwrap(),
            b"decoy content that is plausible"
        );

        // Swapped keys read the wrong half with the wrong permutation.
        let swapped = extract_deniable(&stego, &decoy_key, &seed, real_half);
        match swapped {
            Err(StegError::AuthFail) => {}
            Ok(garbage) => assert_ne!(garbage, b"real"),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn deniable_rejects_wav_cover() {
        let dir = tempdir().unwrap();
        let cover = dir.path().join("cover.wav");
        std::fs::write(&cover, b"RIFF").unwrap();
        let result = embed_deniable(
            &cover,
            b"a",
            b"b",
            &dir.path().join("out.wav"),
            &[0u8; 32],
            &[1u8; 32],
        );
        assert!(matches!(result, Err(StegError::ModeMismatch(_))));
    }

    #[test]
    fn output_extension_must_match_cover_type() {
        let dir = tempdir().unwrap();
        let cover = noise_png(dir.path(), "cover.png", 32, 32, 7);
        let result = embed(
            &cover,
            b"x",
            &dir.path().join("out.jpg"),
            &[0u8; 32],
            StegMode::Adaptive,
        );
        assert!(matches!(result, Err(StegError::ModeMismatch(_))));
    }

    #[test]
    fn tampered_stego_bit_fails_downstream() {
        // End-to-end with crypto: flip one embedded LSB, expect AuthFail from
        // decrypt (extraction itself may or may not notice).
        use crate::crypto::{self, CipherId};

        let dir = tempdir().unwrap();
        let cover = noise_png(dir.path(), "cover.png", 64, 64, 8);
        let stego = dir.path().join("stego.png");

        let (envelope, key) = crypto::encrypt(b"hello world", "pw", CipherId::Ascon128).unwrap();
        let mut key_arr = [0u8; 32];
        key_arr.copy_from_slice(&*key);
        embed(&cover, &envelope.ciphertext, &stego, &key_arr, StegMode::Adaptive).unwrap();

        // Flip an embedded ciphertext LSB (past the 32 header slots).
        let mut pixels = RasterCover::load(&stego).unwrap();
        let slot = position::adaptive_slots(&pixels, &key_arr)[HEADER_BITS + 3];
        pixels.pixels_mut()[slot] ^= 1;
        pixels.save(&stego).unwrap();

        let result = extract(&stego, &key_arr, StegMode::Adaptive).and_then(|ct| {
            crypto::decrypt(
                &crate::crypto::Envelope {
                    ciphertext: ct,
                    nonce: envelope.nonce.clone(),
                    salt: envelope.salt,
                    cipher: envelope.cipher,
                },
                "pw",
            )
        });
        assert!(matches!(result, Err(StegError::AuthFail)));
    }
}
