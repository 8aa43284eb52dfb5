//! Huffman coding for JPEG entropy data.
//!
//! Decoding follows the DECODE procedure of ITU-T T.81 Annex F (Figure F.16):
//! the code value is grown one bit at a time and tested against per-length
//! MINCODE/MAXCODE bounds, with VALPTR indexing into the symbol list.
//!
//! Encode tables are rebuilt from symbol frequencies before every save,
//! because LSB edits to negative coefficients can change magnitude categories
//! and introduce symbols absent from the cover's original tables. Code
//! lengths come from an ordinary binary-heap Huffman construction; lengths
//! beyond the format's 16-bit ceiling are clamped and the Kraft sum repaired
//! by deepening the longest still-extendable codes.

use super::bitio::BitReader;
use super::{JpegError, JpegResult};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// A Huffman table as it appears in a DHT segment.
#[derive(Debug, Clone)]
pub struct HuffmanSpec {
    /// 0 = DC, 1 = AC.
    pub class: u8,
    /// Table id (0-3).
    pub id: u8,
    /// bits[i] = number of codes of length i+1.
    pub bits: [u8; 16],
    /// Symbols in order of increasing code length.
    pub huffval: Vec<u8>,
}

/// Decode table per T.81 F.2.2.3. Index 0 of the arrays is unused; lengths
/// run 1..=16.
pub struct HuffmanDecoder {
    /// Smallest code of each length.
    mincode: [i32; 17],
    /// Largest code of each length, -1 when the length has no codes.
    maxcode: [i32; 17],
    /// Index of the first symbol of each length within `huffval`.
    valptr: [usize; 17],
    huffval: Vec<u8>,
}

impl HuffmanDecoder {
    pub fn build(spec: &HuffmanSpec) -> JpegResult<Self> {
        let mut mincode = [0i32; 17];
        let mut maxcode = [-1i32; 17];
        let mut valptr = [0usize; 17];

        let mut code = 0i32;
        let mut k = 0usize;
        for length in 1..=16usize {
            let count = spec.bits[length - 1] as usize;
            if count > 0 {
                valptr[length] = k;
                mincode[length] = code;
                code += count as i32;
                k += count;
                maxcode[length] = code - 1;
                if code > 1i32 << length {
                    return Err(JpegError::Malformed("Huffman code counts overflow"));
                }
            }
            code <<= 1;
        }
        if k != spec.huffval.len() {
            return Err(JpegError::Malformed("DHT symbol count mismatch"));
        }

        Ok(Self {
            mincode,
            maxcode,
            valptr,
            huffval: spec.huffval.clone(),
        })
    }

    /// Decode one symbol (T.81 Figure F.16).
    pub fn decode(&self, reader: &mut BitReader) -> JpegResult<u8> {
        let mut code = reader.read_bit()? as i32;
        for length in 1..=16usize {
            if self.maxcode[length] >= 0
                && code >= self.mincode[length]
                && code <= self.maxcode[length]
            {
                let idx = self.valptr[length] + (code - self.mincode[length]) as usize;
                return Ok(self.huffval[idx]);
            }
            if length < 16 {
                code = (code << 1) | reader.read_bit()? as i32;
            }
        }
        Err(JpegError::HuffmanDecode)
    }
}

/// Encode table: symbol -> (code, length), generated by the canonical
/// assignment of T.81 C.2. Length 0 means the symbol is absent.
pub struct HuffmanEncoder {
    table: [(u16, u8); 256],
}

impl HuffmanEncoder {
    pub fn build(spec: &HuffmanSpec) -> Self {
        let mut table = [(0u16, 0u8); 256];
        let mut code = 0u32;
        let mut k = 0usize;
        for length in 1..=16u8 {
            for _ in 0..spec.bits[(length - 1) as usize] {
                if let Some(&symbol) = spec.huffval.get(k) {
                    table[symbol as usize] = (code as u16, length);
                    k += 1;
                }
                code += 1;
            }
            code <<= 1;
        }
        Self { table }
    }

    pub fn encode(&self, symbol: u8) -> JpegResult<(u16, u8)> {
        let (code, len) = self.table[symbol as usize];
        if len == 0 {
            return Err(JpegError::Malformed("symbol missing from Huffman table"));
        }
        Ok((code, len))
    }
}

/// Sign-extend JPEG "additional bits" (ITU-T T.81 Table F.1).
pub fn extend_sign(value: u16, size: u8) -> i16 {
    if size == 0 {
        return 0;
    }
    if (value as i32) < 1i32 << (size - 1) {
        (value as i32 - (1i32 << size) + 1) as i16
    } else {
        value as i16
    }
}

/// Encode a coefficient or DC difference as (additional bits, category size).
pub fn magnitude_bits(value: i16) -> (u16, u8) {
    if value == 0 {
        return (0, 0);
    }
    let size = (16 - value.unsigned_abs().leading_zeros()) as u8;
    let bits = if value > 0 {
        value as u16
    } else {
        (value - 1) as u16 // one's complement of the magnitude
    };
    (bits & ((1u16 << size) - 1), size)
}

/// Optimal code lengths for the given frequencies, one entry per input
/// symbol. Ties break on the insertion order counter so the result is
/// deterministic.
fn code_lengths(freqs: &[u64]) -> Vec<u8> {
    let n = freqs.len();
    if n == 1 {
        return vec![1];
    }

    // Min-heap of (weight, node id); node ids 0..n are leaves, the rest are
    // internal nodes in creation order.
    let mut parent = vec![usize::MAX; 2 * n - 1];
    let mut heap: BinaryHeap<Reverse<(u64, usize)>> = freqs
        .iter()
        .enumerate()
        .map(|(id, &f)| Reverse((f, id)))
        .collect();

    let mut next_id = n;
    while heap.len() > 1 {
        let Reverse((wa, a)) = heap.pop().expect("heap has two entries");
        let Reverse((wb, b)) = heap.pop().expect("heap has two entries");
        parent[a] = next_id;
        parent[b] = next_id;
        heap.push(Reverse((wa + wb, next_id)));
        next_id += 1;
    }

    let root = 2 * n - 2;
    (0..n)
        .map(|leaf| {
            let mut depth = 0u8;
            let mut node = leaf;
            while node != root {
                node = parent[node];
                depth += 1;
            }
            depth
        })
        .collect()
}

/// Clamp code lengths to `max` and repair the Kraft inequality.
///
/// Clamping can only push the scaled Kraft sum above capacity; while it is
/// over, the deepest code still shorter than `max` is deepened by one, which
/// always frees capacity and terminates. The result stays decodable under
/// canonical assignment; optimality is not required by the format.
fn limit_lengths(lengths: &mut [u8], max: u8) {
    let cap = 1u64 << max;
    for len in lengths.iter_mut() {
        if *len > max {
            *len = max;
        }
    }
    let mut kraft: u64 = lengths.iter().map(|&len| cap >> len).sum();

    while kraft > cap {
        let deepest = lengths
            .iter()
            .enumerate()
            .filter(|&(_, &len)| len < max)
            .max_by_key(|&(_, &len)| len)
            .map(|(i, _)| i)
            .expect("some code must be shorter than max while Kraft is over");
        kraft -= cap >> lengths[deepest];
        lengths[deepest] += 1;
        kraft += cap >> lengths[deepest];
    }
}

/// Build a Huffman table from symbol frequencies.
pub fn build_spec(class: u8, id: u8, freq: &[u32; 256]) -> HuffmanSpec {
    let mut symbols: Vec<u8> = (0..=255u8).filter(|&s| freq[s as usize] > 0).collect();
    if symbols.is_empty() {
        symbols.push(0);
    }

    let weights: Vec<u64> = symbols.iter().map(|&s| freq[s as usize] as u64).collect();
    let mut lengths = code_lengths(&weights);
    limit_lengths(&mut lengths, 16);

    // Canonical ordering: increasing length, then symbol value.
    let mut order: Vec<usize> = (0..symbols.len()).collect();
    order.sort_by_key(|&i| (lengths[i], symbols[i]));

    let mut bits = [0u8; 16];
    let mut huffval = Vec::with_capacity(symbols.len());
    for &i in &order {
        bits[(lengths[i] - 1) as usize] += 1;
        huffval.push(symbols[i]);
    }

    HuffmanSpec {
        class,
        id,
        bits,
        huffval,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Standard luminance DC table, ITU-T T.81 Table K.3.
    fn lum_dc() -> HuffmanSpec {
        HuffmanSpec {
            class: 0,
            id: 0,
            bits: [0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0],
            huffval: (0..12).collect(),
        }
    }

    #[test]
    fn encode_decode_all_symbols() {
        let spec = lum_dc();
        let enc = HuffmanEncoder::build(&spec);
        let dec = HuffmanDecoder::build(&spec).unwrap();

        for sym in 0..12u8 {
            let (code, len) = enc.encode(sym).unwrap();
            let mut w = super::super::bitio::BitWriter::new();
            w.put_bits(code, len);
            let bytes = w.into_bytes();
            let mut r = BitReader::new(&bytes, 0);
            assert_eq!(dec.decode(&mut r).unwrap(), sym);
        }
    }

    #[test]
    fn decoder_rejects_overfull_table() {
        let spec = HuffmanSpec {
            class: 0,
            id: 0,
            bits: [3, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            huffval: vec![0, 1, 2],
        };
        assert!(HuffmanDecoder::build(&spec).is_err());
    }

    #[test]
    fn sign_extension() {
        assert_eq!(extend_sign(0, 1), -1);
        assert_eq!(extend_sign(1, 1), 1);
        assert_eq!(extend_sign(0, 3), -7);
        assert_eq!(extend_sign(7, 3), 7);
    }

    #[test]
    fn magnitude_roundtrip() {
        for v in -1023i16..=1023 {
            let (bits, size) = magnitude_bits(v);
            if v == 0 {
                assert_eq!(size, 0);
            } else {
                assert_eq!(extend_sign(bits, size), v, "value {v}");
            }
        }
    }

    #[test]
    fn built_spec_covers_all_symbols() {
        let mut freq = [0u32; 256];
        freq[0x00] = 1000; // EOB
        freq[0x01] = 400;
        freq[0x11] = 300;
        freq[0xF0] = 5; // ZRL
        freq[0x7A] = 1;
        let spec = build_spec(1, 0, &freq);
        let enc = HuffmanEncoder::build(&spec);
        for sym in [0x00u8, 0x01, 0x11, 0xF0, 0x7A] {
            enc.encode(sym).expect("symbol must have a code");
        }
        let total: usize = spec.bits.iter().map(|&b| b as usize).sum();
        assert_eq!(total, spec.huffval.len());
    }

    #[test]
    fn built_spec_single_symbol() {
        let mut freq = [0u32; 256];
        freq[0x00] = 7;
        let spec = build_spec(1, 0, &freq);
        assert_eq!(spec.huffval, vec![0x00]);
        assert_eq!(spec.bits[0], 1);
    }

    #[test]
    fn built_spec_respects_length_limit_and_kraft() {
        // Exponential frequencies force a degenerate, very deep tree.
        let mut freq = [0u32; 256];
        for (i, f) in freq.iter_mut().enumerate() {
            *f = 1u32 << (i as u32 % 31);
        }
        let spec = build_spec(1, 1, &freq);

        let total: usize = spec.bits.iter().map(|&b| b as usize).sum();
        assert_eq!(total, spec.huffval.len());
        assert_eq!(total, 256);

        // Kraft sum within capacity.
        let kraft: u64 = spec
            .bits
            .iter()
            .enumerate()
            .map(|(i, &count)| (count as u64) << (16 - (i + 1)))
            .sum();
        assert!(kraft <= 1 << 16, "Kraft sum {kraft} over capacity");

        HuffmanDecoder::build(&spec).unwrap();
    }

    #[test]
    fn built_spec_roundtrips_through_decoder() {
        let mut freq = [0u32; 256];
        for (i, f) in freq.iter_mut().enumerate() {
            *f = 1 + (i as u32 % 7) * ((i as u32 / 8) + 1);
        }
        let spec = build_spec(1, 0, &freq);
        let enc = HuffmanEncoder::build(&spec);
        let dec = HuffmanDecoder::build(&spec).unwrap();

        let mut w = super::super::bitio::BitWriter::new();
        let symbols = [0u8, 17, 99, 200, 255, 1];
        for &sym in &symbols {
            let (code, len) = enc.encode(sym).unwrap();
            w.put_bits(code, len);
        }
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes, 0);
        for &sym in &symbols {
            assert_eq!(dec.decode(&mut r).unwrap(), sym);
        }
    }
}
