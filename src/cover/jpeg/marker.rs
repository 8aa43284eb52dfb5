//! JPEG marker segment parsing.
//!
//! Walks the segments between SOI and SOS, parsing the headers the codec
//! needs (DQT, DHT, SOF0, DRI, SOS) and carrying everything else (APPn, COM)
//! verbatim so the save path can reproduce the original header byte-for-byte.

use super::huffman::HuffmanSpec;
use super::zigzag::ZIGZAG_TO_NATURAL;
use super::{JpegError, JpegResult};

pub const SOI: u8 = 0xD8;
pub const EOI: u8 = 0xD9;
pub const SOF0: u8 = 0xC0;
pub const SOF2: u8 = 0xC2;
pub const DHT: u8 = 0xC4;
pub const DQT: u8 = 0xDB;
pub const DRI: u8 = 0xDD;
pub const SOS: u8 = 0xDA;

/// One marker segment: the marker byte and its body (no 0xFF prefix, no
/// length field).
#[derive(Clone)]
pub struct Segment {
    pub marker: u8,
    pub body: Vec<u8>,
}

/// Walk all marker segments up to and including SOS.
///
/// Returns the segments in file order and the offset of the first
/// entropy-coded scan byte.
pub fn walk_segments(data: &[u8]) -> JpegResult<(Vec<Segment>, usize)> {
    if data.len() < 2 || data[0] != 0xFF || data[1] != SOI {
        return Err(JpegError::NotAJpeg);
    }

    let mut segments = Vec::new();
    let mut pos = 2usize;

    loop {
        while pos < data.len() && data[pos] != 0xFF {
            pos += 1;
        }
        // Skip fill bytes.
        while pos + 1 < data.len() && data[pos + 1] == 0xFF {
            pos += 1;
        }
        if pos + 1 >= data.len() {
            return Err(JpegError::UnexpectedEof);
        }

        let marker = data[pos + 1];
        pos += 2;

        if marker == 0x00 {
            continue;
        }
        if marker == EOI || (0xD0..=0xD7).contains(&marker) {
            continue;
        }
        if is_unsupported(marker) {
            return Err(JpegError::Unsupported(marker));
        }

        if pos + 2 > data.len() {
            return Err(JpegError::UnexpectedEof);
        }
        let length = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
        if length < 2 || pos + length > data.len() {
            return Err(JpegError::Malformed("segment length out of range"));
        }
        segments.push(Segment {
            marker,
            body: data[pos + 2..pos + length].to_vec(),
        });
        pos += length;

        if marker == SOS {
            return Ok((segments, pos));
        }
    }
}

fn is_unsupported(marker: u8) -> bool {
    matches!(
        marker,
        SOF2            // progressive
        | 0xC1 | 0xC3   // extended sequential, lossless
        | 0xC5..=0xC7   // differential
        | 0xC9..=0xCB   // arithmetic
        | 0xCD..=0xCF, // differential arithmetic
    )
}

/// One component entry from the SOF0 header.
#[derive(Debug, Clone)]
pub struct Component {
    pub id: u8,
    pub h_sampling: u8,
    pub v_sampling: u8,
    pub quant_table_id: u8,
}

/// Frame geometry parsed from SOF0.
#[derive(Debug, Clone)]
pub struct FrameHeader {
    pub height: u16,
    pub width: u16,
    pub components: Vec<Component>,
    pub max_h_sampling: u8,
    pub max_v_sampling: u8,
    pub mcus_wide: usize,
    pub mcus_tall: usize,
}

impl FrameHeader {
    pub fn blocks_wide(&self, comp_idx: usize) -> usize {
        self.mcus_wide * self.components[comp_idx].h_sampling as usize
    }

    pub fn blocks_tall(&self, comp_idx: usize) -> usize {
        self.mcus_tall * self.components[comp_idx].v_sampling as usize
    }
}

/// Parse a SOF0 segment body.
pub fn parse_sof(body: &[u8]) -> JpegResult<FrameHeader> {
    if body.len() < 6 {
        return Err(JpegError::UnexpectedEof);
    }
    let precision = body[0];
    if precision != 8 {
        return Err(JpegError::UnsupportedPrecision(precision));
    }
    let height = u16::from_be_bytes([body[1], body[2]]);
    let width = u16::from_be_bytes([body[3], body[4]]);
    let num_components = body[5] as usize;
    if width == 0 || height == 0 || num_components == 0 {
        return Err(JpegError::Malformed("bad frame dimensions"));
    }
    if body.len() < 6 + num_components * 3 {
        return Err(JpegError::UnexpectedEof);
    }

    let mut components = Vec::with_capacity(num_components);
    let (mut max_h, mut max_v) = (0u8, 0u8);
    for i in 0..num_components {
        let off = 6 + i * 3;
        let sampling = body[off + 1];
        let (h, v) = (sampling >> 4, sampling & 0x0F);
        if h == 0 || v == 0 || h > 4 || v > 4 {
            return Err(JpegError::Malformed("bad sampling factors"));
        }
        let quant_table_id = body[off + 2];
        if quant_table_id > 3 {
            return Err(JpegError::Malformed("quantisation table id out of range"));
        }
        max_h = max_h.max(h);
        max_v = max_v.max(v);
        components.push(Component {
            id: body[off],
            h_sampling: h,
            v_sampling: v,
            quant_table_id,
        });
    }

    let mcu_w = max_h as usize * 8;
    let mcu_h = max_v as usize * 8;
    Ok(FrameHeader {
        height,
        width,
        components,
        max_h_sampling: max_h,
        max_v_sampling: max_v,
        mcus_wide: (width as usize + mcu_w - 1) / mcu_w,
        mcus_tall: (height as usize + mcu_h - 1) / mcu_h,
    })
}

/// Parse an SOS body into (component_id, dc_table_id, ac_table_id) selectors.
pub fn parse_sos(body: &[u8]) -> JpegResult<Vec<(u8, u8, u8)>> {
    if body.is_empty() {
        return Err(JpegError::Malformed("empty SOS"));
    }
    let n = body[0] as usize;
    if body.len() < 1 + n * 2 + 3 {
        return Err(JpegError::UnexpectedEof);
    }
    Ok((0..n)
        .map(|i| {
            let off = 1 + i * 2;
            (body[off], body[off + 1] >> 4, body[off + 1] & 0x0F)
        })
        .collect())
}

/// Parse a DQT body: one or more (table_id, 64 natural-order values) tables.
pub fn parse_dqt(body: &[u8]) -> JpegResult<Vec<(u8, [u16; 64])>> {
    let mut tables = Vec::new();
    let mut pos = 0usize;
    while pos < body.len() {
        let pq_tq = body[pos];
        pos += 1;
        let precision = pq_tq >> 4;
        let id = pq_tq & 0x0F;
        if id > 3 {
            return Err(JpegError::Malformed("quantisation table id out of range"));
        }

        let mut values = [0u16; 64];
        match precision {
            0 => {
                if pos + 64 > body.len() {
                    return Err(JpegError::UnexpectedEof);
                }
                for zi in 0..64 {
                    values[ZIGZAG_TO_NATURAL[zi]] = body[pos + zi] as u16;
                }
                pos += 64;
            }
            1 => {
                if pos + 128 > body.len() {
                    return Err(JpegError::UnexpectedEof);
                }
                for zi in 0..64 {
                    values[ZIGZAG_TO_NATURAL[zi]] =
                        u16::from_be_bytes([body[pos + zi * 2], body[pos + zi * 2 + 1]]);
                }
                pos += 128;
            }
            _ => return Err(JpegError::Malformed("bad DQT precision")),
        }
        tables.push((id, values));
    }
    Ok(tables)
}

/// Parse a DHT body: one or more Huffman table specs.
pub fn parse_dht(body: &[u8]) -> JpegResult<Vec<HuffmanSpec>> {
    let mut specs = Vec::new();
    let mut pos = 0usize;
    while pos < body.len() {
        let tc_th = body[pos];
        pos += 1;
        let class = tc_th >> 4;
        let id = tc_th & 0x0F;
        if class > 1 || id > 3 {
            return Err(JpegError::Malformed("Huffman table id out of range"));
        }
        if pos + 16 > body.len() {
            return Err(JpegError::UnexpectedEof);
        }
        let mut bits = [0u8; 16];
        bits.copy_from_slice(&body[pos..pos + 16]);
        pos += 16;
        let total: usize = bits.iter().map(|&b| b as usize).sum();
        if pos + total > body.len() {
            return Err(JpegError::UnexpectedEof);
        }
        specs.push(HuffmanSpec {
            class,
            id,
            bits,
            huffval: body[pos..pos + total].to_vec(),
        });
        pos += total;
    }
    Ok(specs)
}

/// Parse a DRI body into the restart interval.
pub fn parse_dri(body: &[u8]) -> JpegResult<u16> {
    if body.len() < 2 {
        return Err(JpegError::UnexpectedEof);
    }
    Ok(u16::from_be_bytes([body[0], body[1]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_jpeg() {
        assert!(matches!(
            walk_segments(b"\x89PNG\r\n"),
            Err(JpegError::NotAJpeg)
        ));
    }

    #[test]
    fn sof_geometry_420() {
        let body = [
            8, 1, 0xE0, 2, 0x80, 3, // 8-bit, 480x640, 3 components
            1, 0x22, 0, // Y 2x2
            2, 0x11, 1, // Cb 1x1
            3, 0x11, 1, // Cr 1x1
        ];
        let fh = parse_sof(&body).unwrap();
        assert_eq!((fh.width, fh.height), (640, 480));
        assert_eq!((fh.mcus_wide, fh.mcus_tall), (40, 30));
        assert_eq!((fh.blocks_wide(0), fh.blocks_tall(0)), (80, 60));
        assert_eq!((fh.blocks_wide(1), fh.blocks_tall(1)), (40, 30));
    }

    #[test]
    fn sof_rejects_12_bit() {
        let body = [12, 0, 8, 0, 8, 1, 1, 0x11, 0];
        assert!(matches!(
            parse_sof(&body),
            Err(JpegError::UnsupportedPrecision(12))
        ));
    }

    #[test]
    fn dqt_zigzag_to_natural() {
        let mut body = vec![0x00u8];
        body.extend((1..=64).map(|v| v as u8));
        let tables = parse_dqt(&body).unwrap();
        let (id, values) = &tables[0];
        assert_eq!(*id, 0);
        assert_eq!(values[0], 1);
        assert_eq!(values[1], 2); // zigzag 1 -> natural (0,1)
        assert_eq!(values[8], 3); // zigzag 2 -> natural (1,0)
    }
}
