//! Baseline JPEG coefficient codec.
//!
//! Decodes a baseline sequential JPEG into per-component planes of quantised
//! DCT coefficients and re-encodes them without touching the quantisation
//! tables, so coefficient edits survive a save/load cycle bit-exactly. All
//! header segments are carried verbatim; only the Huffman tables are rebuilt
//! on save, because coefficient edits can shift magnitude categories out of
//! the cover's original tables.
//!
//! Progressive (SOF2), arithmetic-coded, and 12-bit files are rejected.
//!
//! No crate on the registry exposes quantised coefficients losslessly, which
//! is why this codec is in-tree.

mod bitio;
mod huffman;
mod marker;
mod scan;
mod zigzag;

use scan::ScanComponent;
use thiserror::Error;

pub use marker::FrameHeader;

/// Failures while parsing or encoding a JPEG byte stream.
#[derive(Error, Debug)]
pub enum JpegError {
    #[error("missing SOI marker (not a JPEG)")]
    NotAJpeg,
    #[error("unexpected end of JPEG data")]
    UnexpectedEof,
    #[error("unsupported JPEG marker 0xFF{0:02X} (progressive or arithmetic coding)")]
    Unsupported(u8),
    #[error("unsupported sample precision: {0}-bit")]
    UnsupportedPrecision(u8),
    #[error("invalid JPEG structure: {0}")]
    Malformed(&'static str),
    #[error("Huffman decode error in scan data")]
    HuffmanDecode,
}

pub type JpegResult<T> = Result<T, JpegError>;

/// Quantised DCT coefficients of one component as a row-major 2-D plane.
///
/// The plane spans the full padded block grid: `blocks_tall * 8` rows by
/// `blocks_wide * 8` columns. Entry (r, c) belongs to block (r/8, c/8) at
/// frequency position (r%8, c%8); the DC terms sit where both remainders are
/// zero.
#[derive(Clone)]
pub struct CoefPlane {
    rows: usize,
    cols: usize,
    coeffs: Vec<i16>,
}

impl CoefPlane {
    fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            coeffs: vec![0i16; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of coefficient entries (rows * cols).
    pub fn len(&self) -> usize {
        self.coeffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coeffs.is_empty()
    }

    pub fn get(&self, r: usize, c: usize) -> i16 {
        self.coeffs[r * self.cols + c]
    }

    pub fn set(&mut self, r: usize, c: usize, value: i16) {
        self.coeffs[r * self.cols + c] = value;
    }

    /// Read by flat row-major index.
    pub fn at(&self, idx: usize) -> i16 {
        self.coeffs[idx]
    }

    /// Write by flat row-major index.
    pub fn put(&mut self, idx: usize, value: i16) {
        self.coeffs[idx] = value;
    }

    /// True for the (0,0) DC position of each 8x8 block.
    pub fn is_dc(&self, idx: usize) -> bool {
        let (r, c) = (idx / self.cols, idx % self.cols);
        r % 8 == 0 && c % 8 == 0
    }
}

/// A parsed baseline JPEG with mutable coefficient planes.
pub struct CoefImage {
    frame: FrameHeader,
    planes: Vec<CoefPlane>,
    /// All segments between SOI and SOS in file order, minus DHT.
    header_segments: Vec<marker::Segment>,
    sos_body: Vec<u8>,
    scan_components: Vec<ScanComponent>,
    restart_interval: u16,
}

impl CoefImage {
    /// Parse a baseline JPEG byte stream.
    pub fn from_bytes(data: &[u8]) -> JpegResult<Self> {
        let (segments, scan_start) = marker::walk_segments(data)?;

        let mut frame: Option<FrameHeader> = None;
        let mut dc_specs: [Option<huffman::HuffmanSpec>; 4] = [None, None, None, None];
        let mut ac_specs: [Option<huffman::HuffmanSpec>; 4] = [None, None, None, None];
        let mut restart_interval = 0u16;
        let mut header_segments = Vec::new();
        let mut sos_body = Vec::new();
        let mut scan_components = Vec::new();

        for seg in segments {
            match seg.marker {
                marker::DQT => {
                    marker::parse_dqt(&seg.body)?; // validate, keep verbatim
                    header_segments.push(seg);
                }
                marker::DHT => {
                    for spec in marker::parse_dht(&seg.body)? {
                        let slot = if spec.class == 0 {
                            &mut dc_specs[spec.id as usize]
                        } else {
                            &mut ac_specs[spec.id as usize]
                        };
                        *slot = Some(spec);
                    }
                }
                marker::SOF0 => {
                    frame = Some(marker::parse_sof(&seg.body)?);
                    header_segments.push(seg);
                }
                marker::DRI => {
                    restart_interval = marker::parse_dri(&seg.body)?;
                    header_segments.push(seg);
                }
                marker::SOS => {
                    let fh = frame.as_ref().ok_or(JpegError::Malformed("SOS before SOF"))?;
                    let selectors = marker::parse_sos(&seg.body)?;
                    if selectors.len() != fh.components.len() {
                        return Err(JpegError::Malformed("non-interleaved baseline scan"));
                    }
                    for (comp_id, dc_id, ac_id) in selectors {
                        let comp_idx = fh
                            .components
                            .iter()
                            .position(|c| c.id == comp_id)
                            .ok_or(JpegError::Malformed("SOS references unknown component"))?;
                        scan_components.push(ScanComponent {
                            comp_idx,
                            dc_table: dc_id as usize,
                            ac_table: ac_id as usize,
                        });
                    }
                    sos_body = seg.body;
                }
                _ => header_segments.push(seg),
            }
        }

        let frame = frame.ok_or(JpegError::Malformed("no SOF marker"))?;
        let planes = scan::decode_scan(
            data,
            scan_start,
            &frame,
            &scan_components,
            &dc_specs,
            &ac_specs,
            restart_interval,
        )?;

        Ok(Self {
            frame,
            planes,
            header_segments,
            sos_body,
            scan_components,
            restart_interval,
        })
    }

    /// Encode back to a JPEG byte stream.
    ///
    /// Header segments (including the quantisation tables) are written
    /// verbatim; Huffman tables are rebuilt from the current coefficients.
    pub fn to_bytes(&self) -> JpegResult<Vec<u8>> {
        let mut dc_freq = [[0u32; 256]; 4];
        let mut ac_freq = [[0u32; 256]; 4];
        scan::count_symbols(
            &self.frame,
            &self.scan_components,
            &self.planes,
            self.restart_interval,
            &mut dc_freq,
            &mut ac_freq,
        );

        let mut dc_specs: [Option<huffman::HuffmanSpec>; 4] = [None, None, None, None];
        let mut ac_specs: [Option<huffman::HuffmanSpec>; 4] = [None, None, None, None];
        for sc in &self.scan_components {
            if dc_specs[sc.dc_table].is_none() {
                dc_specs[sc.dc_table] =
                    Some(huffman::build_spec(0, sc.dc_table as u8, &dc_freq[sc.dc_table]));
            }
            if ac_specs[sc.ac_table].is_none() {
                ac_specs[sc.ac_table] =
                    Some(huffman::build_spec(1, sc.ac_table as u8, &ac_freq[sc.ac_table]));
            }
        }

        let mut out = vec![0xFF, marker::SOI];
        for seg in &self.header_segments {
            write_segment(&mut out, seg.marker, &seg.body);
        }

        let mut dht_body = Vec::new();
        for spec in dc_specs.iter().chain(ac_specs.iter()).flatten() {
            dht_body.push((spec.class << 4) | (spec.id & 0x0F));
            dht_body.extend_from_slice(&spec.bits);
            dht_body.extend_from_slice(&spec.huffval);
        }
        write_segment(&mut out, marker::DHT, &dht_body);
        write_segment(&mut out, marker::SOS, &self.sos_body);

        let scan_bytes = scan::encode_scan(
            &self.frame,
            &self.scan_components,
            &self.planes,
            &dc_specs,
            &ac_specs,
            self.restart_interval,
        )?;
        out.extend_from_slice(&scan_bytes);
        out.push(0xFF);
        out.push(marker::EOI);
        Ok(out)
    }

    /// Components in scan order (Y, then Cb, Cr when present).
    pub fn num_components(&self) -> usize {
        self.planes.len()
    }

    pub fn plane(&self, comp: usize) -> &CoefPlane {
        &self.planes[comp]
    }

    pub fn plane_mut(&mut self, comp: usize) -> &mut CoefPlane {
        &mut self.planes[comp]
    }

    pub fn frame(&self) -> &FrameHeader {
        &self.frame
    }
}

fn write_segment(out: &mut Vec<u8>, marker: u8, body: &[u8]) {
    out.push(0xFF);
    out.push(marker);
    let length = (body.len() + 2) as u16;
    out.extend_from_slice(&length.to_be_bytes());
    out.extend_from_slice(body);
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Encode a tiny RGB image to JPEG with the `image` crate, then parse it.
    fn fixture(width: u32, height: u32) -> CoefImage {
        use image::codecs::jpeg::JpegEncoder;

        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([
                ((x * 37 + y * 11) % 256) as u8,
                ((x * 13 + y * 53) % 256) as u8,
                ((x * 7 + y * 29) % 256) as u8,
            ])
        });
        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, 80)
            .encode_image(&img)
            .unwrap();
        CoefImage::from_bytes(&bytes).unwrap()
    }

    #[test]
    fn parse_plane_geometry() {
        let jpeg = fixture(64, 48);
        assert!(jpeg.num_components() >= 1);
        let y = jpeg.plane(0);
        assert_eq!(y.rows() % 8, 0);
        assert_eq!(y.cols() % 8, 0);
        assert!(y.rows() >= 48 && y.cols() >= 64);
    }

    #[test]
    fn unmodified_coefficients_roundtrip() {
        let jpeg = fixture(48, 32);
        let reencoded = jpeg.to_bytes().unwrap();
        let reparsed = CoefImage::from_bytes(&reencoded).unwrap();

        assert_eq!(jpeg.num_components(), reparsed.num_components());
        for comp in 0..jpeg.num_components() {
            assert_eq!(jpeg.plane(comp).coeffs, reparsed.plane(comp).coeffs);
        }
    }

    #[test]
    fn modified_coefficients_roundtrip() {
        let mut jpeg = fixture(64, 64);

        // Flip the LSB of every usable AC coefficient.
        for comp in 0..jpeg.num_components() {
            let plane = jpeg.plane_mut(comp);
            for idx in 0..plane.len() {
                let v = plane.at(idx);
                if !plane.is_dc(idx) && !(-2..=1).contains(&v) {
                    plane.put(idx, v ^ 1);
                }
            }
        }

        let bytes = jpeg.to_bytes().unwrap();
        let reparsed = CoefImage::from_bytes(&bytes).unwrap();
        for comp in 0..jpeg.num_components() {
            assert_eq!(jpeg.plane(comp).coeffs, reparsed.plane(comp).coeffs);
        }
    }

    #[test]
    fn output_is_decodable_by_stock_decoder() {
        let jpeg = fixture(40, 40);
        let bytes = jpeg.to_bytes().unwrap();
        image::load_from_memory(&bytes).expect("stock decoder must accept the output");
    }

    #[test]
    fn rejects_png_data() {
        let img = image::RgbImage::from_pixel(8, 8, image::Rgb([1, 2, 3]));
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();
        assert!(CoefImage::from_bytes(&bytes).is_err());
    }
}
