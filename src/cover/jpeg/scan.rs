//! Entropy-coded scan decode and re-encode.
//!
//! Decoding fills one [`CoefPlane`] per component; encoding walks the planes
//! in the identical interleaved MCU order, so an unmodified image round-trips
//! to the same coefficients. DC prediction and restart intervals follow
//! ITU-T T.81 baseline sequential rules.

use super::bitio::{BitReader, BitWriter};
use super::huffman::{
    extend_sign, magnitude_bits, HuffmanDecoder, HuffmanEncoder, HuffmanSpec,
};
use super::marker::FrameHeader;
use super::zigzag::{NATURAL_TO_ZIGZAG, ZIGZAG_TO_NATURAL};
use super::{CoefPlane, JpegError, JpegResult};

/// Per-component table selection from the SOS header.
#[derive(Clone)]
pub struct ScanComponent {
    /// Index into `FrameHeader::components`.
    pub comp_idx: usize,
    pub dc_table: usize,
    pub ac_table: usize,
}

fn required_spec<'a>(
    specs: &'a [Option<HuffmanSpec>; 4],
    id: usize,
) -> JpegResult<&'a HuffmanSpec> {
    specs[id]
        .as_ref()
        .ok_or(JpegError::Malformed("scan references undefined Huffman table"))
}

/// Decode the scan into one coefficient plane per scan component.
pub fn decode_scan(
    data: &[u8],
    scan_start: usize,
    frame: &FrameHeader,
    scan_components: &[ScanComponent],
    dc_specs: &[Option<HuffmanSpec>; 4],
    ac_specs: &[Option<HuffmanSpec>; 4],
    restart_interval: u16,
) -> JpegResult<Vec<CoefPlane>> {
    let mut dc_tables: [Option<HuffmanDecoder>; 4] = [None, None, None, None];
    let mut ac_tables: [Option<HuffmanDecoder>; 4] = [None, None, None, None];
    for sc in scan_components {
        if dc_tables[sc.dc_table].is_none() {
            dc_tables[sc.dc_table] = Some(HuffmanDecoder::build(required_spec(dc_specs, sc.dc_table)?)?);
        }
        if ac_tables[sc.ac_table].is_none() {
            ac_tables[sc.ac_table] = Some(HuffmanDecoder::build(required_spec(ac_specs, sc.ac_table)?)?);
        }
    }

    let mut planes: Vec<CoefPlane> = scan_components
        .iter()
        .map(|sc| CoefPlane::new(frame.blocks_tall(sc.comp_idx) * 8, frame.blocks_wide(sc.comp_idx) * 8))
        .collect();

    let mut reader = BitReader::new(data, scan_start);
    let mut dc_pred = vec![0i32; scan_components.len()];
    let mut mcu_count = 0usize;

    for mcu_row in 0..frame.mcus_tall {
        for mcu_col in 0..frame.mcus_wide {
            if restart_interval > 0 && mcu_count > 0 && mcu_count % restart_interval as usize == 0 {
                reader.restart();
                dc_pred.iter_mut().for_each(|p| *p = 0);
            }

            for (sci, sc) in scan_components.iter().enumerate() {
                let comp = &frame.components[sc.comp_idx];
                let dc_tab = dc_tables[sc.dc_table].as_ref().expect("table built above");
                let ac_tab = ac_tables[sc.ac_table].as_ref().expect("table built above");

                for v in 0..comp.v_sampling as usize {
                    for h in 0..comp.h_sampling as usize {
                        let br = mcu_row * comp.v_sampling as usize + v;
                        let bc = mcu_col * comp.h_sampling as usize + h;

                        let mut zz = [0i16; 64];

                        let dc_size = dc_tab.decode(&mut reader)?;
                        if dc_size > 0 {
                            let bits = reader.read_bits(dc_size)?;
                            dc_pred[sci] += extend_sign(bits, dc_size) as i32;
                        }
                        zz[0] = dc_pred[sci].clamp(i16::MIN as i32, i16::MAX as i32) as i16;

                        let mut k = 1usize;
                        while k < 64 {
                            let rs = ac_tab.decode(&mut reader)?;
                            let run = (rs >> 4) as usize;
                            let size = rs & 0x0F;
                            if size == 0 {
                                if run == 15 {
                                    k += 16; // ZRL
                                    continue;
                                }
                                break; // EOB
                            }
                            k += run;
                            if k >= 64 {
                                return Err(JpegError::HuffmanDecode);
                            }
                            let bits = reader.read_bits(size)?;
                            zz[k] = extend_sign(bits, size);
                            k += 1;
                        }

                        let plane = &mut planes[sci];
                        for zi in 0..64 {
                            let ni = ZIGZAG_TO_NATURAL[zi];
                            plane.set(br * 8 + ni / 8, bc * 8 + ni % 8, zz[zi]);
                        }
                    }
                }
            }
            mcu_count += 1;
        }
    }

    Ok(planes)
}

/// Re-encode coefficient planes to entropy-coded bytes (restart markers
/// included when `restart_interval > 0`).
pub fn encode_scan(
    frame: &FrameHeader,
    scan_components: &[ScanComponent],
    planes: &[CoefPlane],
    dc_specs: &[Option<HuffmanSpec>; 4],
    ac_specs: &[Option<HuffmanSpec>; 4],
    restart_interval: u16,
) -> JpegResult<Vec<u8>> {
    let mut dc_tables: [Option<HuffmanEncoder>; 4] = [None, None, None, None];
    let mut ac_tables: [Option<HuffmanEncoder>; 4] = [None, None, None, None];
    for sc in scan_components {
        if dc_tables[sc.dc_table].is_none() {
            dc_tables[sc.dc_table] = Some(HuffmanEncoder::build(required_spec(dc_specs, sc.dc_table)?));
        }
        if ac_tables[sc.ac_table].is_none() {
            ac_tables[sc.ac_table] = Some(HuffmanEncoder::build(required_spec(ac_specs, sc.ac_table)?));
        }
    }

    let mut out = Vec::new();
    let mut writer = BitWriter::new();
    let mut dc_pred = vec![0i32; scan_components.len()];
    let mut mcu_count = 0usize;
    let mut restart_count = 0u16;

    for mcu_row in 0..frame.mcus_tall {
        for mcu_col in 0..frame.mcus_wide {
            if restart_interval > 0 && mcu_count > 0 && mcu_count % restart_interval as usize == 0 {
                out.extend_from_slice(
                    &std::mem::replace(&mut writer, BitWriter::new()).into_bytes(),
                );
                out.push(0xFF);
                out.push(0xD0 + (restart_count % 8) as u8);
                restart_count += 1;
                dc_pred.iter_mut().for_each(|p| *p = 0);
            }

            for (sci, sc) in scan_components.iter().enumerate() {
                let comp = &frame.components[sc.comp_idx];
                let dc_tab = dc_tables[sc.dc_table].as_ref().expect("table built above");
                let ac_tab = ac_tables[sc.ac_table].as_ref().expect("table built above");

                for v in 0..comp.v_sampling as usize {
                    for h in 0..comp.h_sampling as usize {
                        let br = mcu_row * comp.v_sampling as usize + v;
                        let bc = mcu_col * comp.h_sampling as usize + h;

                        let zz = block_zigzag(&planes[sci], br, bc);

                        let dc_diff = (zz[0] as i32 - dc_pred[sci]) as i16;
                        dc_pred[sci] = zz[0] as i32;
                        let (dc_bits, dc_size) = magnitude_bits(dc_diff);
                        let (code, len) = dc_tab.encode(dc_size)?;
                        writer.put_bits(code, len);
                        if dc_size > 0 {
                            writer.put_bits(dc_bits, dc_size);
                        }

                        let mut k = 1usize;
                        while k < 64 {
                            let mut run = 0usize;
                            while k + run < 64 && zz[k + run] == 0 {
                                run += 1;
                            }
                            if k + run >= 64 {
                                let (code, len) = ac_tab.encode(0x00)?; // EOB
                                writer.put_bits(code, len);
                                break;
                            }
                            while run >= 16 {
                                let (code, len) = ac_tab.encode(0xF0)?; // ZRL
                                writer.put_bits(code, len);
                                run -= 16;
                                k += 16;
                            }
                            k += run;
                            let (ac_bits, ac_size) = magnitude_bits(zz[k]);
                            let (code, len) = ac_tab.encode(((run as u8) << 4) | ac_size)?;
                            writer.put_bits(code, len);
                            writer.put_bits(ac_bits, ac_size);
                            k += 1;
                        }
                    }
                }
            }
            mcu_count += 1;
        }
    }

    out.extend_from_slice(&writer.into_bytes());
    Ok(out)
}

/// Tally the DC and AC symbol frequencies the encoder will emit.
///
/// Must walk the exact MCU order and restart boundaries of [`encode_scan`];
/// the resulting counts feed the optimal Huffman table rebuild.
pub fn count_symbols(
    frame: &FrameHeader,
    scan_components: &[ScanComponent],
    planes: &[CoefPlane],
    restart_interval: u16,
    dc_freq: &mut [[u32; 256]; 4],
    ac_freq: &mut [[u32; 256]; 4],
) {
    let mut dc_pred = vec![0i32; scan_components.len()];
    let mut mcu_count = 0usize;

    for mcu_row in 0..frame.mcus_tall {
        for mcu_col in 0..frame.mcus_wide {
            if restart_interval > 0 && mcu_count > 0 && mcu_count % restart_interval as usize == 0 {
                dc_pred.iter_mut().for_each(|p| *p = 0);
            }

            for (sci, sc) in scan_components.iter().enumerate() {
                let comp = &frame.components[sc.comp_idx];
                for v in 0..comp.v_sampling as usize {
                    for h in 0..comp.h_sampling as usize {
                        let br = mcu_row * comp.v_sampling as usize + v;
                        let bc = mcu_col * comp.h_sampling as usize + h;
                        let zz = block_zigzag(&planes[sci], br, bc);

                        let dc_diff = (zz[0] as i32 - dc_pred[sci]) as i16;
                        dc_pred[sci] = zz[0] as i32;
                        let (_, dc_size) = magnitude_bits(dc_diff);
                        dc_freq[sc.dc_table][dc_size as usize] += 1;

                        let mut k = 1usize;
                        while k < 64 {
                            let mut run = 0usize;
                            while k + run < 64 && zz[k + run] == 0 {
                                run += 1;
                            }
                            if k + run >= 64 {
                                ac_freq[sc.ac_table][0x00] += 1;
                                break;
                            }
                            while run >= 16 {
                                ac_freq[sc.ac_table][0xF0] += 1;
                                run -= 16;
                                k += 16;
                            }
                            k += run;
                            let (_, ac_size) = magnitude_bits(zz[k]);
                            ac_freq[sc.ac_table][(((run as u8) << 4) | ac_size) as usize] += 1;
                            k += 1;
                        }
                    }
                }
            }
            mcu_count += 1;
        }
    }
}

/// Read block (br, bc) from a plane into zigzag order.
fn block_zigzag(plane: &CoefPlane, br: usize, bc: usize) -> [i16; 64] {
    let mut zz = [0i16; 64];
    for ni in 0..64 {
        zz[NATURAL_TO_ZIGZAG[ni]] = plane.get(br * 8 + ni / 8, bc * 8 + ni % 8);
    }
    zz
}
