//! Reference encoder for synthetic genotype blocks.
//!
//! Packs bits one at a time, independently of the word-at-a-time reader used by
//! the decoder, so decoded matrices are checked against an encoder rather than
//! against hand-packed bytes.

use super::{Compression, Layout};
use std::io::Write;

/// Deterministic non-trivial bytes for codec tests.
pub fn sample_payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 31 + i / 7) % 251) as u8).collect()
}

pub fn compress(codec: Compression, bytes: &[u8]) -> Vec<u8> {
    match codec {
        Compression::None => bytes.to_vec(),
        Compression::Zlib => {
            let mut encoder =
                flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(bytes).expect("zlib encode");
            encoder.finish().expect("zlib finish")
        }
        Compression::Zstd => zstd::bulk::compress(bytes, 3).expect("zstd encode"),
    }
}

/// Largest raw value representable at `bit_depth`.
pub fn max_raw(bit_depth: u8) -> u64 {
    (1u64 << bit_depth) - 1
}

pub fn quantize(probability: f64, bit_depth: u8) -> u64 {
    (probability * max_raw(bit_depth) as f64).round() as u64
}

/// The value a decoder should recover for `probability` stored at `bit_depth`.
pub fn dequantize(probability: f64, bit_depth: u8) -> f32 {
    (quantize(probability, bit_depth) as f64 * (1.0 / max_raw(bit_depth) as f64)) as f32
}

/// Packs values back to back, least significant bit first.
pub fn pack_bits(values: &[u64], bit_depth: u8) -> Vec<u8> {
    let total_bits = values.len() * bit_depth as usize;
    let mut out = vec![0u8; total_bits.div_ceil(8)];
    let mut bit_idx = 0usize;
    for &value in values {
        for bit in 0..bit_depth {
            if (value >> bit) & 1 == 1 {
                out[bit_idx / 8] |= 1 << (bit_idx % 8);
            }
            bit_idx += 1;
        }
    }
    out
}

/// Layout1 block: three `u16` values per sample, scaled by 32768.
pub fn encode_layout1(samples: &[[u16; 3]]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 6);
    for triple in samples {
        for value in triple {
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
    out
}

/// Description of an uncompressed Layout2 block.
///
/// `rows` holds the stored values only (the implied final probability of each
/// row is never written), in decode order.
#[derive(Debug, Clone)]
pub struct Layout2Block {
    pub n_samples: u32,
    pub n_alleles: u16,
    pub min_ploidy: u8,
    pub max_ploidy: u8,
    pub ploidy: Vec<u8>,
    pub missing: Vec<u32>,
    pub phased: bool,
    pub bit_depth: u8,
    pub rows: Vec<Vec<f64>>,
}

impl Layout2Block {
    /// Unphased diploid biallelic block; each row gives `[P(AA), P(AB)]`.
    pub fn diploid(bit_depth: u8, rows: Vec<Vec<f64>>) -> Self {
        let n_samples = rows.len() as u32;
        Self {
            n_samples,
            n_alleles: 2,
            min_ploidy: 2,
            max_ploidy: 2,
            ploidy: vec![2; n_samples as usize],
            missing: Vec::new(),
            phased: false,
            bit_depth,
            rows,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.n_samples.to_le_bytes());
        out.extend_from_slice(&self.n_alleles.to_le_bytes());
        out.push(self.min_ploidy);
        out.push(self.max_ploidy);
        for (sample, &ploidy) in self.ploidy.iter().enumerate() {
            let missing_bit = if self.missing.contains(&(sample as u32)) {
                0x80
            } else {
                0x00
            };
            out.push(missing_bit | (ploidy & 0x3f));
        }
        out.push(u8::from(self.phased));
        out.push(self.bit_depth);
        let values: Vec<u64> = self
            .rows
            .iter()
            .flatten()
            .map(|&p| quantize(p, self.bit_depth))
            .collect();
        out.extend_from_slice(&pack_bits(&values, self.bit_depth));
        out
    }
}

/// Lays decompressed blocks out as a file body behind `lead` filler bytes,
/// compressing and length-prefixing them the way `layout` and `codec` require.
/// Returns the file bytes and each block's `(offset, next_offset)`.
pub fn assemble_file(
    layout: Layout,
    codec: Compression,
    lead: usize,
    blocks: &[Vec<u8>],
) -> (Vec<u8>, Vec<(u64, u64)>) {
    let mut file = vec![0xa5u8; lead];
    let mut spans = Vec::with_capacity(blocks.len());
    for block in blocks {
        let offset = file.len() as u64;
        if layout == Layout::Two && codec != Compression::None {
            file.extend_from_slice(&(block.len() as u32).to_le_bytes());
        }
        file.extend_from_slice(&compress(codec, block));
        spans.push((offset, file.len() as u64));
    }
    (file, spans)
}
