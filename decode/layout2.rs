// ========================================================================================
//
//                          LAYOUT2 GENOTYPE BLOCK DECODER
//
// ========================================================================================
//
// Block structure (after decompression):
//
//   u32 n_samples | u16 n_alleles | u8 min_ploidy | u8 max_ploidy
//   n_samples ploidy bytes | u8 phased | u8 bit_depth | packed probabilities
//
// Probabilities are packed back to back, `bit_depth` bits each, least significant
// bit first. Each row stores all but its last probability; the last one is
// `1 - sum(stored)`. Columns beyond a row's own cardinality are NaN.

use crate::combinatorics::max_probabilities;
use crate::cursor::ByteCursor;
use crate::genotypes::DecodedGenotypes;
use crate::ploidy::{PloidyStrategy, parse_ploidy};
use crate::types::{DecodeError, FormatError};
use log::trace;
use ndarray::Array2;

const MAX_BIT_DEPTH: u8 = 32;
const MAX_PLOIDY: u8 = 63;

/// Reads fixed-width unsigned values from a little-endian bitstream.
#[derive(Debug)]
pub struct BitReader<'a> {
    bytes: &'a [u8],
    bit_idx: usize,
    bit_depth: u8,
    mask: u64,
    factor: f64,
}

impl<'a> BitReader<'a> {
    pub fn new(bytes: &'a [u8], bit_depth: u8) -> Result<Self, FormatError> {
        if !(1..=MAX_BIT_DEPTH).contains(&bit_depth) {
            return Err(FormatError::BitDepthOutOfRange(bit_depth));
        }
        let mask = (1u64 << bit_depth) - 1;
        Ok(Self {
            bytes,
            bit_idx: 0,
            bit_depth,
            mask,
            factor: 1.0 / mask as f64,
        })
    }

    /// Extracts the next raw value. An 8-byte window starting at the current
    /// byte always covers the value, since `bit_idx % 8 + bit_depth <= 39`. The
    /// window is zero-padded near the end of the buffer.
    pub fn next_raw(&mut self) -> Result<u64, FormatError> {
        let end_bit = self.bit_idx + self.bit_depth as usize;
        if end_bit > self.bytes.len() * 8 {
            return Err(FormatError::Truncated {
                context: "packed probabilities",
                needed: end_bit.div_ceil(8) - self.bit_idx / 8,
                available: self.bytes.len() - self.bit_idx / 8,
            });
        }
        let start = self.bit_idx / 8;
        let stop = (start + 8).min(self.bytes.len());
        let mut window = [0u8; 8];
        window[..stop - start].copy_from_slice(&self.bytes[start..stop]);
        let raw = (u64::from_le_bytes(window) >> (self.bit_idx % 8)) & self.mask;
        self.bit_idx = end_bit;
        Ok(raw)
    }

    pub fn remaining_bits(&self) -> usize {
        self.bytes.len() * 8 - self.bit_idx
    }

    pub fn next_probability(&mut self) -> Result<f32, FormatError> {
        Ok((self.next_raw()? as f64 * self.factor) as f32)
    }
}

/// Stored values in one unphased row of variable-ploidy data.
///
/// The diploid biallelic case is by far the most common and is answered
/// directly; it agrees with the general multiset count `C(3, 1) - 1`.
pub fn unphased_stored_values(ploidy: u8, n_alleles: u16) -> Result<usize, DecodeError> {
    if ploidy == 2 && n_alleles == 2 {
        return Ok(2);
    }
    Ok(max_probabilities(ploidy, n_alleles, false)? as usize - 1)
}

/// Memoises `unphased_stored_values` by ploidy, which is at most 63.
struct StoredValueTable {
    n_alleles: u16,
    counts: [Option<usize>; MAX_PLOIDY as usize + 1],
}

impl StoredValueTable {
    fn new(n_alleles: u16) -> Self {
        Self {
            n_alleles,
            counts: [None; MAX_PLOIDY as usize + 1],
        }
    }

    fn get(&mut self, ploidy: u8) -> Result<usize, DecodeError> {
        let slot = &mut self.counts[ploidy as usize];
        match *slot {
            Some(count) => Ok(count),
            None => {
                let count = unphased_stored_values(ploidy, self.n_alleles)?;
                *slot = Some(count);
                Ok(count)
            }
        }
    }
}

pub fn decode_layout2(
    bytes: &[u8],
    n_samples: u32,
    n_alleles: u16,
) -> Result<DecodedGenotypes, DecodeError> {
    decode_layout2_with(bytes, n_samples, n_alleles, PloidyStrategy::Auto)
}

/// Decodes a Layout2 block, validating its header against the sample and allele
/// counts the caller already knows for this variant.
pub fn decode_layout2_with(
    bytes: &[u8],
    n_samples: u32,
    n_alleles: u16,
    strategy: PloidyStrategy,
) -> Result<DecodedGenotypes, DecodeError> {
    let mut cursor = ByteCursor::new(bytes);

    let block_samples = cursor.read_u32("n_samples")?;
    if block_samples != n_samples {
        return Err(FormatError::SampleCountMismatch {
            expected: n_samples,
            found: block_samples,
        }
        .into());
    }
    let block_alleles = cursor.read_u16("n_alleles")?;
    if block_alleles != n_alleles {
        return Err(FormatError::AlleleCountMismatch {
            expected: n_alleles,
            found: block_alleles,
        }
        .into());
    }
    if n_alleles == 0 {
        return Err(FormatError::NoAlleles.into());
    }

    let min_ploidy = cursor.read_u8("min_ploidy")?;
    let max_ploidy = cursor.read_u8("max_ploidy")?;
    if min_ploidy > max_ploidy || max_ploidy > MAX_PLOIDY {
        return Err(FormatError::PloidyRange {
            min: min_ploidy,
            max: max_ploidy,
        }
        .into());
    }

    let ploidy_block = parse_ploidy(&mut cursor, n_samples, min_ploidy, max_ploidy, strategy)?;
    let phased = cursor.read_u8("phased")? != 0;
    let bit_depth = cursor.read_u8("bit_depth")?;
    let mut reader = BitReader::new(cursor.remaining(), bit_depth)?;

    let max_probs = max_probabilities(max_ploidy, n_alleles, phased)? as usize;
    let constant_ploidy = strategy == PloidyStrategy::Auto && min_ploidy == max_ploidy;
    let ploidy = &ploidy_block.ploidy;

    let n_rows = if !phased {
        n_samples as usize
    } else if constant_ploidy {
        n_samples as usize * max_ploidy as usize
    } else {
        ploidy.iter().map(|&p| p as usize).sum()
    };

    trace!(
        "layout2 block: {n_samples} samples, {n_alleles} alleles, ploidy {min_ploidy}..={max_ploidy}, phased={phased}, bit_depth={bit_depth}, {n_rows}x{max_probs}"
    );

    let mut table = StoredValueTable::new(n_alleles);
    let mut row_shape = |sample_ploidy: u8| -> Result<(usize, usize), DecodeError> {
        if constant_ploidy {
            let haplotypes = if phased { max_ploidy as usize } else { 1 };
            Ok((haplotypes, max_probs - 1))
        } else if phased {
            Ok((sample_ploidy as usize, n_alleles as usize - 1))
        } else {
            Ok((1, table.get(sample_ploidy)?))
        }
    };

    // The header alone can claim billions of columns, so the bitstream must be
    // long enough before the matrix is allocated.
    let mut stored_values = 0u128;
    for &sample_ploidy in ploidy.iter() {
        let (rows_for_sample, n_probs) = row_shape(sample_ploidy)?;
        stored_values += rows_for_sample as u128 * n_probs as u128;
    }
    let needed_bits = stored_values * u128::from(bit_depth);
    if needed_bits > reader.remaining_bits() as u128 {
        return Err(FormatError::Truncated {
            context: "packed probabilities",
            needed: usize::try_from(needed_bits.div_ceil(8)).unwrap_or(usize::MAX),
            available: reader.remaining_bits() / 8,
        }
        .into());
    }

    let mut probs = Array2::from_elem((n_rows, max_probs), f32::NAN);
    let mut row_idx = 0usize;

    for &sample_ploidy in ploidy.iter() {
        let (rows_for_sample, n_probs) = row_shape(sample_ploidy)?;
        for _ in 0..rows_for_sample {
            let mut row = probs.row_mut(row_idx);
            let mut remainder = 1.0f32;
            for slot in row.iter_mut().take(n_probs) {
                let p = reader.next_probability()?;
                *slot = p;
                remainder -= p;
            }
            row[n_probs] = remainder;
            row_idx += 1;
        }
    }

    Ok(DecodedGenotypes::new(
        phased,
        min_ploidy,
        max_ploidy,
        ploidy_block.ploidy,
        ploidy_block.missing,
        probs,
    ))
}
