//! Legacy Layout1 genotype blocks.
//!
//! Every sample is unphased and diploid, with three probabilities stored as
//! little-endian `u16` values scaled by 1/32768. There is no missingness flag:
//! a sample whose three values are all zero is read as missing and its row is
//! set to NaN. That sentinel is part of the legacy format, not a decode error.

use crate::combinatorics::max_probabilities;
use crate::cursor::ByteCursor;
use crate::genotypes::DecodedGenotypes;
use crate::types::{DecodeError, FormatError};
use log::debug;
use ndarray::Array2;

const SCALE: f32 = 1.0 / 32768.0;
const VALUES_PER_SAMPLE: usize = 3;

pub fn decode_layout1(
    bytes: &[u8],
    n_samples: u32,
    n_alleles: u16,
) -> Result<DecodedGenotypes, DecodeError> {
    let max_probs = max_probabilities(2, n_alleles, false)? as usize;
    if max_probs < VALUES_PER_SAMPLE {
        return Err(FormatError::AlleleCountMismatch {
            expected: 2,
            found: n_alleles,
        }
        .into());
    }

    let mut cursor = ByteCursor::new(bytes);
    let mut probs = Array2::from_elem((n_samples as usize, max_probs), f32::NAN);
    let mut zero_triples = 0usize;

    for mut row in probs.rows_mut() {
        let mut triple = [0f32; VALUES_PER_SAMPLE];
        for value in triple.iter_mut() {
            *value = f32::from(cursor.read_u16("layout1 probabilities")?) * SCALE;
        }
        if triple.iter().all(|&p| p == 0.0) {
            zero_triples += 1;
            continue;
        }
        for (slot, value) in row.iter_mut().zip(triple) {
            *slot = value;
        }
    }

    if zero_triples > 0 {
        debug!("layout1 block: {zero_triples} all-zero samples read as missing");
    }

    Ok(DecodedGenotypes::new(
        false,
        2,
        2,
        vec![2; n_samples as usize],
        Vec::new(),
        probs,
    ))
}
