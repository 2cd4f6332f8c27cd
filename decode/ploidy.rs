//! Per-sample ploidy and missingness for Layout2 blocks.
//!
//! Each sample contributes one byte: bit 7 flags the sample as missing, bits 0-5
//! carry its ploidy and bit 6 is reserved.

use crate::cursor::ByteCursor;
use crate::types::FormatError;

const MISSING_BIT: u8 = 0x80;
const PLOIDY_MASK: u8 = 0x3f;

/// How the ploidy values are recovered from the ploidy bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PloidyStrategy {
    /// Fill every sample with `max_ploidy` when the block declares a constant
    /// ploidy, and read the low bits otherwise.
    Auto,
    /// Always read the low bits of every byte.
    PerSample,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PloidyBlock {
    pub ploidy: Vec<u8>,
    /// Sample indices flagged missing, ascending.
    pub missing: Vec<u32>,
}

/// Consumes `n_samples` ploidy bytes from `cursor`.
pub fn parse_ploidy(
    cursor: &mut ByteCursor<'_>,
    n_samples: u32,
    min_ploidy: u8,
    max_ploidy: u8,
    strategy: PloidyStrategy,
) -> Result<PloidyBlock, FormatError> {
    let bytes = cursor.take(n_samples as usize, "ploidy")?;
    let mut missing = Vec::new();

    let ploidy = if strategy == PloidyStrategy::Auto && min_ploidy == max_ploidy {
        for (sample, &byte) in bytes.iter().enumerate() {
            if byte & MISSING_BIT != 0 {
                missing.push(sample as u32);
            }
        }
        vec![max_ploidy; bytes.len()]
    } else {
        let mut ploidy = Vec::with_capacity(bytes.len());
        for (sample, &byte) in bytes.iter().enumerate() {
            if byte & MISSING_BIT != 0 {
                missing.push(sample as u32);
            }
            let value = byte & PLOIDY_MASK;
            if value > max_ploidy {
                return Err(FormatError::PloidyOutOfRange {
                    sample: sample as u32,
                    ploidy: value,
                    max: max_ploidy,
                });
            }
            ploidy.push(value);
        }
        ploidy
    };

    Ok(PloidyBlock { ploidy, missing })
}
