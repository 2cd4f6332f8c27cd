// ========================================================================================
//                             High-Level Data Contracts
// ========================================================================================

// This file is ONLY for types that are SHARED BETWEEN FILES, not types that only are used in one file.

use crate::shared::files::SourceError;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// The on-disk encoding of a genotype block. Fixed for a whole file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum Layout {
    /// Legacy encoding: unphased diploid, three `u16` probabilities per sample.
    One,
    /// Bit-packed encoding with per-sample ploidy, phasing and variable bit depth.
    Two,
}

impl Layout {
    pub fn from_flag(flag: u32) -> Result<Self, FormatError> {
        match flag {
            1 => Ok(Layout::One),
            2 => Ok(Layout::Two),
            other => Err(FormatError::UnknownLayout(other)),
        }
    }
}

impl TryFrom<u8> for Layout {
    type Error = FormatError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Layout::from_flag(u32::from(value))
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::One => write!(f, "layout1"),
            Layout::Two => write!(f, "layout2"),
        }
    }
}

/// Where a variant's genotype block sits in the file: from `offset` up to the
/// start of the next variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    pub offset: u64,
    pub next_offset: u64,
}

impl BlockSpan {
    pub fn new(offset: u64, next_offset: u64) -> Self {
        Self {
            offset,
            next_offset,
        }
    }

    pub fn len(&self) -> Result<usize, FormatError> {
        self.next_offset
            .checked_sub(self.offset)
            .map(|len| len as usize)
            .ok_or(FormatError::InvalidSpan {
                offset: self.offset,
                next_offset: self.next_offset,
            })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("block declares {found} samples but the file has {expected}")]
    SampleCountMismatch { expected: u32, found: u32 },
    #[error("block declares {found} alleles but the variant has {expected}")]
    AlleleCountMismatch { expected: u16, found: u16 },
    #[error("variant has no alleles")]
    NoAlleles,
    #[error("bit depth {0} is outside [1, 32]")]
    BitDepthOutOfRange(u8),
    #[error("invalid ploidy range: min {min}, max {max} (ploidy is limited to 63)")]
    PloidyRange { min: u8, max: u8 },
    #[error("sample {sample} has ploidy {ploidy}, above the block maximum {max}")]
    PloidyOutOfRange { sample: u32, ploidy: u8, max: u8 },
    #[error("unexpected end of block while reading {context} (needed {needed} bytes, {available} available)")]
    Truncated {
        context: &'static str,
        needed: usize,
        available: usize,
    },
    #[error("next variant offset {next_offset} precedes block offset {offset}")]
    InvalidSpan { offset: u64, next_offset: u64 },
    #[error("unknown compression flag {0}")]
    UnknownCompression(u32),
    #[error("unknown layout flag {0}")]
    UnknownLayout(u32),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecompressionError {
    #[error("{codec} decompression failed: {message}")]
    Codec {
        codec: &'static str,
        message: String,
    },
    #[error("{codec} produced {actual} bytes, expected exactly {expected}")]
    LengthMismatch {
        codec: &'static str,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Decompression(#[from] DecompressionError),
    #[error("C({n}, {k}) does not fit in 32 bits")]
    Overflow { n: u64, k: u64 },
    #[error("source error: {0}")]
    Source(#[from] SourceError),
    #[error("sample {sample} is out of range for a block of {n_samples} samples")]
    SampleOutOfRange { sample: usize, n_samples: usize },
    #[error("dosage requires a biallelic variant, found {0} alleles")]
    UnsupportedDosage(u16),
    #[error("failed to build decode thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
