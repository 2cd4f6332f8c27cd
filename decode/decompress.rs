//! Decompression of genotype blocks.
//!
//! The compression codec is a file-level property. Blocks are small enough to be
//! decoded in one shot, and the decoded length is known up front, so every codec
//! must produce exactly the expected number of bytes.

use crate::types::{DecompressionError, FormatError};
use flate2::read::ZlibDecoder;
use serde::Deserialize;
use std::borrow::Cow;
use std::fmt;
use std::io::Read;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    None,
    Zlib,
    Zstd,
}

impl Compression {
    /// Maps the header compression tag (`0 = none`, `1 = zlib`, `2 = zstd`).
    pub fn from_flag(flag: u32) -> Result<Self, FormatError> {
        match flag {
            0 => Ok(Compression::None),
            1 => Ok(Compression::Zlib),
            2 => Ok(Compression::Zstd),
            other => Err(FormatError::UnknownCompression(other)),
        }
    }

    pub fn is_compressed(self) -> bool {
        self != Compression::None
    }

    /// Decodes `input` into exactly `expected_len` bytes. Uncompressed input is
    /// handed back without copying once its length matches.
    pub fn decompress<'a>(
        self,
        input: &'a [u8],
        expected_len: usize,
    ) -> Result<Cow<'a, [u8]>, DecompressionError> {
        match self {
            Compression::None if input.len() != expected_len => {
                Err(DecompressionError::LengthMismatch {
                    codec: "none",
                    expected: expected_len,
                    actual: input.len(),
                })
            }
            Compression::None => Ok(Cow::Borrowed(input)),
            Compression::Zlib => zlib_uncompress(input, expected_len).map(Cow::Owned),
            Compression::Zstd => zstd_uncompress(input, expected_len).map(Cow::Owned),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            Compression::Zlib => write!(f, "zlib"),
            Compression::Zstd => write!(f, "zstd"),
        }
    }
}

/// Reads at most one byte past `expected_len` so oversized output is caught
/// without inflating the whole stream.
fn read_exact_len<R: Read>(
    decoder: R,
    codec: &'static str,
    expected_len: usize,
) -> Result<Vec<u8>, DecompressionError> {
    let mut output = Vec::with_capacity(expected_len);
    decoder
        .take(expected_len as u64 + 1)
        .read_to_end(&mut output)
        .map_err(|e| DecompressionError::Codec {
            codec,
            message: e.to_string(),
        })?;
    if output.len() != expected_len {
        return Err(DecompressionError::LengthMismatch {
            codec,
            expected: expected_len,
            actual: output.len(),
        });
    }
    Ok(output)
}

pub fn zlib_uncompress(input: &[u8], expected_len: usize) -> Result<Vec<u8>, DecompressionError> {
    read_exact_len(ZlibDecoder::new(input), "zlib", expected_len)
}

pub fn zstd_uncompress(input: &[u8], expected_len: usize) -> Result<Vec<u8>, DecompressionError> {
    let decoder = zstd::stream::Decoder::new(input).map_err(|e| DecompressionError::Codec {
        codec: "zstd",
        message: e.to_string(),
    })?;
    read_exact_len(decoder, "zstd", expected_len)
}
