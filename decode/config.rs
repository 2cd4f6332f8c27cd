//! File-level decode settings.
//!
//! Layout, compression and sample count are fixed for a whole file and are
//! normally read from its header. Callers that already know them, or that want
//! to decode blocks extracted from a file, describe them in a small TOML table:
//!
//! ```toml
//! layout = 2
//! compression = "zstd"
//! n_samples = 487409
//! decode_threads = 8
//! ```

use crate::decompress::Compression;
use crate::shared::files::BgenSource;
use crate::types::{BlockSpan, DecodeError, Layout};
use crate::variant::{GenotypeBlock, decode_blocks};
use log::debug;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileSettings {
    pub layout: Layout,
    pub compression: Compression,
    pub n_samples: u32,
    /// Worker threads for `decode_all`. Unset means the global rayon pool.
    #[serde(default)]
    pub decode_threads: Option<usize>,
}

impl FileSettings {
    pub fn new(layout: Layout, compression: Compression, n_samples: u32) -> Self {
        Self {
            layout,
            compression,
            n_samples,
            decode_threads: None,
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let settings = Self::from_toml_str(&text)?;
        debug!("loaded decode settings from {}: {settings:?}", path.display());
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.decode_threads == Some(0) {
            return Err(ConfigError::Invalid(
                "decode_threads must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }

    /// A not-yet-decoded block for the variant stored at `offset`.
    pub fn block(
        &self,
        source: &BgenSource,
        offset: u64,
        next_offset: u64,
        n_alleles: u16,
    ) -> GenotypeBlock {
        GenotypeBlock::new(
            source.clone(),
            BlockSpan::new(offset, next_offset),
            self.n_samples,
            n_alleles,
            self.layout,
            self.compression,
        )
    }

    pub fn decode_all(&self, blocks: &mut [GenotypeBlock]) -> Result<(), DecodeError> {
        decode_blocks(blocks, self.decode_threads)
    }
}
