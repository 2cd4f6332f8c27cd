#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
pub mod combinatorics;
pub mod config;
pub mod cursor;
pub mod decompress;
pub mod dosage;
pub mod genotypes;
pub mod layout1;
pub mod layout2;
pub mod ploidy;
#[path = "../shared/files.rs"]
pub mod shared_files;
pub mod types;
pub mod variant;
pub mod shared {
    pub use super::shared_files as files;
}

#[cfg(test)]
mod test_fixtures;

pub use config::{ConfigError, FileSettings};
pub use decompress::Compression;
pub use dosage::MinorAlleleDosage;
pub use genotypes::DecodedGenotypes;
pub use shared::files::{BgenSource, ByteRangeSource, SourceError, open_bgen_source};
pub use types::{BlockSpan, DecodeError, DecompressionError, FormatError, Layout};
pub use variant::{GenotypeBlock, decode_blocks};
