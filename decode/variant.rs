// ========================================================================================
//
//                        PER-VARIANT GENOTYPE PROBABILITY CACHE
//
// ========================================================================================
//
// A `GenotypeBlock` knows where one variant's genotype data lives and how the file
// encodes it. The first call to `probabilities` fetches the block, decompresses
// it, parses it with the file's layout and keeps the result. Later calls return
// the cached matrix without touching the source until `clear_probs` drops it.

use crate::decompress::Compression;
use crate::genotypes::DecodedGenotypes;
use crate::layout1::decode_layout1;
use crate::layout2::decode_layout2;
use crate::shared::files::BgenSource;
use crate::types::{BlockSpan, DecodeError, FormatError, Layout};
use log::{debug, trace};
use ndarray::ArrayView2;
use rayon::prelude::*;

/// Bytes of the decompressed-length prefix on compressed Layout2 blocks.
const DECOMPRESSED_LEN_PREFIX: usize = 4;
/// Bytes per sample in a Layout1 block.
const LAYOUT1_BYTES_PER_SAMPLE: usize = 6;

/// The raw bytes of one block as fetched from the source.
#[derive(Debug)]
struct FetchedBlock {
    payload: Vec<u8>,
    payload_start: usize,
    decompressed_len: usize,
}

impl FetchedBlock {
    fn compressed(&self) -> &[u8] {
        &self.payload[self.payload_start..]
    }
}

#[derive(Debug, Clone)]
pub struct GenotypeBlock {
    source: BgenSource,
    span: BlockSpan,
    n_samples: u32,
    n_alleles: u16,
    layout: Layout,
    compression: Compression,
    decoded: Option<DecodedGenotypes>,
}

impl GenotypeBlock {
    pub fn new(
        source: BgenSource,
        span: BlockSpan,
        n_samples: u32,
        n_alleles: u16,
        layout: Layout,
        compression: Compression,
    ) -> Self {
        Self {
            source,
            span,
            n_samples,
            n_alleles,
            layout,
            compression,
            decoded: None,
        }
    }

    pub fn span(&self) -> BlockSpan {
        self.span
    }

    pub fn n_samples(&self) -> u32 {
        self.n_samples
    }

    pub fn n_alleles(&self) -> u16 {
        self.n_alleles
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Columns of the cached matrix, or 0 when nothing is cached.
    pub fn max_probs(&self) -> usize {
        self.decoded.as_ref().map_or(0, DecodedGenotypes::max_probs)
    }

    pub fn is_decoded(&self) -> bool {
        self.decoded.is_some()
    }

    /// The decoded state, decoding the block on first use.
    pub fn genotypes(&mut self) -> Result<&DecodedGenotypes, DecodeError> {
        let decoded = match self.decoded.take() {
            Some(decoded) => {
                trace!("cache hit for block at offset {}", self.span.offset);
                decoded
            }
            None => self.decode()?,
        };
        Ok(self.decoded.insert(decoded))
    }

    /// The probability matrix: one row per sample (or per haplotype when phased),
    /// `max_probs` columns.
    pub fn probabilities(&mut self) -> Result<ArrayView2<'_, f32>, DecodeError> {
        Ok(self.genotypes()?.probabilities())
    }

    pub fn ploidy(&mut self) -> Result<&[u8], DecodeError> {
        Ok(self.genotypes()?.ploidy())
    }

    pub fn missing(&mut self) -> Result<&[u32], DecodeError> {
        Ok(self.genotypes()?.missing())
    }

    pub fn phased(&mut self) -> Result<bool, DecodeError> {
        Ok(self.genotypes()?.phased())
    }

    pub fn min_ploidy(&mut self) -> Result<u8, DecodeError> {
        Ok(self.genotypes()?.min_ploidy())
    }

    pub fn max_ploidy(&mut self) -> Result<u8, DecodeError> {
        Ok(self.genotypes()?.max_ploidy())
    }

    pub fn is_missing(&mut self, sample: u32) -> Result<bool, DecodeError> {
        Ok(self.genotypes()?.is_missing(sample))
    }

    /// Rows owned by `sample`.
    pub fn sample_rows(&mut self, sample: usize) -> Result<ArrayView2<'_, f32>, DecodeError> {
        let n_samples = self.n_samples as usize;
        self.genotypes()?
            .sample_rows(sample)
            .ok_or(DecodeError::SampleOutOfRange { sample, n_samples })
    }

    /// Drops the cached ploidy, missingness and probabilities. A later call to
    /// `probabilities` re-reads and re-decodes the block.
    pub fn clear_probs(&mut self) {
        self.decoded = None;
    }

    fn decode(&self) -> Result<DecodedGenotypes, DecodeError> {
        let fetched = self.fetch()?;
        let bytes = self
            .compression
            .decompress(fetched.compressed(), fetched.decompressed_len)?;
        match self.layout {
            Layout::One => decode_layout1(&bytes, self.n_samples, self.n_alleles),
            Layout::Two => decode_layout2(&bytes, self.n_samples, self.n_alleles),
        }
    }

    /// Reads the whole span in one request. Layout1 blocks always hold six bytes
    /// per sample once decompressed. Compressed Layout2 blocks begin with their
    /// decompressed length; uncompressed Layout2 blocks fill the span.
    fn fetch(&self) -> Result<FetchedBlock, DecodeError> {
        let span_len = self.span.len()?;
        let payload = self.source.read_vec(self.span.offset, span_len)?;

        let (payload_start, decompressed_len) = match (self.layout, self.compression) {
            (Layout::One, _) => (0, self.n_samples as usize * LAYOUT1_BYTES_PER_SAMPLE),
            (Layout::Two, Compression::None) => (0, span_len),
            (Layout::Two, _) => {
                let prefix = payload.get(..DECOMPRESSED_LEN_PREFIX).ok_or(
                    FormatError::Truncated {
                        context: "decompressed length",
                        needed: DECOMPRESSED_LEN_PREFIX,
                        available: span_len,
                    },
                )?;
                let len = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]);
                (DECOMPRESSED_LEN_PREFIX, len as usize)
            }
        };

        debug!(
            "fetched {} block at offset {}: {} compressed bytes ({}), {} decompressed",
            self.layout,
            self.span.offset,
            span_len - payload_start,
            self.compression,
            decompressed_len
        );

        Ok(FetchedBlock {
            payload,
            payload_start,
            decompressed_len,
        })
    }
}

/// Decodes every block, in parallel. Blocks are independent and the source uses
/// positional reads, so workers never share seek state. `threads` pins the pool
/// size; `None` uses the global rayon pool.
pub fn decode_blocks(
    blocks: &mut [GenotypeBlock],
    threads: Option<usize>,
) -> Result<(), DecodeError> {
    let run = |blocks: &mut [GenotypeBlock]| {
        blocks
            .par_iter_mut()
            .try_for_each(|block| block.genotypes().map(|_| ()))
    };
    match threads {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()?;
            pool.install(|| run(blocks))
        }
        None => run(blocks),
    }
}
