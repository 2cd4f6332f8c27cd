use log::debug;
use memmap2::Mmap;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("read of {len} bytes at offset {offset} runs past end of source ({source_len} bytes)")]
    OutOfBounds {
        offset: u64,
        len: usize,
        source_len: u64,
    },
    #[error("stream handle lock was poisoned by a panicking reader")]
    Poisoned,
}

/// Counts the positional reads issued against a source. Decoders consult this to
/// confirm that cached blocks never touch the underlying storage again.
#[derive(Debug, Default)]
pub struct ReadMetrics {
    reads: AtomicU64,
    bytes_read: AtomicU64,
}

impl ReadMetrics {
    pub fn record(&self, bytes: usize) {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Returns `(reads, bytes_read)`.
    pub fn snapshot(&self) -> (u64, u64) {
        (
            self.reads.load(Ordering::Relaxed),
            self.bytes_read.load(Ordering::Relaxed),
        )
    }

    pub fn reset(&self) {
        self.reads.store(0, Ordering::Relaxed);
        self.bytes_read.store(0, Ordering::Relaxed);
    }
}

/// A trait that abstracts byte-range access for `.bgen` data, regardless of the
/// underlying storage mechanism.
///
/// Reads are positional: there is no shared cursor, so one source can serve many
/// worker threads at once.
pub trait ByteRangeSource: Send + Sync {
    fn len(&self) -> u64;
    fn read_at(&self, offset: u64, dst: &mut [u8]) -> Result<(), SourceError>;
}

fn check_range(offset: u64, len: usize, source_len: u64) -> Result<(), SourceError> {
    let end = offset.checked_add(len as u64);
    match end {
        Some(end) if end <= source_len => Ok(()),
        _ => Err(SourceError::OutOfBounds {
            offset,
            len,
            source_len,
        }),
    }
}

/// A cloneable handle over any byte source, shared by every genotype block that
/// reads from the same file.
#[derive(Clone)]
pub struct BgenSource {
    byte_source: Arc<dyn ByteRangeSource>,
    metrics: Arc<ReadMetrics>,
}

impl BgenSource {
    pub fn new(byte_source: Arc<dyn ByteRangeSource>) -> Self {
        Self {
            byte_source,
            metrics: Arc::new(ReadMetrics::default()),
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::new(Arc::new(MemoryByteRangeSource::new(bytes)))
    }

    /// Wraps a seekable stream. The seek and the read for a request happen under one
    /// lock, so the handle may be shared between threads.
    pub fn from_stream<R>(stream: R) -> Result<Self, SourceError>
    where
        R: Read + Seek + Send + 'static,
    {
        Ok(Self::new(Arc::new(StreamByteRangeSource::new(stream)?)))
    }

    pub fn len(&self) -> u64 {
        self.byte_source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn metrics(&self) -> Arc<ReadMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn read_at(&self, offset: u64, dst: &mut [u8]) -> Result<(), SourceError> {
        self.byte_source.read_at(offset, dst)?;
        self.metrics.record(dst.len());
        Ok(())
    }

    /// Reads `len` bytes starting at `offset` into a freshly allocated buffer.
    pub fn read_vec(&self, offset: u64, len: usize) -> Result<Vec<u8>, SourceError> {
        check_range(offset, len, self.len())?;
        let mut buffer = vec![0u8; len];
        self.read_at(offset, &mut buffer)?;
        Ok(buffer)
    }
}

impl std::fmt::Debug for BgenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (reads, bytes) = self.metrics.snapshot();
        f.debug_struct("BgenSource")
            .field("len", &self.len())
            .field("reads", &reads)
            .field("bytes_read", &bytes)
            .finish()
    }
}

/// Creates a `BgenSource` for the provided `.bgen` path. The file is memory-mapped.
pub fn open_bgen_source(path: &Path) -> Result<BgenSource, SourceError> {
    let file = File::open(path)?;
    let mmap = unsafe { Mmap::map(&file)? };
    mmap.advise(memmap2::Advice::Random)?;
    debug!("Mapped {} ({} bytes)", path.display(), mmap.len());
    Ok(BgenSource::new(Arc::new(MmapByteRangeSource::new(Arc::new(
        mmap,
    )))))
}

struct MmapByteRangeSource {
    mmap: Arc<Mmap>,
}

impl MmapByteRangeSource {
    fn new(mmap: Arc<Mmap>) -> Self {
        Self { mmap }
    }
}

impl ByteRangeSource for MmapByteRangeSource {
    fn len(&self) -> u64 {
        self.mmap.len() as u64
    }

    fn read_at(&self, offset: u64, dst: &mut [u8]) -> Result<(), SourceError> {
        check_range(offset, dst.len(), self.len())?;
        let start = offset as usize;
        dst.copy_from_slice(&self.mmap[start..start + dst.len()]);
        Ok(())
    }
}

pub struct MemoryByteRangeSource {
    bytes: Vec<u8>,
}

impl MemoryByteRangeSource {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl ByteRangeSource for MemoryByteRangeSource {
    fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn read_at(&self, offset: u64, dst: &mut [u8]) -> Result<(), SourceError> {
        check_range(offset, dst.len(), self.len())?;
        let start = offset as usize;
        dst.copy_from_slice(&self.bytes[start..start + dst.len()]);
        Ok(())
    }
}

/// Adapts a stateful `seek` + `read` stream to positional reads.
pub struct StreamByteRangeSource<R> {
    stream: Mutex<R>,
    len: u64,
}

impl<R: Read + Seek + Send> StreamByteRangeSource<R> {
    pub fn new(mut stream: R) -> Result<Self, SourceError> {
        let len = stream.seek(SeekFrom::End(0))?;
        Ok(Self {
            stream: Mutex::new(stream),
            len,
        })
    }
}

impl<R: Read + Seek + Send> ByteRangeSource for StreamByteRangeSource<R> {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&self, offset: u64, dst: &mut [u8]) -> Result<(), SourceError> {
        check_range(offset, dst.len(), self.len)?;
        let mut stream = self.stream.lock().map_err(|_| SourceError::Poisoned)?;
        stream.seek(SeekFrom::Start(offset))?;
        stream.read_exact(dst)?;
        Ok(())
    }
}
