use crate::types::FormatError;

/// A forward-only little-endian reader over a decompressed genotype block.
#[derive(Debug)]
pub struct ByteCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }

    /// Consumes `len` bytes and returns them as a slice.
    pub fn take(&mut self, len: usize, context: &'static str) -> Result<&'a [u8], FormatError> {
        let available = self.bytes.len() - self.pos;
        if len > available {
            return Err(FormatError::Truncated {
                context,
                needed: len,
                available,
            });
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_u8(&mut self, context: &'static str) -> Result<u8, FormatError> {
        Ok(self.take(1, context)?[0])
    }

    pub fn read_u16(&mut self, context: &'static str) -> Result<u16, FormatError> {
        let bytes = self.take(2, context)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self, context: &'static str) -> Result<u32, FormatError> {
        let bytes = self.take(4, context)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}
