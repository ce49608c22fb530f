//! Growable output buffer with a fixed byte order.

use super::primitive::{Endian, Primitive};

/// Output buffer for one container body.
///
/// Positions are offsets from the start of this buffer. Container writers start
/// a fresh writer at the container base, so positions double as the relative
/// offsets stored in the file.
#[derive(Debug, Clone)]
pub struct ByteWriter {
    data: Vec<u8>,
    endian: Endian,
}

impl ByteWriter {
    #[must_use]
    pub fn new(endian: Endian) -> Self {
        Self {
            data: Vec::new(),
            endian,
        }
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn position(&self) -> usize {
        self.data.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn write<T: Primitive>(&mut self, value: T) {
        value.encode(self.endian, &mut self.data);
    }

    pub fn write_as<T: Primitive>(&mut self, value: T, endian: Endian) {
        value.encode(endian, &mut self.data);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    pub fn write_zeros(&mut self, count: usize) {
        self.data.resize(self.data.len() + count, 0);
    }

    /// Zero-pad to the next multiple of `alignment`.
    pub fn align(&mut self, alignment: usize) {
        let padding = (alignment - (self.data.len() % alignment)) % alignment;
        self.write_zeros(padding);
    }

    /// Overwrite four bytes at an earlier position without moving the end.
    ///
    /// # Panics
    /// Panics if `pos + 4` is past the end of the buffer.
    pub fn patch_u32(&mut self, pos: usize, value: u32) {
        let mut buf = Vec::with_capacity(4);
        value.encode(self.endian, &mut buf);
        self.data[pos..pos + 4].copy_from_slice(&buf);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_and_patch() {
        let mut writer = ByteWriter::new(Endian::Big);
        writer.write(0u32);
        writer.write(7i16);
        writer.patch_u32(0, 0x10);
        assert_eq!(writer.as_bytes(), &[0, 0, 0, 0x10, 0, 7]);
        assert_eq!(writer.position(), 6);
    }

    #[test]
    fn test_align_pads_with_zeros() {
        let mut writer = ByteWriter::new(Endian::Little);
        writer.write(1u8);
        writer.align(4);
        assert_eq!(writer.as_bytes(), &[1, 0, 0, 0]);
        writer.align(4);
        assert_eq!(writer.len(), 4);
        writer.align(16);
        assert_eq!(writer.len(), 16);
    }
}
