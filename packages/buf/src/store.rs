//! Raw byte storage traits.
//!
//! A [`ByteStore`] is a fixed-length, zero-based block of bytes with no
//! view logic of its own. Buffers layer offsets, bounds checking, and the
//! composed integer widths on top; several interchangeable store
//! implementations exist and are chosen through the provider registry.

/// A raw, fixed-length, zero-based byte-addressable storage unit.
///
/// Stores carry no bounds errors of their own: the Buffer layer validates
/// every access before it reaches a store, so an access must satisfy
/// `offset + len <= self.len()`. Implementations may panic on misuse.
pub trait ByteStore: Send + Sync {
    /// Total capacity in bytes, fixed for the lifetime of the store.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies `out.len()` bytes starting at `offset` into `out`.
    fn read_at(&self, offset: usize, out: &mut [u8]);

    /// Writes all of `data` starting at `offset`.
    fn write_at(&mut self, offset: usize, data: &[u8]);

    /// Sets every byte in `[start, end)` to `value`.
    fn fill(&mut self, value: u8, start: usize, end: usize) {
        let chunk = [value; 64];
        let mut pos = start;
        while pos < end {
            let n = (end - pos).min(chunk.len());
            self.write_at(pos, &chunk[..n]);
            pos += n;
        }
    }

    /// Returns a new, independently owned store of the same kind holding a
    /// copy of `[start, end)`.
    fn copy_range(&self, start: usize, end: usize) -> Box<dyn ByteStore>;
}

/// Width- and endianness-aware primitives derived from raw access.
///
/// Only the native 1/2/4-byte integers and the IEEE floats live here; the
/// composed 3/5/6-byte widths are assembled from these at the Buffer layer.
pub trait ByteStoreExt: ByteStore {
    fn read_u8(&self, offset: usize) -> u8 {
        let mut b = [0u8; 1];
        self.read_at(offset, &mut b);
        b[0]
    }

    fn read_i8(&self, offset: usize) -> i8 {
        self.read_u8(offset) as i8
    }

    fn read_u16_le(&self, offset: usize) -> u16 {
        let mut b = [0u8; 2];
        self.read_at(offset, &mut b);
        u16::from_le_bytes(b)
    }

    fn read_u16_be(&self, offset: usize) -> u16 {
        let mut b = [0u8; 2];
        self.read_at(offset, &mut b);
        u16::from_be_bytes(b)
    }

    fn read_i16_le(&self, offset: usize) -> i16 {
        self.read_u16_le(offset) as i16
    }

    fn read_i16_be(&self, offset: usize) -> i16 {
        self.read_u16_be(offset) as i16
    }

    fn read_u32_le(&self, offset: usize) -> u32 {
        let mut b = [0u8; 4];
        self.read_at(offset, &mut b);
        u32::from_le_bytes(b)
    }

    fn read_u32_be(&self, offset: usize) -> u32 {
        let mut b = [0u8; 4];
        self.read_at(offset, &mut b);
        u32::from_be_bytes(b)
    }

    fn read_i32_le(&self, offset: usize) -> i32 {
        self.read_u32_le(offset) as i32
    }

    fn read_i32_be(&self, offset: usize) -> i32 {
        self.read_u32_be(offset) as i32
    }

    fn read_f32_le(&self, offset: usize) -> f32 {
        f32::from_bits(self.read_u32_le(offset))
    }

    fn read_f32_be(&self, offset: usize) -> f32 {
        f32::from_bits(self.read_u32_be(offset))
    }

    fn read_f64_le(&self, offset: usize) -> f64 {
        let mut b = [0u8; 8];
        self.read_at(offset, &mut b);
        f64::from_le_bytes(b)
    }

    fn read_f64_be(&self, offset: usize) -> f64 {
        let mut b = [0u8; 8];
        self.read_at(offset, &mut b);
        f64::from_be_bytes(b)
    }

    fn write_u8(&mut self, value: u8, offset: usize) {
        self.write_at(offset, &[value]);
    }

    fn write_i8(&mut self, value: i8, offset: usize) {
        self.write_u8(value as u8, offset);
    }

    fn write_u16_le(&mut self, value: u16, offset: usize) {
        self.write_at(offset, &value.to_le_bytes());
    }

    fn write_u16_be(&mut self, value: u16, offset: usize) {
        self.write_at(offset, &value.to_be_bytes());
    }

    fn write_i16_le(&mut self, value: i16, offset: usize) {
        self.write_u16_le(value as u16, offset);
    }

    fn write_i16_be(&mut self, value: i16, offset: usize) {
        self.write_u16_be(value as u16, offset);
    }

    fn write_u32_le(&mut self, value: u32, offset: usize) {
        self.write_at(offset, &value.to_le_bytes());
    }

    fn write_u32_be(&mut self, value: u32, offset: usize) {
        self.write_at(offset, &value.to_be_bytes());
    }

    fn write_i32_le(&mut self, value: i32, offset: usize) {
        self.write_u32_le(value as u32, offset);
    }

    fn write_i32_be(&mut self, value: i32, offset: usize) {
        self.write_u32_be(value as u32, offset);
    }

    fn write_f32_le(&mut self, value: f32, offset: usize) {
        self.write_u32_le(value.to_bits(), offset);
    }

    fn write_f32_be(&mut self, value: f32, offset: usize) {
        self.write_u32_be(value.to_bits(), offset);
    }

    fn write_f64_le(&mut self, value: f64, offset: usize) {
        self.write_at(offset, &value.to_le_bytes());
    }

    fn write_f64_be(&mut self, value: f64, offset: usize) {
        self.write_at(offset, &value.to_be_bytes());
    }
}

impl<S: ByteStore + ?Sized> ByteStoreExt for S {}
