//! The layered byte buffer.
//!
//! A [`Buffer`] is a logical view (offset + length) over a shared raw
//! [`ByteStore`]. Views are cheap to clone and to slice; clones and slices
//! alias the same store and observe each other's writes. `slice_copy` is
//! the opt-in isolation point. All offsets in this API are relative to the
//! view and are bounds-checked here before translation to absolute store
//! offsets, so stores themselves stay unguarded.

use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::Bytes;
use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::encoding;
use crate::error::{BufResult, BufferError};
use crate::registry::{self, StoreProvider};
use crate::store::{ByteStore, ByteStoreExt};

#[derive(Clone)]
pub struct Buffer {
    store: Arc<RwLock<Box<dyn ByteStore>>>,
    offset: usize,
    len: usize,
}

impl Buffer {
    /// Zero-filled buffer of `len` bytes from the default store
    /// implementation.
    pub fn alloc(len: usize) -> Buffer {
        Buffer::from_store(registry::alloc_default(len))
    }

    /// Zero-filled buffer from an explicit store implementation.
    pub fn alloc_with(provider: &dyn StoreProvider, len: usize) -> Buffer {
        Buffer::from_store(provider.alloc(len))
    }

    /// Wraps an existing store, viewing all of it.
    pub fn from_store(store: Box<dyn ByteStore>) -> Buffer {
        let len = store.len();
        Buffer {
            store: Arc::new(RwLock::new(store)),
            offset: 0,
            len,
        }
    }

    /// Copies a byte slice into a fresh default store.
    pub fn from_slice(data: &[u8]) -> Buffer {
        let buf = Buffer::alloc(data.len());
        buf.write_guard().write_at(0, data);
        buf
    }

    /// Encodes `text` into a fresh buffer sized to the encoded length.
    pub fn from_text(text: &str, encoding: &str) -> BufResult<Buffer> {
        let codec = encoding::lookup(encoding)?;
        let bytes = codec.encode(text, usize::MAX)?;
        Ok(Buffer::from_slice(&bytes))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, Box<dyn ByteStore>> {
        self.store.read().expect("byte store lock poisoned")
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, Box<dyn ByteStore>> {
        self.store.write().expect("byte store lock poisoned")
    }

    fn check(&self, offset: usize, width: usize) -> BufResult<()> {
        match offset.checked_add(width) {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(BufferError::OutOfRange {
                offset,
                width,
                length: self.len,
            }),
        }
    }

    fn check_range(&self, start: usize, end: usize) -> BufResult<()> {
        if start > end {
            return Err(BufferError::StartAfterEnd { start, end });
        }
        if end > self.len {
            return Err(BufferError::OutOfRange {
                offset: start,
                width: end - start,
                length: self.len,
            });
        }
        Ok(())
    }

    /// Reads the byte at `index`.
    pub fn get(&self, index: usize) -> BufResult<u8> {
        self.check(index, 1)?;
        Ok(self.read_guard().read_u8(self.offset + index))
    }

    /// Sets the byte at `index`.
    pub fn set(&self, index: usize, value: u8) -> BufResult<()> {
        self.check(index, 1)?;
        self.write_guard().write_u8(value, self.offset + index);
        Ok(())
    }

    /// Copies the viewed bytes out into a `Vec`.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = vec![0; self.len];
        self.read_guard().read_at(self.offset, &mut out);
        out
    }

    /// Copies the viewed bytes out as `Bytes`.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(self.to_vec())
    }

    /// Reads an unsigned little-endian integer of `width` bytes (1-6).
    ///
    /// Widths past the native word are layered: a low 32-bit word through
    /// the store's 32-bit primitive plus an 8/16-bit high remainder,
    /// combined exactly in `u64`.
    pub fn read_uint_le(&self, offset: usize, width: usize) -> BufResult<u64> {
        check_width(width)?;
        self.check(offset, width)?;
        let abs = self.offset + offset;
        let store = self.read_guard();
        Ok(match width {
            1 => store.read_u8(abs) as u64,
            2 => store.read_u16_le(abs) as u64,
            3 => store.read_u8(abs) as u64 | (store.read_u16_le(abs + 1) as u64) << 8,
            4 => store.read_u32_le(abs) as u64,
            5 => store.read_u32_le(abs) as u64 | (store.read_u8(abs + 4) as u64) << 32,
            6 => store.read_u32_le(abs) as u64 | (store.read_u16_le(abs + 4) as u64) << 32,
            _ => unreachable!(),
        })
    }

    /// Reads an unsigned big-endian integer of `width` bytes (1-6).
    pub fn read_uint_be(&self, offset: usize, width: usize) -> BufResult<u64> {
        check_width(width)?;
        self.check(offset, width)?;
        let abs = self.offset + offset;
        let store = self.read_guard();
        Ok(match width {
            1 => store.read_u8(abs) as u64,
            2 => store.read_u16_be(abs) as u64,
            3 => (store.read_u16_be(abs) as u64) << 8 | store.read_u8(abs + 2) as u64,
            4 => store.read_u32_be(abs) as u64,
            5 => (store.read_u8(abs) as u64) << 32 | store.read_u32_be(abs + 1) as u64,
            6 => (store.read_u16_be(abs) as u64) << 32 | store.read_u32_be(abs + 2) as u64,
            _ => unreachable!(),
        })
    }

    /// Reads a signed little-endian integer of `width` bytes (1-6),
    /// sign-extending from the top bit of the requested width.
    pub fn read_int_le(&self, offset: usize, width: usize) -> BufResult<i64> {
        Ok(sign_extend(self.read_uint_le(offset, width)?, width))
    }

    /// Reads a signed big-endian integer of `width` bytes (1-6).
    pub fn read_int_be(&self, offset: usize, width: usize) -> BufResult<i64> {
        Ok(sign_extend(self.read_uint_be(offset, width)?, width))
    }

    /// Writes an unsigned little-endian integer of `width` bytes (1-6) and
    /// returns the offset just past it. Values wider than the target are
    /// masked to the width.
    pub fn write_uint_le(&self, value: u64, offset: usize, width: usize) -> BufResult<usize> {
        check_width(width)?;
        self.check(offset, width)?;
        let abs = self.offset + offset;
        let v = value & width_mask(width);
        let mut store = self.write_guard();
        match width {
            1 => store.write_u8(v as u8, abs),
            2 => store.write_u16_le(v as u16, abs),
            3 => {
                store.write_u8(v as u8, abs);
                store.write_u16_le((v >> 8) as u16, abs + 1);
            }
            4 => store.write_u32_le(v as u32, abs),
            5 => {
                store.write_u32_le(v as u32, abs);
                store.write_u8((v >> 32) as u8, abs + 4);
            }
            6 => {
                store.write_u32_le(v as u32, abs);
                store.write_u16_le((v >> 32) as u16, abs + 4);
            }
            _ => unreachable!(),
        }
        Ok(offset + width)
    }

    /// Writes an unsigned big-endian integer of `width` bytes (1-6).
    pub fn write_uint_be(&self, value: u64, offset: usize, width: usize) -> BufResult<usize> {
        check_width(width)?;
        self.check(offset, width)?;
        let abs = self.offset + offset;
        let v = value & width_mask(width);
        let mut store = self.write_guard();
        match width {
            1 => store.write_u8(v as u8, abs),
            2 => store.write_u16_be(v as u16, abs),
            3 => {
                store.write_u16_be((v >> 8) as u16, abs);
                store.write_u8(v as u8, abs + 2);
            }
            4 => store.write_u32_be(v as u32, abs),
            5 => {
                store.write_u8((v >> 32) as u8, abs);
                store.write_u32_be(v as u32, abs + 1);
            }
            6 => {
                store.write_u16_be((v >> 32) as u16, abs);
                store.write_u32_be(v as u32, abs + 2);
            }
            _ => unreachable!(),
        }
        Ok(offset + width)
    }

    /// Writes a signed little-endian integer of `width` bytes (1-6).
    pub fn write_int_le(&self, value: i64, offset: usize, width: usize) -> BufResult<usize> {
        self.write_uint_le(value as u64, offset, width)
    }

    /// Writes a signed big-endian integer of `width` bytes (1-6).
    pub fn write_int_be(&self, value: i64, offset: usize, width: usize) -> BufResult<usize> {
        self.write_uint_be(value as u64, offset, width)
    }

    pub fn read_u8(&self, offset: usize) -> BufResult<u8> {
        Ok(self.read_uint_le(offset, 1)? as u8)
    }

    pub fn read_i8(&self, offset: usize) -> BufResult<i8> {
        Ok(self.read_int_le(offset, 1)? as i8)
    }

    pub fn read_u16_le(&self, offset: usize) -> BufResult<u16> {
        Ok(self.read_uint_le(offset, 2)? as u16)
    }

    pub fn read_u16_be(&self, offset: usize) -> BufResult<u16> {
        Ok(self.read_uint_be(offset, 2)? as u16)
    }

    pub fn read_i16_le(&self, offset: usize) -> BufResult<i16> {
        Ok(self.read_int_le(offset, 2)? as i16)
    }

    pub fn read_i16_be(&self, offset: usize) -> BufResult<i16> {
        Ok(self.read_int_be(offset, 2)? as i16)
    }

    pub fn read_u32_le(&self, offset: usize) -> BufResult<u32> {
        Ok(self.read_uint_le(offset, 4)? as u32)
    }

    pub fn read_u32_be(&self, offset: usize) -> BufResult<u32> {
        Ok(self.read_uint_be(offset, 4)? as u32)
    }

    pub fn read_i32_le(&self, offset: usize) -> BufResult<i32> {
        Ok(self.read_int_le(offset, 4)? as i32)
    }

    pub fn read_i32_be(&self, offset: usize) -> BufResult<i32> {
        Ok(self.read_int_be(offset, 4)? as i32)
    }

    pub fn read_f32_le(&self, offset: usize) -> BufResult<f32> {
        self.check(offset, 4)?;
        Ok(self.read_guard().read_f32_le(self.offset + offset))
    }

    pub fn read_f32_be(&self, offset: usize) -> BufResult<f32> {
        self.check(offset, 4)?;
        Ok(self.read_guard().read_f32_be(self.offset + offset))
    }

    pub fn read_f64_le(&self, offset: usize) -> BufResult<f64> {
        self.check(offset, 8)?;
        Ok(self.read_guard().read_f64_le(self.offset + offset))
    }

    pub fn read_f64_be(&self, offset: usize) -> BufResult<f64> {
        self.check(offset, 8)?;
        Ok(self.read_guard().read_f64_be(self.offset + offset))
    }

    pub fn write_u8(&self, value: u8, offset: usize) -> BufResult<usize> {
        self.write_uint_le(value as u64, offset, 1)
    }

    pub fn write_i8(&self, value: i8, offset: usize) -> BufResult<usize> {
        self.write_int_le(value as i64, offset, 1)
    }

    pub fn write_u16_le(&self, value: u16, offset: usize) -> BufResult<usize> {
        self.write_uint_le(value as u64, offset, 2)
    }

    pub fn write_u16_be(&self, value: u16, offset: usize) -> BufResult<usize> {
        self.write_uint_be(value as u64, offset, 2)
    }

    pub fn write_i16_le(&self, value: i16, offset: usize) -> BufResult<usize> {
        self.write_int_le(value as i64, offset, 2)
    }

    pub fn write_i16_be(&self, value: i16, offset: usize) -> BufResult<usize> {
        self.write_int_be(value as i64, offset, 2)
    }

    pub fn write_u32_le(&self, value: u32, offset: usize) -> BufResult<usize> {
        self.write_uint_le(value as u64, offset, 4)
    }

    pub fn write_u32_be(&self, value: u32, offset: usize) -> BufResult<usize> {
        self.write_uint_be(value as u64, offset, 4)
    }

    pub fn write_i32_le(&self, value: i32, offset: usize) -> BufResult<usize> {
        self.write_int_le(value as i64, offset, 4)
    }

    pub fn write_i32_be(&self, value: i32, offset: usize) -> BufResult<usize> {
        self.write_int_be(value as i64, offset, 4)
    }

    pub fn write_f32_le(&self, value: f32, offset: usize) -> BufResult<usize> {
        self.check(offset, 4)?;
        self.write_guard().write_f32_le(value, self.offset + offset);
        Ok(offset + 4)
    }

    pub fn write_f32_be(&self, value: f32, offset: usize) -> BufResult<usize> {
        self.check(offset, 4)?;
        self.write_guard().write_f32_be(value, self.offset + offset);
        Ok(offset + 4)
    }

    pub fn write_f64_le(&self, value: f64, offset: usize) -> BufResult<usize> {
        self.check(offset, 8)?;
        self.write_guard().write_f64_le(value, self.offset + offset);
        Ok(offset + 8)
    }

    pub fn write_f64_be(&self, value: f64, offset: usize) -> BufResult<usize> {
        self.check(offset, 8)?;
        self.write_guard().write_f64_be(value, self.offset + offset);
        Ok(offset + 8)
    }

    fn normalize_range(&self, start: isize, end: isize) -> (usize, usize) {
        let len = self.len as isize;
        let s = if start < 0 {
            (len + start).max(0)
        } else {
            start.min(len)
        };
        let e = if end < 0 { (len + end).max(0) } else { end.min(len) };
        // A start beyond the end clamps down to it, yielding an empty range.
        (s.min(e) as usize, e as usize)
    }

    /// A new view over the same store restricted to `[start, end)`.
    /// Negative indices count from the end; out-of-range bounds clamp, and
    /// a start beyond the end clamps down to it. A normalized start at or
    /// past the view's length errors, so any slice of an empty buffer
    /// errors.
    pub fn slice(&self, start: isize, end: isize) -> BufResult<Buffer> {
        let (s, e) = self.normalize_range(start, end);
        if s >= self.len {
            return Err(BufferError::InvalidStart {
                start: s,
                length: self.len,
            });
        }
        Ok(Buffer {
            store: Arc::clone(&self.store),
            offset: self.offset + s,
            len: e - s,
        })
    }

    /// Like [`Buffer::slice`] but materializes an independently-owned copy
    /// of the range, isolating the caller from later mutation of this view.
    pub fn slice_copy(&self, start: isize, end: isize) -> BufResult<Buffer> {
        let (s, e) = self.normalize_range(start, end);
        if s >= self.len {
            return Err(BufferError::InvalidStart {
                start: s,
                length: self.len,
            });
        }
        let store = self
            .read_guard()
            .copy_range(self.offset + s, self.offset + e);
        Ok(Buffer::from_store(store))
    }

    /// Copies bytes into `target` and returns the number moved:
    /// `min(source_end - source_start, target.len() - target_start,
    /// self.len() - source_start)`, saturating at zero. Never errors on a
    /// size mismatch. Safe when `target` aliases this buffer's store over
    /// an overlapping range (the overlap goes through a temporary).
    pub fn copy_to(
        &self,
        target: &Buffer,
        target_start: usize,
        source_start: usize,
        source_end: usize,
    ) -> usize {
        if source_start >= self.len || target_start >= target.len {
            return 0;
        }
        let n = source_end
            .min(self.len)
            .saturating_sub(source_start)
            .min(target.len - target_start);
        if n == 0 {
            return 0;
        }
        let src_abs = self.offset + source_start;
        let dst_abs = target.offset + target_start;
        if Arc::ptr_eq(&self.store, &target.store) {
            let mut tmp = vec![0; n];
            self.read_guard().read_at(src_abs, &mut tmp);
            target.write_guard().write_at(dst_abs, &tmp);
        } else {
            let src = self.read_guard();
            let mut dst = target.write_guard();
            move_bytes(&**src, src_abs, &mut **dst, dst_abs, n);
        }
        n
    }

    /// Fills `[offset, end)` with a byte value.
    pub fn fill(&self, value: u8, offset: usize, end: usize) -> BufResult<()> {
        self.check_range(offset, end)?;
        self.write_guard()
            .fill(value, self.offset + offset, self.offset + end);
        Ok(())
    }

    /// String fill. A one-char string whose code point fits a byte degrades
    /// to the numeric fill; longer patterns repeat their encoded bytes and
    /// end with a partial repetition when the span is not a multiple of the
    /// pattern length.
    pub fn fill_str(
        &self,
        text: &str,
        encoding: &str,
        offset: usize,
        end: usize,
    ) -> BufResult<()> {
        self.check_range(offset, end)?;
        let mut chars = text.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if (c as u32) < 256 {
                return self.fill(c as u32 as u8, offset, end);
            }
        }
        let codec = encoding::lookup(encoding)?;
        let pattern = codec.encode(text, usize::MAX)?;
        if pattern.is_empty() {
            return Ok(());
        }
        let mut store = self.write_guard();
        let mut pos = offset;
        while pos < end {
            let n = (end - pos).min(pattern.len());
            store.write_at(self.offset + pos, &pattern[..n]);
            pos += n;
        }
        Ok(())
    }

    /// Encodes `text` at `offset`, writing at most `max_len` bytes and
    /// never more than the space remaining; returns the byte count written.
    /// A string longer than the space writes only the prefix that fits,
    /// without error and without splitting a character.
    pub fn write_str(
        &self,
        text: &str,
        offset: usize,
        max_len: usize,
        encoding: &str,
    ) -> BufResult<usize> {
        let codec = encoding::lookup(encoding)?;
        if offset > self.len {
            return Err(BufferError::InvalidStart {
                start: offset,
                length: self.len,
            });
        }
        let budget = max_len.min(self.len - offset);
        let bytes = codec.encode(text, budget)?;
        self.write_guard().write_at(self.offset + offset, &bytes);
        Ok(bytes.len())
    }

    /// Decodes `[start, end)` as text. Out-of-range bounds clamp to the
    /// buffer's extent; a start past the end is an error.
    pub fn to_text(&self, encoding: &str, start: usize, end: usize) -> BufResult<String> {
        let codec = encoding::lookup(encoding)?;
        if start > end {
            return Err(BufferError::StartAfterEnd { start, end });
        }
        let end = end.min(self.len);
        let start = start.min(end);
        let mut bytes = vec![0; end - start];
        self.read_guard().read_at(self.offset + start, &mut bytes);
        codec.decode(&bytes)
    }

    /// Finds the first occurrence of `needle` at or after `from` (negative
    /// counts from the end).
    ///
    /// This is the naive streaming scan: on mismatch the needle pointer
    /// restarts at zero without rewinding the haystack, so a match that
    /// overlaps a partial match can be missed. Kept bug-for-bug.
    pub fn index_of(&self, needle: &Buffer, from: isize) -> Option<usize> {
        self.scan(&needle.to_vec(), from)
    }

    /// [`Buffer::index_of`] for a single byte.
    pub fn index_of_byte(&self, byte: u8, from: isize) -> Option<usize> {
        self.scan(&[byte], from)
    }

    /// [`Buffer::index_of`] for text under an encoding.
    pub fn index_of_str(&self, text: &str, encoding: &str, from: isize) -> BufResult<Option<usize>> {
        let codec = encoding::lookup(encoding)?;
        let needle = codec.encode(text, usize::MAX)?;
        Ok(self.scan(&needle, from))
    }

    fn scan(&self, needle: &[u8], from: isize) -> Option<usize> {
        let len = self.len as isize;
        let start = if from < 0 { (len + from).max(0) } else { from } as usize;
        let hay = self.to_vec();
        if needle.is_empty() {
            return if start <= hay.len() { Some(start) } else { None };
        }
        let mut i = start;
        let mut j = 0;
        while i < hay.len() {
            if hay[i] == needle[j] {
                j += 1;
                if j == needle.len() {
                    return Some(i + 1 - needle.len());
                }
            } else {
                j = 0;
            }
            i += 1;
        }
        None
    }

    /// Concatenates buffers. An empty list or an explicit zero total yields
    /// an empty buffer; a single-element list with no conflicting
    /// `total_length` returns that element's view unchanged (aliasing
    /// preserved). With `total_length` given, output is exactly that long:
    /// short inputs leave a zero tail, long inputs are cut off.
    pub fn concat(list: &[Buffer], total_length: Option<usize>) -> Buffer {
        if list.is_empty() || total_length == Some(0) {
            return Buffer::alloc(0);
        }
        if list.len() == 1 && total_length.map_or(true, |t| t == list[0].len()) {
            return list[0].clone();
        }
        let total = total_length.unwrap_or_else(|| list.iter().map(|b| b.len()).sum());
        let out = Buffer::alloc(total);
        let mut at = 0;
        for item in list {
            if at >= total {
                break;
            }
            at += item.copy_to(&out, at, 0, item.len());
        }
        out
    }

    /// Content equality.
    pub fn equals(&self, other: &Buffer) -> bool {
        self.len == other.len && self.to_vec() == other.to_vec()
    }

    /// Lexicographic comparison; a shorter buffer that is a prefix of the
    /// other orders first.
    pub fn compare(&self, other: &Buffer) -> Ordering {
        self.to_vec().cmp(&other.to_vec())
    }

    /// Bytes `text` would occupy under `encoding`.
    pub fn byte_length(text: &str, encoding: &str) -> BufResult<usize> {
        Ok(encoding::lookup(encoding)?.byte_length(text))
    }

    /// Whether `name` names a known string encoding.
    pub fn is_encoding(name: &str) -> bool {
        encoding::is_encoding(name)
    }
}

fn check_width(width: usize) -> BufResult<()> {
    if (1..=6).contains(&width) {
        Ok(())
    } else {
        Err(BufferError::UnsupportedWidth(width))
    }
}

fn width_mask(width: usize) -> u64 {
    (1u64 << (width * 8)) - 1
}

fn sign_extend(raw: u64, width: usize) -> i64 {
    let bits = width * 8;
    let sign = 1u64 << (bits - 1);
    if raw & sign != 0 {
        (raw | !((1u64 << bits) - 1)) as i64
    } else {
        raw as i64
    }
}

// 4-byte chunks plus a byte-wise tail, for distinct stores.
fn move_bytes(src: &dyn ByteStore, src_at: usize, dst: &mut dyn ByteStore, dst_at: usize, n: usize) {
    let words = n / 4;
    for i in 0..words {
        dst.write_u32_le(src.read_u32_le(src_at + i * 4), dst_at + i * 4);
    }
    for i in words * 4..n {
        dst.write_u8(src.read_u8(src_at + i), dst_at + i);
    }
}

impl PartialEq for Buffer {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl Eq for Buffer {}

impl From<&[u8]> for Buffer {
    fn from(data: &[u8]) -> Buffer {
        Buffer::from_slice(data)
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(data: Vec<u8>) -> Buffer {
        Buffer::from_slice(&data)
    }
}

impl From<Bytes> for Buffer {
    fn from(data: Bytes) -> Buffer {
        Buffer::from_slice(&data)
    }
}

impl Serialize for Buffer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Buffer", 2)?;
        s.serialize_field("type", "Buffer")?;
        s.serialize_field("data", &self.to_vec())?;
        s.end()
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Buffer")?;
        let shown = self.len.min(50);
        let mut bytes = vec![0; shown];
        self.read_guard().read_at(self.offset, &mut bytes);
        for b in &bytes {
            write!(f, " {b:02x}")?;
        }
        if self.len > shown {
            write!(f, " ...")?;
        }
        write!(f, ">")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uint_round_trips_all_widths_both_endians() {
        let buf = Buffer::alloc(16);
        let samples: [(usize, u64); 6] = [
            (1, 0xAB),
            (2, 0xBEEF),
            (3, 0xC0FFEE),
            (4, 0xDEAD_BEEF),
            (5, 0x0BAD_C0FF_EE),
            (6, 0xFEED_FACE_CAFE),
        ];
        for (width, value) in samples {
            assert_eq!(buf.write_uint_le(value, 2, width).unwrap(), 2 + width);
            assert_eq!(buf.read_uint_le(2, width).unwrap(), value);
            assert_eq!(buf.write_uint_be(value, 2, width).unwrap(), 2 + width);
            assert_eq!(buf.read_uint_be(2, width).unwrap(), value);
        }
    }

    #[test]
    fn int_round_trips_with_sign_extension() {
        let buf = Buffer::alloc(16);
        for width in 1..=6usize {
            let min = -(1i64 << (width * 8 - 1));
            let max = (1i64 << (width * 8 - 1)) - 1;
            for value in [min, -1, 0, 1, max] {
                buf.write_int_le(value, 0, width).unwrap();
                assert_eq!(buf.read_int_le(0, width).unwrap(), value, "le w{width}");
                buf.write_int_be(value, 0, width).unwrap();
                assert_eq!(buf.read_int_be(0, width).unwrap(), value, "be w{width}");
            }
        }
    }

    #[test]
    fn five_byte_layering_matches_manual_composition() {
        let buf = Buffer::alloc(8);
        buf.write_uint_le(0x01_2345_6789, 0, 5).unwrap();
        // Low 32-bit word first, high byte after it.
        assert_eq!(buf.read_u32_le(0).unwrap(), 0x2345_6789);
        assert_eq!(buf.read_u8(4).unwrap(), 0x01);
        buf.write_uint_be(0x01_2345_6789, 0, 5).unwrap();
        assert_eq!(buf.read_u8(0).unwrap(), 0x01);
        assert_eq!(buf.read_u32_be(1).unwrap(), 0x2345_6789);
    }

    #[test]
    fn oversized_values_mask_to_width() {
        let buf = Buffer::alloc(8);
        buf.write_uint_le(0x1_FF, 0, 1).unwrap();
        assert_eq!(buf.read_u8(0).unwrap(), 0xFF);
        buf.write_uint_be(0xABCD_1234_5678, 0, 4).unwrap();
        assert_eq!(buf.read_u32_be(0).unwrap(), 0x1234_5678);
    }

    #[test]
    fn floats_round_trip() {
        let buf = Buffer::alloc(16);
        buf.write_f32_le(1.25, 0).unwrap();
        assert_eq!(buf.read_f32_le(0).unwrap(), 1.25);
        buf.write_f32_be(-0.5, 4).unwrap();
        assert_eq!(buf.read_f32_be(4).unwrap(), -0.5);
        buf.write_f64_le(std::f64::consts::PI, 8).unwrap();
        assert_eq!(buf.read_f64_le(8).unwrap(), std::f64::consts::PI);
        buf.write_f64_be(-1e300, 8).unwrap();
        assert_eq!(buf.read_f64_be(8).unwrap(), -1e300);
    }

    #[test]
    fn out_of_range_and_bad_width_error() {
        let buf = Buffer::alloc(4);
        assert!(matches!(
            buf.read_u32_le(1),
            Err(BufferError::OutOfRange { offset: 1, width: 4, length: 4 })
        ));
        assert!(matches!(
            buf.read_uint_le(0, 7),
            Err(BufferError::UnsupportedWidth(7))
        ));
        assert!(matches!(
            buf.write_uint_be(1, 0, 0),
            Err(BufferError::UnsupportedWidth(0))
        ));
    }

    #[test]
    fn slice_aliases_the_store() {
        let buf = Buffer::from_slice(&[1, 2, 3, 4, 5, 6]);
        let view = buf.slice(2, 5).unwrap();
        assert_eq!(view.len(), 3);
        assert_eq!(view.to_vec(), vec![3, 4, 5]);
        view.write_u8(0xEE, 0).unwrap();
        assert_eq!(buf.read_u8(2).unwrap(), 0xEE);
        buf.write_u8(0x11, 4).unwrap();
        assert_eq!(view.read_u8(2).unwrap(), 0x11);
    }

    #[test]
    fn slice_negative_indices_and_clamping() {
        let buf = Buffer::from_slice(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(buf.slice(-3, -1).unwrap().to_vec(), vec![4, 5]);
        assert_eq!(buf.slice(0, 100).unwrap().to_vec(), buf.to_vec());
        assert_eq!(buf.slice(-100, 2).unwrap().to_vec(), vec![1, 2]);
        // End before start collapses to empty.
        assert_eq!(buf.slice(4, 2).unwrap().len(), 0);
    }

    #[test]
    fn slice_start_clamps_down_to_end() {
        // A start clamped to the length still slices (empty) when the end
        // lies inside the buffer.
        let buf = Buffer::from_slice(&[1, 2, 3]);
        assert_eq!(buf.slice(3, 1).unwrap().len(), 0);
        assert_eq!(buf.slice_copy(3, 1).unwrap().len(), 0);
        // With the end at the length too, it is an error.
        assert!(buf.slice(3, 3).is_err());
    }

    #[test]
    fn slice_start_at_or_past_length_errors() {
        let buf = Buffer::from_slice(&[1, 2, 3]);
        assert!(matches!(
            buf.slice(3, 3),
            Err(BufferError::InvalidStart { start: 3, length: 3 })
        ));
        assert!(buf.slice(5, 7).is_err());
        let empty = Buffer::alloc(0);
        assert!(empty.slice(0, 0).is_err());
    }

    #[test]
    fn slice_copy_is_isolated() {
        let buf = Buffer::from_slice(&[1, 2, 3, 4]);
        let copy = buf.slice_copy(1, 3).unwrap();
        assert_eq!(copy.to_vec(), vec![2, 3]);
        copy.write_u8(0xAA, 0).unwrap();
        assert_eq!(buf.read_u8(1).unwrap(), 2);
        buf.write_u8(0xBB, 2).unwrap();
        assert_eq!(copy.read_u8(1).unwrap(), 3);
    }

    #[test]
    fn copy_clamps_all_three_extents() {
        let src = Buffer::from_slice(&[1, 2, 3, 4, 5]);
        let dst = Buffer::alloc(3);
        assert_eq!(src.copy_to(&dst, 0, 0, 5), 3);
        assert_eq!(dst.to_vec(), vec![1, 2, 3]);
        assert_eq!(src.copy_to(&dst, 2, 3, 100), 1);
        assert_eq!(dst.to_vec(), vec![1, 2, 4]);
        assert_eq!(src.copy_to(&dst, 3, 0, 5), 0);
        assert_eq!(src.copy_to(&dst, 0, 5, 5), 0);
    }

    #[test]
    fn overlapping_copy_through_aliased_views_is_safe() {
        let buf = Buffer::from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let src = buf.slice(0, 6).unwrap();
        let dst = buf.slice(2, 8).unwrap();
        // Forward overlap: a naive in-place loop would smear 1,2 down the
        // whole range.
        assert_eq!(src.copy_to(&dst, 0, 0, 6), 6);
        assert_eq!(buf.to_vec(), vec![1, 2, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn fill_numeric_and_bounds() {
        let buf = Buffer::alloc(8);
        buf.fill(0x5A, 2, 6).unwrap();
        assert_eq!(buf.to_vec(), vec![0, 0, 0x5A, 0x5A, 0x5A, 0x5A, 0, 0]);
        assert!(matches!(
            buf.fill(1, 5, 3),
            Err(BufferError::StartAfterEnd { start: 5, end: 3 })
        ));
        assert!(buf.fill(1, 0, 9).is_err());
    }

    #[test]
    fn fill_str_single_char_degrades_to_numeric() {
        let buf = Buffer::alloc(4);
        buf.fill_str("a", "utf8", 0, 4).unwrap();
        assert_eq!(buf.to_vec(), vec![b'a'; 4]);
    }

    #[test]
    fn fill_str_repeats_pattern_with_partial_tail() {
        let buf = Buffer::alloc(8);
        buf.fill_str("abc", "utf8", 0, 8).unwrap();
        assert_eq!(buf.to_vec(), b"abcabcab".to_vec());
        // A wide char repeats its encoded bytes.
        let wide = Buffer::alloc(5);
        wide.fill_str("é", "utf8", 0, 5).unwrap();
        assert_eq!(wide.to_vec(), vec![0xC3, 0xA9, 0xC3, 0xA9, 0xC3]);
    }

    #[test]
    fn write_str_truncates_to_fit() {
        let buf = Buffer::alloc(4);
        let n = buf.write_str("hello", 0, usize::MAX, "utf8").unwrap();
        assert_eq!(n, 4);
        assert_eq!(buf.to_vec(), b"hell".to_vec());
        // Explicit max_len below the space wins.
        let n = buf.write_str("xyz", 0, 2, "utf8").unwrap();
        assert_eq!(n, 2);
        assert_eq!(buf.to_vec(), b"xyll".to_vec());
        // Offset exactly at the end writes nothing; past it errors.
        assert_eq!(buf.write_str("a", 4, 1, "utf8").unwrap(), 0);
        assert!(buf.write_str("a", 5, 1, "utf8").is_err());
    }

    #[test]
    fn to_text_clamps_and_validates() {
        let buf = Buffer::from_slice(b"hello");
        assert_eq!(buf.to_text("utf8", 0, 5).unwrap(), "hello");
        assert_eq!(buf.to_text("utf8", 1, 100).unwrap(), "ello");
        assert!(matches!(
            buf.to_text("utf8", 3, 1),
            Err(BufferError::StartAfterEnd { start: 3, end: 1 })
        ));
        assert!(matches!(
            buf.to_text("no-such", 0, 5),
            Err(BufferError::UnknownEncoding(_))
        ));
    }

    #[test]
    fn text_round_trips_through_encodings() {
        for enc in ["utf8", "ascii", "latin1", "ucs2"] {
            let buf = Buffer::from_text("portable", enc).unwrap();
            assert_eq!(buf.to_text(enc, 0, buf.len()).unwrap(), "portable", "{enc}");
        }
        let hex = Buffer::from_text("00ff10", "hex").unwrap();
        assert_eq!(hex.to_vec(), vec![0x00, 0xFF, 0x10]);
        assert_eq!(hex.to_text("hex", 0, 3).unwrap(), "00ff10");
    }

    #[test]
    fn index_of_finds_after_failed_prefix() {
        let buf = Buffer::from_slice(b"abcabd");
        let needle = Buffer::from_slice(b"abd");
        assert_eq!(buf.index_of(&needle, 0), Some(3));
        assert_eq!(buf.index_of_byte(b'c', 0), Some(2));
        assert_eq!(buf.index_of_byte(b'z', 0), None);
        assert_eq!(buf.index_of_str("bd", "utf8", 0).unwrap(), Some(4));
    }

    #[test]
    fn index_of_keeps_the_naive_restart_miss() {
        // The scan never rewinds the haystack after a partial match, so the
        // occurrence starting inside the failed prefix is not found.
        let buf = Buffer::from_slice(b"aaab");
        let needle = Buffer::from_slice(b"aab");
        assert_eq!(buf.index_of(&needle, 0), None);
    }

    #[test]
    fn index_of_negative_offset_counts_from_end() {
        let buf = Buffer::from_slice(b"abcabc");
        assert_eq!(buf.index_of_byte(b'a', -3), Some(3));
        assert_eq!(buf.index_of_byte(b'a', -100), Some(0));
        assert_eq!(buf.index_of_byte(b'a', 4), None);
    }

    #[test]
    fn concat_layout_and_edge_cases() {
        let a = Buffer::from_slice(&[1, 2]);
        let b = Buffer::from_slice(&[3, 4, 5]);
        let joined = Buffer::concat(&[a.clone(), b.clone()], None);
        assert_eq!(joined.len(), 5);
        assert_eq!(joined.to_vec(), vec![1, 2, 3, 4, 5]);
        assert_eq!(Buffer::concat(&[], None).len(), 0);
        assert_eq!(Buffer::concat(&[a.clone(), b.clone()], Some(0)).len(), 0);
        // Explicit total pads with zeros or cuts off.
        assert_eq!(
            Buffer::concat(&[a.clone(), b.clone()], Some(7)).to_vec(),
            vec![1, 2, 3, 4, 5, 0, 0]
        );
        assert_eq!(
            Buffer::concat(&[a.clone(), b], Some(3)).to_vec(),
            vec![1, 2, 3]
        );
        // Single element comes back as the same view.
        let single = Buffer::concat(&[a.clone()], None);
        single.write_u8(9, 0).unwrap();
        assert_eq!(a.read_u8(0).unwrap(), 9);
    }

    #[test]
    fn concat_single_element_honors_explicit_total() {
        let two = Buffer::from_slice(b"ab");
        let padded = Buffer::concat(&[two.clone()], Some(5));
        assert_eq!(padded.to_vec(), vec![b'a', b'b', 0, 0, 0]);
        // The padded result is a copy, not a view of the input.
        padded.write_u8(b'z', 0).unwrap();
        assert_eq!(two.read_u8(0).unwrap(), b'a');

        let cut = Buffer::concat(&[two], Some(1));
        assert_eq!(cut.to_vec(), vec![b'a']);
    }

    #[test]
    fn equality_and_comparison() {
        let a = Buffer::from_slice(&[1, 2, 3]);
        let b = Buffer::from_slice(&[1, 2, 3]);
        let c = Buffer::from_slice(&[1, 2]);
        let d = Buffer::from_slice(&[1, 2, 4]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.compare(&b), Ordering::Equal);
        assert_eq!(c.compare(&a), Ordering::Less);
        assert_eq!(d.compare(&a), Ordering::Greater);
    }

    #[test]
    fn get_set_and_bounds() {
        let buf = Buffer::from_slice(&[10, 20]);
        assert_eq!(buf.get(1).unwrap(), 20);
        buf.set(0, 99).unwrap();
        assert_eq!(buf.get(0).unwrap(), 99);
        assert!(buf.get(2).is_err());
        assert!(buf.set(2, 0).is_err());
    }

    #[test]
    fn serializes_to_the_tagged_json_shape() {
        let buf = Buffer::from_slice(&[1, 2, 255]);
        let value = serde_json::to_value(&buf).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "type": "Buffer", "data": [1, 2, 255] })
        );
    }

    #[test]
    fn debug_renders_hex_capped_at_fifty_bytes() {
        let buf = Buffer::from_slice(&[0x0A, 0xFF]);
        assert_eq!(format!("{buf:?}"), "<Buffer 0a ff>");
        let long = Buffer::alloc(60);
        let rendered = format!("{long:?}");
        assert!(rendered.ends_with("00 ...>"));
        assert_eq!(rendered.matches("00").count(), 50);
    }

    #[test]
    fn byte_length_and_is_encoding() {
        assert_eq!(Buffer::byte_length("abc", "utf8").unwrap(), 3);
        assert_eq!(Buffer::byte_length("abcd", "hex").unwrap(), 2);
        assert!(Buffer::is_encoding("base64"));
        assert!(!Buffer::is_encoding("utf1024"));
        assert!(Buffer::byte_length("x", "utf1024").is_err());
    }
}
