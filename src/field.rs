//! Cursor-based field decoder over a replicated buffer.
//!
//! A [`FieldReader`] borrows the bytes fetched for one decode step together
//! with the file offset of their first byte.  Its cursor is a *file* offset,
//! so decoders address fields exactly as they are laid out on disk and the
//! reader translates to buffer indices.  Every read advances the cursor by
//! the field's on-disk width and fails with `DecodeBounds` instead of reading
//! past the buffer.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Result, SdfError};

/// Byte order of every multi-byte field in a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

macro_rules! read_ordered {
    ($self:ident, $width:expr, $read:ident) => {{
        let bytes = $self.take($width)?;
        match $self.endian {
            Endianness::Little => LittleEndian::$read(bytes),
            Endianness::Big    => BigEndian::$read(bytes),
        }
    }};
}

pub struct FieldReader<'a> {
    buf:           &'a [u8],
    start:         u64,
    pos:           u64,
    endian:        Endianness,
    id_length:     usize,
    string_length: usize,
}

impl<'a> FieldReader<'a> {
    /// `start` is the file offset of `buf[0]`; the cursor begins there.
    pub fn new(buf: &'a [u8], start: u64, endian: Endianness) -> Self {
        Self {
            buf,
            start,
            pos: start,
            endian,
            id_length: 0,
            string_length: 0,
        }
    }

    pub fn with_lengths(mut self, id_length: usize, string_length: usize) -> Self {
        self.id_length = id_length;
        self.string_length = string_length;
        self
    }

    pub fn set_endian(&mut self, endian: Endianness) { self.endian = endian; }
    pub fn set_string_length(&mut self, len: usize) { self.string_length = len; }

    /// Current logical file offset.
    #[inline]
    pub fn position(&self) -> u64 { self.pos }

    /// Move the cursor to an absolute file offset.  Bounds are checked on
    /// the next read, not here.
    #[inline]
    pub fn seek(&mut self, pos: u64) { self.pos = pos; }

    /// File offset one past the last buffered byte.
    pub fn end(&self) -> u64 { self.start + self.buf.len() as u64 }

    fn take(&mut self, width: usize) -> Result<&'a [u8]> {
        let buf: &'a [u8] = self.buf;
        let out_of_bounds = || SdfError::DecodeBounds {
            offset: self.pos,
            width:  width as u64,
            start:  self.start,
            end:    self.end(),
        };
        let lo = self.pos.checked_sub(self.start).ok_or_else(out_of_bounds)?;
        let lo = usize::try_from(lo).map_err(|_| out_of_bounds())?;
        let hi = lo.checked_add(width).ok_or_else(out_of_bounds)?;
        let bytes = buf.get(lo..hi).ok_or_else(out_of_bounds)?;
        self.pos += width as u64;
        Ok(bytes)
    }

    // ── Scalars ──────────────────────────────────────────────────────────────

    pub fn read_i4(&mut self) -> Result<i32> {
        Ok(read_ordered!(self, 4, read_i32))
    }

    pub fn read_i8(&mut self) -> Result<i64> {
        Ok(read_ordered!(self, 8, read_i64))
    }

    pub fn read_f4(&mut self) -> Result<f32> {
        Ok(read_ordered!(self, 4, read_f32))
    }

    pub fn read_f8(&mut self) -> Result<f64> {
        Ok(read_ordered!(self, 8, read_f64))
    }

    pub fn read_u1(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_logical(&mut self) -> Result<bool> {
        Ok(self.read_u1()? != 0)
    }

    /// Type-tag enumerant, stored as a 4-byte integer.
    pub fn read_tag(&mut self) -> Result<i32> {
        self.read_i4()
    }

    /// An int8 offset or length that must not be negative.
    pub fn read_offset(&mut self, field: &'static str) -> Result<u64> {
        let value = self.read_i8()?;
        u64::try_from(value).map_err(|_| SdfError::NegativeField { field, value })
    }

    /// An int4 size or count that must not be negative.
    pub fn read_count(&mut self, field: &'static str) -> Result<u32> {
        let value = self.read_i4()?;
        u32::try_from(value).map_err(|_| SdfError::NegativeField { field, value: value.into() })
    }

    // ── Text ─────────────────────────────────────────────────────────────────

    fn read_text(&mut self, width: usize) -> Result<String> {
        let bytes = self.take(width)?;
        let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        let text = String::from_utf8_lossy(&bytes[..len]).into_owned();
        trace!(width, %text, "text field");
        Ok(text)
    }

    /// Fixed-length identifier (NUL padded).
    pub fn read_id(&mut self) -> Result<String> {
        self.read_text(self.id_length)
    }

    /// Fixed-length human-readable string (NUL padded).
    pub fn read_string(&mut self) -> Result<String> {
        self.read_text(self.string_length)
    }

    /// `n` consecutive identifiers with no separator.
    pub fn read_id_array(&mut self, n: usize) -> Result<Vec<String>> {
        self.read_text_array(n, self.id_length, "id_length")
    }

    /// `n` consecutive strings with no separator.
    pub fn read_string_array(&mut self, n: usize) -> Result<Vec<String>> {
        self.read_text_array(n, self.string_length, "string_length")
    }

    /// The whole array must fit in the buffer before anything is allocated;
    /// `n` comes straight from the file.
    fn read_text_array(&mut self, n: usize, width: usize, field: &'static str) -> Result<Vec<String>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        if width == 0 {
            return Err(SdfError::ZeroWidth(field));
        }
        let total = (n as u64).saturating_mul(width as u64);
        if self.pos < self.start || total > self.end().saturating_sub(self.pos) {
            return Err(SdfError::DecodeBounds { offset: self.pos, width: total, start: self.start, end: self.end() });
        }
        (0..n).map(|_| self.read_text(width)).collect()
    }
}
