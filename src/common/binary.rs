//! Little-endian binary primitives shared by every codec in the crate.
//!
//! [`ByteCursor`] is a bounded reader over an in-memory buffer. Besides plain
//! sequential reads it offers a `mark`/`reset` pair, a logical `limit` that
//! keeps one malformed length field from reading into the next structure, and
//! [`ByteCursor::speculate`] for commit-or-rewind reads.
//!
//! Writers append to a `Vec<u8>` through [`bytes::BufMut`]; the helpers at the
//! bottom of this module cover the padding rules used by property sets.

use bytes::BufMut;
use thiserror::Error;
use zerocopy::{F32, F64, FromBytes, I16, I32, I64, LE, U16, U32, U64};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BinaryError {
    #[error("Insufficient data: expected {expected}, got {available}")]
    InsufficientData { expected: usize, available: usize },

    #[error("Position {position} is outside of the buffer (length {length})")]
    OutOfRange { position: usize, length: usize },

    #[error("Parse error: {0}")]
    ParseError(String),
}

pub type BinaryResult<T> = Result<T, BinaryError>;

/// Outcome of [`ByteCursor::align_zero_padding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padding {
    /// The cursor now sits on the requested boundary.
    Aligned { skipped: usize },
    /// A non-zero byte was found before the boundary. It was left unread.
    Interrupted { skipped: usize, offset: usize },
}

#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    limit: usize,
    mark: usize,
}

macro_rules! read_le {
    ($name:ident, $peek:ident, $ty:ty, $zc:ty, $n:expr) => {
        #[inline]
        pub fn $name(&mut self) -> BinaryResult<$ty> {
            let bytes = self.take($n)?;
            <$zc>::read_from_bytes(bytes)
                .map(|v| v.get())
                .map_err(|_| BinaryError::ParseError(concat!("Failed to read ", stringify!($ty)).to_string()))
        }

        #[inline]
        pub fn $peek(&self) -> BinaryResult<$ty> {
            let bytes = self.peek($n)?;
            <$zc>::read_from_bytes(bytes)
                .map(|v| v.get())
                .map_err(|_| BinaryError::ParseError(concat!("Failed to read ", stringify!($ty)).to_string()))
        }
    };
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            limit: data.len(),
            mark: 0,
        }
    }

    /// Create a cursor positioned at `offset`.
    pub fn at(data: &'a [u8], offset: usize) -> BinaryResult<Self> {
        let mut cursor = Self::new(data);
        cursor.set_position(offset)?;
        Ok(cursor)
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn set_position(&mut self, pos: usize) -> BinaryResult<()> {
        if pos > self.limit {
            return Err(BinaryError::OutOfRange {
                position: pos,
                length: self.limit,
            });
        }
        self.pos = pos;
        Ok(())
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.pos)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Restrict reads to `[.., limit)` and return the previous limit so the
    /// caller can restore it with [`ByteCursor::restore_limit`].
    pub fn set_limit(&mut self, limit: usize) -> BinaryResult<usize> {
        if limit > self.data.len() || limit < self.pos {
            return Err(BinaryError::OutOfRange {
                position: limit,
                length: self.data.len(),
            });
        }
        let previous = self.limit;
        self.limit = limit;
        Ok(previous)
    }

    pub fn restore_limit(&mut self, previous: usize) {
        self.limit = previous.min(self.data.len());
        if self.pos > self.limit {
            self.pos = self.limit;
        }
    }

    /// Run `f` with reads bounded to the next `len` bytes.
    pub fn with_limit<T>(
        &mut self,
        len: usize,
        f: impl FnOnce(&mut Self) -> BinaryResult<T>,
    ) -> BinaryResult<T> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.limit)
            .ok_or(BinaryError::InsufficientData {
                expected: len,
                available: self.remaining(),
            })?;
        let previous = self.set_limit(end)?;
        let result = f(self);
        self.restore_limit(previous);
        result
    }

    #[inline]
    pub fn mark(&mut self) {
        self.mark = self.pos;
    }

    #[inline]
    pub fn reset(&mut self) {
        self.pos = self.mark.min(self.limit);
    }

    /// Run a speculative read. `Some` commits the cursor movement, `None`
    /// rewinds to where the cursor was before the call.
    pub fn speculate<T>(&mut self, f: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        let start = self.pos;
        let result = f(self);
        if result.is_none() {
            self.pos = start;
        }
        result
    }

    /// Consume zero bytes until the position is a multiple of `align`
    /// relative to `base`. A non-zero byte stops the skip without being
    /// consumed.
    pub fn align_zero_padding(&mut self, base: usize, align: usize) -> Padding {
        let rel = self.pos.saturating_sub(base);
        let wanted = (align - rel % align) % align;
        let mut skipped = 0;
        while skipped < wanted {
            let consumed = self.speculate(|c| match c.read_u8() {
                Ok(0) => Some(()),
                _ => None,
            });
            if consumed.is_none() {
                return Padding::Interrupted {
                    skipped,
                    offset: self.pos,
                };
            }
            skipped += 1;
        }
        Padding::Aligned { skipped }
    }

    #[inline]
    fn take(&mut self, n: usize) -> BinaryResult<&'a [u8]> {
        let bytes = self.peek(n)?;
        self.pos += n;
        Ok(bytes)
    }

    #[inline]
    pub fn peek(&self, n: usize) -> BinaryResult<&'a [u8]> {
        let available = self.remaining();
        if n > available {
            return Err(BinaryError::InsufficientData {
                expected: n,
                available,
            });
        }
        Ok(&self.data[self.pos..self.pos + n])
    }

    pub fn read_bytes(&mut self, n: usize) -> BinaryResult<&'a [u8]> {
        self.take(n)
    }

    pub fn read_array<const N: usize>(&mut self) -> BinaryResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn skip(&mut self, n: usize) -> BinaryResult<()> {
        self.take(n).map(|_| ())
    }

    /// The unread bytes up to the current limit.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..self.limit]
    }

    #[inline]
    pub fn read_u8(&mut self) -> BinaryResult<u8> {
        Ok(self.take(1)?[0])
    }

    #[inline]
    pub fn peek_u8(&self) -> BinaryResult<u8> {
        Ok(self.peek(1)?[0])
    }

    #[inline]
    pub fn read_i8(&mut self) -> BinaryResult<i8> {
        Ok(self.take(1)?[0] as i8)
    }

    read_le!(read_u16, peek_u16, u16, U16<LE>, 2);
    read_le!(read_i16, peek_i16, i16, I16<LE>, 2);
    read_le!(read_u32, peek_u32, u32, U32<LE>, 4);
    read_le!(read_i32, peek_i32, i32, I32<LE>, 4);
    read_le!(read_u64, peek_u64, u64, U64<LE>, 8);
    read_le!(read_i64, peek_i64, i64, I64<LE>, 8);
    read_le!(read_f32, peek_f32, f32, F32<LE>, 4);
    read_le!(read_f64, peek_f64, f64, F64<LE>, 8);
}

#[inline]
pub fn read_u16_le(data: &[u8], offset: usize) -> BinaryResult<u16> {
    ByteCursor::at(data, offset)?.read_u16()
}

#[inline]
pub fn read_u32_le(data: &[u8], offset: usize) -> BinaryResult<u32> {
    ByteCursor::at(data, offset)?.read_u32()
}

#[inline]
pub fn read_i32_le(data: &[u8], offset: usize) -> BinaryResult<i32> {
    ByteCursor::at(data, offset)?.read_i32()
}

#[inline]
pub fn read_u64_le(data: &[u8], offset: usize) -> BinaryResult<u64> {
    ByteCursor::at(data, offset)?.read_u64()
}

#[inline]
pub fn read_f64_le(data: &[u8], offset: usize) -> BinaryResult<f64> {
    ByteCursor::at(data, offset)?.read_f64()
}

/// Append zero bytes until `buf.len() - base` is a multiple of `align`.
pub fn put_zero_padding(buf: &mut Vec<u8>, base: usize, align: usize) -> usize {
    let rel = buf.len().saturating_sub(base);
    let pad = (align - rel % align) % align;
    buf.put_bytes(0, pad);
    pad
}

/// Encode `text` as UTF-16LE code units.
pub fn encode_utf16le(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2);
    for unit in text.encode_utf16() {
        out.put_u16_le(unit);
    }
    out
}

/// Decode UTF-16LE bytes, stopping at the first U+0000.
pub fn decode_utf16le(data: &[u8]) -> String {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
        .take_while(|&unit| unit != 0)
        .collect();
    String::from_utf16_lossy(&units)
}
