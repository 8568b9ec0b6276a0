//! Positioned reads over captured byte buffers.
//!
//! [`BinaryCursor`] wraps a borrowed buffer with a read position and a stack
//! of declared-length marks. All multi-byte integers are read big-endian
//! (network order). The cursor never owns the buffer: it lives only for the
//! duration of one decode call, and callers copy out any values that must
//! survive it.
//!
//! # Bounded sub-views
//!
//! Length-delimited containers (record batches, records, partition blobs)
//! declare how many bytes they occupy. [`BinaryCursor::mark_offset`] records
//! that declared end; until the matching [`BinaryCursor::jump_to_offset`],
//! any read crossing the innermost mark fails as
//! [`DecodeError::Malformed`] rather than silently consuming the next
//! field's bytes. Running out of captured bytes before the mark is the
//! separate, retryable [`DecodeError::InsufficientData`]. This makes "never
//! read past a declared length" structural instead of bookkeeping.

use crate::{
    byte_order::{read_network_i16, read_network_i32, read_network_i64, read_network_u16, read_network_u32},
    decode::{DecodeError, DecodeResult},
};

/// Ceiling for a varint encoding a 32-bit value: five 7-bit groups.
const VARINT_MAX_BITS: u32 = 35;
/// Ceiling for a varint encoding a 64-bit value: ten 7-bit groups.
const VARLONG_MAX_BITS: u32 = 70;

const CONTINUATION_BIT: u8 = 0x80;
const PAYLOAD_MASK: u8 = 0x7f;

/// Sequential extractor over a captured byte buffer.
#[derive(Debug)]
pub struct BinaryCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    /// Stack of declared end offsets, innermost last.
    marks: Vec<usize>,
}

impl<'a> BinaryCursor<'a> {
    /// Wrap a buffer, positioned at its start.
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            marks: Vec::new(),
        }
    }

    /// Current read position in bytes from the start of the buffer.
    #[must_use]
    pub const fn position(&self) -> usize { self.pos }

    /// Bytes remaining before the end of the captured buffer.
    #[must_use]
    pub const fn remaining(&self) -> usize { self.buf.len() - self.pos }

    /// Take `n` bytes, honouring the innermost declared-length mark.
    fn take(&mut self, n: usize) -> DecodeResult<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or(DecodeError::Malformed {
            reason: "length overflows buffer offset",
        })?;
        if let Some(&mark) = self.marks.last()
            && end > mark
            && mark <= self.buf.len()
        {
            // The declared container length is fully captured, so crossing
            // it means the field layout disagrees with the declared length.
            return Err(DecodeError::Malformed {
                reason: "read crosses declared container length",
            });
        }
        if end > self.buf.len() {
            return Err(DecodeError::InsufficientData {
                have: self.remaining(),
                need: n,
            });
        }
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    /// Extract a single byte.
    ///
    /// # Errors
    /// Returns [`DecodeError::InsufficientData`] when the buffer is drained.
    pub fn extract_u8(&mut self) -> DecodeResult<u8> { Ok(self.take(1)?[0]) }

    /// Extract a signed byte.
    ///
    /// # Errors
    /// Returns [`DecodeError::InsufficientData`] when the buffer is drained.
    #[expect(clippy::cast_possible_wrap, reason = "wire bytes reinterpret as i8")]
    pub fn extract_i8(&mut self) -> DecodeResult<i8> { Ok(self.take(1)?[0] as i8) }

    /// Extract a big-endian `u16`.
    ///
    /// # Errors
    /// Returns [`DecodeError::InsufficientData`] when fewer than 2 bytes remain.
    pub fn extract_u16(&mut self) -> DecodeResult<u16> {
        let bytes = self.take(2)?;
        Ok(read_network_u16([bytes[0], bytes[1]]))
    }

    /// Extract a big-endian `u32`.
    ///
    /// # Errors
    /// Returns [`DecodeError::InsufficientData`] when fewer than 4 bytes remain.
    pub fn extract_u32(&mut self) -> DecodeResult<u32> {
        let bytes = self.take(4)?;
        Ok(read_network_u32([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Extract a big-endian `i16`.
    ///
    /// # Errors
    /// Returns [`DecodeError::InsufficientData`] when fewer than 2 bytes remain.
    pub fn extract_i16(&mut self) -> DecodeResult<i16> {
        let bytes = self.take(2)?;
        Ok(read_network_i16([bytes[0], bytes[1]]))
    }

    /// Extract a big-endian `i32`.
    ///
    /// # Errors
    /// Returns [`DecodeError::InsufficientData`] when fewer than 4 bytes remain.
    pub fn extract_i32(&mut self) -> DecodeResult<i32> {
        let bytes = self.take(4)?;
        Ok(read_network_i32([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Extract a big-endian `i64`.
    ///
    /// # Errors
    /// Returns [`DecodeError::InsufficientData`] when fewer than 8 bytes remain.
    pub fn extract_i64(&mut self) -> DecodeResult<i64> {
        let bytes = self.take(8)?;
        Ok(read_network_i64([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    /// Extract `len` raw bytes as a borrowed slice.
    ///
    /// # Errors
    /// Returns [`DecodeError::InsufficientData`] when fewer than `len` bytes
    /// remain, or [`DecodeError::Malformed`] when the read would cross the
    /// innermost declared-length mark.
    pub fn extract_bytes(&mut self, len: usize) -> DecodeResult<&'a [u8]> { self.take(len) }

    /// Extract `len` bytes as a UTF-8 string.
    ///
    /// # Errors
    /// Returns [`DecodeError::Malformed`] when the bytes are not valid UTF-8.
    pub fn extract_string(&mut self, len: usize) -> DecodeResult<String> {
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::Malformed {
            reason: "string field is not valid UTF-8",
        })
    }

    /// Record the expected end position of a length-delimited container.
    ///
    /// # Errors
    /// Returns [`DecodeError::Malformed`] when the declared length would
    /// extend past an enclosing container's declared length.
    pub fn mark_offset(&mut self, len: usize) -> DecodeResult<()> {
        let end = self.pos.checked_add(len).ok_or(DecodeError::Malformed {
            reason: "declared length overflows buffer offset",
        })?;
        if let Some(&outer) = self.marks.last()
            && end > outer
        {
            return Err(DecodeError::Malformed {
                reason: "declared length exceeds enclosing container",
            });
        }
        self.marks.push(end);
        Ok(())
    }

    /// Seek to the innermost mark, discarding unconsumed trailing sub-fields.
    ///
    /// Returns the number of bytes skipped, so callers enforcing exact
    /// length accounting can reject a non-zero skip.
    ///
    /// # Errors
    /// Returns [`DecodeError::Internal`] when no mark is outstanding, and
    /// [`DecodeError::InsufficientData`] when the marked offset lies beyond
    /// the captured bytes.
    pub fn jump_to_offset(&mut self) -> DecodeResult<usize> {
        let mark = self.marks.pop().ok_or(DecodeError::Internal {
            reason: "jump without an outstanding mark",
        })?;
        if mark > self.buf.len() {
            return Err(DecodeError::InsufficientData {
                have: self.remaining(),
                need: mark - self.pos,
            });
        }
        let skipped = mark.saturating_sub(self.pos);
        self.pos = mark;
        Ok(skipped)
    }

    /// Bytes left before the innermost mark, or `None` without one.
    ///
    /// Containers packing a variable number of elements into a declared
    /// byte length loop while this is non-zero.
    #[must_use]
    pub fn bytes_until_mark(&self) -> Option<usize> {
        self.marks.last().map(|&mark| mark.saturating_sub(self.pos))
    }

    /// Core unsigned-varint loop: little-endian base-128 groups, bounded by
    /// a per-call maximum bit length.
    fn extract_unsigned_varint_core(&mut self, max_bits: u32) -> DecodeResult<u64> {
        let mut value: u64 = 0;
        let mut shift = 0;
        while shift < max_bits {
            let byte = self.extract_u8()?;
            if byte & CONTINUATION_BIT == 0 {
                value |= u64::from(byte) << shift;
                return Ok(value);
            }
            value |= u64::from(byte & PAYLOAD_MASK) << shift;
            shift += 7;
        }
        Err(DecodeError::Malformed {
            reason: "varint exceeds bit-length ceiling",
        })
    }

    /// Extract an unsigned varint sized for a 32-bit value (35-bit ceiling).
    ///
    /// # Errors
    /// Returns [`DecodeError::Malformed`] when no terminating group appears
    /// within the ceiling or the decoded value does not fit in 32 bits.
    pub fn extract_unsigned_varint(&mut self) -> DecodeResult<u32> {
        let raw = self.extract_unsigned_varint_core(VARINT_MAX_BITS)?;
        u32::try_from(raw).map_err(|_| DecodeError::Malformed {
            reason: "varint value does not fit in 32 bits",
        })
    }

    /// Extract a zigzag-encoded signed varint (32-bit range).
    ///
    /// # Errors
    /// Returns [`DecodeError::Malformed`] on ceiling or range violations.
    pub fn extract_varint(&mut self) -> DecodeResult<i32> {
        let raw = self.extract_unsigned_varint_core(VARINT_MAX_BITS)?;
        i32::try_from(zigzag_decode(raw)).map_err(|_| DecodeError::Malformed {
            reason: "zigzag varint value does not fit in 32 bits",
        })
    }

    /// Extract a zigzag-encoded signed varlong (64-bit range, 70-bit ceiling).
    ///
    /// # Errors
    /// Returns [`DecodeError::Malformed`] when no terminating group appears
    /// within the ceiling.
    pub fn extract_varlong(&mut self) -> DecodeResult<i64> {
        let raw = self.extract_unsigned_varint_core(VARLONG_MAX_BITS)?;
        Ok(zigzag_decode(raw))
    }

    /// Extract a non-flexible string: 16-bit signed length prefix.
    ///
    /// # Errors
    /// Returns [`DecodeError::Malformed`] on a negative length; non-nullable
    /// strings have no null sentinel.
    pub fn extract_length_prefixed_string(&mut self) -> DecodeResult<String> {
        let len = self.extract_i16()?;
        let len = usize::try_from(len).map_err(|_| DecodeError::Malformed {
            reason: "negative length on non-nullable string",
        })?;
        self.extract_string(len)
    }

    /// Extract a non-flexible nullable string: length `-1` denotes null.
    ///
    /// # Errors
    /// Returns [`DecodeError::Malformed`] on lengths below `-1`.
    pub fn extract_nullable_string(&mut self) -> DecodeResult<Option<String>> {
        let len = self.extract_i16()?;
        if len == -1 {
            return Ok(None);
        }
        let len = usize::try_from(len).map_err(|_| DecodeError::Malformed {
            reason: "nullable string length below -1",
        })?;
        self.extract_string(len).map(Some)
    }

    /// Extract a compact (flexible-version) string: the unsigned varint
    /// prefix stores `actual_length + 1`.
    ///
    /// # Errors
    /// Returns [`DecodeError::Malformed`] when the prefix decodes to 0; the
    /// null sentinel is only valid on the nullable form.
    pub fn extract_compact_string(&mut self) -> DecodeResult<String> {
        let encoded = self.extract_unsigned_varint()?;
        let Some(len) = encoded.checked_sub(1) else {
            return Err(DecodeError::Malformed {
                reason: "null sentinel on non-nullable compact string",
            });
        };
        self.extract_string(len as usize)
    }

    /// Extract a compact nullable string: prefix 0 denotes null, 1 empty.
    ///
    /// # Errors
    /// Returns [`DecodeError::InsufficientData`] or
    /// [`DecodeError::Malformed`] from the underlying reads.
    pub fn extract_compact_nullable_string(&mut self) -> DecodeResult<Option<String>> {
        let encoded = self.extract_unsigned_varint()?;
        match encoded.checked_sub(1) {
            None => Ok(None),
            Some(len) => self.extract_string(len as usize).map(Some),
        }
    }

    /// Extract a zigzag-length-prefixed byte string: length `-1` denotes
    /// absent, `0` an empty payload.
    ///
    /// # Errors
    /// Returns [`DecodeError::Malformed`] on lengths below `-1`.
    pub fn extract_bytes_zigzag(&mut self) -> DecodeResult<Option<Vec<u8>>> {
        let len = self.extract_varint()?;
        if len == -1 {
            return Ok(None);
        }
        let len = usize::try_from(len).map_err(|_| DecodeError::Malformed {
            reason: "zigzag byte-string length below -1",
        })?;
        self.take(len).map(|bytes| Some(bytes.to_vec()))
    }
}

/// Zigzag decode: `(raw >>> 1) ^ -(raw & 1)` with an unsigned right shift.
#[expect(clippy::cast_possible_wrap, reason = "zigzag reinterprets the shifted bits")]
#[must_use]
pub fn zigzag_decode(raw: u64) -> i64 { ((raw >> 1) as i64) ^ -((raw & 1) as i64) }

/// Zigzag encode, the inverse of [`zigzag_decode`].
#[expect(clippy::cast_sign_loss, reason = "zigzag reinterprets the shifted bits")]
#[must_use]
pub fn zigzag_encode(value: i64) -> u64 { ((value << 1) ^ (value >> 63)) as u64 }

#[cfg(test)]
#[path = "cursor_tests.rs"]
mod tests;
