//! Chunk framer: reads 8-byte chunk headers and, within a chunk, enforces the
//! declared byte budget while exposing big-endian integer and
//! variable-length-quantity readers.

use crate::error::{self, LibResult};
use crate::limits::{MAX_CHUNK_LEN, VARINT_MAX_BYTES};
use crate::source::InputSource;

/// A chunk type code, the 4-byte ASCII tag read from a chunk header (e.g.
/// `MThd`, `MTrk`), carried as raw bytes since unrecognized top-level chunks
/// must be tolerated rather than rejected.
pub type ChunkType = [u8; 4];

pub const MTHD: ChunkType = *b"MThd";
pub const MTRK: ChunkType = *b"MTrk";

/// Reads chunk headers and chunk-bounded data from an [`InputSource`].
/// Borrows the source for the duration of a single call; the in-chunk byte
/// budget it enforces is owned by the caller (the parser) and threaded in by
/// mutable reference, so it persists across calls.
pub(crate) struct ChunkFramer<'a> {
    source: &'a mut dyn InputSource,
    remaining: &'a mut i64,
}

impl<'a> ChunkFramer<'a> {
    pub(crate) fn new(source: &'a mut dyn InputSource, remaining: &'a mut i64) -> Self {
        ChunkFramer { source, remaining }
    }

    /// Reads one byte directly from the source, ignoring the in-chunk
    /// remainder. Used only between chunks, to read the next chunk header.
    fn read_raw_byte(&mut self) -> LibResult<Option<u8>> {
        self.source.read().map_err(Into::into)
    }

    /// Reads an 8-byte chunk header (4-byte type, 4-byte big-endian length).
    /// Returns `None` if the source is cleanly exhausted before the first
    /// byte of the header; any other truncation is an `Eof` error.
    pub(crate) fn read_chunk_header(&mut self) -> LibResult<Option<(ChunkType, u32)>> {
        let first = match self.read_raw_byte()? {
            Some(b) => b,
            None => return Ok(None),
        };
        let mut ty = [0u8; 4];
        ty[0] = first;
        for slot in ty.iter_mut().skip(1) {
            *slot = self.read_raw_byte()?.context_eof()?;
        }
        let mut len_bytes = [0u8; 4];
        for slot in len_bytes.iter_mut() {
            *slot = self.read_raw_byte()?.context_eof()?;
        }
        let length = u32::from_be_bytes(len_bytes);
        if length > MAX_CHUNK_LEN {
            return error::HugeChunk { site: site!(), length }.fail();
        }
        Ok(Some((ty, length)))
    }

    /// Opens a chunk of the given length, making it the current in-chunk
    /// budget.
    pub(crate) fn enter(&mut self, length: u32) {
        *self.remaining = length as i64;
    }

    /// Closes the current chunk, returning to the "between chunks" state.
    pub(crate) fn close(&mut self) {
        *self.remaining = -1;
    }

    /// Reads one byte from the current chunk's remainder.
    pub(crate) fn read_chunk_byte(&mut self) -> LibResult<u8> {
        if *self.remaining <= 0 {
            return error::OpenTrack { site: site!() }.fail();
        }
        let b = self.read_raw_byte()?.context_eof()?;
        *self.remaining -= 1;
        Ok(b)
    }

    pub(crate) fn read_chunk_u16(&mut self) -> LibResult<u16> {
        let hi = self.read_chunk_byte()?;
        let lo = self.read_chunk_byte()?;
        Ok(u16::from_be_bytes([hi, lo]))
    }

    /// Decodes a base-128 big-endian variable-length quantity: each byte
    /// contributes its low 7 bits, with the top bit set meaning "more
    /// follows". At most 4 bytes; a 5th continuation is `LongVarint`.
    pub(crate) fn read_chunk_varint(&mut self) -> LibResult<u32> {
        let mut value: u32 = 0;
        for _ in 0..VARINT_MAX_BYTES {
            let b = self.read_chunk_byte()?;
            value = (value << 7) | u32::from(b & 0x7F);
            if b & 0x80 == 0 {
                return Ok(value);
            }
        }
        error::LongVarint { site: site!() }.fail()
    }

    /// Skips whatever remains of the current chunk and closes it. Used for
    /// unrecognized top-level chunks and for trailing bytes after a
    /// recognized fixed-length payload (e.g. header bytes past `division`).
    pub(crate) fn skip_chunk_remainder(&mut self) -> LibResult<()> {
        let n = (*self.remaining).max(0) as u64;
        self.source.skip(n).map_err(Into::into)?;
        self.close();
        Ok(())
    }
}

/// Small helper so `Option<u8>` reads from [`ChunkFramer::read_raw_byte`] can
/// be turned into an `Eof` error with one call.
trait ContextEof {
    fn context_eof(self) -> LibResult<u8>;
}

impl ContextEof for Option<u8> {
    fn context_eof(self) -> LibResult<u8> {
        self.ok_or_else(|| error::Eof { site: site!() }.build())
    }
}
