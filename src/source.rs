//! Byte-stream input sources.
//!
//! An [`InputSource`] is a small capability interface — read one byte,
//! optionally skip or rewind, optionally close — together with a lifecycle
//! state machine (`NORMAL` / `ERROR` / `DOUBLE_ERROR` / `EOF`). Concrete
//! adapters ([`FileSource`], [`ReaderSource`], [`SliceSource`]) each implement
//! a small [`RawSource`] capability vector; the state-machine bookkeeping
//! lives once, in [`Stateful`], rather than being re-implemented per adapter.

use crate::error::{self, Error, LibError, Result};
use crate::limits::MAX_INPUT_BYTES;
use log::warn;
use snafu::ResultExt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Lifecycle state of an [`InputSource`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SourceState {
    Normal,
    Error,
    DoubleError,
    Eof,
}

/// A pluggable byte-stream source, as consumed by the chunk framer.
pub trait InputSource {
    /// Reads one byte. `Ok(None)` means clean end-of-input.
    fn read(&mut self) -> Result<Option<u8>>;

    /// Skips up to `n` bytes. A skip that would pass end-of-input is clamped
    /// so the next read yields EOF.
    fn skip(&mut self, n: u64) -> Result<()>;

    /// Whether `skip` is backed by a native seek rather than simulated reads.
    fn can_skip(&self) -> bool;

    /// Whether `rewind` is supported at all.
    fn can_rewind(&self) -> bool;

    /// Rewinds to the start of the input. Clears `ERROR`/`EOF` on success;
    /// transitions to `DOUBLE_ERROR` on failure.
    fn rewind(&mut self) -> Result<()>;

    /// Idempotent shutdown. Returns whether this call performed a clean close.
    fn close(&mut self) -> bool;

    /// Current lifecycle state.
    fn state(&self) -> SourceState;
}

/// Capability vector implemented by a concrete byte source. [`Stateful`]
/// wraps any `RawSource` and supplies the shared `NORMAL`/`ERROR`/
/// `DOUBLE_ERROR`/`EOF` state machine on top of it.
trait RawSource {
    fn raw_read(&mut self) -> io::Result<Option<u8>>;

    fn raw_skip(&mut self, n: u64) -> io::Result<()> {
        for _ in 0..n {
            if self.raw_read()?.is_none() {
                break;
            }
        }
        Ok(())
    }

    fn can_skip(&self) -> bool {
        false
    }

    fn raw_rewind(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "rewind not supported"))
    }

    fn can_rewind(&self) -> bool {
        false
    }
}

/// Marker wrapped into an `io::Error` by a [`RawSource`] to signal the 1 GiB
/// cap was exceeded, rather than an ordinary I/O failure.
#[derive(Debug)]
struct HugeInputMarker;

impl std::fmt::Display for HugeInputMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "input exceeds the 1 GiB addressable cap")
    }
}

impl std::error::Error for HugeInputMarker {}

fn huge_input_error() -> io::Error {
    io::Error::new(io::ErrorKind::Other, HugeInputMarker)
}

fn is_huge_input(e: &io::Error) -> bool {
    e.get_ref()
        .map(|inner| inner.downcast_ref::<HugeInputMarker>().is_some())
        .unwrap_or(false)
}

fn io_to_lib_error(e: io::Error) -> LibError {
    if is_huge_input(&e) {
        error::HugeFile { site: site!() }.build()
    } else {
        error::Io { site: site!(), source: e }.build()
    }
}

/// Generic state-machine wrapper, implementing [`InputSource`] for any
/// [`RawSource`].
struct Stateful<R: RawSource> {
    raw: R,
    state: SourceState,
    bytes_read: u64,
}

impl<R: RawSource> Stateful<R> {
    fn new(raw: R) -> Self {
        Stateful {
            raw,
            state: SourceState::Normal,
            bytes_read: 0,
        }
    }

    fn sticky_error(&self) -> Result<Option<u8>> {
        let e: Error = error::Io {
            site: site!(),
            source: io::Error::new(io::ErrorKind::Other, "input source is in a failed state"),
        }
        .build()
        .into();
        Err(e)
    }
}

impl<R: RawSource> InputSource for Stateful<R> {
    fn read(&mut self) -> Result<Option<u8>> {
        match self.state {
            SourceState::Eof => Ok(None),
            SourceState::Error | SourceState::DoubleError => self.sticky_error(),
            SourceState::Normal => {
                if self.bytes_read >= MAX_INPUT_BYTES {
                    self.state = SourceState::Error;
                    return Err(io_to_lib_error(huge_input_error()).into());
                }
                match self.raw.raw_read() {
                    Ok(Some(b)) => {
                        self.bytes_read += 1;
                        Ok(Some(b))
                    }
                    Ok(None) => {
                        self.state = SourceState::Eof;
                        Ok(None)
                    }
                    Err(e) => {
                        self.state = SourceState::Error;
                        Err(io_to_lib_error(e).into())
                    }
                }
            }
        }
    }

    fn skip(&mut self, n: u64) -> Result<()> {
        match self.state {
            SourceState::Eof => Ok(()),
            SourceState::Error | SourceState::DoubleError => self.sticky_error().map(|_| ()),
            SourceState::Normal => match self.raw.raw_skip(n) {
                Ok(()) => {
                    self.bytes_read += n;
                    Ok(())
                }
                Err(e) => {
                    self.state = SourceState::Error;
                    Err(io_to_lib_error(e).into())
                }
            },
        }
    }

    fn can_skip(&self) -> bool {
        self.raw.can_skip()
    }

    fn can_rewind(&self) -> bool {
        self.raw.can_rewind()
    }

    fn rewind(&mut self) -> Result<()> {
        match self.raw.raw_rewind() {
            Ok(()) => {
                self.state = SourceState::Normal;
                self.bytes_read = 0;
                Ok(())
            }
            Err(e) => {
                self.state = SourceState::DoubleError;
                Err(io_to_lib_error(e).into())
            }
        }
    }

    fn close(&mut self) -> bool {
        !matches!(self.state, SourceState::DoubleError)
    }

    fn state(&self) -> SourceState {
        self.state
    }
}

// --- File-backed source -----------------------------------------------------

struct FileRaw {
    file: File,
    seekable: bool,
}

impl RawSource for FileRaw {
    fn raw_read(&mut self) -> io::Result<Option<u8>> {
        let mut buf = [0u8; 1];
        match self.file.read(&mut buf)? {
            0 => Ok(None),
            _ => Ok(Some(buf[0])),
        }
    }

    fn raw_skip(&mut self, n: u64) -> io::Result<()> {
        if self.seekable {
            self.file.seek(SeekFrom::Current(n as i64))?;
            Ok(())
        } else {
            let mut buf = [0u8; 1];
            for _ in 0..n {
                if self.file.read(&mut buf)? == 0 {
                    break;
                }
            }
            Ok(())
        }
    }

    fn can_skip(&self) -> bool {
        true
    }

    fn raw_rewind(&mut self) -> io::Result<()> {
        if self.seekable {
            self.file.seek(SeekFrom::Start(0))?;
            Ok(())
        } else {
            Err(io::Error::new(io::ErrorKind::Unsupported, "file is not seekable"))
        }
    }

    fn can_rewind(&self) -> bool {
        self.seekable
    }
}

/// An [`InputSource`] backed by an owned `std::fs::File`.
pub struct FileSource(Stateful<FileRaw>);

impl FileSource {
    /// Wraps an already-open file handle. `seekable` declares whether the
    /// handle supports seeking (a regular file does; a pipe or `stdin` does
    /// not), since there is no portable way to probe this directly.
    pub fn from_file(file: File, seekable: bool) -> Result<Self> {
        if seekable {
            let len = file
                .metadata()
                .context(error::Io { site: site!() })?
                .len();
            if len > MAX_INPUT_BYTES {
                return error::HugeFile { site: site!() }.fail().map_err(Into::into);
            }
        }
        Ok(FileSource(Stateful::new(FileRaw { file, seekable })))
    }

    /// Opens a path on the filesystem. The thin file-system adapter: all it
    /// does is turn a path into an (always seekable) `File`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let file = File::open(path_ref).map_err(|e| -> Error {
            error::OpenFile {
                site: site!(),
                path: path_ref.display().to_string(),
                source: e,
            }
            .build()
            .into()
        })?;
        Self::from_file(file, true)
    }
}

impl InputSource for FileSource {
    fn read(&mut self) -> Result<Option<u8>> {
        self.0.read()
    }
    fn skip(&mut self, n: u64) -> Result<()> {
        self.0.skip(n)
    }
    fn can_skip(&self) -> bool {
        self.0.can_skip()
    }
    fn can_rewind(&self) -> bool {
        self.0.can_rewind()
    }
    fn rewind(&mut self) -> Result<()> {
        self.0.rewind()
    }
    fn close(&mut self) -> bool {
        self.0.close()
    }
    fn state(&self) -> SourceState {
        self.0.state()
    }
}

// --- Generic `Read` source ---------------------------------------------------

struct ReaderRaw<R: Read> {
    reader: R,
}

impl<R: Read> RawSource for ReaderRaw<R> {
    fn raw_read(&mut self) -> io::Result<Option<u8>> {
        let mut buf = [0u8; 1];
        match self.reader.read(&mut buf)? {
            0 => Ok(None),
            _ => Ok(Some(buf[0])),
        }
    }
}

/// An [`InputSource`] wrapping any `std::io::Read`. Not seekable: `skip` is
/// simulated by reads, and `rewind` always fails.
pub struct ReaderSource<R: Read>(Stateful<ReaderRaw<R>>);

impl<R: Read> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        ReaderSource(Stateful::new(ReaderRaw { reader }))
    }
}

impl<R: Read> InputSource for ReaderSource<R> {
    fn read(&mut self) -> Result<Option<u8>> {
        self.0.read()
    }
    fn skip(&mut self, n: u64) -> Result<()> {
        self.0.skip(n)
    }
    fn can_skip(&self) -> bool {
        self.0.can_skip()
    }
    fn can_rewind(&self) -> bool {
        self.0.can_rewind()
    }
    fn rewind(&mut self) -> Result<()> {
        let r = self.0.rewind();
        if r.is_err() {
            warn!("rewind requested on a non-seekable ReaderSource");
        }
        r
    }
    fn close(&mut self) -> bool {
        self.0.close()
    }
    fn state(&self) -> SourceState {
        self.0.state()
    }
}

// --- In-memory slice source --------------------------------------------------

struct SliceRaw<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> RawSource for SliceRaw<'a> {
    fn raw_read(&mut self) -> io::Result<Option<u8>> {
        if self.pos >= self.data.len() {
            return Ok(None);
        }
        let b = self.data[self.pos];
        self.pos += 1;
        Ok(Some(b))
    }

    fn raw_skip(&mut self, n: u64) -> io::Result<()> {
        self.pos = (self.pos + n as usize).min(self.data.len());
        Ok(())
    }

    fn can_skip(&self) -> bool {
        true
    }

    fn raw_rewind(&mut self) -> io::Result<()> {
        self.pos = 0;
        Ok(())
    }

    fn can_rewind(&self) -> bool {
        true
    }
}

/// An [`InputSource`] over an in-memory byte slice. Always seekable; used
/// heavily by tests to exercise the engine without touching the filesystem.
pub struct SliceSource<'a>(Stateful<SliceRaw<'a>>);

impl<'a> SliceSource<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        SliceSource(Stateful::new(SliceRaw { data, pos: 0 }))
    }
}

impl<'a> InputSource for SliceSource<'a> {
    fn read(&mut self) -> Result<Option<u8>> {
        self.0.read()
    }
    fn skip(&mut self, n: u64) -> Result<()> {
        self.0.skip(n)
    }
    fn can_skip(&self) -> bool {
        self.0.can_skip()
    }
    fn can_rewind(&self) -> bool {
        self.0.can_rewind()
    }
    fn rewind(&mut self) -> Result<()> {
        self.0.rewind()
    }
    fn close(&mut self) -> bool {
        self.0.close()
    }
    fn state(&self) -> SourceState {
        self.0.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_source_reads_to_eof() {
        let mut s = SliceSource::new(&[1, 2, 3]);
        assert_eq!(s.read().unwrap(), Some(1));
        assert_eq!(s.read().unwrap(), Some(2));
        assert_eq!(s.read().unwrap(), Some(3));
        assert_eq!(s.read().unwrap(), None);
        assert_eq!(s.state(), SourceState::Eof);
        // EOF is sticky on the read path without a rewind.
        assert_eq!(s.read().unwrap(), None);
    }

    #[test]
    fn slice_source_rewind_clears_eof() {
        let mut s = SliceSource::new(&[1, 2]);
        s.read().unwrap();
        s.read().unwrap();
        assert_eq!(s.state(), SourceState::Eof);
        s.rewind().unwrap();
        assert_eq!(s.state(), SourceState::Normal);
        assert_eq!(s.read().unwrap(), Some(1));
    }

    #[test]
    fn slice_source_skip_clamps_at_eof() {
        let mut s = SliceSource::new(&[1, 2, 3]);
        s.skip(100).unwrap();
        assert_eq!(s.read().unwrap(), None);
    }

    #[test]
    fn reader_source_cannot_rewind() {
        let mut s = ReaderSource::new(&b"ab"[..]);
        assert!(!s.can_rewind());
        assert_eq!(s.read().unwrap(), Some(b'a'));
        assert_eq!(s.read().unwrap(), Some(b'b'));
        assert_eq!(s.read().unwrap(), None);
        assert!(s.rewind().is_err());
        assert_eq!(s.state(), SourceState::DoubleError);
    }

    #[test]
    fn double_error_is_terminal() {
        let mut s = ReaderSource::new(&b""[..]);
        s.read().unwrap();
        assert!(s.rewind().is_err());
        assert_eq!(s.state(), SourceState::DoubleError);
        assert!(s.read().is_err());
        assert!(s.rewind().is_err());
        assert_eq!(s.state(), SourceState::DoubleError);
    }
}
