//! Byte-source adapters for the frame drivers.
//!
//! The decoder needs slightly more than `std::io::Read`: an EOF probe (a
//! clean end of input at a frame boundary is success, not an error), a
//! best-effort rewind (the cursor is put back on an unrecognised magic
//! number for caller diagnostics), and a hook for discarding skippable
//! frames. [`Source`] captures that contract; sinks stay plain
//! [`std::io::Write`].
//!
//! Two adapters are provided:
//!
//! - [`ReaderSource`] for seekable inputs (`BufRead + Seek`): files behind a
//!   `BufReader`, in-memory cursors. `rewind` is a real relative seek.
//! - [`PipeSource`] for non-seekable inputs (`BufRead` only): pipes and
//!   sockets. `rewind` is accepted as a no-op, so an invalid-magic failure
//!   leaves the cursor where it is.

use std::io::{self, BufRead, Cursor, Read, Seek, SeekFrom};

// ---------------------------------------------------------------------------
// Source trait
// ---------------------------------------------------------------------------

/// A readable byte source for the decode and encode drivers.
pub trait Source {
    /// Reads up to `buf.len()` bytes. Returns 0 at end of input. May return
    /// fewer bytes than requested; use [`Source::read_fill`] for exact reads.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Whether the source is exhausted. Must not consume input.
    fn is_eof(&mut self) -> bool;

    /// Moves the cursor `n` bytes backwards, where the source supports it.
    ///
    /// Non-seekable sources accept the call without moving.
    fn rewind(&mut self, n: u64) -> io::Result<()>;

    /// Consumes and discards the `len`-byte body of a skippable frame.
    ///
    /// `magic` is the skippable magic number that introduced the frame, for
    /// adapters that want to log or route on it; the provided adapters
    /// ignore it.
    fn skip(&mut self, magic: u32, len: u64) -> io::Result<()>;

    /// Fills `buf` completely, or as far as end of input allows. Returns the
    /// number of bytes read; retries on `Interrupted`.
    fn read_fill(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut total = 0;
        while total < buf.len() {
            match self.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(total)
    }
}

// ---------------------------------------------------------------------------
// Shared helper: discard `len` bytes from a BufRead
// ---------------------------------------------------------------------------

fn discard<R: BufRead>(reader: &mut R, len: u64) -> io::Result<()> {
    let copied = io::copy(&mut reader.by_ref().take(len), &mut io::sink())?;
    if copied != len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "skippable frame truncated",
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// ReaderSource — seekable inputs
// ---------------------------------------------------------------------------

/// [`Source`] over a seekable buffered reader.
pub struct ReaderSource<R> {
    inner: R,
}

impl<R: BufRead + Seek> ReaderSource<R> {
    pub fn new(inner: R) -> Self {
        ReaderSource { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<'a> ReaderSource<Cursor<&'a [u8]>> {
    /// Convenience constructor over an in-memory byte slice.
    pub fn from_slice(data: &'a [u8]) -> Self {
        ReaderSource::new(Cursor::new(data))
    }
}

impl<R: BufRead + Seek> Source for ReaderSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }

    fn is_eof(&mut self) -> bool {
        self.inner.fill_buf().map(|b| b.is_empty()).unwrap_or(true)
    }

    fn rewind(&mut self, n: u64) -> io::Result<()> {
        self.inner.seek(SeekFrom::Current(-(n as i64))).map(|_| ())
    }

    fn skip(&mut self, _magic: u32, len: u64) -> io::Result<()> {
        discard(&mut self.inner, len)
    }
}

// ---------------------------------------------------------------------------
// PipeSource — non-seekable inputs
// ---------------------------------------------------------------------------

/// [`Source`] over a non-seekable buffered reader (pipe, socket, stdin).
///
/// `rewind` is accepted as a no-op: after an invalid-magic failure the
/// cursor stays past the magic word rather than on it.
pub struct PipeSource<R> {
    inner: R,
}

impl<R: BufRead> PipeSource<R> {
    pub fn new(inner: R) -> Self {
        PipeSource { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: BufRead> Source for PipeSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }

    fn is_eof(&mut self) -> bool {
        self.inner.fill_buf().map(|b| b.is_empty()).unwrap_or(true)
    }

    fn rewind(&mut self, _n: u64) -> io::Result<()> {
        Ok(())
    }

    fn skip(&mut self, _magic: u32, len: u64) -> io::Result<()> {
        discard(&mut self.inner, len)
    }
}
