//! LZ4 frame format — parallel streaming compression and decompression.
//!
//! A frame wraps a sequence of independently compressed (or stored-raw)
//! blocks in a self-describing container: a magic number, a two-byte
//! descriptor with optional trailing fields and a check byte, then the
//! blocks (each preceded by a size word whose high bit marks raw storage,
//! optionally followed by an XXH32 of its payload), a four-byte
//! end-of-stream marker, and an optional XXH32 of the whole uncompressed
//! content. The layout is defined by the [LZ4 Frame Format Specification].
//!
//! # Submodules
//!
//! * [`types`]      — descriptor types, wire constants, [`FrameError`].
//! * [`header`]     — frame-header encode/decode/validate.
//! * [`compress`]   — the encode driver and its block task.
//! * [`decompress`] — the decode driver and its block task.
//!
//! The pipeline internals (ordered-commit baton, cancellation state) live in
//! a private `pipeline` module shared by both drivers.
//!
//! [LZ4 Frame Format Specification]: https://github.com/lz4/lz4/blob/dev/doc/lz4_Frame_format.md

pub mod compress;
pub mod decompress;
pub mod header;
mod pipeline;
pub mod types;

pub use compress::compress;
pub use decompress::decompress;
pub use types::{FrameDescriptor, FrameError, FrameResult, Mode};

use crate::codec::Lz4Codec;
use crate::io::ReaderSource;

// ---------------------------------------------------------------------------
// One-shot convenience helpers
// ---------------------------------------------------------------------------

/// Compresses `data` into a single complete frame, returned as a fresh
/// `Vec<u8>`, using the built-in [`Lz4Codec`].
pub fn compress_frame_to_vec(
    data: &[u8],
    sd: &FrameDescriptor,
    mode: Mode,
) -> FrameResult<Vec<u8>> {
    let mut src = ReaderSource::from_slice(data);
    let mut out = Vec::new();
    compress(&mut src, &mut out, &Lz4Codec, sd, mode)?;
    Ok(out)
}

/// Decompresses a byte stream of one or more frames into a fresh `Vec<u8>`,
/// using the built-in [`Lz4Codec`].
pub fn decompress_frame_to_vec(data: &[u8], mode: Mode) -> FrameResult<Vec<u8>> {
    let mut src = ReaderSource::from_slice(data);
    let mut out = Vec::new();
    decompress(&mut src, &mut out, &Lz4Codec, mode)?;
    Ok(out)
}
