//! Block compression/decompression adapter.
//!
//! The pipeline never compresses bytes itself; it drives a [`BlockCodec`]
//! supplied by the caller. The trait keeps the C-style signed-length
//! convention so any LZ4 block implementation slots in unchanged:
//!
//! - `compress` returning ≤ 0, or ≥ the source length, means the block is
//!   incompressible and will be stored raw;
//! - `decompress` returning < 0 is fatal for the frame.
//!
//! [`Lz4Codec`] adapts the `lz4_flex` block primitives onto this convention
//! and is the codec used by the crate's convenience APIs and tests.

/// Single-block compression/decompression primitives.
///
/// Implementations must be `Sync`: one instance serves every worker thread.
pub trait BlockCodec: Sync {
    /// Compresses `src` into `dst`, returning the compressed length.
    ///
    /// A return ≤ 0 (or ≥ `src.len()`) instructs the pipeline to store the
    /// block raw.
    fn compress(&self, src: &[u8], dst: &mut [u8]) -> i32;

    /// Decompresses `src` into `dst`, returning the decompressed length.
    ///
    /// A negative return aborts the frame with `DECOMPRESS_FAIL`.
    fn decompress(&self, src: &[u8], dst: &mut [u8]) -> i32;
}

/// LZ4 block codec backed by `lz4_flex`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Lz4Codec;

impl BlockCodec for Lz4Codec {
    fn compress(&self, src: &[u8], dst: &mut [u8]) -> i32 {
        // `dst` is one block-maximum long; output that does not fit there is
        // by definition not smaller than the source, so map the error onto
        // the incompressible convention.
        match lz4_flex::block::compress_into(src, dst) {
            Ok(n) => n as i32,
            Err(_) => 0,
        }
    }

    fn decompress(&self, src: &[u8], dst: &mut [u8]) -> i32 {
        match lz4_flex::block::decompress_into(src, dst) {
            Ok(n) => n as i32,
            Err(_) => -1,
        }
    }
}
