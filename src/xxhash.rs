//! Thin wrapper around the `xxhash-rust` crate providing the XXH32 API used
//! by the rest of this crate: the frame header check byte, per-block
//! checksums, and the streaming content checksum are all XXH32 with seed 0.

pub use xxhash_rust::xxh32::Xxh32;

/// One-shot XXH32 digest of `data`.
///
/// # Reference vector
/// * `xxh32_oneshot(b"", 0)` == `0x02CC5D05`
#[inline]
pub fn xxh32_oneshot(data: &[u8], seed: u32) -> u32 {
    xxhash_rust::xxh32::xxh32(data, seed)
}

/// Incremental XXH32 over the logical (pre-compression / post-decompression)
/// byte stream.
///
/// The pipeline serialises `update` calls into block-input order, so the
/// final digest equals [`xxh32_oneshot`] of the concatenated stream.
#[derive(Clone)]
pub struct StreamHash {
    state: Xxh32,
}

impl StreamHash {
    pub fn new(seed: u32) -> Self {
        StreamHash {
            state: Xxh32::new(seed),
        }
    }

    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        self.state.update(data);
    }

    #[inline]
    pub fn digest(&self) -> u32 {
        self.state.digest()
    }
}
