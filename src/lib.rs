//! `lz4par` — a parallel LZ4 frame-format codec.
//!
//! The crate splits an input byte stream into fixed-size blocks, compresses
//! or decompresses the blocks in parallel, and serialises them in strict
//! input order into an [LZ4 frame] that interoperates bit-exactly with any
//! conforming reader or writer. Ordering is enforced by a per-block commit
//! chain; memory is bounded by a blocking buffer pool sized to the hardware
//! concurrency.
//!
//! # Crate layout
//!
//! | Module    | Contents |
//! |-----------|----------|
//! | `frame`   | Frame header codec, block pipeline, encode/decode drivers. |
//! | `codec`   | Block compression/decompression adapter ([`BlockCodec`], [`Lz4Codec`]). |
//! | `io`      | Byte-source adapter ([`Source`]) over readers, files, and pipes. |
//! | `mempool` | Bounded pool of reusable block buffers (the backpressure mechanism). |
//! | `xxhash`  | XXH32 wrapper: one-shot digests and the streaming content hash. |
//! | `util`    | Hardware-concurrency query. |
//!
//! # Quick start
//!
//! ```no_run
//! use lz4par::{FrameDescriptor, Mode};
//!
//! let data = b"some bytes worth framing";
//! let framed = lz4par::frame::compress_frame_to_vec(
//!     data,
//!     &FrameDescriptor::default(),
//!     Mode::Parallel,
//! ).unwrap();
//! let restored = lz4par::frame::decompress_frame_to_vec(&framed, Mode::Parallel).unwrap();
//! assert_eq!(restored, data);
//! ```
//!
//! [LZ4 frame]: https://github.com/lz4/lz4/blob/dev/doc/lz4_Frame_format.md

pub mod codec;
pub mod frame;
pub mod io;
pub mod mempool;
pub mod util;
pub mod xxhash;

// ── Top-level re-exports ──────────────────────────────────────────────────────
pub use codec::{BlockCodec, Lz4Codec};
pub use frame::types::{Bd, Flg, FrameDescriptor, FrameError, FrameResult, Mode};
pub use frame::{compress, decompress};
pub use io::{PipeSource, ReaderSource, Source};
pub use mempool::{MemPool, PoolBuffer};
