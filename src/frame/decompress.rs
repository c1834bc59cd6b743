//! Frame decoding: the driver state machine and the per-block decode task.
//!
//! The driver loops over concatenated frames: read a magic number (a clean
//! EOF here is success), discard skippable frames, parse and verify the
//! descriptor, then run the block loop. Each block task decompresses and
//! hashes unordered, while the decoded bytes are written and the content
//! hash updated under the commit baton, in exact input order. After the
//! EOS marker the trailing content checksum, when announced, is compared
//! against the accumulated stream hash.

use std::io::Write;

use crate::codec::BlockCodec;
use crate::frame::header;
use crate::frame::pipeline::{self, BatonRx, BatonTx, PipelineCtx};
use crate::frame::types::{
    Bd, Flg, FrameDescriptor, FrameError, FrameResult, Mode, BLOCK_SIZE_MASK,
    BLOCK_UNCOMPRESSED_FLAG, CHECKSUM_SEED, EOS_MARKER, MAGIC,
};
use crate::io::Source;
use crate::mempool::{MemPool, PoolBuffer};
use crate::util::count_cores;
use crate::xxhash::xxh32_oneshot;

/// One block of work for the decode pipeline.
struct DecodeTask {
    /// The on-wire payload, exactly as framed.
    src: PoolBuffer,
    /// High bit of the size word: the payload is stored raw.
    incompressible: bool,
    /// The block checksum read ahead of the task, when the frame carries them.
    expected_checksum: Option<u32>,
}

/// Decodes a sequence of frames from `src` into `dst` until end of input.
///
/// Skippable frames are consumed and discarded; concatenated frames decode
/// back to back. An EOF while looking for the next magic number is a normal
/// end of stream. On an unrecognised magic number the source is rewound
/// four bytes (where it supports rewinding) so the caller can inspect the
/// offending word.
pub fn decompress<S, W, C>(src: &mut S, dst: &mut W, codec: &C, mode: Mode) -> FrameResult<()>
where
    S: Source,
    W: Write + Send,
    C: BlockCodec + ?Sized,
{
    let ctx = PipelineCtx::new();

    while !ctx.cancelled() && !ctx.error() && !src.is_eof() {
        // ── Magic number ─────────────────────────────────────────────────────
        let magic = match read_u32(src) {
            Some(m) => m,
            None => {
                if src.is_eof() {
                    break; // clean end between frames
                }
                ctx.set_error(FrameError::InvalidHeader);
                break;
            }
        };

        if header::is_skippable_magic(magic) {
            let len = match read_u32(src) {
                Some(l) => l,
                None => {
                    ctx.set_error(FrameError::InvalidHeader);
                    break;
                }
            };
            if src.skip(magic, u64::from(len)).is_err() {
                ctx.set_error(FrameError::InvalidHeader);
                break;
            }
            continue;
        }

        if magic != MAGIC {
            // Leave the cursor on the unrecognised word for diagnostics;
            // non-seekable sources accept the rewind without moving.
            let _ = src.rewind(4);
            ctx.set_error(FrameError::InvalidMagicNumber);
            break;
        }

        // ── Descriptor ───────────────────────────────────────────────────────
        let sd = match read_descriptor(src) {
            Ok(sd) => sd,
            Err(e) => {
                ctx.set_error(e);
                break;
            }
        };

        // ── Block loop ───────────────────────────────────────────────────────
        decode_frame(src, &mut *dst, codec, &ctx, &sd, mode);
    }

    ctx.finish()
}

/// Reads FLG, BD, the optional fields they announce, and the check byte.
/// The magic number has already been consumed.
fn read_descriptor<S: Source>(src: &mut S) -> FrameResult<FrameDescriptor> {
    let mut flg_bd = [0u8; 2];
    if !matches!(src.read_fill(&mut flg_bd), Ok(2)) {
        return Err(FrameError::InvalidHeader);
    }
    let mut sd = FrameDescriptor {
        flg: Flg::from_byte(flg_bd[0]),
        bd: Bd::from_byte(flg_bd[1]),
        stream_size: 0,
        dict_id: 0,
    };
    header::validate(&sd)?;

    let ext = header::ext_info_len(&sd.flg);
    let mut ext_buf = [0u8; 13]; // content size + dict id + check byte
    if !matches!(src.read_fill(&mut ext_buf[..ext]), Ok(n) if n == ext) {
        return Err(FrameError::InvalidHeader);
    }

    let mut p = 0;
    if sd.flg.stream_size {
        sd.stream_size = u64::from_le_bytes(ext_buf[..8].try_into().unwrap());
        p += 8;
    }
    if sd.flg.preset_dictionary {
        sd.dict_id = u32::from_le_bytes(ext_buf[p..p + 4].try_into().unwrap());
        p += 4;
    }

    let mut summed = [0u8; 14];
    summed[..2].copy_from_slice(&flg_bd);
    summed[2..2 + p].copy_from_slice(&ext_buf[..p]);
    let expected = header::check_byte(xxh32_oneshot(&summed[..2 + p], CHECKSUM_SEED));
    if ext_buf[p] != expected {
        return Err(FrameError::InvalidHeaderChecksum);
    }
    Ok(sd)
}

/// Runs one frame's block loop and trailing checksum comparison.
fn decode_frame<S, W, C>(
    src: &mut S,
    dst: &mut W,
    codec: &C,
    ctx: &PipelineCtx,
    sd: &FrameDescriptor,
    mode: Mode,
) where
    S: Source,
    W: Write + Send,
    C: BlockCodec + ?Sized,
{
    let block_size = sd.max_block_size();
    let block_checksum = sd.flg.block_checksum;
    let stream_checksum = sd.flg.stream_checksum;
    let sequential = mode.is_sequential();
    let pool_capacity = if sequential { 1 } else { count_cores() + 1 };
    let src_pool = MemPool::new(block_size, pool_capacity);
    let dst_pool = MemPool::new(block_size, pool_capacity);

    std::thread::scope(|s| {
        let mut prev_rx = pipeline::open_chain(dst);
        loop {
            if ctx.cancelled() || src.is_eof() {
                break;
            }
            let bits = match read_u32(src) {
                Some(v) => v,
                None => {
                    ctx.fail(FrameError::CannotReadBlockSize);
                    break;
                }
            };
            if bits == EOS_MARKER {
                break;
            }
            let incompressible = bits & BLOCK_UNCOMPRESSED_FLAG != 0;
            let payload_size = (bits & BLOCK_SIZE_MASK) as usize;
            // A payload above the frame's block maximum cannot be well
            // formed; reject before acquiring a buffer it would not fit in.
            if payload_size > block_size {
                ctx.fail(FrameError::CannotReadBlockData);
                break;
            }

            let mut buf = src_pool.alloc();
            match src.read_fill(&mut buf.storage_mut()[..payload_size]) {
                Ok(n) if n == payload_size => {}
                _ => {
                    ctx.fail(FrameError::CannotReadBlockData);
                    break;
                }
            }
            buf.set_filled(payload_size);

            let expected_checksum = if block_checksum {
                match read_u32(src) {
                    Some(v) => Some(v),
                    None => {
                        ctx.fail(FrameError::CannotReadBlockChecksum);
                        break;
                    }
                }
            } else {
                None
            };

            let task = DecodeTask {
                src: buf,
                incompressible,
                expected_checksum,
            };
            let (next_tx, next_rx) = pipeline::extend_chain();
            let prev = std::mem::replace(&mut prev_rx, next_rx);
            if sequential {
                decode_block(ctx, codec, &dst_pool, stream_checksum, task, prev, next_tx);
            } else {
                let dst_pool = &dst_pool;
                s.spawn(move || {
                    decode_block(ctx, codec, dst_pool, stream_checksum, task, prev, next_tx)
                });
            }
        }

        // The baton only comes back once every task has committed.
        let baton = prev_rx.recv().expect("commit chain broken");
        if !ctx.error() && stream_checksum {
            match read_u32(src) {
                None => {
                    ctx.set_error(FrameError::CannotReadStreamChecksum);
                }
                Some(wire) => {
                    if baton.xxh.digest() != wire {
                        ctx.set_error(FrameError::StreamChecksumMismatch);
                    }
                }
            }
        }
    });
}

/// One decode task: decompress and hash off-order, commit in order.
fn decode_block<'a, C, W>(
    ctx: &PipelineCtx,
    codec: &C,
    dst_pool: &MemPool,
    stream_checksum: bool,
    task: DecodeTask,
    prev: BatonRx<'a, W>,
    next: BatonTx<'a, W>,
) where
    C: BlockCodec + ?Sized,
    W: Write,
{
    let DecodeTask {
        src,
        incompressible,
        expected_checksum,
    } = task;

    if ctx.error() || ctx.cancelled() {
        pipeline::forward(&prev, &next);
        return;
    }

    // Block checksums cover the on-wire payload, whatever its encoding.
    let block_hash = expected_checksum.map(|_| xxh32_oneshot(src.filled(), CHECKSUM_SEED));

    let decoded = if incompressible {
        None
    } else {
        let mut dst = dst_pool.alloc();
        let n = codec.decompress(src.filled(), dst.storage_mut());
        if n < 0 {
            ctx.fail(FrameError::DecompressFail);
            pipeline::forward(&prev, &next);
            return;
        }
        dst.set_filled(n as usize);
        Some(dst)
    };

    let mut baton = prev.recv().expect("commit chain broken");
    let logical: &[u8] = match &decoded {
        Some(d) => d.filled(),
        None => src.filled(),
    };
    if stream_checksum {
        baton.xxh.update(logical);
    }
    baton.write_bin(ctx, logical);

    if let (Some(computed), Some(expected)) = (block_hash, expected_checksum) {
        if computed != expected {
            ctx.fail(FrameError::BlockChecksumMismatch);
        }
    }
    let _ = next.send(baton);
}

/// Reads a little-endian word; `None` on a short read or I/O failure.
fn read_u32<S: Source + ?Sized>(src: &mut S) -> Option<u32> {
    let mut b = [0u8; 4];
    match src.read_fill(&mut b) {
        Ok(4) => Some(u32::from_le_bytes(b)),
        _ => None,
    }
}
