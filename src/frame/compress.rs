//! Frame encoding: the driver and the per-block encode task.
//!
//! The driver validates the descriptor, writes the header, then reads the
//! source one block at a time. Each block becomes a task: compression and
//! the optional block checksum run unordered across worker threads, while
//! the on-wire write and the content-hash update happen under the commit
//! baton, so the output and the stream hash both observe exact input order.
//! Admission blocks on the source buffer pool, which bounds in-flight blocks
//! and peak memory.

use std::io::Write;

use crate::codec::BlockCodec;
use crate::frame::header;
use crate::frame::pipeline::{self, BatonRx, BatonTx, ChecksumFlags, PipelineCtx};
use crate::frame::types::{
    FrameDescriptor, FrameError, FrameResult, Mode, BLOCK_UNCOMPRESSED_FLAG, CHECKSUM_SEED,
    EOS_MARKER,
};
use crate::io::Source;
use crate::mempool::{MemPool, PoolBuffer};
use crate::util::count_cores;
use crate::xxhash::xxh32_oneshot;

/// Encodes one complete frame: header, blocks in input order, EOS marker,
/// and the content checksum when the descriptor asks for one.
///
/// `codec` provides the block primitive; a result ≤ 0 or ≥ the block's size
/// stores the block raw with the high bit of its size word set.
pub fn compress<S, W, C>(
    src: &mut S,
    dst: &mut W,
    codec: &C,
    sd: &FrameDescriptor,
    mode: Mode,
) -> FrameResult<()>
where
    S: Source,
    W: Write + Send,
    C: BlockCodec + ?Sized,
{
    header::validate(sd)?;
    let head = header::encode(sd);
    if dst.write_all(&head).is_err() {
        return Err(FrameError::CannotWriteHeader);
    }

    let block_size = sd.max_block_size();
    let flags = ChecksumFlags {
        block: sd.flg.block_checksum,
        stream: sd.flg.stream_checksum,
    };
    let sequential = mode.is_sequential();
    let pool_capacity = if sequential { 1 } else { count_cores() + 1 };
    let src_pool = MemPool::new(block_size, pool_capacity);
    let dst_pool = MemPool::new(block_size, pool_capacity);
    let ctx = PipelineCtx::new();

    std::thread::scope(|s| {
        let mut prev_rx = pipeline::open_chain(dst);
        loop {
            if ctx.error() {
                break;
            }
            // Backpressure: blocks here while `pool_capacity` blocks are
            // still in flight.
            let mut buf = src_pool.alloc();
            let n = match src.read_fill(buf.storage_mut()) {
                Ok(n) => n,
                Err(_) => {
                    ctx.set_error(FrameError::Error);
                    break;
                }
            };
            if n == 0 {
                break;
            }
            buf.set_filled(n);

            let (next_tx, next_rx) = pipeline::extend_chain();
            let prev = std::mem::replace(&mut prev_rx, next_rx);
            if sequential {
                encode_block(&ctx, codec, &dst_pool, flags, buf, prev, next_tx);
            } else {
                let (ctx, dst_pool) = (&ctx, &dst_pool);
                s.spawn(move || encode_block(ctx, codec, dst_pool, flags, buf, prev, next_tx));
            }
        }

        // The baton only comes back once every task has committed.
        let mut baton = prev_rx.recv().expect("commit chain broken");
        if !baton.write_u32(&ctx, EOS_MARKER) {
            ctx.set_error(FrameError::CannotWriteEos);
            return;
        }
        if flags.stream {
            let digest = baton.xxh.digest();
            if !baton.write_u32(&ctx, digest) {
                ctx.set_error(FrameError::CannotWriteStreamChecksum);
            }
        }
    });

    ctx.finish()
}

/// One encode task: compress off-order, commit in order.
fn encode_block<'a, C, W>(
    ctx: &PipelineCtx,
    codec: &C,
    dst_pool: &MemPool,
    flags: ChecksumFlags,
    src: PoolBuffer,
    prev: BatonRx<'a, W>,
    next: BatonTx<'a, W>,
) where
    C: BlockCodec + ?Sized,
    W: Write,
{
    if ctx.error() {
        pipeline::forward(&prev, &next);
        return;
    }

    let n = src.filled_len();
    let compressed = {
        let mut dst = dst_pool.alloc();
        let cmp = codec.compress(src.filled(), dst.storage_mut());
        if cmp <= 0 || cmp as usize >= n {
            // Stored raw; the output buffer goes back to its pool before the
            // commit wait rather than across it.
            None
        } else {
            dst.set_filled(cmp as usize);
            Some(dst)
        }
    };
    let payload: &[u8] = match &compressed {
        Some(d) => d.filled(),
        None => src.filled(),
    };
    let block_hash = if flags.block {
        Some(xxh32_oneshot(payload, CHECKSUM_SEED))
    } else {
        None
    };

    let mut baton = prev.recv().expect("commit chain broken");
    if flags.stream {
        // The content hash covers the source bytes, in input order.
        baton.xxh.update(src.filled());
    }
    let size_word = match &compressed {
        Some(d) => d.filled_len() as u32,
        None => n as u32 | BLOCK_UNCOMPRESSED_FLAG,
    };
    baton.write_u32(ctx, size_word);
    baton.write_bin(ctx, payload);
    if let Some(h) = block_hash {
        baton.write_u32(ctx, h);
    }
    let _ = next.send(baton);
}
