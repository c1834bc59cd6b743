//! Shared machinery of the block pipeline: cancellation state and the
//! ordered-commit baton.
//!
//! Ordering model: each block task owns one link of a channel chain. A
//! [`Baton`] carrying the output sink and the streaming content hash is
//! passed from ordinal `i-1` to `i`; a task may only write its on-wire bytes
//! and update the stream hash while holding the baton, so commits observe
//! input order by construction and the sink and hash need no locking. Every
//! task, on every path including the error paths, receives and forwards the
//! baton exactly once, which keeps the chain from stalling.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::frame::types::{FrameError, FrameResult, CHECKSUM_SEED};
use crate::xxhash::StreamHash;

// ─────────────────────────────────────────────────────────────────────────────
// PipelineCtx — cancellation flag + sticky result slot
// ─────────────────────────────────────────────────────────────────────────────

/// Per-frame shared state: an atomic quit flag and the frame's result slot.
///
/// The slot is sticky: a new error only lands when the slot is empty or
/// holds the coarse [`FrameError::Error`] sentinel, so the first specific
/// error always wins. Tasks observing either signal return without side
/// effects.
pub(crate) struct PipelineCtx {
    quit: AtomicBool,
    result: Mutex<Option<FrameError>>,
}

impl PipelineCtx {
    pub fn new() -> Self {
        PipelineCtx {
            quit: AtomicBool::new(false),
            result: Mutex::new(None),
        }
    }

    /// Whether the quit flag is raised.
    #[inline]
    pub fn cancelled(&self) -> bool {
        self.quit.load(Ordering::SeqCst)
    }

    /// Whether any error has been recorded.
    pub fn error(&self) -> bool {
        self.result.lock().unwrap().is_some()
    }

    /// Records `e` unless a specific error is already latched. Returns the
    /// error now occupying the slot.
    pub fn set_error(&self, e: FrameError) -> FrameError {
        let mut slot = self.result.lock().unwrap();
        match *slot {
            None => *slot = Some(e),
            Some(current) if current.is_generic() => *slot = Some(e),
            Some(_) => {}
        }
        (*slot).unwrap_or(e)
    }

    /// Records `e` and raises the quit flag.
    pub fn fail(&self, e: FrameError) {
        self.set_error(e);
        self.quit.store(true, Ordering::SeqCst);
    }

    /// The frame's final result.
    pub fn finish(&self) -> FrameResult<()> {
        match *self.result.lock().unwrap() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Which of the frame's optional checksums are active, as the tasks need it.
#[derive(Clone, Copy)]
pub(crate) struct ChecksumFlags {
    /// Each block is followed by an XXH32 of its on-wire payload.
    pub block: bool,
    /// The frame trails an XXH32 of the logical stream.
    pub stream: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Baton — exclusive commit rights, passed along the ordinal chain
// ─────────────────────────────────────────────────────────────────────────────

/// The commit token: holding it grants exclusive access to the output sink
/// and the stream hash.
pub(crate) struct Baton<'a, W> {
    pub sink: &'a mut W,
    pub xxh: StreamHash,
}

impl<'a, W: Write> Baton<'a, W> {
    pub fn new(sink: &'a mut W) -> Self {
        Baton {
            sink,
            xxh: StreamHash::new(CHECKSUM_SEED),
        }
    }

    /// Writes a little-endian word. Refuses once an error is latched;
    /// latches the coarse sentinel on I/O failure. Returns whether the
    /// write happened.
    pub fn write_u32(&mut self, ctx: &PipelineCtx, v: u32) -> bool {
        self.write_bin(ctx, &v.to_le_bytes())
    }

    /// Writes raw bytes under the same error discipline as
    /// [`Baton::write_u32`].
    pub fn write_bin(&mut self, ctx: &PipelineCtx, data: &[u8]) -> bool {
        if ctx.error() {
            return false;
        }
        if self.sink.write_all(data).is_err() {
            ctx.set_error(FrameError::Error);
            return false;
        }
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Chain plumbing
// ─────────────────────────────────────────────────────────────────────────────

/// One link of the commit chain: the receiving end for ordinal `i`, the
/// sending end toward `i+1`.
pub(crate) type BatonRx<'a, W> = Receiver<Baton<'a, W>>;
pub(crate) type BatonTx<'a, W> = Sender<Baton<'a, W>>;

/// Opens the chain: a pre-loaded link holding the frame's baton.
pub(crate) fn open_chain<W: Write>(sink: &mut W) -> BatonRx<'_, W> {
    let (tx, rx) = bounded(1);
    tx.send(Baton::new(sink))
        .expect("fresh commit chain cannot be full");
    rx
}

/// Adds a link after `rx` for the next task to hand off through.
pub(crate) fn extend_chain<'a, W>() -> (BatonTx<'a, W>, BatonRx<'a, W>) {
    bounded(1)
}

/// Receives the baton and passes it on unchanged. Used by tasks that bail
/// out before (or instead of) committing; the chain must keep flowing.
pub(crate) fn forward<'a, W>(prev: &BatonRx<'a, W>, next: &BatonTx<'a, W>) {
    if let Ok(baton) = prev.recv() {
        let _ = next.send(baton);
    }
}
