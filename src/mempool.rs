//! Fixed-capacity pool of reusable block buffers.
//!
//! Every in-flight block of the pipeline owns exactly one source buffer (and
//! compressible blocks one destination buffer), all drawn from a [`MemPool`].
//! `alloc` blocks once `capacity` buffers are outstanding, which is the
//! pipeline's only backpressure mechanism: the pool size bounds in-flight
//! blocks and therefore peak memory.
//!
//! The free-list is a `crossbeam_channel::bounded` channel: releasing a
//! buffer sends it back and wakes exactly one blocked `alloc`.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::Mutex;

/// Bounded pool handing out [`PoolBuffer`]s of a fixed byte size.
///
/// Buffers are created lazily, up to `capacity`, and reused afterwards.
pub struct MemPool {
    block_size: usize,
    capacity: usize,
    /// Number of buffers created so far; guarded so that the lazy-create
    /// path never exceeds `capacity`.
    created: Mutex<usize>,
    free_tx: Sender<Vec<u8>>,
    free_rx: Receiver<Vec<u8>>,
}

impl MemPool {
    /// Creates a pool of up to `capacity` buffers of `block_size` bytes each.
    ///
    /// `capacity` is clamped to at least 1 so `alloc` can always make
    /// progress.
    pub fn new(block_size: usize, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (free_tx, free_rx) = bounded(capacity);
        MemPool {
            block_size,
            capacity,
            created: Mutex::new(0),
            free_tx,
            free_rx,
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Takes a buffer out of the pool, blocking until one is available.
    ///
    /// Prefers a previously released buffer; otherwise creates a new one
    /// while fewer than `capacity` exist; otherwise parks until a
    /// [`PoolBuffer`] is dropped elsewhere.
    pub fn alloc(&self) -> PoolBuffer {
        if let Ok(data) = self.free_rx.try_recv() {
            return self.wrap(data);
        }
        {
            let mut created = self.created.lock().unwrap();
            if *created < self.capacity {
                *created += 1;
                drop(created);
                return self.wrap(vec![0u8; self.block_size]);
            }
        }
        let data = self
            .free_rx
            .recv()
            .expect("buffer pool free-list disconnected");
        self.wrap(data)
    }

    fn wrap(&self, data: Vec<u8>) -> PoolBuffer {
        PoolBuffer {
            data: Some(data),
            filled: 0,
            home: self.free_tx.clone(),
        }
    }
}

/// A block buffer on loan from a [`MemPool`].
///
/// The buffer's capacity is always the pool's block size; `filled` tracks how
/// much of it currently holds meaningful bytes. Dropping the handle returns
/// the storage to its pool and wakes one blocked `alloc`.
pub struct PoolBuffer {
    data: Option<Vec<u8>>,
    filled: usize,
    home: Sender<Vec<u8>>,
}

impl PoolBuffer {
    /// Total capacity in bytes (the pool's block size).
    pub fn capacity(&self) -> usize {
        self.data.as_ref().map_or(0, Vec::len)
    }

    /// The full backing storage, for the owner to fill.
    pub fn storage_mut(&mut self) -> &mut [u8] {
        self.data.as_mut().map_or(&mut [], Vec::as_mut_slice)
    }

    /// Records how many bytes of the storage are meaningful.
    ///
    /// `n` must not exceed [`Self::capacity`].
    pub fn set_filled(&mut self, n: usize) {
        debug_assert!(n <= self.capacity());
        self.filled = n;
    }

    /// The filled prefix of the buffer.
    pub fn filled(&self) -> &[u8] {
        match self.data.as_ref() {
            Some(d) => &d[..self.filled],
            None => &[],
        }
    }

    pub fn filled_len(&self) -> usize {
        self.filled
    }
}

impl Drop for PoolBuffer {
    fn drop(&mut self) {
        if let Some(data) = self.data.take() {
            // The pool may already be gone during teardown; dropping the
            // storage outright is fine then.
            let _ = self.home.send(data);
        }
    }
}
