//! Frame buffer pool
//!
//! Shared between the capture source and the dispatcher. Recycling moves the
//! `FrameBuffer` into the pool, so a recycled buffer can never be disposed a
//! second time by the recycler.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use contracts::FrameBuffer;
use tracing::trace;

/// Reusable frame buffer pool
///
/// Cheap to clone (`Arc` internally); producer and dispatcher hold the same
/// pool. Buffers above `max_retained` are released instead of retained.
#[derive(Clone)]
pub struct FramePool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    buffers: Mutex<VecDeque<FrameBuffer>>,
    max_retained: usize,
    recycled: AtomicU64,
    acquired: AtomicU64,
    released: AtomicU64,
}

impl FramePool {
    /// Create a pool retaining at most `max_retained` buffers
    pub fn new(max_retained: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                buffers: Mutex::new(VecDeque::with_capacity(max_retained)),
                max_retained,
                recycled: AtomicU64::new(0),
                acquired: AtomicU64::new(0),
                released: AtomicU64::new(0),
            }),
        }
    }

    /// Return a buffer to the pool for reuse
    ///
    /// When the pool is at capacity the buffer is released instead: still
    /// exactly one disposal.
    pub fn recycle(&self, frame: FrameBuffer) {
        let mut buffers = self.inner.buffers.lock().expect("frame pool poisoned");
        if buffers.len() < self.inner.max_retained {
            trace!(seq = frame.seq, "frame recycled into pool");
            buffers.push_back(frame);
            self.inner.recycled.fetch_add(1, Ordering::Relaxed);
        } else {
            drop(frame);
            self.inner.released.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Take a buffer out of the pool, if one is available
    pub fn acquire(&self) -> Option<FrameBuffer> {
        let frame = self
            .inner
            .buffers
            .lock()
            .expect("frame pool poisoned")
            .pop_front();
        if frame.is_some() {
            self.inner.acquired.fetch_add(1, Ordering::Relaxed);
        }
        frame
    }

    /// Number of buffers currently retained
    pub fn retained(&self) -> usize {
        self.inner.buffers.lock().expect("frame pool poisoned").len()
    }

    /// Get counter snapshot
    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            retained: self.retained(),
            recycled: self.inner.recycled.load(Ordering::Relaxed),
            acquired: self.inner.acquired.load(Ordering::Relaxed),
            released: self.inner.released.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of pool counters (for reporting)
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolSnapshot {
    pub retained: usize,
    pub recycled: u64,
    pub acquired: u64,
    pub released: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::{FrameTimestamp, PixelFormat};

    fn frame(seq: u64) -> FrameBuffer {
        FrameBuffer::new(
            seq,
            FrameTimestamp::default(),
            PixelFormat::Rgb565,
            Bytes::from_static(&[0u8; 16]),
        )
    }

    #[test]
    fn recycle_then_acquire() {
        let pool = FramePool::new(4);
        pool.recycle(frame(1));
        assert_eq!(pool.retained(), 1);

        let got = pool.acquire().unwrap();
        assert_eq!(got.seq, 1);
        assert_eq!(pool.retained(), 0);
        assert!(pool.acquire().is_none());
    }

    #[test]
    fn overflow_releases_instead_of_retaining() {
        let pool = FramePool::new(1);
        pool.recycle(frame(1));
        pool.recycle(frame(2));

        let snap = pool.snapshot();
        assert_eq!(snap.retained, 1);
        assert_eq!(snap.recycled, 1);
        assert_eq!(snap.released, 1);
    }

    #[test]
    fn shared_across_clones() {
        let pool = FramePool::new(4);
        let producer_side = pool.clone();
        producer_side.recycle(frame(5));
        assert_eq!(pool.retained(), 1);
        assert_eq!(pool.snapshot().recycled, 1);
    }
}
