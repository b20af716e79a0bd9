//! Bounded frame queue pair
//!
//! FIFO channel of `FrameBuffer` handles with explicit close semantics.
//! Sending blocks when the queue is full (backpressure against a capture
//! source that outpaces consumption); a send against a closed queue hands
//! the frame back to the caller so it is never dropped silently.

use async_channel::{bounded, Receiver, Sender, TrySendError};
use contracts::{ContractError, FrameBuffer};
use tracing::trace;

/// Create a bounded frame queue
///
/// Capacity is fixed at construction. No peek, no priority.
pub fn frame_queue(capacity: usize) -> (FrameSender, FrameReceiver) {
    let (tx, rx) = bounded(capacity);
    (FrameSender { tx }, FrameReceiver { rx })
}

/// Producer side of a frame queue
#[derive(Clone)]
pub struct FrameSender {
    tx: Sender<FrameBuffer>,
}

impl FrameSender {
    /// Send a frame, blocking until a slot frees up
    ///
    /// On a closed queue the frame comes back to the caller, who still owns
    /// its disposal.
    pub async fn send(&self, frame: FrameBuffer) -> Result<(), FrameBuffer> {
        trace!(seq = frame.seq, "queueing frame");
        self.tx.send(frame).await.map_err(|e| e.0)
    }

    /// Non-blocking send; a full or closed queue returns the frame
    pub fn try_send(&self, frame: FrameBuffer) -> Result<(), FrameBuffer> {
        self.tx.try_send(frame).map_err(|e| match e {
            TrySendError::Full(f) | TrySendError::Closed(f) => f,
        })
    }

    /// Number of frames currently queued
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    /// Whether the queue holds no frames
    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    /// Close the queue; pending frames remain receivable
    pub fn close(&self) {
        self.tx.close();
    }
}

/// Consumer side of a frame queue
#[derive(Clone)]
pub struct FrameReceiver {
    rx: Receiver<FrameBuffer>,
}

impl FrameReceiver {
    /// Receive the next frame, blocking until one is available
    ///
    /// A closed and drained queue reports `CaptureUnavailable`, never a frame.
    pub async fn recv(&self) -> Result<FrameBuffer, ContractError> {
        self.rx
            .recv()
            .await
            .map_err(|_| ContractError::CaptureUnavailable)
    }

    /// Number of frames currently queued
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether the queue holds no frames
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Close the queue from the consumer side
    pub fn close(&self) {
        self.rx.close();
    }
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
            PixelFormat::Jpeg,
            Bytes::from_static(b"\xff\xd8\xff\xd9"),
        )
    }

    #[tokio::test]
    async fn fifo_order_preserved() {
        let (tx, rx) = frame_queue(8);
        for seq in 0..5 {
            tx.send(frame(seq)).await.unwrap();
        }
        for seq in 0..5 {
            assert_eq!(rx.recv().await.unwrap().seq, seq);
        }
    }

    #[tokio::test]
    async fn closed_queue_reports_capture_unavailable() {
        let (tx, rx) = frame_queue(2);
        tx.close();
        let err = rx.recv().await.unwrap_err();
        assert!(matches!(err, ContractError::CaptureUnavailable));
    }

    #[tokio::test]
    async fn closed_queue_drains_before_reporting() {
        let (tx, rx) = frame_queue(2);
        tx.send(frame(7)).await.unwrap();
        tx.close();
        assert_eq!(rx.recv().await.unwrap().seq, 7);
        assert!(rx.recv().await.is_err());
    }

    #[tokio::test]
    async fn send_to_closed_queue_returns_frame() {
        let (tx, rx) = frame_queue(2);
        rx.close();
        let returned = tx.send(frame(3)).await.unwrap_err();
        assert_eq!(returned.seq, 3);
    }

    #[tokio::test]
    async fn full_queue_blocks_until_slot_frees() {
        let (tx, rx) = frame_queue(1);
        tx.send(frame(0)).await.unwrap();

        let tx2 = tx.clone();
        let sender = tokio::spawn(async move { tx2.send(frame(1)).await });

        // The second send must not complete before a recv frees a slot
        tokio::task::yield_now().await;
        assert!(!sender.is_finished());

        assert_eq!(rx.recv().await.unwrap().seq, 0);
        sender.await.unwrap().unwrap();
        assert_eq!(rx.recv().await.unwrap().seq, 1);
    }

    #[tokio::test]
    async fn try_send_full_returns_frame() {
        let (tx, _rx) = frame_queue(1);
        tx.try_send(frame(0)).unwrap();
        let back = tx.try_send(frame(1)).unwrap_err();
        assert_eq!(back.seq, 1);
    }
}
