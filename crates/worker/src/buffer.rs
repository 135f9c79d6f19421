//! Bounded drop-oldest buffer of encoded frames.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

/// Default number of frames buffered per stream.
pub const DEFAULT_CAPACITY: usize = 10;

struct Inner {
    frames: VecDeque<Vec<u8>>,
    closed: bool,
    dropped: u64,
}

/// Hands annotated JPEG frames from a stream worker to viewers.
///
/// The producer never blocks: when the buffer is full the oldest frame is
/// discarded. Viewers that fall behind see the most recent frames only.
pub struct FrameBuffer {
    inner: Mutex<Inner>,
    notify: Notify,
    capacity: usize,
}

impl FrameBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                frames: VecDeque::with_capacity(capacity.max(1)),
                closed: false,
                dropped: 0,
            }),
            notify: Notify::new(),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a frame, evicting the oldest one if the buffer is full.
    /// Frames pushed after [`close`](Self::close) are ignored.
    pub fn push(&self, frame: Vec<u8>) {
        {
            let mut inner = self.lock();
            if inner.closed {
                return;
            }
            if inner.frames.len() >= self.capacity {
                inner.frames.pop_front();
                inner.dropped += 1;
            }
            inner.frames.push_back(frame);
        }
        self.notify.notify_one();
    }

    /// Wait for the next frame. `None` once the buffer is closed and drained.
    pub async fn next(&self) -> Option<Vec<u8>> {
        loop {
            let notified = self.notify.notified();
            {
                let mut inner = self.lock();
                if let Some(frame) = inner.frames.pop_front() {
                    return Some(frame);
                }
                if inner.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Mark the stream as ended and wake every waiting viewer.
    pub fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Frames evicted because no viewer consumed them in time.
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn full_buffer_drops_oldest() {
        let buffer = FrameBuffer::new(3);
        for i in 0..5u8 {
            buffer.push(vec![i]);
        }

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.dropped(), 2);
    }

    #[tokio::test]
    async fn frames_come_out_in_order() {
        let buffer = FrameBuffer::new(3);
        for i in 0..5u8 {
            buffer.push(vec![i]);
        }

        assert_eq!(buffer.next().await, Some(vec![2]));
        assert_eq!(buffer.next().await, Some(vec![3]));
        assert_eq!(buffer.next().await, Some(vec![4]));
    }

    #[tokio::test]
    async fn close_drains_then_ends() {
        let buffer = FrameBuffer::new(3);
        buffer.push(vec![1]);
        buffer.close();
        buffer.push(vec![2]);

        assert_eq!(buffer.next().await, Some(vec![1]));
        assert_eq!(buffer.next().await, None);
    }

    #[tokio::test]
    async fn waiting_viewer_is_woken_by_push() {
        let buffer = Arc::new(FrameBuffer::new(3));
        let viewer = tokio::spawn({
            let buffer = buffer.clone();
            async move { buffer.next().await }
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        buffer.push(vec![9]);

        assert_eq!(viewer.await.unwrap(), Some(vec![9]));
    }

    #[tokio::test]
    async fn waiting_viewer_is_woken_by_close() {
        let buffer = Arc::new(FrameBuffer::new(3));
        let viewer = tokio::spawn({
            let buffer = buffer.clone();
            async move { buffer.next().await }
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        buffer.close();

        assert_eq!(viewer.await.unwrap(), None);
    }
}
