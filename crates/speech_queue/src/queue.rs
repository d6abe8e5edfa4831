//! Ordered hand-off between producers and the speech worker

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use tracing::debug;

use crate::error::SpeechError;
use crate::types::SpeechRequest;

/// Unbounded FIFO queue of speech requests
///
/// Cloning yields another handle to the same queue. Any number of clones may
/// enqueue concurrently; exactly one consumer is expected to dequeue.
#[derive(Debug, Clone)]
pub struct SpeechQueue {
    tx: Sender<SpeechRequest>,
    rx: Receiver<SpeechRequest>,
    closed: Arc<AtomicBool>,
}

impl Default for SpeechQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechQueue {
    /// Create an empty, open queue
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            tx,
            rx,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Append a request to the tail without blocking
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::QueueClosed` if the queue has been closed.
    pub fn enqueue(&self, request: SpeechRequest) -> Result<(), SpeechError> {
        if self.is_closed() {
            return Err(SpeechError::QueueClosed);
        }
        self.tx.send(request).map_err(|_| SpeechError::QueueClosed)
    }

    /// Remove the head of the queue, waiting at most `timeout`
    ///
    /// Returns `None` if nothing arrived in time.
    pub fn dequeue_blocking(&self, timeout: Duration) -> Option<SpeechRequest> {
        // `self` holds a sender, so the channel never disconnects
        self.rx.recv_timeout(timeout).ok()
    }

    /// Stop accepting requests and append the shutdown sentinel
    ///
    /// Only the first call appends the sentinel.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!(pending = self.len(), "Closing speech queue");
        // Cannot fail: `self` holds the receiver, so the channel is connected
        let _ = self.tx.send(SpeechRequest::Stop);
    }

    /// Whether [`close`](Self::close) has been called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of requests waiting
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether no requests are waiting
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    const SHORT: Duration = Duration::from_millis(10);

    #[test]
    fn delivers_in_enqueue_order() {
        let queue = SpeechQueue::new();
        for text in ["one", "two", "three"] {
            queue.enqueue(SpeechRequest::text(text)).unwrap();
        }

        assert_eq!(queue.dequeue_blocking(SHORT), Some(SpeechRequest::text("one")));
        assert_eq!(queue.dequeue_blocking(SHORT), Some(SpeechRequest::text("two")));
        assert_eq!(queue.dequeue_blocking(SHORT), Some(SpeechRequest::text("three")));
    }

    #[test]
    fn keeps_duplicates() {
        let queue = SpeechQueue::new();
        queue.enqueue(SpeechRequest::text("hello")).unwrap();
        queue.enqueue(SpeechRequest::text("hello")).unwrap();

        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn dequeue_times_out_when_empty() {
        let queue = SpeechQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.dequeue_blocking(SHORT), None);
    }

    #[test]
    fn close_appends_sentinel_after_pending_items() {
        let queue = SpeechQueue::new();
        queue.enqueue(SpeechRequest::text("last words")).unwrap();
        queue.close();

        assert!(queue.is_closed());
        assert_eq!(
            queue.dequeue_blocking(SHORT),
            Some(SpeechRequest::text("last words"))
        );
        assert_eq!(queue.dequeue_blocking(SHORT), Some(SpeechRequest::Stop));
    }

    #[test]
    fn close_is_idempotent() {
        let queue = SpeechQueue::new();
        queue.close();
        queue.close();

        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn enqueue_after_close_is_rejected() {
        let queue = SpeechQueue::new();
        queue.close();

        let result = queue.enqueue(SpeechRequest::text("too late"));
        assert!(matches!(result, Err(SpeechError::QueueClosed)));
    }

    #[test]
    fn clones_share_the_same_queue() {
        let queue = SpeechQueue::new();
        let producer = queue.clone();
        producer.enqueue(SpeechRequest::text("shared")).unwrap();

        assert_eq!(
            queue.dequeue_blocking(SHORT),
            Some(SpeechRequest::text("shared"))
        );
    }

    #[test]
    fn concurrent_producers_lose_nothing() {
        let queue = SpeechQueue::new();
        let handles: Vec<_> = (0..4)
            .map(|p| {
                let queue = queue.clone();
                thread::spawn(move || {
                    for i in 0..50 {
                        queue.enqueue(SpeechRequest::text(format!("{p}-{i}"))).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(queue.len(), 200);
    }

    #[test]
    fn dequeue_wakes_on_late_enqueue() {
        let queue = SpeechQueue::new();
        let producer = queue.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.enqueue(SpeechRequest::text("late")).unwrap();
        });

        assert_eq!(
            queue.dequeue_blocking(Duration::from_secs(2)),
            Some(SpeechRequest::text("late"))
        );
        handle.join().unwrap();
    }
}
