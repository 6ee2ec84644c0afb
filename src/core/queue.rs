use std::collections::VecDeque;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Notify;

/// Thread-safe FIFO buffer of message payloads, one instance per queue name.
///
/// Unbounded: backpressure comes from the dispatcher's one-dequeue-per-round
/// policy, not from the buffer itself. The embedded [`Notify`] carries the
/// wake-on-enqueue signal the dispatcher sleeps on; a signal fired while
/// nobody is waiting is retained, so wake-ups between checks are never lost.
#[derive(Debug, Default)]
pub struct MessageQueue {
    items: Mutex<VecDeque<Bytes>>,
    wake: Notify,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a payload at the tail and wakes the queue's dispatcher.
    pub fn enqueue(&self, payload: Bytes) {
        self.items.lock().push_back(payload);
        self.wake.notify_one();
    }

    /// Removes and returns the head payload. Never blocks.
    pub fn dequeue(&self) -> Option<Bytes> {
        self.items.lock().pop_front()
    }

    /// Returns the head payload without removing it.
    pub fn peek(&self) -> Option<Bytes> {
        self.items.lock().front().cloned()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Wakes the queue's dispatcher without enqueuing (fired on join).
    pub fn notify(&self) {
        self.wake.notify_one();
    }

    /// Waits until the next enqueue or join signal.
    pub async fn notified(&self) {
        self.wake.notified().await;
    }
}
