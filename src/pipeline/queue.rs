//! Bounded inter-stage queue with explicit backpressure policies.
//!
//! Two producers exist in the pipeline and they want different behavior
//! when a queue fills up: the capture side keeps the freshest audio by
//! dropping the oldest chunk, while the buffering side refuses the push and
//! lets the caller retry. Both policies live here so the stages stay small.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::Notify;

// ---------------------------------------------------------------------------
// PushOutcome
// ---------------------------------------------------------------------------

/// Result of a [`BoundedQueue::push_drop_oldest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The item was enqueued with capacity to spare.
    Accepted,
    /// The queue was full; the oldest item was evicted to make room.
    DroppedOldest,
}

// ---------------------------------------------------------------------------
// BoundedQueue
// ---------------------------------------------------------------------------

/// Fixed-capacity FIFO shared between one producer and one consumer task.
///
/// Pushes are non-blocking and callable from non-async contexts (the audio
/// device callback pushes directly). The consumer side is async and waits
/// with a timeout so worker loops keep ticking during silence.
pub struct BoundedQueue<T> {
    capacity: usize,
    items: Mutex<VecDeque<T>>,
    notify: Notify,
}

impl<T> BoundedQueue<T> {
    /// Capacity zero is coerced to one so a queue can always hold an item.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            items: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }

    /// Enqueue, evicting the oldest item when full.
    pub fn push_drop_oldest(&self, item: T) -> PushOutcome {
        let outcome = {
            let mut items = self.items.lock().unwrap();
            if items.len() >= self.capacity {
                items.pop_front();
                items.push_back(item);
                PushOutcome::DroppedOldest
            } else {
                items.push_back(item);
                PushOutcome::Accepted
            }
        };
        self.notify.notify_one();
        outcome
    }

    /// Enqueue, handing the item back when full.
    pub fn try_push(&self, item: T) -> Result<(), T> {
        {
            let mut items = self.items.lock().unwrap();
            if items.len() >= self.capacity {
                return Err(item);
            }
            items.push_back(item);
        }
        self.notify.notify_one();
        Ok(())
    }

    /// Dequeue, waiting up to `timeout` for an item to arrive.
    ///
    /// Returns `None` on timeout. Wakeups can race with the producer, so
    /// the notified future is registered before the queue is re-checked.
    pub async fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            if let Some(item) = self.items.lock().unwrap().pop_front() {
                return Some(item);
            }
            match tokio::time::timeout_at(deadline, notified).await {
                Ok(()) => continue,
                Err(_) => return self.items.lock().unwrap().pop_front(),
            }
        }
    }

    /// Dequeue immediately if an item is available.
    pub fn try_pop(&self) -> Option<T> {
        self.items.lock().unwrap().pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().unwrap().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Discard all queued items.
    pub fn clear(&self) {
        self.items.lock().unwrap().clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
