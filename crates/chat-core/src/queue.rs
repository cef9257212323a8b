//! Bounded multi-producer / single-consumer message queue.
//!
//! A fixed ring of slots guarded by a plain mutex, plus two notifiers:
//! `not_full` wakes producers parked on a full ring and `not_empty`
//! wakes the consumer parked on an empty one.
//!
//! The mutex is only held for the slot copy and counter update, never
//! across an `.await`. Waiters always re-check the ring after waking,
//! so stale `Notify` permits behave like spurious wakeups.
//!
//! Ordering is FIFO in lock-acquisition order: two producers racing on
//! `push` are serialized by the mutex, and whichever wins is delivered
//! first.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

/// Slot count used by the server when nothing else is configured.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

#[derive(Debug)]
struct Ring<T> {
    slots: Box<[Option<T>]>,
    /// Next slot to write.
    write: usize,
    /// Next slot to read.
    read: usize,
    /// `produced - consumed`.
    occupied: usize,
}

impl<T> Ring<T> {
    fn with_capacity(capacity: usize) -> Self {
        Ring {
            slots: (0..capacity).map(|_| None).collect(),
            write: 0,
            read: 0,
            occupied: 0,
        }
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn put(&mut self, item: T) -> Result<(), T> {
        if self.occupied == self.capacity() {
            return Err(item);
        }
        debug_assert!(self.slots[self.write].is_none());
        self.slots[self.write] = Some(item);
        self.write = (self.write + 1) % self.capacity();
        self.occupied += 1;
        Ok(())
    }

    fn take(&mut self) -> Option<T> {
        if self.occupied == 0 {
            return None;
        }
        let item = self.slots[self.read].take();
        debug_assert!(item.is_some());
        self.read = (self.read + 1) % self.capacity();
        self.occupied -= 1;
        item
    }
}

/// Fixed-capacity queue with blocking (`await`ing) push and pop.
#[derive(Debug)]
pub struct MessageQueue<T> {
    ring: Mutex<Ring<T>>,
    not_full: Notify,
    not_empty: Notify,
}

impl<T> MessageQueue<T> {
    /// Create a queue with `capacity` slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; a zero-slot queue could never make
    /// progress.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "message queue capacity must be non-zero");
        MessageQueue {
            ring: Mutex::new(Ring::with_capacity(capacity)),
            not_full: Notify::new(),
            not_empty: Notify::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.lock().occupied
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        let ring = self.lock();
        ring.occupied == ring.capacity()
    }

    /// Enqueue without waiting. Hands the item back if the ring is full.
    pub fn try_push(&self, item: T) -> Result<(), T> {
        self.lock().put(item)?;
        self.not_empty.notify_one();
        Ok(())
    }

    /// Dequeue without waiting.
    pub fn try_pop(&self) -> Option<T> {
        let item = self.lock().take()?;
        self.not_full.notify_one();
        Some(item)
    }

    /// Enqueue `item`, waiting while the ring is full.
    ///
    /// This is the backpressure point: a slow consumer stalls every
    /// producer once all slots are taken. Nothing is ever dropped, but
    /// cancelling this future before it resolves discards `item`.
    pub async fn push(&self, item: T) {
        let mut item = item;
        loop {
            // Register interest before checking, so a pop that lands
            // between the check and the await is not missed.
            let notified = self.not_full.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.try_push(item) {
                Ok(()) => return,
                Err(rejected) => item = rejected,
            }
            notified.await;
        }
    }

    /// Dequeue the oldest item, waiting while the ring is empty.
    ///
    /// Cancel-safe: an item is only taken in the poll that returns it.
    pub async fn pop(&self) -> T {
        loop {
            let notified = self.not_empty.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(item) = self.try_pop() {
                return item;
            }
            notified.await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Ring<T>> {
        // The ring is consistent after every statement, so a panic in
        // another holder leaves nothing half-written.
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
