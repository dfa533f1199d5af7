// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
FIFO queue connecting two pipeline stages.

The producer pushes without blocking; the consumer either polls or waits on
the queue's condition variable. Queues are always shared through `Arc`, so
both ends observe the same buffer.
*/

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Thread-safe FIFO, bounded when `max_size > 0`
pub struct InputQueue<T> {
    queue: Mutex<VecDeque<T>>,
    available: Condvar,
    max_size: usize,
}

impl<T> InputQueue<T> {
    /// `max_size == 0` means unbounded
    pub fn new(max_size: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            max_size,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(0)
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn is_bounded(&self) -> bool {
        self.max_size > 0
    }

    /// Append an item
    ///
    /// Returns `false` and drops the item when a bounded queue is full.
    pub fn push(&self, item: T) -> bool {
        let mut queue = self.queue.lock();
        if self.max_size > 0 && queue.len() >= self.max_size {
            return false;
        }
        queue.push_back(item);
        drop(queue);
        self.available.notify_one();
        true
    }

    /// Take the oldest item without waiting
    pub fn pop(&self) -> Option<T> {
        self.queue.lock().pop_front()
    }

    /// Take the oldest item, waiting up to `timeout` for one to arrive
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut queue = self.queue.lock();
        while queue.is_empty() {
            if self.available.wait_until(&mut queue, deadline).timed_out() {
                break;
            }
        }
        queue.pop_front()
    }

    /// Take every pending item, oldest first
    pub fn drain_all(&self) -> Vec<T> {
        self.queue.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    pub fn clear(&self) {
        self.queue.lock().clear();
    }
}

impl<T: Clone> InputQueue<T> {
    /// Copy of the oldest item, leaving it queued
    pub fn front(&self) -> Option<T> {
        self.queue.lock().front().cloned()
    }
}

impl<T> Default for InputQueue<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl<T> std::fmt::Debug for InputQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputQueue")
            .field("len", &self.len())
            .field("max_size", &self.max_size)
            .finish()
    }
}
