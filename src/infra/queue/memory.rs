//! In-memory priority queue, stable within a priority band.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

use crate::core::TaskQueue;
use crate::util::serde::Priority;

/// Heap entry ordered by priority (highest first) and FIFO within priority.
struct PriorityEntry<J> {
    priority: Priority,
    seq: u64,
    item: J,
}

impl<J> PartialEq for PriorityEntry<J> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl<J> Eq for PriorityEntry<J> {}

impl<J> PartialOrd for PriorityEntry<J> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<J> Ord for PriorityEntry<J> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher priority first; earlier arrival wins a tie (reversed for max-heap)
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Unbounded in-memory queue using a priority heap.
/// This provides O(log n) enqueue and O(log n) dequeue operations.
///
/// Each enqueue takes a fresh arrival number, so an item put back after a
/// failed attempt queues behind everything already waiting at its priority.
pub struct InMemoryQueue<J> {
    entries: BinaryHeap<PriorityEntry<J>>,
    next_seq: u64,
}

impl<J> InMemoryQueue<J> {
    /// Create an empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Create an empty queue with room for `capacity` items.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: BinaryHeap::with_capacity(capacity),
            next_seq: 0,
        }
    }

    /// Priority of the item that would be dequeued next.
    #[must_use]
    pub fn peek_priority(&self) -> Option<Priority> {
        self.entries.peek().map(|entry| entry.priority)
    }
}

impl<J> Default for InMemoryQueue<J> {
    fn default() -> Self {
        Self::new()
    }
}

impl<J> TaskQueue<J> for InMemoryQueue<J> {
    fn enqueue(&mut self, priority: Priority, item: J) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(PriorityEntry {
            priority,
            seq,
            item,
        });
    }

    fn dequeue_highest(&mut self) -> Option<J> {
        self.entries.pop().map(|entry| entry.item)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn drain(&mut self) -> Vec<J> {
        let mut drained = Vec::with_capacity(self.entries.len());
        while let Some(entry) = self.entries.pop() {
            drained.push(entry.item);
        }
        drained
    }
}

impl<J> fmt::Debug for InMemoryQueue<J> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryQueue")
            .field("len", &self.entries.len())
            .field("next_seq", &self.next_seq)
            .finish()
    }
}
