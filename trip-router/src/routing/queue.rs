//! The search priority queue.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use super::State;

struct Entry {
    key: f64,
    seq: u64,
    state: Arc<State>,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Reversed: BinaryHeap is a max-heap.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .key
            .total_cmp(&self.key)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A min-priority queue of states.
///
/// Equal keys pop in insertion order. Entries are never updated in place;
/// a superseded state stays queued and is discarded when popped, which the
/// shortest-path tree's `visit` decides.
#[derive(Default)]
pub struct StateQueue {
    heap: BinaryHeap<Entry>,
    seq: u64,
}

impl StateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, state: Arc<State>, key: f64) {
        self.seq += 1;
        self.heap.push(Entry {
            key,
            seq: self.seq,
            state,
        });
    }

    /// The state with the lowest key, and that key.
    pub fn pop(&mut self) -> Option<(Arc<State>, f64)> {
        self.heap.pop().map(|e| (e.state, e.key))
    }

    pub fn peek_key(&self) -> Option<f64> {
        self.heap.peek().map(|e| e.key)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
