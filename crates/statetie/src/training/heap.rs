//! Bounded best-k selection over scored candidates.
//!
//! [`HeapSelector`] keeps the best `capacity` entries pushed into it, where
//! "best" is the highest score for [`HeapOrder::Max`] and the lowest for
//! [`HeapOrder::Min`]. Equal scores rank the lower key first, so results are
//! independent of push order.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Which end of the score range is preferred.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeapOrder {
    Max,
    Min,
}

/// A scored candidate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeapEntry {
    pub score: f64,
    pub key: u32,
}

impl HeapEntry {
    #[inline]
    pub fn new(score: f64, key: u32) -> Self {
        Self { score, key }
    }
}

/// Entry wrapper whose `Ord` makes "better" compare greater.
#[derive(Clone, Copy, Debug)]
struct Ranked {
    entry: HeapEntry,
    order: HeapOrder,
}

impl Ranked {
    fn rank(&self, other: &Self) -> Ordering {
        let by_score = match self.order {
            HeapOrder::Max => self.entry.score.total_cmp(&other.entry.score),
            HeapOrder::Min => other.entry.score.total_cmp(&self.entry.score),
        };
        by_score.then_with(|| other.entry.key.cmp(&self.entry.key))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.rank(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank(other)
    }
}

/// Retained entries. A bounded selector keeps the worst entry on top so it
/// can be replaced in `O(log k)`; an unbounded one keeps the best on top.
#[derive(Clone, Debug)]
enum Storage {
    WorstFirst(BinaryHeap<Reverse<Ranked>>),
    BestFirst(BinaryHeap<Ranked>),
}

/// Best-k selector backed by a binary heap.
#[derive(Clone, Debug)]
pub struct HeapSelector {
    order: HeapOrder,
    capacity: usize,
    storage: Storage,
}

impl HeapSelector {
    /// Keep at most `capacity` entries (at least one).
    pub fn bounded(order: HeapOrder, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            order,
            capacity,
            storage: Storage::WorstFirst(BinaryHeap::with_capacity(capacity)),
        }
    }

    /// Keep every entry; used as a plain priority queue.
    pub fn unbounded(order: HeapOrder) -> Self {
        Self { order, capacity: usize::MAX, storage: Storage::BestFirst(BinaryHeap::new()) }
    }

    #[inline]
    pub fn len(&self) -> usize {
        match &self.storage {
            Storage::WorstFirst(heap) => heap.len(),
            Storage::BestFirst(heap) => heap.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn order(&self) -> HeapOrder {
        self.order
    }

    /// Offer an entry. Returns `true` if it was retained.
    pub fn push(&mut self, score: f64, key: u32) -> bool {
        let ranked = Ranked { entry: HeapEntry::new(score, key), order: self.order };
        match &mut self.storage {
            Storage::BestFirst(heap) => {
                heap.push(ranked);
                true
            }
            Storage::WorstFirst(heap) => {
                if heap.len() < self.capacity {
                    heap.push(Reverse(ranked));
                    return true;
                }
                match heap.peek_mut() {
                    Some(mut worst) if ranked > worst.0 => {
                        *worst = Reverse(ranked);
                        true
                    }
                    _ => false,
                }
            }
        }
    }

    /// Best entry without removing it.
    ///
    /// `O(k)` on a bounded selector.
    pub fn peek(&self) -> Option<HeapEntry> {
        match &self.storage {
            Storage::BestFirst(heap) => heap.peek().map(|r| r.entry),
            Storage::WorstFirst(heap) => heap.iter().map(|r| r.0).max().map(|r| r.entry),
        }
    }

    /// Remove and return the best entry.
    ///
    /// `O(k)` on a bounded selector.
    pub fn pop(&mut self) -> Option<HeapEntry> {
        match &mut self.storage {
            Storage::BestFirst(heap) => heap.pop().map(|r| r.entry),
            Storage::WorstFirst(heap) => {
                let mut entries = std::mem::take(heap).into_vec();
                let best = entries
                    .iter()
                    .enumerate()
                    .max_by(|(_, a), (_, b)| a.0.cmp(&b.0))
                    .map(|(i, _)| i)?;
                let popped = entries.swap_remove(best);
                *heap = BinaryHeap::from(entries);
                Some(popped.0.entry)
            }
        }
    }

    /// All retained entries, best first.
    pub fn into_sorted_vec(self) -> Vec<HeapEntry> {
        match self.storage {
            // Ascending by `Reverse`, so best first.
            Storage::WorstFirst(heap) => heap.into_sorted_vec().into_iter().map(|r| r.0.entry).collect(),
            Storage::BestFirst(heap) => {
                heap.into_sorted_vec().into_iter().rev().map(|r| r.entry).collect()
            }
        }
    }
}
