//! Bounded mini-statement of recent transactions.

use std::collections::VecDeque;

use crate::types::Transaction;

/// A fixed-capacity, insertion-ordered ring of transactions.
///
/// Once full, every push evicts the oldest entry. A capacity of zero retains
/// nothing.
#[derive(Debug, Clone)]
pub struct MiniStatement {
    entries: VecDeque<Transaction>,
    capacity: usize,
}

impl MiniStatement {
    /// Creates an empty statement.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of entries retained; 0 retains nothing
    pub fn with_capacity(capacity: usize) -> Self {
        MiniStatement {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `tx` at the newest end, returning the evicted oldest entry, if any.
    pub fn push(&mut self, tx: Transaction) -> Option<Transaction> {
        if self.capacity == 0 {
            return Some(tx);
        }
        let evicted = if self.entries.len() == self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(tx);
        evicted
    }

    /// Copies the retained entries, oldest first.
    pub fn snapshot(&self) -> Vec<Transaction> {
        self.entries.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the fixed maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
