//! Bounded most-recent-first observation buffers
//!
//! One discipline shared by all four history kinds (analog samples,
//! digital samples, strings, raw SysEx payloads): push to the front,
//! evict from the back once the retention length is exceeded.

use std::collections::VecDeque;

/// A bounded buffer with the newest element at the front
#[derive(Debug, Clone)]
pub struct History<T> {
    entries: VecDeque<T>,
    retention: usize,
}

impl<T> History<T> {
    /// Create an empty history with the given retention length
    pub fn new(retention: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            retention,
        }
    }

    /// Change the retention length, evicting from the back if needed.
    /// Floors are enforced by the engine's configuration setters.
    pub fn set_retention(&mut self, length: usize) {
        self.retention = length;
        self.trim();
    }

    /// Current retention length
    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Record a new observation
    pub fn push(&mut self, value: T) {
        self.entries.push_front(value);
        self.trim();
    }

    /// Most recent observation
    pub fn front(&self) -> Option<&T> {
        self.entries.front()
    }

    /// Number of retained observations
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been observed yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate newest to oldest
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    fn trim(&mut self) {
        while self.entries.len() > self.retention {
            self.entries.pop_back();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_newest_at_front() {
        let mut history = History::new(3);
        history.push(1);
        history.push(2);
        assert_eq!(history.front(), Some(&2));
        assert_eq!(history.iter().copied().collect::<Vec<_>>(), vec![2, 1]);
    }

    #[test]
    fn test_eviction_from_back() {
        let mut history = History::new(2);
        for v in [1, 2, 3, 4] {
            history.push(v);
        }
        assert_eq!(history.iter().copied().collect::<Vec<_>>(), vec![4, 3]);
    }

    #[test]
    fn test_shrinking_retention_trims() {
        let mut history = History::new(4);
        for v in [1, 2, 3, 4] {
            history.push(v);
        }
        history.set_retention(2);
        assert_eq!(history.len(), 2);
        assert_eq!(history.front(), Some(&4));
    }

    proptest! {
        /// After N pushes the size is min(N, retention) and the front is
        /// the last pushed value.
        #[test]
        fn bound_invariant(values in proptest::collection::vec(any::<u16>(), 1..64), retention in 1usize..8) {
            let mut history = History::new(retention);
            for &v in &values {
                history.push(v);
            }
            prop_assert_eq!(history.len(), values.len().min(retention));
            prop_assert_eq!(history.front(), values.last());
        }
    }
}
