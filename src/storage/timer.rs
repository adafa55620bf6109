//! Expiry Timer Heap
//!
//! A binary min-heap of `(key, expiry)` entries ordered by expiry tick. The
//! root is always the entry that fires next.
//!
//! ```text
//!               [a=2]
//!              /     \
//!          [b=5]     [c=3]
//!          /   \
//!      [d=9]  [e=7]
//!
//!   stored as: [a=2, b=5, c=3, d=9, e=7]
//!   children of i: 2i+1, 2i+2    parent of i: (i-1)/2
//! ```
//!
//! Entries are never updated in place. Re-arming a key pushes a second
//! entry; the earlier one fires first and the store delete it triggers is a
//! no-op once the key is gone. Deleting a key drops all of its entries via
//! [`TimerHeap::remove`], so a later key of the same name starts clean.

use std::fmt;

/// A pending expiry: `key` fires once the clock reaches `expiry`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerEntry {
    pub key: String,
    /// Absolute tick on the scheduler clock
    pub expiry: i64,
}

impl TimerEntry {
    pub fn new(key: impl Into<String>, expiry: i64) -> Self {
        Self {
            key: key.into(),
            expiry,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct TimerHeap {
    entries: Vec<TimerEntry>,
}

impl TimerHeap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry that fires next.
    pub fn peek(&self) -> Option<&TimerEntry> {
        self.entries.first()
    }

    pub fn push(&mut self, entry: TimerEntry) {
        self.entries.push(entry);
        self.shift_up(self.entries.len() - 1);
    }

    /// Removes and returns the entry with the smallest expiry.
    pub fn pop(&mut self) -> Option<TimerEntry> {
        if self.entries.is_empty() {
            return None;
        }

        let entry = self.entries.swap_remove(0);
        if !self.entries.is_empty() {
            self.shift_down(0);
        }

        Some(entry)
    }

    /// Drops every entry for `key` and returns how many were dropped.
    pub fn remove(&mut self, key: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.key != key);
        let removed = before - self.entries.len();

        if removed > 0 {
            for i in (0..self.entries.len() / 2).rev() {
                self.shift_down(i);
            }
        }

        removed
    }

    /// Pops every entry whose expiry is at or before `now`, earliest first.
    pub fn expired(&mut self, now: i64) -> Expired<'_> {
        Expired { heap: self, now }
    }

    fn shift_up(&mut self, mut cur: usize) {
        while cur > 0 {
            let parent = (cur - 1) / 2;
            if self.entries[parent].expiry <= self.entries[cur].expiry {
                break;
            }
            self.entries.swap(parent, cur);
            cur = parent;
        }
    }

    fn shift_down(&mut self, mut cur: usize) {
        let len = self.entries.len();

        loop {
            let left = 2 * cur + 1;
            let right = left + 1;
            let mut smallest = cur;

            if left < len && self.entries[left].expiry < self.entries[smallest].expiry {
                smallest = left;
            }
            if right < len && self.entries[right].expiry < self.entries[smallest].expiry {
                smallest = right;
            }
            if smallest == cur {
                break;
            }

            self.entries.swap(cur, smallest);
            cur = smallest;
        }
    }
}

/// Iterator returned by [`TimerHeap::expired`].
pub struct Expired<'a> {
    heap: &'a mut TimerHeap,
    now: i64,
}

impl Iterator for Expired<'_> {
    type Item = TimerEntry;

    fn next(&mut self) -> Option<TimerEntry> {
        match self.heap.peek() {
            Some(entry) if entry.expiry <= self.now => self.heap.pop(),
            _ => None,
        }
    }
}

impl fmt::Display for TimerHeap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[ ")?;
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", entry.key, entry.expiry)?;
        }
        f.write_str(" ]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_pop_order() {
        let mut heap = TimerHeap::new();
        for (key, expiry) in [("d", 9), ("a", 2), ("e", 7), ("b", 5), ("c", 3)] {
            heap.push(TimerEntry::new(key, expiry));
        }

        assert_eq!(heap.len(), 5);
        assert_eq!(heap.peek().map(|e| e.key.as_str()), Some("a"));

        let order: Vec<i64> = std::iter::from_fn(|| heap.pop()).map(|e| e.expiry).collect();
        assert_eq!(order, vec![2, 3, 5, 7, 9]);
        assert!(heap.is_empty());
        assert_eq!(heap.pop(), None);
    }

    #[test]
    fn test_expired_stops_at_now() {
        let mut heap = TimerHeap::with_capacity(4);
        heap.push(TimerEntry::new("a", 1));
        heap.push(TimerEntry::new("b", 2));
        heap.push(TimerEntry::new("c", 2));
        heap.push(TimerEntry::new("d", 4));

        assert_eq!(heap.expired(0).count(), 0);

        let mut fired: Vec<String> = heap.expired(2).map(|e| e.key).collect();
        fired.sort();
        assert_eq!(fired, vec!["a", "b", "c"]);
        assert_eq!(heap.len(), 1);
        assert_eq!(heap.peek(), Some(&TimerEntry::new("d", 4)));
    }

    #[test]
    fn test_remove_keeps_heap_order() {
        let mut heap = TimerHeap::new();
        for (key, expiry) in [("a", 4), ("b", 1), ("a", 2), ("c", 3), ("d", 5)] {
            heap.push(TimerEntry::new(key, expiry));
        }

        assert_eq!(heap.remove("a"), 2);
        assert_eq!(heap.remove("missing"), 0);

        let order: Vec<_> = std::iter::from_fn(|| heap.pop()).map(|e| e.key).collect();
        assert_eq!(order, vec!["b", "c", "d"]);
    }

    #[test]
    fn test_display() {
        let mut heap = TimerHeap::new();
        heap.push(TimerEntry::new("b", 5));
        heap.push(TimerEntry::new("a", 2));
        assert_eq!(heap.to_string(), "[ a=2, b=5 ]");
    }

    #[test]
    fn test_root_is_always_minimum() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut heap = TimerHeap::new();
        let mut shadow: Vec<i64> = Vec::new();

        for i in 0..5_000 {
            if shadow.is_empty() || rng.gen_bool(0.6) {
                let expiry = rng.gen_range(-100..1_000);
                heap.push(TimerEntry::new(format!("k{}", i), expiry));
                shadow.push(expiry);
            } else {
                let popped = heap.pop().unwrap();
                let min = *shadow.iter().min().unwrap();
                assert_eq!(popped.expiry, min);
                let pos = shadow.iter().position(|&e| e == min).unwrap();
                shadow.swap_remove(pos);
            }

            assert_eq!(heap.len(), shadow.len());
            assert_eq!(heap.peek().map(|e| e.expiry), shadow.iter().min().copied());
        }
    }
}
