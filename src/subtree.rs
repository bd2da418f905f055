//! Bounded, deduplicated membership set of addresses believed to sit
//! beneath this node in the tree, stored as an ordered list with this
//! node always first (§3 "Subtree registry", §4.5).
//!
//! A fixed-capacity array rather than a `HashSet`/`Vec` per §5's resource
//! policy: the bound is tiny (10) and the set is consulted on every beacon
//! reception, so a linear scan over a small inline array is both simpler
//! and cheaper than a heap-allocated collection.

use crate::address::LinkAddr;
use crate::config::MAX_SUBTREE_SIZE;

#[derive(Debug, Clone)]
pub struct SubtreeRegistry {
    slots: [Option<LinkAddr>; MAX_SUBTREE_SIZE],
    len: usize,
}

impl SubtreeRegistry {
    /// A fresh registry always contains `self_addr` as its first element.
    pub fn new(self_addr: LinkAddr) -> Self {
        let mut slots = [None; MAX_SUBTREE_SIZE];
        slots[0] = Some(self_addr);
        Self { slots, len: 1 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    pub fn contains(&self, addr: LinkAddr) -> bool {
        self.slots[..self.len].iter().any(|s| *s == Some(addr))
    }

    /// Appends `addr` if absent and there is room. Returns whether the
    /// registry now contains it (true if already present or just added).
    pub fn insert_if_absent(&mut self, addr: LinkAddr) -> bool {
        if self.contains(addr) {
            return true;
        }
        if self.is_full() {
            log::warn!("subtree: registry full, dropping {}", addr);
            return false;
        }
        self.slots[self.len] = Some(addr);
        self.len += 1;
        true
    }

    /// Removes the first occurrence of `addr`, shifting the remainder left.
    pub fn remove(&mut self, addr: LinkAddr) {
        if let Some(pos) = self.slots[..self.len].iter().position(|s| *s == Some(addr)) {
            for i in pos..self.len - 1 {
                self.slots[i] = self.slots[i + 1];
            }
            self.slots[self.len - 1] = None;
            self.len -= 1;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = LinkAddr> + '_ {
        self.slots[..self.len].iter().filter_map(|s| *s)
    }
}
