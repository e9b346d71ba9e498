//! Dense re-indexing of sparse identifiers.
//!
//! [`IdRemapper`] assigns consecutive dense indices `0, 1, 2, ...` to
//! arbitrary `u32` identifiers in order of first appearance. Lookup uses open
//! addressing with linear probing into a prime-sized table at least three
//! times the expected number of ids; the table is rebuilt at the next prime
//! when it becomes two-thirds full.

const EMPTY: u32 = u32::MAX;

/// Sparse-to-dense id map with inverse lookup.
#[derive(Clone, Debug)]
pub struct IdRemapper {
    /// Slot keys (external ids). Only meaningful where `slot_dense != EMPTY`.
    slot_ids: Vec<u32>,
    /// Slot values (dense indices), `EMPTY` for unused slots.
    slot_dense: Vec<u32>,
    /// Dense index to external id.
    inverse: Vec<u32>,
    /// Total probes performed (diagnostics).
    probes: u64,
}

impl Default for IdRemapper {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl IdRemapper {
    /// Create a remapper sized for `expected` ids.
    pub fn with_capacity(expected: usize) -> Self {
        let size = next_prime((3 * expected).max(7));
        Self {
            slot_ids: vec![0; size],
            slot_dense: vec![EMPTY; size],
            inverse: Vec::with_capacity(expected),
            probes: 0,
        }
    }

    /// Dense index of `id`, assigning the next free index on first sight.
    pub fn remap(&mut self, id: u32) -> u32 {
        if (self.inverse.len() + 1) * 3 > self.table_size() * 2 {
            self.grow();
        }
        let slot = self.probe(id);
        if self.slot_dense[slot] != EMPTY {
            return self.slot_dense[slot];
        }
        let dense = self.inverse.len() as u32;
        self.slot_ids[slot] = id;
        self.slot_dense[slot] = dense;
        self.inverse.push(id);
        dense
    }

    /// Dense index of `id` if it has been seen.
    pub fn get(&self, id: u32) -> Option<u32> {
        let size = self.table_size();
        let mut slot = id as usize % size;
        loop {
            let dense = self.slot_dense[slot];
            if dense == EMPTY {
                return None;
            }
            if self.slot_ids[slot] == id {
                return Some(dense);
            }
            slot = (slot + 1) % size;
        }
    }

    /// External id of a dense index.
    #[inline]
    pub fn inverse(&self, dense: u32) -> Option<u32> {
        self.inverse.get(dense as usize).copied()
    }

    #[inline]
    pub fn contains(&self, id: u32) -> bool {
        self.get(id).is_some()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inverse.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inverse.is_empty()
    }

    #[inline]
    pub fn table_size(&self) -> usize {
        self.slot_dense.len()
    }

    /// Total number of probes performed by [`remap`](Self::remap).
    #[inline]
    pub fn probe_count(&self) -> u64 {
        self.probes
    }

    /// External ids in dense order.
    #[inline]
    pub fn ids(&self) -> &[u32] {
        &self.inverse
    }

    /// Slot holding `id`, or the empty slot where it would go.
    fn probe(&mut self, id: u32) -> usize {
        let size = self.table_size();
        let mut slot = id as usize % size;
        loop {
            self.probes += 1;
            if self.slot_dense[slot] == EMPTY || self.slot_ids[slot] == id {
                return slot;
            }
            slot = (slot + 1) % size;
        }
    }

    fn grow(&mut self) {
        let size = next_prime((3 * (self.inverse.len() + 1)).max(2 * self.table_size()));
        self.slot_ids = vec![0; size];
        self.slot_dense = vec![EMPTY; size];
        for (dense, &id) in self.inverse.iter().enumerate() {
            let mut slot = id as usize % size;
            while self.slot_dense[slot] != EMPTY {
                slot = (slot + 1) % size;
            }
            self.slot_ids[slot] = id;
            self.slot_dense[slot] = dense as u32;
        }
    }
}

/// Smallest prime `>= n`.
pub fn next_prime(n: usize) -> usize {
    let mut candidate = n.max(2);
    while !is_prime(candidate) {
        candidate += 1;
    }
    candidate
}

fn is_prime(n: usize) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut d = 3;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_prime() {
        assert_eq!(next_prime(0), 2);
        assert_eq!(next_prime(7), 7);
        assert_eq!(next_prime(8), 11);
        assert_eq!(next_prime(30), 31);
    }

    #[test]
    fn test_remap_assigns_in_order() {
        let mut r = IdRemapper::with_capacity(4);
        assert!(r.table_size() >= 12);
        assert_eq!(r.remap(1000), 0);
        assert_eq!(r.remap(7), 1);
        assert_eq!(r.remap(1000), 0);
        assert_eq!(r.remap(u32::MAX - 1), 2);
        assert_eq!(r.len(), 3);
        assert_eq!(r.get(7), Some(1));
        assert_eq!(r.get(8), None);
        assert_eq!(r.inverse(2), Some(u32::MAX - 1));
        assert_eq!(r.inverse(3), None);
    }

    #[test]
    fn test_colliding_ids_probe_linearly() {
        let mut r = IdRemapper::with_capacity(2);
        let size = r.table_size() as u32;
        // Same home slot.
        let a = r.remap(3);
        let b = r.remap(3 + size);
        assert_ne!(a, b);
        assert_eq!(r.get(3 + size), Some(b));
        assert!(r.probe_count() >= 3);
    }

    #[test]
    fn test_growth_preserves_mapping() {
        let mut r = IdRemapper::with_capacity(1);
        let initial = r.table_size();
        let ids: Vec<u32> = (0..500).map(|i| i * 7919 + 13).collect();
        for (i, &id) in ids.iter().enumerate() {
            assert_eq!(r.remap(id), i as u32);
        }
        assert!(r.table_size() > initial);
        for (i, &id) in ids.iter().enumerate() {
            assert_eq!(r.get(id), Some(i as u32));
            assert_eq!(r.inverse(i as u32), Some(id));
        }
        assert_eq!(r.ids(), ids.as_slice());
    }
}
