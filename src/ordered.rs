use std::collections::HashMap;

use crate::cache::{CacheHit, CacheModel, Geometry};

const NIL: usize = usize::MAX;

/// LRU cache keeping each set as an intrusive recency list plus a tag index.
///
/// Hits and evictions are O(1) regardless of associativity. Produces the
/// same [`CacheHit`] sequence as [`crate::lru::LruCache`] for any trace.
#[derive(Debug)]
pub struct OrderedLruCache {
    geometry: Geometry,
    sets: Box<[OrderedSet]>,
}

impl OrderedLruCache {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            sets: (0..geometry.sets())
                .map(|_| OrderedSet::new(geometry.ways()))
                .collect(),
        }
    }
}

impl CacheModel for OrderedLruCache {
    fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    fn access(&mut self, address: u64) -> CacheHit {
        let (set_index, tag) = self.geometry.decompose(address);
        self.sets[set_index].access(tag)
    }
}

/// `head` is the most recently used slot, `tail` the next victim.
///
/// Slots start out ordered `ways - 1, .., 1, 0` from head to tail, so
/// empty slots are handed out in index order and always sit behind every
/// filled slot.
#[derive(Debug, Clone)]
struct OrderedSet {
    tags: Box<[Option<u64>]>,
    prev: Box<[usize]>,
    next: Box<[usize]>,
    head: usize,
    tail: usize,
    index: HashMap<u64, usize>,
}

impl OrderedSet {
    fn new(ways: usize) -> Self {
        Self {
            tags: vec![None; ways].into_boxed_slice(),
            prev: (0..ways)
                .map(|slot| if slot + 1 == ways { NIL } else { slot + 1 })
                .collect(),
            next: (0..ways)
                .map(|slot| if slot == 0 { NIL } else { slot - 1 })
                .collect(),
            head: ways - 1,
            tail: 0,
            index: HashMap::with_capacity(ways),
        }
    }

    fn access(&mut self, tag: u64) -> CacheHit {
        if let Some(&slot) = self.index.get(&tag) {
            self.touch(slot);
            return CacheHit::Hit;
        }

        let slot = self.tail;
        let evicted = self.tags[slot].replace(tag);
        if let Some(evicted) = evicted {
            self.index.remove(&evicted);
        }
        self.index.insert(tag, slot);
        self.touch(slot);

        CacheHit::Miss { evicted }
    }

    /// moves `slot` to the most recently used end
    fn touch(&mut self, slot: usize) {
        if slot == self.head {
            return;
        }

        // not the head, so there is a predecessor
        let (prev, next) = (self.prev[slot], self.next[slot]);
        self.next[prev] = next;
        if next == NIL {
            self.tail = prev;
        } else {
            self.prev[next] = prev;
        }

        self.prev[slot] = NIL;
        self.next[slot] = self.head;
        self.prev[self.head] = slot;
        self.head = slot;
    }

    #[cfg(test)]
    fn order(&self) -> Vec<usize> {
        let mut order = Vec::new();
        let mut slot = self.head;
        while slot != NIL {
            order.push(slot);
            slot = self.next[slot];
        }
        order
    }
}

#[cfg(test)]
mod test {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::lru::LruCache;

    #[test]
    fn initial_order_hands_out_low_slots_first() {
        let mut set = OrderedSet::new(4);
        assert_eq!(set.order(), vec![3, 2, 1, 0]);

        assert_eq!(set.access(10), CacheHit::Miss { evicted: None });
        assert_eq!(set.order(), vec![0, 3, 2, 1]);
        assert_eq!(set.tags[0], Some(10));

        assert_eq!(set.access(11), CacheHit::Miss { evicted: None });
        assert_eq!(set.tags[1], Some(11));
        assert_eq!(set.order(), vec![1, 0, 3, 2]);
    }

    #[test]
    fn hit_moves_to_front() {
        let mut set = OrderedSet::new(3);
        for tag in [1, 2, 3] {
            set.access(tag);
        }
        assert_eq!(set.order(), vec![2, 1, 0]);

        assert_eq!(set.access(1), CacheHit::Hit);
        assert_eq!(set.order(), vec![0, 2, 1]);

        assert_eq!(set.access(4), CacheHit::Miss { evicted: Some(2) });
        assert_eq!(set.order(), vec![1, 0, 2]);
        assert_eq!(set.index.len(), 3);
    }

    #[test]
    fn single_way() {
        let mut set = OrderedSet::new(1);
        assert_eq!(set.access(0), CacheHit::Miss { evicted: None });
        assert_eq!(set.access(0), CacheHit::Hit);
        assert_eq!(set.access(1), CacheHit::Miss { evicted: Some(0) });
        assert_eq!(set.order(), vec![0]);
    }

    #[test]
    fn agrees_with_counter_cache() {
        let mut rng: StdRng = StdRng::seed_from_u64(0);

        for (sets, ways, block_size) in [(1, 1, 1), (1, 4, 1), (4, 2, 16), (8, 8, 4), (16, 3, 8)] {
            let geometry = Geometry::new(sets, ways, block_size).unwrap();
            let mut counter = LruCache::new(geometry);
            let mut ordered = OrderedLruCache::new(geometry);

            // small address space so sets actually fill up and evict
            let span = (sets * (ways + 2) * block_size) as u64;
            for step in 0..5_000 {
                let address = rng.random_range(0..span);
                assert_eq!(
                    counter.access(address),
                    ordered.access(address),
                    "step {step} address {address:#X} geometry {geometry:?}"
                );
            }
        }
    }
}
