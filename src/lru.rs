use crate::cache::{CacheHit, CacheModel, Geometry};

/// Set-associative cache approximating LRU with per-line recency counters.
///
/// Every access to a set ages all of its lines by one; a hit or a fill
/// resets the touched line to zero. The victim on a full set is therefore
/// the line with the highest counter.
#[derive(Debug)]
pub struct LruCache {
    geometry: Geometry,
    sets: Box<[CacheSet]>,
}

impl LruCache {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            sets: (0..geometry.sets())
                .map(|_| CacheSet::new(geometry.ways()))
                .collect(),
        }
    }

    #[cfg(test)]
    fn set(&self, set_index: usize) -> &CacheSet {
        &self.sets[set_index]
    }
}

impl CacheModel for LruCache {
    fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    fn access(&mut self, address: u64) -> CacheHit {
        let (set_index, tag) = self.geometry.decompose(address);

        // decompose masks the index to the set count
        self.sets[set_index].access(tag)
    }
}

#[derive(Debug, Clone)]
struct CacheSet {
    lines: Box<[CacheLine]>,
}

impl CacheSet {
    fn new(ways: usize) -> Self {
        Self {
            lines: vec![CacheLine::default(); ways].into_boxed_slice(),
        }
    }

    fn access(&mut self, tag: u64) -> CacheHit {
        for line in self.lines.iter_mut() {
            line.recency = line.recency.saturating_add(1);
        }

        // Cache-Hit: tags are unique among valid lines, the first match is the only one
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.valid && line.tag == tag)
        {
            line.recency = 0;
            return CacheHit::Hit;
        }

        // Cache-Miss: fill the first free line
        if let Some(line) = self.lines.iter_mut().find(|line| !line.valid) {
            *line = CacheLine::filled(tag);
            return CacheHit::Miss { evicted: None };
        }

        // Cache-Miss on a full set: replace the oldest line, earliest index wins ties
        let victim = self
            .lines
            .iter()
            .enumerate()
            .fold(0, |oldest, (line_idx, line)| {
                if line.recency > self.lines[oldest].recency {
                    line_idx
                } else {
                    oldest
                }
            });

        let line = &mut self.lines[victim];
        let evicted = line.tag;
        *line = CacheLine::filled(tag);

        CacheHit::Miss {
            evicted: Some(evicted),
        }
    }
}

#[derive(Debug, Copy, Clone, Default)]
struct CacheLine {
    valid: bool,
    tag: u64,
    /// accesses to the owning set since this line was last hit or filled
    recency: u64,
}

impl CacheLine {
    fn filled(tag: u64) -> Self {
        Self {
            valid: true,
            tag,
            recency: 0,
        }
    }
}
