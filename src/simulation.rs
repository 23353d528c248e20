use tracing::{debug, info, trace, warn};

use crate::cache::{CacheHit, CacheModel};
use crate::error::MalformedRecord;
use crate::lru::LruCache;
use crate::trace::{Operation, Trace, TraceEntry, TraceRecord};

/// Running hit / miss / eviction counts.
///
/// `hits + misses` is the number of single accesses performed and every
/// eviction is also counted as a miss.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl Tally {
    pub fn record(&mut self, cache_hit: CacheHit) {
        if cache_hit.is_hit() {
            self.hits += 1;
            return;
        }

        self.misses += 1;
        if cache_hit.is_eviction() {
            self.evictions += 1;
        }
    }

    pub fn accesses(&self) -> u64 {
        self.hits + self.misses
    }
}

impl std::fmt::Display for Tally {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "hits:{} misses:{} evictions:{}",
            self.hits, self.misses, self.evictions
        ))
    }
}

/// Trace lines that did not turn into cache accesses.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Skipped {
    pub malformed: u64,
    pub unknown_ops: u64,
}

/// What to do with records whose operation is not a data access (`I` and unknown letters).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum UnknownOps {
    /// skip the record, count it in [`Skipped::unknown_ops`]
    #[default]
    Ignore,
    /// treat the record as malformed
    Reject,
}

/// Cache accesses caused by a single trace record.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ignored,
    Single(CacheHit),
    Modify(CacheHit, CacheHit),
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Ignored => f.write_str("ignored"),
            Outcome::Single(cache_hit) => f.write_fmt(format_args!("{cache_hit}")),
            Outcome::Modify(load, store) => f.write_fmt(format_args!("{load} {store}")),
        }
    }
}

#[derive(Debug)]
pub struct Simulator<C = LruCache> {
    cache: C,
    tally: Tally,
    skipped: Skipped,
    unknown_ops: UnknownOps,
}

impl<C: CacheModel> Simulator<C> {
    pub fn new(cache: C, unknown_ops: UnknownOps) -> Self {
        Self {
            cache,
            tally: Tally::default(),
            skipped: Skipped::default(),
            unknown_ops,
        }
    }

    pub fn tally(&self) -> Tally {
        self.tally
    }

    pub fn skipped(&self) -> Skipped {
        self.skipped
    }

    pub fn access(&mut self, address: u64) -> CacheHit {
        let cache_hit = self.cache.access(address);
        trace!("access {address:#x}: {cache_hit}");

        self.tally.record(cache_hit);
        cache_hit
    }

    /// Expands one record into its cache accesses.
    ///
    /// Loads and stores are one access, a modify is a load followed by a
    /// store to the same address. Anything else performs no access.
    pub fn apply(&mut self, record: &TraceRecord) -> Outcome {
        match record.operation {
            Operation::Load | Operation::Store => Outcome::Single(self.access(record.address)),
            Operation::Modify => {
                let load = self.access(record.address);
                let store = self.access(record.address);
                Outcome::Modify(load, store)
            }
            Operation::Instruction | Operation::Other(_) => {
                self.skipped.unknown_ops += 1;
                debug!(%record, "ignoring non data access");
                Outcome::Ignored
            }
        }
    }

    /// Replays a whole trace, reporting every applied record to `observe`.
    pub fn replay(
        &mut self,
        trace: Trace<'_>,
        mut observe: impl FnMut(&TraceRecord, Outcome),
    ) -> Tally {
        info!(
            sets = self.cache.geometry().sets(),
            ways = self.cache.geometry().ways(),
            block_size = self.cache.geometry().block_size(),
            "replaying trace"
        );

        for (line, entry) in trace {
            match entry {
                TraceEntry::Record(record) if self.rejects(&record) => {
                    self.skip(MalformedRecord {
                        line,
                        text: record.to_string(),
                        reason: format!("unsupported operation '{}'", record.operation),
                    });
                }
                TraceEntry::Record(record) => {
                    let outcome = self.apply(&record);
                    observe(&record, outcome);
                }
                TraceEntry::Malformed(malformed) => self.skip(malformed),
            }
        }

        info!(
            tally = %self.tally,
            malformed = self.skipped.malformed,
            unknown_ops = self.skipped.unknown_ops,
            "trace exhausted"
        );
        self.tally
    }

    fn rejects(&self, record: &TraceRecord) -> bool {
        self.unknown_ops == UnknownOps::Reject
            && matches!(
                record.operation,
                Operation::Instruction | Operation::Other(_)
            )
    }

    fn skip(&mut self, malformed: MalformedRecord) {
        self.skipped.malformed += 1;
        warn!(%malformed, "skipping malformed trace record");
    }
}
