//! Bounded LRU cache for factor scores.
//!
//! Keys are stable fingerprints over `(factor, horse, ordered past-race ids,
//! parameters)`: the same inputs hash to the same key across process runs, and
//! reordering the past-race ids changes the key. Values are cached scores
//! including the explicit "insufficient data" outcome, so a `None` result is
//! never recomputed.

use std::hash::{Hash, Hasher};

use anyhow::bail;
use rustc_hash::{FxHashMap, FxHasher};

use crate::factor::FactorKind;

pub const DEFAULT_CAPACITY: usize = 100_000;

const NIL: usize = usize::MAX;

/// One named parameter feeding a fingerprint. Parameters are hashed with a
/// type discriminant so that, e.g., the absent value and the empty string
/// produce different keys.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Param<'a> {
    Absent,
    Str(&'a str),
    U32(u32),
    F64(f64),
}

impl Hash for Param<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Param::Absent => state.write_u8(0),
            Param::Str(value) => {
                state.write_u8(1);
                value.hash(state);
            }
            Param::U32(value) => {
                state.write_u8(2);
                value.hash(state);
            }
            Param::F64(value) => {
                state.write_u8(3);
                value.to_bits().hash(state);
            }
        }
    }
}

/// Computes the cache key for one factor evaluation. Pure; parameters are
/// sorted by name so that supply order is immaterial, while past-race id order
/// is significant.
pub fn fingerprint(
    factor: FactorKind,
    horse_id: &str,
    past_race_ids: &[String],
    params: &[(&str, Param)],
) -> u64 {
    let mut sorted: Vec<_> = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let mut hasher = FxHasher::default();
    (factor as usize).hash(&mut hasher);
    horse_id.hash(&mut hasher);
    past_race_ids.len().hash(&mut hasher);
    for race_id in past_race_ids {
        race_id.hash(&mut hasher);
    }
    for (name, value) in &sorted {
        name.hash(&mut hasher);
        value.hash(&mut hasher);
    }
    hasher.finish()
}

/// Hit/miss tally for a cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}
impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}
impl std::ops::AddAssign<bool> for CacheStats {
    fn add_assign(&mut self, cache_hit: bool) {
        if cache_hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }
}

#[derive(Debug)]
struct Slot {
    key: u64,
    value: Option<f64>,
    prev: usize,
    next: usize,
}

/// Bounded LRU from fingerprint to cached score. All operations are O(1):
/// lookups promote the entry to most-recent; insertion at capacity evicts the
/// least-recently-used entry first.
#[derive(Debug)]
pub struct FactorCache {
    capacity: usize,
    index: FxHashMap<u64, usize>,
    slots: Vec<Slot>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
    stats: CacheStats,
}

impl FactorCache {
    pub fn new(capacity: usize) -> Result<Self, anyhow::Error> {
        if capacity == 0 {
            bail!("cache capacity must be at least 1");
        }
        Ok(Self {
            capacity,
            index: FxHashMap::default(),
            slots: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            stats: CacheStats::default(),
        })
    }

    /// Looks up a fingerprint: `None` is a miss, `Some(cached)` a hit, where
    /// the cached score may itself be the "insufficient data" outcome.
    pub fn get(&mut self, key: u64) -> Option<Option<f64>> {
        match self.index.get(&key).copied() {
            Some(slot) => {
                self.stats += true;
                self.promote(slot);
                Some(self.slots[slot].value)
            }
            None => {
                self.stats += false;
                None
            }
        }
    }

    pub fn insert(&mut self, key: u64, value: Option<f64>) {
        if let Some(slot) = self.index.get(&key).copied() {
            self.slots[slot].value = value;
            self.promote(slot);
            return;
        }
        if self.len() == self.capacity {
            self.evict_lru();
        }
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Slot {
                    key,
                    value,
                    prev: NIL,
                    next: NIL,
                };
                slot
            }
            None => {
                self.slots.push(Slot {
                    key,
                    value,
                    prev: NIL,
                    next: NIL,
                });
                self.slots.len() - 1
            }
        };
        self.index.insert(key, slot);
        self.attach_front(slot);
    }

    pub fn contains(&self, key: u64) -> bool {
        self.index.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Drops every entry and resets the tally.
    pub fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
        self.stats = CacheStats::default();
    }

    fn promote(&mut self, slot: usize) {
        if self.head == slot {
            return;
        }
        self.detach(slot);
        self.attach_front(slot);
    }

    fn detach(&mut self, slot: usize) {
        let (prev, next) = (self.slots[slot].prev, self.slots[slot].next);
        if prev != NIL {
            self.slots[prev].next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.slots[next].prev = prev;
        } else {
            self.tail = prev;
        }
    }

    fn attach_front(&mut self, slot: usize) {
        self.slots[slot].prev = NIL;
        self.slots[slot].next = self.head;
        if self.head != NIL {
            self.slots[self.head].prev = slot;
        }
        self.head = slot;
        if self.tail == NIL {
            self.tail = slot;
        }
    }

    fn evict_lru(&mut self) {
        let victim = self.tail;
        if victim == NIL {
            return;
        }
        self.detach(victim);
        self.index.remove(&self.slots[victim].key);
        self.free.push(victim);
    }
}

impl Default for FactorCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY).unwrap()
    }
}
