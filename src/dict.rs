use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::iter::{Items, Keys, RangeIter, Values};
use crate::level::{self, LevelSource};
use crate::skiplist::{DeleteOutcome, SkipList};

const DEFAULT_MAXLEVEL: usize = 32;
const MAXLEVEL_LIMIT: usize = 32;

/// Per-key bookkeeping: the current score and the tie-break ordinal
/// assigned when the key first entered the container.
#[derive(Clone, Copy)]
struct EntryMeta {
    score: f64,
    ord: u64,
}

/// A dictionary keyed by `K` whose entries are simultaneously kept in
/// ascending score order by an indexable skip list.
///
/// The hash map answers membership and key lookups in O(1) expected time;
/// the skip list answers rank and range queries in O(log n) expected time.
/// Both structures are updated together on every mutation and the skip
/// list is never exposed on its own.
///
/// Equal scores are ordered by a per-entry ordinal drawn from an
/// increasing counter, so ranks are stable across repeated reads.
pub struct ScoreDict<K> {
    map: HashMap<Arc<K>, EntryMeta>,
    list: SkipList<K>,
    levels: LevelSource,
    seq: u64,
}

impl<K: Hash + Eq> ScoreDict<K> {
    pub fn new() -> ScoreDict<K> {
        ScoreDict {
            map: HashMap::new(),
            list: SkipList::new(DEFAULT_MAXLEVEL),
            levels: LevelSource::Geometric,
            seq: 0,
        }
    }

    /// A container with a custom maximum skip-list level in [1, 32].
    pub fn with_maxlevel(maxlevel: usize) -> Result<ScoreDict<K>> {
        if maxlevel < 1 || maxlevel > MAXLEVEL_LIMIT {
            return Err(Error::BadMaxLevel { given: maxlevel });
        }
        Ok(ScoreDict {
            map: HashMap::new(),
            list: SkipList::new(maxlevel),
            levels: LevelSource::Geometric,
            seq: 0,
        })
    }

    /// A container whose node levels come from `f`, called with the
    /// maximum level. A result outside [1, maxlevel] fails the mutating
    /// operation that consulted it, leaving the container unchanged.
    pub fn with_level_fn<F>(maxlevel: usize, f: F) -> Result<ScoreDict<K>>
    where
        F: FnMut(usize) -> i64 + 'static,
    {
        let mut dict = Self::with_maxlevel(maxlevel)?;
        dict.levels = LevelSource::Custom(Box::new(f));
        Ok(dict)
    }

    /// Builds a container from (key, score) pairs through the normal
    /// upsert path: later duplicates win.
    pub fn from_pairs<I>(pairs: I) -> Result<ScoreDict<K>>
    where
        I: IntoIterator<Item = (K, f64)>,
    {
        let mut dict = Self::new();
        dict.extend_pairs(pairs)?;
        Ok(dict)
    }

    /// Upserts every pair in order; the first invalid score aborts with a
    /// positional error and leaves the pairs before it applied.
    pub fn extend_pairs<I>(&mut self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, f64)>,
    {
        for (index, (key, score)) in pairs.into_iter().enumerate() {
            self.set(key, score).map_err(|err| match err {
                Error::NotANumber(score) => Error::BadPair { index, score },
                other => other,
            })?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn maxlevel(&self) -> usize {
        self.list.maxlevel()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    pub fn get(&self, key: &K) -> Option<f64> {
        self.map.get(key).map(|meta| meta.score)
    }

    /// Upserts `key` at `score` and returns the previous score, if any.
    /// An existing entry keeps its tie-break ordinal, so re-setting the
    /// same score leaves ranks untouched.
    pub fn set(&mut self, key: K, score: f64) -> Result<Option<f64>> {
        if score.is_nan() {
            return Err(Error::NotANumber(score));
        }
        // draw the level up front: a rejected draw must not leave the old
        // entry detached
        let level = self.levels.draw(self.list.maxlevel())?;
        let existing = self.map.get_key_value(&key).map(|(k, m)| (k.clone(), *m));
        match existing {
            Some((shared, old)) => {
                match self.list.delete(old.score, old.ord, 0.0) {
                    DeleteOutcome::Removed(_) => {}
                    _ => panic!("skip list out of sync with key map"),
                }
                self.list.insert(score, old.ord, shared.clone(), level);
                self.map.insert(shared, EntryMeta { score, ord: old.ord });
                Ok(Some(old.score))
            }
            None => {
                self.seq += 1;
                let ord = self.seq;
                let shared = Arc::new(key);
                self.list.insert(score, ord, shared.clone(), level);
                self.map.insert(shared, EntryMeta { score, ord });
                Ok(None)
            }
        }
    }

    /// Inserts `key` at `score` only when absent; returns the score now
    /// stored under the key.
    pub fn setdefault(&mut self, key: K, score: f64) -> Result<f64> {
        if score.is_nan() {
            return Err(Error::NotANumber(score));
        }
        if let Some(meta) = self.map.get(&key) {
            return Ok(meta.score);
        }
        let level = self.levels.draw(self.list.maxlevel())?;
        self.seq += 1;
        let ord = self.seq;
        let shared = Arc::new(key);
        self.list.insert(score, ord, shared.clone(), level);
        self.map.insert(shared, EntryMeta { score, ord });
        Ok(score)
    }

    /// Adds `delta` to the key's score, inserting at `delta` when the key
    /// is absent, and returns the new score. When the bumped score still
    /// precedes the next entry the skip-list node is adjusted in place
    /// without relocation or a fresh level draw.
    pub fn change(&mut self, key: K, delta: f64) -> Result<f64> {
        if delta.is_nan() {
            return Err(Error::NotANumber(delta));
        }
        let existing = self.map.get_key_value(&key).map(|(k, m)| (k.clone(), *m));
        let (shared, old) = match existing {
            Some(pair) => pair,
            None => {
                self.set(key, delta)?;
                return Ok(delta);
            }
        };
        let new_score = old.score + delta;
        if new_score.is_nan() {
            return Err(Error::NotANumber(new_score));
        }
        match self.list.delete(old.score, old.ord, delta) {
            DeleteOutcome::Adjusted(score) => {
                self.map.insert(shared, EntryMeta { score, ord: old.ord });
                Ok(score)
            }
            DeleteOutcome::Removed(obj) => {
                let level = match self.levels.draw(self.list.maxlevel()) {
                    Ok(level) => level,
                    Err(err) => {
                        // put the node back where it was before surfacing
                        // the rejected draw
                        let fallback = level::random_level(self.list.maxlevel());
                        self.list.insert(old.score, old.ord, obj, fallback);
                        return Err(err);
                    }
                };
                self.list.insert(new_score, old.ord, obj, level);
                self.map.insert(shared, EntryMeta { score: new_score, ord: old.ord });
                Ok(new_score)
            }
            DeleteOutcome::NotFound => panic!("skip list out of sync with key map"),
        }
    }

    /// Removes the entries whose 0-based ranks fall in `[start, end]`,
    /// clamped to the container; returns how many were removed.
    pub fn remove_rank_range(&mut self, start: usize, end: usize) -> usize {
        let ScoreDict { map, list, .. } = self;
        list.delete_range_by_rank(start.saturating_add(1), end.saturating_add(1), |obj| {
            map.remove(obj.as_ref());
        })
    }

    /// Ascending iterator over all keys.
    pub fn keys(&self) -> Keys<'_, K> {
        Keys::new(RangeIter::from_head(&self.list))
    }

    /// Ascending iterator over all scores.
    pub fn values(&self) -> Values<'_, K> {
        Values::new(RangeIter::from_head(&self.list))
    }

    /// Ascending iterator over all (key, score) pairs.
    pub fn items(&self) -> Items<'_, K> {
        Items::new(RangeIter::from_head(&self.list))
    }

    /// Keys with scores in [min, max]; omitted bounds default to the ends
    /// of the list, and min > max yields the window in descending order.
    pub fn keys_range(&self, min: Option<f64>, max: Option<f64>) -> Keys<'_, K> {
        Keys::new(RangeIter::from_range(&self.list, min, max))
    }

    /// Scores in [min, max]; see [`ScoreDict::keys_range`] for the bound
    /// conventions.
    pub fn values_range(&self, min: Option<f64>, max: Option<f64>) -> Values<'_, K> {
        Values::new(RangeIter::from_range(&self.list, min, max))
    }

    /// (key, score) pairs in [min, max]; see [`ScoreDict::keys_range`]
    /// for the bound conventions.
    pub fn items_range(&self, min: Option<f64>, max: Option<f64>) -> Items<'_, K> {
        Items::new(RangeIter::from_range(&self.list, min, max))
    }
}

impl<K: Hash + Eq + fmt::Debug> ScoreDict<K> {
    /// The score stored under `key`, or a key-not-found error.
    pub fn score(&self, key: &K) -> Result<f64> {
        self.map
            .get(key)
            .map(|meta| meta.score)
            .ok_or_else(|| Error::KeyNotFound(format!("{key:?}")))
    }

    /// Removes `key` and returns its score, or a key-not-found error.
    pub fn remove(&mut self, key: &K) -> Result<f64> {
        let (_, meta) = self
            .map
            .remove_entry(key)
            .ok_or_else(|| Error::KeyNotFound(format!("{key:?}")))?;
        match self.list.delete(meta.score, meta.ord, 0.0) {
            DeleteOutcome::Removed(_) => Ok(meta.score),
            _ => panic!("skip list out of sync with key map"),
        }
    }

    /// The key's 0-based rank in score order, or a key-not-found error.
    pub fn index(&self, key: &K) -> Result<usize> {
        let meta = self
            .map
            .get(key)
            .ok_or_else(|| Error::KeyNotFound(format!("{key:?}")))?;
        let rank = self.list.rank_of(meta.score, meta.ord);
        assert!(rank > 0, "skip list out of sync with key map");
        Ok(rank - 1)
    }
}

impl<K: Hash + Eq> Default for ScoreDict<K> {
    fn default() -> ScoreDict<K> {
        ScoreDict::new()
    }
}

/// Mapping equality: same keys bound to the same scores, ignoring order.
impl<K: Hash + Eq> PartialEq for ScoreDict<K> {
    fn eq(&self, other: &ScoreDict<K>) -> bool {
        self.map.len() == other.map.len()
            && self
                .map
                .iter()
                .all(|(key, meta)| other.map.get(key).map_or(false, |m| m.score == meta.score))
    }
}

/// A plain mapping compares equal when it binds the same keys to the same
/// scores.
impl<K: Hash + Eq> PartialEq<HashMap<K, f64>> for ScoreDict<K> {
    fn eq(&self, other: &HashMap<K, f64>) -> bool {
        self.map.len() == other.len()
            && other
                .iter()
                .all(|(key, score)| self.map.get(key).map_or(false, |meta| meta.score == *score))
    }
}

impl<'a, K: Hash + Eq> IntoIterator for &'a ScoreDict<K> {
    type Item = (Arc<K>, f64);
    type IntoIter = Items<'a, K>;

    fn into_iter(self) -> Items<'a, K> {
        self.items()
    }
}

impl<K: Hash + Eq + fmt::Debug> fmt::Display for ScoreDict<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, score)) in self.items().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key:?}: {score}")?;
        }
        f.write_str("}")
    }
}

impl<K: Hash + Eq + fmt::Debug> fmt::Debug for ScoreDict<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScoreDict {self}")
    }
}

#[cfg(test)]
impl<K: Hash + Eq> ScoreDict<K> {
    /// Asserts the skip-list invariants plus the map/list lockstep.
    pub(crate) fn check_invariants(&self) {
        self.list.check_invariants();
        assert_eq!(self.map.len(), self.list.len(), "map/list length mismatch");
        for (key, meta) in &self.map {
            let rank = self.list.rank_of(meta.score, meta.ord);
            assert!(rank > 0, "entry missing from skip list");
            let node = self.list.node_by_rank(rank).unwrap();
            let n_r = node.read().unwrap();
            assert_eq!(n_r.ord(), meta.ord);
            assert_eq!(n_r.score(), meta.score);
            assert!(Arc::ptr_eq(&n_r.obj().unwrap(), key), "payload not shared");
        }
    }
}
