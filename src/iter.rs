use std::sync::Arc;

use crate::error::{Error, Result};
use crate::skiplist::{NodeHandle, SkipCursor, SkipList};

/// Machinery shared by the public key/value/item iterators: the parent
/// list plus a windowed cursor. The borrow of the parent keeps the
/// container immutable for as long as the iterator lives.
pub(crate) struct RangeIter<'a, K> {
    list: &'a SkipList<K>,
    cursor: SkipCursor<K>,
}

impl<'a, K> RangeIter<'a, K> {
    pub(crate) fn from_head(list: &'a SkipList<K>) -> RangeIter<'a, K> {
        RangeIter { list, cursor: list.cursor_from_head() }
    }

    /// Bounds default to the first and tail scores; `min > max` yields the
    /// same window in descending order.
    pub(crate) fn from_range(
        list: &'a SkipList<K>,
        min: Option<f64>,
        max: Option<f64>,
    ) -> RangeIter<'a, K> {
        if list.len() == 0 {
            return RangeIter { list, cursor: SkipCursor::empty(true) };
        }
        if min.is_none() && max.is_none() {
            return Self::from_head(list);
        }
        let min = match min {
            Some(v) => v,
            None => list.first().unwrap().read().unwrap().score(),
        };
        let max = match max {
            Some(v) => v,
            None => list.tail().unwrap().read().unwrap().score(),
        };
        RangeIter { list, cursor: list.cursor_from_range(min, max) }
    }

    fn next_entry(&mut self) -> Option<(f64, Arc<K>)> {
        let (score, _, obj) = self.cursor.get()?;
        self.cursor.advance();
        Some((score, obj))
    }

    /// Entries left between the cursor position and the end of the window,
    /// computed with rank arithmetic.
    pub(crate) fn remaining(&self) -> usize {
        let (score, ord, _) = match self.cursor.get() {
            Some(entry) => entry,
            None => return 0,
        };
        let cur = self.list.rank_of(score, ord);
        if self.cursor.is_forward() {
            match self.list.last_in_range(self.cursor.min(), self.cursor.max()) {
                Some(last) => {
                    let (s, o) = {
                        let l_r = last.read().unwrap();
                        (l_r.score(), l_r.ord())
                    };
                    self.list.rank_of(s, o) + 1 - cur
                }
                None => 0,
            }
        } else {
            match self.list.first_in_range(self.cursor.min(), self.cursor.max()) {
                Some(first) => {
                    let (s, o) = {
                        let f_r = first.read().unwrap();
                        (f_r.score(), f_r.ord())
                    };
                    cur + 1 - self.list.rank_of(s, o)
                }
                None => 0,
            }
        }
    }

    /// The node `offset` steps along the iteration direction from the
    /// cursor, without advancing it.
    fn node_at(&self, offset: usize) -> Option<NodeHandle<K>> {
        let node = self.cursor.node()?;
        if self.cursor.is_forward() {
            let top = node.read().unwrap().height();
            SkipList::node_by_rank_from(&node, top, offset)
        } else {
            let (score, ord) = {
                let n_r = node.read().unwrap();
                (n_r.score(), n_r.ord())
            };
            let cur = self.list.rank_of(score, ord);
            self.list.node_by_rank(cur - offset)
        }
    }

    /// Positional access relative to the cursor; a negative index counts
    /// back from the remaining length.
    fn entry_at(&self, index: isize) -> Result<(f64, Arc<K>)> {
        let len = self.remaining();
        let mut at = index;
        if at < 0 {
            at += len as isize;
        }
        if at < 0 || at as usize >= len {
            return Err(Error::IndexOutOfRange { index, len });
        }
        match self.node_at(at as usize) {
            Some(node) => {
                let n_r = node.read().unwrap();
                Ok((n_r.score(), n_r.obj().unwrap()))
            }
            None => Err(Error::IndexOutOfRange { index, len }),
        }
    }

    /// Sub-iterator over `[start, stop)` of the remaining entries. Bounds
    /// follow slice semantics (negative values count from the end, then
    /// clamp); the window is materialized through the boundary scores.
    pub(crate) fn slice(&self, start: isize, stop: isize, step: isize) -> Result<RangeIter<'a, K>> {
        if step != 1 {
            return Err(Error::BadStep(step));
        }
        let len = self.remaining() as isize;
        let clamp = |v: isize| -> usize {
            if v < 0 {
                (v + len).max(0) as usize
            } else {
                v.min(len) as usize
            }
        };
        let lo = clamp(start);
        let hi = clamp(stop);
        if lo >= hi {
            let cursor = SkipCursor::empty(self.cursor.is_forward());
            return Ok(RangeIter { list: self.list, cursor });
        }
        let bounds = match (self.node_at(lo), self.node_at(hi - 1)) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        };
        let cursor = match bounds {
            Some((first, last)) => {
                let a = first.read().unwrap().score();
                let b = last.read().unwrap().score();
                self.list.cursor_from_range(a, b)
            }
            None => SkipCursor::empty(self.cursor.is_forward()),
        };
        Ok(RangeIter { list: self.list, cursor })
    }
}

/// Iterator over keys in score order.
pub struct Keys<'a, K> {
    inner: RangeIter<'a, K>,
}

/// Iterator over scores in score order.
pub struct Values<'a, K> {
    inner: RangeIter<'a, K>,
}

/// Iterator over (key, score) pairs in score order.
pub struct Items<'a, K> {
    inner: RangeIter<'a, K>,
}

impl<'a, K> Keys<'a, K> {
    pub(crate) fn new(inner: RangeIter<'a, K>) -> Keys<'a, K> {
        Keys { inner }
    }

    /// Entries left from the current position to the end of the window.
    pub fn remaining(&self) -> usize {
        self.inner.remaining()
    }

    /// The key `index` positions ahead, without advancing; negative
    /// indices count back from the remaining length.
    pub fn at(&self, index: isize) -> Result<Arc<K>> {
        self.inner.entry_at(index).map(|(_, key)| key)
    }

    /// A key iterator over `[start, stop)` of the remaining entries;
    /// `step` must be 1.
    pub fn slice(&self, start: isize, stop: isize, step: isize) -> Result<Keys<'a, K>> {
        Ok(Keys { inner: self.inner.slice(start, stop, step)? })
    }
}

impl<'a, K> Values<'a, K> {
    pub(crate) fn new(inner: RangeIter<'a, K>) -> Values<'a, K> {
        Values { inner }
    }

    pub fn remaining(&self) -> usize {
        self.inner.remaining()
    }

    /// The score `index` positions ahead, without advancing; negative
    /// indices count back from the remaining length.
    pub fn at(&self, index: isize) -> Result<f64> {
        self.inner.entry_at(index).map(|(score, _)| score)
    }

    /// A score iterator over `[start, stop)` of the remaining entries;
    /// `step` must be 1.
    pub fn slice(&self, start: isize, stop: isize, step: isize) -> Result<Values<'a, K>> {
        Ok(Values { inner: self.inner.slice(start, stop, step)? })
    }
}

impl<'a, K> Items<'a, K> {
    pub(crate) fn new(inner: RangeIter<'a, K>) -> Items<'a, K> {
        Items { inner }
    }

    pub fn remaining(&self) -> usize {
        self.inner.remaining()
    }

    /// The (key, score) pair `index` positions ahead, without advancing;
    /// negative indices count back from the remaining length.
    pub fn at(&self, index: isize) -> Result<(Arc<K>, f64)> {
        self.inner.entry_at(index).map(|(score, key)| (key, score))
    }

    /// A pair iterator over `[start, stop)` of the remaining entries;
    /// `step` must be 1.
    pub fn slice(&self, start: isize, stop: isize, step: isize) -> Result<Items<'a, K>> {
        Ok(Items { inner: self.inner.slice(start, stop, step)? })
    }
}

impl<'a, K> Iterator for Keys<'a, K> {
    type Item = Arc<K>;

    fn next(&mut self) -> Option<Arc<K>> {
        self.inner.next_entry().map(|(_, key)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.inner.remaining();
        (n, Some(n))
    }
}

impl<'a, K> Iterator for Values<'a, K> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        self.inner.next_entry().map(|(score, _)| score)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.inner.remaining();
        (n, Some(n))
    }
}

impl<'a, K> Iterator for Items<'a, K> {
    type Item = (Arc<K>, f64);

    fn next(&mut self) -> Option<(Arc<K>, f64)> {
        self.inner.next_entry().map(|(score, key)| (key, score))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.inner.remaining();
        (n, Some(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SkipList<&'static str> {
        let mut list = SkipList::new(32);
        for (i, &(score, name, level)) in [
            (1.0, "a", 1),
            (2.0, "b", 3),
            (3.0, "c", 1),
            (4.0, "d", 2),
            (5.0, "e", 1),
        ]
        .iter()
        .enumerate()
        {
            list.insert(score, i as u64 + 1, Arc::new(name), level);
        }
        list
    }

    fn collect_items(iter: Items<'_, &'static str>) -> Vec<(&'static str, f64)> {
        iter.map(|(key, score)| (*key, score)).collect()
    }

    #[test]
    fn head_iteration_test() {
        let list = sample();
        let items = collect_items(Items::new(RangeIter::from_head(&list)));
        assert_eq!(
            items,
            vec![("a", 1.0), ("b", 2.0), ("c", 3.0), ("d", 4.0), ("e", 5.0)]
        );

        let empty: SkipList<&'static str> = SkipList::new(32);
        assert_eq!(Items::new(RangeIter::from_head(&empty)).count(), 0);
    }

    #[test]
    fn range_iteration_test() {
        let list = sample();
        let items = collect_items(Items::new(RangeIter::from_range(
            &list,
            Some(1.5),
            Some(4.5),
        )));
        assert_eq!(items, vec![("b", 2.0), ("c", 3.0), ("d", 4.0)]);

        // min > max reverses the direction over the same window
        let items = collect_items(Items::new(RangeIter::from_range(
            &list,
            Some(4.5),
            Some(1.5),
        )));
        assert_eq!(items, vec![("d", 4.0), ("c", 3.0), ("b", 2.0)]);

        // one-sided bounds default to the ends of the list
        let items = collect_items(Items::new(RangeIter::from_range(&list, Some(3.0), None)));
        assert_eq!(items, vec![("c", 3.0), ("d", 4.0), ("e", 5.0)]);
        let values: Vec<f64> =
            Values::new(RangeIter::from_range(&list, None, Some(2.0))).collect();
        assert_eq!(values, vec![1.0, 2.0]);
    }

    #[test]
    fn remaining_test() {
        let list = sample();
        let mut items = Items::new(RangeIter::from_head(&list));
        assert_eq!(items.remaining(), 5);
        items.next();
        items.next();
        assert_eq!(items.remaining(), 3);
        for _ in items.by_ref() {}
        assert_eq!(items.remaining(), 0);

        let windowed = Items::new(RangeIter::from_range(&list, Some(2.0), Some(4.0)));
        assert_eq!(windowed.remaining(), 3);
        let reversed = Items::new(RangeIter::from_range(&list, Some(4.0), Some(2.0)));
        assert_eq!(reversed.remaining(), 3);
    }

    #[test]
    fn subscript_test() {
        let list = sample();
        let keys = Keys::new(RangeIter::from_head(&list));
        assert_eq!(*keys.at(0).unwrap(), "a");
        assert_eq!(*keys.at(4).unwrap(), "e");
        assert_eq!(*keys.at(-1).unwrap(), "e");
        assert_eq!(*keys.at(-5).unwrap(), "a");
        assert_eq!(
            keys.at(5),
            Err(Error::IndexOutOfRange { index: 5, len: 5 })
        );
        assert_eq!(
            keys.at(-6),
            Err(Error::IndexOutOfRange { index: -6, len: 5 })
        );

        // subscripts are relative to the cursor position
        let mut values = Values::new(RangeIter::from_head(&list));
        values.next();
        values.next();
        assert_eq!(values.at(0).unwrap(), 3.0);
        assert_eq!(values.at(-1).unwrap(), 5.0);
        assert!(values.at(3).is_err());

        // and respect the direction of a reversed window
        let items = Items::new(RangeIter::from_range(&list, Some(5.0), Some(1.0)));
        let (key, score) = items.at(1).unwrap();
        assert_eq!((*key, score), ("d", 4.0));
        let (key, _) = items.at(-1).unwrap();
        assert_eq!(*key, "a");
    }

    #[test]
    fn slice_test() {
        let list = sample();
        let items = Items::new(RangeIter::from_head(&list));

        assert!(matches!(items.slice(0, 5, 2), Err(Error::BadStep(2))));

        let sub = items.slice(1, 4, 1).unwrap();
        assert_eq!(collect_items(sub), vec![("b", 2.0), ("c", 3.0), ("d", 4.0)]);

        // negative bounds count from the end, out-of-range bounds clamp
        let sub = items.slice(-2, 100, 1).unwrap();
        assert_eq!(collect_items(sub), vec![("d", 4.0), ("e", 5.0)]);

        let sub = items.slice(3, 1, 1).unwrap();
        assert_eq!(collect_items(sub), vec![]);

        // slicing after consumption is relative to the cursor
        let mut items = Items::new(RangeIter::from_head(&list));
        items.next();
        let sub = items.slice(0, 2, 1).unwrap();
        assert_eq!(collect_items(sub), vec![("b", 2.0), ("c", 3.0)]);

        // a reversed iterator slices in its own direction
        let reversed = Items::new(RangeIter::from_range(&list, Some(5.0), Some(1.0)));
        let sub = reversed.slice(1, 3, 1).unwrap();
        assert_eq!(collect_items(sub), vec![("d", 4.0), ("c", 3.0)]);
    }

    #[test]
    fn slice_equal_scores_test() {
        let mut list = SkipList::new(32);
        for ord in 1..=4u64 {
            list.insert(1.0, ord, Arc::new(ord), 1);
        }
        let items = Items::new(RangeIter::from_head(&list));
        // boundary scores are equal, so the whole tie group is covered
        let sub = items.slice(1, 3, 1).unwrap();
        let got: Vec<u64> = sub.map(|(key, _)| *key).collect();
        assert_eq!(got, vec![1, 2, 3, 4]);
    }
}
