use std::sync::{Arc, RwLock, Weak};

use log::debug;

pub(crate) type NodeHandle<T> = Arc<RwLock<SkipNode<T>>>;

/// One forward link of a node. `span` counts the level-0 hops the link
/// skips; a dangling link keeps the distance to the end of the list.
struct SkipLevel<T> {
    forward: Option<NodeHandle<T>>,
    span: usize,
}

pub(crate) struct SkipNode<T> {
    score: f64,
    ord: u64,
    obj: Option<Arc<T>>, // None only for the header sentinel
    backward: Option<Weak<RwLock<SkipNode<T>>>>,
    level: Vec<SkipLevel<T>>,
}

impl<T> SkipNode<T> {
    fn new(height: usize, score: f64, ord: u64, obj: Option<Arc<T>>) -> SkipNode<T> {
        let mut level = Vec::with_capacity(height);
        for _ in 0..height {
            level.push(SkipLevel { forward: None, span: 0 });
        }
        SkipNode { score, ord, obj, backward: None, level }
    }

    /// Strict (score, ord) order used by the insert and delete walks.
    fn precedes(&self, score: f64, ord: u64) -> bool {
        self.score < score || (self.score == score && self.ord < ord)
    }

    pub(crate) fn score(&self) -> f64 {
        self.score
    }

    pub(crate) fn ord(&self) -> u64 {
        self.ord
    }

    pub(crate) fn obj(&self) -> Option<Arc<T>> {
        self.obj.clone()
    }

    pub(crate) fn height(&self) -> usize {
        self.level.len()
    }
}

pub(crate) enum DeleteOutcome<T> {
    NotFound,
    Removed(Arc<T>),
    Adjusted(f64),
}

pub(crate) struct SkipList<T> {
    header: NodeHandle<T>,
    tail: Option<NodeHandle<T>>,
    length: usize,
    level: usize,
    maxlevel: usize,
}

impl<T> SkipList<T> {
    pub(crate) fn new(maxlevel: usize) -> SkipList<T> {
        SkipList {
            header: Arc::new(RwLock::new(SkipNode::new(maxlevel, 0.0, 0, None))),
            tail: None,
            length: 0,
            level: 1,
            maxlevel,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.length
    }

    pub(crate) fn maxlevel(&self) -> usize {
        self.maxlevel
    }

    pub(crate) fn tail(&self) -> Option<NodeHandle<T>> {
        self.tail.clone()
    }

    pub(crate) fn first(&self) -> Option<NodeHandle<T>> {
        self.header.read().unwrap().level[0].forward.clone()
    }

    /// Inserts a node at the given level. The caller must have checked in
    /// the key map that no node with this (score, ord) pair is already
    /// inside, since duplicated scores are allowed.
    pub(crate) fn insert(&mut self, score: f64, ord: u64, obj: Arc<T>, level: usize) {
        let mut update: Vec<Option<NodeHandle<T>>> = vec![None; self.maxlevel];
        let mut rank = vec![0usize; self.maxlevel];

        let mut x = self.header.clone();
        for i in (0..self.level).rev() {
            // store rank that is crossed to reach the insert position
            rank[i] = if i == self.level - 1 { 0 } else { rank[i + 1] };
            loop {
                let step = {
                    let x_r = x.read().unwrap();
                    match &x_r.level[i].forward {
                        Some(next) if next.read().unwrap().precedes(score, ord) => {
                            Some((next.clone(), x_r.level[i].span))
                        }
                        _ => None,
                    }
                };
                match step {
                    Some((next, span)) => {
                        rank[i] += span;
                        x = next;
                    }
                    None => break,
                }
            }
            update[i] = Some(x.clone());
        }

        if level > self.level {
            for i in self.level..level {
                rank[i] = 0;
                self.header.write().unwrap().level[i].span = self.length;
                update[i] = Some(self.header.clone());
            }
            debug!("skip list level raised from {} to {}", self.level, level);
            self.level = level;
        }

        let x = Arc::new(RwLock::new(SkipNode::new(level, score, ord, Some(obj))));
        for i in 0..level {
            let prev = update[i].as_ref().unwrap();
            let mut prev_w = prev.write().unwrap();
            let mut x_w = x.write().unwrap();
            x_w.level[i].forward = prev_w.level[i].forward.take();
            prev_w.level[i].forward = Some(x.clone());

            // update span covered by update[i] as x is inserted here
            x_w.level[i].span = prev_w.level[i].span - (rank[0] - rank[i]);
            prev_w.level[i].span = (rank[0] - rank[i]) + 1;
        }

        // increment span for untouched levels
        for i in level..self.level {
            update[i].as_ref().unwrap().write().unwrap().level[i].span += 1;
        }

        {
            let prev = update[0].as_ref().unwrap();
            let backward = if prev.read().unwrap().obj.is_none() {
                None
            } else {
                Some(Arc::downgrade(prev))
            };
            x.write().unwrap().backward = backward;
        }
        let forward0 = x.read().unwrap().level[0].forward.clone();
        match forward0 {
            Some(next) => next.write().unwrap().backward = Some(Arc::downgrade(&x)),
            None => self.tail = Some(x.clone()),
        }
        self.length += 1;
    }

    /// Deletes the node with matching (score, ord). With a positive
    /// `change` the node is kept and its score bumped in place when the
    /// new score still precedes the successor's, or the node is the tail.
    pub(crate) fn delete(&mut self, score: f64, ord: u64, change: f64) -> DeleteOutcome<T> {
        let mut update: Vec<Option<NodeHandle<T>>> = vec![None; self.maxlevel];

        let mut x = self.header.clone();
        for i in (0..self.level).rev() {
            loop {
                let step = {
                    let x_r = x.read().unwrap();
                    match &x_r.level[i].forward {
                        Some(next) if next.read().unwrap().precedes(score, ord) => {
                            Some(next.clone())
                        }
                        _ => None,
                    }
                };
                match step {
                    Some(next) => x = next,
                    None => break,
                }
            }
            update[i] = Some(x.clone());
        }

        // we may have multiple elements with the same score, what we need
        // is the element with both the right score and ord
        let x = match x.read().unwrap().level[0].forward.clone() {
            Some(next) => next,
            None => return DeleteOutcome::NotFound,
        };
        {
            let x_r = x.read().unwrap();
            if x_r.score != score || x_r.ord != ord {
                return DeleteOutcome::NotFound;
            }
        }

        if change > 0.0 {
            let next = x.read().unwrap().level[0].forward.clone();
            let fits = match &next {
                Some(y) => score + change < y.read().unwrap().score,
                None => true,
            };
            if fits {
                let mut x_w = x.write().unwrap();
                x_w.score = score + change;
                return DeleteOutcome::Adjusted(x_w.score);
            }
        }

        self.unlink(&x, &update);
        let obj = x.write().unwrap().obj.take().unwrap();
        DeleteOutcome::Removed(obj)
    }

    /// Internal function used by delete and delete_range_by_rank.
    fn unlink(&mut self, x: &NodeHandle<T>, update: &[Option<NodeHandle<T>>]) {
        for i in 0..self.level {
            let prev = update[i].as_ref().unwrap();
            let points_at_x = {
                let prev_r = prev.read().unwrap();
                matches!(&prev_r.level[i].forward, Some(next) if Arc::ptr_eq(next, x))
            };
            if points_at_x {
                let (x_span, x_forward) = {
                    let x_r = x.read().unwrap();
                    (x_r.level[i].span, x_r.level[i].forward.clone())
                };
                let mut prev_w = prev.write().unwrap();
                prev_w.level[i].span = prev_w.level[i].span + x_span - 1;
                prev_w.level[i].forward = x_forward;
            } else {
                prev.write().unwrap().level[i].span -= 1;
            }
        }

        let (x_forward, x_backward) = {
            let x_r = x.read().unwrap();
            (x_r.level[0].forward.clone(), x_r.backward.clone())
        };
        match x_forward {
            Some(next) => next.write().unwrap().backward = x_backward,
            None => self.tail = x_backward.and_then(|w| w.upgrade()),
        }

        while self.level > 1
            && self.header.read().unwrap().level[self.level - 1].forward.is_none()
        {
            self.level -= 1;
        }
        self.length -= 1;
    }

    /// Deletes all nodes with 1-based rank between `start` and `end`
    /// inclusive, handing each payload to `cb` before it is dropped.
    /// Returns the number of nodes removed.
    pub(crate) fn delete_range_by_rank<F>(&mut self, start: usize, end: usize, mut cb: F) -> usize
    where
        F: FnMut(&Arc<T>),
    {
        let mut update: Vec<Option<NodeHandle<T>>> = vec![None; self.maxlevel];
        let mut traversed = 0usize;

        let mut x = self.header.clone();
        for i in (0..self.level).rev() {
            loop {
                let step = {
                    let x_r = x.read().unwrap();
                    match &x_r.level[i].forward {
                        Some(next) if traversed + x_r.level[i].span < start => {
                            Some((next.clone(), x_r.level[i].span))
                        }
                        _ => None,
                    }
                };
                match step {
                    Some((next, span)) => {
                        traversed += span;
                        x = next;
                    }
                    None => break,
                }
            }
            update[i] = Some(x.clone());
        }

        traversed += 1;
        let mut removed = 0;
        let mut cur = x.read().unwrap().level[0].forward.clone();
        while let Some(node) = cur {
            if traversed > end {
                break;
            }
            let next = node.read().unwrap().level[0].forward.clone();
            self.unlink(&node, &update);
            if let Some(obj) = node.write().unwrap().obj.take() {
                cb(&obj);
            }
            removed += 1;
            traversed += 1;
            cur = next;
        }
        if removed > 0 {
            debug!("removed {} nodes in rank range [{}, {}]", removed, start, end);
        }
        removed
    }

    /// Finds the 1-based rank for an element by (score, ord).
    /// Returns 0 when the element cannot be found.
    pub(crate) fn rank_of(&self, score: f64, ord: u64) -> usize {
        let mut rank = 0usize;
        let mut x = self.header.clone();
        for i in (0..self.level).rev() {
            loop {
                let step = {
                    let x_r = x.read().unwrap();
                    match &x_r.level[i].forward {
                        Some(next) => {
                            let n_r = next.read().unwrap();
                            if n_r.score < score || (n_r.score == score && n_r.ord <= ord) {
                                Some((next.clone(), x_r.level[i].span))
                            } else {
                                None
                            }
                        }
                        None => None,
                    }
                };
                match step {
                    Some((next, span)) => {
                        rank += span;
                        x = next;
                    }
                    None => break,
                }
            }

            // x might still be the header, so test for a payload
            let found = {
                let x_r = x.read().unwrap();
                x_r.obj.is_some() && x_r.ord == ord
            };
            if found {
                return rank;
            }
        }
        0
    }

    /// Finds an element by its 1-based rank.
    pub(crate) fn node_by_rank(&self, rank: usize) -> Option<NodeHandle<T>> {
        if rank == 0 || rank > self.length {
            return None;
        }
        Self::node_by_rank_from(&self.header, self.level, rank)
    }

    /// Rank walk starting from an arbitrary node; rank 0 is `start`
    /// itself. `top` bounds the levels consulted and must not exceed the
    /// start node's height.
    pub(crate) fn node_by_rank_from(
        start: &NodeHandle<T>,
        top: usize,
        rank: usize,
    ) -> Option<NodeHandle<T>> {
        let mut traversed = 0usize;
        let mut x = start.clone();
        for i in (0..top).rev() {
            loop {
                let step = {
                    let x_r = x.read().unwrap();
                    match &x_r.level[i].forward {
                        Some(next) if traversed + x_r.level[i].span <= rank => {
                            Some((next.clone(), x_r.level[i].span))
                        }
                        _ => None,
                    }
                };
                match step {
                    Some((next, span)) => {
                        traversed += span;
                        x = next;
                    }
                    None => break,
                }
            }
            if traversed == rank {
                return Some(x);
            }
        }
        None
    }

    /// Returns whether some part of the list falls in [min, max].
    pub(crate) fn is_in_range(&self, min: f64, max: f64) -> bool {
        // test for ranges that will always be empty
        if min > max {
            return false;
        }
        let tail = match &self.tail {
            Some(tail) => tail,
            None => return false,
        };
        if tail.read().unwrap().score < min {
            return false;
        }
        match self.first() {
            Some(first) => first.read().unwrap().score <= max,
            None => false,
        }
    }

    /// Finds the first node contained in [min, max], or None when no node
    /// falls in the range.
    pub(crate) fn first_in_range(&self, min: f64, max: f64) -> Option<NodeHandle<T>> {
        if !self.is_in_range(min, max) {
            return None;
        }
        let mut x = self.header.clone();
        for i in (0..self.level).rev() {
            // go forward while *OUT* of range
            loop {
                let step = {
                    let x_r = x.read().unwrap();
                    match &x_r.level[i].forward {
                        Some(next) if next.read().unwrap().score < min => Some(next.clone()),
                        _ => None,
                    }
                };
                match step {
                    Some(next) => x = next,
                    None => break,
                }
            }
        }
        // this is an inner range, so the next node cannot be None
        let next = x.read().unwrap().level[0].forward.clone();
        next
    }

    /// Finds the last node contained in [min, max], or None when no node
    /// falls in the range.
    pub(crate) fn last_in_range(&self, min: f64, max: f64) -> Option<NodeHandle<T>> {
        if !self.is_in_range(min, max) {
            return None;
        }
        let mut x = self.header.clone();
        for i in (0..self.level).rev() {
            // go forward while *IN* range
            loop {
                let step = {
                    let x_r = x.read().unwrap();
                    match &x_r.level[i].forward {
                        Some(next) if next.read().unwrap().score <= max => Some(next.clone()),
                        _ => None,
                    }
                };
                match step {
                    Some(next) => x = next,
                    None => break,
                }
            }
        }
        Some(x)
    }

    pub(crate) fn cursor_from_head(&self) -> SkipCursor<T> {
        match (self.first(), self.tail()) {
            (Some(first), Some(tail)) => {
                let min = first.read().unwrap().score;
                let max = tail.read().unwrap().score;
                SkipCursor { node: Some(first), forward: true, min, max }
            }
            _ => SkipCursor::empty(true),
        }
    }

    /// Builds a cursor over [min, max]; passing min > max swaps the bounds
    /// and reverses the direction.
    pub(crate) fn cursor_from_range(&self, mut min: f64, mut max: f64) -> SkipCursor<T> {
        let reversed = min > max;
        if reversed {
            std::mem::swap(&mut min, &mut max);
        }
        let node = if reversed {
            self.last_in_range(min, max)
        } else {
            self.first_in_range(min, max)
        };
        SkipCursor { node, forward: !reversed, min, max }
    }
}

impl<T> Drop for SkipList<T> {
    fn drop(&mut self) {
        // sever the forward chains so node drops stay iterative
        let mut node = self.header.write().unwrap().level[0].forward.take();
        while let Some(n) = node {
            let mut n_w = n.write().unwrap();
            node = n_w.level[0].forward.take();
            for slot in n_w.level.iter_mut() {
                slot.forward = None;
            }
        }
        for slot in self.header.write().unwrap().level.iter_mut() {
            slot.forward = None;
        }
        self.tail = None;
    }
}

/// A single-pass cursor: a direction, an inclusive score window and a
/// current node. Stepping outside the window ends the cursor.
pub(crate) struct SkipCursor<T> {
    node: Option<NodeHandle<T>>,
    forward: bool,
    min: f64,
    max: f64,
}

impl<T> SkipCursor<T> {
    pub(crate) fn empty(forward: bool) -> SkipCursor<T> {
        SkipCursor { node: None, forward, min: 0.0, max: 0.0 }
    }

    pub(crate) fn is_forward(&self) -> bool {
        self.forward
    }

    pub(crate) fn min(&self) -> f64 {
        self.min
    }

    pub(crate) fn max(&self) -> f64 {
        self.max
    }

    pub(crate) fn node(&self) -> Option<NodeHandle<T>> {
        self.node.clone()
    }

    /// Yields (score, ord, payload) for the current node, or None when the
    /// cursor is exhausted or has left the score window.
    pub(crate) fn get(&self) -> Option<(f64, u64, Arc<T>)> {
        let node = self.node.as_ref()?;
        let n_r = node.read().unwrap();
        let obj = n_r.obj.as_ref()?;
        if n_r.score >= self.min && n_r.score <= self.max {
            Some((n_r.score, n_r.ord, obj.clone()))
        } else {
            None
        }
    }

    /// Steps level-0 forward, or along the backward pointer when reversed.
    pub(crate) fn advance(&mut self) {
        if let Some(node) = self.node.take() {
            let n_r = node.read().unwrap();
            self.node = if self.forward {
                n_r.level[0].forward.clone()
            } else {
                n_r.backward.as_ref().and_then(|w| w.upgrade())
            };
        }
    }
}

#[cfg(test)]
impl<T> SkipList<T> {
    /// Walks the whole structure and asserts every internal invariant:
    /// strict level-0 (score, ord) order, backward links, tail, current
    /// level bookkeeping and span arithmetic at every populated level.
    pub(crate) fn check_invariants(&self) {
        let mut nodes: Vec<NodeHandle<T>> = Vec::new();
        let mut cur = self.first();
        while let Some(n) = cur {
            nodes.push(n.clone());
            cur = n.read().unwrap().level[0].forward.clone();
        }
        assert_eq!(nodes.len(), self.length, "length mismatch");

        for pair in nodes.windows(2) {
            let a = pair[0].read().unwrap();
            let b = pair[1].read().unwrap();
            assert!(
                a.score < b.score || (a.score == b.score && a.ord < b.ord),
                "level-0 order violated"
            );
        }

        match &self.tail {
            Some(tail) => assert!(Arc::ptr_eq(tail, nodes.last().unwrap()), "stale tail"),
            None => assert!(nodes.is_empty(), "tail missing"),
        }
        for (i, n) in nodes.iter().enumerate() {
            let back = n.read().unwrap().backward.clone().and_then(|w| w.upgrade());
            match back {
                Some(prev) => {
                    assert!(i > 0 && Arc::ptr_eq(&prev, &nodes[i - 1]), "bad backward link")
                }
                None => assert_eq!(i, 0, "missing backward link"),
            }
        }

        assert!(self.level >= 1 && self.level <= self.maxlevel);
        {
            let header_r = self.header.read().unwrap();
            for i in self.level..self.maxlevel {
                assert!(header_r.level[i].forward.is_none(), "stale level {i}");
            }
            if self.level > 1 {
                assert!(
                    header_r.level[self.level - 1].forward.is_some(),
                    "current level overstated"
                );
            }
        }

        let rank_of_handle = |h: &NodeHandle<T>| -> usize {
            nodes.iter().position(|n| Arc::ptr_eq(n, h)).unwrap() + 1
        };
        for i in 0..self.level {
            let mut at = 0usize;
            let mut x = self.header.clone();
            loop {
                let (span, forward) = {
                    let x_r = x.read().unwrap();
                    (x_r.level[i].span, x_r.level[i].forward.clone())
                };
                match forward {
                    Some(next) => {
                        let next_rank = rank_of_handle(&next);
                        assert_eq!(at + span, next_rank, "span mismatch at level {i}");
                        at = next_rank;
                        x = next;
                    }
                    None => {
                        assert_eq!(at + span, self.length, "dangling span at level {i}");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn entries(list: &SkipList<&'static str>) -> Vec<(f64, &'static str)> {
        let mut out = Vec::new();
        let mut cursor = list.cursor_from_head();
        while let Some((score, _, obj)) = cursor.get() {
            out.push((score, *obj));
            cursor.advance();
        }
        out
    }

    fn build(pairs: &[(f64, u64, &'static str, usize)]) -> SkipList<&'static str> {
        let mut list = SkipList::new(32);
        for &(score, ord, name, level) in pairs {
            list.insert(score, ord, Arc::new(name), level);
            list.check_invariants();
        }
        list
    }

    #[test]
    fn insert_order_test() {
        let list = build(&[
            (3.0, 1, "a", 2),
            (1.0, 2, "b", 1),
            (2.0, 3, "c", 4),
            (2.5, 4, "d", 1),
            (0.5, 5, "e", 3),
        ]);
        assert_eq!(list.len(), 5);
        assert_eq!(
            entries(&list),
            vec![(0.5, "e"), (1.0, "b"), (2.0, "c"), (2.5, "d"), (3.0, "a")]
        );
    }

    #[test]
    fn equal_scores_order_by_ord_test() {
        let list = build(&[
            (1.0, 30, "x", 1),
            (1.0, 10, "y", 2),
            (1.0, 20, "z", 1),
        ]);
        assert_eq!(entries(&list), vec![(1.0, "y"), (1.0, "z"), (1.0, "x")]);
    }

    #[test]
    fn delete_test() {
        let mut list = build(&[
            (1.0, 1, "a", 1),
            (2.0, 2, "b", 3),
            (3.0, 3, "c", 2),
        ]);

        // wrong ord on an existing score is not a match
        assert!(matches!(list.delete(2.0, 9, 0.0), DeleteOutcome::NotFound));
        assert!(matches!(list.delete(9.0, 2, 0.0), DeleteOutcome::NotFound));

        match list.delete(2.0, 2, 0.0) {
            DeleteOutcome::Removed(obj) => assert_eq!(*obj, "b"),
            _ => panic!("expected removal"),
        }
        list.check_invariants();
        assert_eq!(entries(&list), vec![(1.0, "a"), (3.0, "c")]);

        match list.delete(1.0, 1, 0.0) {
            DeleteOutcome::Removed(obj) => assert_eq!(*obj, "a"),
            _ => panic!("expected removal"),
        }
        match list.delete(3.0, 3, 0.0) {
            DeleteOutcome::Removed(obj) => assert_eq!(*obj, "c"),
            _ => panic!("expected removal"),
        }
        list.check_invariants();
        assert_eq!(list.len(), 0);
        assert!(list.tail().is_none());
    }

    #[test]
    fn adjust_in_place_test() {
        let mut list = build(&[
            (1.0, 1, "a", 1),
            (2.0, 2, "b", 2),
            (4.0, 3, "c", 1),
        ]);

        // 2.0 + 1.5 still precedes 4.0, so the node is kept
        match list.delete(2.0, 2, 1.5) {
            DeleteOutcome::Adjusted(score) => assert_eq!(score, 3.5),
            _ => panic!("expected in-place adjustment"),
        }
        list.check_invariants();
        assert_eq!(entries(&list), vec![(1.0, "a"), (3.5, "b"), (4.0, "c")]);

        // the tail has no successor, any positive change fits
        match list.delete(4.0, 3, 100.0) {
            DeleteOutcome::Adjusted(score) => assert_eq!(score, 104.0),
            _ => panic!("expected in-place adjustment"),
        }
        list.check_invariants();

        // a change that crosses the successor falls back to removal
        match list.delete(1.0, 1, 10.0) {
            DeleteOutcome::Removed(obj) => assert_eq!(*obj, "a"),
            _ => panic!("expected removal"),
        }
        list.check_invariants();
        assert_eq!(entries(&list), vec![(3.5, "b"), (104.0, "c")]);

        // non-positive changes never adjust in place
        match list.delete(3.5, 2, -1.0) {
            DeleteOutcome::Removed(obj) => assert_eq!(*obj, "b"),
            _ => panic!("expected removal"),
        }
        list.check_invariants();
    }

    #[test]
    fn rank_test() {
        let list = build(&[
            (1.0, 1, "a", 1),
            (2.0, 2, "b", 3),
            (2.0, 3, "c", 2),
            (5.0, 4, "d", 1),
        ]);
        assert_eq!(list.rank_of(1.0, 1), 1);
        assert_eq!(list.rank_of(2.0, 2), 2);
        assert_eq!(list.rank_of(2.0, 3), 3);
        assert_eq!(list.rank_of(5.0, 4), 4);
        assert_eq!(list.rank_of(2.0, 9), 0);
        assert_eq!(list.rank_of(3.0, 1), 0);

        for rank in 1..=4 {
            let node = list.node_by_rank(rank).unwrap();
            let n_r = node.read().unwrap();
            assert_eq!(list.rank_of(n_r.score(), n_r.ord()), rank);
        }
        assert!(list.node_by_rank(0).is_none());
        assert!(list.node_by_rank(5).is_none());
    }

    #[test]
    fn node_by_rank_from_test() {
        let list = build(&[
            (1.0, 1, "a", 2),
            (2.0, 2, "b", 1),
            (3.0, 3, "c", 3),
            (4.0, 4, "d", 1),
        ]);
        let second = list.node_by_rank(2).unwrap();
        let top = second.read().unwrap().height();

        let same = SkipList::node_by_rank_from(&second, top, 0).unwrap();
        assert!(Arc::ptr_eq(&same, &second));

        let fourth = SkipList::node_by_rank_from(&second, top, 2).unwrap();
        assert_eq!(*fourth.read().unwrap().obj().unwrap(), "d");

        assert!(SkipList::node_by_rank_from(&second, top, 3).is_none());
    }

    #[test]
    fn delete_range_by_rank_test() {
        let mut list = build(&[
            (1.0, 1, "a", 1),
            (2.0, 2, "b", 2),
            (3.0, 3, "c", 1),
            (4.0, 4, "d", 3),
            (5.0, 5, "e", 1),
        ]);

        let mut seen = Vec::new();
        let removed = list.delete_range_by_rank(2, 4, |obj| seen.push(**obj));
        assert_eq!(removed, 3);
        assert_eq!(seen, vec!["b", "c", "d"]);
        list.check_invariants();
        assert_eq!(entries(&list), vec![(1.0, "a"), (5.0, "e")]);

        // end past the length is clamped by exhaustion
        let removed = list.delete_range_by_rank(1, 100, |_| {});
        assert_eq!(removed, 2);
        list.check_invariants();
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn range_query_test() {
        let list = build(&[
            (1.0, 1, "a", 1),
            (2.0, 2, "b", 2),
            (3.0, 3, "c", 1),
        ]);

        assert!(list.is_in_range(0.0, 10.0));
        assert!(list.is_in_range(1.5, 2.5));
        assert!(!list.is_in_range(3.5, 10.0));
        assert!(!list.is_in_range(0.0, 0.5));
        assert!(!list.is_in_range(2.0, 1.0));

        let first = list.first_in_range(1.5, 10.0).unwrap();
        assert_eq!(*first.read().unwrap().obj().unwrap(), "b");
        let last = list.last_in_range(0.0, 2.5).unwrap();
        assert_eq!(*last.read().unwrap().obj().unwrap(), "b");
        assert!(list.first_in_range(3.5, 10.0).is_none());
        assert!(list.last_in_range(2.0, 1.0).is_none());

        let empty: SkipList<&'static str> = SkipList::new(32);
        assert!(!empty.is_in_range(0.0, 10.0));
    }

    #[test]
    fn cursor_test() {
        let list = build(&[
            (1.0, 1, "a", 1),
            (2.0, 2, "b", 2),
            (3.0, 3, "c", 1),
        ]);

        let mut cursor = list.cursor_from_range(1.5, 10.0);
        let mut seen = Vec::new();
        while let Some((score, _, obj)) = cursor.get() {
            seen.push((score, *obj));
            cursor.advance();
        }
        assert_eq!(seen, vec![(2.0, "b"), (3.0, "c")]);

        // reversed bounds iterate backward over the same window
        let mut cursor = list.cursor_from_range(10.0, 0.0);
        let mut seen = Vec::new();
        while let Some((score, _, obj)) = cursor.get() {
            seen.push((score, *obj));
            cursor.advance();
        }
        assert_eq!(seen, vec![(3.0, "c"), (2.0, "b"), (1.0, "a")]);

        let empty: SkipList<&'static str> = SkipList::new(32);
        assert!(empty.cursor_from_head().get().is_none());
    }

    #[test]
    fn randomized_churn_test() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut list: SkipList<u64> = SkipList::new(16);
        let mut alive: Vec<(f64, u64)> = Vec::new();
        let mut ord = 0u64;

        for round in 0..400 {
            if alive.is_empty() || rng.gen_bool(0.6) {
                let score = f64::from(rng.gen_range(-50i32..50));
                ord += 1;
                let level = rng.gen_range(1..=8);
                list.insert(score, ord, Arc::new(ord), level);
                alive.push((score, ord));
            } else {
                let victim = rng.gen_range(0..alive.len());
                let (score, ord) = alive.swap_remove(victim);
                match list.delete(score, ord, 0.0) {
                    DeleteOutcome::Removed(obj) => assert_eq!(*obj, ord),
                    _ => panic!("round {round}: expected removal"),
                }
            }
            list.check_invariants();
            assert_eq!(list.len(), alive.len());
        }

        // every survivor is still rank-addressable
        for &(score, ord) in &alive {
            let rank = list.rank_of(score, ord);
            assert!(rank >= 1);
            let node = list.node_by_rank(rank).unwrap();
            assert_eq!(node.read().unwrap().ord(), ord);
        }
    }
}
