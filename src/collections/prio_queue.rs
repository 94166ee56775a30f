//! # Indexed Priority Queue
//!
//! A binary max-heap that remembers where every key lives, so the priority of
//! a queued key can be raised in place. Entries with equal priority are
//! ordered by a caller-supplied rank: the smaller rank pops first. Given a
//! total rank, the pop order is fully determined by the pushes and
//! increases, which is what the graph colorer relies on.

use std::hash::Hash;

use rustc_hash::FxHashMap;

#[derive(Debug, Clone)]
struct Entry<K> {
    key: K,
    priority: usize,
    rank: usize,
}

impl<K> Entry<K> {
    /// Whether this entry should pop before `other`.
    fn outranks(&self, other: &Self) -> bool {
        self.priority > other.priority || (self.priority == other.priority && self.rank < other.rank)
    }
}

#[derive(Debug, Clone)]
pub struct PrioQueue<K> {
    heap: Vec<Entry<K>>,
    positions: FxHashMap<K, usize>,
}

impl<K> Default for PrioQueue<K> {
    fn default() -> Self {
        Self {
            heap: Vec::new(),
            positions: FxHashMap::default(),
        }
    }
}

impl<K> PrioQueue<K>
where
    K: Clone + Hash + Eq,
{
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.heap.len() }

    pub fn is_empty(&self) -> bool { self.heap.is_empty() }

    pub fn contains(&self, key: &K) -> bool { self.positions.contains_key(key) }

    pub fn priority(&self, key: &K) -> Option<usize> {
        self.positions.get(key).map(|i| self.heap[*i].priority)
    }

    /// Queue a key. Returns false if the key is already queued.
    pub fn push(&mut self, key: K, priority: usize, rank: usize) -> bool {
        if self.positions.contains_key(&key) {
            return false;
        }
        let idx = self.heap.len();
        self.positions.insert(key.clone(), idx);
        self.heap.push(Entry {
            key,
            priority,
            rank,
        });
        self.sift_up(idx);
        true
    }

    /// Remove the key with the highest priority, returning it with its
    /// priority.
    pub fn pop(&mut self) -> Option<(K, usize)> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.swap(0, last);
        let entry = self.heap.pop()?;
        self.positions.remove(&entry.key);
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Some((entry.key, entry.priority))
    }

    /// Raise the priority of a queued key. Returns false if the key is not
    /// queued.
    pub fn increase(&mut self, key: &K, by: usize) -> bool {
        let Some(&idx) = self.positions.get(key) else {
            return false;
        };
        self.heap[idx].priority += by;
        self.sift_up(idx);
        true
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.heap.swap(a, b);
        self.positions.insert(self.heap[a].key.clone(), a);
        self.positions.insert(self.heap[b].key.clone(), b);
    }

    fn sift_up(&mut self, mut idx: usize) {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if !self.heap[idx].outranks(&self.heap[parent]) {
                break;
            }
            self.swap(idx, parent);
            idx = parent;
        }
    }

    fn sift_down(&mut self, mut idx: usize) {
        loop {
            let left = 2 * idx + 1;
            let right = left + 1;
            let mut top = idx;

            if left < self.heap.len() && self.heap[left].outranks(&self.heap[top]) {
                top = left;
            }
            if right < self.heap.len() && self.heap[right].outranks(&self.heap[top]) {
                top = right;
            }
            if top == idx {
                break;
            }
            self.swap(idx, top);
            idx = top;
        }
    }
}

#[cfg(test)]
mod test {
    use super::PrioQueue;

    #[test]
    fn test_pop_order() {
        let mut q = PrioQueue::new();
        q.push("a", 1, 0);
        q.push("b", 3, 1);
        q.push("c", 2, 2);
        q.push("d", 3, 3);

        assert_eq!(q.pop(), Some(("b", 3)));
        assert_eq!(q.pop(), Some(("d", 3)));
        assert_eq!(q.pop(), Some(("c", 2)));
        assert_eq!(q.pop(), Some(("a", 1)));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn test_rank_breaks_ties() {
        let mut q = PrioQueue::new();
        for (rank, key) in ["z", "y", "x", "w"].into_iter().enumerate() {
            q.push(key, 0, rank);
        }
        let order: Vec<_> = std::iter::from_fn(|| q.pop().map(|(k, _)| k)).collect();
        assert_eq!(order, vec!["z", "y", "x", "w"]);
    }

    #[test]
    fn test_increase() {
        let mut q = PrioQueue::new();
        q.push(10, 0, 0);
        q.push(20, 0, 1);
        q.push(30, 0, 2);

        assert!(q.increase(&30, 2));
        assert!(q.increase(&20, 2));
        assert!(!q.increase(&40, 1));
        assert!(!q.push(20, 5, 5));

        assert_eq!(q.priority(&30), Some(2));
        assert_eq!(q.pop(), Some((20, 2)));
        assert_eq!(q.pop(), Some((30, 2)));
        assert!(q.contains(&10));
        assert_eq!(q.pop(), Some((10, 0)));
        assert!(q.is_empty());
    }
}
