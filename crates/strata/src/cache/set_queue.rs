use std::collections::BTreeMap;

/// A FIFO queue that holds each key at most once and supports removing arbitrary keys.
///
/// Keys are kept in a doubly linked list (stored in a slab of reusable slots) and indexed by a
/// [`BTreeMap`], so every operation is `O(log n)`. [`SetQueue::pop_front`] finds the oldest key
/// through the list head without searching the index.
#[derive(Debug, Clone)]
pub struct SetQueue<K> {
    slots: Vec<Option<Node<K>>>,
    free: Vec<usize>,
    positions: BTreeMap<K, usize>,
    /// Oldest key.
    head: Option<usize>,
    /// Newest key.
    tail: Option<usize>,
}

#[derive(Debug, Clone)]
struct Node<K> {
    key: K,
    prev: Option<usize>,
    next: Option<usize>,
}

impl<K: Ord + Clone> SetQueue<K> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            positions: BTreeMap::new(),
            head: None,
            tail: None,
        }
    }

    /// Appends `key` at the newest end of the queue.
    ///
    /// # Panics
    ///
    /// This method will panic if `key` is already queued.
    #[track_caller]
    pub fn push_back(&mut self, key: K) {
        assert!(
            !self.positions.contains_key(&key),
            "key is already present in the queue"
        );

        let node = Node {
            key: key.clone(),
            prev: self.tail,
            next: None,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                slot
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };

        match self.tail {
            Some(tail) => self.node_mut(tail).next = Some(slot),
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
        self.positions.insert(key, slot);
    }

    /// Removes and returns the oldest key.
    pub fn pop_front(&mut self) -> Option<K> {
        let head = self.head?;
        let key = self.unlink(head);
        self.positions.remove(&key);
        Some(key)
    }

    /// Removes `key` from the queue, returning whether it was present.
    pub fn remove(&mut self, key: &K) -> bool {
        match self.positions.remove(key) {
            Some(slot) => {
                self.unlink(slot);
                true
            }
            None => false,
        }
    }

    /// Returns the oldest key without removing it.
    pub fn front(&self) -> Option<&K> {
        self.head.map(|slot| &self.node(slot).key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.positions.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Iterates over the queued keys, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &K> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let node = self.node(cursor?);
            cursor = node.next;
            Some(&node.key)
        })
    }

    fn unlink(&mut self, slot: usize) -> K {
        let Some(node) = self.slots[slot].take() else {
            unreachable!("queue slot {slot} is vacant");
        };
        match node.prev {
            Some(prev) => self.node_mut(prev).next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.node_mut(next).prev = node.prev,
            None => self.tail = node.prev,
        }
        self.free.push(slot);
        node.key
    }

    fn node(&self, slot: usize) -> &Node<K> {
        match &self.slots[slot] {
            Some(node) => node,
            None => unreachable!("queue slot {slot} is vacant"),
        }
    }

    fn node_mut(&mut self, slot: usize) -> &mut Node<K> {
        match &mut self.slots[slot] {
            Some(node) => node,
            None => unreachable!("queue slot {slot} is vacant"),
        }
    }
}

impl<K: Ord + Clone> Default for SetQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(queue: &SetQueue<u32>) -> Vec<u32> {
        queue.iter().copied().collect()
    }

    #[test]
    fn fifo_order() {
        let mut queue = SetQueue::new();
        queue.push_back(3);
        queue.push_back(1);
        queue.push_back(2);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.front(), Some(&3));
        assert_eq!(queue.pop_front(), Some(3));
        assert_eq!(queue.pop_front(), Some(1));
        assert_eq!(queue.pop_front(), Some(2));
        assert_eq!(queue.pop_front(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn remove_from_middle_and_ends() {
        let mut queue = SetQueue::new();
        for key in 0..5 {
            queue.push_back(key);
        }

        assert!(queue.remove(&2));
        assert!(!queue.remove(&2));
        assert_eq!(contents(&queue), [0, 1, 3, 4]);

        assert!(queue.remove(&0));
        assert!(queue.remove(&4));
        assert_eq!(contents(&queue), [1, 3]);
        assert!(!queue.contains(&4));
        assert!(queue.contains(&3));
    }

    #[test]
    fn slots_are_reused() {
        let mut queue = SetQueue::new();
        queue.push_back(1);
        queue.push_back(2);
        queue.remove(&1);
        queue.push_back(1);
        assert_eq!(queue.slots.len(), 2);
        assert_eq!(contents(&queue), [2, 1]);
    }

    #[test]
    #[should_panic(expected = "already present")]
    fn duplicate_push() {
        let mut queue = SetQueue::new();
        queue.push_back(1);
        queue.push_back(1);
    }
}
