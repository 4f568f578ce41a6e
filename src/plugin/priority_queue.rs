//! Stable Priority Queue
//!
//! Vec-backed queue kept sorted from high to low priority. Items with equal
//! priority stay in insertion order, which makes it usable as an ordered
//! dispatch chain.

#[derive(Debug)]
pub struct PriorityQueue<T> {
    items: Vec<(i32, T)>, // (priority, item)
}

impl<T> PriorityQueue<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Insert after every item of greater or equal priority
    pub fn push(&mut self, priority: i32, item: T) -> usize {
        let pos = self.items.partition_point(|(p, _)| *p >= priority);
        self.items.insert(pos, (priority, item));
        pos
    }

    /// Insert at an explicit position.
    ///
    /// The item takes the priority of the neighbour it lands in front of
    /// (or of the last item when appended), so ordering stays sorted.
    pub fn insert_at(&mut self, index: usize, item: T) -> usize {
        let index = index.min(self.items.len());
        let priority = self.items
            .get(index)
            .or_else(|| self.items.last())
            .map(|(p, _)| *p)
            .unwrap_or(0);
        self.items.insert(index, (priority, item));
        index
    }

    // Remove by predicate
    pub fn remove_by<F>(&mut self, predicate: F) -> Option<(i32, T)>
    where
        F: Fn(&T) -> bool,
    {
        let pos = self.items.iter().position(|(_, item)| predicate(item))?;
        Some(self.items.remove(pos))
    }

    pub fn iter(&self) -> impl Iterator<Item = &(i32, T)> {
        self.items.iter()
    }

    pub fn get_mut_at(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index).map(|(_, item)| item)
    }

    pub fn find_index<F>(&self, predicate: F) -> Option<usize>
    where
        F: Fn(&T) -> bool,
    {
        self.items.iter().position(|(_, item)| predicate(item))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

impl<T> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
