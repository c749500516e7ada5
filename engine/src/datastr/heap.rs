//! An array backed binary min-heap.
//!
//! The element at index `i` has its children at `2i + 1` and `2i + 2`
//! and its parent at `(i - 1) / 2`.
//! There is no position tracking, so keys cannot be decreased.
//! Dijkstra on top of this heap pushes duplicates and skips stale entries when they are popped.
//!
//! # Examples
//!
//! ```
//! use traffic_congestion::datastr::heap::MinHeap;
//!
//! let mut heap = MinHeap::new();
//! heap.push(42);
//! heap.push(23);
//! heap.push(50000);
//! assert_eq!(heap.peek(), Some(&23));
//! assert_eq!(heap.pop(), Some(23));
//! assert_eq!(heap.pop(), Some(42));
//! ```

#[derive(Debug, Clone)]
pub struct MinHeap<T> {
    data: Vec<T>,
}

impl<T> Default for MinHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MinHeap<T> {
    pub const fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns a reference to the smallest item in the heap, or None if it is empty.
    pub fn peek(&self) -> Option<&T> {
        self.data.first()
    }
}

impl<T: Ord> MinHeap<T> {
    pub fn push(&mut self, item: T) {
        self.data.push(item);
        self.sift_up(self.data.len() - 1);
    }

    /// Removes the smallest item from the heap and returns it, or None if it is empty.
    pub fn pop(&mut self) -> Option<T> {
        let last = self.data.len().checked_sub(1)?;
        self.data.swap(0, last);
        let item = self.data.pop();
        if !self.data.is_empty() {
            self.sift_down(0);
        }
        item
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if self.data[parent] <= self.data[pos] {
                break;
            }
            self.data.swap(parent, pos);
            pos = parent;
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.data.len();
        loop {
            let left = 2 * pos + 1;
            if left >= len {
                return;
            }
            // pick the smaller of the two children
            let right = left + 1;
            let child = if right < len && self.data[right] < self.data[left] { right } else { left };

            if self.data[pos] <= self.data[child] {
                return;
            }
            self.data.swap(pos, child);
            pos = child;
        }
    }
}

impl<T: Ord> Extend<T> for MinHeap<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.push(item);
        }
    }
}
