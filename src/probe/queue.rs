//! Bounded blocking queue shared by the probe workers and their clients
//!
//! The bound is a memory budget rather than an element count: each element
//! is weighed by the size function given at construction. A closed queue
//! refuses new elements but still hands out the ones it holds, so a
//! consumer drains everything before seeing the end.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};

struct Inner<T> {
    items: VecDeque<T>,
    memory_size: usize,
    open: bool,
}

pub struct BlockingQueue<T> {
    max_memory_size: usize,
    size_of: fn(&T) -> usize,
    inner: Mutex<Inner<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl BlockingQueue<Vec<u8>> {
    /// Queue of byte blocks weighed by their length
    pub fn for_blocks(max_memory_size: usize) -> Self {
        Self::new(max_memory_size, Vec::len)
    }
}

impl<T> BlockingQueue<T> {
    /// Create a closed queue
    pub fn new(max_memory_size: usize, size_of: fn(&T) -> usize) -> Self {
        Self {
            max_memory_size,
            size_of,
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                memory_size: 0,
                open: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn open(&self) {
        self.lock().open = true;
    }

    /// Refuse new elements and wake every waiting thread
    pub fn close(&self) {
        let mut inner = self.lock();
        if inner.open {
            inner.open = false;
            self.not_empty.notify_all();
            self.not_full.notify_all();
        }
    }

    /// Open the queue until the returned guard is dropped
    pub fn open_scoped(&self) -> QueueGuard<'_, T> {
        self.open();
        QueueGuard { queue: self }
    }

    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    /// Add an element without blocking.
    ///
    /// Returns false when the queue is closed or the element does not fit in
    /// the remaining budget.
    pub fn try_push(&self, item: T) -> bool {
        let mut inner = self.lock();
        if !inner.open {
            return false;
        }
        let size = (self.size_of)(&item);
        if inner.memory_size + size > self.max_memory_size {
            return false;
        }
        self.push_locked(&mut inner, item, size);
        true
    }

    /// Add an element, waiting for room while the queue is open.
    ///
    /// Returns false once the queue is closed, or at once for an element
    /// larger than the whole budget.
    pub fn push(&self, item: T) -> bool {
        let size = (self.size_of)(&item);
        if size > self.max_memory_size {
            return false;
        }

        let mut inner = self.lock();
        while inner.open && inner.memory_size + size > self.max_memory_size {
            inner = self
                .not_full
                .wait(inner)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        if !inner.open {
            return false;
        }
        self.push_locked(&mut inner, item, size);
        true
    }

    fn push_locked(&self, inner: &mut Inner<T>, item: T, size: usize) {
        inner.memory_size += size;
        inner.items.push_back(item);
        self.not_empty.notify_one();
    }

    /// Take the oldest element, waiting while the queue is empty and open.
    ///
    /// Returns `None` once the queue is closed and drained.
    pub fn pop(&self) -> Option<T> {
        let mut inner = self.lock();
        while inner.items.is_empty() && inner.open {
            inner = self
                .not_empty
                .wait(inner)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        self.pop_locked(&mut inner)
    }

    pub fn try_pop(&self) -> Option<T> {
        let mut inner = self.lock();
        self.pop_locked(&mut inner)
    }

    fn pop_locked(&self, inner: &mut Inner<T>) -> Option<T> {
        let item = inner.items.pop_front()?;
        inner.memory_size -= (self.size_of)(&item);
        self.not_full.notify_all();
        Some(item)
    }

    /// Drop every element; the open state is unchanged
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.items.clear();
        inner.memory_size = 0;
        self.not_full.notify_all();
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Sum of the sizes of the queued elements
    pub fn memory_size(&self) -> usize {
        self.lock().memory_size
    }

    pub fn max_memory_size(&self) -> usize {
        self.max_memory_size
    }
}

impl<T> Drop for BlockingQueue<T> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Closes its queue when dropped
#[must_use = "the queue closes as soon as the guard is dropped"]
pub struct QueueGuard<'a, T> {
    queue: &'a BlockingQueue<T>,
}

impl<T> Drop for QueueGuard<'_, T> {
    fn drop(&mut self) {
        self.queue.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_closed_queue_refuses_items() {
        let queue = BlockingQueue::for_blocks(16);
        assert!(!queue.try_push(vec![1]));
        assert!(!queue.push(vec![1]));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_budget_is_enforced() {
        let queue = BlockingQueue::for_blocks(8);
        queue.open();

        assert!(queue.try_push(vec![0; 5]));
        assert!(!queue.try_push(vec![0; 4]));
        assert!(queue.try_push(vec![0; 3]));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.memory_size(), 8);

        assert_eq!(queue.try_pop(), Some(vec![0; 5]));
        assert_eq!(queue.memory_size(), 3);
    }

    #[test]
    fn test_oversized_item_is_rejected_at_once() {
        let queue = BlockingQueue::for_blocks(4);
        queue.open();
        assert!(!queue.push(vec![0; 5]));
    }

    #[test]
    fn test_close_drains_then_ends() {
        let queue = BlockingQueue::for_blocks(16);
        queue.open();
        queue.try_push(vec![1]);
        queue.try_push(vec![2]);
        queue.close();

        assert_eq!(queue.pop(), Some(vec![1]));
        assert_eq!(queue.pop(), Some(vec![2]));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_push_blocks_until_room() {
        let queue = Arc::new(BlockingQueue::for_blocks(4));
        queue.open();
        assert!(queue.push(vec![0; 4]));

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.push(vec![1; 2]))
        };

        thread::sleep(Duration::from_millis(50));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop(), Some(vec![0; 4]));

        assert!(producer.join().unwrap());
        assert_eq!(queue.pop(), Some(vec![1; 2]));
    }

    #[test]
    fn test_close_unblocks_push() {
        let queue = Arc::new(BlockingQueue::for_blocks(4));
        queue.open();
        assert!(queue.push(vec![0; 4]));

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.push(vec![1]))
        };

        thread::sleep(Duration::from_millis(50));
        queue.close();
        assert!(!producer.join().unwrap());
    }

    #[test]
    fn test_close_unblocks_pop() {
        let queue: Arc<BlockingQueue<Vec<u8>>> = Arc::new(BlockingQueue::for_blocks(4));
        queue.open();

        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop())
        };

        thread::sleep(Duration::from_millis(50));
        queue.close();
        assert_eq!(consumer.join().unwrap(), None);
    }

    #[test]
    fn test_scoped_open() {
        let queue = BlockingQueue::for_blocks(4);
        {
            let _guard = queue.open_scoped();
            assert!(queue.is_open());
            assert!(queue.try_push(vec![7]));
        }
        assert!(!queue.is_open());
        assert_eq!(queue.pop(), Some(vec![7]));
    }

    #[test]
    fn test_clear_frees_budget() {
        let queue = BlockingQueue::new(2, |_: &u32| 1);
        queue.open();
        assert!(queue.try_push(1));
        assert!(queue.try_push(2));
        assert!(!queue.try_push(3));
        queue.clear();
        assert!(queue.is_empty());
        assert!(queue.try_push(3));
    }
}
