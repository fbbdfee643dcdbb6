//! Slab allocator for decoder-tree scratch storage.
//!
//! Every RateR-family node needs a left/right LLR scratch vector sized to
//! its half-block-length. Rather than allocate one on every call, nodes
//! borrow a [`Block`] from a shared [`Pool`] at tree-construction time and
//! hold it for their own lifetime, same as the original decoder's per-node
//! `DataPool` handles. Free lists are keyed by length, so re-decoding the
//! same code never touches the allocator again once the tree is warm.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::rc::{Rc, Weak};

struct PoolInner<T> {
    free: HashMap<usize, Vec<Vec<T>>>,
}

/// A pool of same-length vectors, one free list per length.
pub struct Pool<T> {
    inner: Rc<RefCell<PoolInner<T>>>,
}

impl<T> Clone for Pool<T> {
    fn clone(&self) -> Self {
        Self { inner: Rc::clone(&self.inner) }
    }
}

impl<T: Default + Clone> Pool<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(PoolInner { free: HashMap::new() })),
        }
    }

    /// Borrow a block of the given length, zero-initialised. O(1) amortised.
    pub fn allocate(&self, len: usize) -> Block<T> {
        let data = self
            .inner
            .borrow_mut()
            .free
            .get_mut(&len)
            .and_then(|slots| slots.pop())
            .unwrap_or_else(|| vec![T::default(); len]);
        Block {
            data: Some(data),
            pool: Rc::downgrade(&self.inner),
        }
    }
}

impl<T: Default + Clone> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A pool-owned vector. Returned to its free list on drop; if the pool has
/// already been torn down the block's storage is simply freed normally.
pub struct Block<T> {
    data: Option<Vec<T>>,
    pool: Weak<RefCell<PoolInner<T>>>,
}

impl<T> Deref for Block<T> {
    type Target = [T];
    fn deref(&self) -> &[T] {
        self.data.as_deref().expect("block data taken")
    }
}

impl<T> DerefMut for Block<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.data.as_deref_mut().expect("block data taken")
    }
}

impl<T> Drop for Block<T> {
    fn drop(&mut self) {
        if let (Some(data), Some(pool)) = (self.data.take(), self.pool.upgrade()) {
            pool.borrow_mut().free.entry(data.len()).or_default().push(data);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_zero_initialised() {
        let pool: Pool<f32> = Pool::new();
        let block = pool.allocate(4);
        assert_eq!(&*block, &[0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn released_block_is_reused() {
        let pool: Pool<f32> = Pool::new();
        {
            let mut block = pool.allocate(8);
            block[0] = 42.0;
        }
        let block = pool.allocate(8);
        assert_eq!(block[0], 42.0, "freed storage should be handed back out");
    }

    #[test]
    fn distinct_lengths_use_distinct_free_lists() {
        let pool: Pool<f32> = Pool::new();
        let a = pool.allocate(4);
        let b = pool.allocate(8);
        assert_eq!(a.len(), 4);
        assert_eq!(b.len(), 8);
    }
}
