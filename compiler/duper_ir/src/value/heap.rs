//! Heap cells backing the value model.
//!
//! All heap allocation goes through factory methods on `Value`; the wrappers
//! here have crate-private constructors so external code cannot mint heap
//! values directly.
//!
//! `Heap<T>` is an immutable shared cell; `MutHeap<T>` adds interior
//! mutability behind a `parking_lot::RwLock`, which is what makes aliasing
//! observable (mutating a value through one alias is visible through every
//! other alias).

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Immutable shared heap cell.
pub struct Heap<T>(Arc<T>);

impl<T> Heap<T> {
    #[inline]
    pub(crate) fn new(value: T) -> Self {
        Heap(Arc::new(value))
    }

    /// Allocation address, used as value identity.
    #[inline]
    pub fn ptr_id(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }

    #[inline]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl<T> Clone for Heap<T> {
    fn clone(&self) -> Self {
        Heap(Arc::clone(&self.0))
    }
}

impl<T> Deref for Heap<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: fmt::Debug> fmt::Debug for Heap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Heap({:?})", &*self.0)
    }
}

/// Mutable shared heap cell.
pub struct MutHeap<T>(Arc<RwLock<T>>);

impl<T> MutHeap<T> {
    #[inline]
    pub(crate) fn new(value: T) -> Self {
        MutHeap(Arc::new(RwLock::new(value)))
    }

    /// Read access to the cell contents.
    #[inline]
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.0.read()
    }

    /// Write access to the cell contents.
    #[inline]
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.0.write()
    }

    /// Allocation address, used as value identity.
    #[inline]
    pub fn ptr_id(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }

    #[inline]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl<T> Clone for MutHeap<T> {
    fn clone(&self) -> Self {
        MutHeap(Arc::clone(&self.0))
    }
}

impl<T: fmt::Debug> fmt::Debug for MutHeap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MutHeap({:?})", &*self.0.read())
    }
}
