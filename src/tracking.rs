//! Accounting allocators.
//!
//! `TrackingAllocator` remembers every outstanding block and refuses
//! deallocations it did not hand out. `BoundedAllocator` caps the total
//! number of live bytes and reports `AllocError` past the budget.

use crate::allocator::{AllocError, Global, TableAllocator};
use core::alloc::Layout;
use core::ptr::NonNull;
use hashbrown::HashMap;

/// Wraps an allocator and records each live block with its layout.
///
/// Deallocating a pointer that is not live, or with a different layout
/// than it was allocated with, panics.
#[derive(Debug, Default)]
pub struct TrackingAllocator<A = Global> {
    inner: A,
    live: HashMap<usize, Layout>,
    allocations: usize,
    deallocations: usize,
}

impl TrackingAllocator {
    pub fn new() -> Self {
        Self::wrap(Global)
    }
}

impl<A> TrackingAllocator<A> {
    pub fn wrap(inner: A) -> Self {
        Self {
            inner,
            live: HashMap::new(),
            allocations: 0,
            deallocations: 0,
        }
    }

    /// Number of blocks currently outstanding.
    pub fn live(&self) -> usize {
        self.live.len()
    }

    /// Bytes currently outstanding.
    pub fn live_bytes(&self) -> usize {
        self.live.values().map(|l| l.size()).sum()
    }

    /// Whether `ptr` is an outstanding block of this allocator.
    pub fn is_live(&self, ptr: *const u8) -> bool {
        self.live.contains_key(&(ptr as usize))
    }

    pub fn allocations(&self) -> usize {
        self.allocations
    }

    pub fn deallocations(&self) -> usize {
        self.deallocations
    }

    pub fn into_inner(self) -> A {
        self.inner
    }
}

impl<A: TableAllocator> TableAllocator for TrackingAllocator<A> {
    fn allocate(&mut self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        let ptr = self.inner.allocate(layout)?;
        let prev = self.live.insert(ptr.as_ptr() as usize, layout);
        debug_assert!(prev.is_none(), "allocator returned a live block twice");
        self.allocations += 1;
        Ok(ptr)
    }

    unsafe fn deallocate(&mut self, ptr: NonNull<u8>, layout: Layout) {
        match self.live.remove(&(ptr.as_ptr() as usize)) {
            Some(recorded) => assert_eq!(
                recorded, layout,
                "block {ptr:p} freed with a different layout than allocated"
            ),
            None => panic!("block {ptr:p} is not live in this allocator"),
        }
        self.deallocations += 1;
        // SAFETY: the block was live in `inner` with this layout.
        unsafe { self.inner.deallocate(ptr, layout) }
    }
}

/// Wraps an allocator and fails requests that would push the live byte
/// count above `limit`.
#[derive(Debug)]
pub struct BoundedAllocator<A = Global> {
    inner: A,
    limit: usize,
    in_use: usize,
}

impl BoundedAllocator {
    pub fn new(limit: usize) -> Self {
        Self::wrap(Global, limit)
    }
}

impl<A> BoundedAllocator<A> {
    pub fn wrap(inner: A, limit: usize) -> Self {
        Self {
            inner,
            limit,
            in_use: 0,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn in_use(&self) -> usize {
        self.in_use
    }

    pub fn remaining(&self) -> usize {
        self.limit - self.in_use
    }
}

impl<A: TableAllocator> TableAllocator for BoundedAllocator<A> {
    fn allocate(&mut self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if layout.size() > self.remaining() {
            return Err(AllocError::new(layout));
        }
        let ptr = self.inner.allocate(layout)?;
        self.in_use += layout.size();
        Ok(ptr)
    }

    unsafe fn deallocate(&mut self, ptr: NonNull<u8>, layout: Layout) {
        debug_assert!(self.in_use >= layout.size(), "BoundedAllocator underflow");
        self.in_use -= layout.size();
        // SAFETY: forwarded contract.
        unsafe { self.inner.deallocate(ptr, layout) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Invariant: live/allocation/deallocation counters follow each call.
    #[test]
    fn tracking_counts_blocks() {
        let mut t = TrackingAllocator::new();
        let l = Layout::from_size_align(16, 8).unwrap();
        let a = t.allocate(l).unwrap();
        let b = t.allocate(l).unwrap();
        assert_eq!(t.live(), 2);
        assert_eq!(t.live_bytes(), 32);
        assert!(t.is_live(a.as_ptr()));
        unsafe { t.deallocate(a, l) };
        assert!(!t.is_live(a.as_ptr()));
        assert_eq!(t.live(), 1);
        assert_eq!(t.allocations(), 2);
        assert_eq!(t.deallocations(), 1);
        unsafe { t.deallocate(b, l) };
        assert_eq!(t.live(), 0);
    }

    /// Invariant: freeing a block twice is caught instead of reaching the heap.
    #[test]
    fn tracking_rejects_double_free() {
        let mut t = TrackingAllocator::new();
        let l = Layout::new::<u32>();
        let p = t.allocate(l).unwrap();
        unsafe { t.deallocate(p, l) };
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| unsafe {
            t.deallocate(p, l)
        }));
        assert!(res.is_err(), "double free must panic");
    }

    /// Invariant: freeing with a mismatched layout panics.
    #[test]
    fn tracking_rejects_layout_mismatch() {
        let mut t = TrackingAllocator::new();
        let l = Layout::from_size_align(8, 8).unwrap();
        let p = t.allocate(l).unwrap();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| unsafe {
            t.deallocate(p, Layout::from_size_align(4, 4).unwrap())
        }));
        assert!(res.is_err(), "layout mismatch must panic");
    }

    /// Invariant: requests beyond the budget fail; freeing restores headroom.
    #[test]
    fn bounded_enforces_limit() {
        let mut b = BoundedAllocator::new(24);
        assert_eq!(b.limit(), 24);
        let l = Layout::from_size_align(16, 8).unwrap();
        let p = b.allocate(l).unwrap();
        assert_eq!(b.in_use(), 16);
        assert_eq!(b.allocate(l), Err(AllocError::new(l)));
        assert_eq!(b.in_use(), 16, "failed request must not count");
        unsafe { b.deallocate(p, l) };
        assert_eq!(b.remaining(), 24);
        let q = b.allocate(l).unwrap();
        unsafe { b.deallocate(q, l) };
    }

    /// Invariant: the wrappers compose; failures from the bound never reach
    /// the tracker's books.
    #[test]
    fn tracking_over_bounded() {
        let mut t = TrackingAllocator::wrap(BoundedAllocator::new(8));
        let l = Layout::new::<u64>();
        let p = t.allocate(l).unwrap();
        assert!(t.allocate(l).is_err());
        assert_eq!(t.live(), 1);
        unsafe { t.deallocate(p, l) };
        assert_eq!(t.into_inner().in_use(), 0);
    }
}
