//! Allocator capability injected into tables.
//!
//! A table never calls the global heap directly. Its slot array and every
//! value buffer are obtained from a [`TableAllocator`] supplied at
//! construction, so a host can back the table with an arena, a pool or an
//! accounting wrapper.

use core::alloc::Layout;
use core::ptr::NonNull;
use thiserror::Error;

/// The allocator could not satisfy a request.
#[derive(Copy, Clone, Debug, Error, Eq, PartialEq)]
#[error("allocator failed to provide {} bytes (align {})", .layout.size(), .layout.align())]
pub struct AllocError {
    pub layout: Layout,
}

impl AllocError {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }
}

/// Source and sink of raw memory for a table.
///
/// Tables only request layouts with a non-zero size.
pub trait TableAllocator {
    /// Allocate a block fitting `layout`. The contents are uninitialized.
    fn allocate(&mut self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Return a block to the allocator.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` on this allocator with the
    /// same `layout`, and must not have been deallocated since.
    unsafe fn deallocate(&mut self, ptr: NonNull<u8>, layout: Layout);
}

impl<A: TableAllocator + ?Sized> TableAllocator for &mut A {
    #[inline]
    fn allocate(&mut self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        (**self).allocate(layout)
    }

    #[inline]
    unsafe fn deallocate(&mut self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded contract.
        unsafe { (**self).deallocate(ptr, layout) }
    }
}

/// The process heap, via `std::alloc`.
#[derive(Copy, Clone, Debug, Default)]
pub struct Global;

impl TableAllocator for Global {
    fn allocate(&mut self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        debug_assert!(layout.size() > 0, "zero-sized requests never reach the allocator");
        // SAFETY: tables never request zero-sized layouts.
        let raw = unsafe { std::alloc::alloc(layout) };
        NonNull::new(raw).ok_or(AllocError::new(layout))
    }

    unsafe fn deallocate(&mut self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: caller guarantees `ptr` came from `allocate` with `layout`.
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Invariant: a block from `Global` is writable for its full size and
    /// can be returned with the same layout.
    #[test]
    fn global_roundtrip() {
        let layout = Layout::from_size_align(64, 8).unwrap();
        let mut a = Global;
        let p = a.allocate(layout).unwrap();
        assert_eq!(p.as_ptr() as usize % 8, 0);
        unsafe {
            core::ptr::write_bytes(p.as_ptr(), 0xAB, 64);
            assert_eq!(*p.as_ptr().add(63), 0xAB);
            a.deallocate(p, layout);
        }
    }

    /// Invariant: `&mut A` forwards to the underlying allocator.
    #[test]
    fn mut_ref_forwards() {
        fn roundtrip<A: TableAllocator>(mut a: A) {
            let layout = Layout::new::<u64>();
            let p = a.allocate(layout).unwrap();
            unsafe { a.deallocate(p, layout) };
        }
        let mut g = Global;
        roundtrip(&mut g);
    }

    #[test]
    fn alloc_error_display_names_layout() {
        let e = AllocError::new(Layout::from_size_align(24, 4).unwrap());
        assert_eq!(e.to_string(), "allocator failed to provide 24 bytes (align 4)");
    }
}
