use std::alloc::{Layout, alloc, dealloc};
use std::ptr::NonNull;

use slotmem_common::AllocError;

/// An untyped block allocator.
///
/// # Safety
///
/// Implementors must guarantee that:
/// - A block returned by `allocate(layout)` is valid for reads and writes of
///   `layout.size()` bytes and aligned to `layout.align()`.
/// - The block stays valid until it is passed to `deallocate` with the same
///   layout.
/// - Zero-sized requests succeed and return a dangling, well-aligned pointer
///   that must not be dereferenced.
pub unsafe trait RawAllocator {
    /// Requests a block described by `layout`.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Releases a block previously obtained from this allocator.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate` on this allocator with the same `layout`,
    /// and must not be released twice.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

unsafe impl<A: RawAllocator + ?Sized> RawAllocator for &A {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        (**self).allocate(layout)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { (**self).deallocate(ptr, layout) }
    }
}

/// The process-wide Rust allocator (`std::alloc::alloc` / `dealloc`).
///
/// Blocks handed out by `Global` for `Layout::new::<T>()` are compatible with
/// `Box<T>`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Global;

unsafe impl RawAllocator for Global {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if layout.size() == 0 {
            return Ok(dangling_for(layout));
        }
        let ptr = unsafe { alloc(layout) };
        NonNull::new(ptr).ok_or(AllocError::OutOfMemory {
            size: layout.size(),
            align: layout.align(),
        })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() == 0 {
            return;
        }
        unsafe { dealloc(ptr.as_ptr(), layout) }
    }
}

/// Returns a non-null pointer aligned to `layout.align()` that owns no memory.
#[inline]
pub fn dangling_for(layout: Layout) -> NonNull<u8> {
    // Alignment is a non-zero power of two, so the address is never null.
    NonNull::new(std::ptr::without_provenance_mut(layout.align())).unwrap_or(NonNull::dangling())
}
