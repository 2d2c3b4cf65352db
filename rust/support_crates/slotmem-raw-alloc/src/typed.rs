//! Allocation sized in units of `T`.

use std::alloc::Layout;
use std::marker::PhantomData;
use std::ptr::NonNull;

use slotmem_common::AllocError;

use crate::global::{Global, RawAllocator};

/// Requests and releases untyped storage for `n` instances of `T`.
///
/// `TypedAllocator` has no object lifecycle semantics: the slots it returns
/// are raw, and `deallocate` never runs a destructor.
pub struct TypedAllocator<T, A: RawAllocator = Global> {
    alloc: A,
    _p: PhantomData<fn() -> T>,
}

impl<T> TypedAllocator<T, Global> {
    /// Creates a typed view over the global allocator.
    pub const fn new() -> Self {
        TypedAllocator {
            alloc: Global,
            _p: PhantomData,
        }
    }
}

impl<T> Default for TypedAllocator<T, Global> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A: RawAllocator> TypedAllocator<T, A> {
    /// Creates a typed view over `alloc`.
    pub fn with_allocator(alloc: A) -> Self {
        TypedAllocator {
            alloc,
            _p: PhantomData,
        }
    }

    /// Computes the block layout for `n` slots of `T`.
    pub fn layout_for(n: usize) -> Result<Layout, AllocError> {
        Layout::array::<T>(n).map_err(|_| AllocError::CapacityOverflow {
            count: n,
            elem_size: size_of::<T>(),
        })
    }

    /// Returns storage for `n` instances of `T`.
    ///
    /// A request for zero slots (or for a zero-sized `T`) is not an error: it
    /// returns a dangling pointer that owns no memory.
    pub fn allocate(&self, n: usize) -> Result<NonNull<T>, AllocError> {
        if n == 0 || size_of::<T>() == 0 {
            return Ok(NonNull::dangling());
        }
        let layout = Self::layout_for(n)?;
        let ptr = self.alloc.allocate(layout)?;
        log::trace!(
            "allocated {} slots of {} ({} bytes) at {:p}",
            n,
            std::any::type_name::<T>(),
            layout.size(),
            ptr
        );
        Ok(ptr.cast())
    }

    /// Returns storage for a single instance of `T`.
    #[inline]
    pub fn allocate_one(&self) -> Result<NonNull<T>, AllocError> {
        self.allocate(1)
    }

    /// Releases storage obtained from [`allocate`](Self::allocate).
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate(n)` on this allocator (same
    /// `n`), must not have been released already, and any live objects in the
    /// block must already have been destroyed or moved out.
    pub unsafe fn deallocate(&self, ptr: NonNull<T>, n: usize) {
        if n == 0 || size_of::<T>() == 0 {
            return;
        }
        // A block this allocator handed out always had a valid layout.
        let Ok(layout) = Self::layout_for(n) else {
            return;
        };
        log::trace!(
            "releasing {} slots of {} at {:p}",
            n,
            std::any::type_name::<T>(),
            ptr
        );
        unsafe { self.alloc.deallocate(ptr.cast(), layout) }
    }

    /// Same as [`deallocate`](Self::deallocate), but tolerates a null `ptr`.
    ///
    /// # Safety
    ///
    /// See [`deallocate`](Self::deallocate).
    pub unsafe fn deallocate_raw(&self, ptr: *mut T, n: usize) {
        if let Some(ptr) = NonNull::new(ptr) {
            unsafe { self.deallocate(ptr, n) }
        }
    }
}

impl<T, A: RawAllocator + Clone> Clone for TypedAllocator<T, A> {
    fn clone(&self) -> Self {
        TypedAllocator::with_allocator(self.alloc.clone())
    }
}

impl<T, A: RawAllocator + std::fmt::Debug> std::fmt::Debug for TypedAllocator<T, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedAllocator")
            .field("type", &std::any::type_name::<T>())
            .field("alloc", &self.alloc)
            .finish()
    }
}
