//! Single-owner handle to a heap object.

use std::alloc::Layout;
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use slotmem_raw_alloc::TypedAllocator;

use crate::construct;

/// Owns zero or one heap-allocated `T`.
///
/// At any instant at most one handle refers to a given object: every
/// ownership transfer ([`release`](Self::release), [`take`](Self::take),
/// [`assign_from`](Self::assign_from)) leaves the donor empty. The owned
/// object is destroyed exactly once, by whichever handle holds it when that
/// handle is dropped or reset.
///
/// The object's block has the layout of a `Box<T>` allocation, so ownership
/// can move freely between the two.
pub struct UniqueHandle<T: ?Sized> {
    ptr: Option<NonNull<T>>,
    _owns: PhantomData<T>,
}

impl<T> UniqueHandle<T> {
    /// Moves `value` into a new heap object.
    ///
    /// Aborts through [`std::alloc::handle_alloc_error`] if the allocation
    /// fails; see [`try_new`](Self::try_new) for the fallible form.
    pub fn new(value: T) -> Self {
        match UniqueHandle::try_new(value) {
            Ok(handle) => handle,
            Err(_) => std::alloc::handle_alloc_error(Layout::new::<T>()),
        }
    }

    /// Moves `value` into a new heap object, reporting allocation failure.
    pub fn try_new(value: T) -> slotmem_common::Result<Self> {
        let ptr = TypedAllocator::<T>::new().allocate_one()?;
        // SAFETY: the block is fresh, properly aligned and sized for one `T`.
        let slot = unsafe { ptr.cast::<MaybeUninit<T>>().as_mut() };
        construct::construct_move(slot, value);
        Ok(UniqueHandle {
            ptr: Some(ptr),
            _owns: PhantomData,
        })
    }
}

impl<T: ?Sized> UniqueHandle<T> {
    /// A handle that owns nothing.
    pub const fn empty() -> Self {
        UniqueHandle {
            ptr: None,
            _owns: PhantomData,
        }
    }

    pub fn from_box(value: Box<T>) -> Self {
        UniqueHandle {
            ptr: Some(NonNull::from(Box::leak(value))),
            _owns: PhantomData,
        }
    }

    /// Takes ownership of `ptr`; a null pointer yields an empty handle.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must have been produced by `Box::into_raw` (or an
    /// equivalent global allocation of `T`) and must not be owned by anything
    /// else.
    pub unsafe fn from_raw(ptr: *mut T) -> Self {
        UniqueHandle {
            ptr: NonNull::new(ptr),
            _owns: PhantomData,
        }
    }

    /// Transfers the owned object out, leaving the handle empty.
    ///
    /// Returns `None` on an already empty handle.
    pub fn release(&mut self) -> Option<Box<T>> {
        // SAFETY: `ptr` is a live, exclusively owned, Box-compatible block.
        self.ptr
            .take()
            .map(|ptr| unsafe { Box::from_raw(ptr.as_ptr()) })
    }

    /// Consumes the handle, returning the owned object's pointer without
    /// destroying it.
    pub fn into_raw(mut self) -> Option<NonNull<T>> {
        self.ptr.take()
    }

    #[inline]
    pub fn as_ptr(&self) -> Option<NonNull<T>> {
        self.ptr
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ptr.is_none()
    }

    #[inline]
    pub fn get(&self) -> Option<&T> {
        // SAFETY: the handle owns a live object.
        self.ptr.map(|ptr| unsafe { ptr.as_ref() })
    }

    #[inline]
    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.ptr.map(|mut ptr| unsafe { ptr.as_mut() })
    }

    /// Steals the object owned by `donor`, which is left empty.
    ///
    /// This is an ownership transfer, not a copy: `donor` no longer refers to
    /// anything afterwards.
    pub fn take(donor: &mut Self) -> Self {
        UniqueHandle {
            ptr: donor.ptr.take(),
            _owns: PhantomData,
        }
    }

    /// Steals the object owned by a handle of a related type, converting the
    /// owning box (typically an unsizing coercion such as `Box<U>` to
    /// `Box<dyn Trait>`).
    pub fn take_converted<U: ?Sized, F>(donor: &mut UniqueHandle<U>, convert: F) -> Self
    where
        F: FnOnce(Box<U>) -> Box<T>,
    {
        match donor.release() {
            Some(value) => UniqueHandle::from_box(convert(value)),
            None => UniqueHandle::empty(),
        }
    }

    /// Destroys the currently owned object, if any, then steals the object
    /// owned by `donor`.
    pub fn assign_from(&mut self, donor: &mut Self) {
        let stolen = donor.release();
        self.reset(stolen);
    }

    /// Destroys the currently owned object, if any, and takes ownership of
    /// `value`.
    pub fn reset(&mut self, value: Option<Box<T>>) {
        drop(self.release());
        self.ptr = value.map(|b| NonNull::from(Box::leak(b)));
    }

    /// Same as [`reset`](Self::reset) for a raw pointer. Resetting to the
    /// pointer already held is a no-op.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` other than the one already held must satisfy the
    /// requirements of [`from_raw`](Self::from_raw).
    pub unsafe fn reset_raw(&mut self, ptr: *mut T) {
        if let Some(current) = self.ptr {
            if std::ptr::addr_eq(current.as_ptr(), ptr) {
                return;
            }
        }
        drop(self.release());
        self.ptr = NonNull::new(ptr);
    }
}

impl<T: ?Sized> Drop for UniqueHandle<T> {
    fn drop(&mut self) {
        drop(self.release());
    }
}

impl<T: ?Sized> Default for UniqueHandle<T> {
    fn default() -> Self {
        UniqueHandle::empty()
    }
}

impl<T: ?Sized> From<Box<T>> for UniqueHandle<T> {
    fn from(value: Box<T>) -> Self {
        UniqueHandle::from_box(value)
    }
}

impl<T: ?Sized> Deref for UniqueHandle<T> {
    type Target = T;

    /// # Panics
    ///
    /// Panics if the handle is empty.
    fn deref(&self) -> &T {
        match self.get() {
            Some(value) => value,
            None => panic!("dereferenced an empty UniqueHandle"),
        }
    }
}

impl<T: ?Sized> DerefMut for UniqueHandle<T> {
    fn deref_mut(&mut self) -> &mut T {
        match self.get_mut() {
            Some(value) => value,
            None => panic!("dereferenced an empty UniqueHandle"),
        }
    }
}

impl<T: ?Sized + std::fmt::Debug> std::fmt::Debug for UniqueHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("UniqueHandle").field(&self.get()).finish()
    }
}

// SAFETY: same as `Box<T>`, the handle exclusively owns its object.
unsafe impl<T: ?Sized + Send> Send for UniqueHandle<T> {}

unsafe impl<T: ?Sized + Sync> Sync for UniqueHandle<T> {}
