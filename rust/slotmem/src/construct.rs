//! Lifecycle primitives: construct one object in caller-supplied storage and
//! destroy one object or a contiguous range of objects.
//!
//! A slot is a `MaybeUninit<T>`. The `construct_*` functions move a slot from
//! raw to live and hand back a reference to the new object; the `destroy_*`
//! functions move it back to raw. Nothing here allocates.
//!
//! Constructing into a live slot leaks the previous object (safe, but almost
//! certainly a bug). Destroying a raw slot, or destroying a slot twice, is
//! undefined behavior, which is why the `destroy_*` functions are `unsafe`.

use std::mem::MaybeUninit;

use crate::capability::SlotElement;

/// Constructs `T::default()` in `slot`.
#[inline]
pub fn construct_default<T: Default>(slot: &mut MaybeUninit<T>) -> &mut T {
    slot.write(T::default())
}

/// Constructs a clone of `value` in `slot`.
#[inline]
pub fn construct_copy<'a, T: Clone>(slot: &'a mut MaybeUninit<T>, value: &T) -> &'a mut T {
    slot.write(value.clone())
}

/// Moves `value` into `slot`.
#[inline]
pub fn construct_move<T>(slot: &mut MaybeUninit<T>, value: T) -> &mut T {
    slot.write(value)
}

/// Constructs a `T` from `args` in `slot`.
///
/// `args` is moved through unchanged; pass a tuple for multi-argument
/// constructors.
#[inline]
pub fn construct_from<T, A>(slot: &mut MaybeUninit<T>, args: A) -> &mut T
where
    T: From<A>,
{
    slot.write(T::from(args))
}

/// Constructs the value produced by `f` in `slot`.
#[inline]
pub fn construct_with<T, F>(slot: &mut MaybeUninit<T>, f: F) -> &mut T
where
    F: FnOnce() -> T,
{
    slot.write(f())
}

/// Constructs the value produced by a fallible `f` in `slot`.
///
/// On `Err` the slot stays raw and the error is returned unchanged.
#[inline]
pub fn try_construct_with<T, E, F>(slot: &mut MaybeUninit<T>, f: F) -> Result<&mut T, E>
where
    F: FnOnce() -> Result<T, E>,
{
    let value = f()?;
    Ok(slot.write(value))
}

/// Destroys the object in `slot`, leaving it raw.
///
/// Compiles to nothing when `T` has no drop glue.
///
/// # Safety
///
/// `slot` must be live.
#[inline]
pub unsafe fn destroy<T: SlotElement>(slot: &mut MaybeUninit<T>) {
    if T::TRIVIAL_DESTROY {
        return;
    }
    // SAFETY: caller asserts the slot is live.
    unsafe { slot.assume_init_drop() }
}

/// Destroys the object at `ptr`. A null pointer is ignored.
///
/// # Safety
///
/// If non-null, `ptr` must point to a live `T` that nothing else will destroy.
#[inline]
pub unsafe fn destroy_ptr<T: SlotElement>(ptr: *mut T) {
    if T::TRIVIAL_DESTROY || ptr.is_null() {
        return;
    }
    unsafe { std::ptr::drop_in_place(ptr) }
}

/// Destroys every object in `slots`, first to last, leaving them all raw.
///
/// Compiles to nothing when `T` has no drop glue. If a destructor panics, the
/// remaining slots are leaked rather than destroyed.
///
/// # Safety
///
/// Every slot in `slots` must be live.
pub unsafe fn destroy_range<T: SlotElement>(slots: &mut [MaybeUninit<T>]) {
    if T::TRIVIAL_DESTROY {
        return;
    }
    for slot in slots {
        unsafe { slot.assume_init_drop() }
    }
}

/// Views a region of live slots as `&[T]`.
///
/// # Safety
///
/// Every slot in `slots` must be live.
#[inline]
pub unsafe fn assume_live<T>(slots: &[MaybeUninit<T>]) -> &[T] {
    // SAFETY: MaybeUninit<T> has the layout of T and the caller asserts
    // that each slot is initialized.
    unsafe { &*(slots as *const [MaybeUninit<T>] as *const [T]) }
}

/// Views a region of live slots as `&mut [T]`.
///
/// # Safety
///
/// Every slot in `slots` must be live.
#[inline]
pub unsafe fn assume_live_mut<T>(slots: &mut [MaybeUninit<T>]) -> &mut [T] {
    unsafe { &mut *(slots as *mut [MaybeUninit<T>] as *mut [T]) }
}
