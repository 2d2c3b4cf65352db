//! Bulk region algorithms: populate a raw destination region from a source
//! range or a fill value.
//!
//! Every algorithm has two bodies, selected at compile time through
//! [`SlotElement`]:
//!
//! - **Trivial path**: a flat byte copy, no per-element calls.
//! - **Per-element path**: construct destination slots left to right through a
//!   [`RegionGuard`]. If constructing element `k` fails (an `Err` from a `try_*`
//!   constructor, or a panic from `Clone`), slots `[0, k)` of the destination
//!   are destroyed, slots past `k` and the source are left untouched, and the
//!   failure is propagated unchanged.
//!
//! All algorithms return the number of slots written, i.e. the position one past
//! the last live destination slot. A destination shorter than the requested
//! count is rejected with a panic before any slot is touched.
//!
//! Moves are always trivial in Rust and cannot fail. The `unsafe` move
//! functions memcpy from live source slots, which become raw.

use std::mem::MaybeUninit;
use std::ptr;

use slotmem_common::assert_region_fits;

use crate::capability::SlotElement;
use crate::region::RegionGuard;

/// Copies every element of `src` into the raw region `dst`.
pub fn uninitialized_copy<T>(src: &[T], dst: &mut [MaybeUninit<T>]) -> usize
where
    T: SlotElement + Clone,
{
    uninitialized_copy_n(src, src.len(), dst)
}

/// Copies the first `n` elements of `src` into the raw region `dst`.
pub fn uninitialized_copy_n<T>(src: &[T], n: usize, dst: &mut [MaybeUninit<T>]) -> usize
where
    T: SlotElement + Clone,
{
    assert_source_fits(src, n);
    assert_region_fits!(dst, n);
    if T::TRIVIAL_COPY {
        // SAFETY: TRIVIAL_COPY implies `T: Copy`; both ranges hold `n` slots and
        // cannot overlap since `dst` is borrowed mutably.
        unsafe { ptr::copy_nonoverlapping(src.as_ptr(), dst.as_mut_ptr().cast::<T>(), n) };
        return n;
    }
    let mut guard = RegionGuard::new(&mut dst[..n]);
    for item in &src[..n] {
        guard.push(item.clone());
    }
    guard.commit()
}

/// Copies every element of `src` into `dst` with a fallible constructor.
pub fn try_uninitialized_copy_with<T, E, F>(
    src: &[T],
    dst: &mut [MaybeUninit<T>],
    construct: F,
) -> Result<usize, E>
where
    T: SlotElement,
    F: FnMut(&T) -> Result<T, E>,
{
    try_uninitialized_copy_n_with(src, src.len(), dst, construct)
}

/// Copies the first `n` elements of `src` into `dst` with a fallible
/// constructor.
///
/// On the first `Err`, the destination slots built by this call are destroyed
/// and the error is returned as-is.
pub fn try_uninitialized_copy_n_with<T, E, F>(
    src: &[T],
    n: usize,
    dst: &mut [MaybeUninit<T>],
    mut construct: F,
) -> Result<usize, E>
where
    T: SlotElement,
    F: FnMut(&T) -> Result<T, E>,
{
    assert_source_fits(src, n);
    assert_region_fits!(dst, n);
    let mut guard = RegionGuard::new(&mut dst[..n]);
    for item in &src[..n] {
        guard.try_push_with(|| construct(item))?;
    }
    Ok(guard.commit())
}

/// Fills the whole raw region `dst` with clones of `value`.
pub fn uninitialized_fill<T>(dst: &mut [MaybeUninit<T>], value: &T)
where
    T: SlotElement + Clone,
{
    let n = dst.len();
    uninitialized_fill_n(dst, n, value);
}

/// Fills the first `n` slots of the raw region `dst` with clones of `value`.
pub fn uninitialized_fill_n<T>(dst: &mut [MaybeUninit<T>], n: usize, value: &T) -> usize
where
    T: SlotElement + Clone,
{
    assert_region_fits!(dst, n);
    if T::TRIVIAL_COPY {
        let base = dst.as_mut_ptr().cast::<T>();
        for i in 0..n {
            // SAFETY: TRIVIAL_COPY implies `T: Copy`, so a bitwise read is a
            // valid clone; `i < n <= dst.len()`.
            unsafe { base.add(i).write(ptr::read(value)) };
        }
        return n;
    }
    let mut guard = RegionGuard::new(&mut dst[..n]);
    for _ in 0..n {
        guard.push(value.clone());
    }
    guard.commit()
}

/// Fills the whole raw region `dst` using a fallible constructor on `value`.
pub fn try_uninitialized_fill_with<T, E, F>(
    dst: &mut [MaybeUninit<T>],
    value: &T,
    construct: F,
) -> Result<(), E>
where
    T: SlotElement,
    F: FnMut(&T) -> Result<T, E>,
{
    let n = dst.len();
    try_uninitialized_fill_n_with(dst, n, value, construct).map(|_| ())
}

/// Fills the first `n` slots of `dst` using a fallible constructor on `value`.
///
/// If the constructor fails on call `k`, slots `[0, k)` are destroyed, slots
/// `[k, n)` are never touched and the error is returned as-is.
pub fn try_uninitialized_fill_n_with<T, E, F>(
    dst: &mut [MaybeUninit<T>],
    n: usize,
    value: &T,
    mut construct: F,
) -> Result<usize, E>
where
    T: SlotElement,
    F: FnMut(&T) -> Result<T, E>,
{
    assert_region_fits!(dst, n);
    let mut guard = RegionGuard::new(&mut dst[..n]);
    for _ in 0..n {
        guard.try_push_with(|| construct(value))?;
    }
    Ok(guard.commit())
}

/// Default-constructs the first `n` slots of `dst`.
///
/// Types with a trivial default are zero-filled in one pass.
pub fn uninitialized_default_n<T>(dst: &mut [MaybeUninit<T>], n: usize) -> usize
where
    T: SlotElement + Default,
{
    assert_region_fits!(dst, n);
    if T::TRIVIAL_DEFAULT {
        // SAFETY: TRIVIAL_DEFAULT guarantees the all-zero pattern is the
        // default value of `T`.
        unsafe { dst.as_mut_ptr().write_bytes(0, n) };
        return n;
    }
    let mut guard = RegionGuard::new(&mut dst[..n]);
    for _ in 0..n {
        guard.push(T::default());
    }
    guard.commit()
}

/// Moves every live slot of `src` into the raw region `dst`.
///
/// # Safety
///
/// Every slot of `src` must be live. After the call they are all raw: the
/// objects now live in `dst` and must not be destroyed through `src`.
pub unsafe fn uninitialized_move<T>(
    src: &mut [MaybeUninit<T>],
    dst: &mut [MaybeUninit<T>],
) -> usize {
    let n = src.len();
    unsafe { uninitialized_move_n(src, n, dst) }
}

/// Moves the first `n` live slots of `src` into the raw region `dst`.
///
/// # Safety
///
/// Slots `[0, n)` of `src` must be live. After the call they are raw.
pub unsafe fn uninitialized_move_n<T>(
    src: &mut [MaybeUninit<T>],
    n: usize,
    dst: &mut [MaybeUninit<T>],
) -> usize {
    assert_source_fits(src, n);
    assert_region_fits!(dst, n);
    // SAFETY: both regions hold at least `n` slots and are distinct borrows.
    unsafe { ptr::copy_nonoverlapping(src.as_ptr(), dst.as_mut_ptr(), n) };
    n
}

/// Moves every item produced by `items` into the raw region `dst`.
///
/// If the iterator panics, or yields more items than `dst` can hold, the
/// destination slots filled so far are destroyed before the panic propagates.
pub fn uninitialized_move_from<T, I>(items: I, dst: &mut [MaybeUninit<T>]) -> usize
where
    T: SlotElement,
    I: IntoIterator<Item = T>,
{
    let mut guard = RegionGuard::new(dst);
    for item in items {
        guard.push(item);
    }
    guard.commit()
}

/// Moves every `Ok` item produced by `items` into `dst`, stopping at the first
/// `Err`.
///
/// On `Err`, the destination slots filled by this call are destroyed and the
/// error is returned as-is. Items already moved are not restored.
pub fn try_uninitialized_move_from<T, E, I>(items: I, dst: &mut [MaybeUninit<T>]) -> Result<usize, E>
where
    T: SlotElement,
    I: IntoIterator<Item = Result<T, E>>,
{
    let mut guard = RegionGuard::new(dst);
    for item in items {
        guard.push(item?);
    }
    Ok(guard.commit())
}

#[inline]
fn assert_source_fits<S>(src: &[S], n: usize) {
    assert!(
        n <= src.len(),
        "source range too small: {n} elements requested, {} available",
        src.len()
    );
}
