//! Rollback guard for partially constructed regions.

use std::mem::MaybeUninit;

use crate::capability::SlotElement;
use crate::construct;

/// Populates a raw region front to back, destroying whatever it built if it
/// is dropped before [`commit`](RegionGuard::commit).
///
/// This is the cleanup construct behind every non-trivial bulk algorithm: an
/// early `?` return or a panic in an element constructor drops the guard,
/// which destroys exactly the slots made live through it and nothing else.
pub struct RegionGuard<'a, T: SlotElement> {
    slots: &'a mut [MaybeUninit<T>],
    live: usize,
}

impl<'a, T: SlotElement> RegionGuard<'a, T> {
    /// Starts populating `slots`, all of which must be raw.
    #[inline]
    pub fn new(slots: &'a mut [MaybeUninit<T>]) -> Self {
        RegionGuard { slots, live: 0 }
    }

    /// Number of slots made live so far.
    #[inline]
    pub fn live(&self) -> usize {
        self.live
    }

    /// Total number of slots in the region.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.live == self.slots.len()
    }

    /// Moves `value` into the next raw slot.
    ///
    /// # Panics
    ///
    /// Panics if the region is full; the guard then rolls back on unwind.
    #[inline]
    pub fn push(&mut self, value: T) {
        assert!(
            self.live < self.slots.len(),
            "region overflow: all {} slots are live",
            self.slots.len()
        );
        construct::construct_move(&mut self.slots[self.live], value);
        self.live += 1;
    }

    /// Constructs the next slot from a fallible constructor.
    ///
    /// On `Err` the slot stays raw and the error is returned unchanged; the
    /// caller typically propagates it with `?`, dropping the guard.
    #[inline]
    pub fn try_push_with<E, F>(&mut self, f: F) -> Result<(), E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let value = f()?;
        self.push(value);
        Ok(())
    }

    /// The live prefix of the region.
    #[inline]
    pub fn as_live(&self) -> &[T] {
        // SAFETY: slots [0, live) were constructed through this guard.
        unsafe { construct::assume_live(&self.slots[..self.live]) }
    }

    /// Disarms the guard and returns the number of live slots, which now
    /// belong to the caller.
    #[inline]
    pub fn commit(self) -> usize {
        let live = self.live;
        std::mem::forget(self);
        live
    }
}

impl<T: SlotElement> Drop for RegionGuard<'_, T> {
    fn drop(&mut self) {
        if self.live != 0 {
            log::trace!(
                "rolling back {} live slots of {}",
                self.live,
                std::any::type_name::<T>()
            );
        }
        // SAFETY: exactly the slots [0, live) were made live by this guard.
        unsafe { construct::destroy_range(&mut self.slots[..self.live]) }
    }
}
