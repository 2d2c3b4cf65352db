//! An allocator that draws every block from a fixed byte budget.
//!
//! `BudgetedAllocator` is the deterministic way to make a request "too large
//! for available memory": any block that does not fit the remaining budget is
//! refused with [`AllocError::OutOfMemory`], without ever reaching the
//! wrapped allocator.

use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

use slotmem_common::AllocError;

use crate::global::{Global, RawAllocator};

/// Wraps a [`RawAllocator`] with a byte budget.
///
/// Released blocks return their size to the budget. Counters are atomic, so
/// a shared reference may be handed to several typed allocators.
pub struct BudgetedAllocator<A: RawAllocator = Global> {
    inner: A,
    remaining: Counter,
    limit: usize,
    live_blocks: AtomicUsize,
    refusals: AtomicUsize,
}

impl BudgetedAllocator<Global> {
    /// Creates a budget of `limit` bytes over the global allocator.
    pub fn new(limit: usize) -> Self {
        Self::with_allocator(Global, limit)
    }
}

impl<A: RawAllocator> BudgetedAllocator<A> {
    /// Creates a budget of `limit` bytes over `inner`.
    pub fn with_allocator(inner: A, limit: usize) -> Self {
        BudgetedAllocator {
            inner,
            remaining: Counter::new(limit),
            limit,
            live_blocks: AtomicUsize::new(0),
            refusals: AtomicUsize::new(0),
        }
    }

    /// Total budget in bytes.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Bytes still available for allocation.
    ///
    /// **Note**: intended for diagnostics; the value may be outdated when the
    /// allocator is shared.
    pub fn remaining(&self) -> usize {
        self.remaining.read()
    }

    /// Bytes currently handed out.
    pub fn in_use(&self) -> usize {
        self.limit - self.remaining()
    }

    /// Number of blocks currently handed out (zero-sized blocks excluded).
    pub fn live_blocks(&self) -> usize {
        self.live_blocks.load(Ordering::Acquire)
    }

    /// Number of requests refused so far, whether by the budget or by the
    /// wrapped allocator.
    pub fn refusals(&self) -> usize {
        self.refusals.load(Ordering::Acquire)
    }

    fn refuse(&self, layout: Layout) -> AllocError {
        self.refusals.fetch_add(1, Ordering::AcqRel);
        log::debug!(
            "budget refused {} bytes ({} of {} remaining)",
            layout.size(),
            self.remaining(),
            self.limit
        );
        AllocError::OutOfMemory {
            size: layout.size(),
            align: layout.align(),
        }
    }
}

unsafe impl<A: RawAllocator> RawAllocator for BudgetedAllocator<A> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if layout.size() == 0 {
            return self.inner.allocate(layout);
        }
        if !self.remaining.withdraw(layout.size()) {
            return Err(self.refuse(layout));
        }
        match self.inner.allocate(layout) {
            Ok(ptr) => {
                self.live_blocks.fetch_add(1, Ordering::AcqRel);
                Ok(ptr)
            }
            Err(_) => {
                self.remaining.deposit(layout.size());
                Err(self.refuse(layout))
            }
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { self.inner.deallocate(ptr, layout) };
        if layout.size() != 0 {
            self.live_blocks.fetch_sub(1, Ordering::AcqRel);
            self.remaining.deposit(layout.size());
        }
    }
}

impl<A: RawAllocator> std::fmt::Debug for BudgetedAllocator<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BudgetedAllocator")
            .field("limit", &self.limit)
            .field("remaining", &self.remaining())
            .field("live_blocks", &self.live_blocks())
            .finish_non_exhaustive()
    }
}

/// A non-negative atomic counter supporting all-or-nothing withdrawals.
struct Counter(AtomicUsize);

impl Counter {
    fn new(amount: usize) -> Counter {
        Counter(AtomicUsize::new(amount))
    }

    fn read(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    /// Subtracts `amount` if the counter holds at least that much.
    fn withdraw(&self, amount: usize) -> bool {
        let mut current = self.0.load(Ordering::Relaxed);
        while current >= amount {
            match self.0.compare_exchange_weak(
                current,
                current - amount,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(updated) => current = updated,
            }
        }
        false
    }

    fn deposit(&self, amount: usize) {
        self.0.fetch_add(amount, Ordering::AcqRel);
    }
}
