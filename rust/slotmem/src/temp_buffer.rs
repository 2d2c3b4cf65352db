//! Degrading temporary buffers.
//!
//! A [`TemporaryBuffer`] asks for the largest contiguous block of slots it can
//! get. Each refused allocation halves the request (integer division) until
//! an allocation succeeds or the request reaches zero. An empty grant is a
//! degraded result for the caller to check, never an error.

use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::ptr::NonNull;

use slotmem_common::verify_arg;
use slotmem_raw_alloc::{Global, RawAllocator, TypedAllocator};

use crate::capability::SlotElement;
use crate::construct;
use crate::region::RegionGuard;
use crate::uninit;

/// Limits applied to a temporary buffer request before the halving loop
/// starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferConfig {
    max_block_bytes: usize,
}

impl BufferConfig {
    /// The largest block the global allocator can ever describe.
    pub const DEFAULT_MAX_BLOCK_BYTES: usize = isize::MAX as usize;

    /// Creates a config whose single block never exceeds `max_block_bytes`.
    pub fn new(max_block_bytes: usize) -> slotmem_common::Result<BufferConfig> {
        verify_arg!(max_block_bytes, max_block_bytes > 0);
        verify_arg!(
            max_block_bytes,
            max_block_bytes <= BufferConfig::DEFAULT_MAX_BLOCK_BYTES
        );
        Ok(BufferConfig { max_block_bytes })
    }

    /// Returns a copy of this config with a different block limit.
    pub fn with_max_block_bytes(self, max_block_bytes: usize) -> slotmem_common::Result<Self> {
        BufferConfig::new(max_block_bytes)
    }

    pub fn max_block_bytes(&self) -> usize {
        self.max_block_bytes
    }

    /// The largest slot count of `T` a single block may hold.
    ///
    /// Zero-sized types count as one byte per slot, so a grant that has to be
    /// filled element by element stays bounded.
    pub fn max_len<T>(&self) -> usize {
        self.max_block_bytes / size_of::<T>().max(1)
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        BufferConfig {
            max_block_bytes: BufferConfig::DEFAULT_MAX_BLOCK_BYTES,
        }
    }
}

/// A granted block: its first slot and its slot count.
///
/// A plain value with no ownership behavior. Whoever obtained it from
/// [`get_temporary_buffer`] must hand it back to
/// [`release_temporary_buffer`].
pub struct BufferGrant<T> {
    pub ptr: NonNull<T>,
    pub len: usize,
}

impl<T> BufferGrant<T> {
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<T> Clone for BufferGrant<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for BufferGrant<T> {}

impl<T> std::fmt::Debug for BufferGrant<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferGrant")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

/// Obtains a raw block of at most `len` slots from the global allocator,
/// degrading the request on failure.
///
/// The slots are raw. A zero `len` in the result means no storage was
/// obtained.
pub fn get_temporary_buffer<T>(len: usize) -> BufferGrant<T> {
    get_temporary_buffer_with(len, &TypedAllocator::new(), &BufferConfig::default())
}

/// Same as [`get_temporary_buffer`], drawing from `alloc` under `config`.
pub fn get_temporary_buffer_with<T, A: RawAllocator>(
    len: usize,
    alloc: &TypedAllocator<T, A>,
    config: &BufferConfig,
) -> BufferGrant<T> {
    let (ptr, len) = acquire_block(alloc, len, config);
    BufferGrant { ptr, len }
}

/// Releases a block obtained from [`get_temporary_buffer`].
///
/// # Safety
///
/// `grant` must come from [`get_temporary_buffer`], must not have been
/// released already, and every object constructed in it must already have
/// been destroyed or moved out.
pub unsafe fn release_temporary_buffer<T>(grant: BufferGrant<T>) {
    unsafe { release_temporary_buffer_with(grant, &TypedAllocator::new()) }
}

/// Releases a block obtained from [`get_temporary_buffer_with`].
///
/// # Safety
///
/// See [`release_temporary_buffer`]; `alloc` must be the allocator the block
/// came from.
pub unsafe fn release_temporary_buffer_with<T, A: RawAllocator>(
    grant: BufferGrant<T>,
    alloc: &TypedAllocator<T, A>,
) {
    unsafe { alloc.deallocate(grant.ptr, grant.len) }
}

/// Clamps `requested` to the config limit, then halves it on every refused
/// allocation.
fn acquire_block<T, A: RawAllocator>(
    alloc: &TypedAllocator<T, A>,
    requested: usize,
    config: &BufferConfig,
) -> (NonNull<T>, usize) {
    let mut len = requested.min(config.max_len::<T>());
    if len < requested {
        log::debug!(
            "temporary buffer of {} clamped from {} to {} slots",
            std::any::type_name::<T>(),
            requested,
            len
        );
    }
    while len > 0 {
        match alloc.allocate(len) {
            Ok(ptr) => {
                log::trace!(
                    "temporary buffer of {}: granted {} of {} slots",
                    std::any::type_name::<T>(),
                    len,
                    requested
                );
                return (ptr, len);
            }
            Err(e) => {
                log::debug!("temporary buffer shrinking from {len} slots: {e}");
                len /= 2;
            }
        }
    }
    if requested != 0 {
        log::debug!(
            "temporary buffer of {} exhausted: no storage for {} slots",
            std::any::type_name::<T>(),
            requested
        );
    }
    (NonNull::dangling(), 0)
}

/// A contiguous block of up to `requested_len` slots, obtained by degrading
/// allocation.
///
/// Immediately after construction the granted slots are either all live
/// (element types without a trivial default are filled from the sample) or
/// all raw (trivial types, left for the caller to populate). Dropping the
/// buffer destroys the live slots, then releases the block.
pub struct TemporaryBuffer<T: SlotElement, A: RawAllocator = Global> {
    ptr: NonNull<T>,
    len: usize,
    requested_len: usize,
    initialized: bool,
    alloc: TypedAllocator<T, A>,
    _owns: PhantomData<T>,
}

impl<T: SlotElement + Clone> TemporaryBuffer<T, Global> {
    /// Requests `requested_len` slots from the global allocator.
    pub fn new(requested_len: usize, sample: &T) -> Self {
        TemporaryBuffer::with_config(requested_len, sample, &BufferConfig::default(), Global)
    }

    /// Requests one slot per element of `source`, filled from its first
    /// element.
    pub fn for_slice(source: &[T]) -> Self {
        match source.first() {
            Some(sample) => TemporaryBuffer::new(source.len(), sample),
            None => TemporaryBuffer::empty(TypedAllocator::new()),
        }
    }
}

impl<T: SlotElement, A: RawAllocator> TemporaryBuffer<T, A> {
    /// Requests `requested_len` slots from `alloc`.
    pub fn with_allocator(requested_len: usize, sample: &T, alloc: A) -> Self
    where
        T: Clone,
    {
        TemporaryBuffer::with_config(requested_len, sample, &BufferConfig::default(), alloc)
    }

    /// Requests `requested_len` slots from `alloc`, under the limits of
    /// `config`.
    ///
    /// If cloning the sample panics, the slots cloned so far are destroyed
    /// and the block is released before the panic propagates.
    pub fn with_config(requested_len: usize, sample: &T, config: &BufferConfig, alloc: A) -> Self
    where
        T: Clone,
    {
        let mut buffer = TemporaryBuffer::acquire(requested_len, config, alloc);
        if !T::TRIVIAL_DEFAULT {
            buffer.fill_from(sample);
        }
        buffer
    }

    /// Same as [`with_config`](Self::with_config), filling slots through a
    /// fallible constructor applied to `sample`.
    ///
    /// On `Err` the slots built so far are destroyed, the block is released
    /// and the error is returned unchanged.
    pub fn try_with_config<E, F>(
        requested_len: usize,
        sample: &T,
        config: &BufferConfig,
        alloc: A,
        construct: F,
    ) -> Result<Self, E>
    where
        F: FnMut(&T) -> Result<T, E>,
    {
        let mut buffer = TemporaryBuffer::acquire(requested_len, config, alloc);
        if !T::TRIVIAL_DEFAULT && buffer.len != 0 {
            let len = buffer.len;
            uninit::try_uninitialized_fill_n_with(buffer.slots_mut(), len, sample, construct)?;
            buffer.initialized = true;
        }
        Ok(buffer)
    }

    /// Obtains the block without touching its slots.
    fn acquire(requested_len: usize, config: &BufferConfig, alloc: A) -> Self {
        let alloc = TypedAllocator::with_allocator(alloc);
        let (ptr, len) = acquire_block(&alloc, requested_len, config);
        TemporaryBuffer {
            ptr,
            len,
            requested_len,
            initialized: false,
            alloc,
            _owns: PhantomData,
        }
    }

    fn empty(alloc: TypedAllocator<T, A>) -> Self {
        TemporaryBuffer {
            ptr: NonNull::dangling(),
            len: 0,
            requested_len: 0,
            initialized: false,
            alloc,
            _owns: PhantomData,
        }
    }

    fn fill_from(&mut self, sample: &T)
    where
        T: Clone,
    {
        if self.len == 0 {
            return;
        }
        let len = self.len;
        uninit::uninitialized_fill_n(self.slots_mut(), len, sample);
        self.initialized = true;
    }

    fn slots_mut(&mut self) -> &mut [MaybeUninit<T>] {
        // SAFETY: the block holds `len` slots of `T` and is owned by `self`.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr().cast(), self.len) }
    }

    /// Granted slot count, `<= requested_len()`.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Slot count originally asked for.
    #[inline]
    pub fn requested_len(&self) -> usize {
        self.requested_len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if the granted slots are live.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// First slot of the block.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// One past the last granted slot.
    #[inline]
    pub fn end_ptr(&self) -> *const T {
        self.ptr.as_ptr().wrapping_add(self.len)
    }

    /// The granted slots, if they are live.
    pub fn as_slice(&self) -> Option<&[T]> {
        if !self.initialized && self.len != 0 {
            return None;
        }
        // SAFETY: every granted slot is live, or there are none.
        Some(unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) })
    }

    pub fn as_mut_slice(&mut self) -> Option<&mut [T]> {
        if !self.initialized && self.len != 0 {
            return None;
        }
        Some(unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) })
    }

    /// The granted slots, if they are still raw.
    ///
    /// Objects constructed through this view are leaked on drop unless
    /// [`assume_init`](Self::assume_init) is called once all of them are
    /// live.
    pub fn raw_slots_mut(&mut self) -> Option<&mut [MaybeUninit<T>]> {
        if self.initialized {
            return None;
        }
        Some(self.slots_mut())
    }

    /// Marks every granted slot as live.
    ///
    /// # Safety
    ///
    /// Every slot in `[0, len())` must have been constructed through
    /// [`raw_slots_mut`](Self::raw_slots_mut).
    pub unsafe fn assume_init(&mut self) {
        self.initialized = true;
    }

    /// Fills raw slots from `sample` and returns them as live; a no-op on an
    /// already initialized buffer.
    pub fn initialize(&mut self, sample: &T) -> &mut [T]
    where
        T: Clone,
    {
        if !self.initialized {
            self.fill_from(sample);
        }
        let len = self.len;
        // SAFETY: after the fill every granted slot is live.
        unsafe { construct::assume_live_mut(&mut self.slots_mut()[..len]) }
    }

    /// Populates the raw slots from `items`, returning how many were filled.
    ///
    /// The buffer counts as initialized only if `items` filled every slot;
    /// otherwise the partial prefix is destroyed and the slots stay raw.
    pub fn initialize_from<I>(&mut self, items: I) -> usize
    where
        I: IntoIterator<Item = T>,
    {
        if self.initialized {
            return 0;
        }
        let mut guard = RegionGuard::new(self.slots_mut());
        for item in items.into_iter().take(guard.capacity()) {
            guard.push(item);
        }
        if !guard.is_full() {
            return 0;
        }
        let filled = guard.commit();
        self.initialized = true;
        filled
    }
}

impl<T: SlotElement, A: RawAllocator> Drop for TemporaryBuffer<T, A> {
    fn drop(&mut self) {
        if self.initialized {
            // SAFETY: an initialized buffer holds `len` live slots.
            unsafe { construct::destroy_range(self.slots_mut()) };
        }
        // SAFETY: the block came from `self.alloc.allocate(len)`.
        unsafe { self.alloc.deallocate(self.ptr, self.len) }
    }
}

// SAFETY: the buffer exclusively owns its block and the objects in it.
unsafe impl<T: SlotElement + Send, A: RawAllocator + Send> Send for TemporaryBuffer<T, A> {}

unsafe impl<T: SlotElement + Sync, A: RawAllocator + Sync> Sync for TemporaryBuffer<T, A> {}

impl<T: SlotElement, A: RawAllocator> std::fmt::Debug for TemporaryBuffer<T, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemporaryBuffer")
            .field("type", &std::any::type_name::<T>())
            .field("requested_len", &self.requested_len)
            .field("len", &self.len)
            .field("initialized", &self.initialized)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use slotmem_common::ErrorKind;
    use slotmem_raw_alloc::BudgetedAllocator;

    use super::*;
    use crate::test_util::{Census, Counted, Fault};

    fn is_halving_descendant(requested: usize, granted: usize) -> bool {
        let mut len = requested;
        loop {
            if len == granted {
                return true;
            }
            if len == 0 {
                return false;
            }
            len /= 2;
        }
    }

    #[test]
    fn degrades_until_budget_fits() {
        let budget = BudgetedAllocator::new(1000);
        {
            let mut buffer = TemporaryBuffer::with_allocator(1000, &0u64, &budget);
            assert_eq!(buffer.requested_len(), 1000);
            assert_eq!(buffer.len(), 125);
            assert!(is_halving_descendant(1000, buffer.len()));
            assert_eq!(budget.refusals(), 3);
            assert_eq!(budget.in_use(), 1000);

            // Trivial elements stay raw.
            assert!(!buffer.is_initialized());
            assert!(buffer.as_slice().is_none());
            assert_eq!(buffer.raw_slots_mut().map(|s| s.len()), Some(125));
        }
        assert_eq!(budget.in_use(), 0);
        assert_eq!(budget.live_blocks(), 0);
    }

    #[test]
    fn non_trivial_slots_are_live() {
        let budget = BudgetedAllocator::new(1000);
        let sample = String::from("sample");
        let buffer = TemporaryBuffer::with_allocator(100, &sample, &budget);
        assert!(is_halving_descendant(100, buffer.len()));
        assert!(buffer.len() * size_of::<String>() <= 1000);
        assert!(!buffer.is_empty());
        assert!(buffer.is_initialized());
        assert!(buffer.as_slice().unwrap().iter().all(|s| *s == sample));
        drop(buffer);
        assert_eq!(budget.in_use(), 0);
    }

    #[test]
    fn exhausted_budget_yields_empty_buffer() {
        let budget = BudgetedAllocator::new(0);
        let mut buffer = TemporaryBuffer::with_allocator(64, &1u32, &budget);
        assert!(buffer.is_empty());
        assert_eq!(buffer.requested_len(), 64);
        assert_eq!(buffer.as_ptr(), buffer.end_ptr());
        assert_eq!(buffer.as_slice(), Some(&[][..]));
        assert!(buffer.initialize(&5).is_empty());
        assert_eq!(budget.refusals(), 7);
    }

    #[test]
    fn request_is_clamped_to_block_limit() {
        let config = BufferConfig::new(64).unwrap();
        assert_eq!(config.max_len::<u32>(), 16);
        assert_eq!(config.max_len::<()>(), 64);

        let mut buffer = TemporaryBuffer::with_config(1000, &0u32, &config, Global);
        assert_eq!(buffer.len(), 16);
        assert_eq!(buffer.requested_len(), 1000);
        assert_eq!(buffer.initialize(&7), &[7; 16]);
        assert!(buffer.is_initialized());
        assert!(buffer.raw_slots_mut().is_none());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = BufferConfig::new(0).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
        assert!(
            BufferConfig::default()
                .with_max_block_bytes(usize::MAX)
                .is_err()
        );
        assert_eq!(
            BufferConfig::default().max_block_bytes(),
            BufferConfig::DEFAULT_MAX_BLOCK_BYTES
        );
    }

    #[test]
    fn for_slice_uses_first_element() {
        let census = Census::new();
        let source: Vec<Counted> = (0..3).map(|i| Counted::new(&census, 10 + i)).collect();
        let buffer = TemporaryBuffer::for_slice(&source);
        assert_eq!(buffer.len(), 3);
        assert!(buffer.as_slice().unwrap().iter().all(|c| c.value == 10));
        assert_eq!(census.live(), 6);
        drop(buffer);
        assert_eq!(census.live(), 3);

        let empty = TemporaryBuffer::<Counted>::for_slice(&[]);
        assert!(empty.is_empty());
    }

    #[test]
    fn sample_clone_panic_releases_block() {
        let census = Census::new();
        let sample = Counted::new(&census, 1);
        let budget = BudgetedAllocator::new(4096);
        census.fail_clone_at(2);
        let res = catch_unwind(AssertUnwindSafe(|| {
            TemporaryBuffer::with_allocator(8, &sample, &budget)
        }));
        assert!(res.is_err());
        assert_eq!(census.live(), 1);
        assert_eq!(budget.in_use(), 0);
    }

    #[test]
    fn try_fill_error_releases_block() {
        let census = Census::new();
        let sample = Counted::new(&census, 1);
        let budget = BudgetedAllocator::new(4096);
        census.fail_clone_at(3);
        let res = TemporaryBuffer::try_with_config(
            8,
            &sample,
            &BufferConfig::default(),
            &budget,
            Counted::try_clone,
        );
        assert_eq!(res.err(), Some(Fault));
        assert_eq!(census.live(), 1);
        assert_eq!(budget.in_use(), 0);

        let buffer = TemporaryBuffer::try_with_config(
            4,
            &sample,
            &BufferConfig::default(),
            &budget,
            Counted::try_clone,
        )
        .unwrap();
        assert_eq!(census.live(), 5);
        drop(buffer);
        assert_eq!(census.live(), 1);
    }

    #[test]
    fn initialize_from_items() {
        let mut buffer = TemporaryBuffer::new(3, &0u8);
        assert_eq!(buffer.initialize_from([1u8, 2, 3, 4]), 3);
        assert_eq!(buffer.as_slice(), Some(&[1u8, 2, 3][..]));
        assert_eq!(buffer.initialize_from([5u8]), 0);

        // Too few items: the slots stay raw.
        let mut buffer = TemporaryBuffer::new(4, &0u32);
        assert_eq!(buffer.initialize_from([9u32, 9]), 0);
        assert!(!buffer.is_initialized());
        assert!(buffer.raw_slots_mut().is_some());
    }

    #[test]
    fn manual_population_through_raw_slots() {
        let mut buffer = TemporaryBuffer::new(5, &0u16);
        let slots = buffer.raw_slots_mut().unwrap();
        let end = uninit::uninitialized_fill_n(slots, 5, &3);
        assert_eq!(end, 5);
        unsafe { buffer.assume_init() };
        buffer.as_mut_slice().unwrap()[0] = 1;
        assert_eq!(buffer.as_slice(), Some(&[1u16, 3, 3, 3, 3][..]));
    }

    #[test]
    fn grant_round_trip() {
        let grant = get_temporary_buffer::<u64>(16);
        assert_eq!(grant.len, 16);
        assert!(!grant.is_empty());
        for i in 0..grant.len {
            unsafe { grant.ptr.as_ptr().add(i).write(i as u64) };
        }
        assert_eq!(unsafe { grant.ptr.as_ptr().add(15).read() }, 15);
        unsafe { release_temporary_buffer(grant) };

        let budget = BudgetedAllocator::new(100);
        let alloc = TypedAllocator::<u32, _>::with_allocator(&budget);
        let grant = get_temporary_buffer_with(1000, &alloc, &BufferConfig::default());
        assert!(is_halving_descendant(1000, grant.len));
        assert!(grant.len * 4 <= 100);
        unsafe { release_temporary_buffer_with(grant, &alloc) };
        assert_eq!(budget.in_use(), 0);

        let empty = get_temporary_buffer::<u8>(0);
        assert!(empty.is_empty());
        unsafe { release_temporary_buffer(empty) };
    }

    #[test]
    fn zero_sized_elements_are_granted_up_to_block_limit() {
        let buffer = TemporaryBuffer::new(usize::MAX, &());
        assert_eq!(buffer.len(), BufferConfig::DEFAULT_MAX_BLOCK_BYTES);
        assert!(!buffer.is_initialized());
    }

    #[test]
    fn zero_sized_fill_is_bounded() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        static DROPS: AtomicUsize = AtomicUsize::new(0);

        #[derive(Clone)]
        struct Marker;

        impl Drop for Marker {
            fn drop(&mut self) {
                DROPS.fetch_add(1, Ordering::Relaxed);
            }
        }

        crate::slot_element!(Marker);

        assert_eq!(
            BufferConfig::default().max_len::<Marker>(),
            BufferConfig::DEFAULT_MAX_BLOCK_BYTES
        );

        let config = BufferConfig::new(64).unwrap();
        let sample = Marker;
        let buffer = TemporaryBuffer::with_config(usize::MAX, &sample, &config, Global);
        assert_eq!(buffer.len(), 64);
        assert_eq!(buffer.requested_len(), usize::MAX);
        assert!(buffer.is_initialized());
        assert_eq!(DROPS.load(Ordering::Relaxed), 0);

        drop(buffer);
        assert_eq!(DROPS.load(Ordering::Relaxed), 64);
    }

    #[test]
    fn random_requests_stay_within_budget() {
        for _ in 0..200 {
            let limit = fastrand::usize(0..1 << 14);
            let requested = fastrand::usize(0..1 << 12);
            let budget = BudgetedAllocator::new(limit);
            {
                let buffer = TemporaryBuffer::with_allocator(requested, &0u32, &budget);
                assert!(buffer.len() <= requested);
                assert!(is_halving_descendant(requested, buffer.len()));
                assert!(buffer.len() * size_of::<u32>() <= limit);
            }
            assert_eq!(budget.in_use(), 0);
        }
    }
}
