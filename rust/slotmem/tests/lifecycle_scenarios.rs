use std::mem::MaybeUninit;
use std::panic::{AssertUnwindSafe, catch_unwind};

use slotmem::construct::{assume_live, destroy_range};
use slotmem::raw_alloc::{BudgetedAllocator, TypedAllocator};
use slotmem::{
    BufferConfig, TemporaryBuffer, UniqueHandle, try_uninitialized_fill_n_with,
    uninitialized_copy, uninitialized_copy_n, uninitialized_fill_n, uninitialized_move_from,
};
use slotmem_testkit::{Census, FaultPlan, Faulty, InjectedFault, data_gen, probes};

fn raw<T>(n: usize) -> Vec<MaybeUninit<T>> {
    std::iter::repeat_with(MaybeUninit::uninit).take(n).collect()
}

#[test]
fn test_copy_reference_counted_region() {
    let (source, watch) = probes(5);
    let mut dst = raw(5);
    assert_eq!(uninitialized_copy(&source, &mut dst), 5);
    assert_eq!(watch.count(), 10);

    let copied = unsafe { assume_live(&dst) };
    assert!(source.iter().zip(copied).all(|(a, b)| a.tag == b.tag));

    drop(source);
    assert_eq!(watch.count(), 5);
    unsafe { destroy_range(&mut dst) };
    assert_eq!(watch.count(), 0);
}

#[test]
fn test_move_tracked_values_into_region() {
    let census = Census::new();
    let values = census.track_many(6);
    let mut dst = raw(8);
    let end = uninitialized_move_from(values, &mut dst);
    assert_eq!(end, 6);
    assert_eq!(census.live(), 6);
    assert_eq!(census.created(), 6);

    let moved = unsafe { assume_live(&dst[..end]) };
    assert!(moved.iter().enumerate().all(|(i, t)| t.value == i as u64));
    unsafe { destroy_range(&mut dst[..end]) };
    assert_eq!(census.live(), 0);
    assert_eq!(census.dropped(), 6);
}

#[test]
fn test_copy_into_allocated_block() {
    let strings = data_gen::random_strings(64, 12);
    let alloc = TypedAllocator::<String>::new();
    let block = alloc.allocate(strings.len()).unwrap();
    let slots = unsafe {
        std::slice::from_raw_parts_mut(block.as_ptr().cast::<MaybeUninit<String>>(), strings.len())
    };
    let end = uninitialized_copy_n(&strings, strings.len(), slots);
    assert_eq!(unsafe { assume_live(&slots[..end]) }, &strings[..]);
    unsafe {
        destroy_range(&mut slots[..end]);
        alloc.deallocate(block, strings.len());
    }
}

#[test]
fn test_fill_failure_rolls_back() {
    let census = Census::new();
    let plan = FaultPlan::never();
    let value = Faulty::new(&census, &plan, 3);
    let mut dst = raw::<Faulty>(10);

    for k in [0, 1, 5, 9] {
        plan.rearm(k);
        let res = try_uninitialized_fill_n_with(&mut dst, 10, &value, Faulty::try_clone);
        assert_eq!(res, Err(InjectedFault { index: k }));
        assert_eq!(plan.constructions(), k + 1);
        assert_eq!(census.live(), 1);

        plan.rearm(k);
        let res = catch_unwind(AssertUnwindSafe(|| uninitialized_fill_n(&mut dst, 10, &value)));
        assert!(res.is_err());
        assert_eq!(census.live(), 1);
    }

    plan.disarm();
    let end = uninitialized_fill_n(&mut dst, 10, &value);
    assert_eq!(census.live(), 11);
    unsafe { destroy_range(&mut dst[..end]) };
    assert_eq!(census.live(), 1);
}

#[test]
fn test_degrading_buffer_under_budget() {
    let census = Census::new();
    let sample = census.track(42);
    let budget = BudgetedAllocator::new(4096);
    let config = BufferConfig::default();

    let buffer = TemporaryBuffer::with_config(10_000, &sample, &config, &budget);
    let granted = buffer.len();
    assert!(granted > 0 && granted < 10_000);
    assert!((0..).map(|i| 10_000 >> i).take_while(|&n| n > 0).any(|n| n == granted));
    assert!(buffer.is_initialized());
    assert!(buffer.as_slice().unwrap().iter().all(|t| t.value == 42));
    assert_eq!(census.live(), granted + 1);

    drop(buffer);
    assert_eq!(census.live(), 1);
    assert_eq!(budget.in_use(), 0);
}

#[test]
fn test_degrading_buffer_trivial_stays_raw() {
    let values = data_gen::random_u64s(300);
    let budget = BudgetedAllocator::new(1024);
    let mut buffer = TemporaryBuffer::with_allocator(values.len(), &0u64, &budget);
    assert_eq!(buffer.len(), 75);
    assert!(!buffer.is_initialized());

    let slots = buffer.raw_slots_mut().unwrap();
    let end = uninitialized_copy_n(&values, slots.len(), slots);
    unsafe { buffer.assume_init() };
    assert_eq!(buffer.as_slice().unwrap(), &values[..end]);
}

#[test]
fn test_ownership_transfer() {
    let census = Census::new();
    let mut a = UniqueHandle::new(census.track(1));
    let owned = a.as_ptr();

    let b = UniqueHandle::take(&mut a);
    assert!(a.is_empty());
    assert_eq!(b.as_ptr(), owned);

    let mut c = UniqueHandle::new(census.track(2));
    let mut b = b;
    c.assign_from(&mut b);
    assert!(b.is_empty());
    assert_eq!(c.value, 1);
    assert_eq!(census.live(), 1);

    let released = c.release().unwrap();
    assert!(c.release().is_none());
    assert_eq!(released.value, 1);
    drop(released);
    assert_eq!(census.live(), 0);
}
