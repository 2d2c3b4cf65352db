//! Raw allocation primitives for the slotmem layer.
//!
//! Everything here deals in untyped (or merely sized) blocks: no object is
//! ever constructed or destroyed by this crate. Failures are reported to the
//! caller as [`AllocError`] and never retried; retry and rollback policy
//! lives one layer up.
//!
//! # Modules
//!
//! - [`global`]: the [`RawAllocator`] trait and the [`Global`] allocator backed by
//!   the process-wide Rust allocator.
//! - [`typed`]: [`TypedAllocator`], sizing blocks in units of `T`.
//! - [`budget`]: [`BudgetedAllocator`], an allocator that refuses requests beyond
//!   a fixed byte budget.

pub mod budget;
pub mod global;
pub mod typed;

pub use budget::BudgetedAllocator;
pub use global::{Global, RawAllocator};
pub use slotmem_common::AllocError;
pub use typed::TypedAllocator;
