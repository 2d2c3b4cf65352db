//! Object lifecycle primitives over raw memory regions.
//!
//! This crate is the layer containers build on when they manage their own
//! storage: it constructs, destroys, copies, moves and fills objects inside
//! caller-supplied raw slots, and guarantees that a failure partway through a
//! bulk operation leaves no constructed-but-orphaned objects behind.
//!
//! # Modules
//!
//! - [`capability`]: compile-time classification of element types
//!   ([`SlotElement`]) that selects flat byte paths over per-element ones.
//! - [`construct`]: single-slot construction and destruction.
//! - [`region`]: [`RegionGuard`], the rollback guard for partially built
//!   regions.
//! - [`uninit`]: bulk copy, fill and move into raw regions.
//! - [`temp_buffer`]: [`TemporaryBuffer`], a degrading-allocation scratch block.
//! - [`unique`]: [`UniqueHandle`], a single-owner heap object handle.
//!
//! Raw allocation lives in the [`raw_alloc`] support crate.

pub mod capability;
pub mod construct;
pub mod region;
pub mod temp_buffer;
pub mod uninit;
pub mod unique;

#[cfg(test)]
mod test_util;

pub use slotmem_raw_alloc as raw_alloc;

pub use capability::{Capabilities, LifecycleOp, SlotElement, is_trivial};
pub use construct::{
    construct_copy, construct_default, construct_from, construct_move, construct_with, destroy,
    destroy_ptr, destroy_range, try_construct_with,
};
pub use region::RegionGuard;
pub use temp_buffer::{
    BufferConfig, BufferGrant, TemporaryBuffer, get_temporary_buffer, release_temporary_buffer,
};
pub use uninit::{
    try_uninitialized_copy_n_with, try_uninitialized_copy_with, try_uninitialized_fill_n_with,
    try_uninitialized_fill_with, try_uninitialized_move_from, uninitialized_copy,
    uninitialized_copy_n, uninitialized_default_n, uninitialized_fill, uninitialized_fill_n,
    uninitialized_move, uninitialized_move_from, uninitialized_move_n,
};
pub use unique::UniqueHandle;

#[doc(hidden)]
pub mod __private {
    pub use bytemuck;
}
