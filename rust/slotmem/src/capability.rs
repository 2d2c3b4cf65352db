//! Compile-time lifecycle capability classification.
//!
//! Every bulk algorithm in this crate has two bodies: a flat, byte-level one
//! and a per-element one. Which body runs is decided by the associated
//! constants of [`SlotElement`], which the compiler folds away, so the choice
//! has no runtime cost.
//!
//! The constants are derived from the language's own facts wherever Rust
//! exposes them:
//!
//! - **destroy**: `core::mem::needs_drop`.
//! - **move-construct**: always trivial. A Rust move is a bitwise copy with the
//!   source forgotten, so no per-element logic ever runs.
//! - **copy-construct**: only `Copy` types may claim it, enforced by
//!   [`trivial_slot_element!`] and [`copy_slot_element!`].
//! - **default-construct**: only `bytemuck::Zeroable` types may claim it, and
//!   their default value must be all-zero bytes.
//!
//! A wrong classification is a soundness bug, not a recoverable error, which is
//! why the trait is `unsafe` to implement.

use std::cell::Cell;
use std::num::{
    NonZeroI8, NonZeroI16, NonZeroI32, NonZeroI64, NonZeroI128, NonZeroIsize, NonZeroU8,
    NonZeroU16, NonZeroU32, NonZeroU64, NonZeroU128, NonZeroUsize,
};
use std::rc::Rc;
use std::sync::Arc;

/// Lifecycle capabilities of an element type.
///
/// # Safety
///
/// Implementors must guarantee that:
/// - `TRIVIAL_COPY` is `true` only if the type is `Copy`, so that a flat byte
///   copy is a valid clone.
/// - `TRIVIAL_DEFAULT` is `true` only if the all-zero bit pattern is a valid
///   value of the type and equals its default value.
/// - `TRIVIAL_DESTROY` is `true` only if dropping a value runs no code. The
///   default derives it from `core::mem::needs_drop` and should not be
///   overridden with `true`.
pub unsafe trait SlotElement: Sized {
    /// Default construction is a zero fill.
    const TRIVIAL_DEFAULT: bool = false;

    /// Copy construction is a flat byte copy.
    const TRIVIAL_COPY: bool = false;

    /// Destruction is a no-op.
    const TRIVIAL_DESTROY: bool = !std::mem::needs_drop::<Self>();
}

/// A single lifecycle operation that may or may not be trivial for a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleOp {
    DefaultConstruct,
    CopyConstruct,
    MoveConstruct,
    CopyAssign,
    MoveAssign,
    Destroy,
}

impl LifecycleOp {
    pub const ALL: [LifecycleOp; 6] = [
        LifecycleOp::DefaultConstruct,
        LifecycleOp::CopyConstruct,
        LifecycleOp::MoveConstruct,
        LifecycleOp::CopyAssign,
        LifecycleOp::MoveAssign,
        LifecycleOp::Destroy,
    ];
}

/// Snapshot of all lifecycle capabilities of one type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capabilities {
    pub default_construct: bool,
    pub copy_construct: bool,
    pub move_construct: bool,
    pub copy_assign: bool,
    pub move_assign: bool,
    pub destroy: bool,
}

impl Capabilities {
    /// Capabilities of `T`, evaluated at compile time.
    pub const fn of<T: SlotElement>() -> Capabilities {
        Capabilities {
            default_construct: T::TRIVIAL_DEFAULT,
            copy_construct: T::TRIVIAL_COPY,
            move_construct: true,
            // Assignment drops the previous value before storing the new one.
            copy_assign: T::TRIVIAL_COPY && T::TRIVIAL_DESTROY,
            move_assign: T::TRIVIAL_DESTROY,
            destroy: T::TRIVIAL_DESTROY,
        }
    }

    pub const fn is_trivial(&self, op: LifecycleOp) -> bool {
        match op {
            LifecycleOp::DefaultConstruct => self.default_construct,
            LifecycleOp::CopyConstruct => self.copy_construct,
            LifecycleOp::MoveConstruct => self.move_construct,
            LifecycleOp::CopyAssign => self.copy_assign,
            LifecycleOp::MoveAssign => self.move_assign,
            LifecycleOp::Destroy => self.destroy,
        }
    }

    /// Returns `true` if every lifecycle operation is trivial.
    pub const fn is_plain_data(&self) -> bool {
        self.default_construct
            && self.copy_construct
            && self.move_construct
            && self.copy_assign
            && self.move_assign
            && self.destroy
    }
}

/// Returns whether `op` can be performed on `T` with a flat byte operation.
#[inline]
pub const fn is_trivial<T: SlotElement>(op: LifecycleOp) -> bool {
    Capabilities::of::<T>().is_trivial(op)
}

/// Implements [`SlotElement`] for plain-data types: trivially copyable,
/// zero-default and without drop glue.
///
/// The types must implement `Copy` and `bytemuck::Zeroable`; this is checked at
/// compile time. Their `Default` value, if any, must be all-zero bytes.
#[macro_export]
macro_rules! trivial_slot_element {
    ($($t:ty),* $(,)?) => {$(
        const _: fn() = || {
            fn assert_plain_data<T: ::core::marker::Copy + $crate::__private::bytemuck::Zeroable>() {}
            assert_plain_data::<$t>();
        };

        unsafe impl $crate::capability::SlotElement for $t {
            const TRIVIAL_DEFAULT: bool = true;
            const TRIVIAL_COPY: bool = true;
        }
    )*};
}

/// Implements [`SlotElement`] for `Copy` types whose default value is not
/// all-zero bytes (or that have no default at all).
#[macro_export]
macro_rules! copy_slot_element {
    ($($t:ty),* $(,)?) => {$(
        const _: fn() = || {
            fn assert_copy<T: ::core::marker::Copy>() {}
            assert_copy::<$t>();
        };

        unsafe impl $crate::capability::SlotElement for $t {
            const TRIVIAL_COPY: bool = true;
        }
    )*};
}

/// Implements [`SlotElement`] with every capability left at its conservative
/// default: per-element construction, destruction derived from `needs_drop`.
#[macro_export]
macro_rules! slot_element {
    ($($t:ty),* $(,)?) => {$(
        unsafe impl $crate::capability::SlotElement for $t {}
    )*};
}

trivial_slot_element!(
    u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, bool, char, (),
);

copy_slot_element!(
    NonZeroU8,
    NonZeroU16,
    NonZeroU32,
    NonZeroU64,
    NonZeroU128,
    NonZeroUsize,
    NonZeroI8,
    NonZeroI16,
    NonZeroI32,
    NonZeroI64,
    NonZeroI128,
    NonZeroIsize,
);

slot_element!(String);

unsafe impl<T> SlotElement for Vec<T> {}

unsafe impl<T: ?Sized> SlotElement for Box<T> {}

unsafe impl<T: ?Sized> SlotElement for Rc<T> {}

unsafe impl<T: ?Sized> SlotElement for Arc<T> {}

unsafe impl<T: SlotElement> SlotElement for Cell<T> {}

// `None` is not guaranteed to be all-zero bytes, so default stays per-element.
unsafe impl<T: SlotElement> SlotElement for Option<T> {
    const TRIVIAL_COPY: bool = T::TRIVIAL_COPY;
}

unsafe impl<T: SlotElement, const N: usize> SlotElement for [T; N] {
    const TRIVIAL_DEFAULT: bool = T::TRIVIAL_DEFAULT;
    const TRIVIAL_COPY: bool = T::TRIVIAL_COPY;
}

unsafe impl<T: ?Sized> SlotElement for &T {
    const TRIVIAL_COPY: bool = true;
}

// A null pointer is the all-zero bit pattern.
unsafe impl<T> SlotElement for *const T {
    const TRIVIAL_DEFAULT: bool = true;
    const TRIVIAL_COPY: bool = true;
}

unsafe impl<T> SlotElement for *mut T {
    const TRIVIAL_DEFAULT: bool = true;
    const TRIVIAL_COPY: bool = true;
}
