//! Test utilities and helpers for the slotmem crates.
//!
//! This crate provides element types whose lifecycle can be observed and
//! disrupted from a test:
//! - [`Census`] / [`Tracked`]: a live-instance counter
//! - [`FaultPlan`] / [`Faulty`]: clones that fail on a chosen construction
//! - [`Probe`]: a reference-counted type, for double-free and leak checks
//! - [`data_gen`]: random element data
//!
//! # Usage
//!
//! This crate is intended for the slotmem test suites only.

pub mod census;
pub mod data_gen;
pub mod fault;
pub mod probe;

pub use census::{Census, Tracked};
pub use fault::{FaultPlan, Faulty, InjectedFault};
pub use probe::{Probe, ProbeWatch, probes};
