//! Core definitions (error types and verification helpers), relied upon by all slotmem-* crates.

pub mod error;
pub mod macros;
pub mod result;

pub use error::{AllocError, Error, ErrorKind};
pub use result::Result;
