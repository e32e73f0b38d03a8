#![no_std]

//! grbfile core - GraphBLAS binary matrix file format definitions
//!
//! This crate provides the pure format definitions for the binary matrix
//! file: the fixed ASCII header, the binary metadata block, the layout and
//! element-type tables, the engine status codes and the capability trait a
//! sparse engine implements so the codec can move its storage in and out.
//! No I/O lives here.

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod error;
pub mod format;
pub mod status;
pub mod traits;
pub mod validation;

pub use error::*;
pub use format::*;
pub use status::Status;
pub use traits::*;
pub use validation::{buffer_plan, check_pointers, BufferPlan};
