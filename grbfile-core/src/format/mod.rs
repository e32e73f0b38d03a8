//! Binary format definitions for the matrix file
//!
//! This module contains pure data structure definitions for the wire format.
//! No I/O operations - only format specifications.

pub mod constants;
#[cfg(feature = "alloc")]
pub mod header;
pub mod layout;
pub mod metadata;
pub mod types;

// Re-export format definitions
#[cfg(feature = "alloc")]
pub use header::AsciiHeader;
pub use layout::{Layout, Orientation, Sparsity, SparsityControl};
pub use metadata::BinaryMetadata;
pub use types::{ElementType, TypeTable};
