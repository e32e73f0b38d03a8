//! Format validation utilities
//!
//! This module contains pure validation functions with no I/O dependencies.
//! All functions are arithmetic on region sizes or checks on decoded arrays.

pub mod bounds;
pub mod parsing;

pub use bounds::{buffer_plan, check_pointers, index_count, BufferPlan};
pub use parsing::{header_field, parse_version};
