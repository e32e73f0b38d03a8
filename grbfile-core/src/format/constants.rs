//! Format constants for the binary matrix file

/// Length of the leading ASCII header block
pub const HEADER_LEN: usize = 512;

/// First line of every ASCII header
pub const HEADER_TITLE: &str = "SuiteSparse:GraphBLAS matrix";

/// Width of an engine index (`Ap`, `Ah`, `Ai` entries, dimensions)
pub const INDEX_SIZE: usize = core::mem::size_of::<u64>();

/// Width of the native size type used for the element size field
pub const SIZE_T_SIZE: usize = core::mem::size_of::<usize>();

/// Orientation values stored in the metadata block
pub mod format {
    pub const BY_ROW: i32 = 0;
    pub const BY_COL: i32 = 1;
}

/// Sparsity status / control bits stored in the metadata block
pub mod sparsity {
    pub const HYPERSPARSE: i32 = 1;
    pub const SPARSE: i32 = 2;
    pub const BITMAP: i32 = 4;
    pub const FULL: i32 = 8;
    pub const AUTO: i32 = HYPERSPARSE | SPARSE | BITMAP | FULL;
}

/// Default hypersparsity switch of a new matrix
pub const HYPER_SWITCH_DEFAULT: f64 = 0.0625;

/// Default bitmap switch of a new matrix
pub const BITMAP_SWITCH_DEFAULT: f64 = 0.04;

/// Encode an engine version triple as its 64-bit implementation id
pub const fn implementation_id(major: u32, minor: u32, sub: u32) -> u64 {
    ((major as u64) * 1000 + minor as u64) * 1000 + sub as u64
}
