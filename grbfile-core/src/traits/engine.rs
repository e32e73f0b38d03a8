//! Capability interface of a sparse matrix engine
//!
//! The codec never looks inside a matrix. It asks the engine for layout
//! metadata through options, and moves raw storage in and out through one
//! unpack/pack primitive per layout. Unpack transfers ownership of the
//! buffers to the caller and leaves the matrix an empty shell; the matching
//! pack hands them back without copying.

use alloc::string::String;
use alloc::vec::Vec;

use crate::format::{ElementType, Orientation, Sparsity, SparsityControl, TypeTable};
use crate::status::Status;

/// Result of an engine primitive
pub type EngineResult<T> = core::result::Result<T, Status>;

/// What an engine build supports, queried once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Implementation id written as the file magic
    pub implementation: u64,
    /// Engine version triple
    pub version: (u32, u32, u32),
    /// Whether complex element types exist in this build
    pub complex: bool,
}

impl Capabilities {
    /// Type code table for this build
    pub const fn type_table(&self) -> TypeTable {
        TypeTable::new(self.complex)
    }
}

/// Matrix options the codec reads or writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatrixOption {
    Format,
    SparsityStatus,
    SparsityControl,
    HyperSwitch,
    BitmapSwitch,
}

/// Typed value of a matrix option
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptionValue {
    Format(Orientation),
    /// Read-only: the class the matrix is currently stored in
    SparsityStatus(Sparsity),
    SparsityControl(SparsityControl),
    HyperSwitch(f64),
    BitmapSwitch(f64),
}

impl OptionValue {
    /// Option key this value belongs to
    pub const fn option(&self) -> MatrixOption {
        match self {
            OptionValue::Format(_) => MatrixOption::Format,
            OptionValue::SparsityStatus(_) => MatrixOption::SparsityStatus,
            OptionValue::SparsityControl(_) => MatrixOption::SparsityControl,
            OptionValue::HyperSwitch(_) => MatrixOption::HyperSwitch,
            OptionValue::BitmapSwitch(_) => MatrixOption::BitmapSwitch,
        }
    }
}

/// Buffers of a hypersparse matrix (`HyperCSR` / `HyperCSC`)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HyperParts {
    /// Vector pointers, `nvec + 1` entries
    pub ap: Vec<u64>,
    /// Ids of the stored vectors, `nvec` entries
    pub ah: Vec<u64>,
    /// Minor indices, `nvals` entries
    pub ai: Vec<u64>,
    /// Values as raw bytes
    pub ax: Vec<u8>,
    pub iso: bool,
    pub nvec: u64,
    /// Indices are not sorted within each vector
    pub jumbled: bool,
}

/// Buffers of a sparse matrix (`CSR` / `CSC`)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SparseParts {
    /// Vector pointers, one entry per vector plus one
    pub ap: Vec<u64>,
    pub ai: Vec<u64>,
    pub ax: Vec<u8>,
    pub iso: bool,
    pub jumbled: bool,
}

/// Buffers of a bitmap matrix (`BitmapR` / `BitmapC`)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BitmapParts {
    /// Presence flags, one per position
    pub ab: Vec<i8>,
    pub ax: Vec<u8>,
    pub iso: bool,
    pub nvals: u64,
}

/// Buffers of a full matrix (`FullR` / `FullC`)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FullParts {
    pub ax: Vec<u8>,
    pub iso: bool,
}

/// Operations a sparse engine exposes to the codec
///
/// Methods mirror the engine's native primitives one to one. They return the
/// engine status on failure; `error_string` yields the diagnostic text for the
/// last failure on a matrix.
pub trait SparseEngine {
    /// Opaque matrix handle
    type Matrix;

    /// Opaque vector handle, storable as an n x 1 column-major matrix
    type Vector;

    /// Capabilities of this build
    fn capabilities(&self) -> Capabilities;

    /// Create an empty matrix
    fn matrix_new(&self, ty: ElementType, nrows: u64, ncols: u64) -> EngineResult<Self::Matrix>;

    /// Release a matrix
    fn matrix_free(&self, matrix: Self::Matrix) -> EngineResult<()> {
        drop(matrix);
        Ok(())
    }

    /// Finish all pending work so the stored buffers are complete
    fn wait(&self, matrix: &mut Self::Matrix) -> EngineResult<()>;

    fn element_type(&self, matrix: &Self::Matrix) -> EngineResult<ElementType>;

    /// Size in bytes of one element of `ty`
    fn type_size(&self, ty: ElementType) -> EngineResult<usize> {
        Ok(ty.size())
    }

    fn nrows(&self, matrix: &Self::Matrix) -> EngineResult<u64>;

    fn ncols(&self, matrix: &Self::Matrix) -> EngineResult<u64>;

    fn nvals(&self, matrix: &Self::Matrix) -> EngineResult<u64>;

    fn get_option(&self, matrix: &Self::Matrix, option: MatrixOption) -> EngineResult<OptionValue>;

    fn set_option(&self, matrix: &mut Self::Matrix, value: OptionValue) -> EngineResult<()>;

    /// Diagnostic text for the last failure on `matrix`
    fn error_string(&self, matrix: &Self::Matrix) -> String;

    fn unpack_hyper_csr(&self, matrix: &mut Self::Matrix) -> EngineResult<HyperParts>;
    fn unpack_hyper_csc(&self, matrix: &mut Self::Matrix) -> EngineResult<HyperParts>;
    fn unpack_csr(&self, matrix: &mut Self::Matrix) -> EngineResult<SparseParts>;
    fn unpack_csc(&self, matrix: &mut Self::Matrix) -> EngineResult<SparseParts>;
    fn unpack_bitmap_r(&self, matrix: &mut Self::Matrix) -> EngineResult<BitmapParts>;
    fn unpack_bitmap_c(&self, matrix: &mut Self::Matrix) -> EngineResult<BitmapParts>;
    fn unpack_full_r(&self, matrix: &mut Self::Matrix) -> EngineResult<FullParts>;
    fn unpack_full_c(&self, matrix: &mut Self::Matrix) -> EngineResult<FullParts>;

    fn pack_hyper_csr(&self, matrix: &mut Self::Matrix, parts: HyperParts) -> EngineResult<()>;
    fn pack_hyper_csc(&self, matrix: &mut Self::Matrix, parts: HyperParts) -> EngineResult<()>;
    fn pack_csr(&self, matrix: &mut Self::Matrix, parts: SparseParts) -> EngineResult<()>;
    fn pack_csc(&self, matrix: &mut Self::Matrix, parts: SparseParts) -> EngineResult<()>;
    fn pack_bitmap_r(&self, matrix: &mut Self::Matrix, parts: BitmapParts) -> EngineResult<()>;
    fn pack_bitmap_c(&self, matrix: &mut Self::Matrix, parts: BitmapParts) -> EngineResult<()>;
    fn pack_full_r(&self, matrix: &mut Self::Matrix, parts: FullParts) -> EngineResult<()>;
    fn pack_full_c(&self, matrix: &mut Self::Matrix, parts: FullParts) -> EngineResult<()>;

    /// View a vector as its n x 1 matrix
    fn vector_as_matrix<'a>(&self, vector: &'a mut Self::Vector) -> &'a mut Self::Matrix;

    /// Convert an n x 1 column-major matrix into a vector
    fn vector_from_matrix(&self, matrix: Self::Matrix) -> EngineResult<Self::Vector>;
}

/// View an index buffer as raw bytes
pub fn index_bytes(indices: &[u64]) -> &[u8] {
    bytemuck::cast_slice(indices)
}

/// View a bitmap as raw bytes
pub fn bitmap_bytes(bitmap: &[i8]) -> &[u8] {
    bytemuck::cast_slice(bitmap)
}
