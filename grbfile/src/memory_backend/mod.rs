//! In-process reference engine
//!
//! `MemoryEngine` implements [`SparseEngine`] in plain Rust. It keeps the same
//! storage model as a native engine: type-erased values, four sparsity
//! classes in either orientation, iso values, jumbled indices and pending
//! updates that only become visible in the stored buffers after `wait`.

mod elements;
mod storage;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use grbfile_core::format::constants::{
    implementation_id, BITMAP_SWITCH_DEFAULT, HYPER_SWITCH_DEFAULT,
};
use grbfile_core::{
    BitmapParts, Capabilities, ElementType, EngineResult, FullParts, HyperParts, Layout,
    MatrixOption, OptionValue, Orientation, SparseEngine, SparseParts, Sparsity, SparsityControl,
    Status,
};
use hashbrown::HashMap;

use storage::{build, choose_sparsity, Rejected, Shape, Storage};

/// Version triple reported by the reference engine
pub const MEMORY_ENGINE_VERSION: (u32, u32, u32) = (9, 3, 1);

/// Pure Rust sparse engine
#[derive(Debug, Clone)]
pub struct MemoryEngine {
    capabilities: Capabilities,
    keep_jumbled: bool,
    live: Arc<AtomicUsize>,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    /// Engine with every type this build knows about
    pub fn new() -> Self {
        let (major, minor, sub) = MEMORY_ENGINE_VERSION;
        Self {
            capabilities: Capabilities {
                implementation: implementation_id(major, minor, sub),
                version: MEMORY_ENGINE_VERSION,
                complex: cfg!(feature = "complex"),
            },
            keep_jumbled: false,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Engine built without complex element types
    pub fn without_complex() -> Self {
        let mut engine = Self::new();
        engine.capabilities.complex = false;
        engine
    }

    /// Report a different version, and with it a different implementation id
    pub fn with_version(mut self, major: u32, minor: u32, sub: u32) -> Self {
        self.capabilities.version = (major, minor, sub);
        self.capabilities.implementation = implementation_id(major, minor, sub);
        self
    }

    /// Leave unsorted indices in place on `wait`
    pub fn with_keep_jumbled(mut self, keep: bool) -> Self {
        self.keep_jumbled = keep;
        self
    }

    /// Number of matrices created by this engine that are still alive
    pub fn live_matrices(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Create an empty column vector of length `n`
    pub fn vector_new(&self, ty: ElementType, n: u64) -> EngineResult<MemoryVector> {
        let mut matrix = self.matrix_new(ty, n, 1)?;
        matrix.orientation = Orientation::ByCol;
        Ok(MemoryVector { matrix })
    }

    /// Bring pending updates into the stored buffers
    ///
    /// With `conform` set the sparsity class is re-chosen from the control
    /// and switches; otherwise the current class is kept.
    fn materialize(&self, matrix: &mut MemoryMatrix, conform: bool) -> Result<(), Rejected> {
        let rebuild = !matrix.pending.is_empty() || (conform && matrix.dirty);
        if !rebuild {
            if conform && !self.keep_jumbled {
                matrix.storage.unjumble(matrix.shape().size);
            }
            return Ok(());
        }

        let shape = matrix.shape();
        let mut tuples = matrix.storage.to_tuples(&shape);
        for ((row, col), value) in matrix.pending.drain() {
            let (major, minor) = match shape.orientation {
                Orientation::ByRow => (row, col),
                Orientation::ByCol => (col, row),
            };
            tuples.push(major, minor, &value);
        }
        let tuples = tuples.sorted(shape.size);

        let class = if conform {
            choose_sparsity(
                matrix.control,
                matrix.hyper_switch,
                matrix.bitmap_switch,
                &tuples,
                &shape,
            )
        } else if matrix.storage.sparsity() == Sparsity::Full
            && tuples.len() as u64 != shape.vdim().saturating_mul(shape.vlen())
        {
            Sparsity::Bitmap
        } else {
            matrix.storage.sparsity()
        };
        tracing::trace!(?class, nvals = tuples.len(), "materialized pending updates");

        matrix.storage = build(tuples, class, &shape)?;
        if conform {
            matrix.dirty = false;
        }
        Ok(())
    }

    /// Convert to the requested layout and take the buffers out
    fn take_storage(&self, matrix: &mut MemoryMatrix, layout: Layout) -> EngineResult<Storage> {
        self.materialize(matrix, false)
            .map_err(|rejected| matrix.fail(rejected))?;

        let converted = layout.orientation() != matrix.orientation
            || layout.sparsity() != matrix.storage.sparsity();
        if converted {
            let shape = matrix.shape();
            let mut tuples = matrix.storage.to_tuples(&shape).sorted(shape.size);
            let mut target = shape;
            if layout.orientation() != shape.orientation {
                tuples = tuples.transposed(shape.size);
                target = shape.transposed();
            }
            let storage = build(tuples, layout.sparsity(), &target)
                .map_err(|rejected| matrix.fail(rejected))?;
            matrix.orientation = layout.orientation();
            matrix.storage = storage;
        }

        Ok(std::mem::replace(&mut matrix.storage, Storage::empty()))
    }

    /// Validate caller buffers and install them as the matrix content
    fn put_storage(
        &self,
        matrix: &mut MemoryMatrix,
        layout: Layout,
        storage: Storage,
    ) -> EngineResult<()> {
        let shape = Shape {
            orientation: layout.orientation(),
            ..matrix.shape()
        };
        storage
            .validate(&shape)
            .map_err(|rejected| matrix.fail(rejected))?;
        matrix.orientation = layout.orientation();
        matrix.storage = storage;
        matrix.pending.clear();
        matrix.last_error.clear();
        Ok(())
    }
}

macro_rules! unpack_as {
    ($engine:expr, $matrix:expr, $layout:expr, $variant:ident) => {
        match $engine.take_storage($matrix, $layout)? {
            Storage::$variant(parts) => Ok(parts),
            other => {
                $matrix.storage = other;
                Err($matrix.fail(Rejected::new(Status::Panic, "layout conversion failed")))
            }
        }
    };
}

/// Matrix owned by a [`MemoryEngine`]
#[derive(Debug)]
pub struct MemoryMatrix {
    ty: ElementType,
    nrows: u64,
    ncols: u64,
    orientation: Orientation,
    storage: Storage,
    control: SparsityControl,
    hyper_switch: f64,
    bitmap_switch: f64,
    /// Updates not yet in `storage`, keyed by (row, col)
    pending: HashMap<(u64, u64), Vec<u8>>,
    /// Options changed since the class was last chosen
    dirty: bool,
    last_error: String,
    live: Arc<AtomicUsize>,
}

impl MemoryMatrix {
    fn shape(&self) -> Shape {
        Shape {
            orientation: self.orientation,
            nrows: self.nrows,
            ncols: self.ncols,
            size: self.ty.size(),
        }
    }

    fn fail(&mut self, rejected: Rejected) -> Status {
        tracing::debug!(
            status = %rejected.status,
            message = %rejected.message,
            "engine call failed"
        );
        self.last_error = rejected.message;
        rejected.status
    }

    /// Number of updates waiting for `wait`
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl Drop for MemoryMatrix {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Column vector owned by a [`MemoryEngine`], stored as an n x 1 matrix
#[derive(Debug)]
pub struct MemoryVector {
    matrix: MemoryMatrix,
}

impl MemoryVector {
    pub fn as_matrix(&self) -> &MemoryMatrix {
        &self.matrix
    }

    pub fn len(&self) -> u64 {
        self.matrix.nrows
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.nrows == 0
    }
}

impl SparseEngine for MemoryEngine {
    type Matrix = MemoryMatrix;
    type Vector = MemoryVector;

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn matrix_new(&self, ty: ElementType, nrows: u64, ncols: u64) -> EngineResult<MemoryMatrix> {
        if ty.is_complex() && !self.capabilities.complex {
            return Err(Status::NotImplemented);
        }
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryMatrix {
            ty,
            nrows,
            ncols,
            orientation: Orientation::ByRow,
            storage: Storage::empty(),
            control: SparsityControl::AUTO,
            hyper_switch: HYPER_SWITCH_DEFAULT,
            bitmap_switch: BITMAP_SWITCH_DEFAULT,
            pending: HashMap::new(),
            dirty: false,
            last_error: String::new(),
            live: Arc::clone(&self.live),
        })
    }

    fn wait(&self, matrix: &mut MemoryMatrix) -> EngineResult<()> {
        self.materialize(matrix, true)
            .map_err(|rejected| matrix.fail(rejected))
    }

    fn element_type(&self, matrix: &MemoryMatrix) -> EngineResult<ElementType> {
        Ok(matrix.ty)
    }

    fn nrows(&self, matrix: &MemoryMatrix) -> EngineResult<u64> {
        Ok(matrix.nrows)
    }

    fn ncols(&self, matrix: &MemoryMatrix) -> EngineResult<u64> {
        Ok(matrix.ncols)
    }

    fn nvals(&self, matrix: &MemoryMatrix) -> EngineResult<u64> {
        let shape = matrix.shape();
        let added = matrix
            .pending
            .keys()
            .filter(|&&(row, col)| {
                let (major, minor) = match shape.orientation {
                    Orientation::ByRow => (row, col),
                    Orientation::ByCol => (col, row),
                };
                matrix.storage.lookup(&shape, major, minor).is_none()
            })
            .count() as u64;
        Ok(matrix.storage.nvals(&shape) + added)
    }

    fn get_option(&self, matrix: &MemoryMatrix, option: MatrixOption) -> EngineResult<OptionValue> {
        Ok(match option {
            MatrixOption::Format => OptionValue::Format(matrix.orientation),
            MatrixOption::SparsityStatus => OptionValue::SparsityStatus(matrix.storage.sparsity()),
            MatrixOption::SparsityControl => OptionValue::SparsityControl(matrix.control),
            MatrixOption::HyperSwitch => OptionValue::HyperSwitch(matrix.hyper_switch),
            MatrixOption::BitmapSwitch => OptionValue::BitmapSwitch(matrix.bitmap_switch),
        })
    }

    fn set_option(&self, matrix: &mut MemoryMatrix, value: OptionValue) -> EngineResult<()> {
        match value {
            OptionValue::Format(orientation) => {
                if orientation == matrix.orientation {
                    return Ok(());
                }
                let shape = matrix.shape();
                let tuples = matrix.storage.to_tuples(&shape).transposed(shape.size);
                let target = shape.transposed();
                let class = choose_sparsity(
                    matrix.control,
                    matrix.hyper_switch,
                    matrix.bitmap_switch,
                    &tuples,
                    &target,
                );
                let storage =
                    build(tuples, class, &target).map_err(|rejected| matrix.fail(rejected))?;
                matrix.orientation = orientation;
                matrix.storage = storage;
            }
            OptionValue::SparsityStatus(_) => {
                return Err(matrix.fail(Rejected::new(
                    Status::InvalidValue,
                    "sparsity status is read-only",
                )));
            }
            OptionValue::SparsityControl(control) => {
                matrix.dirty |= control != matrix.control;
                matrix.control = control;
            }
            OptionValue::HyperSwitch(switch) => {
                matrix.dirty |= switch.to_bits() != matrix.hyper_switch.to_bits();
                matrix.hyper_switch = switch;
            }
            OptionValue::BitmapSwitch(switch) => {
                matrix.dirty |= switch.to_bits() != matrix.bitmap_switch.to_bits();
                matrix.bitmap_switch = switch;
            }
        }
        Ok(())
    }

    fn error_string(&self, matrix: &MemoryMatrix) -> String {
        matrix.last_error.clone()
    }

    fn unpack_hyper_csr(&self, matrix: &mut MemoryMatrix) -> EngineResult<HyperParts> {
        unpack_as!(self, matrix, Layout::HyperCsr, Hyper)
    }

    fn unpack_hyper_csc(&self, matrix: &mut MemoryMatrix) -> EngineResult<HyperParts> {
        unpack_as!(self, matrix, Layout::HyperCsc, Hyper)
    }

    fn unpack_csr(&self, matrix: &mut MemoryMatrix) -> EngineResult<SparseParts> {
        unpack_as!(self, matrix, Layout::Csr, Sparse)
    }

    fn unpack_csc(&self, matrix: &mut MemoryMatrix) -> EngineResult<SparseParts> {
        unpack_as!(self, matrix, Layout::Csc, Sparse)
    }

    fn unpack_bitmap_r(&self, matrix: &mut MemoryMatrix) -> EngineResult<BitmapParts> {
        unpack_as!(self, matrix, Layout::BitmapR, Bitmap)
    }

    fn unpack_bitmap_c(&self, matrix: &mut MemoryMatrix) -> EngineResult<BitmapParts> {
        unpack_as!(self, matrix, Layout::BitmapC, Bitmap)
    }

    fn unpack_full_r(&self, matrix: &mut MemoryMatrix) -> EngineResult<FullParts> {
        unpack_as!(self, matrix, Layout::FullR, Full)
    }

    fn unpack_full_c(&self, matrix: &mut MemoryMatrix) -> EngineResult<FullParts> {
        unpack_as!(self, matrix, Layout::FullC, Full)
    }

    fn pack_hyper_csr(&self, matrix: &mut MemoryMatrix, parts: HyperParts) -> EngineResult<()> {
        self.put_storage(matrix, Layout::HyperCsr, Storage::Hyper(parts))
    }

    fn pack_hyper_csc(&self, matrix: &mut MemoryMatrix, parts: HyperParts) -> EngineResult<()> {
        self.put_storage(matrix, Layout::HyperCsc, Storage::Hyper(parts))
    }

    fn pack_csr(&self, matrix: &mut MemoryMatrix, parts: SparseParts) -> EngineResult<()> {
        self.put_storage(matrix, Layout::Csr, Storage::Sparse(parts))
    }

    fn pack_csc(&self, matrix: &mut MemoryMatrix, parts: SparseParts) -> EngineResult<()> {
        self.put_storage(matrix, Layout::Csc, Storage::Sparse(parts))
    }

    fn pack_bitmap_r(&self, matrix: &mut MemoryMatrix, parts: BitmapParts) -> EngineResult<()> {
        self.put_storage(matrix, Layout::BitmapR, Storage::Bitmap(parts))
    }

    fn pack_bitmap_c(&self, matrix: &mut MemoryMatrix, parts: BitmapParts) -> EngineResult<()> {
        self.put_storage(matrix, Layout::BitmapC, Storage::Bitmap(parts))
    }

    fn pack_full_r(&self, matrix: &mut MemoryMatrix, parts: FullParts) -> EngineResult<()> {
        self.put_storage(matrix, Layout::FullR, Storage::Full(parts))
    }

    fn pack_full_c(&self, matrix: &mut MemoryMatrix, parts: FullParts) -> EngineResult<()> {
        self.put_storage(matrix, Layout::FullC, Storage::Full(parts))
    }

    fn vector_as_matrix<'a>(&self, vector: &'a mut MemoryVector) -> &'a mut MemoryMatrix {
        &mut vector.matrix
    }

    fn vector_from_matrix(&self, mut matrix: MemoryMatrix) -> EngineResult<MemoryVector> {
        if matrix.ncols != 1 {
            return Err(matrix.fail(Rejected::new(
                Status::DimensionMismatch,
                format!("a vector needs one column, matrix has {}", matrix.ncols),
            )));
        }
        if matrix.orientation != Orientation::ByCol {
            return Err(matrix.fail(Rejected::new(
                Status::InvalidValue,
                "a vector must be stored by column",
            )));
        }
        Ok(MemoryVector { matrix })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities() {
        let engine = MemoryEngine::new();
        let caps = engine.capabilities();
        assert_eq!(caps.implementation, 9_003_001);
        assert_eq!(caps.version, (9, 3, 1));
        assert!(!MemoryEngine::without_complex().capabilities().complex);
        assert_eq!(
            MemoryEngine::new().with_version(10, 0, 2).capabilities().implementation,
            10_000_002
        );
    }

    #[test]
    fn test_new_matrix_is_empty_hypersparse() {
        let engine = MemoryEngine::new();
        let matrix = engine.matrix_new(ElementType::Int32, 10, 20).unwrap();
        assert_eq!(engine.nvals(&matrix), Ok(0));
        assert_eq!(
            engine.get_option(&matrix, MatrixOption::SparsityStatus),
            Ok(OptionValue::SparsityStatus(Sparsity::Hypersparse))
        );
        assert_eq!(
            engine.get_option(&matrix, MatrixOption::Format),
            Ok(OptionValue::Format(Orientation::ByRow))
        );
    }

    #[test]
    fn test_live_count_follows_drops() {
        let engine = MemoryEngine::new();
        let a = engine.matrix_new(ElementType::Bool, 1, 1).unwrap();
        let b = engine.matrix_new(ElementType::Bool, 1, 1).unwrap();
        assert_eq!(engine.live_matrices(), 2);
        engine.matrix_free(a).unwrap();
        assert_eq!(engine.live_matrices(), 1);
        drop(b);
        assert_eq!(engine.live_matrices(), 0);
    }

    #[test]
    fn test_complex_needs_support() {
        let engine = MemoryEngine::without_complex();
        assert_eq!(
            engine.matrix_new(ElementType::Fc64, 2, 2).err(),
            Some(Status::NotImplemented)
        );
    }

    #[test]
    fn test_unpack_leaves_shell_and_pack_restores() {
        let engine = MemoryEngine::new();
        let mut matrix = engine.matrix_new(ElementType::Fp64, 2, 2).unwrap();
        engine.build(&mut matrix, &[(0, 0, 1.0f64), (1, 1, 2.0)]).unwrap();
        engine
            .set_option(
                &mut matrix,
                OptionValue::SparsityControl(SparsityControl::only(Sparsity::Sparse)),
            )
            .unwrap();
        engine.wait(&mut matrix).unwrap();

        let parts = engine.unpack_csr(&mut matrix).unwrap();
        assert_eq!(parts.ap, [0, 1, 2]);
        assert_eq!(parts.ai, [0, 1]);
        assert_eq!(engine.nvals(&matrix), Ok(0));

        engine.pack_csr(&mut matrix, parts).unwrap();
        assert_eq!(engine.nvals(&matrix), Ok(2));
        assert_eq!(engine.get_element::<f64>(&matrix, 1, 1), Ok(Some(2.0)));
    }

    #[test]
    fn test_unpack_converts_layout() {
        let engine = MemoryEngine::new();
        let mut matrix = engine.matrix_new(ElementType::Int64, 2, 3).unwrap();
        engine.build(&mut matrix, &[(0, 2, 5i64), (1, 0, 6)]).unwrap();

        let parts = engine.unpack_csc(&mut matrix).unwrap();
        assert_eq!(parts.ap, [0, 1, 1, 2]);
        assert_eq!(parts.ai, [1, 0]);
        assert_eq!(
            engine.get_option(&matrix, MatrixOption::Format),
            Ok(OptionValue::Format(Orientation::ByCol))
        );
    }

    #[test]
    fn test_pack_rejects_bad_pointers() {
        let engine = MemoryEngine::new();
        let mut matrix = engine.matrix_new(ElementType::UInt8, 2, 2).unwrap();
        let parts = SparseParts {
            ap: vec![0, 2, 1],
            ai: vec![0],
            ax: vec![1],
            ..SparseParts::default()
        };
        assert_eq!(engine.pack_csr(&mut matrix, parts), Err(Status::InvalidObject));
        assert!(!engine.error_string(&matrix).is_empty());
    }

    #[test]
    fn test_format_change_transposes() {
        let engine = MemoryEngine::new();
        let mut matrix = engine.matrix_new(ElementType::Int16, 3, 2).unwrap();
        engine.build(&mut matrix, &[(2, 1, 7i16)]).unwrap();
        engine
            .set_option(&mut matrix, OptionValue::Format(Orientation::ByCol))
            .unwrap();
        assert_eq!(engine.get_element::<i16>(&matrix, 2, 1), Ok(Some(7)));
        assert_eq!(engine.get_element::<i16>(&matrix, 1, 2), Err(Status::InvalidIndex));
    }

    #[test]
    fn test_sparsity_status_is_read_only() {
        let engine = MemoryEngine::new();
        let mut matrix = engine.matrix_new(ElementType::Bool, 1, 1).unwrap();
        assert_eq!(
            engine.set_option(&mut matrix, OptionValue::SparsityStatus(Sparsity::Full)),
            Err(Status::InvalidValue)
        );
    }

    #[test]
    fn test_wait_sorts_jumbled_unless_kept() {
        let jumbled = SparseParts {
            ap: vec![0, 2],
            ai: vec![1, 0],
            ax: vec![2, 1],
            iso: false,
            jumbled: true,
        };

        let engine = MemoryEngine::new();
        let mut matrix = engine.matrix_new(ElementType::UInt8, 1, 2).unwrap();
        engine.pack_csr(&mut matrix, jumbled.clone()).unwrap();
        engine.wait(&mut matrix).unwrap();
        let parts = engine.unpack_csr(&mut matrix).unwrap();
        assert_eq!(parts.ai, [0, 1]);
        assert_eq!(parts.ax, [1, 2]);
        assert!(!parts.jumbled);

        let engine = MemoryEngine::new().with_keep_jumbled(true);
        let mut matrix = engine.matrix_new(ElementType::UInt8, 1, 2).unwrap();
        engine.pack_csr(&mut matrix, jumbled.clone()).unwrap();
        engine.wait(&mut matrix).unwrap();
        assert_eq!(engine.unpack_csr(&mut matrix).unwrap(), jumbled);
    }

    #[test]
    fn test_vector_from_matrix_checks_shape() {
        let engine = MemoryEngine::new();
        let wide = engine.matrix_new(ElementType::Fp32, 3, 2).unwrap();
        assert!(matches!(engine.vector_from_matrix(wide), Err(Status::DimensionMismatch)));

        let mut column = engine.matrix_new(ElementType::Fp32, 3, 1).unwrap();
        assert!(matches!(
            engine.vector_from_matrix(engine.matrix_new(ElementType::Fp32, 3, 1).unwrap()),
            Err(Status::InvalidValue)
        ));
        engine
            .set_option(&mut column, OptionValue::Format(Orientation::ByCol))
            .unwrap();
        let vector = engine.vector_from_matrix(column).unwrap();
        assert_eq!(vector.len(), 3);
    }
}
