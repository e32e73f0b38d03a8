//! Typed element access and whole-matrix operations on the reference engine

use grbfile_core::{Element, EngineResult, FullParts, Orientation, SparseEngine, Status};

use super::storage::{Rejected, Storage, Tuples};
use super::{MemoryEngine, MemoryMatrix};

impl MemoryEngine {
    fn check_type<T: Element>(matrix: &mut MemoryMatrix) -> EngineResult<()> {
        if T::TYPE != matrix.ty {
            let message = format!("value of type {} given to a {} matrix", T::TYPE, matrix.ty);
            return Err(matrix.fail(Rejected::new(Status::DomainMismatch, message)));
        }
        Ok(())
    }

    fn check_index(matrix: &MemoryMatrix, row: u64, col: u64) -> EngineResult<()> {
        if row >= matrix.nrows || col >= matrix.ncols {
            return Err(Status::InvalidIndex);
        }
        Ok(())
    }

    /// Queue `A(row, col) = value`; visible in the buffers after `wait`
    pub fn set_element<T: Element>(
        &self,
        matrix: &mut MemoryMatrix,
        row: u64,
        col: u64,
        value: T,
    ) -> EngineResult<()> {
        Self::check_type::<T>(matrix)?;
        if let Err(status) = Self::check_index(matrix, row, col) {
            let message = format!(
                "index ({row}, {col}) outside a {} x {} matrix",
                matrix.nrows, matrix.ncols
            );
            return Err(matrix.fail(Rejected::new(status, message)));
        }
        let mut bytes = vec![0u8; T::TYPE.size()];
        value.write_ne(&mut bytes);
        matrix.pending.insert((row, col), bytes);
        Ok(())
    }

    /// Read `A(row, col)`, including pending updates
    pub fn get_element<T: Element>(
        &self,
        matrix: &MemoryMatrix,
        row: u64,
        col: u64,
    ) -> EngineResult<Option<T>> {
        if T::TYPE != matrix.ty {
            return Err(Status::DomainMismatch);
        }
        Self::check_index(matrix, row, col)?;
        if let Some(bytes) = matrix.pending.get(&(row, col)) {
            return Ok(Some(T::read_ne(bytes)));
        }
        let shape = matrix.shape();
        let (major, minor) = match shape.orientation {
            Orientation::ByRow => (row, col),
            Orientation::ByCol => (col, row),
        };
        Ok(matrix.storage.lookup(&shape, major, minor).map(T::read_ne))
    }

    /// Set every entry of `matrix` and finish
    pub fn build<T: Element>(
        &self,
        matrix: &mut MemoryMatrix,
        entries: &[(u64, u64, T)],
    ) -> EngineResult<()> {
        for &(row, col, value) in entries {
            self.set_element(matrix, row, col, value)?;
        }
        self.wait(matrix)
    }

    /// All entries as `(row, col, value)` in row-major order
    pub fn extract_tuples<T: Element>(
        &self,
        matrix: &mut MemoryMatrix,
    ) -> EngineResult<Vec<(u64, u64, T)>> {
        Self::check_type::<T>(matrix)?;
        self.wait(matrix)?;
        let tuples = row_major(matrix);
        let size = matrix.ty.size();
        Ok((0..tuples.len())
            .map(|k| (tuples.major[k], tuples.minor[k], T::read_ne(tuples.value(k, size))))
            .collect())
    }

    /// `A(:, :) = value`: every position present with one shared value
    pub fn assign_scalar<T: Element>(
        &self,
        matrix: &mut MemoryMatrix,
        value: T,
    ) -> EngineResult<()> {
        Self::check_type::<T>(matrix)?;
        let mut ax = vec![0u8; T::TYPE.size()];
        value.write_ne(&mut ax);
        matrix.pending.clear();
        matrix.storage = Storage::Full(FullParts { ax, iso: true });
        matrix.dirty = !matrix.control.allows(grbfile_core::Sparsity::Full);
        self.wait(matrix)
    }

    /// Whether two matrices hold the same entries
    ///
    /// Layout, orientation and tuning options are ignored; types, dimensions
    /// and every stored value must agree.
    pub fn is_equal(&self, a: &mut MemoryMatrix, b: &mut MemoryMatrix) -> EngineResult<bool> {
        if a.ty != b.ty || a.nrows != b.nrows || a.ncols != b.ncols {
            return Ok(false);
        }
        self.wait(a)?;
        self.wait(b)?;
        if self.nvals(a)? != self.nvals(b)? {
            return Ok(false);
        }

        let (left, right) = (row_major(a), row_major(b));
        let size = a.ty.size();
        let same = left.major == right.major
            && left.minor == right.minor
            && (0..left.len())
                .all(|k| a.ty.values_equal(left.value(k, size), right.value(k, size)));
        Ok(same)
    }
}

/// Sorted tuples with rows as the major index
fn row_major(matrix: &MemoryMatrix) -> Tuples {
    let shape = matrix.shape();
    let tuples = matrix.storage.to_tuples(&shape).sorted(shape.size);
    match shape.orientation {
        Orientation::ByRow => tuples,
        Orientation::ByCol => tuples.transposed(shape.size),
    }
}
