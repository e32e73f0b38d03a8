//! Layout inspection
//!
//! Collects everything the codec needs to know about a matrix before its
//! buffers are touched. Nothing here mutates the matrix.

use grbfile_core::{
    ElementType, Layout, MatrixOption, OptionValue, Orientation, SparseEngine, Sparsity,
    SparsityControl, Status,
};

use crate::error::{check, Result};

/// Storage layout and tuning parameters of one matrix
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatrixLayout {
    pub orientation: Orientation,
    /// Class the buffers are currently stored in
    pub sparsity_status: Sparsity,
    /// Classes the engine may convert to
    pub sparsity_control: SparsityControl,
    pub hyper_switch: f64,
    pub bitmap_switch: f64,
    pub element_type: ElementType,
    /// Element size in bytes
    pub type_size: usize,
    pub nrows: u64,
    pub ncols: u64,
    pub nvals: u64,
}

impl MatrixLayout {
    /// Combined orientation and sparsity class
    pub fn layout(&self) -> Layout {
        Layout::new(self.orientation, self.sparsity_status)
    }

    /// Number of vectors for non-hypersparse storage
    pub fn vdim(&self) -> u64 {
        self.orientation.vdim(self.nrows, self.ncols)
    }
}

/// Report the layout of `matrix`
///
/// Pending work is not finished first; call `wait` beforehand when the
/// reported sparsity status must match the stored buffers.
pub fn inspect<E: SparseEngine>(engine: &E, matrix: &E::Matrix) -> Result<MatrixLayout> {
    let option = |key| check(engine, matrix, engine.get_option(matrix, key));

    let orientation = match option(MatrixOption::Format)? {
        OptionValue::Format(orientation) => orientation,
        other => return Err(mismatched(other)),
    };
    let sparsity_status = match option(MatrixOption::SparsityStatus)? {
        OptionValue::SparsityStatus(class) => class,
        other => return Err(mismatched(other)),
    };
    let sparsity_control = match option(MatrixOption::SparsityControl)? {
        OptionValue::SparsityControl(control) => control,
        other => return Err(mismatched(other)),
    };
    let hyper_switch = match option(MatrixOption::HyperSwitch)? {
        OptionValue::HyperSwitch(value) => value,
        other => return Err(mismatched(other)),
    };
    let bitmap_switch = match option(MatrixOption::BitmapSwitch)? {
        OptionValue::BitmapSwitch(value) => value,
        other => return Err(mismatched(other)),
    };

    let element_type = check(engine, matrix, engine.element_type(matrix))?;
    let type_size = check(engine, matrix, engine.type_size(element_type))?;

    Ok(MatrixLayout {
        orientation,
        sparsity_status,
        sparsity_control,
        hyper_switch,
        bitmap_switch,
        element_type,
        type_size,
        nrows: check(engine, matrix, engine.nrows(matrix))?,
        ncols: check(engine, matrix, engine.ncols(matrix))?,
        nvals: check(engine, matrix, engine.nvals(matrix))?,
    })
}

fn mismatched(value: OptionValue) -> crate::Error {
    crate::Error::Engine {
        status: Status::InvalidValue,
        message: format!("engine answered with {:?} for a different option", value.option()),
    }
}
