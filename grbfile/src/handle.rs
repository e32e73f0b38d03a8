//! Owning matrix handle
//!
//! Engine matrices are released through the engine, not by Rust's drop glue
//! alone. `Handle` ties a matrix to its engine and frees it when dropped.

use std::ops::{Deref, DerefMut};

use grbfile_core::{ElementType, SparseEngine};

use crate::error::{Error, Result};

enum Slot<'a, M> {
    Owned(Option<M>),
    Borrowed(&'a mut M),
}

/// A matrix together with the engine that frees it
pub struct Handle<'a, E: SparseEngine> {
    engine: &'a E,
    slot: Slot<'a, E::Matrix>,
}

impl<'a, E: SparseEngine> Handle<'a, E> {
    /// Create an empty matrix owned by the handle
    pub fn new(engine: &'a E, ty: ElementType, nrows: u64, ncols: u64) -> Result<Self> {
        let matrix = engine
            .matrix_new(ty, nrows, ncols)
            .map_err(|status| Error::Engine {
                status,
                message: format!("cannot create a {nrows} x {ncols} {ty} matrix"),
            })?;
        Ok(Self::from_raw(engine, matrix))
    }

    /// Take ownership of an existing matrix
    pub fn from_raw(engine: &'a E, matrix: E::Matrix) -> Self {
        Self {
            engine,
            slot: Slot::Owned(Some(matrix)),
        }
    }

    /// Wrap a matrix the caller keeps owning; dropping the handle leaves it alone
    pub fn borrowed(engine: &'a E, matrix: &'a mut E::Matrix) -> Self {
        Self {
            engine,
            slot: Slot::Borrowed(matrix),
        }
    }

    pub fn engine(&self) -> &'a E {
        self.engine
    }

    pub fn is_owned(&self) -> bool {
        matches!(self.slot, Slot::Owned(_))
    }

    /// Give up ownership without freeing; `None` for a borrowed handle
    pub fn into_raw(mut self) -> Option<E::Matrix> {
        match &mut self.slot {
            Slot::Owned(matrix) => matrix.take(),
            Slot::Borrowed(_) => None,
        }
    }
}

impl<E: SparseEngine> Deref for Handle<'_, E> {
    type Target = E::Matrix;

    fn deref(&self) -> &E::Matrix {
        match &self.slot {
            Slot::Owned(Some(matrix)) => matrix,
            Slot::Borrowed(matrix) => &**matrix,
            Slot::Owned(None) => unreachable!("matrix released by into_raw"),
        }
    }
}

impl<E: SparseEngine> DerefMut for Handle<'_, E> {
    fn deref_mut(&mut self) -> &mut E::Matrix {
        match &mut self.slot {
            Slot::Owned(Some(matrix)) => matrix,
            Slot::Borrowed(matrix) => &mut **matrix,
            Slot::Owned(None) => unreachable!("matrix released by into_raw"),
        }
    }
}

impl<E: SparseEngine> Drop for Handle<'_, E> {
    fn drop(&mut self) {
        if let Slot::Owned(matrix) = &mut self.slot {
            if let Some(matrix) = matrix.take() {
                if let Err(status) = self.engine.matrix_free(matrix) {
                    tracing::warn!(%status, "failed to free matrix");
                }
            }
        }
    }
}
