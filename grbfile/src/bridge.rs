//! Unpack/repack bridge
//!
//! Moves the storage of a matrix out through the engine's unpack primitive
//! for its current layout, and back in through the matching pack primitive.
//! The [`Unpacked`] guard holds the matrix mutably for as long as its
//! buffers are out, so nothing else can observe the empty shell.

use grbfile_core::traits::engine::{bitmap_bytes, index_bytes};
use grbfile_core::{
    BitmapParts, BufferPlan, EngineResult, FormatError, FullParts, HyperParts, Layout,
    SparseEngine, SparseParts, Status,
};

use crate::error::{Error, Result};
use crate::inspect::inspect;

/// Raw storage of one matrix in one of the four sparsity classes
#[derive(Debug, Clone, PartialEq)]
pub enum Buffers {
    Hyper(HyperParts),
    Sparse(SparseParts),
    Bitmap(BitmapParts),
    Full(FullParts),
}

impl Buffers {
    /// Unpack `matrix` through the primitive for `layout`
    pub fn unpack_from<E: SparseEngine>(
        engine: &E,
        matrix: &mut E::Matrix,
        layout: Layout,
    ) -> EngineResult<Self> {
        Ok(match layout {
            Layout::HyperCsr => Buffers::Hyper(engine.unpack_hyper_csr(matrix)?),
            Layout::HyperCsc => Buffers::Hyper(engine.unpack_hyper_csc(matrix)?),
            Layout::Csr => Buffers::Sparse(engine.unpack_csr(matrix)?),
            Layout::Csc => Buffers::Sparse(engine.unpack_csc(matrix)?),
            Layout::BitmapR => Buffers::Bitmap(engine.unpack_bitmap_r(matrix)?),
            Layout::BitmapC => Buffers::Bitmap(engine.unpack_bitmap_c(matrix)?),
            Layout::FullR => Buffers::Full(engine.unpack_full_r(matrix)?),
            Layout::FullC => Buffers::Full(engine.unpack_full_c(matrix)?),
        })
    }

    /// Pack into `matrix` through the primitive for `layout`
    pub fn pack_into<E: SparseEngine>(
        self,
        engine: &E,
        matrix: &mut E::Matrix,
        layout: Layout,
    ) -> EngineResult<()> {
        match (layout, self) {
            (Layout::HyperCsr, Buffers::Hyper(parts)) => engine.pack_hyper_csr(matrix, parts),
            (Layout::HyperCsc, Buffers::Hyper(parts)) => engine.pack_hyper_csc(matrix, parts),
            (Layout::Csr, Buffers::Sparse(parts)) => engine.pack_csr(matrix, parts),
            (Layout::Csc, Buffers::Sparse(parts)) => engine.pack_csc(matrix, parts),
            (Layout::BitmapR, Buffers::Bitmap(parts)) => engine.pack_bitmap_r(matrix, parts),
            (Layout::BitmapC, Buffers::Bitmap(parts)) => engine.pack_bitmap_c(matrix, parts),
            (Layout::FullR, Buffers::Full(parts)) => engine.pack_full_r(matrix, parts),
            (Layout::FullC, Buffers::Full(parts)) => engine.pack_full_c(matrix, parts),
            _ => Err(Status::InvalidValue),
        }
    }

    pub fn iso(&self) -> bool {
        match self {
            Buffers::Hyper(parts) => parts.iso,
            Buffers::Sparse(parts) => parts.iso,
            Buffers::Bitmap(parts) => parts.iso,
            Buffers::Full(parts) => parts.iso,
        }
    }

    pub fn jumbled(&self) -> bool {
        match self {
            Buffers::Hyper(parts) => parts.jumbled,
            Buffers::Sparse(parts) => parts.jumbled,
            Buffers::Bitmap(_) | Buffers::Full(_) => false,
        }
    }

    /// Number of stored vectors; `vdim` for every non-hypersparse class
    pub fn nvec(&self, vdim: u64) -> u64 {
        match self {
            Buffers::Hyper(parts) => parts.nvec,
            _ => vdim,
        }
    }

    /// Byte regions in file order, each cut to the size `plan` asks for
    pub fn regions(&self, plan: &BufferPlan) -> core::result::Result<Vec<&[u8]>, FormatError> {
        type Region<'b> = Option<&'b [u8]>;
        let (ap, ah, ai, ab, ax): (Region<'_>, Region<'_>, Region<'_>, Region<'_>, &[u8]) =
            match self {
                Buffers::Hyper(parts) => (
                    Some(index_bytes(&parts.ap)),
                    Some(index_bytes(&parts.ah)),
                    Some(index_bytes(&parts.ai)),
                    None,
                    parts.ax.as_slice(),
                ),
                Buffers::Sparse(parts) => (
                    Some(index_bytes(&parts.ap)),
                    None,
                    Some(index_bytes(&parts.ai)),
                    None,
                    parts.ax.as_slice(),
                ),
                Buffers::Bitmap(parts) => (
                    None,
                    None,
                    None,
                    Some(bitmap_bytes(&parts.ab)),
                    parts.ax.as_slice(),
                ),
                Buffers::Full(parts) => (None, None, None, None, parts.ax.as_slice()),
            };

        let mut regions = Vec::with_capacity(4);
        for (bytes, wanted) in [(ap, plan.ap), (ah, plan.ah), (ai, plan.ai), (ab, plan.ab)] {
            match (bytes, wanted) {
                (Some(bytes), Some(len)) => {
                    regions.push(bytes.get(..len).ok_or(FormatError::Truncated)?)
                }
                (None, None) => {}
                _ => return Err(FormatError::InvalidPointers),
            }
        }
        regions.push(ax.get(..plan.ax).ok_or(FormatError::Truncated)?);
        Ok(regions)
    }
}

/// Buffers taken out of a matrix, to be handed back with [`Unpacked::restore`]
///
/// Dropping the guard without restoring is a bug: in debug builds it panics,
/// and in every build the buffers are packed back on a best-effort basis.
#[must_use = "unpacked buffers must be handed back with `restore`"]
pub struct Unpacked<'a, E: SparseEngine> {
    engine: &'a E,
    matrix: &'a mut E::Matrix,
    layout: Layout,
    buffers: Option<Buffers>,
}

impl<'a, E: SparseEngine> Unpacked<'a, E> {
    /// Unpack `matrix` in whatever layout it currently has
    pub fn take(engine: &'a E, matrix: &'a mut E::Matrix) -> Result<Self> {
        let layout = inspect(engine, matrix)?.layout();
        Self::take_as(engine, matrix, layout)
    }

    /// Unpack `matrix` through the primitive for `layout`
    pub fn take_as(engine: &'a E, matrix: &'a mut E::Matrix, layout: Layout) -> Result<Self> {
        let buffers = Buffers::unpack_from(engine, matrix, layout)
            .map_err(|status| Error::engine(engine, matrix, status))?;
        tracing::trace!(%layout, iso = buffers.iso(), jumbled = buffers.jumbled(), "unpacked");
        Ok(Self {
            engine,
            matrix,
            layout,
            buffers: Some(buffers),
        })
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn buffers(&self) -> &Buffers {
        // Only `restore` and `drop` empty the slot, and both consume the guard
        match &self.buffers {
            Some(buffers) => buffers,
            None => unreachable!("buffers are present until the guard is consumed"),
        }
    }

    /// Pack the buffers back with the same layout, sizes and flags
    pub fn restore(mut self) -> Result<()> {
        match self.buffers.take() {
            Some(buffers) => repack(self.engine, &mut *self.matrix, self.layout, buffers)
                .inspect_err(|err| tracing::error!(layout = %self.layout, %err, "repack failed")),
            None => Ok(()),
        }
    }
}

fn repack<E: SparseEngine>(
    engine: &E,
    matrix: &mut E::Matrix,
    layout: Layout,
    buffers: Buffers,
) -> Result<()> {
    buffers
        .pack_into(engine, matrix, layout)
        .map_err(|status| Error::RepackFailed {
            status,
            message: engine.error_string(matrix),
        })
}

impl<E: SparseEngine> Drop for Unpacked<'_, E> {
    fn drop(&mut self) {
        let Some(buffers) = self.buffers.take() else {
            return;
        };
        tracing::error!(layout = %self.layout, "unpacked buffers dropped without restore");
        if let Err(err) = repack(self.engine, &mut *self.matrix, self.layout, buffers) {
            tracing::error!(%err, "best-effort repack failed");
        }
        debug_assert!(
            std::thread::panicking(),
            "Unpacked guard dropped without calling restore"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryEngine;
    use grbfile_core::{ElementType, OptionValue, Sparsity, SparsityControl};

    fn sparse_matrix(engine: &MemoryEngine) -> crate::MemoryMatrix {
        let mut matrix = engine.matrix_new(ElementType::Int32, 3, 3).unwrap();
        engine
            .set_option(
                &mut matrix,
                OptionValue::SparsityControl(SparsityControl::only(Sparsity::Sparse)),
            )
            .unwrap();
        engine
            .build(&mut matrix, &[(0, 0, 1i32), (1, 2, 2), (2, 1, 3)])
            .unwrap();
        matrix
    }

    #[test]
    fn test_take_and_restore() {
        let engine = MemoryEngine::new();
        let mut matrix = sparse_matrix(&engine);

        let unpacked = Unpacked::take(&engine, &mut matrix).unwrap();
        assert_eq!(unpacked.layout(), Layout::Csr);
        let Buffers::Sparse(parts) = unpacked.buffers() else {
            panic!("expected sparse buffers");
        };
        assert_eq!(parts.ap, [0, 1, 2, 3]);
        unpacked.restore().unwrap();

        assert_eq!(engine.nvals(&matrix), Ok(3));
        assert_eq!(engine.get_element::<i32>(&matrix, 2, 1), Ok(Some(3)));
    }

    #[test]
    fn test_restore_keeps_jumbled_flag() {
        let engine = MemoryEngine::new();
        let mut matrix = engine.matrix_new(ElementType::UInt8, 1, 3).unwrap();
        let jumbled = SparseParts {
            ap: vec![0, 3],
            ai: vec![2, 0, 1],
            ax: vec![3, 1, 2],
            iso: false,
            jumbled: true,
        };
        engine.pack_csr(&mut matrix, jumbled.clone()).unwrap();

        let unpacked = Unpacked::take(&engine, &mut matrix).unwrap();
        assert!(unpacked.buffers().jumbled());
        unpacked.restore().unwrap();

        assert_eq!(engine.unpack_csr(&mut matrix).unwrap(), jumbled);
    }

    #[test]
    fn test_regions_follow_plan() {
        let engine = MemoryEngine::new();
        let mut matrix = sparse_matrix(&engine);
        let unpacked = Unpacked::take(&engine, &mut matrix).unwrap();

        let plan = grbfile_core::buffer_plan(Layout::Csr, 3, 3, 3, 3, 4, false).unwrap();
        let regions = unpacked.buffers().regions(&plan).unwrap();
        let sizes: Vec<usize> = regions.iter().map(|r| r.len()).collect();
        assert_eq!(sizes, [32, 24, 12]);
        unpacked.restore().unwrap();
    }

    #[test]
    fn test_mismatched_buffers_are_rejected() {
        let engine = MemoryEngine::new();
        let mut matrix = engine.matrix_new(ElementType::Bool, 1, 1).unwrap();
        let full = Buffers::Full(FullParts {
            ax: vec![1],
            iso: false,
        });
        assert_eq!(
            full.pack_into(&engine, &mut matrix, Layout::Csr),
            Err(Status::InvalidValue)
        );
    }

    #[test]
    #[should_panic(expected = "without calling restore")]
    fn test_drop_without_restore_repacks_then_asserts() {
        let engine = MemoryEngine::new();
        let mut matrix = sparse_matrix(&engine);
        let unpacked = Unpacked::take(&engine, &mut matrix).unwrap();
        drop(unpacked);
    }
}
