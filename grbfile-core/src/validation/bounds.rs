//! Buffer region sizes and structural checks
//!
//! Every size derived from file metadata goes through checked arithmetic so
//! a corrupt header cannot request an absurd allocation by overflow.

use crate::format::constants::INDEX_SIZE;
use crate::format::{Layout, Sparsity};
use crate::FormatError;

/// Byte sizes of the buffer regions of one matrix, in file order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferPlan {
    /// `Ap`: nvec + 1 indices
    pub ap: Option<usize>,
    /// `Ah`: nvec indices (hypersparse only)
    pub ah: Option<usize>,
    /// `Ai`: nvals indices
    pub ai: Option<usize>,
    /// `Ab`: one byte per position (bitmap only)
    pub ab: Option<usize>,
    /// `Ax`: one element if iso, otherwise one per stored slot
    pub ax: usize,
}

impl BufferPlan {
    /// Total number of buffer bytes following the metadata block
    pub fn total(&self) -> usize {
        self.ap.unwrap_or(0) + self.ah.unwrap_or(0) + self.ai.unwrap_or(0) + self.ab.unwrap_or(0)
            + self.ax
    }
}

fn to_usize(value: u64) -> Result<usize, FormatError> {
    usize::try_from(value).map_err(|_| FormatError::SizeOverflow)
}

fn mul(a: usize, b: usize) -> Result<usize, FormatError> {
    a.checked_mul(b).ok_or(FormatError::SizeOverflow)
}

/// Compute region sizes for a layout
///
/// `nvec` is only consulted for compressed layouts; dense layouts are sized
/// by `nrows * ncols`.
pub fn buffer_plan(
    layout: Layout,
    nrows: u64,
    ncols: u64,
    nvec: u64,
    nvals: u64,
    typesize: usize,
    iso: bool,
) -> Result<BufferPlan, FormatError> {
    let class = layout.sparsity();

    let slots = if class.is_compressed() {
        to_usize(nvals)?
    } else {
        mul(to_usize(nrows)?, to_usize(ncols)?)?
    };
    let ax = if iso { typesize } else { mul(slots, typesize)? };

    let mut plan = BufferPlan {
        ax,
        ..BufferPlan::default()
    };

    match class {
        Sparsity::Hypersparse | Sparsity::Sparse => {
            let nvec = to_usize(nvec)?;
            let pointers = nvec.checked_add(1).ok_or(FormatError::SizeOverflow)?;
            plan.ap = Some(mul(pointers, INDEX_SIZE)?);
            plan.ai = Some(mul(slots, INDEX_SIZE)?);
            if class == Sparsity::Hypersparse {
                plan.ah = Some(mul(nvec, INDEX_SIZE)?);
            }
        }
        Sparsity::Bitmap => plan.ab = Some(slots),
        Sparsity::Full => {}
    }

    Ok(plan)
}

/// Number of indices held in a byte length
pub const fn index_count(byte_len: usize) -> Result<usize, FormatError> {
    if byte_len % INDEX_SIZE != 0 {
        return Err(FormatError::Truncated);
    }
    Ok(byte_len / INDEX_SIZE)
}

/// Validate a vector pointer array
///
/// `ap` must hold `nvec + 1` entries, start at zero, never decrease and end
/// at `nvals`.
pub fn check_pointers(ap: &[u64], nvec: u64, nvals: u64) -> Result<(), FormatError> {
    let expected = to_usize(nvec)?
        .checked_add(1)
        .ok_or(FormatError::SizeOverflow)?;
    if ap.len() != expected || ap[0] != 0 || ap[ap.len() - 1] != nvals {
        return Err(FormatError::InvalidPointers);
    }
    if ap.windows(2).any(|pair| pair[0] > pair[1]) {
        return Err(FormatError::InvalidPointers);
    }
    Ok(())
}
