//! Matrix file reader

use std::io::{ErrorKind, Read};

use bytemuck::Pod;
use grbfile_core::format::constants::{HEADER_LEN, INDEX_SIZE};
use grbfile_core::{
    buffer_plan, check_pointers, BinaryMetadata, BitmapParts, BufferPlan, FormatError, FullParts,
    HyperParts, Layout, OptionValue, Orientation, SparseEngine, SparseParts, Sparsity, Status,
};

use crate::bridge::Buffers;
use crate::error::{check, Error, Result};
use crate::handle::Handle;

/// Read a matrix from `source`
///
/// The ASCII header is skipped unread. The implementation id is checked
/// before any other field is interpreted; the buffers are read straight into
/// freshly allocated storage, packed into a new matrix, and the saved
/// sparsity control and switches are applied last.
pub fn read<E: SparseEngine, R: Read>(engine: &E, source: R) -> Result<E::Matrix> {
    read_checked(engine, source, |_| Ok(()))
}

/// Read a matrix, letting `accept` veto it once the metadata is known
pub(crate) fn read_checked<E, R, F>(engine: &E, mut source: R, accept: F) -> Result<E::Matrix>
where
    E: SparseEngine,
    R: Read,
    F: FnOnce(&BinaryMetadata) -> Result<()>,
{
    let capabilities = engine.capabilities();

    let mut header = [0u8; HEADER_LEN];
    read_region(&mut source, &mut header)?;

    let mut block = [0u8; BinaryMetadata::SIZE];
    read_region(&mut source, &mut block[..8])?;
    let found = BinaryMetadata::implementation_of(&block)?;
    if found != capabilities.implementation {
        return Err(FormatError::BadMagic {
            expected: capabilities.implementation,
            found,
        }
        .into());
    }
    read_region(&mut source, &mut block[8..])?;
    let metadata = BinaryMetadata::from_bytes(&block)?;

    let element_type = capabilities.type_table().decode(metadata.typecode)?;
    if metadata.typesize != element_type.size() {
        return Err(FormatError::TypeSizeMismatch {
            expected: element_type.size(),
            found: metadata.typesize,
        }
        .into());
    }
    let layout = metadata.layout()?;
    accept(&metadata)?;

    let plan = buffer_plan(
        layout,
        metadata.nrows,
        metadata.ncols,
        metadata.nvec,
        metadata.nvals,
        metadata.typesize,
        metadata.iso,
    )?;
    tracing::debug!(%layout, ty = %element_type, ?plan, "reading matrix");

    let buffers = read_buffers(&mut source, layout, &metadata, &plan)?;

    let mut matrix = Handle::new(engine, element_type, metadata.nrows, metadata.ncols)?;
    let packed = buffers.pack_into(engine, &mut *matrix, layout);
    check(engine, &*matrix, packed)?;

    for value in [
        OptionValue::SparsityControl(metadata.control()),
        OptionValue::HyperSwitch(metadata.hyper_switch),
        OptionValue::BitmapSwitch(metadata.bitmap_switch),
    ] {
        let applied = engine.set_option(&mut *matrix, value);
        check(engine, &*matrix, applied)?;
    }

    tracing::info!(
        %layout,
        nrows = metadata.nrows,
        ncols = metadata.ncols,
        nvals = metadata.nvals,
        "read matrix"
    );
    matrix
        .into_raw()
        .ok_or_else(|| Error::Unsupported("matrix handle was not owned".into()))
}

/// Reject anything but an n x 1 column-major matrix
pub(crate) fn accept_vector(metadata: &BinaryMetadata) -> Result<()> {
    if metadata.ncols != 1 {
        return Err(Error::Unsupported(format!(
            "a vector file must have one column, found {}",
            metadata.ncols
        )));
    }
    if Orientation::from_i32(metadata.format) != Some(Orientation::ByCol) {
        return Err(Error::Unsupported("a vector file must be stored by column".into()));
    }
    Ok(())
}

fn read_region<R: Read>(source: &mut R, buf: &mut [u8]) -> Result<()> {
    source.read_exact(buf).map_err(|err| match err.kind() {
        ErrorKind::UnexpectedEof => Error::Format(FormatError::Truncated),
        _ => Error::Io(err),
    })
}

/// Bytes committed per step while a buffer is read
const READ_STEP: usize = 1 << 20;

/// Read `len` elements into a new buffer
///
/// Sizes come from the metadata, so the buffer grows one step at a time and
/// only ever holds memory for bytes the stream has actually delivered.
fn read_elements<T: Pod, R: Read>(source: &mut R, len: usize) -> Result<Vec<T>> {
    let step = (READ_STEP / core::mem::size_of::<T>()).max(1);
    let mut buffer: Vec<T> = Vec::new();
    while buffer.len() < len {
        let start = buffer.len();
        let grow = step.min(len - start);
        buffer.try_reserve(grow).map_err(|_| Error::Engine {
            status: Status::OutOfMemory,
            message: format!("cannot allocate a buffer of {len} elements"),
        })?;
        buffer.resize(start + grow, T::zeroed());
        read_region(source, bytemuck::cast_slice_mut(&mut buffer[start..]))?;
    }
    buffer.shrink_to_fit();
    Ok(buffer)
}

fn read_indices<R: Read>(source: &mut R, bytes: usize) -> Result<Vec<u64>> {
    read_elements(source, bytes / INDEX_SIZE)
}

fn read_buffers<R: Read>(
    source: &mut R,
    layout: Layout,
    metadata: &BinaryMetadata,
    plan: &BufferPlan,
) -> Result<Buffers> {
    let ap = plan.ap.map(|bytes| read_indices(source, bytes)).transpose()?;
    let ah = plan.ah.map(|bytes| read_indices(source, bytes)).transpose()?;
    let ai = plan.ai.map(|bytes| read_indices(source, bytes)).transpose()?;
    let ab = plan.ab.map(|len| read_elements::<i8, _>(source, len)).transpose()?;
    let ax = read_elements::<u8, _>(source, plan.ax)?;

    let iso = metadata.iso;
    let buffers = match (layout.sparsity(), ap, ah, ai, ab) {
        (Sparsity::Hypersparse, Some(ap), Some(ah), Some(ai), None) => {
            check_pointers(&ap, metadata.nvec, metadata.nvals)?;
            Buffers::Hyper(HyperParts {
                ap,
                ah,
                ai,
                ax,
                iso,
                nvec: metadata.nvec,
                jumbled: false,
            })
        }
        (Sparsity::Sparse, Some(ap), None, Some(ai), None) => {
            check_pointers(&ap, metadata.nvec, metadata.nvals)?;
            Buffers::Sparse(SparseParts {
                ap,
                ai,
                ax,
                iso,
                jumbled: false,
            })
        }
        (Sparsity::Bitmap, None, None, None, Some(ab)) => Buffers::Bitmap(BitmapParts {
            ab,
            ax,
            iso,
            nvals: metadata.nvals,
        }),
        (Sparsity::Full, None, None, None, None) => Buffers::Full(FullParts { ax, iso }),
        _ => return Err(FormatError::UnknownSparsity(metadata.sparsity_status).into()),
    };
    Ok(buffers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{write, WriteOptions};
    use crate::MemoryEngine;
    use grbfile_core::ElementType;

    fn written_fp64(engine: &MemoryEngine) -> Vec<u8> {
        let mut matrix = engine.matrix_new(ElementType::Fp64, 3, 4).unwrap();
        engine
            .build(&mut matrix, &[(0, 0, 1.5f64), (2, 3, -2.0)])
            .unwrap();
        let mut bytes = Vec::new();
        write(engine, &mut matrix, &mut bytes, &WriteOptions::default()).unwrap();
        bytes
    }

    #[test]
    fn test_read_back() {
        let engine = MemoryEngine::new();
        let bytes = written_fp64(&engine);
        let matrix = read(&engine, bytes.as_slice()).unwrap();
        assert_eq!(engine.nvals(&matrix), Ok(2));
        assert_eq!(engine.get_element::<f64>(&matrix, 2, 3), Ok(Some(-2.0)));
    }

    #[test]
    fn test_bad_magic_stops_early() {
        let engine = MemoryEngine::new();
        let mut bytes = written_fp64(&engine);
        bytes[HEADER_LEN] ^= 0xff;
        bytes.truncate(HEADER_LEN + 8);
        let err = read(&engine, bytes.as_slice()).unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::BadMagic { .. })));
        assert_eq!(engine.live_matrices(), 0);
    }

    #[test]
    fn test_truncated_buffers() {
        let engine = MemoryEngine::new();
        let bytes = written_fp64(&engine);
        let err = read(&engine, &bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::Truncated)));

        let err = read(&engine, &bytes[..100]).unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::Truncated)));
    }

    #[test]
    fn test_huge_claim_in_short_file_is_truncated() {
        let engine = MemoryEngine::new();
        let mut matrix = engine.matrix_new(ElementType::Fp64, 3, 4).unwrap();
        engine
            .set_option(
                &mut matrix,
                OptionValue::SparsityControl(grbfile_core::SparsityControl::only(Sparsity::Sparse)),
            )
            .unwrap();
        engine.build(&mut matrix, &[(1, 2, 0.5f64)]).unwrap();
        let mut bytes = Vec::new();
        write(&engine, &mut matrix, &mut bytes, &WriteOptions::default()).unwrap();
        drop(matrix);

        let block = HEADER_LEN..HEADER_LEN + BinaryMetadata::SIZE;
        let mut metadata = BinaryMetadata::from_bytes(&bytes[block.clone()]).unwrap();
        metadata.nvals = 1 << 40;
        bytes[block].copy_from_slice(&metadata.to_bytes());

        // Eight terabytes of indices claimed, a few hundred bytes present
        let err = read(&engine, bytes.as_slice()).unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::Truncated)), "{err}");
        assert_eq!(engine.live_matrices(), 0);
    }

    #[test]
    fn test_read_elements_across_steps() {
        let data: Vec<u8> = (0..3 * READ_STEP + 5).map(|i| (i % 251) as u8).collect();
        let back = read_elements::<u8, _>(&mut data.as_slice(), data.len()).unwrap();
        assert_eq!(back, data);

        let indices: Vec<u64> = (0..(READ_STEP / INDEX_SIZE) as u64 + 3).collect();
        let raw = bytemuck::cast_slice::<u64, u8>(&indices).to_vec();
        assert_eq!(read_indices(&mut raw.as_slice(), raw.len()).unwrap(), indices);

        let err = read_elements::<u8, _>(&mut data.as_slice(), data.len() + 1).unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::Truncated)));
    }

    #[test]
    fn test_failed_pack_frees_matrix() {
        let engine = MemoryEngine::new();
        let mut matrix = engine.matrix_new(ElementType::UInt8, 2, 2).unwrap();
        engine
            .set_option(
                &mut matrix,
                OptionValue::SparsityControl(grbfile_core::SparsityControl::only(Sparsity::Sparse)),
            )
            .unwrap();
        engine.build(&mut matrix, &[(0, 1, 1u8), (1, 0, 2)]).unwrap();
        let mut bytes = Vec::new();
        write(&engine, &mut matrix, &mut bytes, &WriteOptions::default()).unwrap();
        drop(matrix);

        // Ai of the second row points past the last column
        let ai_start = HEADER_LEN + BinaryMetadata::SIZE + 3 * INDEX_SIZE;
        bytes[ai_start + INDEX_SIZE..ai_start + 2 * INDEX_SIZE]
            .copy_from_slice(&7u64.to_ne_bytes());

        let err = read(&engine, bytes.as_slice()).unwrap_err();
        assert_eq!(err.status(), Some(Status::IndexOutOfBounds));
        assert_eq!(engine.live_matrices(), 0);
    }

    #[test]
    fn test_accept_vector() {
        let mut metadata = BinaryMetadata {
            implementation: 0,
            format: Orientation::ByCol.to_i32(),
            sparsity_status: Sparsity::Sparse.to_i32(),
            sparsity_control: 15,
            hyper_switch: 0.0625,
            bitmap_switch: 0.04,
            nrows: 5,
            ncols: 1,
            nvec: 1,
            nvals: 0,
            typecode: 0,
            typesize: 1,
            iso: false,
        };
        assert!(accept_vector(&metadata).is_ok());
        metadata.format = Orientation::ByRow.to_i32();
        assert!(matches!(accept_vector(&metadata), Err(Error::Unsupported(_))));
        metadata.format = Orientation::ByCol.to_i32();
        metadata.ncols = 2;
        assert!(matches!(accept_vector(&metadata), Err(Error::Unsupported(_))));
    }
}
