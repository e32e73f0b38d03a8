//! Matrix file writer

use std::io::Write;

use grbfile_core::{buffer_plan, AsciiHeader, BinaryMetadata, FormatError, SparseEngine};

use super::options::WriteOptions;
use crate::bridge::{Buffers, Unpacked};
use crate::error::{check, Error, Result};
use crate::inspect::{inspect, MatrixLayout};

/// Write `matrix` to `sink`
///
/// The matrix is finished, unpacked in its current layout, written as ASCII
/// header, metadata block and raw buffers, and then packed back. The repack
/// happens even when writing fails; a failed repack is reported as
/// [`Error::RepackFailed`] and takes precedence over the write error.
///
/// The file has no field for unsorted vectors, so a matrix that is still
/// jumbled after [`SparseEngine::wait`] is rejected with
/// [`FormatError::Jumbled`]. Engines whose `wait` does not sort their
/// indices cannot write such matrices until they are sorted.
///
/// Returns the number of bytes written. `options.compression` is ignored
/// here; wrap `sink` in an encoder or use [`super::write_path`].
pub fn write<E, W>(
    engine: &E,
    matrix: &mut E::Matrix,
    mut sink: W,
    options: &WriteOptions,
) -> Result<u64>
where
    E: SparseEngine,
    W: Write,
{
    let waited = engine.wait(matrix);
    check(engine, matrix, waited)?;
    let info = inspect(engine, matrix)?;
    let layout = info.layout();
    tracing::debug!(
        %layout,
        nrows = info.nrows,
        ncols = info.ncols,
        nvals = info.nvals,
        "writing matrix"
    );

    let unpacked = Unpacked::take_as(engine, matrix, layout)?;
    let outcome = if unpacked.buffers().jumbled() {
        Err(Error::Format(FormatError::Jumbled))
    } else {
        write_unpacked(engine, &info, unpacked.buffers(), &mut sink, options)
    };
    unpacked.restore()?;

    let written = outcome?;
    tracing::info!(%layout, bytes = written, nvals = info.nvals, "wrote matrix");
    Ok(written)
}

fn write_unpacked<E: SparseEngine, W: Write>(
    engine: &E,
    info: &MatrixLayout,
    buffers: &Buffers,
    sink: &mut W,
    options: &WriteOptions,
) -> Result<u64> {
    let capabilities = engine.capabilities();
    let layout = info.layout();
    let iso = buffers.iso();
    let nvec = buffers.nvec(info.vdim());

    let header = AsciiHeader {
        version: capabilities.version,
        user_agent: &options.user_agent,
        nrows: info.nrows,
        ncols: info.ncols,
        nvec,
        nvals: info.nvals,
        layout,
        size: info.type_size,
        element_type: info.element_type,
        iso,
        comments: options.comment.as_deref(),
    };
    let metadata = BinaryMetadata {
        implementation: capabilities.implementation,
        format: info.orientation.to_i32(),
        sparsity_status: info.sparsity_status.to_i32(),
        sparsity_control: info.sparsity_control.bits(),
        hyper_switch: info.hyper_switch,
        bitmap_switch: info.bitmap_switch,
        nrows: info.nrows,
        ncols: info.ncols,
        nvec,
        nvals: info.nvals,
        typecode: info.element_type.code(),
        typesize: info.type_size,
        iso,
    };

    let plan = buffer_plan(layout, info.nrows, info.ncols, nvec, info.nvals, info.type_size, iso)?;
    let regions = buffers.regions(&plan)?;
    tracing::debug!(?plan, "buffer regions");

    let header_bytes = header.to_bytes();
    let metadata_bytes = metadata.to_bytes();
    sink.write_all(&header_bytes)?;
    sink.write_all(&metadata_bytes)?;
    for region in regions {
        sink.write_all(region)?;
    }
    sink.flush()?;

    Ok((header_bytes.len() + metadata_bytes.len() + plan.total()) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryEngine;
    use grbfile_core::format::constants::HEADER_LEN;
    use grbfile_core::{ElementType, OptionValue, SparseParts, Sparsity, SparsityControl};

    #[test]
    fn test_write_bool_csr() {
        let engine = MemoryEngine::new();
        let mut matrix = engine.matrix_new(ElementType::Bool, 2, 2).unwrap();
        engine
            .set_option(
                &mut matrix,
                OptionValue::SparsityControl(SparsityControl::only(Sparsity::Sparse)),
            )
            .unwrap();
        engine.build(&mut matrix, &[(0, 0, true), (1, 1, true)]).unwrap();

        let mut bytes = Vec::new();
        let written = write(&engine, &mut matrix, &mut bytes, &WriteOptions::default()).unwrap();
        assert_eq!(written as usize, bytes.len());
        assert_eq!(bytes.len(), HEADER_LEN + BinaryMetadata::SIZE + 3 * 8 + 2 * 8 + 2);

        let text = std::str::from_utf8(&bytes[..HEADER_LEN]).unwrap();
        assert!(text.starts_with("SuiteSparse:GraphBLAS matrix\nv9.3.1 (grbfile-"));
        assert!(text.contains("format:  CSR\n"));
        assert!(text.contains("type:    GrB_BOOL\n"));
        assert!(text.contains("None\n"));

        let metadata = BinaryMetadata::from_bytes(&bytes[HEADER_LEN..]).unwrap();
        assert_eq!(metadata.implementation, 9_003_001);
        assert_eq!(metadata.nvec, 2);
        assert_eq!(metadata.nvals, 2);

        // The matrix is usable again after writing
        assert_eq!(engine.nvals(&matrix), Ok(2));
        assert_eq!(engine.get_element::<bool>(&matrix, 1, 1), Ok(Some(true)));
    }

    #[test]
    fn test_failed_sink_still_repacks() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("disk full"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let engine = MemoryEngine::new();
        let mut matrix = engine.matrix_new(ElementType::Int64, 3, 3).unwrap();
        engine.build(&mut matrix, &[(0, 1, 4i64), (2, 2, 5)]).unwrap();

        let err = write(&engine, &mut matrix, Broken, &WriteOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_fatal());
        assert_eq!(engine.nvals(&matrix), Ok(2));
        assert_eq!(engine.get_element::<i64>(&matrix, 2, 2), Ok(Some(5)));
    }

    #[test]
    fn test_jumbled_matrix_is_rejected_after_repack() {
        let engine = MemoryEngine::new().with_keep_jumbled(true);
        let mut matrix = engine.matrix_new(ElementType::UInt8, 1, 2).unwrap();
        let jumbled = SparseParts {
            ap: vec![0, 2],
            ai: vec![1, 0],
            ax: vec![2, 1],
            iso: false,
            jumbled: true,
        };
        engine.pack_csr(&mut matrix, jumbled.clone()).unwrap();

        let mut bytes = Vec::new();
        let err = write(&engine, &mut matrix, &mut bytes, &WriteOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::Jumbled)));
        assert!(bytes.is_empty());
        assert_eq!(engine.unpack_csr(&mut matrix).unwrap(), jumbled);
    }
}
