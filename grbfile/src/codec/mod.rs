//! Binary matrix file codec
//!
//! [`write`] and [`read`] work on any byte stream. The `_path` helpers open
//! the file, buffer it and apply the configured [`Compression`]; the
//! `_vector` helpers store a vector as the n x 1 column-major matrix that
//! backs it.

pub mod options;
mod reader;
mod writer;

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use grbfile_core::SparseEngine;

pub use options::{Compression, ReadOptions, WriteOptions, DEFAULT_USER_AGENT};
pub use reader::read;
pub use writer::write;

use crate::error::{Error, Result};

/// Write `matrix` to the file at `path`, replacing it
///
/// Returns the number of uncompressed bytes written.
pub fn write_path<E, P>(
    engine: &E,
    matrix: &mut E::Matrix,
    path: P,
    options: &WriteOptions,
) -> Result<u64>
where
    E: SparseEngine,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let sink = BufWriter::new(File::create(path)?);
    let written = match options.compression {
        Compression::None => write(engine, matrix, sink, options)?,
        Compression::Gzip(level) => {
            let mut encoder = GzEncoder::new(sink, flate2::Compression::new(level));
            let written = write(engine, matrix, &mut encoder, options)?;
            encoder.finish()?.flush()?;
            written
        }
    };
    tracing::debug!(
        path = %path.display(),
        compression = ?options.compression,
        "saved matrix file"
    );
    Ok(written)
}

/// Read a matrix from the file at `path`
pub fn read_path<E, P>(engine: &E, path: P, options: &ReadOptions) -> Result<E::Matrix>
where
    E: SparseEngine,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let source = BufReader::new(File::open(path)?);
    tracing::debug!(
        path = %path.display(),
        compression = ?options.compression,
        "loading matrix file"
    );
    match options.compression {
        Compression::None => read(engine, source),
        Compression::Gzip(_) => read(engine, GzDecoder::new(source)),
    }
}

/// Write a vector as its n x 1 column-major matrix
pub fn write_vector<E, W>(
    engine: &E,
    vector: &mut E::Vector,
    sink: W,
    options: &WriteOptions,
) -> Result<u64>
where
    E: SparseEngine,
    W: Write,
{
    write(engine, engine.vector_as_matrix(vector), sink, options)
}

/// Read a vector; the file must hold an n x 1 matrix stored by column
pub fn read_vector<E, R>(engine: &E, source: R) -> Result<E::Vector>
where
    E: SparseEngine,
    R: Read,
{
    let matrix = reader::read_checked(engine, source, reader::accept_vector)?;
    engine.vector_from_matrix(matrix).map_err(|status| Error::Engine {
        status,
        message: "matrix does not describe a vector".into(),
    })
}

/// [`write_vector`] to the file at `path`
pub fn write_vector_path<E, P>(
    engine: &E,
    vector: &mut E::Vector,
    path: P,
    options: &WriteOptions,
) -> Result<u64>
where
    E: SparseEngine,
    P: AsRef<Path>,
{
    write_path(engine, engine.vector_as_matrix(vector), path, options)
}

/// [`read_vector`] from the file at `path`
pub fn read_vector_path<E, P>(engine: &E, path: P, options: &ReadOptions) -> Result<E::Vector>
where
    E: SparseEngine,
    P: AsRef<Path>,
{
    let source = BufReader::new(File::open(path.as_ref())?);
    match options.compression {
        Compression::None => read_vector(engine, source),
        Compression::Gzip(_) => read_vector(engine, GzDecoder::new(source)),
    }
}
