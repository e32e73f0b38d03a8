//! grbfile - Binary read/write of GraphBLAS matrices
//!
//! This library saves a sparse matrix to a file and loads it back with the
//! exact same storage: orientation, sparsity class, iso flag, sparsity
//! control and switch values all survive the round trip, and the buffers go
//! to disk as they sit in memory.
//!
//! ## Architecture
//!
//! grbfile follows the same split between format and I/O as its engine trait:
//!
//! - **grbfile-core**: header and metadata layouts, type and layout tables,
//!   status codes, validation and the [`SparseEngine`] trait (no I/O)
//! - **grbfile**: the unpack/repack bridge, the reader and writer, a memory
//!   mapped file inspector and a pure Rust reference engine
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use grbfile::{
//!     read_path, write_path, ElementType, MemoryEngine, ReadOptions, SparseEngine, WriteOptions,
//! };
//!
//! fn example() -> grbfile::Result<()> {
//!     let engine = MemoryEngine::new();
//!     let mut matrix = engine.matrix_new(ElementType::Fp64, 1000, 1000)?;
//!     engine.build(&mut matrix, &[(0, 0, 1.0f64), (999, 3, -2.5)])?;
//!
//!     let options = WriteOptions::default().with_comment("two entries");
//!     write_path(&engine, &mut matrix, "matrix.grb", &options)?;
//!
//!     let back = read_path(&engine, "matrix.grb", &ReadOptions::default())?;
//!     assert_eq!(engine.nvals(&back)?, 2);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Layout-exact files**: no conversion on write, none on read
//! - **Memory-mapped inspection**: look at a file's header and buffers without
//!   loading it (`mmap`)
//! - **gzip streams**: optional compression for the path helpers
//! - **Complex types**: FC32/FC64 when built with `complex`
//! - **Command line tool**: `grbfile info` and `grbfile check` (`cli`)

pub use grbfile_core::{
    // Engine seam
    BitmapParts, Capabilities, EngineResult, FullParts, HyperParts, MatrixOption, OptionValue,
    SparseEngine, SparseParts,
    // Format definitions
    AsciiHeader, BinaryMetadata, ElementType, Layout, Orientation, Sparsity, SparsityControl,
    TypeTable,
    // Errors and validation
    buffer_plan, BufferPlan, FormatError, Status,
};

pub mod bridge;
pub mod codec;
pub mod error;
pub mod handle;
pub mod inspect;
pub mod memory_backend;
#[cfg(feature = "mmap")]
pub mod mmap_view;

pub use bridge::{Buffers, Unpacked};
pub use codec::{
    read, read_path, read_vector, read_vector_path, write, write_path, write_vector,
    write_vector_path, Compression, ReadOptions, WriteOptions,
};
pub use error::{Error, Result};
pub use handle::Handle;
pub use inspect::{inspect, MatrixLayout};
pub use memory_backend::{MemoryEngine, MemoryMatrix, MemoryVector};

#[cfg(feature = "mmap")]
pub use mmap_view::{BinFileView, FileSummary, Region};
