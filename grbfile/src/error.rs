//! Error type for the codec and its engine bridge

use grbfile_core::{FormatError, SparseEngine, Status};

/// Errors raised while writing or reading a matrix file
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The bytes do not describe a matrix this engine can load
    #[error("{0}")]
    Format(#[from] FormatError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An engine primitive reported a failure
    #[error("engine error {status}: {message}")]
    Engine { status: Status, message: String },

    /// The buffers could not be handed back to the matrix after unpacking
    #[error("repack failed with {status}: {message}")]
    RepackFailed { status: Status, message: String },

    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl Error {
    /// Whether the matrix involved can no longer be trusted
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::RepackFailed { .. } => true,
            Error::Engine { status, .. } => status.is_fatal(),
            _ => false,
        }
    }

    /// Engine status carried by this error, if any
    pub fn status(&self) -> Option<Status> {
        match self {
            Error::Engine { status, .. } | Error::RepackFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Attach the engine's diagnostic for `matrix` to a failed status
    pub(crate) fn engine<E: SparseEngine>(engine: &E, matrix: &E::Matrix, status: Status) -> Self {
        Error::Engine {
            status,
            message: engine.error_string(matrix),
        }
    }
}

impl From<Status> for Error {
    fn from(status: Status) -> Self {
        Error::Engine {
            status,
            message: String::new(),
        }
    }
}

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Check an engine result against `matrix`, turning a failure into [`Error::Engine`]
pub(crate) fn check<E: SparseEngine, T>(
    engine: &E,
    matrix: &E::Matrix,
    result: grbfile_core::EngineResult<T>,
) -> Result<T> {
    result.map_err(|status| Error::engine(engine, matrix, status))
}
