//! Error types for binary matrix file decoding

/// Errors raised while interpreting the bytes of a matrix file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    /// Implementation id in the metadata block is not the one expected
    BadMagic { expected: u64, found: u64 },
    /// Element type code is not in the type table
    UnknownTypeCode(i32),
    /// Orientation value is neither by-row nor by-col
    UnknownFormat(i32),
    /// Sparsity status is not exactly one of the four layouts
    UnknownSparsity(i32),
    /// Stream ended before a region was complete
    Truncated,
    /// A region size does not fit in the address space
    SizeOverflow,
    /// Stored element size disagrees with the decoded type
    TypeSizeMismatch { expected: usize, found: usize },
    /// Pointer array is not monotone or does not end at nvals
    InvalidPointers,
    /// Index arrays are unsorted and the file cannot record it
    Jumbled,
}

impl core::fmt::Display for FormatError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FormatError::BadMagic { expected, found } => {
                write!(f, "Implementation id mismatch: expected {expected}, found {found}")
            }
            FormatError::UnknownTypeCode(code) => write!(f, "Unknown element type code {code}"),
            FormatError::UnknownFormat(value) => write!(f, "Unknown matrix format {value}"),
            FormatError::UnknownSparsity(value) => write!(f, "Unknown sparsity status {value}"),
            FormatError::Truncated => write!(f, "Matrix file is truncated"),
            FormatError::SizeOverflow => write!(f, "Region size overflows the address space"),
            FormatError::TypeSizeMismatch { expected, found } => {
                write!(f, "Element size mismatch: type needs {expected} bytes, file says {found}")
            }
            FormatError::InvalidPointers => write!(f, "Invalid vector pointer array"),
            FormatError::Jumbled => write!(f, "Matrix indices are jumbled"),
        }
    }
}

impl core::error::Error for FormatError {}

/// Result type for format operations
pub type Result<T> = core::result::Result<T, FormatError>;
