//! Engine status codes
//!
//! Every engine primitive reports one of these codes. `Success` and
//! `NoValue` are not failures; everything else is translated into a typed
//! error by the codec together with the engine's diagnostic text.

/// Return status of an engine call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i32)]
pub enum Status {
    Success = 0,
    /// Benign sentinel: the requested entry is not present
    NoValue = 1,
    UninitializedObject = -1,
    NullPointer = -2,
    InvalidValue = -3,
    InvalidIndex = -4,
    DomainMismatch = -5,
    DimensionMismatch = -6,
    OutputNotEmpty = -7,
    NotImplemented = -8,
    /// Unrecoverable engine state
    Panic = -101,
    OutOfMemory = -102,
    InsufficientSpace = -103,
    InvalidObject = -104,
    IndexOutOfBounds = -105,
    EmptyObject = -106,
}

impl Status {
    /// Convert from the engine's integer code
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Status::Success),
            1 => Some(Status::NoValue),
            -1 => Some(Status::UninitializedObject),
            -2 => Some(Status::NullPointer),
            -3 => Some(Status::InvalidValue),
            -4 => Some(Status::InvalidIndex),
            -5 => Some(Status::DomainMismatch),
            -6 => Some(Status::DimensionMismatch),
            -7 => Some(Status::OutputNotEmpty),
            -8 => Some(Status::NotImplemented),
            -101 => Some(Status::Panic),
            -102 => Some(Status::OutOfMemory),
            -103 => Some(Status::InsufficientSpace),
            -104 => Some(Status::InvalidObject),
            -105 => Some(Status::IndexOutOfBounds),
            -106 => Some(Status::EmptyObject),
            _ => None,
        }
    }

    /// Integer code as reported by the engine
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// True for codes that are not failures
    pub const fn is_ok(self) -> bool {
        matches!(self, Status::Success | Status::NoValue)
    }

    /// True when the engine can no longer be trusted
    pub const fn is_fatal(self) -> bool {
        matches!(self, Status::Panic)
    }

    /// API errors are caller mistakes; everything else failed during execution
    pub const fn is_api_error(self) -> bool {
        let code = self.code();
        code < 0 && code > -100
    }
}

impl core::fmt::Display for Status {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Status::Success => "success",
            Status::NoValue => "no value",
            Status::UninitializedObject => "uninitialized object",
            Status::NullPointer => "null pointer",
            Status::InvalidValue => "invalid value",
            Status::InvalidIndex => "invalid index",
            Status::DomainMismatch => "domain mismatch",
            Status::DimensionMismatch => "dimension mismatch",
            Status::OutputNotEmpty => "output not empty",
            Status::NotImplemented => "not implemented",
            Status::Panic => "panic",
            Status::OutOfMemory => "out of memory",
            Status::InsufficientSpace => "insufficient space",
            Status::InvalidObject => "invalid object",
            Status::IndexOutOfBounds => "index out of bounds",
            Status::EmptyObject => "empty object",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for code in [0, 1, -1, -2, -3, -4, -5, -6, -7, -8, -101, -102, -103, -104, -105, -106] {
            let status = Status::from_code(code).unwrap();
            assert_eq!(status.code(), code);
        }
        assert_eq!(Status::from_code(42), None);
    }

    #[test]
    fn test_classification() {
        assert!(Status::Success.is_ok());
        assert!(Status::NoValue.is_ok());
        assert!(!Status::InvalidValue.is_ok());
        assert!(Status::InvalidValue.is_api_error());
        assert!(!Status::OutOfMemory.is_api_error());
        assert!(Status::Panic.is_fatal());
        assert!(!Status::OutOfMemory.is_fatal());
    }
}
