//! Element type table
//!
//! The file stores the element type as a small integer code. The mapping is
//! fixed; complex codes are only decodable when the engine was built with
//! complex support.

use crate::{FormatError, Result};

/// Built-in element types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i32)]
pub enum ElementType {
    Bool = 0,
    Int8 = 1,
    Int16 = 2,
    Int32 = 3,
    Int64 = 4,
    UInt8 = 5,
    UInt16 = 6,
    UInt32 = 7,
    UInt64 = 8,
    Fp32 = 9,
    Fp64 = 10,
    Fc32 = 11,
    Fc64 = 12,
}

impl ElementType {
    /// Every type in code order
    pub const ALL: [ElementType; 13] = [
        ElementType::Bool,
        ElementType::Int8,
        ElementType::Int16,
        ElementType::Int32,
        ElementType::Int64,
        ElementType::UInt8,
        ElementType::UInt16,
        ElementType::UInt32,
        ElementType::UInt64,
        ElementType::Fp32,
        ElementType::Fp64,
        ElementType::Fc32,
        ElementType::Fc64,
    ];

    /// Convert from a stored type code, ignoring engine capabilities
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ElementType::Bool),
            1 => Some(ElementType::Int8),
            2 => Some(ElementType::Int16),
            3 => Some(ElementType::Int32),
            4 => Some(ElementType::Int64),
            5 => Some(ElementType::UInt8),
            6 => Some(ElementType::UInt16),
            7 => Some(ElementType::UInt32),
            8 => Some(ElementType::UInt64),
            9 => Some(ElementType::Fp32),
            10 => Some(ElementType::Fp64),
            11 => Some(ElementType::Fc32),
            12 => Some(ElementType::Fc64),
            _ => None,
        }
    }

    /// Stored type code
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Name written to the `type:` line of the ASCII header
    pub const fn name(self) -> &'static str {
        match self {
            ElementType::Bool => "GrB_BOOL",
            ElementType::Int8 => "GrB_INT8",
            ElementType::Int16 => "GrB_INT16",
            ElementType::Int32 => "GrB_INT32",
            ElementType::Int64 => "GrB_INT64",
            ElementType::UInt8 => "GrB_UINT8",
            ElementType::UInt16 => "GrB_UINT16",
            ElementType::UInt32 => "GrB_UINT32",
            ElementType::UInt64 => "GrB_UINT64",
            ElementType::Fp32 => "GrB_FP32",
            ElementType::Fp64 => "GrB_FP64",
            ElementType::Fc32 => "GxB_FC32",
            ElementType::Fc64 => "GxB_FC64",
        }
    }

    /// Size in bytes of one element
    pub const fn size(self) -> usize {
        match self {
            ElementType::Bool | ElementType::Int8 | ElementType::UInt8 => 1,
            ElementType::Int16 | ElementType::UInt16 => 2,
            ElementType::Int32 | ElementType::UInt32 | ElementType::Fp32 => 4,
            ElementType::Int64 | ElementType::UInt64 | ElementType::Fp64 => 8,
            ElementType::Fc32 => 8,
            ElementType::Fc64 => 16,
        }
    }

    pub const fn is_complex(self) -> bool {
        matches!(self, ElementType::Fc32 | ElementType::Fc64)
    }

    /// Compare two stored elements of this type by value
    ///
    /// Floating types compare numerically (so `-0.0 == 0.0` and NaN never
    /// equals itself); everything else compares bytes. Both slices must be
    /// exactly `size()` bytes long.
    pub fn values_equal(self, a: &[u8], b: &[u8]) -> bool {
        match self {
            ElementType::Fp32 => f32_at(a, 0) == f32_at(b, 0),
            ElementType::Fp64 => f64_at(a, 0) == f64_at(b, 0),
            ElementType::Fc32 => f32_at(a, 0) == f32_at(b, 0) && f32_at(a, 4) == f32_at(b, 4),
            ElementType::Fc64 => f64_at(a, 0) == f64_at(b, 0) && f64_at(a, 8) == f64_at(b, 8),
            ElementType::Bool => (a[0] != 0) == (b[0] != 0),
            _ => a == b,
        }
    }
}

fn f32_at(bytes: &[u8], offset: usize) -> f32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[offset..offset + 4]);
    f32::from_ne_bytes(raw)
}

fn f64_at(bytes: &[u8], offset: usize) -> f64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[offset..offset + 8]);
    f64::from_ne_bytes(raw)
}

impl core::fmt::Display for ElementType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Code table of the types an engine build can decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeTable {
    complex: bool,
}

impl TypeTable {
    pub const fn new(complex: bool) -> Self {
        Self { complex }
    }

    pub const fn supports_complex(&self) -> bool {
        self.complex
    }

    /// Decode a stored type code
    pub fn decode(&self, code: i32) -> Result<ElementType> {
        match ElementType::from_code(code) {
            Some(ty) if ty.is_complex() && !self.complex => Err(FormatError::UnknownTypeCode(code)),
            Some(ty) => Ok(ty),
            None => Err(FormatError::UnknownTypeCode(code)),
        }
    }

    /// Types this table can decode
    pub fn types(&self) -> impl Iterator<Item = ElementType> + '_ {
        ElementType::ALL
            .into_iter()
            .filter(move |ty| self.complex || !ty.is_complex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_dense() {
        for (index, ty) in ElementType::ALL.iter().enumerate() {
            assert_eq!(ty.code(), index as i32);
            assert_eq!(ElementType::from_code(index as i32), Some(*ty));
        }
        assert_eq!(ElementType::from_code(13), None);
        assert_eq!(ElementType::from_code(-1), None);
    }

    #[test]
    fn test_table_without_complex() {
        let table = TypeTable::new(false);
        assert_eq!(table.decode(10), Ok(ElementType::Fp64));
        assert_eq!(table.decode(11), Err(FormatError::UnknownTypeCode(11)));
        assert_eq!(table.decode(12), Err(FormatError::UnknownTypeCode(12)));
        assert_eq!(table.types().count(), 11);

        let table = TypeTable::new(true);
        assert_eq!(table.decode(12), Ok(ElementType::Fc64));
        assert_eq!(table.types().count(), 13);
    }

    #[test]
    fn test_values_equal() {
        let pos = 0.0f64.to_ne_bytes();
        let neg = (-0.0f64).to_ne_bytes();
        assert!(ElementType::Fp64.values_equal(&pos, &neg));

        let nan = f32::NAN.to_ne_bytes();
        assert!(!ElementType::Fp32.values_equal(&nan, &nan));

        assert!(ElementType::Bool.values_equal(&[1], &[2]));
        assert!(!ElementType::Int8.values_equal(&[1], &[2]));
    }
}
