//! Storage layout definitions
//!
//! A layout is the combination of orientation (row- or column-major) and
//! sparsity class. Both halves are stored in the metadata block with the
//! engine's own enum values; the ASCII header carries the combined tag.

use super::constants::{format, sparsity};
use crate::{FormatError, Result};

/// Row- or column-major storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i32)]
pub enum Orientation {
    ByRow = format::BY_ROW,
    ByCol = format::BY_COL,
}

impl Orientation {
    /// Convert from the stored format value
    pub const fn from_i32(value: i32) -> Option<Self> {
        match value {
            format::BY_ROW => Some(Orientation::ByRow),
            format::BY_COL => Some(Orientation::ByCol),
            _ => None,
        }
    }

    /// Stored format value
    pub const fn to_i32(self) -> i32 {
        self as i32
    }

    /// Number of vectors for a matrix of the given shape
    pub const fn vdim(self, nrows: u64, ncols: u64) -> u64 {
        match self {
            Orientation::ByRow => nrows,
            Orientation::ByCol => ncols,
        }
    }

    /// Length of each vector for a matrix of the given shape
    pub const fn vlen(self, nrows: u64, ncols: u64) -> u64 {
        match self {
            Orientation::ByRow => ncols,
            Orientation::ByCol => nrows,
        }
    }
}

/// Sparsity class of the stored structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i32)]
pub enum Sparsity {
    Hypersparse = sparsity::HYPERSPARSE,
    Sparse = sparsity::SPARSE,
    Bitmap = sparsity::BITMAP,
    Full = sparsity::FULL,
}

impl Sparsity {
    /// All classes, from most to least compressed
    pub const ALL: [Sparsity; 4] = [
        Sparsity::Hypersparse,
        Sparsity::Sparse,
        Sparsity::Bitmap,
        Sparsity::Full,
    ];

    /// Convert from a sparsity status value (exactly one bit set)
    pub const fn from_i32(value: i32) -> Option<Self> {
        match value {
            sparsity::HYPERSPARSE => Some(Sparsity::Hypersparse),
            sparsity::SPARSE => Some(Sparsity::Sparse),
            sparsity::BITMAP => Some(Sparsity::Bitmap),
            sparsity::FULL => Some(Sparsity::Full),
            _ => None,
        }
    }

    /// Stored sparsity status value
    pub const fn to_i32(self) -> i32 {
        self as i32
    }

    /// True when the layout carries `Ap`/`Ai` index arrays
    pub const fn is_compressed(self) -> bool {
        matches!(self, Sparsity::Hypersparse | Sparsity::Sparse)
    }
}

/// Set of sparsity classes the engine may choose from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SparsityControl(i32);

impl SparsityControl {
    /// Let the engine pick any class
    pub const AUTO: SparsityControl = SparsityControl(sparsity::AUTO);

    /// Build a control value from raw bits; zero or unknown bits mean auto
    pub const fn from_bits(bits: i32) -> Self {
        let bits = bits & sparsity::AUTO;
        if bits == 0 {
            Self::AUTO
        } else {
            SparsityControl(bits)
        }
    }

    /// Control value allowing exactly one class
    pub const fn only(class: Sparsity) -> Self {
        SparsityControl(class.to_i32())
    }

    /// Raw bits
    pub const fn bits(self) -> i32 {
        self.0
    }

    /// Whether the engine may use the given class
    pub const fn allows(self, class: Sparsity) -> bool {
        self.0 & class.to_i32() != 0
    }

    /// Add another allowed class
    pub const fn with(self, class: Sparsity) -> Self {
        SparsityControl(self.0 | class.to_i32())
    }
}

impl Default for SparsityControl {
    fn default() -> Self {
        Self::AUTO
    }
}

/// The eight layout variants a matrix can be stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Layout {
    HyperCsr,
    HyperCsc,
    Csr,
    Csc,
    BitmapR,
    BitmapC,
    FullR,
    FullC,
}

impl Layout {
    /// Every layout variant
    pub const ALL: [Layout; 8] = [
        Layout::HyperCsr,
        Layout::HyperCsc,
        Layout::Csr,
        Layout::Csc,
        Layout::BitmapR,
        Layout::BitmapC,
        Layout::FullR,
        Layout::FullC,
    ];

    /// Combine orientation and sparsity class
    pub const fn new(orientation: Orientation, class: Sparsity) -> Self {
        match (orientation, class) {
            (Orientation::ByRow, Sparsity::Hypersparse) => Layout::HyperCsr,
            (Orientation::ByCol, Sparsity::Hypersparse) => Layout::HyperCsc,
            (Orientation::ByRow, Sparsity::Sparse) => Layout::Csr,
            (Orientation::ByCol, Sparsity::Sparse) => Layout::Csc,
            (Orientation::ByRow, Sparsity::Bitmap) => Layout::BitmapR,
            (Orientation::ByCol, Sparsity::Bitmap) => Layout::BitmapC,
            (Orientation::ByRow, Sparsity::Full) => Layout::FullR,
            (Orientation::ByCol, Sparsity::Full) => Layout::FullC,
        }
    }

    /// Decode from the stored format and sparsity status values
    pub fn from_raw(format: i32, sparsity_status: i32) -> Result<Self> {
        let orientation =
            Orientation::from_i32(format).ok_or(FormatError::UnknownFormat(format))?;
        let class = Sparsity::from_i32(sparsity_status)
            .ok_or(FormatError::UnknownSparsity(sparsity_status))?;
        Ok(Self::new(orientation, class))
    }

    pub const fn orientation(self) -> Orientation {
        match self {
            Layout::HyperCsr | Layout::Csr | Layout::BitmapR | Layout::FullR => Orientation::ByRow,
            Layout::HyperCsc | Layout::Csc | Layout::BitmapC | Layout::FullC => Orientation::ByCol,
        }
    }

    pub const fn sparsity(self) -> Sparsity {
        match self {
            Layout::HyperCsr | Layout::HyperCsc => Sparsity::Hypersparse,
            Layout::Csr | Layout::Csc => Sparsity::Sparse,
            Layout::BitmapR | Layout::BitmapC => Sparsity::Bitmap,
            Layout::FullR | Layout::FullC => Sparsity::Full,
        }
    }

    /// Tag written to the `format:` line of the ASCII header
    pub const fn tag(self) -> &'static str {
        match self {
            Layout::HyperCsr => "HCSR",
            Layout::HyperCsc => "HCSC",
            Layout::Csr => "CSR",
            Layout::Csc => "CSC",
            Layout::BitmapR => "BITMAPR",
            Layout::BitmapC => "BITMAPC",
            Layout::FullR => "FULLR",
            Layout::FullC => "FULLC",
        }
    }

    /// Parse a header tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|layout| layout.tag() == tag)
    }

    /// Number of stored vectors for non-hypersparse layouts
    pub const fn default_nvec(self, nrows: u64, ncols: u64) -> u64 {
        self.orientation().vdim(nrows, ncols)
    }
}

impl core::fmt::Display for Layout {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_combinations_are_distinct() {
        for layout in Layout::ALL {
            let rebuilt = Layout::new(layout.orientation(), layout.sparsity());
            assert_eq!(rebuilt, layout);
            assert_eq!(Layout::from_tag(layout.tag()), Some(layout));
        }
    }

    #[test]
    fn test_from_raw() {
        assert_eq!(Layout::from_raw(0, 2), Ok(Layout::Csr));
        assert_eq!(Layout::from_raw(1, 1), Ok(Layout::HyperCsc));
        assert_eq!(Layout::from_raw(1, 8), Ok(Layout::FullC));
        assert_eq!(Layout::from_raw(2, 2), Err(FormatError::UnknownFormat(2)));
        assert_eq!(Layout::from_raw(0, 3), Err(FormatError::UnknownSparsity(3)));
    }

    #[test]
    fn test_default_nvec_follows_orientation() {
        assert_eq!(Layout::Csr.default_nvec(3, 5), 3);
        assert_eq!(Layout::Csc.default_nvec(3, 5), 5);
        assert_eq!(Layout::FullC.default_nvec(3, 5), 5);
    }

    #[test]
    fn test_sparsity_control() {
        let control = SparsityControl::only(Sparsity::Bitmap);
        assert!(control.allows(Sparsity::Bitmap));
        assert!(!control.allows(Sparsity::Full));
        assert!(control.with(Sparsity::Full).allows(Sparsity::Full));
        assert_eq!(SparsityControl::from_bits(0), SparsityControl::AUTO);
        assert_eq!(SparsityControl::from_bits(64), SparsityControl::AUTO);
        assert_eq!(SparsityControl::AUTO.bits(), 15);
    }
}
