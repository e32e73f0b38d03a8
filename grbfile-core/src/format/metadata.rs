//! Binary metadata block
//!
//! Follows the 512-byte ASCII header. Fields are written back to back in
//! native byte order with no padding, so the block is 81 bytes on targets
//! with a 64-bit `usize`.

use super::constants::{INDEX_SIZE, SIZE_T_SIZE};
use super::layout::{Layout, SparsityControl};
use crate::{FormatError, Result};

/// Fixed-size metadata block describing the stored matrix
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BinaryMetadata {
    /// Engine implementation id (the file magic)
    pub implementation: u64,
    /// Orientation value (by-row = 0, by-col = 1)
    pub format: i32,
    /// Sparsity class the buffers are stored in
    pub sparsity_status: i32,
    /// Classes the engine may convert to later
    pub sparsity_control: i32,
    pub hyper_switch: f64,
    pub bitmap_switch: f64,
    pub nrows: u64,
    pub ncols: u64,
    /// Number of stored vectors
    pub nvec: u64,
    /// Number of stored entries
    pub nvals: u64,
    /// Element type code
    pub typecode: i32,
    /// Element size in bytes
    pub typesize: usize,
    /// Whether `Ax` holds a single value
    pub iso: bool,
}

const IMPLEMENTATION: usize = 0;
const FORMAT: usize = IMPLEMENTATION + 8;
const SPARSITY_STATUS: usize = FORMAT + 4;
const SPARSITY_CONTROL: usize = SPARSITY_STATUS + 4;
const HYPER_SWITCH: usize = SPARSITY_CONTROL + 4;
const BITMAP_SWITCH: usize = HYPER_SWITCH + 8;
const NROWS: usize = BITMAP_SWITCH + 8;
const NCOLS: usize = NROWS + INDEX_SIZE;
const NVEC: usize = NCOLS + INDEX_SIZE;
const NVALS: usize = NVEC + INDEX_SIZE;
const TYPECODE: usize = NVALS + INDEX_SIZE;
const TYPESIZE: usize = TYPECODE + 4;
const ISO: usize = TYPESIZE + SIZE_T_SIZE;

impl BinaryMetadata {
    /// Size of the block in bytes
    pub const SIZE: usize = ISO + 1;

    /// Read only the implementation id from the start of a block
    pub fn implementation_of(bytes: &[u8]) -> Result<u64> {
        if bytes.len() < FORMAT {
            return Err(FormatError::Truncated);
        }
        Ok(u64::from_ne_bytes(array(&bytes[IMPLEMENTATION..FORMAT])))
    }

    /// Decode the block without validating any field
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(FormatError::Truncated);
        }

        Ok(Self {
            implementation: u64::from_ne_bytes(array(&bytes[IMPLEMENTATION..FORMAT])),
            format: i32::from_ne_bytes(array(&bytes[FORMAT..SPARSITY_STATUS])),
            sparsity_status: i32::from_ne_bytes(array(&bytes[SPARSITY_STATUS..SPARSITY_CONTROL])),
            sparsity_control: i32::from_ne_bytes(array(&bytes[SPARSITY_CONTROL..HYPER_SWITCH])),
            hyper_switch: f64::from_ne_bytes(array(&bytes[HYPER_SWITCH..BITMAP_SWITCH])),
            bitmap_switch: f64::from_ne_bytes(array(&bytes[BITMAP_SWITCH..NROWS])),
            nrows: u64::from_ne_bytes(array(&bytes[NROWS..NCOLS])),
            ncols: u64::from_ne_bytes(array(&bytes[NCOLS..NVEC])),
            nvec: u64::from_ne_bytes(array(&bytes[NVEC..NVALS])),
            nvals: u64::from_ne_bytes(array(&bytes[NVALS..TYPECODE])),
            typecode: i32::from_ne_bytes(array(&bytes[TYPECODE..TYPESIZE])),
            typesize: usize::from_ne_bytes(array(&bytes[TYPESIZE..ISO])),
            iso: bytes[ISO] != 0,
        })
    }

    /// Encode the block
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[IMPLEMENTATION..FORMAT].copy_from_slice(&self.implementation.to_ne_bytes());
        bytes[FORMAT..SPARSITY_STATUS].copy_from_slice(&self.format.to_ne_bytes());
        bytes[SPARSITY_STATUS..SPARSITY_CONTROL]
            .copy_from_slice(&self.sparsity_status.to_ne_bytes());
        bytes[SPARSITY_CONTROL..HYPER_SWITCH].copy_from_slice(&self.sparsity_control.to_ne_bytes());
        bytes[HYPER_SWITCH..BITMAP_SWITCH].copy_from_slice(&self.hyper_switch.to_ne_bytes());
        bytes[BITMAP_SWITCH..NROWS].copy_from_slice(&self.bitmap_switch.to_ne_bytes());
        bytes[NROWS..NCOLS].copy_from_slice(&self.nrows.to_ne_bytes());
        bytes[NCOLS..NVEC].copy_from_slice(&self.ncols.to_ne_bytes());
        bytes[NVEC..NVALS].copy_from_slice(&self.nvec.to_ne_bytes());
        bytes[NVALS..TYPECODE].copy_from_slice(&self.nvals.to_ne_bytes());
        bytes[TYPECODE..TYPESIZE].copy_from_slice(&self.typecode.to_ne_bytes());
        bytes[TYPESIZE..ISO].copy_from_slice(&self.typesize.to_ne_bytes());
        bytes[ISO] = self.iso as u8;
        bytes
    }

    /// Check the implementation id against the one the reader expects
    pub fn check_implementation(&self, expected: u64) -> Result<()> {
        if self.implementation != expected {
            return Err(FormatError::BadMagic {
                expected,
                found: self.implementation,
            });
        }
        Ok(())
    }

    /// Layout the buffers are stored in
    pub fn layout(&self) -> Result<Layout> {
        Layout::from_raw(self.format, self.sparsity_status)
    }

    /// Sparsity control to apply after reading
    pub fn control(&self) -> SparsityControl {
        SparsityControl::from_bits(self.sparsity_control)
    }
}

fn array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BinaryMetadata {
        BinaryMetadata {
            implementation: 9_003_001,
            format: 1,
            sparsity_status: 1,
            sparsity_control: 15,
            hyper_switch: 0.0625,
            bitmap_switch: 0.123_456_789,
            nrows: 1 << 40,
            ncols: 7,
            nvec: 3,
            nvals: 11,
            typecode: 10,
            typesize: 8,
            iso: true,
        }
    }

    #[test]
    fn test_block_size() {
        assert_eq!(BinaryMetadata::SIZE, 73 + SIZE_T_SIZE);
        #[cfg(target_pointer_width = "64")]
        assert_eq!(BinaryMetadata::SIZE, 81);
    }

    #[test]
    fn test_field_offsets() {
        let bytes = sample().to_bytes();
        assert_eq!(&bytes[0..8], &9_003_001u64.to_ne_bytes());
        assert_eq!(&bytes[20..28], &0.0625f64.to_ne_bytes());
        assert_eq!(&bytes[36..44], &(1u64 << 40).to_ne_bytes());
        assert_eq!(bytes[BinaryMetadata::SIZE - 1], 1);
        assert_eq!(BinaryMetadata::implementation_of(&bytes), Ok(9_003_001));
    }

    #[test]
    fn test_switches_are_bit_exact() {
        let decoded = BinaryMetadata::from_bytes(&sample().to_bytes()).unwrap();
        assert_eq!(decoded.bitmap_switch.to_bits(), 0.123_456_789f64.to_bits());
        assert_eq!(decoded, sample());
        assert_eq!(decoded.layout(), Ok(Layout::HyperCsc));
    }

    #[test]
    fn test_truncated_block() {
        let bytes = sample().to_bytes();
        assert_eq!(
            BinaryMetadata::from_bytes(&bytes[..BinaryMetadata::SIZE - 1]),
            Err(FormatError::Truncated)
        );
        assert_eq!(
            BinaryMetadata::implementation_of(&bytes[..4]),
            Err(FormatError::Truncated)
        );
    }

    #[test]
    fn test_check_implementation() {
        let meta = sample();
        assert_eq!(meta.check_implementation(9_003_001), Ok(()));
        assert_eq!(
            meta.check_implementation(1),
            Err(FormatError::BadMagic {
                expected: 1,
                found: 9_003_001
            })
        );
    }
}
