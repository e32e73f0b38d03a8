//! Rust scalar types that map onto engine element types
//!
//! The engine stores values type-erased as raw bytes in native order. This
//! trait converts a typed scalar to and from that representation.

use crate::format::ElementType;

/// Trait for scalars that can be stored as matrix elements
pub trait Element: Copy + PartialEq + core::fmt::Debug + Send + Sync + 'static {
    /// Engine type of this scalar
    const TYPE: ElementType;

    /// Write the native byte representation into `out` (exactly `TYPE.size()` bytes)
    fn write_ne(self, out: &mut [u8]);

    /// Read a value from its native byte representation
    fn read_ne(bytes: &[u8]) -> Self;
}

macro_rules! impl_numeric_element {
    ($type:ty, $variant:ident) => {
        impl Element for $type {
            const TYPE: ElementType = ElementType::$variant;

            fn write_ne(self, out: &mut [u8]) {
                out[..core::mem::size_of::<$type>()].copy_from_slice(&self.to_ne_bytes());
            }

            fn read_ne(bytes: &[u8]) -> Self {
                let mut raw = [0u8; core::mem::size_of::<$type>()];
                raw.copy_from_slice(&bytes[..core::mem::size_of::<$type>()]);
                <$type>::from_ne_bytes(raw)
            }
        }
    };
}

impl_numeric_element!(i8, Int8);
impl_numeric_element!(i16, Int16);
impl_numeric_element!(i32, Int32);
impl_numeric_element!(i64, Int64);
impl_numeric_element!(u8, UInt8);
impl_numeric_element!(u16, UInt16);
impl_numeric_element!(u32, UInt32);
impl_numeric_element!(u64, UInt64);
impl_numeric_element!(f32, Fp32);
impl_numeric_element!(f64, Fp64);

impl Element for bool {
    const TYPE: ElementType = ElementType::Bool;

    fn write_ne(self, out: &mut [u8]) {
        out[0] = self as u8;
    }

    fn read_ne(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }
}

#[cfg(feature = "complex")]
macro_rules! impl_complex_element {
    ($part:ty, $variant:ident) => {
        impl Element for num_complex::Complex<$part> {
            const TYPE: ElementType = ElementType::$variant;

            fn write_ne(self, out: &mut [u8]) {
                let width = core::mem::size_of::<$part>();
                out[..width].copy_from_slice(&self.re.to_ne_bytes());
                out[width..2 * width].copy_from_slice(&self.im.to_ne_bytes());
            }

            fn read_ne(bytes: &[u8]) -> Self {
                let width = core::mem::size_of::<$part>();
                let mut re = [0u8; core::mem::size_of::<$part>()];
                let mut im = [0u8; core::mem::size_of::<$part>()];
                re.copy_from_slice(&bytes[..width]);
                im.copy_from_slice(&bytes[width..2 * width]);
                num_complex::Complex::new(<$part>::from_ne_bytes(re), <$part>::from_ne_bytes(im))
            }
        }
    };
}

#[cfg(feature = "complex")]
impl_complex_element!(f32, Fc32);
#[cfg(feature = "complex")]
impl_complex_element!(f64, Fc64);
