//! Abstract interfaces between the codec and a sparse engine
//!
//! Traits are pure interfaces - no concrete implementations.

pub mod element;
#[cfg(feature = "alloc")]
pub mod engine;

pub use element::Element;
#[cfg(feature = "alloc")]
pub use engine::{
    BitmapParts, Capabilities, EngineResult, FullParts, HyperParts, MatrixOption, OptionValue,
    SparseEngine, SparseParts,
};
