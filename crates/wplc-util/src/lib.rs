//! wplc-util - Foundation types for the WPL compiler
//!
//! This crate holds the pieces every phase depends on: source spans,
//! typed indices, and the diagnostic reporter that collects semantic and
//! codegen errors across the two passes.

pub mod diagnostic;
pub mod index_vec;
pub mod span;

pub use diagnostic::{
    CodegenErrorKind, CompilerError, ErrorKind, Reporter, SemanticErrorKind,
};
pub use index_vec::{Idx, IndexVec};
pub use span::Span;

// Re-export the hash map used for compiler-internal tables.
pub use rustc_hash::FxHashMap;
