//! Error types for LLVM code generation.
//!
//! These are internal failures of the emission machinery itself.
//! Source-level findings (unknown callee, undefined symbol, missing
//! binding or storage) are not errors in this sense: they go to the
//! shared `Reporter` and emission continues with a synthesized value.

use thiserror::Error;

/// Error type for LLVM code generation.
#[derive(Debug, Error)]
pub enum CodeGenError {
    /// An inkwell builder operation failed
    #[error("llvm builder error: {0}")]
    Builder(#[from] inkwell::builder::BuilderError),

    /// Emission was attempted with no current insertion block
    #[error("no current insertion block")]
    NoInsertionBlock,

    /// Internal error - indicates a bug
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for code generation operations.
pub type Result<T> = std::result::Result<T, CodeGenError>;
