//! wplc-gen - LLVM IR Code Generation
//!
//! Second of the two compiler passes. The emitter walks the tree the
//! analyzer annotated, consulting the binding map for every identifier,
//! and builds an LLVM module through inkwell: one external `printf`
//! declaration, one declaration per extern header, and one definition per
//! source function or procedure, with the `program` function lowered to
//! the module entry point `main`.
//!
//! Types are never re-checked here. The driver refuses to run this pass
//! when the analyzer reported errors; behavior on an errored model is
//! unspecified beyond "no panic, diagnostics where detectable".

pub mod error;
pub mod llvm;
pub mod types;

#[cfg(test)]
mod tests;

pub use error::{CodeGenError, Result};
pub use llvm::{BlockExit, CodeEmitter};
pub use types::TypeMapper;
