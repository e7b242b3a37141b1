//! wplc-sem - Semantic Analyzer & Type Checker
//!
//! First of the two compiler passes. The analyzer walks the parse tree
//! once, building a lexically scoped symbol table, type-checking every
//! declaration, statement, and expression, and recording a node-to-symbol
//! binding map that the code emitter consults on its own walk.
//!
//! The pass never fails: every violation is reported through the shared
//! [`wplc_util::Reporter`] and the walk continues with the type the
//! context expected, so one mistake produces one diagnostic instead of a
//! cascade. The caller gates emission on `Reporter::has_errors`.

pub mod analysis;
pub mod scope;
pub mod symbol;
pub mod types;

#[cfg(test)]
mod edge_cases;

pub use analysis::SemanticAnalyzer;
pub use scope::ScopeManager;
pub use symbol::{Bindings, SemanticModel, Symbol, SymbolId, SymbolTable};
pub use types::WplType;
