//! Diagnostic collection for the analysis and emission passes.
//!
//! Both passes report through a shared [`Reporter`]: the analyzer via
//! [`Reporter::add_semantic_error`], the emitter via
//! [`Reporter::add_codegen_error`]. Errors are recoverable by contract;
//! the walkers keep going and the driver checks [`Reporter::has_errors`]
//! before allowing emission.

use std::cell::RefCell;
use std::fmt;

use thiserror::Error;

use crate::span::Span;

/// Semantic error classification.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SemanticErrorKind {
    /// Identifier already declared in the current scope frame
    #[error("duplicate declaration in scope")]
    DuplicateInScope,

    /// Identifier not visible in any enclosing scope
    #[error("undeclared identifier")]
    Undeclared,

    /// Declared or inferred type disagrees with the expression type
    #[error("type mismatch")]
    TypeMismatch,

    /// Loop, conditional, or select guard was not BOOL
    #[error("condition must be BOOL")]
    ConditionType,

    /// Assignment target and expression counts differ
    #[error("assignment arity mismatch")]
    ArityMismatch,

    /// Operator applied outside its operand domain
    #[error("operand type violation")]
    OperandType,
}

/// Codegen error classification.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CodegenErrorKind {
    /// Call target not present in the module
    #[error("unknown callee")]
    UnknownCallee,

    /// Tree node has no symbol binding
    #[error("missing symbol binding")]
    MissingBinding,

    /// Identifier read before any assignment
    #[error("use of undefined symbol")]
    UseOfUndefined,

    /// Symbol has no allocated IR storage
    #[error("symbol has no storage")]
    MissingStorage,
}

/// Which pass produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Semantic(SemanticErrorKind),
    Codegen(CodegenErrorKind),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Semantic(k) => write!(f, "{}", k),
            ErrorKind::Codegen(k) => write!(f, "{}", k),
        }
    }
}

/// One collected error: location, classification, rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerError {
    pub span: Span,
    pub kind: ErrorKind,
    pub message: String,
}

impl fmt::Display for CompilerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}",
            self.span.line, self.span.column, self.message
        )
    }
}

/// Append-only error sink shared by the analyzer and the emitter.
///
/// Interior mutability lets a pass hold the reporter by shared reference
/// alongside its other borrows; the compiler is single-threaded so a
/// `RefCell` suffices.
#[derive(Default)]
pub struct Reporter {
    errors: RefCell<Vec<CompilerError>>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error from the semantic pass.
    pub fn add_semantic_error(
        &self,
        span: Span,
        kind: SemanticErrorKind,
        message: impl Into<String>,
    ) {
        self.errors.borrow_mut().push(CompilerError {
            span,
            kind: ErrorKind::Semantic(kind),
            message: message.into(),
        });
    }

    /// Record an error from the code-generation pass.
    pub fn add_codegen_error(
        &self,
        span: Span,
        kind: CodegenErrorKind,
        message: impl Into<String>,
    ) {
        self.errors.borrow_mut().push(CompilerError {
            span,
            kind: ErrorKind::Codegen(kind),
            message: message.into(),
        });
    }

    /// True if any error has been recorded.
    pub fn has_errors(&self) -> bool {
        !self.errors.borrow().is_empty()
    }

    /// Number of recorded errors.
    pub fn error_count(&self) -> usize {
        self.errors.borrow().len()
    }

    /// Snapshot of the collected errors, in report order.
    pub fn errors(&self) -> Vec<CompilerError> {
        self.errors.borrow().clone()
    }

    /// Render the whole list, one error per line, in report order.
    pub fn render(&self) -> String {
        let errors = self.errors.borrow();
        let mut out = String::new();
        for e in errors.iter() {
            out.push_str(&e.to_string());
            out.push('\n');
        }
        out
    }
}
