//! wplc-drv - Compiler Core Driver
//!
//! Orchestrates the two passes over a parse tree delivered by the
//! upstream parser:
//!
//! ```text
//! Parse tree
//!      │
//!      ▼
//! [Semantic Analysis] ──▶ SemanticModel (symbols + bindings), errors
//!      │
//!      ▼  gate: Reporter::has_errors
//! [Code Generation]  ──▶ LLVM module, errors
//! ```
//!
//! Running the emitter without a clean analysis is a hard error
//! ([`CompileError::SemanticRejected`]); the emitter depends on the
//! binding map and its behavior on an errored model is unspecified.
//! Lexing, parsing, CLI, and file output belong to the surrounding
//! toolchain, not to this crate.

use inkwell::context::Context;
use inkwell::module::Module;
use thiserror::Error;

use wplc_gen::{CodeEmitter, CodeGenError};
use wplc_sem::{SemanticAnalyzer, SemanticModel};
use wplc_tree::CompilationUnit;
use wplc_util::Reporter;

/// Pipeline failure.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Semantic analysis reported errors; emission was not attempted
    #[error("semantic analysis rejected the unit with {0} errors")]
    SemanticRejected(usize),

    /// The emission machinery itself failed
    #[error(transparent)]
    Codegen(#[from] CodeGenError),
}

/// Run semantic analysis over a unit, collecting errors into `reporter`.
pub fn analyze(unit: &CompilationUnit, reporter: &Reporter) -> SemanticModel {
    log::debug!("phase: semantic analysis");
    let mut analyzer = SemanticAnalyzer::new(reporter);
    analyzer.analyze_unit(unit);
    analyzer.finish()
}

/// Run code generation over an analyzed unit.
pub fn emit<'ctx>(
    context: &'ctx Context,
    unit: &CompilationUnit,
    module_name: &str,
    model: &mut SemanticModel,
    reporter: &Reporter,
) -> Result<Module<'ctx>, CodeGenError> {
    log::debug!("phase: code generation");
    let mut emitter = CodeEmitter::new(context, module_name, model, reporter);
    emitter.emit_unit(unit)?;
    Ok(emitter.finish())
}

/// Full pipeline: analyze, gate on the error list, emit.
pub fn compile<'ctx>(
    context: &'ctx Context,
    unit: &CompilationUnit,
    module_name: &str,
    reporter: &Reporter,
) -> Result<Module<'ctx>, CompileError> {
    let mut model = analyze(unit, reporter);
    if reporter.has_errors() {
        log::debug!(
            "refusing to emit: {} semantic errors",
            reporter.error_count()
        );
        return Err(CompileError::SemanticRejected(reporter.error_count()));
    }
    Ok(emit(context, unit, module_name, &mut model, reporter)?)
}

/// Convenience wrapper producing IR text, for tools and tests that do
/// not hold an LLVM context of their own. Fails if either pass reported
/// errors; the rendered error list rides along in the failure.
pub fn compile_to_ir(unit: &CompilationUnit, module_name: &str) -> anyhow::Result<String> {
    let reporter = Reporter::new();
    let context = Context::create();
    let module = compile(&context, unit, module_name, &reporter)
        .map_err(|e| anyhow::anyhow!("{}\n{}", e, reporter.render()))?;
    if reporter.has_errors() {
        anyhow::bail!("code generation reported errors:\n{}", reporter.render());
    }
    Ok(module.print_to_string().to_string())
}
