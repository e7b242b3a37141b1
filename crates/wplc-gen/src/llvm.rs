//! The LLVM IR emission walk.
//!
//! Walks the annotated tree a second time, looking every identifier up in
//! the binding map the analyzer produced. Scalars live in stack slots
//! (`alloca` in the entry flow of their function); reads are loads,
//! writes are stores, and the emitter flips the symbol's `defined` flag
//! on every store so later reads can detect use-before-assignment.
//!
//! Control flow discipline: every construct parks the insertion point on
//! a fresh continuation block before returning, and block emission
//! reports whether the block ended in `ret` so callers suppress the
//! post-body branch. Every basic block therefore ends in exactly one
//! terminator.

use inkwell::basic_block::BasicBlock;
use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::{Linkage, Module};
use inkwell::values::{
    BasicMetadataValueEnum, BasicValueEnum, FunctionValue, PointerValue,
};
use inkwell::AddressSpace;
use rustc_hash::FxHashMap;

use wplc_sem::{SemanticModel, SymbolId, WplType};
use wplc_tree::{
    Assignment, BinOp, Block, Call, CompilationUnit, Component, Conditional, Constant,
    ConstantValue, Expr, ExternDecl, Function, Ident, Loop, Params, Procedure, Return,
    ScalarDeclaration, Select, Statement, UnaryOp,
};
use wplc_util::{CodegenErrorKind, Reporter};

use crate::error::{CodeGenError, Result};
use crate::types::TypeMapper;

/// How an emitted block (or statement) left the instruction stream.
///
/// `Returned` means a `ret` terminator was emitted; the caller must not
/// add its own branch to the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockExit {
    Returned,
    FellThrough,
}

/// The code-generation pass over one compilation unit.
pub struct CodeEmitter<'ctx, 'm> {
    context: &'ctx Context,
    module: Module<'ctx>,
    builder: Builder<'ctx>,
    types: TypeMapper<'ctx>,
    model: &'m mut SemanticModel,
    reporter: &'m Reporter,
    /// Stack or global storage allocated per symbol.
    storage: FxHashMap<SymbolId, PointerValue<'ctx>>,
}

impl<'ctx, 'm> CodeEmitter<'ctx, 'm> {
    /// Create an emitter with a fresh module. Declares the `printf`
    /// builtin so source programs can call it.
    pub fn new(
        context: &'ctx Context,
        module_name: &str,
        model: &'m mut SemanticModel,
        reporter: &'m Reporter,
    ) -> Self {
        let module = context.create_module(module_name);
        let builder = context.create_builder();
        let emitter = Self {
            context,
            module,
            builder,
            types: TypeMapper::new(context),
            model,
            reporter,
            storage: FxHashMap::default(),
        };
        emitter.declare_printf();
        emitter
    }

    /// Declare the external variadic `printf` (pointer-return).
    fn declare_printf(&self) {
        let ptr = self.context.ptr_type(AddressSpace::default());
        let printf_ty = ptr.fn_type(&[], true);
        self.module
            .add_function("printf", printf_ty, Some(Linkage::External));
    }

    /// Emit all top-level components in source order.
    pub fn emit_unit(&mut self, unit: &CompilationUnit) -> Result<()> {
        log::debug!("emitting {} top-level components", unit.components.len());
        for component in &unit.components {
            match component {
                Component::Function(f) => self.emit_function(f)?,
                Component::Procedure(p) => self.emit_procedure(p)?,
                Component::Extern(e) => self.emit_extern(e),
                Component::Var(d) => self.emit_global_declaration(d)?,
            }
        }
        Ok(())
    }

    /// Hand over the finished module.
    pub fn finish(self) -> Module<'ctx> {
        self.module
    }

    pub fn module(&self) -> &Module<'ctx> {
        &self.module
    }

    // ---- top-level components ----

    fn emit_function(&mut self, f: &Function) -> Result<()> {
        log::trace!("emitting function '{}'", f.name);
        let function = if f.name == "program" {
            // The program function is the module entry point.
            let argv_ty = self.context.ptr_type(AddressSpace::default());
            let main_ty = self.context.i32_type().fn_type(
                &[self.context.i32_type().into(), argv_ty.into()],
                false,
            );
            self.module
                .add_function("main", main_ty, Some(Linkage::External))
        } else {
            let param_types = self.param_types(f.params.as_ref());
            let fn_ty = self.types.fn_type(WplType::from(f.ret), &param_types);
            self.module
                .add_function(&f.name, fn_ty, Some(Linkage::External))
        };

        let entry = self.context.append_basic_block(function, "entry");
        self.builder.position_at_end(entry);

        if let Some(params) = &f.params {
            self.bind_params(function, params)?;
        }

        if self.emit_block(&f.body)? == BlockExit::FellThrough {
            // A body without a trailing return still needs a terminator.
            let ret = if f.name == "program" {
                WplType::Int
            } else {
                WplType::from(f.ret)
            };
            let zero = self.zero_value(ret);
            self.builder.build_return(Some(&zero))?;
        }
        Ok(())
    }

    fn emit_procedure(&mut self, p: &Procedure) -> Result<()> {
        log::trace!("emitting procedure '{}'", p.name);
        let param_types = self.param_types(p.params.as_ref());
        let proc_ty = self.context.void_type().fn_type(&param_types, false);
        let procedure = self
            .module
            .add_function(&p.name, proc_ty, Some(Linkage::External));

        let entry = self.context.append_basic_block(procedure, "entry");
        self.builder.position_at_end(entry);

        if let Some(params) = &p.params {
            self.bind_params(procedure, params)?;
        }

        if self.emit_block(&p.body)? == BlockExit::FellThrough {
            self.builder.build_return(None)?;
        }
        Ok(())
    }

    fn emit_extern(&mut self, e: &ExternDecl) {
        let param_types = self.param_types(e.params.as_ref());
        let ret = e.ret.map(WplType::from).unwrap_or(WplType::Undefined);
        let fn_ty = self.types.fn_type(ret, &param_types);
        self.module
            .add_function(&e.name, fn_ty, Some(Linkage::External));
    }

    /// A top-level scalar declaration becomes a module global; functions
    /// read and write it through the same storage map as locals.
    fn emit_global_declaration(&mut self, d: &ScalarDeclaration) -> Result<()> {
        for scalar in &d.scalars {
            let Some(sym) = self.model.bindings.get(scalar.id) else {
                self.missing_binding(scalar.span, &scalar.name);
                continue;
            };
            let ty = self.model.symbols.get(sym).ty;
            let Some(basic) = self.types.basic(ty) else {
                continue;
            };
            let name = self.model.symbols.get(sym).name.clone();
            let global = self.module.add_global(basic, None, &name);

            match &scalar.init {
                Some(init) => {
                    self.set_global_initializer(&global, init);
                    self.model.symbols.get_mut(sym).defined = true;
                }
                None => global.set_initializer(&self.zero_value(ty)),
            }
            self.storage.insert(sym, global.as_pointer_value());
        }
        Ok(())
    }

    fn set_global_initializer(&self, global: &inkwell::values::GlobalValue<'ctx>, init: &Constant) {
        match &init.value {
            ConstantValue::Bool(b) => {
                global.set_initializer(&self.context.bool_type().const_int(*b as u64, false));
            }
            ConstantValue::Int(i) => {
                global.set_initializer(&self.context.i32_type().const_int(*i as u64, true));
            }
            ConstantValue::Str(raw) => {
                let text = unescape_string(raw);
                let data = self.context.const_string(text.as_bytes(), true);
                let backing =
                    self.module
                        .add_global(data.get_type(), None, &format!("{}.str", global.get_name().to_string_lossy()));
                backing.set_initializer(&data);
                backing.set_constant(true);
                global.set_initializer(&backing.as_pointer_value());
            }
        }
    }

    /// Collect the LLVM parameter types of a header.
    fn param_types(
        &self,
        params: Option<&Params>,
    ) -> Vec<inkwell::types::BasicMetadataTypeEnum<'ctx>> {
        params
            .map(|p| p.types.iter().map(|t| self.types.from_spec(*t).into()).collect())
            .unwrap_or_default()
    }

    /// Give every parameter a stack slot and store the incoming SSA
    /// argument into it; parameter symbols are then indistinguishable
    /// from locals.
    fn bind_params(&mut self, function: FunctionValue<'ctx>, params: &Params) -> Result<()> {
        for (i, ident) in params.names.iter().enumerate() {
            let Some(sym) = self.model.bindings.get(ident.id) else {
                self.missing_binding(ident.span, &ident.name);
                continue;
            };
            let ty = self.model.symbols.get(sym).ty;
            let Some(basic) = self.types.basic(ty) else {
                continue;
            };
            let name = self.model.symbols.get(sym).name.clone();
            let slot = self.builder.build_alloca(basic, &name)?;
            self.storage.insert(sym, slot);

            let Some(arg) = function.get_nth_param(i as u32) else {
                return Err(CodeGenError::Internal(format!(
                    "missing incoming argument {} for parameter {}",
                    i, name
                )));
            };
            self.builder.build_store(slot, arg)?;
            self.model.symbols.get_mut(sym).defined = true;
        }
        Ok(())
    }

    // ---- statements ----

    /// Emit a block's statements. Emission stops at the first statement
    /// that returned: the block already has its terminator.
    fn emit_block(&mut self, block: &Block) -> Result<BlockExit> {
        let mut exit = BlockExit::FellThrough;
        for statement in &block.statements {
            exit = self.emit_statement(statement)?;
            if exit == BlockExit::Returned {
                break;
            }
        }
        Ok(exit)
    }

    fn emit_statement(&mut self, statement: &Statement) -> Result<BlockExit> {
        match statement {
            Statement::Assignment(a) => {
                self.emit_assignment(a)?;
                Ok(BlockExit::FellThrough)
            }
            Statement::Loop(l) => {
                self.emit_loop(l)?;
                Ok(BlockExit::FellThrough)
            }
            Statement::Select(s) => {
                self.emit_select(s)?;
                Ok(BlockExit::FellThrough)
            }
            Statement::Conditional(c) => {
                self.emit_conditional(c)?;
                Ok(BlockExit::FellThrough)
            }
            Statement::Call(c) => {
                let _ = self.emit_call(c)?;
                Ok(BlockExit::FellThrough)
            }
            Statement::Block(b) => self.emit_block(b),
            Statement::Return(r) => {
                self.emit_return(r)?;
                Ok(BlockExit::Returned)
            }
            Statement::Var(d) => {
                self.emit_scalar_declaration(d)?;
                Ok(BlockExit::FellThrough)
            }
        }
    }

    fn emit_scalar_declaration(&mut self, d: &ScalarDeclaration) -> Result<()> {
        for scalar in &d.scalars {
            let Some(sym) = self.model.bindings.get(scalar.id) else {
                self.missing_binding(scalar.span, &scalar.name);
                continue;
            };
            let ty = self.model.symbols.get(sym).ty;
            let Some(basic) = self.types.basic(ty) else {
                continue;
            };
            let name = self.model.symbols.get(sym).name.clone();
            let slot = self.builder.build_alloca(basic, &name)?;
            self.storage.insert(sym, slot);

            if let Some(init) = &scalar.init {
                let value = self.emit_constant(init)?;
                self.builder.build_store(slot, value)?;
                self.model.symbols.get_mut(sym).defined = true;
            }
        }
        Ok(())
    }

    fn emit_assignment(&mut self, a: &Assignment) -> Result<()> {
        for (target, expr) in a.targets.iter().zip(a.exprs.iter()) {
            let Some(sym) = self.model.bindings.get(target.id) else {
                self.missing_binding(target.span, &target.name);
                continue;
            };
            let value = self.emit_expr(expr)?;
            let Some(slot) = self.storage.get(&sym).copied() else {
                let name = self.model.symbols.get(sym).name.clone();
                self.reporter.add_codegen_error(
                    target.span,
                    CodegenErrorKind::MissingStorage,
                    format!("no llvm value for symbol {}", name),
                );
                continue;
            };
            self.builder.build_store(slot, value)?;
            self.model.symbols.get_mut(sym).defined = true;
        }
        Ok(())
    }

    fn emit_return(&mut self, r: &Return) -> Result<()> {
        match &r.value {
            Some(value) => {
                let v = self.emit_expr(value)?;
                self.builder.build_return(Some(&v))?;
            }
            None => {
                self.builder.build_return(None)?;
            }
        }
        Ok(())
    }

    /// Conditional: branch over `truebloc` (and `falsebloc` when an else
    /// is present) into `bContinue`, which the insertion point is left on.
    fn emit_conditional(&mut self, c: &Conditional) -> Result<()> {
        let function = self.current_function()?;

        let true_block = self.context.append_basic_block(function, "truebloc");
        let false_block = c
            .no
            .as_ref()
            .map(|_| self.context.append_basic_block(function, "falsebloc"));
        let continue_block = self.context.append_basic_block(function, "bContinue");

        let cond = self.emit_expr(&c.cond)?.into_int_value();
        self.builder.build_conditional_branch(
            cond,
            true_block,
            false_block.unwrap_or(continue_block),
        )?;

        self.builder.position_at_end(true_block);
        if self.emit_block(&c.yes)? == BlockExit::FellThrough {
            self.builder.build_unconditional_branch(continue_block)?;
        }

        if let (Some(no), Some(false_block)) = (&c.no, false_block) {
            self.builder.position_at_end(false_block);
            if self.emit_block(no)? == BlockExit::FellThrough {
                self.builder.build_unconditional_branch(continue_block)?;
            }
        }

        self.builder.position_at_end(continue_block);
        Ok(())
    }

    /// Loop: `condbloc` re-evaluates the condition, `loopbloc` runs the
    /// body and jumps back, `continuebloc` is the exit.
    fn emit_loop(&mut self, l: &Loop) -> Result<()> {
        let function = self.current_function()?;

        let cond_block = self.context.append_basic_block(function, "condbloc");
        let body_block = self.context.append_basic_block(function, "loopbloc");
        let continue_block = self.context.append_basic_block(function, "continuebloc");

        self.builder.build_unconditional_branch(cond_block)?;
        self.builder.position_at_end(cond_block);
        let cond = self.emit_expr(&l.cond)?.into_int_value();
        self.builder
            .build_conditional_branch(cond, body_block, continue_block)?;

        self.builder.position_at_end(body_block);
        if self.emit_block(&l.body)? == BlockExit::FellThrough {
            self.builder.build_unconditional_branch(cond_block)?;
        }

        self.builder.position_at_end(continue_block);
        Ok(())
    }

    /// Select: guard i is evaluated in the current block and branches to
    /// its `selectbloc` or on to the next guard's `condbloc`; the final
    /// cond block falls through to `continue` when every guard is false.
    fn emit_select(&mut self, s: &Select) -> Result<()> {
        let function = self.current_function()?;

        let mut arm_blocks: Vec<BasicBlock<'ctx>> = Vec::with_capacity(s.alts.len());
        for alt in &s.alts {
            let yes_block = self.context.append_basic_block(function, "selectbloc");
            let cond_block = self.context.append_basic_block(function, "condbloc");
            let guard = self.emit_expr(&alt.guard)?.into_int_value();
            self.builder
                .build_conditional_branch(guard, yes_block, cond_block)?;
            self.builder.position_at_end(cond_block);
            arm_blocks.push(yes_block);
        }

        let continue_block = self.context.append_basic_block(function, "continue");
        self.builder.build_unconditional_branch(continue_block)?;

        for (alt, yes_block) in s.alts.iter().zip(arm_blocks) {
            self.builder.position_at_end(yes_block);
            if self.emit_statement(&alt.body)? == BlockExit::FellThrough {
                self.builder.build_unconditional_branch(continue_block)?;
            }
        }

        self.builder.position_at_end(continue_block);
        Ok(())
    }

    /// Emit a call; `None` when the callee produced no value (void) or
    /// could not be resolved.
    fn emit_call(&mut self, call: &Call) -> Result<Option<BasicValueEnum<'ctx>>> {
        let Some(callee) = self.module.get_function(&call.callee) else {
            self.reporter.add_codegen_error(
                call.span,
                CodegenErrorKind::UnknownCallee,
                format!("no definition found for function {}", call.callee),
            );
            return Ok(None);
        };

        let mut args: Vec<BasicMetadataValueEnum<'ctx>> = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            args.push(self.emit_expr(arg)?.into());
        }

        let site = self.builder.build_call(callee, &args, "")?;
        Ok(site.try_as_basic_value().left())
    }

    // ---- expressions ----

    fn emit_expr(&mut self, expr: &Expr) -> Result<BasicValueEnum<'ctx>> {
        match expr {
            Expr::Constant(c) => self.emit_constant(c),
            Expr::Id(ident) => self.emit_identifier(ident),
            Expr::Paren(p) => self.emit_expr(&p.inner),
            Expr::Unary(u) => {
                let operand = self.emit_expr(&u.operand)?.into_int_value();
                let value = match u.op {
                    UnaryOp::Minus => {
                        let zero = self.context.i32_type().const_int(0, true);
                        self.builder.build_int_nsw_sub(zero, operand, "")?
                    }
                    UnaryOp::Not => self.builder.build_not(operand, "")?,
                };
                Ok(value.into())
            }
            Expr::Binary(b) => {
                let left = self.emit_expr(&b.left)?.into_int_value();
                let right = self.emit_expr(&b.right)?.into_int_value();
                let value = match b.op {
                    BinOp::Add => self.builder.build_int_nsw_add(left, right, "")?,
                    BinOp::Sub => self.builder.build_int_nsw_sub(left, right, "")?,
                    BinOp::Mul => self.builder.build_int_nsw_mul(left, right, "")?,
                    BinOp::Div => self.builder.build_int_signed_div(left, right, "")?,
                    BinOp::Less => self.builder.build_int_compare(
                        inkwell::IntPredicate::SLT,
                        left,
                        right,
                        "",
                    )?,
                    BinOp::Leq => self.builder.build_int_compare(
                        inkwell::IntPredicate::SLE,
                        left,
                        right,
                        "",
                    )?,
                    BinOp::Gtr => self.builder.build_int_compare(
                        inkwell::IntPredicate::SGT,
                        left,
                        right,
                        "",
                    )?,
                    BinOp::Geq => self.builder.build_int_compare(
                        inkwell::IntPredicate::SGE,
                        left,
                        right,
                        "",
                    )?,
                    BinOp::Equal => self.builder.build_int_compare(
                        inkwell::IntPredicate::EQ,
                        left,
                        right,
                        "",
                    )?,
                    BinOp::Neq => self.builder.build_int_compare(
                        inkwell::IntPredicate::NE,
                        left,
                        right,
                        "",
                    )?,
                    BinOp::And => self.builder.build_and(left, right, "")?,
                    BinOp::Or => self.builder.build_or(left, right, "")?,
                };
                Ok(value.into())
            }
            Expr::Call(c) => {
                let value = self.emit_call(c)?;
                Ok(value.unwrap_or_else(|| self.zero_value(WplType::Int)))
            }
        }
    }

    fn emit_identifier(&mut self, ident: &Ident) -> Result<BasicValueEnum<'ctx>> {
        let Some(sym) = self.model.bindings.get(ident.id) else {
            self.missing_binding(ident.span, &ident.name);
            return Ok(self.zero_value(WplType::Int));
        };

        let symbol = self.model.symbols.get(sym);
        let ty = symbol.ty;
        let name = symbol.name.clone();

        if !symbol.defined {
            self.reporter.add_codegen_error(
                ident.span,
                CodegenErrorKind::UseOfUndefined,
                format!("symbol {} has not been defined", name),
            );
            return Ok(self.zero_value(ty));
        }

        let Some(slot) = self.storage.get(&sym).copied() else {
            self.reporter.add_codegen_error(
                ident.span,
                CodegenErrorKind::MissingStorage,
                format!("no llvm value for symbol {}", name),
            );
            return Ok(self.zero_value(ty));
        };

        let Some(basic) = self.types.basic(ty) else {
            return Ok(self.zero_value(WplType::Int));
        };
        Ok(self.builder.build_load(basic, slot, &name)?)
    }

    fn emit_constant(&mut self, constant: &Constant) -> Result<BasicValueEnum<'ctx>> {
        match &constant.value {
            ConstantValue::Bool(b) => Ok(self
                .context
                .bool_type()
                .const_int(*b as u64, false)
                .into()),
            ConstantValue::Int(i) => Ok(self
                .context
                .i32_type()
                .const_int(*i as u64, true)
                .into()),
            ConstantValue::Str(raw) => {
                let text = unescape_string(raw);
                let global = self.builder.build_global_string_ptr(&text, "")?;
                Ok(global.as_pointer_value().into())
            }
        }
    }

    // ---- helpers ----

    /// Synthesized value standing in for a failed emission.
    fn zero_value(&self, ty: WplType) -> BasicValueEnum<'ctx> {
        match ty {
            WplType::Bool => self.context.bool_type().const_int(0, false).into(),
            WplType::Str => self
                .context
                .ptr_type(AddressSpace::default())
                .const_null()
                .into(),
            WplType::Int | WplType::Undefined => {
                self.context.i32_type().const_int(0, true).into()
            }
        }
    }

    fn current_function(&self) -> Result<FunctionValue<'ctx>> {
        self.builder
            .get_insert_block()
            .and_then(|block| block.get_parent())
            .ok_or(CodeGenError::NoInsertionBlock)
    }

    fn missing_binding(&self, span: wplc_util::Span, name: &str) {
        self.reporter.add_codegen_error(
            span,
            CodegenErrorKind::MissingBinding,
            format!("no symbol created for {}", name),
        );
    }
}

/// Strip the quotation marks the parse-tree text serialization adds and
/// rewrite literal `\n` pairs into newline bytes. A trailing bare
/// backslash passes through unchanged (unspecified input).
fn unescape_string(raw: &str) -> String {
    let inner = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw);

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&'n') {
            chars.next();
            out.push('\n');
        } else {
            out.push(c);
        }
    }
    out
}
