//! The semantic analysis walk.
//!
//! One pass over the parse tree. Declarations create symbols in the
//! current scope frame, identifier uses are bound to the innermost
//! visible symbol, and every expression is typed against the rules of
//! the language. The policy throughout is check-and-continue: a
//! violation is reported once and the walk keeps going with the type the
//! context expected, so diagnostics do not cascade. `Undefined` marks an
//! already-poisoned operand and never re-raises against concrete types.

use wplc_tree::{
    Assignment, BinOp, Block, Call, CompilationUnit, Component, Conditional, Constant,
    ConstantValue, ExternDecl, Function, Ident, Loop, Params, Procedure, Return,
    ScalarDeclaration, Select, Statement, UnaryOp, Expr,
};
use wplc_util::{Reporter, SemanticErrorKind, Span};

use crate::scope::ScopeManager;
use crate::symbol::{Bindings, SemanticModel};
use crate::types::WplType;

/// Name of the variadic print builtin the emitter declares in every
/// module. Seeded into the root scope so source programs may call it.
const PRINTF: &str = "printf";

/// The semantic analyzer pass.
pub struct SemanticAnalyzer<'a> {
    scopes: ScopeManager,
    bindings: Bindings,
    reporter: &'a Reporter,
}

impl<'a> SemanticAnalyzer<'a> {
    pub fn new(reporter: &'a Reporter) -> Self {
        let mut scopes = ScopeManager::new();
        let _ = scopes.add(PRINTF, WplType::Undefined);
        Self {
            scopes,
            bindings: Bindings::new(),
            reporter,
        }
    }

    /// Analyze a whole compilation unit, top-level components in source
    /// order.
    pub fn analyze_unit(&mut self, unit: &CompilationUnit) {
        log::debug!("analyzing {} top-level components", unit.components.len());
        for component in &unit.components {
            match component {
                Component::Function(f) => self.analyze_function(f),
                Component::Procedure(p) => self.analyze_procedure(p),
                Component::Extern(e) => self.analyze_extern(e),
                Component::Var(d) => self.analyze_scalar_declaration(d),
            }
        }
    }

    /// Release the scope frames and hand over the analysis results.
    pub fn finish(self) -> SemanticModel {
        SemanticModel {
            symbols: self.scopes.into_symbols(),
            bindings: self.bindings,
        }
    }

    // ---- declarations ----

    fn analyze_function(&mut self, f: &Function) {
        log::trace!("analyzing function '{}'", f.name);
        let ret = WplType::from(f.ret);

        self.scopes.enter();
        if let Some(params) = &f.params {
            self.declare_params(params);
        }
        self.analyze_block(&f.body);
        self.scopes.exit();

        match self.scopes.add(&f.name, ret) {
            Some(sym) => self.bindings.bind(f.id, sym),
            None => self.reporter.add_semantic_error(
                f.span,
                SemanticErrorKind::DuplicateInScope,
                format!("function redefinition: {}", f.name),
            ),
        }
    }

    fn analyze_procedure(&mut self, p: &Procedure) {
        log::trace!("analyzing procedure '{}'", p.name);

        self.scopes.enter();
        if let Some(params) = &p.params {
            self.declare_params(params);
        }
        self.analyze_block(&p.body);
        self.scopes.exit();

        match self.scopes.add(&p.name, WplType::Undefined) {
            Some(sym) => self.bindings.bind(p.id, sym),
            None => self.reporter.add_semantic_error(
                p.span,
                SemanticErrorKind::DuplicateInScope,
                format!("procedure redefinition: {}", p.name),
            ),
        }
    }

    fn analyze_extern(&mut self, e: &ExternDecl) {
        let ret = e.ret.map(WplType::from).unwrap_or(WplType::Undefined);
        match self.scopes.add(&e.name, ret) {
            Some(sym) => self.bindings.bind(e.id, sym),
            None => self.reporter.add_semantic_error(
                e.span,
                SemanticErrorKind::DuplicateInScope,
                format!("extern redeclaration: {}", e.name),
            ),
        }
    }

    fn declare_params(&mut self, params: &Params) {
        for (spec, ident) in params.types.iter().zip(params.names.iter()) {
            let ty = WplType::from(*spec);
            match self.scopes.add(&ident.name, ty) {
                Some(sym) => self.bindings.bind(ident.id, sym),
                None => self.reporter.add_semantic_error(
                    ident.span,
                    SemanticErrorKind::DuplicateInScope,
                    format!("variable redeclaration: {}", ident.name),
                ),
            }
        }
    }

    fn analyze_scalar_declaration(&mut self, d: &ScalarDeclaration) {
        let declared = WplType::from(d.ty);
        for scalar in &d.scalars {
            if let Some(init) = &scalar.init {
                let found = constant_type(init);
                if found.is_concrete() && found != declared {
                    self.reporter.add_semantic_error(
                        scalar.span,
                        SemanticErrorKind::TypeMismatch,
                        format!(
                            "scalar declaration type mismatch. expected type {}, got type {} ({})",
                            declared,
                            found,
                            constant_text(init)
                        ),
                    );
                }
            }
            match self.scopes.add(&scalar.name, declared) {
                Some(sym) => self.bindings.bind(scalar.id, sym),
                None => self.reporter.add_semantic_error(
                    scalar.span,
                    SemanticErrorKind::DuplicateInScope,
                    format!("variable redeclaration: {}", scalar.name),
                ),
            }
        }
    }

    // ---- statements ----

    fn analyze_block(&mut self, block: &Block) {
        self.scopes.enter();
        for statement in &block.statements {
            self.analyze_statement(statement);
        }
        self.scopes.exit();
    }

    fn analyze_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Assignment(a) => self.analyze_assignment(a),
            Statement::Loop(l) => self.analyze_loop(l),
            Statement::Select(s) => self.analyze_select(s),
            Statement::Conditional(c) => self.analyze_conditional(c),
            Statement::Call(c) => {
                self.analyze_call(c);
            }
            Statement::Block(b) => self.analyze_block(b),
            Statement::Return(r) => self.analyze_return(r),
            Statement::Var(d) => self.analyze_scalar_declaration(d),
        }
    }

    fn analyze_assignment(&mut self, a: &Assignment) {
        if a.targets.len() != a.exprs.len() {
            self.reporter.add_semantic_error(
                a.span,
                SemanticErrorKind::ArityMismatch,
                format!(
                    "assignment count mismatch: {} targets, {} expressions",
                    a.targets.len(),
                    a.exprs.len()
                ),
            );
            return;
        }

        for (target, expr) in a.targets.iter().zip(a.exprs.iter()) {
            let Some(sym) = self.scopes.find(&target.name) else {
                self.reporter.add_semantic_error(
                    target.span,
                    SemanticErrorKind::Undeclared,
                    format!("undeclared variable in assignment: {}", target.name),
                );
                continue;
            };

            self.bindings.bind(target.id, sym);

            let found = self.analyze_expr(expr);
            let symbol = self.scopes.symbol_mut(sym);
            if symbol.ty == WplType::Undefined {
                // First assignment infers the variable's type.
                if found.is_concrete() {
                    symbol.ty = found;
                }
            } else if found.is_concrete() && found != symbol.ty {
                let expected = symbol.ty;
                self.reporter.add_semantic_error(
                    expr.span(),
                    SemanticErrorKind::TypeMismatch,
                    format!(
                        "assignment type mismatch. expected type {}, got type {}",
                        expected, found
                    ),
                );
            }
        }
    }

    fn analyze_loop(&mut self, l: &Loop) {
        let cond = self.analyze_expr(&l.cond);
        self.require_bool(cond, l.cond.span(), "loop condition");
        self.analyze_block(&l.body);
    }

    fn analyze_conditional(&mut self, c: &Conditional) {
        let cond = self.analyze_expr(&c.cond);
        self.require_bool(cond, c.cond.span(), "conditional expression");
        self.analyze_block(&c.yes);
        if let Some(no) = &c.no {
            self.analyze_block(no);
        }
    }

    fn analyze_select(&mut self, s: &Select) {
        for alt in &s.alts {
            let guard = self.analyze_expr(&alt.guard);
            self.require_bool(guard, alt.guard.span(), "select guard");
            self.analyze_statement(&alt.body);
        }
    }

    fn analyze_return(&mut self, r: &Return) {
        // Matching the value against the enclosing function's declared
        // return type is intentionally unimplemented.
        if let Some(value) = &r.value {
            self.analyze_expr(value);
        }
    }

    /// Analyze a call in statement or expression position; the result is
    /// the callee's recorded type (`Undefined` for procedures).
    ///
    /// Argument arity and argument types are not checked against the
    /// callee; that check is future work.
    fn analyze_call(&mut self, call: &Call) -> WplType {
        let callee = self.scopes.find(&call.callee);
        if callee.is_none() {
            self.reporter.add_semantic_error(
                call.span,
                SemanticErrorKind::Undeclared,
                format!("undeclared function or procedure: {}", call.callee),
            );
        }
        for arg in &call.args {
            self.analyze_expr(arg);
        }
        callee
            .map(|sym| self.scopes.symbol(sym).ty)
            .unwrap_or(WplType::Undefined)
    }

    // ---- expressions ----

    fn analyze_expr(&mut self, expr: &Expr) -> WplType {
        match expr {
            Expr::Constant(c) => constant_type(c),
            Expr::Id(ident) => self.analyze_identifier(ident),
            Expr::Paren(p) => self.analyze_expr(&p.inner),
            Expr::Unary(u) => {
                let operand = self.analyze_expr(&u.operand);
                match u.op {
                    UnaryOp::Minus => {
                        if operand.is_concrete() && operand != WplType::Int {
                            self.reporter.add_semantic_error(
                                u.span,
                                SemanticErrorKind::OperandType,
                                format!("INT expression expected, but was {}", operand),
                            );
                        }
                        WplType::Int
                    }
                    UnaryOp::Not => {
                        if operand.is_concrete() && operand != WplType::Bool {
                            self.reporter.add_semantic_error(
                                u.span,
                                SemanticErrorKind::OperandType,
                                format!("BOOL expression expected, but was {}", operand),
                            );
                        }
                        WplType::Bool
                    }
                }
            }
            Expr::Binary(b) => {
                let left = self.analyze_expr(&b.left);
                let right = self.analyze_expr(&b.right);
                self.check_binary(b.op, left, right, b.span)
            }
            Expr::Call(c) => self.analyze_call(c),
        }
    }

    fn analyze_identifier(&mut self, ident: &Ident) -> WplType {
        match self.scopes.find(&ident.name) {
            Some(sym) => {
                self.bindings.bind(ident.id, sym);
                self.scopes.symbol(sym).ty
            }
            None => {
                self.reporter.add_semantic_error(
                    ident.span,
                    SemanticErrorKind::Undeclared,
                    format!("undeclared variable in expression: {}", ident.name),
                );
                WplType::Undefined
            }
        }
    }

    /// Enforce the operand rule for a binary operator and give back the
    /// operator's nominal result type regardless of violations.
    fn check_binary(&mut self, op: BinOp, left: WplType, right: WplType, span: Span) -> WplType {
        if op.is_arithmetic() || op.is_relational() {
            if left.is_concrete() && left != WplType::Int {
                self.reporter.add_semantic_error(
                    span,
                    SemanticErrorKind::OperandType,
                    format!("INT left expression expected, but was {}", left),
                );
            }
            if right.is_concrete() && right != WplType::Int {
                self.reporter.add_semantic_error(
                    span,
                    SemanticErrorKind::OperandType,
                    format!("INT right expression expected, but was {}", right),
                );
            }
            if op.is_arithmetic() {
                WplType::Int
            } else {
                WplType::Bool
            }
        } else if op.is_equality() {
            if left.is_concrete() && right.is_concrete() && left != right {
                self.reporter.add_semantic_error(
                    span,
                    SemanticErrorKind::OperandType,
                    "both sides of an equality must have the same type",
                );
            }
            WplType::Bool
        } else {
            // Logical connectives.
            if left.is_concrete() && left != WplType::Bool {
                self.reporter.add_semantic_error(
                    span,
                    SemanticErrorKind::OperandType,
                    format!("BOOL left expression expected, but was {}", left),
                );
            }
            if right.is_concrete() && right != WplType::Bool {
                self.reporter.add_semantic_error(
                    span,
                    SemanticErrorKind::OperandType,
                    format!("BOOL right expression expected, but was {}", right),
                );
            }
            WplType::Bool
        }
    }

    fn require_bool(&mut self, ty: WplType, span: Span, what: &str) {
        if ty.is_concrete() && ty != WplType::Bool {
            self.reporter.add_semantic_error(
                span,
                SemanticErrorKind::ConditionType,
                format!("{} must be BOOL, but was {}", what, ty),
            );
        }
    }
}

/// Type of a literal by its kind.
fn constant_type(constant: &Constant) -> WplType {
    match constant.value {
        ConstantValue::Bool(_) => WplType::Bool,
        ConstantValue::Int(_) => WplType::Int,
        ConstantValue::Str(_) => WplType::Str,
    }
}

/// Literal text for diagnostics.
fn constant_text(constant: &Constant) -> String {
    match &constant.value {
        ConstantValue::Bool(b) => b.to_string(),
        ConstantValue::Int(i) => i.to_string(),
        ConstantValue::Str(s) => s.clone(),
    }
}
