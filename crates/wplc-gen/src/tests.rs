//! Emitter tests over analyzer-annotated trees.

use inkwell::context::Context;

use wplc_sem::{SemanticAnalyzer, SemanticModel};
use wplc_tree::{
    Assignment, BinOp, Block, Call, CompilationUnit, Component, Conditional, Constant, Expr,
    ExternDecl, Function, Ident, NodeIdGen, Procedure, Return, Scalar, ScalarDeclaration,
    Statement, TypeSpec,
};
use wplc_util::{CodegenErrorKind, ErrorKind, Reporter, Span};

use crate::llvm::CodeEmitter;

fn analyze(unit: &CompilationUnit, reporter: &Reporter) -> SemanticModel {
    let mut analyzer = SemanticAnalyzer::new(reporter);
    analyzer.analyze_unit(unit);
    analyzer.finish()
}

fn emit_ir(unit: &CompilationUnit, reporter: &Reporter) -> String {
    let context = Context::create();
    let mut model = analyze(unit, reporter);
    let mut emitter = CodeEmitter::new(&context, "test", &mut model, reporter);
    emitter.emit_unit(unit).expect("emission failed");
    let module = emitter.finish();
    module.verify().expect("module failed verification");
    module.print_to_string().to_string()
}

fn program(ids: &NodeIdGen, statements: Vec<Statement>) -> CompilationUnit {
    CompilationUnit {
        components: vec![Component::Function(Function {
            id: ids.fresh(),
            name: "program".to_string(),
            params: None,
            ret: TypeSpec::Int,
            body: Block {
                statements,
                span: Span::DUMMY,
            },
            span: Span::DUMMY,
        })],
    }
}

fn int_decl(ids: &NodeIdGen, name: &str, value: i32) -> Statement {
    Statement::Var(ScalarDeclaration {
        ty: TypeSpec::Int,
        scalars: vec![Scalar {
            id: ids.fresh(),
            name: name.to_string(),
            init: Some(Constant::int(ids, value, Span::DUMMY)),
            span: Span::DUMMY,
        }],
        span: Span::DUMMY,
    })
}

fn return_ident(ids: &NodeIdGen, name: &str) -> Statement {
    Statement::Return(Return {
        value: Some(Expr::ident(ids, name, Span::DUMMY)),
        span: Span::DUMMY,
    })
}

#[test]
fn test_program_becomes_main() {
    let ids = NodeIdGen::new();
    let unit = program(
        &ids,
        vec![Statement::Return(Return {
            value: Some(Expr::int(&ids, 0, Span::DUMMY)),
            span: Span::DUMMY,
        })],
    );

    let reporter = Reporter::new();
    let ir = emit_ir(&unit, &reporter);
    assert!(!reporter.has_errors());
    assert!(ir.contains("declare ptr @printf(...)"));
    assert!(ir.contains("define i32 @main(i32"));
    assert!(ir.contains("ret i32 0"));
}

#[test]
fn test_declaration_assignment_roundtrip() {
    let ids = NodeIdGen::new();
    let add = Expr::binary(
        &ids,
        BinOp::Add,
        Expr::ident(&ids, "x", Span::DUMMY),
        Expr::int(&ids, 4, Span::DUMMY),
        Span::DUMMY,
    );
    let unit = program(
        &ids,
        vec![
            int_decl(&ids, "x", 3),
            Statement::Assignment(Assignment {
                targets: vec![Ident::new(&ids, "x", Span::DUMMY)],
                exprs: vec![add],
                span: Span::DUMMY,
            }),
            return_ident(&ids, "x"),
        ],
    );

    let reporter = Reporter::new();
    let ir = emit_ir(&unit, &reporter);
    assert!(!reporter.has_errors());
    assert!(ir.contains("%x = alloca i32"));
    assert!(ir.contains("store i32 3, ptr %x"));
    assert!(ir.contains("add nsw i32"));
}

#[test]
fn test_conditional_block_names() {
    let ids = NodeIdGen::new();
    let cond = Expr::binary(
        &ids,
        BinOp::Equal,
        Expr::ident(&ids, "x", Span::DUMMY),
        Expr::int(&ids, 0, Span::DUMMY),
        Span::DUMMY,
    );
    let unit = program(
        &ids,
        vec![
            int_decl(&ids, "x", 0),
            Statement::Conditional(Conditional {
                cond,
                yes: Block {
                    statements: vec![Statement::Assignment(Assignment {
                        targets: vec![Ident::new(&ids, "x", Span::DUMMY)],
                        exprs: vec![Expr::int(&ids, 1, Span::DUMMY)],
                        span: Span::DUMMY,
                    })],
                    span: Span::DUMMY,
                },
                no: None,
                span: Span::DUMMY,
            }),
            return_ident(&ids, "x"),
        ],
    );

    let reporter = Reporter::new();
    let ir = emit_ir(&unit, &reporter);
    assert!(!reporter.has_errors());
    assert!(ir.contains("truebloc:"));
    assert!(ir.contains("bContinue:"));
    assert!(!ir.contains("falsebloc:"));
}

#[test]
fn test_use_of_undefined_symbol_reports() {
    let ids = NodeIdGen::new();
    let decl = Statement::Var(ScalarDeclaration {
        ty: TypeSpec::Int,
        scalars: vec![Scalar {
            id: ids.fresh(),
            name: "x".to_string(),
            init: None,
            span: Span::DUMMY,
        }],
        span: Span::DUMMY,
    });
    let unit = program(&ids, vec![decl, return_ident(&ids, "x")]);

    let reporter = Reporter::new();
    let _ir = emit_ir(&unit, &reporter);

    let errors = reporter.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].kind,
        ErrorKind::Codegen(CodegenErrorKind::UseOfUndefined)
    );
}

#[test]
fn test_string_constant_is_unescaped() {
    let ids = NodeIdGen::new();
    let call = Statement::Call(Call {
        id: ids.fresh(),
        callee: "printf".to_string(),
        args: vec![Expr::str(&ids, "\"hi\\n\"", Span::DUMMY)],
        span: Span::DUMMY,
    });
    let ret = Statement::Return(Return {
        value: Some(Expr::int(&ids, 0, Span::DUMMY)),
        span: Span::DUMMY,
    });
    let unit = program(&ids, vec![call, ret]);

    let reporter = Reporter::new();
    let ir = emit_ir(&unit, &reporter);
    assert!(!reporter.has_errors());
    // Quotes stripped, \n rewritten to the newline byte (0A), nul added.
    assert!(ir.contains("c\"hi\\0A\\00\""));
    assert!(ir.contains("call ptr (...) @printf"));
}

#[test]
fn test_procedure_gets_void_return() {
    let ids = NodeIdGen::new();
    let unit = CompilationUnit {
        components: vec![Component::Procedure(Procedure {
            id: ids.fresh(),
            name: "noop".to_string(),
            params: None,
            body: Block {
                statements: vec![],
                span: Span::DUMMY,
            },
            span: Span::DUMMY,
        })],
    };

    let reporter = Reporter::new();
    let ir = emit_ir(&unit, &reporter);
    assert!(!reporter.has_errors());
    assert!(ir.contains("define void @noop()"));
    assert!(ir.contains("ret void"));
}

#[test]
fn test_extern_emits_declaration_only() {
    let ids = NodeIdGen::new();
    let unit = CompilationUnit {
        components: vec![Component::Extern(ExternDecl {
            id: ids.fresh(),
            name: "getchar".to_string(),
            params: None,
            ret: Some(TypeSpec::Int),
            span: Span::DUMMY,
        })],
    };

    let reporter = Reporter::new();
    let ir = emit_ir(&unit, &reporter);
    assert!(!reporter.has_errors());
    assert!(ir.contains("declare i32 @getchar()"));
    assert!(!ir.contains("define i32 @getchar"));
}

#[test]
fn test_unknown_callee_reports_and_continues() {
    // Bypass the analyzer gate deliberately: bind a call to a function
    // the module never defines by erasing the symbol table entry side.
    let ids = NodeIdGen::new();
    let unit = program(
        &ids,
        vec![
            Statement::Call(Call {
                id: ids.fresh(),
                callee: "phantom".to_string(),
                args: vec![],
                span: Span::DUMMY,
            }),
            Statement::Return(Return {
                value: Some(Expr::int(&ids, 0, Span::DUMMY)),
                span: Span::DUMMY,
            }),
        ],
    );

    // The analyzer reports the undeclared callee; run the emitter anyway
    // to observe its own resolution failure.
    let analysis_reporter = Reporter::new();
    let mut model = analyze(&unit, &analysis_reporter);

    let emit_reporter = Reporter::new();
    let context = Context::create();
    let mut emitter = CodeEmitter::new(&context, "test", &mut model, &emit_reporter);
    emitter.emit_unit(&unit).expect("emission failed");

    let errors = emit_reporter.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].kind,
        ErrorKind::Codegen(CodegenErrorKind::UnknownCallee)
    );
}

#[test]
fn test_top_level_declaration_becomes_global() {
    let ids = NodeIdGen::new();
    let global = Component::Var(ScalarDeclaration {
        ty: TypeSpec::Int,
        scalars: vec![Scalar {
            id: ids.fresh(),
            name: "counter".to_string(),
            init: Some(Constant::int(&ids, 7, Span::DUMMY)),
            span: Span::DUMMY,
        }],
        span: Span::DUMMY,
    });
    let mut unit = program(&ids, vec![return_ident(&ids, "counter")]);
    unit.components.insert(0, global);

    let reporter = Reporter::new();
    let ir = emit_ir(&unit, &reporter);
    assert!(!reporter.has_errors());
    assert!(ir.contains("@counter = global i32 7"));
}
