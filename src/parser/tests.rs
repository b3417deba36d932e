//! Unit tests for the parser module.
//!
//! This module contains tests for parsing various language constructs including:
//! - Assignments in every spelling
//! - Function declarations and lambdas
//! - Expressions and precedence
//! - Control flow statements
//! - Syntax errors

use super::parser::parse;
use crate::{
    ast::{
        ast::Program,
        expressions::{BinaryOp, ExprKind, LambdaBody, UnaryOp},
        statements::{AssignForm, StmtKind},
        types::TypeAnnotation,
    },
    errors::errors::Error,
    lexer::lexer::tokenize,
};

fn parse_source(source: &str) -> Result<Program, Error> {
    let tokens = tokenize(source.to_string(), Some("test.list".to_string())).unwrap();
    parse(tokens)
}

#[test]
fn test_parse_assignment() {
    let program = parse_source("x = 42;").unwrap();

    match &program.body[0].kind {
        StmtKind::Assign { target, value, form } => {
            assert_eq!(target, "x");
            assert_eq!(value.kind, ExprKind::Number(42.0));
            assert_eq!(*form, AssignForm::Plain);
        }
        other => panic!("expected assignment, got {:?}", other),
    }
}

#[test]
fn test_parse_arrow_assignments() {
    let program = parse_source("x <- 1; 2 -> y;").unwrap();

    assert!(matches!(
        &program.body[0].kind,
        StmtKind::Assign { target, form: AssignForm::LeftArrow, .. } if target == "x"
    ));
    assert!(matches!(
        &program.body[1].kind,
        StmtKind::Assign { target, form: AssignForm::RightArrow, .. } if target == "y"
    ));
}

#[test]
fn test_parse_multi_assignment() {
    let program = parse_source("a, b = b, a;").unwrap();

    match &program.body[0].kind {
        StmtKind::MultiAssign { targets, values } => {
            assert_eq!(targets, &vec!["a".to_string(), "b".to_string()]);
            assert_eq!(values.len(), 2);
            assert_eq!(values[0].as_identifier(), Some("b"));
        }
        other => panic!("expected multi-assignment, got {:?}", other),
    }
}

#[test]
fn test_parse_index_and_field_assignment() {
    let program = parse_source("xs[1] = 5; p.x = 3;").unwrap();

    assert!(matches!(&program.body[0].kind, StmtKind::IndexAssign { .. }));
    assert!(matches!(
        &program.body[1].kind,
        StmtKind::FieldAssign { target, field, .. } if target == "p" && field == "x"
    ));
}

#[test]
fn test_parse_invalid_assignment_target() {
    assert!(parse_source("1 + 2 = 3;").is_err());
    assert!(parse_source("f() <- 3;").is_err());
}

#[test]
fn test_parse_function_declaration() {
    let program =
        parse_source("function add(a: number, b) -> number { return a + b; }").unwrap();

    match &program.body[0].kind {
        StmtKind::FunctionDecl(decl) => {
            assert_eq!(decl.name, "add");
            assert_eq!(decl.params.len(), 2);
            assert_eq!(decl.params[0].annotation, Some(TypeAnnotation::Number));
            assert_eq!(decl.params[1].annotation, None);
            assert_eq!(decl.return_type, Some(TypeAnnotation::Number));
            assert_eq!(decl.body.len(), 1);
        }
        other => panic!("expected function, got {:?}", other),
    }
}

#[test]
fn test_parse_nested_function_is_rejected() {
    let result = parse_source("if x { function f() { } }");

    assert!(result.is_err());
}

#[test]
fn test_parse_lambda_type_annotation() {
    let program =
        parse_source("function apply(f: lambda(string) -> string, s: string) { }").unwrap();

    match &program.body[0].kind {
        StmtKind::FunctionDecl(decl) => assert_eq!(
            decl.params[0].annotation,
            Some(TypeAnnotation::Lambda {
                params: vec![TypeAnnotation::String],
                return_type: Box::new(TypeAnnotation::String),
            })
        ),
        other => panic!("expected function, got {:?}", other),
    }
}

#[test]
fn test_parse_unknown_type_name() {
    let error = parse_source("function f(a: integer) { }").unwrap_err();

    assert_eq!(error.get_error_name(), "UnknownType");
}

#[test]
fn test_parse_lambda_literals() {
    let program = parse_source("f = lambda(x) => x * 2; g = lambda(s: string) -> string { return s; };").unwrap();

    match &program.body[0].kind {
        StmtKind::Assign { value, .. } => match &value.kind {
            ExprKind::Lambda(lambda) => {
                assert_eq!(lambda.params.len(), 1);
                assert!(matches!(lambda.body, LambdaBody::Expr(_)));
            }
            other => panic!("expected lambda, got {:?}", other),
        },
        other => panic!("expected assignment, got {:?}", other),
    }

    match &program.body[1].kind {
        StmtKind::Assign { value, .. } => match &value.kind {
            ExprKind::Lambda(lambda) => {
                assert_eq!(lambda.return_type, Some(TypeAnnotation::String));
                assert!(matches!(lambda.body, LambdaBody::Block(_)));
            }
            other => panic!("expected lambda, got {:?}", other),
        },
        other => panic!("expected assignment, got {:?}", other),
    }
}

#[test]
fn test_parse_binary_precedence() {
    let program = parse_source("x = 1 + 2 * 3 - 4;").unwrap();

    // ((1 + (2 * 3)) - 4)
    match &program.body[0].kind {
        StmtKind::Assign { value, .. } => match &value.kind {
            ExprKind::Binary { op, left, .. } => {
                assert_eq!(*op, BinaryOp::Subtract);
                assert!(matches!(
                    &left.kind,
                    ExprKind::Binary { op: BinaryOp::Add, right, .. }
                        if matches!(right.kind, ExprKind::Binary { op: BinaryOp::Multiply, .. })
                ));
            }
            other => panic!("expected binary, got {:?}", other),
        },
        other => panic!("expected assignment, got {:?}", other),
    }
}

#[test]
fn test_parse_logical_below_comparison() {
    let program = parse_source("ok = a < 1 and b > 2 or not c;").unwrap();

    match &program.body[0].kind {
        StmtKind::Assign { value, .. } => match &value.kind {
            ExprKind::Binary { op, right, .. } => {
                assert_eq!(*op, BinaryOp::Or);
                assert!(matches!(
                    right.kind,
                    ExprKind::Unary { op: UnaryOp::Not, .. }
                ));
            }
            other => panic!("expected binary, got {:?}", other),
        },
        other => panic!("expected assignment, got {:?}", other),
    }
}

#[test]
fn test_parse_unary_binds_tighter_than_binary() {
    let program = parse_source("x = -a + b;").unwrap();

    match &program.body[0].kind {
        StmtKind::Assign { value, .. } => assert!(matches!(
            &value.kind,
            ExprKind::Binary { op: BinaryOp::Add, left, .. }
                if matches!(left.kind, ExprKind::Unary { op: UnaryOp::Negate, .. })
        )),
        other => panic!("expected assignment, got {:?}", other),
    }
}

#[test]
fn test_parse_append_is_lowest() {
    let program = parse_source("xs << 1 + 2;").unwrap();

    match &program.body[0].kind {
        StmtKind::Expr(expr) => match &expr.kind {
            ExprKind::Append { list, value } => {
                assert_eq!(list.as_identifier(), Some("xs"));
                assert!(matches!(value.kind, ExprKind::Binary { op: BinaryOp::Add, .. }));
            }
            other => panic!("expected append, got {:?}", other),
        },
        other => panic!("expected expression statement, got {:?}", other),
    }
}

#[test]
fn test_parse_call_index_and_member() {
    let program = parse_source("x = f(1, 2)[0].name;").unwrap();

    match &program.body[0].kind {
        StmtKind::Assign { value, .. } => match &value.kind {
            ExprKind::Field { target, field } => {
                assert_eq!(field, "name");
                assert!(matches!(target.kind, ExprKind::Index { .. }));
            }
            other => panic!("expected field access, got {:?}", other),
        },
        other => panic!("expected assignment, got {:?}", other),
    }
}

#[test]
fn test_parse_literals() {
    let program =
        parse_source("a = \"hi\"; b = true; c = null; d = [1, 2, 3,]; e = struct { x: 1, y: 2 };")
            .unwrap();

    let values: Vec<&ExprKind> = program
        .body
        .iter()
        .map(|stmt| match &stmt.kind {
            StmtKind::Assign { value, .. } => &value.kind,
            other => panic!("expected assignment, got {:?}", other),
        })
        .collect();

    assert_eq!(values[0], &ExprKind::String("hi".to_string()));
    assert_eq!(values[1], &ExprKind::Bool(true));
    assert_eq!(values[2], &ExprKind::Null);
    assert!(matches!(values[3], ExprKind::List(items) if items.len() == 3));
    assert!(matches!(values[4], ExprKind::Struct(fields) if fields.len() == 2));
}

#[test]
fn test_parse_builtins() {
    let program = parse_source("n = len(xs); v = dequeue(xs); r = read();").unwrap();

    assert_eq!(program.body.len(), 3);
    assert!(matches!(
        &program.body[2].kind,
        StmtKind::Assign { value, .. } if value.kind == ExprKind::Read
    ));
}

#[test]
fn test_parse_control_flow() {
    let source = r#"
        if x > 0 { write("positive"); } else if x < 0 { write("negative"); } else { write("zero"); }
        while x < 10 { x = x + 1; if x == 5 { break; } continue; }
        do { x = x - 1; } until x == 0;
        for i = 1 to 10 { write(i); }
    "#;
    let program = parse_source(source).unwrap();

    assert_eq!(program.body.len(), 4);
    match &program.body[0].kind {
        StmtKind::If { else_branch, .. } => {
            let else_branch = else_branch.as_ref().unwrap();
            assert!(matches!(else_branch[0].kind, StmtKind::If { .. }));
        }
        other => panic!("expected if, got {:?}", other),
    }
    assert!(matches!(program.body[1].kind, StmtKind::While { .. }));
    assert!(matches!(program.body[2].kind, StmtKind::DoUntil { .. }));
    assert!(matches!(
        &program.body[3].kind,
        StmtKind::For { var, .. } if var == "i"
    ));
}

#[test]
fn test_parse_switch() {
    let source = r#"
        switch x {
            case 1: write("one");
            case 2: write("two"); write("!");
            default: write("other");
        }
    "#;
    let program = parse_source(source).unwrap();

    match &program.body[0].kind {
        StmtKind::Switch { cases, default, .. } => {
            assert_eq!(cases.len(), 2);
            assert_eq!(cases[1].body.len(), 2);
            assert_eq!(default.as_ref().map(|body| body.len()), Some(1));
        }
        other => panic!("expected switch, got {:?}", other),
    }
}

#[test]
fn test_parse_write_and_return() {
    let program = parse_source("function f() { return; } write(1, \" \", f());").unwrap();

    match &program.body[1].kind {
        StmtKind::Write(args) => assert_eq!(args.len(), 3),
        other => panic!("expected write, got {:?}", other),
    }
}

#[test]
fn test_parse_expression_ids_are_unique() {
    let program = parse_source("x = 1 + 2; y = x * 3;").unwrap();

    let mut ids = vec![];
    for stmt in &program.body {
        if let StmtKind::Assign { value, .. } = &stmt.kind {
            ids.push(value.id);
            if let ExprKind::Binary { left, right, .. } = &value.kind {
                ids.push(left.id);
                ids.push(right.id);
            }
        }
    }

    let mut deduped = ids.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(ids.len(), 6);
    assert_eq!(deduped.len(), 6);
}

#[test]
fn test_parse_spans_cover_statement() {
    let program = parse_source("x = 1;\n  y = 2;").unwrap();

    assert_eq!(program.body[1].span.start.line, 2);
    assert_eq!(program.body[1].span.start.column, 3);
}

#[test]
fn test_parse_empty_program() {
    let program = parse_source("").unwrap();

    assert!(program.body.is_empty());
}

#[test]
fn test_parse_syntax_error_missing_semicolon() {
    let error = parse_source("x = 42").unwrap_err();

    assert_eq!(error.get_error_name(), "UnexpectedToken");
}

#[test]
fn test_parse_syntax_error_unclosed_block() {
    assert!(parse_source("while x { x = 1;").is_err());
}

#[test]
fn test_parse_syntax_error_unexpected_token() {
    assert!(parse_source("x = ;").is_err());
    assert!(parse_source("x = 1 2;").is_err());
}
