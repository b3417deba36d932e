//! Unit tests for the type checker.
//!
//! Covers inferred types, the flattened symbol table, lambda signatures and
//! every class of diagnostic.

use super::{
    type_checker::{type_check, Analysis},
    types::{LambdaSignature, Type, ValType},
};
use crate::{
    ast::statements::StmtKind, errors::errors::Error, lexer::lexer::tokenize,
    parser::parser::parse,
};

fn check(source: &str) -> (Analysis, Vec<Error>) {
    let tokens = tokenize(source.to_string(), Some("test.list".to_string())).unwrap();
    let program = parse(tokens).unwrap();
    type_check(&program)
}

fn error_names(source: &str) -> Vec<String> {
    let (_, errors) = check(source);
    errors
        .iter()
        .map(|error| error.get_error_name().to_string())
        .collect()
}

#[test]
fn test_globals_are_declared_by_first_assignment() {
    let (analysis, errors) = check("x = 1; s = \"a\"; xs = [1, 2]; p = struct { a: 1 }; ok = true;");

    assert!(errors.is_empty());
    let symbols = &analysis.symbols;
    assert_eq!(symbols.global("x").unwrap().ty, Type::Number);
    assert_eq!(symbols.global("s").unwrap().ty, Type::String);
    assert_eq!(symbols.global("xs").unwrap().ty, Type::List);
    assert_eq!(symbols.global("p").unwrap().ty, Type::Struct);
    assert_eq!(symbols.global("ok").unwrap().ty, Type::Bool);
}

#[test]
fn test_locals_and_parameters_are_qualified() {
    let (analysis, errors) =
        check("function f(a, b: string) -> number { c = a * 2; return c; }");

    assert!(errors.is_empty());
    let a = analysis.symbols.local("f", "a").unwrap();
    assert!(a.is_parameter);
    assert_eq!(a.ty, Type::Number);
    assert_eq!(analysis.symbols.local("f", "b").unwrap().ty, Type::String);
    assert!(!analysis.symbols.local("f", "c").unwrap().is_parameter);
    assert!(analysis.symbols.global("c").is_none());
    assert!(analysis.symbols.variables.contains_key("f::c"));
}

#[test]
fn test_function_bodies_see_later_globals() {
    let (analysis, errors) = check("function show() { write(count); } count = 5; show();");

    assert!(errors.is_empty(), "{:?}", errors);
    assert!(analysis.symbols.local("show", "count").is_none());
}

#[test]
fn test_function_return_type_inference() {
    let (analysis, errors) = check(
        "function greet() { return \"hi\"; } function nothing() { write(1); } function num() -> number { return 1; }",
    );

    assert!(errors.is_empty());
    assert_eq!(analysis.symbols.function("greet").unwrap().return_type, Type::String);
    assert_eq!(analysis.symbols.function("nothing").unwrap().return_type, Type::Void);
    assert_eq!(analysis.symbols.function("num").unwrap().return_type, Type::Number);
}

#[test]
fn test_inferred_return_types_reach_call_sites() {
    let source = r#"
        s = greet();
        xs = first();
        g = make();
        n = g(2);
        function greet() { return "hi"; }
        function first() { return second(); }
        function second() { return [1]; }
        function make() { return lambda(x) => x + 1; }
    "#;
    let (analysis, errors) = check(source);

    assert!(errors.is_empty(), "{:?}", errors);
    assert_eq!(analysis.symbols.global("s").unwrap().ty, Type::String);
    assert_eq!(analysis.symbols.global("xs").unwrap().ty, Type::List);
    assert_eq!(analysis.symbols.function("first").unwrap().return_type, Type::List);

    let g = analysis.symbols.global("g").unwrap();
    assert_eq!(g.ty, Type::Lambda);
    assert_eq!(g.signature.as_ref().unwrap().return_type, Type::Number);
    assert_eq!(analysis.symbols.global("n").unwrap().ty, Type::Number);
}

#[test]
fn test_inferred_return_type_mismatch_is_reported_once() {
    let names = error_names("function f(n) { if n { return 1; } return \"a\"; } x = f(1);");
    assert_eq!(names, vec!["TypeMatchError"]);
}

#[test]
fn test_append_to_null_makes_a_list() {
    let (analysis, errors) = check("xs = null; xs << 7; ys = null; ys << 1 << 2;");

    assert!(errors.is_empty(), "{:?}", errors);
    assert_eq!(analysis.symbols.global("xs").unwrap().ty, Type::List);
    assert_eq!(analysis.symbols.global("ys").unwrap().ty, Type::List);
}

#[test]
fn test_binary_expression_types() {
    let source = "a = \"n=\" + 5; b = \"ab\" * 3; c = 1 < 2; d = 1 + 2; e = \"x\" == \"y\"; f = 1 and 0;";
    let (analysis, errors) = check(source);

    assert!(errors.is_empty());
    assert_eq!(analysis.symbols.global("a").unwrap().ty, Type::String);
    assert_eq!(analysis.symbols.global("b").unwrap().ty, Type::String);
    assert_eq!(analysis.symbols.global("c").unwrap().ty, Type::Bool);
    assert_eq!(analysis.symbols.global("d").unwrap().ty, Type::Number);
    assert_eq!(analysis.symbols.global("e").unwrap().ty, Type::Bool);
    assert_eq!(analysis.symbols.global("f").unwrap().ty, Type::Bool);
}

#[test]
fn test_builtin_expression_types() {
    let (analysis, errors) =
        check("xs = [1]; n = len(xs); v = dequeue(xs); e = xs[0]; r = read(); ys = xs << 2;");

    assert!(errors.is_empty());
    assert_eq!(analysis.symbols.global("n").unwrap().ty, Type::Number);
    assert_eq!(analysis.symbols.global("v").unwrap().ty, Type::Unknown);
    assert_eq!(analysis.symbols.global("e").unwrap().ty, Type::Unknown);
    assert_eq!(analysis.symbols.global("r").unwrap().ty, Type::Number);
    assert_eq!(analysis.symbols.global("ys").unwrap().ty, Type::List);
}

#[test]
fn test_lambda_signatures_and_scopes() {
    let source = "twice = lambda(s: string) => s + s; outer = lambda() { inner = lambda(x) => x; return 1; };";
    let (analysis, errors) = check(source);

    assert!(errors.is_empty(), "{:?}", errors);
    assert_eq!(analysis.lambda_count, 3);

    let twice = analysis.symbols.global("twice").unwrap();
    assert_eq!(twice.ty, Type::Lambda);
    let signature = twice.signature.as_ref().unwrap();
    assert_eq!(signature.params[0].ty, Type::String);
    assert_eq!(signature.return_type, Type::String);
    assert_eq!(signature.scope.as_deref(), Some("lambda#0"));

    // Pre-order numbering: the outer lambda is counted before its body.
    let outer = analysis.symbols.global("outer").unwrap();
    assert_eq!(outer.signature.as_ref().unwrap().scope.as_deref(), Some("lambda#1"));
    assert_eq!(outer.signature.as_ref().unwrap().return_type, Type::Number);
    assert!(analysis.symbols.local("lambda#1", "inner").is_some());
    assert!(analysis.symbols.local("lambda#2", "x").unwrap().is_parameter);

    let mut scopes: Vec<_> = analysis
        .lambda_signatures
        .values()
        .filter_map(|signature| signature.scope.clone())
        .collect();
    scopes.sort();
    assert_eq!(scopes, vec!["lambda#0", "lambda#1", "lambda#2"]);
}

#[test]
fn test_lambda_without_return_is_void() {
    let (analysis, errors) = check("say = lambda(s: string) { write(s); };");

    assert!(errors.is_empty());
    let signature = analysis.symbols.global("say").unwrap().signature.clone().unwrap();
    assert_eq!(signature.return_type, Type::Void);
    assert_eq!(signature.lowered(), (vec![ValType::I32], None));
}

#[test]
fn test_lambda_annotation_signature() {
    let (analysis, errors) = check(
        "function apply(f: lambda(string) -> string, s: string) -> string { return f(s); } r = apply(lambda(s: string) => s, \"x\");",
    );

    assert!(errors.is_empty(), "{:?}", errors);
    let f = analysis.symbols.local("apply", "f").unwrap();
    assert_eq!(
        f.signature.as_ref().map(LambdaSignature::lowered),
        Some((vec![ValType::I32], Some(ValType::I32)))
    );
    assert_eq!(analysis.symbols.global("r").unwrap().ty, Type::String);
}

#[test]
fn test_call_signature_recorded_for_lambda_callee() {
    let source = "f = lambda(x) => x; y = f(2);";
    let tokens = tokenize(source.to_string(), None).unwrap();
    let program = parse(tokens).unwrap();
    let (analysis, errors) = type_check(&program);

    assert!(errors.is_empty());
    let callee_id = match &program.body[1].kind {
        StmtKind::Assign { value, .. } => match &value.kind {
            crate::ast::expressions::ExprKind::Call { callee, .. } => callee.id,
            other => panic!("expected call, got {:?}", other),
        },
        other => panic!("expected assignment, got {:?}", other),
    };
    assert_eq!(analysis.type_of(callee_id), Type::Lambda);
    assert!(analysis.expression_signatures.contains_key(&callee_id));
}

#[test]
fn test_type_mismatch_on_reassignment() {
    assert_eq!(error_names("x = 1; x = \"a\";"), vec!["TypeMatchError"]);
    assert!(error_names("x = 1; x = true;").is_empty());
    assert!(error_names("s = null; s = \"a\"; s = null;").is_empty());
}

#[test]
fn test_undeclared_names() {
    assert_eq!(error_names("write(y);"), vec!["VariableNotDeclared"]);
    assert_eq!(error_names("missing(1);"), vec!["FunctionNotDeclared"]);
}

#[test]
fn test_duplicate_declarations() {
    assert_eq!(
        error_names("function f() { } function f() { }"),
        vec!["FunctionAlreadyDeclared"]
    );
    assert_eq!(
        error_names("function f() { } f = 1;"),
        vec!["VariableAlreadyDeclared"]
    );
    assert_eq!(
        error_names("function g(a, a) { }"),
        vec!["VariableAlreadyDeclared"]
    );
}

#[test]
fn test_argument_checks() {
    let declare = "function add(a: number, b: number) -> number { return a + b; } ";

    assert_eq!(
        error_names(&format!("{}add(1);", declare)),
        vec!["MissingArguments"]
    );
    assert_eq!(
        error_names(&format!("{}add(1, 2, 3);", declare)),
        vec!["UnexpectedArguments"]
    );
    assert_eq!(
        error_names(&format!("{}add(1, \"b\");", declare)),
        vec!["ArgumentTypeMatchError"]
    );
}

#[test]
fn test_lambda_call_checks() {
    assert_eq!(
        error_names("f = lambda(s: string) => s; f(1);"),
        vec!["ArgumentTypeMatchError"]
    );
    assert_eq!(error_names("n = 1; n(2);"), vec!["NotCallable"]);
}

#[test]
fn test_void_value() {
    assert_eq!(
        error_names("function f() { write(1); } x = f();"),
        vec!["VoidValue"]
    );
    assert!(error_names("function f() { write(1); } f();").is_empty());
}

#[test]
fn test_loop_control_placement() {
    assert_eq!(error_names("break;"), vec!["BreakOutsideLoop"]);
    assert_eq!(error_names("if 1 { continue; }"), vec!["ContinueOutsideLoop"]);
    assert!(error_names("while 1 { switch 1 { case 1: break; } continue; }").is_empty());
    assert_eq!(
        error_names("while 1 { f = lambda() { break; }; }"),
        vec!["BreakOutsideLoop"]
    );
}

#[test]
fn test_return_placement_and_type() {
    assert_eq!(error_names("return 1;"), vec!["ReturnOutsideFunction"]);
    assert_eq!(
        error_names("function f() -> number { return \"a\"; }"),
        vec!["TypeMatchError"]
    );
    assert_eq!(
        error_names("function f() -> void { return 1; }"),
        vec!["TypeMatchError"]
    );
}

#[test]
fn test_captured_variable() {
    assert_eq!(
        error_names("function f() { local = 1; g = lambda() => local; }"),
        vec!["CapturedVariable"]
    );
    // Globals are not captures.
    assert!(error_names("base = 1; g = lambda() => base;").is_empty());
}

#[test]
fn test_assignment_count_mismatch() {
    assert_eq!(
        error_names("a, b = 1, 2, 3;"),
        vec!["AssignmentCountMismatch"]
    );
}

#[test]
fn test_operand_checks() {
    assert_eq!(error_names("x = \"a\" - 1;"), vec!["TypeMatchError"]);
    assert_eq!(error_names("x = len(5);"), vec!["TypeMatchError"]);
    assert_eq!(error_names("x = dequeue(\"s\");"), vec!["TypeMatchError"]);
    assert_eq!(error_names("s = \"a\"; s.f = 1;"), vec!["TypeMatchError"]);
    assert_eq!(error_names("for i = \"a\" to 3 { }"), vec!["TypeMatchError"]);
}

#[test]
fn test_errors_do_not_stop_traversal() {
    let names = error_names("write(a); write(b); break;");

    assert_eq!(
        names,
        vec!["VariableNotDeclared", "VariableNotDeclared", "BreakOutsideLoop"]
    );
}

#[test]
fn test_compatibility_rules() {
    assert!(Type::Number.is_compatible(&Type::Bool));
    assert!(Type::Unknown.is_compatible(&Type::String));
    assert!(Type::List.is_compatible(&Type::Null));
    assert!(Type::Null.is_compatible(&Type::Lambda));
    assert!(!Type::Number.is_compatible(&Type::Null));
    assert!(!Type::String.is_compatible(&Type::List));
}
