//! Integration tests for end-to-end compilation.
//!
//! These tests run the complete pipeline on source text and execute the
//! generated module with wasmtime. The host imports record everything the
//! program writes so the output can be compared as a string.

use listc::{compile_source, CompileFailure, CompilerOptions, StringCoercion};
use wasmtime::{Caller, Engine, Linker, Module, Store};

#[derive(Default)]
struct Host {
    output: String,
    inputs: Vec<f64>,
}

/// Integral values print without a fractional part.
fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn f64_to_string(mut caller: Caller<'_, Host>, value: f64) -> wasmtime::Result<i32> {
    let mut bytes = format_number(value).into_bytes();
    bytes.push(0);

    let alloc = caller
        .get_export("alloc")
        .and_then(|export| export.into_func())
        .ok_or_else(|| wasmtime::Error::msg("module does not export alloc"))?
        .typed::<i32, i32>(&caller)?;
    let address = alloc.call(&mut caller, bytes.len() as i32)?;

    let memory = caller
        .get_export("memory")
        .and_then(|export| export.into_memory())
        .ok_or_else(|| wasmtime::Error::msg("module does not export memory"))?;
    memory.write(&mut caller, address as usize, &bytes)?;
    Ok(address)
}

fn run_with(source: &str, options: &CompilerOptions, inputs: &[f64]) -> String {
    let wat = match compile_source(source, "test.list", options) {
        Ok(wat) => wat,
        Err(failure) => panic!("compilation failed: {:?}", failure),
    };

    let engine = Engine::default();
    let module = Module::new(&engine, &wat).unwrap_or_else(|err| panic!("{}\n{}", err, wat));
    let mut store = Store::new(
        &engine,
        Host {
            output: String::new(),
            inputs: inputs.to_vec(),
        },
    );

    let mut linker = Linker::new(&engine);
    linker
        .func_wrap("env", "write_num", |mut caller: Caller<'_, Host>, value: f64| {
            let text = format_number(value);
            caller.data_mut().output.push_str(&text);
        })
        .unwrap();
    linker
        .func_wrap("env", "write_char", |mut caller: Caller<'_, Host>, c: i32| {
            caller.data_mut().output.push(c as u8 as char);
        })
        .unwrap();
    linker
        .func_wrap("env", "read_num", |mut caller: Caller<'_, Host>| -> f64 {
            let host = caller.data_mut();
            if host.inputs.is_empty() {
                0.0
            } else {
                host.inputs.remove(0)
            }
        })
        .unwrap();
    linker.func_wrap("env", "f64_to_string", f64_to_string).unwrap();

    let instance = linker.instantiate(&mut store, &module).unwrap();
    let run = instance
        .get_typed_func::<(), ()>(&mut store, &options.entry_export)
        .unwrap();
    run.call(&mut store, ()).unwrap();

    store.into_data().output
}

fn run(source: &str) -> String {
    run_with(source, &CompilerOptions::default(), &[])
}

#[test]
fn test_arithmetic_and_write() {
    assert_eq!(run("write(1 + 2 * 3, \" \", 7 / 2, \" \", -4);"), "7 3.5 -4");
}

#[test]
fn test_dequeue_front() {
    let source = "xs = [1, 2, 3]; a = dequeue(xs); write(a, \" \", len(xs), \" \", xs);";
    assert_eq!(run(source), "1 2 [2, 3]");
}

#[test]
fn test_append_grows_list() {
    let source = "xs = [1]; xs << 2; xs << 3; xs << 4; xs << 5; write(len(xs)); write(xs);";
    assert_eq!(run(source), "5[1, 2, 3, 4, 5]");
}

#[test]
fn test_append_chain() {
    assert_eq!(run("xs = [1, 2, 3, 4]; xs << 5 << 6; write(xs);"), "[1, 2, 3, 4, 5, 6]");
}

#[test]
fn test_list_element_assignment() {
    let source = "xs = [10, 20, 30]; xs[1] = 25; write(xs[1] + xs[2]);";
    assert_eq!(run(source), "55");
}

#[test]
fn test_string_operations() {
    let source = r#"
        s = "ab" * 3;
        write(s, " ", len(s), " ");
        t = "x" + "y";
        if t == "xy" { write("eq"); }
        if t != "xz" { write("ne"); }
        write(" ", 2 * "cd");
    "#;
    assert_eq!(run(source), "ababab 6 eqne cdcd");
}

#[test]
fn test_logical_operators_evaluate_both_sides() {
    let source = r#"
        function side() -> number { write("E"); return 1; }
        x = 0 and side();
        write(x);
    "#;
    assert_eq!(run(source), "E0");
}

#[test]
fn test_multi_assignment_swaps() {
    assert_eq!(run("a = 1; b = 2; a, b = b, a; write(a, b);"), "21");
}

#[test]
fn test_arrow_assignments() {
    assert_eq!(run("a <- 4; a * 2 -> b; write(a, b);"), "48");
}

#[test]
fn test_for_loop_is_inclusive() {
    assert_eq!(run("for i = 1 to 3 { write(i); }"), "123");
}

#[test]
fn test_continue_in_for_reaches_increment() {
    let source = "for i = 1 to 5 { if i == 3 { continue; } write(i); }";
    assert_eq!(run(source), "1245");
}

#[test]
fn test_while_and_break() {
    let source = "i = 0; while 1 { i = i + 1; if i > 3 { break; } } write(i);";
    assert_eq!(run(source), "4");
}

#[test]
fn test_do_until() {
    let source = "n = 0; do { n = n + 1; } until n == 3; write(n);";
    assert_eq!(run(source), "3");
}

#[test]
fn test_switch_on_numbers_and_strings() {
    let source = r#"
        function name(v) -> string {
            switch v {
                case 1: return "one";
                case 2: return "two";
                default: return "many";
            }
            return "none";
        }
        write(name(1), name(2), name(7));
        s = "b";
        switch s { case "a": write(1); case "b": write(2); default: write(3); }
    "#;
    assert_eq!(run(source), "onetwomany2");
}

#[test]
fn test_break_inside_switch_leaves_loop() {
    let source = "i = 0; while i < 10 { i = i + 1; switch i { case 3: break; } } write(i);";
    assert_eq!(run(source), "3");
}

#[test]
fn test_recursive_function() {
    let source = r#"
        function fib(n) -> number {
            if n < 2 { return n; }
            return fib(n - 1) + fib(n - 2);
        }
        write(fib(10));
    "#;
    assert_eq!(run(source), "55");
}

#[test]
fn test_unannotated_function_returns_string() {
    assert_eq!(run("function greet() { return \"hi\"; } write(greet());"), "hi");
}

#[test]
fn test_unannotated_return_through_later_function() {
    let source = "function a() { return b(); } function b() { return \"x\"; } write(a());";
    assert_eq!(run(source), "x");
}

#[test]
fn test_unannotated_function_returns_list() {
    let source = "function pair() { return [1, 2]; } xs = pair(); xs << 3; write(xs);";
    assert_eq!(run(source), "[1, 2, 3]");
}

#[test]
fn test_unannotated_function_returns_lambda_result() {
    let source = r#"
        function k() { g = lambda(s: string) -> string => s; return g("z"); }
        write(k());
    "#;
    assert_eq!(run(source), "z");
}

#[test]
fn test_unannotated_function_returns_lambda() {
    let source = r#"
        function mk() { return lambda(s: string) -> string => s + "!"; }
        g = mk();
        write(g("a"));
    "#;
    assert_eq!(run(source), "a!");
}

#[test]
fn test_append_to_null_starts_list() {
    assert_eq!(run("xs = null; xs << 7; write(xs);"), "[7]");
}

#[test]
fn test_functions_see_globals() {
    assert_eq!(run("function show() { write(count); } count = 5; show();"), "5");
}

#[test]
fn test_lambda_call() {
    let source = "twice = lambda(s: string) => s + s; write(twice(\"ab\") + twice(\"ab\"));";
    assert_eq!(run(source), "abababab");
}

#[test]
fn test_lambda_through_variable_matches_direct_call() {
    let source = r#"
        shout = lambda(s: string) -> string => s + "!";
        write(shout("hi"), " ", (lambda(s: string) -> string => s + "!")("hi"));
    "#;
    assert_eq!(run(source), "hi! hi!");
}

#[test]
fn test_lambda_as_parameter() {
    let source = r#"
        function apply(f: lambda(number) -> number, x) -> number { return f(x); }
        sq = lambda(n) => n * n;
        write(apply(sq, 4), " ", apply(lambda(n) => n + 1, 4));
    "#;
    assert_eq!(run(source), "16 5");
}

#[test]
fn test_block_lambda_with_locals() {
    let source = r#"
        sum = lambda(xs: list) {
            total = 0;
            for i = 0 to len(xs) - 1 { total = total + xs[i]; }
            return total;
        };
        write(sum([1, 2, 3, 4]));
    "#;
    assert_eq!(run(source), "10");
}

#[test]
fn test_read_input() {
    let source = "x = read(); y = read(); write(x + y);";
    assert_eq!(run_with(source, &CompilerOptions::default(), &[2.0, 3.0]), "5");
}

#[test]
fn test_number_concatenation_static() {
    assert_eq!(run("write(\"n=\" + 5, \" \", \"v=\" + 2.5);"), "n=5 v=2.5");
}

#[test]
fn test_number_concatenation_heuristic() {
    let options = CompilerOptions {
        string_coercion: StringCoercion::Heuristic,
        ..CompilerOptions::default()
    };

    // 5 survives the round trip and is read as the (empty) string at address 5.
    assert_eq!(run_with("write(\"n=\" + 5);", &options, &[]), "n=");
    assert_eq!(run_with("write(\"v=\" + 2.5);", &options, &[]), "v=2.5");
}

#[test]
fn test_unknown_operand_concatenation() {
    assert_eq!(run("xs = [2.5]; write(\"v=\" + xs[0]);"), "v=2.5");
}

#[test]
fn test_custom_entry_export() {
    let options = CompilerOptions {
        entry_export: "main".to_string(),
        ..CompilerOptions::default()
    };
    assert_eq!(run_with("write(1);", &options, &[]), "1");
}

#[test]
fn test_semantic_errors_are_collected() {
    let result = compile_source("write(a); write(b);", "test.list", &CompilerOptions::default());

    match result {
        Err(CompileFailure::Semantic(errors)) => {
            let names: Vec<&str> = errors.iter().map(|error| error.get_error_name()).collect();
            assert_eq!(names, vec!["VariableNotDeclared", "VariableNotDeclared"]);
        }
        other => panic!("expected semantic errors, got {:?}", other),
    }
}

#[test]
fn test_syntax_error_stops_pipeline() {
    let result = compile_source("x = ;", "test.list", &CompilerOptions::default());
    assert!(matches!(result, Err(CompileFailure::Syntax(_))));
}

#[test]
fn test_table_limit_is_internal_failure() {
    let options = CompilerOptions {
        max_table_size: 0,
        ..CompilerOptions::default()
    };

    let result = compile_source("f = lambda(x) => x;", "test.list", &options);
    assert!(matches!(result, Err(CompileFailure::Internal(_))));
}

#[test]
fn test_scratch_limit_bounds_list_nesting() {
    let options = CompilerOptions {
        max_scratch_locals: 2,
        ..CompilerOptions::default()
    };

    assert_eq!(run_with("xs = [[1]]; write(len(xs));", &options, &[]), "1");
    let result = compile_source("xs = [[[1]]];", "test.list", &options);
    assert!(matches!(result, Err(CompileFailure::Internal(_))));
}
