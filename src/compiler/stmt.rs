use crate::{
    ast::{
        expressions::Expr,
        statements::{Stmt, StmtKind, SwitchCase},
    },
    errors::errors::CompileError,
    type_checker::types::{Type, ValType},
};

use super::{
    compiler::{Compiler, LoopLabels, Variable},
    expr::{gen_as, gen_element_address, gen_expression},
};

/// Resolves the variable a statement stores into.
fn assign_target(compiler: &Compiler, name: &str, line: u32) -> Result<Variable, CompileError> {
    if compiler.variable(name).is_none() && compiler.analysis.symbols.function(name).is_some() {
        return Err(CompileError::InvalidAssignmentTarget { line });
    }
    compiler.require_variable(name, line)
}

/// Generates the instructions for the given statement.
pub fn gen_statement(compiler: &mut Compiler, statement: &Stmt) -> Result<(), CompileError> {
    let line = statement.line();

    match &statement.kind {
        StmtKind::FunctionDecl(decl) => compiler.gen_function(decl),
        StmtKind::Assign { target, value, .. } => {
            let variable = assign_target(compiler, target, line)?;
            gen_as(compiler, value, variable.kind)?;
            compiler.set_variable(&variable);
            Ok(())
        }
        StmtKind::IndexAssign { list, index, value } => {
            gen_element_address(compiler, list, index)?;
            gen_as(compiler, value, ValType::F64)?;
            compiler.emit("f64.store");
            Ok(())
        }
        StmtKind::FieldAssign { target, value, .. } => {
            let variable = assign_target(compiler, target, line)?;
            compiler.get_variable(&variable);
            compiler.coerce(Some(variable.kind), ValType::I32, line)?;
            gen_as(compiler, value, ValType::F64)?;
            compiler.emit("f64.store");
            Ok(())
        }
        StmtKind::MultiAssign { targets, values } => gen_multi_assign(compiler, targets, values, line),
        StmtKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            gen_as(compiler, condition, ValType::F64)?;
            compiler.emit("f64.const 0");
            compiler.emit("f64.ne");
            compiler.open("if");
            gen_block(compiler, then_branch)?;
            if let Some(else_branch) = else_branch {
                compiler.emit_else();
                gen_block(compiler, else_branch)?;
            }
            compiler.close();
            Ok(())
        }
        StmtKind::While { condition, body } => {
            let labels = LoopLabels {
                break_label: compiler.new_label("break"),
                continue_label: compiler.new_label("continue"),
            };

            compiler.open(format!("block {}", labels.break_label));
            compiler.open(format!("loop {}", labels.continue_label));
            gen_as(compiler, condition, ValType::F64)?;
            compiler.emit("f64.const 0");
            compiler.emit("f64.eq");
            compiler.emit(format!("br_if {}", labels.break_label));
            gen_loop_body(compiler, &labels, body)?;
            compiler.emit(format!("br {}", labels.continue_label));
            compiler.close();
            compiler.close();
            Ok(())
        }
        StmtKind::DoUntil { body, condition } => {
            let labels = LoopLabels {
                break_label: compiler.new_label("break"),
                continue_label: compiler.new_label("continue"),
            };
            let repeat = compiler.new_label("repeat");

            compiler.open(format!("block {}", labels.break_label));
            compiler.open(format!("loop {}", repeat));
            compiler.open(format!("block {}", labels.continue_label));
            gen_loop_body(compiler, &labels, body)?;
            compiler.close();
            gen_as(compiler, condition, ValType::F64)?;
            compiler.emit("f64.const 0");
            compiler.emit("f64.ne");
            compiler.emit(format!("br_if {}", labels.break_label));
            compiler.emit(format!("br {}", repeat));
            compiler.close();
            compiler.close();
            Ok(())
        }
        StmtKind::For {
            var,
            start,
            end,
            body,
        } => gen_for(compiler, var, start, end, body, line),
        StmtKind::Switch {
            subject,
            cases,
            default,
        } => gen_switch(compiler, subject, cases, default.as_deref()),
        StmtKind::Break => {
            let label = compiler
                .frame()
                .loops
                .last()
                .map(|labels| labels.break_label.clone())
                .ok_or(CompileError::BreakOutsideLoop { line })?;
            compiler.emit(format!("br {}", label));
            Ok(())
        }
        StmtKind::Continue => {
            let label = compiler
                .frame()
                .loops
                .last()
                .map(|labels| labels.continue_label.clone())
                .ok_or(CompileError::ContinueOutsideLoop { line })?;
            compiler.emit(format!("br {}", label));
            Ok(())
        }
        StmtKind::Return(value) => {
            match (value, compiler.frame().result) {
                (Some(value), Some(kind)) => gen_as(compiler, value, kind)?,
                (Some(value), None) => gen_dropped(compiler, value)?,
                (None, Some(kind)) => compiler.emit_default(kind),
                (None, None) => {}
            }
            compiler.emit("return");
            Ok(())
        }
        StmtKind::Write(args) => {
            for arg in args {
                gen_write(compiler, arg)?;
            }
            Ok(())
        }
        StmtKind::Expr(expression) => gen_dropped(compiler, expression),
        StmtKind::Block(body) => gen_block(compiler, body),
    }
}

fn gen_block(compiler: &mut Compiler, body: &[Stmt]) -> Result<(), CompileError> {
    for stmt in body {
        gen_statement(compiler, stmt)?;
    }
    Ok(())
}

fn gen_loop_body(
    compiler: &mut Compiler,
    labels: &LoopLabels,
    body: &[Stmt],
) -> Result<(), CompileError> {
    compiler.frame_mut().loops.push(labels.clone());
    let result = gen_block(compiler, body);
    compiler.frame_mut().loops.pop();
    result
}

/// Evaluates an expression for its side effects only.
fn gen_dropped(compiler: &mut Compiler, expression: &Expr) -> Result<(), CompileError> {
    if gen_expression(compiler, expression)?.is_some() {
        compiler.emit("drop");
    }
    Ok(())
}

fn gen_multi_assign(
    compiler: &mut Compiler,
    targets: &[String],
    values: &[Expr],
    line: u32,
) -> Result<(), CompileError> {
    let mut stashed = vec![];

    for (target, value) in targets.iter().zip(values) {
        let variable = assign_target(compiler, target, line)?;
        gen_as(compiler, value, variable.kind)?;
        let temp = compiler.acquire_temp(variable.kind)?;
        compiler.emit(format!("local.set {}", temp));
        stashed.push((variable, temp));
    }

    for (variable, temp) in &stashed {
        compiler.emit(format!("local.get {}", temp));
        compiler.set_variable(variable);
    }
    for (variable, _) in stashed.iter().rev() {
        compiler.release_temp(variable.kind);
    }
    Ok(())
}

fn gen_for(
    compiler: &mut Compiler,
    var: &str,
    start: &Expr,
    end: &Expr,
    body: &[Stmt],
    line: u32,
) -> Result<(), CompileError> {
    let variable = assign_target(compiler, var, line)?;
    let labels = LoopLabels {
        break_label: compiler.new_label("break"),
        continue_label: compiler.new_label("continue"),
    };
    let repeat = compiler.new_label("repeat");

    let limit = compiler.acquire_temp(ValType::F64)?;
    gen_as(compiler, end, ValType::F64)?;
    compiler.emit(format!("local.set {}", limit));
    gen_as(compiler, start, variable.kind)?;
    compiler.set_variable(&variable);

    compiler.open(format!("block {}", labels.break_label));
    compiler.open(format!("loop {}", repeat));
    compiler.get_variable(&variable);
    compiler.coerce(Some(variable.kind), ValType::F64, line)?;
    compiler.emit(format!("local.get {}", limit));
    compiler.emit("f64.gt");
    compiler.emit(format!("br_if {}", labels.break_label));

    compiler.open(format!("block {}", labels.continue_label));
    gen_loop_body(compiler, &labels, body)?;
    compiler.close();

    compiler.get_variable(&variable);
    compiler.coerce(Some(variable.kind), ValType::F64, line)?;
    compiler.emit("f64.const 1");
    compiler.emit("f64.add");
    compiler.coerce(Some(ValType::F64), variable.kind, line)?;
    compiler.set_variable(&variable);
    compiler.emit(format!("br {}", repeat));
    compiler.close();
    compiler.close();

    compiler.release_temp(ValType::F64);
    Ok(())
}

fn gen_switch(
    compiler: &mut Compiler,
    subject: &Expr,
    cases: &[SwitchCase],
    default: Option<&[Stmt]>,
) -> Result<(), CompileError> {
    let subject_is_string = compiler.analysis.type_of(subject.id) == Type::String;
    let kind = if subject_is_string {
        ValType::I32
    } else {
        ValType::F64
    };

    let stashed = compiler.acquire_temp(kind)?;
    gen_as(compiler, subject, kind)?;
    compiler.emit(format!("local.set {}", stashed));

    let end = compiler.new_label("switch");
    compiler.open(format!("block {}", end));

    for case in cases {
        let case_is_string = compiler.analysis.type_of(case.value.id) == Type::String;
        compiler.emit(format!("local.get {}", stashed));
        if subject_is_string && case_is_string {
            gen_as(compiler, &case.value, ValType::I32)?;
            compiler.emit("call $rt.string_eq");
        } else {
            compiler.coerce(Some(kind), ValType::F64, case.value.line())?;
            gen_as(compiler, &case.value, ValType::F64)?;
            compiler.emit("f64.eq");
        }

        compiler.open("if");
        gen_block(compiler, &case.body)?;
        compiler.emit(format!("br {}", end));
        compiler.close();
    }

    if let Some(default) = default {
        gen_block(compiler, default)?;
    }
    compiler.close();

    compiler.release_temp(kind);
    Ok(())
}

fn gen_write(compiler: &mut Compiler, arg: &Expr) -> Result<(), CompileError> {
    match compiler.analysis.type_of(arg.id) {
        Type::String => {
            gen_as(compiler, arg, ValType::I32)?;
            compiler.emit("call $rt.write_string");
        }
        Type::List => {
            gen_as(compiler, arg, ValType::I32)?;
            compiler.emit("call $rt.write_list");
        }
        Type::Number | Type::Bool | Type::Unknown => {
            gen_as(compiler, arg, ValType::F64)?;
            compiler.emit("call $env.write_num");
        }
        Type::Struct | Type::Lambda | Type::Null | Type::Void => gen_dropped(compiler, arg)?,
    }
    Ok(())
}
