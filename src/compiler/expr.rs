use tracing::trace;

use crate::{
    ast::expressions::{BinaryOp, Expr, ExprKind, Lambda, LambdaBody, UnaryOp},
    config::StringCoercion,
    errors::errors::CompileError,
    type_checker::types::{LambdaSignature, Type, ValType},
};

use super::{
    compiler::{Compiler, FunctionFrame, Slot},
    locals::{discover_expr_locals, discover_locals},
    runtime::{list_allocation_size, LIST_ELEMENT_SIZE, LIST_HEADER_SIZE, LIST_MIN_CAPACITY},
    stmt::gen_statement,
};

/// Generates the instructions for the given expression.
///
/// # Arguments
///
/// * `compiler` - The compilation context
/// * `expression` - The expression to lower
///
/// # Returns
///
/// The kind of the single value left on the stack, or `None` when the
/// expression is a call that produces nothing.
pub fn gen_expression(
    compiler: &mut Compiler,
    expression: &Expr,
) -> Result<Option<ValType>, CompileError> {
    match &expression.kind {
        ExprKind::Number(value) => {
            compiler.emit(format!("f64.const {}", format_f64(*value)));
            Ok(Some(ValType::F64))
        }
        ExprKind::Bool(value) => {
            compiler.emit(if *value { "f64.const 1" } else { "f64.const 0" });
            Ok(Some(ValType::F64))
        }
        ExprKind::Null => {
            compiler.emit("i32.const 0");
            Ok(Some(ValType::I32))
        }
        ExprKind::String(value) => {
            let address = compiler.data.intern(value);
            compiler.emit(format!("i32.const {}", address));
            Ok(Some(ValType::I32))
        }
        ExprKind::Identifier(name) => {
            let variable = compiler.require_variable(name, expression.line())?;
            compiler.get_variable(&variable);
            Ok(Some(variable.kind))
        }
        ExprKind::List(items) => gen_list(compiler, items),
        ExprKind::Struct(fields) => {
            for (_, value) in fields {
                if gen_expression(compiler, value)?.is_some() {
                    compiler.emit("drop");
                }
            }
            compiler.emit("i32.const 0");
            Ok(Some(ValType::I32))
        }
        ExprKind::Binary { op, left, right } => gen_binary(compiler, *op, left, right),
        ExprKind::Unary { op, operand } => {
            gen_as(compiler, operand, ValType::F64)?;
            match op {
                UnaryOp::Negate => compiler.emit("f64.neg"),
                UnaryOp::Not => {
                    compiler.emit("f64.const 0");
                    compiler.emit("f64.eq");
                    compiler.emit("f64.convert_i32_u");
                }
            }
            Ok(Some(ValType::F64))
        }
        ExprKind::Index { list, index } => {
            gen_element_address(compiler, list, index)?;
            compiler.emit("f64.load");
            Ok(Some(ValType::F64))
        }
        ExprKind::Field { target, .. } => {
            gen_as(compiler, target, ValType::I32)?;
            compiler.emit("f64.load");
            Ok(Some(ValType::F64))
        }
        ExprKind::Call { callee, args } => gen_call(compiler, callee, args),
        ExprKind::Lambda(lambda) => gen_lambda(compiler, expression, lambda),
        ExprKind::Append { list, value } => gen_append(compiler, list, value),
        ExprKind::Len(target) => {
            let is_string = compiler.analysis.type_of(target.id) == Type::String;
            gen_as(compiler, target, ValType::I32)?;
            compiler.emit(if is_string {
                "call $rt.string_len"
            } else {
                "call $rt.list_len"
            });
            compiler.emit("f64.convert_i32_u");
            Ok(Some(ValType::F64))
        }
        ExprKind::Dequeue(target) => {
            gen_as(compiler, target, ValType::I32)?;
            compiler.emit("call $rt.list_dequeue");
            Ok(Some(ValType::F64))
        }
        ExprKind::Read => {
            compiler.emit("call $env.read_num");
            Ok(Some(ValType::F64))
        }
    }
}

/// Lowers `expression` and converts its value to `kind`.
pub fn gen_as(compiler: &mut Compiler, expression: &Expr, kind: ValType) -> Result<(), CompileError> {
    let actual = gen_expression(compiler, expression)?;
    compiler.coerce(actual, kind, expression.line())
}

fn format_f64(value: f64) -> String {
    if value.is_nan() {
        String::from("nan")
    } else if value.is_infinite() {
        String::from(if value > 0.0 { "inf" } else { "-inf" })
    } else {
        format!("{:?}", value)
    }
}

/// Leaves the address of `list[index]` on the stack.
pub fn gen_element_address(
    compiler: &mut Compiler,
    list: &Expr,
    index: &Expr,
) -> Result<(), CompileError> {
    gen_as(compiler, list, ValType::I32)?;
    compiler.emit(format!("i32.const {}", LIST_HEADER_SIZE));
    compiler.emit("i32.add");
    gen_as(compiler, index, ValType::F64)?;
    compiler.emit("i32.trunc_sat_f64_u");
    compiler.emit(format!("i32.const {}", LIST_ELEMENT_SIZE));
    compiler.emit("i32.mul");
    compiler.emit("i32.add");
    Ok(())
}

fn gen_list(compiler: &mut Compiler, items: &[Expr]) -> Result<Option<ValType>, CompileError> {
    let len = items.len() as u32;
    let list = compiler.acquire_temp(ValType::I32)?;

    compiler.emit(format!("i32.const {}", list_allocation_size(len)));
    compiler.emit("call $rt.alloc");
    compiler.emit(format!("local.set {}", list));

    compiler.emit(format!("local.get {}", list));
    compiler.emit(format!("i32.const {}", len));
    compiler.emit("i32.store");
    compiler.emit(format!("local.get {}", list));
    compiler.emit(format!("i32.const {}", LIST_ELEMENT_SIZE));
    compiler.emit("i32.store offset=4");
    compiler.emit(format!("local.get {}", list));
    compiler.emit(format!("i32.const {}", len.max(LIST_MIN_CAPACITY)));
    compiler.emit("i32.store offset=8");

    for (index, item) in items.iter().enumerate() {
        compiler.emit(format!("local.get {}", list));
        gen_as(compiler, item, ValType::F64)?;
        compiler.emit(format!(
            "f64.store offset={}",
            LIST_HEADER_SIZE + index as u32 * LIST_ELEMENT_SIZE
        ));
    }

    compiler.emit(format!("local.get {}", list));
    compiler.release_temp(ValType::I32);
    Ok(Some(ValType::I32))
}

fn gen_binary(
    compiler: &mut Compiler,
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
) -> Result<Option<ValType>, CompileError> {
    let left_type = compiler.analysis.type_of(left.id);
    let right_type = compiler.analysis.type_of(right.id);

    match op {
        BinaryOp::Add if left_type == Type::String || right_type == Type::String => {
            gen_string_operand(compiler, left)?;
            gen_string_operand(compiler, right)?;
            compiler.emit("call $rt.string_concat");
            return Ok(Some(ValType::I32));
        }
        BinaryOp::Multiply if left_type == Type::String && right_type != Type::String => {
            gen_as(compiler, left, ValType::I32)?;
            gen_as(compiler, right, ValType::F64)?;
            compiler.emit("call $rt.string_repeat");
            return Ok(Some(ValType::I32));
        }
        BinaryOp::Multiply if right_type == Type::String && left_type != Type::String => {
            // The count comes first in source order but second on the stack.
            let count = compiler.acquire_temp(ValType::F64)?;
            gen_as(compiler, left, ValType::F64)?;
            compiler.emit(format!("local.set {}", count));
            gen_as(compiler, right, ValType::I32)?;
            compiler.emit(format!("local.get {}", count));
            compiler.emit("call $rt.string_repeat");
            compiler.release_temp(ValType::F64);
            return Ok(Some(ValType::I32));
        }
        BinaryOp::Equals | BinaryOp::NotEquals
            if left_type == Type::String && right_type == Type::String =>
        {
            gen_as(compiler, left, ValType::I32)?;
            gen_as(compiler, right, ValType::I32)?;
            compiler.emit("call $rt.string_eq");
            if op == BinaryOp::NotEquals {
                compiler.emit("i32.eqz");
            }
            compiler.emit("f64.convert_i32_u");
            return Ok(Some(ValType::F64));
        }
        _ => {}
    }

    let (instruction, is_test) = match op {
        BinaryOp::And | BinaryOp::Or => return gen_logical(compiler, op, left, right),
        BinaryOp::Add => ("f64.add", false),
        BinaryOp::Subtract => ("f64.sub", false),
        BinaryOp::Multiply => ("f64.mul", false),
        BinaryOp::Divide => ("f64.div", false),
        BinaryOp::Less => ("f64.lt", true),
        BinaryOp::LessEquals => ("f64.le", true),
        BinaryOp::Greater => ("f64.gt", true),
        BinaryOp::GreaterEquals => ("f64.ge", true),
        BinaryOp::Equals => ("f64.eq", true),
        BinaryOp::NotEquals => ("f64.ne", true),
    };

    gen_as(compiler, left, ValType::F64)?;
    gen_as(compiler, right, ValType::F64)?;
    compiler.emit(instruction);
    if is_test {
        compiler.emit("f64.convert_i32_u");
    }
    Ok(Some(ValType::F64))
}

/// Both sides of `and`/`or` are always evaluated.
fn gen_logical(
    compiler: &mut Compiler,
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
) -> Result<Option<ValType>, CompileError> {
    gen_truth(compiler, left)?;
    gen_truth(compiler, right)?;
    compiler.emit(if op == BinaryOp::And { "i32.and" } else { "i32.or" });
    compiler.emit("f64.convert_i32_u");
    Ok(Some(ValType::F64))
}

fn gen_truth(compiler: &mut Compiler, operand: &Expr) -> Result<(), CompileError> {
    gen_as(compiler, operand, ValType::F64)?;
    compiler.emit("f64.const 0");
    compiler.emit("f64.ne");
    Ok(())
}

/// Leaves a string address for one side of a concatenation.
fn gen_string_operand(compiler: &mut Compiler, operand: &Expr) -> Result<(), CompileError> {
    let ty = compiler.analysis.type_of(operand.id);
    if ty == Type::String {
        return gen_as(compiler, operand, ValType::I32);
    }

    gen_as(compiler, operand, ValType::F64)?;
    let heuristic = compiler.options.string_coercion == StringCoercion::Heuristic;
    if heuristic || ty == Type::Unknown {
        compiler.emit("call $rt.coerce_string");
    } else {
        compiler.emit("call $env.f64_to_string");
    }
    Ok(())
}

/// Innermost list of an append chain, `xs` in `xs << 1 << 2`.
fn append_root(list: &Expr) -> &Expr {
    match &list.kind {
        ExprKind::Append { list, .. } => append_root(list),
        _ => list,
    }
}

fn gen_append(
    compiler: &mut Compiler,
    list: &Expr,
    value: &Expr,
) -> Result<Option<ValType>, CompileError> {
    gen_as(compiler, list, ValType::I32)?;
    gen_as(compiler, value, ValType::F64)?;
    compiler.emit("call $rt.list_append");

    // The list may have moved; the variable it came from must follow.
    let root = append_root(list);
    let Some(name) = root.as_identifier() else {
        return Ok(Some(ValType::I32));
    };
    let variable = compiler.require_variable(name, root.line())?;

    match (&variable.slot, variable.kind) {
        (Slot::Local(local), ValType::I32) => compiler.emit(format!("local.tee {}", local)),
        _ => {
            let moved = compiler.acquire_temp(ValType::I32)?;
            compiler.emit(format!("local.tee {}", moved));
            compiler.coerce(Some(ValType::I32), variable.kind, root.line())?;
            compiler.set_variable(&variable);
            compiler.emit(format!("local.get {}", moved));
            compiler.release_temp(ValType::I32);
        }
    }
    Ok(Some(ValType::I32))
}

fn gen_call(
    compiler: &mut Compiler,
    callee: &Expr,
    args: &[Expr],
) -> Result<Option<ValType>, CompileError> {
    let analysis = compiler.analysis;

    let Some(name) = callee.as_identifier() else {
        let signature = analysis.expression_signatures.get(&callee.id);
        return gen_indirect_call(compiler, callee, args, signature);
    };

    if let Some(variable) = compiler.variable(name) {
        if variable.ty == Type::Lambda {
            let owner = compiler.frame().owner.clone();
            let signature = analysis
                .symbols
                .resolve(owner.as_deref(), name)
                .and_then(|info| info.signature.as_ref())
                .or_else(|| analysis.expression_signatures.get(&callee.id));
            return gen_indirect_call(compiler, callee, args, signature);
        }
    }

    let Some(function) = analysis.symbols.function(name) else {
        return Err(CompileError::UnresolvedCallee {
            name: name.to_string(),
            line: callee.line(),
        });
    };

    for (arg, param) in args.iter().zip(&function.parameters) {
        gen_as(compiler, arg, param.ty.val_type().unwrap_or(ValType::F64))?;
    }
    compiler.emit(format!("call ${}", function.name));
    Ok(function.return_type.val_type())
}

fn gen_indirect_call(
    compiler: &mut Compiler,
    callee: &Expr,
    args: &[Expr],
    signature: Option<&LambdaSignature>,
) -> Result<Option<ValType>, CompileError> {
    let (params, result) = match signature {
        Some(signature) => signature.lowered(),
        None => (vec![ValType::F64; args.len()], Some(ValType::F64)),
    };

    for (arg, kind) in args.iter().zip(&params) {
        gen_as(compiler, arg, *kind)?;
    }
    gen_as(compiler, callee, ValType::I32)?;

    let descriptor = compiler.types.register(params, result);
    compiler.emit(format!("call_indirect (type {})", descriptor));
    Ok(result)
}

fn gen_lambda(
    compiler: &mut Compiler,
    expression: &Expr,
    lambda: &Lambda,
) -> Result<Option<ValType>, CompileError> {
    let analysis = compiler.analysis;
    let missing = || CompileError::MissingLambdaSignature {
        line: expression.line(),
    };
    let signature = analysis.lambda_signatures.get(&expression.id).ok_or_else(missing)?;
    let scope = signature.scope.clone().ok_or_else(missing)?;

    let slot = compiler.next_slot;
    compiler.next_slot += 1;
    let name = format!("$lambda.{}", slot);
    compiler.lambda_names.push(name.clone());
    trace!(slot, scope = %scope, "assigned table slot");

    let params: Vec<(String, ValType)> = lambda
        .params
        .iter()
        .zip(&signature.params)
        .map(|(param, typed)| (param.name.clone(), typed.ty.val_type().unwrap_or(ValType::F64)))
        .collect();
    let param_names: Vec<String> = params.iter().map(|(name, _)| name.clone()).collect();
    let result = signature.return_type.val_type();

    let discovered = match &lambda.body {
        LambdaBody::Expr(body) => {
            discover_expr_locals(body, Some(scope.as_str()), &param_names, &analysis.symbols)
        }
        LambdaBody::Block(body) => {
            discover_locals(body, Some(scope.as_str()), &param_names, &analysis.symbols)
        }
    };

    let mut frame = FunctionFrame::new(name, Some(scope), params, result);
    for (local, kind) in &discovered.locals {
        frame.declare_local(local, *kind);
    }
    compiler.push_frame(frame);

    match &lambda.body {
        LambdaBody::Expr(body) => {
            let actual = gen_expression(compiler, body)?;
            match result {
                Some(kind) => compiler.coerce(actual, kind, body.line())?,
                None if actual.is_some() => compiler.emit("drop"),
                None => {}
            }
        }
        LambdaBody::Block(body) => {
            for stmt in body {
                gen_statement(compiler, stmt)?;
            }
            if let Some(kind) = result {
                compiler.emit_default(kind);
            }
        }
    }

    if let Some(frame) = compiler.pop_frame() {
        compiler.lambdas.push(frame.render());
    }

    compiler.emit(format!("f64.const {}", slot));
    Ok(Some(ValType::F64))
}
