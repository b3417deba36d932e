use std::collections::HashMap;

use tracing::{debug, trace};

use crate::{
    ast::{
        ast::{NodeId, Program},
        expressions::{BinaryOp, Expr, ExprKind, Lambda, LambdaBody, Param, UnaryOp},
        statements::{FunctionDecl, Stmt, StmtKind},
    },
    errors::errors::{Error, ErrorImpl},
    Position,
};

use super::{
    scope::{Resolution, ScopeKind, ScopeStack, SymbolTable},
    types::{FunctionInfo, LambdaSignature, Parameter, Type, VariableInfo},
};

/// Everything code generation needs to know about a checked program.
#[derive(Debug, Default)]
pub struct Analysis {
    pub symbols: SymbolTable,
    pub expression_types: HashMap<NodeId, Type>,
    /// Signatures of expressions known to evaluate to a lambda.
    pub expression_signatures: HashMap<NodeId, LambdaSignature>,
    /// Signatures of lambda literals, keyed by the literal's node.
    pub lambda_signatures: HashMap<NodeId, LambdaSignature>,
    pub lambda_count: u32,
}

impl Analysis {
    pub fn type_of(&self, id: NodeId) -> Type {
        self.expression_types
            .get(&id)
            .copied()
            .unwrap_or(Type::Unknown)
    }
}

#[derive(Debug)]
struct ReturnContext {
    return_type: Type,
    signature: Option<LambdaSignature>,
    /// Set until the first valued `return` fixes the result type.
    infer: bool,
}

#[derive(Debug, Default)]
pub struct TypeChecker {
    pub scopes: ScopeStack,
    pub errors: Vec<Error>,
    pub expression_types: HashMap<NodeId, Type>,
    pub expression_signatures: HashMap<NodeId, LambdaSignature>,
    pub lambda_signatures: HashMap<NodeId, LambdaSignature>,
    pub lambda_count: u32,
    loop_depth: u32,
    returns: Vec<ReturnContext>,
}

impl TypeChecker {
    pub fn new() -> Self {
        Self::default()
    }

    fn report(&mut self, error: ErrorImpl, position: Position) {
        trace!(?error, line = position.line, "diagnostic");
        self.errors.push(Error::new(error, position));
    }

    fn record(&mut self, expr: &Expr, ty: Type) -> Type {
        self.expression_types.insert(expr.id, ty);
        ty
    }

    fn scope_name(&self) -> String {
        self.scopes.current().name.clone()
    }

    fn declare_parameters(&mut self, params: &[Param]) -> Vec<Parameter> {
        let scope = self.scope_name();
        let mut parameters = vec![];

        for param in params {
            let parameter = Parameter::new(&param.name, param.annotation.as_ref());
            let info = VariableInfo {
                name: parameter.name.clone(),
                ty: parameter.ty,
                scope: scope.clone(),
                line: param.span.start.line,
                is_parameter: true,
                initialized: true,
                signature: parameter.signature.clone(),
            };
            if let Err(error) = self.scopes.declare_variable(info, param.span.start) {
                self.errors.push(error);
            }
            parameters.push(parameter);
        }

        parameters
    }

    /// Assigns a value of type `ty` to `name`, declaring it on first use.
    fn assign_variable(
        &mut self,
        name: &str,
        ty: Type,
        signature: Option<LambdaSignature>,
        position: Position,
    ) {
        let existing = match self.scopes.lookup_variable(name) {
            Some(Resolution::Captured(_)) => {
                self.report(
                    ErrorImpl::CapturedVariable {
                        variable: name.to_string(),
                    },
                    position,
                );
                return;
            }
            Some(resolution) => Some(resolution.info().ty),
            None => None,
        };

        match existing {
            Some(existing) if !existing.is_compatible(&ty) => self.report(
                ErrorImpl::TypeMatchError {
                    expected: existing.to_string(),
                    received: ty.to_string(),
                },
                position,
            ),
            Some(_) => {
                if let Some(variable) = self.scopes.lookup_variable_mut(name) {
                    if variable.ty == Type::Null && ty.is_reference() {
                        variable.ty = ty;
                    }
                    if variable.ty == Type::Lambda && variable.signature.is_none() {
                        variable.signature = signature;
                    }
                    variable.initialized = true;
                }
            }
            None => {
                let info = VariableInfo {
                    name: name.to_string(),
                    ty,
                    scope: self.scope_name(),
                    line: position.line,
                    is_parameter: false,
                    initialized: true,
                    signature: if ty == Type::Lambda { signature } else { None },
                };
                if let Err(error) = self.scopes.declare_variable(info, position) {
                    self.errors.push(error);
                }
            }
        }
    }

    fn expect_numeric(&mut self, ty: Type, expr: &Expr) {
        if !ty.is_numeric() {
            self.report(
                ErrorImpl::TypeMatchError {
                    expected: Type::Number.to_string(),
                    received: ty.to_string(),
                },
                expr.span.start,
            );
        }
    }

    fn expect_one_of(&mut self, ty: Type, accepted: &[Type], expr: &Expr) {
        if !accepted.contains(&ty) {
            self.report(
                ErrorImpl::TypeMatchError {
                    expected: accepted[0].to_string(),
                    received: ty.to_string(),
                },
                expr.span.start,
            );
        }
    }

    pub fn finish(mut self) -> (Analysis, Vec<Error>) {
        self.errors
            .sort_by_key(|error| (error.get_position().line, error.get_position().column));

        let analysis = Analysis {
            symbols: self.scopes.flatten(),
            expression_types: self.expression_types,
            expression_signatures: self.expression_signatures,
            lambda_signatures: self.lambda_signatures,
            lambda_count: self.lambda_count,
        };
        (analysis, self.errors)
    }
}

/// Whether a body contains `return <expr>` outside of nested lambdas.
pub fn has_valued_return(body: &[Stmt]) -> bool {
    body.iter().any(|stmt| match &stmt.kind {
        StmtKind::Return(value) => value.is_some(),
        StmtKind::If {
            then_branch,
            else_branch,
            ..
        } => {
            has_valued_return(then_branch)
                || else_branch.as_deref().map(has_valued_return).unwrap_or(false)
        }
        StmtKind::While { body, .. }
        | StmtKind::DoUntil { body, .. }
        | StmtKind::For { body, .. }
        | StmtKind::Block(body) => has_valued_return(body),
        StmtKind::Switch { cases, default, .. } => {
            cases.iter().any(|case| has_valued_return(&case.body))
                || default.as_deref().map(has_valued_return).unwrap_or(false)
        }
        _ => false,
    })
}

/// Result types of unannotated functions, as inferred by an earlier pass.
type InferredReturns = HashMap<String, (Type, Option<LambdaSignature>)>;

fn hoist_function(
    checker: &mut TypeChecker,
    decl: &FunctionDecl,
    stmt: &Stmt,
    inferred: &InferredReturns,
) {
    let (return_type, return_signature) = match &decl.return_type {
        Some(annotation) => (
            Type::from_annotation(annotation),
            LambdaSignature::from_annotation(annotation),
        ),
        None if has_valued_return(&decl.body) => inferred
            .get(&decl.name)
            .cloned()
            .unwrap_or((Type::Unknown, None)),
        None => (Type::Void, None),
    };

    let info = FunctionInfo {
        name: decl.name.clone(),
        parameters: decl
            .params
            .iter()
            .map(|param| Parameter::new(&param.name, param.annotation.as_ref()))
            .collect(),
        return_type,
        return_signature,
        line: stmt.line(),
    };

    if let Err(error) = checker.scopes.declare_function(info, stmt.span.start) {
        checker.errors.push(error);
    }
}

fn check_function_body(checker: &mut TypeChecker, decl: &FunctionDecl) {
    // An inferred result is recomputed from the body on every pass.
    let infer = decl.return_type.is_none() && has_valued_return(&decl.body);
    let (return_type, signature) = match checker.scopes.lookup_function(&decl.name) {
        Some(_) if infer => (Type::Unknown, None),
        Some(info) => (info.return_type, info.return_signature.clone()),
        None => (Type::Unknown, None),
    };

    checker.scopes.enter_scope(ScopeKind::Function, &decl.name);
    checker.declare_parameters(&decl.params);
    let loop_depth = std::mem::replace(&mut checker.loop_depth, 0);
    checker.returns.push(ReturnContext {
        return_type,
        signature,
        infer,
    });

    for stmt in &decl.body {
        check_stmt(checker, stmt);
    }

    let context = checker.returns.pop();
    checker.loop_depth = loop_depth;
    checker.scopes.exit_scope();

    if let (true, Some(context)) = (infer, context) {
        if let Some(info) = checker.scopes.lookup_function_mut(&decl.name) {
            info.return_type = context.return_type;
            info.return_signature = context.signature;
        }
    }
}

fn check_lambda(checker: &mut TypeChecker, expr: &Expr, lambda: &Lambda) -> Type {
    let index = checker.lambda_count;
    checker.lambda_count += 1;
    let scope_name = format!("lambda#{}", index);

    checker.scopes.enter_scope(ScopeKind::Lambda, &scope_name);
    let params = checker.declare_parameters(&lambda.params);
    let loop_depth = std::mem::replace(&mut checker.loop_depth, 0);

    let declared = lambda.return_type.as_ref().map(Type::from_annotation);
    let declared_signature = lambda
        .return_type
        .as_ref()
        .and_then(LambdaSignature::from_annotation);

    let (return_type, return_signature) = match &lambda.body {
        LambdaBody::Expr(body) => {
            let ty = check_expr(checker, body);
            let signature = checker.expression_signatures.get(&body.id).cloned();
            match declared {
                Some(declared) => {
                    if !declared.is_compatible(&ty) {
                        checker.report(
                            ErrorImpl::TypeMatchError {
                                expected: declared.to_string(),
                                received: ty.to_string(),
                            },
                            body.span.start,
                        );
                    }
                    (declared, declared_signature)
                }
                None => (ty, signature),
            }
        }
        LambdaBody::Block(body) => {
            let infer = declared.is_none() && has_valued_return(body);
            let return_type = match declared {
                Some(declared) => declared,
                None if infer => Type::Unknown,
                None => Type::Void,
            };
            checker.returns.push(ReturnContext {
                return_type,
                signature: declared_signature,
                infer,
            });

            for stmt in body {
                check_stmt(checker, stmt);
            }

            match checker.returns.pop() {
                Some(context) => (context.return_type, context.signature),
                None => (return_type, None),
            }
        }
    };

    checker.loop_depth = loop_depth;
    checker.scopes.exit_scope();

    let signature = LambdaSignature {
        params,
        return_type,
        return_signature: return_signature.map(Box::new),
        scope: Some(scope_name),
    };
    checker
        .expression_signatures
        .insert(expr.id, signature.clone());
    checker.lambda_signatures.insert(expr.id, signature);

    Type::Lambda
}

/// Checks an expression whose value is used; `void` is reported.
pub fn check_value_expr(checker: &mut TypeChecker, expr: &Expr) -> Type {
    let ty = check_expr(checker, expr);
    if ty == Type::Void {
        checker.report(ErrorImpl::VoidValue, expr.span.start);
        Type::Unknown
    } else {
        ty
    }
}

fn check_arguments(checker: &mut TypeChecker, params: &[Parameter], args: &[Expr], call: &Expr) {
    let mut received = vec![];
    for arg in args {
        received.push(check_value_expr(checker, arg));
    }

    if args.len() > params.len() {
        checker.report(
            ErrorImpl::UnexpectedArguments {
                expected: params.len(),
                received: args.len(),
            },
            call.span.start,
        );
    } else if args.len() < params.len() {
        checker.report(
            ErrorImpl::MissingArguments {
                expected: params.len(),
                received: args.len(),
            },
            call.span.start,
        );
    }

    for ((param, arg), ty) in params.iter().zip(args).zip(received) {
        if !param.ty.is_compatible(&ty) {
            checker.report(
                ErrorImpl::ArgumentTypeMatchError {
                    expected: param.ty.to_string(),
                    received: ty.to_string(),
                },
                arg.span.start,
            );
        }
    }
}

/// Calls through a lambda value. Without a known signature any arguments
/// are accepted and the result is a number.
fn apply_signature(
    checker: &mut TypeChecker,
    signature: Option<LambdaSignature>,
    args: &[Expr],
    call: &Expr,
) -> Type {
    match signature {
        Some(signature) => {
            check_arguments(checker, &signature.params, args, call);
            if let Some(returned) = signature.return_signature {
                checker.expression_signatures.insert(call.id, *returned);
            }
            signature.return_type
        }
        None => {
            for arg in args {
                check_value_expr(checker, arg);
            }
            Type::Number
        }
    }
}

fn check_call(checker: &mut TypeChecker, expr: &Expr, callee: &Expr, args: &[Expr]) -> Type {
    let name = match callee.as_identifier() {
        Some(name) => name,
        None => {
            let ty = check_value_expr(checker, callee);
            if ty == Type::Lambda || ty == Type::Unknown {
                let signature = checker.expression_signatures.get(&callee.id).cloned();
                return apply_signature(checker, signature, args, expr);
            }

            checker.report(
                ErrorImpl::NotCallable {
                    name: String::from("expression"),
                    type_: ty.to_string(),
                },
                callee.span.start,
            );
            apply_signature(checker, None, args, expr);
            return Type::Unknown;
        }
    };

    let variable = match checker.scopes.lookup_variable(name) {
        Some(Resolution::Captured(_)) => Err(()),
        Some(resolution) => Ok(Some((resolution.info().ty, resolution.info().signature.clone()))),
        None => Ok(None),
    };

    match variable {
        Err(()) => {
            checker.report(
                ErrorImpl::CapturedVariable {
                    variable: name.to_string(),
                },
                callee.span.start,
            );
            apply_signature(checker, None, args, expr);
            Type::Unknown
        }
        Ok(Some((Type::Lambda, signature))) => {
            checker.record(callee, Type::Lambda);
            if let Some(signature) = &signature {
                checker
                    .expression_signatures
                    .insert(callee.id, signature.clone());
            }
            apply_signature(checker, signature, args, expr)
        }
        Ok(Some((ty, _))) => {
            checker.record(callee, ty);
            checker.report(
                ErrorImpl::NotCallable {
                    name: name.to_string(),
                    type_: ty.to_string(),
                },
                callee.span.start,
            );
            apply_signature(checker, None, args, expr);
            Type::Unknown
        }
        Ok(None) => match checker.scopes.lookup_function(name).cloned() {
            Some(function) => {
                check_arguments(checker, &function.parameters, args, expr);
                if let Some(returned) = function.return_signature {
                    checker.expression_signatures.insert(expr.id, returned);
                }
                function.return_type
            }
            None => {
                checker.report(
                    ErrorImpl::FunctionNotDeclared {
                        function: name.to_string(),
                    },
                    callee.span.start,
                );
                apply_signature(checker, None, args, expr);
                Type::Unknown
            }
        },
    }
}

fn check_binary(checker: &mut TypeChecker, op: BinaryOp, left: &Expr, right: &Expr) -> Type {
    let lhs = check_value_expr(checker, left);
    let rhs = check_value_expr(checker, right);

    match op {
        BinaryOp::Add if lhs == Type::String || rhs == Type::String => Type::String,
        BinaryOp::Multiply if lhs == Type::String && rhs.is_numeric() => Type::String,
        BinaryOp::Multiply if rhs == Type::String && lhs.is_numeric() => Type::String,
        BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide => {
            checker.expect_numeric(lhs, left);
            checker.expect_numeric(rhs, right);
            Type::Number
        }
        BinaryOp::Less | BinaryOp::LessEquals | BinaryOp::Greater | BinaryOp::GreaterEquals => {
            checker.expect_numeric(lhs, left);
            checker.expect_numeric(rhs, right);
            Type::Bool
        }
        BinaryOp::Equals | BinaryOp::NotEquals | BinaryOp::And | BinaryOp::Or => Type::Bool,
    }
}

const LIST_LIKE: [Type; 3] = [Type::List, Type::Unknown, Type::Null];
const STRUCT_LIKE: [Type; 3] = [Type::Struct, Type::Unknown, Type::Null];
const SIZED: [Type; 3] = [Type::List, Type::String, Type::Unknown];

pub fn check_expr(checker: &mut TypeChecker, expr: &Expr) -> Type {
    let ty = match &expr.kind {
        ExprKind::Number(_) => Type::Number,
        ExprKind::String(_) => Type::String,
        ExprKind::Bool(_) => Type::Bool,
        ExprKind::Null => Type::Null,
        ExprKind::Identifier(name) => match checker.scopes.lookup_variable(name) {
            Some(Resolution::Captured(_)) => {
                checker.report(
                    ErrorImpl::CapturedVariable {
                        variable: name.clone(),
                    },
                    expr.span.start,
                );
                Type::Unknown
            }
            Some(resolution) => {
                let info = resolution.info();
                let (ty, signature) = (info.ty, info.signature.clone());
                if let Some(signature) = signature {
                    checker.expression_signatures.insert(expr.id, signature);
                }
                ty
            }
            None => {
                checker.report(
                    ErrorImpl::VariableNotDeclared {
                        variable: name.clone(),
                    },
                    expr.span.start,
                );
                Type::Unknown
            }
        },
        ExprKind::List(items) => {
            for item in items {
                check_value_expr(checker, item);
            }
            Type::List
        }
        ExprKind::Struct(fields) => {
            for (_, value) in fields {
                check_value_expr(checker, value);
            }
            Type::Struct
        }
        ExprKind::Binary { op, left, right } => check_binary(checker, *op, left, right),
        ExprKind::Unary { op, operand } => {
            let ty = check_value_expr(checker, operand);
            match op {
                UnaryOp::Negate => {
                    checker.expect_numeric(ty, operand);
                    Type::Number
                }
                UnaryOp::Not => Type::Bool,
            }
        }
        ExprKind::Index { list, index } => {
            let list_ty = check_value_expr(checker, list);
            checker.expect_one_of(list_ty, &LIST_LIKE, list);
            let index_ty = check_value_expr(checker, index);
            checker.expect_numeric(index_ty, index);
            Type::Unknown
        }
        ExprKind::Field { target, .. } => {
            let target_ty = check_value_expr(checker, target);
            checker.expect_one_of(target_ty, &STRUCT_LIKE, target);
            Type::Unknown
        }
        ExprKind::Call { callee, args } => check_call(checker, expr, callee, args),
        ExprKind::Lambda(lambda) => check_lambda(checker, expr, lambda),
        ExprKind::Append { list, value } => {
            let list_ty = check_value_expr(checker, list);
            checker.expect_one_of(list_ty, &LIST_LIKE, list);
            check_value_expr(checker, value);

            // Appending to `null` builds a fresh list that is written back.
            if let (Type::Null, Some(name)) = (list_ty, list.as_identifier()) {
                if let Some(variable) = checker.scopes.lookup_variable_mut(name) {
                    if variable.ty == Type::Null {
                        variable.ty = Type::List;
                    }
                }
            }
            Type::List
        }
        ExprKind::Len(target) => {
            let ty = check_value_expr(checker, target);
            checker.expect_one_of(ty, &SIZED, target);
            Type::Number
        }
        ExprKind::Dequeue(target) => {
            let ty = check_value_expr(checker, target);
            checker.expect_one_of(ty, &LIST_LIKE, target);
            Type::Unknown
        }
        ExprKind::Read => Type::Number,
    };

    checker.record(expr, ty)
}

fn check_body(checker: &mut TypeChecker, body: &[Stmt]) {
    for stmt in body {
        check_stmt(checker, stmt);
    }
}

fn check_loop_body(checker: &mut TypeChecker, body: &[Stmt]) {
    checker.loop_depth += 1;
    check_body(checker, body);
    checker.loop_depth -= 1;
}

pub fn check_stmt(checker: &mut TypeChecker, stmt: &Stmt) {
    match &stmt.kind {
        // Checked after the top-level statements.
        StmtKind::FunctionDecl(_) => {}
        StmtKind::Assign { target, value, .. } => {
            let ty = check_value_expr(checker, value);
            let signature = checker.expression_signatures.get(&value.id).cloned();
            checker.assign_variable(target, ty, signature, stmt.span.start);
        }
        StmtKind::IndexAssign { list, index, value } => {
            let list_ty = check_value_expr(checker, list);
            checker.expect_one_of(list_ty, &LIST_LIKE, list);
            let index_ty = check_value_expr(checker, index);
            checker.expect_numeric(index_ty, index);
            check_value_expr(checker, value);
        }
        StmtKind::FieldAssign { target, value, .. } => {
            let target_ty = match checker.scopes.lookup_variable(target) {
                Some(Resolution::Captured(_)) => {
                    checker.report(
                        ErrorImpl::CapturedVariable {
                            variable: target.clone(),
                        },
                        stmt.span.start,
                    );
                    Type::Unknown
                }
                Some(resolution) => resolution.info().ty,
                None => {
                    checker.report(
                        ErrorImpl::VariableNotDeclared {
                            variable: target.clone(),
                        },
                        stmt.span.start,
                    );
                    Type::Unknown
                }
            };
            if !STRUCT_LIKE.contains(&target_ty) {
                checker.report(
                    ErrorImpl::TypeMatchError {
                        expected: Type::Struct.to_string(),
                        received: target_ty.to_string(),
                    },
                    stmt.span.start,
                );
            }
            check_value_expr(checker, value);
        }
        StmtKind::MultiAssign { targets, values } => {
            let mut assigned = vec![];
            for value in values {
                let ty = check_value_expr(checker, value);
                assigned.push((ty, checker.expression_signatures.get(&value.id).cloned()));
            }

            if targets.len() != values.len() {
                checker.report(
                    ErrorImpl::AssignmentCountMismatch {
                        targets: targets.len(),
                        values: values.len(),
                    },
                    stmt.span.start,
                );
                return;
            }

            for (target, (ty, signature)) in targets.iter().zip(assigned) {
                checker.assign_variable(target, ty, signature, stmt.span.start);
            }
        }
        StmtKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            check_value_expr(checker, condition);
            check_body(checker, then_branch);
            if let Some(else_branch) = else_branch {
                check_body(checker, else_branch);
            }
        }
        StmtKind::While { condition, body } => {
            check_value_expr(checker, condition);
            check_loop_body(checker, body);
        }
        StmtKind::DoUntil { body, condition } => {
            check_loop_body(checker, body);
            check_value_expr(checker, condition);
        }
        StmtKind::For {
            var,
            start,
            end,
            body,
        } => {
            let start_ty = check_value_expr(checker, start);
            checker.expect_numeric(start_ty, start);
            let end_ty = check_value_expr(checker, end);
            checker.expect_numeric(end_ty, end);
            checker.assign_variable(var, Type::Number, None, stmt.span.start);
            check_loop_body(checker, body);
        }
        StmtKind::Switch {
            subject,
            cases,
            default,
        } => {
            check_value_expr(checker, subject);
            for case in cases {
                check_value_expr(checker, &case.value);
                check_body(checker, &case.body);
            }
            if let Some(default) = default {
                check_body(checker, default);
            }
        }
        StmtKind::Break => {
            if checker.loop_depth == 0 {
                checker.report(ErrorImpl::BreakOutsideLoop, stmt.span.start);
            }
        }
        StmtKind::Continue => {
            if checker.loop_depth == 0 {
                checker.report(ErrorImpl::ContinueOutsideLoop, stmt.span.start);
            }
        }
        StmtKind::Return(value) => check_return(checker, stmt, value.as_ref()),
        StmtKind::Write(args) => {
            for arg in args {
                check_value_expr(checker, arg);
            }
        }
        StmtKind::Expr(expr) => {
            check_expr(checker, expr);
        }
        StmtKind::Block(body) => check_body(checker, body),
    }
}

fn check_return(checker: &mut TypeChecker, stmt: &Stmt, value: Option<&Expr>) {
    let value = match value {
        Some(value) => value,
        None => return,
    };

    let ty = check_value_expr(checker, value);
    let signature = checker.expression_signatures.get(&value.id).cloned();

    let expected = match checker.returns.last_mut() {
        None => {
            checker.report(ErrorImpl::ReturnOutsideFunction, stmt.span.start);
            return;
        }
        Some(context) if context.infer => {
            context.return_type = ty;
            context.signature = signature;
            context.infer = false;
            return;
        }
        Some(context) => context.return_type,
    };

    if expected == Type::Void || !expected.is_compatible(&ty) {
        checker.report(
            ErrorImpl::TypeMatchError {
                expected: expected.to_string(),
                received: ty.to_string(),
            },
            value.span.start,
        );
    }
}

fn check_program(program: &Program, inferred: &InferredReturns) -> TypeChecker {
    let mut checker = TypeChecker::new();

    for stmt in &program.body {
        if let StmtKind::FunctionDecl(decl) = &stmt.kind {
            hoist_function(&mut checker, decl, stmt, inferred);
        }
    }

    for stmt in &program.body {
        check_stmt(&mut checker, stmt);
    }

    for stmt in &program.body {
        if let StmtKind::FunctionDecl(decl) = &stmt.kind {
            check_function_body(&mut checker, decl);
        }
    }

    checker
}

/// The result types the last pass inferred for unannotated functions.
fn inferred_returns(checker: &TypeChecker, program: &Program) -> InferredReturns {
    let mut inferred = HashMap::new();

    for stmt in &program.body {
        if let StmtKind::FunctionDecl(decl) = &stmt.kind {
            if decl.return_type.is_some() || !has_valued_return(&decl.body) {
                continue;
            }
            if let Some(info) = checker.scopes.lookup_function(&decl.name) {
                if info.return_type != Type::Unknown {
                    inferred.insert(
                        decl.name.clone(),
                        (info.return_type, info.return_signature.clone()),
                    );
                }
            }
        }
    }

    inferred
}

/// Checks a whole program and returns the analysis plus every diagnostic.
///
/// Function signatures are declared before anything else. Top-level
/// statements are then checked in order, and function bodies last, so a
/// body may use any global the program assigns.
///
/// Unannotated result types are only known once a body has been checked, so
/// the program is checked again with the results of the previous pass until
/// they stop changing. Only the diagnostics of the last pass are kept.
pub fn type_check(program: &Program) -> (Analysis, Vec<Error>) {
    let max_passes = program
        .body
        .iter()
        .filter(|stmt| matches!(stmt.kind, StmtKind::FunctionDecl(_)))
        .count()
        + 2;

    let mut inferred = InferredReturns::new();
    let mut passes = 1;
    let checker = loop {
        let checker = check_program(program, &inferred);
        let results = inferred_returns(&checker, program);
        if results == inferred || passes >= max_passes {
            break checker;
        }

        trace!(pass = passes, inferred = results.len(), "return types changed");
        inferred = results;
        passes += 1;
    };

    let (analysis, errors) = checker.finish();
    debug!(
        variables = analysis.symbols.variables.len(),
        functions = analysis.symbols.functions.len(),
        lambdas = analysis.lambda_count,
        passes,
        errors = errors.len(),
        "type check finished"
    );

    (analysis, errors)
}
