//! Discovery of the locals a function body needs.
//!
//! Before a body is emitted its statements are walked once, without entering
//! nested lambdas, and every identifier in a variable position is resolved
//! against the symbol table: first as `owner::name`, then as a global.
//! Names that resolve to neither become `f64` locals, or extra globals when
//! the body is the top-level program.

use std::collections::HashSet;

use crate::{
    ast::{
        expressions::{Expr, ExprKind},
        statements::{Stmt, StmtKind},
    },
    type_checker::{scope::SymbolTable, types::ValType},
};

#[derive(Debug, Default, PartialEq)]
pub struct LocalDiscovery {
    /// Locals in first-occurrence order, parameters excluded.
    pub locals: Vec<(String, ValType)>,
    /// Top-level names missing from the symbol table.
    pub extra_globals: Vec<String>,
}

struct Walker<'a> {
    owner: Option<&'a str>,
    params: &'a [String],
    symbols: &'a SymbolTable,
    seen: HashSet<String>,
    found: LocalDiscovery,
}

impl<'a> Walker<'a> {
    fn record(&mut self, name: &str) {
        if self.params.iter().any(|param| param == name) || !self.seen.insert(name.to_string()) {
            return;
        }

        if let Some(owner) = self.owner {
            if let Some(info) = self.symbols.local(owner, name) {
                let kind = info.ty.val_type().unwrap_or(ValType::F64);
                self.found.locals.push((name.to_string(), kind));
                return;
            }
        }

        if self.symbols.global(name).is_some() {
            return;
        }

        match self.owner {
            Some(_) => self.found.locals.push((name.to_string(), ValType::F64)),
            None => self.found.extra_globals.push(name.to_string()),
        }
    }

    /// A callee name only counts when it names a variable.
    fn record_callee(&mut self, name: &str) {
        let is_variable = self
            .owner
            .map(|owner| self.symbols.local(owner, name).is_some())
            .unwrap_or(false)
            || self.symbols.global(name).is_some();

        if is_variable {
            self.record(name);
        }
    }

    fn visit_body(&mut self, body: &[Stmt]) {
        for stmt in body {
            self.visit_stmt(stmt);
        }
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::FunctionDecl(_) | StmtKind::Break | StmtKind::Continue => {}
            StmtKind::Assign { target, value, .. } => {
                self.visit_expr(value);
                self.record(target);
            }
            StmtKind::IndexAssign { list, index, value } => {
                self.visit_expr(list);
                self.visit_expr(index);
                self.visit_expr(value);
            }
            StmtKind::FieldAssign { target, value, .. } => {
                self.record(target);
                self.visit_expr(value);
            }
            StmtKind::MultiAssign { targets, values } => {
                for value in values {
                    self.visit_expr(value);
                }
                for target in targets {
                    self.record(target);
                }
            }
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.visit_expr(condition);
                self.visit_body(then_branch);
                if let Some(else_branch) = else_branch {
                    self.visit_body(else_branch);
                }
            }
            StmtKind::While { condition, body } | StmtKind::DoUntil { body, condition } => {
                self.visit_expr(condition);
                self.visit_body(body);
            }
            StmtKind::For {
                var,
                start,
                end,
                body,
            } => {
                self.record(var);
                self.visit_expr(start);
                self.visit_expr(end);
                self.visit_body(body);
            }
            StmtKind::Switch {
                subject,
                cases,
                default,
            } => {
                self.visit_expr(subject);
                for case in cases {
                    self.visit_expr(&case.value);
                    self.visit_body(&case.body);
                }
                if let Some(default) = default {
                    self.visit_body(default);
                }
            }
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.visit_expr(value);
                }
            }
            StmtKind::Write(args) => {
                for arg in args {
                    self.visit_expr(arg);
                }
            }
            StmtKind::Expr(expr) => self.visit_expr(expr),
            StmtKind::Block(body) => self.visit_body(body),
        }
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Number(_)
            | ExprKind::String(_)
            | ExprKind::Bool(_)
            | ExprKind::Null
            | ExprKind::Read
            // Lambdas get their own locals.
            | ExprKind::Lambda(_) => {}
            ExprKind::Identifier(name) => self.record(name),
            ExprKind::List(items) => {
                for item in items {
                    self.visit_expr(item);
                }
            }
            ExprKind::Struct(fields) => {
                for (_, value) in fields {
                    self.visit_expr(value);
                }
            }
            ExprKind::Binary { left, right, .. } => {
                self.visit_expr(left);
                self.visit_expr(right);
            }
            ExprKind::Unary { operand, .. } => self.visit_expr(operand),
            ExprKind::Index { list, index } => {
                self.visit_expr(list);
                self.visit_expr(index);
            }
            ExprKind::Field { target, .. } => self.visit_expr(target),
            ExprKind::Call { callee, args } => {
                match callee.as_identifier() {
                    Some(name) => self.record_callee(name),
                    None => self.visit_expr(callee),
                }
                for arg in args {
                    self.visit_expr(arg);
                }
            }
            ExprKind::Append { list, value } => {
                self.visit_expr(list);
                self.visit_expr(value);
            }
            ExprKind::Len(target) | ExprKind::Dequeue(target) => self.visit_expr(target),
        }
    }
}

/// Walks `body` as seen by `owner` (`None` for the top-level program).
pub fn discover_locals(
    body: &[Stmt],
    owner: Option<&str>,
    params: &[String],
    symbols: &SymbolTable,
) -> LocalDiscovery {
    let mut walker = Walker {
        owner,
        params,
        symbols,
        seen: HashSet::new(),
        found: LocalDiscovery::default(),
    };
    walker.visit_body(body);
    walker.found
}

/// Same as [`discover_locals`] for a lambda whose body is one expression.
pub fn discover_expr_locals(
    expr: &Expr,
    owner: Option<&str>,
    params: &[String],
    symbols: &SymbolTable,
) -> LocalDiscovery {
    let mut walker = Walker {
        owner,
        params,
        symbols,
        seen: HashSet::new(),
        found: LocalDiscovery::default(),
    };
    walker.visit_expr(expr);
    walker.found
}
