use crate::Span;

use super::{
    expressions::{Expr, Param},
    types::TypeAnnotation,
};

/// Which spelling an identifier assignment used. All three behave the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignForm {
    /// `x = value;`
    Plain,
    /// `x <- value;`
    LeftArrow,
    /// `value -> x;`
    RightArrow,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<TypeAnnotation>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub value: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn line(&self) -> u32 {
        self.span.start.line
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    FunctionDecl(FunctionDecl),
    Assign {
        target: String,
        value: Expr,
        form: AssignForm,
    },
    IndexAssign {
        list: Expr,
        index: Expr,
        value: Expr,
    },
    FieldAssign {
        target: String,
        field: String,
        value: Expr,
    },
    MultiAssign {
        targets: Vec<String>,
        values: Vec<Expr>,
    },
    If {
        condition: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Option<Vec<Stmt>>,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
    },
    DoUntil {
        body: Vec<Stmt>,
        condition: Expr,
    },
    /// `for var = start to end { ... }`, inclusive of both bounds.
    For {
        var: String,
        start: Expr,
        end: Expr,
        body: Vec<Stmt>,
    },
    Switch {
        subject: Expr,
        cases: Vec<SwitchCase>,
        default: Option<Vec<Stmt>>,
    },
    Break,
    Continue,
    Return(Option<Expr>),
    Write(Vec<Expr>),
    Expr(Expr),
    Block(Vec<Stmt>),
}
