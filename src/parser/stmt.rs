use crate::{
    ast::{
        expressions::{Expr, ExprKind, Param},
        statements::{AssignForm, FunctionDecl, Stmt, StmtKind, SwitchCase},
    },
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::TokenKind,
    parser::{expr::parse_expr, lookups::BindingPower},
};

use super::{parser::Parser, types::parse_type};

pub fn parse_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let stmt_fn = parser
        .get_stmt_lookup()
        .get(&parser.current_token_kind())
        .copied();
    if let Some(stmt_fn) = stmt_fn {
        return stmt_fn(parser);
    }

    parse_expression_stmt(parser)
}

/// Parses `{ statement* }` and returns the statements.
pub fn parse_block(parser: &mut Parser) -> Result<Vec<Stmt>, Error> {
    parser.expect(TokenKind::OpenCurly)?;
    parser.block_depth += 1;

    let mut body = vec![];
    while parser.current_token_kind() != TokenKind::CloseCurly {
        if !parser.has_tokens() {
            parser.block_depth -= 1;
            return Err(parser.error_here("expected `}` before the end of the file"));
        }
        body.push(parse_stmt(parser)?);
    }

    parser.block_depth -= 1;
    parser.expect(TokenKind::CloseCurly)?;
    Ok(body)
}

/// Parses `( name (: type)?, ... )` for functions and lambdas.
pub fn parse_params(parser: &mut Parser) -> Result<Vec<Param>, Error> {
    parser.expect(TokenKind::OpenParen)?;

    let mut params = vec![];
    while parser.current_token_kind() != TokenKind::CloseParen {
        let error = parser.error_here("expected parameter name");
        let name_token = parser.expect_error(TokenKind::Identifier, Some(error))?;

        let annotation = if parser.current_token_kind() == TokenKind::Colon {
            parser.advance();
            Some(parse_type(parser)?)
        } else {
            None
        };

        params.push(Param {
            name: name_token.value,
            annotation,
            span: parser.span_from(name_token.span.start),
        });

        if parser.current_token_kind() != TokenKind::CloseParen {
            parser.expect(TokenKind::Comma)?;
        }
    }

    parser.expect(TokenKind::CloseParen)?;
    Ok(params)
}

/// Statements that start with an expression: assignments of every form and
/// bare expression statements.
pub fn parse_expression_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.get_position();
    let expr = parse_expr(parser, BindingPower::Default)?;

    let kind = match parser.current_token_kind() {
        TokenKind::Assignment => {
            parser.advance();
            let value = parse_expr(parser, BindingPower::Default)?;
            assignment(expr, value, AssignForm::Plain)?
        }
        TokenKind::LeftArrow => {
            parser.advance();
            let value = parse_expr(parser, BindingPower::Default)?;
            match expr.kind {
                ExprKind::Identifier(target) => StmtKind::Assign {
                    target,
                    value,
                    form: AssignForm::LeftArrow,
                },
                _ => return Err(invalid_target(&expr)),
            }
        }
        TokenKind::Arrow => {
            parser.advance();
            let error = parser.error_here("expected variable name after `->`");
            let target = parser.expect_error(TokenKind::Identifier, Some(error))?.value;
            StmtKind::Assign {
                target,
                value: expr,
                form: AssignForm::RightArrow,
            }
        }
        TokenKind::Comma => parse_multi_assign(parser, expr)?,
        _ => StmtKind::Expr(expr),
    };

    parser.expect(TokenKind::Semicolon)?;

    Ok(Stmt {
        kind,
        span: parser.span_from(start),
    })
}

fn invalid_target(expr: &Expr) -> Error {
    Error::new(
        ErrorImpl::UnexpectedTokenDetailed {
            token: String::from("="),
            message: String::from("invalid assignment target"),
        },
        expr.span.start,
    )
}

fn assignment(target: Expr, value: Expr, form: AssignForm) -> Result<StmtKind, Error> {
    match target.kind {
        ExprKind::Identifier(name) => Ok(StmtKind::Assign {
            target: name,
            value,
            form,
        }),
        ExprKind::Index { list, index } => Ok(StmtKind::IndexAssign {
            list: *list,
            index: *index,
            value,
        }),
        ExprKind::Field { target: base, field } => match base.kind {
            ExprKind::Identifier(name) => Ok(StmtKind::FieldAssign {
                target: name,
                field,
                value,
            }),
            _ => Err(invalid_target(&base)),
        },
        _ => Err(invalid_target(&target)),
    }
}

/// `a, b, c = x, y, z`
fn parse_multi_assign(parser: &mut Parser, first: Expr) -> Result<StmtKind, Error> {
    let mut targets = vec![match first.kind {
        ExprKind::Identifier(name) => name,
        _ => return Err(invalid_target(&first)),
    }];

    while parser.current_token_kind() == TokenKind::Comma {
        parser.advance();
        targets.push(parser.expect(TokenKind::Identifier)?.value);
    }

    parser.expect(TokenKind::Assignment)?;

    let mut values = vec![parse_expr(parser, BindingPower::Comma)?];
    while parser.current_token_kind() == TokenKind::Comma {
        parser.advance();
        values.push(parse_expr(parser, BindingPower::Comma)?);
    }

    Ok(StmtKind::MultiAssign { targets, values })
}

pub fn parse_block_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.get_position();
    let body = parse_block(parser)?;

    Ok(Stmt {
        kind: StmtKind::Block(body),
        span: parser.span_from(start),
    })
}

pub fn parse_fn_decl_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    if parser.block_depth > 0 {
        return Err(parser.error_here("functions can only be declared at the top level"));
    }

    let start = parser.advance().span.start;
    let error = parser.error_here("expected function name");
    let name = parser.expect_error(TokenKind::Identifier, Some(error))?.value;
    let params = parse_params(parser)?;

    let return_type = if parser.current_token_kind() == TokenKind::Arrow {
        parser.advance();
        Some(parse_type(parser)?)
    } else {
        None
    };

    let body = parse_block(parser)?;

    Ok(Stmt {
        kind: StmtKind::FunctionDecl(FunctionDecl {
            name,
            params,
            return_type,
            body,
        }),
        span: parser.span_from(start),
    })
}

pub fn parse_if_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start;

    let condition = parse_expr(parser, BindingPower::Default)?;
    let then_branch = parse_block(parser)?;

    let else_branch = if parser.current_token_kind() == TokenKind::Else {
        parser.advance();
        if parser.current_token_kind() == TokenKind::If {
            Some(vec![parse_if_stmt(parser)?])
        } else {
            Some(parse_block(parser)?)
        }
    } else {
        None
    };

    Ok(Stmt {
        kind: StmtKind::If {
            condition,
            then_branch,
            else_branch,
        },
        span: parser.span_from(start),
    })
}

pub fn parse_while_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start;

    let condition = parse_expr(parser, BindingPower::Default)?;
    let body = parse_block(parser)?;

    Ok(Stmt {
        kind: StmtKind::While { condition, body },
        span: parser.span_from(start),
    })
}

pub fn parse_do_until_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start;

    let body = parse_block(parser)?;
    parser.expect(TokenKind::Until)?;
    let condition = parse_expr(parser, BindingPower::Default)?;
    parser.expect(TokenKind::Semicolon)?;

    Ok(Stmt {
        kind: StmtKind::DoUntil { body, condition },
        span: parser.span_from(start),
    })
}

pub fn parse_for_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start;

    let error = parser.error_here("expected loop variable");
    let var = parser.expect_error(TokenKind::Identifier, Some(error))?.value;
    parser.expect(TokenKind::Assignment)?;
    let from = parse_expr(parser, BindingPower::Default)?;
    parser.expect(TokenKind::To)?;
    let to = parse_expr(parser, BindingPower::Default)?;
    let body = parse_block(parser)?;

    Ok(Stmt {
        kind: StmtKind::For {
            var,
            start: from,
            end: to,
            body,
        },
        span: parser.span_from(start),
    })
}

/// Statements of a `case` or `default` arm run until the next arm or `}`.
fn parse_case_body(parser: &mut Parser) -> Result<Vec<Stmt>, Error> {
    let mut body = vec![];

    while !matches!(
        parser.current_token_kind(),
        TokenKind::Case | TokenKind::Default | TokenKind::CloseCurly | TokenKind::EOF
    ) {
        body.push(parse_stmt(parser)?);
    }

    Ok(body)
}

pub fn parse_switch_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start;

    let subject = parse_expr(parser, BindingPower::Default)?;
    parser.expect(TokenKind::OpenCurly)?;
    parser.block_depth += 1;

    let mut cases = vec![];
    let mut default = None;

    loop {
        match parser.current_token_kind() {
            TokenKind::Case if default.is_none() => {
                parser.advance();
                let value = parse_expr(parser, BindingPower::Default)?;
                parser.expect(TokenKind::Colon)?;
                let body = parse_case_body(parser)?;
                cases.push(SwitchCase { value, body });
            }
            TokenKind::Default if default.is_none() => {
                parser.advance();
                parser.expect(TokenKind::Colon)?;
                default = Some(parse_case_body(parser)?);
            }
            TokenKind::CloseCurly => break,
            _ => return Err(parser.error_here("expected `case`, `default` or `}` in switch")),
        }
    }

    parser.block_depth -= 1;
    parser.expect(TokenKind::CloseCurly)?;

    Ok(Stmt {
        kind: StmtKind::Switch {
            subject,
            cases,
            default,
        },
        span: parser.span_from(start),
    })
}

pub fn parse_loop_control_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let token = parser.advance().clone();
    parser.expect(TokenKind::Semicolon)?;

    let kind = match token.kind {
        TokenKind::Break => StmtKind::Break,
        _ => StmtKind::Continue,
    };

    Ok(Stmt {
        kind,
        span: parser.span_from(token.span.start),
    })
}

pub fn parse_return_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start;

    let value = if parser.current_token_kind() == TokenKind::Semicolon {
        None
    } else {
        Some(parse_expr(parser, BindingPower::Default)?)
    };

    parser.expect(TokenKind::Semicolon)?;

    Ok(Stmt {
        kind: StmtKind::Return(value),
        span: parser.span_from(start),
    })
}

pub fn parse_write_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start;
    parser.expect(TokenKind::OpenParen)?;

    let mut args = vec![];
    while parser.current_token_kind() != TokenKind::CloseParen {
        args.push(parse_expr(parser, BindingPower::Comma)?);

        if parser.current_token_kind() != TokenKind::CloseParen {
            parser.expect(TokenKind::Comma)?;
        }
    }

    parser.expect(TokenKind::CloseParen)?;
    parser.expect(TokenKind::Semicolon)?;

    Ok(Stmt {
        kind: StmtKind::Write(args),
        span: parser.span_from(start),
    })
}
