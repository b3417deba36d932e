use crate::{
    ast::expressions::{BinaryOp, Expr, ExprKind, Lambda, LambdaBody, Param, UnaryOp},
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::TokenKind,
    Position, Span,
};

use super::{
    lookups::BindingPower,
    parser::Parser,
    stmt::{parse_block, parse_params},
    types::parse_type,
};

fn make_expr(parser: &mut Parser, kind: ExprKind, span: Span) -> Expr {
    Expr {
        id: parser.advance_id(),
        kind,
        span,
    }
}

pub fn parse_expr(parser: &mut Parser, bp: BindingPower) -> Result<Expr, Error> {
    // First parse NUD
    let token_kind = parser.current_token_kind();
    let nud_fn = match parser.get_nud_lookup().get(&token_kind) {
        Some(nud_fn) => *nud_fn,
        None => {
            return Err(Error::new(
                ErrorImpl::UnexpectedToken {
                    token: parser.current_token().value.clone(),
                },
                parser.get_position(),
            ))
        }
    };

    let mut left = nud_fn(parser)?;

    // While LED and current BP is less than BP of current token, continue parsing lhs
    loop {
        let token_kind = parser.current_token_kind();
        let token_bp = *parser
            .get_bp_lookup()
            .get(&token_kind)
            .unwrap_or(&BindingPower::Default);
        if token_bp <= bp {
            break;
        }

        let led_fn = match parser.get_led_lookup().get(&token_kind) {
            Some(led_fn) => *led_fn,
            None => {
                return Err(Error::new(
                    ErrorImpl::UnexpectedToken {
                        token: parser.current_token().value.clone(),
                    },
                    parser.get_position(),
                ))
            }
        };

        left = led_fn(parser, left, token_bp)?;
    }

    Ok(left)
}

pub fn parse_primary_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let token = parser.current_token().clone();
    let kind = match token.kind {
        TokenKind::Number => match token.value.parse::<f64>() {
            Ok(value) => ExprKind::Number(value),
            Err(_) => {
                return Err(Error::new(
                    ErrorImpl::NumberParseError { token: token.value },
                    token.span.start,
                ))
            }
        },
        TokenKind::Identifier => ExprKind::Identifier(token.value.clone()),
        TokenKind::String => ExprKind::String(token.value.clone()),
        TokenKind::True => ExprKind::Bool(true),
        TokenKind::False => ExprKind::Bool(false),
        TokenKind::Null => ExprKind::Null,
        _ => {
            return Err(Error::new(
                ErrorImpl::UnexpectedToken { token: token.value },
                token.span.start,
            ))
        }
    };

    parser.advance();
    Ok(make_expr(parser, kind, token.span))
}

fn binary_op(kind: TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Dash => BinaryOp::Subtract,
        TokenKind::Star => BinaryOp::Multiply,
        TokenKind::Slash => BinaryOp::Divide,
        TokenKind::Less => BinaryOp::Less,
        TokenKind::LessEquals => BinaryOp::LessEquals,
        TokenKind::Greater => BinaryOp::Greater,
        TokenKind::GreaterEquals => BinaryOp::GreaterEquals,
        TokenKind::Equals => BinaryOp::Equals,
        TokenKind::NotEquals => BinaryOp::NotEquals,
        TokenKind::And => BinaryOp::And,
        TokenKind::Or => BinaryOp::Or,
        _ => return None,
    })
}

pub fn parse_binary_expr(parser: &mut Parser, left: Expr, bp: BindingPower) -> Result<Expr, Error> {
    let operator_token = parser.advance().clone();
    let op = binary_op(operator_token.kind).ok_or_else(|| {
        Error::new(
            ErrorImpl::UnexpectedToken {
                token: operator_token.value.clone(),
            },
            operator_token.span.start,
        )
    })?;

    let right = parse_expr(parser, bp)?;
    let span = Span {
        start: left.span.start,
        end: right.span.end,
    };

    Ok(make_expr(
        parser,
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    ))
}

pub fn parse_append_expr(parser: &mut Parser, left: Expr, bp: BindingPower) -> Result<Expr, Error> {
    parser.expect(TokenKind::ShiftLeft)?;
    let value = parse_expr(parser, bp)?;
    let span = Span {
        start: left.span.start,
        end: value.span.end,
    };

    Ok(make_expr(
        parser,
        ExprKind::Append {
            list: Box::new(left),
            value: Box::new(value),
        },
        span,
    ))
}

pub fn parse_prefix_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let operator_token = parser.advance().clone();
    let op = match operator_token.kind {
        TokenKind::Dash => UnaryOp::Negate,
        _ => UnaryOp::Not,
    };
    let operand = parse_expr(parser, BindingPower::Unary)?;
    let span = Span {
        start: operator_token.span.start,
        end: operand.span.end,
    };

    Ok(make_expr(
        parser,
        ExprKind::Unary {
            op,
            operand: Box::new(operand),
        },
        span,
    ))
}

pub fn parse_grouping_expr(parser: &mut Parser) -> Result<Expr, Error> {
    parser.expect(TokenKind::OpenParen)?;
    let expr = parse_expr(parser, BindingPower::Default)?;
    parser.expect(TokenKind::CloseParen)?;

    Ok(expr)
}

/// Parses comma separated expressions up to (and including) `close`.
/// A trailing comma is accepted.
fn parse_expr_list(parser: &mut Parser, close: TokenKind) -> Result<Vec<Expr>, Error> {
    let mut items = vec![];

    while parser.current_token_kind() != close {
        items.push(parse_expr(parser, BindingPower::Comma)?);

        if parser.current_token_kind() != close {
            parser.expect(TokenKind::Comma)?;
        }
    }

    parser.expect(close)?;
    Ok(items)
}

pub fn parse_list_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let start = parser.expect(TokenKind::OpenBracket)?.span.start;
    let items = parse_expr_list(parser, TokenKind::CloseBracket)?;
    let span = parser.span_from(start);

    Ok(make_expr(parser, ExprKind::List(items), span))
}

pub fn parse_call_expr(parser: &mut Parser, left: Expr, _bp: BindingPower) -> Result<Expr, Error> {
    parser.expect(TokenKind::OpenParen)?;
    let args = parse_expr_list(parser, TokenKind::CloseParen)?;
    let span = parser.span_from(left.span.start);

    Ok(make_expr(
        parser,
        ExprKind::Call {
            callee: Box::new(left),
            args,
        },
        span,
    ))
}

pub fn parse_index_expr(parser: &mut Parser, left: Expr, _bp: BindingPower) -> Result<Expr, Error> {
    parser.expect(TokenKind::OpenBracket)?;
    let index = parse_expr(parser, BindingPower::Default)?;
    parser.expect(TokenKind::CloseBracket)?;
    let span = parser.span_from(left.span.start);

    Ok(make_expr(
        parser,
        ExprKind::Index {
            list: Box::new(left),
            index: Box::new(index),
        },
        span,
    ))
}

pub fn parse_member_expr(parser: &mut Parser, left: Expr, _bp: BindingPower) -> Result<Expr, Error> {
    parser.expect(TokenKind::Dot)?;
    let field = parser.expect(TokenKind::Identifier)?.value;
    let span = parser.span_from(left.span.start);

    Ok(make_expr(
        parser,
        ExprKind::Field {
            target: Box::new(left),
            field,
        },
        span,
    ))
}

pub fn parse_struct_init_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let start = parser.expect(TokenKind::Struct)?.span.start;
    parser.expect(TokenKind::OpenCurly)?;

    let mut fields = vec![];
    while parser.current_token_kind() != TokenKind::CloseCurly {
        let name = parser.expect(TokenKind::Identifier)?.value;
        parser.expect(TokenKind::Colon)?;
        let value = parse_expr(parser, BindingPower::Comma)?;
        fields.push((name, value));

        if parser.current_token_kind() != TokenKind::CloseCurly {
            parser.expect(TokenKind::Comma)?;
        }
    }

    parser.expect(TokenKind::CloseCurly)?;
    let span = parser.span_from(start);

    Ok(make_expr(parser, ExprKind::Struct(fields), span))
}

pub fn parse_lambda_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let start = parser.expect(TokenKind::Lambda)?.span.start;
    let params: Vec<Param> = parse_params(parser)?;

    let return_type = if parser.current_token_kind() == TokenKind::Arrow {
        parser.advance();
        Some(parse_type(parser)?)
    } else {
        None
    };

    let body = match parser.current_token_kind() {
        TokenKind::FatArrow => {
            parser.advance();
            LambdaBody::Expr(Box::new(parse_expr(parser, BindingPower::Default)?))
        }
        TokenKind::OpenCurly => LambdaBody::Block(parse_block(parser)?),
        _ => return Err(parser.error_here("expected `=>` or a block after the lambda parameters")),
    };
    let span = parser.span_from(start);

    Ok(make_expr(
        parser,
        ExprKind::Lambda(Lambda {
            params,
            return_type,
            body,
        }),
        span,
    ))
}

/// `len(e)`, `dequeue(e)` and `read()`.
pub fn parse_builtin_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let keyword = parser.advance().clone();
    let start: Position = keyword.span.start;
    parser.expect(TokenKind::OpenParen)?;

    let kind = match keyword.kind {
        TokenKind::Read => ExprKind::Read,
        TokenKind::Len => ExprKind::Len(Box::new(parse_expr(parser, BindingPower::Default)?)),
        _ => ExprKind::Dequeue(Box::new(parse_expr(parser, BindingPower::Default)?)),
    };

    parser.expect(TokenKind::CloseParen)?;
    let span = parser.span_from(start);

    Ok(make_expr(parser, kind, span))
}
