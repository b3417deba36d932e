//! Type annotation parsing.
//!
//! Annotations appear after parameter names, after `->` in function and
//! lambda headers, and inside lambda types. Supported forms:
//!
//! - Scalar names (`number`, `string`, `bool`, `list`, `void`)
//! - `struct`
//! - Lambda types, `lambda(number, string) -> bool`
//!
//! Like expressions, annotations dispatch on the leading token through a
//! NUD lookup table.

use std::collections::HashMap;

use crate::{
    ast::types::TypeAnnotation,
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::TokenKind,
};

use super::parser::Parser;

/// Type alias for type null denotation handler functions.
pub type TypeNUDHandler = fn(&mut Parser) -> Result<TypeAnnotation, Error>;

/// Type alias for type NUD lookup table.
pub type TypeNUDLookup = HashMap<TokenKind, TypeNUDHandler>;

/// Initializes the type parsing lookup tables.
///
/// # Arguments
///
/// * `parser` - Mutable reference to the parser to initialize
pub fn create_token_type_lookups(parser: &mut Parser) {
    parser.type_nud(TokenKind::Identifier, parse_symbol_type);
    parser.type_nud(TokenKind::Struct, parse_struct_type);
    parser.type_nud(TokenKind::Lambda, parse_lambda_type);
}

/// Parses a named type such as `number` or `list`.
///
/// # Returns
///
/// The matching annotation, or `UnknownType` for any other name.
pub fn parse_symbol_type(parser: &mut Parser) -> Result<TypeAnnotation, Error> {
    let token = parser.expect(TokenKind::Identifier)?;

    match token.value.as_str() {
        "number" => Ok(TypeAnnotation::Number),
        "string" => Ok(TypeAnnotation::String),
        "bool" => Ok(TypeAnnotation::Bool),
        "list" => Ok(TypeAnnotation::List),
        "void" => Ok(TypeAnnotation::Void),
        _ => Err(Error::new(
            ErrorImpl::UnknownType { type_: token.value },
            token.span.start,
        )),
    }
}

pub fn parse_struct_type(parser: &mut Parser) -> Result<TypeAnnotation, Error> {
    parser.expect(TokenKind::Struct)?;
    Ok(TypeAnnotation::Struct)
}

/// Parses `lambda(T, ...) -> R`.
///
/// A lambda type without `-> R` returns a number, matching the default for
/// unannotated parameters.
pub fn parse_lambda_type(parser: &mut Parser) -> Result<TypeAnnotation, Error> {
    parser.expect(TokenKind::Lambda)?;
    parser.expect(TokenKind::OpenParen)?;

    let mut params = vec![];
    while parser.current_token_kind() != TokenKind::CloseParen {
        params.push(parse_type(parser)?);

        if parser.current_token_kind() != TokenKind::CloseParen {
            parser.expect(TokenKind::Comma)?;
        }
    }
    parser.expect(TokenKind::CloseParen)?;

    let return_type = if parser.current_token_kind() == TokenKind::Arrow {
        parser.advance();
        parse_type(parser)?
    } else {
        TypeAnnotation::Number
    };

    Ok(TypeAnnotation::Lambda {
        params,
        return_type: Box::new(return_type),
    })
}

/// Parses a type annotation.
///
/// # Arguments
///
/// * `parser` - Mutable reference to the parser
///
/// # Returns
///
/// Returns the parsed annotation or an error if parsing fails.
pub fn parse_type(parser: &mut Parser) -> Result<TypeAnnotation, Error> {
    let token_kind = parser.current_token_kind();
    let nud_fn = match parser.get_type_nud_lookup().get(&token_kind) {
        Some(nud_fn) => *nud_fn,
        None => {
            return Err(Error::new(
                ErrorImpl::UnexpectedTokenDetailed {
                    token: parser.current_token().value.clone(),
                    message: String::from("expected a type"),
                },
                parser.get_position(),
            ))
        }
    };

    nud_fn(parser)
}
