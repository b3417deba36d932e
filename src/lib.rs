#![allow(clippy::module_inception)]

use std::fmt::Write as _;

use thiserror::Error;
use tracing::debug;

use crate::errors::errors::{CompileError, Error, ErrorTip};

pub mod ast;
pub mod compiler;
pub mod config;
pub mod errors;
pub mod lexer;
pub mod macros;
pub mod parser;
pub mod type_checker;

extern crate regex;

pub use config::{CompilerOptions, StringCoercion};

/// A location in a source file: byte offset plus 1-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: u32,
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(offset: u32, line: u32, column: u32) -> Self {
        Position {
            offset,
            line,
            column,
        }
    }

    pub fn null() -> Self {
        Position::new(0, 1, 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

/// Why a unit failed to produce a module.
#[derive(Error, Debug)]
pub enum CompileFailure {
    #[error("syntax error: {0}")]
    Syntax(Error),
    #[error("{} semantic error(s)", .0.len())]
    Semantic(Vec<Error>),
    #[error("internal compiler error: {0}")]
    Internal(#[from] CompileError),
}

/// Runs every phase over one source text and returns the module text.
///
/// Syntax errors stop the pipeline before analysis. Semantic diagnostics are
/// all collected before being returned, and code generation only runs when
/// there are none.
pub fn compile_source(
    source: &str,
    file: &str,
    options: &CompilerOptions,
) -> Result<String, CompileFailure> {
    let tokens =
        lexer::lexer::tokenize(source.to_string(), Some(file.to_string())).map_err(CompileFailure::Syntax)?;
    debug!(file, tokens = tokens.len(), "tokenized");

    let program = parser::parser::parse(tokens).map_err(CompileFailure::Syntax)?;
    debug!(file, statements = program.body.len(), "parsed");

    let (analysis, errors) = type_checker::type_checker::type_check(&program);
    debug!(file, diagnostics = errors.len(), "analysed");
    if !errors.is_empty() {
        return Err(CompileFailure::Semantic(errors));
    }

    Ok(compiler::compiler::compile(&program, &analysis, options)?)
}

/// Finds the line containing `position` and returns its number, its text and
/// the offset of the position inside it.
pub fn get_line_at_position(content: &str, position: u32) -> (usize, String, usize) {
    let pos = (position as usize).min(content.len());

    let mut start = 0;
    let mut line_number = 1;
    let mut last_line = "";

    for line in content.split_inclusive('\n') {
        let end = start + line.len();

        if (start..end).contains(&pos) {
            return (line_number, line.to_string(), pos - start);
        }

        start = end;
        line_number += 1;
        last_line = line;
    }

    // End of file: either an empty trailing line or the end of the last one.
    if last_line.is_empty() || last_line.ends_with('\n') {
        (line_number, String::new(), 0)
    } else {
        (line_number - 1, last_line.to_string(), last_line.len())
    }
}

/// Renders a diagnostic with the offending source line and a caret.
///
/// ```text
/// Error: VariableNotDeclared (Variable `a` not declared)
/// -> final.list:20:5
///    |
/// 20 | b = a + 1;
///    | ----^
/// ```
pub fn display_error(error: &Error, source: &str, file: &str) -> String {
    let position = error.get_position();
    let (line, line_text, line_pos) = get_line_at_position(source, position.offset);

    let line_string = line.to_string();
    let padding = line_string.len() + 2;

    let mut out = String::new();
    if let ErrorTip::None = error.get_tip() {
        let _ = writeln!(out, "Error: {}", error.get_error_name());
    } else {
        let _ = writeln!(out, "Error: {} ({})", error.get_error_name(), error.get_tip());
    }
    let _ = writeln!(out, "-> {}:{}:{}", file, position.line, position.column);
    let _ = writeln!(out, "{:>padding$}", "|");

    let (line_text_removed, removed_whitespace) = remove_starting_whitespace(&line_text);
    let _ = writeln!(out, "{} | {}", line_string, line_text_removed.trim_end());

    let arrows = line_pos.saturating_sub(removed_whitespace) + 1;

    let _ = writeln!(out, "{:>padding$} {:->arrows$}", "|", "^");
    out
}

fn remove_starting_whitespace(string: &str) -> (String, usize) {
    let start = string
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .count();

    (String::from(&string[start..]), start)
}
