//! Error types and error handling for the compiler.
//!
//! This module defines the error types used throughout the compilation
//! process. It includes:
//!
//! - Diagnostics with source position information, shared by the lexer,
//!   the parser and the type checker
//! - Fatal code generation errors
//! - Helpful error messages and suggestions

pub mod errors;

#[cfg(test)]
mod tests;
