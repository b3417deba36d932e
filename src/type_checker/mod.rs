//! Type checking and semantic analysis module.
//!
//! This module walks the AST once and collects diagnostics while:
//!
//! - Giving every expression node a static type
//! - Resolving variable and function references through a scope stack
//! - Checking call arity and argument types, including lambda signatures
//! - Rejecting lambdas that reference locals of an enclosing body
//! - Checking `break`, `continue` and `return` placement
//!
//! The result is an [`type_checker::Analysis`]: a flattened symbol table
//! plus per-node types and lambda signatures for the code generator.

pub mod scope;
pub mod type_checker;
pub mod types;

#[cfg(test)]
mod tests;
