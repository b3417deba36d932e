//! Code generation module for the compiler.
//!
//! This module lowers a checked program to a single WebAssembly text module.
//! It handles:
//!
//! - Discovery of the locals each function body needs
//! - Lowering of expressions and statements to stack instructions
//! - Lambdas as table slots called through `call_indirect`
//! - The runtime support functions and static string data

pub mod compiler;
pub mod expr;
pub mod locals;
pub mod runtime;
pub mod stmt;
