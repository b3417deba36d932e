//! Options controlling code generation for one compilation unit.

/// How a non-string operand of string concatenation becomes a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StringCoercion {
    /// Use the analysed type: strings pass their address, numbers go through
    /// the host `f64_to_string`. Only operands of unknown type fall back to
    /// the round-trip test.
    #[default]
    Static,
    /// Every non-string operand goes through the round-trip test: a value
    /// that survives `f64 -> u32 -> f64` unchanged is taken to be an address.
    /// Numbers such as `3` are therefore read as pointers.
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Initial linear memory size in 64KiB pages.
    pub memory_pages: u32,
    /// Maximum number of lambdas (indirect table slots) in one module.
    pub max_table_size: u32,
    /// Maximum number of live scratch locals of one kind inside a function.
    ///
    /// Each nested list literal, `for` loop, `switch` and multi-assignment
    /// value holds one until its subtree is emitted, so this bounds how
    /// deeply they nest. Analysis does not know the limit: a program past it
    /// passes the checker and fails generation with `ScratchLocalsExhausted`.
    pub max_scratch_locals: u32,
    pub string_coercion: StringCoercion,
    /// Export name of the top-level entry function.
    pub entry_export: String,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions {
            memory_pages: 1,
            max_table_size: 256,
            max_scratch_locals: 32,
            string_coercion: StringCoercion::Static,
            entry_export: String::from("run"),
        }
    }
}
