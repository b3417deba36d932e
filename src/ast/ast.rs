use super::statements::Stmt;

/// Identity of an expression node, unique within one parsed program.
///
/// Analysis results (expression types, lambda signatures) are keyed by it.
pub type NodeId = u32;

/// Root of a parsed source file.
///
/// Function declarations are statements of the top-level body; everything
/// else at the top level becomes the entry function.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub body: Vec<Stmt>,
}
