/// AST (Abstract Syntax Tree) module
/// Contains all definitions related to the AST structure
///
/// Submodules:
/// - ast: The program root and node identities
/// - expressions: Expression nodes as a closed enum
/// - statements: Statement nodes as a closed enum
/// - types: Type annotations written in source
pub mod ast;
pub mod expressions;
pub mod statements;
pub mod types;
