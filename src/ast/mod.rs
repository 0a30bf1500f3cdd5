/// AST (Abstract Syntax Tree) module
/// Contains all definitions related to the AST structure
///
/// Submodules:
/// - ast: the node arena, expression/declaration enums and program roots
/// - types: definitions for type representations in the AST
pub mod ast;
pub mod types;
