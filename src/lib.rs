// LDRX Language Interpreter Library
//
// Core library for LDRX, a small imperative scripting language: a lexer,
// a precedence-climbing parser into an index-based AST, and a tree-walking
// evaluator whose variables are scoped by AST ancestry.

// Public modules
pub mod ast;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod io;
pub mod lexer;
pub mod memory;
pub mod parser;
pub mod repl;
pub mod runner;
pub mod stack;
pub mod value;

// Re-export commonly used items
pub use ast::{Ast, Node, NodeId, NodeTag};
pub use error::{ErrorKind, LdrxError, Span};
pub use evaluator::{Evaluation, Evaluator, Settings};
pub use io::{CaptureOutput, Input, Output, ScriptedInput};
pub use lexer::{Lexer, Token, TokenKind};
pub use memory::{Binding, Memory};
pub use parser::Parser;
pub use runner::RunConfig;
pub use value::Value;

// Re-export main functions
pub use repl::start as start_repl;
pub use runner::run;
