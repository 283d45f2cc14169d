pub mod ast;
pub mod compiler;
pub mod config;
pub mod error;
pub mod generator;
pub mod lexer;
pub mod parser;
pub mod scanner;
pub mod specialize;
pub mod symbols;
pub mod token;

pub use ast::{Element, Node, NodeKind};
pub use compiler::{CompileContext, CompileOptions, CompileOutput, Compiler, ImportResolver, PassThrough, SubCompiler};
pub use error::{CompileError, Diagnostic, DiagnosticKind, LexError, ScanError, Severity};
pub use generator::{GeneratedOutput, Generator};
pub use lexer::{Lexer, tokenize};
pub use parser::Parser;
pub use scanner::{Fragment, FragmentKind, Scanner, scan};
pub use symbols::{Scope, SymbolKind, SymbolTable};
pub use token::{Position, Token, TokenKind};
