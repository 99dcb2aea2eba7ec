pub mod api;
pub mod ast;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod structure;
pub mod voices;

pub use api::{parse, parse_strict, parse_with_options, strict, tokenize, Parse};
pub use ast::*;
pub use config::ParseOptions;
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use error::*;
pub use lexer::{Token, TokenKind};
