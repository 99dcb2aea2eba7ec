//! # Public API
//!
//! This module contains the main entry points for the library.
//!
//! ## Functions
//!
//! - [`tokenize()`] - Token stream only
//! - [`parse()`] - Full pipeline with default options (recommended)
//! - [`parse_with_options()`] - Full pipeline with custom [`ParseOptions`]
//! - [`parse_strict()`] - Full pipeline, failing when anything was reported
//!
//! ## Typical Usage
//!
//! ```rust
//! use abc_syntax::parse;
//!
//! let source = "X:1\nT:Speed the Plough\nM:4/4\nK:G\nGABc dedB|dedB dedB|\n";
//!
//! let result = parse(source);
//! assert!(result.diagnostics.is_empty());
//! assert_eq!(result.file.tunes[0].title().as_deref(), Some("Speed the Plough"));
//! ```

use serde::Serialize;

use crate::ast::{File, IdGen};
use crate::config::ParseOptions;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::AbcError;
use crate::lexer::{self, Token};
use crate::{parser, structure};

/// Everything one parse produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parse {
    pub tokens: Vec<Token>,
    pub file: File,
    pub diagnostics: Vec<Diagnostic>,
}

/// Scan `source` into tokens.
///
/// # Example
/// ```rust
/// use abc_syntax::{tokenize, TokenKind};
///
/// let (tokens, diagnostics) = tokenize("X:1\nK:C\n|1,3-5,7\n");
/// assert!(tokens.iter().any(|t| t.kind == TokenKind::RepeatDash));
/// assert!(diagnostics.is_empty());
/// ```
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    let mut ids = IdGen::new();
    let mut diagnostics = Diagnostics::new();
    let tokens = lexer::scan(source, &mut ids, &mut diagnostics);
    (tokens, diagnostics.into_vec())
}

/// Scan, parse, segment and check `source` with default options.
pub fn parse(source: &str) -> Parse {
    parse_with_options(source, &ParseOptions::default())
}

/// # Pipeline
/// 1. Scan the source into tokens
/// 2. Parse tokens into the tree, segmenting each tune body into systems
/// 3. Run the structure checks
///
/// Never fails: problems end up in [`Parse::diagnostics`].
pub fn parse_with_options(source: &str, options: &ParseOptions) -> Parse {
    let mut ids = IdGen::new();
    let mut diagnostics = Diagnostics::with_limit(options.max_diagnostics);
    let tokens = lexer::scan(source, &mut ids, &mut diagnostics);
    let file = parser::parse(&tokens, &mut ids, &mut diagnostics, options);
    structure::check(&file, options, &mut diagnostics);
    if diagnostics.dropped() > 0 {
        log::warn!(
            "{} diagnostics dropped after reaching the limit",
            diagnostics.dropped()
        );
    }
    Parse {
        tokens,
        file,
        diagnostics: diagnostics.into_vec(),
    }
}

/// Like [`parse()`], but any diagnostic becomes an error.
///
/// # Errors
/// Returns [`AbcError::Diagnostics`] with the count and the first diagnostic.
pub fn parse_strict(source: &str) -> Result<Parse, AbcError> {
    strict(parse(source))
}

/// Turn a parse with diagnostics into an error.
pub fn strict(parse: Parse) -> Result<Parse, AbcError> {
    match parse.diagnostics.first() {
        None => Ok(parse),
        Some(first) => Err(AbcError::Diagnostics {
            count: parse.diagnostics.len(),
            first: first.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;

    #[test]
    fn test_parse_collects_all_stages() {
        let result = parse("X:1\nT:t\nC #\n");
        let kinds: Vec<_> = result.diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DiagnosticKind::Lex, DiagnosticKind::Structure]);
    }

    #[test]
    fn test_max_diagnostics() {
        let options = ParseOptions {
            max_diagnostics: Some(2),
            ..ParseOptions::default()
        };
        let result = parse_with_options("X:1\nK:C\n# # # #\n", &options);
        assert_eq!(result.diagnostics.len(), 2);
    }

    #[test]
    fn test_strict_ok() {
        let result = parse_strict("X:1\nK:C\nCDEF|\n").unwrap();
        assert_eq!(result.file.tunes.len(), 1);
    }

    #[test]
    fn test_strict_error() {
        let err = parse_strict("X:1\nK:C\nC ? D\n").unwrap_err();
        match err {
            AbcError::Diagnostics { count, first } => {
                assert_eq!(count, 1);
                assert_eq!(first.context, "?");
                assert_eq!((first.line, first.column), (3, 3));
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
