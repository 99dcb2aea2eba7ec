//! # Error Types
//!
//! This module defines the error type for the fallible edges of the crate.
//!
//! Scanning and parsing are total: malformed ABC never produces an `Err`, it
//! produces [`Diagnostic`](crate::Diagnostic)s next to a best-effort tree.
//! `AbcError` covers what sits around that core: reading files, loading
//! options, and the strict entry point that turns diagnostics into a failure.
//!
//! ## Error Types
//! - `Config` - Options YAML is malformed or has unknown keys
//! - `Io` - An input or options file could not be read
//! - `Diagnostics` - A strict parse reported at least one diagnostic
//!
//! ## Usage
//! ```rust
//! use abc_syntax::{parse_strict, AbcError};
//!
//! match parse_strict("X:1\nK:C\nCDEF|\n") {
//!     Ok(parse) => assert_eq!(parse.file.tunes.len(), 1),
//!     Err(AbcError::Diagnostics { count, first }) => {
//!         eprintln!("{} problems, first: {}", count, first);
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

use crate::diagnostics::Diagnostic;

#[derive(Error, Debug)]
pub enum AbcError {
    /// Invalid options.
    ///
    /// # Example
    /// ```
    /// # use abc_syntax::AbcError;
    /// let err = AbcError::Config("unknown field `strict`".to_string());
    /// assert_eq!(err.to_string(), "Invalid configuration: unknown field `strict`");
    /// ```
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A file could not be read.
    #[error("Cannot read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A strict parse produced diagnostics. `first` is the earliest one reported.
    #[error("{count} diagnostic(s) reported, first: {first}")]
    Diagnostics { count: usize, first: Diagnostic },
}

impl From<serde_yaml::Error> for AbcError {
    fn from(err: serde_yaml::Error) -> Self {
        AbcError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;

    #[test]
    fn test_diagnostics_error_display() {
        let first = Diagnostic {
            kind: DiagnosticKind::Lex,
            message: "unrecognized input".to_string(),
            context: "#".to_string(),
            line: 3,
            column: 7,
            offset: 20,
        };
        let err = AbcError::Diagnostics { count: 2, first };
        assert_eq!(
            err.to_string(),
            "2 diagnostic(s) reported, first: lex error at line 3, column 7: unrecognized input"
        );
    }

    #[test]
    fn test_yaml_error_becomes_config_error() {
        let yaml_err = serde_yaml::from_str::<u32>("[1, 2").unwrap_err();
        let err: AbcError = yaml_err.into();
        assert!(matches!(err, AbcError::Config(_)));
    }
}
