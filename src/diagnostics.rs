//! # Diagnostics
//!
//! Append-only sink shared by the scanner, the parser and the structure checks.
//!
//! Nothing in the pipeline reads the sink back; the caller inspects it once the
//! whole batch is done. Every entry records where it happened (line, column,
//! byte offset), the offending source text, and a message.
//!
//! ## Diagnostic Kinds
//! - `Lex` - An unrecognized run of characters became an INVALID token
//! - `InfoLine` - Malformed content inside an info line (`K:`, `M:`, `L:` ...)
//! - `Parse` - A token no grammar production accepts, or an unclosed construct
//! - `Structure` - A tune-level omission such as a missing `X:` line

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::lexer::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    Lex,
    InfoLine,
    Parse,
    Structure,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::Lex => "lex error",
            DiagnosticKind::InfoLine => "info line error",
            DiagnosticKind::Parse => "parse error",
            DiagnosticKind::Structure => "structure error",
        };
        f.write_str(name)
    }
}

/// One reported problem.
///
/// `context` is the source text the problem was found in: the offending token
/// or run for lex and parse errors, the info line for sub-grammar errors.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("{kind} at line {line}, column {column}: {message}")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub context: String,
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

/// The sink. Optionally capped: once `limit` entries are stored, further
/// reports are only counted.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    limit: Option<usize>,
    dropped: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: Option<usize>) -> Self {
        Diagnostics {
            entries: Vec::new(),
            limit,
            dropped: 0,
        }
    }

    /// Report a problem located at `token`.
    pub fn report(&mut self, kind: DiagnosticKind, token: &Token, message: impl Into<String>) {
        self.push(Diagnostic {
            kind,
            message: message.into(),
            context: token.text.clone(),
            line: token.line,
            column: token.column,
            offset: token.offset,
        });
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        log::debug!("{}", diagnostic);
        if self.limit.is_some_and(|limit| self.entries.len() >= limit) {
            self.dropped += 1;
            return;
        }
        self.entries.push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of reports discarded because the limit was reached.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}
