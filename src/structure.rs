//! # Structure Checks
//!
//! Walks a parsed file and reports tune-level omissions as `Structure`
//! diagnostics. The tree is never changed.
//!
//! ## Rules
//! - Every tune starts with an `X:` line (see `require-tune-number`)
//! - `X:` is the first info line of the tune header
//! - Every tune header has a `K:` line (see `require-key`)
//!
//! A tune with a header and no body is fine.
//!
//! ## Entry Point
//! `check(file, options, diagnostics)`

use crate::ast::{File, InfoLine, Node, Tune};
use crate::config::ParseOptions;
use crate::diagnostics::{DiagnosticKind, Diagnostics};

pub fn check(file: &File, options: &ParseOptions, diagnostics: &mut Diagnostics) {
    for tune in &file.tunes {
        check_tune_number(tune, options, diagnostics);
        check_key(tune, options, diagnostics);
    }
}

fn check_tune_number(tune: &Tune, options: &ParseOptions, diagnostics: &mut Diagnostics) {
    let first: Option<&InfoLine> = tune.header.info_lines().next();
    match tune.header.info('X') {
        Some(number) => {
            if first.is_some_and(|line| line.id != number.id) {
                diagnostics.report(
                    DiagnosticKind::Structure,
                    &number.header,
                    "X: must be the first line of the tune header",
                );
            }
        }
        None if options.require_tune_number => {
            if let Some(token) = tune.tokens().first() {
                diagnostics.report(DiagnosticKind::Structure, token, "tune has no X: line");
            }
        }
        None => {}
    }
}

fn check_key(tune: &Tune, options: &ParseOptions, diagnostics: &mut Diagnostics) {
    if !options.require_key || tune.header.info('K').is_some() {
        return;
    }
    if let Some(token) = tune.tokens().first() {
        diagnostics.report(DiagnosticKind::Structure, token, "tune header has no K: line");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::IdGen;
    use crate::diagnostics::Diagnostic;
    use crate::lexer::scan;
    use crate::parser::parse;

    fn check_source(source: &str, options: &ParseOptions) -> Vec<Diagnostic> {
        let mut ids = IdGen::new();
        let mut diagnostics = Diagnostics::new();
        let tokens = scan(source, &mut ids, &mut diagnostics);
        let file = parse(&tokens, &mut ids, &mut diagnostics, options);
        let mut structure = Diagnostics::new();
        check(&file, options, &mut structure);
        structure.into_vec()
    }

    #[test]
    fn test_complete_tune_passes() {
        assert!(check_source("X:1\nT:t\nK:C\nC\n", &ParseOptions::default()).is_empty());
    }

    #[test]
    fn test_missing_tune_number() {
        let diagnostics = check_source("X:1\nK:C\nC\n\nT:second\nK:D\nD\n", &ParseOptions::default());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "tune has no X: line");
        assert_eq!(diagnostics[0].line, 5);
    }

    #[test]
    fn test_missing_tune_number_allowed() {
        let options = ParseOptions {
            require_tune_number: false,
            ..ParseOptions::default()
        };
        assert!(check_source("X:1\nK:C\nC\n\nT:second\nK:D\nD\n", &options).is_empty());
    }

    #[test]
    fn test_tune_number_not_first() {
        let diagnostics = check_source("X:1\nK:C\nC\n\nT:t\nX:2\nK:D\nD\n", &ParseOptions::default());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].context, "X:");
    }

    #[test]
    fn test_missing_key() {
        let diagnostics = check_source("X:1\nT:t\nC\n", &ParseOptions::default());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::Structure);
        assert_eq!(diagnostics[0].message, "tune header has no K: line");

        let options = ParseOptions {
            require_key: false,
            ..ParseOptions::default()
        };
        assert!(check_source("X:1\nT:t\nC\n", &options).is_empty());
    }

    #[test]
    fn test_header_only_tune_is_fine() {
        assert!(check_source("X:1\nT:t\nK:C\n", &ParseOptions::default()).is_empty());
    }
}
