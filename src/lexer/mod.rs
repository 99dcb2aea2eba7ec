//! # Lexer Module
//!
//! Turns an ABC source buffer into a lossless token stream.
//!
//! ## Purpose
//! The lexer is the first stage of the pipeline. Every byte of the input ends
//! up in exactly one token, so joining the token texts gives back the source.
//! Input the lexer does not understand becomes an `Invalid` token and a
//! diagnostic; scanning never stops early.
//!
//! ## Modes
//!
//! ### File header
//! Everything before the first `X:` line: directives, comments, info lines and
//! free text. Blank-line runs become `SectionBreak` tokens.
//!
//! ### Tune header
//! Info lines, comments and directives, one line at a time. Info lines after
//! `K:` still belong to the header; the first line holding anything else
//! starts the body.
//!
//! ### Tune body
//! One loop trying a fixed list of recognizers (see `music.rs`) until a
//! section break or the end of input.
//!
//! ### Info lines
//! The header letter picks a sub-scanner (see `info.rs`): `V:` voices, `K:`
//! keys, `M:` meters, `L:` lengths, `Q:` tempos, lyrics, symbol lines, macro
//! and user-symbol declarations. Other letters capture free text.
//!
//! ## Look-Behind Rule
//! `<letter>:` only opens an info line when the last non-whitespace token is
//! an end-of-line or a section break (or nothing was emitted yet).
//!
//! ## Entry Point
//! `scan(source, ids, diagnostics) -> Vec<Token>`
//!
//! ## Example
//! ```rust
//! use abc_syntax::ast::IdGen;
//! use abc_syntax::diagnostics::Diagnostics;
//! use abc_syntax::lexer::{scan, TokenKind};
//!
//! let mut ids = IdGen::new();
//! let mut diagnostics = Diagnostics::new();
//! let tokens = scan("X:1\nK:C\n^A2|\n", &mut ids, &mut diagnostics);
//!
//! let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
//! assert!(kinds.contains(&TokenKind::Accidental));
//! assert!(diagnostics.is_empty());
//! ```
//!
//! ## Related Modules
//! - `parser` - Consumes the tokens
//! - `diagnostics` - Receives lex and info-line errors

mod info;
mod music;
mod token;

pub use token::{Token, TokenKind};

use crate::ast::IdGen;
use crate::diagnostics::{DiagnosticKind, Diagnostics};

/// Scan a complete buffer.
pub fn scan(source: &str, ids: &mut IdGen, diagnostics: &mut Diagnostics) -> Vec<Token> {
    Lexer::new(source, ids, diagnostics).tokenize()
}

/// Lexer for ABC source
pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
    line: usize,
    column: usize,
    // Start of the token being built.
    start: usize,
    start_line: usize,
    start_column: usize,
    tokens: Vec<Token>,
    ids: &'a mut IdGen,
    diagnostics: &'a mut Diagnostics,
    // Names declared with m: and U: so far.
    macros: Vec<String>,
    user_symbols: Vec<char>,
    in_text_block: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str, ids: &'a mut IdGen, diagnostics: &'a mut Diagnostics) -> Self {
        Self {
            input,
            position: 0,
            line: 1,
            column: 1,
            start: 0,
            start_line: 1,
            start_column: 1,
            tokens: Vec::new(),
            ids,
            diagnostics,
            macros: Vec::new(),
            user_symbols: Vec::new(),
            in_text_block: false,
        }
    }

    pub fn tokenize(mut self) -> Vec<Token> {
        if !self.at_tune_start() {
            log::trace!("scanning file header");
            self.file_header();
        }
        // File-header declarations apply to every tune; a tune's own end with it.
        let macros = self.macros.clone();
        let user_symbols = self.user_symbols.clone();
        while !self.at_end() {
            self.macros.clone_from(&macros);
            self.user_symbols.clone_from(&user_symbols);
            self.tune();
            if let Some(len) = self.section_break_len() {
                self.consume(len);
                self.emit(TokenKind::SectionBreak);
            }
        }
        log::debug!(
            "scanned {} tokens with {} diagnostics",
            self.tokens.len(),
            self.diagnostics.len()
        );
        self.tokens
    }

    fn file_header(&mut self) {
        while !self.at_end() {
            if self.at_tune_start() {
                return;
            }
            if let Some(len) = self.section_break_len() {
                self.consume(len);
                self.emit(TokenKind::SectionBreak);
                continue;
            }
            if self.text_block_line() || self.eol() || self.whitespace() {
                continue;
            }
            if self.directive() || self.comment() || self.info_line().is_some() {
                continue;
            }
            self.eat_line();
            self.emit(TokenKind::FreeText);
        }
    }

    fn tune(&mut self) {
        log::trace!("scanning tune header at line {}", self.line);
        self.tune_header();
        if self.at_end() || self.section_break_len().is_some() {
            return;
        }
        log::trace!("scanning tune body at line {}", self.line);
        while !self.at_end() && self.section_break_len().is_none() {
            if self.text_block_line() {
                continue;
            }
            self.body_token();
        }
    }

    fn tune_header(&mut self) {
        loop {
            if self.at_end() || self.section_break_len().is_some() || self.in_text_block {
                return;
            }
            if self.eol() || self.whitespace() || self.directive() || self.comment() {
                continue;
            }
            if self.info_line().is_none() {
                return;
            }
        }
    }

    // Cursor

    fn rest(&self) -> &'a str {
        &self.input[self.position..]
    }

    fn at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn at_eol(&self) -> bool {
        let rest = self.rest();
        rest.starts_with('\n') || rest.starts_with("\r\n")
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Advance over `bytes` bytes of ASCII input.
    fn consume(&mut self, bytes: usize) {
        let target = self.position + bytes;
        while self.position < target && self.advance().is_some() {}
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) -> usize {
        let begin = self.position;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.advance();
        }
        self.position - begin
    }

    fn eat_line(&mut self) {
        while !self.at_end() && !self.at_eol() {
            self.advance();
        }
    }

    /// Push the pending text as a token of `kind`. Returns false if nothing
    /// was consumed since the last token.
    fn emit(&mut self, kind: TokenKind) -> bool {
        if self.position == self.start {
            return false;
        }
        let token = Token {
            id: self.ids.next_id(),
            kind,
            text: self.input[self.start..self.position].to_string(),
            line: self.start_line,
            column: self.start_column,
            offset: self.start,
        };
        self.tokens.push(token);
        self.start = self.position;
        self.start_line = self.line;
        self.start_column = self.column;
        true
    }

    fn single(&mut self, kind: TokenKind, c: char) -> bool {
        if self.peek() != Some(c) {
            return false;
        }
        self.advance();
        self.emit(kind)
    }

    fn report_last(&mut self, kind: DiagnosticKind, message: &str) {
        if let Some(token) = self.tokens.last() {
            self.diagnostics.report(kind, token, message);
        }
    }

    /// Collect an unrecognized run into one `Invalid` token. Always consumes
    /// at least one character; stops at whitespace, a bar line, end of line,
    /// or wherever `stop` says.
    fn invalid(&mut self, kind: DiagnosticKind, message: &str, stop: impl Fn(char) -> bool) {
        self.advance();
        while let Some(c) = self.peek() {
            if matches!(c, ' ' | '\t' | '\n' | '\r' | '|') || stop(c) {
                break;
            }
            self.advance();
        }
        self.emit(TokenKind::Invalid);
        self.report_last(kind, message);
    }

    // Look-behind

    fn at_line_start(&self) -> bool {
        let last = self
            .tokens
            .iter()
            .rev()
            .find(|t| t.kind != TokenKind::Whitespace)
            .map(|t| t.kind);
        matches!(last, None | Some(TokenKind::Eol) | Some(TokenKind::SectionBreak))
    }

    fn at_tune_start(&self) -> bool {
        let rest = self.rest();
        if !rest.starts_with('X') || !self.at_line_start() {
            return false;
        }
        rest[1..].trim_start_matches(is_blank).starts_with(':')
    }

    /// Length of a section break at the cursor: an end of line followed by
    /// one or more blank lines.
    fn section_break_len(&self) -> Option<usize> {
        let bytes = self.rest().as_bytes();
        let mut end = eol_len(bytes, 0)?;
        let mut blank_lines = 0;
        loop {
            let mut i = end;
            while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
                i += 1;
            }
            match eol_len(bytes, i) {
                Some(n) => {
                    end = i + n;
                    blank_lines += 1;
                }
                None => break,
            }
        }
        (blank_lines > 0).then_some(end)
    }

    // Structural recognizers

    fn eol(&mut self) -> bool {
        match eol_len(self.rest().as_bytes(), 0) {
            Some(n) => {
                self.consume(n);
                self.emit(TokenKind::Eol)
            }
            None => false,
        }
    }

    fn whitespace(&mut self) -> bool {
        self.eat_while(|c| c == ' ' || c == '\t') > 0 && self.emit(TokenKind::Whitespace)
    }

    fn comment(&mut self) -> bool {
        if self.peek() != Some('%') {
            return false;
        }
        self.eat_line();
        self.emit(TokenKind::Comment)
    }

    fn directive(&mut self) -> bool {
        if !self.rest().starts_with("%%") || !self.at_line_start() {
            return false;
        }
        self.eat_line();
        let input = self.input;
        let text = &input[self.start..self.position];
        if text.starts_with("%%begintext") {
            self.in_text_block = true;
        } else if text.starts_with("%%endtext") {
            self.in_text_block = false;
        }
        self.emit(TokenKind::StylesheetDirective)
    }

    /// A line inside a `%%begintext` block.
    fn text_block_line(&mut self) -> bool {
        if !self.in_text_block || !self.at_line_start() || self.at_eol() {
            return false;
        }
        if self.rest().trim_start_matches(is_blank).starts_with("%%") {
            return false;
        }
        self.eat_line();
        self.emit(TokenKind::FreeText)
    }

    /// Recognize `<letter>:` under the look-behind rule and run the matching
    /// sub-scanner over the rest of the line. Returns the header letter.
    fn info_line(&mut self) -> Option<char> {
        if !self.at_line_start() {
            return None;
        }
        let len = info_header_len(self.rest())?;
        let letter = self.peek()?;
        self.consume(len);
        self.emit(header_kind(letter));
        self.info_content(letter, false);
        Some(letter)
    }
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

fn eol_len(bytes: &[u8], i: usize) -> Option<usize> {
    match (bytes.get(i), bytes.get(i + 1)) {
        (Some(b'\n'), _) => Some(1),
        (Some(b'\r'), Some(b'\n')) => Some(2),
        _ => None,
    }
}

/// Length of an info-line header (`K:`, `T :`, `+:`) at the start of `s`.
fn info_header_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let first = *bytes.first()?;
    if !first.is_ascii_alphabetic() && first != b'+' {
        return None;
    }
    let mut i = 1;
    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    if bytes.get(i) != Some(&b':') {
        return None;
    }
    // `G:|` is a note and a bar line.
    if matches!(bytes.get(i + 1), Some(b'|') | Some(b':')) {
        return None;
    }
    Some(i + 1)
}

fn header_kind(letter: char) -> TokenKind {
    match letter {
        'w' => TokenKind::LyricHeader,
        'W' => TokenKind::LyricSectionHeader,
        's' => TokenKind::SymbolLineHeader,
        'm' => TokenKind::MacroHeader,
        'U' => TokenKind::UserSymbolHeader,
        '+' => TokenKind::InfoContinuation,
        _ => TokenKind::InfoHeader,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use TokenKind::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut ids = IdGen::new();
        let mut diagnostics = Diagnostics::new();
        scan(source, &mut ids, &mut diagnostics)
            .iter()
            .map(|t| t.kind)
            .collect()
    }

    fn scan_all(source: &str) -> (Vec<Token>, Diagnostics) {
        let mut ids = IdGen::new();
        let mut diagnostics = Diagnostics::new();
        let tokens = scan(source, &mut ids, &mut diagnostics);
        (tokens, diagnostics)
    }

    #[test]
    fn test_empty_input() {
        assert!(kinds("").is_empty());
    }

    #[test]
    fn test_simple_tune() {
        assert_eq!(
            kinds("X:1\nK:C\nCD|\n"),
            vec![
                InfoHeader, InfoString, Eol,
                InfoHeader, KeyRoot, Eol,
                NoteLetter, NoteLetter, Barline, Eol,
            ]
        );
    }

    #[test]
    fn test_tokens_reproduce_source() {
        let source = "%abc-2.1\nfree text\n\nX:1\nT:Title\nK:G\n|:GA \"Am\"B2 z|1 c2:|2 d2|]\n";
        let (tokens, _) = scan_all(source);
        let joined: String = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(joined, source);
    }

    #[test]
    fn test_positions_are_tracked() {
        let (tokens, _) = scan_all("X:1\nK:C\nab\n");
        let b = tokens.iter().find(|t| t.text == "b").unwrap();
        assert_eq!((b.line, b.column, b.offset), (3, 2, 9));
    }

    #[test]
    fn test_file_header_before_first_tune() {
        assert_eq!(
            kinds("%%pagewidth 21cm\nsome text\n\nX:1\n"),
            vec![StylesheetDirective, Eol, FreeText, SectionBreak, InfoHeader, InfoString, Eol]
        );
    }

    #[test]
    fn test_section_break_separates_tunes() {
        let (tokens, _) = scan_all("X:1\nK:C\nC\n\n\nX:2\nK:D\nD\n");
        let breaks: Vec<_> = tokens.iter().filter(|t| t.kind == SectionBreak).collect();
        assert_eq!(breaks.len(), 1);
        assert_eq!(breaks[0].text, "\n\n\n");
    }

    #[test]
    fn test_crlf_section_break() {
        let (tokens, _) = scan_all("X:1\r\nK:C\r\nC\r\n\r\nX:2\r\n");
        assert!(tokens.iter().any(|t| t.kind == SectionBreak && t.text == "\r\n\r\n"));
    }

    #[test]
    fn test_look_behind_rejects_mid_line_header() {
        let (tokens, diagnostics) = scan_all("X:1\nK:C\nab T:x\n");
        assert!(!tokens.iter().skip(5).any(|t| t.kind == InfoHeader));
        assert!(tokens.iter().any(|t| t.kind == Invalid && t.text == "T:x"));
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_voice_lines_after_key() {
        let kinds = kinds("X:1\nK:C\nV:1\nCD\n");
        assert_eq!(&kinds[6..], &[InfoHeader, VoiceId, Eol, NoteLetter, NoteLetter, Eol]);
    }

    #[test]
    fn test_declarations_are_scoped_to_their_tune() {
        let source = "X:1\nm: ~n2 = n3\nU: T = !trill!\nK:C\n~A2 TB\n\nX:2\nK:C\n~A2 TB\n";
        let (tokens, _) = scan_all(source);
        let second = tokens.iter().rposition(|t| t.text == "X:").unwrap();
        let invocations = |tokens: &[Token]| {
            tokens
                .iter()
                .filter(|t| matches!(t.kind, MacroInvocation | UserSymbolInvocation))
                .count()
        };
        assert_eq!(invocations(&tokens[..second]), 2);
        assert_eq!(invocations(&tokens[second..]), 0);
        assert!(tokens[second..].iter().any(|t| t.kind == Decoration && t.text == "~"));
        assert!(tokens[second..].iter().any(|t| t.kind == Decoration && t.text == "T"));
    }

    #[test]
    fn test_file_header_declarations_reach_every_tune() {
        let (tokens, _) = scan_all("U: T = !trill!\n\nX:1\nK:C\nTB\n\nX:2\nK:C\nTB\n");
        let count = tokens.iter().filter(|t| t.kind == UserSymbolInvocation).count();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_header_stops_at_body_content() {
        assert_eq!(
            kinds("X:1\nT:t\nab\n"),
            vec![InfoHeader, InfoString, Eol, InfoHeader, InfoString, Eol, NoteLetter, NoteLetter, Eol]
        );
    }

    #[test]
    fn test_note_followed_by_repeat_is_not_header() {
        let kinds = kinds("X:1\nK:C\nG:|\n");
        assert_eq!(&kinds[6..], &[NoteLetter, Barline, Eol]);
    }

    #[test]
    fn test_text_block_lines_are_free_text() {
        let kinds = kinds("X:1\nK:C\n%%begintext\nany [text] here\n%%endtext\nC\n");
        assert_eq!(
            &kinds[6..],
            &[StylesheetDirective, Eol, FreeText, Eol, StylesheetDirective, Eol, NoteLetter, Eol]
        );
    }

    #[test]
    fn test_comment_after_music() {
        let kinds = kinds("X:1\nK:C\nC % note\n");
        assert_eq!(&kinds[6..], &[NoteLetter, Whitespace, Comment, Eol]);
    }

    #[test]
    fn test_ids_increase_with_offset() {
        let (tokens, _) = scan_all("X:1\nK:C\nCDE|\n");
        for pair in tokens.windows(2) {
            assert!(pair[0].id < pair[1].id);
            assert_eq!(pair[0].end(), pair[1].offset);
        }
    }
}
