//! Tune-body recognizers.
//!
//! `body_token` tries each recognizer in priority order and commits to the
//! first that matches. Recognizers consume nothing when they return false.

use super::{header_kind, info_header_len, Lexer, TokenKind};
use crate::diagnostics::DiagnosticKind;

const DECORATIONS: &[u8] = b".~HLMOPRSTuv";

impl<'a> Lexer<'a> {
    /// Scan one body construct. Always consumes at least one character.
    pub(super) fn body_token(&mut self) {
        if self.directive() || self.comment() || self.info_line().is_some() {
            return;
        }
        if self.quoted(TokenKind::Annotation)
            || self.inline_field()
            || self.tuplet()
            || self.slur()
            || self.grace_group()
            || self.chord()
            || self.barline()
        {
            return;
        }
        // Declared names shadow decorations and notes.
        if self.macro_invocation() || self.user_symbol_invocation() || self.decoration() {
            return;
        }
        if self.note()
            || self.rest_note()
            || self.y_spacer()
            || self.symbol()
            || self.single(TokenKind::VoiceOverlay, '&')
            || self.single(TokenKind::BacktickSpacer, '`')
            || self.single(TokenKind::LineContinuation, '\\')
            || self.single(TokenKind::SystemBreak, '$')
        {
            return;
        }
        if self.whitespace() || self.eol() {
            return;
        }
        self.invalid(DiagnosticKind::Lex, "unrecognized input", |_| false);
    }

    pub(super) fn digits(&mut self, kind: TokenKind) -> bool {
        self.eat_while(|c| c.is_ascii_digit()) > 0 && self.emit(kind)
    }

    /// Double-quoted text with backslash escapes. An unterminated string
    /// runs to the end of the line and becomes an `Invalid` token.
    pub(super) fn quoted(&mut self, kind: TokenKind) -> bool {
        if self.peek() != Some('"') {
            return false;
        }
        self.advance();
        while !self.at_end() && !self.at_eol() {
            match self.advance() {
                Some('"') => return self.emit(kind),
                Some('\\') if !self.at_end() && !self.at_eol() => {
                    self.advance();
                }
                _ => {}
            }
        }
        self.emit(TokenKind::Invalid);
        self.report_last(DiagnosticKind::Lex, "unterminated string");
        true
    }

    /// `!name!` or `+name+` on one line.
    pub(super) fn symbol(&mut self) -> bool {
        let delimiter = match self.peek() {
            Some(c @ ('!' | '+')) => c,
            _ => return false,
        };
        let body = &self.rest()[1..];
        let len = match body.find(|c: char| c == delimiter || c == '\n' || c == '\r') {
            Some(n) if n > 0 && body[n..].starts_with(delimiter) => n,
            _ => return false,
        };
        self.consume(len + 2);
        self.emit(TokenKind::Symbol)
    }

    /// Optional numerator, `/` run with optional denominator, broken-rhythm marks.
    pub(super) fn rhythm(&mut self) {
        self.digits(TokenKind::RhythmNumerator);
        if self.eat_while(|c| c == '/') > 0 {
            self.emit(TokenKind::RhythmSeparator);
            self.digits(TokenKind::RhythmDenominator);
        }
        if self.eat_while(|c| c == '>') > 0 || self.eat_while(|c| c == '<') > 0 {
            self.emit(TokenKind::BrokenRhythm);
        }
    }

    pub(super) fn note(&mut self) -> bool {
        let rest = self.rest();
        let accidental = accidental_len(rest).unwrap_or(0);
        if !rest[accidental..].starts_with(is_note_letter) {
            return false;
        }
        if accidental > 0 {
            self.consume(accidental);
            self.emit(TokenKind::Accidental);
        }
        self.advance();
        self.emit(TokenKind::NoteLetter);
        if self.eat_while(|c| c == '\'' || c == ',') > 0 {
            self.emit(TokenKind::Octave);
        }
        self.rhythm();
        self.single(TokenKind::Tie, '-');
        true
    }

    fn rest_note(&mut self) -> bool {
        if !self.peek().is_some_and(is_rest) {
            return false;
        }
        self.advance();
        self.emit(TokenKind::Rest);
        self.rhythm();
        true
    }

    fn y_spacer(&mut self) -> bool {
        if !self.single(TokenKind::YSpacer, 'y') {
            return false;
        }
        self.rhythm();
        true
    }

    /// A run of decoration shorthands, only when a note, rest or chord follows.
    pub(super) fn decoration(&mut self) -> bool {
        let rest = self.rest();
        let run = rest.bytes().take_while(|b| DECORATIONS.contains(b)).count();
        if run == 0 {
            return false;
        }
        let next = &rest[run..];
        let decorates = next.starts_with(is_note_letter)
            || next.starts_with(is_rest)
            || next.starts_with('[')
            || accidental_len(next).is_some();
        if !decorates {
            return false;
        }
        for _ in 0..run {
            self.advance();
            self.emit(TokenKind::Decoration);
        }
        true
    }

    fn slur(&mut self) -> bool {
        self.single(TokenKind::Slur, '(') || self.single(TokenKind::Slur, ')')
    }

    fn digit_at(&self, n: usize) -> bool {
        self.peek_nth(n).is_some_and(|c| c.is_ascii_digit())
    }

    /// `(p`, `(p:q`, `(p:q:r`, `(p::r`.
    fn tuplet(&mut self) -> bool {
        if self.peek() != Some('(') || !self.digit_at(1) {
            return false;
        }
        self.single(TokenKind::TupletLParen, '(');
        self.digits(TokenKind::TupletP);
        let second = self.peek() == Some(':')
            && (self.digit_at(1) || (self.peek_nth(1) == Some(':') && self.digit_at(2)));
        if !second {
            return true;
        }
        self.single(TokenKind::TupletColon, ':');
        self.digits(TokenKind::TupletQ);
        if self.peek() == Some(':') && self.digit_at(1) {
            self.single(TokenKind::TupletColon, ':');
            self.digits(TokenKind::TupletR);
        }
        true
    }

    fn grace_group(&mut self) -> bool {
        if !self.single(TokenKind::GraceLeftBrace, '{') {
            return false;
        }
        self.single(TokenKind::GraceSlash, '/');
        while !self.at_end() && !self.at_eol() {
            if self.single(TokenKind::GraceRightBrace, '}') || barline_len(self.rest()).is_some() {
                break;
            }
            if self.whitespace() || self.note() {
                continue;
            }
            self.invalid(DiagnosticKind::Lex, "unexpected character in grace group", |c| c == '}');
        }
        true
    }

    fn chord(&mut self) -> bool {
        if self.peek() != Some('[') {
            return false;
        }
        match self.peek_nth(1) {
            None | Some('|' | ']' | ' ' | '\t' | '\n' | '\r') => return false,
            Some(c) if c.is_ascii_digit() => return false,
            _ => {}
        }
        self.single(TokenKind::ChordLeftBracket, '[');
        while !self.at_end() && !self.at_eol() {
            if self.single(TokenKind::ChordRightBracket, ']') {
                self.rhythm();
                self.single(TokenKind::Tie, '-');
                break;
            }
            // Unclosed: leave the bar line to the body loop.
            if barline_len(self.rest()).is_some() {
                break;
            }
            if self.whitespace()
                || self.quoted(TokenKind::Annotation)
                || self.decoration()
                || self.note()
                || self.symbol()
            {
                continue;
            }
            self.invalid(DiagnosticKind::Lex, "unexpected character in chord", |c| c == ']');
        }
        true
    }

    fn barline(&mut self) -> bool {
        let Some(len) = barline_len(self.rest()) else {
            return false;
        };
        self.consume(len);
        self.emit(TokenKind::Barline);
        self.repeat_numbers();
        true
    }

    /// `1`, `1,2`, `1-3`, `1x2` right after a bar line.
    fn repeat_numbers(&mut self) {
        if !self.digits(TokenKind::RepeatNumber) {
            return;
        }
        loop {
            let kind = match self.peek() {
                Some(',') => TokenKind::RepeatComma,
                Some('-') => TokenKind::RepeatDash,
                Some('x' | 'X') => TokenKind::RepeatX,
                _ => return,
            };
            if !self.digit_at(1) {
                return;
            }
            self.advance();
            self.emit(kind);
            self.digits(TokenKind::RepeatNumber);
        }
    }

    /// `[K:D]`, `[V:2]`, ...
    fn inline_field(&mut self) -> bool {
        if self.peek() != Some('[') {
            return false;
        }
        let Some(len) = info_header_len(&self.rest()[1..]) else {
            return false;
        };
        let Some(letter) = self.peek_nth(1) else {
            return false;
        };
        self.single(TokenKind::InlineFieldLeftBracket, '[');
        self.consume(len);
        self.emit(header_kind(letter));
        self.info_content(letter, true);
        self.single(TokenKind::InlineFieldRightBracket, ']');
        true
    }

    /// Longest declared macro name matching at the cursor.
    fn macro_invocation(&mut self) -> bool {
        let rest = self.rest();
        let longest = self
            .macros
            .iter()
            .filter_map(|name| macro_match_len(name, rest))
            .max();
        match longest {
            Some(len) => {
                self.consume(len);
                self.emit(TokenKind::MacroInvocation)
            }
            None => false,
        }
    }

    fn user_symbol_invocation(&mut self) -> bool {
        match self.peek() {
            Some(c) if self.user_symbols.contains(&c) => self.single(TokenKind::UserSymbolInvocation, c),
            _ => false,
        }
    }
}

pub(super) fn is_note_letter(c: char) -> bool {
    matches!(c, 'A'..='G' | 'a'..='g')
}

fn is_rest(c: char) -> bool {
    matches!(c, 'z' | 'Z' | 'x' | 'X')
}

/// Length of an accidental at the start of `s`.
pub(super) fn accidental_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    match (bytes.first(), bytes.get(1)) {
        (Some(b'^'), Some(b'^' | b'/')) | (Some(b'_'), Some(b'_' | b'/')) => Some(2),
        (Some(b'^' | b'_' | b'='), _) => Some(1),
        _ => None,
    }
}

/// Length of a bar line at the start of `s`, not counting repeat numbers.
fn barline_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 0;
    if bytes.first() == Some(&b'[') {
        match bytes.get(1) {
            Some(b'|') => i = 1,
            Some(c) if c.is_ascii_digit() => return Some(1),
            _ => return None,
        }
    }
    let run_start = i;
    while matches!(bytes.get(i), Some(b'|' | b':')) {
        i += 1;
    }
    let run = &bytes[run_start..i];
    if !run.contains(&b'|') && run.len() < 2 {
        return None;
    }
    if run.last() == Some(&b'|') && bytes.get(i) == Some(&b']') {
        i += 1;
    } else if bytes.get(i) == Some(&b'[') && bytes.get(i + 1).is_some_and(u8::is_ascii_digit) {
        i += 1;
    }
    Some(i)
}

/// In names longer than one character, `n` stands for any note letter.
fn macro_match_len(name: &str, s: &str) -> Option<usize> {
    let wildcard = name.chars().count() > 1;
    let mut chars = s.chars();
    let mut len = 0;
    for expected in name.chars() {
        let c = chars.next()?;
        if c != expected && !(wildcard && expected == 'n' && is_note_letter(c)) {
            return None;
        }
        len += c.len_utf8();
    }
    Some(len)
}
