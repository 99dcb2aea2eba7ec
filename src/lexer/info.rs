//! Info-line sub-scanners.
//!
//! Each one runs after a `<letter>:` header and stops, without consuming, at
//! a comment, the end of the line, or `]` when the field is inline. Content a
//! sub-scanner does not understand becomes an `Invalid` token reported as an
//! info-line error.

use super::music::{accidental_len, is_note_letter};
use super::{is_blank, Lexer, TokenKind};
use crate::diagnostics::DiagnosticKind;

const MODES: [&str; 9] = ["maj", "min", "ion", "dor", "phr", "lyd", "mix", "aeo", "loc"];

impl<'a> Lexer<'a> {
    pub(super) fn info_content(&mut self, letter: char, inline: bool) {
        match letter {
            'V' => self.voice_content(inline),
            'K' => self.key_content(inline),
            'M' => self.meter_content(inline),
            'L' => self.length_content(inline),
            'Q' => self.tempo_content(inline),
            'w' | 'W' => self.lyric_content(inline),
            's' => self.symbol_line_content(inline),
            'm' => self.macro_content(inline),
            'U' => self.user_symbol_content(inline),
            _ => self.free_content(inline),
        }
    }

    fn at_info_end(&self, inline: bool) -> bool {
        self.at_end() || self.at_eol() || self.peek().is_some_and(|c| c == '%' || (inline && c == ']'))
    }

    fn info_invalid(&mut self, inline: bool, message: &str) {
        self.invalid(DiagnosticKind::InfoLine, message, move |c| c == '%' || (inline && c == ']'));
    }

    /// Capture whatever is left on the line as one `Invalid` token.
    fn rest_invalid(&mut self, inline: bool, message: &str) {
        self.whitespace();
        if self.at_info_end(inline) {
            return;
        }
        while !self.at_info_end(inline) {
            self.advance();
        }
        self.emit(TokenKind::Invalid);
        self.report_last(DiagnosticKind::InfoLine, message);
    }

    /// Text up to the end of the field. `\` escapes the next character.
    fn free_content(&mut self, inline: bool) {
        self.whitespace();
        while !self.at_info_end(inline) {
            if self.advance() == Some('\\') && !self.at_end() && !self.at_eol() {
                self.advance();
            }
        }
        self.emit(TokenKind::InfoString);
    }

    /// `V:id key=value ...`
    fn voice_content(&mut self, inline: bool) {
        self.whitespace();
        let rest = self.rest();
        let id = rest
            .find(|c: char| is_info_break(c, inline) || is_blank(c) || c == '=')
            .unwrap_or(rest.len());
        if id > 0 && !rest[id..].starts_with('=') {
            self.consume(id);
            self.emit(TokenKind::VoiceId);
        }
        self.properties(inline);
    }

    fn properties(&mut self, inline: bool) {
        loop {
            self.whitespace();
            if self.at_info_end(inline) {
                return;
            }
            if !self.property(inline) {
                self.info_invalid(inline, "unexpected content in properties");
            }
        }
    }

    /// A `key=value` pair, a bare word, or a quoted value.
    fn property(&mut self, inline: bool) -> bool {
        if self.quoted(TokenKind::PropertyValue) {
            return true;
        }
        let rest = self.rest();
        let word = rest.find(|c: char| !is_word_char(c)).unwrap_or(rest.len());
        if word == 0 {
            return false;
        }
        self.consume(word);
        if self.peek() != Some('=') {
            return self.emit(TokenKind::Identifier);
        }
        self.emit(TokenKind::PropertyKey);
        self.single(TokenKind::Equals, '=');
        let valued = self.quoted(TokenKind::PropertyValue)
            || (self.eat_while(|c| !is_info_break(c, inline) && !is_blank(c)) > 0
                && self.emit(TokenKind::PropertyValue));
        if !valued {
            self.report_last(DiagnosticKind::InfoLine, "missing property value");
        }
        true
    }

    /// `K:` root, accidental and mode, then explicit accidentals and properties.
    fn key_content(&mut self, inline: bool) {
        self.whitespace();
        let rest = self.rest();
        if rest.get(..4).is_some_and(|w| w.eq_ignore_ascii_case("none"))
            && !rest[4..].starts_with(is_word_char)
        {
            self.consume(4);
            self.emit(TokenKind::KeyNone);
        } else if rest.starts_with("HP") || rest.starts_with("Hp") {
            self.consume(2);
            self.emit(TokenKind::KeyRoot);
        } else if rest.starts_with(|c: char| ('A'..='G').contains(&c)) {
            self.advance();
            self.emit(TokenKind::KeyRoot);
            if matches!(self.peek(), Some('#' | 'b')) {
                self.advance();
                self.emit(TokenKind::KeyAccidental);
            }
            self.key_mode();
        } else if !self.at_info_end(inline) && !starts_with_property(rest) {
            self.info_invalid(inline, "expected a key root");
        }
        self.key_tail(inline);
    }

    fn key_mode(&mut self) {
        let rest = self.rest();
        let word_rest = rest.trim_start_matches(is_blank);
        let word = word_rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(word_rest.len());
        if word == 0 || word_rest[word..].starts_with('=') || !is_mode(&word_rest[..word]) {
            return;
        }
        self.whitespace();
        self.consume(word);
        self.emit(TokenKind::KeyMode);
    }

    fn key_tail(&mut self, inline: bool) {
        loop {
            self.whitespace();
            if self.at_info_end(inline) {
                return;
            }
            let rest = self.rest();
            if let Some(n) = accidental_len(rest) {
                if rest[n..].starts_with(is_note_letter) {
                    self.consume(n);
                    self.emit(TokenKind::Accidental);
                    self.advance();
                    self.emit(TokenKind::NoteLetter);
                    continue;
                }
            }
            if !self.property(inline) {
                self.info_invalid(inline, "unexpected content in key");
            }
        }
    }

    /// `C`, `C|`, `none`, `6/8`, `(2+3+2)/8`.
    fn meter_content(&mut self, inline: bool) {
        loop {
            self.whitespace();
            if self.at_info_end(inline) {
                return;
            }
            let rest = self.rest();
            if rest.starts_with("C|") {
                self.consume(2);
                self.emit(TokenKind::SpecialLiteral);
                continue;
            }
            if rest.get(..4).is_some_and(|w| w.eq_ignore_ascii_case("none")) {
                self.consume(4);
                self.emit(TokenKind::Identifier);
                continue;
            }
            if self.single(TokenKind::SpecialLiteral, 'C') || self.digits(TokenKind::Number) {
                continue;
            }
            let kind = match self.peek() {
                Some('+') => TokenKind::Plus,
                Some('(') => TokenKind::LParen,
                Some(')') => TokenKind::RParen,
                Some('/') => TokenKind::Slash,
                _ => {
                    self.info_invalid(inline, "unexpected content in meter");
                    continue;
                }
            };
            self.advance();
            self.emit(kind);
            if kind == TokenKind::Slash && !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.report_last(DiagnosticKind::InfoLine, "missing denominator");
            }
        }
    }

    /// `L:1/8`. The denominator is mandatory.
    fn length_content(&mut self, inline: bool) {
        self.whitespace();
        self.digits(TokenKind::Number);
        if !self.single(TokenKind::Slash, '/') {
            self.report_last(DiagnosticKind::InfoLine, "expected a note length such as 1/8");
        } else if !self.digits(TokenKind::Number) {
            self.report_last(DiagnosticKind::InfoLine, "missing denominator");
        }
        self.rest_invalid(inline, "unexpected content in note length");
    }

    /// `Q:"Allegro" 1/4=120`
    fn tempo_content(&mut self, inline: bool) {
        loop {
            self.whitespace();
            if self.at_info_end(inline) {
                return;
            }
            if self.quoted(TokenKind::Annotation) || self.digits(TokenKind::Number) {
                continue;
            }
            let kind = match self.peek() {
                Some('/') => TokenKind::Slash,
                Some('=') => TokenKind::Equals,
                Some('A'..='G') => TokenKind::NoteLetter,
                _ => {
                    self.info_invalid(inline, "unexpected content in tempo");
                    continue;
                }
            };
            self.advance();
            self.emit(kind);
        }
    }

    /// `w:` and `W:` syllables and alignment marks.
    fn lyric_content(&mut self, inline: bool) {
        loop {
            if self.whitespace() {
                continue;
            }
            if self.at_info_end(inline) {
                return;
            }
            let mark = match self.peek() {
                Some('-') => Some(TokenKind::LyricHyphen),
                Some('_') => Some(TokenKind::LyricUnderscore),
                Some('*') => Some(TokenKind::LyricStar),
                Some('~') => Some(TokenKind::LyricSpace),
                Some('|') => Some(TokenKind::Barline),
                _ => None,
            };
            if let Some(kind) = mark {
                self.advance();
                self.emit(kind);
                continue;
            }
            if self.peek() == Some('\\') {
                self.advance();
                if self.at_end() || self.at_eol() {
                    self.emit(TokenKind::LineContinuation);
                } else {
                    self.advance();
                    self.emit(TokenKind::EscapedChar);
                }
                continue;
            }
            if !(self.eat_while(|c| !is_lyric_break(c, inline)) > 0 && self.emit(TokenKind::LyricText)) {
                self.info_invalid(inline, "unexpected content in lyrics");
            }
        }
    }

    /// `s:` symbol lines.
    fn symbol_line_content(&mut self, inline: bool) {
        loop {
            if self.whitespace() {
                continue;
            }
            if self.at_info_end(inline) {
                return;
            }
            if self.single(TokenKind::SymbolLineStar, '*')
                || self.single(TokenKind::Barline, '|')
                || self.quoted(TokenKind::Annotation)
                || self.symbol()
            {
                continue;
            }
            let text = self.eat_while(|c| {
                !is_info_break(c, inline) && !is_blank(c) && !matches!(c, '*' | '|' | '"')
            });
            if !(text > 0 && self.emit(TokenKind::SymbolLineText)) {
                self.info_invalid(inline, "unexpected content in symbol line");
            }
        }
    }

    /// `m: ~G3 = G3` declares a macro the body scanner will recognize.
    fn macro_content(&mut self, inline: bool) {
        self.whitespace();
        if self.eat_while(is_macro_char) == 0 {
            self.rest_invalid(inline, "expected a macro variable");
            return;
        }
        let name = self.input[self.start..self.position].to_string();
        self.emit(TokenKind::MacroVariable);
        self.whitespace();
        if self.single(TokenKind::Equals, '=') {
            log::trace!("declared macro {}", name);
            self.macros.push(name);
        } else {
            self.report_last(DiagnosticKind::InfoLine, "expected '=' in macro declaration");
        }
        self.whitespace();
        while !self.at_info_end(inline) {
            self.advance();
        }
        self.emit(TokenKind::MacroString);
    }

    /// `U: T = !trill!` declares a user symbol.
    fn user_symbol_content(&mut self, inline: bool) {
        self.whitespace();
        match self.peek() {
            Some(c) if is_user_symbol_char(c) => {
                self.single(TokenKind::UserSymbol, c);
                self.user_symbols.push(c);
            }
            _ => {
                self.rest_invalid(inline, "expected a user symbol (h-w, H-W or ~)");
                return;
            }
        }
        self.whitespace();
        if !self.single(TokenKind::Equals, '=') {
            self.report_last(DiagnosticKind::InfoLine, "expected '=' in user symbol declaration");
        }
        self.whitespace();
        if !self.symbol() && self.eat_while(|c| !is_info_break(c, inline) && !is_blank(c)) > 0 {
            self.emit(TokenKind::InfoString);
        }
        self.rest_invalid(inline, "unexpected content after user symbol");
    }
}

fn is_info_break(c: char, inline: bool) -> bool {
    matches!(c, '%' | '\n' | '\r') || (inline && c == ']')
}

fn is_lyric_break(c: char, inline: bool) -> bool {
    is_info_break(c, inline) || is_blank(c) || matches!(c, '-' | '_' | '*' | '~' | '|' | '\\')
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

fn starts_with_property(s: &str) -> bool {
    let word = s.find(|c: char| !is_word_char(c)).unwrap_or(s.len());
    word > 0 && s[word..].starts_with('=')
}

fn is_mode(word: &str) -> bool {
    let lower = word.to_ascii_lowercase();
    lower == "m" || lower.get(..3).is_some_and(|prefix| MODES.contains(&prefix))
}

fn is_macro_char(c: char) -> bool {
    matches!(c, 'a'..='x' | 'A'..='X' | '0'..='9' | '~')
}

fn is_user_symbol_char(c: char) -> bool {
    matches!(c, 'h'..='w' | 'H'..='W' | '~')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::IdGen;
    use crate::diagnostics::{Diagnostic, Diagnostics};
    use crate::lexer::{scan, Token};
    use pretty_assertions::assert_eq;
    use TokenKind::*;

    /// Scan one header line and drop the header token and trailing Eol.
    fn field(line: &str) -> (Vec<Token>, Vec<Diagnostic>) {
        let mut ids = IdGen::new();
        let mut diagnostics = Diagnostics::new();
        let mut tokens = scan(&format!("{}\n", line), &mut ids, &mut diagnostics);
        tokens.pop();
        tokens.remove(0);
        (tokens, diagnostics.into_vec())
    }

    fn kinds(line: &str) -> Vec<TokenKind> {
        field(line).0.iter().map(|t| t.kind).collect()
    }

    fn texts(line: &str) -> Vec<String> {
        field(line).0.into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn test_key_root_mode() {
        assert_eq!(kinds("K:Am"), vec![KeyRoot, KeyMode]);
        assert_eq!(kinds("K:F# Dorian"), vec![KeyRoot, KeyAccidental, Whitespace, KeyMode]);
        assert_eq!(kinds("K:Bbmix"), vec![KeyRoot, KeyAccidental, KeyMode]);
        assert_eq!(kinds("K:NONE"), vec![KeyNone]);
        assert_eq!(kinds("K:HP"), vec![KeyRoot]);
    }

    #[test]
    fn test_key_tail() {
        assert_eq!(
            texts("K:D clef=bass ^f _B"),
            vec!["D", " ", "clef", "=", "bass", " ", "^", "f", " ", "_", "B"]
        );
        assert_eq!(kinds("K:G treble"), vec![KeyRoot, Whitespace, Identifier]);
        assert_eq!(kinds("K:clef=alto"), vec![PropertyKey, Equals, PropertyValue]);
    }

    #[test]
    fn test_key_without_root() {
        let (tokens, diagnostics) = field("K:H");
        assert_eq!(tokens[0].kind, Invalid);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::InfoLine);
        assert_eq!(diagnostics[0].message, "expected a key root");
    }

    #[test]
    fn test_meter() {
        assert_eq!(kinds("M:C|"), vec![SpecialLiteral]);
        assert_eq!(kinds("M:6/8"), vec![Number, Slash, Number]);
        assert_eq!(
            kinds("M:(2+3+2)/8"),
            vec![LParen, Number, Plus, Number, Plus, Number, RParen, Slash, Number]
        );
        assert_eq!(kinds("M:none"), vec![Identifier]);
    }

    #[test]
    fn test_meter_missing_denominator() {
        let (_, diagnostics) = field("M:3/");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "missing denominator");
    }

    #[test]
    fn test_length() {
        assert_eq!(kinds("L:1/8"), vec![Number, Slash, Number]);
        assert_eq!(kinds("L: /4"), vec![Whitespace, Slash, Number]);
        let (_, diagnostics) = field("L:8");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_tempo() {
        assert_eq!(
            kinds("Q:\"Allegro\" 1/4=120"),
            vec![Annotation, Whitespace, Number, Slash, Number, Equals, Number]
        );
        assert_eq!(kinds("Q:C=100"), vec![NoteLetter, Equals, Number]);
    }

    #[test]
    fn test_voice() {
        assert_eq!(
            texts("V:T1 clef=treble name=\"Tenor 1\" merge"),
            vec!["T1", " ", "clef", "=", "treble", " ", "name", "=", "\"Tenor 1\"", " ", "merge"]
        );
        assert_eq!(
            &kinds("V:T1 clef=treble name=\"Tenor 1\" merge")[..2],
            &[VoiceId, Whitespace]
        );
    }

    #[test]
    fn test_lyrics() {
        assert_eq!(
            kinds("w:syl-la_ *~x\\-y|"),
            vec![LyricText, LyricHyphen, LyricText, LyricUnderscore, Whitespace, LyricStar, LyricSpace, LyricText, EscapedChar, LyricText, Barline]
        );
    }

    #[test]
    fn test_symbol_line() {
        assert_eq!(
            kinds("s:!f! * \"Am\" | cresc"),
            vec![Symbol, Whitespace, SymbolLineStar, Whitespace, Annotation, Whitespace, Barline, Whitespace, SymbolLineText]
        );
    }

    #[test]
    fn test_macro_declaration() {
        assert_eq!(
            texts("m: ~G3 = G>GG"),
            vec![" ", "~G3", " ", "=", " ", "G>GG"]
        );
        let (_, diagnostics) = field("m: ~G3 G");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_user_symbol_declaration() {
        assert_eq!(
            kinds("U: T = !trill!"),
            vec![Whitespace, UserSymbol, Whitespace, Equals, Whitespace, Symbol]
        );
        let (_, diagnostics) = field("U: y = !trill!");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_free_text_escapes_comment_sign() {
        assert_eq!(texts("T:50\\% off % note"), vec!["50\\% off ", "% note"]);
    }

    #[test]
    fn test_mode_words() {
        assert!(is_mode("m"));
        assert!(is_mode("Minor"));
        assert!(is_mode("mixolydian"));
        assert!(!is_mode("treble"));
        assert!(!is_mode("mi"));
    }
}
