//! # Parser Module
//!
//! Builds the syntax tree from the token stream.
//!
//! ## Purpose
//! The parser is the second stage of the pipeline. It walks the tokens with
//! one cursor and one token of lookahead. Each production either matches and
//! consumes the tokens it owns, or consumes nothing.
//!
//! ## Structure
//!
//! ### File
//! An optional file header (everything before the first `X:` line) followed
//! by tunes.
//!
//! ### Tune Header
//! Info lines, comments and directives up to the first line of music,
//! including those after `K:`. Voice ids from its `V:` lines are collected in
//! first-appearance order; that list is fixed once the header is parsed.
//!
//! ### Tune Body
//! Lines of music (see `music.rs`), info lines, lyrics and comments until a
//! section break. The flat element list is handed to
//! [`voices::segment`](crate::voices::segment) together with the voice order.
//!
//! ## Failure Semantics
//! A token no production accepts becomes an `ErrorExpr` and a diagnostic.
//! `Invalid` tokens were already reported by the lexer and are wrapped
//! silently. Parsing never fails.
//!
//! ## Entry Point
//! `parse(tokens, ids, diagnostics, options) -> File`
//!
//! ## Example
//! ```rust
//! use abc_syntax::ast::IdGen;
//! use abc_syntax::config::ParseOptions;
//! use abc_syntax::diagnostics::Diagnostics;
//! use abc_syntax::{lexer, parser};
//!
//! let mut ids = IdGen::new();
//! let mut diagnostics = Diagnostics::new();
//! let tokens = lexer::scan("X:1\nT:Reel\nK:D\nAB|\n", &mut ids, &mut diagnostics);
//! let file = parser::parse(&tokens, &mut ids, &mut diagnostics, &ParseOptions::default());
//!
//! assert_eq!(file.tunes.len(), 1);
//! assert_eq!(file.tunes[0].title().as_deref(), Some("Reel"));
//! assert_eq!(file.tunes[0].systems().len(), 1);
//! ```
//!
//! ## Related Modules
//! - `lexer` - Provides the tokens
//! - `ast` - Defines the tree
//! - `voices` - Groups body elements into systems

mod music;

use crate::ast::*;
use crate::config::ParseOptions;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::lexer::{Token, TokenKind};
use crate::voices;

/// Parse a complete token stream.
pub fn parse(
    tokens: &[Token],
    ids: &mut IdGen,
    diagnostics: &mut Diagnostics,
    options: &ParseOptions,
) -> File {
    Parser::new(tokens, ids, diagnostics, options).parse_file()
}

/// Parser for ABC tokens
pub struct Parser<'a> {
    tokens: &'a [Token],
    position: usize,
    ids: &'a mut IdGen,
    diagnostics: &'a mut Diagnostics,
    options: &'a ParseOptions,
}

impl<'a> Parser<'a> {
    pub fn new(
        tokens: &'a [Token],
        ids: &'a mut IdGen,
        diagnostics: &'a mut Diagnostics,
        options: &'a ParseOptions,
    ) -> Self {
        Self {
            tokens,
            position: 0,
            ids,
            diagnostics,
            options,
        }
    }

    fn current(&self) -> Option<&'a Token> {
        self.tokens.get(self.position)
    }

    fn kind(&self) -> Option<TokenKind> {
        self.current().map(|t| t.kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.kind() == Some(kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.current()?.clone();
        self.position += 1;
        Some(token)
    }

    /// Consume the current token if it has the given kind.
    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.at(kind) {
            self.advance()
        } else {
            None
        }
    }

    fn next_id(&mut self) -> NodeId {
        self.ids.next_id()
    }

    fn raw(&mut self, token: &Token) -> Element {
        self.position += 1;
        Element::Token(token.clone())
    }

    /// Consume one token and wrap it in a single-token node.
    fn wrap(&mut self, token: &Token, build: impl FnOnce(NodeId, Token) -> Expr) -> Element {
        self.position += 1;
        let id = self.next_id();
        Element::Expr(build(id, token.clone()))
    }

    /// Wrap the current token in an `ErrorExpr`, reporting it unless the lexer
    /// already did.
    fn error(&mut self, token: &Token, message: &str) -> Element {
        self.position += 1;
        let message = if token.kind == TokenKind::Invalid {
            None
        } else {
            self.diagnostics.report(DiagnosticKind::Parse, token, message);
            Some(message.to_string())
        };
        let id = self.next_id();
        Element::Expr(Expr::Error(ErrorExpr {
            id,
            tokens: vec![token.clone()],
            message,
        }))
    }

    pub fn parse_file(mut self) -> File {
        let header = self.file_header();
        let mut tunes = Vec::new();
        while self.current().is_some() {
            tunes.push(self.tune());
        }
        File {
            id: self.next_id(),
            header,
            tunes,
        }
    }

    fn file_header(&mut self) -> Option<FileHeader> {
        let mut items = Vec::new();
        while let Some(token) = self.current() {
            if token.kind == TokenKind::InfoHeader && token.header_letter() == Some('X') {
                break;
            }
            let item = match token.kind {
                TokenKind::Comment | TokenKind::StylesheetDirective => self.comment_or_directive(token),
                kind if kind.is_line_header() => self.line_field(token),
                _ => self.raw(token),
            };
            items.push(item);
        }
        if items.is_empty() {
            return None;
        }
        Some(FileHeader {
            id: self.next_id(),
            items,
        })
    }

    fn tune(&mut self) -> Tune {
        let (header, finished) = self.tune_header();
        let body = if finished { Vec::new() } else { self.tune_body() };

        let body = if body.is_empty() {
            None
        } else {
            let systems = voices::segment(body, &header.voices);
            Some(TuneBody {
                id: self.next_id(),
                systems,
            })
        };
        let tune = Tune {
            id: self.next_id(),
            header,
            body,
        };
        log::debug!(
            "parsed tune {} with {} systems and voices {:?}",
            tune.number().unwrap_or_else(|| "?".to_string()),
            tune.systems().len(),
            tune.header.voices
        );
        tune
    }

    /// Returns the header and whether the tune already ended (section break
    /// or end of input inside the header).
    fn tune_header(&mut self) -> (TuneHeader, bool) {
        let mut items = Vec::new();
        let mut finished = false;
        while let Some(token) = self.current() {
            match token.kind {
                TokenKind::SectionBreak => {
                    items.push(self.raw(token));
                    finished = true;
                    break;
                }
                TokenKind::Eol => items.push(self.raw(token)),
                TokenKind::Whitespace if self.blank_line_rest() => items.push(self.raw(token)),
                TokenKind::Comment | TokenKind::StylesheetDirective => {
                    items.push(self.comment_or_directive(token))
                }
                // Lyrics and symbol lines belong to the music above them.
                TokenKind::LyricHeader | TokenKind::SymbolLineHeader => break,
                kind if kind.is_line_header() => items.push(self.line_field(token)),
                _ => break,
            }
        }
        if self.current().is_none() {
            finished = true;
        }

        let mut voices: Vec<String> = Vec::new();
        for item in &items {
            if let Some(voice) = item.voice_id() {
                if !voices.iter().any(|v| v == voice) {
                    voices.push(voice.to_string());
                }
            }
        }
        let header = TuneHeader {
            id: self.next_id(),
            items,
            voices,
        };
        (header, finished)
    }

    /// True when the whitespace under the cursor is followed by a line end,
    /// a comment or the end of input, not by music.
    fn blank_line_rest(&self) -> bool {
        match self.tokens.get(self.position + 1) {
            None => true,
            Some(next) => matches!(
                next.kind,
                TokenKind::Eol | TokenKind::SectionBreak | TokenKind::Comment
            ),
        }
    }

    /// Flat element list of a tune body, up to and including a section break.
    fn tune_body(&mut self) -> Vec<Element> {
        let mut elements = Vec::new();
        while let Some(token) = self.current() {
            match token.kind {
                TokenKind::SectionBreak => {
                    elements.push(self.raw(token));
                    break;
                }
                TokenKind::Eol | TokenKind::FreeText => elements.push(self.raw(token)),
                TokenKind::Comment | TokenKind::StylesheetDirective => {
                    elements.push(self.comment_or_directive(token))
                }
                kind if kind.is_line_header() => elements.push(self.line_field(token)),
                _ => self.music_line(&mut elements),
            }
        }
        elements
    }

    fn comment_or_directive(&mut self, token: &Token) -> Element {
        if token.kind == TokenKind::StylesheetDirective {
            self.wrap(token, |id, token| Expr::Directive(Directive { id, token }))
        } else {
            self.wrap(token, |id, token| Expr::Comment(Comment { id, token }))
        }
    }

    /// An info, lyric, symbol, macro or user-symbol line. Its content runs to
    /// the end of the line, stopping before a trailing comment.
    fn line_field(&mut self, header: &Token) -> Element {
        self.position += 1;
        let mut content = Vec::new();
        while let Some(token) = self.current() {
            if matches!(
                token.kind,
                TokenKind::Eol | TokenKind::Comment | TokenKind::SectionBreak
            ) {
                break;
            }
            content.push(token.clone());
            self.position += 1;
        }
        let id = self.next_id();
        let header = header.clone();
        let expr = match header.kind {
            TokenKind::LyricHeader => Expr::LyricLine(LyricLine { id, header, content }),
            TokenKind::LyricSectionHeader => Expr::LyricSection(LyricSection { id, header, content }),
            TokenKind::SymbolLineHeader => Expr::SymbolLine(SymbolLine { id, header, content }),
            TokenKind::MacroHeader => Expr::MacroDecl(MacroDecl { id, header, content }),
            TokenKind::UserSymbolHeader => Expr::UserSymbolDecl(UserSymbolDecl { id, header, content }),
            _ => Expr::InfoLine(InfoLine { id, header, content }),
        };
        Element::Expr(expr)
    }
}
