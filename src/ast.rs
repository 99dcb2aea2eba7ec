//! # Syntax Tree Types
//!
//! This module defines the syntax tree built by the parser for ABC notation.
//!
//! ## Type Hierarchy
//! ```text
//! File
//!   ├── header: Option<FileHeader>       (directives, comments, info lines, free text)
//!   └── Vec<Tune>
//!         ├── TuneHeader
//!         │     ├── items: Vec<Element>  (InfoLine, Comment, Directive, MacroDecl, ...)
//!         │     └── voices: Vec<String>  (declared voice order)
//!         └── body: Option<TuneBody>
//!               └── systems: Vec<System>
//!                     └── Vec<Element>
//!
//! Element (enum)
//!   ├── Expr   (one variant per grammar production)
//!   └── Token  (raw structural token: EOL, whitespace, section break, slur, ...)
//!
//! Expr (enum)
//!   ├── Note ── Pitch (accidental, letter, octave), Rhythm, tie
//!   ├── Rest / MultiMeasureRest
//!   ├── Chord ── Vec<Element> (notes, annotations)
//!   ├── GraceGroup ── Vec<Element> (notes)
//!   ├── Tuplet, BarLine, Beam
//!   ├── Annotation, Decoration, Symbol, YSpacer
//!   ├── InlineField, InfoLine, SymbolLine, LyricLine, LyricSection
//!   ├── MacroDecl, MacroInvocation, UserSymbolDecl, UserSymbolInvocation
//!   ├── Directive, Comment, VoiceOverlay, LineContinuation, SystemBreak
//!   └── Error (ErrorExpr)
//! ```
//!
//! ## Key Concepts
//!
//! ### Ownership
//! Every node owns the tokens that make it up, in source order. Walking a
//! node with [`Node::tokens`] yields a contiguous slice of the token stream;
//! walking the whole [`File`] yields the entire stream.
//!
//! ### Node Ids
//! Tokens and nodes carry a [`NodeId`] drawn from one [`IdGen`] shared by the
//! scanner and the parser. Ids are unique within a parse and increase in
//! creation order. They are lookup keys for downstream tools (time maps,
//! formatters), never references.
//!
//! ### Time-Bearing Nodes
//! `Note`, `Chord`, `Rest`, `Beam` and `MultiMeasureRest` occupy musical time.
//! See [`Expr::is_time_bearing`].

use serde::Serialize;
use std::collections::BTreeSet;

use crate::lexer::{Token, TokenKind};

/// Identifier assigned to every token and node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u32);

/// Monotonic id counter threaded through scanning and parsing.
#[derive(Debug, Default)]
pub struct IdGen {
    next: u32,
}

impl IdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u32 {
        self.next
    }
}

/// Behaviour shared by every syntax node.
pub trait Node {
    fn id(&self) -> NodeId;

    /// Append the tokens owned by this node, in source order.
    fn collect_tokens<'t>(&'t self, out: &mut Vec<&'t Token>);

    fn tokens(&self) -> Vec<&Token> {
        let mut out = Vec::new();
        self.collect_tokens(&mut out);
        out
    }

    /// Source text covered by this node.
    fn text(&self) -> String {
        self.tokens().iter().map(|t| t.text.as_str()).collect()
    }
}

fn push_opt<'t>(out: &mut Vec<&'t Token>, token: &'t Option<Token>) {
    if let Some(token) = token {
        out.push(token);
    }
}

fn push_elements<'t>(out: &mut Vec<&'t Token>, elements: &'t [Element]) {
    for element in elements {
        element.collect_tokens(out);
    }
}

/// Root of the tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct File {
    pub id: NodeId,
    pub header: Option<FileHeader>,
    pub tunes: Vec<Tune>,
}

impl Node for File {
    fn id(&self) -> NodeId {
        self.id
    }

    fn collect_tokens<'t>(&'t self, out: &mut Vec<&'t Token>) {
        if let Some(header) = &self.header {
            header.collect_tokens(out);
        }
        for tune in &self.tunes {
            tune.collect_tokens(out);
        }
    }
}

/// Free-text header preceding the first tune.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileHeader {
    pub id: NodeId,
    pub items: Vec<Element>,
}

impl Node for FileHeader {
    fn id(&self) -> NodeId {
        self.id
    }

    fn collect_tokens<'t>(&'t self, out: &mut Vec<&'t Token>) {
        push_elements(out, &self.items);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tune {
    pub id: NodeId,
    pub header: TuneHeader,
    pub body: Option<TuneBody>,
}

impl Tune {
    /// Value of the `X:` line, if any.
    pub fn number(&self) -> Option<String> {
        self.header.info('X').map(InfoLine::value)
    }

    /// Value of the first `T:` line, if any.
    pub fn title(&self) -> Option<String> {
        self.header.info('T').map(InfoLine::value)
    }

    pub fn systems(&self) -> &[System] {
        match &self.body {
            Some(body) => &body.systems,
            None => &[],
        }
    }
}

impl Node for Tune {
    fn id(&self) -> NodeId {
        self.id
    }

    fn collect_tokens<'t>(&'t self, out: &mut Vec<&'t Token>) {
        self.header.collect_tokens(out);
        if let Some(body) = &self.body {
            body.collect_tokens(out);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TuneHeader {
    pub id: NodeId,
    pub items: Vec<Element>,
    /// Distinct voice ids in order of first appearance.
    pub voices: Vec<String>,
}

impl TuneHeader {
    /// First info line with the given header letter.
    pub fn info(&self, letter: char) -> Option<&InfoLine> {
        self.info_lines().find(|line| line.letter() == Some(letter))
    }

    pub fn info_lines(&self) -> impl Iterator<Item = &InfoLine> {
        self.items.iter().filter_map(|item| match item {
            Element::Expr(Expr::InfoLine(line)) => Some(line),
            _ => None,
        })
    }
}

impl Node for TuneHeader {
    fn id(&self) -> NodeId {
        self.id
    }

    fn collect_tokens<'t>(&'t self, out: &mut Vec<&'t Token>) {
        push_elements(out, &self.items);
    }
}

/// One printed line, or one group of simultaneous per-voice lines.
pub type System = Vec<Element>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TuneBody {
    pub id: NodeId,
    pub systems: Vec<System>,
}

impl Node for TuneBody {
    fn id(&self) -> NodeId {
        self.id
    }

    fn collect_tokens<'t>(&'t self, out: &mut Vec<&'t Token>) {
        for system in &self.systems {
            push_elements(out, system);
        }
    }
}

/// A syntax node or a raw structural token.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Element {
    Expr(Expr),
    Token(Token),
}

impl Element {
    pub fn as_expr(&self) -> Option<&Expr> {
        match self {
            Element::Expr(expr) => Some(expr),
            Element::Token(_) => None,
        }
    }

    pub fn as_token(&self) -> Option<&Token> {
        match self {
            Element::Token(token) => Some(token),
            Element::Expr(_) => None,
        }
    }

    pub fn is_token(&self, kind: TokenKind) -> bool {
        self.as_token().is_some_and(|token| token.kind == kind)
    }

    /// True for the tokens that end a physical line.
    pub fn is_line_end(&self) -> bool {
        self.is_token(TokenKind::Eol) || self.is_token(TokenKind::SectionBreak)
    }

    /// Voice id when this element is a `V:` line or a `[V:...]` field.
    pub fn voice_id(&self) -> Option<&str> {
        match self {
            Element::Expr(Expr::InfoLine(line)) => line.voice_id(),
            Element::Expr(Expr::InlineField(field)) => field.voice_id(),
            _ => None,
        }
    }
}

impl Node for Element {
    fn id(&self) -> NodeId {
        match self {
            Element::Expr(expr) => expr.id(),
            Element::Token(token) => token.id,
        }
    }

    fn collect_tokens<'t>(&'t self, out: &mut Vec<&'t Token>) {
        match self {
            Element::Expr(expr) => expr.collect_tokens(out),
            Element::Token(token) => out.push(token),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    Note(Note),
    Rest(Rest),
    MultiMeasureRest(MultiMeasureRest),
    Chord(Chord),
    GraceGroup(GraceGroup),
    Tuplet(Tuplet),
    BarLine(BarLine),
    Annotation(Annotation),
    Decoration(Decoration),
    Symbol(Symbol),
    InlineField(InlineField),
    InfoLine(InfoLine),
    SymbolLine(SymbolLine),
    Directive(Directive),
    Comment(Comment),
    LyricLine(LyricLine),
    LyricSection(LyricSection),
    MacroDecl(MacroDecl),
    MacroInvocation(MacroInvocation),
    UserSymbolDecl(UserSymbolDecl),
    UserSymbolInvocation(UserSymbolInvocation),
    VoiceOverlay(VoiceOverlay),
    LineContinuation(LineContinuation),
    SystemBreak(SystemBreak),
    YSpacer(YSpacer),
    Beam(Beam),
    Error(ErrorExpr),
}

impl Expr {
    fn as_node(&self) -> &dyn Node {
        match self {
            Expr::Note(n) => n,
            Expr::Rest(n) => n,
            Expr::MultiMeasureRest(n) => n,
            Expr::Chord(n) => n,
            Expr::GraceGroup(n) => n,
            Expr::Tuplet(n) => n,
            Expr::BarLine(n) => n,
            Expr::Annotation(n) => n,
            Expr::Decoration(n) => n,
            Expr::Symbol(n) => n,
            Expr::InlineField(n) => n,
            Expr::InfoLine(n) => n,
            Expr::SymbolLine(n) => n,
            Expr::Directive(n) => n,
            Expr::Comment(n) => n,
            Expr::LyricLine(n) => n,
            Expr::LyricSection(n) => n,
            Expr::MacroDecl(n) => n,
            Expr::MacroInvocation(n) => n,
            Expr::UserSymbolDecl(n) => n,
            Expr::UserSymbolInvocation(n) => n,
            Expr::VoiceOverlay(n) => n,
            Expr::LineContinuation(n) => n,
            Expr::SystemBreak(n) => n,
            Expr::YSpacer(n) => n,
            Expr::Beam(n) => n,
            Expr::Error(n) => n,
        }
    }

    /// Nodes that occupy musical duration.
    pub fn is_time_bearing(&self) -> bool {
        matches!(
            self,
            Expr::Note(_) | Expr::Chord(_) | Expr::Rest(_) | Expr::Beam(_) | Expr::MultiMeasureRest(_)
        )
    }
}

impl Node for Expr {
    fn id(&self) -> NodeId {
        self.as_node().id()
    }

    fn collect_tokens<'t>(&'t self, out: &mut Vec<&'t Token>) {
        self.as_node().collect_tokens(out)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pitch {
    pub id: NodeId,
    pub accidental: Option<Token>,
    pub letter: Token,
    pub octave: Option<Token>,
}

impl Node for Pitch {
    fn id(&self) -> NodeId {
        self.id
    }

    fn collect_tokens<'t>(&'t self, out: &mut Vec<&'t Token>) {
        push_opt(out, &self.accidental);
        out.push(&self.letter);
        push_opt(out, &self.octave);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rhythm {
    pub id: NodeId,
    pub numerator: Option<Token>,
    pub separator: Option<Token>,
    pub denominator: Option<Token>,
    pub broken: Option<Token>,
}

impl Rhythm {
    /// Length multiplier as `(numerator, denominator)`.
    ///
    /// `A3/2` is 3/2, `A/` is 1/2, `A//` is 1/4, `A4` is 4/1.
    pub fn fraction(&self) -> (u32, u32) {
        let numerator = self
            .numerator
            .as_ref()
            .and_then(|t| t.text.parse().ok())
            .unwrap_or(1);
        let slashes = self.separator.as_ref().map_or(0, |t| t.text.len() as u32).min(16);
        let explicit = self
            .denominator
            .as_ref()
            .and_then(|t| t.text.parse::<u32>().ok());
        let denominator = match explicit {
            Some(d) => d.saturating_mul(1 << slashes.saturating_sub(1)),
            None if slashes > 0 => 1 << slashes,
            None => 1,
        };
        (numerator, denominator)
    }
}

impl Node for Rhythm {
    fn id(&self) -> NodeId {
        self.id
    }

    fn collect_tokens<'t>(&'t self, out: &mut Vec<&'t Token>) {
        push_opt(out, &self.numerator);
        push_opt(out, &self.separator);
        push_opt(out, &self.denominator);
        push_opt(out, &self.broken);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Note {
    pub id: NodeId,
    pub pitch: Pitch,
    pub rhythm: Option<Rhythm>,
    pub tie: Option<Token>,
}

impl Node for Note {
    fn id(&self) -> NodeId {
        self.id
    }

    fn collect_tokens<'t>(&'t self, out: &mut Vec<&'t Token>) {
        self.pitch.collect_tokens(out);
        if let Some(rhythm) = &self.rhythm {
            rhythm.collect_tokens(out);
        }
        push_opt(out, &self.tie);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rest {
    pub id: NodeId,
    pub rest: Token,
    pub rhythm: Option<Rhythm>,
}

impl Node for Rest {
    fn id(&self) -> NodeId {
        self.id
    }

    fn collect_tokens<'t>(&'t self, out: &mut Vec<&'t Token>) {
        out.push(&self.rest);
        if let Some(rhythm) = &self.rhythm {
            rhythm.collect_tokens(out);
        }
    }
}

/// `Z` or `X` rest spanning whole measures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiMeasureRest {
    pub id: NodeId,
    pub rest: Token,
    pub rhythm: Option<Rhythm>,
}

impl MultiMeasureRest {
    pub fn measures(&self) -> u32 {
        self.rhythm
            .as_ref()
            .and_then(|r| r.numerator.as_ref())
            .and_then(|t| t.text.parse().ok())
            .unwrap_or(1)
    }
}

impl Node for MultiMeasureRest {
    fn id(&self) -> NodeId {
        self.id
    }

    fn collect_tokens<'t>(&'t self, out: &mut Vec<&'t Token>) {
        out.push(&self.rest);
        if let Some(rhythm) = &self.rhythm {
            rhythm.collect_tokens(out);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chord {
    pub id: NodeId,
    pub left_bracket: Token,
    pub contents: Vec<Element>,
    pub right_bracket: Option<Token>,
    pub rhythm: Option<Rhythm>,
    pub tie: Option<Token>,
}

impl Chord {
    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.contents.iter().filter_map(|element| match element {
            Element::Expr(Expr::Note(note)) => Some(note),
            _ => None,
        })
    }
}

impl Node for Chord {
    fn id(&self) -> NodeId {
        self.id
    }

    fn collect_tokens<'t>(&'t self, out: &mut Vec<&'t Token>) {
        out.push(&self.left_bracket);
        push_elements(out, &self.contents);
        push_opt(out, &self.right_bracket);
        if let Some(rhythm) = &self.rhythm {
            rhythm.collect_tokens(out);
        }
        push_opt(out, &self.tie);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraceGroup {
    pub id: NodeId,
    pub left_brace: Token,
    /// Acciaccatura slash.
    pub slash: Option<Token>,
    pub notes: Vec<Element>,
    pub right_brace: Option<Token>,
}

impl GraceGroup {
    pub fn is_acciaccatura(&self) -> bool {
        self.slash.is_some()
    }
}

impl Node for GraceGroup {
    fn id(&self) -> NodeId {
        self.id
    }

    fn collect_tokens<'t>(&'t self, out: &mut Vec<&'t Token>) {
        out.push(&self.left_brace);
        push_opt(out, &self.slash);
        push_elements(out, &self.notes);
        push_opt(out, &self.right_brace);
    }
}

/// `(p:q:r)`: p notes in the time of q, applied to the next r notes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tuplet {
    pub id: NodeId,
    pub left_paren: Token,
    pub p: Token,
    pub q_colon: Option<Token>,
    pub q: Option<Token>,
    pub r_colon: Option<Token>,
    pub r: Option<Token>,
}

impl Tuplet {
    pub fn ratio(&self) -> (u32, Option<u32>, Option<u32>) {
        let value = |token: &Option<Token>| token.as_ref().and_then(|t| t.text.parse().ok());
        (self.p.text.parse().unwrap_or(0), value(&self.q), value(&self.r))
    }
}

impl Node for Tuplet {
    fn id(&self) -> NodeId {
        self.id
    }

    fn collect_tokens<'t>(&'t self, out: &mut Vec<&'t Token>) {
        out.push(&self.left_paren);
        out.push(&self.p);
        push_opt(out, &self.q_colon);
        push_opt(out, &self.q);
        push_opt(out, &self.r_colon);
        push_opt(out, &self.r);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarLine {
    pub id: NodeId,
    pub bars: Vec<Token>,
    /// Numbers and separators of an ending list such as `1,3-5`.
    pub repeat_numbers: Vec<Token>,
}

impl BarLine {
    /// Endings named by the repeat-number list, sorted and without duplicates.
    ///
    /// `1,3-5,7` gives `[1, 3, 4, 5, 7]`. The count after `x` is a repeat
    /// count, not an ending.
    pub fn endings(&self) -> Vec<u32> {
        let mut endings = BTreeSet::new();
        let mut previous: Option<u32> = None;
        let mut separator: Option<TokenKind> = None;
        for token in &self.repeat_numbers {
            match token.kind {
                TokenKind::RepeatNumber => {
                    let Ok(number) = token.text.parse::<u32>() else {
                        continue;
                    };
                    match (separator.take(), previous) {
                        (Some(TokenKind::RepeatX), _) => continue,
                        (Some(TokenKind::RepeatDash), Some(start)) => {
                            let (low, high) = (start.min(number), start.max(number));
                            if high - low <= 256 {
                                endings.extend(low..=high);
                            } else {
                                endings.insert(low);
                                endings.insert(high);
                            }
                        }
                        _ => {
                            endings.insert(number);
                        }
                    }
                    previous = Some(number);
                }
                TokenKind::RepeatComma | TokenKind::RepeatDash | TokenKind::RepeatX => {
                    separator = Some(token.kind);
                }
                _ => {}
            }
        }
        endings.into_iter().collect()
    }
}

impl Node for BarLine {
    fn id(&self) -> NodeId {
        self.id
    }

    fn collect_tokens<'t>(&'t self, out: &mut Vec<&'t Token>) {
        out.extend(self.bars.iter());
        out.extend(self.repeat_numbers.iter());
    }
}

/// `[K:G]` and other fields embedded in a music line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineField {
    pub id: NodeId,
    pub left_bracket: Token,
    pub header: Token,
    pub content: Vec<Token>,
    pub right_bracket: Option<Token>,
}

impl InlineField {
    pub fn letter(&self) -> Option<char> {
        self.header.header_letter()
    }

    pub fn value(&self) -> String {
        joined_value(&self.content)
    }

    pub fn voice_id(&self) -> Option<&str> {
        voice_id_of(self.letter(), &self.content)
    }
}

impl Node for InlineField {
    fn id(&self) -> NodeId {
        self.id
    }

    fn collect_tokens<'t>(&'t self, out: &mut Vec<&'t Token>) {
        out.push(&self.left_bracket);
        out.push(&self.header);
        out.extend(self.content.iter());
        push_opt(out, &self.right_bracket);
    }
}

fn joined_value(content: &[Token]) -> String {
    let text: String = content.iter().map(|t| t.text.as_str()).collect();
    text.trim().to_string()
}

fn voice_id_of(letter: Option<char>, content: &[Token]) -> Option<&str> {
    if letter != Some('V') {
        return None;
    }
    content
        .iter()
        .find(|t| t.kind == TokenKind::VoiceId)
        .map(|t| t.text.as_str())
}

macro_rules! line_node {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize)]
        pub struct $name {
            pub id: NodeId,
            pub header: Token,
            pub content: Vec<Token>,
        }

        impl Node for $name {
            fn id(&self) -> NodeId {
                self.id
            }

            fn collect_tokens<'t>(&'t self, out: &mut Vec<&'t Token>) {
                out.push(&self.header);
                out.extend(self.content.iter());
            }
        }
    };
}

line_node!(
    /// `<letter>:` line, including `+:` continuations.
    InfoLine
);
line_node!(
    /// `s:` line aligning symbols with the notes above.
    SymbolLine
);
line_node!(
    /// `w:` lyrics aligned with the preceding music line.
    LyricLine
);
line_node!(
    /// `W:` lyrics printed after the tune.
    LyricSection
);
line_node!(
    /// `m: name = replacement`
    MacroDecl
);
line_node!(
    /// `U: T = !trill!`
    UserSymbolDecl
);

impl InfoLine {
    pub fn letter(&self) -> Option<char> {
        self.header.header_letter()
    }

    /// Content with surrounding whitespace removed.
    pub fn value(&self) -> String {
        joined_value(&self.content)
    }

    pub fn voice_id(&self) -> Option<&str> {
        voice_id_of(self.letter(), &self.content)
    }
}

impl MacroDecl {
    pub fn variable(&self) -> Option<&Token> {
        self.content.iter().find(|t| t.kind == TokenKind::MacroVariable)
    }

    pub fn replacement(&self) -> Option<&Token> {
        self.content.iter().find(|t| t.kind == TokenKind::MacroString)
    }
}

impl UserSymbolDecl {
    pub fn symbol(&self) -> Option<&Token> {
        self.content.iter().find(|t| t.kind == TokenKind::UserSymbol)
    }
}

macro_rules! token_node {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize)]
        pub struct $name {
            pub id: NodeId,
            pub token: Token,
        }

        impl Node for $name {
            fn id(&self) -> NodeId {
                self.id
            }

            fn collect_tokens<'t>(&'t self, out: &mut Vec<&'t Token>) {
                out.push(&self.token);
            }
        }
    };
}

token_node!(
    /// `"text"` chord symbol or free annotation.
    Annotation
);
token_node!(Decoration);
token_node!(
    /// `!trill!` or `+trill+`.
    Symbol
);
token_node!(
    /// `%%` line.
    Directive
);
token_node!(Comment);
token_node!(MacroInvocation);
token_node!(UserSymbolInvocation);
token_node!(
    /// `&`
    VoiceOverlay
);
token_node!(
    /// `\` joining two source lines into one music line.
    LineContinuation
);
token_node!(
    /// `$`
    SystemBreak
);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YSpacer {
    pub id: NodeId,
    pub token: Token,
    pub rhythm: Option<Rhythm>,
}

impl Node for YSpacer {
    fn id(&self) -> NodeId {
        self.id
    }

    fn collect_tokens<'t>(&'t self, out: &mut Vec<&'t Token>) {
        out.push(&self.token);
        if let Some(rhythm) = &self.rhythm {
            rhythm.collect_tokens(out);
        }
    }
}

/// Notes and chords written without separating whitespace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Beam {
    pub id: NodeId,
    pub contents: Vec<Element>,
}

impl Node for Beam {
    fn id(&self) -> NodeId {
        self.id
    }

    fn collect_tokens<'t>(&'t self, out: &mut Vec<&'t Token>) {
        push_elements(out, &self.contents);
    }
}

/// Tokens no production accepted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorExpr {
    pub id: NodeId,
    pub tokens: Vec<Token>,
    pub message: Option<String>,
}

impl Node for ErrorExpr {
    fn id(&self) -> NodeId {
        self.id
    }

    fn collect_tokens<'t>(&'t self, out: &mut Vec<&'t Token>) {
        out.extend(self.tokens.iter());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(kind: TokenKind, text: &str) -> Token {
        Token {
            id: NodeId(0),
            kind,
            text: text.to_string(),
            line: 1,
            column: 1,
            offset: 0,
        }
    }

    fn rhythm(numerator: Option<&str>, separator: Option<&str>, denominator: Option<&str>) -> Rhythm {
        Rhythm {
            id: NodeId(0),
            numerator: numerator.map(|t| token(TokenKind::RhythmNumerator, t)),
            separator: separator.map(|t| token(TokenKind::RhythmSeparator, t)),
            denominator: denominator.map(|t| token(TokenKind::RhythmDenominator, t)),
            broken: None,
        }
    }

    #[test]
    fn test_id_gen_is_monotonic() {
        let mut ids = IdGen::new();
        let a = ids.next_id();
        let b = ids.next_id();
        assert!(a < b);
        assert_eq!(ids.issued(), 2);
    }

    #[test]
    fn test_rhythm_fraction() {
        assert_eq!(rhythm(Some("3"), Some("/"), Some("2")).fraction(), (3, 2));
        assert_eq!(rhythm(None, Some("/"), None).fraction(), (1, 2));
        assert_eq!(rhythm(None, Some("//"), None).fraction(), (1, 4));
        assert_eq!(rhythm(Some("4"), None, None).fraction(), (4, 1));
        assert_eq!(rhythm(None, Some("/"), Some("8")).fraction(), (1, 8));
    }

    #[test]
    fn test_endings_expand_ranges_and_skip_repeat_counts() {
        let bar = BarLine {
            id: NodeId(0),
            bars: vec![token(TokenKind::Barline, "|")],
            repeat_numbers: vec![
                token(TokenKind::RepeatNumber, "1"),
                token(TokenKind::RepeatComma, ","),
                token(TokenKind::RepeatNumber, "3"),
                token(TokenKind::RepeatDash, "-"),
                token(TokenKind::RepeatNumber, "5"),
                token(TokenKind::RepeatX, "x"),
                token(TokenKind::RepeatNumber, "2"),
            ],
        };
        assert_eq!(bar.endings(), vec![1, 3, 4, 5]);
    }

    #[test]
    fn test_time_bearing_nodes() {
        let rest = Expr::Rest(Rest {
            id: NodeId(1),
            rest: token(TokenKind::Rest, "z"),
            rhythm: None,
        });
        let comment = Expr::Comment(Comment {
            id: NodeId(2),
            token: token(TokenKind::Comment, "% hi"),
        });
        assert!(rest.is_time_bearing());
        assert!(!comment.is_time_bearing());
        assert_eq!(comment.id(), NodeId(2));
        assert_eq!(comment.text(), "% hi");
    }
}
