use serde::Serialize;

use crate::ast::NodeId;

/// Token kinds for ABC notation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenKind {
    // Pitch
    Accidental,        // ^ ^^ ^/ _ __ _/ =
    NoteLetter,        // A-G a-g
    Octave,            // ' ,
    Rest,              // z Z x X
    Tie,               // -
    Decoration,        // . ~ H L M O P R S T u v
    Slur,              // ( )

    // Rhythm
    RhythmNumerator,   // 3 in A3/2
    RhythmSeparator,   // one or more /
    RhythmDenominator, // 2 in A3/2
    BrokenRhythm,      // > >> < <<

    // Tuplets
    TupletLParen,      // ( before a digit
    TupletP,
    TupletColon,
    TupletQ,
    TupletR,

    // Bar lines and endings
    Barline,           // | || |] [| |: :| :: [1
    RepeatNumber,
    RepeatComma,
    RepeatDash,
    RepeatX,

    // Brackets
    ChordLeftBracket,
    ChordRightBracket,
    GraceLeftBrace,
    GraceRightBrace,
    GraceSlash,        // acciaccatura
    InlineFieldLeftBracket,
    InlineFieldRightBracket,

    // Delimited text
    Annotation,        // "text"
    Symbol,            // !text! +text+

    // Info lines
    InfoHeader,        // T: K: V: ...
    InfoContinuation,  // +:
    InfoString,
    VoiceId,
    PropertyKey,
    PropertyValue,
    Identifier,
    Equals,
    KeyNone,
    KeyRoot,
    KeyAccidental,     // # b
    KeyMode,
    SpecialLiteral,    // C C| in meters
    Number,
    Slash,
    Plus,
    LParen,
    RParen,

    // Lyrics
    LyricHeader,        // w:
    LyricSectionHeader, // W:
    LyricText,
    LyricHyphen,
    LyricUnderscore,
    LyricStar,
    LyricSpace,         // ~
    EscapedChar,

    // Symbol lines
    SymbolLineHeader,  // s:
    SymbolLineText,
    SymbolLineStar,

    // Macros and user symbols
    MacroHeader,       // m:
    MacroVariable,
    MacroString,
    MacroInvocation,
    UserSymbolHeader,  // U:
    UserSymbol,
    UserSymbolInvocation,

    // Body punctuation
    VoiceOverlay,      // &
    LineContinuation,  // \
    SystemBreak,       // $
    BacktickSpacer,    // `
    YSpacer,           // y

    // Structure
    StylesheetDirective, // %%...
    Comment,
    FreeText,
    Whitespace,
    Eol,
    SectionBreak,
    Invalid,
}

impl TokenKind {
    /// Kinds that open an info line when they appear at the start of a line.
    pub fn is_line_header(self) -> bool {
        matches!(
            self,
            TokenKind::InfoHeader
                | TokenKind::InfoContinuation
                | TokenKind::LyricHeader
                | TokenKind::LyricSectionHeader
                | TokenKind::SymbolLineHeader
                | TokenKind::MacroHeader
                | TokenKind::UserSymbolHeader
        )
    }
}

/// A token with its position in the source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub id: NodeId,
    pub kind: TokenKind,
    /// Exact source slice.
    pub text: String,
    pub line: usize,
    pub column: usize,
    /// Byte offset of the first character.
    pub offset: usize,
}

impl Token {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// Byte offset one past the last character.
    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }

    /// Header letter of an info-line or inline-field header token (`K` for `K:`).
    pub fn header_letter(&self) -> Option<char> {
        if !self.kind.is_line_header() {
            return None;
        }
        self.text.chars().next()
    }
}
