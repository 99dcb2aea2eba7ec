//! Music-line productions: notes, rests, chords, grace groups, tuplets, bar
//! lines, inline fields and the single-token constructs, plus beam grouping.

use std::mem;

use super::Parser;
use crate::ast::*;
use crate::diagnostics::DiagnosticKind;
use crate::lexer::{Token, TokenKind};

impl<'a> Parser<'a> {
    /// Parse the rest of the current line into `elements`. Stops before a
    /// line end, comment, or line-level token.
    pub(super) fn music_line(&mut self, elements: &mut Vec<Element>) {
        let mut line = Vec::new();
        while let Some(token) = self.current() {
            if ends_music_line(token.kind) {
                break;
            }
            line.push(self.music_element(token));
        }
        if self.options.group_beams {
            line = group_beams(line, self.ids);
        }
        elements.extend(line);
    }

    fn music_element(&mut self, token: &'a Token) -> Element {
        match token.kind {
            TokenKind::Barline => {
                let bar = self.bar_line();
                Element::Expr(Expr::BarLine(bar))
            }
            TokenKind::Accidental | TokenKind::NoteLetter => match self.note() {
                Some(note) => Element::Expr(Expr::Note(note)),
                None => self.error(token, "accidental without a note"),
            },
            TokenKind::Rest => self.rest(token),
            TokenKind::ChordLeftBracket => Element::Expr(Expr::Chord(self.chord(token))),
            TokenKind::GraceLeftBrace => Element::Expr(Expr::GraceGroup(self.grace_group(token))),
            TokenKind::TupletLParen => match self.tuplet() {
                Some(tuplet) => Element::Expr(Expr::Tuplet(tuplet)),
                None => self.error(token, "tuplet without a note count"),
            },
            TokenKind::InlineFieldLeftBracket => match self.inline_field() {
                Some(field) => Element::Expr(Expr::InlineField(field)),
                None => self.error(token, "inline field without a header"),
            },
            TokenKind::YSpacer => {
                self.position += 1;
                let rhythm = self.rhythm();
                let id = self.next_id();
                Element::Expr(Expr::YSpacer(YSpacer {
                    id,
                    token: token.clone(),
                    rhythm,
                }))
            }
            TokenKind::Annotation => self.wrap(token, |id, token| Expr::Annotation(Annotation { id, token })),
            TokenKind::Decoration => self.wrap(token, |id, token| Expr::Decoration(Decoration { id, token })),
            TokenKind::Symbol => self.wrap(token, |id, token| Expr::Symbol(Symbol { id, token })),
            TokenKind::MacroInvocation => {
                self.wrap(token, |id, token| Expr::MacroInvocation(MacroInvocation { id, token }))
            }
            TokenKind::UserSymbolInvocation => self.wrap(token, |id, token| {
                Expr::UserSymbolInvocation(UserSymbolInvocation { id, token })
            }),
            TokenKind::VoiceOverlay => {
                self.wrap(token, |id, token| Expr::VoiceOverlay(VoiceOverlay { id, token }))
            }
            TokenKind::LineContinuation => {
                self.wrap(token, |id, token| Expr::LineContinuation(LineContinuation { id, token }))
            }
            TokenKind::SystemBreak => {
                self.wrap(token, |id, token| Expr::SystemBreak(SystemBreak { id, token }))
            }
            TokenKind::Whitespace | TokenKind::Slur | TokenKind::BacktickSpacer => self.raw(token),
            TokenKind::Invalid => self.error(token, "invalid input"),
            kind => self.error(token, &format!("unexpected {:?}", kind)),
        }
    }

    fn rhythm(&mut self) -> Option<Rhythm> {
        let numerator = self.eat(TokenKind::RhythmNumerator);
        let separator = self.eat(TokenKind::RhythmSeparator);
        let denominator = match separator {
            Some(_) => self.eat(TokenKind::RhythmDenominator),
            None => None,
        };
        let broken = self.eat(TokenKind::BrokenRhythm);
        if numerator.is_none() && separator.is_none() && broken.is_none() {
            return None;
        }
        Some(Rhythm {
            id: self.next_id(),
            numerator,
            separator,
            denominator,
            broken,
        })
    }

    fn note(&mut self) -> Option<Note> {
        let start = self.position;
        let accidental = self.eat(TokenKind::Accidental);
        let Some(letter) = self.eat(TokenKind::NoteLetter) else {
            self.position = start;
            return None;
        };
        let octave = self.eat(TokenKind::Octave);
        let pitch = Pitch {
            id: self.next_id(),
            accidental,
            letter,
            octave,
        };
        let rhythm = self.rhythm();
        let tie = self.eat(TokenKind::Tie);
        Some(Note {
            id: self.next_id(),
            pitch,
            rhythm,
            tie,
        })
    }

    /// `z`/`x` rest, or a `Z`/`X` multi-measure rest.
    fn rest(&mut self, token: &Token) -> Element {
        self.position += 1;
        let rest = token.clone();
        let rhythm = self.rhythm();
        let id = self.next_id();
        let expr = if matches!(rest.text.as_str(), "Z" | "X") {
            Expr::MultiMeasureRest(MultiMeasureRest { id, rest, rhythm })
        } else {
            Expr::Rest(Rest { id, rest, rhythm })
        };
        Element::Expr(expr)
    }

    /// Report a bracketed construct that reached the end of its line.
    fn unclosed(&mut self, opener: &Token, what: &str) {
        self.diagnostics
            .report(DiagnosticKind::Parse, opener, format!("unclosed {}", what));
    }

    fn chord(&mut self, opener: &Token) -> Chord {
        let left_bracket = opener.clone();
        self.position += 1;
        let mut contents = Vec::new();
        while let Some(token) = self.current() {
            let element = match token.kind {
                TokenKind::ChordRightBracket | TokenKind::Barline => break,
                kind if ends_music_line(kind) => break,
                TokenKind::Whitespace => self.raw(token),
                TokenKind::Annotation => {
                    self.wrap(token, |id, token| Expr::Annotation(Annotation { id, token }))
                }
                TokenKind::Decoration => {
                    self.wrap(token, |id, token| Expr::Decoration(Decoration { id, token }))
                }
                TokenKind::Symbol => self.wrap(token, |id, token| Expr::Symbol(Symbol { id, token })),
                TokenKind::Accidental | TokenKind::NoteLetter => match self.note() {
                    Some(note) => Element::Expr(Expr::Note(note)),
                    None => self.error(token, "accidental without a note"),
                },
                _ => self.error(token, "unexpected token in chord"),
            };
            contents.push(element);
        }
        let right_bracket = self.eat(TokenKind::ChordRightBracket);
        let (rhythm, tie) = if right_bracket.is_some() {
            (self.rhythm(), self.eat(TokenKind::Tie))
        } else {
            self.unclosed(&left_bracket, "chord");
            (None, None)
        };
        Chord {
            id: self.next_id(),
            left_bracket,
            contents,
            right_bracket,
            rhythm,
            tie,
        }
    }

    fn grace_group(&mut self, opener: &Token) -> GraceGroup {
        let left_brace = opener.clone();
        self.position += 1;
        let slash = self.eat(TokenKind::GraceSlash);
        let mut notes = Vec::new();
        while let Some(token) = self.current() {
            let element = match token.kind {
                TokenKind::GraceRightBrace | TokenKind::Barline => break,
                kind if ends_music_line(kind) => break,
                TokenKind::Whitespace => self.raw(token),
                TokenKind::Accidental | TokenKind::NoteLetter => match self.note() {
                    Some(note) => Element::Expr(Expr::Note(note)),
                    None => self.error(token, "accidental without a note"),
                },
                _ => self.error(token, "unexpected token in grace group"),
            };
            notes.push(element);
        }
        let right_brace = self.eat(TokenKind::GraceRightBrace);
        if right_brace.is_none() {
            self.unclosed(&left_brace, "grace group");
        }
        if !notes.iter().any(|n| matches!(n, Element::Expr(Expr::Note(_)))) {
            self.diagnostics
                .report(DiagnosticKind::Parse, &left_brace, "grace group has no notes");
        }
        GraceGroup {
            id: self.next_id(),
            left_brace,
            slash,
            notes,
            right_brace,
        }
    }

    fn tuplet(&mut self) -> Option<Tuplet> {
        let start = self.position;
        let left_paren = self.eat(TokenKind::TupletLParen)?;
        let Some(p) = self.eat(TokenKind::TupletP) else {
            self.position = start;
            return None;
        };
        let q_colon = self.eat(TokenKind::TupletColon);
        let (q, r_colon, r) = if q_colon.is_some() {
            let q = self.eat(TokenKind::TupletQ);
            let r_colon = self.eat(TokenKind::TupletColon);
            let r = r_colon.as_ref().and_then(|_| self.eat(TokenKind::TupletR));
            (q, r_colon, r)
        } else {
            (None, None, None)
        };
        Some(Tuplet {
            id: self.next_id(),
            left_paren,
            p,
            q_colon,
            q,
            r_colon,
            r,
        })
    }

    fn bar_line(&mut self) -> BarLine {
        let mut bars = Vec::new();
        while let Some(bar) = self.eat(TokenKind::Barline) {
            bars.push(bar);
        }
        let mut repeat_numbers = Vec::new();
        while let Some(token) = self.current() {
            if !matches!(
                token.kind,
                TokenKind::RepeatNumber | TokenKind::RepeatComma | TokenKind::RepeatDash | TokenKind::RepeatX
            ) {
                break;
            }
            repeat_numbers.push(token.clone());
            self.position += 1;
        }
        BarLine {
            id: self.next_id(),
            bars,
            repeat_numbers,
        }
    }

    fn inline_field(&mut self) -> Option<InlineField> {
        let left_bracket = self.current()?.clone();
        let header = self.tokens.get(self.position + 1)?;
        if !header.kind.is_line_header() {
            return None;
        }
        let header = header.clone();
        self.position += 2;
        let mut content = Vec::new();
        while let Some(token) = self.current() {
            if token.kind == TokenKind::InlineFieldRightBracket || ends_music_line(token.kind) {
                break;
            }
            content.push(token.clone());
            self.position += 1;
        }
        let right_bracket = self.eat(TokenKind::InlineFieldRightBracket);
        if right_bracket.is_none() {
            self.unclosed(&left_bracket, "inline field");
        }
        Some(InlineField {
            id: self.next_id(),
            left_bracket,
            header,
            content,
            right_bracket,
        })
    }
}

fn ends_music_line(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Eol
            | TokenKind::Comment
            | TokenKind::SectionBreak
            | TokenKind::StylesheetDirective
            | TokenKind::FreeText
    ) || kind.is_line_header()
}

fn is_beamable(element: &Element) -> bool {
    match element {
        Element::Expr(expr) => matches!(
            expr,
            Expr::Note(_)
                | Expr::Chord(_)
                | Expr::GraceGroup(_)
                | Expr::Decoration(_)
                | Expr::Annotation(_)
                | Expr::Symbol(_)
                | Expr::Tuplet(_)
        ),
        Element::Token(token) => token.kind == TokenKind::Slur,
    }
}

/// Wrap each maximal run of beamable elements holding at least two notes or
/// chords in a `Beam`.
fn group_beams(elements: Vec<Element>, ids: &mut IdGen) -> Vec<Element> {
    let mut out = Vec::with_capacity(elements.len());
    let mut run = Vec::new();
    for element in elements {
        if is_beamable(&element) {
            run.push(element);
            continue;
        }
        flush_beam(&mut out, &mut run, ids);
        out.push(element);
    }
    flush_beam(&mut out, &mut run, ids);
    out
}

fn flush_beam(out: &mut Vec<Element>, run: &mut Vec<Element>, ids: &mut IdGen) {
    let notes = run
        .iter()
        .filter(|e| matches!(e, Element::Expr(Expr::Note(_) | Expr::Chord(_))))
        .count();
    if notes >= 2 {
        out.push(Element::Expr(Expr::Beam(Beam {
            id: ids.next_id(),
            contents: mem::take(run),
        })));
    } else {
        out.append(run);
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::config::ParseOptions;
    use crate::diagnostics::{DiagnosticKind, Diagnostics};
    use crate::lexer::{scan, TokenKind};
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    fn body_with(source: &str, options: &ParseOptions) -> (Vec<Element>, Diagnostics) {
        let mut ids = IdGen::new();
        let mut diagnostics = Diagnostics::new();
        let tokens = scan(&format!("X:1\nK:C\n{}", source), &mut ids, &mut diagnostics);
        let file = parse(&tokens, &mut ids, &mut diagnostics, options);
        let elements = file.tunes[0].systems().concat();
        (elements, diagnostics)
    }

    /// Body elements without beam grouping.
    fn body(source: &str) -> (Vec<Element>, Diagnostics) {
        let options = ParseOptions {
            group_beams: false,
            ..ParseOptions::default()
        };
        body_with(source, &options)
    }

    fn exprs(elements: &[Element]) -> Vec<&Expr> {
        elements.iter().filter_map(Element::as_expr).collect()
    }

    #[test]
    fn test_note_with_accidental_and_length() {
        let (elements, diagnostics) = body("^A2");
        let Some(Element::Expr(Expr::Note(note))) = elements.first() else {
            panic!("expected a note, got {:?}", elements);
        };
        assert_eq!(note.pitch.accidental.as_ref().unwrap().text, "^");
        assert_eq!(note.pitch.letter.text, "A");
        let rhythm = note.rhythm.as_ref().unwrap();
        assert_eq!(rhythm.numerator.as_ref().unwrap().text, "2");
        assert_eq!(rhythm.fraction(), (2, 1));
        assert!(note.tie.is_none());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_chord_shape() {
        let (elements, _) = body("[CEG]");
        let Some(Element::Expr(Expr::Chord(chord))) = elements.first() else {
            panic!("expected a chord, got {:?}", elements);
        };
        assert_eq!(chord.contents.len(), 3);
        let notes: Vec<&Note> = chord.notes().collect();
        assert_eq!(notes.len(), 3);
        for note in notes {
            assert!(note.pitch.accidental.is_none());
            assert!(note.rhythm.is_none());
            assert!(note.tie.is_none());
        }
        assert_eq!(chord.left_bracket.text, "[");
        assert_eq!(chord.right_bracket.as_ref().unwrap().text, "]");
    }

    #[test]
    fn test_chord_rhythm_and_tie() {
        let (elements, _) = body("[CE]3/2-");
        let Some(Element::Expr(Expr::Chord(chord))) = elements.first() else {
            panic!("expected a chord");
        };
        assert_eq!(chord.rhythm.as_ref().unwrap().fraction(), (3, 2));
        assert!(chord.tie.is_some());
    }

    #[test]
    fn test_unclosed_chord_is_reported() {
        let (elements, diagnostics) = body("[CE\n");
        assert!(matches!(elements[0], Element::Expr(Expr::Chord(_))));
        assert_eq!(diagnostics.len(), 1);
        let first = diagnostics.iter().next().unwrap();
        assert_eq!(first.kind, DiagnosticKind::Parse);
        assert_eq!(first.message, "unclosed chord");
    }

    #[test]
    fn test_bar_line_with_endings() {
        let (elements, _) = body("|1,3-5,7 A");
        let Some(Element::Expr(Expr::BarLine(bar))) = elements.first() else {
            panic!("expected a bar line");
        };
        assert_eq!(bar.bars.len(), 1);
        assert_eq!(bar.endings(), vec![1, 3, 4, 5, 7]);
    }

    #[test]
    fn test_tuplet_ratio() {
        let (elements, _) = body("(3:2:3abc");
        let Some(Element::Expr(Expr::Tuplet(tuplet))) = elements.first() else {
            panic!("expected a tuplet");
        };
        assert_eq!(tuplet.ratio(), (3, Some(2), Some(3)));
        let (elements, _) = body("(5abcde");
        let Some(Element::Expr(Expr::Tuplet(tuplet))) = elements.first() else {
            panic!("expected a tuplet");
        };
        assert_eq!(tuplet.ratio(), (5, None, None));
    }

    #[test]
    fn test_grace_group() {
        let (elements, _) = body("{/gf}e");
        let Some(Element::Expr(Expr::GraceGroup(grace))) = elements.first() else {
            panic!("expected a grace group");
        };
        assert!(grace.is_acciaccatura());
        assert_eq!(grace.notes.len(), 2);
    }

    #[test]
    fn test_empty_grace_group_is_reported() {
        let (elements, diagnostics) = body("{}A");
        assert!(matches!(elements[0], Element::Expr(Expr::GraceGroup(_))));
        assert_eq!(diagnostics.len(), 1);
        let first = diagnostics.iter().next().unwrap();
        assert_eq!(first.kind, DiagnosticKind::Parse);
        assert_eq!(first.message, "grace group has no notes");
        assert_eq!(first.context, "{");
    }

    #[test]
    fn test_bar_line_ends_unclosed_grace_group() {
        let (elements, diagnostics) = body("{ab | cd|");
        let exprs = exprs(&elements);
        let Expr::GraceGroup(grace) = exprs[0] else {
            panic!("expected a grace group");
        };
        assert!(grace.right_brace.is_none());
        assert_eq!(exprs.iter().filter(|e| matches!(e, Expr::BarLine(_))).count(), 2);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics.iter().next().unwrap().message, "unclosed grace group");
    }

    #[test]
    fn test_bar_line_ends_unclosed_chord() {
        let (elements, diagnostics) = body("[CE|D");
        let exprs = exprs(&elements);
        let Expr::Chord(chord) = exprs[0] else {
            panic!("expected a chord");
        };
        assert_eq!(chord.notes().count(), 2);
        assert!(matches!(exprs[1], Expr::BarLine(_)));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics.iter().next().unwrap().message, "unclosed chord");
    }

    #[test]
    fn test_rests() {
        let (elements, _) = body("z2 Z4");
        let exprs = exprs(&elements);
        assert!(matches!(exprs[0], Expr::Rest(_)));
        let Expr::MultiMeasureRest(rest) = exprs[1] else {
            panic!("expected a multi-measure rest");
        };
        assert_eq!(rest.measures(), 4);
    }

    #[test]
    fn test_inline_field() {
        let (elements, _) = body("C[K:Am]D");
        let Expr::InlineField(field) = exprs(&elements)[1] else {
            panic!("expected an inline field");
        };
        assert_eq!(field.letter(), Some('K'));
        assert_eq!(field.value(), "Am");
        let (elements, _) = body("[V:tenor]C");
        assert_eq!(elements[0].voice_id(), Some("tenor"));
    }

    #[test]
    fn test_invalid_token_is_not_reported_twice() {
        let (elements, diagnostics) = body("A # B");
        assert!(exprs(&elements).iter().any(|e| matches!(e, Expr::Error(_))));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics.iter().next().unwrap().kind, DiagnosticKind::Lex);
    }

    #[test]
    fn test_single_token_constructs() {
        let (elements, _) = body("\"Am\"!f!.A y2 & \\\n$");
        let exprs = exprs(&elements);
        assert!(matches!(exprs[0], Expr::Annotation(_)));
        assert!(matches!(exprs[1], Expr::Symbol(_)));
        assert!(matches!(exprs[2], Expr::Decoration(_)));
        assert!(matches!(exprs[3], Expr::Note(_)));
        assert!(matches!(exprs[4], Expr::YSpacer(_)));
        assert!(matches!(exprs[5], Expr::VoiceOverlay(_)));
        assert!(matches!(exprs[6], Expr::LineContinuation(_)));
        assert!(matches!(exprs[7], Expr::SystemBreak(_)));
    }

    #[test]
    fn test_beams_group_adjacent_notes() {
        let (elements, _) = body_with("ABc d [CE]F z GA|", &ParseOptions::default());
        let beams: Vec<&Beam> = exprs(&elements)
            .into_iter()
            .filter_map(|e| match e {
                Expr::Beam(beam) => Some(beam),
                _ => None,
            })
            .collect();
        assert_eq!(beams.len(), 3);
        assert_eq!(beams[0].contents.len(), 3);
        assert_eq!(beams[1].text(), "[CE]F");
        assert_eq!(beams[2].text(), "GA");
        // `d` stands alone.
        assert!(exprs(&elements).iter().any(|e| matches!(e, Expr::Note(_))));
    }

    #[test]
    fn test_beam_keeps_slurs_and_decorations() {
        let (elements, _) = body_with("(~AB)", &ParseOptions::default());
        let Some(Element::Expr(Expr::Beam(beam))) = elements.first() else {
            panic!("expected a beam, got {:?}", elements);
        };
        assert_eq!(beam.text(), "(~AB)");
        assert!(beam.contents[0].is_token(TokenKind::Slur));
    }
}
