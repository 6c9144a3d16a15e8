//! Builds a [`Song`] from the token stream.

use thiserror::Error;

use super::lexer::{LexError, Lexer, Token, TokenKind};
use super::types::{
    Annotation, Backtick, Bar, BarKind, Chord, FrontMatter, Line, MultilineBacktick, Section, Song,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("invalid front matter line {line:?}: expected `key: value`")]
    FrontMatter { line: String },
}

/// Parse lesheet source that has no file name.
///
/// # Errors
/// Returns a [`ParseError`] for malformed source.
pub fn parse(source: &str) -> Result<Song, ParseError> {
    parse_named(source, "")
}

/// Parse lesheet source; `source_file` is recorded on multiline ABC blocks.
///
/// # Errors
/// Returns a [`ParseError`] for malformed source.
pub fn parse_named(source: &str, source_file: &str) -> Result<Song, ParseError> {
    let _scope = crate::perf::scope("sheet.parse");
    let mut lexer = Lexer::new(source);
    let mut builder = SongBuilder::new(source_file);
    loop {
        let token = lexer.next_token()?;
        match token.kind {
            TokenKind::Eof => break,
            TokenKind::Annotation => {
                let next = lexer.lookahead()?;
                builder.annotation(token.value, next.kind == TokenKind::Chord);
            }
            _ => builder.push(token)?,
        }
    }
    Ok(builder.finish())
}

/// Parse the body between `---` fences.
///
/// # Errors
/// Returns [`ParseError::FrontMatter`] for a non-blank line without `:`.
pub fn parse_front_matter(body: &str) -> Result<FrontMatter, ParseError> {
    let mut front_matter = FrontMatter::new();
    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some((key, value)) = line.split_once(':') else {
            return Err(ParseError::FrontMatter {
                line: line.to_string(),
            });
        };
        front_matter.insert(key.trim(), value.trim());
    }
    Ok(front_matter)
}

struct SongBuilder<'a> {
    song: Song,
    section: Section,
    bars: Vec<Bar>,
    bar: Option<Bar>,
    pending_annotation: Option<String>,
    pending_repeat_start: bool,
    next_bar_id: usize,
    next_backtick_id: usize,
    source_file: &'a str,
}

impl<'a> SongBuilder<'a> {
    fn new(source_file: &'a str) -> Self {
        Self {
            song: Song::default(),
            section: Section::default(),
            bars: Vec::new(),
            bar: None,
            pending_annotation: None,
            pending_repeat_start: false,
            next_bar_id: 0,
            next_backtick_id: 0,
            source_file,
        }
    }

    fn push(&mut self, token: Token<'_>) -> Result<(), ParseError> {
        match token.kind {
            TokenKind::FrontMatter => {
                for (key, value) in parse_front_matter(token.value)?.iter() {
                    self.song.front_matter.insert(key, value);
                }
            }
            TokenKind::Header | TokenKind::HeaderBreak => {
                self.close_line();
                let finished = std::mem::replace(
                    &mut self.section,
                    Section::named(token.value, token.kind == TokenKind::HeaderBreak),
                );
                self.song.sections.push(finished);
            }
            TokenKind::Chord => {
                let annotation = self
                    .pending_annotation
                    .take()
                    .map(|value| Annotation { value });
                self.open_bar().chords.push(Chord {
                    value: token.value.to_string(),
                    annotation,
                });
            }
            TokenKind::BarNote => {
                token.value.clone_into(&mut self.open_bar().bar_note);
            }
            TokenKind::Backtick => {
                let backtick = Backtick {
                    id: self.take_backtick_id(),
                    value: token.value.to_string(),
                    default_length: self.song.default_length().to_string(),
                };
                self.open_bar().backtick = backtick;
            }
            TokenKind::BacktickMultiline => {
                self.close_line();
                let multiline = MultilineBacktick {
                    id: self.take_backtick_id(),
                    value: token.value.to_string(),
                    default_length: self.song.default_length().to_string(),
                    source_file: self.source_file.to_string(),
                };
                self.section.lines.push(Line {
                    bars: Vec::new(),
                    multiline_backtick: multiline,
                });
            }
            TokenKind::Bar => match token.value {
                "||" => self.close_bar(|bar| {
                    bar.double_bar_end = true;
                    bar.kind = BarKind::Double;
                }),
                ":||" => self.close_bar(|bar| bar.repeat_end = true),
                "||:" => {
                    self.close_bar(|_| {});
                    self.pending_repeat_start = true;
                }
                _ => self.close_bar(|_| {}),
            },
            TokenKind::Return => self.close_line(),
            // Handled by the caller, which needs lookahead.
            TokenKind::Annotation | TokenKind::Eof => {}
        }
        Ok(())
    }

    /// An annotation with no chord after it lands on an empty chord.
    fn annotation(&mut self, value: &str, chord_follows: bool) {
        self.flush_annotation();
        if chord_follows {
            self.pending_annotation = Some(value.to_string());
        } else {
            self.open_bar()
                .chords
                .push(Chord::new("").with_annotation(value));
        }
    }

    fn flush_annotation(&mut self) {
        if let Some(value) = self.pending_annotation.take() {
            self.open_bar()
                .chords
                .push(Chord::new("").with_annotation(value));
        }
    }

    fn open_bar(&mut self) -> &mut Bar {
        let repeat_start = &mut self.pending_repeat_start;
        self.bar.get_or_insert_with(|| Bar {
            repeat_start: std::mem::take(repeat_start),
            ..Bar::default()
        })
    }

    fn take_backtick_id(&mut self) -> usize {
        let id = self.next_backtick_id;
        self.next_backtick_id += 1;
        id
    }

    fn close_bar(&mut self, mark: impl FnOnce(&mut Bar)) {
        self.flush_annotation();
        let Some(mut bar) = self.bar.take() else {
            return;
        };
        mark(&mut bar);
        bar.id = self.next_bar_id;
        self.next_bar_id += 1;
        self.bars.push(bar);
    }

    fn close_line(&mut self) {
        self.close_bar(|_| {});
        if !self.bars.is_empty() {
            self.section.lines.push(Line {
                bars: std::mem::take(&mut self.bars),
                multiline_backtick: MultilineBacktick::default(),
            });
        }
    }

    fn finish(mut self) -> Song {
        self.close_line();
        self.song.sections.push(self.section);
        self.song
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars(song: &Song, section: usize, line: usize) -> &[Bar] {
        &song.sections[section].lines[line].bars
    }

    #[test]
    fn test_header_starts_new_section_after_implicit_one() {
        let song = parse("# a section").unwrap();
        assert!(song.sections[0].is_empty());
        assert_eq!(song.sections[1].name, "a section");
    }

    #[test]
    fn test_section_with_only_a_name_is_not_empty() {
        let song = parse("\n#verse\n").unwrap();
        assert!(song.sections[0].is_empty());
        assert_eq!(song.sections[1].name, "verse");
        assert!(!song.sections[1].is_empty());
    }

    #[test]
    fn test_chords_in_implicit_section() {
        let song = parse("Amaj7 C | B").unwrap();
        let row = bars(&song, 0, 0);
        assert_eq!(row[0].chords[0].value, "Amaj7");
        assert_eq!(row[0].chords[1].value, "C");
        assert_eq!(row[1].chords[0].value, "B");
    }

    #[test]
    fn test_chords_before_and_after_header() {
        let song = parse("A | B |\n# verse\nD").unwrap();
        assert_eq!(bars(&song, 0, 0)[1].chords[0].value, "B");
        assert_eq!(song.sections[1].name, "verse");
        assert_eq!(bars(&song, 1, 0)[0].chords[0].value, "D");
    }

    #[test]
    fn test_break_header_sets_break() {
        let song = parse("#- Bridge\nA").unwrap();
        assert!(song.sections[1].page_break);
        assert_eq!(song.sections[1].name, "Bridge");
    }

    #[test]
    fn test_repeat_markers() {
        let song = parse("||: A :|| B |").unwrap();
        let row = bars(&song, 0, 0);
        assert_eq!(row.len(), 2);
        assert!(row[0].repeat_start);
        assert!(row[0].repeat_end);
        assert_eq!(row[0].chords[0].value, "A");
        assert!(!row[1].repeat_start);
        assert!(!row[1].repeat_end);
    }

    #[test]
    fn test_double_bar_sets_kind() {
        let song = parse("A || B").unwrap();
        let row = bars(&song, 0, 0);
        assert!(row[0].double_bar_end);
        assert_eq!(row[0].kind, BarKind::Double);
        assert_eq!(row[1].kind, BarKind::Normal);
    }

    #[test]
    fn test_empty_bars_are_ignored() {
        let song = parse("| A | | B |").unwrap();
        assert_eq!(bars(&song, 0, 0).len(), 2);
    }

    #[test]
    fn test_bar_ids_run_across_lines_and_sections() {
        let song = parse("A | B\n# two\nC | D").unwrap();
        let ids: Vec<usize> = song.bars().map(|bar| bar.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert_eq!(song.bar_count(), 4);
    }

    #[test]
    fn test_front_matter_fills_pairs() {
        let song = parse("\n---\ntitle: something\nanotherthing: here\n---\nA|B|\n").unwrap();
        assert_eq!(song.front_matter.get("title"), Some("something"));
        assert_eq!(song.front_matter.get("anotherthing"), Some("here"));
        assert_eq!(bars(&song, 0, 0).len(), 2);
    }

    #[test]
    fn test_front_matter_value_keeps_inner_colon() {
        let fm = parse_front_matter("time: 3:45\n\n").unwrap();
        assert_eq!(fm.get("time"), Some("3:45"));
    }

    #[test]
    fn test_front_matter_line_without_colon_is_error() {
        let err = parse("---\njust words\n---\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::FrontMatter {
                line: "just words".into()
            }
        );
    }

    #[test]
    fn test_newline_closes_bar_and_line() {
        let song = parse("A\nB").unwrap();
        assert_eq!(bars(&song, 0, 1)[0].chords[0].value, "B");
    }

    #[test]
    fn test_blank_lines_are_not_recorded() {
        let song = parse("A\n\n\nB\n").unwrap();
        assert_eq!(song.sections[0].lines.len(), 2);
    }

    #[test]
    fn test_bar_note_on_first_and_second_bar() {
        let song = parse("\"some comment\" A|B|").unwrap();
        assert_eq!(bars(&song, 0, 0)[0].bar_note, "some comment");

        let song = parse("A|\"second bar\" B|").unwrap();
        assert_eq!(bars(&song, 0, 0)[1].bar_note, "second bar");
    }

    #[test]
    fn test_annotation_attaches_to_next_chord() {
        let song = parse("!push!D E").unwrap();
        let row = bars(&song, 0, 0);
        assert_eq!(
            row[0].chords[0].annotation,
            Some(Annotation {
                value: "push".into()
            })
        );
        assert_eq!(row[0].chords[1].annotation, None);
    }

    #[test]
    fn test_annotation_without_chord_uses_empty_chord() {
        let song = parse("A | !fermata! |").unwrap();
        let row = bars(&song, 0, 0);
        assert_eq!(row.len(), 2);
        assert_eq!(row[1].chords[0].value, "");
        assert_eq!(
            row[1].chords[0].annotation.as_ref().map(|a| a.value.as_str()),
            Some("fermata")
        );
    }

    #[test]
    fn test_backticks_get_default_length() {
        let song = parse("---\nL: 1/8\n---\nA `cde` | B").unwrap();
        let bar = &bars(&song, 0, 0)[0];
        assert_eq!(bar.backtick.value, "cde");
        assert_eq!(bar.backtick.default_length, "1/8");
    }

    #[test]
    fn test_multiline_backtick_is_own_line() {
        let song = parse_named("A | B\n```\nX:1\nK:C\nCDEF|\n```\nC", "song.lesheet").unwrap();
        let lines = &song.sections[0].lines;
        assert_eq!(lines.len(), 3);
        assert!(lines[1].bars.is_empty());
        assert_eq!(lines[1].multiline_backtick.value, "X:1\nK:C\nCDEF|\n");
        assert_eq!(lines[1].multiline_backtick.source_file, "song.lesheet");
        assert_eq!(lines[1].multiline_backtick.default_length, "1/16");
        assert_eq!(lines[2].bars[0].chords[0].value, "C");
    }

    #[test]
    fn test_end_of_input_flushes_open_bar() {
        let song = parse("A | B").unwrap();
        assert_eq!(bars(&song, 0, 0).len(), 2);
    }

    #[test]
    fn test_form_feed_between_chords_parses() {
        let song = parse("A \x0c B").unwrap();
        let chords: Vec<&str> = bars(&song, 0, 0)[0]
            .chords
            .iter()
            .map(|c| c.value.as_str())
            .collect();
        assert_eq!(chords, vec!["A", "B"]);
    }

    #[test]
    fn test_lex_error_propagates() {
        assert!(matches!(parse("A `open"), Err(ParseError::Lex(_))));
    }
}
