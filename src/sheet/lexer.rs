//! Tokenizer for lesheet source.

use std::fmt;

use thiserror::Error;

/// Characters of source shown on either side of an error position.
const SURROUNDING_CONTEXT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    FrontMatter,
    Header,
    HeaderBreak,
    Bar,
    Return,
    BarNote,
    Annotation,
    Backtick,
    BacktickMultiline,
    Chord,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FrontMatter => "FrontMatter",
            Self::Header => "Header",
            Self::HeaderBreak => "HeaderBreak",
            Self::Bar => "Bar",
            Self::Return => "Return",
            Self::BarNote => "BarNote",
            Self::Annotation => "Annotation",
            Self::Backtick => "BacktickExpression",
            Self::BacktickMultiline => "BacktickMultilineExpression",
            Self::Chord => "Chord",
            Self::Eof => "EOF",
        };
        f.write_str(name)
    }
}

/// A token borrowing its text from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub value: &'a str,
}

impl<'a> Token<'a> {
    pub const fn new(kind: TokenKind, value: &'a str) -> Self {
        Self { kind, value }
    }

    const fn eof() -> Self {
        Self::new(TokenKind::Eof, "")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    Unexpected { want: String, got: String },
    FrontMatter { want: String, got: String },
}

/// A tokenizing failure with its location.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}\n{context}", describe(.kind))]
pub struct LexError {
    pub kind: LexErrorKind,
    /// Byte offset into the source.
    pub pos: usize,
    /// Zero-based line.
    pub line: usize,
    /// Source excerpt with a caret under `pos`.
    pub context: String,
}

fn describe(kind: &LexErrorKind) -> String {
    match kind {
        LexErrorKind::Unexpected { want, got } => {
            format!("unexpected string. Want: {want} Got: {got}")
        }
        LexErrorKind::FrontMatter { want, got } => {
            format!("invalid front matter. Want: {want} Got: {got}")
        }
    }
}

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub const fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            line: 0,
        }
    }

    pub const fn position(&self) -> usize {
        self.pos
    }

    pub const fn line(&self) -> usize {
        self.line
    }

    /// Consume every token up to and including `Eof`.
    ///
    /// # Errors
    /// Returns the first [`LexError`] encountered.
    pub fn tokenize(mut self) -> Result<Vec<Token<'a>>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    /// Peek at the next token without consuming it.
    ///
    /// # Errors
    /// Returns the error the next token would produce.
    pub fn lookahead(&mut self) -> Result<Token<'a>, LexError> {
        let (pos, line) = (self.pos, self.line);
        let token = self.next_token();
        self.pos = pos;
        self.line = line;
        token
    }

    /// Consume and return the next token.
    ///
    /// # Errors
    /// Returns a [`LexError`] for unterminated notes, backticks and front
    /// matter, and for a `:` that does not start `:||`.
    pub fn next_token(&mut self) -> Result<Token<'a>, LexError> {
        loop {
            self.skip_inline_space();
            let Some(ch) = self.peek() else {
                return Ok(Token::eof());
            };
            let rest = self.rest();

            if self.at_line_start() && rest.starts_with("---") {
                return self.front_matter();
            }
            if rest.starts_with("//") {
                self.skip_comment();
                continue;
            }
            return match ch {
                b'\n' => Ok(self.newlines()),
                b':' => self.repeat_end(),
                b'|' => Ok(self.bar()),
                b'!' => Ok(self.annotation()),
                b'"' => self.bar_note(),
                b'`' if rest.starts_with("```") => self.multiline_backtick(),
                b'`' => self.backtick(),
                b'#' if self.at_line_start() => Ok(self.header()),
                _ => Ok(self.chord()),
            };
        }
    }

    /// Source excerpt around the current position with a caret marker.
    pub fn surrounding(&self) -> String {
        let mut start = self.pos.saturating_sub(SURROUNDING_CONTEXT);
        while !self.input.is_char_boundary(start) {
            start -= 1;
        }
        let mut end = (self.pos + SURROUNDING_CONTEXT).min(self.input.len());
        while !self.input.is_char_boundary(end) {
            end += 1;
        }

        let mut snippet = String::new();
        let mut caret = 0;
        for (offset, ch) in self.input[start..end].char_indices() {
            let width = if ch == '\n' {
                snippet.push_str("\\n");
                2
            } else {
                snippet.push(ch);
                1
            };
            if start + offset < self.pos {
                caret += width;
            }
        }
        format!(
            "at pos {} line {} near:\n{snippet}\n{}^",
            self.pos,
            self.line + 1,
            " ".repeat(caret)
        )
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn at_line_start(&self) -> bool {
        self.input[..self.pos]
            .bytes()
            .rev()
            .find(|b| *b != b' ' && *b != b'\t')
            .is_none_or(|b| b == b'\n')
    }

    fn advance(&mut self, n: usize) {
        let end = (self.pos + n).min(self.input.len());
        self.line += self.input[self.pos..end].matches('\n').count();
        self.pos = end;
    }

    /// Advance while `pred` holds and return the consumed slice.
    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        let len = self.rest().bytes().take_while(|b| pred(*b)).count();
        self.advance(len);
        &self.input[start..self.pos]
    }

    fn skip_inline_space(&mut self) {
        self.take_while(|b| b != b'\n' && b.is_ascii_whitespace());
    }

    fn skip_comment(&mut self) {
        let whole_line = self.at_line_start();
        self.take_while(|b| b != b'\n');
        if whole_line && self.peek() == Some(b'\n') {
            self.advance(1);
        }
    }

    fn error(&self, want: &str) -> LexError {
        self.error_kind(LexErrorKind::Unexpected {
            want: want.to_string(),
            got: self.got(),
        })
    }

    fn error_kind(&self, kind: LexErrorKind) -> LexError {
        LexError {
            kind,
            pos: self.pos,
            line: self.line,
            context: self.surrounding(),
        }
    }

    fn got(&self) -> String {
        self.rest()
            .chars()
            .next()
            .map_or_else(|| "EOF".to_string(), |ch| ch.to_string())
    }

    fn newlines(&mut self) -> Token<'a> {
        let value = self.take_while(|b| b.is_ascii_whitespace());
        Token::new(TokenKind::Return, value)
    }

    fn repeat_end(&mut self) -> Result<Token<'a>, LexError> {
        if !self.rest().starts_with(":||") {
            self.advance(1);
            return Err(self.error(":||"));
        }
        let value = &self.rest()[..3];
        self.advance(3);
        Ok(Token::new(TokenKind::Bar, value))
    }

    fn bar(&mut self) -> Token<'a> {
        let rest = self.rest();
        let len = if rest.starts_with("||:") {
            3
        } else if rest.starts_with("||") {
            2
        } else {
            1
        };
        self.advance(len);
        Token::new(TokenKind::Bar, &rest[..len])
    }

    fn annotation(&mut self) -> Token<'a> {
        self.advance(1);
        let value = self.take_while(|b| b != b'!' && !b.is_ascii_whitespace());
        if self.peek() == Some(b'!') {
            self.advance(1);
        }
        Token::new(TokenKind::Annotation, value)
    }

    fn bar_note(&mut self) -> Result<Token<'a>, LexError> {
        self.advance(1);
        let value = self.take_while(|b| b != b'"');
        if self.peek() != Some(b'"') {
            return Err(self.error("\""));
        }
        self.advance(1);
        Ok(Token::new(TokenKind::BarNote, value))
    }

    fn backtick(&mut self) -> Result<Token<'a>, LexError> {
        self.advance(1);
        let value = self.take_while(|b| b != b'`');
        if self.peek() != Some(b'`') {
            return Err(self.error("`"));
        }
        self.advance(1);
        Ok(Token::new(TokenKind::Backtick, value))
    }

    fn multiline_backtick(&mut self) -> Result<Token<'a>, LexError> {
        self.advance(3);
        self.take_while(|b| b.is_ascii_whitespace());
        let value = self.take_while(|b| b != b'`');
        if !self.rest().starts_with("```") {
            return Err(self.error("Closing ```"));
        }
        self.advance(3);
        Ok(Token::new(TokenKind::BacktickMultiline, value))
    }

    fn header(&mut self) -> Token<'a> {
        self.take_while(|b| b == b'#');
        let kind = if self.peek() == Some(b'-') {
            self.advance(1);
            TokenKind::HeaderBreak
        } else {
            TokenKind::Header
        };
        let value = self.take_while(|b| b != b'\n').trim();
        if self.peek() == Some(b'\n') {
            self.advance(1);
        }
        Token::new(kind, value)
    }

    fn front_matter(&mut self) -> Result<Token<'a>, LexError> {
        let fence = self.take_while(|b| b == b'-');
        if fence.len() != 3 {
            return Err(self.error_kind(LexErrorKind::FrontMatter {
                want: "Opening ---".to_string(),
                got: fence.to_string(),
            }));
        }
        let Some(close) = self.rest().find("\n---") else {
            self.advance(self.rest().len());
            return Err(self.error_kind(LexErrorKind::FrontMatter {
                want: "Closing ---".to_string(),
                got: "EOF".to_string(),
            }));
        };
        let body = &self.rest()[..=close];
        self.advance(close + 1);
        let fence = self.take_while(|b| b == b'-');
        if fence.len() != 3 {
            return Err(self.error_kind(LexErrorKind::FrontMatter {
                want: "Closing ---".to_string(),
                got: fence.to_string(),
            }));
        }
        Ok(Token::new(TokenKind::FrontMatter, body))
    }

    fn chord(&mut self) -> Token<'a> {
        let value = self.take_while(|b| b != b'|' && !b.is_ascii_whitespace());
        Token::new(TokenKind::Chord, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<(TokenKind, &str)> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.value))
            .collect()
    }

    #[test]
    fn test_chords_bars_and_returns() {
        let tokens = kinds("Cmaj7 | !annotation!D Caug\nC\nE | F");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Chord, "Cmaj7"),
                (TokenKind::Bar, "|"),
                (TokenKind::Annotation, "annotation"),
                (TokenKind::Chord, "D"),
                (TokenKind::Chord, "Caug"),
                (TokenKind::Return, "\n"),
                (TokenKind::Chord, "C"),
                (TokenKind::Return, "\n"),
                (TokenKind::Chord, "E"),
                (TokenKind::Bar, "|"),
                (TokenKind::Chord, "F"),
                (TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn test_bar_token_variants() {
        let tokens = kinds("||: A :|| B || C |");
        let bars: Vec<&str> = tokens
            .iter()
            .filter(|(kind, _)| *kind == TokenKind::Bar)
            .map(|(_, value)| *value)
            .collect();
        assert_eq!(bars, vec!["||:", ":||", "||", "|"]);
    }

    #[test]
    fn test_chord_stops_at_bar_without_space() {
        let tokens = kinds("A|B");
        assert_eq!(tokens[0], (TokenKind::Chord, "A"));
        assert_eq!(tokens[1], (TokenKind::Bar, "|"));
        assert_eq!(tokens[2], (TokenKind::Chord, "B"));
    }

    #[test]
    fn test_form_feed_separates_chords() {
        let tokens = kinds("A \x0c B\x0c|");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Chord, "A"),
                (TokenKind::Chord, "B"),
                (TokenKind::Bar, "|"),
                (TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn test_inline_backtick() {
        let tokens = kinds("`backtick`");
        assert_eq!(tokens[0], (TokenKind::Backtick, "backtick"));
    }

    #[test]
    fn test_unclosed_backtick_is_error() {
        let err = Lexer::new("`backtick").tokenize().unwrap_err();
        assert_eq!(
            err.kind,
            LexErrorKind::Unexpected {
                want: "`".into(),
                got: "EOF".into()
            }
        );
    }

    #[test]
    fn test_multiline_backtick() {
        let tokens = kinds("```\nmy\nbacktick\n```");
        assert_eq!(tokens[0], (TokenKind::BacktickMultiline, "my\nbacktick\n"));
    }

    #[test]
    fn test_unclosed_multiline_backtick_is_error() {
        let err = Lexer::new("```backtick``").tokenize().unwrap_err();
        match err.kind {
            LexErrorKind::Unexpected { want, .. } => assert_eq!(want, "Closing ```"),
            other @ LexErrorKind::FrontMatter { .. } => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_annotations_before_chords() {
        let tokens = kinds("!annotation!Cmaj7 !second!D");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Annotation, "annotation"),
                (TokenKind::Chord, "Cmaj7"),
                (TokenKind::Annotation, "second"),
                (TokenKind::Chord, "D"),
                (TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn test_bar_note() {
        let tokens = kinds("\"fill\" A");
        assert_eq!(tokens[0], (TokenKind::BarNote, "fill"));
        assert_eq!(tokens[1], (TokenKind::Chord, "A"));
    }

    #[test]
    fn test_unclosed_bar_note_is_error() {
        assert!(Lexer::new("\"fill A").tokenize().is_err());
    }

    #[test]
    fn test_lone_colon_is_error() {
        let err = Lexer::new("A : B").tokenize().unwrap_err();
        assert_eq!(err.line, 0);
        assert!(err.to_string().contains("Want: :||"));
    }

    #[test]
    fn test_headers_and_breaks() {
        let tokens = kinds("# Verse one\nA\n#- Chorus\nB");
        assert_eq!(tokens[0], (TokenKind::Header, "Verse one"));
        assert_eq!(tokens[1], (TokenKind::Chord, "A"));
        assert_eq!(tokens[3], (TokenKind::HeaderBreak, "Chorus"));
    }

    #[test]
    fn test_hash_inside_line_is_chord_text() {
        let tokens = kinds("A #4");
        assert_eq!(tokens[1], (TokenKind::Chord, "#4"));
    }

    #[test]
    fn test_front_matter_body() {
        let tokens = kinds("---\ntitle: Hey-Jude\nkey: F\n---\nA");
        assert_eq!(
            tokens[0],
            (TokenKind::FrontMatter, "\ntitle: Hey-Jude\nkey: F\n")
        );
        assert_eq!(tokens[1].0, TokenKind::Return);
        assert_eq!(tokens[2], (TokenKind::Chord, "A"));
    }

    #[test]
    fn test_front_matter_wrong_fence_is_error() {
        let err = Lexer::new("----\nkey: C\n---\n").tokenize().unwrap_err();
        assert!(matches!(err.kind, LexErrorKind::FrontMatter { .. }));
    }

    #[test]
    fn test_front_matter_without_closing_is_error() {
        let err = Lexer::new("---\nkey: C\n").tokenize().unwrap_err();
        assert_eq!(
            err.kind,
            LexErrorKind::FrontMatter {
                want: "Closing ---".into(),
                got: "EOF".into()
            }
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        let tokens = kinds("// intro\nA | B // trailing\nC");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Chord, "A"),
                (TokenKind::Bar, "|"),
                (TokenKind::Chord, "B"),
                (TokenKind::Return, "\n"),
                (TokenKind::Chord, "C"),
                (TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn test_lookahead_does_not_consume() {
        let mut lexer = Lexer::new("A | B");
        let peeked = lexer.lookahead().unwrap();
        let next = lexer.next_token().unwrap();
        assert_eq!(peeked, next);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Bar);
    }

    #[test]
    fn test_error_context_marks_position() {
        let err = Lexer::new("A | B\nC : D").tokenize().unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.context.contains("A | B\\nC : D"));
        assert!(err.context.ends_with('^'));
        let caret_line = err.context.lines().last().unwrap();
        assert_eq!(caret_line.len() - 1, "A | B\\nC :".len());
    }
}
