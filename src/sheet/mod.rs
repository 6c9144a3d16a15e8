//! Lesheet notation: lexer, parser, document model and printer.
//!
//! A lesheet is a plain-text chord chart:
//!
//! ```text
//! ---
//! title: Blue Bossa
//! key: Cm
//! ---
//! # A
//! ||: Cm7 | Fm7 | !push!Dm7b5 G7 | Cm7 :||
//! ```

pub mod chord;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod types;

pub use chord::{ChordMarkup, format_chord, format_chord_plain};
pub use lexer::{LexError, Lexer, Token, TokenKind};
pub use parser::{ParseError, parse, parse_named};
pub use printer::print_song;
pub use types::{
    Annotation, Backtick, Bar, BarKind, Chord, FrontMatter, Line, MultilineBacktick, Section, Song,
};
