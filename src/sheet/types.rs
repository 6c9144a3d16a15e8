//! Document model produced by the parser.

use std::fmt::{self, Write as _};

use serde::de::{MapAccess, Visitor};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::chord::format_chord;

/// Default ABC note length when the front matter has no `L` key.
pub const DEFAULT_NOTE_LENGTH: &str = "1/16";

/// A parsed lesheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub front_matter: FrontMatter,
    pub sections: Vec<Section>,
}

impl Song {
    /// ABC default note length: front matter `L`, or `1/16`.
    pub fn default_length(&self) -> &str {
        match self.front_matter.get("L") {
            Some(length) if !length.is_empty() => length,
            _ => DEFAULT_NOTE_LENGTH,
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.front_matter.get("title")
    }

    /// All bars in document order.
    pub fn bars(&self) -> impl Iterator<Item = &Bar> {
        self.sections
            .iter()
            .flat_map(|section| section.lines.iter())
            .flat_map(|line| line.bars.iter())
    }

    pub fn bar_count(&self) -> usize {
        self.bars().count()
    }

    /// Serialize with two-space indentation.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Human readable outline used by `html --print`.
    pub fn outline(&self) -> String {
        let mut out = String::from("Frontmatter:\n");
        for (key, value) in self.front_matter.iter() {
            let _ = writeln!(out, "{key}: {value}");
        }
        for section in &self.sections {
            let _ = writeln!(out, "Section: {}", section.name);
            for line in &section.lines {
                if line.is_multiline() {
                    let _ = writeln!(
                        out,
                        "  MultilineBacktick: {}",
                        line.multiline_backtick.value.trim_end()
                    );
                    continue;
                }
                for bar in &line.bars {
                    let _ = write!(
                        out,
                        "  Bar {} ({:?}) '{}':",
                        bar.number(),
                        bar.kind,
                        bar.bar_note
                    );
                    for chord in &bar.chords {
                        let _ = match &chord.annotation {
                            Some(annotation) => {
                                write!(out, " {}!{}!", chord.value, annotation.value)
                            }
                            None => write!(out, " {}", chord.value),
                        };
                    }
                    out.push('\n');
                }
            }
        }
        out
    }
}

/// `key: value` pairs from the `---` block, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter(Vec<(String, String)>);

impl FrontMatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value.as_str())
    }

    /// Set `key`, replacing an existing value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.0.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.0.push((key, value));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for FrontMatter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FrontMatter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FrontMatterVisitor;

        impl<'de> Visitor<'de> for FrontMatterVisitor {
            type Value = FrontMatter;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of front matter strings")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut front_matter = FrontMatter::new();
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    front_matter.insert(key, value);
                }
                Ok(front_matter)
            }
        }

        deserializer.deserialize_map(FrontMatterVisitor)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub lines: Vec<Line>,
    #[serde(rename = "break")]
    pub page_break: bool,
}

impl Section {
    pub fn named(name: impl Into<String>, page_break: bool) -> Self {
        Self {
            name: name.into(),
            lines: Vec::new(),
            page_break,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.name.is_empty()
    }
}

/// One source line: a row of bars, or a single multiline ABC block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub bars: Vec<Bar>,
    pub multiline_backtick: MultilineBacktick,
}

impl Line {
    pub fn is_multiline(&self) -> bool {
        !self.multiline_backtick.value.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarKind {
    #[default]
    Normal,
    Double,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    pub chords: Vec<Chord>,
    pub backtick: Backtick,
    #[serde(rename = "type")]
    pub kind: BarKind,
    pub repeat_start: bool,
    pub repeat_end: bool,
    pub double_bar_end: bool,
    pub bar_note: String,
    pub id: usize,
}

impl Bar {
    /// One-based bar number shown to the reader.
    pub const fn number(&self) -> usize {
        self.id + 1
    }

    pub fn is_empty(&self) -> bool {
        let no_chords = match self.chords.as_slice() {
            [] => true,
            [only] => only.value.is_empty(),
            _ => false,
        };
        no_chords && self.backtick.value.is_empty() && self.bar_note.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Chord {
    pub value: String,
    pub annotation: Option<Annotation>,
}

impl Chord {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            annotation: None,
        }
    }

    #[must_use]
    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(Annotation {
            value: annotation.into(),
        });
        self
    }

    /// HTML form of the chord symbol.
    pub fn pretty(&self) -> String {
        format_chord(&self.value)
    }
}

impl Serialize for Chord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Chord", 3)?;
        state.serialize_field("value", &self.value)?;
        state.serialize_field("annotation", &self.annotation)?;
        state.serialize_field("pretty", &self.pretty())?;
        state.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub value: String,
}

/// Inline ABC snippet inside a bar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backtick {
    pub id: usize,
    pub value: String,
    pub default_length: String,
}

/// Full-width ABC block on its own line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultilineBacktick {
    pub id: usize,
    pub value: String,
    pub default_length: String,
    pub source_file: String,
}
