use ropey::Rope;
use unicode_width::UnicodeWidthStr;

/// Cursor position in the sheet buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub line: usize,
    /// Byte offset within the line.
    pub col: usize,
    /// Column restored when moving vertically through shorter lines.
    col_memory: usize,
}

impl Cursor {
    pub const fn new() -> Self {
        Self::at(0, 0)
    }

    pub const fn at(line: usize, col: usize) -> Self {
        Self {
            line,
            col,
            col_memory: col,
        }
    }

    const fn set_col(&mut self, col: usize) {
        self.col = col;
        self.col_memory = col;
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Rope-backed sheet text with a cursor.
///
/// Every content change bumps [`EditorBuffer::revision`], which the event
/// loop compares against the last value it saw to queue a render. `dirty`
/// is separate and tracks unsaved changes relative to the file on disk.
pub struct EditorBuffer {
    rope: Rope,
    cursor: Cursor,
    dirty: bool,
    revision: u64,
}

impl EditorBuffer {
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            cursor: Cursor::new(),
            dirty: false,
            revision: 0,
        }
    }

    pub fn empty() -> Self {
        Self::from_text("")
    }

    pub const fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub const fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Increases on every content change.
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Line content without its line ending.
    pub fn line_at(&self, line_idx: usize) -> Option<String> {
        if line_idx >= self.rope.len_lines() {
            return None;
        }
        let line = self.rope.line(line_idx).to_string();
        Some(line.trim_end_matches(['\n', '\r']).to_string())
    }

    pub fn line_len(&self, line_idx: usize) -> usize {
        self.line_at(line_idx).map_or(0, |s| s.len())
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Terminal column of the cursor, accounting for wide characters.
    pub fn cursor_display_col(&self) -> usize {
        let line = self.line_at(self.cursor.line).unwrap_or_default();
        line[..self.cursor.col.min(line.len())].width()
    }

    /// Replace the whole text, e.g. after opening a file. Keeps the cursor
    /// where it was when that position still exists.
    pub fn replace_text(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
        let Cursor { line, col, .. } = self.cursor;
        self.move_to(line, col);
        self.touch();
    }

    pub fn insert_char(&mut self, ch: char) {
        let char_idx = self.cursor_char_idx();
        self.rope.insert_char(char_idx, ch);
        if ch == '\n' {
            self.cursor.line += 1;
            self.cursor.set_col(0);
        } else {
            self.cursor.set_col(self.cursor.col + ch.len_utf8());
        }
        self.touch();
    }

    /// Insert text at the cursor and move past it.
    pub fn insert_str(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        let char_idx = self.cursor_char_idx();
        self.rope.insert(char_idx, s);
        match s.rsplit_once('\n') {
            Some((_, tail)) => {
                self.cursor.line += s.matches('\n').count();
                self.cursor.set_col(tail.len());
            }
            None => self.cursor.set_col(self.cursor.col + s.len()),
        }
        self.touch();
    }

    pub fn split_line(&mut self) {
        self.insert_char('\n');
    }

    /// Backspace. Returns `true` if anything was removed.
    pub fn delete_back(&mut self) -> bool {
        if self.cursor.col == 0 && self.cursor.line == 0 {
            return false;
        }
        let char_idx = self.cursor_char_idx();
        if self.cursor.col == 0 {
            let prev_len = self.line_len(self.cursor.line - 1);
            let newline_chars = self.line_ending_chars(self.cursor.line - 1);
            self.rope.remove(char_idx - newline_chars..char_idx);
            self.cursor.line -= 1;
            self.cursor.set_col(prev_len);
        } else {
            let prev_len = self.prev_char_len();
            self.rope.remove(char_idx - 1..char_idx);
            self.cursor.set_col(self.cursor.col - prev_len);
        }
        self.touch();
        true
    }

    /// Delete key. Returns `true` if anything was removed.
    pub fn delete_forward(&mut self) -> bool {
        let at_line_end = self.cursor.col >= self.line_len(self.cursor.line);
        if at_line_end && self.cursor.line + 1 >= self.line_count() {
            return false;
        }
        let char_idx = self.cursor_char_idx();
        let count = if at_line_end {
            self.line_ending_chars(self.cursor.line)
        } else {
            1
        };
        self.rope.remove(char_idx..char_idx + count);
        self.touch();
        true
    }

    /// Vim `x`: delete the character under the cursor, never the line break.
    pub fn delete_under_cursor(&mut self) -> bool {
        if self.cursor.col >= self.line_len(self.cursor.line) {
            return false;
        }
        self.delete_forward();
        let len = self.line_len(self.cursor.line);
        if self.cursor.col > len {
            self.cursor.set_col(len);
        }
        true
    }

    /// Vim `dd`: remove the cursor line.
    pub fn delete_line(&mut self) {
        let line = self.cursor.line;
        let start = self.rope.line_to_char(line);
        let end = if line + 1 < self.line_count() {
            self.rope.line_to_char(line + 1)
        } else {
            self.rope.len_chars()
        };
        // The last line has no trailing break to take; take the preceding one.
        let start = if end == self.rope.len_chars() && line > 0 {
            start - self.line_ending_chars(line - 1)
        } else {
            start
        };
        if start == end {
            return;
        }
        self.rope.remove(start..end);
        let line = line.min(self.line_count().saturating_sub(1));
        self.cursor = Cursor::at(line, 0);
        self.touch();
    }

    /// Vim `o`: new empty line below, cursor on it.
    pub fn open_line_below(&mut self) {
        self.move_end();
        self.insert_char('\n');
    }

    /// Vim `O`: new empty line above, cursor on it.
    pub fn open_line_above(&mut self) {
        self.move_home();
        self.insert_char('\n');
        self.cursor.line -= 1;
        self.cursor.set_col(0);
    }

    pub fn move_cursor(&mut self, direction: Direction) {
        match direction {
            Direction::Left => self.move_left(),
            Direction::Right => self.move_right(),
            Direction::Up => self.move_vertical(-1),
            Direction::Down => self.move_vertical(1),
        }
    }

    pub const fn move_home(&mut self) {
        self.cursor.set_col(0);
    }

    pub fn move_end(&mut self) {
        let len = self.line_len(self.cursor.line);
        self.cursor.set_col(len);
    }

    /// Vim `^`: first non-blank character of the line.
    pub fn move_first_non_blank(&mut self) {
        let line = self.line_at(self.cursor.line).unwrap_or_default();
        let indent = line.len() - line.trim_start().len();
        self.cursor.set_col(indent);
    }

    /// Previous chord or word boundary. Bar lines count as separators.
    pub fn move_word_left(&mut self) {
        if self.cursor.col == 0 {
            if self.cursor.line > 0 {
                self.cursor.line -= 1;
                self.move_end();
            }
            return;
        }
        let line = self.line_at(self.cursor.line).unwrap_or_default();
        let before = line[..self.cursor.col].trim_end_matches(is_separator);
        let start = before.rfind(is_separator).map_or(0, |i| i + 1);
        self.cursor.set_col(start);
    }

    /// Next chord or word boundary.
    pub fn move_word_right(&mut self) {
        let line = self.line_at(self.cursor.line).unwrap_or_default();
        if self.cursor.col >= line.len() {
            if self.cursor.line + 1 < self.line_count() {
                self.cursor.line += 1;
                self.cursor.set_col(0);
            }
            return;
        }
        let after = &line[self.cursor.col..];
        let word_end = after.find(is_separator).unwrap_or(after.len());
        let rest = &after[word_end..];
        let gap = rest.find(|c: char| !is_separator(c)).unwrap_or(rest.len());
        self.cursor.set_col(self.cursor.col + word_end + gap);
    }

    /// Move to a line and byte column, clamped into the buffer.
    pub fn move_to(&mut self, line: usize, col: usize) {
        self.cursor.line = line.min(self.line_count().saturating_sub(1));
        let text = self.line_at(self.cursor.line).unwrap_or_default();
        let mut col = col.min(text.len());
        while !text.is_char_boundary(col) {
            col -= 1;
        }
        self.cursor.set_col(col);
    }

    /// Move to a line and terminal column, e.g. from a mouse click.
    pub fn move_to_display(&mut self, line: usize, display_col: usize) {
        let line = line.min(self.line_count().saturating_sub(1));
        let text = self.line_at(line).unwrap_or_default();
        let mut width = 0;
        let mut col = text.len();
        for (idx, ch) in text.char_indices() {
            if width >= display_col {
                col = idx;
                break;
            }
            width += unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        }
        self.move_to(line, col);
    }

    pub const fn move_to_start(&mut self) {
        self.cursor = Cursor::new();
    }

    pub fn move_to_end(&mut self) {
        self.cursor.line = self.line_count().saturating_sub(1);
        self.move_end();
    }

    const fn touch(&mut self) {
        self.dirty = true;
        self.revision += 1;
    }

    fn cursor_char_idx(&self) -> usize {
        let line_start = self.rope.line_to_char(self.cursor.line);
        let line = self.line_at(self.cursor.line).unwrap_or_default();
        line_start + line[..self.cursor.col.min(line.len())].chars().count()
    }

    /// Chars in the line break ending `line_idx` (`\r\n` is two).
    fn line_ending_chars(&self, line_idx: usize) -> usize {
        let line = self.rope.line(line_idx);
        let len = line.len_chars();
        let last = len.checked_sub(1).map(|i| line.char(i));
        let before_last = len.checked_sub(2).map(|i| line.char(i));
        match (before_last, last) {
            (Some('\r'), Some('\n')) => 2,
            (_, Some('\n' | '\r')) => 1,
            _ => 0,
        }
    }

    fn prev_char_len(&self) -> usize {
        let line = self.line_at(self.cursor.line).unwrap_or_default();
        line[..self.cursor.col]
            .chars()
            .next_back()
            .map_or(1, char::len_utf8)
    }

    fn move_left(&mut self) {
        if self.cursor.col > 0 {
            let len = self.prev_char_len();
            self.cursor.set_col(self.cursor.col - len);
        } else if self.cursor.line > 0 {
            self.cursor.line -= 1;
            self.move_end();
        }
    }

    fn move_right(&mut self) {
        let line = self.line_at(self.cursor.line).unwrap_or_default();
        if let Some(ch) = line[self.cursor.col.min(line.len())..].chars().next() {
            self.cursor.set_col(self.cursor.col + ch.len_utf8());
        } else if self.cursor.line + 1 < self.line_count() {
            self.cursor.line += 1;
            self.cursor.set_col(0);
        }
    }

    fn move_vertical(&mut self, delta: isize) {
        let Some(target) = self.cursor.line.checked_add_signed(delta) else {
            return;
        };
        if target >= self.line_count() {
            return;
        }
        self.cursor.line = target;
        let text = self.line_at(target).unwrap_or_default();
        let mut col = self.cursor.col_memory.min(text.len());
        while !text.is_char_boundary(col) {
            col -= 1;
        }
        self.cursor.col = col;
    }
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == '|'
}

impl std::fmt::Debug for EditorBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorBuffer")
            .field("lines", &self.rope.len_lines())
            .field("cursor", &self.cursor)
            .field("dirty", &self.dirty)
            .field("revision", &self.revision)
            .finish()
    }
}

impl Default for EditorBuffer {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_buffer_has_one_line() {
        let buf = EditorBuffer::empty();
        assert_eq!(buf.line_count(), 1);
        assert_eq!(buf.line_at(0), Some(String::new()));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_lines_strip_endings() {
        let buf = EditorBuffer::from_text("A | B\r\nC\n");
        assert_eq!(buf.line_count(), 3);
        assert_eq!(buf.line_at(0), Some("A | B".to_string()));
        assert_eq!(buf.line_at(1), Some("C".to_string()));
        assert_eq!(buf.line_at(3), None);
    }

    #[test]
    fn test_revision_counts_changes_only() {
        let mut buf = EditorBuffer::from_text("A");
        assert_eq!(buf.revision(), 0);
        buf.move_end();
        buf.move_cursor(Direction::Left);
        assert_eq!(buf.revision(), 0);
        buf.insert_char('m');
        buf.insert_str("");
        assert_eq!(buf.revision(), 1);
        assert!(buf.delete_back());
        assert_eq!(buf.revision(), 2);
    }

    #[test]
    fn test_mark_clean_keeps_revision() {
        let mut buf = EditorBuffer::from_text("A");
        buf.insert_char('7');
        buf.mark_clean();
        assert!(!buf.is_dirty());
        assert_eq!(buf.revision(), 1);
    }

    #[test]
    fn test_insert_char_moves_cursor() {
        let mut buf = EditorBuffer::from_text("Cmaj");
        buf.move_end();
        buf.insert_char('7');
        assert_eq!(buf.text(), "Cmaj7");
        assert_eq!(buf.cursor(), Cursor::at(0, 5));
    }

    #[test]
    fn test_insert_multibyte() {
        let mut buf = EditorBuffer::from_text("B");
        buf.move_end();
        buf.insert_char('♭');
        assert_eq!(buf.line_at(0), Some("B♭".to_string()));
        assert_eq!(buf.cursor().col, 4);
        assert_eq!(buf.cursor_display_col(), 2);
    }

    #[test]
    fn test_insert_multiline_snippet() {
        let mut buf = EditorBuffer::from_text("A");
        buf.insert_str("---\ntitle: T\n---\n");
        assert_eq!(buf.text(), "---\ntitle: T\n---\nA");
        assert_eq!(buf.cursor(), Cursor::at(3, 0));
    }

    #[test]
    fn test_insert_snippet_mid_line() {
        let mut buf = EditorBuffer::from_text("A B");
        buf.move_to(0, 2);
        buf.insert_str("!push!");
        assert_eq!(buf.text(), "A !push!B");
        assert_eq!(buf.cursor(), Cursor::at(0, 8));
    }

    #[test]
    fn test_split_line() {
        let mut buf = EditorBuffer::from_text("A | B");
        buf.move_to(0, 3);
        buf.split_line();
        assert_eq!(buf.line_at(0), Some("A |".to_string()));
        assert_eq!(buf.line_at(1), Some(" B".to_string()));
        assert_eq!(buf.cursor(), Cursor::at(1, 0));
    }

    #[test]
    fn test_delete_back_joins_lines() {
        let mut buf = EditorBuffer::from_text("A\nB");
        buf.move_to(1, 0);
        assert!(buf.delete_back());
        assert_eq!(buf.text(), "AB");
        assert_eq!(buf.cursor(), Cursor::at(0, 1));
    }

    #[test]
    fn test_delete_back_joins_crlf_lines() {
        let mut buf = EditorBuffer::from_text("A\r\nB");
        buf.move_to(1, 0);
        buf.delete_back();
        assert_eq!(buf.text(), "AB");
    }

    #[test]
    fn test_delete_back_at_origin_is_noop() {
        let mut buf = EditorBuffer::from_text("A");
        assert!(!buf.delete_back());
        assert_eq!(buf.revision(), 0);
    }

    #[test]
    fn test_delete_back_multibyte() {
        let mut buf = EditorBuffer::from_text("F♯");
        buf.move_end();
        buf.delete_back();
        assert_eq!(buf.text(), "F");
        assert_eq!(buf.cursor().col, 1);
    }

    #[test]
    fn test_delete_forward() {
        let mut buf = EditorBuffer::from_text("Ab\nC");
        buf.move_to(0, 1);
        buf.delete_forward();
        assert_eq!(buf.text(), "A\nC");
        buf.delete_forward();
        assert_eq!(buf.text(), "AC");
        buf.move_to_end();
        assert!(!buf.delete_forward());
    }

    #[test]
    fn test_delete_under_cursor_keeps_line_break() {
        let mut buf = EditorBuffer::from_text("AB\nC");
        buf.move_to(0, 1);
        assert!(buf.delete_under_cursor());
        assert_eq!(buf.text(), "A\nC");
        assert_eq!(buf.cursor().col, 1);
        assert!(!buf.delete_under_cursor());
        assert_eq!(buf.text(), "A\nC");
    }

    #[test]
    fn test_delete_line() {
        let mut buf = EditorBuffer::from_text("one\ntwo\nthree");
        buf.move_to(1, 2);
        buf.delete_line();
        assert_eq!(buf.text(), "one\nthree");
        assert_eq!(buf.cursor(), Cursor::at(1, 0));

        buf.delete_line();
        assert_eq!(buf.text(), "one");
        assert_eq!(buf.cursor(), Cursor::at(0, 0));

        buf.delete_line();
        assert_eq!(buf.text(), "");
    }

    #[test]
    fn test_open_lines() {
        let mut buf = EditorBuffer::from_text("A\nB");
        buf.open_line_below();
        assert_eq!(buf.text(), "A\n\nB");
        assert_eq!(buf.cursor(), Cursor::at(1, 0));

        buf.move_to(2, 1);
        buf.open_line_above();
        assert_eq!(buf.text(), "A\n\n\nB");
        assert_eq!(buf.cursor(), Cursor::at(2, 0));
    }

    #[test]
    fn test_vertical_movement_remembers_column() {
        let mut buf = EditorBuffer::from_text("Cmaj7 | D\nE\nFmin7 | G");
        buf.move_to(0, 6);
        buf.move_cursor(Direction::Down);
        assert_eq!(buf.cursor().col, 1);
        buf.move_cursor(Direction::Down);
        assert_eq!(buf.cursor(), Cursor::at(2, 6));
        buf.move_cursor(Direction::Down);
        assert_eq!(buf.cursor().line, 2);
    }

    #[test]
    fn test_vertical_movement_respects_char_boundaries() {
        let mut buf = EditorBuffer::from_text("abcd\nB♭");
        buf.move_to(0, 2);
        buf.move_cursor(Direction::Down);
        assert_eq!(buf.cursor().col, 1);
    }

    #[test]
    fn test_horizontal_movement_wraps() {
        let mut buf = EditorBuffer::from_text("A\nB");
        buf.move_end();
        buf.move_cursor(Direction::Right);
        assert_eq!(buf.cursor(), Cursor::at(1, 0));
        buf.move_cursor(Direction::Left);
        assert_eq!(buf.cursor(), Cursor::at(0, 1));
    }

    #[test]
    fn test_word_motion_treats_bars_as_separators() {
        let mut buf = EditorBuffer::from_text("Cmaj7 | Dm7 G7");
        buf.move_word_right();
        assert_eq!(buf.cursor().col, 8);
        buf.move_word_right();
        assert_eq!(buf.cursor().col, 12);
        buf.move_word_left();
        assert_eq!(buf.cursor().col, 8);
        buf.move_word_left();
        assert_eq!(buf.cursor().col, 0);
    }

    #[test]
    fn test_first_non_blank() {
        let mut buf = EditorBuffer::from_text("   A | B");
        buf.move_end();
        buf.move_first_non_blank();
        assert_eq!(buf.cursor().col, 3);
    }

    #[test]
    fn test_move_to_clamps() {
        let mut buf = EditorBuffer::from_text("A♭");
        buf.move_to(10, 2);
        assert_eq!(buf.cursor(), Cursor::at(0, 1));
        buf.move_to(0, 100);
        assert_eq!(buf.cursor().col, 4);
    }

    #[test]
    fn test_move_to_display_column() {
        let mut buf = EditorBuffer::from_text("B♭ | C");
        buf.move_to_display(0, 2);
        assert_eq!(buf.cursor().col, 4);
        buf.move_to_display(0, 50);
        assert_eq!(buf.cursor().col, buf.line_len(0));
    }

    #[test]
    fn test_replace_text_clamps_cursor_and_bumps_revision() {
        let mut buf = EditorBuffer::from_text("A | B\nC | D");
        buf.move_to(1, 4);
        buf.replace_text("E");
        assert_eq!(buf.text(), "E");
        assert_eq!(buf.cursor(), Cursor::at(0, 1));
        assert_eq!(buf.revision(), 1);
        assert!(buf.is_dirty());
    }

    #[test]
    fn test_start_and_end() {
        let mut buf = EditorBuffer::from_text("A\nBb");
        buf.move_to_end();
        assert_eq!(buf.cursor(), Cursor::at(1, 2));
        buf.move_to_start();
        assert_eq!(buf.cursor(), Cursor::at(0, 0));
    }
}
