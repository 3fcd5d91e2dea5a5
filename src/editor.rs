//! Single-line input editor

/// Edit operation applied to the input line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    Insert(char),
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
    Clear,
}

/// Text buffer with a cursor counted in chars
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Editor {
    text: String,
    cursor: usize,
}

impl Editor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Byte offset of the char at `idx` (or the end)
    fn byte_at(&self, idx: usize) -> usize {
        self.text
            .char_indices()
            .nth(idx)
            .map_or(self.text.len(), |(byte, _)| byte)
    }

    pub fn apply(&mut self, op: EditOp) {
        match op {
            EditOp::Insert(c) => {
                if c == '\n' || c == '\r' {
                    return;
                }
                let at = self.byte_at(self.cursor);
                self.text.insert(at, c);
                self.cursor += 1;
            }
            EditOp::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let at = self.byte_at(self.cursor);
                    self.text.remove(at);
                }
            }
            EditOp::Delete => {
                if self.cursor < self.char_count() {
                    let at = self.byte_at(self.cursor);
                    self.text.remove(at);
                }
            }
            EditOp::Left => self.cursor = self.cursor.saturating_sub(1),
            EditOp::Right => self.cursor = (self.cursor + 1).min(self.char_count()),
            EditOp::Home => self.cursor = 0,
            EditOp::End => self.cursor = self.char_count(),
            EditOp::Clear => {
                self.text.clear();
                self.cursor = 0;
            }
        }
    }

    /// Take the trimmed text and reset the buffer
    pub fn take(&mut self) -> String {
        let text = self.text.trim().to_string();
        self.apply(EditOp::Clear);
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(s: &str) -> Editor {
        let mut e = Editor::new();
        for c in s.chars() {
            e.apply(EditOp::Insert(c));
        }
        e
    }

    #[test]
    fn test_insert_and_cursor_moves() {
        let mut e = typed("helo");
        e.apply(EditOp::Left);
        e.apply(EditOp::Insert('l'));
        assert_eq!(e.text(), "hello");
        assert_eq!(e.cursor(), 4);
        e.apply(EditOp::End);
        e.apply(EditOp::Right);
        assert_eq!(e.cursor(), 5);
    }

    #[test]
    fn test_multibyte_editing() {
        let mut e = typed("Amélie");
        e.apply(EditOp::Home);
        e.apply(EditOp::Right);
        e.apply(EditOp::Right);
        e.apply(EditOp::Delete);
        assert_eq!(e.text(), "Amlie");
        e.apply(EditOp::Backspace);
        assert_eq!(e.text(), "Alie");
        assert_eq!(e.cursor(), 1);
    }

    #[test]
    fn test_backspace_at_start_and_newlines() {
        let mut e = typed("a\nb");
        assert_eq!(e.text(), "ab");
        e.apply(EditOp::Home);
        e.apply(EditOp::Backspace);
        assert_eq!(e.text(), "ab");
    }

    #[test]
    fn test_take_trims_and_clears() {
        let mut e = typed("  dark thriller  ");
        assert_eq!(e.take(), "dark thriller");
        assert!(e.is_blank());
        assert_eq!(e.cursor(), 0);
    }
}
