//! Commit screen state: a small char-level message editor plus preset
//! quick-select.

#[derive(Clone, Debug)]
pub struct CommitState {
    pub message: String,
    /// Cursor as a char index into `message`.
    pub cursor: usize,
    pub scroll_y: u16,
    pub status: Option<String>,
    pub presets: Vec<String>,
}

impl CommitState {
    pub fn new(presets: Vec<String>) -> Self {
        Self {
            message: String::new(),
            cursor: 0,
            scroll_y: 0,
            status: None,
            presets,
        }
    }

    pub fn reset(&mut self) {
        self.message.clear();
        self.cursor = 0;
        self.scroll_y = 0;
        self.status = None;
    }

    /// Replace the message with preset `idx` (0-based), cursor at the end.
    pub fn apply_preset(&mut self, idx: usize) -> bool {
        let Some(preset) = self.presets.get(idx) else {
            return false;
        };
        self.message = preset.clone();
        self.cursor = self.message.chars().count();
        true
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.message.chars().count() {
            self.cursor += 1;
        }
    }

    pub fn move_home(&mut self) {
        let (_, col) = self.line_col();
        self.cursor -= col;
    }

    pub fn move_end(&mut self) {
        let (line, _) = self.line_col();
        let line_len = self
            .message
            .split('\n')
            .nth(line)
            .map(|l| l.chars().count())
            .unwrap_or(0);
        let line_start = self.line_start_index(line);
        self.cursor = line_start + line_len;
    }

    pub fn insert_char(&mut self, ch: char) {
        let byte = char_to_byte(&self.message, self.cursor);
        self.message.insert(byte, ch);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let b0 = char_to_byte(&self.message, self.cursor - 1);
        let b1 = char_to_byte(&self.message, self.cursor);
        self.message.replace_range(b0..b1, "");
        self.cursor -= 1;
    }

    pub fn delete(&mut self) {
        if self.cursor >= self.message.chars().count() {
            return;
        }
        let b0 = char_to_byte(&self.message, self.cursor);
        let b1 = char_to_byte(&self.message, self.cursor + 1);
        self.message.replace_range(b0..b1, "");
    }

    /// (line, column) of the cursor, both 0-based char counts.
    pub fn line_col(&self) -> (usize, usize) {
        let mut line = 0;
        let mut col = 0;
        for (i, ch) in self.message.chars().enumerate() {
            if i >= self.cursor {
                break;
            }
            if ch == '\n' {
                line += 1;
                col = 0;
            } else {
                col += 1;
            }
        }
        (line, col)
    }

    fn line_start_index(&self, target_line: usize) -> usize {
        let mut idx = 0;
        let mut line = 0;
        for ch in self.message.chars() {
            if line == target_line {
                return idx;
            }
            idx += 1;
            if ch == '\n' {
                line += 1;
            }
        }
        idx
    }

    pub fn ensure_cursor_visible(&mut self, view_height: usize) {
        if view_height == 0 {
            return;
        }
        let (line, _) = self.line_col();
        let top = self.scroll_y as usize;
        if line < top {
            self.scroll_y = line as u16;
        } else if line >= top + view_height {
            self.scroll_y = (line + 1 - view_height) as u16;
        }
    }

    pub fn can_commit(&self) -> bool {
        !self.message.trim().is_empty()
    }
}

fn char_to_byte(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_backspace_multibyte() {
        let mut c = CommitState::new(Vec::new());
        c.insert_char('é');
        c.insert_char('x');
        assert_eq!(c.message, "éx");
        c.move_left();
        c.backspace();
        assert_eq!(c.message, "x");
        assert_eq!(c.cursor, 0);
    }

    #[test]
    fn home_and_end_respect_lines() {
        let mut c = CommitState::new(Vec::new());
        for ch in "ab\ncd".chars() {
            c.insert_char(ch);
        }
        // Cursor is at end of second line; home goes to its start.
        c.move_home();
        assert_eq!(c.cursor, 3);
        c.move_end();
        assert_eq!(c.cursor, 5);
    }

    #[test]
    fn preset_replaces_message() {
        let mut c = CommitState::new(vec!["chore: sync".to_string(), "wip".to_string()]);
        assert!(c.apply_preset(1));
        assert_eq!(c.message, "wip");
        assert_eq!(c.cursor, 3);
        assert!(!c.apply_preset(5));
    }

    #[test]
    fn blank_message_cannot_commit() {
        let mut c = CommitState::new(Vec::new());
        assert!(!c.can_commit());
        c.insert_char(' ');
        assert!(!c.can_commit());
        c.insert_char('x');
        assert!(c.can_commit());
    }

    #[test]
    fn scroll_follows_cursor() {
        let mut c = CommitState::new(Vec::new());
        for _ in 0..10 {
            c.insert_char('a');
            c.insert_char('\n');
        }
        c.ensure_cursor_visible(4);
        assert_eq!(c.scroll_y, 7);
        c.cursor = 0;
        c.ensure_cursor_visible(4);
        assert_eq!(c.scroll_y, 0);
    }
}
