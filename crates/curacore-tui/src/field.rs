//! Single-line text editing with a character cursor

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn insert_char(text: &mut String, cursor: &mut usize, c: char) {
    let byte_pos = char_to_byte_index(text, *cursor);
    text.insert(byte_pos, c);
    *cursor += 1;
}

pub fn backspace(text: &mut String, cursor: &mut usize) {
    if *cursor > 0 {
        *cursor -= 1;
        let byte_pos = char_to_byte_index(text, *cursor);
        text.remove(byte_pos);
    }
}

pub fn delete(text: &mut String, cursor: usize) {
    if cursor < text.chars().count() {
        let byte_pos = char_to_byte_index(text, cursor);
        text.remove(byte_pos);
    }
}

pub fn move_left(cursor: &mut usize) {
    *cursor = cursor.saturating_sub(1);
}

pub fn move_right(text: &str, cursor: &mut usize) {
    *cursor = (*cursor + 1).min(text.chars().count());
}

pub fn end(text: &str) -> usize {
    text.chars().count()
}

/// Visible window of `text` for an input box `width` columns wide, keeping the cursor in view.
/// Returns the visible slice and the cursor column inside it.
pub fn visible_window(text: &str, cursor: usize, width: usize) -> (String, usize) {
    let scroll_offset = if width == 0 {
        0
    } else if cursor >= width {
        cursor - width + 1
    } else {
        0
    };

    let visible: String = text.chars().skip(scroll_offset).take(width).collect();
    (visible, cursor - scroll_offset)
}

/// A form field owning its text and cursor
#[derive(Debug, Clone, Default)]
pub struct TextField {
    pub value: String,
    pub cursor: usize,
}

impl TextField {
    pub fn with_value(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = end(&value);
        Self { value, cursor }
    }

    pub fn insert(&mut self, c: char) {
        insert_char(&mut self.value, &mut self.cursor, c);
    }

    pub fn backspace(&mut self) {
        backspace(&mut self.value, &mut self.cursor);
    }

    pub fn delete(&mut self) {
        delete(&mut self.value, self.cursor);
    }

    pub fn left(&mut self) {
        move_left(&mut self.cursor);
    }

    pub fn right(&mut self) {
        move_right(&self.value, &mut self.cursor);
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = end(&self.value);
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }
}
