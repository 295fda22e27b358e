//! Services provided by the host: the edited document and the DOI source

/// An editable document.
///
/// Offsets are byte offsets into [`TextBuffer::contents`].
pub trait TextBuffer {
    fn contents(&self) -> String;

    /// Replace the whole document
    fn replace_all(&mut self, text: &str);

    /// Insert `text` at `offset`
    fn insert(&mut self, offset: usize, text: &str);

    /// Current insertion point
    fn cursor(&self) -> usize;
}

/// Where the fetch operation reads its DOI from (a clipboard, usually)
pub trait DoiSource {
    /// The raw string to interpret as a DOI, if any
    fn read_doi(&self) -> Option<String>;
}

impl DoiSource for str {
    fn read_doi(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl DoiSource for String {
    fn read_doi(&self) -> Option<String> {
        Some(self.clone())
    }
}

/// In-memory [`TextBuffer`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringBuffer {
    text: String,
    cursor: usize,
}

impl StringBuffer {
    /// Buffer with the cursor at the end
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let cursor = text.len();
        Self { text, cursor }
    }

    /// Move the cursor, clamped to the nearest character boundary before `offset`
    pub fn with_cursor(mut self, offset: usize) -> Self {
        self.cursor = floor_char_boundary(&self.text, offset);
        self
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl TextBuffer for StringBuffer {
    fn contents(&self) -> String {
        self.text.clone()
    }

    fn replace_all(&mut self, text: &str) {
        self.text = text.to_string();
        self.cursor = self.cursor.min(self.text.len());
        self.cursor = floor_char_boundary(&self.text, self.cursor);
    }

    fn insert(&mut self, offset: usize, text: &str) {
        let offset = floor_char_boundary(&self.text, offset);
        self.text.insert_str(offset, text);
        if offset <= self.cursor {
            self.cursor += text.len();
        }
    }

    fn cursor(&self) -> usize {
        self.cursor
    }
}

fn floor_char_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_at_cursor_moves_cursor() {
        let mut buffer = StringBuffer::new("ab").with_cursor(1);
        let cursor = buffer.cursor();
        buffer.insert(cursor, "XY");
        assert_eq!(buffer.as_str(), "aXYb");
        assert_eq!(buffer.cursor(), 3);
    }

    #[test]
    fn test_insert_clamps_offset() {
        let mut buffer = StringBuffer::new("é");
        buffer.insert(1, "x");
        assert_eq!(buffer.as_str(), "xé");

        buffer.insert(100, "!");
        assert_eq!(buffer.as_str(), "xé!");
    }

    #[test]
    fn test_replace_all_clamps_cursor() {
        let mut buffer = StringBuffer::new("long text");
        buffer.replace_all("ab");
        assert_eq!(buffer.contents(), "ab");
        assert_eq!(buffer.cursor(), 2);
    }

    #[test]
    fn test_string_doi_source() {
        assert_eq!("10.1000/x".read_doi().as_deref(), Some("10.1000/x"));
    }
}
