//! BibTeX entry data structures

/// Byte range `[start, end)` into the scanned text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Whether `other` lies entirely inside this span
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The text covered by this span
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }
}

/// One `@kind{label, ...}` block found in a document.
///
/// `kind` is lowercased and carries no leading `@`. The span runs from the
/// `@` to the matching closing brace, inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub kind: String,
    pub label: String,
    pub span: Span,
}

impl Entry {
    /// Offset of the entry's closing brace
    pub(crate) fn close(&self) -> usize {
        self.span.end - 1
    }
}

/// A `name = value` pair inside an entry.
///
/// `value` has redundant enclosing braces and the value delimiters removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub value: String,
    pub span: Span,
}

/// A field name with its (normalized or raw) value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValue {
    pub name: String,
    pub value: String,
}

/// An entry ready for serialization: kind, label and ordered fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEntry {
    pub kind: String,
    pub label: String,
    pub fields: Vec<FieldValue>,
}

impl NormalizedEntry {
    /// Create an entry without fields
    pub fn new(kind: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            label: label.into(),
            fields: Vec::new(),
        }
    }

    /// Create an entry with every schema field present and empty
    pub fn with_schema(
        kind: impl Into<String>,
        label: impl Into<String>,
        schema: &[String],
    ) -> Self {
        let mut entry = Self::new(kind, label);
        entry.fields = schema
            .iter()
            .map(|name| FieldValue {
                name: name.clone(),
                value: String::new(),
            })
            .collect();
        entry
    }

    /// Append a field, keeping any existing field of the same name
    pub fn add_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push(FieldValue {
            name: name.into(),
            value: value.into(),
        });
    }

    /// Overwrite a field in place, or append it when it is not present yet
    pub fn set_field(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) => field.value = value,
            None => self.add_field(name, value),
        }
    }

    /// Get a non-empty field value by name
    pub fn get_field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name && !f.value.is_empty())
            .map(|f| f.value.as_str())
    }

    pub fn doi(&self) -> Option<&str> {
        self.get_field("doi")
    }

    pub fn journal(&self) -> Option<&str> {
        self.get_field("journal")
    }
}
