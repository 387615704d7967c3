//! Reader and writer for the keyed-section text format.
//!
//! ```text
//! # comment
//! [section name]
//! Key=Value
//! ```
//!
//! Lines starting with `#` or `;` are comments. Keys and values are trimmed.
//! A repeated key keeps its last value; a repeated section header continues
//! the earlier section. Comments are not preserved on write.

use std::fmt;

/// A parse failure, with the 1-based line it occurred on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct KeyFileError {
    /// Line number of the offending input.
    pub line: usize,
    /// What was wrong with it.
    pub message: String,
}

/// One `[name]` section and its entries, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    name: String,
    entries: Vec<(String, String)>,
}

impl Section {
    /// Empty section called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Section name (the text between the brackets).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set `key`, replacing an existing value in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Builder form of [`Self::set`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// All entries in order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// An ordered list of sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyFile {
    sections: Vec<Section>,
}

impl KeyFile {
    /// File with no sections.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `input`.
    ///
    /// # Errors
    ///
    /// Returns a [`KeyFileError`] for an unterminated or empty section
    /// header, a line without `=`, an empty key, or an entry that appears
    /// before the first section header.
    pub fn parse(input: &str) -> Result<Self, KeyFileError> {
        let mut file = Self::new();
        let mut current: Option<usize> = None;

        for (idx, raw) in input.lines().enumerate() {
            let line_no = idx.saturating_add(1);
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(header) = line.strip_prefix('[') {
                let name = header
                    .strip_suffix(']')
                    .ok_or_else(|| KeyFileError {
                        line: line_no,
                        message: "unterminated section header".to_string(),
                    })?
                    .trim();
                if name.is_empty() {
                    return Err(KeyFileError {
                        line: line_no,
                        message: "empty section name".to_string(),
                    });
                }
                current = Some(file.section_index_or_insert(name));
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(KeyFileError {
                    line: line_no,
                    message: format!("expected `key=value`, found {line:?}"),
                });
            };
            let key = key.trim();
            if key.is_empty() {
                return Err(KeyFileError {
                    line: line_no,
                    message: "empty key".to_string(),
                });
            }
            let Some(section) = current.and_then(|i| file.sections.get_mut(i)) else {
                return Err(KeyFileError {
                    line: line_no,
                    message: format!("key {key:?} outside of any section"),
                });
            };
            section.set(key, value.trim());
        }

        Ok(file)
    }

    fn section_index_or_insert(&mut self, name: &str) -> usize {
        if let Some(i) = self.sections.iter().position(|s| s.name == name) {
            return i;
        }
        self.sections.push(Section::new(name));
        self.sections.len().saturating_sub(1)
    }

    /// Append a section. A section with the same name is replaced in place.
    pub fn push(&mut self, section: Section) {
        if let Some(existing) = self.sections.iter_mut().find(|s| s.name == section.name) {
            *existing = section;
        } else {
            self.sections.push(section);
        }
    }

    /// Look up a section by name.
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// All sections in order.
    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Consume the file, yielding its sections.
    #[must_use]
    pub fn into_sections(self) -> Vec<Section> {
        self.sections
    }

    /// Whether the file has no sections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

impl fmt::Display for KeyFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "[{}]", section.name)?;
            for (key, value) in &section.entries {
                writeln!(f, "{key}={value}")?;
            }
        }
        Ok(())
    }
}

impl FromIterator<Section> for KeyFile {
    fn from_iter<I: IntoIterator<Item = Section>>(iter: I) -> Self {
        let mut file = Self::new();
        for section in iter {
            file.push(section);
        }
        file
    }
}
