//! In-memory INI document with ordered, comment-preserving edits.

use std::fmt;
use std::io::Write;
use std::path::Path;

use nimbus_setup_common::error::{Result, SetupError};

use crate::parser::{self, Line};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    /// Blank or comment line, kept byte for byte.
    Raw(String),
    Section(String),
    Entry {
        key: String,
        value: String,
        /// Original text, dropped once the value is changed.
        raw: Option<String>,
    },
}

/// A parsed INI file.
///
/// Option names are case-insensitive and stored lower-cased. Section names are
/// case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    items: Vec<Item>,
}

impl IniDocument {
    /// Creates an empty document.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Parses INI text.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::InvalidConfig`] if a line cannot be classified or
    /// an entry appears before the first section header.
    pub fn parse(text: &str) -> Result<Self> {
        let mut items: Vec<Item> = Vec::new();
        let mut in_section = false;
        let mut in_entry = false;

        for (idx, line) in text.lines().enumerate() {
            let number = idx + 1;
            let classified = parser::classify(line, number, in_entry)
                .map_err(|e| SetupError::invalid_config(e.to_string()))?;
            match classified {
                Line::Blank => {
                    items.push(Item::Raw(line.to_owned()));
                    in_entry = false;
                }
                Line::Comment => items.push(Item::Raw(line.to_owned())),
                Line::Section(name) => {
                    items.push(Item::Section(name.to_owned()));
                    in_section = true;
                    in_entry = false;
                }
                Line::Entry { key, value } => {
                    if !in_section {
                        return Err(SetupError::invalid_config(format!(
                            "line {number}: entry {key:?} appears before any [section] header"
                        )));
                    }
                    items.push(Item::Entry {
                        key: key.to_lowercase(),
                        value: value.to_owned(),
                        raw: Some(line.to_owned()),
                    });
                    in_entry = true;
                }
                Line::Continuation(more) => {
                    if let Some(Item::Entry { value, raw, .. }) = items.last_mut() {
                        value.push('\n');
                        value.push_str(more);
                        if let Some(raw) = raw {
                            raw.push('\n');
                            raw.push_str(line);
                        }
                    }
                }
            }
        }

        Ok(Self { items })
    }

    /// Reads and parses the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::Io`] if the file cannot be read, or
    /// [`SetupError::InvalidConfig`] naming the file if it does not parse.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| SetupError::io(path, e))?;
        let doc = Self::parse(&text)
            .map_err(|e| SetupError::invalid_config(format!("{}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), "parsed INI file");
        Ok(doc)
    }

    /// Writes the document to `path`, replacing any previous contents.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::Io`] if the file cannot be created or written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut file = std::fs::File::create(path).map_err(|e| SetupError::io(path, e))?;
        file.write_all(self.to_string().as_bytes())
            .map_err(|e| SetupError::io(path, e))
    }

    /// Returns whether a section with this exact name exists.
    #[must_use]
    pub fn has_section(&self, section: &str) -> bool {
        self.section_index(section).is_some()
    }

    /// Names of all sections, in file order.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|item| match item {
            Item::Section(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Looks up `key` in `section`.
    #[must_use]
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        let key = key.to_lowercase();
        self.entries(section)
            .into_iter()
            .rev()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    /// All entries of `section` in file order. Empty if the section is absent.
    #[must_use]
    pub fn entries(&self, section: &str) -> Vec<(&str, &str)> {
        let Some(start) = self.section_index(section) else {
            return Vec::new();
        };
        self.items[start + 1..self.section_end(start)]
            .iter()
            .filter_map(|item| match item {
                Item::Entry { key, value, .. } => Some((key.as_str(), value.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Appends an empty section unless one with this name already exists.
    pub fn add_section(&mut self, section: &str) {
        if !self.has_section(section) {
            self.items.push(Item::Section(section.to_owned()));
        }
    }

    /// Sets `key` in an existing `section`, replacing the current value in
    /// place or appending after the section's last entry.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::InvalidConfig`] if the section does not exist.
    pub fn set(&mut self, section: &str, key: &str, value: &str) -> Result<()> {
        let start = self
            .section_index(section)
            .ok_or_else(|| SetupError::invalid_config(format!("no section [{section}]")))?;
        let end = self.section_end(start);
        let key = key.to_lowercase();

        let existing = self.items[start + 1..end]
            .iter()
            .rposition(|item| matches!(item, Item::Entry { key: k, .. } if *k == key));
        if let Some(offset) = existing {
            self.items[start + 1 + offset] = Item::Entry {
                key,
                value: value.to_owned(),
                raw: None,
            };
            return Ok(());
        }

        let insert_at = self.items[start + 1..end]
            .iter()
            .rposition(|item| matches!(item, Item::Entry { .. }))
            .map_or(start + 1, |offset| start + 2 + offset);
        self.items.insert(
            insert_at,
            Item::Entry {
                key,
                value: value.to_owned(),
                raw: None,
            },
        );
        Ok(())
    }

    fn section_index(&self, section: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|item| matches!(item, Item::Section(name) if name == section))
    }

    /// Index one past the last item belonging to the section at `start`.
    fn section_end(&self, start: usize) -> usize {
        self.items[start + 1..]
            .iter()
            .position(|item| matches!(item, Item::Section(_)))
            .map_or(self.items.len(), |offset| start + 1 + offset)
    }
}

impl fmt::Display for IniDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            match item {
                Item::Raw(line) => writeln!(f, "{line}")?,
                Item::Section(name) => writeln!(f, "[{name}]")?,
                Item::Entry { raw: Some(raw), .. } => writeln!(f, "{raw}")?,
                Item::Entry {
                    key,
                    value,
                    raw: None,
                } => writeln!(f, "{key} = {}", value.replace('\n', "\n\t"))?,
            }
        }
        Ok(())
    }
}
