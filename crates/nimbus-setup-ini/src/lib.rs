//! INI documents built on `nom`.
//!
//! The setup state file, the web service configuration and the Cumulus INI
//! all share one dialect: `[section]` headers, `key: value` or `key = value`
//! entries, `#`/`;` comment lines and indented continuation lines.
//! [`IniDocument`] parses that dialect, answers lookups, applies edits and
//! writes the result back while leaving untouched lines exactly as they were.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod document;
pub mod parser;

pub use document::IniDocument;
