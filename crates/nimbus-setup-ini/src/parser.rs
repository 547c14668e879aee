//! Line classification for the INI dialect using `nom`.
//!
//! The dialect is line oriented, so the grammar works one physical line at a
//! time and [`classify`] turns each into a [`Line`]. Folding continuation
//! lines into the previous entry is left to the document builder.

use std::fmt;

use nom::{
    IResult, Parser,
    bytes::complete::{take_till1, take_while},
    character::complete::{char, one_of, space0},
    combinator::rest,
    sequence::delimited,
};

/// One classified physical line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    /// Empty or whitespace-only line.
    Blank,
    /// Full-line comment starting with `#` or `;`.
    Comment,
    /// `[name]` section header.
    Section(&'a str),
    /// `key: value` or `key = value`. The key is trimmed, the value trimmed.
    Entry {
        /// Option name as written.
        key: &'a str,
        /// Option value.
        value: &'a str,
    },
    /// Indented line continuing the previous entry's value.
    Continuation(&'a str),
}

/// A line that fits none of the dialect's forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// 1-based line number.
    pub line: usize,
    /// What was wrong.
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Parses `[name]`, tolerating trailing text after the closing bracket.
fn section_header(input: &str) -> IResult<&str, &str> {
    delimited(char('['), take_till1(|c: char| c == ']'), char(']')).parse(input)
}

/// Parses `key <sep> value` where `<sep>` is `:` or `=`.
fn entry(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, key) = take_till1(|c: char| c == ':' || c == '=')(input)?;
    let (input, _) = one_of(":=")(input)?;
    let (input, _) = space0(input)?;
    let (input, value) = rest(input)?;
    Ok((input, (key.trim(), value.trim_end())))
}

fn leading_space(input: &str) -> IResult<&str, &str> {
    take_while(|c: char| c == ' ' || c == '\t')(input)
}

/// Classifies one physical line. `in_entry` tells whether the previous
/// non-blank line was an entry, which is what makes an indented line a
/// continuation rather than an error.
///
/// # Errors
///
/// Returns an error if the line is neither blank, a comment, a header nor an
/// entry.
pub fn classify(line: &str, number: usize, in_entry: bool) -> Result<Line<'_>, ParseError> {
    let line = line.trim_end_matches('\r');
    if line.trim().is_empty() {
        return Ok(Line::Blank);
    }
    if line.starts_with('#') || line.starts_with(';') {
        return Ok(Line::Comment);
    }

    let (body, indent) = leading_space(line).map_err(|e| ParseError {
        line: number,
        message: e.to_string(),
    })?;
    if !indent.is_empty() && in_entry {
        return Ok(Line::Continuation(body.trim()));
    }

    if let Ok((_, name)) = section_header(body) {
        return Ok(Line::Section(name.trim()));
    }

    match entry(body) {
        Ok((_, (key, value))) if !key.is_empty() => Ok(Line::Entry { key, value }),
        _ => Err(ParseError {
            line: number,
            message: format!("expected `[section]` or `key: value`, found {:?}", line.trim()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_headers_and_entries() {
        assert_eq!(classify("[nimbussetup]", 1, false).unwrap(), Line::Section("nimbussetup"));
        assert_eq!(
            classify("hostcert: var/hostcert.pem", 2, false).unwrap(),
            Line::Entry {
                key: "hostcert",
                value: "var/hostcert.pem"
            }
        );
        assert_eq!(
            classify("keystore.pass = changeit", 3, false).unwrap(),
            Line::Entry {
                key: "keystore.pass",
                value: "changeit"
            }
        );
    }

    #[test]
    fn first_separator_wins() {
        assert_eq!(
            classify("url = http://example.org:8443/", 1, false).unwrap(),
            Line::Entry {
                key: "url",
                value: "http://example.org:8443/"
            }
        );
    }

    #[test]
    fn empty_value_is_allowed() {
        assert_eq!(
            classify("hostname:", 1, false).unwrap(),
            Line::Entry {
                key: "hostname",
                value: ""
            }
        );
    }

    #[test]
    fn comments_and_blanks() {
        assert_eq!(classify("# relative to base", 1, false).unwrap(), Line::Comment);
        assert_eq!(classify("; old style", 1, false).unwrap(), Line::Comment);
        assert_eq!(classify("   \r", 1, true).unwrap(), Line::Blank);
    }

    #[test]
    fn indented_line_continues_previous_entry() {
        assert_eq!(
            classify("    second part", 4, true).unwrap(),
            Line::Continuation("second part")
        );
    }

    #[test]
    fn indented_line_without_entry_is_parsed_normally() {
        assert_eq!(
            classify("  key = v", 1, false).unwrap(),
            Line::Entry { key: "key", value: "v" }
        );
    }

    #[test]
    fn garbage_reports_line_number() {
        let err = classify("this is not ini", 7, false).unwrap_err();
        assert_eq!(err.line, 7);
        assert!(err.to_string().starts_with("line 7:"));
    }
}
