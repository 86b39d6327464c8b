//! Splits a post source file into its YAML front matter and its Markdown
//! body, and decodes the front matter into a [`FrontMatter`] record.
//!
//! A post source file is structured as follows:
//!
//! ```md
//! ---
//! title: Hello, world!
//! date: "2021-04-16"
//! description: A greeting
//! tags:
//!   - greet
//! draft: false
//! ---
//! # Hello
//!
//! World
//! ```

use serde::Deserialize;
use std::fmt;

const FENCE: &[u8] = b"---";
const BYTE_ORDER_MARK: &[u8] = b"\xEF\xBB\xBF";

/// The decoded metadata of a post.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrontMatter {
    /// The title of the post. Never empty.
    pub title: String,

    /// The date of the post exactly as written. Never empty; validated later
    /// by [`crate::post::PublishDate::parse`].
    pub date: String,

    /// A short summary, empty when absent.
    pub description: String,

    /// The tags associated with the post, in the order they were written.
    pub tags: Vec<String>,

    /// Drafts are excluded from every output artifact.
    pub draft: bool,
}

// Every key is optional at the YAML level so that a missing `title` or `date`
// surfaces as [`Error::MissingRequiredField`] instead of a decoder message.
#[derive(Deserialize, Default)]
#[serde(default)]
struct RawFrontMatter {
    title: Option<String>,
    date: Option<String>,
    description: Option<String>,
    tags: Option<Vec<String>>,
    draft: Option<bool>,
}

/// Parses a post source file, returning the decoded front matter and the
/// remaining bytes (the Markdown body).
pub fn parse(input: &[u8]) -> Result<(FrontMatter, &[u8])> {
    let (yaml, body) = split(input)?;
    Ok((decode(yaml)?, body))
}

/// Finds the fences and returns the bytes between them and the bytes after
/// the closing fence line.
fn split(input: &[u8]) -> Result<(&[u8], &[u8])> {
    let input = input.strip_prefix(BYTE_ORDER_MARK).unwrap_or(input);

    let yaml_start = match next_line(input, 0) {
        Some((line, next)) if line == FENCE => next,
        _ => return Err(Error::MissingFrontMatter),
    };

    let mut line_start = yaml_start;
    while let Some((line, next)) = next_line(input, line_start) {
        if line == FENCE {
            return Ok((&input[yaml_start..line_start], &input[next..]));
        }
        line_start = next;
    }
    Err(Error::UnterminatedFrontMatter)
}

/// Returns the line beginning at `start` (without its line terminator) and
/// the offset of the following line.
fn next_line(input: &[u8], start: usize) -> Option<(&[u8], usize)> {
    if start >= input.len() {
        return None;
    }
    let (line, next) = match input[start..].iter().position(|&b| b == b'\n') {
        Some(offset) => (&input[start..start + offset], start + offset + 1),
        None => (&input[start..], input.len()),
    };
    Some((line.strip_suffix(b"\r").unwrap_or(line), next))
}

fn decode(yaml: &[u8]) -> Result<FrontMatter> {
    let raw: RawFrontMatter = if yaml.iter().all(u8::is_ascii_whitespace) {
        RawFrontMatter::default()
    } else {
        serde_yaml::from_slice(yaml)?
    };

    Ok(FrontMatter {
        title: required(raw.title, Field::Title)?,
        date: required(raw.date, Field::Date)?,
        description: raw.description.unwrap_or_default(),
        tags: raw.tags.unwrap_or_default(),
        draft: raw.draft.unwrap_or(false),
    })
}

fn required(value: Option<String>, field: Field) -> Result<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::MissingRequiredField(field)),
    }
}

/// The required front matter keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Title,
    Date,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Field::Title => "title",
            Field::Date => "date",
        })
    }
}

/// Represents the result of a front matter parse.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing front matter.
#[derive(Debug)]
pub enum Error {
    /// Returned when the source does not begin with a `---` line.
    MissingFrontMatter,

    /// Returned when the opening `---` line is never closed by a second one.
    UnterminatedFrontMatter,

    /// Returned when the metadata between the fences isn't a valid YAML
    /// mapping of the recognized keys.
    InvalidFrontMatterSyntax(serde_yaml::Error),

    /// Returned when `title` or `date` is absent or empty.
    MissingRequiredField(Field),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingFrontMatter => {
                write!(f, "post must begin with a `---` line")
            }
            Error::UnterminatedFrontMatter => {
                write!(f, "missing closing `---` line")
            }
            Error::InvalidFrontMatterSyntax(err) => {
                write!(f, "invalid front matter: {}", err)
            }
            Error::MissingRequiredField(field) => {
                write!(f, "missing required front matter field `{}`", field)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidFrontMatterSyntax(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::InvalidFrontMatterSyntax(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_required_fields_unchanged() -> Result<()> {
        let input = b"---\ntitle: \"Hello, <world> & friends\"\ndate: \"2025-01-01\"\n---\n# Hi\n";
        let (front_matter, body) = parse(input)?;
        assert_eq!("Hello, <world> & friends", front_matter.title);
        assert_eq!("2025-01-01", front_matter.date);
        assert_eq!(b"# Hi\n", body);
        Ok(())
    }

    #[test]
    fn test_parse_defaults() -> Result<()> {
        let (front_matter, body) = parse(b"---\ntitle: T\ndate: 2025-01-01\n---\n")?;
        assert_eq!(
            FrontMatter {
                title: String::from("T"),
                date: String::from("2025-01-01"),
                description: String::new(),
                tags: Vec::new(),
                draft: false,
            },
            front_matter
        );
        assert!(body.is_empty());
        Ok(())
    }

    #[test]
    fn test_parse_optional_fields() -> Result<()> {
        let input = b"---
title: T
date: 2025-01-01
description: Short
tags:
  - zeta
  - alpha
draft: true
layout: ignored
---
body";
        let (front_matter, body) = parse(input)?;
        assert_eq!("Short", front_matter.description);
        assert_eq!(vec!["zeta", "alpha"], front_matter.tags);
        assert!(front_matter.draft);
        assert_eq!(b"body", body);
        Ok(())
    }

    #[test]
    fn test_parse_null_tags() -> Result<()> {
        let (front_matter, _) = parse(b"---\ntitle: T\ndate: 2025-01-01\ntags:\n---\n")?;
        assert!(front_matter.tags.is_empty());
        Ok(())
    }

    #[test]
    fn test_parse_crlf_and_byte_order_mark() -> Result<()> {
        let input = b"\xEF\xBB\xBF---\r\ntitle: T\r\ndate: 2025-01-01\r\n---\r\nbody\r\n";
        let (front_matter, body) = parse(input)?;
        assert_eq!("T", front_matter.title);
        assert_eq!(b"body\r\n", body);
        Ok(())
    }

    #[test]
    fn test_body_keeps_later_fences() -> Result<()> {
        let (_, body) = parse(b"---\ntitle: T\ndate: 2025-01-01\n---\nabove\n---\nbelow\n")?;
        assert_eq!(b"above\n---\nbelow\n", body);
        Ok(())
    }

    #[test]
    fn test_missing_front_matter() {
        assert!(matches!(
            parse(b"# Just markdown\n"),
            Err(Error::MissingFrontMatter)
        ));
        assert!(matches!(
            parse(b"---- not a fence\ntitle: T\n---\n"),
            Err(Error::MissingFrontMatter)
        ));
        assert!(matches!(parse(b""), Err(Error::MissingFrontMatter)));
    }

    #[test]
    fn test_unterminated_front_matter() {
        assert!(matches!(
            parse(b"---\ntitle: T\ndate: 2025-01-01\n"),
            Err(Error::UnterminatedFrontMatter)
        ));
        assert!(matches!(
            parse(b"---\ntitle: T\n--- \nbody"),
            Err(Error::UnterminatedFrontMatter)
        ));
    }

    #[test]
    fn test_invalid_front_matter_syntax() {
        assert!(matches!(
            parse(b"---\ntitle: [unclosed\n---\n"),
            Err(Error::InvalidFrontMatterSyntax(_))
        ));
        assert!(matches!(
            parse(b"---\ntitle: T\ndate: 2025-01-01\ndraft: maybe\n---\n"),
            Err(Error::InvalidFrontMatterSyntax(_))
        ));
        assert!(matches!(
            parse(b"---\n- a list\n- not a mapping\n---\n"),
            Err(Error::InvalidFrontMatterSyntax(_))
        ));
    }

    #[test]
    fn test_missing_required_field() {
        assert!(matches!(
            parse(b"---\ndate: 2025-01-01\n---\n"),
            Err(Error::MissingRequiredField(Field::Title))
        ));
        assert!(matches!(
            parse(b"---\ntitle: \"  \"\ndate: 2025-01-01\n---\n"),
            Err(Error::MissingRequiredField(Field::Title))
        ));
        assert!(matches!(
            parse(b"---\ntitle: T\n---\n"),
            Err(Error::MissingRequiredField(Field::Date))
        ));
        assert!(matches!(
            parse(b"---\n---\nbody"),
            Err(Error::MissingRequiredField(Field::Title))
        ));
    }
}
