//! Defines the [`Post`] type and the rules that turn one source file into a
//! post: slug validation, date parsing, and the site-wide ordering.

use crate::frontmatter::{self, FrontMatter};
use crate::markdown;
use crate::tag::Tag;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};

/// Represents one published article.
#[derive(Clone, Debug)]
pub struct Post {
    /// Derived from the source file name with its extension stripped. Used
    /// for the output file name (`{slug}.html`) and as the feed item GUID.
    pub slug: String,

    /// The title of the post.
    pub title: String,

    /// The date of the post as written in the front matter. This is what
    /// pages display.
    pub date: String,

    /// The parsed `date`, used for ordering and for the feed.
    pub published: DateTime<Utc>,

    /// A short summary. Empty if the front matter has none.
    pub description: String,

    /// The tags associated with the post, in front matter order.
    pub tags: Vec<Tag>,

    /// Whether the post is a draft. Drafts never leave the loader.
    pub draft: bool,

    /// The sanitized HTML rendering of the post body.
    pub body_html: String,

    /// The file the post was parsed from.
    pub source_path: PathBuf,
}

impl Post {
    /// Builds a [`Post`] from the contents of its source file. `slug` must
    /// already be validated (see [`slug_for_path`]).
    pub fn from_source(
        slug: String,
        source_path: &Path,
        contents: &[u8],
    ) -> Result<Post> {
        let (front_matter, body) = frontmatter::parse(contents)?;
        let body_html = markdown::to_html(body)?;
        let FrontMatter {
            title,
            date,
            description,
            tags,
            draft,
        } = front_matter;
        let published = PublishDate::parse(&date)?.0;

        Ok(Post {
            slug,
            title,
            date,
            published,
            description,
            tags: tags.iter().map(|t| Tag::new(t)).collect(),
            draft,
            body_html,
            source_path: source_path.to_owned(),
        })
    }

    /// The path of the post's page relative to the output directory.
    pub fn page_path(&self) -> String {
        format!("{}.html", self.slug)
    }
}

/// Orders posts most recent first, breaking ties by slug so the order is the
/// same on every build.
pub fn compare(a: &Post, b: &Post) -> Ordering {
    b.published
        .cmp(&a.published)
        .then_with(|| a.slug.cmp(&b.slug))
}

/// Sorts `posts` into site order (see [`compare`]).
pub fn sort(posts: &mut [Post]) {
    posts.sort_by(compare);
}

/// Returns the slug for a post source file: its file stem, case preserved.
/// Returns `None` if the stem is empty or contains anything besides ASCII
/// alphanumerics, `-`, `_` and `.`.
pub fn slug_for_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let url_safe = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.');
    match !stem.is_empty() && stem.chars().all(url_safe) {
        true => Some(stem.to_owned()),
        false => None,
    }
}

/// A post date parsed from front matter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct PublishDate(pub DateTime<Utc>);

impl PublishDate {
    /// Parses an ISO-8601 date. Accepts `2025-01-01` (midnight UTC), RFC 3339
    /// date-times, and date-times without an offset (taken as UTC).
    pub fn parse(input: &str) -> Result<PublishDate> {
        let input = input.trim();
        if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
            if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                return Ok(PublishDate(Utc.from_utc_datetime(&midnight)));
            }
        }
        if let Ok(date_time) = DateTime::parse_from_rfc3339(input) {
            return Ok(PublishDate(date_time.with_timezone(&Utc)));
        }
        match NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S") {
            Ok(naive) => Ok(PublishDate(Utc.from_utc_datetime(&naive))),
            Err(err) => Err(Error::InvalidDate {
                date: input.to_owned(),
                err,
            }),
        }
    }
}

/// Represents the result of turning a source file into a [`Post`].
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error turning a source file into a [`Post`].
#[derive(Debug)]
pub enum Error {
    /// Returned when the front matter can't be split or decoded.
    FrontMatter(frontmatter::Error),

    /// Returned when the Markdown body can't be rendered.
    Render(markdown::Error),

    /// Returned when the `date` field isn't an ISO-8601 date.
    InvalidDate {
        date: String,
        err: chrono::ParseError,
    },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::FrontMatter(err) => err.fmt(f),
            Error::Render(err) => err.fmt(f),
            Error::InvalidDate { date, err } => {
                write!(f, "invalid date `{}`: {}", date, err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::FrontMatter(err) => Some(err),
            Error::Render(err) => Some(err),
            Error::InvalidDate { date: _, err } => Some(err),
        }
    }
}

impl From<frontmatter::Error> for Error {
    fn from(err: frontmatter::Error) -> Error {
        Error::FrontMatter(err)
    }
}

impl From<markdown::Error> for Error {
    fn from(err: markdown::Error) -> Error {
        Error::Render(err)
    }
}
