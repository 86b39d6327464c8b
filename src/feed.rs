//! Support for creating RSS 2.0 feeds from a list of posts.

use crate::post::Post;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::fmt;
use std::io::Cursor;
use url::Url;

const CONTENT_NAMESPACE: &str = "http://purl.org/rss/1.0/modules/content/";

/// Bundled configuration for creating a feed.
pub struct FeedConfig<'a> {
    pub title: &'a str,

    /// The site's base URL. Item links are resolved against it, so it should
    /// end in `/`.
    pub home_page: &'a Url,

    pub description: &'a str,
}

/// Renders the feed document for `posts`, which are listed in the order
/// given. Every interpolated field is XML-escaped, including the post body
/// carried in `content:encoded`.
///
/// The channel's `lastBuildDate` is the newest post's date rather than the
/// current time, so building the same posts always yields the same bytes.
pub fn feed(config: &FeedConfig, posts: &[Post]) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    rss.push_attribute(("xmlns:content", CONTENT_NAMESPACE));
    writer.write_event(Event::Start(rss))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;

    push_text(&mut writer, "title", config.title)?;
    push_text(&mut writer, "link", config.home_page.as_str())?;
    push_text(&mut writer, "description", config.description)?;
    if let Some(newest) = posts.iter().map(|p| p.published).max() {
        push_text(&mut writer, "lastBuildDate", &newest.to_rfc2822())?;
    }

    for post in posts {
        let link = config.home_page.join(&post.page_path())?;

        writer.write_event(Event::Start(BytesStart::new("item")))?;
        push_text(&mut writer, "title", &post.title)?;
        push_text(&mut writer, "link", link.as_str())?;

        let mut guid = BytesStart::new("guid");
        guid.push_attribute(("isPermaLink", "false"));
        writer.write_event(Event::Start(guid))?;
        writer.write_event(Event::Text(BytesText::new(&post.slug)))?;
        writer.write_event(Event::End(BytesEnd::new("guid")))?;

        push_text(&mut writer, "pubDate", &post.published.to_rfc2822())?;
        push_text(&mut writer, "description", &post.description)?;
        for tag in &post.tags {
            push_text(&mut writer, "category", &tag.name)?;
        }
        push_text(&mut writer, "content:encoded", &post.body_html)?;
        writer.write_event(Event::End(BytesEnd::new("item")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;

    let mut bytes = writer.into_inner().into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

fn push_text(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    tag: &str,
    text: &str,
) -> quick_xml::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

/// The result of rendering a feed.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating a feed.
#[derive(Debug)]
pub enum Error {
    /// Returned when the XML writer fails.
    Xml(quick_xml::Error),

    /// Returned when a post link can't be resolved against the base URL.
    Url(url::ParseError),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Xml(err) => err.fmt(f),
            Error::Url(err) => write!(f, "building item link: {}", err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Xml(err) => Some(err),
            Error::Url(err) => Some(err),
        }
    }
}

impl From<quick_xml::Error> for Error {
    /// Converts [`quick_xml::Error`]s into [`Error`]. This allows us to use
    /// the `?` operator in fallible feed operations.
    fn from(err: quick_xml::Error) -> Error {
        Error::Xml(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Xml(quick_xml::Error::from(err))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Error {
        Error::Url(err)
    }
}
