//! Converts a post's Markdown body into sanitized HTML.

use crate::htmlrenderer::HtmlRenderer;
use pulldown_cmark::{Options, Parser};
use std::fmt;
use std::io;
use std::str::Utf8Error;

/// Converts markdown to HTML. Raw HTML in the input is omitted and links or
/// images with dangerous destinations are neutralized (see
/// [`crate::htmlrenderer`]).
///
/// The parser and the renderer are created for this call only and dropped
/// before it returns, on success or failure, so repeated calls on the same
/// input always produce the same output.
pub fn to_html(markdown: &[u8]) -> Result<String, Error> {
    let markdown = std::str::from_utf8(markdown)?;

    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut html = String::with_capacity(markdown.len() * 3 / 2);
    let mut renderer = HtmlRenderer::new();
    for ev in Parser::new_ext(markdown, options) {
        renderer.on_event(&mut html, ev)?;
    }
    Ok(html)
}

/// Represents an error converting markdown to HTML.
#[derive(Debug)]
pub enum Error {
    /// Returned when the body isn't valid UTF-8.
    InvalidUtf8(Utf8Error),

    /// Returned when the HTML writer fails. [`HtmlRenderer::on_event`] is
    /// generic over its writer; [`to_html`] writes into a `String`, which
    /// never fails, so `to_html` doesn't return this in practice.
    Io(io::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidUtf8(err) => {
                write!(f, "markdown body is not valid UTF-8: {}", err)
            }
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidUtf8(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<Utf8Error> for Error {
    fn from(err: Utf8Error) -> Error {
        Error::InvalidUtf8(err)
    }
}

impl From<io::Error> for Error {
    /// Converts a [`io::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for IO operations.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn render(markdown: &str) -> String {
        to_html(markdown.as_bytes()).unwrap()
    }

    #[test]
    fn test_heading() {
        assert_eq!("<h1>Hi</h1>\n", render("# Hi"));
    }

    #[test]
    fn test_paragraph_and_emphasis() {
        assert_eq!(
            "<p>Some <em>light</em> and <strong>bold</strong> text</p>\n",
            render("Some *light* and **bold** text")
        );
    }

    #[test]
    fn test_text_is_escaped() {
        assert_eq!("<p>1 &lt; 2 &amp;&amp; 3 &gt; 2</p>\n", render("1 < 2 && 3 > 2"));
    }

    #[test]
    fn test_script_block_is_omitted() {
        let html = render("before\n\n<script>alert(1)</script>\n\nafter");
        assert!(!html.contains("<script"), "{}", html);
        assert!(html.contains("<!-- raw HTML omitted -->"));
        assert!(html.contains("<p>after</p>"));
    }

    #[test]
    fn test_inline_html_is_omitted() {
        let html = render("click <img src=x onerror=alert(1)> here");
        assert!(!html.contains("<img"), "{}", html);
    }

    #[test]
    fn test_javascript_link_is_neutralized() {
        let html = render("[click](javascript:alert(1))");
        assert_eq!("<p><a href=\"\">click</a></p>\n", html);
    }

    #[test]
    fn test_javascript_autolink_and_reference_are_neutralized() {
        let html = render("<javascript:alert(1)>\n\n[ref][x]\n\n[x]: JAVASCRIPT:alert(2)");
        assert!(!html.to_ascii_lowercase().contains("href=\"javascript"), "{}", html);
        assert_eq!(2, html.matches("<a href=\"\">").count(), "{}", html);
    }

    #[test]
    fn test_safe_link() {
        assert_eq!(
            "<p><a href=\"https://example.org/page.html\" title=\"T &amp; C\">x</a></p>\n",
            render("[x](https://example.org/page.html \"T & C\")")
        );
    }

    #[test]
    fn test_image_alt_text() {
        assert_eq!(
            "<p><img src=\"cat.png\" alt=\"a fat cat\" /></p>\n",
            render("![a *fat* cat](cat.png)")
        );
    }

    #[test]
    fn test_dangerous_image_source_is_neutralized() {
        let html = render("![x](data:text/html;base64,PHNjcmlwdD4=)");
        assert_eq!("<p><img src=\"\" alt=\"x\" /></p>\n", html);
    }

    #[test]
    fn test_code_block_language_is_escaped() {
        let html = render("```\"><script>\nlet x = 1;\n```");
        assert!(!html.contains("<script>"), "{}", html);
        assert!(html.starts_with("<pre><code class=\"language-&quot;&gt;&lt;script&gt;\">"));
    }

    #[test]
    fn test_table() {
        let html = render("| a | b |\n|:--|--:|\n| 1 | 2 |");
        assert_eq!(
            "<table><thead><tr><th style=\"text-align: left\">a</th><th style=\"text-align: right\">b</th></tr></thead><tbody>\n<tr><td style=\"text-align: left\">1</td><td style=\"text-align: right\">2</td></tr>\n</tbody></table>\n",
            html
        );
    }

    #[test]
    fn test_idempotent() {
        let markdown = "# Title\n\nSome text[^1].\n\n[^1]: A footnote.";
        assert_eq!(render(markdown), render(markdown));
    }

    #[test]
    fn test_invalid_utf8() {
        assert!(matches!(
            to_html(b"# Hi \xFF\xFE"),
            Err(Error::InvalidUtf8(_))
        ));
    }
}
