//! Converts posts and site metadata into [`Value`]s for templating.
//!
//! Templates insert values verbatim, so every string produced here is
//! HTML-escaped except a post's `body`, which the renderer has already
//! sanitized.

use crate::config::Site;
use crate::post::Post;
use crate::tag::Tag;
use gtmpl::Value;
use pulldown_cmark::escape::escape_html;
use std::collections::HashMap;

/// HTML-escapes `s` for use in element content or a double-quoted attribute.
pub fn escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    // Writing into a `String` can't fail.
    let _ = escape_html(&mut escaped, s);
    escaped
}

fn string(s: &str) -> Value {
    Value::String(escape(s))
}

fn object<const N: usize>(fields: [(&str, Value); N]) -> Value {
    Value::Object(
        fields
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v))
            .collect::<HashMap<String, Value>>(),
    )
}

/// The site-wide fields available to every page as `.site`, plus the
/// relative path from the page to the output root as `.root` (`""` or
/// `"../"`).
pub fn site(site: &Site, root: &str) -> Value {
    object([
        ("title", string(&site.title)),
        ("description", string(&site.description)),
        ("base_url", string(site.base_url.as_str())),
        ("feed_url", string(&format!("{}feed.xml", root))),
        ("home_url", string(&format!("{}index.html", root))),
    ])
}

/// A tag with the URL of its page, or no `url` when it has none.
pub fn tag(tag: &Tag, root: &str) -> Value {
    object([
        ("name", string(&tag.name)),
        (
            "url",
            match tag.page_path() {
                Some(path) => string(&format!("{}{}", root, path)),
                None => Value::Nil,
            },
        ),
    ])
}

fn tags(tags: &[Tag], root: &str) -> Value {
    Value::Array(tags.iter().map(|t| tag(t, root)).collect())
}

/// The fields shown for a post in a listing.
pub fn summary(post: &Post, root: &str) -> Value {
    object([
        ("slug", string(&post.slug)),
        ("url", string(&format!("{}{}", root, post.page_path()))),
        ("title", string(&post.title)),
        ("date", string(&post.date)),
        ("description", string(&post.description)),
        ("tags", tags(&post.tags, root)),
    ])
}

/// Every field of a post, including its rendered body.
pub fn detail(post: &Post, root: &str) -> Value {
    object([
        ("slug", string(&post.slug)),
        ("url", string(&format!("{}{}", root, post.page_path()))),
        ("title", string(&post.title)),
        ("date", string(&post.date)),
        ("description", string(&post.description)),
        ("tags", tags(&post.tags, root)),
        ("body", Value::String(post.body_html.clone())),
    ])
}

/// A page-level object: `site`, `root`, and the given page fields.
pub fn page<const N: usize>(
    site_value: Value,
    root: &str,
    fields: [(&str, Value); N],
) -> Value {
    let mut m: HashMap<String, Value> = fields
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v))
        .collect();
    m.insert("site".to_owned(), site_value);
    m.insert("root".to_owned(), Value::String(root.to_owned()));
    Value::Object(m)
}
