//! Defines the [`Tag`] type, which represents a [`crate::post::Post`] tag.

use std::hash::{Hash, Hasher};

/// Represents a [`crate::post::Post`] tag. The `name` is kept exactly as the
/// author wrote it for display, while `slug` identifies the tag's page.
#[derive(Clone, Debug)]
pub struct Tag {
    /// The tag as written in the front matter.
    pub name: String,

    /// The slugified name, so e.g. `macOS` and `MacOS` resolve to the same
    /// tag page. Empty when the name has no URL-safe characters at all, in
    /// which case the tag gets no page.
    pub slug: String,
}

impl Tag {
    pub fn new(name: &str) -> Tag {
        Tag {
            name: name.to_owned(),
            slug: slug::slugify(name),
        }
    }

    /// The path of the tag's page relative to the output directory, if the
    /// tag has one.
    pub fn page_path(&self) -> Option<String> {
        match self.slug.is_empty() {
            true => None,
            false => Some(format!("tags/{}.html", self.slug)),
        }
    }
}

impl Hash for Tag {
    /// Implements [`Hash`] for [`Tag`] by delegating directly to the `slug`
    /// field.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.slug.hash(state)
    }
}

impl PartialEq for Tag {
    /// Implements [`PartialEq`] and [`Eq`] for [`Tag`] by delegating directly
    /// to the `slug` field.
    fn eq(&self, other: &Self) -> bool {
        self.slug == other.slug
    }
}
impl Eq for Tag {}
