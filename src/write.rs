use crate::config::Site;
use crate::feed::{self, FeedConfig};
use crate::post::Post;
use crate::tag::Tag;
use crate::theme::Theme;
use crate::value;
use gtmpl::{Template, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The file name of the RSS feed inside the output directory.
pub const FEED_FILE: &str = "feed.xml";

/// Responsible for templating the index, post and tag pages and the feed and
/// writing them to the output directory.
pub struct Writer<'a> {
    /// The templates pages are rendered with.
    pub theme: &'a Theme,

    /// Site-wide metadata made available to every template as `.site`.
    pub site: &'a Site,

    /// Where the output files go. Created if it doesn't exist; existing files
    /// with the same names are overwritten and nothing is deleted.
    pub output_directory: &'a Path,
}

impl Writer<'_> {
    /// Writes `index.html`, one `{slug}.html` per post, one
    /// `tags/{tag}.html` per tag and `feed.xml`. `posts` must already be in
    /// site order; every listing keeps that order. Returns the number of
    /// files written.
    pub fn write_site(&self, posts: &[Post]) -> Result<usize> {
        create_dir(self.output_directory)?;

        let mut written = 0;
        let index = self.index_page(posts);
        let post_pages = self.post_pages(posts);
        let tag_pages = self.tag_pages(posts);
        if !tag_pages.is_empty() {
            create_dir(&self.output_directory.join("tags"))?;
        }
        for page in std::iter::once(index).chain(post_pages).chain(tag_pages) {
            self.write_page(&page)?;
            written += 1;
        }

        let feed_path = self.output_directory.join(FEED_FILE);
        let feed_config = FeedConfig {
            title: &self.site.title,
            home_page: &self.site.base_url,
            description: &self.site.description,
        };
        let bytes = feed::feed(&feed_config, posts).map_err(|err| Error::Feed {
            path: feed_path.clone(),
            err,
        })?;
        write_file(&feed_path, &bytes)?;
        Ok(written + 1)
    }

    /// Takes a single [`Page`], templates it, and writes it to disk.
    fn write_page(&self, page: &Page) -> Result<()> {
        let template_error = |err: String| Error::Template {
            path: page.file_path.clone(),
            err,
        };
        let context = gtmpl::Context::from(page.value.clone()).map_err(template_error)?;
        let mut contents: Vec<u8> = Vec::new();
        page.template
            .execute(&mut contents, &context)
            .map_err(template_error)?;
        write_file(&page.file_path, &contents)
    }

    fn index_page(&self, posts: &[Post]) -> Page {
        let root = "";
        Page {
            value: value::page(
                value::site(self.site, root),
                root,
                [
                    ("title", Value::String(value::escape(&self.site.title))),
                    ("heading", Value::Nil),
                    ("posts", summaries(posts.iter(), root)),
                ],
            ),
            file_path: self.output_directory.join("index.html"),
            template: &self.theme.index_template,
        }
    }

    /// One page per post. `prev` links to the newer neighbour and `next` to
    /// the older one.
    fn post_pages(&self, posts: &[Post]) -> Vec<Page> {
        let root = "";
        let neighbour = |i: Option<usize>| match i.and_then(|i| posts.get(i)) {
            Some(post) => value::summary(post, root),
            None => Value::Nil,
        };
        posts
            .iter()
            .enumerate()
            .map(|(i, post)| Page {
                value: value::page(
                    value::site(self.site, root),
                    root,
                    [
                        ("post", value::detail(post, root)),
                        ("prev", neighbour(i.checked_sub(1))),
                        ("next", neighbour(i.checked_add(1))),
                    ],
                ),
                file_path: self.output_directory.join(post.page_path()),
                template: &self.theme.posts_template,
            })
            .collect()
    }

    /// One index page per distinct tag, in tag slug order.
    fn tag_pages(&self, posts: &[Post]) -> Vec<Page> {
        let root = "../";
        index_tags(posts)
            .into_iter()
            .filter_map(|(_, (tag, tagged))| {
                let page_path = tag.page_path()?;
                Some(Page {
                    value: value::page(
                        value::site(self.site, root),
                        root,
                        [
                            (
                                "title",
                                Value::String(value::escape(&format!(
                                    "{} | {}",
                                    tag.name, self.site.title
                                ))),
                            ),
                            ("heading", Value::String(value::escape(&tag.name))),
                            ("posts", summaries(tagged.into_iter(), root)),
                        ],
                    ),
                    file_path: self.output_directory.join(page_path),
                    template: &self.theme.index_template,
                })
            })
            .collect()
    }
}

/// An output HTML file: the value a template is executed against and where
/// the result goes.
struct Page<'a> {
    value: Value,
    file_path: PathBuf,
    template: &'a Template,
}

fn summaries<'p>(posts: impl Iterator<Item = &'p Post>, root: &str) -> Value {
    Value::Array(posts.map(|p| value::summary(p, root)).collect())
}

/// Groups posts by tag slug, keeping site order within each group. The first
/// spelling of a tag names its page.
fn index_tags(posts: &[Post]) -> BTreeMap<String, (&Tag, Vec<&Post>)> {
    let mut tags: BTreeMap<String, (&Tag, Vec<&Post>)> = BTreeMap::new();
    for post in posts {
        for tag in &post.tags {
            let (_, tagged) = tags
                .entry(tag.slug.clone())
                .or_insert_with(|| (tag, Vec::new()));
            // A post may carry two spellings of the same tag.
            if !tagged.last().map_or(false, |p| std::ptr::eq(*p, post)) {
                tagged.push(post);
            }
        }
    }
    tags
}

fn create_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|err| Error::Write {
        path: dir.to_owned(),
        err,
    })
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    std::fs::write(path, contents).map_err(|err| Error::Write {
        path: path.to_owned(),
        err,
    })?;
    debug!(path = %path.display(), "wrote");
    Ok(())
}

/// The result of a fallible page-writing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation. Each variant names the
/// output file being produced.
#[derive(Debug)]
pub enum Error {
    /// An error during templating.
    Template { path: PathBuf, err: String },

    /// An error rendering the feed.
    Feed { path: PathBuf, err: feed::Error },

    /// An error writing an output file or creating a directory.
    Write { path: PathBuf, err: io::Error },
}

impl Error {
    pub fn path(&self) -> &Path {
        match self {
            Error::Template { path, err: _ } => path,
            Error::Feed { path, err: _ } => path,
            Error::Write { path, err: _ } => path,
        }
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Template { path, err } => {
                write!(f, "templating `{}`: {}", path.display(), err)
            }
            Error::Feed { path, err } => {
                write!(f, "rendering `{}`: {}", path.display(), err)
            }
            Error::Write { path, err } => {
                write!(f, "writing `{}`: {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Template { .. } => None,
            Error::Feed { path: _, err } => Some(err),
            Error::Write { path: _, err } => Some(err),
        }
    }
}
