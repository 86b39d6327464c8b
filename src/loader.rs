//! Defines the [`Loader`] and its [`Error`] type: discovering post source
//! files on disk and turning them into the ordered collection of [`Post`]s
//! that a build writes out.

use crate::post::{self, Post};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Extensions of post source files.
pub const MARKDOWN_EXTENSIONS: [&str; 2] = ["md", "markdown"];

/// Slugs whose `{slug}.html` page would overwrite another site page. Compared
/// case-insensitively since output may land on a case-insensitive filesystem.
pub const RESERVED_SLUGS: [&str; 1] = ["index"];

/// Loads [`Post`] objects from a posts directory.
pub struct Loader<'a> {
    /// The directory holding one source file per post. Subdirectories are
    /// not searched.
    posts_directory: &'a Path,
}

impl<'a> Loader<'a> {
    pub fn new(posts_directory: &'a Path) -> Loader<'a> {
        Loader { posts_directory }
    }

    /// Searches the posts directory for post files (extension `.md` or
    /// `.markdown`) and returns the non-draft posts sorted most recent first,
    /// ties broken by slug (see [`post::compare`]).
    ///
    /// Files are processed one at a time in file name order, so the first
    /// error reported for a given directory is always the same one. Any error
    /// fails the whole load.
    pub fn load(&self) -> Result<Vec<Post>> {
        let mut posts = Vec::new();
        let mut seen: HashMap<String, PathBuf> = HashMap::new();

        for path in source_files(self.posts_directory)? {
            let post = load_post(&path)?;
            if post.draft {
                debug!(path = %path.display(), "skipping draft");
                continue;
            }
            if is_reserved(&post.slug) {
                return Err(Error::ReservedSlug(path));
            }
            if let Some(first) = seen.insert(post.slug.clone(), path.clone()) {
                return Err(Error::DuplicateSlug {
                    slug: post.slug,
                    first,
                    second: path,
                });
            }
            debug!(slug = %post.slug, "loaded post");
            posts.push(post);
        }

        post::sort(&mut posts);
        Ok(posts)
    }
}

/// Lists the post source files directly inside `dir` in file name order.
/// Hidden files and files with other extensions are skipped.
pub fn source_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for result in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
    {
        let entry = result?;
        if entry.file_type().is_file() && is_post_source(&entry) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn is_reserved(slug: &str) -> bool {
    RESERVED_SLUGS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(slug))
}

fn is_post_source(entry: &DirEntry) -> bool {
    let hidden = entry.file_name().to_string_lossy().starts_with('.');
    let markdown = entry
        .path()
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| MARKDOWN_EXTENSIONS.contains(&ext));
    !hidden && markdown
}

fn load_post(path: &Path) -> Result<Post> {
    let slug = post::slug_for_path(path)
        .ok_or_else(|| Error::InvalidSlug(path.to_owned()))?;
    let contents = std::fs::read(path).map_err(|err| Error::Read {
        path: path.to_owned(),
        err,
    })?;
    Post::from_source(slug, path, &contents).map_err(|err| Error::Post {
        path: path.to_owned(),
        err,
    })
}

/// Represents the result of a [`Loader`] operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading posts.
#[derive(Debug)]
pub enum Error {
    /// Returned when a source file can't be turned into a [`Post`].
    Post { path: PathBuf, err: post::Error },

    /// Returned when two non-draft source files resolve to the same slug.
    DuplicateSlug {
        slug: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// Returned when a source file's stem isn't a valid slug.
    InvalidSlug(PathBuf),

    /// Returned when a published post's slug is one of [`RESERVED_SLUGS`].
    ReservedSlug(PathBuf),

    /// Returned when a source file can't be read.
    Read { path: PathBuf, err: std::io::Error },

    /// Returned when the posts directory can't be listed.
    WalkDir(walkdir::Error),
}

impl Error {
    /// The source file this error is about, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Error::Post { path, err: _ } => Some(path),
            Error::DuplicateSlug { second, .. } => Some(second),
            Error::InvalidSlug(path) => Some(path),
            Error::ReservedSlug(path) => Some(path),
            Error::Read { path, err: _ } => Some(path),
            Error::WalkDir(err) => err.path(),
        }
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Post { path, err } => {
                write!(f, "parsing post `{}`: {}", path.display(), err)
            }
            Error::DuplicateSlug {
                slug,
                first,
                second,
            } => write!(
                f,
                "duplicate slug `{}`: `{}` and `{}`",
                slug,
                first.display(),
                second.display()
            ),
            Error::InvalidSlug(path) => write!(
                f,
                "invalid post file name `{}`: use only ASCII letters, digits, `-`, `_` and `.`",
                path.display()
            ),
            Error::ReservedSlug(path) => write!(
                f,
                "post file name `{}` is reserved: its page would replace a site page",
                path.display()
            ),
            Error::Read { path, err } => {
                write!(f, "reading post `{}`: {}", path.display(), err)
            }
            Error::WalkDir(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Post { path: _, err } => Some(err),
            Error::DuplicateSlug { .. } => None,
            Error::InvalidSlug(_) => None,
            Error::ReservedSlug(_) => None,
            Error::Read { path: _, err } => Some(err),
            Error::WalkDir(err) => Some(err),
        }
    }
}

impl From<walkdir::Error> for Error {
    /// Converts a [`walkdir::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator while walking the posts directory.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::frontmatter::{self, Field};
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) {
        fs::write(dir.path().join(name), contents).unwrap();
    }

    fn post_source(title: &str, date: &str) -> String {
        format!("---\ntitle: \"{}\"\ndate: \"{}\"\n---\nBody of {}\n", title, date, title)
    }

    #[test]
    fn test_load_orders_posts() -> Result<()> {
        let dir = TempDir::new().unwrap();
        write(&dir, "b.md", &post_source("B", "2024-05-01"));
        write(&dir, "a.md", &post_source("A", "2024-05-01"));
        write(&dir, "newest.markdown", &post_source("Newest", "2025-02-03"));
        write(&dir, "oldest.md", &post_source("Oldest", "2019-12-31"));

        let posts = Loader::new(dir.path()).load()?;
        let slugs: Vec<&str> = posts.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(vec!["newest", "a", "b", "oldest"], slugs);
        Ok(())
    }

    #[test]
    fn test_load_skips_drafts_and_other_files() -> Result<()> {
        let dir = TempDir::new().unwrap();
        write(&dir, "published.md", &post_source("Published", "2025-01-01"));
        write(
            &dir,
            "secret.md",
            "---\ntitle: Secret\ndate: 2025-01-02\ndraft: true\n---\nshh\n",
        );
        write(&dir, "notes.txt", "not a post");
        write(&dir, ".hidden.md", "not a post either");
        fs::create_dir(dir.path().join("nested.md")).unwrap();

        let posts = Loader::new(dir.path()).load()?;
        assert_eq!(1, posts.len());
        assert_eq!("published", posts[0].slug);
        Ok(())
    }

    #[test]
    fn test_duplicate_slug() {
        let dir = TempDir::new().unwrap();
        write(&dir, "foo.md", &post_source("Foo", "2025-01-01"));
        write(&dir, "foo.markdown", &post_source("Other foo", "2025-01-02"));

        match Loader::new(dir.path()).load() {
            Err(Error::DuplicateSlug { slug, first, second }) => {
                assert_eq!("foo", slug);
                assert_eq!(dir.path().join("foo.markdown"), first);
                assert_eq!(dir.path().join("foo.md"), second);
            }
            other => panic!("wanted DuplicateSlug, got {:?}", other.map(|p| p.len())),
        }
    }

    #[test]
    fn test_duplicate_slug_with_draft_is_allowed() -> Result<()> {
        let dir = TempDir::new().unwrap();
        write(&dir, "foo.md", &post_source("Foo", "2025-01-01"));
        write(
            &dir,
            "foo.markdown",
            "---\ntitle: Foo draft\ndate: 2025-01-02\ndraft: true\n---\n",
        );
        assert_eq!(1, Loader::new(dir.path()).load()?.len());
        Ok(())
    }

    #[test]
    fn test_missing_title_names_file() {
        let dir = TempDir::new().unwrap();
        write(&dir, "good.md", &post_source("Good", "2025-01-01"));
        write(&dir, "untitled.md", "---\ndate: \"2025-01-01\"\n---\nbody\n");

        match Loader::new(dir.path()).load() {
            Err(err @ Error::Post { .. }) => {
                assert_eq!(Some(dir.path().join("untitled.md").as_path()), err.path());
                assert!(matches!(
                    err,
                    Error::Post {
                        err: post::Error::FrontMatter(
                            frontmatter::Error::MissingRequiredField(Field::Title)
                        ),
                        ..
                    }
                ));
                assert!(err.to_string().contains("title"));
                assert!(err.to_string().contains("untitled.md"));
            }
            other => panic!("wanted Post error, got {:?}", other.map(|p| p.len())),
        }
    }

    #[test]
    fn test_errors_in_drafts_are_fatal() {
        let dir = TempDir::new().unwrap();
        write(&dir, "draft.md", "---\ntitle: Draft\ndraft: true\n---\n");
        assert!(matches!(
            Loader::new(dir.path()).load(),
            Err(Error::Post { .. })
        ));
    }

    #[test]
    fn test_invalid_slug() {
        let dir = TempDir::new().unwrap();
        write(&dir, "hello world.md", &post_source("Hello", "2025-01-01"));
        assert!(matches!(
            Loader::new(dir.path()).load(),
            Err(Error::InvalidSlug(_))
        ));
    }

    #[test]
    fn test_reserved_slug() {
        let dir = TempDir::new().unwrap();
        write(&dir, "hello.md", &post_source("Hello", "2025-01-01"));
        write(&dir, "Index.md", &post_source("Index", "2025-01-02"));
        match Loader::new(dir.path()).load() {
            Err(err @ Error::ReservedSlug(_)) => {
                assert_eq!(Some(dir.path().join("Index.md").as_path()), err.path())
            }
            other => panic!("wanted ReservedSlug, got {:?}", other.map(|p| p.len())),
        }
    }

    #[test]
    fn test_reserved_slug_draft_is_allowed() -> Result<()> {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "index.md",
            "---\ntitle: Index\ndate: 2025-01-01\ndraft: true\n---\n",
        );
        assert!(Loader::new(dir.path()).load()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_missing_directory() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Loader::new(&dir.path().join("nope")).load(),
            Err(Error::WalkDir(_))
        ));
    }
}
