//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: loading the posts
//! ([`crate::loader`]), loading the theme ([`crate::theme`]), rendering the
//! pages and the feed ([`crate::write`]), and copying the static source
//! directory into the output directory.
//!
//! Posts are loaded and validated before anything is written, so a build that
//! fails on its input leaves the output directory untouched.

use crate::config::Config;
use crate::frontmatter;
use crate::loader::{self, Loader};
use crate::post;
use crate::theme::{self, Theme};
use crate::write::{self, Writer};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What a successful build produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Summary {
    /// The number of published posts.
    pub posts: usize,

    /// The number of pages and feeds written, not counting static files.
    pub files: usize,
}

/// Builds the site from a [`Config`] object. This calls into
/// [`Loader::load`] and [`Writer::write_site`] which do the heavy-lifting.
/// This function also copies the static assets from source directory to
/// `{output_directory}/static`.
pub fn build_site(config: &Config) -> Result<Summary> {
    let posts = Loader::new(&config.posts_directory).load()?;
    let theme = Theme::from_directory(config.theme_directory.as_deref())?;

    let writer = Writer {
        theme: &theme,
        site: &config.site,
        output_directory: &config.output_directory,
    };
    let files = writer.write_site(&posts)?;

    if config.static_directory.is_dir() {
        copy_dir(
            &config.static_directory,
            &config.output_directory.join("static"),
        )?;
    } else {
        debug!(
            directory = %config.static_directory.display(),
            "no static directory"
        );
    }

    info!(
        posts = posts.len(),
        files,
        output = %config.output_directory.display(),
        "built site"
    );
    Ok(Summary {
        posts: posts.len(),
        files,
    })
}

fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    let copy_error = |path: &Path| {
        let path = path.to_owned();
        move |err: std::io::Error| Error::CopyStatic { path, err }
    };
    std::fs::create_dir_all(dst).map_err(copy_error(dst))?;
    let mut entries = std::fs::read_dir(src)
        .and_then(|entries| entries.collect::<std::io::Result<Vec<_>>>())
        .map_err(copy_error(src))?;
    entries.sort_by_key(|entry| entry.file_name());
    for entry in entries {
        let from = entry.path();
        let to = dst.join(entry.file_name());
        if entry.file_type().map_err(copy_error(&from))?.is_dir() {
            copy_dir(&from, &to)?;
        } else {
            std::fs::copy(&from, &to).map_err(copy_error(&to))?;
        }
    }
    Ok(())
}

/// Names the kind of failure behind an [`Error`], independently of which
/// stage reported it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    MissingFrontMatter,
    UnterminatedFrontMatter,
    InvalidFrontMatterSyntax,
    MissingRequiredField,
    InvalidDate,
    InvalidSlug,
    RenderError,
    DuplicateSlug,
    ReadError,
    TemplateError,
    WriteError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The result of building a site.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during loading posts,
/// loading the theme, writing output files, or copying static files.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors reading or validating posts.
    Load(loader::Error),

    /// Returned for errors loading the theme.
    Theme(theme::Error),

    /// Returned for errors writing pages or the feed to disk.
    Write(write::Error),

    /// Returned for I/O problems while copying static files.
    CopyStatic { path: PathBuf, err: std::io::Error },
}

impl Error {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        use frontmatter::Error as FrontMatterError;
        match self {
            Error::Load(loader::Error::Post { path: _, err }) => match err {
                post::Error::FrontMatter(err) => match err {
                    FrontMatterError::MissingFrontMatter => ErrorKind::MissingFrontMatter,
                    FrontMatterError::UnterminatedFrontMatter => {
                        ErrorKind::UnterminatedFrontMatter
                    }
                    FrontMatterError::InvalidFrontMatterSyntax(_) => {
                        ErrorKind::InvalidFrontMatterSyntax
                    }
                    FrontMatterError::MissingRequiredField(_) => {
                        ErrorKind::MissingRequiredField
                    }
                },
                post::Error::Render(_) => ErrorKind::RenderError,
                post::Error::InvalidDate { .. } => ErrorKind::InvalidDate,
            },
            Error::Load(loader::Error::DuplicateSlug { .. }) => ErrorKind::DuplicateSlug,
            Error::Load(loader::Error::InvalidSlug(_)) => ErrorKind::InvalidSlug,
            Error::Load(loader::Error::ReservedSlug(_)) => ErrorKind::InvalidSlug,
            Error::Load(loader::Error::Read { .. }) => ErrorKind::ReadError,
            Error::Load(loader::Error::WalkDir(_)) => ErrorKind::ReadError,
            Error::Theme(theme::Error::OpenFile { .. }) => ErrorKind::ReadError,
            Error::Theme(_) => ErrorKind::TemplateError,
            Error::Write(write::Error::Template { .. }) => ErrorKind::TemplateError,
            Error::Write(_) => ErrorKind::WriteError,
            Error::CopyStatic { .. } => ErrorKind::WriteError,
        }
    }

    /// The file the error is about: the offending source file for input
    /// errors, the artifact being written for output errors.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Error::Load(err) => err.path(),
            Error::Theme(err) => err.path(),
            Error::Write(err) => Some(err.path()),
            Error::CopyStatic { path, err: _ } => Some(path),
        }
    }
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Load(err) => err.fmt(f),
            Error::Theme(err) => err.fmt(f),
            Error::Write(err) => err.fmt(f),
            Error::CopyStatic { path, err } => {
                write!(f, "copying static file `{}`: {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Load(err) => Some(err),
            Error::Theme(err) => Some(err),
            Error::Write(err) => Some(err),
            Error::CopyStatic { path: _, err } => Some(err),
        }
    }
}

impl From<loader::Error> for Error {
    /// Converts [`loader::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: loader::Error) -> Error {
        Error::Load(err)
    }
}

impl From<theme::Error> for Error {
    /// Converts [`theme::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: theme::Error) -> Error {
        Error::Theme(err)
    }
}

impl From<write::Error> for Error {
    /// Converts [`write::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: write::Error) -> Error {
        Error::Write(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{ServerConfig, Site};
    use std::collections::BTreeMap;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;
    use url::Url;

    fn config(dir: &TempDir) -> Config {
        Config {
            site: Site {
                title: String::from("Test Site"),
                base_url: Url::parse("https://example.com/").unwrap(),
                description: String::from("A site for tests"),
            },
            posts_directory: dir.path().join("posts"),
            output_directory: dir.path().join("dist"),
            static_directory: dir.path().join("static"),
            theme_directory: None,
            server: ServerConfig {
                address: std::net::Ipv4Addr::LOCALHOST.into(),
                port: 8000,
                poll_interval: Duration::from_millis(10),
            },
        }
    }

    fn project(posts: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("posts")).unwrap();
        for (name, contents) in posts {
            fs::write(dir.path().join("posts").join(name), contents).unwrap();
        }
        dir
    }

    fn read(dir: &TempDir, path: &str) -> String {
        fs::read_to_string(dir.path().join("dist").join(path)).unwrap()
    }

    // Every file under `dir`, keyed by its path relative to `dir`.
    fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
        walkdir::WalkDir::new(dir)
            .into_iter()
            .map(|entry| entry.unwrap())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| {
                let relative = entry.path().strip_prefix(dir).unwrap().to_owned();
                (relative, fs::read(entry.path()).unwrap())
            })
            .collect()
    }

    #[test]
    fn test_hello_world() -> Result<()> {
        let dir = project(&[(
            "hello.md",
            "---\ntitle: \"Hello\"\ndate: \"2025-01-01\"\n---\n# Hi\n",
        )]);
        let summary = build_site(&config(&dir))?;
        assert_eq!(1, summary.posts);

        assert!(read(&dir, "index.html").contains("Hello"));
        assert!(read(&dir, "hello.html").contains("<h1>Hi</h1>"));
        let feed = read(&dir, "feed.xml");
        assert_eq!(1, feed.matches("<item>").count());
        assert!(feed.contains("<title>Hello</title>"));
        Ok(())
    }

    #[test]
    fn test_drafts_are_excluded() -> Result<()> {
        let dir = project(&[
            (
                "public.md",
                "---\ntitle: Public\ndate: 2025-01-01\n---\nvisible\n",
            ),
            (
                "secretdraft.md",
                "---\ntitle: Secret\ndate: 2025-01-02\ndraft: true\ntags: [hidden]\n---\nshh\n",
            ),
        ]);
        build_site(&config(&dir))?;

        for (path, contents) in snapshot(&dir.path().join("dist")) {
            let contents = String::from_utf8(contents).unwrap();
            assert!(!contents.contains("secretdraft"), "{}", path.display());
            assert!(!contents.contains("Secret"), "{}", path.display());
        }
        assert!(!dir.path().join("dist/secretdraft.html").exists());
        assert!(!dir.path().join("dist/tags/hidden.html").exists());
        Ok(())
    }

    #[test]
    fn test_index_order() -> Result<()> {
        let dir = project(&[
            ("b.md", "---\ntitle: B\ndate: 2025-01-01\n---\n"),
            ("a.md", "---\ntitle: A\ndate: 2025-01-01\n---\n"),
            ("c.md", "---\ntitle: C\ndate: 2025-06-01\n---\n"),
        ]);
        build_site(&config(&dir))?;
        let index = read(&dir, "index.html");
        let position = |slug: &str| index.find(&format!("href=\"{}.html\"", slug)).unwrap();
        assert!(position("c") < position("a"));
        assert!(position("a") < position("b"));
        Ok(())
    }

    #[test]
    fn test_sanitizes_bodies() -> Result<()> {
        let dir = project(&[(
            "evil.md",
            "---\ntitle: Evil\ndate: 2025-01-01\n---\n<script>alert(1)</script>\n\n[click](javascript:alert(1))\n",
        )]);
        build_site(&config(&dir))?;
        let page = read(&dir, "evil.html").to_lowercase();
        assert!(!page.contains("<script"));
        assert!(!page.contains("javascript:"));
        Ok(())
    }

    #[test]
    fn test_idempotent() -> Result<()> {
        let dir = project(&[
            (
                "one.md",
                "---\ntitle: One\ndate: 2025-01-01\ntags: [a, b]\n---\nfirst\n",
            ),
            (
                "two.md",
                "---\ntitle: Two\ndate: 2025-01-01T12:00:00Z\ntags: [b]\n---\nsecond\n",
            ),
        ]);
        fs::create_dir_all(dir.path().join("static/css")).unwrap();
        fs::write(dir.path().join("static/css/site.css"), "body {}").unwrap();

        let config = config(&dir);
        build_site(&config)?;
        let first = snapshot(&config.output_directory);
        build_site(&config)?;
        assert_eq!(first, snapshot(&config.output_directory));
        assert!(first.contains_key(Path::new("static/css/site.css")));
        assert!(first.contains_key(Path::new("tags/b.html")));
        Ok(())
    }

    #[test]
    fn test_duplicate_slug_writes_nothing() {
        let dir = project(&[
            ("foo.md", "---\ntitle: Foo\ndate: 2025-01-01\n---\n"),
            ("foo.markdown", "---\ntitle: Foo again\ndate: 2025-01-02\n---\n"),
        ]);
        let err = match build_site(&config(&dir)) {
            Err(err) => err,
            Ok(summary) => panic!("wanted DuplicateSlug, got {:?}", summary),
        };
        assert_eq!(ErrorKind::DuplicateSlug, err.kind());
        assert!(!dir.path().join("dist").exists());
    }

    #[test]
    fn test_missing_title_writes_nothing() {
        let dir = project(&[("untitled.md", "---\ndate: \"2025-01-01\"\n---\nbody\n")]);
        let err = match build_site(&config(&dir)) {
            Err(err) => err,
            Ok(summary) => panic!("wanted MissingRequiredField, got {:?}", summary),
        };
        assert_eq!(ErrorKind::MissingRequiredField, err.kind());
        assert_eq!(
            Some(dir.path().join("posts/untitled.md").as_path()),
            err.path()
        );
        assert!(err.to_string().contains("title"));
        assert!(!dir.path().join("dist").exists());
    }

    #[test]
    fn test_index_slug_writes_nothing() {
        let dir = project(&[
            ("hello.md", "---\ntitle: Hello\ndate: 2025-01-01\n---\n"),
            ("index.md", "---\ntitle: Home\ndate: 2025-01-02\n---\n"),
        ]);
        let err = match build_site(&config(&dir)) {
            Err(err) => err,
            Ok(summary) => panic!("wanted InvalidSlug, got {:?}", summary),
        };
        assert_eq!(ErrorKind::InvalidSlug, err.kind());
        assert_eq!(Some(dir.path().join("posts/index.md").as_path()), err.path());
        assert!(!dir.path().join("dist").exists());
    }

    #[test]
    fn test_error_kinds() {
        let cases = [
            ("no front matter\n", ErrorKind::MissingFrontMatter),
            ("---\ntitle: Open\n", ErrorKind::UnterminatedFrontMatter),
            ("---\ntitle: [unclosed\n---\n", ErrorKind::InvalidFrontMatterSyntax),
            ("---\ntitle: T\ndate: soon\n---\n", ErrorKind::InvalidDate),
            (
                "---\ntitle: T\ndate: 2025-01-01\n---\n",
                ErrorKind::InvalidSlug,
            ),
        ];
        for (i, (contents, kind)) in cases.iter().enumerate() {
            let name = match kind {
                ErrorKind::InvalidSlug => String::from("not valid.md"),
                _ => format!("post{}.md", i),
            };
            let dir = project(&[(name.as_str(), *contents)]);
            match build_site(&config(&dir)) {
                Err(err) => assert_eq!(*kind, err.kind(), "{}", err),
                Ok(_) => panic!("wanted {}", kind),
            }
        }
    }

    #[test]
    fn test_invalid_utf8_body() {
        let dir = project(&[]);
        let mut contents = b"---\ntitle: T\ndate: 2025-01-01\n---\n".to_vec();
        contents.extend_from_slice(&[0xff, 0xfe, b'\n']);
        fs::write(dir.path().join("posts/binary.md"), contents).unwrap();
        match build_site(&config(&dir)) {
            Err(err) => assert_eq!(ErrorKind::RenderError, err.kind()),
            Ok(_) => panic!("wanted RenderError"),
        }
    }

    #[test]
    fn test_missing_posts_directory() {
        let dir = TempDir::new().unwrap();
        match build_site(&config(&dir)) {
            Err(err) => assert_eq!(ErrorKind::ReadError, err.kind()),
            Ok(_) => panic!("wanted ReadError"),
        }
    }
}
