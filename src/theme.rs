//! Loads the templates pages are rendered with: the built-in default theme or
//! a theme directory described by a `theme.yaml` manifest.
//!
//! A manifest lists the files making up each template; the files are
//! concatenated in order and parsed as one template:
//!
//! ```yaml
//! index_template: [base.html, index.html]
//! posts_template: [base.html, post.html]
//! ```
//!
//! Templates use Go template syntax (see [`gtmpl`]). Index templates get
//! `.site`, `.root`, `.title`, `.heading` and `.posts`; post templates get
//! `.site`, `.root`, `.post`, `.prev` and `.next`. See [`crate::value`] for
//! the fields of each object.

use gtmpl::Template;
use serde::Deserialize;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

const MANIFEST_FILE: &str = "theme.yaml";

const INDEX_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{{.title}}</title>
<link rel="alternate" type="application/rss+xml" title="{{.site.title}}" href="{{.site.feed_url}}">
</head>
<body>
<header>
<h1><a href="{{.site.home_url}}">{{.site.title}}</a></h1>
{{if .site.description}}<p class="site-description">{{.site.description}}</p>{{end}}
</header>
<main>
{{if .heading}}<h2>{{.heading}}</h2>{{end}}
<ul class="posts">
{{range .posts}}<li class="post">
<a href="{{.url}}">{{.title}}</a>
<time>{{.date}}</time>
{{if .description}}<p class="description">{{.description}}</p>{{end}}
</li>
{{end}}</ul>
</main>
</body>
</html>
"#;

const POSTS_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{{.post.title}} | {{.site.title}}</title>
{{if .post.description}}<meta name="description" content="{{.post.description}}">{{end}}
<link rel="alternate" type="application/rss+xml" title="{{.site.title}}" href="{{.site.feed_url}}">
</head>
<body>
<header>
<h1><a href="{{.site.home_url}}">{{.site.title}}</a></h1>
</header>
<main>
<article>
<h2>{{.post.title}}</h2>
<time>{{.post.date}}</time>
{{if .post.tags}}<ul class="tags">
{{range .post.tags}}<li>{{if .url}}<a href="{{.url}}">{{.name}}</a>{{else}}{{.name}}{{end}}</li>
{{end}}</ul>{{end}}
{{.post.body}}
</article>
<nav>
{{if .prev}}<a rel="prev" href="{{.prev.url}}">{{.prev.title}}</a>{{end}}
{{if .next}}<a rel="next" href="{{.next.url}}">{{.next.title}}</a>{{end}}
</nav>
</main>
</body>
</html>
"#;

/// The parsed templates for index pages and post pages.
pub struct Theme {
    pub index_template: Template,
    pub posts_template: Template,
}

#[derive(Deserialize)]
struct Manifest {
    index_template: Vec<PathBuf>,
    posts_template: Vec<PathBuf>,
}

impl Theme {
    /// The theme compiled into the binary.
    pub fn builtin() -> Result<Theme> {
        Ok(Theme {
            index_template: parse_str(INDEX_TEMPLATE, "built-in index template")?,
            posts_template: parse_str(POSTS_TEMPLATE, "built-in posts template")?,
        })
    }

    /// Loads the theme described by `{theme_dir}/theme.yaml`. Template file
    /// paths in the manifest are relative to `theme_dir`.
    pub fn load(theme_dir: &Path) -> Result<Theme> {
        let manifest_path = theme_dir.join(MANIFEST_FILE);
        let manifest_file =
            File::open(&manifest_path).map_err(|err| Error::OpenFile {
                path: manifest_path.clone(),
                err,
            })?;
        let manifest: Manifest = serde_yaml::from_reader(manifest_file)
            .map_err(|err| Error::Manifest {
                path: manifest_path,
                err,
            })?;

        Ok(Theme {
            index_template: parse_template(
                manifest.index_template.iter().map(|p| theme_dir.join(p)),
            )?,
            posts_template: parse_template(
                manifest.posts_template.iter().map(|p| theme_dir.join(p)),
            )?,
        })
    }

    /// Loads the theme in `theme_dir`, or the built-in theme if there's no
    /// theme directory.
    pub fn from_directory(theme_dir: Option<&Path>) -> Result<Theme> {
        match theme_dir {
            Some(dir) => Theme::load(dir),
            None => Theme::builtin(),
        }
    }
}

// Loads the template file contents, appends them to one another, and parses
// the result into a template.
fn parse_template<P: AsRef<Path>>(
    template_files: impl Iterator<Item = P>,
) -> Result<Template> {
    let mut contents = String::new();
    let mut names = Vec::new();
    for template_file in template_files {
        use std::io::Read;
        let template_file = template_file.as_ref();
        File::open(template_file)
            .and_then(|mut f| f.read_to_string(&mut contents))
            .map_err(|err| Error::OpenFile {
                path: template_file.to_owned(),
                err,
            })?;
        contents.push(' ');
        names.push(template_file.display().to_string());
    }
    parse_str(&contents, &names.join(", "))
}

fn parse_str(contents: &str, name: &str) -> Result<Template> {
    let mut template = Template::default();
    template
        .parse(contents)
        .map_err(|err| Error::ParseTemplate {
            name: name.to_owned(),
            err,
        })?;
    Ok(template)
}

/// Represents the result of loading a [`Theme`].
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading a [`Theme`].
#[derive(Debug)]
pub enum Error {
    /// Returned for I/O problems while opening the manifest or template
    /// files.
    OpenFile { path: PathBuf, err: std::io::Error },

    /// Returned when `theme.yaml` can't be decoded.
    Manifest {
        path: PathBuf,
        err: serde_yaml::Error,
    },

    /// Returned for errors parsing template files. `name` lists the files.
    ParseTemplate { name: String, err: String },
}

impl Error {
    /// The file this error is about, if there's exactly one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Error::OpenFile { path, err: _ } => Some(path),
            Error::Manifest { path, err: _ } => Some(path),
            Error::ParseTemplate { .. } => None,
        }
    }
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::OpenFile { path, err } => {
                write!(f, "opening theme file `{}`: {}", path.display(), err)
            }
            Error::Manifest { path, err } => {
                write!(f, "decoding theme manifest `{}`: {}", path.display(), err)
            }
            Error::ParseTemplate { name, err } => {
                write!(f, "parsing template ({}): {}", name, err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::OpenFile { path: _, err } => Some(err),
            Error::Manifest { path: _, err } => Some(err),
            Error::ParseTemplate { .. } => None,
        }
    }
}
