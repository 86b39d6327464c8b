use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// The name of the project file searched for by [`Config::from_directory`].
pub const PROJECT_FILE: &str = "scriven.yaml";

const DEFAULT_TITLE: &str = "Untitled";
const DEFAULT_BASE_URL: &str = "http://localhost:8000/";

#[derive(Deserialize)]
#[serde(default)]
struct Project {
    title: String,
    base_url: Option<Url>,
    description: String,
    posts_directory: PathBuf,
    output_directory: PathBuf,
    static_directory: PathBuf,
    theme_directory: Option<PathBuf>,
    server: Server,
}

impl Default for Project {
    fn default() -> Self {
        Project {
            title: DEFAULT_TITLE.to_owned(),
            base_url: None,
            description: String::new(),
            posts_directory: PathBuf::from("posts"),
            output_directory: PathBuf::from("dist"),
            static_directory: PathBuf::from("static"),
            theme_directory: None,
            server: Server::default(),
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct Server {
    address: IpAddr,
    port: u16,
    poll_interval_ms: u64,
}

impl Default for Server {
    fn default() -> Self {
        Server {
            address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8000,
            poll_interval_ms: 500,
        }
    }
}

/// Site-wide metadata shown on every page and in the feed.
#[derive(Clone, Debug)]
pub struct Site {
    pub title: String,

    /// Always ends with `/`.
    pub base_url: Url,

    pub description: String,
}

/// Settings for `serve`.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub address: IpAddr,
    pub port: u16,

    /// How often the watch loop checks the posts directory for changes.
    pub poll_interval: Duration,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}

/// Fully resolved configuration. Every path is absolute or relative to the
/// directory the project file was found in.
#[derive(Clone, Debug)]
pub struct Config {
    pub site: Site,
    pub posts_directory: PathBuf,
    pub output_directory: PathBuf,
    pub static_directory: PathBuf,

    /// `None` selects the built-in theme.
    pub theme_directory: Option<PathBuf>,

    pub server: ServerConfig,
}

impl Config {
    /// Looks for `scriven.yaml` in `dir` and then in each of its parents.
    /// Without a project file, every setting takes its default and paths are
    /// relative to `dir`.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        let dir = dir
            .canonicalize()
            .with_context(|| format!("Resolving directory `{}`", dir.display()))?;
        for candidate in dir.ancestors() {
            let path = candidate.join(PROJECT_FILE);
            if path.is_file() {
                debug!(path = %path.display(), "found project file");
                return Config::from_project_file(&path);
            }
        }
        warn!(
            directory = %dir.display(),
            "no `{}` found in any parent directory; using defaults",
            PROJECT_FILE
        );
        Config::from_project(Project::default(), &dir)
    }

    /// Loads the project file at `path`.
    pub fn from_project_file(path: &Path) -> Result<Config> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Opening project file `{}`", path.display()))?;
        let project: Project = match contents.trim().is_empty() {
            true => Project::default(),
            false => serde_yaml::from_str(&contents)
                .with_context(|| format!("Loading configuration `{}`", path.display()))?,
        };
        let project_root = path.parent().ok_or_else(|| {
            anyhow!(
                "Can't get parent directory for project file path `{}`",
                path.display()
            )
        })?;
        Config::from_project(project, project_root)
            .with_context(|| format!("Loading configuration `{}`", path.display()))
    }

    fn from_project(project: Project, project_root: &Path) -> Result<Config> {
        if project.server.poll_interval_ms == 0 {
            bail!("`server.poll_interval_ms` must be at least 1");
        }
        let base_url = match project.base_url {
            Some(url) => url,
            None => Url::parse(DEFAULT_BASE_URL)?,
        };
        Ok(Config {
            site: Site {
                title: project.title,
                base_url: with_trailing_slash(base_url),
                description: project.description,
            },
            posts_directory: project_root.join(project.posts_directory),
            output_directory: project_root.join(project.output_directory),
            static_directory: project_root.join(project.static_directory),
            theme_directory: project.theme_directory.map(|dir| project_root.join(dir)),
            server: ServerConfig {
                address: project.server.address,
                port: project.server.port,
                poll_interval: Duration::from_millis(project.server.poll_interval_ms),
            },
        })
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
