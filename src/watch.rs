//! Polls the posts directory and rebuilds the site when it changes.
//!
//! Each poll computes a cheap [`signal`] for the directory (file names, sizes
//! and modification times) and calls the rebuild function only when the
//! signal differs from the last one observed. A failed rebuild is logged and
//! the loop carries on; whatever the last successful build wrote stays in
//! place.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Where the loop is in its cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// The last build succeeded, or none has run yet.
    Idle,

    /// A rebuild is in progress.
    Building,

    /// The last build failed. The next change triggers another attempt.
    Failed,
}

/// The outcome of a single [`WatchLoop::poll`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Poll {
    Unchanged,
    Rebuilt,
    Failed,
}

/// Rebuilds the site whenever the posts directory changes.
pub struct WatchLoop<F> {
    posts_directory: PathBuf,
    interval: Duration,
    rebuild: F,
    last_signal: Option<u64>,
    state: State,
}

impl<F, E> WatchLoop<F>
where
    F: FnMut() -> Result<(), E>,
    E: fmt::Display,
{
    /// Creates a loop over `posts_directory`. The directory's current state
    /// is recorded immediately, so the first poll only rebuilds if something
    /// changes after this call.
    pub fn new(posts_directory: &Path, interval: Duration, rebuild: F) -> WatchLoop<F> {
        WatchLoop {
            posts_directory: posts_directory.to_owned(),
            interval,
            rebuild,
            last_signal: signal(posts_directory).ok(),
            state: State::Idle,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Checks the posts directory once and rebuilds if it changed. The new
    /// signal is recorded even when the rebuild fails, so broken input isn't
    /// rebuilt again until it is edited.
    pub fn poll(&mut self) -> Poll {
        let current = match signal(&self.posts_directory) {
            Ok(current) => current,
            Err(err) => {
                warn!(
                    directory = %self.posts_directory.display(),
                    error = %err,
                    "can't read posts directory"
                );
                return Poll::Unchanged;
            }
        };
        if self.last_signal == Some(current) {
            return Poll::Unchanged;
        }
        self.last_signal = Some(current);

        info!("change detected, rebuilding");
        self.state = State::Building;
        match (self.rebuild)() {
            Ok(()) => {
                self.state = State::Idle;
                Poll::Rebuilt
            }
            Err(err) => {
                error!("{}", err);
                self.state = State::Failed;
                Poll::Failed
            }
        }
    }

    /// Polls forever, sleeping for the configured interval between polls.
    /// Meant to run on its own thread.
    pub fn run(mut self) {
        debug!(interval = ?self.interval, "watching for changes");
        loop {
            std::thread::sleep(self.interval);
            self.poll();
        }
    }
}

/// Hashes the name, size and modification time of every entry directly
/// inside `dir`, in file name order.
pub fn signal(dir: &Path) -> io::Result<u64> {
    let mut hasher = DefaultHasher::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
    {
        let entry = entry?;
        let metadata = entry.metadata()?;
        entry.file_name().hash(&mut hasher);
        metadata.len().hash(&mut hasher);
        metadata.modified().ok().hash(&mut hasher);
    }
    Ok(hasher.finish())
}
