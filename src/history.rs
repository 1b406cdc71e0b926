//! The complete history of a single repository.

use std::path::{Component, Path, PathBuf};

use tracing::info;

use crate::config::Config;
use crate::git::{self, Git, LogSource};
use crate::graph::CommitGraph;
use crate::model::{Commit, Developer};
use crate::parse;

/// A parsed, fully linked repository history.
///
/// Only local paths are supported; remote URLs are not.
#[derive(Debug, Clone)]
pub struct History {
    path: PathBuf,
    graph: CommitGraph,
}

impl History {
    /// Read the history of the repository at `path` using the `git` binary.
    pub fn open(path: impl AsRef<Path>, config: &Config) -> Result<Self, Error> {
        Self::with_source(path, &Git::from_config(config))
    }

    /// Read the history of the repository at `path` from `source`.
    pub fn with_source(path: impl AsRef<Path>, source: &dyn LogSource) -> Result<Self, Error> {
        let path = normalize_path(path.as_ref());
        info!("Reading history of {}", path.display());
        let text = source.raw_log(&path)?;
        Self::from_text(path, &text)
    }

    /// Build a history from log text that has already been captured.
    pub fn from_text(path: impl Into<PathBuf>, text: &str) -> Result<Self, Error> {
        let path = path.into();
        let graph = parse::parse(text)?;
        info!(
            "History of {}: {} commits, {} authors, {} committers",
            path.display(),
            graph.len(),
            graph.author_count(),
            graph.committer_count()
        );
        Ok(Self { path, graph })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn graph(&self) -> &CommitGraph {
        &self.graph
    }

    pub fn into_graph(self) -> CommitGraph {
        self.graph
    }

    pub fn commits(&self) -> impl Iterator<Item = &Commit> {
        self.graph.commits()
    }

    pub fn commit(&self, hash: &str) -> Option<&Commit> {
        self.graph.commit(hash)
    }

    pub fn authors(&self) -> impl Iterator<Item = &Developer> {
        self.graph.authors()
    }

    pub fn committers(&self) -> impl Iterator<Item = &Developer> {
        self.graph.committers()
    }

    pub fn author_with_name(&self, name: &str) -> Option<&Developer> {
        self.graph.author_with_name(name)
    }
}

/// Expand a leading `~` and lexically drop `.` and `..` components.
///
/// The filesystem is not consulted, so symlinks are not resolved. `..` at the
/// start of a relative path is kept.
pub fn normalize_path(path: &Path) -> PathBuf {
    let expanded = match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    };

    let mut out = PathBuf::new();
    for component in expanded.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Errors from building a [`History`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read history")]
    Source(#[from] git::Error),

    #[error("failed to parse history")]
    Parse(#[from] parse::Error),
}
