//! Producing raw history text with the `git` binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, debug_span};

use crate::config::Config;

/// Something that can produce `git log --pretty=raw` text for a repository.
pub trait LogSource {
    fn raw_log(&self, repo: &Path) -> Result<String, Error>;
}

/// Runs the `git` binary to read a repository's history.
#[derive(Debug, Clone)]
pub struct Git {
    program: String,
    log_args: Vec<String>,
}

impl Git {
    pub fn new() -> Self {
        Self::from_config(&Config::default())
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            program: config.git.clone(),
            log_args: config.log_args.clone(),
        }
    }

    fn git(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.stdin(Stdio::null());
        cmd
    }

    /// Find the root of the work tree containing `start`.
    pub fn discover(&self, start: &Path) -> Result<PathBuf, Error> {
        let output = self
            .git()
            .args(["rev-parse", "--show-toplevel"])
            .current_dir(start)
            .output()
            .map_err(|e| Error::Exec(format!("{} rev-parse: {e}", self.program)))?;

        if !output.status.success() {
            return Err(Error::NotARepo(start.display().to_string()));
        }

        let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(PathBuf::from(root))
    }

    /// The full raw log of the repository at `root`.
    ///
    /// Output is decoded as UTF-8, replacing invalid sequences.
    pub fn log(&self, root: &Path) -> Result<String, Error> {
        let mut args = vec!["log", "--pretty=raw"];
        args.extend(self.log_args.iter().map(String::as_str));
        self.run_output(root, &args)
    }

    /// Run a git command and capture its stdout.
    fn run_output(&self, dir: &Path, args: &[&str]) -> Result<String, Error> {
        let _span = debug_span!("git", "{}", args.join(" ")).entered();
        let mut cmd = self.git();
        cmd.args(args).current_dir(dir);
        debug!("{cmd:?}");

        let name = args.first().copied().unwrap_or("");
        let output = cmd
            .output()
            .map_err(|e| Error::Exec(format!("{} {name}: {e}", self.program)))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(Error::Failed {
                command: format!("{} {}", self.program, args.join(" ")),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

impl Default for Git {
    /// Equivalent to `Git::new()`
    fn default() -> Self {
        Self::new()
    }
}

impl LogSource for Git {
    fn raw_log(&self, repo: &Path) -> Result<String, Error> {
        let root = self.discover(repo)?;
        self.log(&root)
    }
}

/// Errors from git operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to execute: {0}")]
    Exec(String),

    #[error("not a git repository (searched from '{0}')")]
    NotARepo(String),

    #[error("`{command}` failed ({status}): {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}
