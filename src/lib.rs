//! Histgraph: parse raw git history into a linked graph of commits and developers.
//!
//! Histgraph reads the output of `git log --pretty=raw` and builds an
//! in-memory graph: every commit with its tree, author, committer, times,
//! message and parent links, plus the deduplicated set of developers.
//!
//! # Architecture
//!
//! - **Line**: classify raw lines as blank, continuation or header
//! - **Ident**: decompose author/committer lines and intern developers
//! - **Parse**: fold lines into commits, then resolve parent placeholders
//! - **Graph**: the resulting registries and queries over them
//! - **Git**: produce the raw log text with the `git` binary
//! - **History**: tie a repository path, a log source and a parse together

pub mod config;
pub mod git;
mod graph;
pub mod history;
pub mod ident;
pub mod line;
mod model;
pub mod parse;

pub use config::Config;
pub use git::{Git, LogSource};
pub use graph::CommitGraph;
pub use history::History;
pub use model::{Commit, CommitId, Developer, DeveloperId, Parent, Timestamp};
pub use parse::{Parser, parse};
