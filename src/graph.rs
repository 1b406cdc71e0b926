//! The resolved commit graph and its registries.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::model::{Commit, CommitId, Developer, DeveloperId, Parent};

/// Commits and developers produced by one parse.
///
/// Commits are kept in the order they were closed (log order). Authors and
/// committers are separate registries over one shared set of developers, so a
/// person who both authored and committed is a single [`Developer`].
#[derive(Debug, Default, Clone)]
pub struct CommitGraph {
    commits: Vec<Commit>,
    by_hash: HashMap<String, CommitId>,
    developers: Vec<Developer>,
    authors: Vec<DeveloperId>,
    committers: Vec<DeveloperId>,
}

impl CommitGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(
        commits: Vec<Commit>,
        by_hash: HashMap<String, CommitId>,
        developers: Vec<Developer>,
        authors: Vec<DeveloperId>,
        committers: Vec<DeveloperId>,
    ) -> Self {
        Self {
            commits,
            by_hash,
            developers,
            authors,
            committers,
        }
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// All commits in log order.
    pub fn commits(&self) -> impl Iterator<Item = &Commit> {
        self.commits.iter()
    }

    pub fn commit(&self, hash: &str) -> Option<&Commit> {
        self.commit_id(hash).map(|id| self.get(id))
    }

    pub fn commit_id(&self, hash: &str) -> Option<CommitId> {
        self.by_hash.get(hash).copied()
    }

    /// Panics if `id` did not come from this graph.
    pub fn get(&self, id: CommitId) -> &Commit {
        &self.commits[id.0]
    }

    pub fn developer(&self, id: DeveloperId) -> &Developer {
        &self.developers[id.0]
    }

    /// Developers that authored at least one commit, in first-seen order.
    pub fn authors(&self) -> impl Iterator<Item = &Developer> {
        self.authors.iter().map(|id| self.developer(*id))
    }

    /// Developers that committed at least one commit, in first-seen order.
    pub fn committers(&self) -> impl Iterator<Item = &Developer> {
        self.committers.iter().map(|id| self.developer(*id))
    }

    pub fn author_count(&self) -> usize {
        self.authors.len()
    }

    pub fn committer_count(&self) -> usize {
        self.committers.len()
    }

    pub fn author(&self, composite_key: &str) -> Option<&Developer> {
        self.authors()
            .find(|dev| dev.composite_key() == composite_key)
    }

    /// The first author, in first-seen order, whose name is exactly `name`.
    pub fn author_with_name(&self, name: &str) -> Option<&Developer> {
        self.authors().find(|dev| dev.name == name)
    }

    /// Commits authored by `developer`, in log order of first appearance.
    pub fn commits_by<'a>(&'a self, developer: &'a Developer) -> impl Iterator<Item = &'a Commit> {
        developer
            .commits()
            .iter()
            .filter_map(|hash| self.commit(hash))
    }

    pub fn author_of(&self, commit: &Commit) -> Option<&Developer> {
        commit.author.map(|id| self.developer(id))
    }

    pub fn committer_of(&self, commit: &Commit) -> Option<&Developer> {
        commit.committer.map(|id| self.developer(id))
    }

    /// Parents of `commit` that are part of this graph.
    pub fn parents_of<'a>(&'a self, commit: &'a Commit) -> impl Iterator<Item = &'a Commit> {
        commit
            .parents()
            .filter_map(|(_, parent)| parent.commit_id())
            .map(|id| self.get(id))
    }

    /// Commits that list `hash` as a parent.
    pub fn children_of<'a>(&'a self, hash: &'a str) -> impl Iterator<Item = &'a Commit> {
        self.commits
            .iter()
            .filter(move |commit| commit.parent(hash).is_some())
    }

    /// Commits with no parents at all.
    pub fn roots(&self) -> impl Iterator<Item = &Commit> {
        self.commits.iter().filter(|c| c.parent_count() == 0)
    }

    /// Number of parent links pointing outside the parsed history.
    pub fn external_parent_count(&self) -> usize {
        self.commits
            .iter()
            .map(|c| c.external_parents().count())
            .sum()
    }

    /// Replace every placeholder parent whose hash names a commit in this
    /// graph with a link to that commit.
    ///
    /// Placeholders for hashes not in the graph stay unresolved. Already
    /// resolved links are left alone, so running this again changes nothing.
    /// Returns the number of placeholders replaced.
    pub fn resolve_parents(&mut self) -> usize {
        let pending = self.external_parent_count();
        info!("Resolving {pending} commit parents");

        let by_hash = &self.by_hash;
        let mut resolved = 0;
        for commit in &mut self.commits {
            for parent in commit.parents_mut() {
                let Parent::Unresolved(hash) = parent else {
                    continue;
                };
                if let Some(id) = by_hash.get(hash.as_str()) {
                    debug!("Replacing parent key {hash} with actual commit");
                    *parent = Parent::Resolved(*id);
                    resolved += 1;
                }
            }
        }

        if resolved < pending {
            let external = pending - resolved;
            info!("{external} parents lie outside the parsed history");
        }
        resolved
    }
}
