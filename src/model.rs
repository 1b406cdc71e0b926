//! Commit, developer and timestamp types.

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset};

/// Index of a commit within a [`CommitGraph`](crate::CommitGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommitId(pub(crate) usize);

impl CommitId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Index of a developer within a [`CommitGraph`](crate::CommitGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeveloperId(pub(crate) usize);

impl DeveloperId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// The time recorded on an author or committer line.
///
/// Both fields are kept exactly as they appeared in the log.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Timestamp {
    pub epoch: String,
    pub timezone: String,
}

impl Timestamp {
    pub fn new(epoch: impl Into<String>, timezone: impl Into<String>) -> Self {
        Self {
            epoch: epoch.into(),
            timezone: timezone.into(),
        }
    }

    /// Seconds since the Unix epoch, if the epoch text is an integer.
    pub fn seconds(&self) -> Option<i64> {
        self.epoch.parse().ok()
    }

    /// Offset from UTC in seconds, parsed from `+HHMM` / `-HHMM`.
    pub fn offset_seconds(&self) -> Option<i32> {
        let tz = self.timezone.as_bytes();
        if tz.len() != 5 || !tz[1..].iter().all(u8::is_ascii_digit) {
            return None;
        }
        let sign = match tz[0] {
            b'+' => 1,
            b'-' => -1,
            _ => return None,
        };
        let hours: i32 = self.timezone[1..3].parse().ok()?;
        let minutes: i32 = self.timezone[3..5].parse().ok()?;
        Some(sign * (hours * 3600 + minutes * 60))
    }

    /// The recorded instant in its recorded offset.
    pub fn to_datetime(&self) -> Option<DateTime<FixedOffset>> {
        let offset = FixedOffset::east_opt(self.offset_seconds()?)?;
        let utc = DateTime::from_timestamp(self.seconds()?, 0)?;
        Some(utc.with_timezone(&offset))
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S %z")),
            None => write!(f, "{} {}", self.epoch, self.timezone),
        }
    }
}

/// A person appearing as author and/or committer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Developer {
    pub name: String,
    pub email: String,

    /// Hashes of the commits this developer authored, in log order.
    pub(crate) commits: Vec<String>,
    seen: HashSet<String>,
}

impl Developer {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            commits: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// The `Name <email>` key developers are registered under.
    pub fn composite_key(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }

    /// Hashes of authored commits. Committer-ship is not recorded here.
    pub fn commits(&self) -> &[String] {
        &self.commits
    }

    pub(crate) fn record_commit(&mut self, hash: &str) {
        if !self.seen.contains(hash) {
            self.seen.insert(hash.to_string());
            self.commits.push(hash.to_string());
        }
    }
}

impl std::fmt::Display for Developer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// A link from a commit to one of its parents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Parent {
    /// The parent has not been linked to a parsed commit. After resolution
    /// this means the parent lies outside the parsed history.
    Unresolved(String),

    /// The parent is a commit in the same graph.
    Resolved(CommitId),
}

impl Parent {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Parent::Resolved(_))
    }

    pub fn commit_id(&self) -> Option<CommitId> {
        match self {
            Parent::Resolved(id) => Some(*id),
            Parent::Unresolved(_) => None,
        }
    }
}

/// A single commit record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    hash: String,
    pub author: Option<DeveloperId>,
    pub author_time: Option<Timestamp>,
    pub committer: Option<DeveloperId>,
    pub committer_time: Option<Timestamp>,
    pub tree: Option<String>,
    pub message: String,
    parents: Vec<(String, Parent)>,
}

impl Commit {
    pub fn new(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            author: None,
            author_time: None,
            committer: None,
            committer_time: None,
            tree: None,
            message: String::new(),
            parents: Vec::new(),
        }
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// First line of the message.
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    /// Parent links keyed by parent hash, first parent first.
    pub fn parents(&self) -> impl Iterator<Item = (&str, &Parent)> {
        self.parents.iter().map(|(hash, p)| (hash.as_str(), p))
    }

    pub fn parent(&self, hash: &str) -> Option<&Parent> {
        self.parents
            .iter()
            .find_map(|(h, p)| (h == hash).then_some(p))
    }

    pub fn parent_count(&self) -> usize {
        self.parents.len()
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// Hashes of parents that did not resolve to a parsed commit.
    pub fn external_parents(&self) -> impl Iterator<Item = &str> {
        self.parents.iter().filter_map(|(_, p)| match p {
            Parent::Unresolved(hash) => Some(hash.as_str()),
            Parent::Resolved(_) => None,
        })
    }

    /// Set the link for `hash`, replacing any earlier link for the same hash.
    pub(crate) fn set_parent(&mut self, hash: &str, parent: Parent) {
        match self.parents.iter_mut().find(|(h, _)| h == hash) {
            Some((_, slot)) => *slot = parent,
            None => self.parents.push((hash.to_string(), parent)),
        }
    }

    pub(crate) fn parents_mut(&mut self) -> impl Iterator<Item = &mut Parent> {
        self.parents.iter_mut().map(|(_, p)| p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn timestamp_to_datetime() {
        let ts = Timestamp::new("1700000000", "-0500");
        assert_eq!(ts.seconds(), Some(1_700_000_000));
        assert_eq!(ts.offset_seconds(), Some(-5 * 3600));
        let dt = ts.to_datetime().unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
        assert_eq!(dt.to_rfc3339(), "2023-11-14T17:13:20-05:00");
    }

    #[test]
    fn timestamp_keeps_unparseable_text() {
        let ts = Timestamp::new("soon", "UTC");
        assert_eq!(ts.seconds(), None);
        assert_eq!(ts.offset_seconds(), None);
        assert_eq!(ts.to_datetime(), None);
        assert_eq!(ts.to_string(), "soon UTC");
    }

    #[test]
    fn composite_key() {
        let dev = Developer::new("A B", "a@x.com");
        assert_eq!(dev.composite_key(), "A B <a@x.com>");
        assert_eq!(dev.to_string(), dev.composite_key());
    }

    #[test]
    fn developer_records_each_commit_once() {
        let mut dev = Developer::new("A", "a@x.com");
        dev.record_commit("abc");
        dev.record_commit("def");
        dev.record_commit("abc");
        assert_eq!(dev.commits(), ["abc", "def"]);
    }

    #[test]
    fn set_parent_overwrites_same_hash() {
        let mut commit = Commit::new("c");
        commit.set_parent("p1", Parent::Unresolved("p1".into()));
        commit.set_parent("p2", Parent::Unresolved("p2".into()));
        commit.set_parent("p1", Parent::Resolved(CommitId(0)));

        let parents: Vec<_> = commit.parents().collect();
        assert_eq!(
            parents,
            vec![
                ("p1", &Parent::Resolved(CommitId(0))),
                ("p2", &Parent::Unresolved("p2".into())),
            ]
        );
        assert!(commit.is_merge());
        assert_eq!(commit.external_parents().collect::<Vec<_>>(), vec!["p2"]);
    }

    #[test]
    fn subject_is_first_message_line() {
        let mut commit = Commit::new("c");
        assert_eq!(commit.subject(), "");
        commit.message = "Fix parser\n\nLonger body.".into();
        assert_eq!(commit.subject(), "Fix parser");
    }
}
