//! Two-pass parser for `git log --pretty=raw` output.
//!
//! The first pass folds classified lines into commit records, interning
//! developers as it goes. Parent lines naming a commit that has not been seen
//! yet are stored as placeholders. The second pass
//! ([`CommitGraph::resolve_parents`]) links those placeholders once every
//! commit is known.

use std::collections::HashMap;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::graph::CommitGraph;
use crate::ident::{self, DeveloperInterner};
use crate::line::{Line, classify_lines};
use crate::model::{Commit, CommitId, DeveloperId, Parent};

/// Parse a complete raw log into a resolved commit graph.
pub fn parse(text: &str) -> Result<CommitGraph, Error> {
    Parser::new().parse(text)
}

/// Header keywords the parser acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    /// Starts a new record.
    Commit,

    /// Updates the open record.
    Field(Field),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Author,
    Committer,
    Parent,
    Tree,
}

impl Keyword {
    fn lookup(keyword: &str) -> Option<Self> {
        match keyword {
            "commit" => Some(Self::Commit),
            "author" => Some(Self::Field(Field::Author)),
            "committer" => Some(Self::Field(Field::Committer)),
            "parent" => Some(Self::Field(Field::Parent)),
            "tree" => Some(Self::Field(Field::Tree)),
            _ => None,
        }
    }
}

/// Where the parser is within the current record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    /// No commit is open.
    #[default]
    Idle,

    /// Header lines update the open commit.
    Headers,

    /// A blank line ended the headers; indented lines are message text.
    Message,
}

/// Developers registered under their composite key, in first-seen order.
#[derive(Debug, Default)]
struct Registry {
    by_key: HashMap<String, DeveloperId>,
    order: Vec<DeveloperId>,
}

impl Registry {
    /// Register `id` under `key` unless the key is taken; return the
    /// registered developer.
    fn register(&mut self, key: String, id: DeveloperId) -> DeveloperId {
        *self.by_key.entry(key).or_insert_with(|| {
            self.order.push(id);
            id
        })
    }
}

/// Parse session state.
///
/// A `Parser` can be reused; every call to [`Parser::parse`] starts from a
/// clean slate. Independent parsers share nothing.
#[derive(Debug, Default)]
pub struct Parser {
    state: State,
    current: Option<Commit>,
    commits: Vec<Commit>,
    by_hash: HashMap<String, CommitId>,
    developers: DeveloperInterner,
    authors: Registry,
    committers: Registry,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard results of any earlier parse.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Parse the full text of a raw history into a resolved graph.
    ///
    /// Lines that cannot be classified and unknown header keywords are
    /// logged and skipped. A developer line without an email, or a header
    /// that appears before any `commit` line, aborts the parse.
    pub fn parse(&mut self, text: &str) -> Result<CommitGraph, Error> {
        self.clear();
        let start = Instant::now();
        info!("Parsing Git history");

        let result = self.fold_lines(text);
        if result.is_err() {
            self.clear();
        }
        result?;

        self.close_commit();

        let mut graph = self.take_graph();
        graph.resolve_parents();

        info!(
            "Parsing complete: {} commits, {} authors, {} committers in {:.3}s",
            graph.len(),
            graph.author_count(),
            graph.committer_count(),
            start.elapsed().as_secs_f64()
        );
        Ok(graph)
    }

    fn fold_lines(&mut self, text: &str) -> Result<(), Error> {
        for (line_number, line) in classify_lines(text) {
            match line {
                Err(e) => warn!("Skipping line {line_number}: {e}"),
                Ok(Line::Blank) => {
                    if self.state == State::Headers {
                        self.state = State::Message;
                    } else if let (State::Message, Some(commit)) = (self.state, &mut self.current) {
                        commit.message.push('\n');
                    }
                }
                Ok(Line::Continuation(text)) => self.handle_continuation(line_number, text),
                Ok(Line::Header { keyword, content }) => {
                    debug!("Found key-value pair: {keyword} {content}");
                    self.handle_header(line_number, keyword, content)?;
                }
            }
        }
        Ok(())
    }

    fn handle_continuation(&mut self, line_number: usize, text: &str) {
        match (self.state, &mut self.current) {
            (State::Message, Some(commit)) => {
                let text = text
                    .strip_prefix("    ")
                    .or_else(|| text.strip_prefix(' '))
                    .unwrap_or(text);
                commit.message.push_str(text);
                commit.message.push('\n');
            }
            _ => debug!("Ignoring header continuation on line {line_number}"),
        }
    }

    fn handle_header(
        &mut self,
        line_number: usize,
        keyword: &str,
        content: &str,
    ) -> Result<(), Error> {
        let field = match Keyword::lookup(keyword) {
            Some(Keyword::Commit) => {
                self.close_commit();
                self.current = Some(Commit::new(content));
                self.state = State::Headers;
                return Ok(());
            }
            Some(Keyword::Field(field)) => field,
            None => {
                warn!("Ignoring unknown keyword {keyword} on line {line_number}");
                return Ok(());
            }
        };

        let Some(commit) = self.current.as_mut() else {
            return Err(Error::OrphanHeader {
                line_number,
                keyword: keyword.to_string(),
            });
        };

        match field {
            Field::Author | Field::Committer => {
                let malformed = |source| Error::MalformedDeveloperLine {
                    line_number,
                    line: format!("{keyword} {content}"),
                    source,
                };
                let sig = ident::split_signature(content).map_err(malformed)?;
                let id = self.developers.intern(sig.key).map_err(malformed)?;
                let composite_key = self.developers.get(id).composite_key();

                if field == Field::Author {
                    commit.author = Some(id);
                    commit.author_time = Some(sig.timestamp);
                    let registered = self.authors.register(composite_key, id);
                    self.developers
                        .get_mut(registered)
                        .record_commit(commit.hash());
                } else {
                    commit.committer = Some(id);
                    commit.committer_time = Some(sig.timestamp);
                    self.committers.register(composite_key, id);
                }
            }
            Field::Parent => {
                let parent = match self.by_hash.get(content) {
                    Some(id) => Parent::Resolved(*id),
                    None => Parent::Unresolved(content.to_string()),
                };
                commit.set_parent(content, parent);
            }
            Field::Tree => commit.tree = Some(content.to_string()),
        }
        Ok(())
    }

    /// Move the open commit, if any, into the registry.
    ///
    /// A later commit with the same hash replaces the earlier one in place.
    fn close_commit(&mut self) {
        self.state = State::Idle;
        let Some(mut commit) = self.current.take() else {
            return;
        };
        let trimmed = commit.message.trim_end().len();
        commit.message.truncate(trimmed);

        match self.by_hash.get(commit.hash()) {
            Some(id) => {
                debug!("Replacing earlier record for commit {}", commit.hash());
                self.commits[id.0] = commit;
            }
            None => {
                let id = CommitId(self.commits.len());
                self.by_hash.insert(commit.hash().to_string(), id);
                self.commits.push(commit);
            }
        }
    }

    fn take_graph(&mut self) -> CommitGraph {
        let Parser {
            commits,
            by_hash,
            developers,
            authors,
            committers,
            ..
        } = std::mem::take(self);
        CommitGraph::from_parts(
            commits,
            by_hash,
            developers.into_developers(),
            authors.order,
            committers.order,
        )
    }
}

/// Errors that abort a parse.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed developer line {line_number}: '{line}'")]
    MalformedDeveloperLine {
        line_number: usize,
        line: String,
        #[source]
        source: ident::Error,
    },

    #[error("line {line_number}: '{keyword}' appears before any commit line")]
    OrphanHeader { line_number: usize, keyword: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Timestamp;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    const TWO_COMMITS: &str = "\
commit def
tree t2
parent abc
author A B <a@x.com> 200 +0000
committer C D <c@x.com> 210 +0100

    Second commit

    With a body.

commit abc
tree t1
author A B <a@x.com> 100 +0000
committer A B <a@x.com> 100 +0000

    First commit
";

    #[test]
    fn single_commit() {
        let text = "\
commit abc
tree t1
author A B <a@x.com> 100 +0000
committer A B <a@x.com> 100 +0000

    msg
";
        let graph = parse(text).unwrap();

        assert_eq!(graph.len(), 1);
        let commit = graph.commit("abc").unwrap();
        assert_eq!(commit.hash(), "abc");
        assert_eq!(commit.tree.as_deref(), Some("t1"));
        assert_eq!(commit.parent_count(), 0);
        assert_eq!(commit.message, "msg");
        assert_eq!(commit.author_time, Some(Timestamp::new("100", "+0000")));

        let author = graph.author_of(commit).unwrap();
        assert_eq!(author.name, "A B");
        assert_eq!(author.email, "a@x.com");
        assert_eq!(commit.author, commit.committer);
    }

    #[test]
    fn empty_input() {
        let graph = parse("").unwrap();
        assert!(graph.is_empty());
        assert_eq!(graph.authors().count(), 0);
        assert_eq!(graph.committers().count(), 0);
    }

    #[test]
    fn parent_seen_before_its_commit_is_resolved() {
        let graph = parse(TWO_COMMITS).unwrap();
        let abc = graph.commit_id("abc").unwrap();
        let def = graph.commit("def").unwrap();
        assert_eq!(def.parent("abc"), Some(&Parent::Resolved(abc)));
        assert_eq!(graph.parents_of(def).next().map(Commit::hash), Some("abc"));
    }

    #[test]
    fn parent_seen_after_its_commit_is_linked_immediately() {
        let text = "commit abc\ntree t1\n\ncommit def\nparent abc\n";
        let graph = parse(text).unwrap();
        let abc = graph.commit_id("abc").unwrap();
        assert_eq!(
            graph.commit("def").unwrap().parent("abc"),
            Some(&Parent::Resolved(abc))
        );
    }

    #[test]
    fn parent_outside_history_stays_unresolved() {
        let graph = parse("commit def\nparent shallow\n").unwrap();
        assert_eq!(
            graph.commit("def").unwrap().parent("shallow"),
            Some(&Parent::Unresolved("shallow".into()))
        );
        assert_eq!(graph.external_parent_count(), 1);
    }

    #[test]
    fn commits_keep_log_order() {
        let graph = parse(TWO_COMMITS).unwrap();
        let hashes: Vec<_> = graph.commits().map(Commit::hash).collect();
        assert_eq!(hashes, vec!["def", "abc"]);
    }

    #[test]
    fn authors_are_interned() {
        let graph = parse(TWO_COMMITS).unwrap();
        let def = graph.commit("def").unwrap();
        let abc = graph.commit("abc").unwrap();
        assert_eq!(def.author, abc.author);

        let author = graph.author_with_name("A B").unwrap();
        assert_eq!(author.commits(), ["def", "abc"]);
        assert_eq!(graph.author_count(), 1);
    }

    #[test]
    fn committers_do_not_record_commits() {
        let graph = parse(TWO_COMMITS).unwrap();
        let keys: Vec<_> = graph.committers().map(|d| d.composite_key()).collect();
        assert_eq!(keys, vec!["C D <c@x.com>", "A B <a@x.com>"]);

        let committer = graph.committers().next().unwrap();
        assert!(committer.commits().is_empty());
        assert_eq!(graph.author_with_name("C D"), None);
    }

    #[test]
    fn author_and_committer_share_one_developer() {
        let graph = parse(TWO_COMMITS).unwrap();
        let abc = graph.commit("abc").unwrap();
        let committer = graph.committer_of(abc).unwrap();
        assert_eq!(committer.commits(), ["def", "abc"]);
    }

    #[test]
    fn message_body_is_unindented() {
        let graph = parse(TWO_COMMITS).unwrap();
        let def = graph.commit("def").unwrap();
        assert_eq!(def.message, "Second commit\n\nWith a body.");
        assert_eq!(def.subject(), "Second commit");
    }

    #[test]
    fn header_continuations_are_not_message() {
        let text = "\
commit abc
tree t1
gpgsig -----BEGIN PGP SIGNATURE-----
 iQEzBAABCAAdFiEE
 -----END PGP SIGNATURE-----
author A <a@x.com> 1 +0000

    Signed
";
        let graph = parse(text).unwrap();
        let commit = graph.commit("abc").unwrap();
        assert_eq!(commit.message, "Signed");
        assert!(commit.author.is_some());
    }

    #[test]
    fn duplicate_commit_overwrites_earlier_record() {
        let text = "commit abc\ntree old\n\ncommit other\n\ncommit abc\ntree new\n";
        let graph = parse(text).unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.commit("abc").unwrap().tree.as_deref(), Some("new"));
        let hashes: Vec<_> = graph.commits().map(Commit::hash).collect();
        assert_eq!(hashes, vec!["abc", "other"]);
    }

    #[test]
    fn unparseable_lines_are_skipped() {
        let text = "commit abc\ntree t1\nbogus\nbogus line without space\nencoding ISO-8859-1\n";
        let graph = parse(text).unwrap();
        let commit = graph.commit("abc").unwrap();
        assert_eq!(commit.tree.as_deref(), Some("t1"));
        assert_eq!(commit.author, None);
        assert_eq!(commit.parent_count(), 0);
        assert_eq!(commit.message, "");
    }

    #[test]
    fn developer_line_without_email_fails() {
        let text = "commit abc\nauthor A B 100 +0000\n";
        let err = parse(text).unwrap_err();
        match err {
            Error::MalformedDeveloperLine {
                line_number,
                ref line,
                ..
            } => {
                assert_eq!(line_number, 2);
                assert_eq!(line, "author A B 100 +0000");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn developer_line_without_timestamp_fails() {
        let err = parse("commit abc\ncommitter <a@x.com>\n").unwrap_err();
        let Error::MalformedDeveloperLine { line_number, .. } = err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(line_number, 2);
    }

    #[test]
    fn header_before_any_commit_fails() {
        let err = parse("tree t1\ncommit abc\n").unwrap_err();
        let message = err.to_string();
        let Error::OrphanHeader { line_number, .. } = err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(line_number, 1);
        assert_eq!(message, "line 1: 'tree' appears before any commit line");
    }

    #[test]
    fn parser_is_reusable() {
        let mut parser = Parser::new();
        let first = parser.parse(TWO_COMMITS).unwrap();
        let second = parser.parse("commit zzz\n").unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 1);
        assert_eq!(second.authors().count(), 0);
    }

    #[test]
    fn many_commits_by_one_author() {
        let mut text = String::new();
        for i in 0..20_000 {
            text.push_str(&format!("commit {i:040x}\n"));
            text.push_str(&format!("author A <a@x.com> {i} +0000\n\n"));
            text.push_str(&format!("    change {i}\n\n"));
        }
        let graph = parse(&text).unwrap();
        assert_eq!(graph.len(), 20_000);

        let author = graph.author_with_name("A").unwrap();
        let commits = author.commits();
        assert_eq!(commits.len(), 20_000);
        assert_eq!(commits[0], format!("{:040x}", 0));
        assert_eq!(commits[19_999], format!("{:040x}", 19_999));
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Parse `text` and return the result with everything logged at WARN.
    fn parse_logging_warnings(text: &str) -> (Result<CommitGraph, Error>, String) {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let result = tracing::subscriber::with_default(subscriber, || parse(text));

        let bytes = buffer.0.lock().unwrap().clone();
        (result, String::from_utf8(bytes).unwrap())
    }

    #[test]
    fn skipped_lines_are_logged() {
        let text = "commit abc\ntree t1\nbogus\nbogus line without space\n";
        let (result, logs) = parse_logging_warnings(text);
        assert_eq!(result.unwrap().len(), 1);

        let unclassified = "Skipping line 3: unrecognizable history line: bogus";
        let unknown = "Ignoring unknown keyword bogus on line 4";
        assert!(logs.contains("WARN"), "{logs}");
        assert!(logs.contains(unclassified), "{logs}");
        assert!(logs.contains(unknown), "{logs}");
        assert_eq!(logs.lines().count(), 2);
    }

    #[test]
    fn clean_log_warns_nothing() {
        let (result, logs) = parse_logging_warnings(TWO_COMMITS);
        assert_eq!(result.unwrap().len(), 2);
        assert_eq!(logs, "");
    }
}
