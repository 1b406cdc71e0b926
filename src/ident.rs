//! Author/committer line grammar and developer interning.
//!
//! An identity line has the shape `<name> <email> <epoch> <tz>`, where the
//! name may contain spaces and the email is wrapped in angle brackets.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::model::{Developer, DeveloperId, Timestamp};

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<.*>").expect("email pattern should compile"));

/// The pieces of an identity line before the developer is looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature<'a> {
    /// `Name <email>` exactly as written; used as the intern key.
    pub key: &'a str,
    pub timestamp: Timestamp,
}

/// Errors from decomposing an identity line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("expected '<name> <email> <epoch> <tz>'")]
    MissingTimestamp,

    #[error("no angle-bracketed email in '{0}'")]
    MissingEmail(String),
}

/// Split the trailing epoch and timezone off an identity line.
pub fn split_signature(content: &str) -> Result<Signature<'_>, Error> {
    let mut parts = content.rsplitn(3, ' ');
    let timezone = parts.next().ok_or(Error::MissingTimestamp)?;
    let epoch = parts.next().ok_or(Error::MissingTimestamp)?;
    let key = parts.next().ok_or(Error::MissingTimestamp)?;
    Ok(Signature {
        key,
        timestamp: Timestamp::new(epoch, timezone),
    })
}

/// Build a developer from a `Name <email>` key.
///
/// The email is the first `<...>` span with its brackets removed. The name is
/// the key with ` <email>` cut out.
pub fn developer_from_key(key: &str) -> Result<Developer, Error> {
    let found = EMAIL
        .find(key)
        .ok_or_else(|| Error::MissingEmail(key.to_string()))?;
    let email = found.as_str().replace(['<', '>'], "");
    debug!("Found developer email {email}");
    let name = key.replace(&format!(" <{email}>"), "");
    debug!("Found developer name {name}");
    Ok(Developer::new(name, email))
}

/// Deduplicates developers by the key text they were written with.
///
/// Two lines whose `Name <email>` text differs in any byte produce two
/// developers.
#[derive(Debug, Default)]
pub struct DeveloperInterner {
    by_key: HashMap<String, DeveloperId>,
    developers: Vec<Developer>,
}

impl DeveloperInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the developer registered under `key`, creating it on first use.
    pub fn intern(&mut self, key: &str) -> Result<DeveloperId, Error> {
        if let Some(id) = self.by_key.get(key) {
            return Ok(*id);
        }
        let developer = developer_from_key(key)?;
        let id = DeveloperId(self.developers.len());
        self.developers.push(developer);
        self.by_key.insert(key.to_string(), id);
        Ok(id)
    }

    pub fn get(&self, id: DeveloperId) -> &Developer {
        &self.developers[id.0]
    }

    pub fn get_mut(&mut self, id: DeveloperId) -> &mut Developer {
        &mut self.developers[id.0]
    }

    pub fn len(&self) -> usize {
        self.developers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.developers.is_empty()
    }

    pub fn into_developers(self) -> Vec<Developer> {
        self.developers
    }
}
