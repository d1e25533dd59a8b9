//! `<domain>.<object_id>` entity identifiers

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid entity id '{id}': {reason}")]
pub struct EntityIdError {
    pub id: String,
    pub reason: &'static str,
}

/// A validated entity id such as `cover.40a1b2`
///
/// Both parts are non-empty lowercase `[a-z0-9_]` and may not start or end
/// with `_`. The domain may not contain `__`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityId {
    id: String,
    dot: usize,
}

impl EntityId {
    pub fn domain(&self) -> &str {
        &self.id[..self.dot]
    }

    pub fn object_id(&self) -> &str {
        &self.id[self.dot + 1..]
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }
}

fn check_part(part: &str) -> Result<(), &'static str> {
    if part.is_empty() {
        return Err("empty domain or object id");
    }
    if part.starts_with('_') || part.ends_with('_') {
        return Err("parts may not start or end with '_'");
    }
    if !part
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
    {
        return Err("only lowercase letters, digits and '_' are allowed");
    }
    Ok(())
}

impl FromStr for EntityId {
    type Err = EntityIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| EntityIdError {
            id: s.to_string(),
            reason,
        };

        let dot = match s.find('.') {
            Some(dot) if s[dot + 1..].find('.').is_none() => dot,
            _ => return Err(invalid("expected exactly one '.'")),
        };
        let (domain, object_id) = (&s[..dot], &s[dot + 1..]);

        check_part(domain).map_err(invalid)?;
        check_part(object_id).map_err(invalid)?;
        if domain.contains("__") {
            return Err(invalid("domain may not contain '__'"));
        }

        Ok(Self {
            id: s.to_string(),
            dot,
        })
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}
