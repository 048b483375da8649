//! Discovery predicates
//!
//! A query is a conjunction of `key='value'` clauses, e.g.
//! `type='EEG' and name='MyStream'`. The empty query matches every stream.

use crate::StreamDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use std::str::FromStr;

/// Property a clause can test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum QueryKey {
    Name,
    Type,
    SourceId,
    Uid,
    Hostname,
    ChannelCount,
    ChannelFormat,
}

impl QueryKey {
    fn parse(key: &str) -> Option<Self> {
        match key {
            "name" => Some(QueryKey::Name),
            "type" => Some(QueryKey::Type),
            "source_id" => Some(QueryKey::SourceId),
            "uid" => Some(QueryKey::Uid),
            "hostname" => Some(QueryKey::Hostname),
            "channel_count" => Some(QueryKey::ChannelCount),
            "channel_format" => Some(QueryKey::ChannelFormat),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            QueryKey::Name => "name",
            QueryKey::Type => "type",
            QueryKey::SourceId => "source_id",
            QueryKey::Uid => "uid",
            QueryKey::Hostname => "hostname",
            QueryKey::ChannelCount => "channel_count",
            QueryKey::ChannelFormat => "channel_format",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Clause {
    key: QueryKey,
    value: String,
}

impl Clause {
    fn matches(&self, descriptor: &StreamDescriptor) -> bool {
        match self.key {
            QueryKey::Name => descriptor.name() == self.value,
            QueryKey::Type => descriptor.content_type() == self.value,
            QueryKey::SourceId => descriptor.source_id() == self.value,
            QueryKey::Uid => descriptor.uid() == self.value,
            QueryKey::Hostname => descriptor.hostname() == self.value,
            QueryKey::ChannelCount => self
                .value
                .parse::<usize>()
                .map(|n| n == descriptor.channel_count())
                .unwrap_or(false),
            QueryKey::ChannelFormat => descriptor.channel_format().name() == self.value,
        }
    }
}

/// Predicate over [`StreamDescriptor`] properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamQuery {
    clauses: Vec<Clause>,
}

impl StreamQuery {
    /// Query matching every stream
    pub fn any() -> Self {
        Self::default()
    }

    /// Query matching a single stream by uid
    pub fn by_uid(uid: impl Into<String>) -> Self {
        Self {
            clauses: vec![Clause {
                key: QueryKey::Uid,
                value: uid.into(),
            }],
        }
    }

    pub fn parse(text: &str) -> Result<Self, QueryParseError> {
        let mut clauses = Vec::new();
        let mut rest = text.trim();

        while !rest.is_empty() {
            let eq = rest
                .find('=')
                .ok_or_else(|| QueryParseError::new(text, "expected key=value"))?;
            let key_text = rest[..eq].trim();
            let key = QueryKey::parse(key_text).ok_or_else(|| {
                QueryParseError::new(text, &format!("unknown property '{}'", key_text))
            })?;

            let after_eq = rest[eq + 1..].trim_start();
            let (value, remainder) = match after_eq.chars().next() {
                Some(quote @ ('\'' | '"')) => {
                    let body = &after_eq[1..];
                    let end = body
                        .find(quote)
                        .ok_or_else(|| QueryParseError::new(text, "unterminated quoted value"))?;
                    (body[..end].to_string(), &body[end + 1..])
                }
                Some(_) => {
                    let end = after_eq.find(char::is_whitespace).unwrap_or(after_eq.len());
                    (after_eq[..end].to_string(), &after_eq[end..])
                }
                None => return Err(QueryParseError::new(text, "missing value")),
            };
            clauses.push(Clause { key, value });

            let remainder = remainder.trim_start();
            if remainder.is_empty() {
                break;
            }
            rest = strip_and(remainder)
                .ok_or_else(|| QueryParseError::new(text, "clauses must be joined with 'and'"))?;
            if rest.is_empty() {
                return Err(QueryParseError::new(text, "dangling 'and'"));
            }
        }

        Ok(Self { clauses })
    }

    pub fn matches(&self, descriptor: &StreamDescriptor) -> bool {
        self.clauses.iter().all(|c| c.matches(descriptor))
    }

    pub fn is_any(&self) -> bool {
        self.clauses.is_empty()
    }
}

fn strip_and(text: &str) -> Option<&str> {
    let head = text.get(..3)?;
    if head.eq_ignore_ascii_case("and") && text[3..].starts_with(char::is_whitespace) {
        Some(text[3..].trim_start())
    } else {
        None
    }
}

impl FromStr for StreamQuery {
    type Err = QueryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for StreamQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .clauses
            .iter()
            .map(|c| {
                if c.value.contains('\'') {
                    format!("{}=\"{}\"", c.key.as_str(), c.value)
                } else {
                    format!("{}='{}'", c.key.as_str(), c.value)
                }
            })
            .collect();
        f.write_str(&parts.join(" and "))
    }
}

/// A query string that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid stream query \"{query}\": {reason}")]
pub struct QueryParseError {
    pub query: String,
    pub reason: String,
}

impl QueryParseError {
    fn new(query: &str, reason: &str) -> Self {
        Self {
            query: query.to_string(),
            reason: reason.to_string(),
        }
    }
}
