//! The host identifier type

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Opaque identifier naming this node
///
/// Generated identifiers are UUID v4 strings. Any non-empty token without
/// whitespace is valid; the reader rejects anything else found on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HostId(String);

/// Rejected input to [`HostId::parse`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseHostIdError {
    #[error("host identifier is empty")]
    Empty,

    #[error("host identifier contains whitespace")]
    Whitespace,
}

impl HostId {
    pub fn parse(s: &str) -> Result<Self, ParseHostIdError> {
        if s.is_empty() {
            return Err(ParseHostIdError::Empty);
        }
        if s.chars().any(char::is_whitespace) {
            return Err(ParseHostIdError::Whitespace);
        }
        Ok(Self(s.to_string()))
    }

    pub(crate) fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid.hyphenated().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for HostId {
    type Err = ParseHostIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for HostId {
    type Error = ParseHostIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<HostId> for String {
    fn from(id: HostId) -> Self {
        id.0
    }
}

impl AsRef<str> for HostId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
