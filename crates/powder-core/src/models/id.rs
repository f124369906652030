//! Entity identifiers
//!
//! An id is either minted on this device (`Temporary`, tagged with its entity
//! kind) or issued by the remote store (`Authoritative`). The distinction
//! drives insert-vs-update at the gateway, so it is a variant, not a string
//! convention callers have to re-check.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

static TEMPORARY_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(resort|trip)_([0-9A-Za-z_]+)$").expect("Invalid regex"));

/// The kind of record an id belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Resort,
    Trip,
}

impl EntityKind {
    /// Tag used at the front of temporary ids
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Resort => "resort",
            Self::Trip => "trip",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "resort" => Some(Self::Resort),
            "trip" => Some(Self::Trip),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resort => f.write_str("Resort"),
            Self::Trip => f.write_str("Trip"),
        }
    }
}

/// Rejected identifier text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("identifier must not be empty")]
pub struct InvalidIdError;

/// A resort or trip identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum EntityId {
    /// Minted locally, not yet known to the remote store
    Temporary { kind: EntityKind, token: String },
    /// Issued by the remote store on create
    Authoritative(String),
}

impl EntityId {
    /// Mint a new temporary id for `kind`.
    ///
    /// The token is a random component followed by the current time in
    /// milliseconds, both hex encoded.
    #[must_use]
    pub fn mint(kind: EntityKind) -> Self {
        let random = Uuid::new_v4().as_u128() & 0xffff_ffff_ffff;
        let millis = chrono::Utc::now().timestamp_millis();
        Self::Temporary {
            kind,
            token: format!("{random:x}_{millis:x}"),
        }
    }

    /// Wrap a server-issued id.
    pub fn authoritative(value: impl Into<String>) -> Self {
        Self::Authoritative(value.into())
    }

    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary { .. })
    }

    /// Entity kind of a temporary id; authoritative ids are opaque.
    #[must_use]
    pub const fn temporary_kind(&self) -> Option<EntityKind> {
        match self {
            Self::Temporary { kind, .. } => Some(*kind),
            Self::Authoritative(_) => None,
        }
    }

    /// The server-issued value, if this id has been reconciled.
    #[must_use]
    pub fn as_authoritative(&self) -> Option<&str> {
        match self {
            Self::Authoritative(value) => Some(value),
            Self::Temporary { .. } => None,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temporary { kind, token } => write!(f, "{}_{token}", kind.prefix()),
            Self::Authoritative(value) => f.write_str(value),
        }
    }
}

impl FromStr for EntityId {
    type Err = InvalidIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(InvalidIdError);
        }

        if let Some(caps) = TEMPORARY_ID.captures(s) {
            if let Some(kind) = EntityKind::from_prefix(&caps[1]) {
                return Ok(Self::Temporary {
                    kind,
                    token: caps[2].to_string(),
                });
            }
        }

        Ok(Self::Authoritative(s.to_string()))
    }
}

impl TryFrom<String> for EntityId {
    type Error = InvalidIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EntityId> for String {
    fn from(value: EntityId) -> Self {
        value.to_string()
    }
}
