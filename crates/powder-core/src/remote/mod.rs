//! Remote data gateway boundary
//!
//! The sync engine talks to the remote relational store only through
//! [`RemoteGateway`]. Rows use the store's flat snake_case field names; the
//! [`rows`] layer maps them to and from the cached entities.

mod postgrest;
pub mod rows;

pub use postgrest::PostgrestGateway;
pub use rows::{ResortRow, TripRow};

use std::fmt;

use thiserror::Error;

use crate::models::EntityKind;

/// A remote row: flat field name to JSON value
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Remote table holding one entity kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Resorts,
    Trips,
}

impl Collection {
    #[must_use]
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::Resorts => "resorts",
            Self::Trips => "trips",
        }
    }

    #[must_use]
    pub const fn for_kind(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Resort => Self::Resorts,
            EntityKind::Trip => Self::Trips,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// The group/tenant every remote read and write is filtered by
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope(String);

impl Scope {
    /// Returns `None` for a blank group id.
    pub fn new(group_id: impl Into<String>) -> Option<Self> {
        let group_id = group_id.into().trim().to_string();
        if group_id.is_empty() {
            None
        } else {
            Some(Self(group_id))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Invalid remote configuration: {0}")]
    InvalidConfiguration(String),
    #[error("No signed-in session for remote request")]
    Unauthenticated,
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Remote API error: {0}")]
    Api(String),
    #[error("Invalid remote payload: {0}")]
    InvalidPayload(String),
    #[error("Failed to encode row: {0}")]
    Json(#[from] serde_json::Error),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// CRUD access to the remote collections.
///
/// Every failure (network, policy, constraint) is reported as a
/// [`RemoteError`]; the caller decides whether it is fatal.
#[allow(async_fn_in_trait)]
pub trait RemoteGateway {
    /// Insert a row and return it as stored, including its assigned `id`.
    async fn create(&self, collection: Collection, row: Row) -> RemoteResult<Row>;

    /// Update the row keyed by `id`.
    async fn update(&self, collection: Collection, id: &str, row: Row) -> RemoteResult<()>;

    /// Delete the row keyed by `id`.
    async fn delete(&self, collection: Collection, id: &str) -> RemoteResult<()>;

    /// Every row of `collection` within `scope`.
    async fn list(&self, collection: Collection, scope: &Scope) -> RemoteResult<Vec<Row>>;
}
