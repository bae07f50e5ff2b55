//! Remote store abstraction
//!
//! Rows are plain JSON objects keyed by column name; every domain lives in
//! its own table and carries a `user_id` column. Mapping between rows and
//! local records lives in [`records`].

pub mod memory;
pub mod postgrest;
pub mod records;

use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::Domain;
use crate::error::RemoteError;

pub use memory::InMemoryRemoteStore;
pub use postgrest::PostgrestRemoteStore;
pub use records::RemoteRecord;

/// A remote row
pub type Row = Map<String, Value>;

/// Identifier of a remote row
pub type RemoteId = Uuid;

/// Identifier of an authenticated user
pub type UserId = Uuid;

/// Column/value pairs that identify a record without its id
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NaturalKey {
    columns: Vec<(&'static str, Value)>,
}

impl NaturalKey {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.columns.push((column, value.into()));
        self
    }

    pub fn columns(&self) -> &[(&'static str, Value)] {
        &self.columns
    }

    /// Whether a row carries every column of the key with an equal value
    pub fn matches(&self, row: &Row) -> bool {
        self.columns
            .iter()
            .all(|(column, value)| row.get(*column) == Some(value))
    }
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// All rows of a user, newest first by the domain's timestamp column
    async fn query_by_user(&self, domain: Domain, user_id: UserId) -> Result<Vec<Row>, RemoteError>;

    /// Insert a row, returning the id the remote assigned
    async fn insert(&self, domain: Domain, row: Row) -> Result<RemoteId, RemoteError>;

    async fn find_by_natural_key(
        &self,
        domain: Domain,
        user_id: UserId,
        key: &NaturalKey,
    ) -> Result<Option<RemoteId>, RemoteError>;

    async fn exists_by_natural_key(
        &self,
        domain: Domain,
        user_id: UserId,
        key: &NaturalKey,
    ) -> Result<bool, RemoteError> {
        Ok(self.find_by_natural_key(domain, user_id, key).await?.is_some())
    }

    async fn delete(&self, domain: Domain, user_id: UserId, id: RemoteId) -> Result<(), RemoteError>;

    /// Replace the single row a user owns in a singleton domain
    async fn upsert_singleton(
        &self,
        domain: Domain,
        user_id: UserId,
        row: Row,
    ) -> Result<RemoteId, RemoteError>;
}

/// Read the `id` column of a row
pub fn row_id(row: &Row) -> Result<RemoteId, RemoteError> {
    let raw = row
        .get("id")
        .and_then(Value::as_str)
        .ok_or(RemoteError::MissingField("id"))?;
    Uuid::parse_str(raw).map_err(|e| RemoteError::Decode(format!("invalid id {}: {}", raw, e)))
}
