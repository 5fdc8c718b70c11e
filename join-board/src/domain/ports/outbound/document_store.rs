//! Document store port (outbound).
//!
//! Defines the interface to the hosted JSON tree that holds tasks, contacts and users.
//! Paths are slash-separated node addresses such as `tasks/-Nx1/Subtasks/-17-abc`.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::BoardError;

/// A node read together with the version tag needed for a conditional write.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned {
    pub value: Option<Value>,
    pub etag: String,
}

/// Outbound port for the remote document store.
///
/// Writing `null` with `put` removes the node. Absent nodes read as `None`.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    async fn get(&self, path: &str) -> Result<Option<Value>, BoardError>;

    /// Read a node along with its current version tag.
    async fn get_versioned(&self, path: &str) -> Result<Versioned, BoardError>;

    /// Replace the node. Returns the value as stored.
    async fn put(&self, path: &str, value: &Value) -> Result<Value, BoardError>;

    /// Replace the node only if it still carries `etag`.
    ///
    /// Fails with [`BoardError::VersionMismatch`] if the node changed since it was read.
    async fn put_if_match(&self, path: &str, value: &Value, etag: &str)
        -> Result<Value, BoardError>;

    /// Merge the given top-level fields into the node.
    async fn patch(&self, path: &str, fields: &Value) -> Result<Value, BoardError>;

    /// Append a child under a store-generated key and return that key.
    async fn post(&self, path: &str, value: &Value) -> Result<String, BoardError>;

    async fn delete(&self, path: &str) -> Result<(), BoardError>;
}
