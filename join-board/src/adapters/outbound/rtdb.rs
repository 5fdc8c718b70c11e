use async_trait::async_trait;
use join_store::{ETag, StoreClient, StoreError};
use serde_json::Value;

use crate::domain::{
    ports::outbound::{DocumentStore, Versioned},
    BoardError,
};

/// Adapter that wraps the HTTP store client to implement the DocumentStore port.
pub struct RtdbStore {
    client: StoreClient,
}

impl RtdbStore {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DocumentStore for RtdbStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, BoardError> {
        self.client.get(path).await.map_err(map_store_error)
    }

    async fn get_versioned(&self, path: &str) -> Result<Versioned, BoardError> {
        let (value, etag) = self
            .client
            .get_with_etag(path)
            .await
            .map_err(map_store_error)?;
        Ok(Versioned {
            value,
            etag: etag.as_str().to_string(),
        })
    }

    async fn put(&self, path: &str, value: &Value) -> Result<Value, BoardError> {
        self.client.put(path, value).await.map_err(map_store_error)
    }

    async fn put_if_match(
        &self,
        path: &str,
        value: &Value,
        etag: &str,
    ) -> Result<Value, BoardError> {
        self.client
            .put_if_match(path, value, &ETag::from(etag))
            .await
            .map_err(map_store_error)
    }

    async fn patch(&self, path: &str, fields: &Value) -> Result<Value, BoardError> {
        self.client.patch(path, fields).await.map_err(map_store_error)
    }

    async fn post(&self, path: &str, value: &Value) -> Result<String, BoardError> {
        let push_id = self.client.post(path, value).await.map_err(map_store_error)?;
        Ok(push_id.name)
    }

    async fn delete(&self, path: &str) -> Result<(), BoardError> {
        self.client.delete(path).await.map_err(map_store_error)
    }
}

fn map_store_error(e: StoreError) -> BoardError {
    match e {
        StoreError::Unauthorized => BoardError::Unauthorized,
        StoreError::PreconditionFailed => BoardError::VersionMismatch,
        other => BoardError::store(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_failure_maps_to_version_mismatch() {
        assert!(matches!(
            map_store_error(StoreError::PreconditionFailed),
            BoardError::VersionMismatch
        ));
        assert!(matches!(
            map_store_error(StoreError::Status {
                status: 500,
                call: "GET tasks".to_string()
            }),
            BoardError::Store(msg) if msg.contains("GET tasks")
        ));
    }
}
