use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use join_board::{
    adapters::outbound::{InMemoryStore, RtdbStore},
    domain::ports::outbound::DocumentStore,
};
use join_store::{StoreClient, StoreURL};

use crate::config::{self, StoreSettings};

/// Where the board documents live for this invocation.
pub enum Backend {
    Remote(Arc<RtdbStore>),
    /// JSON file under the config directory, written back after each command.
    Offline {
        store: InMemoryStore,
        path: PathBuf,
    },
}

impl Backend {
    pub fn remote(settings: &StoreSettings) -> Result<Self> {
        let Some(base_url) = settings.base_url.as_deref().filter(|url| !url.is_empty()) else {
            bail!(
                "No store URL configured. Set store.base_url in {} or {}, or pass --offline",
                config::config_path()?.display(),
                join_store::STORE_URL_ENV
            );
        };

        let mut client = StoreClient::new(
            StoreURL::new(base_url),
            Duration::from_secs(settings.timeout_secs),
        )
        .context("Failed to build store client")?;
        if let Some(token) = settings.auth_token.as_deref().filter(|t| !t.is_empty()) {
            client = client.with_auth_token(token);
        }

        tracing::debug!(base_url, "using remote store");
        Ok(Self::Remote(Arc::new(RtdbStore::new(client))))
    }

    pub fn offline() -> Result<Self> {
        Self::offline_at(config::root_path()?.join("offline.json"))
    }

    pub fn offline_at(path: PathBuf) -> Result<Self> {
        let store = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let tree = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            InMemoryStore::from_json(tree)
        } else {
            InMemoryStore::new()
        };

        tracing::debug!(path = %path.display(), "using offline store");
        Ok(Self::Offline { store, path })
    }

    pub fn document_store(&self) -> Arc<dyn DocumentStore> {
        match self {
            Self::Remote(store) => store.clone(),
            Self::Offline { store, .. } => Arc::new(store.clone()),
        }
    }

    /// Write the offline tree back to disk. No-op for the remote store.
    pub fn persist(&self) -> Result<()> {
        let Self::Offline { store, path } = self else {
            return Ok(());
        };

        let tree = store.snapshot()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&tree)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn offline_tree_survives_a_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("offline.json");

        let backend = Backend::offline_at(path.clone()).unwrap();
        backend
            .document_store()
            .put("contacts/c1", &json!({"name": "Anna Muster"}))
            .await
            .unwrap();
        backend.persist().unwrap();

        let reopened = Backend::offline_at(path).unwrap();
        assert_eq!(
            reopened.document_store().get("contacts/c1/name").await.unwrap(),
            Some(json!("Anna Muster"))
        );
    }

    #[test]
    fn remote_needs_a_url() {
        let settings = StoreSettings {
            base_url: None,
            auth_token: None,
            timeout_secs: 30,
        };

        assert!(Backend::remote(&settings).is_err());
    }
}
