use std::path::PathBuf;

use anyhow::{Context, Result};
use join_board::{domain::services::DEFAULT_MAX_CONFLICT_RETRIES, BoardSettings};
use serde::Deserialize;
use serde_with::serde_as;

const DEFAULT_CONFIG: &str = r#"# Join board configuration.
# Every value can be overridden with JOIN_<SECTION>__<KEY>, e.g. JOIN_STORE__BASE_URL.

[store]
# Root URL of the realtime database, e.g. "https://my-board-default-rtdb.firebaseio.com"
# base_url = ""
# auth_token = ""
timeout_secs = 30

[sync]
max_conflict_retries = 3
"#;

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub store: StoreSettings,
    pub sync: SyncSettings,
}

#[serde_as]
#[derive(Deserialize, Clone, Debug)]
pub struct StoreSettings {
    pub base_url: Option<String>,
    pub auth_token: Option<String>,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub timeout_secs: u64,
}

#[serde_as]
#[derive(Deserialize, Clone, Debug)]
pub struct SyncSettings {
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub max_conflict_retries: u32,
}

impl Settings {
    pub fn board_settings(&self) -> BoardSettings {
        BoardSettings {
            max_conflict_retries: self.sync.max_conflict_retries,
        }
    }
}

pub fn root_path() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .context("Cannot determine config directory")?
        .join("join"))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(root_path()?.join("config.toml"))
}

/// Defaults, then `config.toml` in the config directory, then `JOIN_*` environment
/// variables. `JOIN_STORE_URL` is honoured as a shorthand for the store URL.
pub fn read_config() -> Result<Settings> {
    let path = config_path()?;
    build(Some(path), std::env::var(join_store::STORE_URL_ENV).ok())
}

fn build(file: Option<PathBuf>, store_url: Option<String>) -> Result<Settings> {
    let mut builder = config::Config::builder()
        .set_default("store.timeout_secs", "30")?
        .set_default(
            "sync.max_conflict_retries",
            DEFAULT_MAX_CONFLICT_RETRIES.to_string(),
        )?;

    if let Some(file) = file {
        builder = builder.add_source(config::File::from(file).required(false));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("JOIN")
            .prefix_separator("_")
            .separator("__"),
    );

    if let Some(url) = store_url {
        builder = builder.set_override("store.base_url", url)?;
    }

    let settings = builder
        .build()
        .context("Failed to read configuration")?
        .try_deserialize::<Settings>()
        .context("Invalid configuration")?;
    Ok(settings)
}

/// Write the commented default config unless one already exists.
pub fn ensure_default_file() -> Result<PathBuf> {
    let path = config_path()?;
    if !path.exists() {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, DEFAULT_CONFIG)
            .with_context(|| format!("Failed to write config at {}", path.display()))?;
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_file() {
        let settings = build(None, None).unwrap();

        assert_eq!(settings.store.timeout_secs, 30);
        assert_eq!(settings.sync.max_conflict_retries, DEFAULT_MAX_CONFLICT_RETRIES);
        assert!(settings.store.base_url.is_none());
    }

    #[test]
    fn file_values_and_url_shorthand_are_layered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[store]\nbase_url = \"https://from-file.example\"\ntimeout_secs = 5\n\n[sync]\nmax_conflict_retries = 7\n",
        )
        .unwrap();

        let from_file = build(Some(path.clone()), None).unwrap();
        assert_eq!(from_file.store.base_url.as_deref(), Some("https://from-file.example"));
        assert_eq!(from_file.store.timeout_secs, 5);
        assert_eq!(from_file.board_settings().max_conflict_retries, 7);

        let overridden = build(Some(path), Some("https://from-env.example".to_string())).unwrap();
        assert_eq!(overridden.store.base_url.as_deref(), Some("https://from-env.example"));
    }

    #[test]
    fn default_file_template_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, DEFAULT_CONFIG).unwrap();

        let settings = build(Some(path), None).unwrap();
        assert_eq!(settings.store.timeout_secs, 30);
    }
}
