use std::env;

use crate::StoreError;

/// Environment variable holding the database root, e.g.
/// `https://join-default-rtdb.europe-west1.firebasedatabase.app/`.
pub const STORE_URL_ENV: &str = "JOIN_STORE_URL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreURL(String);

impl AsRef<str> for StoreURL {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StoreURL {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl StoreURL {
    pub fn new(base: impl Into<String>) -> Self {
        Self(base.into())
    }

    /// Creates a new StoreURL from the environment variable `JOIN_STORE_URL`.
    pub fn from_env() -> Result<Self, StoreError> {
        env::var(STORE_URL_ENV)
            .map(Self)
            .map_err(|_| StoreError::InvalidUrl(format!("{} must be set in env", STORE_URL_ENV)))
    }

    /// Append the given path to the URL.
    pub fn append_path(&self, path: &str) -> Self {
        let trimmed_url = self.0.trim_end_matches('/');
        let trimmed_path = path.trim_start_matches('/');
        Self(format!("{}/{}", trimmed_url, trimmed_path))
    }

    /// REST endpoint for a node: `<base>/<path>.json`. The empty path addresses the root.
    pub fn json_endpoint(&self, path: &str) -> Self {
        let node = path.trim_matches('/');
        Self(format!("{}.json", self.append_path(node).0))
    }

    pub fn with_auth(&self, token: Option<&str>) -> Self {
        match token {
            Some(token) if self.0.contains('?') => Self(format!("{}&auth={}", self.0, token)),
            Some(token) => Self(format!("{}?auth={}", self.0, token)),
            None => self.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_endpoint_joins_path_and_suffix() {
        let url = StoreURL::new("https://db.example.com/");
        assert_eq!(
            url.json_endpoint("tasks/-Nx1/Subtasks/-17").as_ref(),
            "https://db.example.com/tasks/-Nx1/Subtasks/-17.json"
        );
    }

    #[test]
    fn empty_path_addresses_root() {
        let url = StoreURL::new("https://db.example.com");
        assert_eq!(url.json_endpoint("").as_ref(), "https://db.example.com/.json");
    }

    #[test]
    fn auth_token_is_appended_as_query() {
        let url = StoreURL::new("https://db.example.com").json_endpoint("users");
        assert_eq!(
            url.with_auth(Some("secret")).as_ref(),
            "https://db.example.com/users.json?auth=secret"
        );
        assert_eq!(url.with_auth(None), url);
    }
}
