use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use join_board::domain::models::UserId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
#[cfg(unix)]
use std::{io::Write, os::unix::fs::OpenOptionsExt};

const USER_KEY: &str = "user";
const GUEST_KEY: &str = "guestInitials";
const CAME_FROM_LOGIN_KEY: &str = "cameFromLogin";
const GUEST_INITIALS: &str = "G";

/// The logged in user as kept between commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredUser {
    pub id: UserId,
    #[serde(rename = "rememberMe")]
    pub remember_me: bool,
}

impl StoredUser {
    fn encode(&self) -> Result<String> {
        let json = serde_json::to_string(self)?;
        Ok(STANDARD.encode(json))
    }

    fn decode(raw: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(raw.trim())
            .context("Stored user is not valid base64")?;
        serde_json::from_slice(&bytes).context("Stored user is not valid JSON")
    }
}

/// Who the current session belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    User(StoredUser),
    Guest,
    None,
}

/// Key/value files under the config directory, one file per key.
pub struct SessionStore {
    root: PathBuf,
}

fn secure_write(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    #[cfg(unix)]
    {
        std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)?
            .write_all(content.as_bytes())?;
    }

    #[cfg(not(unix))]
    {
        std::fs::write(path, content)?;
    }

    Ok(())
}

impl SessionStore {
    pub fn open() -> Result<Self> {
        Ok(Self::at(crate::config::root_path()?))
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.root.join(key);
        if !path.exists() {
            return Ok(None);
        }

        let value = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let value = value.trim().to_string();
        if value.is_empty() {
            return Ok(None);
        }
        Ok(Some(value))
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        secure_write(&self.root.join(key), value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.root.join(key);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn stored_user(&self) -> Result<Option<StoredUser>> {
        self.read(USER_KEY)?
            .map(|raw| StoredUser::decode(&raw))
            .transpose()
    }

    pub fn session(&self) -> Result<Session> {
        if let Some(user) = self.stored_user()? {
            return Ok(Session::User(user));
        }
        if self.read(GUEST_KEY)?.is_some() {
            return Ok(Session::Guest);
        }
        Ok(Session::None)
    }

    pub fn login_user(&self, id: &UserId, remember_me: bool) -> Result<()> {
        let user = StoredUser {
            id: id.clone(),
            remember_me,
        };
        self.write(USER_KEY, &user.encode()?)?;
        self.remove(GUEST_KEY)?;
        self.write(CAME_FROM_LOGIN_KEY, "true")
    }

    pub fn login_guest(&self) -> Result<()> {
        self.write(GUEST_KEY, GUEST_INITIALS)?;
        self.remove(USER_KEY)?;
        self.write(CAME_FROM_LOGIN_KEY, "true")
    }

    pub fn logout(&self) -> Result<()> {
        self.remove(USER_KEY)?;
        self.remove(GUEST_KEY)?;
        self.remove(CAME_FROM_LOGIN_KEY)
    }

    /// True once after a login; the flag is cleared on read.
    pub fn take_came_from_login(&self) -> Result<bool> {
        let flag = self.read(CAME_FROM_LOGIN_KEY)?;
        if flag.is_some() {
            self.remove(CAME_FROM_LOGIN_KEY)?;
        }
        Ok(flag.as_deref() == Some("true"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, SessionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::at(dir.path());
        (dir, store)
    }

    #[test]
    fn user_value_is_base64_json() {
        let (dir, store) = store();

        store.login_user(&UserId::new("u-1"), true).unwrap();

        let raw = std::fs::read_to_string(dir.path().join(USER_KEY)).unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&STANDARD.decode(raw).unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({"id": "u-1", "rememberMe": true}));
        assert_eq!(
            store.session().unwrap(),
            Session::User(StoredUser {
                id: UserId::new("u-1"),
                remember_me: true
            })
        );
    }

    #[test]
    fn guest_and_user_logins_replace_each_other() {
        let (_dir, store) = store();

        store.login_user(&UserId::new("u-1"), false).unwrap();
        store.login_guest().unwrap();
        assert_eq!(store.session().unwrap(), Session::Guest);
        assert!(store.stored_user().unwrap().is_none());

        store.login_user(&UserId::new("u-2"), false).unwrap();
        assert!(matches!(store.session().unwrap(), Session::User(_)));
    }

    #[test]
    fn came_from_login_is_consumed_once() {
        let (_dir, store) = store();
        store.login_guest().unwrap();

        assert!(store.take_came_from_login().unwrap());
        assert!(!store.take_came_from_login().unwrap());
    }

    #[test]
    fn logout_clears_every_key() {
        let (dir, store) = store();

        store.login_user(&UserId::new("u-1"), true).unwrap();
        store.logout().unwrap();

        assert_eq!(store.session().unwrap(), Session::None);
        assert!(!store.take_came_from_login().unwrap());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn files_are_private() {
        use std::os::unix::fs::PermissionsExt;
        let (dir, store) = store();

        store.login_guest().unwrap();

        let mode = std::fs::metadata(dir.path().join(GUEST_KEY))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
