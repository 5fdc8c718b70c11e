//! Registered users and credential checks.
//!
//! Users live under `users/<n>` where `n` is the next free index at sign-up time: the
//! stored key count or one past the highest numeric key, whichever is larger. Two
//! concurrent sign-ups can pick the same index and the later write wins; this mirrors the
//! layout other clients of the same database expect.

use std::sync::Arc;

use serde_json::Value;

use crate::domain::{
    models::{SignUp, User, UserId},
    paths,
    ports::outbound::DocumentStore,
    schema::{decode_entries, to_json, UserRecord},
    validation::{
        validate_email, validate_passwords_match, validate_required, Field, FieldError,
        ValidationErrors,
    },
    AuthError, BoardError,
};

pub struct UserDirectory {
    store: Arc<dyn DocumentStore>,
    users: Vec<User>,
    /// First index not taken by any stored entry, holes and unreadable entries included.
    next_index: usize,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            users: Vec::new(),
            next_index: 0,
        }
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn find(&self, id: &UserId) -> Option<&User> {
        self.users.iter().find(|u| &u.id == id)
    }

    pub fn find_by_email(&self, email: &str) -> Option<&User> {
        let email = email.trim();
        self.users.iter().find(|u| u.email == email)
    }

    pub async fn load_all(&mut self) -> Result<&[User], BoardError> {
        let tree = self.store.get(paths::USERS).await.map_err(|e| {
            tracing::error!("Failed to load users: {}", e);
            e
        })?;

        self.next_index = next_free_index(tree.as_ref());
        let entries = decode_entries::<Value>("user", tree)?;
        self.users = entries
            .into_iter()
            .filter_map(
                |(key, value)| match serde_json::from_value::<UserRecord>(value) {
                    Ok(record) => Some(record.into_user(&key)),
                    Err(e) => {
                        tracing::warn!("Skipping unreadable user record {}: {}", key, e);
                        None
                    }
                },
            )
            .collect();
        Ok(&self.users)
    }

    /// Register a new user after re-reading the directory.
    pub async fn sign_up(&mut self, form: SignUp) -> Result<User, BoardError> {
        self.load_all().await?;

        let mut errors = ValidationErrors::new();
        errors
            .check(Field::Name, validate_required(&form.name))
            .check(Field::Email, validate_email(form.email.trim()))
            .check(
                Field::Password,
                validate_required(&form.password)
                    .and_then(|_| validate_passwords_match(&form.password, &form.confirm_password)),
            );
        if errors.get(Field::Email).is_none() && self.find_by_email(&form.email).is_some() {
            errors.check(Field::Email, Err(FieldError::EmailTaken));
        }
        errors.into_result()?;

        let index = self.next_index;
        let user = form.into_user(UserId::generate());
        let record = to_json(&UserRecord::from_user(&user))?;
        self.store.put(&paths::user(index), &record).await.map_err(|e| {
            tracing::error!("Failed to register user {}: {}", user.email, e);
            e
        })?;

        tracing::info!("Registered user {} at index {}", user.id, index);
        self.users.push(user.clone());
        self.next_index += 1;
        Ok(user)
    }

    /// Check plain-text credentials against the loaded directory.
    pub fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let user = self
            .find_by_email(email)
            .ok_or(AuthError::UnknownEmail)?;
        if user.password != password {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(user.clone())
    }
}

/// Sparse integer-keyed collections come back as arrays with `null` holes, so an array's
/// length already counts the holes.
fn next_free_index(tree: Option<&Value>) -> usize {
    match tree {
        Some(Value::Array(list)) => list.len(),
        Some(Value::Object(map)) => {
            let past_highest = map
                .keys()
                .filter_map(|key| key.parse::<usize>().ok())
                .max()
                .map_or(0, |highest| highest.saturating_add(1));
            past_highest.max(map.len())
        }
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::outbound::InMemoryStore;
    use serde_json::json;

    fn form(name: &str, email: &str) -> SignUp {
        SignUp {
            name: name.to_string(),
            email: email.to_string(),
            password: "secret".to_string(),
            confirm_password: "secret".to_string(),
        }
    }

    #[tokio::test]
    async fn sign_up_appends_at_next_index() {
        let store = InMemoryStore::from_json(json!({
            "users": [{"id": "u0", "name": "Guest", "email": "guest@join.de", "password": "x", "initials": "G"}]
        }));
        let mut directory = UserDirectory::new(Arc::new(store.clone()));

        let user = directory
            .sign_up(form("anna muster", " anna@example.com "))
            .await
            .unwrap();

        assert_eq!(user.name, "Anna Muster");
        assert_eq!(user.initials, "AM");
        let stored = store.get("users/1").await.unwrap().unwrap();
        assert_eq!(stored["email"], "anna@example.com");
        assert_eq!(stored["password"], "secret");
        assert_eq!(stored["id"], user.id.as_str());
    }

    #[tokio::test]
    async fn sign_up_skips_indices_of_sparse_collections() {
        let bob = json!({"id": "u1", "name": "Bob Brot", "email": "bob@example.com", "password": "x", "initials": "BB"});
        let store = InMemoryStore::new();
        let as_array = json!([null, bob.clone()]);
        store.put("users", &as_array).await.unwrap();
        let mut directory = UserDirectory::new(Arc::new(store.clone()));

        directory
            .sign_up(form("Anna Muster", "anna@example.com"))
            .await
            .unwrap();

        assert_eq!(store.get("users/1").await.unwrap(), Some(bob.clone()));
        let anna = store.get("users/2").await.unwrap().unwrap();
        assert_eq!(anna["name"], "Anna Muster");

        let store = InMemoryStore::from_json(json!({"users": {"0": bob.clone(), "5": bob.clone()}}));
        let mut directory = UserDirectory::new(Arc::new(store.clone()));
        directory
            .sign_up(form("Anna Muster", "anna@example.com"))
            .await
            .unwrap();
        assert_eq!(store.get("users/5").await.unwrap(), Some(bob));
        assert!(store.get("users/6").await.unwrap().is_some());
    }

    #[test]
    fn next_index_counts_holes_and_gaps() {
        assert_eq!(next_free_index(None), 0);
        assert_eq!(next_free_index(Some(&json!([null, {"a": 1}]))), 2);
        assert_eq!(next_free_index(Some(&json!({"0": {}, "3": {}}))), 4);
        assert_eq!(next_free_index(Some(&json!({"-abc": {}, "x": {}}))), 2);
    }

    #[tokio::test]
    async fn sign_up_rejects_taken_email_and_password_mismatch() {
        let store = InMemoryStore::from_json(json!({
            "users": {"0": {"id": "u0", "name": "Anna Muster", "email": "anna@example.com", "password": "x", "initials": "AM"}}
        }));
        let mut directory = UserDirectory::new(Arc::new(store));
        let mut signup = form("Anna Muster", "anna@example.com");
        signup.confirm_password = "other".to_string();

        let err = directory.sign_up(signup).await.unwrap_err();

        match err {
            BoardError::Validation(errors) => {
                assert_eq!(errors.get(Field::Email), Some(&FieldError::EmailTaken));
                assert_eq!(
                    errors.get(Field::Password),
                    Some(&FieldError::PasswordMismatch)
                );
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn login_checks_email_then_password() {
        let store = InMemoryStore::new();
        let mut directory = UserDirectory::new(Arc::new(store));
        let user = directory
            .sign_up(form("Anna Muster", "anna@example.com"))
            .await
            .unwrap();

        let logged_in = directory.login(" anna@example.com", "secret").unwrap();
        assert_eq!(logged_in.id, user.id);
        assert_eq!(directory.find(&user.id).map(|u| u.name.as_str()), Some("Anna Muster"));

        assert!(matches!(
            directory.login("nobody@example.com", "secret"),
            Err(AuthError::UnknownEmail)
        ));
        assert!(matches!(
            directory.login("anna@example.com", "Secret"),
            Err(AuthError::InvalidCredentials)
        ));
    }
}
