//! Keeps the contact snapshots embedded in tasks in line with the contacts collection.
//!
//! Both operations rewrite the whole `tasks` collection. The write is conditional on the
//! version read just before it, and a concurrent change restarts the read-modify-write
//! cycle up to the configured number of attempts.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::domain::{
    models::{Contact, ContactId},
    paths,
    ports::outbound::{DocumentStore, Versioned},
    BoardError,
};

pub const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 3;

#[derive(Clone)]
pub struct AssignmentSync {
    store: Arc<dyn DocumentStore>,
    max_attempts: u32,
}

impl AssignmentSync {
    pub fn new(store: Arc<dyn DocumentStore>, max_conflict_retries: u32) -> Self {
        Self {
            store,
            max_attempts: max_conflict_retries.max(1),
        }
    }

    /// Merge the contact's current details into every assignment that refers to it.
    ///
    /// Returns the number of tasks that changed.
    pub async fn propagate_update(&self, contact: &Contact) -> Result<usize, BoardError> {
        let changed = self
            .rewrite_tasks(|entry| {
                if !refers_to(entry, &contact.id) {
                    return EntryEdit::Keep;
                }
                let mut merged = entry.clone();
                merged.insert("name".to_string(), Value::from(contact.name.as_str()));
                merged.insert("color".to_string(), Value::from(contact.color.as_str()));
                merged.insert("email".to_string(), Value::from(contact.email.as_str()));
                merged.insert("phone".to_string(), Value::from(contact.phone.as_str()));
                if &merged == entry {
                    EntryEdit::Keep
                } else {
                    EntryEdit::Replace(merged)
                }
            })
            .await?;

        tracing::info!(
            "Updated contact {} in {} task(s)",
            contact.id,
            changed
        );
        Ok(changed)
    }

    /// Remove every assignment that refers to the contact.
    ///
    /// Returns the number of tasks that changed.
    pub async fn propagate_delete(&self, contact_id: &ContactId) -> Result<usize, BoardError> {
        let changed = self
            .rewrite_tasks(|entry| {
                if refers_to(entry, contact_id) {
                    EntryEdit::Remove
                } else {
                    EntryEdit::Keep
                }
            })
            .await?;

        tracing::info!("Removed contact {} from {} task(s)", contact_id, changed);
        Ok(changed)
    }

    async fn rewrite_tasks<F>(&self, edit: F) -> Result<usize, BoardError>
    where
        F: Fn(&Map<String, Value>) -> EntryEdit,
    {
        for attempt in 1..=self.max_attempts {
            let Versioned { value, etag } = self.store.get_versioned(paths::TASKS).await?;
            let Some(mut tasks) = value else {
                return Ok(0);
            };

            let changed = apply_to_tasks(&mut tasks, &edit);
            if changed == 0 {
                return Ok(0);
            }

            match self.store.put_if_match(paths::TASKS, &tasks, &etag).await {
                Ok(_) => return Ok(changed),
                Err(BoardError::VersionMismatch) => {
                    tracing::warn!(
                        "Tasks changed while rewriting assignments (attempt {}/{})",
                        attempt,
                        self.max_attempts
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(BoardError::Conflict {
            path: paths::TASKS.to_string(),
            attempts: self.max_attempts,
        })
    }
}

enum EntryEdit {
    Keep,
    Replace(Map<String, Value>),
    Remove,
}

/// Ids are compared as strings; older records may carry numeric ids.
fn refers_to(entry: &Map<String, Value>, contact_id: &ContactId) -> bool {
    match entry.get("id") {
        Some(Value::String(id)) => id == contact_id.as_str(),
        Some(Value::Number(id)) => id.to_string() == contact_id.as_str(),
        _ => false,
    }
}

fn task_nodes(tasks: &mut Value) -> Vec<&mut Value> {
    match tasks {
        Value::Object(map) => map.values_mut().collect(),
        Value::Array(list) => list.iter_mut().collect(),
        _ => Vec::new(),
    }
}

/// Apply `edit` to every assignment of every task; returns how many tasks changed.
fn apply_to_tasks<F>(tasks: &mut Value, edit: &F) -> usize
where
    F: Fn(&Map<String, Value>) -> EntryEdit,
{
    let mut changed = 0;
    for task in task_nodes(tasks) {
        let Some(assigned) = task.get_mut("Assigned_to") else {
            continue;
        };
        if apply_to_assignments(assigned, edit) {
            changed += 1;
        }
    }
    changed
}

fn apply_to_assignments<F>(assigned: &mut Value, edit: &F) -> bool
where
    F: Fn(&Map<String, Value>) -> EntryEdit,
{
    let mut changed = false;
    let mut decide = |entry: &Value| match entry {
        Value::Object(fields) => match edit(fields) {
            EntryEdit::Keep => Some(entry.clone()),
            EntryEdit::Replace(fields) => {
                changed = true;
                Some(Value::Object(fields))
            }
            EntryEdit::Remove => {
                changed = true;
                None
            }
        },
        other => Some(other.clone()),
    };

    let rewritten = match assigned {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter_map(|(key, entry)| decide(entry).map(|e| (key.clone(), e)))
                .collect(),
        ),
        Value::Array(list) => Value::Array(list.iter().filter_map(|e| decide(e)).collect()),
        _ => return false,
    };

    if changed {
        *assigned = rewritten;
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::outbound::InMemoryStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn anna() -> Contact {
        Contact {
            id: ContactId::new("c-anna"),
            name: "Anna Berg".to_string(),
            email: "anna@example.com".to_string(),
            phone: "+49 151 2345678".to_string(),
            color: "#FF7A00".to_string(),
        }
    }

    fn seeded() -> InMemoryStore {
        InMemoryStore::from_json(json!({
            "tasks": {
                "t1": {
                    "Title": "One",
                    "Assigned_to": {
                        "-1-a": {"id": "c-anna", "name": "Anna Muster", "color": "#FF7A00"},
                        "-1-b": {"id": "c-bob", "name": "Bob Brot", "color": "#00BEE8"}
                    }
                },
                "t2": {
                    "Title": "Two",
                    "Assigned_to": [{"id": "c-anna", "name": "Anna Muster", "color": "#FF7A00"}]
                },
                "t3": {"Title": "Three"}
            }
        }))
    }

    #[tokio::test]
    async fn update_merges_new_details_into_matching_entries() {
        let store = seeded();
        let sync = AssignmentSync::new(Arc::new(store.clone()), 3);

        let changed = sync.propagate_update(&anna()).await.unwrap();

        assert_eq!(changed, 2);
        let tasks = store.get("tasks").await.unwrap().unwrap();
        assert_eq!(tasks["t1"]["Assigned_to"]["-1-a"]["name"], "Anna Berg");
        assert_eq!(tasks["t1"]["Assigned_to"]["-1-a"]["email"], "anna@example.com");
        assert_eq!(tasks["t1"]["Assigned_to"]["-1-b"]["name"], "Bob Brot");
        assert_eq!(tasks["t2"]["Assigned_to"][0]["name"], "Anna Berg");
        assert_eq!(tasks["t3"], json!({"Title": "Three"}));
    }

    #[tokio::test]
    async fn delete_strips_matching_entries_only() {
        let store = seeded();
        let sync = AssignmentSync::new(Arc::new(store.clone()), 3);

        let changed = sync
            .propagate_delete(&ContactId::new("c-anna"))
            .await
            .unwrap();

        assert_eq!(changed, 2);
        let tasks = store.get("tasks").await.unwrap().unwrap();
        assert_eq!(
            tasks["t1"]["Assigned_to"],
            json!({"-1-b": {"id": "c-bob", "name": "Bob Brot", "color": "#00BEE8"}})
        );
        assert!(tasks["t2"].get("Assigned_to").is_none());
    }

    #[tokio::test]
    async fn empty_collection_is_left_alone() {
        let store = InMemoryStore::new();
        let sync = AssignmentSync::new(Arc::new(store.clone()), 3);

        assert_eq!(sync.propagate_delete(&ContactId::new("x")).await.unwrap(), 0);
        assert_eq!(store.snapshot().unwrap(), Value::Null);
    }

    /// Lets another writer touch `tasks` right before the first `interfering` conditional writes.
    struct InterferingStore {
        inner: InMemoryStore,
        interfering: u32,
        seen: AtomicU32,
    }

    #[async_trait]
    impl DocumentStore for InterferingStore {
        async fn get(&self, path: &str) -> Result<Option<Value>, BoardError> {
            self.inner.get(path).await
        }

        async fn get_versioned(&self, path: &str) -> Result<Versioned, BoardError> {
            self.inner.get_versioned(path).await
        }

        async fn put(&self, path: &str, value: &Value) -> Result<Value, BoardError> {
            self.inner.put(path, value).await
        }

        async fn put_if_match(
            &self,
            path: &str,
            value: &Value,
            etag: &str,
        ) -> Result<Value, BoardError> {
            let n = self.seen.fetch_add(1, Ordering::SeqCst);
            if n < self.interfering {
                self.inner
                    .put(
                        &format!("tasks/concurrent-{}", n),
                        &json!({"Title": "Added elsewhere"}),
                    )
                    .await?;
            }
            self.inner.put_if_match(path, value, etag).await
        }

        async fn patch(&self, path: &str, fields: &Value) -> Result<Value, BoardError> {
            self.inner.patch(path, fields).await
        }

        async fn post(&self, path: &str, value: &Value) -> Result<String, BoardError> {
            self.inner.post(path, value).await
        }

        async fn delete(&self, path: &str) -> Result<(), BoardError> {
            self.inner.delete(path).await
        }
    }

    #[tokio::test]
    async fn concurrent_write_is_retried_without_losing_it() {
        let inner = seeded();
        let store = InterferingStore {
            inner: inner.clone(),
            interfering: 1,
            seen: AtomicU32::new(0),
        };
        let sync = AssignmentSync::new(Arc::new(store), 3);

        let changed = sync
            .propagate_delete(&ContactId::new("c-anna"))
            .await
            .unwrap();

        assert_eq!(changed, 2);
        let tasks = inner.get("tasks").await.unwrap().unwrap();
        assert_eq!(tasks["concurrent-0"]["Title"], "Added elsewhere");
        assert!(tasks["t2"].get("Assigned_to").is_none());
    }

    #[tokio::test]
    async fn gives_up_with_conflict_after_max_attempts() {
        let inner = seeded();
        let store = InterferingStore {
            inner: inner.clone(),
            interfering: u32::MAX,
            seen: AtomicU32::new(0),
        };
        let sync = AssignmentSync::new(Arc::new(store), 2);

        let err = sync.propagate_update(&anna()).await.unwrap_err();

        assert!(matches!(
            err,
            BoardError::Conflict { ref path, attempts: 2 } if path == "tasks"
        ));
        let tasks = inner.get("tasks").await.unwrap().unwrap();
        assert_eq!(tasks["t1"]["Assigned_to"]["-1-a"]["name"], "Anna Muster");
    }
}
