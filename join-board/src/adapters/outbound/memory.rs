//! In-memory document store.
//!
//! Holds the whole JSON tree behind a lock and applies the same path semantics as the
//! hosted store: `null` and empty objects are never stored, POST appends under a fresh
//! ordered key, and the version tag is a hash of the addressed node.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, RwLock,
};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::domain::{
    ports::outbound::{DocumentStore, Versioned},
    BoardError,
};

#[derive(Clone, Default)]
pub struct InMemoryStore {
    root: Arc<RwLock<Value>>,
    push_counter: Arc<AtomicU64>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an existing tree, e.g. an exported database.
    ///
    /// Push keys continue after the highest one already present, so a tree saved from an
    /// earlier run can be seeded again without key collisions.
    pub fn from_json(tree: Value) -> Self {
        let next = highest_push_index(&tree).map_or(0, |n| n + 1);
        Self {
            root: Arc::new(RwLock::new(normalize(tree))),
            push_counter: Arc::new(AtomicU64::new(next)),
        }
    }

    /// Copy of the whole tree.
    pub fn snapshot(&self) -> Result<Value, BoardError> {
        let root = self.root.read().map_err(|_| poisoned())?;
        Ok(root.clone())
    }

    fn next_push_key(&self) -> String {
        let n = self.push_counter.fetch_add(1, Ordering::SeqCst);
        format!("{}{:016}", PUSH_PREFIX, n)
    }
}

const PUSH_PREFIX: &str = "-Mem";

fn highest_push_index(value: &Value) -> Option<u64> {
    match value {
        Value::Object(map) => map
            .iter()
            .flat_map(|(key, child)| {
                let own = key
                    .strip_prefix(PUSH_PREFIX)
                    .and_then(|n| n.parse::<u64>().ok());
                [own, highest_push_index(child)]
            })
            .flatten()
            .max(),
        Value::Array(list) => list.iter().filter_map(highest_push_index).max(),
        _ => None,
    }
}

fn poisoned() -> BoardError {
    BoardError::store("in-memory store lock poisoned")
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut node = root;
    for segment in segments(path) {
        node = match node {
            Value::Object(map) => map.get(segment)?,
            Value::Array(list) => list.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    if node.is_null() {
        None
    } else {
        Some(node)
    }
}

/// Drop `null` children and empty containers, the way the hosted store never keeps them.
fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let kept: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, normalize(v)))
                .filter(|(_, v)| !v.is_null())
                .collect();
            if kept.is_empty() {
                Value::Null
            } else {
                Value::Object(kept)
            }
        }
        Value::Array(list) => {
            if list.iter().all(Value::is_null) {
                Value::Null
            } else {
                Value::Array(list.into_iter().map(normalize).collect())
            }
        }
        other => other,
    }
}

/// Children of a node as a map; arrays are keyed by index and scalars have no children.
fn into_object(node: Value) -> Map<String, Value> {
    match node {
        Value::Object(map) => map,
        Value::Array(list) => list
            .into_iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => Map::new(),
    }
}

fn write_node(node: &mut Value, path: &[&str], value: Value) {
    let Some((first, rest)) = path.split_first() else {
        *node = value;
        return;
    };
    let mut map = into_object(std::mem::take(node));
    if rest.is_empty() {
        if value.is_null() {
            map.remove(*first);
        } else {
            map.insert(first.to_string(), value);
        }
    } else {
        let mut child = map.remove(*first).unwrap_or(Value::Null);
        write_node(&mut child, rest, value);
        if !child.is_null() {
            map.insert(first.to_string(), child);
        }
    }
    if !map.is_empty() {
        *node = Value::Object(map);
    }
}

fn version_of(node: Option<&Value>) -> String {
    let mut hasher = DefaultHasher::new();
    node.unwrap_or(&Value::Null).to_string().hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, BoardError> {
        let root = self.root.read().map_err(|_| poisoned())?;
        Ok(lookup(&root, path).cloned())
    }

    async fn get_versioned(&self, path: &str) -> Result<Versioned, BoardError> {
        let root = self.root.read().map_err(|_| poisoned())?;
        let node = lookup(&root, path);
        Ok(Versioned {
            value: node.cloned(),
            etag: version_of(node),
        })
    }

    async fn put(&self, path: &str, value: &Value) -> Result<Value, BoardError> {
        let mut root = self.root.write().map_err(|_| poisoned())?;
        let stored = normalize(value.clone());
        write_node(&mut root, &segments(path), stored.clone());
        Ok(stored)
    }

    async fn put_if_match(
        &self,
        path: &str,
        value: &Value,
        etag: &str,
    ) -> Result<Value, BoardError> {
        let mut root = self.root.write().map_err(|_| poisoned())?;
        if version_of(lookup(&root, path)) != etag {
            return Err(BoardError::VersionMismatch);
        }
        let stored = normalize(value.clone());
        write_node(&mut root, &segments(path), stored.clone());
        Ok(stored)
    }

    async fn patch(&self, path: &str, fields: &Value) -> Result<Value, BoardError> {
        let Value::Object(fields) = fields else {
            return Err(BoardError::store(format!(
                "PATCH {} expects an object of fields",
                path
            )));
        };
        let mut root = self.root.write().map_err(|_| poisoned())?;
        let base = segments(path);
        for (key, value) in fields {
            let mut child_path = base.clone();
            child_path.push(key.as_str());
            write_node(&mut root, &child_path, normalize(value.clone()));
        }
        Ok(Value::Object(fields.clone()))
    }

    async fn post(&self, path: &str, value: &Value) -> Result<String, BoardError> {
        let key = self.next_push_key();
        let mut root = self.root.write().map_err(|_| poisoned())?;
        let mut child_path = segments(path);
        child_path.push(key.as_str());
        write_node(&mut root, &child_path, normalize(value.clone()));
        Ok(key)
    }

    async fn delete(&self, path: &str) -> Result<(), BoardError> {
        let mut root = self.root.write().map_err(|_| poisoned())?;
        write_node(&mut root, &segments(path), Value::Null);
        Ok(())
    }
}
