//! Wire records as stored in the document store, and their conversion to domain types.
//!
//! Field names follow the stored layout (`Title`, `Due_date`, `Assigned_to`, ...). The
//! store turns objects with dense integer keys into arrays, so every keyed collection is
//! read through [`EntryMap`], which accepts both shapes.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{
    de::{self, DeserializeOwned},
    Deserialize, Deserializer, Serialize, Serializer,
};
use serde_json::Value;

use super::{
    error::BoardError,
    models::{
        Assignee, Assignment, Contact, ContactId, EntryKey, Priority, Subtask, Task, TaskId,
        TaskKey, TaskStatus, User, UserId,
    },
    validation::parse_due_date,
};

/// Keyed child entries in key order. `null` holes are dropped on read.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryMap<T>(pub Vec<(String, T)>);

impl<T> EntryMap<T> {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<T> Default for EntryMap<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> FromIterator<(String, T)> for EntryMap<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntries<T> {
    Map(BTreeMap<String, Option<T>>),
    List(Vec<Option<T>>),
    Blank(String),
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for EntryMap<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = match Option::<RawEntries<T>>::deserialize(deserializer)? {
            None => Vec::new(),
            Some(RawEntries::Map(map)) => map
                .into_iter()
                .filter_map(|(key, value)| value.map(|v| (key, v)))
                .collect(),
            Some(RawEntries::List(list)) => list
                .into_iter()
                .enumerate()
                .filter_map(|(index, value)| value.map(|v| (index.to_string(), v)))
                .collect(),
            Some(RawEntries::Blank(s)) if s.is_empty() => Vec::new(),
            Some(RawEntries::Blank(s)) => {
                return Err(de::Error::custom(format!(
                    "expected an object or array of entries, got string {s:?}"
                )))
            }
        };
        Ok(Self(entries))
    }
}

impl<T: Serialize> Serialize for EntryMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(key, value)| (key, value)))
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| de::Error::custom(format!("number out of range: {n}"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("not an integer: {s:?}"))),
        other => Err(de::Error::custom(format!("expected integer, got {other}"))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssigneeRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtaskRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "isChecked", default)]
    pub is_checked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    #[serde(deserialize_with = "lenient_i64")]
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub timestamp: i64,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(rename = "Due_date")]
    pub due_date: String,
    #[serde(rename = "Prio", default)]
    pub prio: String,
    #[serde(rename = "Category", default)]
    pub category: String,
    #[serde(rename = "Status", default)]
    pub status: String,
    #[serde(rename = "Assigned_to", default, skip_serializing_if = "EntryMap::is_empty")]
    pub assigned_to: EntryMap<AssigneeRecord>,
    #[serde(rename = "Subtasks", default, skip_serializing_if = "EntryMap::is_empty")]
    pub subtasks: EntryMap<SubtaskRecord>,
}

impl TaskRecord {
    pub fn into_task(self, key: TaskKey) -> Result<Task, BoardError> {
        let corrupt = |reason: String| BoardError::corrupt("task", key.as_str(), reason);

        let status = if self.status.trim().is_empty() {
            TaskStatus::default()
        } else {
            TaskStatus::from_str(self.status.trim())
                .map_err(|_| corrupt(format!("unknown status {:?}", self.status)))?
        };
        let priority = if self.prio.trim().is_empty() {
            Priority::default()
        } else {
            Priority::from_str(self.prio.trim())
                .map_err(|_| corrupt(format!("unknown priority {:?}", self.prio)))?
        };
        let due_date = parse_due_date(self.due_date.trim())
            .map_err(|_| corrupt(format!("bad due date {:?}", self.due_date)))?;

        let assigned_to = self
            .assigned_to
            .0
            .into_iter()
            .map(|(entry_key, a)| Assignment {
                entry_key: EntryKey::new(entry_key),
                contact: Assignee {
                    id: ContactId::new(a.id),
                    name: a.name,
                    color: a.color,
                    email: a.email,
                    phone: a.phone,
                },
            })
            .collect();

        let subtasks = self
            .subtasks
            .0
            .into_iter()
            .map(|(entry_key, s)| Subtask {
                key: EntryKey::new(entry_key),
                description: s.description,
                is_checked: s.is_checked,
            })
            .collect();

        Ok(Task {
            key,
            id: TaskId::new(self.id),
            timestamp: self.timestamp,
            title: self.title,
            description: self.description,
            due_date,
            priority,
            category: self.category,
            status,
            assigned_to,
            subtasks,
        })
    }

    pub fn from_task(task: &Task) -> Self {
        Self {
            id: task.id.as_i64(),
            timestamp: task.timestamp,
            title: task.title.clone(),
            description: task.description.clone(),
            due_date: task.due_date.to_string(),
            prio: task.priority.to_string(),
            category: task.category.clone(),
            status: task.status.to_string(),
            assigned_to: task
                .assigned_to
                .iter()
                .map(|a| {
                    (
                        a.entry_key.to_string(),
                        AssigneeRecord {
                            id: a.contact.id.to_string(),
                            name: a.contact.name.clone(),
                            color: a.contact.color.clone(),
                            email: a.contact.email.clone(),
                            phone: a.contact.phone.clone(),
                        },
                    )
                })
                .collect(),
            subtasks: task
                .subtasks
                .iter()
                .map(|s| {
                    (
                        s.key.to_string(),
                        SubtaskRecord {
                            id: s.key.to_string(),
                            description: s.description.clone(),
                            is_checked: s.is_checked,
                        },
                    )
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub color: String,
}

impl ContactRecord {
    /// The node key wins when the stored `id` field is missing.
    pub fn into_contact(self, key: &str) -> Contact {
        let id = if self.id.is_empty() {
            key.to_string()
        } else {
            self.id
        };
        Contact {
            id: ContactId::new(id),
            name: self.name,
            email: self.email.to_lowercase(),
            phone: self.phone,
            color: self.color,
        }
    }

    pub fn from_contact(contact: &Contact) -> Self {
        Self {
            id: contact.id.to_string(),
            name: contact.name.clone(),
            email: contact.email.clone(),
            phone: contact.phone.clone(),
            color: contact.color.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub initials: String,
}

impl UserRecord {
    pub fn into_user(self, key: &str) -> User {
        let id = if self.id.is_empty() {
            key.to_string()
        } else {
            self.id
        };
        User {
            id: UserId::new(id),
            name: self.name,
            email: self.email,
            password: self.password,
            initials: self.initials,
        }
    }

    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            password: user.password.clone(),
            initials: user.initials.clone(),
        }
    }
}

pub fn to_json<T: Serialize>(record: &T) -> Result<Value, BoardError> {
    serde_json::to_value(record)
        .map_err(|e| BoardError::store(format!("failed to encode record: {}", e)))
}

/// Decode a whole collection node, skipping entries that do not parse.
///
/// A node that is neither an object nor an array is reported as corrupt.
pub fn decode_entries<R: DeserializeOwned>(
    kind: &'static str,
    tree: Option<Value>,
) -> Result<Vec<(String, R)>, BoardError> {
    let Some(tree) = tree else {
        return Ok(Vec::new());
    };
    let entries: EntryMap<Value> = serde_json::from_value(tree)
        .map_err(|e| BoardError::corrupt(kind, "<collection>", e.to_string()))?;

    Ok(entries
        .0
        .into_iter()
        .filter_map(|(key, value)| match serde_json::from_value::<R>(value) {
            Ok(record) => Some((key, record)),
            Err(e) => {
                tracing::warn!("Skipping unreadable {} record {}: {}", kind, key, e);
                None
            }
        })
        .collect())
}
