//! Node addresses in the document store.

use super::models::{ContactId, EntryKey, TaskKey};

pub const TASKS: &str = "tasks";
pub const CONTACTS: &str = "contacts";
pub const USERS: &str = "users";

pub fn task(key: &TaskKey) -> String {
    format!("{}/{}", TASKS, key)
}

pub fn subtask(key: &TaskKey, subtask: &EntryKey) -> String {
    format!("{}/{}/Subtasks/{}", TASKS, key, subtask)
}

pub fn contact(id: &ContactId) -> String {
    format!("{}/{}", CONTACTS, id)
}

pub fn user(index: usize) -> String {
    format!("{}/{}", USERS, index)
}
