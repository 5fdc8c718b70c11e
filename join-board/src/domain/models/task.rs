use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use time::Date;

use super::{ContactId, EntryKey, TaskId, TaskKey};

/// Board column of a task.
///
/// Every status may move to every other status; there is no terminal state.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "to do")]
    #[strum(to_string = "to do", serialize = "todo", serialize = "to-do")]
    ToDo,
    #[serde(rename = "in progress")]
    #[strum(to_string = "in progress", serialize = "in-progress", serialize = "progress")]
    InProgress,
    #[serde(rename = "await feedback")]
    #[strum(to_string = "await feedback", serialize = "await-feedback", serialize = "feedback")]
    AwaitFeedback,
    #[serde(rename = "done")]
    #[strum(to_string = "done")]
    Done,
}

impl TaskStatus {
    /// Columns in board order.
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::ToDo,
        TaskStatus::InProgress,
        TaskStatus::AwaitFeedback,
        TaskStatus::Done,
    ];

    pub fn column_title(&self) -> &'static str {
        match self {
            TaskStatus::ToDo => "To Do",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::AwaitFeedback => "Await Feedback",
            TaskStatus::Done => "Done",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Priority {
    Urgent,
    #[default]
    Medium,
    Low,
}

/// Denormalized snapshot of a contact stored inside a task.
///
/// It is a copy, not a reference: the assignment sync rewrites it whenever the contact
/// changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignee {
    pub id: ContactId,
    pub name: String,
    pub color: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub entry_key: EntryKey,
    pub contact: Assignee,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtask {
    pub key: EntryKey,
    pub description: String,
    pub is_checked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub key: TaskKey,
    pub id: TaskId,
    /// Milliseconds since the Unix epoch of the last create or status move. Orders a column.
    pub timestamp: i64,
    pub title: String,
    pub description: String,
    pub due_date: Date,
    pub priority: Priority,
    pub category: String,
    pub status: TaskStatus,
    pub assigned_to: Vec<Assignment>,
    pub subtasks: Vec<Subtask>,
}

impl Task {
    pub fn is_assigned(&self, contact_id: &ContactId) -> bool {
        self.assigned_to.iter().any(|a| &a.contact.id == contact_id)
    }

    pub fn subtask_progress(&self) -> (usize, usize) {
        let done = self.subtasks.iter().filter(|s| s.is_checked).count();
        (done, self.subtasks.len())
    }
}

/// Input of the add-task form. Dates stay raw strings until validated.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub due_date: String,
    pub priority: Priority,
    pub category: String,
    pub assignees: Vec<ContactId>,
    pub subtasks: Vec<String>,
}

/// Changes made in the edit-task form.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub priority: Option<Priority>,
    pub assign: Vec<ContactId>,
    pub unassign: Vec<ContactId>,
    pub add_subtasks: Vec<String>,
    pub rename_subtasks: Vec<(EntryKey, String)>,
    /// Subtasks removed in the form; deleted from the store after the main write.
    pub remove_subtasks: Vec<EntryKey>,
}
