use std::sync::Arc;

use itertools::Itertools;
use serde_json::json;

use crate::domain::{
    clock::TimeSource,
    models::{
        Assignment, Contact, ContactId, EntryKey, Subtask, Task, TaskDraft, TaskId, TaskKey,
        TaskStatus, TaskUpdate,
    },
    paths,
    ports::outbound::DocumentStore,
    schema::{decode_entries, to_json, TaskRecord},
    validation::{
        validate_due_date, validate_required, validate_task_fields, Field, FieldError,
        ValidationErrors,
    },
    BoardError,
};

/// In-memory mirror of the `tasks` collection plus the operations that change it.
///
/// Every mutation writes to the store first and only touches the mirror once the write
/// succeeded.
pub struct TaskRepository {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn TimeSource>,
    tasks: Vec<Task>,
}

impl TaskRepository {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            store,
            clock,
            tasks: Vec::new(),
        }
    }

    /// All tasks in store key order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, key: &TaskKey) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.key == key)
    }

    pub fn find_by_id(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Rebuild the mirror from the store.
    ///
    /// On failure the mirror is left empty and the error is handed back for reporting.
    /// Records that cannot be read are skipped with a warning.
    pub async fn load_all(&mut self) -> Result<&[Task], BoardError> {
        match self.fetch_all().await {
            Ok(tasks) => {
                self.tasks = tasks;
                Ok(&self.tasks)
            }
            Err(e) => {
                tracing::error!("Failed to load tasks: {}", e);
                self.tasks.clear();
                Err(e)
            }
        }
    }

    async fn fetch_all(&self) -> Result<Vec<Task>, BoardError> {
        let tree = self.store.get(paths::TASKS).await?;
        let records = decode_entries::<TaskRecord>("task", tree)?;

        Ok(records
            .into_iter()
            .filter_map(|(key, record)| match record.into_task(TaskKey::new(key)) {
                Ok(task) => Some(task),
                Err(e) => {
                    tracing::warn!("Skipping task: {}", e);
                    None
                }
            })
            .collect())
    }

    /// Validate the draft, store it under a fresh key and add it to the mirror.
    ///
    /// Assignees are resolved against `contacts`; unknown ids are skipped.
    pub async fn create(
        &mut self,
        draft: TaskDraft,
        status: TaskStatus,
        contacts: &[Contact],
    ) -> Result<Task, BoardError> {
        let due_date = validate_task_fields(
            &draft.title,
            &draft.category,
            &draft.due_date,
            self.clock.today(),
        )?;

        let now = self.clock.now_ms();
        let id = self.next_task_id(now);
        let assigned_to = resolve_assignees(&draft.assignees, contacts, now);
        let subtasks = draft
            .subtasks
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|description| Subtask {
                key: EntryKey::generate(now),
                description: description.to_string(),
                is_checked: false,
            })
            .collect();

        let mut task = Task {
            key: TaskKey::new(String::new()),
            id,
            timestamp: now,
            title: draft.title.trim().to_string(),
            description: draft.description.trim().to_string(),
            due_date,
            priority: draft.priority,
            category: draft.category.trim().to_string(),
            status,
            assigned_to,
            subtasks,
        };

        let record = to_json(&TaskRecord::from_task(&task))?;
        let key = self.store.post(paths::TASKS, &record).await.map_err(|e| {
            tracing::error!("Failed to create task {:?}: {}", task.title, e);
            e
        })?;
        task.key = TaskKey::new(key);

        tracing::info!("Created task {} ({})", task.key, task.title);
        self.tasks.push(task.clone());
        Ok(task)
    }

    /// Move a task to another column and refresh its timestamp.
    ///
    /// A task id that is not in the mirror is skipped with a warning and yields `None`.
    pub async fn update_status(
        &mut self,
        id: TaskId,
        status: TaskStatus,
    ) -> Result<Option<Task>, BoardError> {
        let Some(index) = self.tasks.iter().position(|t| t.id == id) else {
            tracing::warn!("No task with id {} to move to {}", id, status);
            return Ok(None);
        };

        let previous = self.tasks[index].timestamp;
        let timestamp = self.clock.now_ms().max(previous.saturating_add(1));
        let path = paths::task(&self.tasks[index].key);
        self.store
            .patch(&path, &json!({ "Status": status, "timestamp": timestamp }))
            .await
            .map_err(|e| {
                tracing::error!("Failed to move task {}: {}", id, e);
                e
            })?;

        let task = &mut self.tasks[index];
        task.status = status;
        task.timestamp = timestamp;
        Ok(Some(task.clone()))
    }

    /// Apply the edit form to a task and store the full replacement.
    ///
    /// Subtasks removed in the form are deleted individually after the main write; a
    /// failed subtask delete is logged and does not fail the edit.
    pub async fn update_full(
        &mut self,
        key: &TaskKey,
        update: TaskUpdate,
        contacts: &[Contact],
    ) -> Result<Task, BoardError> {
        let index = self.index_of(key)?;
        let mut task = self.tasks[index].clone();
        let now = self.clock.now_ms();

        let mut errors = ValidationErrors::new();
        if let Some(title) = &update.title {
            errors.check(Field::Title, validate_required(title));
            task.title = title.trim().to_string();
        }
        if let Some(raw) = &update.due_date {
            let today = self.clock.today();
            match validate_required(raw).and_then(|_| validate_due_date(raw.trim(), today)) {
                Ok(date) => task.due_date = date,
                Err(e) => {
                    errors.check(Field::DueDate, Err(e));
                }
            }
        }
        for (subtask_key, text) in &update.rename_subtasks {
            let Some(subtask) = task.subtasks.iter_mut().find(|s| &s.key == subtask_key) else {
                return Err(BoardError::SubtaskNotFound(subtask_key.clone()));
            };
            if text.trim().is_empty() {
                errors.check(Field::Subtask, Err(FieldError::Required));
            } else {
                subtask.description = text.trim().to_string();
            }
        }
        errors.into_result()?;

        if let Some(description) = update.description {
            task.description = description.trim().to_string();
        }
        if let Some(priority) = update.priority {
            task.priority = priority;
        }

        task.assigned_to
            .retain(|a| !update.unassign.contains(&a.contact.id));
        let new_ids: Vec<ContactId> = update
            .assign
            .iter()
            .filter(|id| !task.is_assigned(id))
            .cloned()
            .collect();
        task.assigned_to
            .extend(resolve_assignees(&new_ids, contacts, now));

        task.subtasks
            .retain(|s| !update.remove_subtasks.contains(&s.key));
        task.subtasks.extend(
            update
                .add_subtasks
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|description| Subtask {
                    key: EntryKey::generate(now),
                    description: description.to_string(),
                    is_checked: false,
                }),
        );

        let record = to_json(&TaskRecord::from_task(&task))?;
        self.store
            .put(&paths::task(key), &record)
            .await
            .map_err(|e| {
                tracing::error!("Failed to update task {}: {}", key, e);
                e
            })?;

        for subtask_key in &update.remove_subtasks {
            if let Err(e) = self.store.delete(&paths::subtask(key, subtask_key)).await {
                tracing::warn!(
                    "Failed to delete subtask {} of task {}: {}",
                    subtask_key,
                    key,
                    e
                );
            }
        }

        tracing::info!("Updated task {}", key);
        self.tasks[index] = task.clone();
        Ok(task)
    }

    /// Flip the checked flag of one subtask and store the whole task.
    pub async fn toggle_subtask(
        &mut self,
        key: &TaskKey,
        subtask_key: &EntryKey,
    ) -> Result<Task, BoardError> {
        let index = self.index_of(key)?;
        let mut task = self.tasks[index].clone();
        let subtask = task
            .subtasks
            .iter_mut()
            .find(|s| &s.key == subtask_key)
            .ok_or_else(|| BoardError::SubtaskNotFound(subtask_key.clone()))?;
        subtask.is_checked = !subtask.is_checked;

        let record = to_json(&TaskRecord::from_task(&task))?;
        self.store.put(&paths::task(key), &record).await?;

        self.tasks[index] = task.clone();
        Ok(task)
    }

    /// Delete the task node. Removing a key that is already gone is not an error.
    pub async fn delete(&mut self, key: &TaskKey) -> Result<(), BoardError> {
        self.store.delete(&paths::task(key)).await.map_err(|e| {
            tracing::error!("Failed to delete task {}: {}", key, e);
            e
        })?;
        self.tasks.retain(|t| &t.key != key);
        tracing::info!("Deleted task {}", key);
        Ok(())
    }

    /// One board column, oldest first.
    pub fn by_status(&self, status: TaskStatus) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.status == status)
            .sorted_by_key(|t| t.timestamp)
            .collect()
    }

    /// Tasks whose title or description contains `query`, ignoring case.
    pub fn search(&self, query: &str) -> Vec<&Task> {
        let needle = query.trim().to_lowercase();
        self.tasks
            .iter()
            .filter(|t| {
                needle.is_empty()
                    || t.title.to_lowercase().contains(&needle)
                    || t.description.to_lowercase().contains(&needle)
            })
            .sorted_by_key(|t| t.timestamp)
            .collect()
    }

    fn index_of(&self, key: &TaskKey) -> Result<usize, BoardError> {
        self.tasks
            .iter()
            .position(|t| &t.key == key)
            .ok_or_else(|| {
                tracing::warn!("No task with key {}", key);
                BoardError::TaskNotFound(key.clone())
            })
    }

    /// Millisecond ids, bumped above every id already on the board.
    fn next_task_id(&self, now: i64) -> TaskId {
        let highest = self.tasks.iter().map(|t| t.id.as_i64()).max();
        match highest {
            Some(highest) if highest >= now => TaskId::new(highest.saturating_add(1)),
            _ => TaskId::new(now),
        }
    }
}

/// Stable ascending sort by timestamp.
pub fn sort_by_timestamp(tasks: &mut [Task]) {
    tasks.sort_by_key(|t| t.timestamp);
}

fn resolve_assignees(ids: &[ContactId], contacts: &[Contact], now: i64) -> Vec<Assignment> {
    ids.iter()
        .unique()
        .filter_map(|id| match contacts.iter().find(|c| &c.id == id) {
            Some(contact) => Some(Assignment {
                entry_key: EntryKey::generate(now),
                contact: contact.to_assignee(),
            }),
            None => {
                tracing::warn!("Skipping unknown contact {} in assignment", id);
                None
            }
        })
        .collect()
}
