use std::sync::Arc;

use crate::domain::{
    clock::TimeSource,
    models::{
        Contact, ContactDraft, ContactId, ContactPatch, EntryKey, Task, TaskDraft, TaskId,
        TaskKey, TaskStatus, TaskUpdate,
    },
    ports::outbound::DocumentStore,
    services::{
        AssignmentSync, BoardSummary, ContactRepository, TaskRepository, UserDirectory,
        DEFAULT_MAX_CONFLICT_RETRIES,
    },
    BoardError,
};

#[derive(Debug, Clone, Copy)]
pub struct BoardSettings {
    /// Attempts for the version-checked rewrite of `tasks` after a contact change.
    pub max_conflict_retries: u32,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
        }
    }
}

/// One user's view of the board: repositories sharing a single store.
///
/// Contact edits and deletes rewrite tasks in the store, so they reload the task mirror
/// afterwards.
pub struct Board {
    tasks: TaskRepository,
    contacts: ContactRepository,
    users: UserDirectory,
    clock: Arc<dyn TimeSource>,
}

impl Board {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn TimeSource>,
        settings: BoardSettings,
    ) -> Self {
        let sync = AssignmentSync::new(store.clone(), settings.max_conflict_retries);
        Self {
            tasks: TaskRepository::new(store.clone(), clock.clone()),
            contacts: ContactRepository::new(store.clone(), sync),
            users: UserDirectory::new(store),
            clock,
        }
    }

    pub fn tasks(&self) -> &TaskRepository {
        &self.tasks
    }

    pub fn contacts(&self) -> &ContactRepository {
        &self.contacts
    }

    pub fn users(&self) -> &UserDirectory {
        &self.users
    }

    pub fn users_mut(&mut self) -> &mut UserDirectory {
        &mut self.users
    }

    /// Load contacts, then tasks.
    pub async fn load(&mut self) -> Result<(), BoardError> {
        self.contacts.load_all().await?;
        self.tasks.load_all().await?;
        Ok(())
    }

    pub async fn create_task(
        &mut self,
        draft: TaskDraft,
        status: TaskStatus,
    ) -> Result<Task, BoardError> {
        self.tasks
            .create(draft, status, self.contacts.list())
            .await
    }

    pub async fn edit_task(
        &mut self,
        key: &TaskKey,
        update: TaskUpdate,
    ) -> Result<Task, BoardError> {
        self.tasks
            .update_full(key, update, self.contacts.list())
            .await
    }

    pub async fn move_task(
        &mut self,
        id: TaskId,
        status: TaskStatus,
    ) -> Result<Option<Task>, BoardError> {
        self.tasks.update_status(id, status).await
    }

    pub async fn toggle_subtask(
        &mut self,
        key: &TaskKey,
        subtask: &EntryKey,
    ) -> Result<Task, BoardError> {
        self.tasks.toggle_subtask(key, subtask).await
    }

    pub async fn delete_task(&mut self, key: &TaskKey) -> Result<(), BoardError> {
        self.tasks.delete(key).await
    }

    pub async fn create_contact(&mut self, draft: ContactDraft) -> Result<Contact, BoardError> {
        self.contacts.create(draft).await
    }

    pub async fn update_contact(
        &mut self,
        id: &ContactId,
        patch: ContactPatch,
    ) -> Result<Contact, BoardError> {
        let contact = self.contacts.update(id, patch).await?;
        self.tasks.load_all().await?;
        Ok(contact)
    }

    pub async fn delete_contact(&mut self, id: &ContactId) -> Result<Option<Contact>, BoardError> {
        let removed = self.contacts.delete(id).await?;
        self.tasks.load_all().await?;
        Ok(removed)
    }

    pub fn summary(&self) -> BoardSummary {
        BoardSummary::from_tasks(self.tasks.tasks(), self.clock.today())
    }
}
