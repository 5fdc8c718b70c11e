mod assignment_sync;
mod contact_repository;
mod summary;
mod task_repository;
mod user_directory;

pub use assignment_sync::{AssignmentSync, DEFAULT_MAX_CONFLICT_RETRIES};
pub use contact_repository::ContactRepository;
pub use summary::{greeting, greeting_line, task_label, BoardSummary};
pub use task_repository::{sort_by_timestamp, TaskRepository};
pub use user_directory::UserDirectory;
