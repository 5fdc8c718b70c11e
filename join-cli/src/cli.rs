use clap::{Args, Parser, Subcommand};
use join_board::domain::models::{Priority, TaskStatus};

#[derive(Debug, Parser)]
#[command(name = "join")]
#[command(about = "Kanban board for tasks and contacts")]
pub struct Cli {
    /// Work on a local JSON file instead of the remote store
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Register a new user
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm: String,
    },
    /// Log in; without credentials the remembered user is used
    Login {
        #[arg(long, requires = "password")]
        email: Option<String>,
        #[arg(long, requires = "email")]
        password: Option<String>,
        /// Remember the user for the next login
        #[arg(long)]
        remember: bool,
    },
    /// Continue as guest
    Guest,
    /// Forget the current session
    Logout,
    /// Show who is logged in
    Whoami,
    /// Greeting, task counts and the next deadline
    Summary,
    /// Show the board columns
    Board {
        /// Only tasks whose title or description contains this text
        #[arg(long)]
        search: Option<String>,
    },
    /// Create, edit, move or delete tasks
    #[command(subcommand)]
    Task(TaskCommand),
    /// Manage contacts
    #[command(subcommand)]
    Contact(ContactCommand),
    /// Print config path and create default file if missing
    ConfigPath,
}

#[derive(Debug, Subcommand)]
pub enum TaskCommand {
    /// Add a task
    Add(TaskAddArgs),
    /// Edit a task by its store key
    Edit(TaskEditArgs),
    /// Move a task to another column, e.g. `join task move 1718000000000 done`
    Move {
        task_id: i64,
        status: TaskStatus,
    },
    /// Toggle a subtask between open and done
    Check { key: String, subtask: String },
    /// Delete a task by its store key
    Delete { key: String },
}

#[derive(Debug, Args)]
pub struct TaskAddArgs {
    #[arg(long)]
    pub title: String,
    /// Due date as YYYY-MM-DD
    #[arg(long)]
    pub due: String,
    #[arg(long)]
    pub category: String,
    #[arg(long, default_value = "")]
    pub description: String,
    #[arg(long, default_value_t = Priority::Medium)]
    pub priority: Priority,
    #[arg(long, default_value_t = TaskStatus::ToDo)]
    pub status: TaskStatus,
    /// Contact id to assign; repeatable
    #[arg(long = "assign")]
    pub assign: Vec<String>,
    /// Subtask text; repeatable
    #[arg(long = "subtask")]
    pub subtasks: Vec<String>,
}

#[derive(Debug, Args)]
pub struct TaskEditArgs {
    pub key: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub due: Option<String>,
    #[arg(long)]
    pub priority: Option<Priority>,
    #[arg(long = "assign")]
    pub assign: Vec<String>,
    #[arg(long = "unassign")]
    pub unassign: Vec<String>,
    #[arg(long = "add-subtask")]
    pub add_subtasks: Vec<String>,
    /// `<subtask key>=<new text>`; repeatable
    #[arg(long = "rename-subtask", value_parser = parse_rename)]
    pub rename_subtasks: Vec<(String, String)>,
    #[arg(long = "remove-subtask")]
    pub remove_subtasks: Vec<String>,
}

#[derive(Debug, Subcommand)]
pub enum ContactCommand {
    /// List all contacts
    List,
    /// Add a contact
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
    },
    /// Edit a contact; assigned tasks follow the change
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Delete a contact and remove it from all tasks
    Delete { id: String },
}

fn parse_rename(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, text)| (key.to_string(), text.to_string()))
        .ok_or_else(|| format!("expected <subtask key>=<text>, got {:?}", raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_task_move_with_spaced_status() {
        let cli = Cli::parse_from(["join", "task", "move", "42", "await feedback"]);

        match cli.command {
            Commands::Task(TaskCommand::Move { task_id, status }) => {
                assert_eq!(task_id, 42);
                assert_eq!(status, TaskStatus::AwaitFeedback);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_repeatable_assignees_and_offline_flag() {
        let cli = Cli::parse_from([
            "join", "task", "add", "--title", "Plan", "--due", "2030-01-01", "--category",
            "User Story", "--assign", "c1", "--assign", "c2", "--priority", "urgent", "--offline",
        ]);

        assert!(cli.offline);
        match cli.command {
            Commands::Task(TaskCommand::Add(args)) => {
                assert_eq!(args.assign, vec!["c1", "c2"]);
                assert_eq!(args.priority, Priority::Urgent);
                assert_eq!(args.status, TaskStatus::ToDo);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rename_subtask_needs_key_and_text() {
        assert_eq!(
            parse_rename("-17-abc=New text").unwrap(),
            ("-17-abc".to_string(), "New text".to_string())
        );
        assert!(parse_rename("no-separator").is_err());
    }
}
