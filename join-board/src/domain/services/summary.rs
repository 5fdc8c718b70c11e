use time::{macros::format_description, Date};

use crate::domain::models::{Priority, Task, TaskStatus};

/// Figures shown on the summary page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSummary {
    pub total: usize,
    pub to_do: usize,
    pub in_progress: usize,
    pub await_feedback: usize,
    pub done: usize,
    pub urgent: usize,
    /// Earliest due date strictly after today.
    pub upcoming_deadline: Option<Date>,
}

impl BoardSummary {
    pub fn from_tasks(tasks: &[Task], today: Date) -> Self {
        let count = |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count();

        Self {
            total: tasks.len(),
            to_do: count(TaskStatus::ToDo),
            in_progress: count(TaskStatus::InProgress),
            await_feedback: count(TaskStatus::AwaitFeedback),
            done: count(TaskStatus::Done),
            urgent: tasks
                .iter()
                .filter(|t| t.priority == Priority::Urgent)
                .count(),
            upcoming_deadline: tasks
                .iter()
                .map(|t| t.due_date)
                .filter(|due| *due > today)
                .min(),
        }
    }

    pub fn count(&self, status: TaskStatus) -> usize {
        match status {
            TaskStatus::ToDo => self.to_do,
            TaskStatus::InProgress => self.in_progress,
            TaskStatus::AwaitFeedback => self.await_feedback,
            TaskStatus::Done => self.done,
        }
    }

    /// "October 5, 2026", or "No upcoming deadline".
    pub fn deadline_label(&self) -> String {
        self.upcoming_deadline
            .and_then(|date| {
                date.format(format_description!(
                    "[month repr:long] [day padding:none], [year]"
                ))
                .ok()
            })
            .unwrap_or_else(|| "No upcoming deadline".to_string())
    }
}

/// Greeting for the given local hour (0-23).
pub fn greeting(hour: u32) -> &'static str {
    match hour {
        0..=5 => "Good Night",
        6..=11 => "Good Morning",
        12..=13 => "Good Noon",
        14..=17 => "Good Afternoon",
        18..=23 => "Good Evening",
        _ => "Hello",
    }
}

/// "Good Morning, Anna Muster" for a named user, "Good Morning!" for a guest.
pub fn greeting_line(hour: u32, name: Option<&str>) -> String {
    match name {
        Some(name) => format!("{}, {}", greeting(hour), name),
        None => format!("{}!", greeting(hour)),
    }
}

pub fn task_label(count: usize) -> &'static str {
    if count == 1 {
        "Task"
    } else {
        "Tasks"
    }
}
