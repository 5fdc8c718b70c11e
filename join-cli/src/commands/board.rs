use anyhow::{Context, Result};
use chrono::{Local, Timelike};
use join_board::{
    domain::{
        models::{initials, Task, TaskStatus},
        services::{greeting_line, task_label},
    },
    Board,
};

use crate::session_store::{Session, SessionStore};

pub async fn summary(board: &mut Board, session: &SessionStore) -> Result<()> {
    board.load().await.context("Failed to load the board")?;

    let name = match session.session()? {
        Session::User(stored) => {
            board.users_mut().load_all().await?;
            board.users().find(&stored.id).map(|user| user.name.clone())
        }
        Session::Guest | Session::None => None,
    };

    let hour = Local::now().hour();
    if session.take_came_from_login()? {
        println!("Welcome to Join");
    }
    println!("{}", greeting_line(hour, name.as_deref()));
    println!();

    let summary = board.summary();
    println!("{:>4}  To-do", summary.to_do);
    println!("{:>4}  Done", summary.done);
    println!("{:>4}  Urgent   Upcoming deadline: {}", summary.urgent, summary.deadline_label());
    println!("{:>4}  {} in Board", summary.total, task_label(summary.total));
    println!(
        "{:>4}  {} in Progress",
        summary.in_progress,
        task_label(summary.in_progress)
    );
    println!("{:>4}  Awaiting Feedback", summary.await_feedback);
    Ok(())
}

pub async fn show(board: &mut Board, search: Option<&str>) -> Result<()> {
    board.load().await.context("Failed to load the board")?;

    let tasks = board.tasks();
    let matching: Vec<&Task> = match search {
        Some(query) => tasks.search(query),
        None => tasks.tasks().iter().collect(),
    };
    if search.is_some() && matching.is_empty() {
        println!("No results found");
        return Ok(());
    }

    for status in TaskStatus::ALL {
        println!("== {} ==", status.column_title());
        let column: Vec<&Task> = tasks
            .by_status(status)
            .into_iter()
            .filter(|task| matching.iter().any(|m| m.key == task.key))
            .collect();
        if column.is_empty() {
            println!("  No tasks {}", status.column_title());
        }
        for task in column {
            println!("  {}", card_line(task));
        }
        println!();
    }
    Ok(())
}

/// One-line card: id, title, priority, subtask progress and assignee initials.
pub(super) fn card_line(task: &Task) -> String {
    let (done, total) = task.subtask_progress();
    let progress = if total > 0 {
        format!(" {}/{} Subtasks", done, total)
    } else {
        String::new()
    };
    let badges = task
        .assigned_to
        .iter()
        .map(|a| initials(&a.contact.name))
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        "[{}] {} ({}, {}){} {}",
        task.id, task.title, task.category, task.priority, progress, badges
    )
    .trim_end()
    .to_string()
}

pub(super) fn print_task(task: &Task) {
    println!("{} [{}]", task.title, task.category);
    println!("  key:      {}", task.key);
    println!("  id:       {}", task.id);
    println!("  status:   {}", task.status.column_title());
    println!("  due:      {}", task.due_date);
    println!("  priority: {}", task.priority);
    if !task.description.is_empty() {
        println!("  {}", task.description);
    }
    if !task.assigned_to.is_empty() {
        println!("  assigned:");
        for assignment in &task.assigned_to {
            println!("    {} ({})", assignment.contact.name, assignment.contact.id);
        }
    }
    if !task.subtasks.is_empty() {
        println!("  subtasks:");
        for subtask in &task.subtasks {
            let mark = if subtask.is_checked { "x" } else { " " };
            println!("    [{}] {} ({})", mark, subtask.description, subtask.key);
        }
    }
}
