use anyhow::{Context, Result};
use join_board::{
    domain::models::{ContactId, EntryKey, TaskDraft, TaskId, TaskKey, TaskUpdate},
    Board,
};

use super::board::print_task;
use crate::cli::{TaskAddArgs, TaskCommand, TaskEditArgs};

pub async fn run(board: &mut Board, command: TaskCommand) -> Result<()> {
    board.load().await.context("Failed to load the board")?;

    match command {
        TaskCommand::Add(args) => add(board, args).await,
        TaskCommand::Edit(args) => edit(board, args).await,
        TaskCommand::Move { task_id, status } => {
            match board.move_task(TaskId::new(task_id), status).await? {
                Some(task) => println!("Moved \"{}\" to {}.", task.title, status.column_title()),
                None => println!("No task with id {}.", task_id),
            }
            Ok(())
        }
        TaskCommand::Check { key, subtask } => {
            let task = board
                .toggle_subtask(&TaskKey::new(key), &EntryKey::new(subtask))
                .await?;
            let (done, total) = task.subtask_progress();
            println!("{}: {}/{} Subtasks done.", task.title, done, total);
            Ok(())
        }
        TaskCommand::Delete { key } => {
            board.delete_task(&TaskKey::new(key.as_str())).await?;
            board.load().await?;
            println!("Deleted task {}.", key);
            Ok(())
        }
    }
}

async fn add(board: &mut Board, args: TaskAddArgs) -> Result<()> {
    let draft = TaskDraft {
        title: args.title,
        description: args.description,
        due_date: args.due,
        priority: args.priority,
        category: args.category,
        assignees: args.assign.into_iter().map(ContactId::from).collect(),
        subtasks: args.subtasks,
    };

    let task = board.create_task(draft, args.status).await?;
    println!("Task added to board.");
    print_task(&task);
    Ok(())
}

async fn edit(board: &mut Board, args: TaskEditArgs) -> Result<()> {
    let update = TaskUpdate {
        title: args.title,
        description: args.description,
        due_date: args.due,
        priority: args.priority,
        assign: args.assign.into_iter().map(ContactId::from).collect(),
        unassign: args.unassign.into_iter().map(ContactId::from).collect(),
        add_subtasks: args.add_subtasks,
        rename_subtasks: args
            .rename_subtasks
            .into_iter()
            .map(|(key, text)| (EntryKey::from(key), text))
            .collect(),
        remove_subtasks: args.remove_subtasks.into_iter().map(EntryKey::from).collect(),
    };

    let task = board.edit_task(&TaskKey::new(args.key), update).await?;
    print_task(&task);
    Ok(())
}
