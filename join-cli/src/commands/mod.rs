mod account;
mod board;
mod contact;
mod task;

use std::sync::Arc;

use anyhow::Result;
use join_board::{domain::clock::SystemClock, Board};

use crate::{
    cli::{Cli, Commands},
    config::{self, Settings},
    session_store::SessionStore,
    store::Backend,
};

pub async fn run(cli: Cli, settings: &Settings) -> Result<()> {
    let session = SessionStore::open()?;

    // Commands that only touch local files.
    match cli.command {
        Commands::ConfigPath => {
            let path = config::ensure_default_file()?;
            println!("{}", path.display());
            return Ok(());
        }
        Commands::Guest => return account::guest(&session),
        Commands::Logout => return account::logout(&session),
        _ => {}
    }

    let backend = if cli.offline {
        Backend::offline()?
    } else {
        Backend::remote(&settings.store)?
    };
    let mut board = Board::new(
        backend.document_store(),
        Arc::new(SystemClock),
        settings.board_settings(),
    );

    let result = dispatch(cli.command, &mut board, &session).await;
    // Offline writes that happened before a failure are kept, like on the remote store.
    backend.persist()?;
    result
}

async fn dispatch(command: Commands, board: &mut Board, session: &SessionStore) -> Result<()> {
    match command {
        Commands::Signup {
            name,
            email,
            password,
            confirm,
        } => account::sign_up(board, name, email, password, confirm).await,
        Commands::Login {
            email,
            password,
            remember,
        } => account::login(board, session, email, password, remember).await,
        Commands::Whoami => account::whoami(board, session).await,
        Commands::Summary => board::summary(board, session).await,
        Commands::Board { search } => board::show(board, search.as_deref()).await,
        Commands::Task(command) => task::run(board, command).await,
        Commands::Contact(command) => contact::run(board, command).await,
        Commands::ConfigPath | Commands::Guest | Commands::Logout => Ok(()),
    }
}
