use anyhow::{bail, Context, Result};
use join_board::{
    domain::{models::SignUp, AuthError},
    Board,
};

use crate::session_store::{Session, SessionStore};

pub async fn sign_up(
    board: &mut Board,
    name: String,
    email: String,
    password: String,
    confirm_password: String,
) -> Result<()> {
    let user = board
        .users_mut()
        .sign_up(SignUp {
            name,
            email,
            password,
            confirm_password,
        })
        .await?;

    println!("You signed up successfully as {} ({}).", user.name, user.email);
    println!("Log in with `join login --email {}`.", user.email);
    Ok(())
}

pub async fn login(
    board: &mut Board,
    session: &SessionStore,
    email: Option<String>,
    password: Option<String>,
    remember: bool,
) -> Result<()> {
    board
        .users_mut()
        .load_all()
        .await
        .context("Failed to load users")?;

    let (email, password, remember) = match (email, password) {
        (Some(email), Some(password)) => (email, password, remember),
        _ => {
            // Prefill from a remembered user, as the login form does.
            let remembered = session
                .stored_user()?
                .filter(|stored| stored.remember_me)
                .and_then(|stored| board.users().find(&stored.id).cloned());
            match remembered {
                Some(user) => (user.email, user.password, true),
                None => bail!("No remembered user. Pass --email and --password."),
            }
        }
    };

    let user = match board.users().login(email.trim(), &password) {
        Ok(user) => user,
        Err(AuthError::UnknownEmail | AuthError::InvalidCredentials) => {
            bail!("Check your email and password. Please try again.")
        }
        Err(AuthError::Board(err)) => return Err(err.into()),
    };

    session.login_user(&user.id, remember)?;
    tracing::info!(user = %user.id, "logged in");
    println!("Logged in as {}.", user.name);
    Ok(())
}

pub fn guest(session: &SessionStore) -> Result<()> {
    session.login_guest()?;
    println!("Continuing as guest.");
    Ok(())
}

pub fn logout(session: &SessionStore) -> Result<()> {
    session.logout()?;
    println!("Logged out.");
    Ok(())
}

pub async fn whoami(board: &mut Board, session: &SessionStore) -> Result<()> {
    match session.session()? {
        Session::User(stored) => {
            board.users_mut().load_all().await?;
            match board.users().find(&stored.id) {
                Some(user) => println!("{} <{}> [{}]", user.name, user.email, user.initials),
                None => println!("Logged in as unknown user {}", stored.id),
            }
        }
        Session::Guest => println!("Guest [G]"),
        Session::None => println!("Not logged in"),
    }
    Ok(())
}
