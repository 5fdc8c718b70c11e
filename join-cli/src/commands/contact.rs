use anyhow::{Context, Result};
use join_board::{
    domain::models::{Contact, ContactDraft, ContactId, ContactPatch},
    Board,
};

use crate::cli::ContactCommand;

pub async fn run(board: &mut Board, command: ContactCommand) -> Result<()> {
    board.load().await.context("Failed to load the board")?;

    match command {
        ContactCommand::List => {
            list(board.contacts().list());
            Ok(())
        }
        ContactCommand::Add { name, email, phone } => {
            let contact = board
                .create_contact(ContactDraft { name, email, phone })
                .await?;
            println!("Contact successfully created");
            print_contact(&contact);
            Ok(())
        }
        ContactCommand::Edit {
            id,
            name,
            email,
            phone,
        } => {
            let contact = board
                .update_contact(&ContactId::new(id), ContactPatch { name, email, phone })
                .await?;
            print_contact(&contact);
            Ok(())
        }
        ContactCommand::Delete { id } => {
            match board.delete_contact(&ContactId::new(id.as_str())).await? {
                Some(contact) => println!("Deleted {}.", contact.name),
                None => println!("Deleted contact {}.", id),
            }
            Ok(())
        }
    }
}

/// Contacts grouped under their first letter, as in the address book.
fn list(contacts: &[Contact]) {
    if contacts.is_empty() {
        println!("No contacts yet.");
        return;
    }

    let mut current: Option<String> = None;
    for contact in contacts {
        let letter = contact
            .name
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect::<String>())
            .unwrap_or_default();
        if current.as_deref() != Some(letter.as_str()) {
            println!("{}", letter);
            current = Some(letter);
        }
        println!(
            "  [{}] {} <{}>  {}",
            contact.initials(),
            contact.name,
            contact.email,
            contact.id
        );
    }
}

fn print_contact(contact: &Contact) {
    println!("{} [{}]", contact.name, contact.initials());
    println!("  id:    {}", contact.id);
    println!("  email: {}", contact.email);
    println!("  phone: {}", contact.phone);
    println!("  color: {}", contact.color);
}
