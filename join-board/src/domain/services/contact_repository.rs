use std::sync::Arc;

use crate::domain::{
    models::{compare_names, random_color, Contact, ContactDraft, ContactId, ContactPatch},
    paths,
    ports::outbound::DocumentStore,
    schema::{decode_entries, to_json, ContactRecord},
    validation::{validate_contact, Field, FieldError, ValidationErrors},
    BoardError,
};

use super::AssignmentSync;

/// In-memory mirror of the `contacts` collection, kept sorted by name.
///
/// Edits and deletes run the assignment sync so that task snapshots follow the contact.
pub struct ContactRepository {
    store: Arc<dyn DocumentStore>,
    sync: AssignmentSync,
    contacts: Vec<Contact>,
}

impl ContactRepository {
    pub fn new(store: Arc<dyn DocumentStore>, sync: AssignmentSync) -> Self {
        Self {
            store,
            sync,
            contacts: Vec::new(),
        }
    }

    pub fn list(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn get(&self, id: &ContactId) -> Option<&Contact> {
        self.contacts.iter().find(|c| &c.id == id)
    }

    pub async fn load_all(&mut self) -> Result<&[Contact], BoardError> {
        let loaded = async {
            let tree = self.store.get(paths::CONTACTS).await?;
            decode_entries::<ContactRecord>("contact", tree)
        }
        .await;

        match loaded {
            Ok(records) => {
                self.contacts = records
                    .into_iter()
                    .map(|(key, record)| record.into_contact(&key))
                    .collect();
                self.sort();
                Ok(&self.contacts)
            }
            Err(e) => {
                tracing::error!("Failed to load contacts: {}", e);
                self.contacts.clear();
                Err(e)
            }
        }
    }

    pub async fn create(&mut self, draft: ContactDraft) -> Result<Contact, BoardError> {
        let email = draft.email.trim().to_lowercase();
        let mut errors = validate_contact(&draft.name, &email, &draft.phone);
        self.check_email_free(&email, None, &mut errors);
        errors.into_result()?;

        let contact = Contact {
            id: ContactId::generate(),
            name: draft.name.trim().to_string(),
            email,
            phone: draft.phone.trim().to_string(),
            color: random_color(),
        };

        let record = to_json(&ContactRecord::from_contact(&contact))?;
        self.store
            .put(&paths::contact(&contact.id), &record)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create contact {}: {}", contact.name, e);
                e
            })?;

        tracing::info!("Created contact {} ({})", contact.id, contact.name);
        self.contacts.push(contact.clone());
        self.sort();
        Ok(contact)
    }

    /// Store the edited contact, then rewrite every task that has it assigned.
    ///
    /// The color is kept.
    pub async fn update(
        &mut self,
        id: &ContactId,
        patch: ContactPatch,
    ) -> Result<Contact, BoardError> {
        let Some(index) = self.contacts.iter().position(|c| &c.id == id) else {
            tracing::warn!("No contact with id {} to update", id);
            return Err(BoardError::ContactNotFound(id.clone()));
        };

        let mut contact = self.contacts[index].clone();
        if let Some(name) = patch.name {
            contact.name = name;
        }
        if let Some(email) = patch.email {
            contact.email = email.trim().to_lowercase();
        }
        if let Some(phone) = patch.phone {
            contact.phone = phone;
        }

        let mut errors = validate_contact(&contact.name, &contact.email, &contact.phone);
        self.check_email_free(&contact.email, Some(id), &mut errors);
        errors.into_result()?;
        contact.name = contact.name.trim().to_string();
        contact.phone = contact.phone.trim().to_string();

        let record = to_json(&ContactRecord::from_contact(&contact))?;
        self.store
            .put(&paths::contact(id), &record)
            .await
            .map_err(|e| {
                tracing::error!("Failed to update contact {}: {}", id, e);
                e
            })?;

        self.contacts[index] = contact.clone();
        self.sort();
        self.sync.propagate_update(&contact).await?;
        Ok(contact)
    }

    /// Delete the contact and strip it from every task.
    ///
    /// The store delete is always issued, so deleting twice is harmless. The mirror drops
    /// the contact as soon as the store has, even if stripping it from tasks then fails.
    /// Returns the contact if it was still in the mirror.
    pub async fn delete(&mut self, id: &ContactId) -> Result<Option<Contact>, BoardError> {
        self.store.delete(&paths::contact(id)).await.map_err(|e| {
            tracing::error!("Failed to delete contact {}: {}", id, e);
            e
        })?;
        let removed = self
            .contacts
            .iter()
            .position(|c| &c.id == id)
            .map(|index| self.contacts.remove(index));
        tracing::info!("Deleted contact {}", id);

        self.sync.propagate_delete(id).await?;
        Ok(removed)
    }

    fn check_email_free(
        &self,
        email: &str,
        except: Option<&ContactId>,
        errors: &mut ValidationErrors,
    ) {
        if errors.get(Field::Email).is_some() {
            return;
        }
        let taken = self
            .contacts
            .iter()
            .filter(|c| Some(&c.id) != except)
            .any(|c| c.email.eq_ignore_ascii_case(email));
        if taken {
            errors.check(Field::Email, Err(FieldError::EmailTaken));
        }
    }

    fn sort(&mut self) {
        self.contacts.sort_by(|a, b| compare_names(&a.name, &b.name));
    }
}
