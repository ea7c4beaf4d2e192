//! Trusted-contact persistence over the key-value store.
//!
//! Contact CRUD belongs to the presentation layer; the monitoring core only
//! reads the list, as a snapshot taken at session start. New contacts are
//! prepended so the most recently added contact is the first to receive a
//! manual alert.

use std::sync::Arc;

use crate::types::Contact;

use super::{keys, KeyValueStore, StoreError};

pub struct ContactStore {
    store: Arc<dyn KeyValueStore>,
}

impl ContactStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The current trusted-contact list, newest first. An unset key reads as
    /// an empty list; a malformed stored value is treated the same way and
    /// logged rather than surfaced.
    pub async fn contacts(&self) -> Result<Vec<Contact>, StoreError> {
        match self.store.get(keys::TRUSTED_CONTACTS).await? {
            Some(value) => match serde_json::from_value(value) {
                Ok(contacts) => Ok(contacts),
                Err(e) => {
                    log::warn!("Ignoring malformed contact list: {}", e);
                    Ok(Vec::new())
                }
            },
            None => Ok(Vec::new()),
        }
    }

    /// Add a contact at the front of the list.
    pub async fn save(&self, contact: Contact) -> Result<(), StoreError> {
        let mut contacts = self.contacts().await?;
        contacts.insert(0, contact);
        self.write(&contacts).await
    }

    /// Remove every contact matching both name and phone number.
    pub async fn delete(&self, contact: &Contact) -> Result<(), StoreError> {
        let contacts: Vec<Contact> = self
            .contacts()
            .await?
            .into_iter()
            .filter(|c| c != contact)
            .collect();
        self.write(&contacts).await
    }

    async fn write(&self, contacts: &[Contact]) -> Result<(), StoreError> {
        let value = serde_json::to_value(contacts)
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        self.store.set(keys::TRUSTED_CONTACTS, value).await
    }
}
