// Contact directory for the new-chat dialog
//
// Contacts come from an injected `ContactSource` picked at startup: the
// address-book adapter when one is configured, the fixed mock otherwise.

pub mod mock;
pub mod vcard;

use async_trait::async_trait;
use log::{info, warn};
use std::time::Duration;
use thiserror::Error;

use crate::error::ChatError;
use crate::models::{Contact, ContactAccess};

pub use mock::MockContactSource;
pub use vcard::VcardContactSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactProperty {
    Name,
    Tel,
}

/// What the directory asks a source for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickRequest {
    pub properties: Vec<ContactProperty>,
    pub multiple: bool,
}

impl Default for PickRequest {
    fn default() -> Self {
        PickRequest {
            properties: vec![ContactProperty::Name, ContactProperty::Tel],
            multiple: true,
        }
    }
}

impl PickRequest {
    pub fn wants(&self, property: ContactProperty) -> bool {
        self.properties.contains(&property)
    }
}

#[derive(Error, Debug)]
pub enum ContactSourceError {
    #[error("access denied: {0}")]
    Denied(String),
}

#[async_trait]
pub trait ContactSource: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Ask for contacts. May wait on the user or the filesystem.
    async fn pick(&self, request: &PickRequest) -> Result<Vec<Contact>, ContactSourceError>;
}

pub struct ContactDirectory {
    source: Box<dyn ContactSource>,
    access: ContactAccess,
    contacts: Vec<Contact>,
    timeout: Option<Duration>,
}

impl ContactDirectory {
    pub fn new(source: Box<dyn ContactSource>) -> Self {
        ContactDirectory {
            source,
            access: ContactAccess::Prompt,
            contacts: Vec::new(),
            timeout: None,
        }
    }

    /// Treat a pick that takes longer than `timeout` as a denial
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn access(&self) -> ContactAccess {
        self.access
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Back to `Prompt` with nothing fetched
    pub fn reset(&mut self) {
        self.access = ContactAccess::Prompt;
        self.contacts.clear();
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Ask the source for contacts, moving to `Granted` or `Denied`.
    ///
    /// A denial keeps whatever contacts were fetched earlier; calling again
    /// re-asks the source.
    pub async fn request_access(&mut self) -> Result<&[Contact], ChatError> {
        let request = PickRequest::default();
        info!("Requesting contacts from {} source", self.source.name());

        let picked = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.source.pick(&request)).await {
                Ok(result) => result,
                Err(_) => Err(ContactSourceError::Denied(format!(
                    "no answer within {}ms",
                    limit.as_millis()
                ))),
            },
            None => self.source.pick(&request).await,
        };

        match picked {
            Ok(contacts) => {
                info!("Contact access granted, {} contacts", contacts.len());
                self.contacts = contacts;
                self.access = ContactAccess::Granted;
                Ok(&self.contacts)
            }
            Err(ContactSourceError::Denied(reason)) => {
                warn!("Contact access denied: {}", reason);
                self.access = ContactAccess::Denied;
                Err(ChatError::AccessDenied(reason))
            }
        }
    }

    /// Contacts whose name or phone contains `query`, ignoring case
    pub fn filter(&self, query: &str) -> Vec<&Contact> {
        let needle = query.trim().to_lowercase();
        self.contacts
            .iter()
            .filter(|c| {
                needle.is_empty()
                    || c.name.to_lowercase().contains(&needle)
                    || c.phone.to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn find(&self, id: u64) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.id == id)
    }
}
