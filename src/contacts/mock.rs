use async_trait::async_trait;

use super::{ContactSource, ContactSourceError, PickRequest};
use crate::models::Contact;

/// Fixed directory used when no address book is available. Never denies.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockContactSource;

pub fn mock_contacts() -> Vec<Contact> {
    [
        (101, "Иван Петров", "+7 999 123 45 67", true),
        (102, "Елена Сидорова", "+7 999 234 56 78", true),
        (103, "Михаил Кузнецов", "+7 999 345 67 89", false),
        (104, "Ольга Смирнова", "+7 999 456 78 90", true),
        (105, "Владимир Попов", "+7 999 567 89 01", true),
    ]
    .into_iter()
    .map(|(id, name, phone, is_registered)| Contact {
        id,
        name: name.to_string(),
        phone: phone.to_string(),
        avatar: String::new(),
        is_registered,
    })
    .collect()
}

#[async_trait]
impl ContactSource for MockContactSource {
    fn name(&self) -> &'static str {
        "mock"
    }

    // Every field of every entry, whatever was requested
    async fn pick(&self, _request: &PickRequest) -> Result<Vec<Contact>, ContactSourceError> {
        Ok(mock_contacts())
    }
}
