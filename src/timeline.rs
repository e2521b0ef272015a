use chrono::{DateTime, Local};
use uuid::Uuid;

use crate::models::Message;

/// Display format of message times (24h, zero padded)
pub const TIME_FORMAT: &str = "%H:%M";

/// Ordered messages of one conversation. Append only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageTimeline {
    messages: Vec<Message>,
}

impl MessageTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// History shown for the first seeded conversation
    pub fn seeded() -> Self {
        let messages = [
            ("Привет! Как дела?", "15:20", false),
            ("Привет! Все отлично, спасибо", "15:22", true),
            ("Давай встретимся завтра", "15:30", false),
        ]
        .into_iter()
        .map(|(text, time_label, is_outgoing)| Message {
            id: Uuid::new_v4(),
            text: text.to_string(),
            time_label: time_label.to_string(),
            is_outgoing,
        })
        .collect();

        MessageTimeline { messages }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Append an outgoing message stamped with the current local time.
    /// Blank text is ignored.
    pub fn append(&mut self, text: &str) -> Option<Message> {
        self.append_at(text, Local::now())
    }

    pub fn append_at(&mut self, text: &str, at: DateTime<Local>) -> Option<Message> {
        if text.trim().is_empty() {
            return None;
        }

        let message = Message {
            id: Uuid::new_v4(),
            text: text.to_string(),
            time_label: at.format(TIME_FORMAT).to_string(),
            is_outgoing: true,
        };
        self.messages.push(message.clone());
        Some(message)
    }
}
