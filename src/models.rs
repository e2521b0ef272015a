use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The locally stored record asserting who is logged in.
///
/// Field names follow the login widget payload so the persisted slot keeps
/// the same JSON shape the widget hands over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub id: i64,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// Unix seconds at which the widget authenticated the user
    pub auth_date: i64,
    /// Authentication tag (hex HMAC) issued by the widget
    pub hash: String,
}

impl UserSession {
    pub fn display_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub id: u64,
    pub name: String,
    pub phone: String,
    pub avatar: String,
    pub is_registered: bool,
}

/// Identifier of a conversation. Random, carries no ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversationId(pub Uuid);

impl ConversationId {
    pub fn new() -> Self {
        ConversationId(Uuid::new_v4())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A chat list row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub name: String,
    pub avatar: String,
    pub last_message: String,
    pub time_label: String,
    pub unread: u32,
    pub online: bool,
}

impl ConversationSummary {
    /// First letter of the name, used where an avatar image would go
    pub fn initial(&self) -> String {
        self.name.chars().next().map(String::from).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub text: String,
    pub time_label: String,
    pub is_outgoing: bool,
}

/// Where the contact permission flow stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContactAccess {
    #[default]
    Prompt,
    Granted,
    Denied,
}
