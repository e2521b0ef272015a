// Re-export needed modules for testing
pub mod app;
pub mod chats;
pub mod config;
pub mod contacts;
pub mod error;
pub mod models;
pub mod session;
pub mod timeline;

// Re-export main types for convenience
pub use app::{ChatApp, Dialog, Intent, Route};
pub use error::ChatError;
pub use models::*;

#[cfg(test)]
mod tests {
    use super::*;

    fn session(last_name: Option<&str>) -> UserSession {
        UserSession {
            id: 1,
            first_name: "Демо".to_string(),
            last_name: last_name.map(str::to_string),
            username: None,
            photo_url: None,
            auth_date: 0,
            hash: String::new(),
        }
    }

    #[test]
    fn test_display_name() {
        assert_eq!(session(Some("Пользователь")).display_name(), "Демо Пользователь");
        assert_eq!(session(Some("")).display_name(), "Демо");
        assert_eq!(session(None).display_name(), "Демо");
    }

    #[test]
    fn test_conversation_initial() {
        let chat = ConversationSummary {
            id: ConversationId::new(),
            name: "Сергей".to_string(),
            avatar: String::new(),
            last_message: String::new(),
            time_label: String::new(),
            unread: 0,
            online: true,
        };
        assert_eq!(chat.initial(), "С");

        let unnamed = ConversationSummary { name: String::new(), ..chat };
        assert_eq!(unnamed.initial(), "");
    }

    #[test]
    fn test_contact_access_defaults_to_prompt() {
        assert_eq!(ContactAccess::default(), ContactAccess::Prompt);
    }

    #[test]
    fn test_session_json_without_optional_fields() {
        let raw = r#"{"id": 5, "first_name": "Анна", "auth_date": 1700000000, "hash": "ff"}"#;
        let parsed: UserSession = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.last_name, None);
        assert_eq!(parsed.photo_url, None);
        assert_eq!(parsed.auth_date, 1_700_000_000);
    }
}
