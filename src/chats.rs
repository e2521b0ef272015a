use log::{debug, info};

use crate::models::{Contact, ConversationId, ConversationSummary};

/// Preview shown for a conversation nobody has written in yet
pub const NEW_CHAT_PREVIEW: &str = "Начните переписку";
/// Activity label of a freshly started conversation
pub const NEW_CHAT_TIME_LABEL: &str = "Сейчас";

/// Ordered chat list. New conversations go to the front.
#[derive(Debug, Clone, Default)]
pub struct ChatRegistry {
    chats: Vec<ConversationSummary>,
}

impl ChatRegistry {
    pub fn new(chats: Vec<ConversationSummary>) -> Self {
        ChatRegistry { chats }
    }

    /// The five conversations every fresh session starts with
    pub fn seeded() -> Self {
        let chats = [
            ("Алексей", "Давай встретимся завтра", "15:30", 2, true),
            ("Мария", "Спасибо за помощь!", "14:20", 0, true),
            ("Дмитрий", "Отправил файлы", "13:15", 1, false),
            ("Анна", "Как дела?", "Вчера", 0, false),
            ("Сергей", "Созвонимся вечером", "Вчера", 0, true),
        ]
        .into_iter()
        .map(|(name, last_message, time_label, unread, online)| ConversationSummary {
            id: ConversationId::new(),
            name: name.to_string(),
            avatar: String::new(),
            last_message: last_message.to_string(),
            time_label: time_label.to_string(),
            unread,
            online,
        })
        .collect();

        ChatRegistry::new(chats)
    }

    pub fn len(&self) -> usize {
        self.chats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConversationSummary> {
        self.chats.iter()
    }

    pub fn first(&self) -> Option<&ConversationSummary> {
        self.chats.first()
    }

    pub fn get(&self, id: ConversationId) -> Option<&ConversationSummary> {
        self.chats.iter().find(|c| c.id == id)
    }

    pub fn position(&self, id: ConversationId) -> Option<usize> {
        self.chats.iter().position(|c| c.id == id)
    }

    /// Conversations whose name contains `query`, ignoring case, in list order.
    /// An empty query matches everything.
    pub fn filter(&self, query: &str) -> Vec<&ConversationSummary> {
        let needle = query.to_lowercase();
        self.chats
            .iter()
            .filter(|c| c.name.to_lowercase().contains(&needle))
            .collect()
    }

    /// Return the conversation named like `contact`, or create one at the front.
    ///
    /// The flag is `true` when a conversation was created. Registration is not
    /// checked here; callers only pass registered contacts.
    pub fn start_or_resume(&mut self, contact: &Contact) -> (ConversationSummary, bool) {
        if let Some(existing) = self.chats.iter().find(|c| c.name == contact.name) {
            debug!("Resuming conversation {} with {}", existing.id, existing.name);
            return (existing.clone(), false);
        }

        let summary = ConversationSummary {
            id: ConversationId::new(),
            name: contact.name.clone(),
            avatar: contact.avatar.clone(),
            last_message: NEW_CHAT_PREVIEW.to_string(),
            time_label: NEW_CHAT_TIME_LABEL.to_string(),
            unread: 0,
            online: contact.is_registered,
        };
        info!("Started conversation {} with {}", summary.id, summary.name);
        self.chats.insert(0, summary.clone());
        (summary, true)
    }

    /// Refresh the preview after the local user sent `text`
    pub fn record_outgoing(&mut self, id: ConversationId, text: &str, time_label: &str) -> bool {
        match self.chats.iter_mut().find(|c| c.id == id) {
            Some(chat) => {
                chat.last_message = text.to_string();
                chat.time_label = time_label.to_string();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(name: &str, is_registered: bool) -> Contact {
        Contact {
            id: 1,
            name: name.to_string(),
            phone: String::new(),
            avatar: String::new(),
            is_registered,
        }
    }

    fn names(chats: &[&ConversationSummary]) -> Vec<String> {
        chats.iter().map(|c| c.name.clone()).collect()
    }

    #[test]
    fn empty_query_returns_everything_in_order() {
        let registry = ChatRegistry::seeded();
        assert_eq!(
            names(&registry.filter("")),
            vec!["Алексей", "Мария", "Дмитрий", "Анна", "Сергей"]
        );
    }

    #[test]
    fn filter_ignores_case() {
        let registry = ChatRegistry::seeded();
        assert_eq!(names(&registry.filter("АН")), vec!["Анна"]);
        assert_eq!(names(&registry.filter("ей")), vec!["Алексей", "Сергей"]);
        assert!(registry.filter("zzz").is_empty());
    }

    #[test]
    fn resume_returns_existing_without_growing() {
        let mut registry = ChatRegistry::seeded();
        let (first, created_first) = registry.start_or_resume(&contact("Мария", true));
        let (second, created_second) = registry.start_or_resume(&contact("Мария", true));

        assert!(!created_first && !created_second);
        assert_eq!(first.id, second.id);
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn new_contact_is_prepended() {
        let mut registry = ChatRegistry::seeded();
        let (summary, created) = registry.start_or_resume(&contact("Ольга Смирнова", false));

        assert!(created);
        assert_eq!(registry.len(), 6);
        assert_eq!(registry.position(summary.id), Some(0));
        assert_eq!(summary.last_message, NEW_CHAT_PREVIEW);
        assert_eq!(summary.time_label, NEW_CHAT_TIME_LABEL);
        assert_eq!(summary.unread, 0);
        assert!(!summary.online);
    }

    #[test]
    fn name_match_is_exact() {
        let mut registry = ChatRegistry::seeded();
        let (_, created) = registry.start_or_resume(&contact("мария", true));
        assert!(created);
    }

    #[test]
    fn record_outgoing_updates_preview_only() {
        let mut registry = ChatRegistry::seeded();
        let id = registry.first().unwrap().id;
        assert!(registry.record_outgoing(id, "До завтра", "16:05"));

        let chat = registry.get(id).unwrap();
        assert_eq!(chat.last_message, "До завтра");
        assert_eq!(chat.time_label, "16:05");
        assert_eq!(chat.unread, 2);
        assert!(!registry.record_outgoing(ConversationId::new(), "x", "y"));
    }
}
