//! Application state container.
//!
//! `ChatApp` owns every piece of client state. The terminal front-end reads
//! it to draw and hands user actions back as [`Intent`]s; it never keeps a
//! copy of its own.

use chrono::Utc;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::chats::ChatRegistry;
use crate::config::{AppConfig, DEFAULT_REDIRECT_DELAY};
use crate::contacts::{ContactDirectory, ContactSource, MockContactSource, VcardContactSource};
use crate::error::ChatError;
use crate::models::{Contact, ContactAccess, ConversationId, ConversationSummary, Message, UserSession};
use crate::session::{demo_session, AuthPolicy, SessionStore, UntrustedLogin};
use crate::timeline::MessageTimeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialog {
    Profile,
    NewChat,
    VideoCall,
}

/// A user action raised by the view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    DemoLogin,
    /// Raw JSON payload from the login widget
    SubmitLogin(String),
    Logout,
    SelectChat(ConversationId),
    SetSearch(String),
    SendMessage(String),
    OpenDialog(Dialog),
    CloseDialog,
    RequestContacts,
    SetContactSearch(String),
    StartChat(u64),
}

pub struct ChatApp {
    store: SessionStore,
    policy: AuthPolicy,
    redirect_delay: Duration,
    session: Option<UserSession>,
    route: Route,
    pending_redirect: Option<Instant>,
    directory: ContactDirectory,
    registry: ChatRegistry,
    timelines: HashMap<ConversationId, MessageTimeline>,
    selected: Option<ConversationId>,
    search: String,
    contact_search: String,
    dialog: Option<Dialog>,
}

impl ChatApp {
    /// Fresh state with the seeded chat list; the first chat is selected.
    pub fn new(store: SessionStore, policy: AuthPolicy, directory: ContactDirectory) -> Self {
        let (registry, timelines, selected) = seeded_conversations();

        ChatApp {
            store,
            policy,
            redirect_delay: DEFAULT_REDIRECT_DELAY,
            session: None,
            route: Route::Login,
            pending_redirect: None,
            directory,
            registry,
            timelines,
            selected,
            search: String::new(),
            contact_search: String::new(),
            dialog: None,
        }
    }

    /// Wire up store, policy and contact source from `config`.
    pub fn from_config(config: &AppConfig) -> Self {
        let source: Box<dyn ContactSource> = match &config.contacts_file {
            Some(path) => Box::new(VcardContactSource::new(path.clone())),
            None => Box::new(MockContactSource),
        };
        let mut directory = ContactDirectory::new(source);
        if let Some(limit) = config.contacts_timeout {
            directory = directory.with_timeout(limit);
        }
        info!("Using {} contact source", directory.source_name());

        ChatApp::new(
            SessionStore::in_dir(&config.data_dir),
            config.auth_policy(),
            directory,
        )
        .with_redirect_delay(config.login_redirect_delay)
    }

    pub fn with_redirect_delay(mut self, delay: Duration) -> Self {
        self.redirect_delay = delay;
        self
    }

    /// Read the stored session and pick the starting screen.
    pub fn bootstrap(&mut self) -> Result<Route, ChatError> {
        self.session = self.store.load()?;
        self.route = if self.session.is_some() {
            Route::Chat
        } else {
            Route::Login
        };
        info!("Starting on {:?} screen", self.route);
        Ok(self.route)
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn session(&self) -> Option<&UserSession> {
        self.session.as_ref()
    }

    /// Whether a login succeeded and the redirect has not fired yet
    pub fn is_logging_in(&self) -> bool {
        self.pending_redirect.is_some()
    }

    /// Verify a widget payload, store it and schedule the redirect.
    pub fn login(&mut self, login: UntrustedLogin) -> Result<&UserSession, ChatError> {
        let session = login.verify(&self.policy, Utc::now())?;
        self.accept_session(session)
    }

    pub fn demo_login(&mut self) -> Result<&UserSession, ChatError> {
        if !self.policy.allow_demo {
            return Err(ChatError::DemoLoginDisabled);
        }
        self.accept_session(demo_session(Utc::now()))
    }

    fn accept_session(&mut self, session: UserSession) -> Result<&UserSession, ChatError> {
        self.store.save(&session)?;
        info!("User {} logged in", session.id);
        self.pending_redirect = Some(Instant::now() + self.redirect_delay);
        Ok(&*self.session.insert(session))
    }

    /// Move to the chat screen once the login delay has passed.
    /// Returns `true` when the redirect fired on this call.
    pub fn poll_redirect(&mut self, now: Instant) -> bool {
        match self.pending_redirect {
            Some(due) if now >= due => {
                self.pending_redirect = None;
                self.route = Route::Chat;
                debug!("Login redirect fired");
                true
            }
            _ => false,
        }
    }

    /// Forget the user and everything they did in this process.
    pub fn logout(&mut self) -> Result<(), ChatError> {
        self.store.clear()?;
        self.session = None;
        self.pending_redirect = None;
        self.dialog = None;
        self.route = Route::Login;

        let (registry, timelines, selected) = seeded_conversations();
        self.registry = registry;
        self.timelines = timelines;
        self.selected = selected;
        self.search.clear();
        self.contact_search.clear();
        self.directory.reset();
        info!("Logged out");
        Ok(())
    }

    pub fn chats(&self) -> &ChatRegistry {
        &self.registry
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, query: &str) {
        self.search = query.to_string();
    }

    /// The chat list as the view shows it
    pub fn filtered_chats(&self) -> Vec<&ConversationSummary> {
        self.registry.filter(&self.search)
    }

    pub fn select_chat(&mut self, id: ConversationId) -> Result<(), ChatError> {
        if self.registry.get(id).is_none() {
            return Err(ChatError::UnknownConversation(id.to_string()));
        }
        self.selected = Some(id);
        self.timelines.entry(id).or_default();
        Ok(())
    }

    pub fn selected_id(&self) -> Option<ConversationId> {
        self.selected
    }

    pub fn selected_chat(&self) -> Option<&ConversationSummary> {
        self.selected.and_then(|id| self.registry.get(id))
    }

    pub fn active_timeline(&self) -> Option<&MessageTimeline> {
        self.selected.and_then(|id| self.timelines.get(&id))
    }

    pub fn timeline(&self, id: ConversationId) -> Option<&MessageTimeline> {
        self.timelines.get(&id)
    }

    /// Append `text` to the selected conversation and refresh its preview.
    pub fn send_message(&mut self, text: &str) -> Result<Message, ChatError> {
        let id = self.selected.ok_or(ChatError::NoActiveConversation)?;
        let message = self
            .timelines
            .entry(id)
            .or_default()
            .append(text)
            .ok_or(ChatError::EmptyInput)?;
        self.registry.record_outgoing(id, &message.text, &message.time_label);
        debug!("Sent message {} in conversation {}", message.id, id);
        Ok(message)
    }

    pub fn dialog(&self) -> Option<Dialog> {
        self.dialog
    }

    pub fn open_dialog(&mut self, dialog: Dialog) -> Result<(), ChatError> {
        if dialog == Dialog::VideoCall && self.selected.is_none() {
            return Err(ChatError::NoActiveConversation);
        }
        if dialog == Dialog::NewChat {
            self.contact_search.clear();
        }
        self.dialog = Some(dialog);
        Ok(())
    }

    pub fn close_dialog(&mut self) {
        self.dialog = None;
    }

    pub fn contact_access(&self) -> ContactAccess {
        self.directory.access()
    }

    pub fn contacts(&self) -> &[Contact] {
        self.directory.contacts()
    }

    pub fn contact_search(&self) -> &str {
        &self.contact_search
    }

    pub fn set_contact_search(&mut self, query: &str) {
        self.contact_search = query.to_string();
    }

    pub fn filtered_contacts(&self) -> Vec<&Contact> {
        self.directory.filter(&self.contact_search)
    }

    /// Ask the contact source. Returns how many contacts are now known.
    pub async fn request_contacts(&mut self) -> Result<usize, ChatError> {
        let contacts = self.directory.request_access().await?;
        Ok(contacts.len())
    }

    /// Open (or create) the conversation with `contact` and select it.
    ///
    /// Only registered contacts can be chatted with.
    pub fn start_chat(&mut self, contact: &Contact) -> Result<ConversationSummary, ChatError> {
        if !contact.is_registered {
            warn!("Refusing to start a chat with unregistered contact {}", contact.id);
            return Err(ChatError::UnregisteredContact(contact.name.clone()));
        }

        let (summary, created) = self.registry.start_or_resume(contact);
        if created {
            self.timelines.insert(summary.id, MessageTimeline::new());
        }
        self.selected = Some(summary.id);
        if self.dialog == Some(Dialog::NewChat) {
            self.dialog = None;
        }
        Ok(summary)
    }

    pub fn start_chat_with_id(&mut self, contact_id: u64) -> Result<ConversationSummary, ChatError> {
        let contact = self
            .directory
            .find(contact_id)
            .cloned()
            .ok_or(ChatError::UnknownContact(contact_id))?;
        self.start_chat(&contact)
    }

    /// Apply one user action
    pub async fn dispatch(&mut self, intent: Intent) -> Result<(), ChatError> {
        debug!("Dispatching {:?}", intent);
        match intent {
            Intent::DemoLogin => self.demo_login().map(|_| ()),
            Intent::SubmitLogin(raw) => {
                let login = UntrustedLogin::from_json(&raw)?;
                self.login(login).map(|_| ())
            }
            Intent::Logout => self.logout(),
            Intent::SelectChat(id) => self.select_chat(id),
            Intent::SetSearch(query) => {
                self.set_search(&query);
                Ok(())
            }
            Intent::SendMessage(text) => self.send_message(&text).map(|_| ()),
            Intent::OpenDialog(dialog) => self.open_dialog(dialog),
            Intent::CloseDialog => {
                self.close_dialog();
                Ok(())
            }
            Intent::RequestContacts => self.request_contacts().await.map(|_| ()),
            Intent::SetContactSearch(query) => {
                self.set_contact_search(&query);
                Ok(())
            }
            Intent::StartChat(contact_id) => self.start_chat_with_id(contact_id).map(|_| ()),
        }
    }
}

/// Seeded chat list, one timeline per chat (the first with history), first chat selected
fn seeded_conversations() -> (
    ChatRegistry,
    HashMap<ConversationId, MessageTimeline>,
    Option<ConversationId>,
) {
    let registry = ChatRegistry::seeded();
    let mut timelines: HashMap<ConversationId, MessageTimeline> = registry
        .iter()
        .map(|chat| (chat.id, MessageTimeline::new()))
        .collect();
    let selected = registry.first().map(|chat| chat.id);
    if let Some(id) = selected {
        timelines.insert(id, MessageTimeline::seeded());
    }
    (registry, timelines, selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(dir: &std::path::Path) -> ChatApp {
        ChatApp::new(
            SessionStore::in_dir(dir),
            AuthPolicy::default(),
            ContactDirectory::new(Box::new(MockContactSource)),
        )
    }

    #[test]
    fn first_seeded_chat_is_selected_with_history() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());
        assert_eq!(app.selected_chat().unwrap().name, "Алексей");
        assert_eq!(app.active_timeline().unwrap().len(), 3);
    }

    #[test]
    fn timelines_survive_switching() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        let first = app.selected_id().unwrap();
        let second = app.chats().iter().nth(1).unwrap().id;

        app.send_message("один").unwrap();
        app.select_chat(second).unwrap();
        assert!(app.active_timeline().unwrap().is_empty());
        app.send_message("два").unwrap();

        app.select_chat(first).unwrap();
        assert_eq!(app.active_timeline().unwrap().len(), 4);
        assert_eq!(app.timeline(second).unwrap().len(), 1);
    }

    #[test]
    fn blank_send_is_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        assert!(matches!(app.send_message("  "), Err(ChatError::EmptyInput)));
        assert_eq!(app.active_timeline().unwrap().len(), 3);
    }

    #[test]
    fn video_call_needs_a_selected_chat() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        app.selected = None;
        assert!(app.open_dialog(Dialog::VideoCall).is_err());
        assert!(app.open_dialog(Dialog::Profile).is_ok());
        assert_eq!(app.dialog(), Some(Dialog::Profile));
    }

    #[test]
    fn redirect_waits_for_the_delay() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path()).with_redirect_delay(Duration::from_millis(1000));
        app.demo_login().unwrap();

        assert!(app.is_logging_in());
        assert!(!app.poll_redirect(Instant::now()));
        assert_eq!(app.route(), Route::Login);

        assert!(app.poll_redirect(Instant::now() + Duration::from_secs(2)));
        assert_eq!(app.route(), Route::Chat);
        assert!(!app.is_logging_in());
    }

    #[test]
    fn unknown_conversation_cannot_be_selected() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path());
        assert!(matches!(
            app.select_chat(ConversationId::new()),
            Err(ChatError::UnknownConversation(_))
        ));
    }
}
