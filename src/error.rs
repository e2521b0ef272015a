use thiserror::Error;

/// Errors surfaced by the chat state model.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Contact access denied: {0}")]
    AccessDenied(String),

    #[error("Message text is empty")]
    EmptyInput,

    #[error("Unverified credential: {0}")]
    UnverifiedCredential(String),

    #[error("Demo login is disabled")]
    DemoLoginDisabled,

    #[error("{0} is not registered in the app")]
    UnregisteredContact(String),

    #[error("Unknown contact {0}")]
    UnknownContact(u64),

    #[error("No conversation is selected")]
    NoActiveConversation,

    #[error("Unknown conversation {0}")]
    UnknownConversation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}
