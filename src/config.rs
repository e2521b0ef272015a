use std::path::PathBuf;
use std::time::Duration;

use crate::session::AuthPolicy;

/// Delay between a successful login and the switch to the chat screen
pub const DEFAULT_REDIRECT_DELAY: Duration = Duration::from_millis(1000);

/// Runtime settings. The binary fills this from arguments and environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding the session slot (and, by default, the log file)
    pub data_dir: PathBuf,
    /// Bot the login widget is configured for, shown on the login screen
    pub bot_username: String,
    pub bot_token: Option<String>,
    pub allow_demo_login: bool,
    pub auth_max_age: Option<Duration>,
    pub login_redirect_delay: Duration,
    /// Address-book export. Without one the mock directory is used.
    pub contacts_file: Option<PathBuf>,
    pub contacts_timeout: Option<Duration>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            data_dir: PathBuf::from("."),
            bot_username: "YOUR_BOT_USERNAME".to_string(),
            bot_token: None,
            allow_demo_login: true,
            auth_max_age: None,
            login_redirect_delay: DEFAULT_REDIRECT_DELAY,
            contacts_file: None,
            contacts_timeout: None,
        }
    }
}

impl AppConfig {
    pub fn auth_policy(&self) -> AuthPolicy {
        AuthPolicy {
            bot_token: self.bot_token.clone(),
            max_age: self.auth_max_age,
            allow_demo: self.allow_demo_login,
        }
    }
}
