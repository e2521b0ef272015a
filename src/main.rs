#![deny(dead_code)] // DO NOT REMOVE THIS EVER
use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, error, info, warn, LevelFilter};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use std::{env, io};

mod ui;
mod utils;

use crate::ui::{ChatUI, UiEvent};
use besedka::config::{AppConfig, DEFAULT_REDIRECT_DELAY};
use besedka::session::default_data_dir;
use besedka::{ChatApp, ChatError, Intent, Route};

/// Command line arguments for Besedka
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Besedka: a terminal messenger mockup with Telegram login.",
    long_about = "Besedka is a terminal messenger mockup: Telegram login, a chat list, \
    per-chat message history and a contact picker.\n\n\
    Environment:\n\
    BESEDKA_BOT_TOKEN      Bot token used to verify login widget payloads\n\
    BESEDKA_AUTH_PAYLOAD   Login widget JSON to submit at startup\n\
    Use -h or --help to see all options."
)]
struct Args {
    /// Directory for the stored session and the log file
    #[arg(long, value_name = "PATH")]
    data_dir: Option<PathBuf>,

    /// Log file path (defaults to besedka.log inside the data directory)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Log level: off, error, warn, info, debug, trace
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,

    /// Bot the login widget is configured for
    #[arg(long, default_value = "YOUR_BOT_USERNAME")]
    bot_username: String,

    /// vCard file to use as the address book instead of the built-in contacts
    #[arg(long, value_name = "FILE")]
    contacts: Option<PathBuf>,

    /// Give up on the contact picker after this many milliseconds
    #[arg(long, value_name = "MS")]
    contacts_timeout_ms: Option<u64>,

    /// Reject login payloads older than this many seconds
    #[arg(long, value_name = "SECS")]
    auth_max_age_secs: Option<u64>,

    /// Disable the demo login shortcut
    #[arg(long)]
    no_demo: bool,

    /// Delay between a successful login and the chat screen
    #[arg(long, value_name = "MS", default_value_t = DEFAULT_REDIRECT_DELAY.as_millis() as u64)]
    redirect_delay_ms: u64,
}

impl Args {
    fn into_config(self, data_dir: PathBuf) -> AppConfig {
        AppConfig {
            data_dir,
            bot_username: self.bot_username,
            bot_token: env::var("BESEDKA_BOT_TOKEN").ok().filter(|t| !t.is_empty()),
            allow_demo_login: !self.no_demo,
            auth_max_age: self.auth_max_age_secs.map(Duration::from_secs),
            login_redirect_delay: Duration::from_millis(self.redirect_delay_ms),
            contacts_file: self.contacts,
            contacts_timeout: self.contacts_timeout_ms.map(Duration::from_millis),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments FIRST
    let args = Args::parse();

    let data_dir = match &args.data_dir {
        Some(dir) => dir.clone(),
        None => default_data_dir()?,
    };
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

    let log_file_path = args
        .log_file
        .clone()
        .unwrap_or_else(|| data_dir.join("besedka.log"));
    utils::setup_logging(&log_file_path, args.log_level)?;

    info!("Besedka starting up");
    info!("System information: {} {}", std::env::consts::OS, std::env::consts::ARCH);
    info!("Logging to file: {}", log_file_path.display());

    let config = args.into_config(data_dir);
    if config.bot_token.is_none() {
        warn!("BESEDKA_BOT_TOKEN is not set; widget logins will be rejected");
    }

    let mut app = ChatApp::from_config(&config);
    if let Err(e) = app.bootstrap() {
        // An unreadable slot is treated as "not logged in"
        warn!("Could not restore session: {}", e);
    }

    let mut chat_ui = ChatUI::new(&config.bot_username);

    // Payload handed over by the environment, e.g. from a browser helper
    if app.route() == Route::Login {
        if let Ok(payload) = env::var("BESEDKA_AUTH_PAYLOAD") {
            info!("Submitting login payload from environment");
            if let Err(e) = app.dispatch(Intent::SubmitLogin(payload)).await {
                error!("Login from environment failed: {}", e);
                chat_ui.show_status(&format!("Ошибка входа: {}", e));
            }
        }
    }

    // Setup terminal UI
    let mut terminal = ui::setup_terminal()?;
    let result = run_main_loop(&mut app, &mut chat_ui, &mut terminal).await;

    // Restore terminal whatever the loop returned
    ui::restore_terminal(terminal)?;

    if let Err(e) = &result {
        error!("Main loop failed: {}", e);
    }
    info!("Besedka shutting down");
    result
}

/// Run the main event loop
async fn run_main_loop(
    app: &mut ChatApp,
    chat_ui: &mut ChatUI,
    terminal: &mut ui::Terminal<ui::CrosstermBackend<io::Stdout>>,
) -> Result<()> {
    loop {
        if app.poll_redirect(Instant::now()) {
            chat_ui.clear_status();
        }

        terminal.draw(|f| chat_ui.draw(f, app))?;

        let intent = match chat_ui.handle_input(app)? {
            Some(UiEvent::Quit) => break,
            Some(UiEvent::Intent(intent)) => intent,
            None => continue,
        };

        let logging_out = intent == Intent::Logout;
        match app.dispatch(intent).await {
            Ok(()) => {
                chat_ui.clear_status();
                if logging_out {
                    chat_ui.reset();
                }
            }
            // Nothing to report: blank input is simply ignored
            Err(ChatError::EmptyInput) => {}
            // The dialog already shows the denied state
            Err(ChatError::AccessDenied(reason)) => {
                debug!("Contact access denied: {}", reason);
            }
            Err(e) => {
                warn!("Action failed: {}", e);
                chat_ui.show_status(&status_text(&e));
            }
        }
    }

    Ok(())
}

/// Status line text for a failed action
fn status_text(err: &ChatError) -> String {
    match err {
        ChatError::UnverifiedCredential(reason) => format!("Не удалось подтвердить вход: {}", reason),
        ChatError::DemoLoginDisabled => "Демо-вход отключён".to_string(),
        ChatError::UnregisteredContact(name) => format!("{} ещё не пользуется приложением", name),
        ChatError::NoActiveConversation => "Выберите чат для начала общения".to_string(),
        other => other.to_string(),
    }
}
