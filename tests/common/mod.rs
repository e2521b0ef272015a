// Common test utilities for integration tests
// This module contains shared code for all integration tests

use std::path::Path;
use std::sync::Once;
use std::time::{Duration, Instant};

use log::{info, LevelFilter};
use serde_json::json;

use besedka::contacts::{ContactDirectory, ContactSource, MockContactSource};
use besedka::session::auth::compute_tag;
use besedka::session::{AuthPolicy, SessionStore, UntrustedLogin};
use besedka::ChatApp;

/// Bot token used to sign test login payloads
pub const TEST_BOT_TOKEN: &str = "123456:TEST-BOT-TOKEN";

// Initialize logging once
static INIT_LOGGER: Once = Once::new();

/// Set up the logger for the tests
pub fn setup_logging() {
    INIT_LOGGER.call_once(|| {
        env_logger::Builder::new()
            .filter_level(LevelFilter::Debug)
            .is_test(true)
            .init();
    });
}

/// App over `dir` with the given contact source and no login delay
pub fn app_with_source(dir: &Path, policy: AuthPolicy, source: Box<dyn ContactSource>) -> ChatApp {
    ChatApp::new(SessionStore::in_dir(dir), policy, ContactDirectory::new(source))
        .with_redirect_delay(Duration::ZERO)
}

/// App over `dir` with the mock directory and a policy that knows [`TEST_BOT_TOKEN`]
pub fn app_in(dir: &Path) -> ChatApp {
    let policy = AuthPolicy {
        bot_token: Some(TEST_BOT_TOKEN.to_string()),
        ..AuthPolicy::default()
    };
    app_with_source(dir, policy, Box::new(MockContactSource))
}

/// App that has already gone through the demo login and landed on the chat screen
pub fn logged_in_app(dir: &Path) -> ChatApp {
    let mut app = app_in(dir);
    app.demo_login().expect("demo login");
    assert!(app.poll_redirect(Instant::now()), "redirect should fire with zero delay");
    app
}

/// Widget JSON for `id`, signed with `bot_token`
pub fn signed_payload(bot_token: &str, id: i64, first_name: &str, username: &str, auth_date: i64) -> String {
    let mut payload = json!({
        "id": id,
        "first_name": first_name,
        "username": username,
        "auth_date": auth_date,
        "hash": "",
    });

    let unsigned = UntrustedLogin::from_json(&payload.to_string()).expect("unsigned payload parses");
    let tag = compute_tag(bot_token, &unsigned.data_check_string()).expect("tag");
    payload["hash"] = json!(tag);

    info!("Signed test payload for user {}", id);
    payload.to_string()
}
