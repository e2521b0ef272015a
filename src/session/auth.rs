//! Login widget payload handling.
//!
//! The widget calls back with a user record and an authentication tag. That
//! record is untrusted until the tag has been checked against the bot token:
//! the secret key is SHA-256 of the token and the tag is the hex HMAC-SHA256
//! of the data-check-string (every other field as `key=value`, sorted by key,
//! joined with `\n`).

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use log::{info, warn};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::error::ChatError;
use crate::models::UserSession;

type HmacSha256 = Hmac<Sha256>;

/// Tag stored on the fabricated demo session
pub const DEMO_HASH: &str = "demo_hash";

/// What a login must satisfy before it reaches the session store.
#[derive(Debug, Clone)]
pub struct AuthPolicy {
    /// Token of the bot the widget is configured for. Without it nothing verifies.
    pub bot_token: Option<String>,
    /// Reject payloads authenticated longer ago than this
    pub max_age: Option<Duration>,
    pub allow_demo: bool,
}

impl Default for AuthPolicy {
    fn default() -> Self {
        AuthPolicy {
            bot_token: None,
            max_age: None,
            allow_demo: true,
        }
    }
}

/// A payload as received from the widget callback, not yet checked.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UntrustedLogin {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    pub auth_date: i64,
    pub hash: String,
}

impl UntrustedLogin {
    pub fn from_json(raw: &str) -> Result<Self, ChatError> {
        serde_json::from_str(raw.trim())
            .map_err(|e| ChatError::UnverifiedCredential(format!("malformed payload: {}", e)))
    }

    /// Every present field except the tag, `key=value`, sorted, newline separated
    pub fn data_check_string(&self) -> String {
        let mut fields = vec![
            ("auth_date", self.auth_date.to_string()),
            ("first_name", self.first_name.clone()),
            ("id", self.id.to_string()),
        ];
        if let Some(v) = &self.last_name {
            fields.push(("last_name", v.clone()));
        }
        if let Some(v) = &self.photo_url {
            fields.push(("photo_url", v.clone()));
        }
        if let Some(v) = &self.username {
            fields.push(("username", v.clone()));
        }
        fields.sort_by(|a, b| a.0.cmp(b.0));

        fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Check the tag and freshness, producing a session that may be stored.
    pub fn verify(self, policy: &AuthPolicy, now: DateTime<Utc>) -> Result<UserSession, ChatError> {
        let token = policy.bot_token.as_deref().ok_or_else(|| {
            warn!("Rejecting login for user {}: no bot token configured", self.id);
            ChatError::UnverifiedCredential("no bot token configured".to_string())
        })?;

        let tag = hex::decode(self.hash.trim())
            .map_err(|_| ChatError::UnverifiedCredential("tag is not hex".to_string()))?;

        let mut mac = new_mac(token)?;
        mac.update(self.data_check_string().as_bytes());
        // verify_slice compares in constant time
        mac.verify_slice(&tag).map_err(|_| {
            warn!("Rejecting login for user {}: tag mismatch", self.id);
            ChatError::UnverifiedCredential("tag mismatch".to_string())
        })?;

        if let Some(max_age) = policy.max_age {
            let age = now.timestamp().saturating_sub(self.auth_date);
            let limit = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
            if age > limit {
                warn!("Rejecting login for user {}: authenticated {}s ago", self.id, age);
                return Err(ChatError::UnverifiedCredential("authentication is too old".to_string()));
            }
        }

        info!("Login payload for user {} verified", self.id);
        Ok(UserSession {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
            username: self.username,
            photo_url: self.photo_url,
            auth_date: self.auth_date,
            hash: self.hash,
        })
    }
}

fn new_mac(bot_token: &str) -> Result<HmacSha256, ChatError> {
    let secret = Sha256::digest(bot_token.as_bytes());
    HmacSha256::new_from_slice(&secret)
        .map_err(|e| ChatError::UnverifiedCredential(format!("Failed to create HMAC: {}", e)))
}

/// Hex tag the widget would issue for `data_check_string` under `bot_token`
pub fn compute_tag(bot_token: &str, data_check_string: &str) -> Result<String, ChatError> {
    let mut mac = new_mac(bot_token)?;
    mac.update(data_check_string.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// The locally fabricated session used by the demo login button.
pub fn demo_session(now: DateTime<Utc>) -> UserSession {
    UserSession {
        id: 123456789,
        first_name: "Демо".to_string(),
        last_name: Some("Пользователь".to_string()),
        username: Some("demo_user".to_string()),
        photo_url: Some(String::new()),
        auth_date: now.timestamp(),
        hash: DEMO_HASH.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "123456:TEST-TOKEN";

    fn signed_payload(auth_date: i64) -> UntrustedLogin {
        let mut login = UntrustedLogin {
            id: 555,
            first_name: "Мария".to_string(),
            last_name: None,
            username: Some("maria".to_string()),
            photo_url: None,
            auth_date,
            hash: String::new(),
        };
        login.hash = compute_tag(TOKEN, &login.data_check_string()).unwrap();
        login
    }

    fn policy() -> AuthPolicy {
        AuthPolicy {
            bot_token: Some(TOKEN.to_string()),
            ..AuthPolicy::default()
        }
    }

    #[test]
    fn data_check_string_is_sorted_and_skips_absent_fields() {
        let login = signed_payload(1_700_000_000);
        assert_eq!(
            login.data_check_string(),
            "auth_date=1700000000\nfirst_name=Мария\nid=555\nusername=maria"
        );
    }

    #[test]
    fn valid_tag_is_accepted() {
        let now = Utc::now();
        let session = signed_payload(now.timestamp()).verify(&policy(), now).unwrap();
        assert_eq!(session.id, 555);
        assert_eq!(session.username.as_deref(), Some("maria"));
    }

    #[test]
    fn uppercase_tag_is_accepted() {
        let now = Utc::now();
        let mut login = signed_payload(now.timestamp());
        login.hash = login.hash.to_uppercase();
        assert!(login.verify(&policy(), now).is_ok());
    }

    #[test]
    fn tampered_field_is_rejected() {
        let now = Utc::now();
        let mut login = signed_payload(now.timestamp());
        login.id = 556;
        assert!(matches!(
            login.verify(&policy(), now),
            Err(ChatError::UnverifiedCredential(_))
        ));
    }

    #[test]
    fn missing_token_rejects_everything() {
        let now = Utc::now();
        let login = signed_payload(now.timestamp());
        assert!(login.verify(&AuthPolicy::default(), now).is_err());
    }

    #[test]
    fn stale_payload_is_rejected() {
        let now = Utc::now();
        let login = signed_payload(now.timestamp() - 7200);
        let policy = AuthPolicy {
            max_age: Some(Duration::from_secs(3600)),
            ..policy()
        };
        assert!(login.verify(&policy, now).is_err());
    }

    #[test]
    fn huge_max_age_accepts_fresh_payload() {
        let now = Utc::now();
        let login = signed_payload(now.timestamp() - 60);
        let policy = AuthPolicy {
            max_age: Some(Duration::from_secs(u64::MAX)),
            ..policy()
        };
        assert!(login.verify(&policy, now).is_ok());
    }

    #[test]
    fn extreme_auth_date_is_rejected_without_overflow() {
        let now = Utc::now();
        let login = signed_payload(i64::MIN);
        let policy = AuthPolicy {
            max_age: Some(Duration::from_secs(3600)),
            ..policy()
        };
        assert!(matches!(
            login.verify(&policy, now),
            Err(ChatError::UnverifiedCredential(_))
        ));
    }

    #[test]
    fn demo_tag_never_verifies() {
        let now = Utc::now();
        let demo = demo_session(now);
        let login = UntrustedLogin {
            id: demo.id,
            first_name: demo.first_name,
            last_name: demo.last_name,
            username: demo.username,
            photo_url: demo.photo_url,
            auth_date: demo.auth_date,
            hash: demo.hash,
        };
        assert!(login.verify(&policy(), now).is_err());
    }

    #[test]
    fn malformed_json_is_an_unverified_credential() {
        assert!(matches!(
            UntrustedLogin::from_json("{\"id\": 1}"),
            Err(ChatError::UnverifiedCredential(_))
        ));
    }
}
