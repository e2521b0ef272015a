// Persisted user session slot
//
// One JSON file holds the logged-in user. Its presence is what routes the
// app past the login screen.

pub mod auth;

use anyhow::{anyhow, Result};
use log::{debug, info};
use std::fs::{self, File};
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use crate::models::UserSession;

/// Fixed key of the session slot
pub const SESSION_KEY: &str = "telegramUser";

pub use auth::{demo_session, AuthPolicy, UntrustedLogin};

/// Default directory for the session slot and the log file
pub fn default_data_dir() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .ok_or_else(|| anyhow!("Could not determine config directory"))?
        .join("besedka");
    Ok(dir)
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Store whose slot lives in `dir`
    pub fn in_dir(dir: &Path) -> Self {
        SessionStore {
            path: dir.join(format!("{}.json", SESSION_KEY)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the slot. `None` when it was never written.
    pub fn load(&self) -> Result<Option<UserSession>> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No session slot at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let session: UserSession = serde_json::from_str(&contents)?;
        info!("Loaded session for user {} from {}", session.id, self.path.display());

        Ok(Some(session))
    }

    /// Overwrite the slot with `session`
    pub fn save(&self, session: &UserSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(&self.path)?;
        serde_json::to_writer_pretty(file, session)?;

        info!("Session saved for user {}", session.id);
        Ok(())
    }

    /// Remove the slot. Clearing an empty slot is fine.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Session slot cleared");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
