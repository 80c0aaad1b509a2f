//! Share session tokens and their on-disk cache.

use crate::error::{Result, WatchError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Sessions are treated as expired this long after login, slightly ahead of
/// Share's own 24 hour limit.
pub const SESSION_LIFETIME_HOURS: i64 = 23;

/// An authenticated Share session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque session id returned by `LoginPublisherAccountById`
    pub session_id: Uuid,
    /// Account name the session belongs to
    pub account_name: String,
    /// When the session was created
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(session_id: Uuid, account_name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            session_id,
            account_name: account_name.into(),
            created_at,
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::hours(SESSION_LIFETIME_HOURS)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    /// Whether this session was issued for `account_name` (case-insensitive).
    pub fn belongs_to(&self, account_name: &str) -> bool {
        self.account_name.eq_ignore_ascii_case(account_name)
    }
}

/// JSON file holding the last session so restarts skip the login round trip.
#[derive(Debug, Clone)]
pub struct SessionCache {
    path: PathBuf,
}

impl SessionCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cached session. A missing file is `Ok(None)`; a corrupt one
    /// is logged and treated the same way.
    pub fn load(&self) -> Result<Option<Session>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&contents) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!("Ignoring unreadable session cache {:?}: {}", self.path, e);
                Ok(None)
            }
        }
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(session)
            .map_err(|e| WatchError::Io(format!("failed to encode session: {}", e)))?;
        fs::write(&self.path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        debug!("Session cached at {:?}", self.path);
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
