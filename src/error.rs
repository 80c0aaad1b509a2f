//! Error handling for the glucowatch crate.
//!
//! The Share-facing variants form a closed taxonomy; every one of them maps to
//! a short recovery suggestion that the CLI and the status endpoint show next
//! to the raw error message.

use serde::Deserialize;

/// A specialized `Result` type for glucowatch operations.
pub type Result<T> = std::result::Result<T, WatchError>;

/// The main error type for glucowatch operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WatchError {
    /// Account name or password rejected by Share
    #[error("Invalid Dexcom credentials")]
    InvalidCredentials,

    /// The Share session id is no longer accepted
    #[error("Dexcom Share session expired")]
    SessionExpired,

    /// The account exists but has no active Share publisher
    #[error("Dexcom Share is not configured for this account")]
    ShareNotConfigured,

    /// Transport level failure (DNS, connect, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Share answered with a non-success status
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Payload could not be decoded
    #[error("Failed to parse Share response: {0}")]
    Parse(String),

    /// Share returned an empty reading list
    #[error("No glucose readings available")]
    NoData,

    /// Anything Share reported that we do not recognise
    #[error("Unknown error: {0}")]
    Unknown(String),

    /// Local configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local I/O failure (settings or session cache)
    #[error("I/O error: {0}")]
    Io(String),
}

/// Error body returned by Share on non-success responses.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ShareErrorBody {
    code: Option<String>,
    message: Option<String>,
}

impl WatchError {
    /// Create a new parse error
    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a new network error
    pub fn network_error(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new server error
    pub fn server_error(status: u16, msg: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: msg.into(),
        }
    }

    /// Map a non-success Share response onto the taxonomy.
    ///
    /// Share reports most failures as HTTP 500 with a `Code` field, so the
    /// code takes precedence over the status.
    pub fn from_share_response(status: u16, body: &str) -> Self {
        let parsed: Option<ShareErrorBody> = serde_json::from_str(body).ok();
        let (code, message) = match parsed {
            Some(body) => (
                body.code.unwrap_or_default(),
                body.message.unwrap_or_else(|| "no message".to_string()),
            ),
            None => (String::new(), body.trim().to_string()),
        };

        match code.as_str() {
            "SessionIdNotFound" | "SessionNotValid" => Self::SessionExpired,
            c if c.ends_with("PasswordInvalid")
                || c.ends_with("AccountNotFound")
                || c.ends_with("MaxAttemptsExceeed") =>
            {
                Self::InvalidCredentials
            }
            "" => Self::server_error(status, message),
            c => Self::server_error(status, format!("{}: {}", c, message)),
        }
    }

    /// Whether this error should trigger an automatic re-login.
    pub fn requires_reauthentication(&self) -> bool {
        match self {
            Self::SessionExpired => true,
            Self::Server { status, .. } => matches!(status, 401 | 500),
            _ => false,
        }
    }

    /// Whether a failed login was Share refusing the session rather than
    /// the network or the service being down.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::InvalidCredentials | Self::SessionExpired => true,
            Self::Server { status, .. } => *status == 401,
            _ => false,
        }
    }

    /// Short, user-facing hint on how to recover.
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => {
                "Check your Dexcom username and password, then log in again."
            }
            Self::SessionExpired => "Signing in again automatically.",
            Self::ShareNotConfigured => {
                "Enable Share in the Dexcom app and make sure sharing is active."
            }
            Self::Network(_) => "Check your internet connection. Retrying shortly.",
            Self::Server { .. } => "Dexcom servers returned an error. Retrying shortly.",
            Self::Parse(_) => "Unexpected response from Dexcom. Retrying shortly.",
            Self::NoData => "No recent readings. Check that the sensor is active.",
            Self::Unknown(_) => "An unexpected error occurred. Retrying shortly.",
            Self::Config(_) => "Fix the settings file and restart.",
            Self::Io(_) => "Check file permissions for the glucowatch directory.",
        }
    }
}

impl From<std::io::Error> for WatchError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for WatchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<reqwest::Error> for WatchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Network("request timed out".to_string())
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            Self::server_error(status.as_u16(), err.to_string())
        } else if err.is_connect() || err.is_request() || err.is_body() {
            Self::Network(err.to_string())
        } else {
            Self::Unknown(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_codes_map_to_expired() {
        let body = r#"{"Code":"SessionIdNotFound","Message":"Session ID not found"}"#;
        assert_eq!(
            WatchError::from_share_response(500, body),
            WatchError::SessionExpired
        );

        let body = r#"{"Code":"SessionNotValid","Message":"nope"}"#;
        assert_eq!(
            WatchError::from_share_response(500, body),
            WatchError::SessionExpired
        );
    }

    #[test]
    fn test_credential_codes() {
        for code in [
            "AccountPasswordInvalid",
            "SSO_AuthenticatePasswordInvalid",
            "SSO_AuthenticateAccountNotFound",
            "SSO_AuthenticateMaxAttemptsExceeed",
        ] {
            let body = format!(r#"{{"Code":"{}","Message":"x"}}"#, code);
            assert_eq!(
                WatchError::from_share_response(500, &body),
                WatchError::InvalidCredentials,
                "code {} should be invalid credentials",
                code
            );
        }
    }

    #[test]
    fn test_unrecognised_body_is_server_error() {
        let err = WatchError::from_share_response(503, "Service Unavailable");
        assert_eq!(err, WatchError::server_error(503, "Service Unavailable"));
        assert!(!err.requires_reauthentication());

        let err = WatchError::from_share_response(500, r#"{"Code":"InvalidArgument","Message":"bad"}"#);
        assert!(matches!(err, WatchError::Server { status: 500, .. }));
        assert!(err.requires_reauthentication());
    }

    #[test]
    fn test_reauthentication_triggers() {
        assert!(WatchError::SessionExpired.requires_reauthentication());
        assert!(WatchError::server_error(401, "unauthorized").requires_reauthentication());
        assert!(!WatchError::server_error(502, "bad gateway").requires_reauthentication());
        assert!(!WatchError::InvalidCredentials.requires_reauthentication());
        assert!(!WatchError::NoData.requires_reauthentication());
    }

    #[test]
    fn test_auth_failures() {
        assert!(WatchError::SessionExpired.is_auth_failure());
        assert!(WatchError::InvalidCredentials.is_auth_failure());
        assert!(WatchError::server_error(401, "unauthorized").is_auth_failure());
        assert!(!WatchError::server_error(500, "boom").is_auth_failure());
        assert!(!WatchError::network_error("down").is_auth_failure());
    }

    #[test]
    fn test_every_error_has_a_suggestion() {
        let errors = [
            WatchError::InvalidCredentials,
            WatchError::SessionExpired,
            WatchError::ShareNotConfigured,
            WatchError::network_error("down"),
            WatchError::server_error(500, "boom"),
            WatchError::parse_error("bad json"),
            WatchError::NoData,
            WatchError::Unknown("?".into()),
            WatchError::config_error("bad"),
            WatchError::Io("denied".into()),
        ];
        for err in errors {
            assert!(!err.recovery_suggestion().is_empty());
        }
    }
}
