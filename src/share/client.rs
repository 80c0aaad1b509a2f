//! HTTP client for the Dexcom Share web services.

use crate::error::{Result, WatchError};
use crate::share::data::{parse_readings, GlucoseReading};
use crate::share::session::Session;
use crate::share::traits::ShareApi;
use chrono::Utc;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Timeout applied to every Share request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Readings window requested on each poll.
pub const DEFAULT_FETCH_MINUTES: u32 = 1440;

/// Maximum readings requested on each poll (one day at 5 minute cadence).
pub const DEFAULT_FETCH_COUNT: u32 = 288;

const APPLICATION_ID: &str = "d89443d2-327c-4a6f-89e5-496bbb0317db";
const APPLICATION_ID_JAPAN: &str = "d8665ade-9673-4e27-9ff6-92db4ce13d13";

const AUTHENTICATE_PATH: &str = "General/AuthenticatePublisherAccount";
const LOGIN_BY_ID_PATH: &str = "General/LoginPublisherAccountById";
const READINGS_PATH: &str = "Publisher/ReadPublisherLatestGlucoseValues";

/// Share deployment serving the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    #[default]
    Us,
    OutsideUs,
    Japan,
}

impl Region {
    pub fn base_url(&self) -> &'static str {
        match self {
            Region::Us => "https://share2.dexcom.com/ShareWebServices/Services",
            Region::OutsideUs => "https://shareous1.dexcom.com/ShareWebServices/Services",
            Region::Japan => "https://share.dexcom.jp/ShareWebServices/Services",
        }
    }

    pub fn application_id(&self) -> &'static str {
        match self {
            Region::Us | Region::OutsideUs => APPLICATION_ID,
            Region::Japan => APPLICATION_ID_JAPAN,
        }
    }
}

impl FromStr for Region {
    type Err = WatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "us" => Ok(Region::Us),
            "ous" | "outside_us" | "outside-us" | "eu" => Ok(Region::OutsideUs),
            "jp" | "japan" => Ok(Region::Japan),
            other => Err(WatchError::config_error(format!(
                "Unknown region '{}'. Use us, ous or jp",
                other
            ))),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Region::Us => "us",
            Region::OutsideUs => "ous",
            Region::Japan => "jp",
        };
        f.write_str(name)
    }
}

/// Share account credentials.
#[derive(Clone)]
pub struct Credentials {
    pub account_name: String,
    pub password: String,
}

impl Credentials {
    pub fn new(account_name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            account_name: account_name.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account_name", &self.account_name)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Share client backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ShareClient {
    http: reqwest::Client,
    base_url: String,
    application_id: String,
}

impl ShareClient {
    /// Create a client for the given region.
    pub fn new(region: Region) -> Result<Self> {
        Self::with_base_url(region.base_url(), region.application_id())
    }

    /// Create a client against an arbitrary base URL, e.g. a local stub.
    pub fn with_base_url(base_url: impl Into<String>, application_id: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("glucowatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WatchError::config_error(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            application_id: application_id.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// POST and return the raw body, mapping non-success statuses onto the
    /// error taxonomy.
    async fn post(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<String> {
        let mut request = self
            .http
            .post(self.url(path))
            .query(query)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json");

        request = match body {
            Some(body) => request.json(&body),
            None => request.body(""),
        };

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            debug!(path, status = status.as_u16(), "Share request failed");
            return Err(WatchError::from_share_response(status.as_u16(), &text));
        }

        Ok(text)
    }

    /// Decode a JSON string body holding a GUID.
    fn parse_guid(body: &str) -> Result<Uuid> {
        let raw: String = serde_json::from_str(body)?;
        Uuid::parse_str(&raw).map_err(|e| WatchError::parse_error(format!("Invalid id '{}': {}", raw, e)))
    }

    async fn authenticate_account(&self, credentials: &Credentials) -> Result<Uuid> {
        let body = self
            .post(
                AUTHENTICATE_PATH,
                &[],
                Some(json!({
                    "accountName": credentials.account_name,
                    "password": credentials.password,
                    "applicationId": self.application_id,
                })),
            )
            .await?;

        let account_id = Self::parse_guid(&body)?;
        if account_id.is_nil() {
            return Err(WatchError::InvalidCredentials);
        }
        Ok(account_id)
    }

    async fn login_by_id(&self, account_id: Uuid, credentials: &Credentials) -> Result<Uuid> {
        let body = self
            .post(
                LOGIN_BY_ID_PATH,
                &[],
                Some(json!({
                    "accountId": account_id.to_string(),
                    "password": credentials.password,
                    "applicationId": self.application_id,
                })),
            )
            .await?;

        let session_id = Self::parse_guid(&body)?;
        if session_id.is_nil() {
            return Err(WatchError::ShareNotConfigured);
        }
        Ok(session_id)
    }
}

impl ShareApi for ShareClient {
    async fn login(&self, credentials: &Credentials) -> Result<Session> {
        info!("Authenticating Share account {}", credentials.account_name);
        let account_id = self.authenticate_account(credentials).await?;
        let session_id = self.login_by_id(account_id, credentials).await?;
        info!("Share login succeeded");

        Ok(Session::new(session_id, credentials.account_name.clone(), Utc::now()))
    }

    async fn latest_readings(
        &self,
        session: &Session,
        minutes: u32,
        max_count: u32,
    ) -> Result<Vec<GlucoseReading>> {
        let body = self
            .post(
                READINGS_PATH,
                &[
                    ("sessionId", session.session_id.to_string()),
                    ("minutes", minutes.to_string()),
                    ("maxCount", max_count.to_string()),
                ],
                None,
            )
            .await?;

        let readings = parse_readings(&body)?;
        if readings.is_empty() {
            return Err(WatchError::NoData);
        }
        debug!(count = readings.len(), "Fetched readings");
        Ok(readings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_parsing() {
        assert_eq!("US".parse::<Region>().unwrap(), Region::Us);
        assert_eq!("ous".parse::<Region>().unwrap(), Region::OutsideUs);
        assert_eq!("jp".parse::<Region>().unwrap(), Region::Japan);
        assert!("mars".parse::<Region>().is_err());
        assert_eq!(Region::OutsideUs.to_string(), "ous");
    }

    #[test]
    fn test_region_endpoints() {
        assert!(Region::Us.base_url().contains("share2.dexcom.com"));
        assert!(Region::OutsideUs.base_url().contains("shareous1"));
        assert_eq!(Region::Japan.application_id(), APPLICATION_ID_JAPAN);
        assert_eq!(Region::Us.application_id(), Region::OutsideUs.application_id());
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::new("user", "hunter2");
        let printed = format!("{:?}", creds);
        assert!(printed.contains("user"));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn test_parse_guid() {
        let id = ShareClient::parse_guid(r#""a1b2c3d4-0000-1111-2222-333344445555""#).unwrap();
        assert_eq!(id.to_string(), "a1b2c3d4-0000-1111-2222-333344445555");
        assert!(ShareClient::parse_guid(r#""00000000-0000-0000-0000-000000000000""#)
            .unwrap()
            .is_nil());
        assert!(ShareClient::parse_guid("not json").is_err());
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = ShareClient::with_base_url("http://127.0.0.1:9/Services/", APPLICATION_ID).unwrap();
        assert_eq!(client.url("General/X"), "http://127.0.0.1:9/Services/General/X");
    }
}
