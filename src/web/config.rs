//! Status endpoint configuration.

use crate::config::Settings;
use crate::share::Units;
use serde::{Deserialize, Serialize};

/// Configuration for the local status server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Host to bind the server to
    pub host: String,
    /// Port to bind the server to
    pub port: u16,
    /// Whether to enable CORS
    pub enable_cors: bool,
    /// Units used by the plain-text summary route
    pub units: Units,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: crate::DEFAULT_STATUS_PORT,
            enable_cors: true,
            units: Units::default(),
        }
    }
}

impl WebConfig {
    /// Create a new web configuration with custom host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Build from application settings, if the endpoint is enabled there.
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        settings.status_port.map(|port| {
            Self::new(settings.status_host.clone(), port).with_units(settings.units)
        })
    }

    /// Enable or disable CORS.
    pub fn with_cors(mut self, enable_cors: bool) -> Self {
        self.enable_cors = enable_cors;
        self
    }

    /// Set the display units.
    pub fn with_units(mut self, units: Units) -> Self {
        self.units = units;
        self
    }

    /// Get the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
