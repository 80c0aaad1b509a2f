//! # glucowatch - Dexcom Share glucose monitor
//!
//! Polls the Dexcom Share service for continuous glucose monitor readings,
//! schedules polls to land just after each expected sensor update, and raises
//! threshold alerts with per-kind cooldowns.
//!
//! ## Features
//!
//! - **Share client**: two-step login, reading fetch, region selection
//! - **Cadence-aligned polling**: refreshes 10s after each 5 minute reading
//! - **Recovery**: exponential backoff and automatic re-login
//! - **Alerts**: configurable bands, enable flags and cooldowns
//! - **Status endpoint**: optional local JSON API for other tools
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use glucowatch::{CompositeNotifier, Credentials, GlucoseMonitor, Settings, ShareClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::default();
//!     let client = ShareClient::new(settings.region)?;
//!     let credentials = Credentials::new("user@example.com", "secret");
//!     let monitor = GlucoseMonitor::new(client, CompositeNotifier::new(None), credentials, &settings);
//!
//!     monitor.run(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//!     Ok(())
//! }
//! ```

pub mod alerts;
pub mod config;
pub mod error;
pub mod monitor;
pub mod share;
pub mod web;

// Re-export public API
pub use alerts::{
    classify, Alert, AlertEvaluator, AlertKind, AlertSettings, CompositeNotifier, EnabledAlerts,
    GlucoseRange, LogNotifier, Notifier, NotifyCommand, Thresholds,
};
pub use config::Settings;
pub use error::{Result, WatchError};
pub use monitor::{GlucoseMonitor, MonitorHandle, MonitorState, MonitorStatus, RefreshOutcome};
pub use share::{
    Credentials, GlucoseReading, Region, Session, SessionCache, ShareApi, ShareClient, Trend,
    Units,
};
pub use web::{start_status_server, WebConfig};

/// The default status endpoint port
pub const DEFAULT_STATUS_PORT: u16 = 8787;
