//! Refresh scheduling and the polling state machine.
//!
//! The monitor runs as a single cooperative task: the refresh timer, a
//! one-second display tick and a one-minute staleness tick are multiplexed
//! in one `select!` loop, and status leaves the task only through `watch`
//! channels.

pub mod scheduler;
pub mod service;
pub mod status;

// Re-export commonly used items
pub use service::{GlucoseMonitor, MonitorHandle, RefreshOutcome};
pub use status::{MonitorState, MonitorStatus};
