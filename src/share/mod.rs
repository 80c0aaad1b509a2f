//! Dexcom Share access: wire types, sessions and the HTTP client.

pub mod client;
pub mod data;
pub mod session;
pub mod traits;

// Re-export commonly used items
pub use client::{Credentials, Region, ShareClient};
pub use data::{GlucoseReading, Trend, Units};
pub use session::{Session, SessionCache};
pub use traits::ShareApi;
