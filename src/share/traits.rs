//! Traits for talking to the Share service.

use crate::error::Result;
use crate::share::client::Credentials;
use crate::share::data::GlucoseReading;
use crate::share::session::Session;

/// Remote glucose source.
///
/// [`ShareClient`](crate::share::ShareClient) implements this over HTTP; the
/// monitor only depends on the trait so it can run against other sources.
pub trait ShareApi {
    /// Log in and obtain a fresh session.
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl std::future::Future<Output = Result<Session>> + Send;

    /// Fetch up to `max_count` readings from the last `minutes`, newest first.
    ///
    /// An empty result is reported as [`WatchError::NoData`](crate::WatchError::NoData).
    fn latest_readings(
        &self,
        session: &Session,
        minutes: u32,
        max_count: u32,
    ) -> impl std::future::Future<Output = Result<Vec<GlucoseReading>>> + Send;
}
