//! The polling monitor: login, fetch, schedule, alert.

use crate::alerts::{Alert, AlertEvaluator, AlertSettings, Notifier};
use crate::config::Settings;
use crate::error::{Result, WatchError};
use crate::monitor::scheduler::{self, MAX_REAUTH_ATTEMPTS};
use crate::monitor::status::{MonitorState, MonitorStatus};
use crate::share::{Credentials, GlucoseReading, Session, SessionCache, ShareApi, Units};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// How often the published status is recomputed for display.
pub const DISPLAY_TICK: Duration = Duration::from_secs(1);

/// How often staleness is checked.
pub const STALE_CHECK_TICK: Duration = Duration::from_secs(60);

/// Result of one poll cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// Readings fetched; `new_reading` is false when Share had nothing newer.
    Updated { new_reading: bool, alerts: Vec<Alert> },
    /// Poll failed; another attempt is scheduled after backoff.
    Failed(WatchError),
    /// Authentication cannot be recovered without new credentials.
    GaveUp(WatchError),
}

enum PollFailure {
    Recoverable(WatchError),
    Fatal(WatchError),
}

type PollResult<T> = std::result::Result<T, PollFailure>;

/// Read-only view onto a running monitor.
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    pub status: watch::Receiver<MonitorStatus>,
    pub readings: watch::Receiver<Vec<GlucoseReading>>,
}

/// Polls Share on the sensor cadence and forwards alerts.
///
/// All state lives in this struct and is driven from a single task, either
/// by [`GlucoseMonitor::run`] or by calling [`GlucoseMonitor::refresh`]
/// directly.
pub struct GlucoseMonitor<A, N> {
    api: A,
    notifier: N,
    credentials: Credentials,
    session: Option<Session>,
    session_cache: Option<SessionCache>,
    evaluator: AlertEvaluator,
    units: Units,
    fetch_minutes: u32,
    fetch_count: u32,
    state: MonitorState,
    readings: Vec<GlucoseReading>,
    consecutive_failures: u32,
    next_refresh_at: Option<DateTime<Utc>>,
    refresh_deadline: Instant,
    last_error: Option<WatchError>,
    stale_alerted: bool,
    status_tx: watch::Sender<MonitorStatus>,
    readings_tx: watch::Sender<Vec<GlucoseReading>>,
}

impl<A, N> GlucoseMonitor<A, N>
where
    A: ShareApi,
    N: Notifier,
{
    /// Create a monitor. Nothing happens until the first refresh.
    pub fn new(api: A, notifier: N, credentials: Credentials, settings: &Settings) -> Self {
        let now = Utc::now();
        let (status_tx, _) = watch::channel(MonitorStatus::initial(now));
        let (readings_tx, _) = watch::channel(Vec::new());

        Self {
            api,
            notifier,
            credentials,
            session: None,
            session_cache: None,
            evaluator: AlertEvaluator::new(settings.alerts.clone(), settings.units),
            units: settings.units,
            fetch_minutes: settings.fetch_minutes,
            fetch_count: settings.fetch_count,
            state: MonitorState::Unauthenticated,
            readings: Vec::new(),
            consecutive_failures: 0,
            next_refresh_at: None,
            refresh_deadline: Instant::now(),
            last_error: None,
            stale_alerted: false,
            status_tx,
            readings_tx,
        }
    }

    /// Persist sessions to `cache` and reuse a cached one if it is still
    /// valid for these credentials.
    pub fn with_session_cache(mut self, cache: SessionCache) -> Self {
        match cache.load() {
            Ok(Some(session)) if session.belongs_to(&self.credentials.account_name) => {
                debug!("Loaded cached session created at {}", session.created_at);
                self.session = Some(session);
            }
            Ok(_) => {}
            Err(e) => warn!("Failed to read session cache: {}", e),
        }
        self.session_cache = Some(cache);
        self
    }

    /// Subscribe to status and reading updates.
    pub fn handle(&self) -> MonitorHandle {
        MonitorHandle {
            status: self.status_tx.subscribe(),
            readings: self.readings_tx.subscribe(),
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Readings from the last successful poll, newest first.
    pub fn readings(&self) -> &[GlucoseReading] {
        &self.readings
    }

    pub fn latest(&self) -> Option<&GlucoseReading> {
        self.readings.first()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn next_refresh_at(&self) -> Option<DateTime<Utc>> {
        self.next_refresh_at
    }

    /// Swap in new alert settings without touching the session.
    pub fn replace_alert_settings(&mut self, settings: AlertSettings) {
        info!("Alert settings updated");
        self.evaluator.replace_settings(settings);
        self.stale_alerted = false;
    }

    /// Drop the session, cached session file and readings.
    pub fn logout(&mut self) -> Result<()> {
        info!("Logging out of Share");
        self.session = None;
        self.readings.clear();
        self.next_refresh_at = None;
        self.consecutive_failures = 0;
        self.last_error = None;
        self.stale_alerted = false;
        self.state = MonitorState::Unauthenticated;
        self.readings_tx.send_replace(Vec::new());
        self.publish(Utc::now());

        if let Some(cache) = &self.session_cache {
            cache.clear()?;
        }
        Ok(())
    }

    /// Run one poll cycle at wall-clock time `now`.
    pub async fn refresh(&mut self, now: DateTime<Utc>) -> RefreshOutcome {
        match self.poll(now).await {
            Ok(readings) => self.apply_readings(readings, now).await,
            Err(PollFailure::Recoverable(err)) => {
                let delay = scheduler::backoff_delay(self.consecutive_failures);
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                warn!(
                    failures = self.consecutive_failures,
                    retry_in = delay.as_secs(),
                    "Refresh failed: {}",
                    err
                );
                self.state = MonitorState::Backoff;
                self.last_error = Some(err.clone());
                self.schedule(delay, now);
                self.publish(now);
                RefreshOutcome::Failed(err)
            }
            Err(PollFailure::Fatal(err)) => {
                error!("Giving up on Share session: {}", err);
                self.forget_session();
                self.state = MonitorState::Unauthenticated;
                self.next_refresh_at = None;
                self.last_error = Some(err.clone());
                self.publish(now);
                RefreshOutcome::GaveUp(err)
            }
        }
    }

    /// Raise a stale-data alert once per stale episode.
    pub async fn check_stale(&mut self, now: DateTime<Utc>) -> Option<Alert> {
        if self.stale_alerted {
            return None;
        }
        let alert = self.evaluator.evaluate_stale(self.readings.first(), now)?;
        self.stale_alerted = true;
        self.deliver(&alert).await;
        Some(alert)
    }

    /// Current status as of `now`.
    pub fn status(&self, now: DateTime<Utc>) -> MonitorStatus {
        let latest = self.readings.first().cloned();
        let delta = match (self.readings.first(), self.readings.get(1)) {
            (Some(newest), Some(previous)) => Some(newest.value - previous.value),
            _ => None,
        };

        MonitorStatus {
            state: self.state,
            range: latest
                .as_ref()
                .map(|r| r.range_with(&self.evaluator.settings().thresholds)),
            seconds_since_reading: latest.as_ref().map(|r| r.age_seconds(now)),
            latest,
            delta,
            seconds_until_refresh: self
                .next_refresh_at
                .map(|at| (at - now).num_seconds().max(0)),
            consecutive_failures: self.consecutive_failures,
            last_error: self.last_error.as_ref().map(|e| e.to_string()),
            recovery_suggestion: self
                .last_error
                .as_ref()
                .map(|e| e.recovery_suggestion().to_string()),
            updated_at: now,
        }
    }

    /// Drive the monitor until `shutdown` resolves.
    ///
    /// Returns an error only when authentication gives up.
    pub async fn run<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut display = time::interval(DISPLAY_TICK);
        display.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut stale = time::interval(STALE_CHECK_TICK);
        stale.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.refresh_deadline = Instant::now();
        info!("Glucose monitor started");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Glucose monitor stopping");
                    break;
                }
                _ = time::sleep_until(self.refresh_deadline) => {
                    // a refresh can sit in re-login delays and HTTP timeouts
                    let outcome = tokio::select! {
                        outcome = self.refresh(Utc::now()) => outcome,
                        _ = &mut shutdown => {
                            info!("Glucose monitor stopping mid-refresh");
                            break;
                        }
                    };
                    if let RefreshOutcome::GaveUp(err) = outcome {
                        return Err(err);
                    }
                }
                _ = display.tick() => {
                    self.publish(Utc::now());
                }
                _ = stale.tick() => {
                    self.check_stale(Utc::now()).await;
                }
            }
        }

        Ok(())
    }

    async fn poll(&mut self, now: DateTime<Utc>) -> PollResult<Vec<GlucoseReading>> {
        let session = self.ensure_session(now).await?;

        let readings = match self
            .api
            .latest_readings(&session, self.fetch_minutes, self.fetch_count)
            .await
        {
            Err(err) if err.requires_reauthentication() => {
                warn!("Share rejected session ({}), re-authenticating", err);
                self.forget_session();
                let session = self.reauthenticate().await?;
                self.api
                    .latest_readings(&session, self.fetch_minutes, self.fetch_count)
                    .await
            }
            other => other,
        }
        .map_err(PollFailure::Recoverable)?;

        if readings.is_empty() {
            return Err(PollFailure::Recoverable(WatchError::NoData));
        }
        Ok(readings)
    }

    /// Return a usable session, logging in when there is none or it expired.
    async fn ensure_session(&mut self, now: DateTime<Utc>) -> PollResult<Session> {
        if let Some(session) = &self.session {
            if !session.is_expired(now) {
                return Ok(session.clone());
            }
            info!("Share session expired at {}", session.expires_at());
            self.session = None;
        }

        self.login_once().await.map_err(|err| match err {
            WatchError::InvalidCredentials => PollFailure::Fatal(err),
            other => PollFailure::Recoverable(other),
        })
    }

    /// Retry login with exponential delay, up to [`MAX_REAUTH_ATTEMPTS`].
    ///
    /// Gives up only when Share refused every attempt; outages fall back to
    /// the regular failure backoff.
    async fn reauthenticate(&mut self) -> PollResult<Session> {
        let mut last_error = WatchError::SessionExpired;
        let mut refused_every_time = true;

        for attempt in 1..=MAX_REAUTH_ATTEMPTS {
            let delay = scheduler::reauth_delay(attempt);
            debug!(attempt, delay = delay.as_secs(), "Waiting before re-login");
            time::sleep(delay).await;

            match self.login_once().await {
                Ok(session) => return Ok(session),
                Err(WatchError::InvalidCredentials) => {
                    return Err(PollFailure::Fatal(WatchError::InvalidCredentials));
                }
                Err(err) => {
                    warn!(attempt, "Re-login failed: {}", err);
                    refused_every_time &= err.is_auth_failure();
                    last_error = err;
                }
            }
        }

        if refused_every_time {
            Err(PollFailure::Fatal(last_error))
        } else {
            Err(PollFailure::Recoverable(last_error))
        }
    }

    /// Drop the in-memory session and its cached copy.
    fn forget_session(&mut self) {
        self.session = None;
        if let Some(cache) = &self.session_cache {
            if let Err(e) = cache.clear() {
                warn!("Failed to clear session cache: {}", e);
            }
        }
    }

    async fn login_once(&mut self) -> Result<Session> {
        self.state = MonitorState::Authenticating;
        self.publish(Utc::now());

        let session = self.api.login(&self.credentials).await?;
        if let Some(cache) = &self.session_cache {
            if let Err(e) = cache.save(&session) {
                warn!("Failed to cache session: {}", e);
            }
        }
        self.session = Some(session.clone());
        Ok(session)
    }

    async fn apply_readings(
        &mut self,
        readings: Vec<GlucoseReading>,
        now: DateTime<Utc>,
    ) -> RefreshOutcome {
        let previous = self.readings.first().map(|r| r.timestamp);
        self.readings = readings;
        self.readings_tx.send_replace(self.readings.clone());

        self.consecutive_failures = 0;
        self.last_error = None;
        self.state = MonitorState::Polling;

        let mut alerts = Vec::new();
        let mut new_reading = false;

        if let Some(latest) = self.readings.first().cloned() {
            new_reading = previous.map_or(true, |p| latest.timestamp > p);
            let delay = scheduler::next_refresh_delay(latest.timestamp, now);
            self.schedule(delay, now);

            if new_reading {
                info!(
                    value = latest.value,
                    trend = %latest.trend,
                    "New reading {}",
                    latest.display(self.units)
                );
                self.stale_alerted = false;
                alerts = self.evaluator.evaluate(&latest, now);
                for alert in &alerts {
                    self.deliver(alert).await;
                }
            } else {
                debug!("No new reading since {}", latest.timestamp);
            }
        }

        self.publish(now);
        RefreshOutcome::Updated { new_reading, alerts }
    }

    async fn deliver(&self, alert: &Alert) {
        if let Err(e) = self.notifier.notify(alert).await {
            error!(kind = ?alert.kind, "Failed to deliver alert: {}", e);
        }
    }

    fn schedule(&mut self, delay: Duration, now: DateTime<Utc>) {
        self.refresh_deadline = Instant::now() + delay;
        self.next_refresh_at = Some(
            now + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero()),
        );
        debug!(delay = delay.as_secs(), "Next refresh scheduled");
    }

    fn publish(&self, now: DateTime<Utc>) {
        self.status_tx.send_replace(self.status(now));
    }
}
