//! Alert delivery.

use crate::alerts::Alert;
use crate::error::{Result, WatchError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error, warn};

/// Default run time limit for a notify command, in seconds.
pub const NOTIFY_COMMAND_TIMEOUT_SECS: u64 = 10;

fn default_timeout_seconds() -> u64 {
    NOTIFY_COMMAND_TIMEOUT_SECS
}

/// Something that can deliver an [`Alert`] to the user.
pub trait Notifier {
    /// Deliver one alert.
    fn notify(&self, alert: &Alert) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Emits alerts as structured tracing events.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn notify(&self, alert: &Alert) -> Result<()> {
        if alert.kind.is_urgent() {
            error!(kind = ?alert.kind, value = ?alert.value, "{}: {}", alert.title, alert.message);
        } else {
            warn!(kind = ?alert.kind, value = ?alert.value, "{}: {}", alert.title, alert.message);
        }
        Ok(())
    }
}

/// External program to run for each alert, e.g. `notify-send`.
///
/// `{title}`, `{message}` and `{value}` in `args` are substituted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Seconds before a hung command is killed
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// Runs a [`NotifyCommand`] per alert.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    command: NotifyCommand,
    timeout: Duration,
}

impl CommandNotifier {
    pub fn new(command: NotifyCommand) -> Self {
        let timeout = Duration::from_secs(command.timeout_seconds.max(1));
        Self { command, timeout }
    }

    /// Arguments with placeholders filled in for `alert`.
    pub fn render_args(&self, alert: &Alert) -> Vec<String> {
        let value = alert.value.map(|v| v.to_string()).unwrap_or_default();
        self.command
            .args
            .iter()
            .map(|arg| {
                arg.replace("{title}", &alert.title)
                    .replace("{message}", &alert.message)
                    .replace("{value}", &value)
            })
            .collect()
    }
}

impl Notifier for CommandNotifier {
    async fn notify(&self, alert: &Alert) -> Result<()> {
        let args = self.render_args(alert);
        debug!(program = %self.command.program, ?args, "running notify command");

        let mut command = Command::new(&self.command.program);
        command.args(&args).kill_on_drop(true);

        // the child is killed when the timed-out future drops it
        let status = tokio::time::timeout(self.timeout, command.status())
            .await
            .map_err(|_| {
                WatchError::Io(format!(
                    "notify command {} timed out after {}s",
                    self.command.program,
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                WatchError::Io(format!(
                    "failed to run notify command {}: {}",
                    self.command.program, e
                ))
            })?;

        if !status.success() {
            return Err(WatchError::Io(format!(
                "notify command {} exited with {}",
                self.command.program, status
            )));
        }
        Ok(())
    }
}

/// Logs every alert and, when configured, also runs a command.
#[derive(Debug, Clone, Default)]
pub struct CompositeNotifier {
    log: LogNotifier,
    command: Option<CommandNotifier>,
}

impl CompositeNotifier {
    pub fn new(command: Option<NotifyCommand>) -> Self {
        Self {
            log: LogNotifier,
            command: command.map(CommandNotifier::new),
        }
    }
}

impl Notifier for CompositeNotifier {
    async fn notify(&self, alert: &Alert) -> Result<()> {
        self.log.notify(alert).await?;
        if let Some(command) = &self.command {
            command.notify(alert).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertKind;
    use chrono::Utc;

    fn alert() -> Alert {
        Alert {
            kind: AlertKind::High,
            title: "High glucose".to_string(),
            message: "Glucose is 210 mg/dL ↑".to_string(),
            value: Some(210),
            raised_at: Utc::now(),
        }
    }

    #[test]
    fn test_render_args_substitutes_placeholders() {
        let notifier = CommandNotifier::new(NotifyCommand {
            program: "notify-send".to_string(),
            args: vec![
                "--urgency=normal".to_string(),
                "{title}".to_string(),
                "{message} ({value})".to_string(),
            ],
            timeout_seconds: NOTIFY_COMMAND_TIMEOUT_SECS,
        });

        let args = notifier.render_args(&alert());
        assert_eq!(args[0], "--urgency=normal");
        assert_eq!(args[1], "High glucose");
        assert_eq!(args[2], "Glucose is 210 mg/dL ↑ (210)");
    }

    #[test]
    fn test_timeout_defaults_when_omitted() {
        let command: NotifyCommand =
            serde_json::from_str(r#"{"program":"notify-send"}"#).unwrap();
        assert_eq!(command.timeout_seconds, NOTIFY_COMMAND_TIMEOUT_SECS);
        assert!(command.args.is_empty());
    }

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        assert!(LogNotifier.notify(&alert()).await.is_ok());
        assert!(CompositeNotifier::new(None).notify(&alert()).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_program_is_io_error() {
        let notifier = CommandNotifier::new(NotifyCommand {
            program: "glucowatch-no-such-program".to_string(),
            args: vec![],
            timeout_seconds: NOTIFY_COMMAND_TIMEOUT_SECS,
        });
        let err = notifier.notify(&alert()).await.unwrap_err();
        assert!(matches!(err, WatchError::Io(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_command_is_killed_after_timeout() {
        let notifier = CommandNotifier::new(NotifyCommand {
            program: "sleep".to_string(),
            args: vec!["30".to_string()],
            timeout_seconds: 1,
        });

        let started = std::time::Instant::now();
        let err = notifier.notify(&alert()).await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(10));
        match err {
            WatchError::Io(msg) => assert!(msg.contains("timed out"), "got {}", msg),
            other => panic!("expected Io error, got {:?}", other),
        }
    }
}
