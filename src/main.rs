//! glucowatch - Dexcom Share glucose monitor binary
//!
//! Polls Share for readings, prints them to the terminal, raises alerts and
//! optionally serves a local JSON status endpoint.

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use glucowatch::{
    start_status_server, CompositeNotifier, Credentials, GlucoseMonitor, MonitorStatus,
    RefreshOutcome, Region, SessionCache, Settings, ShareClient, Units, WebConfig,
};
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tokio_stream::{wrappers::WatchStream, StreamExt};
use tracing::{error, info, Level};
use tracing_subscriber::{filter::LevelFilter, EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "glucowatch")]
#[command(about = "🩸 glucowatch - Dexcom Share glucose monitor")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Polls Dexcom Share for CGM readings and raises threshold alerts")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Settings file (defaults to ~/.glucowatch/settings.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dexcom account name
    #[arg(short, long, env = "DEXCOM_USERNAME")]
    username: Option<String>,

    /// Dexcom account password
    #[arg(long, env = "DEXCOM_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Share region: us, ous or jp (overrides the settings file)
    #[arg(long, env = "DEXCOM_REGION")]
    region: Option<Region>,

    /// Display in mmol/L instead of mg/dL
    #[arg(long)]
    mmol: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll continuously and raise alerts (default)
    Watch(WatchArgs),

    /// Fetch the latest reading once and exit
    Current(CurrentArgs),

    /// Show the effective settings
    Config(ConfigArgs),

    /// Forget the cached Share session
    Logout,
}

#[derive(Args, Default)]
struct WatchArgs {
    /// Serve the status endpoint on this port
    #[arg(long)]
    status_port: Option<u16>,

    /// Only log, do not print status lines
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Args)]
struct CurrentArgs {
    /// Output format: json or pretty
    #[arg(short, long, default_value = "pretty")]
    format: String,

    /// Number of recent readings to show
    #[arg(short = 'n', long, default_value_t = 1)]
    count: usize,
}

#[derive(Args)]
struct ConfigArgs {
    /// Write the effective settings to the settings file
    #[arg(long)]
    write: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Settings::default_path()?,
    };
    let settings = effective_settings(&cli, &config_path)?;

    match &cli.command {
        Some(Commands::Watch(args)) => watch_command(&cli, &settings, &config_path, args).await,
        Some(Commands::Current(args)) => current_command(&cli, &settings, &config_path, args).await,
        Some(Commands::Config(args)) => config_command(&settings, &config_path, args),
        Some(Commands::Logout) => logout_command(&config_path),
        None => watch_command(&cli, &settings, &config_path, &WatchArgs::default()).await,
    }
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(log_level(cli), &directives))
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

fn log_level(cli: &Cli) -> Level {
    if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    }
}

/// `RUST_LOG` directives layered over the level chosen on the command line.
fn log_filter(level: Level, directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .parse_lossy(directives)
}

/// Settings file merged with command line overrides.
fn effective_settings(cli: &Cli, config_path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::load_or_default(config_path)
        .with_context(|| format!("loading settings from {}", config_path.display()))?;

    if let Some(region) = cli.region {
        settings = settings.with_region(region);
    }
    if cli.mmol {
        settings = settings.with_units(Units::MmolL);
    }
    if let Some(Commands::Watch(args)) = &cli.command {
        if args.status_port.is_some() {
            settings = settings.with_status_port(args.status_port);
        }
    }

    Ok(settings)
}

fn credentials(cli: &Cli) -> anyhow::Result<Credentials> {
    match (&cli.username, &cli.password) {
        (Some(user), Some(password)) => Ok(Credentials::new(user, password)),
        _ => bail!("Dexcom credentials required: pass --username/--password or set DEXCOM_USERNAME and DEXCOM_PASSWORD"),
    }
}

fn session_cache(config_path: &Path) -> SessionCache {
    let dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    SessionCache::new(dir.join("session.json"))
}

fn build_monitor(
    cli: &Cli,
    settings: &Settings,
    config_path: &Path,
) -> anyhow::Result<GlucoseMonitor<ShareClient, CompositeNotifier>> {
    let credentials = credentials(cli)?;
    let client = ShareClient::new(settings.region)?;
    let notifier = CompositeNotifier::new(settings.notify_command.clone());

    Ok(GlucoseMonitor::new(client, notifier, credentials, settings)
        .with_session_cache(session_cache(config_path)))
}

fn print_banner() {
    println!("🩸 glucowatch - Dexcom Share glucose monitor");
    println!("   Version: {}", env!("CARGO_PKG_VERSION"));
    println!();
}

async fn watch_command(
    cli: &Cli,
    settings: &Settings,
    config_path: &Path,
    args: &WatchArgs,
) -> anyhow::Result<()> {
    let monitor = build_monitor(cli, settings, config_path)?;
    let handle = monitor.handle();

    if !args.quiet {
        print_banner();
        println!("   Region: {}", settings.region);
        println!("   Press Ctrl+C to stop");
        println!();
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let server = WebConfig::from_settings(settings).map(|web_config| {
        info!("Status endpoint: http://{}", web_config.bind_address());
        let mut rx = shutdown_rx.clone();
        let handle = handle.clone();
        tokio::spawn(async move {
            let shutdown = async move {
                let _ = rx.changed().await;
            };
            if let Err(e) = start_status_server(web_config, handle, shutdown).await {
                error!("Status endpoint failed: {}", e);
            }
        })
    });

    let printer = (!args.quiet).then(|| {
        let units = settings.units;
        let stream = WatchStream::new(handle.status.clone());
        tokio::spawn(print_status_changes(stream, units))
    });

    let result = monitor
        .run(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    let _ = shutdown_tx.send(true);
    if let Some(server) = server {
        let _ = server.await;
    }
    if let Some(printer) = printer {
        printer.abort();
    }

    if let Err(e) = result {
        bail!("{} ({})", e, e.recovery_suggestion());
    }
    Ok(())
}

/// Print a status line whenever the reading, state or error changes.
async fn print_status_changes(mut stream: WatchStream<MonitorStatus>, units: Units) {
    let mut last_key = None;
    while let Some(status) = stream.next().await {
        let key = (
            status.latest.as_ref().map(|r| r.timestamp),
            status.state,
            status.last_error.clone(),
        );
        if last_key.as_ref() == Some(&key) {
            continue;
        }
        last_key = Some(key);

        let now = chrono::Local::now().format("%H:%M:%S");
        println!("[{}] {}", now, status.summary(units));
        if let Some(hint) = &status.recovery_suggestion {
            println!("           {}", hint);
        }
    }
}

async fn current_command(
    cli: &Cli,
    settings: &Settings,
    config_path: &Path,
    args: &CurrentArgs,
) -> anyhow::Result<()> {
    let mut monitor = build_monitor(cli, settings, config_path)?;

    match monitor.refresh(Utc::now()).await {
        RefreshOutcome::Updated { .. } => {}
        RefreshOutcome::Failed(e) | RefreshOutcome::GaveUp(e) => {
            bail!("{} ({})", e, e.recovery_suggestion());
        }
    }

    let count = args.count.max(1).min(monitor.readings().len());
    let readings = &monitor.readings()[..count];

    match args.format.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(readings)?;
            println!("{}", json);
        }
        "pretty" => {
            let status = monitor.status(Utc::now());
            println!("🩸 {}", status.summary(settings.units));
            if count > 1 {
                println!();
                for reading in readings {
                    println!(
                        "  {}  {:>14}  {}",
                        reading.timestamp.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"),
                        settings.units.format(reading.value),
                        reading.trend.arrow()
                    );
                }
            }
        }
        other => {
            bail!("Unsupported format: {}. Use 'json' or 'pretty'", other);
        }
    }

    Ok(())
}

fn config_command(settings: &Settings, config_path: &Path, args: &ConfigArgs) -> anyhow::Result<()> {
    if args.write {
        settings.save(config_path)?;
        println!("Settings written to {}", config_path.display());
        return Ok(());
    }

    println!("# {}", config_path.display());
    println!("{}", serde_json::to_string_pretty(settings)?);
    Ok(())
}

fn logout_command(config_path: &Path) -> anyhow::Result<()> {
    let cache = session_cache(config_path);
    cache.clear()?;
    println!("Cleared cached session at {}", cache.path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from([
            "glucowatch",
            "--username",
            "me",
            "--password",
            "pw",
            "--region",
            "ous",
            "watch",
            "--status-port",
            "9090",
        ])
        .unwrap();

        assert_eq!(cli.region, Some(Region::OutsideUs));
        match cli.command {
            Some(Commands::Watch(args)) => assert_eq!(args.status_port, Some(9090)),
            _ => panic!("expected watch command"),
        }
    }

    #[test]
    fn test_default_values() {
        let cli = Cli::try_parse_from(["glucowatch", "current"]).unwrap();
        match cli.command {
            Some(Commands::Current(args)) => {
                assert_eq!(args.format, "pretty");
                assert_eq!(args.count, 1);
            }
            _ => panic!("expected current command"),
        }
        assert!(!cli.mmol);
    }

    #[test]
    fn test_log_filter_without_rust_log() {
        let quiet = FmtSubscriber::builder()
            .with_env_filter(log_filter(Level::WARN, ""))
            .finish();
        tracing::subscriber::with_default(quiet, || {
            assert!(tracing::enabled!(Level::WARN));
            assert!(!tracing::enabled!(Level::INFO));
        });

        let verbose = FmtSubscriber::builder()
            .with_env_filter(log_filter(Level::INFO, ""))
            .finish();
        tracing::subscriber::with_default(verbose, || {
            assert!(tracing::enabled!(Level::INFO));
            assert!(tracing::enabled!(Level::WARN));
            assert!(!tracing::enabled!(Level::DEBUG));
        });
    }

    #[test]
    fn test_rust_log_overrides_cli_level() {
        let cli = Cli::try_parse_from(["glucowatch", "-d", "current"]).unwrap();
        assert_eq!(log_level(&cli), Level::DEBUG);

        let subscriber = FmtSubscriber::builder()
            .with_env_filter(log_filter(Level::WARN, "trace"))
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            assert!(tracing::enabled!(Level::TRACE));
        });
    }

    #[test]
    fn test_session_cache_sits_next_to_settings() {
        let cache = session_cache(Path::new("/tmp/gw/settings.json"));
        assert_eq!(cache.path(), Path::new("/tmp/gw/session.json"));
    }
}
