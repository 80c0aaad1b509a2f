use chrono::{Duration, TimeZone, Utc};
use glucowatch::{
    alerts::{AlertEvaluator, AlertKind, AlertSettings, EnabledAlerts},
    classify,
    monitor::scheduler::{backoff_delay, next_refresh_at, reauth_delay},
    share::data::parse_readings,
    GlucoseRange, GlucoseReading, MonitorState, MonitorStatus, Settings, Thresholds, Trend,
    Units, WatchError, WebConfig,
};

/// Test the full band table with default thresholds
#[test]
fn test_classification_table() {
    let t = Thresholds::default();
    let table = [
        (54, GlucoseRange::UrgentLow),
        (55, GlucoseRange::Low),
        (69, GlucoseRange::Low),
        (70, GlucoseRange::WarningLow),
        (79, GlucoseRange::WarningLow),
        (80, GlucoseRange::Normal),
        (159, GlucoseRange::Normal),
        (160, GlucoseRange::WarningHigh),
        (179, GlucoseRange::WarningHigh),
        (180, GlucoseRange::High),
        (249, GlucoseRange::High),
        (250, GlucoseRange::UrgentHigh),
    ];

    for (value, expected) in table {
        assert_eq!(classify(value, &t), expected, "value {}", value);
    }
}

/// Test that custom thresholds move the band edges
#[test]
fn test_custom_thresholds() {
    let t = Thresholds {
        urgent_low: 60,
        low: 75,
        warning_low: 90,
        warning_high: 150,
        high: 200,
        urgent_high: 300,
    };
    assert!(t.validate().is_ok());
    assert_eq!(classify(59, &t), GlucoseRange::UrgentLow);
    assert_eq!(classify(89, &t), GlucoseRange::WarningLow);
    assert_eq!(classify(199, &t), GlucoseRange::WarningHigh);
    assert_eq!(classify(299, &t), GlucoseRange::High);

    let reading = GlucoseReading::new(Utc::now(), 199, Trend::Flat);
    assert_eq!(reading.range_with(&Thresholds::default()), GlucoseRange::High);
    assert_eq!(reading.range_with(&t), GlucoseRange::WarningHigh);
}

/// Test scheduling against the sensor cadence
#[test]
fn test_schedule_after_two_intervals() {
    let t = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    assert_eq!(
        next_refresh_at(t, t + Duration::seconds(605)),
        t + Duration::seconds(910)
    );
}

/// Test backoff and re-login delays
#[test]
fn test_backoff_and_reauth_delays() {
    let secs: Vec<u64> = (0..6).map(|n| backoff_delay(n).as_secs()).collect();
    assert_eq!(secs, vec![30, 60, 120, 240, 300, 300]);

    let reauth: Vec<u64> = (1..=3).map(|n| reauth_delay(n).as_secs()).collect();
    assert_eq!(reauth, vec![2, 4, 8]);
}

/// Test cooldown gating through the public evaluator
#[test]
fn test_cooldown_gating() {
    let t = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let enabled = EnabledAlerts {
        falling_fast: true,
        ..EnabledAlerts::default()
    };
    let settings = AlertSettings::default()
        .with_enabled(enabled)
        .with_cooldowns(10, 3);
    let mut evaluator = AlertEvaluator::new(settings, Units::MmolL);

    let reading = GlucoseReading::new(t, 185, Trend::DoubleDown);
    let first: Vec<AlertKind> = evaluator.evaluate(&reading, t).iter().map(|a| a.kind).collect();
    assert_eq!(first, vec![AlertKind::High, AlertKind::FallingFast]);

    assert!(evaluator.evaluate(&reading, t + Duration::minutes(9)).is_empty());
    assert_eq!(evaluator.evaluate(&reading, t + Duration::minutes(10)).len(), 2);
}

/// Test Share payload parsing end to end
#[test]
fn test_share_payload_parsing() {
    let body = r#"[
        {"WT":"Date(1700000600000)","ST":"Date(1700000600000)","DT":"Date(1700000600000-0500)","Value":95,"Trend":"Flat"},
        {"WT":"Date(1700000300000)","ST":"Date(1700000300000)","DT":"Date(1700000300000-0500)","Value":99,"Trend":"FortyFiveDown"},
        {"WT":"Date(1700000000000)","ST":"Date(1700000000000)","DT":"Date(1700000000000-0500)","Value":104,"Trend":5}
    ]"#;

    let readings = parse_readings(body).expect("Should parse readings");
    assert_eq!(readings.len(), 3);
    assert_eq!(readings[0].value, 95);
    assert_eq!(readings[2].trend, Trend::FortyFiveDown);
    assert_eq!(readings[0].display(Units::MgDl), "95 mg/dL →");

    let err = parse_readings(r#"{"Code":"SessionNotValid"}"#).unwrap_err();
    assert!(matches!(err, WatchError::Parse(_)));
}

/// Test JSON shape of the published status
#[test]
fn test_status_json_shape() {
    let now = Utc::now();
    let mut status = MonitorStatus::initial(now);
    status.state = MonitorState::Backoff;
    status.last_error = Some(WatchError::NoData.to_string());
    status.recovery_suggestion = Some(WatchError::NoData.recovery_suggestion().to_string());

    let json: serde_json::Value =
        serde_json::to_value(&status).expect("Should serialize status");
    assert_eq!(json["state"], "backoff");
    assert!(json.get("latest").is_some());
    assert!(json.get("seconds_until_refresh").is_some());
    assert!(json["recovery_suggestion"]
        .as_str()
        .unwrap()
        .contains("sensor"));
}

/// Test settings file shape and defaults
#[test]
fn test_settings_json_defaults() {
    let settings: Settings = serde_json::from_str(r#"{"region":"japan","units":"mmol_l"}"#)
        .expect("Should parse partial settings");
    assert_eq!(settings.region, glucowatch::Region::Japan);
    assert_eq!(settings.units, Units::MmolL);
    assert_eq!(settings.fetch_count, 288);
    assert_eq!(settings.alerts.stale_after_minutes, 15);
    assert!(settings.status_port.is_none());
    assert!(WebConfig::from_settings(&settings).is_none());
}

/// Test WebConfig builder pattern
#[test]
fn test_web_config() {
    let config = WebConfig::new("0.0.0.0", 9090)
        .with_cors(false)
        .with_units(Units::MmolL);

    assert_eq!(config.port, 9090);
    assert!(!config.enable_cors);
    assert_eq!(config.bind_address(), "0.0.0.0:9090");

    let settings = Settings::default().with_status_port(Some(8080));
    let from_settings = WebConfig::from_settings(&settings).expect("enabled");
    assert_eq!(from_settings.bind_address(), "127.0.0.1:8080");
}
