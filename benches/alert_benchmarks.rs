use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glucowatch::{
    classify, share::data::parse_readings, AlertEvaluator, AlertSettings, GlucoseReading,
    MonitorStatus, Thresholds, Trend, Units,
};

/// Build a Share-shaped payload with `count` readings five minutes apart
fn share_payload(count: usize) -> String {
    let start_ms: i64 = 1_700_000_000_000;
    let trends = ["Flat", "FortyFiveUp", "SingleDown", "DoubleUp"];
    let entries: Vec<String> = (0..count)
        .map(|i| {
            let ms = start_ms + (i as i64) * 300_000;
            format!(
                r#"{{"WT":"Date({ms})","ST":"Date({ms})","DT":"Date({ms}-0500)","Value":{},"Trend":"{}"}}"#,
                60 + (i % 200),
                trends[i % trends.len()],
            )
        })
        .collect();
    format!("[{}]", entries.join(","))
}

/// Benchmark band classification across the full value range
fn bench_classify(c: &mut Criterion) {
    let thresholds = Thresholds::default();

    c.bench_function("classify_full_range", |b| {
        b.iter(|| {
            for value in 40..=400 {
                black_box(classify(black_box(value), &thresholds));
            }
        })
    });
}

/// Benchmark alert evaluation with cooldowns in play
fn bench_evaluate(c: &mut Criterion) {
    let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let readings: Vec<GlucoseReading> = (0..288)
        .map(|i| {
            GlucoseReading::new(
                start + Duration::minutes(5 * i),
                50 + ((i * 7) % 250) as i32,
                Trend::from_index((i % 10) as u8).unwrap_or(Trend::Flat),
            )
        })
        .collect();

    c.bench_function("evaluate_day_of_readings", |b| {
        b.iter(|| {
            let mut evaluator = AlertEvaluator::new(AlertSettings::default(), Units::MgDl);
            let mut fired = 0;
            for reading in &readings {
                fired += evaluator.evaluate(reading, reading.timestamp).len();
            }
            black_box(fired)
        })
    });
}

/// Benchmark parsing of Share reading payloads
fn bench_parse_readings(c: &mut Criterion) {
    for count in [1usize, 12, 288].iter() {
        let payload = share_payload(*count);
        c.bench_with_input(BenchmarkId::new("parse_readings", count), &payload, |b, payload| {
            b.iter(|| parse_readings(black_box(payload)).expect("Should parse payload"))
        });
    }
}

/// Benchmark status serialization as served by the status endpoint
fn bench_status_json(c: &mut Criterion) {
    let now = Utc::now();
    let mut status = MonitorStatus::initial(now);
    status.latest = Some(GlucoseReading::new(now, 123, Trend::Flat));
    status.delta = Some(-4);

    c.bench_function("status_json_serialization", |b| {
        b.iter(|| serde_json::to_string(&status).expect("Should serialize"))
    });

    c.bench_function("status_summary", |b| {
        b.iter(|| status.summary(black_box(Units::MmolL)))
    });
}

criterion_group!(
    benches,
    bench_classify,
    bench_evaluate,
    bench_parse_readings,
    bench_status_json
);
criterion_main!(benches);
