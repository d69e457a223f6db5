use chrono::{Duration, TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use strava_yearbook::models::{Activity, ActivityLocation, StatisticsReport};

const TYPES: [&str; 5] = ["Run", "Ride", "Walk", "Hike", "Swim"];
const CITIES: [&str; 8] = [
    "Palo Alto",
    "Mountain View",
    "Los Altos",
    "Woodside",
    "Portola Valley",
    "Saratoga",
    "Cupertino",
    "Los Gatos",
];

/// A busy year: several activities a day at varying hours and places.
fn synthetic_year(count: usize) -> Vec<Activity> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    (0..count)
        .map(|i| {
            let start_date = start + Duration::minutes((i as i64 * 397) % (365 * 24 * 60));
            let distance = 2_000.0 + (i % 37) as f64 * 850.0;
            Activity {
                strava_id: i as u64 + 1,
                user_email: "bench@example.com".to_string(),
                name: format!("Activity {}", i),
                activity_type: TYPES[i % TYPES.len()].to_string(),
                distance,
                moving_time: (distance / 3.2) as u64,
                elapsed_time: (distance / 3.0) as u64,
                total_elevation_gain: Some((i % 13) as f64 * 40.0),
                start_date,
                start_date_local: Some(start_date.naive_utc() - Duration::hours(8)),
                timezone: "(GMT-08:00) America/Los_Angeles".to_string(),
                location: ActivityLocation {
                    city: Some(CITIES[i % CITIES.len()].to_string()),
                    state: Some("California".to_string()),
                    country: Some("United States".to_string()),
                },
                raw_data: serde_json::Value::Null,
                synced_at: Utc::now(),
            }
        })
        .collect()
}

fn benchmark_statistics_report(c: &mut Criterion) {
    let mut group = c.benchmark_group("statistics_report");

    for count in [100, 1_000, 5_000] {
        let activities = synthetic_year(count);
        group.bench_function(format!("{}_activities", count), |b| {
            b.iter(|| StatisticsReport::build(black_box(2024), black_box(&activities)))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_statistics_report);
criterion_main!(benches);
