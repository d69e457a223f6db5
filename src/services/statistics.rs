// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Yearly statistics derived from stored activities.
//!
//! All functions are pure and take activities already scoped to one user and
//! one year. Dates and hours are taken from the activity's local start time.
//! Empty input yields zeros and `None`, never an error.

use crate::models::stats::{
    ActivityTypeBreakdown, BestPerformances, CityCount, CoreSummary, CountryCount, DayCount,
    LocationInsights, MonthCount, MonthlyStats, PeriodCount, StatisticsReport, TimeOfDay,
    TimeOfDayStats, WeekdayCount, WeeklyAverages, WeeklyInsights,
};
use crate::models::{Activity, ActivitySummary};
use chrono::{Datelike, NaiveDate, Timelike};
use std::collections::{BTreeSet, HashMap, HashSet};

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

const TOP_LOCATIONS: usize = 5;

const EARTH_CIRCUMFERENCE_KM: f64 = 40_075.0;
const EVEREST_HEIGHT_M: f64 = 8_848.0;

/// Number of weeks spanned by the activities, never less than one.
fn week_count(activities: &[Activity]) -> f64 {
    let first = activities.iter().map(|a| a.start_date).min();
    let last = activities.iter().map(|a| a.start_date).max();

    match (first, last) {
        (Some(first), Some(last)) => {
            let secs = (last - first).num_seconds() as f64;
            let weeks = (secs / (7.0 * 24.0 * 3600.0)).ceil();
            if weeks >= 1.0 {
                weeks
            } else {
                1.0
            }
        }
        _ => 1.0,
    }
}

fn local_date(activity: &Activity) -> NaiveDate {
    activity.local_start().date()
}

/// Tally keys in first-seen order.
fn count_in_order<K, I>(keys: I) -> Vec<(K, u32)>
where
    K: Eq + std::hash::Hash + Clone,
    I: IntoIterator<Item = K>,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut counts: Vec<(K, u32)> = Vec::new();
    for key in keys {
        match index.get(&key) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(key.clone(), counts.len());
                counts.push((key, 1));
            }
        }
    }
    counts
}

/// First entry with the strictly highest count.
fn first_max<K: Clone>(counts: &[(K, u32)]) -> Option<(K, u32)> {
    counts
        .iter()
        .fold(None, |best: Option<&(K, u32)>, entry| match best {
            Some(b) if entry.1 <= b.1 => Some(b),
            _ if entry.1 == 0 => best,
            _ => Some(entry),
        })
        .cloned()
}

/// First activity for which `key` is strictly greatest.
fn first_max_by<'a, I, F>(activities: I, key: F) -> Option<&'a Activity>
where
    I: IntoIterator<Item = &'a Activity>,
    F: Fn(&Activity) -> f64,
{
    activities.into_iter().fold(None, |best, a| match best {
        Some(b) if key(a) <= key(b) => Some(b),
        _ => Some(a),
    })
}

pub fn core_summary(activities: &[Activity]) -> CoreSummary {
    if activities.is_empty() {
        return CoreSummary::default();
    }

    let total_distance: f64 = activities.iter().map(|a| a.distance).sum();
    let total_time: u64 = activities.iter().map(|a| a.moving_time).sum();
    let total_elevation: f64 = activities.iter().map(Activity::elevation).sum();
    let active_days = activities.iter().map(local_date).collect::<HashSet<_>>().len();
    let weeks = week_count(activities);

    CoreSummary {
        total_activities: activities.len() as u32,
        total_distance,
        total_time,
        total_elevation,
        active_days: active_days as u32,
        average_per_week: WeeklyAverages {
            activities: activities.len() as f64 / weeks,
            distance: total_distance / weeks,
            time: total_time as f64 / weeks,
        },
    }
}

fn type_icon(activity_type: &str) -> &'static str {
    match activity_type {
        "Ride" => "🚴",
        "Walk" => "🚶",
        "Hike" => "🥾",
        "Swim" => "🏊",
        "Workout" => "💪",
        _ => "🏃",
    }
}

/// Per-type counts, most frequent first. Ties keep first-seen order.
pub fn activity_type_breakdown(activities: &[Activity]) -> Vec<ActivityTypeBreakdown> {
    let total = activities.len() as f64;
    let mut distances: HashMap<&str, f64> = HashMap::new();
    for a in activities {
        *distances.entry(a.activity_type.as_str()).or_default() += a.distance;
    }

    let mut breakdown: Vec<ActivityTypeBreakdown> =
        count_in_order(activities.iter().map(|a| a.activity_type.as_str()))
            .into_iter()
            .map(|(activity_type, count)| ActivityTypeBreakdown {
                activity_type: activity_type.to_string(),
                count,
                distance: distances.get(activity_type).copied().unwrap_or_default(),
                percentage: count as f64 / total * 100.0,
                icon: type_icon(activity_type).to_string(),
            })
            .collect();

    breakdown.sort_by(|a, b| b.count.cmp(&a.count));
    breakdown
}

/// Always twelve entries, January first.
pub fn monthly_stats(activities: &[Activity], year: i32) -> Vec<MonthlyStats> {
    let mut months: Vec<MonthlyStats> = MONTH_NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| MonthlyStats {
            month: i as u32 + 1,
            month_name: name.to_string(),
            activities: 0,
            distance: 0.0,
            time: 0,
            elevation: 0.0,
        })
        .collect();

    for a in activities {
        let start = a.local_start();
        if start.year() != year {
            continue;
        }
        let m = &mut months[start.month0() as usize];
        m.activities += 1;
        m.distance += a.distance;
        m.time += a.moving_time;
        m.elevation += a.elevation();
    }

    months
}

/// Seconds per kilometer; only meaningful for positive distances.
fn pace(activity: &Activity) -> f64 {
    activity.moving_time as f64 / (activity.distance / 1000.0)
}

pub fn best_performances(activities: &[Activity]) -> BestPerformances {
    let runs = || activities.iter().filter(|a| a.activity_type == "Run");
    let rides = activities.iter().filter(|a| a.activity_type == "Ride");

    let highest_elevation = first_max_by(activities, Activity::elevation)
        .filter(|a| a.elevation() > 0.0);

    // Lowest pace wins; negate so the strictly-greater reduction applies.
    let fastest_pace = first_max_by(runs().filter(|a| a.distance > 0.0), |a| -pace(a));

    let mut month_counts = [0u32; 12];
    for a in activities {
        month_counts[a.local_start().month0() as usize] += 1;
    }
    let months: Vec<(u32, u32)> = month_counts
        .iter()
        .enumerate()
        .map(|(i, &count)| (i as u32 + 1, count))
        .collect();

    let days = count_in_order(activities.iter().map(local_date));

    BestPerformances {
        longest_activity: first_max_by(activities, |a| a.distance).map(ActivitySummary::from),
        longest_run: first_max_by(runs(), |a| a.distance).map(ActivitySummary::from),
        longest_ride: first_max_by(rides, |a| a.distance).map(ActivitySummary::from),
        highest_elevation: highest_elevation.map(ActivitySummary::from),
        fastest_pace: fastest_pace.map(ActivitySummary::from),
        most_active_month: first_max(&months).map(|(month, count)| MonthCount { month, count }),
        most_active_day: first_max(&days).map(|(date, count)| DayCount {
            date: date.format("%Y-%m-%d").to_string(),
            count,
        }),
    }
}

/// Longest run of consecutive calendar days with at least one activity.
pub fn longest_streak(dates: impl IntoIterator<Item = NaiveDate>) -> u32 {
    let dates: BTreeSet<NaiveDate> = dates.into_iter().collect();

    let mut longest = 0;
    let mut current = 0;
    let mut previous: Option<NaiveDate> = None;
    for date in dates {
        current = match previous {
            Some(p) if p.succ_opt() == Some(date) => current + 1,
            _ => 1,
        };
        longest = longest.max(current);
        previous = Some(date);
    }
    longest
}

pub fn weekly_insights(activities: &[Activity]) -> WeeklyInsights {
    if activities.is_empty() {
        return WeeklyInsights::default();
    }

    let mut weekday_counts = [0u32; 7];
    for a in activities {
        weekday_counts[local_date(a).weekday().num_days_from_sunday() as usize] += 1;
    }
    let weekdays: Vec<(&str, u32)> = WEEKDAY_NAMES
        .iter()
        .copied()
        .zip(weekday_counts)
        .collect();

    let times = time_of_day(activities);
    let periods: Vec<(TimeOfDay, u32)> = TimeOfDay::ALL
        .iter()
        .map(|&p| (p, times.count(p)))
        .collect();

    WeeklyInsights {
        average_per_week: activities.len() as f64 / week_count(activities),
        longest_streak: longest_streak(activities.iter().map(local_date)),
        most_common_day: first_max(&weekdays).map(|(day, count)| WeekdayCount {
            day: day.to_string(),
            count,
        }),
        most_common_time: first_max(&periods).map(|(period, count)| PeriodCount { period, count }),
    }
}

pub fn time_of_day(activities: &[Activity]) -> TimeOfDayStats {
    let mut stats = TimeOfDayStats::default();
    for a in activities {
        stats.record(TimeOfDay::from_hour(a.local_start().hour()));
    }
    stats
}

pub fn location_insights(activities: &[Activity]) -> LocationInsights {
    let top = |keys: Vec<&str>| -> Vec<(String, u32)> {
        let mut counts = count_in_order(keys);
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts.truncate(TOP_LOCATIONS);
        counts
            .into_iter()
            .map(|(k, c)| (k.to_string(), c))
            .collect()
    };

    let cities: Vec<&str> = activities
        .iter()
        .filter_map(|a| a.location.city.as_deref())
        .filter(|c| !c.is_empty())
        .collect();
    let countries: Vec<&str> = activities
        .iter()
        .filter_map(|a| a.location.country.as_deref())
        .filter(|c| !c.is_empty())
        .collect();

    let total_locations = activities
        .iter()
        .filter_map(|a| {
            let city = a.location.city.as_deref().filter(|c| !c.is_empty())?;
            Some(format!(
                "{}, {}",
                city,
                a.location.country.as_deref().unwrap_or("")
            ))
        })
        .collect::<HashSet<_>>()
        .len();

    LocationInsights {
        top_cities: top(cities)
            .into_iter()
            .map(|(city, count)| CityCount { city, count })
            .collect(),
        top_countries: top(countries)
            .into_iter()
            .map(|(country, count)| CountryCount { country, count })
            .collect(),
        total_locations: total_locations as u32,
    }
}

pub fn fun_facts(summary: &CoreSummary) -> Vec<String> {
    let mut facts = Vec::new();

    let km = summary.total_distance / 1000.0;
    if km > EARTH_CIRCUMFERENCE_KM {
        facts.push(format!(
            "You traveled around the Earth! ({:.2}x)",
            km / EARTH_CIRCUMFERENCE_KM
        ));
    }

    let hours = summary.total_time as f64 / 3600.0;
    if hours > 24.0 {
        facts.push(format!("You moved for {} full days!", (hours / 24.0).round()));
    }

    if summary.total_activities > 365 {
        facts.push("You did more activities than days in a year!".to_string());
    }

    if summary.total_elevation > EVEREST_HEIGHT_M {
        facts.push(format!(
            "You climbed {:.1} Mount Everests!",
            summary.total_elevation / EVEREST_HEIGHT_M
        ));
    }

    facts
}

impl StatisticsReport {
    /// Compute every statistic for `year` from that year's activities.
    pub fn build(year: i32, activities: &[Activity]) -> Self {
        let core_summary = core_summary(activities);
        let fun_facts = fun_facts(&core_summary);

        Self {
            year,
            activity_breakdown: activity_type_breakdown(activities),
            monthly_stats: monthly_stats(activities, year),
            best_performances: best_performances(activities),
            weekly_insights: weekly_insights(activities),
            time_of_day: time_of_day(activities),
            location_insights: location_insights(activities),
            core_summary,
            fun_facts,
        }
    }
}
