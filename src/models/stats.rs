// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Statistics views computed on demand from a user's activities.
//!
//! Nothing here is persisted; every request recomputes these from the
//! activities of the requested year.

use serde::{Deserialize, Serialize};

use crate::models::ActivitySummary;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CoreSummary {
    pub total_activities: u32,
    /// Meters
    pub total_distance: f64,
    /// Moving time in seconds
    pub total_time: u64,
    /// Meters
    pub total_elevation: f64,
    pub active_days: u32,
    pub average_per_week: WeeklyAverages,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WeeklyAverages {
    pub activities: f64,
    pub distance: f64,
    pub time: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityTypeBreakdown {
    #[serde(rename = "type")]
    pub activity_type: String,
    pub count: u32,
    pub distance: f64,
    /// Share of all activities, 0-100
    pub percentage: f64,
    pub icon: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyStats {
    /// 1 = January
    pub month: u32,
    pub month_name: String,
    pub activities: u32,
    pub distance: f64,
    pub time: u64,
    pub elevation: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BestPerformances {
    pub longest_activity: Option<ActivitySummary>,
    pub longest_run: Option<ActivitySummary>,
    pub longest_ride: Option<ActivitySummary>,
    pub highest_elevation: Option<ActivitySummary>,
    pub fastest_pace: Option<ActivitySummary>,
    pub most_active_month: Option<MonthCount>,
    pub most_active_day: Option<DayCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthCount {
    /// 1 = January
    pub month: u32,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayCount {
    /// YYYY-MM-DD
    pub date: String,
    pub count: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WeeklyInsights {
    pub average_per_week: f64,
    pub longest_streak: u32,
    pub most_common_day: Option<WeekdayCount>,
    pub most_common_time: Option<PeriodCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeekdayCount {
    pub day: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeriodCount {
    pub period: TimeOfDay,
    pub count: u32,
}

/// Coarse part of the day an activity started in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    /// All buckets in reporting order.
    pub const ALL: [TimeOfDay; 4] = [
        TimeOfDay::Morning,
        TimeOfDay::Afternoon,
        TimeOfDay::Evening,
        TimeOfDay::Night,
    ];

    /// Bucket for a local start hour (0-23).
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Afternoon,
            17..=20 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeOfDayStats {
    pub morning: u32,
    pub afternoon: u32,
    pub evening: u32,
    pub night: u32,
}

impl TimeOfDayStats {
    pub fn count(&self, period: TimeOfDay) -> u32 {
        match period {
            TimeOfDay::Morning => self.morning,
            TimeOfDay::Afternoon => self.afternoon,
            TimeOfDay::Evening => self.evening,
            TimeOfDay::Night => self.night,
        }
    }

    pub fn record(&mut self, period: TimeOfDay) {
        match period {
            TimeOfDay::Morning => self.morning += 1,
            TimeOfDay::Afternoon => self.afternoon += 1,
            TimeOfDay::Evening => self.evening += 1,
            TimeOfDay::Night => self.night += 1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LocationInsights {
    pub top_cities: Vec<CityCount>,
    pub top_countries: Vec<CountryCount>,
    pub total_locations: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CityCount {
    pub city: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CountryCount {
    pub country: String,
    pub count: u32,
}

/// Everything the dashboard shows for one year.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatisticsReport {
    pub year: i32,
    pub core_summary: CoreSummary,
    pub activity_breakdown: Vec<ActivityTypeBreakdown>,
    pub monthly_stats: Vec<MonthlyStats>,
    pub best_performances: BestPerformances,
    pub weekly_insights: WeeklyInsights,
    pub time_of_day: TimeOfDayStats,
    pub location_insights: LocationInsights,
    pub fun_facts: Vec<String>,
}
