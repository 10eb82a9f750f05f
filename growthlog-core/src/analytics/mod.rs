//! Analytics engine for growthlog
//!
//! Derives statistics, patterns, insights and achievements from the records
//! held in the [`Database`](crate::Database):
//! - [`streak`]: consecutive-day streaks
//! - [`stats`]: per-entity summaries and the daily mood trend
//! - [`patterns`]: mood/time, mood/energy and recurring-theme detectors
//! - [`insights`]: fixed coaching rules over fresh stats
//! - [`achievements`]: the achievement catalog and its evaluator
//!
//! Every calculation is a pure function over loaded records plus a `today`
//! or `now` argument. The `*_for` / `analyze_*` / `generate_*` entry points
//! load from the store, call those functions and write results back.

pub mod achievements;
pub mod insights;
pub mod patterns;
pub mod stats;
pub mod streak;
pub mod themes;

pub use achievements::{check_and_unlock, seed_catalog, AchievementStats, RequirementAction};
pub use insights::generate_insights;
pub use patterns::analyze_patterns;
pub use stats::{
    AchievementSummary, GoalStats, HabitTodayStats, JournalStats, MoodTrendPoint, StatsSnapshot,
};

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};

/// Calendar day of a timestamp in the local time zone
pub fn local_date(ts: DateTime<Utc>) -> NaiveDate {
    ts.with_timezone(&Local).date_naive()
}

/// Hour of day (0-23) of a timestamp in the local time zone
pub fn local_hour(ts: DateTime<Utc>) -> u32 {
    ts.with_timezone(&Local).hour()
}

/// UTC bounds `[start, end)` of a local calendar day
pub fn local_day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let to_utc = |d: NaiveDate| {
        let midnight = d.and_time(NaiveTime::MIN);
        midnight
            .and_local_timezone(Local)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
    };
    let next = day.succ_opt().unwrap_or(day);
    (to_utc(day), to_utc(next))
}

/// Arithmetic mean, `None` for an empty input
pub(crate) fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(Vec::new()), None);
        assert_eq!(mean([1.0, 2.0, 3.0]), Some(2.0));
    }

    #[test]
    fn test_local_day_bounds_cover_the_day() {
        let noon = Local.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let (start, end) = local_day_bounds(noon.date_naive());
        let noon_utc = noon.with_timezone(&Utc);
        assert!(start <= noon_utc && noon_utc < end);
        assert_eq!(local_date(start), noon.date_naive());
        assert_eq!(local_hour(noon_utc), 12);
    }
}
