//! Consecutive-day streaks.
//!
//! Used for both the journaling streak and per-habit streaks.

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Distinct local calendar days of `timestamps`, most recent first.
pub fn distinct_days(timestamps: impl IntoIterator<Item = DateTime<Utc>>) -> Vec<NaiveDate> {
    let mut days: Vec<NaiveDate> = timestamps.into_iter().map(super::local_date).collect();
    days.sort_unstable_by(|a, b| b.cmp(a));
    days.dedup();
    days
}

/// Number of consecutive days ending today that appear in `dates`.
///
/// `dates` may be in any order and contain duplicates. Returns 0 when today
/// itself is missing, even if yesterday was active.
pub fn current_streak(dates: &[NaiveDate], today: NaiveDate) -> u32 {
    let mut days = dates.to_vec();
    days.sort_unstable_by(|a, b| b.cmp(a));
    days.dedup();

    let mut streak = 0u32;
    for (i, day) in days.iter().enumerate() {
        if *day == today - Duration::days(i as i64) {
            streak += 1;
        } else {
            break;
        }
    }
    streak
}

/// Longest run of consecutive days anywhere in `dates`.
pub fn longest_streak(dates: &[NaiveDate]) -> u32 {
    let mut days = dates.to_vec();
    days.sort_unstable();
    days.dedup();

    let mut longest = 0u32;
    let mut run = 0u32;
    let mut prev: Option<NaiveDate> = None;

    for day in days {
        run = match prev {
            Some(p) if p.succ_opt() == Some(day) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(day);
    }
    longest
}
