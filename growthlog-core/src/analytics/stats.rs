//! Summary statistics over journal entries, goals, habits and achievements.
//!
//! The functions here are pure; [`StatsSnapshot::collect`] loads everything
//! they need from the store in one go.

use super::{local_date, local_day_bounds, mean, streak};
use crate::db::Database;
use crate::error::Result;
use crate::types::{Achievement, Goal, GoalStatus, JournalEntry, JournalFilter};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Journal summary
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JournalStats {
    pub total_entries: i64,
    /// Distinct calendar days with at least one entry
    pub days_journaled: i64,
    /// Mean over entries that have a mood
    pub avg_mood: Option<f64>,
    /// Mean over entries that have an energy level
    pub avg_energy: Option<f64>,
    pub current_streak: u32,
}

/// One day of the mood trend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoodTrendPoint {
    pub date: NaiveDate,
    pub avg_mood: f64,
    /// Mean over that day's entries with an energy level
    pub avg_energy: Option<f64>,
    /// Entries with a mood on that day
    pub entry_count: usize,
}

/// Goal summary
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GoalStats {
    pub total: i64,
    pub active: i64,
    pub completed: i64,
    pub abandoned: i64,
    /// Mean progress over active goals only
    pub avg_progress: Option<f64>,
}

/// How many habits were done today
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HabitTodayStats {
    pub total_habits: i64,
    pub completed_today: i64,
    /// Percentage, 0 when there are no habits
    pub completion_rate: f64,
}

/// Achievement catalog summary
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AchievementSummary {
    pub total: i64,
    pub unlocked_count: i64,
    pub locked_count: i64,
    /// Sum of points over unlocked achievements
    pub total_points: i64,
    /// Percentage, 0 for an empty catalog
    pub completion_rate: f64,
}

pub fn journal_stats(entries: &[JournalEntry], today: NaiveDate) -> JournalStats {
    let days = streak::distinct_days(entries.iter().map(|e| e.created_at));

    JournalStats {
        total_entries: entries.len() as i64,
        days_journaled: days.len() as i64,
        avg_mood: mean(entries.iter().filter_map(|e| e.mood).map(f64::from)),
        avg_energy: mean(entries.iter().filter_map(|e| e.energy_level).map(f64::from)),
        current_streak: streak::current_streak(&days, today),
    }
}

/// Daily mood averages over the `days` calendar days ending today, oldest first.
///
/// Entries without a mood are ignored; days with no such entries are absent.
pub fn mood_trend(entries: &[JournalEntry], days: u32, today: NaiveDate) -> Vec<MoodTrendPoint> {
    let first_day = today - Duration::days(i64::from(days.max(1)) - 1);

    let mut by_day: BTreeMap<NaiveDate, Vec<&JournalEntry>> = BTreeMap::new();
    for entry in entries.iter().filter(|e| e.mood.is_some()) {
        let day = local_date(entry.created_at);
        if day >= first_day && day <= today {
            by_day.entry(day).or_default().push(entry);
        }
    }

    by_day
        .into_iter()
        .filter_map(|(date, day_entries)| {
            let avg_mood = mean(day_entries.iter().filter_map(|e| e.mood).map(f64::from))?;
            Some(MoodTrendPoint {
                date,
                avg_mood,
                avg_energy: mean(
                    day_entries
                        .iter()
                        .filter_map(|e| e.energy_level)
                        .map(f64::from),
                ),
                entry_count: day_entries.len(),
            })
        })
        .collect()
}

pub fn goal_stats(goals: &[Goal]) -> GoalStats {
    let count = |status: GoalStatus| goals.iter().filter(|g| g.status == status).count() as i64;

    GoalStats {
        total: goals.len() as i64,
        active: count(GoalStatus::Active),
        completed: count(GoalStatus::Completed),
        abandoned: count(GoalStatus::Abandoned),
        avg_progress: mean(
            goals
                .iter()
                .filter(|g| g.status == GoalStatus::Active)
                .map(|g| f64::from(g.progress)),
        ),
    }
}

pub fn habit_today_stats(total_habits: usize, completed_today: usize) -> HabitTodayStats {
    let completion_rate = if total_habits == 0 {
        0.0
    } else {
        completed_today as f64 / total_habits as f64 * 100.0
    };

    HabitTodayStats {
        total_habits: total_habits as i64,
        completed_today: completed_today as i64,
        completion_rate,
    }
}

/// Active goals past their target date and not yet at 100%.
///
/// Sorted by target date, then id.
pub fn overdue_goals(goals: &[Goal], today: NaiveDate) -> Vec<Goal> {
    let mut overdue: Vec<Goal> = goals
        .iter()
        .filter(|g| {
            g.status == GoalStatus::Active
                && g.progress < 100
                && g.target_date.is_some_and(|d| d < today)
        })
        .cloned()
        .collect();
    overdue.sort_by_key(|g| (g.target_date, g.id));
    overdue
}

pub fn achievement_summary(achievements: &[Achievement]) -> AchievementSummary {
    let total = achievements.len() as i64;
    let unlocked: Vec<&Achievement> = achievements.iter().filter(|a| a.is_unlocked()).collect();
    let unlocked_count = unlocked.len() as i64;

    AchievementSummary {
        total,
        unlocked_count,
        locked_count: total - unlocked_count,
        total_points: unlocked.iter().map(|a| a.points).sum(),
        completion_rate: if total == 0 {
            0.0
        } else {
            unlocked_count as f64 / total as f64 * 100.0
        },
    }
}

/// Everything the insight rules and the `stats` view need, computed at once
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub today: NaiveDate,
    pub journal: JournalStats,
    pub mood_trend: Vec<MoodTrendPoint>,
    pub goals: GoalStats,
    pub habits_today: HabitTodayStats,
    pub overdue_goals: Vec<Goal>,
    /// Active goals below 30% progress
    pub low_progress_goals: Vec<Goal>,
}

/// Progress below which an active goal counts as needing attention
pub const LOW_PROGRESS_THRESHOLD: u8 = 30;

impl StatsSnapshot {
    pub fn collect(db: &Database, today: NaiveDate, trend_days: u32) -> Result<Self> {
        let entries = db.list_journal_entries(&JournalFilter::default())?;
        let goals = db.list_goals()?;
        let habits_today = habit_stats_for(db, today)?;

        Ok(Self::from_records(&entries, &goals, habits_today, today, trend_days))
    }

    pub fn from_records(
        entries: &[JournalEntry],
        goals: &[Goal],
        habits_today: HabitTodayStats,
        today: NaiveDate,
        trend_days: u32,
    ) -> Self {
        let low_progress_goals = goals
            .iter()
            .filter(|g| g.status == GoalStatus::Active && g.progress < LOW_PROGRESS_THRESHOLD)
            .cloned()
            .collect();

        Self {
            today,
            journal: journal_stats(entries, today),
            mood_trend: mood_trend(entries, trend_days, today),
            goals: goal_stats(goals),
            habits_today,
            overdue_goals: overdue_goals(goals, today),
            low_progress_goals,
        }
    }
}

/// Habit completion for a local calendar day
pub fn habit_stats_for(db: &Database, day: NaiveDate) -> Result<HabitTodayStats> {
    let total = db.list_habits()?.len();
    let (start, end) = local_day_bounds(day);
    let completed: HashSet<i64> = db.habits_completed_between(start, end)?.into_iter().collect();
    Ok(habit_today_stats(total, completed.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AchievementType;
    use crate::types::Requirement;
    use chrono::{DateTime, Local, TimeZone, Utc};

    fn at(day: NaiveDate, hour: u32) -> DateTime<Utc> {
        Local
            .from_local_datetime(&day.and_hms_opt(hour, 0, 0).unwrap())
            .earliest()
            .unwrap()
            .with_timezone(&Utc)
    }

    fn entry(
        id: i64,
        created_at: DateTime<Utc>,
        mood: Option<u8>,
        energy: Option<u8>,
    ) -> JournalEntry {
        JournalEntry {
            id,
            title: None,
            content: format!("entry {}", id),
            mood,
            energy_level: energy,
            tags: vec![],
            created_at,
            updated_at: created_at,
        }
    }

    fn goal(id: i64, status: GoalStatus, progress: u8, target: Option<NaiveDate>) -> Goal {
        Goal {
            id,
            title: format!("goal {}", id),
            description: None,
            category: None,
            target_date: target,
            status,
            progress,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[test]
    fn test_journal_stats() {
        let today = today();
        let entries = vec![
            entry(1, at(today, 9), Some(4), Some(3)),
            entry(2, at(today, 20), Some(2), None),
            entry(3, at(today - Duration::days(1), 9), None, Some(5)),
        ];
        let stats = journal_stats(&entries, today);
        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.days_journaled, 2);
        assert_eq!(stats.avg_mood, Some(3.0));
        assert_eq!(stats.avg_energy, Some(4.0));
        assert_eq!(stats.current_streak, 2);

        let empty = journal_stats(&[], today);
        assert_eq!(empty.avg_mood, None);
        assert_eq!(empty.current_streak, 0);
    }

    #[test]
    fn test_mood_trend_skips_unrated_and_empty_days() {
        let today = today();
        let entries = vec![
            entry(1, at(today, 9), Some(4), Some(2)),
            entry(2, at(today, 10), Some(2), None),
            // no mood: excluded even though energy is set
            entry(3, at(today - Duration::days(1), 9), None, Some(5)),
            entry(4, at(today - Duration::days(3), 9), Some(5), Some(5)),
            // outside the window
            entry(5, at(today - Duration::days(10), 9), Some(1), None),
        ];

        let trend = mood_trend(&entries, 7, today);
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].date, today - Duration::days(3));
        assert_eq!(trend[1].date, today);
        assert_eq!(trend[1].avg_mood, 3.0);
        assert_eq!(trend[1].avg_energy, Some(2.0));
        assert_eq!(trend[1].entry_count, 2);
    }

    #[test]
    fn test_goal_stats_average_over_active_only() {
        let goals = vec![
            goal(1, GoalStatus::Active, 20, None),
            goal(2, GoalStatus::Active, 60, None),
            goal(3, GoalStatus::Completed, 100, None),
            goal(4, GoalStatus::Abandoned, 5, None),
        ];
        let stats = goal_stats(&goals);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.active, 2);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.avg_progress, Some(40.0));

        let stats = goal_stats(&[goal(1, GoalStatus::Completed, 100, None)]);
        assert_eq!(stats.avg_progress, None);
    }

    #[test]
    fn test_habit_completion_rate() {
        assert_eq!(habit_today_stats(0, 0).completion_rate, 0.0);
        assert_eq!(habit_today_stats(4, 1).completion_rate, 25.0);
        assert_eq!(habit_today_stats(2, 2).completion_rate, 100.0);
    }

    #[test]
    fn test_overdue_goals_ordering() {
        let today = today();
        let yesterday = today - Duration::days(1);
        let last_week = today - Duration::days(7);
        let goals = vec![
            goal(5, GoalStatus::Active, 10, Some(yesterday)),
            goal(2, GoalStatus::Active, 10, Some(yesterday)),
            goal(3, GoalStatus::Active, 0, Some(last_week)),
            goal(4, GoalStatus::Active, 100, Some(last_week)),
            goal(6, GoalStatus::Completed, 50, Some(last_week)),
            goal(7, GoalStatus::Active, 0, Some(today)),
            goal(8, GoalStatus::Active, 0, None),
        ];
        let ids: Vec<i64> = overdue_goals(&goals, today).iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![3, 2, 5]);
    }

    #[test]
    fn test_achievement_summary() {
        let make = |id: i64, points: i64, unlocked: bool| Achievement {
            id,
            name: format!("a{}", id),
            description: String::new(),
            icon: String::new(),
            points,
            achievement_type: AchievementType::Milestone,
            requirement: Requirement {
                action: "journal_count".to_string(),
                target: 1,
            },
            progress: 0,
            target: 1,
            unlocked_at: unlocked.then(Utc::now),
        };
        let summary = achievement_summary(&[
            make(1, 10, true),
            make(2, 25, false),
            make(3, 50, true),
            make(4, 5, false),
        ]);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.unlocked_count, 2);
        assert_eq!(summary.locked_count, 2);
        assert_eq!(summary.total_points, 60);
        assert_eq!(summary.completion_rate, 50.0);

        assert_eq!(achievement_summary(&[]).completion_rate, 0.0);
    }

    #[test]
    fn test_habit_stats_for_counts_distinct_habits() {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        let a = db.insert_habit(&crate::types::NewHabit::new("Read")).unwrap();
        db.insert_habit(&crate::types::NewHabit::new("Walk")).unwrap();
        db.log_habit_completion(a.id, None).unwrap();
        db.log_habit_completion(a.id, None).unwrap();

        let stats = habit_stats_for(&db, Local::now().date_naive()).unwrap();
        assert_eq!(stats.total_habits, 2);
        assert_eq!(stats.completed_today, 1);
        assert_eq!(stats.completion_rate, 50.0);
    }
}
