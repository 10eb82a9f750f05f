//! Achievement catalog and evaluator.
//!
//! The catalog is seeded into the store once (insert-if-absent by name).
//! [`check_and_unlock`] then walks the locked achievements, refreshes their
//! progress from an [`AchievementStats`] snapshot and unlocks the ones that
//! reached their target, awarding points to the user.

use super::{local_hour, stats, streak};
use crate::db::Database;
use crate::error::{Error, Result};
use crate::types::{Achievement, AchievementType, GoalStatus, JournalFilter, UserSettings};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Journal entries written before this local hour count as early
pub const EARLY_HOUR: u32 = 8;

/// What an achievement's requirement measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementAction {
    FirstJournal,
    JournalCount,
    JournalStreak,
    FirstGoal,
    CompleteGoal,
    FirstHabit,
    PerfectDay,
    PerfectWeek,
    FirstInsights,
    PatternsFound,
    MoodTracking,
    EarlyJournal,
}

impl RequirementAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequirementAction::FirstJournal => "first_journal",
            RequirementAction::JournalCount => "journal_count",
            RequirementAction::JournalStreak => "journal_streak",
            RequirementAction::FirstGoal => "first_goal",
            RequirementAction::CompleteGoal => "complete_goal",
            RequirementAction::FirstHabit => "first_habit",
            RequirementAction::PerfectDay => "perfect_day",
            RequirementAction::PerfectWeek => "perfect_week",
            RequirementAction::FirstInsights => "first_insights",
            RequirementAction::PatternsFound => "patterns_found",
            RequirementAction::MoodTracking => "mood_tracking",
            RequirementAction::EarlyJournal => "early_journal",
        }
    }

    /// Current progress towards this action's target.
    ///
    /// `None` for actions the evaluator does not measure; those stay at 0.
    pub fn progress(&self, stats: &AchievementStats) -> Option<i64> {
        match self {
            RequirementAction::FirstJournal | RequirementAction::JournalCount => {
                Some(stats.total_entries)
            }
            RequirementAction::JournalStreak => Some(i64::from(stats.journal_streak)),
            RequirementAction::FirstGoal => Some(stats.total_goals),
            RequirementAction::CompleteGoal => Some(stats.completed_goals),
            RequirementAction::FirstHabit => Some(stats.total_habits),
            RequirementAction::PerfectDay => Some(i64::from(stats.perfect_day)),
            RequirementAction::MoodTracking => Some(stats.mood_entries),
            RequirementAction::EarlyJournal => Some(stats.early_entries),
            RequirementAction::PerfectWeek
            | RequirementAction::FirstInsights
            | RequirementAction::PatternsFound => None,
        }
    }
}

impl std::fmt::Display for RequirementAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RequirementAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "first_journal" => Ok(RequirementAction::FirstJournal),
            "journal_count" => Ok(RequirementAction::JournalCount),
            "journal_streak" => Ok(RequirementAction::JournalStreak),
            "first_goal" => Ok(RequirementAction::FirstGoal),
            "complete_goal" => Ok(RequirementAction::CompleteGoal),
            "first_habit" => Ok(RequirementAction::FirstHabit),
            "perfect_day" => Ok(RequirementAction::PerfectDay),
            "perfect_week" => Ok(RequirementAction::PerfectWeek),
            "first_insights" => Ok(RequirementAction::FirstInsights),
            "patterns_found" => Ok(RequirementAction::PatternsFound),
            "mood_tracking" => Ok(RequirementAction::MoodTracking),
            "early_journal" => Ok(RequirementAction::EarlyJournal),
            _ => Err(Error::Unsupported(format!("achievement action: {}", s))),
        }
    }
}

/// A catalog entry as seeded into the store
#[derive(Debug, Clone, Copy)]
pub struct AchievementDef {
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub points: i64,
    pub achievement_type: AchievementType,
    pub action: RequirementAction,
    pub target: i64,
}

const fn def(
    name: &'static str,
    description: &'static str,
    icon: &'static str,
    points: i64,
    achievement_type: AchievementType,
    action: RequirementAction,
    target: i64,
) -> AchievementDef {
    AchievementDef {
        name,
        description,
        icon,
        points,
        achievement_type,
        action,
        target,
    }
}

use AchievementType::{Completion, Consistency, Exploration, Milestone, Streak};
use RequirementAction as A;

/// The built-in achievement catalog
#[rustfmt::skip]
pub const CATALOG: &[AchievementDef] = &[
    def("First Steps", "Write your first journal entry", "✍️", 10, Milestone, A::FirstJournal, 1),
    def("Getting Started", "Write 5 journal entries", "📝", 25, Milestone, A::JournalCount, 5),
    def("Journal Enthusiast", "Write 25 journal entries", "📚", 100, Milestone, A::JournalCount, 25),
    def("Prolific Writer", "Write 100 journal entries", "🏆", 500, Milestone, A::JournalCount, 100),
    def("Week Warrior", "Journal for 7 days in a row", "🔥", 50, Streak, A::JournalStreak, 7),
    def("Monthly Maestro", "Journal for 30 days in a row", "⭐", 200, Streak, A::JournalStreak, 30),
    def("Centurion", "Journal for 100 days in a row", "👑", 1000, Streak, A::JournalStreak, 100),
    def("Goal Getter", "Create your first goal", "🎯", 10, Milestone, A::FirstGoal, 1),
    def("Goal Crusher", "Complete your first goal", "💪", 50, Completion, A::CompleteGoal, 1),
    def("Overachiever", "Complete 10 goals", "🌟", 300, Completion, A::CompleteGoal, 10),
    def("Habit Builder", "Create your first habit", "🌱", 10, Milestone, A::FirstHabit, 1),
    def("Perfect Day", "Complete all habits in one day", "✨", 50, Completion, A::PerfectDay, 1),
    def("Perfect Week", "Complete all habits for 7 days straight", "🎊", 200, Streak, A::PerfectWeek, 7),
    def("Self-Aware", "Generate your first insights", "🧠", 25, Exploration, A::FirstInsights, 1),
    def("Pattern Seeker", "Discover 5 behavioral patterns", "🔍", 100, Exploration, A::PatternsFound, 5),
    def("Mood Master", "Track your mood for 30 entries", "😊", 75, Consistency, A::MoodTracking, 30),
    def("Early Bird", "Journal before 8 AM five times", "🌅", 50, Consistency, A::EarlyJournal, 5),
];

/// Insert catalog entries that are not in the store yet
pub fn seed_catalog(db: &Database) -> Result<usize> {
    let inserted = db.seed_achievements(CATALOG)?;
    if inserted > 0 {
        tracing::info!(inserted, "Seeded achievement catalog");
    }
    Ok(inserted)
}

/// Counters the requirement actions are measured against
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AchievementStats {
    pub total_entries: i64,
    pub journal_streak: u32,
    pub total_goals: i64,
    pub completed_goals: i64,
    pub total_habits: i64,
    /// Every habit was completed today (and there is at least one)
    pub perfect_day: bool,
    pub mood_entries: i64,
    /// Entries written before [`EARLY_HOUR`] local time
    pub early_entries: i64,
}

impl AchievementStats {
    pub fn collect(db: &Database, today: NaiveDate) -> Result<Self> {
        let entries = db.list_journal_entries(&JournalFilter::default())?;
        let goals = db.list_goals()?;
        let habits = stats::habit_stats_for(db, today)?;

        let days = streak::distinct_days(entries.iter().map(|e| e.created_at));

        Ok(Self {
            total_entries: entries.len() as i64,
            journal_streak: streak::current_streak(&days, today),
            total_goals: goals.len() as i64,
            completed_goals: goals
                .iter()
                .filter(|g| g.status == GoalStatus::Completed)
                .count() as i64,
            total_habits: habits.total_habits,
            perfect_day: habits.total_habits > 0 && habits.completion_rate >= 100.0,
            mood_entries: entries.iter().filter(|e| e.mood.is_some()).count() as i64,
            early_entries: entries
                .iter()
                .filter(|e| local_hour(e.created_at) < EARLY_HOUR)
                .count() as i64,
        })
    }
}

/// Progress an achievement has made, `None` for unmeasured or unknown actions
fn progress_for(achievement: &Achievement, stats: &AchievementStats) -> Option<i64> {
    match achievement.requirement.action.parse::<RequirementAction>() {
        Ok(action) => action.progress(stats),
        Err(e) => {
            tracing::debug!(achievement = %achievement.name, error = %e, "Skipping requirement");
            None
        }
    }
}

/// Refresh progress on every locked achievement and unlock the ones that
/// reached their target.
///
/// Returns the achievements unlocked by this call and `settings` with the
/// awarded points applied. The updated settings are persisted when anything
/// was unlocked.
pub fn check_and_unlock(
    db: &Database,
    settings: &UserSettings,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<(Vec<Achievement>, UserSettings)> {
    let stats = AchievementStats::collect(db, today)?;
    let mut settings = settings.clone();
    let mut unlocked = Vec::new();

    for mut achievement in db.list_locked_achievements()? {
        let measured = progress_for(&achievement, &stats);
        let progress = measured.unwrap_or(0);
        db.update_achievement_progress(achievement.id, progress)?;
        achievement.progress = progress;

        if measured.map_or(true, |p| p < achievement.requirement.target) {
            continue;
        }
        // Lost a race with another evaluator
        if !db.unlock_achievement(achievement.id, now)? {
            continue;
        }

        settings = settings.with_award(achievement.points);
        achievement.unlocked_at = Some(now);
        tracing::info!(
            achievement = %achievement.name,
            points = achievement.points,
            total_points = settings.points,
            level = settings.level,
            "Achievement unlocked"
        );
        unlocked.push(achievement);
    }

    if !unlocked.is_empty() {
        settings.updated_at = now;
        db.save_user_settings(&settings)?;
    }

    Ok((unlocked, settings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NewGoal, NewHabit, NewJournalEntry};
    use std::collections::HashSet;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        seed_catalog(&db).unwrap();
        db
    }

    fn today() -> NaiveDate {
        crate::analytics::local_date(Utc::now())
    }

    #[test]
    fn test_catalog_names_unique_and_actions_roundtrip() {
        assert_eq!(CATALOG.len(), 17);
        let names: HashSet<&str> = CATALOG.iter().map(|d| d.name).collect();
        assert_eq!(names.len(), CATALOG.len());
        for def in CATALOG {
            assert_eq!(def.action.as_str().parse::<RequirementAction>().unwrap(), def.action);
        }
        assert!(matches!(
            "write_poem".parse::<RequirementAction>(),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn test_seed_is_idempotent() {
        let db = test_db();
        assert_eq!(seed_catalog(&db).unwrap(), 0);
        assert_eq!(db.list_achievements().unwrap().len(), 17);
    }

    #[test]
    fn test_unmeasured_actions_report_none() {
        let stats = AchievementStats {
            total_entries: 50,
            ..Default::default()
        };
        assert_eq!(RequirementAction::PerfectWeek.progress(&stats), None);
        assert_eq!(RequirementAction::PatternsFound.progress(&stats), None);
        assert_eq!(RequirementAction::JournalCount.progress(&stats), Some(50));
        assert_eq!(RequirementAction::PerfectDay.progress(&stats), Some(0));
    }

    #[test]
    fn test_first_entry_unlocks_first_steps() {
        let db = test_db();
        db.insert_journal_entry(&NewJournalEntry::new("Day one")).unwrap();

        let settings = db.get_user_settings().unwrap();
        let (unlocked, settings) = check_and_unlock(&db, &settings, today(), Utc::now()).unwrap();

        let names: Vec<&str> = unlocked.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["First Steps"]);
        assert_eq!(settings.points, 10);
        assert_eq!(settings.level, 1);
        assert_eq!(db.get_user_settings().unwrap().points, 10, "settings persisted");

        let getting_started = db
            .list_achievements()
            .unwrap()
            .into_iter()
            .find(|a| a.name == "Getting Started")
            .unwrap();
        assert_eq!(getting_started.progress, 1);
        assert!(!getting_started.is_unlocked());
    }

    #[test]
    fn test_second_check_unlocks_nothing() {
        let db = test_db();
        db.insert_journal_entry(&NewJournalEntry::new("Hello")).unwrap();
        db.insert_goal(&NewGoal::new("Run")).unwrap();
        let habit = db.insert_habit(&NewHabit::new("Walk")).unwrap();
        db.log_habit_completion(habit.id, None).unwrap();

        let settings = db.get_user_settings().unwrap();
        let (first, settings) = check_and_unlock(&db, &settings, today(), Utc::now()).unwrap();
        let names: HashSet<&str> = first.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(
            names,
            HashSet::from(["First Steps", "Goal Getter", "Habit Builder", "Perfect Day"])
        );
        assert_eq!(settings.points, 80);

        let (second, again) = check_and_unlock(&db, &settings, today(), Utc::now()).unwrap();
        assert!(second.is_empty());
        assert_eq!(again.points, 80);
        assert_eq!(db.get_user_settings().unwrap().points, 80);
    }

    #[test]
    fn test_unknown_action_never_unlocks() {
        let db = test_db();
        {
            let conn = db.connection();
            conn.execute(
                r#"INSERT INTO achievements (name, description, icon, points, achievement_type, requirement_data, target)
                   VALUES ('Mystery', 'd', '?', 5, 'exploration', '{"action":"write_poem","target":0}', 0)"#,
                [],
            )
            .unwrap();
        }

        // progress 0 meets a target of 0, but only measured actions may unlock
        let settings = db.get_user_settings().unwrap();
        let (unlocked, _) = check_and_unlock(&db, &settings, today(), Utc::now()).unwrap();
        assert!(unlocked.iter().all(|a| a.name != "Mystery"));
    }

    #[test]
    fn test_level_up_uses_post_award_points() {
        let db = test_db();
        db.insert_journal_entry(&NewJournalEntry::new("Hi")).unwrap();
        let settings = UserSettings {
            points: 995,
            level: 1,
            ..db.get_user_settings().unwrap()
        };
        let (_, settings) = check_and_unlock(&db, &settings, today(), Utc::now()).unwrap();
        assert_eq!(settings.points, 1005);
        assert_eq!(settings.level, 2);
    }
}
