//! Coaching insights.
//!
//! A fixed set of rules over a fresh [`StatsSnapshot`]. Each rule that fires
//! appends one insight; nothing is deduplicated against earlier runs.

use super::stats::StatsSnapshot;
use crate::db::Database;
use crate::error::Result;
use crate::types::{Insight, InsightType, NewInsight};
use chrono::{DateTime, NaiveDate, Utc};

/// Trend window the mood rules look at
pub const MOOD_TREND_DAYS: u32 = 7;
/// Trailing trend points averaged by the mood rules
const RECENT_MOOD_POINTS: usize = 3;

fn insight(
    insight_type: InsightType,
    title: impl Into<String>,
    message: impl Into<String>,
    priority: i32,
) -> NewInsight {
    NewInsight {
        insight_type,
        title: title.into(),
        message: message.into(),
        related_goal_id: None,
        related_pattern_id: None,
        priority,
    }
}

fn streak_rule(stats: &StatsSnapshot) -> Option<NewInsight> {
    let streak = stats.journal.current_streak;
    if streak >= 7 && streak % 7 == 0 {
        return Some(insight(
            InsightType::Celebration,
            format!("{}-Day Streak! 🎉", streak),
            format!(
                "Amazing! You've journaled for {} days straight. This consistency is building powerful self-awareness habits!",
                streak
            ),
            10,
        ));
    }
    if streak == 0 && stats.journal.total_entries > 5 {
        return Some(insight(
            InsightType::Encouragement,
            "Ready to restart your streak?",
            "You've journaled before and it was great! How about sharing what's on your mind today?",
            5,
        ));
    }
    None
}

fn mood_rule(stats: &StatsSnapshot) -> Option<NewInsight> {
    let trend = &stats.mood_trend;
    if trend.len() < RECENT_MOOD_POINTS {
        return None;
    }
    let recent = &trend[trend.len() - RECENT_MOOD_POINTS..];
    let avg = recent.iter().map(|p| p.avg_mood).sum::<f64>() / recent.len() as f64;

    if avg >= 4.0 {
        Some(insight(
            InsightType::Celebration,
            "You're on a positive roll! ✨",
            "Your mood has been consistently high lately. What's been working well for you? Consider writing about it to remember this winning formula!",
            8,
        ))
    } else if avg <= 2.5 {
        Some(insight(
            InsightType::Encouragement,
            "Tough week? We've got your back 💙",
            "I notice things have been challenging lately. Remember: writing about struggles often helps lighten the load. Want to explore what might help?",
            9,
        ))
    } else {
        None
    }
}

fn overdue_goal_rule(stats: &StatsSnapshot) -> Option<NewInsight> {
    let goal = stats.overdue_goals.first()?;
    Some(NewInsight {
        related_goal_id: Some(goal.id),
        ..insight(
            InsightType::Tip,
            "Goal needs attention 🎯",
            format!(
                "\"{}\" has passed its target date. No worries! Want to break it into smaller steps or adjust the timeline?",
                goal.title
            ),
            7,
        )
    })
}

fn low_progress_rule(stats: &StatsSnapshot) -> Option<NewInsight> {
    if stats.low_progress_goals.is_empty() {
        return None;
    }
    Some(insight(
        InsightType::Tip,
        "Let's talk about your goals 📝",
        "You have active goals that could use some attention. Writing about them in your journal often reveals the next small step forward!",
        6,
    ))
}

fn habit_rule(stats: &StatsSnapshot) -> Option<NewInsight> {
    let habits = &stats.habits_today;
    if habits.total_habits > 0 && habits.completion_rate >= 100.0 {
        return Some(insight(
            InsightType::Celebration,
            "Habit superstar! ⭐",
            "You completed all your habits today! This is exactly how lasting change happens - one day at a time.",
            9,
        ));
    }
    None
}

/// Every insight the rules produce for this snapshot, in rule order
pub fn evaluate_rules(stats: &StatsSnapshot) -> Vec<NewInsight> {
    let rules: [fn(&StatsSnapshot) -> Option<NewInsight>; 5] = [
        streak_rule,
        mood_rule,
        overdue_goal_rule,
        low_progress_rule,
        habit_rule,
    ];
    rules.iter().filter_map(|rule| rule(stats)).collect()
}

/// Compute fresh stats, run the rules and store every insight they produce
pub fn generate_insights(
    db: &Database,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<Vec<Insight>> {
    let stats = StatsSnapshot::collect(db, today, MOOD_TREND_DAYS)?;

    let mut created = Vec::new();
    for new in evaluate_rules(&stats) {
        let insight = db.insert_insight(&new, now)?;
        tracing::info!(
            insight_id = insight.id,
            insight_type = %insight.insight_type,
            priority = insight.priority,
            "Insight generated"
        );
        created.push(insight);
    }

    tracing::debug!(count = created.len(), "Insight generation finished");
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::stats::{habit_today_stats, JournalStats, MoodTrendPoint};
    use crate::types::{Goal, GoalStatus};
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn snapshot() -> StatsSnapshot {
        StatsSnapshot::from_records(&[], &[], habit_today_stats(0, 0), today(), MOOD_TREND_DAYS)
    }

    fn trend(moods: &[f64]) -> Vec<MoodTrendPoint> {
        moods
            .iter()
            .enumerate()
            .map(|(i, m)| MoodTrendPoint {
                date: today() - Duration::days((moods.len() - 1 - i) as i64),
                avg_mood: *m,
                avg_energy: None,
                entry_count: 1,
            })
            .collect()
    }

    fn titles(stats: &StatsSnapshot) -> Vec<String> {
        evaluate_rules(stats).into_iter().map(|i| i.title).collect()
    }

    #[test]
    fn test_no_data_no_insights() {
        assert!(evaluate_rules(&snapshot()).is_empty());
    }

    #[test]
    fn test_streak_multiples_of_seven() {
        let mut stats = snapshot();
        stats.journal = JournalStats {
            total_entries: 14,
            current_streak: 14,
            ..Default::default()
        };
        let insights = evaluate_rules(&stats);
        assert_eq!(insights[0].title, "14-Day Streak! 🎉");
        assert_eq!(insights[0].priority, 10);
        assert_eq!(insights[0].insight_type, InsightType::Celebration);

        stats.journal.current_streak = 8;
        assert!(evaluate_rules(&stats).is_empty());
    }

    #[test]
    fn test_restart_needs_history() {
        let mut stats = snapshot();
        stats.journal.total_entries = 5;
        assert!(evaluate_rules(&stats).is_empty());

        stats.journal.total_entries = 6;
        let insights = evaluate_rules(&stats);
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].insight_type, InsightType::Encouragement);
        assert_eq!(insights[0].priority, 5);
    }

    #[test]
    fn test_mood_rules_use_last_three_points() {
        let mut stats = snapshot();
        stats.mood_trend = trend(&[1.0, 1.0, 4.0, 4.0, 5.0]);
        assert_eq!(titles(&stats), vec!["You're on a positive roll! ✨"]);

        stats.mood_trend = trend(&[5.0, 2.0, 3.0, 2.5]);
        let insights = evaluate_rules(&stats);
        assert_eq!(insights[0].title, "Tough week? We've got your back 💙");
        assert_eq!(insights[0].priority, 9);

        stats.mood_trend = trend(&[5.0, 5.0]);
        assert!(evaluate_rules(&stats).is_empty(), "needs three points");

        stats.mood_trend = trend(&[3.0, 3.0, 3.0]);
        assert!(evaluate_rules(&stats).is_empty());
    }

    #[test]
    fn test_goal_rules() {
        let goal = |id: i64, progress: u8, target: Option<NaiveDate>| Goal {
            id,
            title: format!("Goal {}", id),
            description: None,
            category: None,
            target_date: target,
            status: GoalStatus::Active,
            progress,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let goals = vec![
            goal(1, 50, Some(today() - Duration::days(1))),
            goal(2, 50, Some(today() - Duration::days(3))),
            goal(3, 10, None),
        ];
        let habits = habit_today_stats(0, 0);
        let stats = StatsSnapshot::from_records(&[], &goals, habits, today(), MOOD_TREND_DAYS);

        let insights = evaluate_rules(&stats);
        assert_eq!(insights.len(), 2);
        assert_eq!(insights[0].title, "Goal needs attention 🎯");
        assert_eq!(insights[0].related_goal_id, Some(2), "earliest target first");
        assert!(insights[0].message.starts_with("\"Goal 2\" has passed"));
        assert_eq!(insights[1].title, "Let's talk about your goals 📝");
        assert_eq!(insights[1].priority, 6);
    }

    #[test]
    fn test_all_habits_done() {
        let mut stats = snapshot();
        stats.habits_today = habit_today_stats(3, 3);
        assert_eq!(titles(&stats), vec!["Habit superstar! ⭐"]);

        stats.habits_today = habit_today_stats(3, 2);
        assert!(evaluate_rules(&stats).is_empty());
    }

    #[test]
    fn test_generate_insights_persists() {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        let habit = db.insert_habit(&crate::types::NewHabit::new("Floss")).unwrap();
        db.log_habit_completion(habit.id, None).unwrap();

        let today = crate::analytics::local_date(Utc::now());
        let created = generate_insights(&db, today, Utc::now()).unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].title, "Habit superstar! ⭐");
        assert!(!created[0].is_read);

        // No dedup: running again appends another one
        generate_insights(&db, today, Utc::now()).unwrap();
        assert_eq!(db.list_insights(false).unwrap().len(), 2);
    }
}
