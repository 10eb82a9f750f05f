//! Text and JSON rendering for CLI results.

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use growthlog_core::analytics::stats::{AchievementSummary, StatsSnapshot};
use growthlog_core::{
    Achievement, Goal, Habit, HabitLog, Insight, JournalEntry, Pattern, UserSettings,
};
use serde::Serialize;

use crate::OutputFormat;

#[derive(Serialize)]
struct CheckOutput<'a> {
    unlocked: &'a [Achievement],
    points: i64,
    level: i64,
}

#[derive(Serialize)]
struct SummaryOutput<'a> {
    #[serde(flatten)]
    summary: &'a AchievementSummary,
    points: i64,
    level: i64,
}

pub struct Printer {
    format: OutputFormat,
}

impl Printer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    fn json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    pub fn done(&self, message: &str) -> Result<()> {
        if self.is_json() {
            return self.json(&serde_json::json!({ "ok": true, "message": message }));
        }
        println!("{}", message);
        Ok(())
    }

    pub fn journal_entry(&self, entry: &JournalEntry) -> Result<()> {
        if self.is_json() {
            return self.json(entry);
        }
        print_entry(entry);
        Ok(())
    }

    pub fn journal_entries(&self, entries: &[JournalEntry]) -> Result<()> {
        if self.is_json() {
            return self.json(entries);
        }
        if entries.is_empty() {
            println!("No journal entries found.");
            return Ok(());
        }
        for entry in entries {
            print_entry(entry);
            println!();
        }
        Ok(())
    }

    pub fn tags(&self, tags: &[String]) -> Result<()> {
        if self.is_json() {
            return self.json(tags);
        }
        for tag in tags {
            println!("{}", tag);
        }
        Ok(())
    }

    pub fn goals(&self, goals: &[Goal]) -> Result<()> {
        if self.is_json() {
            return self.json(goals);
        }
        if goals.is_empty() {
            println!("No goals found.");
        }
        for goal in goals {
            let due = goal
                .target_date
                .map(|d| format!("  (due {})", d))
                .unwrap_or_default();
            println!(
                "#{} [{}] {} {:>3}%{}",
                goal.id, goal.status, goal.title, goal.progress, due
            );
        }
        Ok(())
    }

    pub fn habits(&self, habits: &[Habit]) -> Result<()> {
        if self.is_json() {
            return self.json(habits);
        }
        if habits.is_empty() {
            println!("No habits found.");
        }
        for habit in habits {
            println!(
                "#{} {} ({}) streak {}, best {}, total {}",
                habit.id,
                habit.name,
                habit.frequency,
                habit.streak_count,
                habit.best_streak,
                habit.total_completions
            );
        }
        Ok(())
    }

    pub fn habit_logs(&self, logs: &[HabitLog]) -> Result<()> {
        if self.is_json() {
            return self.json(logs);
        }
        if logs.is_empty() {
            println!("No completions logged.");
        }
        for log in logs {
            match &log.note {
                Some(note) => println!("{}  {}", local_time(log.completed_at), note),
                None => println!("{}", local_time(log.completed_at)),
            }
        }
        Ok(())
    }

    pub fn stats(&self, stats: &StatsSnapshot) -> Result<()> {
        if self.is_json() {
            return self.json(stats);
        }

        let journal = &stats.journal;
        println!("Journal");
        println!("  Entries:        {}", journal.total_entries);
        println!("  Days journaled: {}", journal.days_journaled);
        println!("  Current streak: {}", journal.current_streak);
        println!("  Average mood:   {}", format_avg(journal.avg_mood));
        println!("  Average energy: {}", format_avg(journal.avg_energy));

        if !stats.mood_trend.is_empty() {
            println!("\nMood trend");
            for point in &stats.mood_trend {
                println!(
                    "  {}  mood {:.2}  energy {}  ({} entries)",
                    point.date,
                    point.avg_mood,
                    format_avg(point.avg_energy),
                    point.entry_count
                );
            }
        }

        let goals = &stats.goals;
        println!("\nGoals");
        println!(
            "  {} total, {} active, {} completed, {} abandoned",
            goals.total, goals.active, goals.completed, goals.abandoned
        );
        println!("  Average active progress: {}", format_avg(goals.avg_progress));
        for goal in &stats.overdue_goals {
            println!("  Overdue: #{} {}", goal.id, goal.title);
        }

        let habits = &stats.habits_today;
        println!("\nHabits today");
        println!(
            "  {}/{} done ({:.0}%)",
            habits.completed_today, habits.total_habits, habits.completion_rate
        );
        Ok(())
    }

    pub fn patterns(&self, patterns: &[Pattern]) -> Result<()> {
        if self.is_json() {
            return self.json(patterns);
        }
        if patterns.is_empty() {
            println!("No patterns detected yet. Keep journaling!");
            return Ok(());
        }
        for pattern in patterns {
            println!(
                "#{} [{}] {} (confidence {:.2})",
                pattern.id, pattern.pattern_type, pattern.title, pattern.confidence
            );
            if let Some(description) = &pattern.description {
                println!("    {}", description);
            }
            println!("    data: {}", format_data_value(&pattern.data));
        }
        Ok(())
    }

    pub fn insights(&self, insights: &[Insight]) -> Result<()> {
        if self.is_json() {
            return self.json(insights);
        }
        if insights.is_empty() {
            println!("No insights.");
            return Ok(());
        }
        for insight in insights {
            let marker = if insight.is_read { " " } else { "*" };
            println!(
                "{} #{} [{} p{}] {}",
                marker, insight.id, insight.insight_type, insight.priority, insight.title
            );
            println!("    {}", insight.message);
        }
        Ok(())
    }

    pub fn achievements(&self, achievements: &[Achievement]) -> Result<()> {
        if self.is_json() {
            return self.json(achievements);
        }
        for achievement in achievements {
            print_achievement(achievement);
        }
        Ok(())
    }

    pub fn unlocked(&self, unlocked: &[Achievement], settings: &UserSettings) -> Result<()> {
        if self.is_json() {
            return self.json(&CheckOutput {
                unlocked,
                points: settings.points,
                level: settings.level,
            });
        }
        if unlocked.is_empty() {
            println!("No new achievements.");
        } else {
            println!("Unlocked {} achievement(s):", unlocked.len());
            for achievement in unlocked {
                print_achievement(achievement);
            }
        }
        println!("Points: {}  Level: {}", settings.points, settings.level);
        Ok(())
    }

    pub fn achievement_summary(
        &self,
        summary: &AchievementSummary,
        settings: &UserSettings,
    ) -> Result<()> {
        if self.is_json() {
            return self.json(&SummaryOutput {
                summary,
                points: settings.points,
                level: settings.level,
            });
        }
        println!(
            "Unlocked {}/{} ({:.0}%), {} locked",
            summary.unlocked_count, summary.total, summary.completion_rate, summary.locked_count
        );
        println!("Points from achievements: {}", summary.total_points);
        println!("Points: {}  Level: {}", settings.points, settings.level);
        Ok(())
    }
}

fn local_time(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn format_avg(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| "-".to_string())
}

fn print_entry(entry: &JournalEntry) {
    let mut ratings = Vec::new();
    if let Some(mood) = entry.mood {
        ratings.push(format!("mood {}/5", mood));
    }
    if let Some(energy) = entry.energy_level {
        ratings.push(format!("energy {}/5", energy));
    }
    let ratings = if ratings.is_empty() {
        String::new()
    } else {
        format!(" [{}]", ratings.join(", "))
    };

    println!(
        "#{} {}{} {}",
        entry.id,
        local_time(entry.created_at),
        ratings,
        entry.title.as_deref().unwrap_or("")
    );
    for line in entry.content.lines() {
        println!("    {}", line);
    }
    if !entry.tags.is_empty() {
        println!("    tags: {}", entry.tags.join(", "));
    }
}

fn print_achievement(achievement: &Achievement) {
    let status = match achievement.unlocked_at {
        Some(at) => format!("unlocked {}", local_time(at)),
        None => format!("{}/{}", achievement.progress, achievement.target),
    };
    println!(
        "{} {} - {} ({} pts) [{}]",
        achievement.icon, achievement.name, achievement.description, achievement.points, status
    );
}

/// Compact one-line rendering of pattern data
fn format_data_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 => format!("{}", f as i64),
            Some(f) => format!("{:.2}", f),
            None => n.to_string(),
        },
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Object(obj) => obj
            .iter()
            .map(|(k, v)| format!("{}={}", k, format_data_value(v)))
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}
