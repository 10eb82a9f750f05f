//! Core domain types for growthlog
//!
//! These types are the records kept by the store. Derived statistics live in
//! [`crate::analytics`].
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **JournalEntry** | Free-text entry with optional mood and energy ratings (1-5) |
//! | **Goal** | Something the user is working towards, with manual progress (0-100) |
//! | **Habit** | A recurring action; completions are recorded as [`HabitLog`] rows |
//! | **Pattern** | A named statistical observation about journal data |
//! | **Insight** | A one-shot coaching message generated from current statistics |
//! | **Achievement** | A catalog milestone with a progress counter and a one-time unlock |
//!
//! All ids are SQLite rowids. Timestamps are stored in UTC; anything that
//! talks about "days" or "hours" converts to local time first.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Inclusive range accepted for mood and energy ratings.
pub const RATING_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

fn check_rating(field: &str, value: Option<u8>) -> Result<()> {
    match value {
        Some(v) if !RATING_RANGE.contains(&v) => Err(Error::InvalidInput(format!(
            "{} must be between 1 and 5, got {}",
            field, v
        ))),
        _ => Ok(()),
    }
}

fn check_not_blank(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(())
}

/// Deduplicate tags while keeping first-seen order.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

// ============================================
// Journal
// ============================================

/// A journal entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: i64,
    pub title: Option<String>,
    pub content: String,
    /// 1 (low) to 5 (high)
    pub mood: Option<u8>,
    /// 1 (low) to 5 (high)
    pub energy_level: Option<u8>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a journal entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewJournalEntry {
    pub title: Option<String>,
    pub content: String,
    pub mood: Option<u8>,
    pub energy_level: Option<u8>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Backdate the entry; defaults to now
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewJournalEntry {
    /// Entry with only content set
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_not_blank("content", &self.content)?;
        check_rating("mood", self.mood)?;
        check_rating("energy_level", self.energy_level)
    }
}

/// Partial update for a journal entry. `None` keeps the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JournalUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub mood: Option<u8>,
    pub energy_level: Option<u8>,
    pub tags: Option<Vec<String>>,
}

impl JournalUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(content) = &self.content {
            check_not_blank("content", content)?;
        }
        check_rating("mood", self.mood)?;
        check_rating("energy_level", self.energy_level)
    }
}

/// Filter for journal listing. Empty filter matches everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JournalFilter {
    /// Entry must carry at least one of these tags
    #[serde(default)]
    pub tags: Vec<String>,
    pub mood_min: Option<u8>,
    pub mood_max: Option<u8>,
    pub energy_min: Option<u8>,
    pub energy_max: Option<u8>,
    /// Inclusive lower bound on created_at
    pub date_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on created_at
    pub date_to: Option<DateTime<Utc>>,
    /// Case-insensitive substring match on title or content
    pub search: Option<String>,
    pub limit: Option<usize>,
}

// ============================================
// Goals
// ============================================

/// Lifecycle state of a goal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Active,
    Completed,
    Abandoned,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::Active => "active",
            GoalStatus::Completed => "completed",
            GoalStatus::Abandoned => "abandoned",
        }
    }
}

impl std::fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for GoalStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(GoalStatus::Active),
            "completed" => Ok(GoalStatus::Completed),
            "abandoned" => Ok(GoalStatus::Abandoned),
            _ => Err(Error::Unsupported(format!("goal status: {}", s))),
        }
    }
}

/// A goal with manually tracked progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub target_date: Option<NaiveDate>,
    pub status: GoalStatus,
    /// Percentage, 0-100
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a goal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGoal {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub target_date: Option<NaiveDate>,
    #[serde(default = "default_goal_status")]
    pub status: GoalStatus,
    #[serde(default)]
    pub progress: u8,
}

fn default_goal_status() -> GoalStatus {
    GoalStatus::Active
}

impl NewGoal {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            category: None,
            target_date: None,
            status: GoalStatus::Active,
            progress: 0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_not_blank("title", &self.title)?;
        check_progress(self.progress)
    }
}

fn check_progress(progress: u8) -> Result<()> {
    if progress > 100 {
        return Err(Error::InvalidInput(format!(
            "progress must be between 0 and 100, got {}",
            progress
        )));
    }
    Ok(())
}

/// Partial update for a goal. `None` keeps the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoalUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub target_date: Option<NaiveDate>,
    pub status: Option<GoalStatus>,
    pub progress: Option<u8>,
}

impl GoalUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            check_not_blank("title", title)?;
        }
        match self.progress {
            Some(p) => check_progress(p),
            None => Ok(()),
        }
    }
}

// ============================================
// Habits
// ============================================

/// How often a habit is meant to be done
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HabitFrequency {
    Daily,
    Weekly,
    Custom,
}

impl HabitFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            HabitFrequency::Daily => "daily",
            HabitFrequency::Weekly => "weekly",
            HabitFrequency::Custom => "custom",
        }
    }
}

impl std::fmt::Display for HabitFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for HabitFrequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "daily" => Ok(HabitFrequency::Daily),
            "weekly" => Ok(HabitFrequency::Weekly),
            "custom" => Ok(HabitFrequency::Custom),
            _ => Err(Error::Unsupported(format!("habit frequency: {}", s))),
        }
    }
}

/// A habit and its cached completion statistics
///
/// `streak_count`, `best_streak` and `total_completions` are recomputed from
/// the habit's logs every time a completion is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub frequency: HabitFrequency,
    pub target_count: u32,
    pub streak_count: u32,
    /// Never lower than `streak_count`
    pub best_streak: u32,
    /// Number of [`HabitLog`] rows for this habit
    pub total_completions: u32,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a habit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewHabit {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_frequency")]
    pub frequency: HabitFrequency,
    #[serde(default = "default_target_count")]
    pub target_count: u32,
}

fn default_frequency() -> HabitFrequency {
    HabitFrequency::Daily
}

fn default_target_count() -> u32 {
    1
}

impl NewHabit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            frequency: HabitFrequency::Daily,
            target_count: 1,
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_not_blank("name", &self.name)?;
        if self.target_count == 0 {
            return Err(Error::InvalidInput(
                "target_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Partial update for a habit. `None` keeps the stored value.
///
/// Streak counters and totals are derived from the logs and cannot be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HabitUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub frequency: Option<HabitFrequency>,
    pub target_count: Option<u32>,
}

impl HabitUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            check_not_blank("name", name)?;
        }
        if self.target_count == Some(0) {
            return Err(Error::InvalidInput(
                "target_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// One recorded completion of a habit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitLog {
    pub id: i64,
    pub habit_id: i64,
    pub completed_at: DateTime<Utc>,
    pub note: Option<String>,
}

// ============================================
// Patterns
// ============================================

/// Kind of detected pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    /// Mood varies with hour of day
    MoodTimeCorrelation,
    /// A term keeps showing up in entries
    RecurringTheme,
    /// Mood tracks energy
    MoodEnergyCorrelation,
}

impl PatternType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::MoodTimeCorrelation => "mood_time_correlation",
            PatternType::RecurringTheme => "recurring_theme",
            PatternType::MoodEnergyCorrelation => "mood_energy_correlation",
        }
    }
}

impl std::fmt::Display for PatternType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PatternType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mood_time_correlation" => Ok(PatternType::MoodTimeCorrelation),
            "recurring_theme" => Ok(PatternType::RecurringTheme),
            "mood_energy_correlation" => Ok(PatternType::MoodEnergyCorrelation),
            _ => Err(Error::Unsupported(format!("pattern type: {}", s))),
        }
    }
}

/// A persisted pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub id: i64,
    pub pattern_type: PatternType,
    pub title: String,
    pub description: Option<String>,
    /// 0.0 to 1.0
    pub confidence: f64,
    pub frequency: Option<String>,
    pub data: serde_json::Value,
    pub first_detected: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// A detector result that has not been written yet.
///
/// `(pattern_type, title)` is its identity in the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternCandidate {
    pub pattern_type: PatternType,
    pub title: String,
    pub description: String,
    pub confidence: f64,
    pub frequency: String,
    pub data: serde_json::Value,
}

// ============================================
// Insights
// ============================================

/// Tone of an insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    Tip,
    Encouragement,
    Warning,
    Celebration,
}

impl InsightType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightType::Tip => "tip",
            InsightType::Encouragement => "encouragement",
            InsightType::Warning => "warning",
            InsightType::Celebration => "celebration",
        }
    }
}

impl std::fmt::Display for InsightType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for InsightType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tip" => Ok(InsightType::Tip),
            "encouragement" => Ok(InsightType::Encouragement),
            "warning" => Ok(InsightType::Warning),
            "celebration" => Ok(InsightType::Celebration),
            _ => Err(Error::Unsupported(format!("insight type: {}", s))),
        }
    }
}

/// A persisted insight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub id: i64,
    pub insight_type: InsightType,
    pub title: String,
    pub message: String,
    /// Weak reference, nulled when the goal is deleted
    pub related_goal_id: Option<i64>,
    /// Weak reference, nulled when the pattern is deleted
    pub related_pattern_id: Option<i64>,
    /// Higher is more important
    pub priority: i32,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating an insight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInsight {
    pub insight_type: InsightType,
    pub title: String,
    pub message: String,
    pub related_goal_id: Option<i64>,
    pub related_pattern_id: Option<i64>,
    pub priority: i32,
}

// ============================================
// Achievements
// ============================================

/// Category of an achievement in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementType {
    Milestone,
    Streak,
    Completion,
    Exploration,
    Consistency,
}

impl AchievementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementType::Milestone => "milestone",
            AchievementType::Streak => "streak",
            AchievementType::Completion => "completion",
            AchievementType::Exploration => "exploration",
            AchievementType::Consistency => "consistency",
        }
    }
}

impl std::str::FromStr for AchievementType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "milestone" => Ok(AchievementType::Milestone),
            "streak" => Ok(AchievementType::Streak),
            "completion" => Ok(AchievementType::Completion),
            "exploration" => Ok(AchievementType::Exploration),
            "consistency" => Ok(AchievementType::Consistency),
            _ => Err(Error::Unsupported(format!("achievement type: {}", s))),
        }
    }
}

/// What has to happen for an achievement to unlock.
///
/// `action` is kept as a string so catalog rows with actions the evaluator
/// does not know about still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub action: String,
    pub target: i64,
}

/// A catalog achievement and its progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: i64,
    /// Unique
    pub name: String,
    pub description: String,
    pub icon: String,
    pub points: i64,
    pub achievement_type: AchievementType,
    pub requirement: Requirement,
    pub progress: i64,
    pub target: i64,
    /// Set once, never cleared
    pub unlocked_at: Option<DateTime<Utc>>,
}

impl Achievement {
    pub fn is_unlocked(&self) -> bool {
        self.unlocked_at.is_some()
    }
}

// ============================================
// User settings
// ============================================

/// Points needed per level.
pub const POINTS_PER_LEVEL: i64 = 1000;

/// The singleton settings row (id = 1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    pub timezone: String,
    pub daily_reminder_time: Option<String>,
    /// Sum of points of all unlocked achievements
    pub points: i64,
    pub level: i64,
    pub updated_at: DateTime<Utc>,
}

impl UserSettings {
    /// Level for a point total: `floor(points / 1000) + 1`
    pub fn level_for(points: i64) -> i64 {
        points.div_euclid(POINTS_PER_LEVEL) + 1
    }

    /// Copy with `points` added and the level recomputed from the new total
    pub fn with_award(&self, points: i64) -> Self {
        let total = self.points + points;
        Self {
            points: total,
            level: Self::level_for(total),
            ..self.clone()
        }
    }
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            daily_reminder_time: None,
            points: 0,
            level: 1,
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_roundtrip_strings() {
        for status in [GoalStatus::Active, GoalStatus::Completed, GoalStatus::Abandoned] {
            assert_eq!(status.as_str().parse::<GoalStatus>().unwrap(), status);
        }
        assert!(matches!(
            "paused".parse::<GoalStatus>(),
            Err(Error::Unsupported(_))
        ));
        assert_eq!(
            "recurring_theme".parse::<PatternType>().unwrap(),
            PatternType::RecurringTheme
        );
    }

    #[test]
    fn test_new_journal_entry_validation() {
        assert!(NewJournalEntry::new("hello").validate().is_ok());
        assert!(matches!(
            NewJournalEntry::new("   ").validate(),
            Err(Error::InvalidInput(_))
        ));

        let entry = NewJournalEntry {
            mood: Some(6),
            ..NewJournalEntry::new("ok")
        };
        assert!(matches!(entry.validate(), Err(Error::InvalidInput(_))));

        let entry = NewJournalEntry {
            energy_level: Some(0),
            ..NewJournalEntry::new("ok")
        };
        assert!(entry.validate().is_err());
    }

    #[test]
    fn test_goal_progress_validation() {
        let goal = NewGoal {
            progress: 101,
            ..NewGoal::new("Run a marathon")
        };
        assert!(goal.validate().is_err());
        assert!(NewGoal::new("Run a marathon").validate().is_ok());
    }

    #[test]
    fn test_normalize_tags_keeps_order() {
        let tags = vec![
            "work".to_string(),
            "health".to_string(),
            "work".to_string(),
            " ".to_string(),
        ];
        assert_eq!(normalize_tags(&tags), vec!["work", "health"]);
    }

    #[test]
    fn test_level_uses_post_award_points() {
        let settings = UserSettings {
            points: 990,
            level: 1,
            ..Default::default()
        };
        let awarded = settings.with_award(10);
        assert_eq!(awarded.points, 1000);
        assert_eq!(awarded.level, 2);

        assert_eq!(UserSettings::level_for(0), 1);
        assert_eq!(UserSettings::level_for(2500), 3);
    }
}
