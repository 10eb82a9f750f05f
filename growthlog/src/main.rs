//! growthlog - personal growth journal
//!
//! Records journal entries, goals and habits, and derives streaks,
//! statistics, patterns, insights and achievements from them.

mod output;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use growthlog_core::analytics::{self, local_day_bounds, stats::StatsSnapshot};
use growthlog_core::{
    Config, Database, GoalStatus, GoalUpdate, HabitFrequency, HabitUpdate, JournalFilter,
    JournalUpdate, NewGoal, NewHabit, NewJournalEntry,
};

use crate::output::Printer;

#[derive(Parser)]
#[command(name = "growthlog")]
#[command(about = "Personal growth journal with streaks, patterns, insights and achievements")]
#[command(version)]
struct Args {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Write and browse journal entries
    #[command(subcommand)]
    Journal(JournalCommand),
    /// Track goals
    #[command(subcommand)]
    Goal(GoalCommand),
    /// Track habits
    #[command(subcommand)]
    Habit(HabitCommand),
    /// Show journal, goal and habit statistics
    Stats {
        /// Days covered by the mood trend (defaults to analysis.trend_days)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Detect patterns in journal entries
    Analyze,
    /// Browse and remove detected patterns
    #[command(subcommand)]
    Patterns(PatternsCommand),
    /// Generate and manage insights
    #[command(subcommand)]
    Insights(InsightsCommand),
    /// Check and list achievements
    #[command(subcommand)]
    Achievements(AchievementsCommand),
}

#[derive(Subcommand)]
enum JournalCommand {
    /// Add an entry
    Add {
        content: String,
        #[arg(short, long)]
        title: Option<String>,
        /// Mood, 1-5
        #[arg(short, long)]
        mood: Option<u8>,
        /// Energy level, 1-5
        #[arg(short, long)]
        energy: Option<u8>,
        /// Tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// List entries, newest first
    List {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
        /// Only entries with one of these tags (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        mood_min: Option<u8>,
        #[arg(long)]
        mood_max: Option<u8>,
        /// First day to include (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day to include (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Search entry titles and content
    Search {
        query: String,
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// List every tag in use
    Tags,
    /// Edit an entry; only the given fields change
    Update {
        id: i64,
        #[arg(long)]
        content: Option<String>,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        mood: Option<u8>,
        #[arg(short, long)]
        energy: Option<u8>,
        /// Replace the tags (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Delete an entry
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum GoalCommand {
    /// Add a goal
    Add {
        title: String,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        /// Target date (YYYY-MM-DD)
        #[arg(long)]
        target_date: Option<NaiveDate>,
    },
    /// List goals
    List {
        /// active, completed or abandoned
        #[arg(short, long)]
        status: Option<String>,
    },
    /// Update a goal
    Update {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        /// Progress, 0-100
        #[arg(short, long)]
        progress: Option<u8>,
        /// active, completed or abandoned
        #[arg(short, long)]
        status: Option<String>,
        #[arg(long)]
        target_date: Option<NaiveDate>,
    },
    /// List active goals past their target date
    Overdue,
    /// Delete a goal
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum HabitCommand {
    /// Add a habit
    Add {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
        /// daily, weekly or custom
        #[arg(long, default_value = "daily")]
        frequency: String,
        #[arg(long, default_value_t = 1)]
        target_count: u32,
    },
    /// List habits
    List,
    /// Edit a habit; only the given fields change
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        /// daily, weekly or custom
        #[arg(long)]
        frequency: Option<String>,
        #[arg(long)]
        target_count: Option<u32>,
    },
    /// Record a completion for today
    Log {
        id: i64,
        #[arg(short, long)]
        note: Option<String>,
    },
    /// Show completions, newest first
    Logs {
        id: i64,
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
        /// First day to include (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day to include (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
enum PatternsCommand {
    /// List stored patterns, most recently seen first
    List,
    /// Show one pattern
    Show { id: i64 },
    /// Delete a pattern
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum InsightsCommand {
    /// Run the insight rules against current stats
    Generate,
    /// List insights, most important first
    List {
        #[arg(short, long)]
        unread: bool,
    },
    /// Mark an insight as read
    Read { id: i64 },
    /// Delete an insight
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum AchievementsCommand {
    /// Update progress and unlock achievements
    Check,
    /// List the catalog with progress
    List,
    /// Summarize unlocked achievements and points
    Stats,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging
    let _log_guard =
        growthlog_core::logging::init(&config.logging).context("failed to initialize logging")?;

    // Open database
    let db_path = Config::database_path();
    tracing::info!(path = %db_path.display(), "Opening database");

    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;
    analytics::seed_catalog(&db).context("failed to seed achievement catalog")?;

    let printer = Printer::new(args.format);

    match args.command {
        Command::Journal(cmd) => run_journal(&db, &printer, cmd),
        Command::Goal(cmd) => run_goal(&db, &printer, cmd),
        Command::Habit(cmd) => run_habit(&db, &printer, cmd),
        Command::Stats { days } => {
            let days = days.unwrap_or(config.analysis.trend_days).max(1);
            let stats = StatsSnapshot::collect(&db, Local::now().date_naive(), days)
                .context("failed to collect statistics")?;
            printer.stats(&stats)
        }
        Command::Analyze => {
            if !config.features.pattern_detection {
                return printer.done("Pattern detection is disabled in the configuration.");
            }
            let patterns =
                analytics::analyze_patterns(&db, Utc::now()).context("pattern analysis failed")?;
            printer.patterns(&patterns)
        }
        Command::Patterns(cmd) => run_patterns(&db, &printer, cmd),
        Command::Insights(cmd) => run_insights(&db, &printer, cmd),
        Command::Achievements(cmd) => {
            run_achievements(&db, &printer, cmd, config.features.achievements)
        }
    }
}

fn run_journal(db: &Database, printer: &Printer, cmd: JournalCommand) -> Result<()> {
    match cmd {
        JournalCommand::Add {
            content,
            title,
            mood,
            energy,
            tags,
        } => {
            let entry = db
                .insert_journal_entry(&NewJournalEntry {
                    title,
                    mood,
                    energy_level: energy,
                    tags,
                    ..NewJournalEntry::new(content)
                })
                .context("failed to add journal entry")?;
            printer.journal_entry(&entry)
        }
        JournalCommand::List {
            limit,
            tags,
            mood_min,
            mood_max,
            from,
            to,
        } => {
            let filter = JournalFilter {
                tags,
                mood_min,
                mood_max,
                date_from: from.map(|d| local_day_bounds(d).0),
                date_to: to.map(|d| local_day_bounds(d).1 - Duration::microseconds(1)),
                limit: Some(limit),
                ..Default::default()
            };
            let entries = db.list_journal_entries(&filter)?;
            printer.journal_entries(&entries)
        }
        JournalCommand::Search { query, limit } => {
            let entries = db.list_journal_entries(&JournalFilter {
                search: Some(query),
                limit: Some(limit),
                ..Default::default()
            })?;
            printer.journal_entries(&entries)
        }
        JournalCommand::Tags => {
            let tags = db.list_journal_tags()?;
            printer.tags(&tags)
        }
        JournalCommand::Update {
            id,
            content,
            title,
            mood,
            energy,
            tags,
        } => {
            let update = JournalUpdate {
                title,
                content,
                mood,
                energy_level: energy,
                tags: (!tags.is_empty()).then_some(tags),
            };
            let entry = db
                .update_journal_entry(id, &update)
                .with_context(|| format!("failed to update journal entry {}", id))?;
            printer.journal_entry(&entry)
        }
        JournalCommand::Delete { id } => {
            if !db.delete_journal_entry(id)? {
                anyhow::bail!("No journal entry with id {}", id);
            }
            printer.done(&format!("Deleted journal entry {}", id))
        }
    }
}

fn run_goal(db: &Database, printer: &Printer, cmd: GoalCommand) -> Result<()> {
    match cmd {
        GoalCommand::Add {
            title,
            description,
            category,
            target_date,
        } => {
            let goal = db
                .insert_goal(&NewGoal {
                    description,
                    category,
                    target_date,
                    ..NewGoal::new(title)
                })
                .context("failed to add goal")?;
            printer.goals(std::slice::from_ref(&goal))
        }
        GoalCommand::List { status } => {
            let goals = match status {
                Some(s) => db.list_goals_by_status(s.parse::<GoalStatus>()?)?,
                None => db.list_goals()?,
            };
            printer.goals(&goals)
        }
        GoalCommand::Update {
            id,
            title,
            progress,
            status,
            target_date,
        } => {
            let update = GoalUpdate {
                title,
                progress,
                status: status.map(|s| s.parse::<GoalStatus>()).transpose()?,
                target_date,
                ..Default::default()
            };
            let goal = db
                .update_goal(id, &update)
                .with_context(|| format!("failed to update goal {}", id))?;
            printer.goals(std::slice::from_ref(&goal))
        }
        GoalCommand::Overdue => {
            let goals = db.list_goals()?;
            let overdue = analytics::stats::overdue_goals(&goals, Local::now().date_naive());
            printer.goals(&overdue)
        }
        GoalCommand::Delete { id } => {
            if !db.delete_goal(id)? {
                anyhow::bail!("No goal with id {}", id);
            }
            printer.done(&format!("Deleted goal {}", id))
        }
    }
}

fn run_habit(db: &Database, printer: &Printer, cmd: HabitCommand) -> Result<()> {
    match cmd {
        HabitCommand::Add {
            name,
            description,
            frequency,
            target_count,
        } => {
            let habit = db
                .insert_habit(&NewHabit {
                    description,
                    frequency: frequency.parse::<HabitFrequency>()?,
                    target_count,
                    ..NewHabit::new(name)
                })
                .context("failed to add habit")?;
            printer.habits(std::slice::from_ref(&habit))
        }
        HabitCommand::List => {
            let habits = db.list_habits()?;
            printer.habits(&habits)
        }
        HabitCommand::Update {
            id,
            name,
            description,
            frequency,
            target_count,
        } => {
            let update = HabitUpdate {
                name,
                description,
                frequency: frequency.map(|f| f.parse::<HabitFrequency>()).transpose()?,
                target_count,
            };
            let habit = db
                .update_habit(id, &update)
                .with_context(|| format!("failed to update habit {}", id))?;
            printer.habits(std::slice::from_ref(&habit))
        }
        HabitCommand::Log { id, note } => {
            db.log_habit_completion(id, note.as_deref())
                .with_context(|| format!("failed to log habit {}", id))?;
            let habit = db
                .get_habit(id)?
                .with_context(|| format!("habit {} disappeared", id))?;
            printer.habits(std::slice::from_ref(&habit))
        }
        HabitCommand::Logs {
            id,
            limit,
            from,
            to,
        } => {
            if db.get_habit(id)?.is_none() {
                anyhow::bail!("No habit with id {}", id);
            }
            let logs = if from.is_some() || to.is_some() {
                let start = from.map_or(DateTime::<Utc>::UNIX_EPOCH, |d| local_day_bounds(d).0);
                let end = local_day_bounds(to.unwrap_or_else(|| Local::now().date_naive())).1;
                let mut logs = db.habit_logs_between(id, start, end)?;
                logs.truncate(limit);
                logs
            } else {
                db.habit_logs(id, limit)?
            };
            printer.habit_logs(&logs)
        }
    }
}

fn run_patterns(db: &Database, printer: &Printer, cmd: PatternsCommand) -> Result<()> {
    match cmd {
        PatternsCommand::List => {
            let patterns = db.list_patterns()?;
            printer.patterns(&patterns)
        }
        PatternsCommand::Show { id } => {
            let pattern = db
                .get_pattern(id)?
                .with_context(|| format!("No pattern with id {}", id))?;
            printer.patterns(std::slice::from_ref(&pattern))
        }
        PatternsCommand::Delete { id } => {
            if !db.delete_pattern(id)? {
                anyhow::bail!("No pattern with id {}", id);
            }
            printer.done(&format!("Deleted pattern {}", id))
        }
    }
}

fn run_insights(db: &Database, printer: &Printer, cmd: InsightsCommand) -> Result<()> {
    match cmd {
        InsightsCommand::Generate => {
            let insights =
                analytics::generate_insights(db, Local::now().date_naive(), Utc::now())
                    .context("insight generation failed")?;
            printer.insights(&insights)
        }
        InsightsCommand::List { unread } => {
            let insights = db.list_insights(unread)?;
            printer.insights(&insights)
        }
        InsightsCommand::Read { id } => {
            if !db.mark_insight_read(id)? {
                anyhow::bail!("No insight with id {}", id);
            }
            printer.done(&format!("Marked insight {} as read", id))
        }
        InsightsCommand::Delete { id } => {
            if !db.delete_insight(id)? {
                anyhow::bail!("No insight with id {}", id);
            }
            printer.done(&format!("Deleted insight {}", id))
        }
    }
}

fn run_achievements(
    db: &Database,
    printer: &Printer,
    cmd: AchievementsCommand,
    enabled: bool,
) -> Result<()> {
    match cmd {
        AchievementsCommand::Check => {
            if !enabled {
                return printer.done("Achievements are disabled in the configuration.");
            }
            let settings = db.get_user_settings()?;
            let (unlocked, settings) =
                analytics::check_and_unlock(db, &settings, Local::now().date_naive(), Utc::now())
                    .context("achievement check failed")?;
            printer.unlocked(&unlocked, &settings)
        }
        AchievementsCommand::List => {
            let achievements = db.list_achievements()?;
            printer.achievements(&achievements)
        }
        AchievementsCommand::Stats => {
            let summary = analytics::stats::achievement_summary(&db.list_achievements()?);
            let settings = db.get_user_settings()?;
            printer.achievement_summary(&summary, &settings)
        }
    }
}
