//! Database repository layer
//!
//! Provides query and insert operations for all entity types.

use crate::analytics::achievements::AchievementDef;
use crate::analytics::{local_date, streak};
use crate::error::{Error, Result};
use crate::types::*;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Mutex;

/// Fixed-width RFC 3339 so stored timestamps sort lexicographically.
fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

/// `%term%` for a LIKE with a backslash escape, so `%` and `_` match literally
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn get_ts(row: &Row, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(row.as_ref().column_index(column).unwrap_or(0), e))
}

fn get_opt_ts(row: &Row, column: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(column)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_error(row.as_ref().column_index(column).unwrap_or(0), e))
    })
    .transpose()
}

fn get_enum<T>(row: &Row, column: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = Error>,
{
    let raw: String = row.get(column)?;
    raw.parse()
        .map_err(|e| conversion_error(row.as_ref().column_index(column).unwrap_or(0), e))
}

fn get_json<T: serde::de::DeserializeOwned>(row: &Row, column: &str) -> rusqlite::Result<T> {
    let raw: String = row.get(column)?;
    serde_json::from_str(&raw)
        .map_err(|e| conversion_error(row.as_ref().column_index(column).unwrap_or(0), e))
}

/// Database handle (single connection)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        super::schema::run_migrations(&conn)
    }

    /// Get the underlying connection (for advanced use)
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    // ============================================
    // Journal operations
    // ============================================

    /// Insert a journal entry
    pub fn insert_journal_entry(&self, entry: &NewJournalEntry) -> Result<JournalEntry> {
        entry.validate()?;
        let created_at = entry.created_at.unwrap_or_else(Utc::now);
        let tags = normalize_tags(&entry.tags);

        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO journal_entries (title, content, mood, energy_level, tags, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            "#,
            params![
                entry.title,
                entry.content,
                entry.mood,
                entry.energy_level,
                serde_json::to_string(&tags)?,
                fmt_ts(created_at),
            ],
        )?;
        let id = conn.last_insert_rowid();
        Self::fetch_journal_entry(&conn, id)?.ok_or(Error::not_found("journal entry", id))
    }

    /// Get a journal entry by ID
    pub fn get_journal_entry(&self, id: i64) -> Result<Option<JournalEntry>> {
        let conn = self.conn.lock().unwrap();
        Self::fetch_journal_entry(&conn, id)
    }

    fn fetch_journal_entry(conn: &Connection, id: i64) -> Result<Option<JournalEntry>> {
        conn.query_row(
            "SELECT * FROM journal_entries WHERE id = ?",
            [id],
            Self::row_to_journal_entry,
        )
        .optional()
        .map_err(Error::from)
    }

    /// Apply a partial update; unset fields keep their stored values
    pub fn update_journal_entry(&self, id: i64, update: &JournalUpdate) -> Result<JournalEntry> {
        update.validate()?;
        let tags = update
            .tags
            .as_ref()
            .map(|t| serde_json::to_string(&normalize_tags(t)))
            .transpose()?;

        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            r#"
            UPDATE journal_entries
            SET title = COALESCE(?1, title),
                content = COALESCE(?2, content),
                mood = COALESCE(?3, mood),
                energy_level = COALESCE(?4, energy_level),
                tags = COALESCE(?5, tags),
                updated_at = ?6
            WHERE id = ?7
            "#,
            params![
                update.title,
                update.content,
                update.mood,
                update.energy_level,
                tags,
                fmt_ts(Utc::now()),
                id,
            ],
        )?;
        if changed == 0 {
            return Err(Error::not_found("journal entry", id));
        }
        Self::fetch_journal_entry(&conn, id)?.ok_or(Error::not_found("journal entry", id))
    }

    /// Delete a journal entry. Returns false if it did not exist.
    pub fn delete_journal_entry(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute("DELETE FROM journal_entries WHERE id = ?", [id])?;
        Ok(changed > 0)
    }

    /// List journal entries, newest first
    pub fn list_journal_entries(&self, filter: &JournalFilter) -> Result<Vec<JournalEntry>> {
        let conn = self.conn.lock().unwrap();

        let mut sql = String::from("SELECT * FROM journal_entries WHERE 1=1");
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![];

        if !filter.tags.is_empty() {
            let placeholders = vec!["?"; filter.tags.len()].join(", ");
            sql.push_str(&format!(
                " AND EXISTS (SELECT 1 FROM json_each(journal_entries.tags) WHERE value IN ({}))",
                placeholders
            ));
            for tag in &filter.tags {
                params.push(Box::new(tag.clone()));
            }
        }

        if let Some(min) = filter.mood_min {
            sql.push_str(" AND mood >= ?");
            params.push(Box::new(min));
        }
        if let Some(max) = filter.mood_max {
            sql.push_str(" AND mood <= ?");
            params.push(Box::new(max));
        }
        if let Some(min) = filter.energy_min {
            sql.push_str(" AND energy_level >= ?");
            params.push(Box::new(min));
        }
        if let Some(max) = filter.energy_max {
            sql.push_str(" AND energy_level <= ?");
            params.push(Box::new(max));
        }
        if let Some(from) = filter.date_from {
            sql.push_str(" AND created_at >= ?");
            params.push(Box::new(fmt_ts(from)));
        }
        if let Some(to) = filter.date_to {
            sql.push_str(" AND created_at <= ?");
            params.push(Box::new(fmt_ts(to)));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            // One numbered parameter shared by the title, content and tag matches
            let n = params.len() + 1;
            sql.push_str(&format!(
                r#" AND (LOWER(COALESCE(title, '')) LIKE ?{n} ESCAPE '\'
                    OR LOWER(content) LIKE ?{n} ESCAPE '\'
                    OR EXISTS (SELECT 1 FROM json_each(journal_entries.tags)
                               WHERE LOWER(value) LIKE ?{n} ESCAPE '\'))"#
            ));
            params.push(Box::new(like_pattern(search)));
        }

        sql.push_str(" ORDER BY created_at DESC, id DESC");

        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params_refs.as_slice(), Self::row_to_journal_entry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// The `limit` most recent entries, newest first
    pub fn recent_journal_entries(&self, limit: usize) -> Result<Vec<JournalEntry>> {
        self.list_journal_entries(&JournalFilter {
            limit: Some(limit),
            ..Default::default()
        })
    }

    /// The `limit` most recent entries that carry both mood and energy
    pub fn recent_rated_journal_entries(&self, limit: usize) -> Result<Vec<JournalEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM journal_entries
            WHERE mood IS NOT NULL AND energy_level IS NOT NULL
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )?;
        let entries = stmt
            .query_map([limit as i64], Self::row_to_journal_entry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Every tag in use, sorted
    pub fn list_journal_tags(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT DISTINCT value
            FROM journal_entries, json_each(journal_entries.tags)
            ORDER BY value
            "#,
        )?;
        let tags = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    fn row_to_journal_entry(row: &Row) -> rusqlite::Result<JournalEntry> {
        Ok(JournalEntry {
            id: row.get("id")?,
            title: row.get("title")?,
            content: row.get("content")?,
            mood: row.get("mood")?,
            energy_level: row.get("energy_level")?,
            tags: get_json(row, "tags")?,
            created_at: get_ts(row, "created_at")?,
            updated_at: get_ts(row, "updated_at")?,
        })
    }

    // ============================================
    // Goal operations
    // ============================================

    /// Insert a goal
    pub fn insert_goal(&self, goal: &NewGoal) -> Result<Goal> {
        goal.validate()?;
        let now = fmt_ts(Utc::now());

        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO goals (title, description, category, target_date, status, progress, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            "#,
            params![
                goal.title,
                goal.description,
                goal.category,
                goal.target_date.map(|d| d.to_string()),
                goal.status.as_str(),
                goal.progress,
                now,
            ],
        )?;
        let id = conn.last_insert_rowid();
        Self::fetch_goal(&conn, id)?.ok_or(Error::not_found("goal", id))
    }

    /// Get a goal by ID
    pub fn get_goal(&self, id: i64) -> Result<Option<Goal>> {
        let conn = self.conn.lock().unwrap();
        Self::fetch_goal(&conn, id)
    }

    fn fetch_goal(conn: &Connection, id: i64) -> Result<Option<Goal>> {
        conn.query_row("SELECT * FROM goals WHERE id = ?", [id], Self::row_to_goal)
            .optional()
            .map_err(Error::from)
    }

    /// Apply a partial update; unset fields keep their stored values
    pub fn update_goal(&self, id: i64, update: &GoalUpdate) -> Result<Goal> {
        update.validate()?;

        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            r#"
            UPDATE goals
            SET title = COALESCE(?1, title),
                description = COALESCE(?2, description),
                category = COALESCE(?3, category),
                target_date = COALESCE(?4, target_date),
                status = COALESCE(?5, status),
                progress = COALESCE(?6, progress),
                updated_at = ?7
            WHERE id = ?8
            "#,
            params![
                update.title,
                update.description,
                update.category,
                update.target_date.map(|d| d.to_string()),
                update.status.map(|s| s.as_str()),
                update.progress,
                fmt_ts(Utc::now()),
                id,
            ],
        )?;
        if changed == 0 {
            return Err(Error::not_found("goal", id));
        }
        Self::fetch_goal(&conn, id)?.ok_or(Error::not_found("goal", id))
    }

    /// Delete a goal. Insights pointing at it keep existing with the link nulled.
    pub fn delete_goal(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute("DELETE FROM goals WHERE id = ?", [id])?;
        Ok(changed > 0)
    }

    /// All goals: active first, then completed, then abandoned; newest first within each
    pub fn list_goals(&self) -> Result<Vec<Goal>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM goals
            ORDER BY
                CASE status
                    WHEN 'active' THEN 1
                    WHEN 'completed' THEN 2
                    ELSE 3
                END,
                created_at DESC,
                id DESC
            "#,
        )?;
        let goals = stmt
            .query_map([], Self::row_to_goal)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(goals)
    }

    /// Goals with the given status, newest first
    pub fn list_goals_by_status(&self, status: GoalStatus) -> Result<Vec<Goal>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM goals WHERE status = ? ORDER BY created_at DESC, id DESC",
        )?;
        let goals = stmt
            .query_map([status.as_str()], Self::row_to_goal)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(goals)
    }

    fn row_to_goal(row: &Row) -> rusqlite::Result<Goal> {
        let target_date: Option<String> = row.get("target_date")?;
        let target_date = target_date
            .map(|s| {
                NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| {
                    conversion_error(row.as_ref().column_index("target_date").unwrap_or(0), e)
                })
            })
            .transpose()?;

        Ok(Goal {
            id: row.get("id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            category: row.get("category")?,
            target_date,
            status: get_enum(row, "status")?,
            progress: row.get("progress")?,
            created_at: get_ts(row, "created_at")?,
            updated_at: get_ts(row, "updated_at")?,
        })
    }

    // ============================================
    // Habit operations
    // ============================================

    /// Insert a habit
    pub fn insert_habit(&self, habit: &NewHabit) -> Result<Habit> {
        habit.validate()?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO habits (name, description, frequency, target_count, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                habit.name,
                habit.description,
                habit.frequency.as_str(),
                habit.target_count,
                fmt_ts(Utc::now()),
            ],
        )?;
        let id = conn.last_insert_rowid();
        Self::fetch_habit(&conn, id)?.ok_or(Error::not_found("habit", id))
    }

    /// Get a habit by ID
    pub fn get_habit(&self, id: i64) -> Result<Option<Habit>> {
        let conn = self.conn.lock().unwrap();
        Self::fetch_habit(&conn, id)
    }

    fn fetch_habit(conn: &Connection, id: i64) -> Result<Option<Habit>> {
        conn.query_row("SELECT * FROM habits WHERE id = ?", [id], Self::row_to_habit)
            .optional()
            .map_err(Error::from)
    }

    /// All habits, newest first
    pub fn list_habits(&self) -> Result<Vec<Habit>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT * FROM habits ORDER BY created_at DESC, id DESC")?;
        let habits = stmt
            .query_map([], Self::row_to_habit)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(habits)
    }

    /// Apply a partial update; unset fields keep their stored values
    pub fn update_habit(&self, id: i64, update: &HabitUpdate) -> Result<Habit> {
        update.validate()?;

        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            r#"
            UPDATE habits
            SET name = COALESCE(?1, name),
                description = COALESCE(?2, description),
                frequency = COALESCE(?3, frequency),
                target_count = COALESCE(?4, target_count)
            WHERE id = ?5
            "#,
            params![
                update.name,
                update.description,
                update.frequency.map(|f| f.as_str()),
                update.target_count,
                id,
            ],
        )?;
        if changed == 0 {
            return Err(Error::not_found("habit", id));
        }
        Self::fetch_habit(&conn, id)?.ok_or(Error::not_found("habit", id))
    }

    /// Delete a habit and its logs
    pub fn delete_habit(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute("DELETE FROM habits WHERE id = ?", [id])?;
        Ok(changed > 0)
    }

    /// Record a completion now and refresh the habit's statistics
    pub fn log_habit_completion(&self, habit_id: i64, note: Option<&str>) -> Result<HabitLog> {
        let now = Utc::now();
        self.log_habit_completion_at(habit_id, note, now, local_date(now))
    }

    /// Record a completion at `completed_at`; the streak is counted back from `today`
    pub fn log_habit_completion_at(
        &self,
        habit_id: i64,
        note: Option<&str>,
        completed_at: DateTime<Utc>,
        today: NaiveDate,
    ) -> Result<HabitLog> {
        let conn = self.conn.lock().unwrap();
        if Self::fetch_habit(&conn, habit_id)?.is_none() {
            return Err(Error::not_found("habit", habit_id));
        }

        conn.execute(
            "INSERT INTO habit_logs (habit_id, completed_at, note) VALUES (?1, ?2, ?3)",
            params![habit_id, fmt_ts(completed_at), note],
        )?;
        let log = HabitLog {
            id: conn.last_insert_rowid(),
            habit_id,
            completed_at,
            note: note.map(str::to_string),
        };

        Self::refresh_habit_stats(&conn, habit_id, today)?;
        Ok(log)
    }

    /// Recompute total_completions, streak_count and best_streak from the logs
    fn refresh_habit_stats(conn: &Connection, habit_id: i64, today: NaiveDate) -> Result<()> {
        let mut stmt = conn.prepare("SELECT * FROM habit_logs WHERE habit_id = ?")?;
        let logs = stmt
            .query_map([habit_id], Self::row_to_habit_log)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let dates = streak::distinct_days(logs.iter().map(|l| l.completed_at));
        let current = streak::current_streak(&dates, today);
        // Backdated logs can close a gap, so the best run is taken over the whole history
        let longest = streak::longest_streak(&dates).max(current);

        conn.execute(
            r#"
            UPDATE habits
            SET total_completions = ?1,
                streak_count = ?2,
                best_streak = MAX(best_streak, ?3)
            WHERE id = ?4
            "#,
            params![logs.len() as i64, current, longest, habit_id],
        )?;

        tracing::debug!(
            habit_id,
            total = logs.len(),
            streak = current,
            best = longest,
            "Refreshed habit stats"
        );
        Ok(())
    }

    /// The `limit` most recent logs for a habit, newest first
    pub fn habit_logs(&self, habit_id: i64, limit: usize) -> Result<Vec<HabitLog>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM habit_logs
            WHERE habit_id = ?
            ORDER BY completed_at DESC, id DESC
            LIMIT ?
            "#,
        )?;
        let logs = stmt
            .query_map(params![habit_id, limit as i64], Self::row_to_habit_log)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(logs)
    }

    /// Logs for a habit with `start <= completed_at < end`, newest first
    pub fn habit_logs_between(
        &self,
        habit_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HabitLog>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM habit_logs
            WHERE habit_id = ? AND completed_at >= ? AND completed_at < ?
            ORDER BY completed_at DESC, id DESC
            "#,
        )?;
        let logs = stmt
            .query_map(
                params![habit_id, fmt_ts(start), fmt_ts(end)],
                Self::row_to_habit_log,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(logs)
    }

    /// Distinct habits with at least one log in `start <= completed_at < end`
    pub fn habits_completed_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<i64>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT DISTINCT habit_id FROM habit_logs
            WHERE completed_at >= ? AND completed_at < ?
            ORDER BY habit_id
            "#,
        )?;
        let ids = stmt
            .query_map(params![fmt_ts(start), fmt_ts(end)], |row| row.get(0))?
            .collect::<std::result::Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    fn row_to_habit(row: &Row) -> rusqlite::Result<Habit> {
        Ok(Habit {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            frequency: get_enum(row, "frequency")?,
            target_count: row.get("target_count")?,
            streak_count: row.get("streak_count")?,
            best_streak: row.get("best_streak")?,
            total_completions: row.get("total_completions")?,
            created_at: get_ts(row, "created_at")?,
        })
    }

    fn row_to_habit_log(row: &Row) -> rusqlite::Result<HabitLog> {
        Ok(HabitLog {
            id: row.get("id")?,
            habit_id: row.get("habit_id")?,
            completed_at: get_ts(row, "completed_at")?,
            note: row.get("note")?,
        })
    }

    // ============================================
    // Pattern operations
    // ============================================

    /// Find a pattern by its identity
    pub fn find_pattern(
        &self,
        pattern_type: PatternType,
        title: &str,
    ) -> Result<Option<Pattern>> {
        let conn = self.conn.lock().unwrap();
        Self::fetch_pattern_by_identity(&conn, pattern_type, title)
    }

    fn fetch_pattern_by_identity(
        conn: &Connection,
        pattern_type: PatternType,
        title: &str,
    ) -> Result<Option<Pattern>> {
        conn.query_row(
            "SELECT * FROM patterns WHERE pattern_type = ? AND title = ? ORDER BY id LIMIT 1",
            params![pattern_type.as_str(), title],
            Self::row_to_pattern,
        )
        .optional()
        .map_err(Error::from)
    }

    /// Insert a new pattern or refresh the one with the same `(pattern_type, title)`.
    ///
    /// A refresh replaces confidence, frequency and data and bumps `last_seen`;
    /// `first_detected` and `description` stay as first written.
    pub fn upsert_pattern(
        &self,
        candidate: &PatternCandidate,
        now: DateTime<Utc>,
    ) -> Result<Pattern> {
        let conn = self.conn.lock().unwrap();
        let now_str = fmt_ts(now);

        let existing =
            Self::fetch_pattern_by_identity(&conn, candidate.pattern_type, &candidate.title)?;
        let id = match existing {
            Some(existing) => {
                conn.execute(
                    r#"
                    UPDATE patterns
                    SET confidence = ?1,
                        frequency = ?2,
                        data = ?3,
                        last_seen = ?4
                    WHERE id = ?5
                    "#,
                    params![
                        candidate.confidence,
                        candidate.frequency,
                        serde_json::to_string(&candidate.data)?,
                        now_str,
                        existing.id,
                    ],
                )?;
                existing.id
            }
            None => {
                conn.execute(
                    r#"
                    INSERT INTO patterns (pattern_type, title, description, confidence, frequency, data, first_detected, last_seen)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                    "#,
                    params![
                        candidate.pattern_type.as_str(),
                        candidate.title,
                        candidate.description,
                        candidate.confidence,
                        candidate.frequency,
                        serde_json::to_string(&candidate.data)?,
                        now_str,
                    ],
                )?;
                conn.last_insert_rowid()
            }
        };

        Self::fetch_pattern(&conn, id)?.ok_or(Error::not_found("pattern", id))
    }

    /// Get a pattern by ID
    pub fn get_pattern(&self, id: i64) -> Result<Option<Pattern>> {
        let conn = self.conn.lock().unwrap();
        Self::fetch_pattern(&conn, id)
    }

    fn fetch_pattern(conn: &Connection, id: i64) -> Result<Option<Pattern>> {
        conn.query_row("SELECT * FROM patterns WHERE id = ?", [id], Self::row_to_pattern)
            .optional()
            .map_err(Error::from)
    }

    /// All patterns, most recently seen first
    pub fn list_patterns(&self) -> Result<Vec<Pattern>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT * FROM patterns ORDER BY last_seen DESC, id DESC")?;
        let patterns = stmt
            .query_map([], Self::row_to_pattern)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(patterns)
    }

    /// Delete a pattern. Insights pointing at it keep existing with the link nulled.
    pub fn delete_pattern(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute("DELETE FROM patterns WHERE id = ?", [id])?;
        Ok(changed > 0)
    }

    fn row_to_pattern(row: &Row) -> rusqlite::Result<Pattern> {
        let data: Option<String> = row.get("data")?;
        Ok(Pattern {
            id: row.get("id")?,
            pattern_type: get_enum(row, "pattern_type")?,
            title: row.get("title")?,
            description: row.get("description")?,
            confidence: row.get("confidence")?,
            frequency: row.get("frequency")?,
            data: data
                .and_then(|s| serde_json::from_str(&s).ok())
                .unwrap_or(serde_json::Value::Null),
            first_detected: get_ts(row, "first_detected")?,
            last_seen: get_ts(row, "last_seen")?,
        })
    }

    // ============================================
    // Insight operations
    // ============================================

    /// Append an insight
    pub fn insert_insight(&self, insight: &NewInsight, now: DateTime<Utc>) -> Result<Insight> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO insights (insight_type, title, message, related_goal_id, related_pattern_id, priority, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                insight.insight_type.as_str(),
                insight.title,
                insight.message,
                insight.related_goal_id,
                insight.related_pattern_id,
                insight.priority,
                fmt_ts(now),
            ],
        )?;
        let id = conn.last_insert_rowid();
        Self::fetch_insight(&conn, id)?.ok_or(Error::not_found("insight", id))
    }

    /// Get an insight by ID
    pub fn get_insight(&self, id: i64) -> Result<Option<Insight>> {
        let conn = self.conn.lock().unwrap();
        Self::fetch_insight(&conn, id)
    }

    fn fetch_insight(conn: &Connection, id: i64) -> Result<Option<Insight>> {
        conn.query_row("SELECT * FROM insights WHERE id = ?", [id], Self::row_to_insight)
            .optional()
            .map_err(Error::from)
    }

    /// Insights by priority (highest first), then newest first
    pub fn list_insights(&self, unread_only: bool) -> Result<Vec<Insight>> {
        let conn = self.conn.lock().unwrap();
        let sql = if unread_only {
            "SELECT * FROM insights WHERE is_read = 0 ORDER BY priority DESC, created_at DESC, id DESC"
        } else {
            "SELECT * FROM insights ORDER BY priority DESC, created_at DESC, id DESC"
        };
        let mut stmt = conn.prepare(sql)?;
        let insights = stmt
            .query_map([], Self::row_to_insight)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(insights)
    }

    /// Flip `is_read`. Returns false if the insight does not exist.
    pub fn mark_insight_read(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute("UPDATE insights SET is_read = 1 WHERE id = ?", [id])?;
        Ok(changed > 0)
    }

    /// Delete an insight. Returns false if it did not exist.
    pub fn delete_insight(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute("DELETE FROM insights WHERE id = ?", [id])?;
        Ok(changed > 0)
    }

    fn row_to_insight(row: &Row) -> rusqlite::Result<Insight> {
        Ok(Insight {
            id: row.get("id")?,
            insight_type: get_enum(row, "insight_type")?,
            title: row.get("title")?,
            message: row.get("message")?,
            related_goal_id: row.get("related_goal_id")?,
            related_pattern_id: row.get("related_pattern_id")?,
            priority: row.get("priority")?,
            is_read: row.get("is_read")?,
            created_at: get_ts(row, "created_at")?,
        })
    }

    // ============================================
    // Achievement operations
    // ============================================

    /// Insert catalog entries whose name is not present yet. Returns how many were added.
    pub fn seed_achievements(&self, catalog: &[AchievementDef]) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let mut inserted = 0;
        for def in catalog {
            let requirement = Requirement {
                action: def.action.as_str().to_string(),
                target: def.target,
            };
            inserted += conn.execute(
                r#"
                INSERT OR IGNORE INTO achievements
                    (name, description, icon, points, achievement_type, requirement_data, target)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    def.name,
                    def.description,
                    def.icon,
                    def.points,
                    def.achievement_type.as_str(),
                    serde_json::to_string(&requirement)?,
                    def.target,
                ],
            )?;
        }
        Ok(inserted)
    }

    /// All achievements: unlocked (most recent first) before locked, cheapest first within
    pub fn list_achievements(&self) -> Result<Vec<Achievement>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM achievements ORDER BY unlocked_at DESC, points ASC, id ASC",
        )?;
        let achievements = stmt
            .query_map([], Self::row_to_achievement)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(achievements)
    }

    /// Achievements that have not been unlocked
    pub fn list_locked_achievements(&self) -> Result<Vec<Achievement>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM achievements WHERE unlocked_at IS NULL ORDER BY points ASC, id ASC",
        )?;
        let achievements = stmt
            .query_map([], Self::row_to_achievement)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(achievements)
    }

    /// Overwrite the progress counter
    pub fn update_achievement_progress(&self, id: i64, progress: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE achievements SET progress = ? WHERE id = ?",
            params![progress, id],
        )?;
        Ok(())
    }

    /// Set `unlocked_at` if still locked. Returns false if it was already unlocked.
    pub fn unlock_achievement(&self, id: i64, at: DateTime<Utc>) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE achievements SET unlocked_at = ? WHERE id = ? AND unlocked_at IS NULL",
            params![fmt_ts(at), id],
        )?;
        Ok(changed > 0)
    }

    fn row_to_achievement(row: &Row) -> rusqlite::Result<Achievement> {
        Ok(Achievement {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            icon: row.get("icon")?,
            points: row.get("points")?,
            achievement_type: get_enum(row, "achievement_type")?,
            requirement: get_json(row, "requirement_data")?,
            progress: row.get("progress")?,
            target: row.get("target")?,
            unlocked_at: get_opt_ts(row, "unlocked_at")?,
        })
    }

    // ============================================
    // User settings
    // ============================================

    /// Read the singleton settings row
    pub fn get_user_settings(&self) -> Result<UserSettings> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT * FROM user_settings WHERE id = 1", [], |row| {
            Ok(UserSettings {
                timezone: row.get("timezone")?,
                daily_reminder_time: row.get("daily_reminder_time")?,
                points: row.get("points")?,
                level: row.get("level")?,
                updated_at: get_ts(row, "updated_at")?,
            })
        })
        .optional()?
        .ok_or(Error::not_found("user settings", 1))
    }

    /// Write the singleton settings row
    pub fn save_user_settings(&self, settings: &UserSettings) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO user_settings (id, timezone, daily_reminder_time, points, level, updated_at)
            VALUES (1, ?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                timezone = excluded.timezone,
                daily_reminder_time = excluded.daily_reminder_time,
                points = excluded.points,
                level = excluded.level,
                updated_at = excluded.updated_at
            "#,
            params![
                settings.timezone,
                settings.daily_reminder_time,
                settings.points,
                settings.level,
                fmt_ts(settings.updated_at),
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Local};

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    #[test]
    fn test_journal_crud() {
        let db = test_db();

        let entry = db
            .insert_journal_entry(&NewJournalEntry {
                title: Some("Monday".to_string()),
                mood: Some(4),
                tags: vec!["work".to_string(), "work".to_string(), "gym".to_string()],
                ..NewJournalEntry::new("Long day at work")
            })
            .unwrap();
        assert_eq!(entry.tags, vec!["work", "gym"]);
        assert_eq!(entry.mood, Some(4));

        let updated = db
            .update_journal_entry(
                entry.id,
                &JournalUpdate {
                    energy_level: Some(2),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.mood, Some(4), "unset fields are kept");
        assert_eq!(updated.energy_level, Some(2));
        assert_eq!(updated.content, "Long day at work");

        assert!(db.delete_journal_entry(entry.id).unwrap());
        assert!(!db.delete_journal_entry(entry.id).unwrap());
        assert!(db.get_journal_entry(entry.id).unwrap().is_none());
    }

    #[test]
    fn test_journal_rejects_blank_content() {
        let db = test_db();
        let err = db.insert_journal_entry(&NewJournalEntry::new("")).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_update_missing_entry_is_not_found() {
        let db = test_db();
        let err = db
            .update_journal_entry(42, &JournalUpdate::default())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::NotFound {
                entity: "journal entry",
                id: 42
            }
        ));
    }

    #[test]
    fn test_journal_filter() {
        let db = test_db();
        let now = Utc::now();
        for (i, (content, mood, tag)) in [
            ("Ran five miles", 5, "health"),
            ("Stressful meeting", 2, "work"),
            ("Quiet evening reading", 4, "rest"),
        ]
        .into_iter()
        .enumerate()
        {
            db.insert_journal_entry(&NewJournalEntry {
                mood: Some(mood),
                tags: vec![tag.to_string()],
                created_at: Some(now - Duration::hours(i as i64)),
                ..NewJournalEntry::new(content)
            })
            .unwrap();
        }

        let all = db.list_journal_entries(&JournalFilter::default()).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].content, "Ran five miles", "newest first");

        let happy = db
            .list_journal_entries(&JournalFilter {
                mood_min: Some(4),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(happy.len(), 2);

        let tagged = db
            .list_journal_entries(&JournalFilter {
                tags: vec!["work".to_string(), "rest".to_string()],
                ..Default::default()
            })
            .unwrap();
        assert_eq!(tagged.len(), 2);

        let searched = db
            .list_journal_entries(&JournalFilter {
                search: Some("MEETING".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(searched.len(), 1);
        assert_eq!(searched[0].mood, Some(2));

        assert_eq!(
            db.list_journal_tags().unwrap(),
            vec!["health", "rest", "work"]
        );
        assert_eq!(db.recent_journal_entries(2).unwrap().len(), 2);
    }

    #[test]
    fn test_journal_search_is_literal_and_covers_tags() {
        let db = test_db();
        for (content, tags) in [
            ("Hit 100% of my reading goal", vec![]),
            ("Finished the report at 100 words", vec![]),
            ("Tried snake_case naming", vec![]),
            ("Cooked dinner", vec!["Family".to_string()]),
        ] {
            db.insert_journal_entry(&NewJournalEntry {
                tags,
                ..NewJournalEntry::new(content)
            })
            .unwrap();
        }
        db.insert_journal_entry(&NewJournalEntry {
            mood: Some(4),
            energy_level: Some(3),
            ..NewJournalEntry::new("Good day")
        })
        .unwrap();

        let search = |term: &str| {
            db.list_journal_entries(&JournalFilter {
                search: Some(term.to_string()),
                ..Default::default()
            })
            .unwrap()
        };
        assert_eq!(search("100%").len(), 1);
        assert_eq!(search("e_c").len(), 1);
        assert_eq!(search("%").len(), 1);
        assert_eq!(search("family")[0].content, "Cooked dinner");

        // Search combined with an earlier positional parameter
        let rated = db
            .list_journal_entries(&JournalFilter {
                mood_min: Some(3),
                search: Some("day".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(rated.len(), 1);
        assert_eq!(db.recent_rated_journal_entries(10).unwrap().len(), 1);
    }

    #[test]
    fn test_goal_crud_and_ordering() {
        let db = test_db();
        let done = db
            .insert_goal(&NewGoal {
                status: GoalStatus::Completed,
                progress: 100,
                ..NewGoal::new("Read a book")
            })
            .unwrap();
        let active = db.insert_goal(&NewGoal::new("Learn Rust")).unwrap();

        let goals = db.list_goals().unwrap();
        assert_eq!(goals[0].id, active.id, "active goals sort first");
        assert_eq!(goals[1].id, done.id);

        let updated = db
            .update_goal(
                active.id,
                &GoalUpdate {
                    progress: Some(55),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.progress, 55);
        assert_eq!(updated.title, "Learn Rust");

        assert!(db
            .update_goal(
                active.id,
                &GoalUpdate {
                    progress: Some(150),
                    ..Default::default()
                }
            )
            .is_err());

        assert_eq!(
            db.list_goals_by_status(GoalStatus::Completed).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_log_completion_for_missing_habit() {
        let db = test_db();
        let err = db.log_habit_completion(7, None).unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "habit", id: 7 }));
    }

    #[test]
    fn test_habit_stats_refresh() {
        let db = test_db();
        let habit = db.insert_habit(&NewHabit::new("Meditate")).unwrap();
        let now = Utc::now();
        let today = Local::now().date_naive();

        // Two logs today count as one streak day
        db.log_habit_completion_at(habit.id, None, now, today).unwrap();
        db.log_habit_completion_at(habit.id, Some("again"), now, today)
            .unwrap();
        db.log_habit_completion_at(habit.id, None, now - Duration::days(1), today)
            .unwrap();

        let habit = db.get_habit(habit.id).unwrap().unwrap();
        assert_eq!(habit.total_completions, 3);
        assert_eq!(habit.streak_count, 2);
        assert_eq!(habit.best_streak, 2);

        // Counting from a later day breaks the streak but best_streak holds
        db.log_habit_completion_at(
            habit.id,
            None,
            now - Duration::days(10),
            today + Duration::days(5),
        )
        .unwrap();
        let habit = db.get_habit(habit.id).unwrap().unwrap();
        assert_eq!(habit.streak_count, 0);
        assert_eq!(habit.best_streak, 2);
        assert!(habit.best_streak >= habit.streak_count);
        assert_eq!(habit.total_completions, 4);

        assert_eq!(db.habit_logs(habit.id, 2).unwrap().len(), 2);
    }

    #[test]
    fn test_backfilled_logs_raise_best_streak() {
        let db = test_db();
        let habit = db.insert_habit(&NewHabit::new("Floss")).unwrap();
        let now = Utc::now();
        let today = Local::now().date_naive();

        db.log_habit_completion_at(habit.id, None, now, today).unwrap();
        for days_ago in [20, 19, 18] {
            db.log_habit_completion_at(habit.id, None, now - Duration::days(days_ago), today)
                .unwrap();
        }

        let habit = db.get_habit(habit.id).unwrap().unwrap();
        assert_eq!(habit.streak_count, 1);
        assert_eq!(habit.best_streak, 3);
    }

    #[test]
    fn test_update_habit() {
        let db = test_db();
        let habit = db.insert_habit(&NewHabit::new("Run")).unwrap();
        db.log_habit_completion(habit.id, None).unwrap();

        let updated = db
            .update_habit(
                habit.id,
                &HabitUpdate {
                    frequency: Some(HabitFrequency::Weekly),
                    target_count: Some(3),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Run");
        assert_eq!(updated.frequency, HabitFrequency::Weekly);
        assert_eq!(updated.target_count, 3);
        assert_eq!(updated.total_completions, 1);

        let invalid = HabitUpdate {
            target_count: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            db.update_habit(habit.id, &invalid),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            db.update_habit(99, &HabitUpdate::default()),
            Err(Error::NotFound { entity: "habit", id: 99 })
        ));
    }

    #[test]
    fn test_habit_delete_cascades_logs() {
        let db = test_db();
        let habit = db.insert_habit(&NewHabit::new("Stretch")).unwrap();
        db.log_habit_completion(habit.id, None).unwrap();
        assert!(db.delete_habit(habit.id).unwrap());

        let conn = db.connection();
        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM habit_logs", [], |r| r.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn test_pattern_upsert_by_identity() {
        let db = test_db();
        let first_seen = Utc::now() - Duration::days(3);
        let candidate = PatternCandidate {
            pattern_type: PatternType::MoodEnergyCorrelation,
            title: "Energy fuels your mood".to_string(),
            description: "desc".to_string(),
            confidence: 0.6,
            frequency: "consistent".to_string(),
            data: serde_json::json!({"correlation": 0.6}),
        };
        let inserted = db.upsert_pattern(&candidate, first_seen).unwrap();

        let refreshed = db
            .upsert_pattern(
                &PatternCandidate {
                    confidence: 0.8,
                    data: serde_json::json!({"correlation": 0.8}),
                    ..candidate.clone()
                },
                Utc::now(),
            )
            .unwrap();

        assert_eq!(refreshed.id, inserted.id);
        assert_eq!(refreshed.confidence, 0.8);
        assert_eq!(refreshed.first_detected, inserted.first_detected);
        assert!(refreshed.last_seen > inserted.last_seen);
        assert_eq!(db.list_patterns().unwrap().len(), 1);
        assert_eq!(db.get_pattern(inserted.id).unwrap(), Some(refreshed));

        assert!(db.delete_pattern(inserted.id).unwrap());
        assert!(db.find_pattern(candidate.pattern_type, &candidate.title).unwrap().is_none());
    }

    #[test]
    fn test_insight_read_and_weak_references() {
        let db = test_db();
        let goal = db.insert_goal(&NewGoal::new("Ship it")).unwrap();
        let insight = db
            .insert_insight(
                &NewInsight {
                    insight_type: InsightType::Tip,
                    title: "t".to_string(),
                    message: "m".to_string(),
                    related_goal_id: Some(goal.id),
                    related_pattern_id: None,
                    priority: 3,
                },
                Utc::now(),
            )
            .unwrap();
        assert!(!insight.is_read);

        assert!(db.mark_insight_read(insight.id).unwrap());
        assert!(db.list_insights(true).unwrap().is_empty());
        assert_eq!(db.list_insights(false).unwrap().len(), 1);

        db.delete_goal(goal.id).unwrap();
        let insight = db.get_insight(insight.id).unwrap().unwrap();
        assert_eq!(insight.related_goal_id, None);

        assert!(db.delete_insight(insight.id).unwrap());
        assert!(!db.mark_insight_read(insight.id).unwrap());
    }

    #[test]
    fn test_user_settings_roundtrip() {
        let db = test_db();
        let settings = db.get_user_settings().unwrap();
        assert_eq!(settings.points, 0);
        assert_eq!(settings.level, 1);

        db.save_user_settings(&settings.with_award(1200)).unwrap();
        let settings = db.get_user_settings().unwrap();
        assert_eq!(settings.points, 1200);
        assert_eq!(settings.level, 2);
    }
}
