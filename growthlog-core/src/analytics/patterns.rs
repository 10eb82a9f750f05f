//! Pattern detection.
//!
//! Three independent detectors run over journal entries:
//!
//! | Detector | Looks at | Pattern type |
//! |----------|----------|--------------|
//! | [`mood_by_hour`] | every entry with a mood | `mood_time_correlation` |
//! | [`recurring_themes`] | the 50 most recent entries | `recurring_theme` |
//! | [`mood_energy`] | the 30 most recent entries with mood and energy | `mood_energy_correlation` |
//!
//! Each detector returns candidates; [`analyze_patterns`] upserts them by
//! `(pattern_type, title)`. Too little data is never an error, the detector
//! just stays silent.

use super::{local_hour, themes};
use crate::db::Database;
use crate::error::Result;
use crate::types::{JournalEntry, JournalFilter, Pattern, PatternCandidate, PatternType};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::BTreeMap;

/// Entries an hour needs before its mean mood is trusted
pub const MIN_ENTRIES_PER_HOUR: usize = 3;
/// Hours that need a trusted mean before comparing them
pub const MIN_HOUR_BUCKETS: usize = 3;
/// Smallest best-minus-worst mood gap worth reporting
pub const MIN_MOOD_SPREAD: f64 = 1.0;

/// Corpus size for theme detection
pub const THEME_CORPUS_SIZE: usize = 50;
pub const MIN_THEME_CORPUS: usize = 5;
pub const MIN_THEME_OCCURRENCES: usize = 3;
/// Themes must be longer than this many characters
pub const MIN_THEME_CHARS: usize = 3;
pub const MAX_THEMES: usize = 3;

/// Sample size for the mood/energy correlation
pub const CORRELATION_SAMPLE_SIZE: usize = 30;
pub const MIN_CORRELATION_SAMPLE: usize = 5;
/// Weakest |r| worth reporting
pub const MIN_CORRELATION: f64 = 0.5;

fn period_of_day(hour: u32) -> &'static str {
    match hour {
        0..=11 => "morning",
        12..=16 => "afternoon",
        _ => "evening",
    }
}

/// Hour of day with the best mean mood, if it clearly beats the worst one.
pub fn mood_by_hour(entries: &[JournalEntry]) -> Option<PatternCandidate> {
    let mut buckets: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for entry in entries {
        if let Some(mood) = entry.mood {
            buckets
                .entry(local_hour(entry.created_at))
                .or_default()
                .push(f64::from(mood));
        }
    }

    // (hour, mean) in ascending hour order
    let hourly: Vec<(u32, f64)> = buckets
        .into_iter()
        .filter(|(_, moods)| moods.len() >= MIN_ENTRIES_PER_HOUR)
        .map(|(hour, moods)| (hour, moods.iter().sum::<f64>() / moods.len() as f64))
        .collect();

    if hourly.len() < MIN_HOUR_BUCKETS {
        tracing::debug!(buckets = hourly.len(), "Not enough hourly mood data");
        return None;
    }

    // Strict comparisons keep the earliest hour on ties
    let mut best = hourly[0];
    let mut worst = hourly[0];
    for &(hour, avg) in &hourly[1..] {
        if avg > best.1 {
            best = (hour, avg);
        }
        if avg < worst.1 {
            worst = (hour, avg);
        }
    }

    if best.1 - worst.1 < MIN_MOOD_SPREAD {
        tracing::debug!(
            spread = best.1 - worst.1,
            "Mood does not vary enough by hour"
        );
        return None;
    }

    let quality = if best.1 >= 4.0 { "great" } else { "better" };
    Some(PatternCandidate {
        pattern_type: PatternType::MoodTimeCorrelation,
        title: format!("You shine in the {}", period_of_day(best.0)),
        description: format!(
            "Your mood tends to be {} around {}:00. Consider scheduling important tasks during this time!",
            quality, best.0
        ),
        confidence: (hourly.len() as f64 / 20.0).min(0.9),
        frequency: "recurring".to_string(),
        data: json!({
            "best_hour": best.0,
            "avg_mood": best.1,
            "worst_hour": worst.0,
        }),
    })
}

/// Terms that keep showing up in recent entries.
///
/// `entries` must be newest first.
pub fn recurring_themes(entries: &[JournalEntry]) -> Vec<PatternCandidate> {
    let corpus: Vec<&str> = entries
        .iter()
        .take(THEME_CORPUS_SIZE)
        .map(|e| e.content.as_str())
        .collect();

    if corpus.len() < MIN_THEME_CORPUS {
        tracing::debug!(entries = corpus.len(), "Not enough entries for themes");
        return Vec::new();
    }

    themes::recurring_themes(&corpus, MIN_THEME_OCCURRENCES, MIN_THEME_CHARS, MAX_THEMES)
        .into_iter()
        .map(|(theme, occurrences)| PatternCandidate {
            pattern_type: PatternType::RecurringTheme,
            title: format!("\"{}\" keeps coming up", theme),
            description: format!(
                "You've mentioned \"{}\" in {} recent entries. This seems to be on your mind a lot. Want to explore this deeper?",
                theme, occurrences
            ),
            confidence: (occurrences as f64 / 10.0).min(0.8),
            frequency: format!("{} times in recent entries", occurrences),
            data: json!({
                "theme": theme,
                "occurrences": occurrences,
            }),
        })
        .collect()
}

/// Pearson correlation coefficient.
///
/// `None` when the inputs differ in length, are empty, or either side has
/// zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.is_empty() {
        return None;
    }
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denominator = (var_x * var_y).sqrt();
    if denominator == 0.0 {
        return None;
    }
    Some(cov / denominator)
}

/// Whether mood follows energy.
///
/// Entries without both ratings are skipped; at most the first
/// [`CORRELATION_SAMPLE_SIZE`] rated entries are used.
pub fn mood_energy(entries: &[JournalEntry]) -> Option<PatternCandidate> {
    let (moods, energies): (Vec<f64>, Vec<f64>) = entries
        .iter()
        .filter_map(|e| Some((f64::from(e.mood?), f64::from(e.energy_level?))))
        .take(CORRELATION_SAMPLE_SIZE)
        .unzip();

    if moods.len() < MIN_CORRELATION_SAMPLE {
        tracing::debug!(entries = moods.len(), "Not enough rated entries");
        return None;
    }

    let r = pearson(&moods, &energies)?;
    if r.abs() < MIN_CORRELATION {
        tracing::debug!(r, "Mood/energy correlation too weak");
        return None;
    }

    let (title, description) = if r > 0.0 {
        (
            "Energy fuels your mood",
            "Your mood tends to follow your energy levels. Taking care of your physical energy (sleep, exercise, nutrition) could boost your mood!",
        )
    } else {
        (
            "Mood independent of energy",
            "Interesting! Your mood doesn't always match your energy. You might feel great even when tired, or vice versa.",
        )
    };

    Some(PatternCandidate {
        pattern_type: PatternType::MoodEnergyCorrelation,
        title: title.to_string(),
        description: description.to_string(),
        confidence: r.abs().min(0.9),
        frequency: "consistent".to_string(),
        data: json!({ "correlation": (r * 100.0).round() / 100.0 }),
    })
}

/// Run every detector over the store and persist what they find.
///
/// Returns the inserted or refreshed patterns in detector order.
pub fn analyze_patterns(db: &Database, now: DateTime<Utc>) -> Result<Vec<Pattern>> {
    let rated = db.list_journal_entries(&JournalFilter {
        mood_min: Some(1),
        ..Default::default()
    })?;
    let recent = db.recent_journal_entries(THEME_CORPUS_SIZE)?;
    let sample = db.recent_rated_journal_entries(CORRELATION_SAMPLE_SIZE)?;

    let mut candidates = Vec::new();
    candidates.extend(mood_by_hour(&rated));
    candidates.extend(recurring_themes(&recent));
    candidates.extend(mood_energy(&sample));

    let mut patterns = Vec::with_capacity(candidates.len());
    for candidate in &candidates {
        let pattern = db.upsert_pattern(candidate, now)?;
        tracing::info!(
            pattern_id = pattern.id,
            pattern_type = %pattern.pattern_type,
            title = %pattern.title,
            confidence = pattern.confidence,
            "Pattern recorded"
        );
        patterns.push(pattern);
    }

    Ok(patterns)
}
