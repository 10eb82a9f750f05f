//! # growthlog-core
//!
//! Core library for growthlog - a personal growth journal.
//!
//! This library provides:
//! - Domain types for journal entries, goals, habits and derived records
//! - Database storage layer with SQLite
//! - Analytics: streaks, statistics, patterns, insights and achievements
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Data flows through two layers:
//! - **User records:** journal entries, goals, habits and habit logs
//! - **Derived records:** patterns, insights and achievement progress (regenerable)
//!
//! ## Example
//!
//! ```rust,no_run
//! use growthlog_core::{analytics, Config, Database};
//!
//! // Load configuration
//! let config = Config::load().expect("failed to load config");
//!
//! // Open database
//! let db = Database::open(&Config::database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//! analytics::seed_catalog(&db).expect("failed to seed achievements");
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod types;
