//! Database layer for growthlog
//!
//! This module provides the storage layer using SQLite with:
//! - Schema migrations
//! - Repository pattern for queries
//! - Read-modify-write helpers for habit statistics and pattern upserts

pub mod repo;
pub mod schema;

pub use repo::Database;
