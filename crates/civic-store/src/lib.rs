//! # civic-store
//!
//! Relational storage for the civic issue platform, backed by SQLite.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every domain
//! model.  Multi-step writes (reaction toggles, resolution transitions) run
//! inside `IMMEDIATE` transactions so that each one is atomic at the store
//! level.

pub mod categories;
pub mod comments;
pub mod database;
pub mod issues;
pub mod migrations;
pub mod models;
pub mod reactions;
pub mod reports;
pub mod resolutions;
pub mod users;

mod codec;
mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
pub use reports::{CategoryCount, CategoryDailyCount, CategoryReport, DailyCount, StatusCounts};

#[cfg(test)]
pub(crate) mod test_support;
