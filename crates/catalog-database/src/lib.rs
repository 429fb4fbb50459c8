//! # catalog-database
//!
//! The generic [`Repository`] and the sqlx stores it runs on: PostgreSQL
//! for deployments, and SQLite for embedding and for tests that need a real
//! database without a server.

pub mod connection;
pub mod error;
pub mod migration;
pub mod postgres;
pub mod repository;
pub mod sql;
pub mod sqlite;

pub use connection::DatabasePool;
pub use postgres::{PgSession, PgStore};
pub use repository::Repository;
pub use sqlite::{SqliteSession, SqliteStore};
