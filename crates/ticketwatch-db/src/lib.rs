//! Ticketwatch Database Layer
//!
//! Durable store for the discovery loop: a singleton scraper cursor and the
//! table of discovered tickets. Uses `SQLx` over `SQLite` with embedded
//! migrations.
//!
//! # Example
//!
//! ```ignore
//! use ticketwatch_db::{cursor, records, Database};
//!
//! let db = Database::new("ticketwatch.db").await?;
//! db.run_migrations().await?;
//!
//! let cursor = cursor::get_or_create_cursor(db.pool(), &"cab000".into()).await?;
//! let known = records::find_record(db.pool(), &cursor.last_checked_id).await?;
//! ```
//!
//! # Design Principles
//!
//! - One row per ticket id; repeated inserts are no-ops
//! - Timestamps are stored as RFC 3339 text
//! - Query functions take `&Pool<Sqlite>` so callers can share one pool

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod connection;
pub mod cursor;
pub mod error;
pub mod migrations;
pub mod records;

// Re-export commonly used types
pub use error::{DatabaseError, Result};

use std::path::Path;

/// High-level database handle owning the connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: sqlx::Pool<sqlx::Sqlite>,
}

impl Database {
    /// Open (or create) the database at `path`. `:memory:` is accepted.
    ///
    /// # Errors
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let pool = connection::open_pool(path).await?;
        Ok(Self { pool })
    }

    /// Run all pending database migrations.
    ///
    /// # Errors
    /// Returns `DatabaseError::Migration` if any migration fails.
    pub async fn run_migrations(&self) -> Result<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Get the current schema version.
    ///
    /// # Errors
    /// Returns `DatabaseError` if the version cannot be queried.
    pub async fn get_schema_version(&self) -> Result<i64> {
        migrations::get_schema_version(&self.pool).await
    }

    /// Get a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Sqlite> {
        &self.pool
    }

    /// Close the database connection gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }
}
