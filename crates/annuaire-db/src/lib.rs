//! Annuaire Database Layer
//!
//! Provides the `SQLite` cache of resolved cities and the providers found for them.
//! Uses `SQLx` with embedded migrations.
//!
//! # Example
//!
//! ```ignore
//! use annuaire_db::{cities, Database};
//!
//! let db = Database::new("ameli_providers.db").await?;
//! db.run_migrations().await?;
//! let cached = cities::find_by_name(db.pool(), "Marseille").await?;
//! db.close().await;
//! ```
//!
//! # Schema
//!
//! - `cities`: one row per distinct city name (unique index), never updated
//! - `providers`: many rows per city, linked through `city_id`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod cities;
pub mod connection;
pub mod error;
pub mod migrations;
pub mod providers;

// Re-export commonly used types
pub use cities::{City, NewCity};
pub use error::{DatabaseError, Result};
pub use providers::{NewProvider, Provider};

use std::path::Path;

/// High-level database handle owning the connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: sqlx::Pool<sqlx::Sqlite>,
}

impl Database {
    /// Open (creating if needed) the cache at `path`, or `:memory:` for an in-memory cache.
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
    pub async fn close(self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }
}
