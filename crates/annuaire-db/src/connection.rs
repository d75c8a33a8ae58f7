//! `SQLite` connection pool setup.
//!
//! Opens (and creates if missing) the cache file with foreign key enforcement
//! enabled on every connection.

use crate::error::{DatabaseError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;

/// In-memory database marker accepted by [`open_pool`].
pub const IN_MEMORY: &str = ":memory:";

/// Open a connection pool on the cache file at `path` (or [`IN_MEMORY`]).
///
/// Parent directories of a file path are created as needed.
///
/// # Errors
/// Returns `DatabaseError` if:
/// - The path is not valid UTF-8
/// - The parent directory cannot be created
/// - The database file cannot be opened
pub async fn open_pool(path: impl AsRef<Path>) -> Result<Pool<Sqlite>> {
    let path = path.as_ref();
    let path_str = path.to_str().ok_or_else(|| {
        DatabaseError::Open("invalid database path: not valid UTF-8".to_string())
    })?;

    let base_options = if path_str == IN_MEMORY {
        SqliteConnectOptions::from_str(path_str)
            .map_err(|e| DatabaseError::Open(format!("invalid connection string: {e}")))?
    } else {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        SqliteConnectOptions::new().filename(path)
    };
    let connect_options = base_options.foreign_keys(true).create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options)
        .await
        .map_err(|e| DatabaseError::Open(format!("failed to open {path_str}: {e}")))?;

    tracing::info!("Database pool created at {}", path_str);

    Ok(pool)
}
