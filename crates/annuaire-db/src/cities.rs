//! City cache operations.
//!
//! A city row is written once, the first time its name is resolved, and is the
//! only source of coordinates for that name afterwards.

use annuaire_core::Timestamp;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};

/// A cached city resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    /// Auto-assigned identifier
    pub id: i64,
    /// Lookup key (exact match)
    pub name: String,
    /// Postal code, when known
    pub postal_code: Option<String>,
    /// Center latitude in decimal degrees
    pub center_lat: f64,
    /// Center longitude in decimal degrees
    pub center_lng: f64,
    /// Bounding polygon as `lon1,lat1,...,lonN,latN`
    pub bbox: String,
    /// When the row was created (RFC3339)
    pub created_at: String,
}

/// Fields needed to cache a freshly resolved city.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCity {
    /// Lookup key
    pub name: String,
    /// Center latitude
    pub center_lat: f64,
    /// Center longitude
    pub center_lng: f64,
    /// Serialized bounding polygon
    pub bbox: String,
}

const SELECT_COLUMNS: &str =
    "SELECT city_id, city_name, postal_code, center_lat, center_lng, bbox, created_at FROM cities";

/// Find a city by exact name.
///
/// # Errors
/// Returns `sqlx::Error` if the database query fails.
pub async fn find_by_name(pool: &Pool<Sqlite>, name: &str) -> Result<Option<City>, sqlx::Error> {
    let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE city_name = ?"))
        .bind(name)
        .fetch_optional(pool)
        .await?;

    row.map(|r| city_from_row(&r)).transpose()
}

/// Get a city by identifier.
///
/// # Errors
/// Returns `sqlx::Error` if the database query fails.
pub async fn get_by_id(pool: &Pool<Sqlite>, id: i64) -> Result<Option<City>, sqlx::Error> {
    let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE city_id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(|r| city_from_row(&r)).transpose()
}

/// Insert a city, or return the existing row if the name is already cached.
///
/// The insert commits on its own. When another run cached the same name first,
/// the stored row wins and `new_city` is discarded.
///
/// # Errors
/// Returns `sqlx::Error` if the insert or the follow-up read fails.
pub async fn insert_or_get(pool: &Pool<Sqlite>, new_city: &NewCity) -> Result<City, sqlx::Error> {
    let created_at = Timestamp::now().to_rfc3339();

    let result = sqlx::query(
        "INSERT INTO cities (city_name, center_lat, center_lng, bbox, created_at)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(city_name) DO NOTHING",
    )
    .bind(&new_city.name)
    .bind(new_city.center_lat)
    .bind(new_city.center_lng)
    .bind(&new_city.bbox)
    .bind(&created_at)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        tracing::warn!(
            "City {} was already cached, keeping the stored coordinates",
            new_city.name
        );
    }

    find_by_name(pool, &new_city.name)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

/// List all cached cities ordered by name.
///
/// # Errors
/// Returns `sqlx::Error` if the database query fails.
pub async fn list(pool: &Pool<Sqlite>) -> Result<Vec<City>, sqlx::Error> {
    let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY city_name"))
        .fetch_all(pool)
        .await?;

    rows.iter().map(city_from_row).collect()
}

fn city_from_row(row: &SqliteRow) -> Result<City, sqlx::Error> {
    Ok(City {
        id: row.try_get("city_id")?,
        name: row.try_get("city_name")?,
        postal_code: row.try_get("postal_code")?,
        center_lat: row.try_get("center_lat")?,
        center_lng: row.try_get("center_lng")?,
        bbox: row.try_get("bbox")?,
        created_at: row.try_get("created_at")?,
    })
}
