//! Provider storage operations.
//!
//! Providers are written in batches, one transaction per directory search, and
//! are never updated afterwards.

use annuaire_core::Timestamp;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite, SqliteConnection};

/// A stored provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    /// Auto-assigned identifier
    pub id: i64,
    /// Provider fields as inserted
    #[serde(flatten)]
    pub fields: NewProvider,
    /// When the row was created (RFC3339)
    pub created_at: String,
}

/// A provider ready to be inserted.
///
/// Every descriptive field is optional; the directory omits them freely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewProvider {
    /// Given name
    pub first_name: Option<String>,
    /// Family name
    pub last_name: Option<String>,
    /// Specialty label
    pub specialty: Option<String>,
    /// Street address
    pub address: Option<String>,
    /// Address complement, usually the practice name
    pub office_name: Option<String>,
    /// Town as reported by the directory
    pub city: Option<String>,
    /// Postal code
    pub postal_code: Option<String>,
    /// Cached city this provider was found for
    pub city_id: i64,
    /// Latitude in decimal degrees
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees
    pub longitude: Option<f64>,
    /// Phone number
    pub phone_number: Option<String>,
    /// Accepts the Vitale insurance card
    pub vitale_card: bool,
}

/// Insert all providers in a single transaction.
///
/// Nothing is written if any insert fails. Returns the number of rows written.
///
/// # Errors
/// Returns `sqlx::Error` if the transaction cannot be opened, an insert fails,
/// or the commit fails.
pub async fn insert_batch(
    pool: &Pool<Sqlite>,
    providers: &[NewProvider],
) -> Result<usize, sqlx::Error> {
    if providers.is_empty() {
        return Ok(0);
    }

    let created_at = Timestamp::now().to_rfc3339();
    let mut tx = pool.begin().await?;

    for provider in providers {
        if let Err(e) = insert_one(&mut tx, provider, &created_at).await {
            tracing::error!("Provider insert failed, rolling back batch: {}", e);
            tx.rollback().await?;
            return Err(e);
        }
    }

    tx.commit().await?;

    Ok(providers.len())
}

async fn insert_one(
    conn: &mut SqliteConnection,
    provider: &NewProvider,
    created_at: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO providers (first_name, last_name, specialty, address, office_name, city,
                                postal_code, city_id, latitude, longitude, phone_number,
                                vitale_card, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&provider.first_name)
    .bind(&provider.last_name)
    .bind(&provider.specialty)
    .bind(&provider.address)
    .bind(&provider.office_name)
    .bind(&provider.city)
    .bind(&provider.postal_code)
    .bind(provider.city_id)
    .bind(provider.latitude)
    .bind(provider.longitude)
    .bind(&provider.phone_number)
    .bind(provider.vitale_card)
    .bind(created_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// List providers found for a city, ordered by family then given name.
///
/// # Errors
/// Returns `sqlx::Error` if the database query fails.
pub async fn list_by_city(
    pool: &Pool<Sqlite>,
    city_id: i64,
) -> Result<Vec<Provider>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT provider_id, first_name, last_name, specialty, address, office_name, city,
                postal_code, city_id, latitude, longitude, phone_number, vitale_card, created_at
         FROM providers
         WHERE city_id = ?
         ORDER BY last_name, first_name, provider_id",
    )
    .bind(city_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(provider_from_row).collect()
}

/// Count providers stored for a city.
///
/// # Errors
/// Returns `sqlx::Error` if the database query fails.
pub async fn count_by_city(pool: &Pool<Sqlite>, city_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM providers WHERE city_id = ?")
        .bind(city_id)
        .fetch_one(pool)
        .await
}

fn provider_from_row(row: &SqliteRow) -> Result<Provider, sqlx::Error> {
    Ok(Provider {
        id: row.try_get("provider_id")?,
        fields: NewProvider {
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            specialty: row.try_get("specialty")?,
            address: row.try_get("address")?,
            office_name: row.try_get("office_name")?,
            city: row.try_get("city")?,
            postal_code: row.try_get("postal_code")?,
            city_id: row.try_get("city_id")?,
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
            phone_number: row.try_get("phone_number")?,
            vitale_card: row.try_get("vitale_card")?,
        },
        created_at: row.try_get("created_at")?,
    })
}
