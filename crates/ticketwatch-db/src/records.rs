//! Ticket record persistence.
//!
//! Records are keyed by ticket id and written at most once: a second insert
//! for the same id is a no-op.

use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};
use ticketwatch_core::{TicketId, TicketRecord};

/// Look up a record by id.
///
/// # Errors
/// Returns `sqlx::Error` if the query fails or the stored timestamp is invalid.
pub async fn find_record(
    pool: &Pool<Sqlite>,
    id: &TicketId,
) -> Result<Option<TicketRecord>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT id, officer, department, latitude, longitude, location, issued_at
         FROM tickets WHERE id = ?",
    )
    .bind(id.as_str())
    .fetch_optional(pool)
    .await?;

    row.map(|row| parse_record(&row)).transpose()
}

/// Insert a record unless one with the same id exists.
///
/// Returns `true` if a row was inserted.
///
/// # Errors
/// Returns `sqlx::Error` if the insert fails.
pub async fn create_record(pool: &Pool<Sqlite>, record: &TicketRecord) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO tickets (id, officer, department, latitude, longitude, location, issued_at, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO NOTHING",
    )
    .bind(record.id.as_str())
    .bind(&record.officer)
    .bind(&record.department)
    .bind(record.latitude)
    .bind(record.longitude)
    .bind(&record.location)
    .bind(record.issued_at.to_rfc3339())
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    let inserted = result.rows_affected() == 1;
    if inserted {
        tracing::debug!("Stored ticket {}", record.id);
    } else {
        tracing::debug!("Ticket {} already stored", record.id);
    }
    Ok(inserted)
}

/// Number of stored records.
///
/// # Errors
/// Returns `sqlx::Error` if the query fails.
pub async fn count_records(pool: &Pool<Sqlite>) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM tickets")
        .fetch_one(pool)
        .await
}

fn parse_record(row: &sqlx::sqlite::SqliteRow) -> Result<TicketRecord, sqlx::Error> {
    let issued_at: String = row.try_get("issued_at")?;
    let issued_at = DateTime::parse_from_rfc3339(&issued_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
    let id: String = row.try_get("id")?;

    Ok(TicketRecord {
        id: TicketId::from(id),
        officer: row.try_get("officer")?,
        department: row.try_get("department")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        location: row.try_get("location")?,
        issued_at,
    })
}
