//! Scraper cursor persistence.
//!
//! The cursor is a single row (`id = 1`) naming the last ticket id whose
//! resolution was committed, plus the phase the loop was last in.

use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};
use ticketwatch_core::{CursorStatus, ScraperCursor, TicketId};

/// Load the cursor, if one has been written.
///
/// # Errors
/// Returns `sqlx::Error` if the query fails.
pub async fn get_cursor(pool: &Pool<Sqlite>) -> Result<Option<ScraperCursor>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT last_checked_id, status, updated_at FROM scraper_cursor WHERE id = 1",
    )
    .fetch_optional(pool)
    .await?;

    row.map(|row| {
        let last_checked_id: String = row.try_get("last_checked_id")?;
        let status: String = row.try_get("status")?;
        let updated_at: String = row.try_get("updated_at")?;
        let updated_at = DateTime::parse_from_rfc3339(&updated_at)
            .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc));

        Ok(ScraperCursor {
            last_checked_id: TicketId::from(last_checked_id),
            status: CursorStatus::parse(&status),
            updated_at,
        })
    })
    .transpose()
}

/// Load the cursor, seeding it with `start_id` on first run.
///
/// An existing cursor is never overwritten.
///
/// # Errors
/// Returns `sqlx::Error` if the insert or query fails.
pub async fn get_or_create_cursor(
    pool: &Pool<Sqlite>,
    start_id: &TicketId,
) -> Result<ScraperCursor, sqlx::Error> {
    let inserted = sqlx::query(
        "INSERT INTO scraper_cursor (id, last_checked_id, status, updated_at)
         VALUES (1, ?, ?, ?)
         ON CONFLICT(id) DO NOTHING",
    )
    .bind(start_id.as_str())
    .bind(CursorStatus::Initialized.as_str())
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?
    .rows_affected()
        == 1;

    if inserted {
        tracing::info!("Cursor initialized at {}", start_id);
    }

    get_cursor(pool).await?.ok_or(sqlx::Error::RowNotFound)
}

/// Commit a resolved id together with a status.
///
/// # Errors
/// Returns `sqlx::Error` if the upsert fails.
pub async fn save_cursor(
    pool: &Pool<Sqlite>,
    last_checked_id: &TicketId,
    status: &CursorStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO scraper_cursor (id, last_checked_id, status, updated_at)
         VALUES (1, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
             last_checked_id = excluded.last_checked_id,
             status = excluded.status,
             updated_at = excluded.updated_at",
    )
    .bind(last_checked_id.as_str())
    .bind(status.as_str())
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Record the current phase without moving `last_checked_id`.
///
/// Returns `false` if no cursor exists yet.
///
/// # Errors
/// Returns `sqlx::Error` if the update fails.
pub async fn update_status(
    pool: &Pool<Sqlite>,
    status: &CursorStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE scraper_cursor SET status = ?, updated_at = ? WHERE id = 1")
        .bind(status.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}
