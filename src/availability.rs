//! Bookable slots a professional opens per service and date.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveTime};
use log::info;
use sqlx::SqlitePool;

use crate::error::{AppError, AppResult};
use crate::models::{parse_time, Role, Slot, UserId};
use crate::profile;

const SLOT_COLUMNS: &str = "id, professional_id, service_id, date, time, available";

/// Hours offered by the slot creation form.
pub fn hour_options() -> Vec<String> {
    (8..=18).map(|h| format!("{h:02}")).collect()
}

/// Opens one slot per non-empty entry of `times`.
///
/// A time that already exists for the same service and date, or that repeats
/// inside the batch, is skipped. Returns only the slots created.
pub async fn create_batch(
    pool: &SqlitePool,
    professional: UserId,
    service_id: Option<i64>,
    date: Option<NaiveDate>,
    times: &[String],
) -> AppResult<Vec<Slot>> {
    profile::require_role(pool, professional, Role::Professional).await?;

    let service_id = service_id.ok_or_else(|| {
        AppError::Validation("select a service before saving the times".to_owned())
    })?;
    let times = times
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(parse_time)
        .collect::<AppResult<BTreeSet<NaiveTime>>>()?;
    let date = match date {
        Some(date) if !times.is_empty() => date,
        _ => {
            return Err(AppError::Validation(
                "select a date and at least one time".to_owned(),
            ))
        }
    };

    let mut tx = pool.begin().await?;
    let owned: Option<i64> =
        sqlx::query_scalar("SELECT id FROM services WHERE id = $1 AND professional_id = $2")
            .bind(service_id)
            .bind(professional)
            .fetch_optional(&mut *tx)
            .await?;
    if owned.is_none() {
        return Err(AppError::NotFound);
    }

    let mut created = Vec::with_capacity(times.len());
    for time in times {
        let exists: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM slots
             WHERE professional_id = $1 AND service_id = $2 AND date = $3 AND time = $4",
        )
        .bind(professional)
        .bind(service_id)
        .bind(date)
        .bind(time)
        .fetch_optional(&mut *tx)
        .await?;
        if exists.is_some() {
            continue;
        }
        let slot = sqlx::query_as::<_, Slot>(&format!(
            "INSERT INTO slots (professional_id, service_id, date, time, available)
             VALUES ($1, $2, $3, $4, 1)
             RETURNING {SLOT_COLUMNS}"
        ))
        .bind(professional)
        .bind(service_id)
        .bind(date)
        .bind(time)
        .fetch_one(&mut *tx)
        .await?;
        created.push(slot);
    }
    tx.commit().await?;

    info!(
        "user {professional} opened {} slots for service {service_id} on {date}",
        created.len()
    );
    Ok(created)
}

/// Open slots of `professional`, optionally bounded on either side (inclusive).
pub async fn list_open(
    pool: &SqlitePool,
    professional: UserId,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> AppResult<Vec<Slot>> {
    let slots = sqlx::query_as::<_, Slot>(&format!(
        "SELECT {SLOT_COLUMNS} FROM slots
         WHERE professional_id = $1 AND available = 1
           AND ($2 IS NULL OR date >= $2)
           AND ($3 IS NULL OR date <= $3)
         ORDER BY date, time, id"
    ))
    .bind(professional)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;
    Ok(slots)
}

pub async fn get(pool: &SqlitePool, professional: UserId, id: i64) -> AppResult<Slot> {
    sqlx::query_as::<_, Slot>(&format!(
        "SELECT {SLOT_COLUMNS} FROM slots WHERE id = $1 AND professional_id = $2"
    ))
    .bind(id)
    .bind(professional)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound)
}

/// Moves a slot. The availability flag, and any booking on it, stay as they are.
pub async fn update(
    pool: &SqlitePool,
    professional: UserId,
    id: i64,
    date: NaiveDate,
    time: NaiveTime,
) -> AppResult<Slot> {
    sqlx::query_as::<_, Slot>(&format!(
        "UPDATE slots SET date = $1, time = $2
         WHERE id = $3 AND professional_id = $4
         RETURNING {SLOT_COLUMNS}"
    ))
    .bind(date)
    .bind(time)
    .bind(id)
    .bind(professional)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound)
}

/// Deletes an open slot. A reserved slot must have its booking cancelled first.
pub async fn delete(pool: &SqlitePool, professional: UserId, id: i64) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM slots WHERE id = $1 AND professional_id = $2 AND available = 1")
        .bind(id)
        .bind(professional)
        .execute(pool)
        .await?;
    if result.rows_affected() == 1 {
        info!("user {professional} deleted slot {id}");
        return Ok(());
    }
    // Distinguish a reserved slot from one that is missing or not owned.
    get(pool, professional, id).await?;
    Err(AppError::SlotBooked)
}

/// The open slot a booking at (`date`, `time`) would take, if any.
pub async fn lookup_for_booking(
    pool: &SqlitePool,
    professional: UserId,
    service_id: Option<i64>,
    date: NaiveDate,
    time: NaiveTime,
) -> AppResult<Option<Slot>> {
    let slot = sqlx::query_as::<_, Slot>(&format!(
        "SELECT {SLOT_COLUMNS} FROM slots
         WHERE professional_id = $1 AND date = $2 AND time = $3 AND available = 1
           AND ($4 IS NULL OR service_id = $4)
         ORDER BY id LIMIT 1"
    ))
    .bind(professional)
    .bind(date)
    .bind(time)
    .bind(service_id)
    .fetch_optional(pool)
    .await?;
    Ok(slot)
}
