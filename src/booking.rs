//! Reservation state machine.
//!
//! A slot is OPEN (`available = 1`, no booking) or RESERVED (`available = 0`,
//! exactly one booking). Every transition flips the flag with a conditional
//! update and writes the booking row in the same transaction, so the flag and
//! the booking table never disagree.

use chrono::{NaiveDate, NaiveTime, Utc};
use log::info;
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::{AppError, AppResult};
use crate::models::{Booking, BookingDetails, Role, Slot, UserId};
use crate::profile;

const BOOKING_COLUMNS: &str = "id, client_id, professional_id, service_id, slot_id, created_at";

const DETAILS_SELECT: &str = "
    SELECT b.id,
           b.client_id,
           COALESCE(NULLIF(cp.full_name, ''), cu.username) AS client_name,
           b.professional_id,
           COALESCE(NULLIF(pp.full_name, ''), pu.username) AS professional_name,
           b.service_id,
           s.name AS service_name,
           b.slot_id,
           sl.date,
           sl.time,
           b.created_at
    FROM bookings b
    JOIN users cu ON cu.id = b.client_id
    LEFT JOIN profiles cp ON cp.user_id = b.client_id
    JOIN users pu ON pu.id = b.professional_id
    LEFT JOIN profiles pp ON pp.user_id = b.professional_id
    JOIN services s ON s.id = b.service_id
    JOIN slots sl ON sl.id = b.slot_id";

/// Flips one open slot at (`date`, `time`) to reserved and returns it.
///
/// The `available = 1` guard on the update itself is what makes two racing
/// callers end with one winner: the loser's update matches no row.
async fn claim_open_slot(
    conn: &mut SqliteConnection,
    professional: UserId,
    date: NaiveDate,
    time: NaiveTime,
) -> AppResult<Option<Slot>> {
    let slot = sqlx::query_as::<_, Slot>(
        "UPDATE slots SET available = 0
         WHERE available = 1
           AND id = (SELECT id FROM slots
                     WHERE professional_id = $1 AND date = $2 AND time = $3 AND available = 1
                     ORDER BY id LIMIT 1)
         RETURNING id, professional_id, service_id, date, time, available",
    )
    .bind(professional)
    .bind(date)
    .bind(time)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(slot)
}

pub async fn reserve(
    pool: &SqlitePool,
    client: UserId,
    service_id: i64,
    professional: UserId,
    date: NaiveDate,
    time: NaiveTime,
) -> AppResult<Booking> {
    profile::require_role(pool, client, Role::Client).await?;

    let offered: Option<i64> =
        sqlx::query_scalar("SELECT id FROM services WHERE id = $1 AND professional_id = $2")
            .bind(service_id)
            .bind(professional)
            .fetch_optional(pool)
            .await?;
    if offered.is_none() {
        return Err(AppError::NotFound);
    }

    let mut tx = pool.begin().await?;
    let slot = claim_open_slot(&mut tx, professional, date, time)
        .await?
        .ok_or(AppError::SlotUnavailable)?;
    let booking = sqlx::query_as::<_, Booking>(&format!(
        "INSERT INTO bookings (client_id, professional_id, service_id, slot_id, created_at)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {BOOKING_COLUMNS}"
    ))
    .bind(client)
    .bind(professional)
    .bind(service_id)
    .bind(slot.id)
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    info!(
        "client {client} booked slot {} ({date} {time}) with professional {professional}",
        slot.id
    );
    Ok(booking)
}

/// Cancels on behalf of either participant and reopens the slot.
pub async fn cancel(pool: &SqlitePool, actor: UserId, booking_id: i64) -> AppResult<Booking> {
    let mut tx = pool.begin().await?;
    let deleted = sqlx::query_as::<_, Booking>(&format!(
        "DELETE FROM bookings
         WHERE id = $1 AND (client_id = $2 OR professional_id = $2)
         RETURNING {BOOKING_COLUMNS}"
    ))
    .bind(booking_id)
    .bind(actor)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(booking) = deleted else {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM bookings WHERE id = $1")
            .bind(booking_id)
            .fetch_optional(&mut *tx)
            .await?;
        return Err(match exists {
            Some(_) => AppError::Forbidden("you cannot cancel this booking".to_owned()),
            None => AppError::NotFound,
        });
    };

    sqlx::query("UPDATE slots SET available = 1 WHERE id = $1")
        .bind(booking.slot_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!("user {actor} cancelled booking {booking_id}, slot {} reopened", booking.slot_id);
    Ok(booking)
}

/// Moves a booking to another open slot of the same professional.
///
/// The new slot is claimed before the old one is released, so a failed move
/// leaves the booking where it was.
pub async fn reschedule(
    pool: &SqlitePool,
    professional: UserId,
    booking_id: i64,
    date: NaiveDate,
    time: NaiveTime,
) -> AppResult<Booking> {
    let mut tx = pool.begin().await?;

    // Write first: the transaction holds the write lock from its first statement.
    let claimed = claim_open_slot(&mut tx, professional, date, time).await?;

    let current = sqlx::query_as::<_, (i64, NaiveDate, NaiveTime)>(
        "SELECT b.slot_id, sl.date, sl.time
         FROM bookings b JOIN slots sl ON sl.id = b.slot_id
         WHERE b.id = $1 AND b.professional_id = $2",
    )
    .bind(booking_id)
    .bind(professional)
    .fetch_optional(&mut *tx)
    .await?;
    let Some((old_slot, old_date, old_time)) = current else {
        return Err(AppError::NotFound);
    };

    let Some(new_slot) = claimed else {
        if (old_date, old_time) == (date, time) {
            return get_booking(&mut tx, booking_id).await;
        }
        return Err(AppError::SlotUnavailable);
    };

    sqlx::query("UPDATE slots SET available = 1 WHERE id = $1")
        .bind(old_slot)
        .execute(&mut *tx)
        .await?;
    let booking = sqlx::query_as::<_, Booking>(&format!(
        "UPDATE bookings SET slot_id = $1 WHERE id = $2 RETURNING {BOOKING_COLUMNS}"
    ))
    .bind(new_slot.id)
    .bind(booking_id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    info!(
        "professional {professional} moved booking {booking_id} from slot {old_slot} to {}",
        new_slot.id
    );
    Ok(booking)
}

async fn get_booking(conn: &mut SqliteConnection, booking_id: i64) -> AppResult<Booking> {
    sqlx::query_as::<_, Booking>(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"))
        .bind(booking_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn list_for_client(pool: &SqlitePool, client: UserId) -> AppResult<Vec<BookingDetails>> {
    let bookings = sqlx::query_as::<_, BookingDetails>(&format!(
        "{DETAILS_SELECT} WHERE b.client_id = $1 ORDER BY sl.date, sl.time, b.id"
    ))
    .bind(client)
    .fetch_all(pool)
    .await?;
    Ok(bookings)
}

pub async fn list_for_professional(
    pool: &SqlitePool,
    professional: UserId,
) -> AppResult<Vec<BookingDetails>> {
    let bookings = sqlx::query_as::<_, BookingDetails>(&format!(
        "{DETAILS_SELECT} WHERE b.professional_id = $1 ORDER BY sl.date, sl.time, b.id"
    ))
    .bind(professional)
    .fetch_all(pool)
    .await?;
    Ok(bookings)
}

pub async fn get_for_professional(
    pool: &SqlitePool,
    professional: UserId,
    booking_id: i64,
) -> AppResult<BookingDetails> {
    sqlx::query_as::<_, BookingDetails>(&format!(
        "{DETAILS_SELECT} WHERE b.id = $1 AND b.professional_id = $2"
    ))
    .bind(booking_id)
    .bind(professional)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound)
}
