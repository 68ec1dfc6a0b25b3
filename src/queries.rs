//! Read-only lookups behind the booking form. A missing parameter yields an
//! empty list, never an error.

use chrono::{NaiveDate, NaiveTime};
use sqlx::SqlitePool;

use crate::error::AppResult;
use crate::models::{ProfessionalSummary, UserId};

pub async fn professionals_for_service(
    pool: &SqlitePool,
    service_id: Option<i64>,
) -> AppResult<Vec<ProfessionalSummary>> {
    let Some(service_id) = service_id else {
        return Ok(Vec::new());
    };
    let professionals = sqlx::query_as::<_, ProfessionalSummary>(
        "SELECT p.user_id AS id, COALESCE(NULLIF(p.full_name, ''), u.username) AS name
         FROM profiles p
         JOIN users u ON u.id = p.user_id
         JOIN profile_services ps ON ps.profile_id = p.user_id
         WHERE p.role = 'professional' AND ps.service_id = $1
         ORDER BY p.user_id",
    )
    .bind(service_id)
    .fetch_all(pool)
    .await?;
    Ok(professionals)
}

pub async fn open_slots(
    pool: &SqlitePool,
    professional: Option<UserId>,
    date: Option<NaiveDate>,
) -> AppResult<Vec<NaiveTime>> {
    let (Some(professional), Some(date)) = (professional, date) else {
        return Ok(Vec::new());
    };
    let times = sqlx::query_scalar(
        "SELECT DISTINCT time FROM slots
         WHERE professional_id = $1 AND date = $2 AND available = 1
         ORDER BY time",
    )
    .bind(professional)
    .bind(date)
    .fetch_all(pool)
    .await?;
    Ok(times)
}

/// Every professional, for the booking form.
pub async fn professionals(pool: &SqlitePool) -> AppResult<Vec<ProfessionalSummary>> {
    let professionals = sqlx::query_as::<_, ProfessionalSummary>(
        "SELECT p.user_id AS id, COALESCE(NULLIF(p.full_name, ''), u.username) AS name
         FROM profiles p
         JOIN users u ON u.id = p.user_id
         WHERE p.role = 'professional'
         ORDER BY p.user_id",
    )
    .fetch_all(pool)
    .await?;
    Ok(professionals)
}
