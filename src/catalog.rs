//! Services offered by professionals.
//!
//! Every lookup filters on the owner, so a service that belongs to someone
//! else is reported as [`AppError::NotFound`].

use log::info;
use sqlx::SqlitePool;

use crate::error::{AppError, AppResult};
use crate::models::{Price, Role, Service, UserId};
use crate::profile;

#[derive(Debug, Clone)]
pub struct ServiceInput {
    pub name: String,
    pub description: Option<String>,
    pub price: Price,
    pub duration: i64,
}

impl ServiceInput {
    fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("service name is required".to_owned()));
        }
        if self.price.cents() < 0 {
            return Err(AppError::Validation("price cannot be negative".to_owned()));
        }
        if self.duration <= 0 {
            return Err(AppError::Validation(
                "duration must be a positive number of minutes".to_owned(),
            ));
        }
        Ok(())
    }
}

/// What a cascading delete removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Removed {
    pub bookings: u64,
    pub slots: u64,
}

pub async fn create(pool: &SqlitePool, owner: UserId, input: ServiceInput) -> AppResult<Service> {
    profile::require_role(pool, owner, Role::Professional).await?;
    input.validate()?;

    let mut tx = pool.begin().await?;
    let service = sqlx::query_as::<_, Service>(
        "INSERT INTO services (professional_id, name, description, price, duration)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id, professional_id, name, description, price, duration",
    )
    .bind(owner)
    .bind(input.name.trim())
    .bind(&input.description)
    .bind(input.price)
    .bind(input.duration)
    .fetch_one(&mut *tx)
    .await?;
    sqlx::query("INSERT OR IGNORE INTO profile_services (profile_id, service_id) VALUES ($1, $2)")
        .bind(owner)
        .bind(service.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!("user {owner} created service {} ({})", service.id, service.name);
    Ok(service)
}

pub async fn list(pool: &SqlitePool, owner: UserId) -> AppResult<Vec<Service>> {
    let services = sqlx::query_as::<_, Service>(
        "SELECT id, professional_id, name, description, price, duration
         FROM services WHERE professional_id = $1 ORDER BY id",
    )
    .bind(owner)
    .fetch_all(pool)
    .await?;
    Ok(services)
}

/// Every service, for the client booking form.
pub async fn list_all(pool: &SqlitePool) -> AppResult<Vec<Service>> {
    let services = sqlx::query_as::<_, Service>(
        "SELECT id, professional_id, name, description, price, duration FROM services ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(services)
}

pub async fn get(pool: &SqlitePool, owner: UserId, id: i64) -> AppResult<Service> {
    sqlx::query_as::<_, Service>(
        "SELECT id, professional_id, name, description, price, duration
         FROM services WHERE id = $1 AND professional_id = $2",
    )
    .bind(id)
    .bind(owner)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound)
}

/// Updates in place and makes sure the owner's profile still lists the service.
pub async fn update(pool: &SqlitePool, owner: UserId, id: i64, input: ServiceInput) -> AppResult<Service> {
    input.validate()?;

    let mut tx = pool.begin().await?;
    let service = sqlx::query_as::<_, Service>(
        "UPDATE services SET name = $1, description = $2, price = $3, duration = $4
         WHERE id = $5 AND professional_id = $6
         RETURNING id, professional_id, name, description, price, duration",
    )
    .bind(input.name.trim())
    .bind(&input.description)
    .bind(input.price)
    .bind(input.duration)
    .bind(id)
    .bind(owner)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound)?;
    sqlx::query("INSERT OR IGNORE INTO profile_services (profile_id, service_id) VALUES ($1, $2)")
        .bind(owner)
        .bind(service.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(service)
}

/// Removes the service with its bookings and slots in one transaction.
///
/// Bookings go first (they reference slots), then slots, then the profile
/// links, then the service. A booking of this service that sits on a slot of
/// another service gives that slot back.
pub async fn delete(pool: &SqlitePool, owner: UserId, id: i64) -> AppResult<Removed> {
    let mut tx = pool.begin().await?;

    let owned: Option<i64> =
        sqlx::query_scalar("SELECT id FROM services WHERE id = $1 AND professional_id = $2")
            .bind(id)
            .bind(owner)
            .fetch_optional(&mut *tx)
            .await?;
    if owned.is_none() {
        return Err(AppError::NotFound);
    }

    sqlx::query(
        "UPDATE slots SET available = 1
         WHERE service_id != $1
           AND id IN (SELECT slot_id FROM bookings WHERE service_id = $1)",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;

    let bookings = sqlx::query(
        "DELETE FROM bookings
         WHERE service_id = $1
            OR slot_id IN (SELECT id FROM slots WHERE service_id = $1)",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let slots = sqlx::query("DELETE FROM slots WHERE service_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    sqlx::query("DELETE FROM profile_services WHERE service_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM services WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!("user {owner} deleted service {id} with {bookings} bookings and {slots} slots");
    Ok(Removed { bookings, slots })
}
