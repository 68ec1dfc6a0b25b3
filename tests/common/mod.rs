// Shared fixtures for integration tests. Not every test binary uses every helper.
#![allow(dead_code, clippy::unwrap_used)]

use chrono::{NaiveDate, NaiveTime};
use slotbook::auth::{self, NewAccount};
use slotbook::catalog::{self, ServiceInput};
use slotbook::db;
use slotbook::models::{Price, Role, Service, UserId};
use sqlx::SqlitePool;

/// Lowest cost bcrypt accepts; keeps registration fast in tests.
pub const TEST_BCRYPT_COST: u32 = 4;

/// A fresh in-memory database with the schema applied.
///
/// One connection only: every pool connection would otherwise need to agree
/// on the same in-memory database.
pub async fn test_pool() -> SqlitePool {
    let pool = db::connect("sqlite::memory:", 1).await.unwrap();
    db::migrate(&pool).await.unwrap();
    pool
}

pub async fn register(pool: &SqlitePool, username: &str, role: Role) -> UserId {
    auth::register(
        pool,
        TEST_BCRYPT_COST,
        NewAccount {
            username: username.to_owned(),
            password: "secret".to_owned(),
            full_name: format!("{username} Silva"),
            phone: "555-0100".to_owned(),
            address: "Rua A, 1".to_owned(),
            tax_id: "000.000.000-00".to_owned(),
            role,
        },
    )
    .await
    .unwrap()
}

pub async fn haircut(pool: &SqlitePool, owner: UserId) -> Service {
    catalog::create(
        pool,
        owner,
        ServiceInput {
            name: "Haircut".to_owned(),
            description: Some("Classic cut".to_owned()),
            price: "50.00".parse::<Price>().unwrap(),
            duration: 30,
        },
    )
    .await
    .unwrap()
}

pub fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
}

pub fn time(raw: &str) -> NaiveTime {
    slotbook::models::parse_time(raw).unwrap()
}

pub fn times(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|t| (*t).to_owned()).collect()
}

/// Every reserved slot has exactly one booking and every open slot has none.
pub async fn assert_slots_consistent(pool: &SqlitePool) {
    let rows: Vec<(i64, bool, i64)> = sqlx::query_as(
        "SELECT s.id, s.available, COUNT(b.id)
         FROM slots s LEFT JOIN bookings b ON b.slot_id = s.id
         GROUP BY s.id, s.available",
    )
    .fetch_all(pool)
    .await
    .unwrap();
    for (slot, available, bookings) in rows {
        if available {
            assert_eq!(bookings, 0, "open slot {slot} has {bookings} bookings");
        } else {
            assert_eq!(bookings, 1, "reserved slot {slot} has {bookings} bookings");
        }
    }
}

pub async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}
