use std::str::FromStr;
use std::time::Duration;

use log::info;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::config::Config;

pub async fn get_db_pool(config: &Config) -> Result<SqlitePool, sqlx::Error> {
    let pool = connect(&config.database_url, config.database_max_connections).await?;
    migrate(&pool).await?;
    Ok(pool)
}

/// Opens a pool without running migrations.
///
/// A writer that finds the database locked waits up to the busy timeout
/// instead of failing, so concurrent reservations serialize on the slot row.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    info!("connecting to {database_url} (max {max_connections} connections)");
    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
}

/// Creates the schema. Safe to run on every start.
///
/// Foreign keys carry no `ON DELETE CASCADE`: removing a service goes through
/// `catalog::delete`, which deletes dependents explicitly and in order.
pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

const SCHEMA: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS sessions (
        token TEXT PRIMARY KEY,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        created_at TEXT NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS profiles (
        user_id INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
        full_name TEXT NOT NULL,
        phone TEXT NOT NULL,
        address TEXT NOT NULL,
        tax_id TEXT NOT NULL,
        role TEXT NOT NULL CHECK (role IN ('client', 'professional'))
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS services (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        professional_id INTEGER NOT NULL REFERENCES users(id),
        name TEXT NOT NULL,
        description TEXT,
        price INTEGER NOT NULL CHECK (price >= 0),
        duration INTEGER NOT NULL CHECK (duration > 0)
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS profile_services (
        profile_id INTEGER NOT NULL REFERENCES profiles(user_id),
        service_id INTEGER NOT NULL REFERENCES services(id),
        PRIMARY KEY (profile_id, service_id)
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS slots (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        professional_id INTEGER NOT NULL REFERENCES users(id),
        service_id INTEGER NOT NULL REFERENCES services(id),
        date TEXT NOT NULL,
        time TEXT NOT NULL,
        available BOOLEAN NOT NULL DEFAULT 1
    )
    ",
    r"
    CREATE INDEX IF NOT EXISTS idx_slots_lookup
        ON slots (professional_id, date, time, available)
    ",
    r"
    CREATE TABLE IF NOT EXISTS bookings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        client_id INTEGER NOT NULL REFERENCES users(id),
        professional_id INTEGER NOT NULL REFERENCES users(id),
        service_id INTEGER NOT NULL REFERENCES services(id),
        slot_id INTEGER NOT NULL UNIQUE REFERENCES slots(id),
        created_at TEXT NOT NULL
    )
    ",
];
