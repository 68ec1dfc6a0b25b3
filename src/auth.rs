//! Accounts, password checks and cookie sessions.

use chrono::Utc;
use log::{info, warn};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Profile, Role, UserId};
use crate::profile;

pub const SESSION_COOKIE: &str = "slotbook_session";

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub phone: String,
    pub address: String,
    pub tax_id: String,
    pub role: Role,
}

async fn hash_password(password: String, cost: u32) -> AppResult<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(AppError::from)
}

async fn verify_password(password: String, hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(AppError::from)
}

/// Creates the user and its profile together.
pub async fn register(pool: &SqlitePool, cost: u32, account: NewAccount) -> AppResult<UserId> {
    if account.username.trim().is_empty() || account.password.is_empty() {
        return Err(AppError::Validation(
            "username and password are required".to_owned(),
        ));
    }
    let password_hash = hash_password(account.password, cost).await?;

    let mut tx = pool.begin().await?;
    let taken: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE username = $1")
        .bind(&account.username)
        .fetch_optional(&mut *tx)
        .await?;
    if taken.is_some() {
        return Err(AppError::UsernameTaken);
    }

    let user_id: UserId = sqlx::query_scalar(
        "INSERT INTO users (username, password_hash, created_at) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(&account.username)
    .bind(&password_hash)
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => AppError::UsernameTaken,
        other => AppError::Database(other),
    })?;

    sqlx::query(
        "INSERT INTO profiles (user_id, full_name, phone, address, tax_id, role)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(user_id)
    .bind(&account.full_name)
    .bind(&account.phone)
    .bind(&account.address)
    .bind(&account.tax_id)
    .bind(account.role)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    info!("registered {} as {:?} (user {user_id})", account.username, account.role);
    Ok(user_id)
}

/// Unknown usernames and wrong passwords fail the same way.
pub async fn authenticate(pool: &SqlitePool, username: &str, password: &str) -> AppResult<Profile> {
    let row: Option<(UserId, String)> =
        sqlx::query_as("SELECT id, password_hash FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(pool)
            .await?;
    let Some((user_id, hash)) = row else {
        return Err(AppError::InvalidCredentials);
    };
    if !verify_password(password.to_owned(), hash).await? {
        warn!("failed login for {username}");
        return Err(AppError::InvalidCredentials);
    }
    profile::find(pool, user_id).await?.ok_or_else(|| {
        warn!("user {user_id} authenticated without a profile");
        AppError::DataIntegrity
    })
}

pub async fn set_password(pool: &SqlitePool, cost: u32, user: UserId, password: &str) -> AppResult<()> {
    let password_hash = hash_password(password.to_owned(), cost).await?;
    sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
        .bind(password_hash)
        .bind(user)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn open_session(pool: &SqlitePool, user: UserId) -> AppResult<String> {
    let token = Uuid::new_v4().simple().to_string();
    sqlx::query("INSERT INTO sessions (token, user_id, created_at) VALUES ($1, $2, $3)")
        .bind(&token)
        .bind(user)
        .bind(Utc::now())
        .execute(pool)
        .await?;
    Ok(token)
}

pub async fn resolve_session(pool: &SqlitePool, token: &str) -> AppResult<Option<UserId>> {
    let user = sqlx::query_scalar("SELECT user_id FROM sessions WHERE token = $1")
        .bind(token)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn close_session(pool: &SqlitePool, token: &str) -> AppResult<()> {
    sqlx::query("DELETE FROM sessions WHERE token = $1")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}
