use sqlx::SqlitePool;

use crate::error::{AppError, AppResult};
use crate::models::{Profile, Role, UserId};

const PROFILE_SELECT: &str = "
    SELECT p.user_id, u.username, p.full_name, p.phone, p.address, p.tax_id, p.role
    FROM profiles p
    JOIN users u ON u.id = p.user_id";

pub async fn find(pool: &SqlitePool, user: UserId) -> AppResult<Option<Profile>> {
    let profile = sqlx::query_as::<_, Profile>(&format!("{PROFILE_SELECT} WHERE p.user_id = $1"))
        .bind(user)
        .fetch_optional(pool)
        .await?;
    Ok(profile)
}

/// The profile of an authenticated user. Its absence is a data fault, not a 404.
pub async fn get(pool: &SqlitePool, user: UserId) -> AppResult<Profile> {
    find(pool, user).await?.ok_or(AppError::DataIntegrity)
}

/// Guard clause in front of every role-specific action.
pub async fn require_role(pool: &SqlitePool, user: UserId, role: Role) -> AppResult<Profile> {
    let profile = get(pool, user).await?;
    if profile.role != role {
        let message = match role {
            Role::Professional => "only professionals can do this",
            Role::Client => "only clients can do this",
        };
        return Err(AppError::Forbidden(message.to_owned()));
    }
    Ok(profile)
}

#[derive(Debug, Clone, Default)]
pub struct ContactUpdate {
    pub full_name: String,
    pub phone: String,
    pub address: String,
    /// `None` keeps the stored tax id.
    pub tax_id: Option<String>,
}

/// Role is not editable.
pub async fn update_contact(pool: &SqlitePool, user: UserId, update: ContactUpdate) -> AppResult<Profile> {
    let result = sqlx::query(
        "UPDATE profiles
         SET full_name = $1, phone = $2, address = $3, tax_id = COALESCE($4, tax_id)
         WHERE user_id = $5",
    )
    .bind(&update.full_name)
    .bind(&update.phone)
    .bind(&update.address)
    .bind(&update.tax_id)
    .bind(user)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::DataIntegrity);
    }
    get(pool, user).await
}
