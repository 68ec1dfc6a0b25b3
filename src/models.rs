use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Serialize, Serializer};
use sqlx::FromRow;

use crate::error::AppError;

pub type UserId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Professional,
}

impl Role {
    pub fn dashboard(self) -> &'static str {
        match self {
            Role::Client => "/cliente/dashboard/",
            Role::Professional => "/profissional/dashboard/",
        }
    }
}

impl FromStr for Role {
    type Err = AppError;

    /// Anything other than `profissional`/`professional` registers a client.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "profissional" | "professional" => Ok(Role::Professional),
            _ => Ok(Role::Client),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Profile {
    pub user_id: UserId,
    pub username: String,
    pub full_name: String,
    pub phone: String,
    pub address: String,
    pub tax_id: String,
    pub role: Role,
}

impl Profile {
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            &self.username
        } else {
            &self.full_name
        }
    }
}

/// Money amount in cents, rendered with two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, sqlx::Type)]
#[sqlx(transparent)]
pub struct Price(i64);

impl Price {
    pub fn from_cents(cents: i64) -> Self {
        Price(cents)
    }

    pub fn cents(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for Price {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::Validation(format!("invalid price: {s:?}"));
        let s = s.trim().replace(',', ".");
        let (whole, frac) = match s.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (s.as_str(), ""),
        };
        if whole.is_empty() || frac.len() > 2 {
            return Err(invalid());
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let frac: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };
        whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac))
            .map(Price)
            .ok_or_else(invalid)
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Service {
    pub id: i64,
    pub professional_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub price: Price,
    /// Minutes.
    pub duration: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Slot {
    pub id: i64,
    pub professional_id: UserId,
    pub service_id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub available: bool,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Booking {
    pub id: i64,
    pub client_id: UserId,
    pub professional_id: UserId,
    pub service_id: i64,
    pub slot_id: i64,
    pub created_at: DateTime<Utc>,
}

/// A booking joined with the names a dashboard shows next to it.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BookingDetails {
    pub id: i64,
    pub client_id: UserId,
    pub client_name: String,
    pub professional_id: UserId,
    pub professional_name: String,
    pub service_id: i64,
    pub service_name: String,
    pub slot_id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProfessionalSummary {
    pub id: UserId,
    #[serde(rename = "nome")]
    pub name: String,
}

/// Accepts `YYYY-MM-DD`.
pub fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid date: {raw:?}")))
}

/// Accepts a bare hour (`"09"`), `HH:MM` or `HH:MM:SS`.
pub fn parse_time(raw: &str) -> Result<NaiveTime, AppError> {
    let raw = raw.trim();
    let invalid = || AppError::Validation(format!("invalid time: {raw:?}"));
    if !raw.contains(':') {
        let hour: u32 = raw.parse().map_err(|_| invalid())?;
        return NaiveTime::from_hms_opt(hour, 0, 0).ok_or_else(invalid);
    }
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|_| invalid())
}
