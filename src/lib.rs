//! Service booking: professionals publish services and time slots, clients
//! reserve them.

pub mod auth;
pub mod availability;
pub mod booking;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod profile;
pub mod queries;
pub mod routes;

pub use error::{AppError, AppResult};
pub use routes::{router, AppState};
