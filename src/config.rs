use std::env;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use dotenvy::dotenv;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: SocketAddr,
    pub bcrypt_cost: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: "sqlite://slotbook.db".to_owned(),
            database_max_connections: 5,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Config {
    /// Reads the process environment, after loading `.env` if one exists.
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        let defaults = Config::default();

        let database_url = env::var("DATABASE_URL").unwrap_or(defaults.database_url);
        let database_max_connections = match env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("DATABASE_MAX_CONNECTIONS is not a number: {raw}"))?,
            Err(_) => defaults.database_max_connections,
        };
        let bind_addr = match env::var("BIND_ADDR") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("BIND_ADDR is not a socket address: {raw}"))?,
            Err(_) => defaults.bind_addr,
        };
        let bcrypt_cost = match env::var("BCRYPT_COST") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("BCRYPT_COST is not a number: {raw}"))?,
            Err(_) => defaults.bcrypt_cost,
        };
        if !(4..=31).contains(&bcrypt_cost) {
            anyhow::bail!("BCRYPT_COST must be between 4 and 31, got {bcrypt_cost}");
        }

        Ok(Config {
            database_url,
            database_max_connections,
            bind_addr,
            bcrypt_cost,
        })
    }
}
