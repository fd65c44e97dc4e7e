// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Fallback passing threshold when a quiz does not set its own.
pub const DEFAULT_PASSING_PERCENTAGE: i64 = 60;

/// A student counts as "active" while their last activity is within this window.
pub const ACTIVE_WINDOW_DAYS: i64 = 7;

/// Below this progress percentage an idle student is flagged "at-risk".
pub const AT_RISK_PROGRESS_THRESHOLD: i64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub instructor_username: Option<String>,
    pub instructor_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let instructor_username = env::var("SEED_INSTRUCTOR_USERNAME").ok();
        let instructor_password = env::var("SEED_INSTRUCTOR_PASSWORD").ok();

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            instructor_username,
            instructor_password,
        }
    }
}
