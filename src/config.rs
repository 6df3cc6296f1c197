use std::env;

pub const DEFAULT_HORIZON_DAYS: i64 = 365;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub horizon_days: i64, // Expansion window for recurring schedules
    pub horizon_refresh_secs: u64,
    pub db_max_connections: Option<u32>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            port: env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().expect("PORT must be a number"),
            horizon_days: env::var("HORIZON_DAYS")
                .map(|v| v.parse().expect("HORIZON_DAYS must be a number"))
                .unwrap_or(DEFAULT_HORIZON_DAYS),
            horizon_refresh_secs: env::var("HORIZON_REFRESH_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .expect("HORIZON_REFRESH_SECS must be a number"),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .ok()
                .map(|v| v.parse().expect("DB_MAX_CONNECTIONS must be a number")),
        }
    }
}
