use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use sqlx::{postgres::{PgPoolOptions, PgConnectOptions}, sqlite::{SqlitePoolOptions, SqliteJournalMode, SqliteConnectOptions}};
use sqlx::{PgPool, SqlitePool, ConnectOptions};
use tracing::info;
use tracing::log::LevelFilter;

use crate::config::Config;
use crate::domain::ports::{Clock, ModificationRepository, ReservationRepository, ScheduleRepository, SlotRepository};
use crate::error::AppError;
use crate::state::{AppState, Repositories};
use crate::infra::clock::SystemClock;
use crate::infra::repositories::{
    postgres_modification_repo::PostgresModificationRepo, postgres_reservation_repo::PostgresReservationRepo,
    postgres_schedule_repo::PostgresScheduleRepo, postgres_slot_repo::PostgresSlotRepo,
    sqlite_modification_repo::SqliteModificationRepo, sqlite_reservation_repo::SqliteReservationRepo,
    sqlite_schedule_repo::SqliteScheduleRepo, sqlite_slot_repo::SqliteSlotRepo,
};

pub async fn bootstrap_state(config: &Config) -> Result<AppState, AppError> {
    let repos = connect_repositories(config).await?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    Ok(AppState::new(config.clone(), repos, clock))
}

pub async fn connect_repositories(config: &Config) -> Result<Repositories, AppError> {
    let database_url = &config.database_url;

    if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        info!("Initializing PostgreSQL connection...");

        let opts = PgConnectOptions::from_str(database_url)?
            .log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections.unwrap_or(10))
            .connect_with(opts)
            .await?;

        run_postgres_migrations(&pool).await?;
        Ok(postgres_repositories(pool))
    } else {
        info!("Initializing SQLite connection with WAL Mode...");

        let opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.db_max_connections.unwrap_or(5))
            .connect_with(opts)
            .await?;

        run_sqlite_migrations(&pool).await?;
        Ok(sqlite_repositories(pool))
    }
}

pub fn postgres_repositories(pool: PgPool) -> Repositories {
    Repositories {
        schedules: Arc::new(PostgresScheduleRepo::new(pool.clone())) as Arc<dyn ScheduleRepository>,
        slots: Arc::new(PostgresSlotRepo::new(pool.clone())) as Arc<dyn SlotRepository>,
        modifications: Arc::new(PostgresModificationRepo::new(pool.clone())) as Arc<dyn ModificationRepository>,
        reservations: Arc::new(PostgresReservationRepo::new(pool)) as Arc<dyn ReservationRepository>,
    }
}

pub fn sqlite_repositories(pool: SqlitePool) -> Repositories {
    Repositories {
        schedules: Arc::new(SqliteScheduleRepo::new(pool.clone())) as Arc<dyn ScheduleRepository>,
        slots: Arc::new(SqliteSlotRepo::new(pool.clone())) as Arc<dyn SlotRepository>,
        modifications: Arc::new(SqliteModificationRepo::new(pool.clone())) as Arc<dyn ModificationRepository>,
        reservations: Arc::new(SqliteReservationRepo::new(pool)) as Arc<dyn ReservationRepository>,
    }
}

async fn run_postgres_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations/postgres")
        .run(pool)
        .await
        .map_err(|e| AppError::InternalWithMsg(format!("Failed to run Postgres migrations: {}", e)))
}

async fn run_sqlite_migrations(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations/sqlite")
        .run(pool)
        .await
        .map_err(|e| AppError::InternalWithMsg(format!("Failed to run SQLite migrations: {}", e)))
}
