use crate::domain::{models::schedule::Schedule, ports::ScheduleRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::PgPool;
use chrono::{DateTime, Utc};

pub struct PostgresScheduleRepo {
    pool: PgPool,
}

impl PostgresScheduleRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScheduleRepository for PostgresScheduleRepo {
    async fn create(&self, schedule: &Schedule) -> Result<Schedule, AppError> {
        sqlx::query_as::<_, Schedule>(
            r#"INSERT INTO schedules (id, activity_id, agency_id, start_date, weekdays, full_day, start_time, end_time, capacity, enabled, created_at, deleted_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
               RETURNING *"#
        )
            .bind(&schedule.id)
            .bind(&schedule.activity_id)
            .bind(&schedule.agency_id)
            .bind(schedule.start_date)
            .bind(schedule.weekdays.bits())
            .bind(schedule.full_day)
            .bind(schedule.start_time)
            .bind(schedule.end_time)
            .bind(schedule.capacity)
            .bind(schedule.enabled)
            .bind(schedule.created_at)
            .bind(schedule.deleted_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Schedule>, AppError> {
        sqlx::query_as::<_, Schedule>(concat!("SELECT * FROM schedules WHERE id = $1 AND ", live!()))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_enabled_by_activity(&self, activity_id: &str) -> Result<Vec<Schedule>, AppError> {
        sqlx::query_as::<_, Schedule>(
            concat!("SELECT * FROM schedules WHERE activity_id = $1 AND enabled AND ", live!(), " ORDER BY created_at ASC")
        )
            .bind(activity_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_enabled(&self) -> Result<Vec<Schedule>, AppError> {
        sqlx::query_as::<_, Schedule>(concat!("SELECT * FROM schedules WHERE enabled AND ", live!(), " ORDER BY created_at ASC"))
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn update(&self, schedule: &Schedule) -> Result<Schedule, AppError> {
        sqlx::query_as::<_, Schedule>(
            concat!(
                "UPDATE schedules SET start_date=$1, weekdays=$2, full_day=$3, start_time=$4, end_time=$5, capacity=$6, enabled=$7 ",
                "WHERE id=$8 AND ", live!(), " RETURNING *"
            )
        )
            .bind(schedule.start_date)
            .bind(schedule.weekdays.bits())
            .bind(schedule.full_day)
            .bind(schedule.start_time)
            .bind(schedule.end_time)
            .bind(schedule.capacity)
            .bind(schedule.enabled)
            .bind(&schedule.id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Schedule not found".into()))
    }

    async fn soft_delete(&self, id: &str, at: DateTime<Utc>) -> Result<(), AppError> {
        let result = sqlx::query(concat!("UPDATE schedules SET deleted_at = $1 WHERE id = $2 AND ", live!()))
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Schedule not found".into()));
        }
        Ok(())
    }
}
