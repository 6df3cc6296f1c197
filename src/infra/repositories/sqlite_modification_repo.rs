use crate::domain::{models::modification::TemporaryModification, ports::ModificationRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::SqlitePool;
use chrono::{DateTime, NaiveDate, Utc};

pub struct SqliteModificationRepo {
    pool: SqlitePool,
}

impl SqliteModificationRepo {
    pub fn new(pool: SqlitePool) -> Self { Self { pool } }
}

#[async_trait]
impl ModificationRepository for SqliteModificationRepo {
    async fn create(&self, m: &TemporaryModification) -> Result<TemporaryModification, AppError> {
        sqlx::query_as::<_, TemporaryModification>(
            r#"INSERT INTO temporary_modifications (
                id, agency_id, activity_id, schedule_id, kind, date_from, date_to,
                new_start_time, new_end_time, new_capacity,
                previous_start_time, previous_end_time, previous_capacity,
                reason, active, created_at, deleted_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *"#
        )
            .bind(&m.id)
            .bind(&m.agency_id)
            .bind(&m.activity_id)
            .bind(&m.schedule_id)
            .bind(&m.kind)
            .bind(m.date_from)
            .bind(m.date_to)
            .bind(m.new_start_time)
            .bind(m.new_end_time)
            .bind(m.new_capacity)
            .bind(m.previous_start_time)
            .bind(m.previous_end_time)
            .bind(m.previous_capacity)
            .bind(&m.reason)
            .bind(m.active)
            .bind(m.created_at)
            .bind(m.deleted_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<TemporaryModification>, AppError> {
        sqlx::query_as::<_, TemporaryModification>(
            concat!("SELECT * FROM temporary_modifications WHERE id = ? AND ", live!())
        )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn update(&self, m: &TemporaryModification) -> Result<TemporaryModification, AppError> {
        sqlx::query_as::<_, TemporaryModification>(
            concat!(
                "UPDATE temporary_modifications SET previous_start_time=?, previous_end_time=?, previous_capacity=?, active=? ",
                "WHERE id=? AND ", live!(), " RETURNING *"
            )
        )
            .bind(m.previous_start_time)
            .bind(m.previous_end_time)
            .bind(m.previous_capacity)
            .bind(m.active)
            .bind(&m.id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Modification not found".into()))
    }

    async fn soft_delete(&self, id: &str, at: DateTime<Utc>) -> Result<(), AppError> {
        let res = sqlx::query(
            concat!("UPDATE temporary_modifications SET active = 0, deleted_at = ? WHERE id = ? AND ", live!())
        )
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;

        if res.rows_affected() == 0 {
            return Err(AppError::NotFound("Modification not found".into()));
        }
        Ok(())
    }

    async fn list_overlapping(&self, agency_id: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<TemporaryModification>, AppError> {
        sqlx::query_as::<_, TemporaryModification>(
            concat!(
                "SELECT * FROM temporary_modifications WHERE agency_id = ? AND date_from <= ? AND date_to >= ? AND ", live!(),
                " ORDER BY created_at ASC"
            )
        )
            .bind(agency_id)
            .bind(to)
            .bind(from)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }
}
