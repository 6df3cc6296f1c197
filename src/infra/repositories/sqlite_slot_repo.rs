use crate::domain::{models::slot::{Slot, SlotScope, SlotUpdate}, ports::SlotRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use chrono::{DateTime, NaiveDate, Utc};

use super::INSERT_CHUNK;

pub struct SqliteSlotRepo {
    pool: SqlitePool,
}

impl SqliteSlotRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SlotRepository for SqliteSlotRepo {
    async fn insert_many(&self, slots: &[Slot]) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        let mut inserted = 0;

        for chunk in slots.chunks(INSERT_CHUNK) {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO slots (id, schedule_id, activity_id, agency_id, date, start_time, end_time, total_capacity, available_capacity, blocked, created_at, deleted_at) "
            );
            qb.push_values(chunk, |mut b, slot| {
                b.push_bind(slot.id.clone())
                    .push_bind(slot.schedule_id.clone())
                    .push_bind(slot.activity_id.clone())
                    .push_bind(slot.agency_id.clone())
                    .push_bind(slot.date)
                    .push_bind(slot.start_time)
                    .push_bind(slot.end_time)
                    .push_bind(slot.total_capacity)
                    .push_bind(slot.available_capacity)
                    .push_bind(slot.blocked)
                    .push_bind(slot.created_at)
                    .push_bind(slot.deleted_at);
            });
            qb.push(" ON CONFLICT DO NOTHING");

            let result = qb.build().execute(&mut *tx).await.map_err(AppError::Database)?;
            inserted += result.rows_affected();
        }

        tx.commit().await.map_err(AppError::Database)?;
        Ok(inserted)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Slot>, AppError> {
        sqlx::query_as::<_, Slot>(concat!("SELECT * FROM slots WHERE id = ? AND ", live!()))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Slot>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(concat!("SELECT * FROM slots WHERE ", live!(), " AND id IN ("));
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(id.clone());
        }
        qb.push(") ORDER BY date ASC");
        qb.build_query_as::<Slot>().fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_by_schedule_dates(&self, schedule_id: &str, dates: &[NaiveDate]) -> Result<Vec<Slot>, AppError> {
        if dates.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(concat!("SELECT * FROM slots WHERE ", live!(), " AND schedule_id = "));
        qb.push_bind(schedule_id.to_string());
        qb.push(" AND date IN (");
        let mut separated = qb.separated(", ");
        for date in dates {
            separated.push_bind(*date);
        }
        qb.push(") ORDER BY date ASC");
        qb.build_query_as::<Slot>().fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_by_schedule(&self, schedule_id: &str, from: Option<NaiveDate>) -> Result<Vec<Slot>, AppError> {
        match from {
            Some(from) => sqlx::query_as::<_, Slot>(
                concat!("SELECT * FROM slots WHERE schedule_id = ? AND date >= ? AND ", live!(), " ORDER BY date ASC")
            )
                .bind(schedule_id)
                .bind(from)
                .fetch_all(&self.pool)
                .await
                .map_err(AppError::Database),
            None => sqlx::query_as::<_, Slot>(
                concat!("SELECT * FROM slots WHERE schedule_id = ? AND ", live!(), " ORDER BY date ASC")
            )
                .bind(schedule_id)
                .fetch_all(&self.pool)
                .await
                .map_err(AppError::Database),
        }
    }

    async fn list_in_scope(&self, scope: &SlotScope, from: NaiveDate, to: NaiveDate) -> Result<Vec<Slot>, AppError> {
        let sql = format!(
            concat!("SELECT * FROM slots WHERE {} = ? AND date >= ? AND date <= ? AND ", live!(), " ORDER BY date ASC, start_time ASC"),
            scope.column()
        );
        sqlx::query_as::<_, Slot>(&sql)
            .bind(scope.id())
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn compare_and_update(&self, updates: &[SlotUpdate]) -> Result<Vec<String>, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        let mut stale = Vec::new();

        for update in updates {
            let result = sqlx::query(
                concat!(
                    "UPDATE slots SET start_time = ?, end_time = ?, total_capacity = ?, available_capacity = ?, blocked = ? ",
                    "WHERE id = ? AND total_capacity = ? AND available_capacity = ? AND blocked = ? ",
                    "AND start_time IS ? AND end_time IS ? AND ", live!()
                )
            )
                .bind(update.start_time)
                .bind(update.end_time)
                .bind(update.total_capacity)
                .bind(update.available_capacity)
                .bind(update.blocked)
                .bind(&update.id)
                .bind(update.expected_total)
                .bind(update.expected_available)
                .bind(update.expected_blocked)
                .bind(update.expected_start_time)
                .bind(update.expected_end_time)
                .execute(&mut *tx)
                .await
                .map_err(AppError::Database)?;

            if result.rows_affected() == 0 {
                stale.push(update.id.clone());
            }
        }

        tx.commit().await.map_err(AppError::Database)?;
        Ok(stale)
    }

    async fn soft_delete_untouched(&self, ids: &[String], at: DateTime<Utc>) -> Result<Vec<String>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE slots SET deleted_at = ");
        qb.push_bind(at);
        qb.push(concat!(" WHERE total_capacity = available_capacity AND ", live!(), " AND id IN ("));
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(id.clone());
        }
        qb.push(") RETURNING id");
        qb.build_query_scalar::<String>().fetch_all(&self.pool).await.map_err(AppError::Database)
    }
}
