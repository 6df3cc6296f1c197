use crate::domain::{
    models::{reservation::Reservation, slot::SlotScope},
    ports::ReservationRepository,
};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::PgPool;
use chrono::NaiveDate;

pub struct PostgresReservationRepo {
    pool: PgPool,
}

impl PostgresReservationRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReservationRepository for PostgresReservationRepo {
    async fn hold(&self, reservation: &Reservation) -> Result<Reservation, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let taken = sqlx::query(
            concat!(
                "UPDATE slots SET available_capacity = available_capacity - $1 ",
                "WHERE id = $2 AND agency_id = $3 AND available_capacity >= $1 AND NOT blocked AND ", live!()
            )
        )
            .bind(reservation.quantity)
            .bind(&reservation.slot_id)
            .bind(&reservation.agency_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        if taken.rows_affected() == 0 {
            return Err(AppError::Conflict("Slot is unavailable or has not enough capacity".into()));
        }

        let created = sqlx::query_as::<_, Reservation>(
            "INSERT INTO reservations (id, slot_id, agency_id, quantity, status, created_at) VALUES ($1, $2, $3, $4, $5, $6) RETURNING *"
        )
            .bind(&reservation.id)
            .bind(&reservation.slot_id)
            .bind(&reservation.agency_id)
            .bind(reservation.quantity)
            .bind(&reservation.status)
            .bind(reservation.created_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(created)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Reservation>, AppError> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn confirm(&self, id: &str) -> Result<Reservation, AppError> {
        let confirmed = sqlx::query_as::<_, Reservation>(
            "UPDATE reservations SET status = 'CONFIRMED' WHERE id = $1 AND status = 'HOLD' RETURNING *"
        )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;

        match confirmed {
            Some(r) => Ok(r),
            None if self.find_by_id(id).await?.is_some() => Err(AppError::Conflict("Reservation is not on hold".into())),
            None => Err(AppError::NotFound("Reservation not found".into())),
        }
    }

    async fn release(&self, id: &str) -> Result<Reservation, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let cancelled = sqlx::query_as::<_, Reservation>(
            "UPDATE reservations SET status = 'CANCELLED' WHERE id = $1 AND status IN ('HOLD', 'CONFIRMED') RETURNING *"
        )
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        let Some(cancelled) = cancelled else {
            drop(tx);
            return match self.find_by_id(id).await? {
                Some(_) => Err(AppError::Conflict("Reservation already released".into())),
                None => Err(AppError::NotFound("Reservation not found".into())),
            };
        };

        sqlx::query("UPDATE slots SET available_capacity = LEAST(total_capacity, available_capacity + $1) WHERE id = $2")
            .bind(cancelled.quantity)
            .bind(&cancelled.slot_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(cancelled)
    }

    async fn count_live_in_scope(&self, scope: &SlotScope, from: NaiveDate, to: NaiveDate) -> Result<i64, AppError> {
        let sql = format!(
            concat!(
                "SELECT COUNT(*) FROM reservations r JOIN slots s ON s.id = r.slot_id ",
                "WHERE s.{} = $1 AND s.date >= $2 AND s.date <= $3 AND s.", live!(),
                " AND r.status IN ('HOLD', 'CONFIRMED')"
            ),
            scope.column()
        );
        sqlx::query_scalar::<_, i64>(&sql)
            .bind(scope.id())
            .bind(from)
            .bind(to)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }
}
