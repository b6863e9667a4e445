//! Reservations repository for database operations

use chrono::{DateTime, Duration, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        copy::CopyEvent,
        reservation::{
            expiry_cutoff, select_expired, ExpiryCandidate, Reservation, ReservationDetails,
            ReservationQuery, SweepReport,
        },
    },
};

use super::{
    copies::{lock_copy, store_state},
    pagination,
};

#[derive(Clone)]
pub struct ReservationsRepository {
    pool: Pool<Postgres>,
}

const DETAILS_SELECT: &str = r#"
    SELECT r.id, r.user_id, r.copy_id, r.reservation_date, r.final_date,
           c.barcode, c.book_id, b.title AS book_title, c.is_claimed
    FROM reservations r
    JOIN copies c ON c.id = r.copy_id
    JOIN books b ON b.id = c.book_id
"#;

impl ReservationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get reservation by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))
    }

    /// Get reservation with copy and book information
    pub async fn get_details(&self, id: i32) -> AppResult<ReservationDetails> {
        let q = format!("{} WHERE r.id = $1", DETAILS_SELECT);
        sqlx::query_as::<_, ReservationDetails>(&q)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))
    }

    /// List reservations with optional filters and pagination
    pub async fn list(&self, query: &ReservationQuery) -> AppResult<(Vec<ReservationDetails>, i64)> {
        let (_, per_page, offset) = pagination(query.page, query.per_page);

        let mut conditions = Vec::new();
        if query.user_id.is_some() {
            conditions.push("r.user_id = $1".to_string());
        }
        if query.overdue == Some(true) {
            conditions.push("r.final_date < NOW()".to_string());
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_q = format!(
            "SELECT COUNT(*) FROM reservations r {}",
            where_clause
        );
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_q);
        if let Some(user_id) = query.user_id { count_builder = count_builder.bind(user_id); }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_q = format!(
            "{} {} ORDER BY r.reservation_date DESC LIMIT {} OFFSET {}",
            DETAILS_SELECT, where_clause, per_page, offset
        );
        let mut builder = sqlx::query_as::<_, ReservationDetails>(&select_q);
        if let Some(user_id) = query.user_id { builder = builder.bind(user_id); }

        let rows = builder.fetch_all(&self.pool).await?;
        Ok((rows, total))
    }

    /// Reserve an available copy for a user.
    ///
    /// The conditional update and the insert share one transaction, so two
    /// concurrent requests for the same copy cannot both succeed.
    pub async fn reserve(&self, user_id: i32, copy_id: i32, grace: Duration) -> AppResult<Reservation> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let updated: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE copies SET is_reserved = TRUE, updated_at = $2
            WHERE id = $1 AND NOT is_reserved AND NOT is_claimed
            RETURNING id
            "#,
        )
        .bind(copy_id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        if updated.is_none() {
            // Either the copy does not exist or its state forbids the reservation
            let copy = lock_copy(&mut tx, copy_id).await?;
            copy.state().transition(CopyEvent::Reserve)?;
            return Err(AppError::CopyNotAvailable(format!(
                "Copy {} is not available",
                copy_id
            )));
        }

        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            INSERT INTO reservations (user_id, copy_id, reservation_date, final_date)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(copy_id)
        .bind(now)
        .bind(now + grace)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(reservation)
    }

    /// Cancel a reservation whose copy has not been claimed yet
    pub async fn cancel(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let reservation = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))?;

        let copy = lock_copy(&mut tx, reservation.copy_id).await?;
        let next = copy.state().transition(CopyEvent::Cancel)?;

        store_state(&mut tx, copy.id, next).await?;
        sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Release every reservation older than the grace window whose copy was
    /// never claimed. Copies are unreserved and reservation rows deleted,
    /// each as one batched statement, inside a single transaction.
    pub async fn sweep_expired(&self, now: DateTime<Utc>, grace: Duration) -> AppResult<SweepReport> {
        let cutoff = expiry_cutoff(now, grace);
        let mut tx = self.pool.begin().await?;

        let candidates = sqlx::query_as::<_, ExpiryCandidate>(
            r#"
            SELECT r.id AS reservation_id, r.copy_id, r.reservation_date,
                   c.is_reserved, c.is_claimed
            FROM reservations r
            JOIN copies c ON c.id = r.copy_id
            WHERE r.reservation_date < $1 AND NOT c.is_claimed
            ORDER BY r.id
            FOR UPDATE OF r, c SKIP LOCKED
            "#,
        )
        .bind(cutoff)
        .fetch_all(&mut *tx)
        .await?;

        let report = select_expired(&candidates, now, grace);
        if report.is_empty() {
            tx.commit().await?;
            return Ok(report);
        }

        sqlx::query(
            "UPDATE copies SET is_reserved = FALSE, updated_at = $2 WHERE id = ANY($1) AND NOT is_claimed",
        )
        .bind(&report.released_copies)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM reservations WHERE id = ANY($1)")
            .bind(&report.expired)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(report)
    }
}
