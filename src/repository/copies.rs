//! Copies repository for database operations
//!
//! State changes (claim, return) lock the copy row and validate the
//! transition with [`CopyState::transition`] inside one transaction.

use chrono::Utc;
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    isbn,
    models::copy::{BookCopy, CopyEvent, CopyState, CreateCopy, UpdateCopy},
};

#[derive(Clone)]
pub struct CopiesRepository {
    pool: Pool<Postgres>,
}

/// Lock a copy row for the rest of the transaction
pub(crate) async fn lock_copy(conn: &mut PgConnection, id: i32) -> AppResult<BookCopy> {
    sqlx::query_as::<_, BookCopy>("SELECT * FROM copies WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Copy with id {} not found", id)))
}

/// Persist a copy state as its flag pair
pub(crate) async fn store_state(
    conn: &mut PgConnection,
    id: i32,
    state: CopyState,
) -> AppResult<BookCopy> {
    let (is_reserved, is_claimed) = state.flags();
    let copy = sqlx::query_as::<_, BookCopy>(
        r#"
        UPDATE copies SET is_reserved = $1, is_claimed = $2, updated_at = $3
        WHERE id = $4
        RETURNING *
        "#,
    )
    .bind(is_reserved)
    .bind(is_claimed)
    .bind(Utc::now())
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok(copy)
}

impl CopiesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get copy by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<BookCopy> {
        sqlx::query_as::<_, BookCopy>("SELECT * FROM copies WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Copy with id {} not found", id)))
    }

    /// List all copies of a book
    pub async fn list_for_book(&self, book_id: i32) -> AppResult<Vec<BookCopy>> {
        let copies = sqlx::query_as::<_, BookCopy>(
            "SELECT * FROM copies WHERE book_id = $1 ORDER BY id",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(copies)
    }

    /// Create a copy, generating its barcode from the book ISBN
    pub async fn create(&self, copy: &CreateCopy) -> AppResult<BookCopy> {
        let mut tx = self.pool.begin().await?;

        // Serialises barcode allocation per book
        let book_isbn: Option<Option<String>> =
            sqlx::query_scalar("SELECT isbn FROM books WHERE id = $1 FOR UPDATE")
                .bind(copy.book_id)
                .fetch_optional(&mut *tx)
                .await?;
        let book_isbn = book_isbn
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", copy.book_id)))?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM copies WHERE book_id = $1")
            .bind(copy.book_id)
            .fetch_one(&mut *tx)
            .await?;

        let mut sequence = existing + 1;
        let barcode = loop {
            let candidate = isbn::copy_barcode(book_isbn.as_deref(), copy.book_id, sequence);
            let taken: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM copies WHERE barcode = $1)")
                    .bind(&candidate)
                    .fetch_one(&mut *tx)
                    .await?;
            if !taken {
                break candidate;
            }
            sequence += 1;
        };

        let created = sqlx::query_as::<_, BookCopy>(
            r#"
            INSERT INTO copies (book_id, library_id, barcode, condition)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(copy.book_id)
        .bind(copy.library_id)
        .bind(&barcode)
        .bind(copy.condition.as_deref().unwrap_or("good"))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    /// Update condition or location
    pub async fn update(&self, id: i32, copy: &UpdateCopy) -> AppResult<BookCopy> {
        sqlx::query_as::<_, BookCopy>(
            r#"
            UPDATE copies SET
                library_id = COALESCE($1, library_id),
                condition = COALESCE($2, condition),
                updated_at = $3
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(copy.library_id)
        .bind(&copy.condition)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Copy with id {} not found", id)))
    }

    /// Delete an available copy
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let copy = lock_copy(&mut tx, id).await?;
        if copy.state() != CopyState::Available {
            return Err(AppError::Conflict(format!(
                "Copy {} is {} and cannot be deleted",
                id,
                copy.state()
            )));
        }

        sqlx::query("DELETE FROM copies WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Staff handover: Reserved -> Claimed
    pub async fn claim(&self, id: i32) -> AppResult<BookCopy> {
        let mut tx = self.pool.begin().await?;

        let copy = lock_copy(&mut tx, id).await?;
        let next = copy.state().transition(CopyEvent::Claim)?;
        let claimed = store_state(&mut tx, id, next).await?;

        tx.commit().await?;
        Ok(claimed)
    }

    /// Copy brought back: Claimed -> Available, reservation row removed
    pub async fn return_copy(&self, id: i32) -> AppResult<BookCopy> {
        let mut tx = self.pool.begin().await?;

        let copy = lock_copy(&mut tx, id).await?;
        let next = copy.state().transition(CopyEvent::Return)?;

        sqlx::query("DELETE FROM reservations WHERE copy_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let returned = store_state(&mut tx, id, next).await?;

        tx.commit().await?;
        Ok(returned)
    }
}
