//! Reviews repository

use chrono::Utc;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::review::{CreateReview, Review, UpdateReview},
};

#[derive(Clone)]
pub struct ReviewsRepository {
    pool: Pool<Postgres>,
}

impl ReviewsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Review> {
        sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Review {} not found", id)))
    }

    /// Reviews of a book, newest first, with author usernames
    pub async fn list_for_book(&self, book_id: i32) -> AppResult<Vec<Review>> {
        let rows = sqlx::query_as::<_, Review>(
            r#"
            SELECT r.*, u.username
            FROM reviews r
            JOIN users u ON u.id = r.user_id
            WHERE r.book_id = $1
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Whether the user already reviewed the book
    pub async fn exists_for(&self, user_id: i32, book_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM reviews WHERE user_id = $1 AND book_id = $2)",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn create(&self, user_id: i32, data: &CreateReview) -> AppResult<Review> {
        let row = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (book_id, user_id, rating, comment)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(data.book_id)
        .bind(user_id)
        .bind(data.rating)
        .bind(&data.comment)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn update(&self, id: i32, data: &UpdateReview) -> AppResult<Review> {
        sqlx::query_as::<_, Review>(
            r#"
            UPDATE reviews SET
                rating = COALESCE($1, rating),
                comment = COALESCE($2, comment),
                updated_at = $3
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(data.rating)
        .bind(&data.comment)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Review {} not found", id)))
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Review {} not found", id)));
        }
        Ok(())
    }
}
