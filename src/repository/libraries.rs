//! Libraries repository

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::library::{CreateLibrary, Library, UpdateLibrary},
};

#[derive(Clone)]
pub struct LibrariesRepository {
    pool: Pool<Postgres>,
}

impl LibrariesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> AppResult<Vec<Library>> {
        let rows = sqlx::query_as::<_, Library>("SELECT * FROM libraries ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Library> {
        sqlx::query_as::<_, Library>("SELECT * FROM libraries WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Library {} not found", id)))
    }

    pub async fn create(&self, data: &CreateLibrary) -> AppResult<Library> {
        let row = sqlx::query_as::<_, Library>(
            r#"
            INSERT INTO libraries (name, address, city, phone, email)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.address)
        .bind(&data.city)
        .bind(&data.phone)
        .bind(&data.email)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn update(&self, id: i32, data: &UpdateLibrary) -> AppResult<Library> {
        sqlx::query_as::<_, Library>(
            r#"
            UPDATE libraries SET
                name = COALESCE($1, name),
                address = COALESCE($2, address),
                city = COALESCE($3, city),
                phone = COALESCE($4, phone),
                email = COALESCE($5, email)
            WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.address)
        .bind(&data.city)
        .bind(&data.phone)
        .bind(&data.email)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Library {} not found", id)))
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM libraries WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Library {} not found", id)));
        }
        Ok(())
    }
}
