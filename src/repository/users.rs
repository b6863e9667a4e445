//! Users repository for database operations

use chrono::Utc;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::user::{RegisterUser, Role, UpdateUser, User, UserQuery},
};

use super::pagination;

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Get user by username or email (login accepts either)
    pub async fn get_by_login(&self, login: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE LOWER(username) = LOWER($1) OR LOWER(email) = LOWER($1)",
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Check if username already exists
    pub async fn username_exists(&self, username: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(username) = LOWER($1) AND id != COALESCE($2, -1))",
        )
        .bind(username)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Check if email already exists
    pub async fn email_exists(&self, email: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1) AND id != COALESCE($2, -1))",
        )
        .bind(email)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Current token version (None when the user no longer exists)
    pub async fn token_version(&self, id: i32) -> AppResult<Option<i32>> {
        let version: Option<i32> = sqlx::query_scalar("SELECT token_version FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(version)
    }

    /// Invalidate all outstanding tokens of a user
    pub async fn bump_token_version(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("UPDATE users SET token_version = token_version + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        Ok(())
    }

    /// Search users with pagination
    pub async fn search(&self, query: &UserQuery) -> AppResult<(Vec<User>, i64)> {
        let (_, per_page, offset) = pagination(query.page, query.per_page);

        let mut conditions = Vec::new();
        let mut idx = 1;

        if query.name.is_some() {
            conditions.push(format!(
                "(LOWER(username) LIKE ${0} OR LOWER(first_name) LIKE ${0} OR LOWER(last_name) LIKE ${0})",
                idx
            ));
            idx += 1;
        }
        if query.role.is_some() {
            conditions.push(format!("role = ${}", idx));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let name = query.name.as_ref().map(|n| format!("%{}%", n.to_lowercase()));

        let count_q = format!("SELECT COUNT(*) FROM users {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_q);
        if let Some(ref n) = name { count_builder = count_builder.bind(n); }
        if let Some(role) = query.role { count_builder = count_builder.bind(role); }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_q = format!(
            "SELECT * FROM users {} ORDER BY username LIMIT {} OFFSET {}",
            where_clause, per_page, offset
        );
        let mut builder = sqlx::query_as::<_, User>(&select_q);
        if let Some(ref n) = name { builder = builder.bind(n); }
        if let Some(role) = query.role { builder = builder.bind(role); }

        let users = builder.fetch_all(&self.pool).await?;
        Ok((users, total))
    }

    /// Create a new user with an already hashed password
    pub async fn create(&self, user: &RegisterUser, password_hash: &str, role: Role) -> AppResult<User> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password, first_name, last_name, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Update an existing user. `password_hash` replaces the stored hash when set.
    pub async fn update(&self, id: i32, user: &UpdateUser, password_hash: Option<String>) -> AppResult<User> {
        let mut sets = vec!["updated_at = $1".to_string()];
        let mut idx = 2;

        macro_rules! add_f {
            ($field:expr, $name:expr) => {
                if $field.is_some() { sets.push(format!("{} = ${}", $name, idx)); idx += 1; }
            };
        }

        add_f!(user.username, "username");
        add_f!(user.email, "email");
        add_f!(user.first_name, "first_name");
        add_f!(user.last_name, "last_name");
        add_f!(password_hash, "password");

        let query = format!("UPDATE users SET {} WHERE id = ${} RETURNING *", sets.join(", "), idx);

        let mut builder = sqlx::query_as::<_, User>(&query).bind(Utc::now());

        macro_rules! bind_f {
            ($field:expr) => {
                if let Some(ref val) = $field { builder = builder.bind(val); }
            };
        }

        bind_f!(user.username);
        bind_f!(user.email);
        bind_f!(user.first_name);
        bind_f!(user.last_name);
        bind_f!(password_hash);

        builder
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Change a user's role
    pub async fn update_role(&self, id: i32, role: Role) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET role = $1, updated_at = $2 WHERE id = $3 RETURNING *",
        )
        .bind(role)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Delete a user. Reserved (unclaimed) copies held by the user are released first.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        // Hold the user's copies so a concurrent claim waits for this delete
        sqlx::query(
            r#"
            SELECT c.id FROM copies c
            JOIN reservations r ON r.copy_id = c.id
            WHERE r.user_id = $1
            FOR UPDATE OF c
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let claimed: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM reservations r JOIN copies c ON c.id = r.copy_id
                WHERE r.user_id = $1 AND c.is_claimed
            )
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if claimed {
            return Err(AppError::Conflict(format!(
                "User {} still holds claimed copies",
                id
            )));
        }

        sqlx::query(
            r#"
            UPDATE copies SET is_reserved = FALSE, updated_at = NOW()
            WHERE id IN (SELECT copy_id FROM reservations WHERE user_id = $1)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }

    /// Count users with the admin role
    pub async fn count_admins(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin'")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
