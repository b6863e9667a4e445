//! Books repository for database operations

use chrono::Utc;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, BookSummary, CreateBook, UpdateBook},
};

use super::pagination;

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

const SUMMARY_COLUMNS: &str = r#"
    b.id, b.title, b.author, b.isbn, b.genre, b.publication_year, b.cover_url,
    (SELECT COUNT(*) FROM copies c WHERE c.book_id = b.id) AS copies_total,
    (SELECT COUNT(*) FROM copies c
        WHERE c.book_id = b.id AND NOT c.is_reserved AND NOT c.is_claimed) AS copies_available,
    (SELECT COUNT(*) FROM reviews r WHERE r.book_id = b.id) AS reviews_count,
    (SELECT AVG(r.rating)::float8 FROM reviews r WHERE r.book_id = b.id) AS average_rating
"#;

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Search books with filters and pagination
    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<BookSummary>, i64)> {
        let (_, per_page, offset) = pagination(query.page, query.per_page);

        let mut conditions = Vec::new();
        let mut idx = 1;

        if query.title.is_some() {
            conditions.push(format!("LOWER(b.title) LIKE ${}", idx));
            idx += 1;
        }
        if query.author.is_some() {
            conditions.push(format!("LOWER(b.author) LIKE ${}", idx));
            idx += 1;
        }
        if query.genre.is_some() {
            conditions.push(format!("LOWER(b.genre) = LOWER(${})", idx));
            idx += 1;
        }
        if query.isbn.is_some() {
            conditions.push(format!("b.isbn = ${}", idx));
        }
        if query.available == Some(true) {
            conditions.push(
                "EXISTS (SELECT 1 FROM copies c WHERE c.book_id = b.id AND NOT c.is_reserved AND NOT c.is_claimed)"
                    .to_string(),
            );
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let title = query.title.as_ref().map(|t| format!("%{}%", t.to_lowercase()));
        let author = query.author.as_ref().map(|a| format!("%{}%", a.to_lowercase()));
        let isbn = query.isbn.as_deref().map(crate::isbn::search_key);

        let count_q = format!("SELECT COUNT(*) FROM books b {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_q);
        if let Some(ref t) = title { count_builder = count_builder.bind(t); }
        if let Some(ref a) = author { count_builder = count_builder.bind(a); }
        if let Some(ref g) = query.genre { count_builder = count_builder.bind(g); }
        if let Some(ref i) = isbn { count_builder = count_builder.bind(i); }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_q = format!(
            "SELECT {} FROM books b {} ORDER BY b.title, b.id LIMIT {} OFFSET {}",
            SUMMARY_COLUMNS, where_clause, per_page, offset
        );
        let mut builder = sqlx::query_as::<_, BookSummary>(&select_q);
        if let Some(ref t) = title { builder = builder.bind(t); }
        if let Some(ref a) = author { builder = builder.bind(a); }
        if let Some(ref g) = query.genre { builder = builder.bind(g); }
        if let Some(ref i) = isbn { builder = builder.bind(i); }

        let books = builder.fetch_all(&self.pool).await?;
        Ok((books, total))
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Get the aggregate view of a single book
    pub async fn get_summary(&self, id: i32) -> AppResult<BookSummary> {
        let q = format!("SELECT {} FROM books b WHERE b.id = $1", SUMMARY_COLUMNS);
        sqlx::query_as::<_, BookSummary>(&q)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Create a book. `isbn` must already be normalised to ISBN-13.
    pub async fn create(&self, book: &CreateBook, isbn: Option<String>) -> AppResult<Book> {
        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, isbn, genre, publisher, publication_year, description, cover_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(isbn)
        .bind(&book.genre)
        .bind(&book.publisher)
        .bind(book.publication_year)
        .bind(&book.description)
        .bind(&book.cover_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Update a book. Only provided fields change.
    pub async fn update(&self, id: i32, book: &UpdateBook, isbn: Option<String>) -> AppResult<Book> {
        let mut sets = vec!["updated_at = $1".to_string()];
        let mut idx = 2;

        macro_rules! add_f {
            ($field:expr, $name:expr) => {
                if $field.is_some() { sets.push(format!("{} = ${}", $name, idx)); idx += 1; }
            };
        }

        add_f!(book.title, "title");
        add_f!(book.author, "author");
        add_f!(isbn, "isbn");
        add_f!(book.genre, "genre");
        add_f!(book.publisher, "publisher");
        add_f!(book.publication_year, "publication_year");
        add_f!(book.description, "description");
        add_f!(book.cover_url, "cover_url");

        let query = format!("UPDATE books SET {} WHERE id = ${} RETURNING *", sets.join(", "), idx);

        let mut builder = sqlx::query_as::<_, Book>(&query).bind(Utc::now());

        macro_rules! bind_f {
            ($field:expr) => {
                if let Some(ref val) = $field { builder = builder.bind(val); }
            };
        }

        bind_f!(book.title);
        bind_f!(book.author);
        bind_f!(isbn);
        bind_f!(book.genre);
        bind_f!(book.publisher);
        bind_f!(book.publication_year);
        bind_f!(book.description);
        bind_f!(book.cover_url);

        builder
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Delete a book and its copies. Refused while any copy is reserved or claimed.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let held: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM copies WHERE book_id = $1 AND (is_reserved OR is_claimed))",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if held {
            return Err(AppError::Conflict(format!(
                "Book {} has reserved copies and cannot be deleted",
                id
            )));
        }

        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }
}
