//! Book (catalog title) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Book row from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    /// ISBN-13, digits only
    pub isbn: Option<String>,
    pub genre: Option<String>,
    pub publisher: Option<String>,
    pub publication_year: Option<i32>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Book with inventory and rating aggregates, for listings
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookSummary {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub genre: Option<String>,
    pub publication_year: Option<i32>,
    pub cover_url: Option<String>,
    pub copies_total: i64,
    pub copies_available: i64,
    pub reviews_count: i64,
    pub average_rating: Option<f64>,
}

/// Book search parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Substring of the title (case-insensitive)
    pub title: Option<String>,
    /// Substring of the author (case-insensitive)
    pub author: Option<String>,
    pub genre: Option<String>,
    pub isbn: Option<String>,
    /// Only books with at least one available copy
    pub available: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 512, message = "Title must be 1-512 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 255, message = "Author must be 1-255 characters"))]
    pub author: String,
    /// ISBN-10 or ISBN-13, separators allowed; stored as ISBN-13
    pub isbn: Option<String>,
    #[validate(length(max = 128))]
    pub genre: Option<String>,
    #[validate(length(max = 255))]
    pub publisher: Option<String>,
    #[validate(range(min = 0, max = 3000, message = "Invalid publication year"))]
    pub publication_year: Option<i32>,
    pub description: Option<String>,
    #[validate(url(message = "Invalid cover URL"))]
    pub cover_url: Option<String>,
}

/// Update book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 512, message = "Title must be 1-512 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Author must be 1-255 characters"))]
    pub author: Option<String>,
    pub isbn: Option<String>,
    #[validate(length(max = 128))]
    pub genre: Option<String>,
    #[validate(length(max = 255))]
    pub publisher: Option<String>,
    #[validate(range(min = 0, max = 3000, message = "Invalid publication year"))]
    pub publication_year: Option<i32>,
    pub description: Option<String>,
    #[validate(url(message = "Invalid cover URL"))]
    pub cover_url: Option<String>,
}
