//! Book catalog endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookQuery, BookSummary, CreateBook, UpdateBook},
        copy::CopyDetails,
        review::Review,
    },
};

use super::{AuthenticatedUser, PaginatedResponse};

/// List books with search and pagination
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookQuery),
    responses(
        (status = 200, description = "List of books", body = PaginatedBooks)
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<PaginatedResponse<BookSummary>>> {
    let (books, total) = state.services.catalog.search_books(&query).await?;
    Ok(Json(PaginatedResponse::new(books, total, query.page, query.per_page)))
}

/// Get book details by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = BookSummary),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<BookSummary>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}

/// Create a new book
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("auth_token" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Admin privileges required")
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(book): Json<CreateBook>,
) -> AppResult<(StatusCode, Json<Book>)> {
    claims.require_admin()?;

    let created = state.services.catalog.create_book(book).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update an existing book
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    security(("auth_token" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(book): Json<UpdateBook>,
) -> AppResult<Json<Book>> {
    claims.require_admin()?;

    let updated = state.services.catalog.update_book(id, book).await?;
    Ok(Json(updated))
}

/// Delete a book and all its copies
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    security(("auth_token" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Book has reserved copies")
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.catalog.delete_book(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List the copies of a book
#[utoipa::path(
    get,
    path = "/books/{id}/copies",
    tag = "copies",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Copies of the book", body = Vec<CopyDetails>),
        (status = 404, description = "Book not found")
    )
)]
pub async fn list_book_copies(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<CopyDetails>>> {
    let copies = state.services.catalog.list_copies(id).await?;
    Ok(Json(copies))
}

/// List the reviews of a book
#[utoipa::path(
    get,
    path = "/books/{id}/reviews",
    tag = "reviews",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Reviews of the book", body = Vec<Review>),
        (status = 404, description = "Book not found")
    )
)]
pub async fn list_book_reviews(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<Review>>> {
    let reviews = state.services.reviews.list_for_book(id).await?;
    Ok(Json(reviews))
}
