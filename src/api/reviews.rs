//! Review endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::review::{CreateReview, Review, UpdateReview},
};

use super::AuthenticatedUser;

/// Review a book
#[utoipa::path(
    post,
    path = "/reviews",
    tag = "reviews",
    security(("auth_token" = [])),
    request_body = CreateReview,
    responses(
        (status = 201, description = "Review created", body = Review),
        (status = 400, description = "Rating out of range"),
        (status = 409, description = "Book already reviewed by this user")
    )
)]
pub async fn create_review(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(review): Json<CreateReview>,
) -> AppResult<(StatusCode, Json<Review>)> {
    let created = state.services.reviews.create(&claims, review).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Edit a review (author or admin)
#[utoipa::path(
    put,
    path = "/reviews/{id}",
    tag = "reviews",
    security(("auth_token" = [])),
    params(
        ("id" = i32, Path, description = "Review ID")
    ),
    request_body = UpdateReview,
    responses(
        (status = 200, description = "Review updated", body = Review),
        (status = 403, description = "Not your review"),
        (status = 404, description = "Review not found")
    )
)]
pub async fn update_review(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(review): Json<UpdateReview>,
) -> AppResult<Json<Review>> {
    let updated = state.services.reviews.update(&claims, id, review).await?;
    Ok(Json(updated))
}

/// Delete a review (author or admin)
#[utoipa::path(
    delete,
    path = "/reviews/{id}",
    tag = "reviews",
    security(("auth_token" = [])),
    params(
        ("id" = i32, Path, description = "Review ID")
    ),
    responses(
        (status = 204, description = "Review deleted"),
        (status = 403, description = "Not your review"),
        (status = 404, description = "Review not found")
    )
)]
pub async fn delete_review(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.reviews.delete(&claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
