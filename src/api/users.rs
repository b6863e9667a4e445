//! User management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::AppResult,
    models::{
        reservation::ReservationDetails,
        user::{UpdateRole, UpdateUser, User, UserQuery},
    },
};

use super::{AuthenticatedUser, PaginatedResponse};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// List users with search and pagination (admin)
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("auth_token" = [])),
    params(UserQuery),
    responses(
        (status = 200, description = "List of users", body = PaginatedUsers),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin privileges required")
    )
)]
pub async fn list_users(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<PaginatedResponse<User>>> {
    claims.require_admin()?;

    let (users, total) = state.services.users.search_users(&query).await?;
    Ok(Json(PaginatedResponse::new(users, total, query.page, query.per_page)))
}

/// Get user details by ID
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    security(("auth_token" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User details", body = User),
        (status = 403, description = "Not your account"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<User>> {
    claims.require_owner_or_admin(id)?;

    let user = state.services.users.get_by_id(id).await?;
    Ok(Json(user))
}

/// Update a user's profile or password
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    security(("auth_token" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 401, description = "Current password is wrong"),
        (status = 403, description = "Not your account"),
        (status = 409, description = "Username or email already taken")
    )
)]
pub async fn update_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(user): Json<UpdateUser>,
) -> AppResult<Json<User>> {
    claims.require_owner_or_admin(id)?;

    let user = state.services.users.update_user(&claims, id, user).await?;
    Ok(Json(user))
}

/// Change a user's role (admin)
#[utoipa::path(
    put,
    path = "/users/{id}/role",
    tag = "users",
    security(("auth_token" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    request_body = UpdateRole,
    responses(
        (status = 200, description = "Role updated", body = User),
        (status = 403, description = "Admin privileges required"),
        (status = 422, description = "Would remove the last administrator")
    )
)]
pub async fn update_role(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateRole>,
) -> AppResult<Json<User>> {
    claims.require_admin()?;

    let user = state.services.users.update_role(id, data.role).await?;
    Ok(Json(user))
}

/// Delete a user account
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    security(("auth_token" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Not your account"),
        (status = 404, description = "User not found"),
        (status = 409, description = "User still holds claimed copies")
    )
)]
pub async fn delete_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_owner_or_admin(id)?;

    state.services.users.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reservations held by a user
#[utoipa::path(
    get,
    path = "/users/{id}/reservations",
    tag = "users",
    security(("auth_token" = [])),
    params(
        ("id" = i32, Path, description = "User ID"),
        PageQuery
    ),
    responses(
        (status = 200, description = "Reservations of the user", body = PaginatedReservations),
        (status = 403, description = "Not your account"),
        (status = 404, description = "User not found")
    )
)]
pub async fn list_user_reservations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PaginatedResponse<ReservationDetails>>> {
    claims.require_owner_or_admin(id)?;

    let (reservations, total) = state
        .services
        .reservations
        .list_for_user(id, query.page, query.per_page)
        .await?;

    Ok(Json(PaginatedResponse::new(
        reservations,
        total,
        query.page,
        query.per_page,
    )))
}
