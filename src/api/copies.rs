//! Physical copy endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::copy::{CopyDetails, CreateCopy, UpdateCopy},
};

use super::AuthenticatedUser;

/// Add a copy of a book to a library
#[utoipa::path(
    post,
    path = "/copy",
    tag = "copies",
    security(("auth_token" = [])),
    request_body = CreateCopy,
    responses(
        (status = 201, description = "Copy created", body = CopyDetails),
        (status = 400, description = "Unknown book or library"),
        (status = 403, description = "Admin privileges required")
    )
)]
pub async fn create_copy(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(copy): Json<CreateCopy>,
) -> AppResult<(StatusCode, Json<CopyDetails>)> {
    claims.require_admin()?;

    let created = state.services.catalog.create_copy(copy).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Get a copy by ID
#[utoipa::path(
    get,
    path = "/copy/{id}",
    tag = "copies",
    params(
        ("id" = i32, Path, description = "Copy ID")
    ),
    responses(
        (status = 200, description = "Copy details", body = CopyDetails),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn get_copy(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<CopyDetails>> {
    let copy = state.services.catalog.get_copy(id).await?;
    Ok(Json(copy))
}

/// Move a copy or change its condition
#[utoipa::path(
    put,
    path = "/copy/{id}",
    tag = "copies",
    security(("auth_token" = [])),
    params(
        ("id" = i32, Path, description = "Copy ID")
    ),
    request_body = UpdateCopy,
    responses(
        (status = 200, description = "Copy updated", body = CopyDetails),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn update_copy(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(copy): Json<UpdateCopy>,
) -> AppResult<Json<CopyDetails>> {
    claims.require_admin()?;

    let updated = state.services.catalog.update_copy(id, copy).await?;
    Ok(Json(updated))
}

/// Remove an available copy
#[utoipa::path(
    delete,
    path = "/copy/{id}",
    tag = "copies",
    security(("auth_token" = [])),
    params(
        ("id" = i32, Path, description = "Copy ID")
    ),
    responses(
        (status = 204, description = "Copy deleted"),
        (status = 404, description = "Copy not found"),
        (status = 409, description = "Copy is reserved or claimed")
    )
)]
pub async fn delete_copy(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.catalog.delete_copy(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Hand a reserved copy over to its reserver
#[utoipa::path(
    post,
    path = "/copy/{id}/claim",
    tag = "copies",
    security(("auth_token" = [])),
    params(
        ("id" = i32, Path, description = "Copy ID")
    ),
    responses(
        (status = 200, description = "Copy claimed", body = CopyDetails),
        (status = 404, description = "Copy not found"),
        (status = 409, description = "Copy is not reserved")
    )
)]
pub async fn claim_copy(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<CopyDetails>> {
    claims.require_admin()?;

    let copy = state.services.catalog.claim_copy(id).await?;
    Ok(Json(copy))
}

/// Check a claimed copy back in
#[utoipa::path(
    post,
    path = "/copy/{id}/return",
    tag = "copies",
    security(("auth_token" = [])),
    params(
        ("id" = i32, Path, description = "Copy ID")
    ),
    responses(
        (status = 200, description = "Copy returned", body = CopyDetails),
        (status = 404, description = "Copy not found"),
        (status = 409, description = "Copy is not claimed")
    )
)]
pub async fn return_copy(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<CopyDetails>> {
    claims.require_admin()?;

    let copy = state.services.catalog.return_copy(id).await?;
    Ok(Json(copy))
}
