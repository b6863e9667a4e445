//! Library (branch) endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::library::{CreateLibrary, Library, UpdateLibrary},
};

use super::AuthenticatedUser;

#[utoipa::path(
    get,
    path = "/libraries",
    tag = "libraries",
    responses(
        (status = 200, description = "All libraries", body = Vec<Library>)
    )
)]
pub async fn list_libraries(State(state): State<crate::AppState>) -> AppResult<Json<Vec<Library>>> {
    let libraries = state.services.libraries.list().await?;
    Ok(Json(libraries))
}

#[utoipa::path(
    get,
    path = "/libraries/{id}",
    tag = "libraries",
    params(
        ("id" = i32, Path, description = "Library ID")
    ),
    responses(
        (status = 200, description = "Library", body = Library),
        (status = 404, description = "Library not found")
    )
)]
pub async fn get_library(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Library>> {
    let library = state.services.libraries.get_by_id(id).await?;
    Ok(Json(library))
}

#[utoipa::path(
    post,
    path = "/libraries",
    tag = "libraries",
    security(("auth_token" = [])),
    request_body = CreateLibrary,
    responses(
        (status = 201, description = "Library created", body = Library),
        (status = 403, description = "Admin privileges required")
    )
)]
pub async fn create_library(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateLibrary>,
) -> AppResult<(StatusCode, Json<Library>)> {
    claims.require_admin()?;

    let library = state.services.libraries.create(data).await?;
    Ok((StatusCode::CREATED, Json(library)))
}

#[utoipa::path(
    put,
    path = "/libraries/{id}",
    tag = "libraries",
    security(("auth_token" = [])),
    params(
        ("id" = i32, Path, description = "Library ID")
    ),
    request_body = UpdateLibrary,
    responses(
        (status = 200, description = "Library updated", body = Library),
        (status = 404, description = "Library not found")
    )
)]
pub async fn update_library(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateLibrary>,
) -> AppResult<Json<Library>> {
    claims.require_admin()?;

    let library = state.services.libraries.update(id, data).await?;
    Ok(Json(library))
}

/// Delete a library, detaching its copies
#[utoipa::path(
    delete,
    path = "/libraries/{id}",
    tag = "libraries",
    security(("auth_token" = [])),
    params(
        ("id" = i32, Path, description = "Library ID")
    ),
    responses(
        (status = 204, description = "Library deleted"),
        (status = 404, description = "Library not found")
    )
)]
pub async fn delete_library(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.libraries.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
