//! Authentication endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::user::{RegisterUser, User},
};

use super::AuthenticatedUser;

/// Login request
#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Username or email
    pub login: String,
    pub password: String,
}

/// Login response
#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    /// Signed token to send back in the `auth_token` header
    pub token: String,
    pub user: User,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// Authenticate and obtain a token
#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<crate::AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let (token, user) = state
        .services
        .users
        .authenticate(&request.login, &request.password)
        .await?;

    Ok(Json(LoginResponse {
        success: true,
        token,
        user,
    }))
}

/// Create a member account
#[utoipa::path(
    post,
    path = "/registration",
    tag = "auth",
    request_body = RegisterUser,
    responses(
        (status = 201, description = "Account created", body = User),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 409, description = "Username or email already taken", body = crate::error::ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<crate::AppState>,
    Json(request): Json<RegisterUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = state.services.users.register(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Log a user out, revoking all their tokens
#[utoipa::path(
    post,
    path = "/logout/{id}",
    tag = "auth",
    security(("auth_token" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 403, description = "Not your account"),
        (status = 404, description = "User not found")
    )
)]
pub async fn logout(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<i32>,
) -> AppResult<Json<MessageResponse>> {
    claims.require_owner_or_admin(user_id)?;

    state.services.users.logout(user_id).await?;

    Ok(Json(MessageResponse {
        success: true,
        message: "Logged out".to_string(),
    }))
}
