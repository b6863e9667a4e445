//! API handlers for Bibliotheca REST endpoints

pub mod auth;
pub mod books;
pub mod copies;
pub mod csrf;
pub mod health;
pub mod libraries;
pub mod openapi;
pub mod reservations;
pub mod reviews;
pub mod users;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppError,
    models::{book::BookSummary, reservation::ReservationDetails, user::User, user::UserClaims},
    AppState,
};

/// Header carrying the signed session token
pub const AUTH_TOKEN_HEADER: &str = "auth_token";

/// Paginated response wrapper
#[derive(Serialize, ToSchema)]
#[aliases(
    PaginatedBooks = PaginatedResponse<BookSummary>,
    PaginatedUsers = PaginatedResponse<User>,
    PaginatedReservations = PaginatedResponse<ReservationDetails>
)]
pub struct PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// Page content
    pub items: Vec<T>,
    /// Total number of matching rows
    pub total: i64,
    /// Current page number
    pub page: i64,
    /// Items per page
    pub per_page: i64,
}

impl<T> PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub fn new(items: Vec<T>, total: i64, page: Option<i64>, per_page: Option<i64>) -> Self {
        let (page, per_page, _) = crate::repository::pagination(page, per_page);
        Self {
            items,
            total,
            page,
            per_page,
        }
    }
}

/// Token from the `auth_token` header, or from `Authorization: Bearer`
pub(crate) fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    if let Some(token) = headers
        .get(AUTH_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        return Some(token);
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers)
            .ok_or_else(|| AppError::Authentication("Missing auth_token header".to_string()))?;

        let claims = UserClaims::from_token(token, state.services.users.jwt_secret())
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        // Tokens are revoked by logout through the stored token version
        state.services.users.verify_session(&claims).await?;

        Ok(AuthenticatedUser(claims))
    }
}
