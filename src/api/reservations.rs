//! Reservation endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;

use crate::{
    error::AppResult,
    models::reservation::{CreateReservation, ReservationDetails, ReservationQuery, SweepReport},
    services::reservations::ExpirySweep,
};

use super::{AuthenticatedUser, PaginatedResponse};

/// List all reservations (admin)
#[utoipa::path(
    get,
    path = "/reservations",
    tag = "reservations",
    security(("auth_token" = [])),
    params(ReservationQuery),
    responses(
        (status = 200, description = "Reservations", body = PaginatedReservations),
        (status = 403, description = "Admin privileges required")
    )
)]
pub async fn list_reservations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ReservationQuery>,
) -> AppResult<Json<PaginatedResponse<ReservationDetails>>> {
    claims.require_admin()?;

    let (reservations, total) = state.services.reservations.list(&query).await?;
    Ok(Json(PaginatedResponse::new(
        reservations,
        total,
        query.page,
        query.per_page,
    )))
}

/// Reserve an available copy for the caller
#[utoipa::path(
    post,
    path = "/reservations",
    tag = "reservations",
    security(("auth_token" = [])),
    request_body = CreateReservation,
    responses(
        (status = 201, description = "Copy reserved", body = ReservationDetails),
        (status = 404, description = "Copy not found"),
        (status = 409, description = "Copy is not available", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateReservation>,
) -> AppResult<(StatusCode, Json<ReservationDetails>)> {
    let reservation = state
        .services
        .reservations
        .reserve(claims.user_id, request.copy_id)
        .await?;

    Ok((StatusCode::CREATED, Json(reservation)))
}

/// Get a reservation (owner or admin)
#[utoipa::path(
    get,
    path = "/reservations/{id}",
    tag = "reservations",
    security(("auth_token" = [])),
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Reservation", body = ReservationDetails),
        (status = 403, description = "Not your reservation"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn get_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ReservationDetails>> {
    let reservation = state.services.reservations.get(&claims, id).await?;
    Ok(Json(reservation))
}

/// Cancel a reservation and release its copy
#[utoipa::path(
    delete,
    path = "/reservations/{id}",
    tag = "reservations",
    security(("auth_token" = [])),
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 204, description = "Reservation cancelled"),
        (status = 403, description = "Not your reservation"),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Copy already claimed")
    )
)]
pub async fn cancel_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.reservations.cancel(&claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Run the expiry sweep immediately (admin)
#[utoipa::path(
    post,
    path = "/reservations/sweep",
    tag = "reservations",
    security(("auth_token" = [])),
    responses(
        (status = 200, description = "Sweep result", body = SweepReport),
        (status = 403, description = "Admin privileges required")
    )
)]
pub async fn sweep_reservations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<SweepReport>> {
    claims.require_admin()?;

    let report = state.services.reservations.sweep_expired(Utc::now()).await?;
    tracing::info!(
        admin_id = claims.user_id,
        expired = report.expired.len(),
        "Manual reservation sweep"
    );

    Ok(Json(report))
}
