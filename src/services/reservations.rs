//! Reservation lifecycle service

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::{
    config::ReservationsConfig,
    error::AppResult,
    models::{
        reservation::{ReservationDetails, ReservationQuery, SweepReport},
        user::UserClaims,
    },
    repository::Repository,
};

/// Releases reservations that outlived their grace window
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExpirySweep: Send + Sync {
    async fn sweep_expired(&self, now: DateTime<Utc>) -> AppResult<SweepReport>;
}

#[derive(Clone)]
pub struct ReservationsService {
    repository: Repository,
    grace: Duration,
}

impl ReservationsService {
    pub fn new(repository: Repository, config: &ReservationsConfig) -> Self {
        Self {
            repository,
            grace: Duration::hours(config.grace_hours),
        }
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Reserve a copy for the authenticated user
    pub async fn reserve(&self, user_id: i32, copy_id: i32) -> AppResult<ReservationDetails> {
        let reservation = self
            .repository
            .reservations
            .reserve(user_id, copy_id, self.grace)
            .await?;

        tracing::info!(
            reservation_id = reservation.id,
            user_id,
            copy_id,
            final_date = %reservation.final_date,
            "Copy reserved"
        );

        self.repository.reservations.get_details(reservation.id).await
    }

    /// Get a reservation visible to the caller
    pub async fn get(&self, claims: &UserClaims, id: i32) -> AppResult<ReservationDetails> {
        let reservation = self.repository.reservations.get_details(id).await?;
        claims.require_owner_or_admin(reservation.user_id)?;
        Ok(reservation)
    }

    /// List reservations (admin)
    pub async fn list(&self, query: &ReservationQuery) -> AppResult<(Vec<ReservationDetails>, i64)> {
        self.repository.reservations.list(query).await
    }

    /// Reservations of one user
    pub async fn list_for_user(
        &self,
        user_id: i32,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> AppResult<(Vec<ReservationDetails>, i64)> {
        self.repository.users.get_by_id(user_id).await?;
        let query = ReservationQuery {
            user_id: Some(user_id),
            page,
            per_page,
            ..Default::default()
        };
        self.repository.reservations.list(&query).await
    }

    /// Cancel a reservation (owner or admin) while the copy is not claimed
    pub async fn cancel(&self, claims: &UserClaims, id: i32) -> AppResult<()> {
        let reservation = self.repository.reservations.get_by_id(id).await?;
        claims.require_owner_or_admin(reservation.user_id)?;

        self.repository.reservations.cancel(id).await?;
        tracing::info!(reservation_id = id, copy_id = reservation.copy_id, "Reservation cancelled");
        Ok(())
    }
}

#[async_trait]
impl ExpirySweep for ReservationsService {
    async fn sweep_expired(&self, now: DateTime<Utc>) -> AppResult<SweepReport> {
        self.repository
            .reservations
            .sweep_expired(now, self.grace)
            .await
    }
}
