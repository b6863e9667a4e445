//! Business logic services

pub mod catalog;
pub mod libraries;
pub mod reservations;
pub mod reviews;
pub mod sweeper;
pub mod users;

use crate::{
    config::{AuthConfig, ReservationsConfig},
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub reservations: reservations::ReservationsService,
    pub reviews: reviews::ReviewsService,
    pub users: users::UsersService,
    pub libraries: libraries::LibrariesService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(
        repository: Repository,
        auth_config: AuthConfig,
        reservations_config: &ReservationsConfig,
    ) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            reservations: reservations::ReservationsService::new(
                repository.clone(),
                reservations_config,
            ),
            reviews: reviews::ReviewsService::new(repository.clone()),
            users: users::UsersService::new(repository.clone(), auth_config),
            libraries: libraries::LibrariesService::new(repository.clone()),
            repository,
        }
    }

    /// Check database connectivity
    pub async fn ping_database(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(&self.repository.pool)
            .await
            .is_ok()
    }
}
