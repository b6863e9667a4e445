//! Bibliotheca Library Server
//!
//! REST JSON API for a small library network: book catalog, physical copies,
//! reservations with automatic expiry, reviews and user accounts.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

pub mod api;
pub mod config;
pub mod error;
pub mod isbn;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> anyhow::Result<Router> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Per-IP throttling of credential endpoints
    let governor_conf = GovernorConfigBuilder::default()
        .per_second(state.config.rate_limit.per_second)
        .burst_size(state.config.rate_limit.burst_size)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("Invalid rate limit configuration"))?;

    let credentials = Router::new()
        .route("/login", post(api::auth::login))
        .route("/registration", post(api::auth::register))
        .layer(GovernorLayer {
            config: Arc::new(governor_conf),
        });

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Authentication
        .route("/logout/:id", post(api::auth::logout))
        .route("/csrf-token", get(api::csrf::issue_token))
        // Books
        .route(
            "/books",
            get(api::books::list_books).post(api::books::create_book),
        )
        .route(
            "/books/:id",
            get(api::books::get_book)
                .put(api::books::update_book)
                .delete(api::books::delete_book),
        )
        .route("/books/:id/copies", get(api::books::list_book_copies))
        .route("/books/:id/reviews", get(api::books::list_book_reviews))
        // Copies
        .route("/copy", post(api::copies::create_copy))
        .route(
            "/copy/:id",
            get(api::copies::get_copy)
                .put(api::copies::update_copy)
                .delete(api::copies::delete_copy),
        )
        .route("/copy/:id/claim", post(api::copies::claim_copy))
        .route("/copy/:id/return", post(api::copies::return_copy))
        // Reservations
        .route(
            "/reservations",
            get(api::reservations::list_reservations).post(api::reservations::create_reservation),
        )
        .route("/reservations/sweep", post(api::reservations::sweep_reservations))
        .route(
            "/reservations/:id",
            get(api::reservations::get_reservation).delete(api::reservations::cancel_reservation),
        )
        // Reviews
        .route("/reviews", post(api::reviews::create_review))
        .route(
            "/reviews/:id",
            put(api::reviews::update_review).delete(api::reviews::delete_review),
        )
        // Users
        .route("/users", get(api::users::list_users))
        .route(
            "/users/:id",
            get(api::users::get_user)
                .put(api::users::update_user)
                .delete(api::users::delete_user),
        )
        .route("/users/:id/role", put(api::users::update_role))
        .route("/users/:id/reservations", get(api::users::list_user_reservations))
        // Libraries
        .route(
            "/libraries",
            get(api::libraries::list_libraries).post(api::libraries::create_library),
        )
        .route(
            "/libraries/:id",
            get(api::libraries::get_library)
                .put(api::libraries::update_library)
                .delete(api::libraries::delete_library),
        )
        .merge(credentials)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            api::csrf::require_csrf,
        ))
        .with_state(state);

    let openapi = api::openapi::create_openapi_router();

    Ok(Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use crate::{
        config::{
            AuthConfig, CsrfConfig, DatabaseConfig, LoggingConfig, RateLimitConfig,
            ReservationsConfig, ServerConfig,
        },
        repository::Repository,
        services::Services,
    };

    fn test_state(csrf_enabled: bool) -> AppState {
        let config = AppConfig {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            logging: LoggingConfig::default(),
            reservations: ReservationsConfig::default(),
            csrf: CsrfConfig {
                enabled: csrf_enabled,
            },
            rate_limit: RateLimitConfig::default(),
        };
        // Never connects unless a handler touches the database
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database.url)
            .expect("lazy pool");
        let services = Services::new(
            Repository::new(pool),
            config.auth.clone(),
            &config.reservations,
        );
        AppState {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }

    #[tokio::test]
    async fn test_health_route() {
        let app = create_router(test_state(false)).unwrap();
        let response = app
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_protected_route_requires_token() {
        let app = create_router(test_state(false)).unwrap();
        let response = app
            .oneshot(
                Request::post("/api/v1/reservations/sweep")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_csrf_rejects_unsafe_request_without_token() {
        let app = create_router(test_state(true)).unwrap();
        let response = app
            .oneshot(
                Request::post("/api/v1/reservations")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"copy_id":1}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_openapi_document_served() {
        let app = create_router(test_state(false)).unwrap();
        let response = app
            .oneshot(
                Request::get("/api-docs/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
