//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{
    auth, books, copies, csrf, health, libraries, reservations, reviews, users, PaginatedBooks,
    PaginatedReservations, PaginatedUsers, AUTH_TOKEN_HEADER,
};

/// Registers the `auth_token` header scheme
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "auth_token",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(AUTH_TOKEN_HEADER))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bibliotheca API",
        version = "0.4.0",
        description = "Library catalog and reservation REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    modifiers(&SecurityAddon),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::register,
        auth::logout,
        csrf::issue_token,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        books::list_book_copies,
        books::list_book_reviews,
        // Copies
        copies::create_copy,
        copies::get_copy,
        copies::update_copy,
        copies::delete_copy,
        copies::claim_copy,
        copies::return_copy,
        // Reservations
        reservations::list_reservations,
        reservations::create_reservation,
        reservations::get_reservation,
        reservations::cancel_reservation,
        reservations::sweep_reservations,
        // Reviews
        reviews::create_review,
        reviews::update_review,
        reviews::delete_review,
        // Users
        users::list_users,
        users::get_user,
        users::update_user,
        users::update_role,
        users::delete_user,
        users::list_user_reservations,
        // Libraries
        libraries::list_libraries,
        libraries::get_library,
        libraries::create_library,
        libraries::update_library,
        libraries::delete_library,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            auth::MessageResponse,
            csrf::CsrfTokenResponse,
            // Books
            crate::models::book::Book,
            crate::models::book::BookSummary,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            PaginatedBooks,
            // Copies
            crate::models::copy::CopyState,
            crate::models::copy::BookCopy,
            crate::models::copy::CopyDetails,
            crate::models::copy::CreateCopy,
            crate::models::copy::UpdateCopy,
            // Reservations
            crate::models::reservation::Reservation,
            crate::models::reservation::ReservationDetails,
            crate::models::reservation::CreateReservation,
            crate::models::reservation::SweepReport,
            PaginatedReservations,
            // Reviews
            crate::models::review::Review,
            crate::models::review::CreateReview,
            crate::models::review::UpdateReview,
            // Users
            crate::models::user::Role,
            crate::models::user::User,
            crate::models::user::RegisterUser,
            crate::models::user::UpdateUser,
            crate::models::user::UpdateRole,
            PaginatedUsers,
            // Libraries
            crate::models::library::Library,
            crate::models::library::CreateLibrary,
            crate::models::library::UpdateLibrary,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "books", description = "Book catalog"),
        (name = "copies", description = "Physical copies"),
        (name = "reservations", description = "Copy reservations"),
        (name = "reviews", description = "Book reviews"),
        (name = "users", description = "User management"),
        (name = "libraries", description = "Library branches")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
