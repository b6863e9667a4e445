//! CSRF protection (double-submit cookie)
//!
//! `GET /csrf-token` hands out a random token both in the body and as the
//! `csrf_token` cookie. When enabled, state-changing requests must echo it in
//! the `x-csrf-token` header.

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{error::AppError, AppState};

pub const CSRF_COOKIE: &str = "csrf_token";
pub const CSRF_HEADER: &str = "x-csrf-token";

#[derive(Serialize, ToSchema)]
pub struct CsrfTokenResponse {
    pub csrf_token: String,
}

/// 32 random bytes, URL-safe base64
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compare header and cookie tokens in constant time
fn tokens_match(header: Option<&str>, cookie: Option<&str>) -> bool {
    match (header, cookie) {
        (Some(h), Some(c)) if !h.is_empty() && h.len() == c.len() => h
            .bytes()
            .zip(c.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0,
        _ => false,
    }
}

fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Issue a CSRF token
#[utoipa::path(
    get,
    path = "/csrf-token",
    tag = "auth",
    responses(
        (status = 200, description = "New CSRF token (also set as cookie)", body = CsrfTokenResponse)
    )
)]
pub async fn issue_token(jar: CookieJar) -> (CookieJar, Json<CsrfTokenResponse>) {
    let token = generate_token();
    let cookie = Cookie::build((CSRF_COOKIE, token.clone()))
        .path("/")
        .same_site(SameSite::Strict)
        .build();

    (jar.add(cookie), Json(CsrfTokenResponse { csrf_token: token }))
}

/// Middleware rejecting unsafe requests without a matching CSRF token
pub async fn require_csrf(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !state.config.csrf.enabled || is_safe_method(request.method()) {
        return Ok(next.run(request).await);
    }

    let header = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok());
    let cookie = jar.get(CSRF_COOKIE).map(|c| c.value());

    if !tokens_match(header, cookie) {
        tracing::warn!(path = %request.uri().path(), "Rejected request with invalid CSRF token");
        return Err(AppError::Authorization("Missing or invalid CSRF token".to_string()));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_distinct() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 43);
        assert_ne!(a, b);
    }

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match(Some("abc"), Some("abc")));
        assert!(!tokens_match(Some("abc"), Some("abd")));
        assert!(!tokens_match(Some("abc"), Some("abcd")));
        assert!(!tokens_match(None, Some("abc")));
        assert!(!tokens_match(Some("abc"), None));
        assert!(!tokens_match(Some(""), Some("")));
    }

    #[test]
    fn test_safe_methods() {
        assert!(is_safe_method(&Method::GET));
        assert!(!is_safe_method(&Method::POST));
        assert!(!is_safe_method(&Method::DELETE));
    }
}
