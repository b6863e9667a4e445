//! API integration tests
//!
//! Run against a live server with a bootstrap administrator configured:
//!
//! ```text
//! BIBLIOTHECA_AUTH__BOOTSTRAP_ADMIN__USERNAME=admin \
//! BIBLIOTHECA_AUTH__BOOTSTRAP_ADMIN__EMAIL=admin@example.org \
//! BIBLIOTHECA_AUTH__BOOTSTRAP_ADMIN__PASSWORD=change-this-password \
//! BIBLIOTHECA_RATE_LIMIT__BURST_SIZE=200 cargo run
//! cargo test --test api_tests -- --ignored
//! ```

use std::sync::atomic::{AtomicU32, Ordering};

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

static SEQ: AtomicU32 = AtomicU32::new(0);

fn admin_credentials() -> (String, String) {
    (
        std::env::var("TEST_ADMIN_LOGIN").unwrap_or_else(|_| "admin".to_string()),
        std::env::var("TEST_ADMIN_PASSWORD").unwrap_or_else(|_| "change-this-password".to_string()),
    )
}

fn unique_name(prefix: &str) -> String {
    format!(
        "{}_{}_{}",
        prefix,
        std::process::id(),
        SEQ.fetch_add(1, Ordering::SeqCst)
    )
}

async fn login(client: &Client, login: &str, password: &str) -> Value {
    let response = client
        .post(format!("{}/login", BASE_URL))
        .json(&json!({ "login": login, "password": password }))
        .send()
        .await
        .expect("Failed to send login request");

    assert_eq!(response.status(), StatusCode::OK);
    response.json().await.expect("Failed to parse login response")
}

async fn admin_token(client: &Client) -> String {
    let (name, password) = admin_credentials();
    let body = login(client, &name, &password).await;
    body["token"].as_str().expect("No token in response").to_string()
}

/// Register a fresh member and return (user id, token)
async fn member(client: &Client) -> (i64, String) {
    let username = unique_name("member");
    let password = "correct-horse-battery";

    let response = client
        .post(format!("{}/registration", BASE_URL))
        .json(&json!({
            "username": username,
            "email": format!("{}@example.org", username),
            "password": password
        }))
        .send()
        .await
        .expect("Failed to send registration request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = login(client, &username, password).await;
    (
        body["user"]["id"].as_i64().expect("No user id"),
        body["token"].as_str().expect("No token").to_string(),
    )
}

/// Create a book with one copy, returning the copy id
async fn copy_fixture(client: &Client, admin: &str) -> i64 {
    let book: Value = client
        .post(format!("{}/books", BASE_URL))
        .header("auth_token", admin)
        .json(&json!({ "title": unique_name("Book"), "author": "Test Author" }))
        .send()
        .await
        .expect("Failed to create book")
        .json()
        .await
        .expect("Failed to parse book");

    let copy: Value = client
        .post(format!("{}/copy", BASE_URL))
        .header("auth_token", admin)
        .json(&json!({ "book_id": book["id"] }))
        .send()
        .await
        .expect("Failed to create copy")
        .json()
        .await
        .expect("Failed to parse copy");

    assert_eq!(copy["state"], "available");
    copy["id"].as_i64().expect("No copy id")
}

async fn reserve(client: &Client, token: &str, copy_id: i64) -> reqwest::Response {
    client
        .post(format!("{}/reservations", BASE_URL))
        .header("auth_token", token)
        .json(&json!({ "copy_id": copy_id }))
        .send()
        .await
        .expect("Failed to send reservation request")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/login", BASE_URL))
        .json(&json!({ "login": "admin", "password": "wrong" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["success"], false);
}

#[tokio::test]
#[ignore]
async fn test_unauthorized_access() {
    let client = Client::new();

    let response = client
        .get(format!("{}/users", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_member_cannot_list_users() {
    let client = Client::new();
    let (_, token) = member(&client).await;

    let response = client
        .get(format!("{}/users", BASE_URL))
        .header("auth_token", &token)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore]
async fn test_double_reservation_is_rejected() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let copy_id = copy_fixture(&client, &admin).await;
    let (_, first) = member(&client).await;
    let (_, second) = member(&client).await;

    let response = reserve(&client, &first, copy_id).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = reserve(&client, &second, copy_id).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["success"], false);
}

#[tokio::test]
#[ignore]
async fn test_reservation_lifecycle() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let copy_id = copy_fixture(&client, &admin).await;
    let (user_id, token) = member(&client).await;

    let reservation: Value = reserve(&client, &token, copy_id)
        .await
        .json()
        .await
        .expect("Failed to parse reservation");
    let reservation_id = reservation["id"].as_i64().expect("No reservation id");

    // A fresh reservation is well inside its grace window
    let report: Value = client
        .post(format!("{}/reservations/sweep", BASE_URL))
        .header("auth_token", &admin)
        .send()
        .await
        .expect("Failed to sweep")
        .json()
        .await
        .expect("Failed to parse sweep report");
    let expired = report["expired"].as_array().expect("expired list");
    assert!(!expired.iter().any(|id| id.as_i64() == Some(reservation_id)));

    let listed: Value = client
        .get(format!("{}/users/{}/reservations", BASE_URL, user_id))
        .header("auth_token", &token)
        .send()
        .await
        .expect("Failed to list reservations")
        .json()
        .await
        .expect("Failed to parse reservations");
    assert_eq!(listed["total"], 1);

    let claimed: Value = client
        .post(format!("{}/copy/{}/claim", BASE_URL, copy_id))
        .header("auth_token", &admin)
        .send()
        .await
        .expect("Failed to claim")
        .json()
        .await
        .expect("Failed to parse copy");
    assert_eq!(claimed["state"], "claimed");

    // Claimed copies can no longer be cancelled
    let response = client
        .delete(format!("{}/reservations/{}", BASE_URL, reservation_id))
        .header("auth_token", &token)
        .send()
        .await
        .expect("Failed to cancel");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let returned: Value = client
        .post(format!("{}/copy/{}/return", BASE_URL, copy_id))
        .header("auth_token", &admin)
        .send()
        .await
        .expect("Failed to return")
        .json()
        .await
        .expect("Failed to parse copy");
    assert_eq!(returned["state"], "available");

    let response = reserve(&client, &token, copy_id).await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
#[ignore]
async fn test_logout_revokes_token() {
    let client = Client::new();
    let (user_id, token) = member(&client).await;

    let response = client
        .post(format!("{}/logout/{}", BASE_URL, user_id))
        .header("auth_token", &token)
        .send()
        .await
        .expect("Failed to logout");
    assert_eq!(response.status(), StatusCode::OK);

    let response = client
        .get(format!("{}/users/{}", BASE_URL, user_id))
        .header("auth_token", &token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
