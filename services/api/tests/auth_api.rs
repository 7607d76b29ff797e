//! Registration, login, token guard and profile endpoints

mod support;

use axum::http::StatusCode;
use serde_json::{Value, json};
use support::{Authed, PASSWORD, login, register, server, sign_up};

#[tokio::test]
async fn test_register_login_and_profile() {
    let server = server();

    let response = server
        .post("/api/v1/auth/register")
        .json(&json!({"email": "a@x.com", "password": "Password123!", "name": "A"}))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["email"], "a@x.com");
    assert_eq!(body["data"]["role"], "tenant");
    assert_eq!(body["data"]["verified"], false);
    assert!(body["data"].get("password").is_none());
    assert!(body["data"].get("password_hash").is_none());

    let response = server
        .post("/api/v1/auth/login")
        .json(&json!({"email": "a@x.com", "password": "Password123!"}))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["token_type"], "Bearer");
    assert_eq!(body["data"]["expires_in"], 86_400);
    let token = body["data"]["access_token"].as_str().unwrap().to_string();

    let response = server.get("/api/v1/users/profile").bearer(&token).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["email"], "a@x.com");
    assert!(body["data"]["last_login_at"].is_string());

    let response = server.get("/api/v1/users/profile").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["code"], 401);
}

#[tokio::test]
async fn test_duplicate_email_is_conflict() {
    let server = server();
    register(&server, "dup@x.com").await;

    let response = server
        .post("/api/v1/auth/register")
        .json(&json!({"email": "DUP@x.com", "password": PASSWORD, "name": "Again"}))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"], "Email already exists");
    assert_eq!(body["code"], 409);
}

#[tokio::test]
async fn test_invalid_registration_is_rejected() {
    let server = server();

    let response = server
        .post("/api/v1/auth/register")
        .json(&json!({"email": "weak@x.com", "password": "weak", "name": "Weak"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Validation failed");
    assert!(body["details"]["password"].is_array());

    let response = server
        .post("/api/v1/auth/register")
        .json(&json!({"password": PASSWORD, "name": "No Email"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json_uses_error_envelope() {
    let server = server();

    let response = server
        .post("/api/v1/auth/login")
        .content_type("application/json")
        .text("{not json")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn test_login_failures_look_the_same() {
    let server = server();
    register(&server, "real@x.com").await;

    let wrong_password = server
        .post("/api/v1/auth/login")
        .json(&json!({"email": "real@x.com", "password": "Password123?"}))
        .await;
    let unknown_email = server
        .post("/api/v1/auth/login")
        .json(&json!({"email": "ghost@x.com", "password": PASSWORD}))
        .await;

    wrong_password.assert_status(StatusCode::UNAUTHORIZED);
    unknown_email.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(
        wrong_password.json::<Value>(),
        unknown_email.json::<Value>()
    );
    assert_eq!(wrong_password.json::<Value>()["error"], "Invalid credentials");
}

#[tokio::test]
async fn test_login_is_case_insensitive_on_email() {
    let server = server();
    register(&server, "mixed@x.com").await;

    server
        .post("/api/v1/auth/login")
        .json(&json!({"email": "Mixed@X.com", "password": PASSWORD}))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let server = server();

    let response = server
        .get("/api/v1/users/profile")
        .bearer("definitely.not.valid")
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_is_not_implemented() {
    let server = server();

    let response = server.post("/api/v1/auth/refresh").await;
    response.assert_status(StatusCode::NOT_IMPLEMENTED);
    assert_eq!(
        response.json::<Value>(),
        json!({"error": "Not implemented", "code": 501})
    );
}

#[tokio::test]
async fn test_profile_update_keeps_email_and_role() {
    let server = server();
    let (_, token) = sign_up(&server, "me@x.com").await;

    let response = server
        .put("/api/v1/users/profile")
        .bearer(&token)
        .json(&json!({
            "email": "hijack@x.com",
            "role": "admin",
            "bio": "Looking for a quiet flat",
            "languages": ["en", "pt"]
        }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["email"], "me@x.com");
    assert_eq!(body["data"]["role"], "tenant");
    assert_eq!(body["data"]["bio"], "Looking for a quiet flat");
    assert_eq!(body["data"]["languages"], json!(["en", "pt"]));

    // The old address still logs in
    login(&server, "me@x.com").await;
}

#[tokio::test]
async fn test_health() {
    let server = server();

    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "rental-api");
    assert_eq!(body["storage"]["backend"], "memory");
}
