//! Shared helpers for the HTTP tests

#![allow(dead_code)]

use axum::http::{StatusCode, header::AUTHORIZATION};
use axum_test::{TestRequest, TestServer};
use rental_api::{
    AppState, create_router, credentials::HashingCost, jwt::JwtConfig,
};
use serde_json::{Value, json};

pub const PASSWORD: &str = "Password123!";

/// Router over a fresh in-memory store
pub fn server() -> TestServer {
    let state = AppState::in_memory(
        JwtConfig {
            secret: "test-secret-key-for-testing-only".to_string(),
            key_id: "test".to_string(),
            access_token_expiry: 86_400,
        },
        HashingCost {
            memory_kib: 256,
            iterations: 1,
        },
    )
    .expect("Failed to build test state");

    TestServer::new(create_router(state)).expect("Failed to create test server")
}

pub trait Authed {
    fn bearer(self, token: &str) -> Self;
}

impl Authed for TestRequest {
    fn bearer(self, token: &str) -> Self {
        self.add_header(AUTHORIZATION, format!("Bearer {}", token))
    }
}

/// Register an account and return the `data` of the response
pub async fn register(server: &TestServer, email: &str) -> Value {
    let response = server
        .post("/api/v1/auth/register")
        .json(&json!({
            "email": email,
            "password": PASSWORD,
            "name": "Test User"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["data"].clone()
}

/// Log in and return the access token
pub async fn login(server: &TestServer, email: &str) -> String {
    let response = server
        .post("/api/v1/auth/login")
        .json(&json!({"email": email, "password": PASSWORD}))
        .await;
    response.assert_status_ok();
    response.json::<Value>()["data"]["access_token"]
        .as_str()
        .expect("access token")
        .to_string()
}

/// Register and log in; returns `(user id, token)`
pub async fn sign_up(server: &TestServer, email: &str) -> (String, String) {
    let user = register(server, email).await;
    let token = login(server, email).await;
    (user["id"].as_str().expect("user id").to_string(), token)
}

pub fn property_body(title: &str, city: &str, price: f64) -> Value {
    json!({
        "title": title,
        "description": "A comfortable place with plenty of natural light.",
        "type": "apartment",
        "price": price,
        "address": {"street": "10 Market St", "city": city, "country": "US"},
        "bedrooms": 2,
        "bathrooms": 1,
        "amenities": ["wifi", "washer"]
    })
}

/// Create a property as `token` and return its `data`
pub async fn create_property(server: &TestServer, token: &str, title: &str, city: &str) -> Value {
    let response = server
        .post("/api/v1/properties")
        .bearer(token)
        .json(&property_body(title, city, 1200.0))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["data"].clone()
}
