//! API service routes

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde_json::json;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::{middleware::auth_middleware, state::AppState};

pub mod auth;
pub mod bookings;
pub mod properties;
pub mod users;

/// Create the router for the API service
///
/// Everything but `/health` lives under `/api/v1`. Property reads are
/// public; every other resource route sits behind the auth middleware.
pub fn create_router(state: AppState) -> Router {
    let guard = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let api = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route(
            "/users/profile",
            get(users::get_profile)
                .put(users::update_profile)
                .route_layer(guard.clone()),
        )
        .route(
            "/properties",
            get(properties::list_properties)
                .merge(post(properties::create_property).route_layer(guard.clone())),
        )
        .route(
            "/properties/:id",
            get(properties::get_property).merge(
                put(properties::update_property)
                    .delete(properties::delete_property)
                    .route_layer(guard.clone()),
            ),
        )
        .route(
            "/bookings",
            get(bookings::list_bookings)
                .post(bookings::create_booking)
                .route_layer(guard.clone()),
        )
        .route(
            "/bookings/:id",
            get(bookings::get_booking)
                .put(bookings::update_booking)
                .delete(bookings::delete_booking)
                .route_layer(guard),
        );

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS policy for the configured origins
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let healthy = state.storage_healthy().await;
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if healthy { "ok" } else { "degraded" },
            "service": "rental-api",
            "storage": {
                "backend": state.storage_name(),
                "healthy": healthy
            }
        })),
    )
}
