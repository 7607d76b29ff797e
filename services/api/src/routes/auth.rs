//! Registration and login

use axum::{extract::State, response::IntoResponse};
use tracing::info;

use crate::{
    error::ApiResult,
    extract::ValidJson,
    models::{LoginRequest, RegisterRequest, UserResponse},
    response::{created, ok},
    state::AppState,
};

/// Register a new account
pub async fn register(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = state.identity.register(payload).await?;
    Ok(created(UserResponse::from(user)))
}

/// Exchange credentials for an access token
pub async fn login(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;
    let session = state
        .identity
        .authenticate(&payload.email, &payload.password)
        .await?;
    Ok(ok(session))
}

/// Refresh an access token
pub async fn refresh(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    info!("Token refresh requested");
    let session = state.identity.refresh()?;
    Ok(ok(session))
}
