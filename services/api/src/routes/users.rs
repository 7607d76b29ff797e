//! The caller's own profile

use axum::{Extension, extract::State, response::IntoResponse};
use tracing::info;

use crate::{
    error::ApiResult,
    extract::ValidJson,
    identity::AuthUser,
    models::{UserPatch, UserResponse},
    response::ok,
    state::AppState,
};

/// Get the caller's profile
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    info!("Fetching profile of user {}", user.id);
    let profile = state.identity.profile(user.id).await?;
    Ok(ok(UserResponse::from(profile)))
}

/// Update the caller's profile
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ValidJson(patch): ValidJson<UserPatch>,
) -> ApiResult<impl IntoResponse> {
    let profile = state.identity.update_profile(user.id, patch).await?;
    Ok(ok(UserResponse::from(profile)))
}
