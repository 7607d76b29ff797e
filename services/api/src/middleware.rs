//! Authorization guard for protected routes

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use tracing::debug;

use crate::{
    error::ApiError,
    identity::INVALID_TOKEN,
    state::AppState,
};

/// Authentication middleware
///
/// Resolves the bearer token to an `AuthUser` and stores it in the
/// request extensions. Missing, malformed and expired tokens are all
/// rejected with the same 401 before the handler runs.
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        debug!("Request to {} without a bearer token", req.uri().path());
        return Err(ApiError::Unauthorized(INVALID_TOKEN.to_string()));
    };

    let user = state.identity.validate_token(bearer.token())?;

    // Insert the user into the request extensions
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
