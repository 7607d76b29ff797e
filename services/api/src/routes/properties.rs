//! Property listings

use axum::{
    Extension,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use tracing::info;

use crate::{
    error::ApiResult,
    extract::{ValidJson, parse_id},
    identity::AuthUser,
    models::{NewProperty, PropertyPatch, PropertyQuery, timestamp},
    response::{Message, created, ok},
    state::AppState,
};

/// List available properties, newest first
pub async fn list_properties(
    State(state): State<AppState>,
    Query(query): Query<PropertyQuery>,
) -> ApiResult<impl IntoResponse> {
    let (filter, page) = query.into_parts()?;
    let properties = state.properties.list(&filter, page).await?;
    Ok(ok(properties))
}

/// Create a property owned by the caller
pub async fn create_property(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ValidJson(payload): ValidJson<NewProperty>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let property = state
        .properties
        .create(payload.into_property(user.id, timestamp()))
        .await?;

    info!("User {} created property {}", user.id, property.id);
    Ok(created(property))
}

/// Get a property by ID
pub async fn get_property(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id, "property")?;
    let property = state.properties.get(id).await?;
    Ok(ok(property))
}

/// Update a property owned by the caller
pub async fn update_property(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    ValidJson(patch): ValidJson<PropertyPatch>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id, "property")?;
    patch.validate()?;

    let property = state
        .properties
        .update(id, user.id, move |property| {
            patch.apply(property);
            Ok(())
        })
        .await?;

    info!("User {} updated property {}", user.id, id);
    Ok(ok(property))
}

/// Delete a property owned by the caller
pub async fn delete_property(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id, "property")?;
    state.properties.delete(id, user.id).await?;

    info!("User {} deleted property {}", user.id, id);
    Ok(ok(Message::new("Property deleted successfully")))
}
