//! Bookings

use axum::{
    Extension,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use tracing::{info, warn};

use crate::{
    error::{ApiError, ApiResult},
    extract::{ValidJson, parse_id},
    identity::AuthUser,
    models::{BookingPatch, BookingQuery, NewBooking, timestamp},
    response::{Message, created, ok},
    state::AppState,
};

/// List the caller's bookings, as tenant (default) or as landlord
pub async fn list_bookings(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<BookingQuery>,
) -> ApiResult<impl IntoResponse> {
    let (filter, page) = query.into_parts(user.id)?;
    let bookings = state.bookings.list(&filter, page).await?;
    Ok(ok(bookings))
}

/// Book a property as the caller
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ValidJson(payload): ValidJson<NewBooking>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let property = state.properties.get(payload.property_id).await?;
    let booking = state
        .bookings
        .create(payload.into_booking(user.id, &property, timestamp()))
        .await?;

    info!(
        "User {} booked property {} as booking {}",
        user.id, property.id, booking.id
    );
    Ok(created(booking))
}

/// Get a booking visible to the caller
pub async fn get_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id, "booking")?;
    let booking = state.bookings.get(id).await?;

    if !booking.is_party(user.id) {
        warn!("User {} denied view on Booking {}", user.id, id);
        return Err(ApiError::Forbidden(
            "Not authorized to view this booking".to_string(),
        ));
    }

    Ok(ok(booking))
}

/// Update a booking as its tenant or its landlord
///
/// The tenant edits the stay and may cancel; the landlord moves the
/// booking through confirmation, check-in, check-out and completion.
pub async fn update_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    ValidJson(patch): ValidJson<BookingPatch>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id, "booking")?;
    let caller = user.id;

    let booking = state
        .bookings
        .update_with(id, move |booking| patch.apply(booking, caller))
        .await
        .inspect_err(|e| {
            if let ApiError::Forbidden(reason) = e {
                warn!("User {} denied update on Booking {}: {}", caller, id, reason);
            }
        })?;

    info!(
        "User {} updated booking {} (status {})",
        caller, id, booking.status
    );
    Ok(ok(booking))
}

/// Delete a booking created by the caller
pub async fn delete_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id, "booking")?;
    state.bookings.delete(id, user.id).await?;

    info!("User {} deleted booking {}", user.id, id);
    Ok(ok(Message::new("Booking deleted successfully")))
}
