//! Bookings and their lifecycle

use chrono::{DateTime, Utc};
use common::pagination::Pagination;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::Property;
use crate::policy::Owned;
use crate::repositories::Resource;
use crate::validation::{FieldErrors, validate_non_negative};

/// Booking lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    CheckedIn,
    CheckedOut,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::CheckedIn => "checked_in",
            BookingStatus::CheckedOut => "checked_out",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// The party allowed to move a booking from this state to `next`
    ///
    /// `None` when the step is not part of the lifecycle. The landlord
    /// drives a booking forward; the tenant may only withdraw it.
    pub fn transition_party(self, next: BookingStatus) -> Option<BookingParty> {
        use BookingStatus::*;

        match (self, next) {
            (Pending, Confirmed)
            | (Confirmed, CheckedIn)
            | (CheckedIn, CheckedOut)
            | (CheckedOut, Completed) => Some(BookingParty::Landlord),
            (Pending, Cancelled) | (Confirmed, Cancelled) => Some(BookingParty::Tenant),
            _ => None,
        }
    }

    /// Whether a booking in this state may move to `next`
    ///
    /// Re-asserting the current state is always allowed.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        self == next || self.transition_party(next).is_some()
    }
}

/// Side of a booking a caller acts for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingParty {
    Tenant,
    Landlord,
}

impl fmt::Display for BookingParty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BookingParty::Tenant => "tenant",
            BookingParty::Landlord => "landlord",
        })
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "checked_in" => Ok(BookingStatus::CheckedIn),
            "checked_out" => Ok(BookingStatus::CheckedOut),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(format!("Unknown booking status: {}", other)),
        }
    }
}

/// Payment progress of a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Partial,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "partial" => Ok(PaymentStatus::Partial),
            "paid" => Ok(PaymentStatus::Paid),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(format!("Unknown payment status: {}", other)),
        }
    }
}

/// Who is staying
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuestInfo {
    pub adults: i32,
    pub children: i32,
    pub infants: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
}

impl GuestInfo {
    fn validate(&self) -> Result<(), String> {
        if self.adults < 0 || self.children < 0 || self.infants < 0 {
            return Err("Guest counts cannot be negative".to_string());
        }
        Ok(())
    }
}

/// Booking entity
#[derive(Debug, Clone, Serialize)]
pub struct Booking {
    pub id: Uuid,
    pub property_id: Uuid,
    pub tenant_id: Uuid,
    pub landlord_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub rent_amount: f64,
    pub security_deposit: f64,
    pub service_fee: f64,
    pub cleaning_fee: f64,
    pub total_amount: f64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub special_requests: Vec<String>,
    pub guest_info: GuestInfo,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// The tenant and the landlord may both read a booking
    pub fn is_party(&self, caller: Uuid) -> bool {
        self.tenant_id == caller || self.landlord_id == caller
    }

    /// Whether `caller` is this booking's `party`
    pub fn acts_as(&self, caller: Uuid, party: BookingParty) -> bool {
        match party {
            BookingParty::Tenant => self.tenant_id == caller,
            BookingParty::Landlord => self.landlord_id == caller,
        }
    }
}

impl Owned for Booking {
    fn owner_id(&self) -> Uuid {
        self.tenant_id
    }
}

impl Resource for Booking {
    const NAME: &'static str = "Booking";
    type Filter = BookingFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }

    fn matches(&self, filter: &BookingFilter) -> bool {
        filter.matches(self)
    }
}

/// Booking creation payload
#[derive(Debug, Clone, Deserialize)]
pub struct NewBooking {
    pub property_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub message: Option<String>,
    #[serde(default)]
    pub special_requests: Vec<String>,
    #[serde(default)]
    pub guest_info: GuestInfo,
    #[serde(default)]
    pub security_deposit: f64,
    #[serde(default)]
    pub service_fee: f64,
    #[serde(default)]
    pub cleaning_fee: f64,
    pub payment_method: Option<String>,
}

impl NewBooking {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();

        check_dates(&mut errors, self.start_date, self.end_date);
        errors.check(
            "security_deposit",
            validate_non_negative("Security deposit", self.security_deposit),
        );
        errors.check(
            "service_fee",
            validate_non_negative("Service fee", self.service_fee),
        );
        errors.check(
            "cleaning_fee",
            validate_non_negative("Cleaning fee", self.cleaning_fee),
        );
        errors.check("guest_info", self.guest_info.validate());
        if let Some(message) = &self.message {
            check_message(&mut errors, message);
        }

        errors.into_result()
    }

    /// Build a pending booking by `tenant_id` against `property`
    ///
    /// Landlord, rent and currency always come from the property.
    pub fn into_booking(self, tenant_id: Uuid, property: &Property, now: DateTime<Utc>) -> Booking {
        let rent_amount = property.price;
        let total_amount = rent_amount + self.security_deposit + self.service_fee + self.cleaning_fee;

        Booking {
            id: Uuid::new_v4(),
            property_id: property.id,
            tenant_id,
            landlord_id: property.owner_id,
            start_date: self.start_date,
            end_date: self.end_date,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            rent_amount,
            security_deposit: self.security_deposit,
            service_fee: self.service_fee,
            cleaning_fee: self.cleaning_fee,
            total_amount,
            currency: property.currency.clone(),
            payment_method: self.payment_method,
            message: self.message,
            special_requests: self.special_requests,
            guest_info: self.guest_info,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Fields a party may change on a booking
///
/// Property, tenant, landlord, payment and the amounts are not part of it;
/// such keys are dropped during deserialization. Dates, message, requests
/// and guests belong to the tenant. `status` moves along the lifecycle,
/// each step reserved to one party.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingPatch {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: Option<BookingStatus>,
    pub message: Option<String>,
    pub special_requests: Option<Vec<String>>,
    pub guest_info: Option<GuestInfo>,
}

impl BookingPatch {
    /// Merge into `booking` on behalf of `caller`
    ///
    /// Checks that the caller may make every change in the patch, that the
    /// status step exists and that the merged dates are ordered. Nothing is
    /// modified unless all checks pass.
    pub fn apply(self, booking: &mut Booking, caller: Uuid) -> Result<(), ApiError> {
        if !booking.is_party(caller) {
            return Err(ApiError::Forbidden(
                "Not authorized to update this booking".to_string(),
            ));
        }

        if self.edits_details() && !booking.acts_as(caller, BookingParty::Tenant) {
            return Err(ApiError::Forbidden(
                "Only the tenant can change booking details".to_string(),
            ));
        }

        if let Some(next) = self.status.filter(|next| *next != booking.status) {
            let Some(party) = booking.status.transition_party(next) else {
                return Err(ApiError::Validation {
                    message: format!(
                        "Invalid status transition from {} to {}",
                        booking.status, next
                    ),
                    details: Some(json!({
                        "status": {"from": booking.status, "to": next}
                    })),
                });
            };

            if !booking.acts_as(caller, party) {
                return Err(ApiError::Forbidden(format!(
                    "Only the {} can mark a booking as {}",
                    party, next
                )));
            }
        }

        let mut errors = FieldErrors::new();
        let start = self.start_date.unwrap_or(booking.start_date);
        let end = self.end_date.unwrap_or(booking.end_date);
        check_dates(&mut errors, start, end);
        if let Some(guest_info) = &self.guest_info {
            errors.check("guest_info", guest_info.validate());
        }
        if let Some(message) = &self.message {
            check_message(&mut errors, message);
        }
        errors.into_result()?;

        booking.start_date = start;
        booking.end_date = end;
        if let Some(status) = self.status {
            booking.status = status;
        }
        if let Some(message) = self.message {
            booking.message = Some(message);
        }
        if let Some(special_requests) = self.special_requests {
            booking.special_requests = special_requests;
        }
        if let Some(guest_info) = self.guest_info {
            booking.guest_info = guest_info;
        }

        Ok(())
    }

    fn edits_details(&self) -> bool {
        self.start_date.is_some()
            || self.end_date.is_some()
            || self.message.is_some()
            || self.special_requests.is_some()
            || self.guest_info.is_some()
    }
}

/// Which side of the booking the caller is listing from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BookingScope {
    #[default]
    Tenant,
    Landlord,
}

/// Bookings of one party, optionally in one status
#[derive(Debug, Clone, PartialEq)]
pub struct BookingFilter {
    pub caller: Uuid,
    pub scope: BookingScope,
    pub status: Option<BookingStatus>,
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        let party = match self.scope {
            BookingScope::Tenant => booking.tenant_id,
            BookingScope::Landlord => booking.landlord_id,
        };

        party == self.caller && self.status.is_none_or(|s| s == booking.status)
    }
}

/// Raw query string of `GET /bookings`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingQuery {
    pub limit: Option<String>,
    pub skip: Option<String>,
    pub status: Option<String>,
    pub scope: Option<String>,
}

impl BookingQuery {
    pub fn into_parts(self, caller: Uuid) -> Result<(BookingFilter, Pagination), ApiError> {
        let page = Pagination::from_params(self.limit.as_deref(), self.skip.as_deref());

        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<BookingStatus>()
                    .map_err(|_| ApiError::validation("Invalid booking status"))?,
            ),
        };

        let scope = match self.scope.as_deref().map(str::trim) {
            None | Some("") | Some("tenant") => BookingScope::Tenant,
            Some("landlord") => BookingScope::Landlord,
            Some(_) => return Err(ApiError::validation("Scope must be tenant or landlord")),
        };

        Ok((
            BookingFilter {
                caller,
                scope,
                status,
            },
            page,
        ))
    }
}

fn check_dates(errors: &mut FieldErrors, start: DateTime<Utc>, end: DateTime<Utc>) {
    if start >= end {
        errors.add("end_date", "End date must be after start date");
    }
}

fn check_message(errors: &mut FieldErrors, message: &str) {
    if message.chars().count() > 1000 {
        errors.add("message", "Message must be at most 1000 characters long");
    }
}
