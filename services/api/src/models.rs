//! Records, creation payloads and update patches for the API service

use chrono::{DateTime, SubsecRound, Utc};

pub mod booking;
pub mod property;
pub mod user;

pub use booking::{
    Booking, BookingFilter, BookingParty, BookingPatch, BookingQuery, BookingScope, BookingStatus,
    GuestInfo, NewBooking, PaymentStatus,
};
pub use property::{
    Address, GeoLocation, NewProperty, Property, PropertyFilter, PropertyPatch, PropertyQuery,
    PropertyStatus, PropertyType,
};
pub use user::{LoginRequest, RegisterRequest, Role, User, UserPatch, UserResponse};

/// Current time at the precision the store keeps (microseconds)
///
/// Stored timestamps are compared for equality by conditional writes, so
/// every timestamp handed to a store must survive a round trip unchanged.
pub fn timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_has_microsecond_precision() {
        let now = timestamp();
        assert_eq!(now.timestamp_subsec_nanos() % 1_000, 0);
    }
}
