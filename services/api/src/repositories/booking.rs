//! Booking storage backed by Postgres

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    error::{DatabaseError, DatabaseResult},
    pagination::Pagination,
};
use sqlx::{PgPool, postgres::PgRow, types::Json};
use tracing::info;
use uuid::Uuid;

use super::{Collection, column, parsed_column};
use crate::models::{Booking, BookingFilter, BookingScope, GuestInfo};

/// Booking repository for database operations
#[derive(Clone)]
pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    /// Create a new booking repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn booking_from_row(row: &PgRow) -> DatabaseResult<Booking> {
    let guest_info: Json<GuestInfo> = column(row, "guest_info")?;

    Ok(Booking {
        id: column(row, "id")?,
        property_id: column(row, "property_id")?,
        tenant_id: column(row, "tenant_id")?,
        landlord_id: column(row, "landlord_id")?,
        start_date: column(row, "start_date")?,
        end_date: column(row, "end_date")?,
        status: parsed_column(row, "status")?,
        payment_status: parsed_column(row, "payment_status")?,
        rent_amount: column(row, "rent_amount")?,
        security_deposit: column(row, "security_deposit")?,
        service_fee: column(row, "service_fee")?,
        cleaning_fee: column(row, "cleaning_fee")?,
        total_amount: column(row, "total_amount")?,
        currency: column(row, "currency")?,
        payment_method: column(row, "payment_method")?,
        message: column(row, "message")?,
        special_requests: column(row, "special_requests")?,
        guest_info: guest_info.0,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}

#[async_trait]
impl Collection<Booking> for PgBookingRepository {
    async fn insert(&self, booking: &Booking) -> DatabaseResult<()> {
        info!(
            "Creating booking {} on property {} for tenant {}",
            booking.id, booking.property_id, booking.tenant_id
        );

        sqlx::query(
            r#"
            INSERT INTO bookings (id, property_id, tenant_id, landlord_id, start_date, end_date,
                                  status, payment_status, rent_amount, security_deposit,
                                  service_fee, cleaning_fee, total_amount, currency,
                                  payment_method, message, special_requests, guest_info,
                                  created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                    $18, $19, $20)
            "#,
        )
        .bind(booking.id)
        .bind(booking.property_id)
        .bind(booking.tenant_id)
        .bind(booking.landlord_id)
        .bind(booking.start_date)
        .bind(booking.end_date)
        .bind(booking.status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(booking.rent_amount)
        .bind(booking.security_deposit)
        .bind(booking.service_fee)
        .bind(booking.cleaning_fee)
        .bind(booking.total_amount)
        .bind(&booking.currency)
        .bind(&booking.payment_method)
        .bind(&booking.message)
        .bind(&booking.special_requests)
        .bind(Json(&booking.guest_info))
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_write(e, "id"))?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<Booking>> {
        let row = sqlx::query(
            r#"
            SELECT id, property_id, tenant_id, landlord_id, start_date, end_date, status,
                   payment_status, rent_amount, security_deposit, service_fee, cleaning_fee,
                   total_amount, currency, payment_method, message, special_requests, guest_info,
                   created_at, updated_at
            FROM bookings
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        row.as_ref().map(booking_from_row).transpose()
    }

    async fn list(&self, filter: &BookingFilter, page: Pagination) -> DatabaseResult<Vec<Booking>> {
        let landlord_scope = filter.scope == BookingScope::Landlord;

        let rows = sqlx::query(
            r#"
            SELECT id, property_id, tenant_id, landlord_id, start_date, end_date, status,
                   payment_status, rent_amount, security_deposit, service_fee, cleaning_fee,
                   total_amount, currency, payment_method, message, special_requests, guest_info,
                   created_at, updated_at
            FROM bookings
            WHERE (CASE WHEN $2 THEN landlord_id ELSE tenant_id END) = $1
              AND ($3::text IS NULL OR status = $3)
            ORDER BY created_at DESC, id DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.caller)
        .bind(landlord_scope)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(page.limit)
        .bind(page.skip)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        rows.iter().map(booking_from_row).collect()
    }

    async fn replace(
        &self,
        booking: &Booking,
        expected_updated_at: DateTime<Utc>,
    ) -> DatabaseResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET start_date = $4, end_date = $5, status = $6, payment_status = $7, message = $8,
                special_requests = $9, guest_info = $10, updated_at = $11
            WHERE id = $1 AND tenant_id = $2 AND updated_at = $3
            "#,
        )
        .bind(booking.id)
        .bind(booking.tenant_id)
        .bind(expected_updated_at)
        .bind(booking.start_date)
        .bind(booking.end_date)
        .bind(booking.status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(&booking.message)
        .bind(&booking.special_requests)
        .bind(Json(&booking.guest_info))
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid, tenant_id: Uuid) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        Ok(result.rows_affected() > 0)
    }
}
