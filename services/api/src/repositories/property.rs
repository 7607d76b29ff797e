//! Property storage backed by Postgres

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
use crate::models::{Address, GeoLocation, Property, PropertyFilter};

/// Property repository for database operations
#[derive(Clone)]
pub struct PgPropertyRepository {
    pool: PgPool,
}

impl PgPropertyRepository {
    /// Create a new property repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn property_from_row(row: &PgRow) -> DatabaseResult<Property> {
    let address: Json<Address> = column(row, "address")?;
    let location: Option<Json<GeoLocation>> = column(row, "location")?;

    Ok(Property {
        id: column(row, "id")?,
        title: column(row, "title")?,
        description: column(row, "description")?,
        property_type: parsed_column(row, "property_type")?,
        price: column(row, "price")?,
        currency: column(row, "currency")?,
        address: address.0,
        location: location.map(|l| l.0),
        bedrooms: column(row, "bedrooms")?,
        bathrooms: column(row, "bathrooms")?,
        area: column(row, "area")?,
        amenities: column(row, "amenities")?,
        images: column(row, "images")?,
        available: column(row, "available")?,
        owner_id: column(row, "owner_id")?,
        status: parsed_column(row, "status")?,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}

#[async_trait]
impl Collection<Property> for PgPropertyRepository {
    async fn insert(&self, property: &Property) -> DatabaseResult<()> {
        info!("Creating property {} for owner {}", property.id, property.owner_id);

        sqlx::query(
            r#"
            INSERT INTO properties (id, title, description, property_type, price, currency,
                                    address, location, bedrooms, bathrooms, area, amenities,
                                    images, available, owner_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(property.id)
        .bind(&property.title)
        .bind(&property.description)
        .bind(property.property_type.as_str())
        .bind(property.price)
        .bind(&property.currency)
        .bind(Json(&property.address))
        .bind(property.location.as_ref().map(Json))
        .bind(property.bedrooms)
        .bind(property.bathrooms)
        .bind(property.area)
        .bind(&property.amenities)
        .bind(&property.images)
        .bind(property.available)
        .bind(property.owner_id)
        .bind(property.status.as_str())
        .bind(property.created_at)
        .bind(property.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_write(e, "id"))?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<Property>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, description, property_type, price, currency, address, location,
                   bedrooms, bathrooms, area, amenities, images, available, owner_id, status,
                   created_at, updated_at
            FROM properties
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        row.as_ref().map(property_from_row).transpose()
    }

    async fn list(
        &self,
        filter: &PropertyFilter,
        page: Pagination,
    ) -> DatabaseResult<Vec<Property>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, description, property_type, price, currency, address, location,
                   bedrooms, bathrooms, area, amenities, images, available, owner_id, status,
                   created_at, updated_at
            FROM properties
            WHERE available = TRUE
              AND ($1::text IS NULL OR position(lower($1) in lower(address->>'city')) > 0)
              AND ($2::text IS NULL OR property_type = $2)
              AND ($3::float8 IS NULL OR price >= $3)
              AND ($4::float8 IS NULL OR price <= $4)
            ORDER BY created_at DESC, id DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(filter.city.as_deref())
        .bind(filter.property_type.map(|t| t.as_str()))
        .bind(filter.min_price)
        .bind(filter.max_price)
        .bind(page.limit)
        .bind(page.skip)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        rows.iter().map(property_from_row).collect()
    }

    async fn replace(
        &self,
        property: &Property,
        expected_updated_at: DateTime<Utc>,
    ) -> DatabaseResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE properties
            SET title = $4, description = $5, property_type = $6, price = $7, currency = $8,
                address = $9, location = $10, bedrooms = $11, bathrooms = $12, area = $13,
                amenities = $14, images = $15, available = $16, status = $17, updated_at = $18
            WHERE id = $1 AND owner_id = $2 AND updated_at = $3
            "#,
        )
        .bind(property.id)
        .bind(property.owner_id)
        .bind(expected_updated_at)
        .bind(&property.title)
        .bind(&property.description)
        .bind(property.property_type.as_str())
        .bind(property.price)
        .bind(&property.currency)
        .bind(Json(&property.address))
        .bind(property.location.as_ref().map(Json))
        .bind(property.bedrooms)
        .bind(property.bathrooms)
        .bind(property.area)
        .bind(&property.amenities)
        .bind(&property.images)
        .bind(property.available)
        .bind(property.status.as_str())
        .bind(property.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid, owner_id: Uuid) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM properties WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        Ok(result.rows_affected() > 0)
    }
}
