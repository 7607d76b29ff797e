//! Property listings

use chrono::{DateTime, Utc};
use common::pagination::Pagination;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ApiError;
use crate::policy::Owned;
use crate::repositories::Resource;
use crate::validation::{FieldErrors, validate_length};

/// Highest accepted listing price
pub const MAX_PRICE: f64 = 1_000_000.0;

/// Kind of dwelling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Apartment,
    House,
    Condo,
    Townhouse,
    Studio,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Apartment => "apartment",
            PropertyType::House => "house",
            PropertyType::Condo => "condo",
            PropertyType::Townhouse => "townhouse",
            PropertyType::Studio => "studio",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "apartment" => Ok(PropertyType::Apartment),
            "house" => Ok(PropertyType::House),
            "condo" => Ok(PropertyType::Condo),
            "townhouse" => Ok(PropertyType::Townhouse),
            "studio" => Ok(PropertyType::Studio),
            other => Err(format!("Unknown property type: {}", other)),
        }
    }
}

/// Listing state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyStatus {
    Draft,
    #[default]
    Published,
    Rented,
    Maintenance,
}

impl PropertyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyStatus::Draft => "draft",
            PropertyStatus::Published => "published",
            PropertyStatus::Rented => "rented",
            PropertyStatus::Maintenance => "maintenance",
        }
    }
}

impl FromStr for PropertyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PropertyStatus::Draft),
            "published" => Ok(PropertyStatus::Published),
            "rented" => Ok(PropertyStatus::Rented),
            "maintenance" => Ok(PropertyStatus::Maintenance),
            other => Err(format!("Unknown property status: {}", other)),
        }
    }
}

/// Postal address
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub zip_code: String,
}

/// GeoJSON point, `[longitude, latitude]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: [f64; 2],
}

impl GeoLocation {
    fn validate(&self) -> Result<(), String> {
        if self.kind != "Point" {
            return Err("Location type must be Point".to_string());
        }

        let [lng, lat] = self.coordinates;
        if !(-180.0..=180.0).contains(&lng) || !(-90.0..=90.0).contains(&lat) {
            return Err("Location coordinates are out of range".to_string());
        }

        Ok(())
    }
}

/// Property entity
#[derive(Debug, Clone, Serialize)]
pub struct Property {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    pub price: f64,
    pub currency: String,
    pub address: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoLocation>,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub area: i32,
    pub amenities: Vec<String>,
    pub images: Vec<String>,
    pub available: bool,
    pub owner_id: Uuid,
    pub status: PropertyStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Owned for Property {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

impl Resource for Property {
    const NAME: &'static str = "Property";
    type Filter = PropertyFilter;

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

    fn matches(&self, filter: &PropertyFilter) -> bool {
        filter.matches(self)
    }
}

/// Property creation payload
///
/// There is no `id`, `owner_id` or `available` here: the first two come
/// from the server and the caller, and new listings always start available.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProperty {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    pub price: f64,
    pub currency: Option<String>,
    #[serde(default)]
    pub address: Address,
    pub location: Option<GeoLocation>,
    #[serde(default)]
    pub bedrooms: i32,
    #[serde(default)]
    pub bathrooms: i32,
    #[serde(default)]
    pub area: i32,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub status: Option<PropertyStatus>,
}

impl NewProperty {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();

        check_title(&mut errors, &self.title);
        check_description(&mut errors, &self.description);
        check_price(&mut errors, self.price);
        if let Some(currency) = &self.currency {
            check_currency(&mut errors, currency);
        }
        check_address(&mut errors, &self.address);
        if let Some(location) = &self.location {
            errors.check("location", location.validate());
        }
        check_count(&mut errors, "bedrooms", self.bedrooms);
        check_count(&mut errors, "bathrooms", self.bathrooms);
        check_count(&mut errors, "area", self.area);

        errors.into_result()
    }

    /// Build the stored record owned by `owner_id`
    pub fn into_property(self, owner_id: Uuid, now: DateTime<Utc>) -> Property {
        Property {
            id: Uuid::new_v4(),
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            property_type: self.property_type,
            price: self.price,
            currency: self
                .currency
                .map(|c| c.to_uppercase())
                .unwrap_or_else(|| "USD".to_string()),
            address: self.address,
            location: self.location,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            area: self.area,
            amenities: dedupe(self.amenities),
            images: self.images,
            available: true,
            owner_id,
            status: self.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Fields an owner may change on a listing
///
/// Anything else in the body (`id`, `owner_id`, timestamps) is dropped
/// during deserialization and never reaches the record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub property_type: Option<PropertyType>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub address: Option<Address>,
    pub location: Option<GeoLocation>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub area: Option<i32>,
    pub amenities: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub available: Option<bool>,
    pub status: Option<PropertyStatus>,
}

impl PropertyPatch {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();

        if let Some(title) = &self.title {
            check_title(&mut errors, title);
        }
        if let Some(description) = &self.description {
            check_description(&mut errors, description);
        }
        if let Some(price) = self.price {
            check_price(&mut errors, price);
        }
        if let Some(currency) = &self.currency {
            check_currency(&mut errors, currency);
        }
        if let Some(address) = &self.address {
            check_address(&mut errors, address);
        }
        if let Some(location) = &self.location {
            errors.check("location", location.validate());
        }
        if let Some(bedrooms) = self.bedrooms {
            check_count(&mut errors, "bedrooms", bedrooms);
        }
        if let Some(bathrooms) = self.bathrooms {
            check_count(&mut errors, "bathrooms", bathrooms);
        }
        if let Some(area) = self.area {
            check_count(&mut errors, "area", area);
        }

        errors.into_result()
    }

    /// Merge the present fields into `property`
    pub fn apply(self, property: &mut Property) {
        if let Some(title) = self.title {
            property.title = title.trim().to_string();
        }
        if let Some(description) = self.description {
            property.description = description.trim().to_string();
        }
        if let Some(property_type) = self.property_type {
            property.property_type = property_type;
        }
        if let Some(price) = self.price {
            property.price = price;
        }
        if let Some(currency) = self.currency {
            property.currency = currency.to_uppercase();
        }
        if let Some(address) = self.address {
            property.address = address;
        }
        if let Some(location) = self.location {
            property.location = Some(location);
        }
        if let Some(bedrooms) = self.bedrooms {
            property.bedrooms = bedrooms;
        }
        if let Some(bathrooms) = self.bathrooms {
            property.bathrooms = bathrooms;
        }
        if let Some(area) = self.area {
            property.area = area;
        }
        if let Some(amenities) = self.amenities {
            property.amenities = dedupe(amenities);
        }
        if let Some(images) = self.images {
            property.images = images;
        }
        if let Some(available) = self.available {
            property.available = available;
        }
        if let Some(status) = self.status {
            property.status = status;
        }
    }
}

/// Conjunction of listing predicates; only available listings ever match
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyFilter {
    pub city: Option<String>,
    pub property_type: Option<PropertyType>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl PropertyFilter {
    pub fn matches(&self, property: &Property) -> bool {
        if !property.available {
            return false;
        }

        if let Some(city) = &self.city {
            let wanted = city.to_lowercase();
            if !property.address.city.to_lowercase().contains(&wanted) {
                return false;
            }
        }

        self.property_type.is_none_or(|t| t == property.property_type)
            && self.min_price.is_none_or(|min| property.price >= min)
            && self.max_price.is_none_or(|max| property.price <= max)
    }
}

/// Raw query string of `GET /properties`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyQuery {
    pub limit: Option<String>,
    pub skip: Option<String>,
    pub city: Option<String>,
    #[serde(rename = "type")]
    pub property_type: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
}

impl PropertyQuery {
    /// Split into a filter and a pagination window
    ///
    /// Unparseable prices are ignored; an unknown type is rejected.
    pub fn into_parts(self) -> Result<(PropertyFilter, Pagination), ApiError> {
        let page = Pagination::from_params(self.limit.as_deref(), self.skip.as_deref());

        let property_type = match self.property_type.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<PropertyType>()
                    .map_err(|_| ApiError::validation("Invalid property type"))?,
            ),
        };

        let filter = PropertyFilter {
            city: self
                .city
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            property_type,
            min_price: self.min_price.as_deref().and_then(parse_price),
            max_price: self.max_price.as_deref().and_then(parse_price),
        };

        Ok((filter, page))
    }
}

fn parse_price(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|p| p.is_finite())
}

/// Drop repeated entries, keeping the first occurrence
fn dedupe(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty() && seen.insert(item.clone()))
        .collect()
}

fn check_title(errors: &mut FieldErrors, title: &str) {
    errors.check("title", validate_length("Title", title, 5, 200));
}

fn check_description(errors: &mut FieldErrors, description: &str) {
    errors.check(
        "description",
        validate_length("Description", description, 20, 2000),
    );
}

fn check_price(errors: &mut FieldErrors, price: f64) {
    if !price.is_finite() || price <= 0.0 {
        errors.add("price", "Price must be greater than zero");
    } else if price > MAX_PRICE {
        errors.add("price", "Price must be at most 1000000");
    }
}

fn check_currency(errors: &mut FieldErrors, currency: &str) {
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        errors.add("currency", "Currency must be a three-letter code");
    }
}

fn check_address(errors: &mut FieldErrors, address: &Address) {
    if address.city.trim().is_empty() {
        errors.add("address.city", "City is required");
    }
}

fn check_count(errors: &mut FieldErrors, field: &str, value: i32) {
    if value < 0 {
        errors.add(field, format!("{} cannot be negative", field));
    }
}
