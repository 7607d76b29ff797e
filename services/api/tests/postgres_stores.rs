//! Postgres stores against a live database
//!
//! These tests only run when `DATABASE_URL` points at a server; otherwise
//! they return early. Every test works on fresh ids, emails and cities, so
//! runs can share one database.

use chrono::{DateTime, Duration, Utc};
use common::database::{DatabaseConfig, init_pool};
use common::error::DatabaseError;
use common::pagination::Pagination;
use rental_api::error::ApiError;
use rental_api::models::{
    Booking, BookingFilter, BookingScope, BookingStatus, GuestInfo, NewBooking, NewProperty,
    Property, PropertyFilter, Role, User, timestamp,
};
use rental_api::repositories::{
    Collection, PgBookingRepository, PgPropertyRepository, PgUserRepository, Repository,
    UserStore,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Migrated pool, or `None` when no database is configured
async fn pool() -> Result<Option<PgPool>, Box<dyn std::error::Error>> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres store test");
        return Ok(None);
    };

    let pool = init_pool(&DatabaseConfig::new(database_url)).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(Some(pool))
}

fn property(owner_id: Uuid, city: &str, price: f64, created_at: DateTime<Utc>) -> Property {
    let new: NewProperty = serde_json::from_value(json!({
        "title": "Store test listing",
        "description": "Listing written by the Postgres store tests.",
        "type": "apartment",
        "price": price,
        "address": {"street": "1 Test St", "city": city, "country": "US"},
        "location": {"type": "Point", "coordinates": [-122.67, 45.52]},
        "amenities": ["wifi", "parking"],
        "images": ["a.jpg", "b.jpg"]
    }))
    .expect("valid property payload");
    new.into_property(owner_id, created_at)
}

fn booking(tenant_id: Uuid, property: &Property, created_at: DateTime<Utc>) -> Booking {
    let start = created_at + Duration::days(30);
    let new: NewBooking = serde_json::from_value(json!({
        "property_id": property.id,
        "start_date": start,
        "end_date": start + Duration::days(5),
        "service_fee": 20.0,
        "special_requests": ["late check-in"],
        "guest_info": {"adults": 2, "children": 1}
    }))
    .expect("valid booking payload");
    new.into_booking(tenant_id, property, created_at)
}

fn user(email: &str) -> User {
    User::new(
        email.to_string(),
        "$argon2id$v=19$m=256,t=1,p=1$c2FsdHNhbHQ$aGFzaA".to_string(),
        "Store Test".to_string(),
        None,
        Role::Tenant,
        timestamp(),
    )
}

#[tokio::test]
async fn test_booking_lists_are_ordered_scoped_and_paged() -> TestResult {
    let Some(pool) = pool().await? else {
        return Ok(());
    };
    let properties = PgPropertyRepository::new(pool.clone());
    let bookings = PgBookingRepository::new(pool);

    let now = timestamp();
    let listing = property(Uuid::new_v4(), "Portland", 900.0, now);
    properties.insert(&listing).await?;

    let tenant = Uuid::new_v4();
    let mut created = Vec::new();
    for age in [3, 2, 1] {
        let record = booking(tenant, &listing, now - Duration::seconds(age));
        bookings.insert(&record).await?;
        created.push(record.id);
    }
    created.reverse();

    let as_tenant = BookingFilter {
        caller: tenant,
        scope: BookingScope::Tenant,
        status: None,
    };
    let all = bookings.list(&as_tenant, Pagination::unbounded()).await?;
    assert_eq!(all.iter().map(|b| b.id).collect::<Vec<_>>(), created);
    assert_eq!(all[0].guest_info.adults, 2);
    assert_eq!(all[0].special_requests, vec!["late check-in".to_string()]);

    let first = bookings
        .list(&as_tenant, Pagination::from_params(Some("1"), Some("0")))
        .await?;
    let second = bookings
        .list(&as_tenant, Pagination::from_params(Some("1"), Some("1")))
        .await?;
    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    assert_eq!(first[0].id, created[0]);
    assert_eq!(second[0].id, created[1]);

    let as_landlord = BookingFilter {
        caller: listing.owner_id,
        scope: BookingScope::Landlord,
        status: Some(BookingStatus::Pending),
    };
    assert_eq!(
        bookings.list(&as_landlord, Pagination::unbounded()).await?.len(),
        3
    );

    let landlord_as_tenant = BookingFilter {
        scope: BookingScope::Tenant,
        ..as_landlord
    };
    assert!(
        bookings
            .list(&landlord_as_tenant, Pagination::unbounded())
            .await?
            .is_empty()
    );

    let confirmed_only = BookingFilter {
        status: Some(BookingStatus::Confirmed),
        ..as_tenant
    };
    assert!(
        bookings
            .list(&confirmed_only, Pagination::unbounded())
            .await?
            .is_empty()
    );

    Ok(())
}

#[tokio::test]
async fn test_property_filters_match_in_sql() -> TestResult {
    let Some(pool) = pool().await? else {
        return Ok(());
    };
    let properties = PgPropertyRepository::new(pool);

    let city = format!("Testville {}", Uuid::new_v4().simple());
    let owner = Uuid::new_v4();
    let now = timestamp();

    let cheap = property(owner, &city, 500.0, now - Duration::seconds(2));
    let dear = property(owner, &city, 2500.0, now - Duration::seconds(1));
    let mut hidden = property(owner, &city, 700.0, now);
    hidden.available = false;
    for record in [&cheap, &dear, &hidden] {
        properties.insert(record).await?;
    }

    let token = city.to_uppercase();
    let in_city = PropertyFilter {
        city: Some(token[token.len() - 12..].to_string()),
        ..Default::default()
    };
    let found = properties.list(&in_city, Pagination::unbounded()).await?;
    assert_eq!(
        found.iter().map(|p| p.id).collect::<Vec<_>>(),
        vec![dear.id, cheap.id]
    );
    assert_eq!(found[1].address.city, city);
    assert_eq!(found[1].amenities, cheap.amenities);
    assert_eq!(found[1].images, cheap.images);
    assert_eq!(found[1].location, cheap.location);

    let affordable = PropertyFilter {
        max_price: Some(1000.0),
        ..in_city
    };
    let found = properties.list(&affordable, Pagination::unbounded()).await?;
    assert_eq!(found.iter().map(|p| p.id).collect::<Vec<_>>(), vec![cheap.id]);

    Ok(())
}

#[tokio::test]
async fn test_replace_is_conditional_on_owner_and_stamp() -> TestResult {
    let Some(pool) = pool().await? else {
        return Ok(());
    };
    let properties = PgPropertyRepository::new(pool);

    let owner = Uuid::new_v4();
    let original = property(owner, "Salem", 1200.0, timestamp());
    properties.insert(&original).await?;

    let mut edited = original.clone();
    edited.price = 999.0;
    edited.updated_at = original.updated_at + Duration::seconds(1);
    assert!(properties.replace(&edited, original.updated_at).await?);

    // The stamp it was read at no longer matches
    let mut stale = original.clone();
    stale.price = 1.0;
    stale.updated_at = original.updated_at + Duration::seconds(2);
    assert!(!properties.replace(&stale, original.updated_at).await?);

    let mut hijack = edited.clone();
    hijack.owner_id = Uuid::new_v4();
    hijack.updated_at = edited.updated_at + Duration::seconds(1);
    assert!(!properties.replace(&hijack, edited.updated_at).await?);

    let stored = properties.find_by_id(original.id).await?.expect("row exists");
    assert_eq!(stored.price, 999.0);
    assert_eq!(stored.owner_id, owner);
    assert_eq!(stored.updated_at, edited.updated_at);
    assert_eq!(stored.created_at, original.created_at);

    Ok(())
}

#[tokio::test]
async fn test_racing_updates_never_lose_a_write() -> TestResult {
    let Some(pool) = pool().await? else {
        return Ok(());
    };
    let store = Arc::new(PgPropertyRepository::new(pool));
    let repository = Repository::<Property>::new(store.clone());

    let owner = Uuid::new_v4();
    let original = repository
        .create(property(owner, "Eugene", 800.0, timestamp()))
        .await?;

    let (a, b) = tokio::join!(
        repository.update(original.id, owner, |record| {
            record.price = 850.0;
            Ok(())
        }),
        repository.update(original.id, owner, |record| {
            record.price = 875.0;
            Ok(())
        }),
    );

    let mut written = Vec::new();
    for outcome in [a, b] {
        match outcome {
            Ok(record) => written.push(record),
            Err(ApiError::Conflict(_)) => {}
            Err(other) => return Err(other.into()),
        }
    }
    assert!(!written.is_empty());

    // The stored row is the last successful write
    let stored = store.find_by_id(original.id).await?.expect("row exists");
    let last = written
        .iter()
        .max_by_key(|record| record.updated_at)
        .expect("at least one write");
    assert_eq!(stored.price, last.price);
    assert_eq!(stored.updated_at, last.updated_at);

    assert!(store.delete(original.id, owner).await?);
    assert!(matches!(
        repository.update(original.id, owner, |_| Ok(())).await,
        Err(ApiError::NotFound("Property"))
    ));

    Ok(())
}

#[tokio::test]
async fn test_delete_is_conditional_on_owner() -> TestResult {
    let Some(pool) = pool().await? else {
        return Ok(());
    };
    let properties = PgPropertyRepository::new(pool.clone());
    let bookings = PgBookingRepository::new(pool);

    let listing = property(Uuid::new_v4(), "Bend", 650.0, timestamp());
    properties.insert(&listing).await?;
    let tenant = Uuid::new_v4();
    let record = booking(tenant, &listing, timestamp());
    bookings.insert(&record).await?;

    assert!(!bookings.delete(record.id, listing.owner_id).await?);
    assert!(bookings.find_by_id(record.id).await?.is_some());

    assert!(bookings.delete(record.id, tenant).await?);
    assert!(bookings.find_by_id(record.id).await?.is_none());
    assert!(!bookings.delete(record.id, tenant).await?);

    assert!(!properties.delete(listing.id, tenant).await?);
    assert!(properties.delete(listing.id, listing.owner_id).await?);

    Ok(())
}

#[tokio::test]
async fn test_booking_replace_round_trips_nested_fields() -> TestResult {
    let Some(pool) = pool().await? else {
        return Ok(());
    };
    let properties = PgPropertyRepository::new(pool.clone());
    let bookings = PgBookingRepository::new(pool);

    let listing = property(Uuid::new_v4(), "Medford", 400.0, timestamp());
    properties.insert(&listing).await?;
    let original = booking(Uuid::new_v4(), &listing, timestamp());
    bookings.insert(&original).await?;

    let mut edited = original.clone();
    edited.status = BookingStatus::Confirmed;
    edited.message = Some("Arriving by train".to_string());
    edited.guest_info = GuestInfo {
        adults: 1,
        children: 0,
        infants: 1,
        purpose: Some("family visit".to_string()),
    };
    edited.updated_at = original.updated_at + Duration::seconds(1);
    assert!(bookings.replace(&edited, original.updated_at).await?);

    let stored = bookings.find_by_id(original.id).await?.expect("row exists");
    assert_eq!(stored.status, BookingStatus::Confirmed);
    assert_eq!(stored.message, edited.message);
    assert_eq!(stored.guest_info, edited.guest_info);
    assert_eq!(stored.total_amount, original.total_amount);
    assert_eq!(stored.tenant_id, original.tenant_id);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_same_email_inserts_admit_one() -> TestResult {
    let Some(pool) = pool().await? else {
        return Ok(());
    };
    let users = PgUserRepository::new(pool);

    let email = format!("race-{}@x.com", Uuid::new_v4().simple());
    let first = user(&email);
    let second = user(&email.to_uppercase());

    let (a, b) = tokio::join!(users.insert(&first), users.insert(&second));
    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        outcomes
            .iter()
            .any(|r| matches!(r, Err(DatabaseError::Duplicate(field)) if field == "email"))
    );

    assert!(users.email_exists(&email).await?);
    let stored = users.find_by_email(&email).await?.expect("one account");
    assert!(stored.id == first.id || stored.id == second.id);

    Ok(())
}

#[tokio::test]
async fn test_user_profile_and_login_stamp() -> TestResult {
    let Some(pool) = pool().await? else {
        return Ok(());
    };
    let users = PgUserRepository::new(pool);

    let mut account = user(&format!("profile-{}@x.com", Uuid::new_v4().simple()));
    users.insert(&account).await?;

    account.bio = Some("Quiet tenant".to_string());
    account.languages = vec!["en".to_string(), "fr".to_string()];
    account.updated_at = account.updated_at + Duration::seconds(1);
    assert!(users.update_profile(&account).await?);

    let at = timestamp();
    users.record_login(account.id, at).await?;

    let stored = users.find_by_id(account.id).await?.expect("account exists");
    assert_eq!(stored.bio.as_deref(), Some("Quiet tenant"));
    assert_eq!(stored.languages, account.languages);
    assert_eq!(stored.last_login_at, Some(at));
    assert_eq!(stored.role, Role::Tenant);

    Ok(())
}
