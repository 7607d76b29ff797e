//! Repositories for database operations
//!
//! Properties and bookings share one access pattern: load, check the
//! ownership policy, apply a typed patch, stamp `updated_at` and persist.
//! [`Repository`] implements it once over any [`Resource`]; the
//! [`Collection`] trait is the storage seam, implemented for Postgres and
//! in memory.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::{
    error::{DatabaseError, DatabaseResult},
    pagination::Pagination,
};
use sqlx::{Decode, Postgres, Row, Type, postgres::PgRow};
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::timestamp;
use crate::policy::{Owned, owns};

pub mod booking;
pub mod memory;
pub mod property;
pub mod user;

pub use booking::PgBookingRepository;
pub use memory::{MemoryCollection, MemoryUsers};
pub use property::PgPropertyRepository;
pub use user::{PgUserRepository, UserStore};

/// A stored record handled by the generic repository
pub trait Resource: Owned + Clone + Send + Sync + 'static {
    /// Display name used in error messages
    const NAME: &'static str;

    /// Listing predicate
    type Filter: Send + Sync;

    fn id(&self) -> Uuid;
    fn created_at(&self) -> DateTime<Utc>;
    fn updated_at(&self) -> DateTime<Utc>;
    fn touch(&mut self, at: DateTime<Utc>);
    fn matches(&self, filter: &Self::Filter) -> bool;
}

/// Storage for one kind of resource
#[async_trait]
pub trait Collection<R: Resource>: Send + Sync {
    async fn insert(&self, record: &R) -> DatabaseResult<()>;

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<R>>;

    /// Matching records, newest first (ties broken by id, descending)
    async fn list(&self, filter: &R::Filter, page: Pagination) -> DatabaseResult<Vec<R>>;

    /// Overwrite the stored record only if its id, owner and `updated_at`
    /// still equal `record.id()`, `record.owner_id()` and `expected_updated_at`
    async fn replace(&self, record: &R, expected_updated_at: DateTime<Utc>)
    -> DatabaseResult<bool>;

    /// Remove the record only if it is still bound to `owner_id`
    async fn delete(&self, id: Uuid, owner_id: Uuid) -> DatabaseResult<bool>;
}

/// Authorization-scoped CRUD over a [`Collection`]
pub struct Repository<R: Resource> {
    store: Arc<dyn Collection<R>>,
}

impl<R: Resource> Clone for Repository<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<R: Resource> Repository<R> {
    /// Create a new repository over `store`
    pub fn new(store: Arc<dyn Collection<R>>) -> Self {
        Self { store }
    }

    /// Persist a record built by the caller
    pub async fn create(&self, record: R) -> ApiResult<R> {
        self.store.insert(&record).await?;
        Ok(record)
    }

    pub async fn list(&self, filter: &R::Filter, page: Pagination) -> ApiResult<Vec<R>> {
        Ok(self.store.list(filter, page).await?)
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<R> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(ApiError::NotFound(R::NAME))
    }

    /// Apply `change` to the record as its owner `caller`
    pub async fn update<F>(&self, id: Uuid, caller: Uuid, change: F) -> ApiResult<R>
    where
        F: FnOnce(&mut R) -> ApiResult<()> + Send,
    {
        self.update_with(id, move |record| {
            authorize(record, caller, "update")?;
            change(record)
        })
        .await
    }

    /// Apply `change` to the record, which also decides who may make it
    ///
    /// The write is conditional on the record being unchanged since it was
    /// read: a concurrent delete yields `NotFound`, a concurrent update
    /// yields `Conflict`, and neither is ever overwritten. An error from
    /// `change` aborts before anything is written.
    pub async fn update_with<F>(&self, id: Uuid, change: F) -> ApiResult<R>
    where
        F: FnOnce(&mut R) -> ApiResult<()> + Send,
    {
        let mut record = self.get(id).await?;

        let expected = record.updated_at();
        change(&mut record)?;
        record.touch(next_stamp(expected));

        if self.store.replace(&record, expected).await? {
            return Ok(record);
        }

        match self.store.find_by_id(id).await? {
            None => Err(ApiError::NotFound(R::NAME)),
            Some(_) => {
                warn!("Concurrent modification of {} {}", R::NAME, id);
                Err(ApiError::Conflict(format!(
                    "{} was modified concurrently, retry the update",
                    R::NAME
                )))
            }
        }
    }

    /// Delete the record as `caller`
    pub async fn delete(&self, id: Uuid, caller: Uuid) -> ApiResult<()> {
        let record = self.get(id).await?;
        authorize(&record, caller, "delete")?;

        if self.store.delete(id, record.owner_id()).await? {
            Ok(())
        } else {
            Err(ApiError::NotFound(R::NAME))
        }
    }
}

fn authorize<R: Resource>(record: &R, caller: Uuid, action: &str) -> ApiResult<()> {
    if owns(record, caller) {
        return Ok(());
    }

    warn!(
        "User {} denied {} on {} {}",
        caller,
        action,
        R::NAME,
        record.id()
    );
    Err(ApiError::Forbidden(format!(
        "Not authorized to {} this {}",
        action,
        R::NAME.to_lowercase()
    )))
}

/// A fresh `updated_at` strictly after `previous`
fn next_stamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    timestamp().max(previous + Duration::microseconds(1))
}

/// Read a column, reporting type mismatches as decode failures
pub(crate) fn column<'r, T>(row: &'r PgRow, name: &str) -> DatabaseResult<T>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| DatabaseError::Decode(format!("{}: {}", name, e)))
}

/// Read a TEXT column holding one of our enum spellings
pub(crate) fn parsed_column<T>(row: &PgRow, name: &str) -> DatabaseResult<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = column(row, name)?;
    raw.parse().map_err(DatabaseError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewProperty, Property, PropertyFilter};
    use serde_json::json;

    fn repository() -> Repository<Property> {
        Repository::new(Arc::new(MemoryCollection::<Property>::new()))
    }

    fn listing(owner: Uuid, title: &str) -> Property {
        let new: NewProperty = serde_json::from_value(json!({
            "title": title,
            "description": "A listing long enough to pass validation.",
            "type": "studio",
            "price": 900.0,
            "address": {"city": "Austin"}
        }))
        .unwrap();
        new.into_property(owner, timestamp())
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let repo = repository();
        assert!(matches!(
            repo.get(Uuid::new_v4()).await,
            Err(ApiError::NotFound("Property"))
        ));
    }

    #[tokio::test]
    async fn test_update_by_owner_stamps_updated_at() {
        let repo = repository();
        let owner = Uuid::new_v4();
        let created = repo.create(listing(owner, "Studio one")).await.unwrap();

        let updated = repo
            .update(created.id, owner, |_| Ok(()))
            .await
            .unwrap();

        assert!(updated.updated_at > created.updated_at);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(repo.get(created.id).await.unwrap().updated_at, updated.updated_at);
    }

    #[tokio::test]
    async fn test_stranger_is_forbidden_and_nothing_changes() {
        let repo = repository();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let created = repo.create(listing(owner, "Studio two")).await.unwrap();

        let result = repo
            .update(created.id, stranger, |p| {
                p.price = 1.0;
                Ok(())
            })
            .await;
        match result {
            Err(ApiError::Forbidden(msg)) => {
                assert_eq!(msg, "Not authorized to update this property")
            }
            other => panic!("unexpected result: {:?}", other.err()),
        }

        assert!(matches!(
            repo.delete(created.id, stranger).await,
            Err(ApiError::Forbidden(_))
        ));

        let stored = repo.get(created.id).await.unwrap();
        assert_eq!(stored.price, 900.0);
        assert_eq!(stored.updated_at, created.updated_at);
    }

    #[tokio::test]
    async fn test_failed_change_leaves_record_untouched() {
        let repo = repository();
        let owner = Uuid::new_v4();
        let created = repo.create(listing(owner, "Studio three")).await.unwrap();

        let result = repo
            .update(created.id, owner, |_| Err(ApiError::validation("nope")))
            .await;
        assert!(matches!(result, Err(ApiError::Validation { .. })));
        assert_eq!(
            repo.get(created.id).await.unwrap().updated_at,
            created.updated_at
        );
    }

    #[tokio::test]
    async fn test_stale_write_is_a_conflict() {
        let store = Arc::new(MemoryCollection::<Property>::new());
        let repo = Repository::new(store.clone() as Arc<dyn Collection<Property>>);
        let owner = Uuid::new_v4();
        let created = repo.create(listing(owner, "Studio four")).await.unwrap();

        // Another writer got there first
        repo.update(created.id, owner, |_| Ok(())).await.unwrap();

        let mut stale = created.clone();
        stale.price = 1.0;
        assert!(!store.replace(&stale, created.updated_at).await.unwrap());
        assert_eq!(repo.get(created.id).await.unwrap().price, 900.0);
    }

    #[tokio::test]
    async fn test_delete_then_update_is_not_found() {
        let repo = repository();
        let owner = Uuid::new_v4();
        let created = repo.create(listing(owner, "Studio five")).await.unwrap();

        repo.delete(created.id, owner).await.unwrap();

        assert!(matches!(
            repo.update(created.id, owner, |_| Ok(())).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            repo.delete(created.id, owner).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let repo = repository();
        let owner = Uuid::new_v4();
        let older = repo.create(listing(owner, "Older studio")).await.unwrap();
        let mut newer = listing(owner, "Newer studio");
        newer.created_at = older.created_at + Duration::seconds(1);
        let newer = repo.create(newer).await.unwrap();

        let all = repo
            .list(&PropertyFilter::default(), Pagination::unbounded())
            .await
            .unwrap();
        let ids: Vec<Uuid> = all.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[test]
    fn test_next_stamp_is_strictly_increasing() {
        let future = Utc::now() + Duration::hours(1);
        assert!(next_stamp(future) > future);
    }
}
