//! In-memory stores
//!
//! Selected with `STORAGE_BACKEND=memory` and used by the test suite. Each
//! store holds one `RwLock`, and every conditional write does its check
//! and its write under the same write guard.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    error::{DatabaseError, DatabaseResult},
    pagination::Pagination,
};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Collection, Resource, UserStore};
use crate::models::User;
use crate::policy::Owned;

/// Map-backed [`Collection`]
pub struct MemoryCollection<R: Resource> {
    records: RwLock<HashMap<Uuid, R>>,
}

impl<R: Resource> MemoryCollection<R> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl<R: Resource> Default for MemoryCollection<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Resource> Collection<R> for MemoryCollection<R> {
    async fn insert(&self, record: &R) -> DatabaseResult<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id()) {
            return Err(DatabaseError::Duplicate("id".to_string()));
        }
        records.insert(record.id(), record.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<R>> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn list(&self, filter: &R::Filter, page: Pagination) -> DatabaseResult<Vec<R>> {
        let records = self.records.read().await;
        let mut matching: Vec<R> = records
            .values()
            .filter(|record| record.matches(filter))
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });

        Ok(page.window(matching))
    }

    async fn replace(
        &self,
        record: &R,
        expected_updated_at: DateTime<Utc>,
    ) -> DatabaseResult<bool> {
        let mut records = self.records.write().await;
        match records.get_mut(&record.id()) {
            Some(current)
                if current.owner_id() == record.owner_id()
                    && current.updated_at() == expected_updated_at =>
            {
                *current = record.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid, owner_id: Uuid) -> DatabaseResult<bool> {
        let mut records = self.records.write().await;
        match records.get(&id) {
            Some(record) if record.owner_id() == owner_id => {
                records.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Map-backed [`UserStore`]; email uniqueness is checked under the write lock
#[derive(Default)]
pub struct MemoryUsers {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUsers {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUsers {
    async fn insert(&self, user: &User) -> DatabaseResult<()> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(DatabaseError::Duplicate("email".to_string()));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn email_exists(&self, email: &str) -> DatabaseResult<bool> {
        Ok(self.users.read().await.values().any(|u| u.email == email))
    }

    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn update_profile(&self, user: &User) -> DatabaseResult<bool> {
        let mut users = self.users.write().await;
        match users.get_mut(&user.id) {
            Some(current) => {
                current.full_name = user.full_name.clone();
                current.first_name = user.first_name.clone();
                current.last_name = user.last_name.clone();
                current.phone = user.phone.clone();
                current.avatar = user.avatar.clone();
                current.bio = user.bio.clone();
                current.occupation = user.occupation.clone();
                current.gender = user.gender.clone();
                current.languages = user.languages.clone();
                current.date_of_birth = user.date_of_birth;
                current.updated_at = user.updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> DatabaseResult<()> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.last_login_at = Some(at);
        }
        Ok(())
    }
}
