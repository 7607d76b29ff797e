//! Application state shared across handlers

use common::database::health_check;
use sqlx::PgPool;
use std::sync::Arc;

use crate::{
    credentials::{CredentialStore, HashingCost},
    error::ApiResult,
    identity::IdentityService,
    jwt::{JwtConfig, JwtService},
    models::{Booking, Property},
    repositories::{
        Collection, MemoryCollection, MemoryUsers, PgBookingRepository, PgPropertyRepository,
        PgUserRepository, Repository, UserStore,
    },
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Present when running against Postgres
    pub db_pool: Option<PgPool>,
    pub identity: IdentityService,
    pub properties: Repository<Property>,
    pub bookings: Repository<Booking>,
}

impl AppState {
    /// State backed by Postgres
    pub fn postgres(pool: PgPool, jwt: JwtConfig, cost: HashingCost) -> ApiResult<Self> {
        Self::build(
            Some(pool.clone()),
            Arc::new(PgUserRepository::new(pool.clone())),
            Arc::new(PgPropertyRepository::new(pool.clone())),
            Arc::new(PgBookingRepository::new(pool)),
            jwt,
            cost,
        )
    }

    /// State backed by process memory; nothing survives a restart
    pub fn in_memory(jwt: JwtConfig, cost: HashingCost) -> ApiResult<Self> {
        Self::build(
            None,
            Arc::new(MemoryUsers::new()),
            Arc::new(MemoryCollection::<Property>::new()),
            Arc::new(MemoryCollection::<Booking>::new()),
            jwt,
            cost,
        )
    }

    fn build(
        db_pool: Option<PgPool>,
        users: Arc<dyn UserStore>,
        properties: Arc<dyn Collection<Property>>,
        bookings: Arc<dyn Collection<Booking>>,
        jwt: JwtConfig,
        cost: HashingCost,
    ) -> ApiResult<Self> {
        let identity = IdentityService::new(users, CredentialStore::new(cost)?, JwtService::new(jwt));

        Ok(Self {
            db_pool,
            identity,
            properties: Repository::new(properties),
            bookings: Repository::new(bookings),
        })
    }

    /// Name of the storage backend, as reported by `/health`
    pub fn storage_name(&self) -> &'static str {
        if self.db_pool.is_some() {
            "postgres"
        } else {
            "memory"
        }
    }

    /// Whether the store answers
    pub async fn storage_healthy(&self) -> bool {
        match &self.db_pool {
            Some(pool) => health_check(pool).await,
            None => true,
        }
    }
}
