//! User storage

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::{DatabaseError, DatabaseResult};
use sqlx::{PgPool, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use super::{column, parsed_column};
use crate::models::User;

/// Storage seam for accounts
///
/// Emails are passed already normalized (trimmed, lower-cased).
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new account; an email collision is `DatabaseError::Duplicate`
    async fn insert(&self, user: &User) -> DatabaseResult<()>;

    async fn email_exists(&self, email: &str) -> DatabaseResult<bool>;

    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>>;

    /// Persist the profile fields and `updated_at` of `user`
    ///
    /// Email, credential, role and flags are never written here.
    async fn update_profile(&self, user: &User) -> DatabaseResult<bool>;

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> DatabaseResult<()>;
}

/// User repository backed by Postgres
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &PgRow) -> DatabaseResult<User> {
    Ok(User {
        id: column(row, "id")?,
        email: column(row, "email")?,
        password_hash: column(row, "password_hash")?,
        full_name: column(row, "full_name")?,
        first_name: column(row, "first_name")?,
        last_name: column(row, "last_name")?,
        phone: column(row, "phone")?,
        avatar: column(row, "avatar")?,
        bio: column(row, "bio")?,
        occupation: column(row, "occupation")?,
        gender: column(row, "gender")?,
        languages: column(row, "languages")?,
        date_of_birth: column(row, "date_of_birth")?,
        role: parsed_column(row, "role")?,
        verified: column(row, "verified")?,
        is_active: column(row, "is_active")?,
        last_login_at: column(row, "last_login_at")?,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}

#[async_trait]
impl UserStore for PgUserRepository {
    async fn insert(&self, user: &User) -> DatabaseResult<()> {
        info!("Creating new user: {}", user.id);

        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, full_name, first_name, last_name,
                               phone, avatar, bio, occupation, gender, languages, date_of_birth,
                               role, verified, is_active, last_login_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(&user.avatar)
        .bind(&user.bio)
        .bind(&user.occupation)
        .bind(&user.gender)
        .bind(&user.languages)
        .bind(user.date_of_birth)
        .bind(user.role.as_str())
        .bind(user.verified)
        .bind(user.is_active)
        .bind(user.last_login_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_write(e, "email"))?;

        Ok(())
    }

    async fn email_exists(&self, email: &str) -> DatabaseResult<bool> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS(SELECT 1 FROM users WHERE lower(email) = lower($1)) AS found
            "#,
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        column(&row, "found")
    }

    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, email, password_hash, full_name, first_name, last_name, phone, avatar,
                   bio, occupation, gender, languages, date_of_birth, role, verified, is_active,
                   last_login_at, created_at, updated_at
            FROM users
            WHERE lower(email) = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        info!("Finding user by ID: {}", id);

        let row = sqlx::query(
            r#"
            SELECT id, email, password_hash, full_name, first_name, last_name, phone, avatar,
                   bio, occupation, gender, languages, date_of_birth, role, verified, is_active,
                   last_login_at, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn update_profile(&self, user: &User) -> DatabaseResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET full_name = $2, first_name = $3, last_name = $4, phone = $5, avatar = $6,
                bio = $7, occupation = $8, gender = $9, languages = $10, date_of_birth = $11,
                updated_at = $12
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.full_name)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(&user.avatar)
        .bind(&user.bio)
        .bind(&user.occupation)
        .bind(&user.gender)
        .bind(&user.languages)
        .bind(user.date_of_birth)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> DatabaseResult<()> {
        sqlx::query("UPDATE users SET last_login_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        Ok(())
    }
}
