//! Identity service: registration, login and token resolution

use common::error::DatabaseError;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::credentials::CredentialStore;
use crate::error::{ApiError, ApiResult};
use crate::jwt::JwtService;
use crate::models::user::normalize_email;
use crate::models::{RegisterRequest, Role, User, UserPatch, timestamp};
use crate::repositories::UserStore;

/// Same message for unknown email and wrong password
const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Same message for missing, malformed and expired tokens
pub const INVALID_TOKEN: &str = "Invalid or expired token";

const EMAIL_TAKEN: &str = "Email already exists";

/// Caller identity resolved from a bearer token
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

/// Issued session
#[derive(Debug, Clone, Serialize)]
pub struct SessionToken {
    pub access_token: String,
    pub token_type: &'static str,
    /// Lifetime in seconds
    pub expires_in: u64,
}

/// Registers accounts, checks credentials and resolves bearer tokens
#[derive(Clone)]
pub struct IdentityService {
    users: Arc<dyn UserStore>,
    credentials: CredentialStore,
    jwt: JwtService,
}

impl IdentityService {
    pub fn new(users: Arc<dyn UserStore>, credentials: CredentialStore, jwt: JwtService) -> Self {
        Self {
            users,
            credentials,
            jwt,
        }
    }

    /// Create an account
    ///
    /// The existence check answers the common case; the store's uniqueness
    /// constraint settles concurrent registrations of the same email.
    pub async fn register(&self, request: RegisterRequest) -> ApiResult<User> {
        let role = request.validate()?;
        let email = request.normalized_email();
        info!("Registering user with email: {}", email);

        if self.users.email_exists(&email).await? {
            return Err(ApiError::Conflict(EMAIL_TAKEN.to_string()));
        }

        let password_hash = self.hash(request.password).await?;
        let phone = request.phone.filter(|p| !p.is_empty());
        let user = User::new(
            email,
            password_hash,
            request.name.trim().to_string(),
            phone,
            role,
            timestamp(),
        );

        self.users.insert(&user).await.map_err(|e| match e {
            DatabaseError::Duplicate(_) => ApiError::Conflict(EMAIL_TAKEN.to_string()),
            other => ApiError::from(other),
        })?;

        info!("Registered user {}", user.id);
        Ok(user)
    }

    /// Check credentials and issue an access token
    pub async fn authenticate(&self, email: &str, password: &str) -> ApiResult<SessionToken> {
        let email = normalize_email(email);

        // A miss is verified against a decoy so it costs the same as a wrong password
        let user = self.users.find_by_email(&email).await?;
        let matched = self
            .verify(user.as_ref().map(|u| u.password_hash.clone()), password)
            .await?;

        let user = match user {
            Some(user) if matched && user.is_active => user,
            Some(user) => {
                warn!("Login failed for user {}", user.id);
                return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
            }
            None => {
                warn!("Login failed: unknown account");
                return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
            }
        };

        let access_token = self.jwt.issue(user.id, &user.email, user.role).map_err(|e| {
            error!("Failed to issue token: {}", e);
            ApiError::InternalServerError
        })?;

        if let Err(e) = self.users.record_login(user.id, timestamp()).await {
            warn!("Failed to record login of user {}: {}", user.id, e);
        }
        info!("User {} logged in", user.id);

        Ok(SessionToken {
            access_token,
            token_type: "Bearer",
            expires_in: self.jwt.access_token_expiry(),
        })
    }

    /// Resolve a bearer token to the identity it was issued for
    pub fn validate_token(&self, token: &str) -> ApiResult<AuthUser> {
        let claims = self.jwt.validate_token(token).map_err(|e| {
            warn!("Rejected bearer token: {}", e);
            ApiError::Unauthorized(INVALID_TOKEN.to_string())
        })?;

        Ok(AuthUser {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
        })
    }

    /// Token refresh is declared but not offered
    pub fn refresh(&self) -> ApiResult<SessionToken> {
        Err(ApiError::NotImplemented)
    }

    pub async fn profile(&self, user_id: Uuid) -> ApiResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(ApiError::NotFound("User"))
    }

    /// Apply a profile patch to the caller's own account
    pub async fn update_profile(&self, user_id: Uuid, patch: UserPatch) -> ApiResult<User> {
        patch.validate()?;

        let mut user = self.profile(user_id).await?;
        patch.apply(&mut user);
        user.updated_at = timestamp();

        if !self.users.update_profile(&user).await? {
            return Err(ApiError::NotFound("User"));
        }

        info!("Updated profile of user {}", user_id);
        Ok(user)
    }

    async fn hash(&self, password: String) -> ApiResult<String> {
        let credentials = self.credentials.clone();
        tokio::task::spawn_blocking(move || credentials.hash(&password))
            .await
            .map_err(|e| {
                error!("Password hashing task failed: {}", e);
                ApiError::InternalServerError
            })?
    }

    async fn verify(&self, hash: Option<String>, password: &str) -> ApiResult<bool> {
        let credentials = self.credentials.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || {
            credentials.verify_or_decoy(hash.as_deref(), &password)
        })
        .await
        .map_err(|e| {
            error!("Password verification task failed: {}", e);
            ApiError::InternalServerError
        })
    }
}
