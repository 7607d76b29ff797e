//! User model and related payloads

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ApiError;
use crate::validation::{FieldErrors, validate_email, validate_length, validate_password, validate_phone};

/// Account role
///
/// Stored and returned with the user; no operation is gated on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Tenant,
    Landlord,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Tenant => "tenant",
            Role::Landlord => "landlord",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tenant" => Ok(Role::Tenant),
            "landlord" => Ok(Role::Landlord),
            "admin" => Ok(Role::Admin),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// User entity, including the credential hash
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub occupation: Option<String>,
    pub gender: Option<String>,
    pub languages: Vec<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub role: Role,
    pub verified: bool,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// A freshly registered, unverified and active account
    pub fn new(
        email: String,
        password_hash: String,
        full_name: String,
        phone: Option<String>,
        role: Role,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            full_name,
            first_name: None,
            last_name: None,
            phone,
            avatar: None,
            bio: None,
            occupation: None,
            gender: None,
            languages: Vec::new(),
            date_of_birth: None,
            role,
            verified: false,
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Outward view of a user; never carries the credential
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    pub role: Role,
    pub verified: bool,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            avatar: user.avatar,
            bio: user.bio,
            occupation: user.occupation,
            gender: user.gender,
            languages: user.languages,
            date_of_birth: user.date_of_birth,
            role: user.role,
            verified: user.verified,
            is_active: user.is_active,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Registration payload
#[derive(Clone, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, alias = "full_name")]
    pub name: String,
    pub phone: Option<String>,
    pub role: Option<String>,
}

impl RegisterRequest {
    /// Check every field, returning the requested role on success
    pub fn validate(&self) -> Result<Role, ApiError> {
        let mut errors = FieldErrors::new();

        errors.check("email", validate_email(self.email.trim()));
        errors.check("password", validate_password(&self.password));
        errors.check("name", validate_length("Name", &self.name, 1, 100));

        if let Some(phone) = self.phone.as_deref().filter(|p| !p.is_empty()) {
            errors.check("phone", validate_phone(phone));
        }

        let role = match self.role.as_deref() {
            None | Some("") => Role::default(),
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                errors.add("role", "Role must be one of tenant, landlord, admin");
                Role::default()
            }),
        };

        errors.into_result()?;
        Ok(role)
    }

    /// Email in the form it is stored and looked up
    pub fn normalized_email(&self) -> String {
        normalize_email(&self.email)
    }
}

/// Login payload
#[derive(Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        if self.email.trim().is_empty() {
            errors.add("email", "Email is required");
        }
        if self.password.is_empty() {
            errors.add("password", "Password is required");
        }
        errors.into_result()
    }
}

/// Lookups are case-insensitive, so emails are stored trimmed and lower-cased
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Profile fields a user may change on their own account
///
/// Keys outside this set (email, password, role, verification and
/// timestamps among them) are dropped when the body is deserialized.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub full_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub occupation: Option<String>,
    pub gender: Option<String>,
    pub languages: Option<Vec<String>>,
    pub date_of_birth: Option<NaiveDate>,
}

impl UserPatch {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();

        if let Some(name) = &self.full_name {
            errors.check("full_name", validate_length("Full name", name, 1, 100));
        }
        if let Some(phone) = &self.phone {
            errors.check("phone", validate_phone(phone));
        }
        if let Some(gender) = &self.gender {
            if !matches!(gender.as_str(), "male" | "female" | "other") {
                errors.add("gender", "Gender must be one of male, female, other");
            }
        }
        if let Some(bio) = &self.bio {
            if bio.chars().count() > 500 {
                errors.add("bio", "Bio must be at most 500 characters long");
            }
        }

        errors.into_result()
    }

    /// Merge the present fields into `user`
    pub fn apply(self, user: &mut User) {
        if let Some(full_name) = self.full_name {
            user.full_name = full_name.trim().to_string();
        }
        if let Some(first_name) = self.first_name {
            user.first_name = Some(first_name);
        }
        if let Some(last_name) = self.last_name {
            user.last_name = Some(last_name);
        }
        if let Some(phone) = self.phone {
            user.phone = Some(phone);
        }
        if let Some(avatar) = self.avatar {
            user.avatar = Some(avatar);
        }
        if let Some(bio) = self.bio {
            user.bio = Some(bio);
        }
        if let Some(occupation) = self.occupation {
            user.occupation = Some(occupation);
        }
        if let Some(gender) = self.gender {
            user.gender = Some(gender);
        }
        if let Some(languages) = self.languages {
            user.languages = languages;
        }
        if let Some(date_of_birth) = self.date_of_birth {
            user.date_of_birth = Some(date_of_birth);
        }
    }
}
