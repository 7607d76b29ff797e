//! JWT service for bearer token issuance and validation
//!
//! Tokens are HS256-signed with an injected secret and carry the configured
//! key id in their header. Validation insists on that key id, so rotating
//! either the secret or the key id makes every earlier token fail closed.

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, decode_header, encode,
    errors::{Error as JwtError, ErrorKind},
    get_current_timestamp,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Role;

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// HMAC signing secret
    pub secret: String,
    /// Key id written to and required in every token header
    pub key_id: String,
    /// Access token lifetime in seconds (default: 24 hours)
    pub access_token_expiry: u64,
}

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        JwtService {
            encoding_key,
            decoding_key,
            validation,
            config,
        }
    }

    /// Generate an access token for a user
    pub fn issue(&self, user_id: Uuid, email: &str, role: Role) -> Result<String, JwtError> {
        self.issue_at(user_id, email, role, get_current_timestamp())
    }

    /// Generate an access token as if issued at `now` (seconds since the epoch)
    pub fn issue_at(
        &self,
        user_id: Uuid,
        email: &str,
        role: Role,
        now: u64,
    ) -> Result<String, JwtError> {
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            role,
            iat: now,
            exp: now.saturating_add(self.config.access_token_expiry),
        };

        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(self.config.key_id.clone());

        encode(&header, &claims, &self.encoding_key)
    }

    /// Validate a token and return the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let header = decode_header(token)?;
        if header.kid.as_deref() != Some(self.config.key_id.as_str()) {
            return Err(ErrorKind::InvalidToken.into());
        }

        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }

    /// Get the access token expiry time
    pub fn access_token_expiry(&self) -> u64 {
        self.config.access_token_expiry
    }
}
