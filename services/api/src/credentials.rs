//! Password hashing with Argon2id

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use std::sync::Arc;
use tracing::error;

use crate::error::ApiError;

/// Argon2 cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingCost {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
}

impl Default for HashingCost {
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
        }
    }
}

/// Plaintext behind the decoy hash; no account can hold it, since
/// registration rejects passwords without an uppercase letter
const DECOY_PLAINTEXT: &str = "decoy-credential-0";

/// One-way credential hashing
///
/// Every hash carries its own random salt and parameters, so verification
/// keeps working for hashes produced under an older cost.
#[derive(Clone)]
pub struct CredentialStore {
    argon2: Argon2<'static>,
    /// Hash under the current cost, checked when there is no stored hash
    decoy: Arc<str>,
}

impl CredentialStore {
    /// Create a store hashing with `cost`
    pub fn new(cost: HashingCost) -> Result<Self, ApiError> {
        let params = Params::new(cost.memory_kib, cost.iterations, 1, None).map_err(|e| {
            error!("Invalid password hashing parameters: {}", e);
            ApiError::InternalServerError
        })?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let decoy = hash_with(&argon2, DECOY_PLAINTEXT)?;

        Ok(Self {
            argon2,
            decoy: decoy.into(),
        })
    }

    /// Hash `plaintext` with a fresh salt
    pub fn hash(&self, plaintext: &str) -> Result<String, ApiError> {
        hash_with(&self.argon2, plaintext)
    }

    /// Whether `plaintext` matches `hash`, spending the same work when there
    /// is no hash to check
    ///
    /// `None` is verified against the decoy and always fails, so a missing
    /// account costs as much as a wrong password.
    pub fn verify_or_decoy(&self, hash: Option<&str>, plaintext: &str) -> bool {
        match hash {
            Some(hash) => self.verify(hash, plaintext),
            None => {
                let _ = self.verify(&self.decoy, plaintext);
                false
            }
        }
    }

    /// Whether `plaintext` matches `hash`
    ///
    /// A malformed hash is a mismatch, never an error.
    pub fn verify(&self, hash: &str, plaintext: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .argon2
                .verify_password(plaintext.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

fn hash_with(argon2: &Argon2<'_>, plaintext: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    argon2
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {}", e);
            ApiError::InternalServerError
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CredentialStore {
        CredentialStore::new(HashingCost {
            memory_kib: 256,
            iterations: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let store = store();
        let hash = store.hash("Password123!").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("Password123!"));
        assert!(store.verify(&hash, "Password123!"));
        assert!(!store.verify(&hash, "Password123?"));
    }

    #[test]
    fn test_salts_differ() {
        let store = store();
        let first = store.hash("Password123!").unwrap();
        let second = store.hash("Password123!").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_malformed_hash_fails_closed() {
        let store = store();
        assert!(!store.verify("not-a-hash", "Password123!"));
        assert!(!store.verify("", ""));
    }

    #[test]
    fn test_missing_hash_never_verifies() {
        let store = store();
        assert!(!store.verify_or_decoy(None, DECOY_PLAINTEXT));
        assert!(!store.verify_or_decoy(None, "Password123!"));

        let hash = store.hash("Password123!").unwrap();
        assert!(store.verify_or_decoy(Some(&hash), "Password123!"));
    }

    #[test]
    fn test_decoy_costs_the_same_as_real_hashes() {
        let store = store();
        let real = store.hash("Password123!").unwrap();

        let params = |phc: &str| PasswordHash::new(phc).unwrap().params.to_string();
        assert_eq!(params(&*store.decoy), params(&real));
        assert!(store.decoy.starts_with("$argon2id$v=19$m=256,t=1,p=1$"));
    }

    #[test]
    fn test_invalid_cost_is_rejected() {
        let result = CredentialStore::new(HashingCost {
            memory_kib: 1,
            iterations: 0,
        });
        assert!(result.is_err());
    }
}
