//! Custom error types for the common library
//!
//! This module defines the storage error type shared by every store
//! implementation, whatever its backend.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// A write collided with a unique constraint on the named field
    #[error("Duplicate value for unique field `{0}`")]
    Duplicate(String),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),

    /// A stored record could not be turned back into its model
    #[error("Failed to decode stored record: {0}")]
    Decode(String),
}

impl DatabaseError {
    /// Classify a failed write, reporting unique violations as `Duplicate(field)`
    pub fn from_write(err: SqlxError, field: &str) -> Self {
        let unique_violation = err
            .as_database_error()
            .is_some_and(|db_err| db_err.is_unique_violation());

        if unique_violation {
            DatabaseError::Duplicate(field.to_string())
        } else {
            DatabaseError::Query(err)
        }
    }
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_stay_query_errors() {
        let err = DatabaseError::from_write(SqlxError::RowNotFound, "email");
        assert!(matches!(err, DatabaseError::Query(SqlxError::RowNotFound)));
    }

    #[test]
    fn test_duplicate_message_names_field() {
        let err = DatabaseError::Duplicate("email".to_string());
        assert_eq!(err.to_string(), "Duplicate value for unique field `email`");
    }
}
