//! Error types for Boukir storage.

use boukir_core::CoreError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
///
/// Any error returned from inside a transaction aborts it: the transaction handle rolls back
/// when dropped without `commit`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A document, product or variant does not exist.
    #[error("{entity} {id} introuvable")]
    NotFound {
        /// What was looked up (`avoirs_client`, `product`, `variant`, ...).
        entity: String,
        /// The missing key.
        id: String,
    },

    /// The request failed validation.
    #[error("{0}")]
    Invalid(String),

    /// The actor's role does not allow the operation.
    #[error("{0}")]
    Forbidden(String),

    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    /// Build a `NotFound` error.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }
}

impl From<CoreError> for StoreError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Forbidden(message) => Self::Forbidden(message),
            CoreError::Validation(_) | CoreError::InvalidStatus(_) => Self::Invalid(err.to_string()),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Database(err.to_string())
    }
}
