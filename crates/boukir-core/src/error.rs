//! Error types for the core rules.

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while validating documents or checking access rules.
///
/// The messages are user-facing and kept in the language of the back office.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// A required field is missing or malformed.
    #[error("{0}")]
    Validation(String),

    /// The requested status label is unknown or not allowed for the document kind.
    #[error("Statut invalide: {0}")]
    InvalidStatus(String),

    /// The actor's role does not permit the operation.
    #[error("{0}")]
    Forbidden(String),
}

impl CoreError {
    /// Shorthand for a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Shorthand for a forbidden error.
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }
}
