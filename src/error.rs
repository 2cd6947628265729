use thiserror::Error;

/// Errors raised inside the data-access layer.
///
/// Mutating repository operations convert these into a failure
/// [`OperationResult`](crate::result::OperationResult) at the boundary; only
/// reads surface them as `Err` values.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The entity instance carries no pending operation state and cannot be
    /// routed through the state-driven save path.
    #[error("Entity type {0} carries no pending operation state")]
    SchemaViolation(&'static str),

    /// Input rejected before any store interaction (empty batch, missing id,
    /// empty predicate).
    #[error("{0}")]
    Validation(String),

    /// A column or table name failed identifier validation.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl RepositoryError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        RepositoryError::Validation(message.into())
    }
}
