use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Failed to decode message: {0}")]
    Decode(String),

    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid credentials")]
    Unauthorized,

    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    #[error("Unknown column {column} for {folder}")]
    UnknownColumn { folder: String, column: String },

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Invalid value for {column}: {reason}")]
    InvalidValue { column: String, reason: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Repository error: {0}")]
    RepositoryError(#[from] anyhow::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;
