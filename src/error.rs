use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Storage failures keep the engine error as the source only; its text
    /// is never part of the message handed to callers.
    #[error("storage error")]
    Database(#[from] rusqlite::Error),

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("decryption failed")]
    Decryption,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("remote adapter error: {0}")]
    ExternalAdapter(String),

    #[error("crypto failure: {0}")]
    Crypto(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// HTTP-equivalent status for the error class.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Conflict(_) | Error::ConstraintViolation(_) => 409,
            Error::InvalidFormat(_) => 400,
            Error::Decryption | Error::InvalidSignature => 401,
            Error::PermissionDenied(_) => 403,
            Error::ExternalAdapter(_) => 502,
            Error::Database(_)
            | Error::Crypto(_)
            | Error::Json(_)
            | Error::Io(_)
            | Error::Config(_) => 500,
        }
    }

    /// Only a lost numbering race is worth retrying; everything else is
    /// terminal for the request.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ConstraintViolation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
