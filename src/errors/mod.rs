//! # Error Handling
//!
//! Error types for the Bitwarden Secrets Manager bridge, built with
//! `thiserror`. A single crate-wide [`Error`] keeps the taxonomy small enough
//! that the HTTP layer can map every variant to a fixed status code.

/// Custom result type for bwsm operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the secrets bridge
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Vault authentication failed (bad or expired access token)
    #[error("Vault authentication failed: {0}")]
    Auth(String),

    /// Secret not found in the vault
    #[error("Secret not found: {0}")]
    NotFound(String),

    /// Secret with the same key already exists
    #[error("Secret conflict: {0}")]
    Conflict(String),

    /// Input validation failed (empty key/value, malformed payloads)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Network or vault transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Local snapshot file unreadable or unwritable
    #[error("Cache error: {context}")]
    Cache {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: String,
    },

    /// I/O errors outside the snapshot path
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new authentication error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        Self::Auth(message.into())
    }

    /// Create a not found error for a secret key
    pub fn not_found<S: Into<String>>(key: S) -> Self {
        Self::NotFound(key.into())
    }

    /// Create a conflict error
    pub fn conflict<S: Into<String>>(message: S) -> Self {
        Self::Conflict(message.into())
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport(message.into())
    }

    /// Create a cache error with context
    pub fn cache<S: Into<String>>(source: std::io::Error, context: S) -> Self {
        Self::Cache { source, context: context.into() }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a serialization error with context
    pub fn serialization<S: Into<String>>(source: serde_json::Error, context: S) -> Self {
        Self::Serialization { source, context: context.into() }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// HTTP status code the API layer should return for this error.
    ///
    /// Vault-side auth failures are upstream failures (502); 401 is reserved
    /// for the API-key gate, which never reaches the service layer.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Auth(_) => 502,
            Error::NotFound(_) => 404,
            Error::Conflict(_) => 409,
            Error::Validation(_) => 422,
            Error::Transport(_) => 502,
            Error::Cache { .. } => 500,
            Error::Config(_) => 500,
            Error::Serialization { .. } => 500,
            Error::Io(_) => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Whether the vault could not be reached or refused our credentials.
    ///
    /// These are the only errors `get` may downgrade to a cache-fallback
    /// success; NotFound/Conflict/Validation are authoritative answers.
    pub fn is_upstream_failure(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Auth(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Transport(format!("Vault request timed out: {}", error))
        } else {
            Self::Transport(format!("Vault request failed: {}", error))
        }
    }
}
