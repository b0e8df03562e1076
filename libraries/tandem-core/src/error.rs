/// Core error types for Tandem Player
use thiserror::Error;

/// Result type alias using `TandemError`
pub type Result<T> = std::result::Result<T, TandemError>;

/// Core error type shared by the collaborator traits
#[derive(Error, Debug)]
pub enum TandemError {
    /// Network or transport failure talking to a backend
    #[error("Network error: {0}")]
    Network(String),

    /// Backend requires a logged-in session
    #[error("Authentication required")]
    AuthRequired,

    /// Backend answered with a code we do not understand
    #[error("Backend error ({code}): {message}")]
    Backend { code: i64, message: String },

    /// Entity not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Media sink rejected a command
    #[error("Sink error: {0}")]
    Sink(String),

    /// Persistence store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl TandemError {
    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a backend error from a response code
    pub fn backend(code: i64, msg: impl Into<String>) -> Self {
        Self::Backend {
            code,
            message: msg.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a sink error
    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}
