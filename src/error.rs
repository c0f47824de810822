// error.rs

use thiserror::Error;

/// Failure reported by a backend port (repository or auth provider).
#[derive(Debug, Error)]
pub enum BackendError {
    /// Credentials were rejected or the session token is no longer valid.
    #[error("{0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-success HTTP status, with the message the backend sent.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("session file: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced to the view layer.
///
/// Every variant carries a message suitable for showing to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("{0}")]
    Auth(String),

    #[error("Failed to load todos: {0}")]
    Load(String),

    #[error("{0}")]
    Mutation(String),

    #[error("{0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn not_authenticated() -> Self {
        Error::Auth("Not authenticated".to_string())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
