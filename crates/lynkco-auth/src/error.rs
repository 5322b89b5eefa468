//! Error types for authentication operations

/// Errors from authentication operations.
///
/// Transport failures, non-success statuses, and malformed exchange
/// responses all collapse into `AuthExchange` — the caller restarts the
/// browser hop either way, so the distinction carries no recovery value.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("token exchange failed: {0}")]
    AuthExchange(String),

    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
