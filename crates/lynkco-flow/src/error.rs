//! Error types for the login flow
//!
//! Every network or decoding failure is translated into one of these kinds
//! at its step boundary; raw transport/parse errors never reach the host.
//! `Validation` and `AuthExchange` are recoverable within the same session
//! (the user is re-prompted); the rest end the attempt.

/// Errors from login flow operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("authorization exchange failed: {0}")]
    AuthExchange(String),

    #[error("service credential unavailable: {0}")]
    CredentialUnavailable(String),

    #[error("malformed identity token: {0}")]
    MalformedToken(String),

    #[error("no vehicles found")]
    NoVehiclesFound,

    #[error("credential persistence failed: {0}")]
    Persistence(String),
}

/// Result alias for flow operations.
pub type Result<T> = std::result::Result<T, Error>;
