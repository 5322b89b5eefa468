//! Lynk & Co cloud authentication library
//!
//! Provides PKCE flow generation, the authorization-code token exchange,
//! the device-login exchange for the CCC service token, unverified JWT
//! claim decoding, and durable credential storage. This crate is a
//! standalone library with no dependency on the login binary — it can be
//! tested and used independently.
//!
//! Credential flow:
//! 1. Host calls `pkce::begin_authorization()` and shows the URL
//! 2. User authorizes in a browser and pastes back the redirect URI
//! 3. Host calls `token::exchange_code()` with the redirect URI + verifier
//! 4. `device::send_device_login()` trades the access token for a CCC token
//! 5. `jwt::decode_claims()` extracts the user id from the ID token
//! 6. Refresh and CCC tokens persisted via `credentials::TokenStore::merge()`

pub mod constants;
pub mod credentials;
pub mod device;
pub mod error;
pub mod jwt;
pub mod pkce;
pub mod token;

pub use constants::*;
pub use credentials::TokenStore;
pub use device::send_device_login;
pub use error::{Error, Result};
pub use jwt::{decode_claims, user_id};
pub use pkce::{
    AuthorizationRequest, begin_authorization, build_authorization_url, compute_challenge,
    generate_verifier,
};
pub use token::{TokenTriple, authorization_code, exchange_code};
