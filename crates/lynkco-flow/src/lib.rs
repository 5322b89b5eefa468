//! Login flow orchestration
//!
//! Sequences the authentication building blocks from `lynkco-auth` into
//! the end-to-end login: PKCE authorization URL → external browser hop →
//! code exchange → device login + identity claims → VIN lookup →
//! credential persistence and entry finalization.
//!
//! The state machine in `machine` is pure; the `LoginFlow` driver in
//! `login` executes the I/O each action implies and feeds results back as
//! events. The host side of the seam (form rendering, entry persistence)
//! is reached only through the `EntryHost` trait.

pub mod error;
pub mod host;
pub mod login;
pub mod machine;
pub mod vehicle;

pub use error::{Error, Result};
pub use host::EntryHost;
pub use login::{Endpoints, FlowOutcome, LoginFlow};
pub use machine::{
    AbortReason, AttemptContext, LoginAction, LoginEvent, LoginMode, LoginState, PkceRetryPolicy,
    handle_event, is_valid_redirect_uri,
};
