//! Login state machine
//!
//! Pure state machine: receives events, returns (new_state, action).
//! The driver (`login::LoginFlow`) executes the I/O implied by each action
//! and feeds the result back as the next event.
//!
//! The attempt context carrying the PKCE verifier lives inside the states
//! themselves, in memory only, for the lifetime of one attempt. It crosses
//! the external suspension (user authenticating in a browser) but never a
//! process restart — losing the process means starting over from `Idle`.

use common::Secret;
use uuid::Uuid;

use lynkco_auth::constants::REDIRECT_SCHEME_PREFIX;
use lynkco_auth::pkce::AuthorizationRequest;
use lynkco_auth::token::TokenTriple;

/// Inline error code: redirect URI does not carry the app scheme.
pub const ERROR_INVALID_REDIRECT_URI: &str = "invalid_redirect_uri";
/// Inline error code: the form was submitted without a redirect URI.
pub const ERROR_MISSING_DETAILS: &str = "missing_details";
/// Inline error code: the code exchange failed.
pub const ERROR_LOGIN_FAILED: &str = "login_failed";

/// How the attempt was initiated. Explicit constructor input — a re-auth
/// is never inferred from what happens to exist on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginMode {
    NewLogin,
    Reauthenticate { entry_id: String },
}

/// Whether a failed code exchange keeps the PKCE pair for the retry.
///
/// The authorization code is one-time-use server-side; whether the
/// verifier/challenge pairing survives is vendor-specific, so the safe
/// default is a fresh pair per retry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PkceRetryPolicy {
    #[default]
    Regenerate,
    Reuse,
}

/// Attempt-scoped context carried through the states of one login attempt.
///
/// The verifier is wrapped in `Secret` so state transitions can be logged
/// without leaking it. Never persisted.
#[derive(Debug)]
pub struct AttemptContext {
    pub attempt_id: Uuid,
    pub mode: LoginMode,
    pub verifier: Secret<String>,
    pub auth_url: String,
    pub retry_policy: PkceRetryPolicy,
}

impl AttemptContext {
    /// Bind a freshly generated authorization request to a new attempt.
    pub fn new(
        mode: LoginMode,
        authorization: AuthorizationRequest,
        retry_policy: PkceRetryPolicy,
    ) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            mode,
            verifier: Secret::new(authorization.verifier),
            auth_url: authorization.auth_url,
            retry_policy,
        }
    }
}

/// Why a terminal `Aborted` was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// No service credential, no user id, or an empty VIN list — all
    /// surface as the same user-facing reason.
    NoVinsFound,
    /// The token bundle or entry record could not be written.
    PersistenceFailed,
}

impl AbortReason {
    /// User-visible reason code.
    pub fn code(&self) -> &'static str {
        match self {
            AbortReason::NoVinsFound => "no_vins_found",
            AbortReason::PersistenceFailed => "persistence_failed",
        }
    }
}

/// Login attempt states.
#[derive(Debug)]
pub enum LoginState {
    /// No PKCE pair generated yet for this attempt
    Idle { mode: LoginMode },
    /// Authorization URL shown; waiting for the user to paste the
    /// redirect URI back (arbitrarily long external suspension)
    AwaitingRedirect { attempt: AttemptContext },
    /// Authorization code being exchanged for the token triple
    Exchanging {
        attempt: AttemptContext,
        redirect_uri: String,
    },
    /// Device login + ID token decoding in progress
    ResolvingIdentity {
        attempt: AttemptContext,
        tokens: TokenTriple,
    },
    /// VIN lookup in progress
    ResolvingVehicle {
        mode: LoginMode,
        refresh_token: String,
        ccc_token: String,
        user_id: String,
    },
    /// Persisting tokens and the selected VIN
    Finalizing {
        mode: LoginMode,
        refresh_token: String,
        ccc_token: String,
        vin: String,
    },
    /// Terminal: logged in, vehicle bound
    Success { vin: String, reauthenticated: bool },
    /// Terminal: attempt ended without a vehicle binding
    Aborted { reason: AbortReason },
}

impl Default for LoginState {
    fn default() -> Self {
        LoginState::Idle {
            mode: LoginMode::NewLogin,
        }
    }
}

impl LoginState {
    /// State label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            LoginState::Idle { .. } => "idle",
            LoginState::AwaitingRedirect { .. } => "awaiting_redirect",
            LoginState::Exchanging { .. } => "exchanging",
            LoginState::ResolvingIdentity { .. } => "resolving_identity",
            LoginState::ResolvingVehicle { .. } => "resolving_vehicle",
            LoginState::Finalizing { .. } => "finalizing",
            LoginState::Success { .. } => "success",
            LoginState::Aborted { .. } => "aborted",
        }
    }
}

/// Events that drive state transitions.
#[derive(Debug)]
pub enum LoginEvent {
    /// A fresh PKCE pair and authorization URL exist for this attempt
    AuthorizationPrepared { attempt: AttemptContext },
    /// The user pasted a redirect URI
    RedirectSupplied { redirect_uri: String },
    /// Code exchange produced the token triple
    ExchangeSucceeded { tokens: TokenTriple },
    /// Code exchange failed (network, status, or incomplete response)
    ExchangeFailed { error: String },
    /// Device login and claim decoding finished, possibly empty-handed
    IdentityResolved {
        ccc_token: Option<String>,
        user_id: Option<String>,
    },
    /// Vehicle lookup finished (failure is an empty list)
    VehiclesListed { vins: Vec<String> },
    /// Token bundle and entry record written
    CredentialsPersisted,
    /// Token bundle or entry record could not be written
    PersistenceFailed { error: String },
}

/// Actions the driver executes after a state transition.
#[derive(Debug)]
pub enum LoginAction {
    /// Show the authorization URL to the user (out-of-band browser hop)
    PresentAuthorization { auth_url: String },
    /// Re-show the input form with an inline error code
    SurfaceError { code: &'static str },
    /// Run the authorization-code exchange for this redirect URI
    ExchangeCode { redirect_uri: String },
    /// Run device login and decode the ID token claims
    ResolveIdentity {
        access_token: String,
        id_token: String,
    },
    /// Query the vehicle API for the user's VINs
    LookupVehicles { ccc_token: String, user_id: String },
    /// Write tokens to the store and finalize the entry record
    PersistCredentials {
        refresh_token: String,
        ccc_token: String,
        vin: String,
    },
    /// Generate a fresh PKCE pair and re-present (post-exchange-failure)
    RestartAuthorization,
    /// No-op
    None,
}

/// Whether a pasted redirect URI is plausibly an authorization response.
///
/// Only the registered app scheme prefix counts; anything else is user
/// input that must not reach the token endpoint.
pub fn is_valid_redirect_uri(redirect_uri: &str) -> bool {
    redirect_uri.starts_with(REDIRECT_SCHEME_PREFIX)
}

/// Handle a state transition. Pure function: no I/O.
pub fn handle_event(state: LoginState, event: LoginEvent) -> (LoginState, LoginAction) {
    match (state, event) {
        // --- Idle ---
        (LoginState::Idle { .. }, LoginEvent::AuthorizationPrepared { attempt }) => {
            let auth_url = attempt.auth_url.clone();
            (
                LoginState::AwaitingRedirect { attempt },
                LoginAction::PresentAuthorization { auth_url },
            )
        }

        // --- AwaitingRedirect ---
        // Validation failures keep the attempt (and its PKCE pair) alive;
        // the user is re-prompted within the same attempt.
        (LoginState::AwaitingRedirect { attempt }, LoginEvent::RedirectSupplied { redirect_uri }) => {
            if redirect_uri.trim().is_empty() {
                (
                    LoginState::AwaitingRedirect { attempt },
                    LoginAction::SurfaceError {
                        code: ERROR_MISSING_DETAILS,
                    },
                )
            } else if !is_valid_redirect_uri(&redirect_uri) {
                (
                    LoginState::AwaitingRedirect { attempt },
                    LoginAction::SurfaceError {
                        code: ERROR_INVALID_REDIRECT_URI,
                    },
                )
            } else {
                (
                    LoginState::Exchanging {
                        attempt,
                        redirect_uri: redirect_uri.clone(),
                    },
                    LoginAction::ExchangeCode { redirect_uri },
                )
            }
        }

        // --- Exchanging ---
        (LoginState::Exchanging { attempt, .. }, LoginEvent::ExchangeSucceeded { tokens }) => {
            let access_token = tokens.access_token.clone();
            let id_token = tokens.id_token.clone();
            (
                LoginState::ResolvingIdentity { attempt, tokens },
                LoginAction::ResolveIdentity {
                    access_token,
                    id_token,
                },
            )
        }

        (LoginState::Exchanging { attempt, .. }, LoginEvent::ExchangeFailed { .. }) => {
            match attempt.retry_policy {
                PkceRetryPolicy::Reuse => (
                    LoginState::AwaitingRedirect { attempt },
                    LoginAction::SurfaceError {
                        code: ERROR_LOGIN_FAILED,
                    },
                ),
                PkceRetryPolicy::Regenerate => (
                    LoginState::Idle { mode: attempt.mode },
                    LoginAction::RestartAuthorization,
                ),
            }
        }

        // --- ResolvingIdentity ---
        // Missing service credential and missing user id both end in the
        // same user-facing abort; the driver logs the distinct cause.
        (
            LoginState::ResolvingIdentity { attempt, tokens },
            LoginEvent::IdentityResolved { ccc_token, user_id },
        ) => match (ccc_token, user_id) {
            (Some(ccc_token), Some(user_id)) => (
                LoginState::ResolvingVehicle {
                    mode: attempt.mode,
                    refresh_token: tokens.refresh_token,
                    ccc_token: ccc_token.clone(),
                    user_id: user_id.clone(),
                },
                LoginAction::LookupVehicles { ccc_token, user_id },
            ),
            _ => (
                LoginState::Aborted {
                    reason: AbortReason::NoVinsFound,
                },
                LoginAction::None,
            ),
        },

        // --- ResolvingVehicle ---
        // The first VIN is the managed vehicle; a simplifying policy, not
        // a uniqueness guarantee from the API.
        (
            LoginState::ResolvingVehicle {
                mode,
                refresh_token,
                ccc_token,
                ..
            },
            LoginEvent::VehiclesListed { vins },
        ) => match vins.into_iter().next() {
            Some(vin) => (
                LoginState::Finalizing {
                    mode,
                    refresh_token: refresh_token.clone(),
                    ccc_token: ccc_token.clone(),
                    vin: vin.clone(),
                },
                LoginAction::PersistCredentials {
                    refresh_token,
                    ccc_token,
                    vin,
                },
            ),
            None => (
                LoginState::Aborted {
                    reason: AbortReason::NoVinsFound,
                },
                LoginAction::None,
            ),
        },

        // --- Finalizing ---
        (LoginState::Finalizing { mode, vin, .. }, LoginEvent::CredentialsPersisted) => {
            let reauthenticated = matches!(mode, LoginMode::Reauthenticate { .. });
            (
                LoginState::Success {
                    vin,
                    reauthenticated,
                },
                LoginAction::None,
            )
        }

        (LoginState::Finalizing { .. }, LoginEvent::PersistenceFailed { .. }) => (
            LoginState::Aborted {
                reason: AbortReason::PersistenceFailed,
            },
            LoginAction::None,
        ),

        // --- Invalid/unhandled transition: stay in current state ---
        (state, _event) => (state, LoginAction::None),
    }
}
