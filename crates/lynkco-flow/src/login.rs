//! Login flow driver
//!
//! Owns the I/O side of the state machine: executes each `LoginAction`
//! (token exchange, device login, claim decoding, VIN lookup, persistence)
//! and feeds the result back as the next `LoginEvent` until the machine
//! either needs the user again or reaches a terminal state.
//!
//! The flow suspends cooperatively between `begin()` and
//! `submit_redirect()` while the user authenticates in a browser; the
//! attempt context (including the PKCE verifier) waits inside the state.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use lynkco_auth::constants::{
    DEVICE_LOGIN_ENDPOINT, STORAGE_CCC_TOKEN_KEY, STORAGE_REFRESH_TOKEN_KEY, TOKEN_ENDPOINT,
    USER_ID_CLAIM, VEHICLE_ENDPOINT,
};
use lynkco_auth::credentials::TokenStore;
use lynkco_auth::{device, jwt, pkce, token};

use crate::error::{Error, Result};
use crate::host::EntryHost;
use crate::machine::{
    AbortReason, AttemptContext, ERROR_LOGIN_FAILED, LoginAction, LoginEvent, LoginMode,
    LoginState, PkceRetryPolicy, handle_event,
};
use crate::vehicle;

/// Vendor endpoint set. Defaults to the production cloud; overridable for
/// tests and gateway deployments.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub token_url: String,
    pub device_login_url: String,
    pub vehicle_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            token_url: TOKEN_ENDPOINT.into(),
            device_login_url: DEVICE_LOGIN_ENDPOINT.into(),
            vehicle_url: VEHICLE_ENDPOINT.into(),
        }
    }
}

/// Terminal result of one login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    Success { vin: String, reauthenticated: bool },
    Aborted { reason: AbortReason },
}

/// Drives one user's login attempts against the vendor cloud.
///
/// One attempt at a time: `begin()` starts (or restarts) an attempt and
/// returns the authorization URL; `submit_redirect()` resumes it with the
/// pasted redirect URI. Recoverable errors (`Validation`, `AuthExchange`)
/// leave an attempt alive for another `submit_redirect()` call.
pub struct LoginFlow {
    client: reqwest::Client,
    endpoints: Endpoints,
    store: Arc<TokenStore>,
    host: Arc<dyn EntryHost>,
    mode: LoginMode,
    retry_policy: PkceRetryPolicy,
    state: LoginState,
    last_failure: Option<Error>,
}

impl LoginFlow {
    pub fn new(
        client: reqwest::Client,
        endpoints: Endpoints,
        store: Arc<TokenStore>,
        host: Arc<dyn EntryHost>,
        mode: LoginMode,
    ) -> Self {
        Self {
            client,
            endpoints,
            store,
            host,
            state: LoginState::Idle { mode: mode.clone() },
            mode,
            retry_policy: PkceRetryPolicy::default(),
            last_failure: None,
        }
    }

    /// Override what happens to the PKCE pair after a failed exchange.
    pub fn with_retry_policy(mut self, retry_policy: PkceRetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Start a fresh attempt and return the authorization URL to show the
    /// user. Any in-flight attempt is discarded.
    pub fn begin(&mut self) -> String {
        self.state = LoginState::Idle {
            mode: self.mode.clone(),
        };
        self.last_failure = None;
        self.prepare_authorization()
    }

    /// The current attempt's authorization URL, if an attempt is active.
    /// Fresh after a post-failure regeneration.
    pub fn authorization_url(&self) -> Option<&str> {
        match &self.state {
            LoginState::AwaitingRedirect { attempt }
            | LoginState::Exchanging { attempt, .. }
            | LoginState::ResolvingIdentity { attempt, .. } => Some(&attempt.auth_url),
            _ => None,
        }
    }

    /// Label of the current state, for logging.
    pub fn state_label(&self) -> &'static str {
        self.state.label()
    }

    /// The internally-distinct cause behind the most recent failure or
    /// conflated abort (`CredentialUnavailable` vs `MalformedToken` vs
    /// `NoVehiclesFound`). User messaging does not distinguish these;
    /// logs and tests do.
    pub fn last_failure(&self) -> Option<&Error> {
        self.last_failure.as_ref()
    }

    /// Resume the attempt with the redirect URI the user pasted back.
    ///
    /// Returns a terminal `FlowOutcome`, or a recoverable error
    /// (`Validation` / `AuthExchange`) while the attempt stays alive for a
    /// retry. `Persistence` errors are fatal to the attempt.
    pub async fn submit_redirect(&mut self, redirect_uri: &str) -> Result<FlowOutcome> {
        if !matches!(self.state, LoginState::AwaitingRedirect { .. }) {
            return Err(Error::Validation(
                "no login attempt awaiting a redirect".into(),
            ));
        }

        let mut action = self.advance(LoginEvent::RedirectSupplied {
            redirect_uri: redirect_uri.trim().to_owned(),
        });

        loop {
            action = match action {
                LoginAction::SurfaceError { code } => {
                    return Err(if code == ERROR_LOGIN_FAILED {
                        Error::AuthExchange(code.into())
                    } else {
                        Error::Validation(code.into())
                    });
                }

                LoginAction::ExchangeCode { redirect_uri } => {
                    let verifier = match &self.state {
                        LoginState::Exchanging { attempt, .. } => {
                            attempt.verifier.expose().clone()
                        }
                        _ => String::new(),
                    };
                    match token::exchange_code(
                        &self.client,
                        &self.endpoints.token_url,
                        &redirect_uri,
                        &verifier,
                    )
                    .await
                    {
                        Ok(tokens) => self.advance(LoginEvent::ExchangeSucceeded { tokens }),
                        Err(e) => {
                            warn!(error = %e, "authorization code exchange failed");
                            let error = e.to_string();
                            self.last_failure = Some(Error::AuthExchange(error.clone()));
                            self.advance(LoginEvent::ExchangeFailed { error })
                        }
                    }
                }

                LoginAction::RestartAuthorization => {
                    self.prepare_authorization();
                    return Err(Error::AuthExchange(ERROR_LOGIN_FAILED.into()));
                }

                LoginAction::ResolveIdentity {
                    access_token,
                    id_token,
                } => {
                    let ccc_token = device::send_device_login(
                        &self.client,
                        &self.endpoints.device_login_url,
                        &access_token,
                    )
                    .await;
                    if ccc_token.is_none() {
                        error!("device login yielded no service token");
                        self.last_failure = Some(Error::CredentialUnavailable(
                            "device login yielded no service token".into(),
                        ));
                    }

                    let user_id = match jwt::decode_claims(&id_token) {
                        Ok(claims) => {
                            let user_id = jwt::user_id(&claims);
                            if user_id.is_none() {
                                error!(claim = USER_ID_CLAIM, "identity token carries no user id");
                                self.last_failure = Some(Error::MalformedToken(
                                    "identity token carries no user id claim".into(),
                                ));
                            }
                            user_id
                        }
                        Err(e) => {
                            error!(error = %e, "identity token could not be decoded");
                            self.last_failure = Some(Error::MalformedToken(e.to_string()));
                            None
                        }
                    };

                    self.advance(LoginEvent::IdentityResolved { ccc_token, user_id })
                }

                LoginAction::LookupVehicles { ccc_token, user_id } => {
                    let vins = vehicle::list_vins(
                        &self.client,
                        &self.endpoints.vehicle_url,
                        &ccc_token,
                        &user_id,
                    )
                    .await;
                    if vins.is_empty() {
                        self.last_failure = Some(Error::NoVehiclesFound);
                    }
                    self.advance(LoginEvent::VehiclesListed { vins })
                }

                LoginAction::PersistCredentials {
                    refresh_token,
                    ccc_token,
                    vin,
                } => match self.finalize(refresh_token, ccc_token, &vin).await {
                    Ok(()) => self.advance(LoginEvent::CredentialsPersisted),
                    Err(detail) => {
                        error!(error = %detail, "failed to persist login result");
                        self.advance(LoginEvent::PersistenceFailed {
                            error: detail.clone(),
                        });
                        self.last_failure = Some(Error::Persistence(detail.clone()));
                        return Err(Error::Persistence(detail));
                    }
                },

                // begin() already handed the URL to the caller
                LoginAction::PresentAuthorization { .. } => LoginAction::None,

                LoginAction::None => return self.terminal_outcome(),
            };
        }
    }

    /// Generate a fresh PKCE pair, enter `AwaitingRedirect`, and return
    /// the authorization URL.
    fn prepare_authorization(&mut self) -> String {
        let authorization = pkce::begin_authorization();
        let auth_url = authorization.auth_url.clone();
        let attempt = AttemptContext::new(self.mode.clone(), authorization, self.retry_policy);
        info!(attempt_id = %attempt.attempt_id, mode = ?self.mode, "starting login attempt");
        self.advance(LoginEvent::AuthorizationPrepared { attempt });
        auth_url
    }

    fn advance(&mut self, event: LoginEvent) -> LoginAction {
        let state = std::mem::take(&mut self.state);
        let (state, action) = handle_event(state, event);
        debug!(state = state.label(), "login state transition");
        self.state = state;
        action
    }

    /// Write the token bundle, then create or update+reload the entry
    /// record per the attempt mode. Returns the failure detail on error.
    async fn finalize(
        &self,
        refresh_token: String,
        ccc_token: String,
        vin: &str,
    ) -> std::result::Result<(), String> {
        self.store
            .merge([
                (STORAGE_REFRESH_TOKEN_KEY.to_string(), refresh_token),
                (STORAGE_CCC_TOKEN_KEY.to_string(), ccc_token),
            ])
            .await
            .map_err(|e| e.to_string())?;

        let mode = match &self.state {
            LoginState::Finalizing { mode, .. } => mode.clone(),
            _ => self.mode.clone(),
        };
        match mode {
            LoginMode::NewLogin => {
                self.host
                    .create_entry(vin)
                    .await
                    .map_err(|e| e.to_string())?;
            }
            LoginMode::Reauthenticate { entry_id } => {
                self.host
                    .update_entry(&entry_id, vin)
                    .await
                    .map_err(|e| e.to_string())?;
                self.host
                    .reload_entry(&entry_id)
                    .await
                    .map_err(|e| e.to_string())?;
            }
        }

        info!(vin, "login finalized");
        Ok(())
    }

    fn terminal_outcome(&self) -> Result<FlowOutcome> {
        match &self.state {
            LoginState::Success {
                vin,
                reauthenticated,
            } => Ok(FlowOutcome::Success {
                vin: vin.clone(),
                reauthenticated: *reauthenticated,
            }),
            LoginState::Aborted {
                reason: reason @ AbortReason::NoVinsFound,
            } => {
                warn!(reason = reason.code(), "login attempt aborted");
                Ok(FlowOutcome::Aborted { reason: *reason })
            }
            LoginState::Aborted {
                reason: AbortReason::PersistenceFailed,
            } => Err(Error::Persistence("credential persistence failed".into())),
            _ => Err(Error::Validation("login attempt is not complete".into())),
        }
    }
}
