//! Lynk & Co cloud login CLI
//!
//! Single-binary host for the login flow:
//! 1. Loads TOML config and opens the token store
//! 2. Shows the authorization URL for the browser hop
//! 3. Reads the pasted redirect URI from stdin
//! 4. Re-prompts on recoverable errors, reports the terminal outcome
//!
//! A failed login attempt never crashes the process — the user either
//! gets the form again with an inline error code or a readable abort
//! reason.

mod config;
mod entry;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lynkco_auth::TokenStore;
use lynkco_flow::{Endpoints, FlowOutcome, LoginFlow, LoginMode};

use crate::config::Config;
use crate::entry::FileEntryHost;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting lynkco-login");

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        experimental = config.options.experimental,
        scan_interval_minutes = config.options.scan_interval_minutes,
        dark_hours_start = config.options.dark_hours_start,
        dark_hours_end = config.options.dark_hours_end,
        "options loaded (consumed by the polling scheduler)"
    );

    let store = Arc::new(
        TokenStore::load(config.storage.credentials_path.clone())
            .await
            .context("failed to open token store")?,
    );

    let host = Arc::new(FileEntryHost::new(config.storage.entry_path.clone()));

    // Explicit mode: re-authenticate when an entry record already exists.
    let mode = match host.load().await {
        Some(record) => {
            info!(
                entry_id = %record.entry_id,
                vin = %record.vin,
                "existing entry found, re-authenticating"
            );
            LoginMode::Reauthenticate {
                entry_id: record.entry_id,
            }
        }
        None => LoginMode::NewLogin,
    };

    let mut flow = LoginFlow::new(
        reqwest::Client::new(),
        Endpoints::default(),
        store,
        host,
        mode,
    )
    .with_retry_policy(config.login.pkce_retry.policy());

    let mut auth_url = flow.begin();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        println!("Authenticate in your browser, then paste the redirect URI back here:");
        println!("  {auth_url}");

        let Some(line) = lines.next_line().await.context("reading redirect URI")? else {
            warn!("input closed before login completed");
            return Ok(());
        };

        match flow.submit_redirect(&line).await {
            Ok(FlowOutcome::Success {
                vin,
                reauthenticated,
            }) => {
                if reauthenticated {
                    info!(vin, "re-authentication successful");
                    println!("Re-authentication successful; vehicle {vin} rebound.");
                } else {
                    info!(vin, "login successful");
                    println!("Login successful; managing vehicle {vin}.");
                }
                return Ok(());
            }
            Ok(FlowOutcome::Aborted { reason }) => {
                println!("Login aborted: {}", reason.code());
                return Ok(());
            }
            Err(
                e @ (lynkco_flow::Error::Validation(_) | lynkco_flow::Error::AuthExchange(_)),
            ) => {
                // Recoverable: the attempt is still alive, possibly with a
                // regenerated authorization URL
                error!(error = %e, "login step failed, re-prompting");
                println!("Error: {e}. Try again.");
                if let Some(url) = flow.authorization_url() {
                    auth_url = url.to_owned();
                }
            }
            Err(e) => {
                error!(error = %e, "login attempt failed");
                println!("Login failed: {e}");
                return Ok(());
            }
        }
    }
}
