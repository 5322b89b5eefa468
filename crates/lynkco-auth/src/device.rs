//! Device-login exchange for the CCC service token
//!
//! The vehicle API does not accept the OAuth access token directly; a
//! second exchange against the device-login endpoint yields the CCC token
//! that authorizes vehicle calls. Unlike the code exchange, a failure here
//! is soft: the flow carries on without a service token and later aborts
//! with "no vehicles found" instead of crashing the host.

use serde::Deserialize;
use tracing::error;

/// Device-login response. Only the CCC token is consumed.
#[derive(Debug, Deserialize)]
struct DeviceLoginResponse {
    #[serde(rename = "cccToken")]
    ccc_token: String,
}

/// Trade a fresh access token for the CCC service token.
///
/// Returns `None` on network failure, non-success status, or a malformed
/// body; the cause is logged at error level.
pub async fn send_device_login(
    client: &reqwest::Client,
    device_login_url: &str,
    access_token: &str,
) -> Option<String> {
    let response = match client
        .post(device_login_url)
        .bearer_auth(access_token)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "device login request failed");
            return None;
        }
    };

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        error!(%status, body, "device login returned error status");
        return None;
    }

    match response.json::<DeviceLoginResponse>().await {
        Ok(parsed) => Some(parsed.ccc_token),
        Err(e) => {
            error!(error = %e, "device login response missing ccc token");
            None
        }
    }
}
