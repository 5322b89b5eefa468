//! Vehicle listing client
//!
//! One authenticated GET against the vehicle endpoint, returning the VINs
//! registered to a user id. Failures are not distinguishable from an empty
//! garage at this layer — the orchestrator aborts with "no vehicles found"
//! either way — so the underlying cause is only logged.

use serde::Deserialize;
use tracing::warn;

/// One vehicle record in the listing response. Only the VIN is consumed.
#[derive(Debug, Deserialize)]
struct VehicleEntry {
    vin: String,
}

/// List the VINs owned by `user_id`, authorized by the CCC token.
///
/// Network errors, non-success statuses, and malformed bodies all yield
/// the empty list (logged at warn level).
pub async fn list_vins(
    client: &reqwest::Client,
    vehicle_url: &str,
    ccc_token: &str,
    user_id: &str,
) -> Vec<String> {
    let response = match client
        .get(vehicle_url)
        .bearer_auth(ccc_token)
        .query(&[("userId", user_id)])
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "vehicle listing request failed");
            return Vec::new();
        }
    };

    let status = response.status();
    if !status.is_success() {
        warn!(%status, "vehicle listing returned error status");
        return Vec::new();
    }

    match response.json::<Vec<VehicleEntry>>().await {
        Ok(entries) => entries.into_iter().map(|entry| entry.vin).collect(),
        Err(e) => {
            warn!(error = %e, "vehicle listing response malformed");
            Vec::new()
        }
    }
}
