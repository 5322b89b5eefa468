//! Unverified JWT payload decoding
//!
//! Splits a compact JWT, base64url-decodes the payload segment, and parses
//! it as a JSON object. Signature, issuer, audience, and expiry are NOT
//! checked — the ID token arrives over TLS from the token endpoint and is
//! only mined for the user identifier claim.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Map, Value};

use crate::constants::USER_ID_CLAIM;
use crate::error::{Error, Result};

/// Decode the claims of a compact JWT without verifying it.
///
/// Accepts both padded and unpadded base64url payload segments. Anything
/// that is not `header.payload.signature` with a JSON-object payload is a
/// `MalformedToken` error.
pub fn decode_claims(token: &str) -> Result<Map<String, Value>> {
    let segments: Vec<&str> = token.split('.').collect();
    let [header, payload, signature] = segments.as_slice() else {
        return Err(Error::MalformedToken(format!(
            "expected 3 segments, got {}",
            segments.len()
        )));
    };
    if header.is_empty() || payload.is_empty() || signature.is_empty() {
        return Err(Error::MalformedToken("empty segment".into()));
    }

    // Some issuers pad the payload segment; strip before no-pad decoding.
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| Error::MalformedToken(format!("payload is not base64url: {e}")))?;

    let value: Value = serde_json::from_slice(&bytes)
        .map_err(|e| Error::MalformedToken(format!("payload is not JSON: {e}")))?;

    match value {
        Value::Object(claims) => Ok(claims),
        other => Err(Error::MalformedToken(format!(
            "payload is not a JSON object: {other}"
        ))),
    }
}

/// Extract the user identifier claim from decoded claims.
///
/// The vendor issues `snowflakeId` as either a string or a number
/// depending on token version; both normalize to a string.
pub fn user_id(claims: &Map<String, Value>) -> Option<String> {
    match claims.get(USER_ID_CLAIM)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
