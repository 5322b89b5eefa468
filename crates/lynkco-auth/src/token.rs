//! Authorization-code token exchange
//!
//! The user completes authorization in a browser and pastes back the
//! redirect URI the vendor app scheme received. The authorization code is
//! pulled out of that URI and exchanged, together with the PKCE verifier,
//! for the access/refresh/ID token triple.
//!
//! The exchange is a single request with no retries: a failed exchange
//! means the code/verifier pairing is most likely already consumed
//! server-side, and a replay would fail identically.

use serde::{Deserialize, Serialize};

use crate::constants::{LYNKCO_CLIENT_ID, REDIRECT_URI};
use crate::error::{Error, Result};

/// Result of a successful authorization-code exchange.
///
/// The access and ID tokens are short-lived and consumed within the login
/// flow; only the refresh token is ever persisted.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenTriple {
    pub access_token: String,
    pub refresh_token: String,
    pub id_token: String,
}

/// Extract the `code` query parameter from a pasted redirect URI.
///
/// The caller has already checked the scheme prefix; here only the query
/// string matters.
pub fn authorization_code(redirect_uri: &str) -> Result<String> {
    let query = redirect_uri
        .split_once('?')
        .map(|(_, q)| q)
        .unwrap_or_default();

    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "code")
        .map(|(_, value)| value.to_owned())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| Error::AuthExchange("redirect URI carries no authorization code".into()))
}

/// Exchange an authorization code for the token triple.
///
/// `verifier` must be the exact PKCE verifier generated for this attempt.
/// Network failure, a non-success status, and a response missing any of
/// the three tokens are all the same outcome: the login failed and the
/// browser hop has to be restarted.
pub async fn exchange_code(
    client: &reqwest::Client,
    token_url: &str,
    redirect_uri: &str,
    verifier: &str,
) -> Result<TokenTriple> {
    let code = authorization_code(redirect_uri)?;

    let response = client
        .post(token_url)
        .form(&[
            ("grant_type", "authorization_code"),
            ("client_id", LYNKCO_CLIENT_ID),
            ("code", &code),
            ("code_verifier", verifier),
            ("redirect_uri", REDIRECT_URI),
        ])
        .send()
        .await
        .map_err(|e| Error::AuthExchange(format!("token exchange request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(Error::AuthExchange(format!(
            "token endpoint returned {status}: {body}"
        )));
    }

    response
        .json::<TokenTriple>()
        .await
        .map_err(|e| Error::AuthExchange(format!("invalid token response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Json;
    use axum::http::StatusCode;
    use axum::routing::post;
    use tokio::net::TcpListener;

    async fn start_token_endpoint(
        status: StatusCode,
        body: serde_json::Value,
    ) -> (String, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let url = format!("http://{addr}/oauth2/v2.0/token");

        let handle = tokio::spawn(async move {
            let app = axum::Router::new().route(
                "/oauth2/v2.0/token",
                post(move || {
                    let body = body.clone();
                    async move { (status, Json(body)) }
                }),
            );
            axum::serve(listener, app).await.unwrap();
        });

        (url, handle)
    }

    const REDIRECT: &str = "msauth://prod.lynkco.app.crisp.prod/oauth2redirect?code=auth-code-1";

    #[test]
    fn token_triple_deserializes() {
        let json = r#"{"access_token":"at_abc","refresh_token":"rt_def","id_token":"id_ghi"}"#;
        let triple: TokenTriple = serde_json::from_str(json).unwrap();
        assert_eq!(triple.access_token, "at_abc");
        assert_eq!(triple.refresh_token, "rt_def");
        assert_eq!(triple.id_token, "id_ghi");
    }

    #[test]
    fn token_triple_missing_field_fails_to_deserialize() {
        let json = r#"{"access_token":"at_abc","refresh_token":"rt_def"}"#;
        assert!(serde_json::from_str::<TokenTriple>(json).is_err());
    }

    #[test]
    fn authorization_code_extracted_from_query() {
        let uri = "msauth://prod.lynkco.app.crisp.prod/oauth2redirect?code=abc123&state=xyz";
        assert_eq!(authorization_code(uri).unwrap(), "abc123");
    }

    #[test]
    fn authorization_code_extracted_when_not_first_param() {
        let uri = "msauth://prod.lynkco.app.crisp.prod/?session_state=s1&code=later";
        assert_eq!(authorization_code(uri).unwrap(), "later");
    }

    #[test]
    fn missing_code_is_exchange_failure() {
        for uri in [
            "msauth://prod.lynkco.app.crisp.prod/",
            "msauth://prod.lynkco.app.crisp.prod/?error=access_denied",
            "msauth://prod.lynkco.app.crisp.prod/?code=",
        ] {
            let err = authorization_code(uri).unwrap_err();
            assert!(
                matches!(err, Error::AuthExchange(_)),
                "{uri:?} must be AuthExchange, got {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn exchange_returns_triple_on_success() {
        let (url, _server) = start_token_endpoint(
            StatusCode::OK,
            serde_json::json!({
                "access_token": "at_1",
                "refresh_token": "rt_1",
                "id_token": "id_1",
                "expires_in": 3600,
            }),
        )
        .await;

        let client = reqwest::Client::new();
        let triple = exchange_code(&client, &url, REDIRECT, "verifier-1")
            .await
            .unwrap();
        assert_eq!(triple.access_token, "at_1");
        assert_eq!(triple.refresh_token, "rt_1");
        assert_eq!(triple.id_token, "id_1");
    }

    #[tokio::test]
    async fn exchange_maps_error_status_to_auth_exchange() {
        let (url, _server) = start_token_endpoint(
            StatusCode::BAD_REQUEST,
            serde_json::json!({"error": "invalid_grant"}),
        )
        .await;

        let client = reqwest::Client::new();
        let err = exchange_code(&client, &url, REDIRECT, "verifier-1")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AuthExchange(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn exchange_maps_incomplete_response_to_auth_exchange() {
        // 200 OK but the id_token is missing — still a failed login
        let (url, _server) = start_token_endpoint(
            StatusCode::OK,
            serde_json::json!({"access_token": "at_1", "refresh_token": "rt_1"}),
        )
        .await;

        let client = reqwest::Client::new();
        let err = exchange_code(&client, &url, REDIRECT, "verifier-1")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AuthExchange(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn exchange_maps_connection_failure_to_auth_exchange() {
        let client = reqwest::Client::new();
        let err = exchange_code(&client, "http://127.0.0.1:1/token", REDIRECT, "verifier-1")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AuthExchange(_)), "got {err:?}");
    }
}
