//! Lynk & Co cloud OAuth constants
//!
//! Public client configuration matching the mobile app. These values are
//! not secrets — they identify the public client application. The actual
//! secrets (refresh/CCC tokens) are managed by the token store.

/// Public OAuth client ID of the mobile app (Azure AD B2C tenant)
pub const LYNKCO_CLIENT_ID: &str = "8ed57c3c-8c83-4a10-8f95-28a3d2a03b5f";

/// Registered redirect URI of the mobile app. The authorization response
/// comes back on this custom scheme and is pasted in by the user.
pub const REDIRECT_URI: &str = "msauth://prod.lynkco.app.crisp.prod/oauth2redirect";

/// Scheme prefix an incoming redirect URI must carry to be treated as an
/// authorization response at all.
pub const REDIRECT_SCHEME_PREFIX: &str = "msauth://prod.lynkco.app.crisp.prod/";

/// Authorization endpoint (B2C sign-in policy)
pub const AUTHORIZE_ENDPOINT: &str =
    "https://login.lynkco.com/lynkco.onmicrosoft.com/b2c_1a_signin_mfa/oauth2/v2.0/authorize";

/// Token endpoint for the authorization-code exchange
pub const TOKEN_ENDPOINT: &str =
    "https://login.lynkco.com/lynkco.onmicrosoft.com/b2c_1a_signin_mfa/oauth2/v2.0/token";

/// Device-login endpoint: trades a fresh access token for the CCC token
/// the vehicle API requires.
pub const DEVICE_LOGIN_ENDPOINT: &str = "https://appgateway.lynkco.com/device/v1/login";

/// Vehicle listing endpoint, keyed by user id, authorized by CCC token
pub const VEHICLE_ENDPOINT: &str = "https://appgateway.lynkco.com/vehicle/v1/vehicles";

/// OAuth scopes requested during authorization.
/// `offline_access` is required to receive a refresh token.
pub const SCOPES: &str = "openid profile offline_access";

/// PKCE challenge derivation advertised in the authorization URL
pub const CODE_CHALLENGE_METHOD: &str = "S256";

/// Bundle key for the OAuth refresh token
pub const STORAGE_REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Bundle key for the CCC service token
pub const STORAGE_CCC_TOKEN_KEY: &str = "ccc_token";

/// ID-token claim carrying the numeric user identifier
pub const USER_ID_CLAIM: &str = "snowflakeId";
