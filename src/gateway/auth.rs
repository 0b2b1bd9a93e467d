//! Credential extraction from inbound request headers
//!
//! The gateway never validates keys itself; it extracts the client's
//! credential and forwards it upstream, where the provider is the
//! authority. Precedence: `Authorization: Bearer` first, then (on the
//! native routes) `Ocp-Apim-Subscription-Key`. With `precheck_api_key`
//! enabled, requests carrying neither are rejected with 401 before any
//! upstream call is made; otherwise a placeholder is forwarded so the
//! provider's own rejection is relayed verbatim.

use axum::http::{header, HeaderMap};
use sha2::{Digest, Sha256};

use super::error::GatewayError;

/// Forwarded when the client supplied no credential and precheck is off;
/// guaranteed to be rejected upstream
const PLACEHOLDER_API_KEY: &str = "invalid-key";

/// 401 body for precheck rejections
const ACCESS_DENIED: &str = "Access denied due to invalid subscription key. \
    Make sure to provide a valid key for an active subscription. \
    Either 'Authorization' header with bearer token is required.";

/// Header routes may accept as a bearer-token alternative
const SUBSCRIPTION_KEY_HEADER: &str = "ocp-apim-subscription-key";

/// Extract the API key to forward upstream.
///
/// `allow_subscription_header` is true on the native chat routes only; the
/// OpenAI-compatible routes accept bearer tokens exclusively.
pub fn api_key_from_headers(
    headers: &HeaderMap,
    allow_subscription_header: bool,
    precheck: bool,
) -> Result<String, GatewayError> {
    if let Some(auth) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if auth.len() > 7 && auth[..7].eq_ignore_ascii_case("bearer ") {
            let key = auth[7..].trim().to_string();
            tracing::debug!(key_fingerprint = %fingerprint(&key), "using bearer credential");
            return Ok(key);
        }
    }

    if allow_subscription_header {
        if let Some(key) = headers
            .get(SUBSCRIPTION_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            let key = key.trim().to_string();
            tracing::debug!(key_fingerprint = %fingerprint(&key), "using subscription-key credential");
            return Ok(key);
        }
    }

    if precheck {
        return Err(GatewayError::Unauthorized(ACCESS_DENIED.to_string()));
    }

    Ok(PLACEHOLDER_API_KEY.to_string())
}

/// Short SHA-256 fingerprint for logging (never log the actual key!)
fn fingerprint(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let hash = hasher.finalize();
    format!("{:x}", hash)[..16].to_string()
}
