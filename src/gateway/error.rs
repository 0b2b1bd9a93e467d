//! Gateway error types and response handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::upstream::UpstreamError;

/// Errors a handler can answer with before any stream bytes are committed
///
/// Mid-stream failures never appear here; once the response has started
/// they are resolved in-band by the dispatcher.
#[derive(Debug)]
pub enum GatewayError {
    /// Credential precheck failed
    Unauthorized(String),
    /// Request body was not valid JSON
    BodyRead(String),
    /// Provider rejected the call before producing any content
    Upstream(UpstreamError),
    /// Content-policy block answered as a client error (per config)
    Blocked { message: String },
    /// Building the outbound response failed
    ResponseBuild(String),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            GatewayError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            GatewayError::BodyRead(msg) => (StatusCode::BAD_REQUEST, msg),
            GatewayError::Upstream(err) => (
                StatusCode::from_u16(err.status).unwrap_or(StatusCode::BAD_GATEWAY),
                err.message(),
            ),
            GatewayError::Blocked { message } => (StatusCode::BAD_REQUEST, message),
            GatewayError::ResponseBuild(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        tracing::error!("Gateway error: {} - {}", status, message);

        (status, Json(json!({ "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_upstream_error_keeps_provider_status() {
        let err = GatewayError::Upstream(UpstreamError::new(429, json!({"message": "slow down"})));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_upstream_error_with_bogus_status_maps_to_bad_gateway() {
        let err = GatewayError::Upstream(UpstreamError::new(0, Value::Null));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_blocked_is_a_client_error() {
        let err = GatewayError::Blocked {
            message: "output blocked".to_string(),
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
