//! Chat route handlers
//!
//! Each handler does the same dance: extract the credential, peek at the
//! request body (`stream` flag plus dialect-specific touch-ups), and hand
//! the upstream event sequence to the dispatcher. The handler only decides
//! between four response shapes:
//!
//! - streaming success: the dispatcher's wire stream with the dialect's
//!   media type
//! - streaming failure before the first event: an HTTP error with the
//!   provider's status, or - for content-filter blocks with
//!   `raise_4xx_when_blocked` off - a one-shot synthetic pseudo-stream
//! - non-streaming success: the reshaped provider response
//! - non-streaming failure: an HTTP error with the provider's status

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use futures::stream::BoxStream;
use serde_json::Value;

use crate::dialect::{synthetic, Dialect};
use crate::relay::{translate_once, Dispatcher};
use crate::upstream::UpstreamError;

use super::auth;
use super::error::GatewayError;
use super::state::GatewayState;

/// Liveness probe
pub async fn ping() -> &'static str {
    "pong"
}

/// `POST /v1/chat` - first-generation native chat
pub async fn chat_v1(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let api_key = auth::api_key_from_headers(&headers, true, state.precheck_api_key)?;
    let mut body = parse_body(&body)?;

    if state.log_incoming {
        tracing::debug!(message = ?body.get("message"), "native-v1 chat request");
    }
    if state.coerce_citation_quality {
        coerce_citation_quality(&mut body);
    }

    let url = format!("{}/v1/chat", state.api_url);
    chat(state, Dialect::NativeV1, url, api_key, body).await
}

/// `POST /v2/chat` - second-generation native chat
pub async fn chat_v2(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let api_key = auth::api_key_from_headers(&headers, true, state.precheck_api_key)?;
    let body = parse_body(&body)?;

    if state.log_incoming {
        tracing::debug!(messages = ?body.get("messages"), "native-v2 chat request");
    }

    let url = format!("{}/v2/chat", state.api_url);
    chat(state, Dialect::NativeV2, url, api_key, body).await
}

/// `POST /v1/chat/completions` - OpenAI-compatible chat against the
/// configured OpenAI-compatible upstream
pub async fn openai_chat(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let url = format!("{}/chat/completions", state.openai_api_url);
    openai_chat_completions(state, headers, body, url).await
}

/// `POST /compatibility/v1/chat/completions` - OpenAI-compatible chat
/// against the native provider's compatibility endpoint
pub async fn compat_chat(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let url = format!("{}/compatibility/v1/chat/completions", state.api_url);
    openai_chat_completions(state, headers, body, url).await
}

/// Shared flow for both OpenAI-compatible routes
async fn openai_chat_completions(
    state: GatewayState,
    headers: HeaderMap,
    body: Bytes,
    url: String,
) -> Result<Response, GatewayError> {
    // OpenAI-compatible clients authenticate with bearer tokens only
    let api_key = auth::api_key_from_headers(&headers, false, state.precheck_api_key)?;
    let body = parse_body(&body)?;

    if state.log_incoming {
        tracing::debug!(model = ?body.get("model"), "openai-compat chat request");
    }

    chat(state, Dialect::OpenAiCompat, url, api_key, body).await
}

/// Dialect-independent request flow: streaming or not, then error shaping
async fn chat(
    state: GatewayState,
    dialect: Dialect,
    url: String,
    api_key: String,
    body: Value,
) -> Result<Response, GatewayError> {
    let streaming = body
        .get("stream")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    if !streaming {
        let response = state
            .upstream
            .fetch_once(&url, &api_key, &body)
            .await
            .map_err(GatewayError::Upstream)?;
        return Ok(Json(translate_once(response)).into_response());
    }

    let events = state
        .upstream
        .open_stream(url, api_key, body, dialect.framing());
    let dispatcher = Dispatcher::new(dialect, state.mid_stream, state.filler_notice.clone());

    match dispatcher.dispatch(events).await {
        Ok(wire) => stream_response(dialect, wire),
        Err(err) if err.is_content_filter_block() => {
            if state.raise_4xx_when_blocked {
                Err(GatewayError::Blocked {
                    message: err.message(),
                })
            } else {
                // The client asked for a stream; give it a well-formed one
                // carrying the block notice instead of a dropped connection
                tracing::info!(dialect = %dialect, "content filter block answered as pseudo-stream");
                let frames = synthetic::error_stream(dialect, None, &err.message());
                pseudo_stream_response(dialect, frames)
            }
        }
        Err(err) => Err(GatewayError::Upstream(err)),
    }
}

/// Wrap the dispatcher's live wire stream as a streaming response
fn stream_response(
    dialect: Dialect,
    wire: BoxStream<'static, Result<String, UpstreamError>>,
) -> Result<Response, GatewayError> {
    Response::builder()
        .header(header::CONTENT_TYPE, dialect.media_type())
        .body(Body::from_stream(wire))
        .map_err(|e| GatewayError::ResponseBuild(e.to_string()))
}

/// Materialize a synthetic frame sequence as a streaming-shaped response
fn pseudo_stream_response(
    dialect: Dialect,
    frames: Vec<String>,
) -> Result<Response, GatewayError> {
    Response::builder()
        .header(header::CONTENT_TYPE, dialect.media_type())
        .body(Body::from(frames.concat()))
        .map_err(|e| GatewayError::ResponseBuild(e.to_string()))
}

fn parse_body(body: &Bytes) -> Result<Value, GatewayError> {
    serde_json::from_slice(body).map_err(|e| GatewayError::BodyRead(e.to_string()))
}

/// Rewrite `citation_quality: accurate` (or absent) to `fast`.
///
/// The accurate mode multiplies upstream latency; deployments that care
/// opt in via config.
fn coerce_citation_quality(body: &mut Value) {
    let Some(request) = body.as_object_mut() else {
        return;
    };

    let current = request.get("citation_quality").and_then(Value::as_str);
    if current.is_none() || current == Some("accurate") {
        request.insert("citation_quality".to_string(), Value::from("fast"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_body_rejects_invalid_json() {
        let err = parse_body(&Bytes::from_static(b"{not json")).unwrap_err();
        assert!(matches!(err, GatewayError::BodyRead(_)));
    }

    #[test]
    fn test_coerce_citation_quality_rewrites_accurate() {
        let mut body = json!({"message": "hi", "citation_quality": "accurate"});
        coerce_citation_quality(&mut body);
        assert_eq!(body["citation_quality"], "fast");
    }

    #[test]
    fn test_coerce_citation_quality_fills_missing_value() {
        let mut body = json!({"message": "hi"});
        coerce_citation_quality(&mut body);
        assert_eq!(body["citation_quality"], "fast");
    }

    #[test]
    fn test_coerce_citation_quality_keeps_explicit_choice() {
        let mut body = json!({"message": "hi", "citation_quality": "fast"});
        coerce_citation_quality(&mut body);
        assert_eq!(body["citation_quality"], "fast");

        let mut other = json!({"message": "hi", "citation_quality": "custom"});
        coerce_citation_quality(&mut other);
        assert_eq!(other["citation_quality"], "custom");
    }
}
