//! Upstream module - the provider-facing HTTP client
//!
//! The rest of parley only ever sees two shapes from here: a lazy sequence
//! of `Result<serde_json::Value, UpstreamError>` events (streaming), or one
//! `Result<Value, UpstreamError>` (non-streaming). The request is not sent
//! until the event sequence is first polled, so the dispatcher's
//! first-success gate is the single place that distinguishes
//! failed-before-stream from failed-mid-stream.

pub mod decode;

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use async_stream::stream;
use futures::{Stream, StreamExt};
use serde_json::Value;

use crate::dialect::WireFraming;
use crate::util::truncate_utf8_safe;

/// Fallback message when the provider's error body carries none
const DEFAULT_ERROR_MESSAGE: &str = "An error occurred.";

/// Longest upstream error body we will quote in logs
const MAX_LOGGED_BODY_BYTES: usize = 512;

// ============================================================================
// Upstream Error
// ============================================================================

/// A classified provider failure: the HTTP status the provider answered
/// with, plus its response body (structured if it parsed as JSON)
#[derive(Debug, Clone)]
pub struct UpstreamError {
    pub status: u16,
    pub body: Value,
}

impl UpstreamError {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// A transport-level failure (connect, TLS, mid-body drop) that never
    /// produced a provider status; reported as a bad gateway.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: 502,
            body: Value::String(message.into()),
        }
    }

    /// The human-readable message for this failure.
    ///
    /// Structured bodies carry it under `message`; everything else is
    /// stringified as-is.
    pub fn message(&self) -> String {
        match &self.body {
            Value::Object(map) => map
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_ERROR_MESSAGE)
                .to_string(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Whether this is the provider's content-policy rejection.
    ///
    /// The wire carries no exception class names, so classification matches
    /// the blocked-content marker in the provider's message on a client
    /// error status.
    pub fn is_content_filter_block(&self) -> bool {
        self.status / 100 == 4 && self.message().to_lowercase().contains("block")
    }
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "upstream error (status {}): {}",
            self.status,
            self.message()
        )
    }
}

impl std::error::Error for UpstreamError {}

// ============================================================================
// Upstream Client
// ============================================================================

/// Shared HTTP client for all upstream calls
#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
}

impl UpstreamClient {
    /// Build the shared client with timeout and connection pooling
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(300)) // 5 minute timeout for API calls
            .pool_max_idle_per_host(10)
            // Force HTTP/1.1 to avoid HTTP/2 connection reset issues with some providers
            .http1_only()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { http })
    }

    /// Open a lazy stream of decoded provider events.
    ///
    /// Nothing happens until the first poll: the request is then sent, a
    /// non-2xx status is yielded as the first (and only) error, and a 2xx
    /// body is decoded per `framing` event by event.
    pub fn open_stream(
        &self,
        url: String,
        api_key: String,
        body: Value,
        framing: WireFraming,
    ) -> impl Stream<Item = Result<Value, UpstreamError>> + Send + 'static {
        let http = self.http.clone();

        stream! {
            tracing::debug!(%url, "opening upstream stream");

            let response = match http
                .post(&url)
                .bearer_auth(&api_key)
                .header(reqwest::header::ACCEPT, "text/event-stream")
                .json(&body)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    yield Err(UpstreamError::transport(format!(
                        "request to upstream failed: {e}"
                    )));
                    return;
                }
            };

            let status = response.status();
            if !status.is_success() {
                yield Err(read_error_body(status.as_u16(), response).await);
                return;
            }

            let mut events = Box::pin(decode::decode_events(response.bytes_stream(), framing));
            while let Some(item) = events.next().await {
                yield item;
            }
        }
    }

    /// Send a non-streaming chat call and return the parsed response
    pub async fn fetch_once(
        &self,
        url: &str,
        api_key: &str,
        body: &Value,
    ) -> Result<Value, UpstreamError> {
        tracing::debug!(%url, "sending non-streaming upstream call");

        let response = self
            .http
            .post(url)
            .bearer_auth(api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| UpstreamError::transport(format!("request to upstream failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(read_error_body(status.as_u16(), response).await);
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| UpstreamError::transport(format!("invalid upstream response body: {e}")))
    }
}

/// Drain a failed response's body into an [`UpstreamError`]
async fn read_error_body(status: u16, response: reqwest::Response) -> UpstreamError {
    let text = response.text().await.unwrap_or_default();
    tracing::warn!(
        status,
        body = truncate_utf8_safe(&text, MAX_LOGGED_BODY_BYTES),
        "upstream rejected the call"
    );

    let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
    UpstreamError::new(status, body)
}
