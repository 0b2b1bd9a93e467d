//! Gateway state shared across request handlers

use anyhow::Result;

use crate::config::Config;
use crate::relay::MidStreamPolicy;
use crate::upstream::UpstreamClient;

/// Shared state for the gateway server
///
/// Cloned per request by axum; everything here is either a handle
/// (the reqwest client) or an immutable config snapshot. Per-stream
/// mutable state lives in the dispatcher, never here.
#[derive(Clone)]
pub struct GatewayState {
    /// HTTP client for upstream calls
    pub upstream: UpstreamClient,
    /// Native provider base URL (no trailing slash)
    pub api_url: String,
    /// OpenAI-compatible upstream base URL (no trailing slash, includes /v1)
    pub openai_api_url: String,
    /// Reject requests without credentials before calling upstream
    pub precheck_api_key: bool,
    /// Answer content-filter blocks with HTTP 400 instead of a pseudo-stream
    pub raise_4xx_when_blocked: bool,
    /// What to do when the provider fails after the first relayed frame
    pub mid_stream: MidStreamPolicy,
    /// Text spliced ahead of a premature terminal event
    pub filler_notice: String,
    /// Rewrite v1 `citation_quality: accurate` to `fast`
    pub coerce_citation_quality: bool,
    /// Log incoming chat messages at debug level
    pub log_incoming: bool,
}

impl GatewayState {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            upstream: UpstreamClient::new()?,
            api_url: config.api_url.clone(),
            openai_api_url: config.openai_api_url.clone(),
            precheck_api_key: config.precheck_api_key,
            raise_4xx_when_blocked: config.raise_4xx_when_blocked,
            mid_stream: config.mid_stream_failure,
            filler_notice: config.filler_notice.clone(),
            coerce_citation_quality: config.coerce_citation_quality,
            log_incoming: config.log_incoming,
        })
    }
}
