//! Streaming dispatcher - turns a raw provider event sequence into an
//! outbound wire stream, or into an HTTP-mappable error
//!
//! One dispatcher run owns one outbound response. Its state machine:
//!
//! ```text
//! NOT_STARTED ──first pull ok──▶ STREAMING ──exhausted──▶ COMPLETED
//!      │                            │
//!      │ first pull err             │ upstream err
//!      ▼                            ▼
//! FAILED_EARLY                  FAILED_MID
//! (plain error,                 (resolved in-band per policy,
//!  zero bytes sent)              never an HTTP error)
//! ```
//!
//! Every relayed event passes through normalize (generation-id capture,
//! finish detection) and then the dialect's framer. The dispatcher never
//! reorders or drops events; synthetic events are strictly additive and
//! precede the event that triggered them.

use std::pin::Pin;

use async_stream::stream;
use futures::stream::BoxStream;
use futures::{stream as futures_stream, Stream, StreamExt};
use serde_json::Value;

use crate::dialect::{normalize, synthetic, Dialect};
use crate::upstream::UpstreamError;

use super::fresh_generation_id;
use super::gate::{self, FirstPull};

// ============================================================================
// Mid-stream failure policy
// ============================================================================

/// What to do when the provider fails after frames are already on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MidStreamPolicy {
    /// Synthesize one terminal frame carrying the provider's message with
    /// finish reason `ERROR`, then end the stream cleanly (default: SSE and
    /// JSON-lines parsers have already committed to stream mode)
    #[default]
    SynthesizeAndClose,
    /// Forward the error into the body stream, aborting the response
    /// (uniform error signaling at the cost of a framing violation)
    Raise,
}

impl MidStreamPolicy {
    /// Parse policy string from config
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "raise" => Self::Raise,
            "synthesize" => Self::SynthesizeAndClose,
            _ => Self::SynthesizeAndClose, // Default for unknown values
        }
    }

    /// Convert to string for TOML serialization
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SynthesizeAndClose => "synthesize",
            Self::Raise => "raise",
        }
    }
}

// ============================================================================
// Stream State
// ============================================================================

/// Mutable per-stream state, owned by exactly one dispatcher run
#[derive(Debug, Default)]
pub struct StreamState {
    generation_id: Option<String>,
    finished: bool,
}

impl StreamState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a generation id observation.
    ///
    /// Only the first non-null observation sticks; the id transitions from
    /// unknown to known at most once per stream.
    pub fn observe(&mut self, id: Option<&str>) {
        if self.generation_id.is_none() {
            if let Some(id) = id {
                self.generation_id = Some(id.to_string());
            }
        }
    }

    pub fn generation_id(&self) -> Option<&str> {
        self.generation_id.as_deref()
    }

    pub fn mark_finished(&mut self) {
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The id to stamp on synthetic events: the observed one, or a fresh
    /// fabrication while the real id is still unknown.
    fn synthetic_id(&self) -> String {
        self.generation_id
            .clone()
            .unwrap_or_else(fresh_generation_id)
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Streaming dispatcher for one outbound response
pub struct Dispatcher {
    dialect: Dialect,
    policy: MidStreamPolicy,
    filler_notice: String,
}

impl Dispatcher {
    pub fn new(dialect: Dialect, policy: MidStreamPolicy, filler_notice: impl Into<String>) -> Self {
        Self {
            dialect,
            policy,
            filler_notice: filler_notice.into(),
        }
    }

    /// Pull the first upstream event and commit to an outcome.
    ///
    /// A failed first pull comes back as a plain [`UpstreamError`] - zero
    /// body bytes have been produced, so the caller can still answer with a
    /// normal HTTP error. A successful first pull returns the live outbound
    /// stream of framed wire strings.
    pub async fn dispatch<S>(
        self,
        upstream: S,
    ) -> Result<BoxStream<'static, Result<String, UpstreamError>>, UpstreamError>
    where
        S: Stream<Item = Result<Value, UpstreamError>> + Send + 'static,
    {
        match gate::split_first(upstream).await {
            FirstPull::Err(err) => {
                tracing::warn!(
                    dialect = %self.dialect,
                    status = err.status,
                    "upstream failed before the first event"
                );
                Err(err)
            }
            FirstPull::Empty => {
                tracing::debug!(dialect = %self.dialect, "upstream produced an empty stream");
                Ok(futures_stream::empty().boxed())
            }
            FirstPull::Ok(first, rest) => Ok(self.relay(first, rest).boxed()),
        }
    }

    /// The STREAMING phase: relay events as wire frames until the upstream
    /// exhausts or fails.
    fn relay<S>(
        self,
        first: Value,
        rest: Pin<Box<S>>,
    ) -> impl Stream<Item = Result<String, UpstreamError>> + Send
    where
        S: Stream<Item = Result<Value, UpstreamError>> + Send + 'static,
    {
        stream! {
            let mut state = StreamState::new();

            // A first event that is already terminal means the provider
            // filtered everything before a single token. Clients of the
            // splice-capable dialect get one filler chunk ahead of it so
            // the stream is never content-free. First event only.
            if self.dialect.splices_recovery_text()
                && normalize(self.dialect, &first).is_finished()
            {
                tracing::debug!(
                    dialect = %self.dialect,
                    "first upstream event is terminal, splicing filler chunk"
                );
                let filler =
                    synthetic::content_chunk(self.dialect, &state.synthetic_id(), &self.filler_notice);
                yield Ok(self.dialect.frame(&filler));
            }

            let mut source = Box::pin(futures_stream::once(async move { Ok(first) }).chain(rest));
            let mut failed = false;

            while let Some(item) = source.next().await {
                match item {
                    Ok(event) => {
                        let view = normalize(self.dialect, &event);
                        state.observe(view.generation_id);
                        if view.is_finished() {
                            state.mark_finished();
                        }
                        yield Ok(self.dialect.frame(&event));
                    }
                    Err(err) => {
                        failed = true;
                        match self.policy {
                            MidStreamPolicy::Raise => {
                                tracing::error!(
                                    dialect = %self.dialect,
                                    status = err.status,
                                    "upstream failed mid-stream, aborting response"
                                );
                                yield Err(err);
                            }
                            MidStreamPolicy::SynthesizeAndClose => {
                                tracing::warn!(
                                    dialect = %self.dialect,
                                    status = err.status,
                                    "upstream failed mid-stream, closing with synthetic error frame"
                                );
                                let close = synthetic::error_close(
                                    self.dialect,
                                    &state.synthetic_id(),
                                    &err.message(),
                                );
                                yield Ok(self.dialect.frame(&close));
                            }
                        }
                        break;
                    }
                }
            }

            if !failed {
                if !state.is_finished() {
                    tracing::debug!(
                        dialect = %self.dialect,
                        "upstream stream ended without a terminal event"
                    );
                }
                if let Some(done) = self.dialect.stream_terminator() {
                    yield Ok(done.to_string());
                }
            }
        }
    }
}
