//! Wire dialect module - client-facing chat stream formats
//!
//! Parley speaks three fixed dialects. Each dialect pins down three things:
//! how a provider event is framed on the wire, where the generation id hides,
//! and what a terminal event looks like.
//!
//! ```text
//! native_v1       one JSON document per line         {"event_type": ...}\n
//! native_v2       SSE with an explicit event: line   event: <type>\ndata: {...}\n\n
//! openai_compat   SSE with data: lines only          data: {...}\n\n
//! ```
//!
//! The dialect set is closed: all per-dialect behavior is selected by `match`
//! on [`Dialect`], never by runtime type lookup.

mod normalize;
pub mod synthetic;

pub use normalize::{normalize, EventKind, NormalizedEvent};

use serde_json::Value;

// ============================================================================
// Dialect
// ============================================================================

/// Supported client-facing wire dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// First-generation native chat protocol (`/v1/chat`, JSON lines)
    NativeV1,
    /// Second-generation native chat protocol (`/v2/chat`, SSE)
    NativeV2,
    /// OpenAI Chat Completions dialect (`/v1/chat/completions`, SSE)
    OpenAiCompat,
}

/// How the upstream response body is framed on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFraming {
    /// Newline-delimited JSON documents
    JsonLines,
    /// Server-Sent Events (`data:` payloads, optional `event:` lines)
    Sse,
}

impl Dialect {
    /// Human-readable name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::NativeV1 => "native-v1",
            Dialect::NativeV2 => "native-v2",
            Dialect::OpenAiCompat => "openai-compat",
        }
    }

    /// Get the canonical endpoint path for this dialect
    pub fn endpoint_path(&self) -> &'static str {
        match self {
            Dialect::NativeV1 => "/v1/chat",
            Dialect::NativeV2 => "/v2/chat",
            Dialect::OpenAiCompat => "/v1/chat/completions",
        }
    }

    /// Content-Type for a streaming response in this dialect
    pub fn media_type(&self) -> &'static str {
        match self {
            Dialect::NativeV1 => "application/json",
            Dialect::NativeV2 | Dialect::OpenAiCompat => "text/event-stream",
        }
    }

    /// How the upstream provider frames its stream for this dialect
    pub fn framing(&self) -> WireFraming {
        match self {
            Dialect::NativeV1 => WireFraming::JsonLines,
            Dialect::NativeV2 | Dialect::OpenAiCompat => WireFraming::Sse,
        }
    }

    /// Whether the dispatcher may splice a recovery chunk ahead of a
    /// premature terminal event.
    ///
    /// Only the OpenAI-compatible adapter needs this: its clients reject
    /// streams that finish without ever producing content.
    pub fn splices_recovery_text(&self) -> bool {
        matches!(self, Dialect::OpenAiCompat)
    }

    /// Explicit end-of-stream marker, if the dialect has one
    pub fn stream_terminator(&self) -> Option<&'static str> {
        match self {
            Dialect::OpenAiCompat => Some("data: [DONE]\n\n"),
            Dialect::NativeV1 | Dialect::NativeV2 => None,
        }
    }

    /// Frame one provider event as the exact wire string for this dialect.
    ///
    /// Pure and total over well-formed events. A `native_v2` event without a
    /// string `type` field is a dialect-mapping bug, not upstream weather:
    /// it panics rather than producing an unframeable event.
    pub fn frame(&self, event: &Value) -> String {
        match self {
            Dialect::NativeV1 => format!("{}\n", event),
            Dialect::NativeV2 => {
                let Some(kind) = event.get("type").and_then(Value::as_str) else {
                    panic!("native-v2 frame requires a string `type` field, got: {event}");
                };
                format!("event: {}\ndata: {}\n\n", kind, event)
            }
            Dialect::OpenAiCompat => format!("data: {}\n\n", event),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
