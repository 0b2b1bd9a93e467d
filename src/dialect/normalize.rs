//! Event normalization - projects raw provider events into a common view
//!
//! The relay never materializes a parallel event model; it peeks at each raw
//! event once to answer three questions: did the stream just start (and with
//! which generation id), is there content, and is this the terminal event?
//! The answers live in a [`NormalizedEvent`] that borrows from the raw JSON
//! and is dropped before the event is framed.

use serde_json::Value;

use super::Dialect;

/// What kind of event this is, from the relay's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// First event of a stream, carrying the generation id
    StreamStart,
    /// Incremental content
    ContentDelta,
    /// Terminal event with a non-null finish reason
    Finish,
    /// Anything the relay has no opinion about (relayed untouched)
    Unknown,
}

/// One provider event, projected through the dialect's rules
///
/// Lives for a single iteration step; all fields borrow from the raw event.
#[derive(Debug)]
pub struct NormalizedEvent<'a> {
    pub kind: EventKind,
    pub generation_id: Option<&'a str>,
    pub text: Option<&'a str>,
    pub finish_reason: Option<&'a str>,
}

impl NormalizedEvent<'_> {
    /// True iff this is a terminal event carrying a non-null finish reason
    pub fn is_finished(&self) -> bool {
        matches!(self.kind, EventKind::Finish)
    }

    fn unknown() -> Self {
        NormalizedEvent {
            kind: EventKind::Unknown,
            generation_id: None,
            text: None,
            finish_reason: None,
        }
    }
}

/// Project a raw provider event through the dialect-specific rules
pub fn normalize(dialect: Dialect, raw: &Value) -> NormalizedEvent<'_> {
    match dialect {
        Dialect::NativeV1 => normalize_v1(raw),
        Dialect::NativeV2 => normalize_v2(raw),
        Dialect::OpenAiCompat => normalize_openai(raw),
    }
}

/// native_v1 events are flat: `event_type` discriminates, ids ride on
/// `stream-start`, text on `text-generation`, the reason on `stream-end`.
fn normalize_v1(raw: &Value) -> NormalizedEvent<'_> {
    match raw.get("event_type").and_then(Value::as_str) {
        Some("stream-start") => NormalizedEvent {
            kind: EventKind::StreamStart,
            generation_id: raw.get("generation_id").and_then(Value::as_str),
            text: None,
            finish_reason: None,
        },
        Some("text-generation") => NormalizedEvent {
            kind: EventKind::ContentDelta,
            generation_id: None,
            text: raw.get("text").and_then(Value::as_str),
            finish_reason: None,
        },
        Some("stream-end") => match raw.get("finish_reason").and_then(Value::as_str) {
            Some(reason) => NormalizedEvent {
                kind: EventKind::Finish,
                generation_id: None,
                text: None,
                finish_reason: Some(reason),
            },
            // A stream-end without a reason is not something we can act on
            None => NormalizedEvent::unknown(),
        },
        _ => NormalizedEvent::unknown(),
    }
}

/// native_v2 nests content under `delta.message.content.text`; the id rides
/// on `message-start`, the reason on `message-end` under `delta`.
fn normalize_v2(raw: &Value) -> NormalizedEvent<'_> {
    match raw.get("type").and_then(Value::as_str) {
        Some("message-start") => NormalizedEvent {
            kind: EventKind::StreamStart,
            generation_id: raw.get("id").and_then(Value::as_str),
            text: None,
            finish_reason: None,
        },
        Some("content-delta") => NormalizedEvent {
            kind: EventKind::ContentDelta,
            generation_id: None,
            text: raw
                .get("delta")
                .and_then(|d| d.get("message"))
                .and_then(|m| m.get("content"))
                .and_then(|c| c.get("text"))
                .and_then(Value::as_str),
            finish_reason: None,
        },
        Some("message-end") => {
            match raw
                .get("delta")
                .and_then(|d| d.get("finished_reason"))
                .and_then(Value::as_str)
            {
                Some(reason) => NormalizedEvent {
                    kind: EventKind::Finish,
                    generation_id: None,
                    text: None,
                    finish_reason: Some(reason),
                },
                None => NormalizedEvent::unknown(),
            }
        }
        _ => NormalizedEvent::unknown(),
    }
}

/// OpenAI-compatible chunks carry a top-level `id` on every chunk (only the
/// first observation matters) and signal the end with a non-null
/// `finish_reason` on the first choice.
fn normalize_openai(raw: &Value) -> NormalizedEvent<'_> {
    let generation_id = raw.get("id").and_then(Value::as_str);
    let choice = raw
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|c| c.first());
    let finish_reason = choice
        .and_then(|c| c.get("finish_reason"))
        .and_then(Value::as_str);
    let text = choice
        .and_then(|c| c.get("delta"))
        .and_then(|d| d.get("content"))
        .and_then(Value::as_str);

    NormalizedEvent {
        kind: if finish_reason.is_some() {
            EventKind::Finish
        } else {
            EventKind::ContentDelta
        },
        generation_id,
        text,
        finish_reason,
    }
}
