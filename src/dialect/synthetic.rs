//! Synthetic chunk builder - fabricated events for streams the provider
//! never finished (or never started)
//!
//! Two situations force parley to invent events:
//!
//! 1. A streaming client's upstream call failed before any stream opened.
//!    The client has committed to parsing a stream, so it gets a complete
//!    one-shot pseudo-stream ([`error_stream`]) carrying the error message
//!    as ordinary content and a terminal event with finish reason `ERROR`.
//!
//! 2. The provider failed (or finished prematurely) after frames were
//!    already on the wire. The open stream gets a single fabricated event —
//!    a content chunk ([`content_chunk`]) spliced ahead of a premature
//!    finish, or one terminal frame ([`error_close`]) ending the stream
//!    cleanly.
//!
//! Every fabricated event is shaped exactly like the real thing for its
//! dialect, so client-side parsers cannot tell the difference.

use serde_json::{json, Value};

use super::Dialect;

/// Finish reason stamped on synthetic terminal events
pub const ERROR_FINISH_REASON: &str = "ERROR";

/// Model name used when the upstream never told us one
const UNKNOWN_MODEL: &str = "unknown";

/// Build a provider-shaped content-delta event carrying `text`.
///
/// The chunk sits at index 0 with a null finish reason, indistinguishable
/// from a normal mid-stream delta.
pub fn content_chunk(dialect: Dialect, generation_id: &str, text: &str) -> Value {
    match dialect {
        Dialect::NativeV1 => json!({
            "event_type": "text-generation",
            "text": text,
            "is_finished": false,
        }),
        Dialect::NativeV2 => json!({
            "type": "content-delta",
            "index": 0,
            "delta": {
                "message": {
                    "content": {
                        "type": "text",
                        "text": text,
                    },
                },
            },
        }),
        Dialect::OpenAiCompat => json!({
            "id": generation_id,
            "object": "chat.completion.chunk",
            "created": chrono::Utc::now().timestamp(),
            "model": UNKNOWN_MODEL,
            "choices": [{
                "index": 0,
                "delta": {"content": text},
                "finish_reason": null,
            }],
        }),
    }
}

/// Build the single terminal frame that closes an already-open stream after
/// a mid-stream provider failure.
///
/// Carries the provider's message as text and finish reason `ERROR`, so the
/// client sees a well-formed end of stream instead of a dropped connection.
pub fn error_close(dialect: Dialect, generation_id: &str, message: &str) -> Value {
    match dialect {
        Dialect::NativeV1 => json!({
            "event_type": "stream-end",
            "finish_reason": ERROR_FINISH_REASON,
            "generation_id": generation_id,
            "response": {
                "text": message,
                "finish_reason": ERROR_FINISH_REASON,
            },
            "is_finished": true,
        }),
        Dialect::NativeV2 => json!({
            "type": "message-end",
            "delta": {
                "finished_reason": ERROR_FINISH_REASON,
                "error": {"message": message},
            },
        }),
        Dialect::OpenAiCompat => json!({
            "id": generation_id,
            "object": "chat.completion.chunk",
            "created": chrono::Utc::now().timestamp(),
            "model": UNKNOWN_MODEL,
            "choices": [{
                "index": 0,
                "delta": {"content": message},
                "finish_reason": ERROR_FINISH_REASON,
            }],
        }),
    }
}

/// Build a complete one-shot pseudo-stream for a streaming client whose
/// upstream call failed before any stream opened.
///
/// Returns framed wire strings: start framing, one content chunk carrying
/// `message`, and a terminal event with finish reason `ERROR`. When
/// `generation_id` is `None` a fresh one is fabricated.
pub fn error_stream(dialect: Dialect, generation_id: Option<&str>, message: &str) -> Vec<String> {
    let fabricated;
    let generation_id = match generation_id {
        Some(id) => id,
        None => {
            fabricated = crate::relay::fresh_generation_id();
            &fabricated
        }
    };

    match dialect {
        Dialect::NativeV1 => v1_pseudo_stream(generation_id, message),
        Dialect::NativeV2 => v2_pseudo_stream(generation_id, message),
        Dialect::OpenAiCompat => openai_pseudo_stream(generation_id, message),
    }
}

fn v1_pseudo_stream(generation_id: &str, message: &str) -> Vec<String> {
    let dialect = Dialect::NativeV1;
    vec![
        dialect.frame(&json!({
            "event_type": "stream-start",
            "generation_id": generation_id,
            "is_finished": false,
        })),
        dialect.frame(&content_chunk(dialect, generation_id, message)),
        dialect.frame(&json!({
            "event_type": "stream-end",
            "finish_reason": ERROR_FINISH_REASON,
            "generation_id": generation_id,
            "response": {
                "text": message,
                "finish_reason": ERROR_FINISH_REASON,
            },
            "is_finished": true,
        })),
    ]
}

fn v2_pseudo_stream(generation_id: &str, message: &str) -> Vec<String> {
    let dialect = Dialect::NativeV2;
    let output_words = message.split_whitespace().count();
    vec![
        dialect.frame(&json!({
            "type": "message-start",
            "id": generation_id,
            "delta": {
                "message": {
                    "role": "assistant",
                    "content": [],
                    "tool_plan": "",
                    "tool_calls": [],
                    "citations": [],
                },
            },
        })),
        dialect.frame(&json!({
            "type": "content-start",
            "index": 0,
            "delta": {
                "message": {
                    "content": {"type": "text", "text": ""},
                },
            },
        })),
        dialect.frame(&content_chunk(dialect, generation_id, message)),
        dialect.frame(&json!({
            "type": "content-end",
            "index": 0,
        })),
        dialect.frame(&json!({
            "type": "message-end",
            "delta": {
                "finished_reason": ERROR_FINISH_REASON,
                "usage": {
                    "billed_units": {"input_tokens": 0, "output_tokens": output_words},
                    "tokens": {"input_tokens": 0, "output_tokens": output_words},
                },
            },
        })),
    ]
}

fn openai_pseudo_stream(generation_id: &str, message: &str) -> Vec<String> {
    let dialect = Dialect::OpenAiCompat;
    let created = chrono::Utc::now().timestamp();
    let mut frames = vec![
        dialect.frame(&json!({
            "id": generation_id,
            "object": "chat.completion.chunk",
            "created": created,
            "model": UNKNOWN_MODEL,
            "choices": [{
                "index": 0,
                "delta": {"role": "assistant"},
                "finish_reason": null,
            }],
        })),
        dialect.frame(&content_chunk(dialect, generation_id, message)),
        dialect.frame(&json!({
            "id": generation_id,
            "object": "chat.completion.chunk",
            "created": created,
            "model": UNKNOWN_MODEL,
            "choices": [{
                "index": 0,
                "delta": {},
                "finish_reason": ERROR_FINISH_REASON,
            }],
        })),
    ];
    if let Some(done) = dialect.stream_terminator() {
        frames.push(done.to_string());
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_payload(frame: &str) -> Value {
        let data = frame
            .lines()
            .find_map(|l| l.strip_prefix("data: "))
            .expect("frame has a data line");
        serde_json::from_str(data).unwrap()
    }

    #[test]
    fn test_content_chunk_v1_shape() {
        let chunk = content_chunk(Dialect::NativeV1, "g1", "hello");

        assert_eq!(chunk["event_type"], "text-generation");
        assert_eq!(chunk["text"], "hello");
        assert_eq!(chunk["is_finished"], false);
    }

    #[test]
    fn test_content_chunk_v2_nests_text() {
        let chunk = content_chunk(Dialect::NativeV2, "g1", "hello");

        assert_eq!(chunk["type"], "content-delta");
        assert_eq!(chunk["index"], 0);
        assert_eq!(chunk["delta"]["message"]["content"]["text"], "hello");
    }

    #[test]
    fn test_content_chunk_openai_null_finish() {
        let chunk = content_chunk(Dialect::OpenAiCompat, "gen-1", "hello");

        assert_eq!(chunk["id"], "gen-1");
        assert_eq!(chunk["object"], "chat.completion.chunk");
        assert_eq!(chunk["choices"][0]["index"], 0);
        assert_eq!(chunk["choices"][0]["delta"]["content"], "hello");
        assert!(chunk["choices"][0]["finish_reason"].is_null());
    }

    #[test]
    fn test_error_close_carries_message_and_error_reason() {
        let v1 = error_close(Dialect::NativeV1, "g1", "boom");
        assert_eq!(v1["event_type"], "stream-end");
        assert_eq!(v1["finish_reason"], "ERROR");
        assert_eq!(v1["response"]["text"], "boom");

        let v2 = error_close(Dialect::NativeV2, "g1", "boom");
        assert_eq!(v2["type"], "message-end");
        assert_eq!(v2["delta"]["finished_reason"], "ERROR");
        assert_eq!(v2["delta"]["error"]["message"], "boom");

        let oai = error_close(Dialect::OpenAiCompat, "g1", "boom");
        assert_eq!(oai["choices"][0]["finish_reason"], "ERROR");
        assert_eq!(oai["choices"][0]["delta"]["content"], "boom");
    }

    #[test]
    fn test_v1_error_stream_is_three_json_lines() {
        let frames = error_stream(Dialect::NativeV1, Some("g1"), "blocked output");

        assert_eq!(frames.len(), 3);
        for frame in &frames {
            assert!(frame.ends_with('\n'));
            let parsed: Value = serde_json::from_str(frame.trim_end()).unwrap();
            assert!(parsed.is_object());
        }

        let start: Value = serde_json::from_str(frames[0].trim_end()).unwrap();
        assert_eq!(start["event_type"], "stream-start");
        assert_eq!(start["generation_id"], "g1");

        let end: Value = serde_json::from_str(frames[2].trim_end()).unwrap();
        assert_eq!(end["finish_reason"], "ERROR");
        assert_eq!(end["response"]["text"], "blocked output");
    }

    #[test]
    fn test_v2_error_stream_brackets_the_message() {
        let frames = error_stream(Dialect::NativeV2, Some("g1"), "blocked output");

        assert_eq!(frames.len(), 5);
        assert!(frames[0].starts_with("event: message-start\n"));
        assert!(frames[1].starts_with("event: content-start\n"));
        assert!(frames[2].starts_with("event: content-delta\n"));
        assert!(frames[3].starts_with("event: content-end\n"));
        assert!(frames[4].starts_with("event: message-end\n"));

        let delta = data_payload(&frames[2]);
        assert_eq!(delta["delta"]["message"]["content"]["text"], "blocked output");

        let end = data_payload(&frames[4]);
        assert_eq!(end["delta"]["finished_reason"], "ERROR");
        assert_eq!(end["delta"]["usage"]["tokens"]["output_tokens"], 2);
    }

    #[test]
    fn test_openai_error_stream_ends_with_done() {
        let frames = error_stream(Dialect::OpenAiCompat, None, "blocked output");

        assert_eq!(frames.len(), 4);
        assert_eq!(frames[3], "data: [DONE]\n\n");

        // Fabricated generation id is carried on every chunk
        let role = data_payload(&frames[0]);
        let content = data_payload(&frames[1]);
        let finish = data_payload(&frames[2]);
        assert_eq!(role["id"], content["id"]);
        assert_eq!(content["id"], finish["id"]);
        assert_eq!(role["choices"][0]["delta"]["role"], "assistant");
        assert_eq!(content["choices"][0]["delta"]["content"], "blocked output");
        assert_eq!(finish["choices"][0]["finish_reason"], "ERROR");
    }
}
