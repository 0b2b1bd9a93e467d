//! Wire decoders - raw response bytes to provider events
//!
//! The provider frames its stream either as newline-delimited JSON (the v1
//! chat protocol) or as SSE (`data:` payloads, v2 and OpenAI-compatible).
//! TCP chunks do not respect either framing, so both decoders buffer
//! partial lines across chunk boundaries and emit one `serde_json::Value`
//! per complete payload.
//!
//! SSE `event:` lines are dropped here: the event type is repeated inside
//! every JSON payload, and the relay re-frames for the client dialect
//! anyway. The OpenAI `[DONE]` sentinel is also dropped; the dispatcher
//! re-emits it for dialects that want one.

use async_stream::stream;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::Value;

use crate::dialect::WireFraming;

use super::UpstreamError;

/// Decode a raw bytes stream into provider events
pub fn decode_events<B>(
    bytes: B,
    framing: WireFraming,
) -> impl Stream<Item = Result<Value, UpstreamError>> + Send
where
    B: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    stream! {
        let mut bytes = Box::pin(bytes);
        let mut buffer = String::new();

        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(UpstreamError::transport(format!(
                        "upstream body interrupted: {e}"
                    )));
                    return;
                }
            };

            buffer.push_str(&String::from_utf8_lossy(&chunk));

            // Process complete lines; the tail stays buffered
            while let Some(newline_pos) = buffer.find('\n') {
                let line = buffer[..newline_pos].trim().to_string();
                buffer.drain(..=newline_pos);

                if let Some(event) = decode_line(&line, framing) {
                    yield event;
                }
            }
        }

        // A final line without a trailing newline still counts
        let tail = buffer.trim().to_string();
        if let Some(event) = decode_line(&tail, framing) {
            yield event;
        }
    }
}

/// Decode one complete line, or `None` if the line carries no event
fn decode_line(line: &str, framing: WireFraming) -> Option<Result<Value, UpstreamError>> {
    if line.is_empty() {
        return None;
    }

    let payload = match framing {
        WireFraming::JsonLines => line,
        WireFraming::Sse => {
            // Only "data:" lines carry payloads; "event:", "id:", comments
            // and the [DONE] sentinel are framing noise
            let data = line.strip_prefix("data:")?.trim();
            if data.is_empty() || data == "[DONE]" {
                return None;
            }
            data
        }
    };

    match serde_json::from_str(payload) {
        Ok(event) => Some(Ok(event)),
        Err(e) => Some(Err(UpstreamError::transport(format!(
            "malformed upstream event: {e}"
        )))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn byte_chunks(parts: Vec<&str>) -> impl Stream<Item = Result<Bytes, reqwest::Error>> {
        stream::iter(
            parts
                .into_iter()
                .map(|p| Ok(Bytes::copy_from_slice(p.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    async fn collect(
        parts: Vec<&str>,
        framing: WireFraming,
    ) -> Vec<Result<Value, UpstreamError>> {
        decode_events(byte_chunks(parts), framing).collect().await
    }

    #[tokio::test]
    async fn test_ndjson_one_event_per_line() {
        let events = collect(
            vec!["{\"event_type\":\"stream-start\"}\n{\"event_type\":\"stream-end\"}\n"],
            WireFraming::JsonLines,
        )
        .await;

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].as_ref().unwrap()["event_type"], "stream-start");
        assert_eq!(events[1].as_ref().unwrap()["event_type"], "stream-end");
    }

    #[tokio::test]
    async fn test_ndjson_line_split_across_chunks() {
        let events = collect(
            vec!["{\"text\":\"Hel", "lo\"}\n"],
            WireFraming::JsonLines,
        )
        .await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap()["text"], "Hello");
    }

    #[tokio::test]
    async fn test_ndjson_final_line_without_newline_is_flushed() {
        let events = collect(vec!["{\"a\":1}\n{\"b\":2}"], WireFraming::JsonLines).await;

        assert_eq!(events.len(), 2);
        assert_eq!(events[1].as_ref().unwrap()["b"], 2);
    }

    #[tokio::test]
    async fn test_sse_skips_event_lines_and_blank_separators() {
        let events = collect(
            vec!["event: content-delta\ndata: {\"type\":\"content-delta\"}\n\n"],
            WireFraming::Sse,
        )
        .await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap()["type"], "content-delta");
    }

    #[tokio::test]
    async fn test_sse_skips_done_sentinel() {
        let events = collect(
            vec!["data: {\"id\":\"c1\"}\n\ndata: [DONE]\n\n"],
            WireFraming::Sse,
        )
        .await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap()["id"], "c1");
    }

    #[tokio::test]
    async fn test_sse_payload_split_across_chunks() {
        let events = collect(
            vec!["data: {\"id\":", "\"c1\"}\n\n"],
            WireFraming::Sse,
        )
        .await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap()["id"], "c1");
    }

    #[tokio::test]
    async fn test_malformed_payload_becomes_an_error_event() {
        let events = collect(vec!["data: {not json}\n\n"], WireFraming::Sse).await;

        assert_eq!(events.len(), 1);
        let err = events[0].as_ref().unwrap_err();
        assert_eq!(err.status, 502);
        assert!(err.message().contains("malformed upstream event"));
    }
}
