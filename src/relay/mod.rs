//! Relay module - the streaming core
//!
//! Everything between "the upstream call returned" and "bytes on the wire"
//! lives here:
//!
//! - [`gate`]: pulls the first upstream event before committing to a
//!   streaming response, so early failures can still become HTTP errors
//! - [`Dispatcher`]: relays events as framed wire strings, splices
//!   recovery chunks, and resolves mid-stream failures per policy
//! - [`translate_once`]: the non-streaming path - one reshaping pass,
//!   no state machine

pub mod gate;

mod dispatcher;

pub use dispatcher::{Dispatcher, MidStreamPolicy, StreamState};

use serde_json::Value;

/// Generate a fresh opaque generation id.
///
/// Used wherever a synthetic event needs an id before the provider has
/// supplied one. Timestamp plus process-local entropy; uniqueness per
/// process is all that is required.
pub fn fresh_generation_id() -> String {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};
    use std::time::{SystemTime, UNIX_EPOCH};

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    // RandomState gives us a random value without adding a dependency
    let random = RandomState::new().build_hasher().finish();

    format!("{:x}-{:08x}", timestamp, (random & 0xFFFF_FFFF) as u32)
}

/// Reshape a complete non-streaming provider response for the client.
///
/// Drops null-valued object members recursively; the upstream SDKs the
/// original clients were written against never see explicit nulls, and some
/// of them reject unknown-null combinations.
pub fn translate_once(response: Value) -> Value {
    match response {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, translate_once(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(translate_once).collect()),
        other => other,
    }
}
