//! Configuration tests
//!
//! These tests serve as compile-time guards to ensure all config fields are
//! properly serialized. When you add a new field, they fail until the TOML
//! template and deserialization layer agree again.

use super::*;
use crate::relay::MidStreamPolicy;

// ─────────────────────────────────────────────────────────────────────────────
// Round-trip tests
// ─────────────────────────────────────────────────────────────────────────────

/// Verify that the serialized config template parses back.
#[test]
fn test_config_roundtrip_default() {
    let config = Config::default();
    let toml_str = config.to_toml();

    let parsed: Result<FileConfig, _> = toml::from_str(&toml_str);
    assert!(
        parsed.is_ok(),
        "Default config should round-trip.\nTOML:\n{}\nError: {:?}",
        toml_str,
        parsed.err()
    );
}

/// Every value written by to_toml must survive the file layer unchanged.
#[test]
fn test_config_roundtrip_preserves_values() {
    let mut config = Config::default();
    config.precheck_api_key = true;
    config.raise_4xx_when_blocked = false;
    config.mid_stream_failure = MidStreamPolicy::Raise;
    config.filler_notice = "stand by".to_string();
    config.coerce_citation_quality = true;
    config.logging.level = "debug".to_string();
    config.logging.file_enabled = true;
    config.logging.file_rotation = LogRotation::Hourly;

    let parsed: FileConfig = toml::from_str(&config.to_toml()).unwrap();

    assert_eq!(parsed.precheck_api_key, Some(true));
    assert_eq!(parsed.raise_4xx_when_blocked, Some(false));

    let relay = parsed.relay.unwrap();
    assert_eq!(relay.mid_stream_failure.as_deref(), Some("raise"));
    assert_eq!(relay.filler_notice.as_deref(), Some("stand by"));

    let request = parsed.request.unwrap();
    assert_eq!(request.coerce_citation_quality, Some(true));

    let logging = parsed.logging.unwrap();
    assert_eq!(logging.level.as_deref(), Some("debug"));
    assert_eq!(logging.file_enabled, Some(true));
    assert_eq!(logging.file_rotation.as_deref(), Some("hourly"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Section loading
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_logging_config_from_missing_section_uses_defaults() {
    let logging = LoggingConfig::from_file(None);

    assert_eq!(logging.level, "info");
    assert!(!logging.file_enabled);
    assert_eq!(logging.file_rotation, LogRotation::Daily);
}

#[test]
fn test_logging_config_partial_section_keeps_other_defaults() {
    let file = FileLogging {
        level: Some("trace".to_string()),
        ..Default::default()
    };
    let logging = LoggingConfig::from_file(Some(file));

    assert_eq!(logging.level, "trace");
    assert!(!logging.file_enabled);
    assert_eq!(logging.file_prefix, "parley");
}

#[test]
fn test_log_rotation_parsing() {
    assert_eq!(LogRotation::from_str("hourly"), LogRotation::Hourly);
    assert_eq!(LogRotation::from_str("DAILY"), LogRotation::Daily);
    assert_eq!(LogRotation::from_str("never"), LogRotation::Never);
    assert_eq!(LogRotation::from_str("sometimes"), LogRotation::Daily);
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_normalize_url_trims_trailing_slashes() {
    assert_eq!(normalize_url("https://api.example.com/"), "https://api.example.com");
    assert_eq!(normalize_url("https://api.example.com"), "https://api.example.com");
    assert_eq!(
        normalize_url("https://api.example.com/v1//"),
        "https://api.example.com/v1"
    );
}

#[test]
fn test_default_urls_have_no_trailing_slash() {
    let config = Config::default();
    assert!(!config.api_url.ends_with('/'));
    assert!(!config.openai_api_url.ends_with('/'));
}
