//! Config serialization to TOML
//!
//! Single source of truth for config file format.

use super::Config;

impl Config {
    /// Serialize the full config as a commented TOML template.
    ///
    /// Used both for generating a fresh config file and for `config --reset`
    /// / `config --update`, so the template always reflects current values.
    pub fn to_toml(&self) -> String {
        format!(
            r#"# parley configuration
# Precedence: environment variables > this file > built-in defaults

# Address the gateway listens on (env: PARLEY_BIND)
bind_addr = "{bind_addr}"

# Native provider base URL (env: PARLEY_API_URL)
api_url = "{api_url}"

# OpenAI-compatible upstream base URL, including /v1 (env: PARLEY_OPENAI_URL)
openai_api_url = "{openai_api_url}"

# Reject requests without credentials before calling upstream
# (env: PARLEY_PRECHECK_API_KEY)
precheck_api_key = {precheck_api_key}

# Content-filter blocks on streaming requests:
#   true  = answer with HTTP 400
#   false = answer with a well-formed synthetic error stream
# (env: PARLEY_RAISE_4XX_WHEN_BLOCKED)
raise_4xx_when_blocked = {raise_4xx_when_blocked}

[relay]
# Provider failure after the first relayed frame:
#   "synthesize" = close the stream with a terminal error frame (default)
#   "raise"      = abort the response body
# (env: PARLEY_MID_STREAM_FAILURE)
mid_stream_failure = "{mid_stream_failure}"

# Text spliced ahead of a premature terminal event
filler_notice = "{filler_notice}"

[request]
# Rewrite v1 citation_quality "accurate" (or absent) to "fast"
coerce_citation_quality = {coerce_citation_quality}

# Log incoming chat messages at debug level (env: PARLEY_LOG_INCOMING)
log_incoming = {log_incoming}

[logging]
# Log level: trace, debug, info, warn, error (RUST_LOG overrides)
level = "{level}"

# Write JSON logs to rotating files in addition to stdout
file_enabled = {file_enabled}
file_dir = "{file_dir}"
# Rotation: "hourly", "daily", "never"
file_rotation = "{file_rotation}"
file_prefix = "{file_prefix}"
"#,
            bind_addr = self.bind_addr,
            api_url = self.api_url,
            openai_api_url = self.openai_api_url,
            precheck_api_key = self.precheck_api_key,
            raise_4xx_when_blocked = self.raise_4xx_when_blocked,
            mid_stream_failure = self.mid_stream_failure.as_str(),
            filler_notice = self.filler_notice,
            coerce_citation_quality = self.coerce_citation_quality,
            log_incoming = self.log_incoming,
            level = self.logging.level,
            file_enabled = self.logging.file_enabled,
            file_dir = self.logging.file_dir.display(),
            file_rotation = self.logging.file_rotation.as_str(),
            file_prefix = self.logging.file_prefix,
        )
    }
}
