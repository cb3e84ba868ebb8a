use std::time::Duration;

use serde::Serialize;
use url::Url;

use crate::error::{Error, Result};

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://youtubetranscript.dev/api";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Process-scoped client configuration. Read-only after client
/// construction; concurrent operations share it without locking.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API key, sent as a bearer token
    pub api_key: String,

    /// Base URL of the API, without trailing slash
    pub base_url: String,

    /// Per-request timeout applied by the transport
    pub timeout: Duration,

    /// Retry and backoff policy
    pub retry: RetryPolicy,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    /// Validate and normalize the configuration once, at the call boundary.
    pub(crate) fn validate(mut self) -> Result<Self> {
        self.api_key = self.api_key.trim().to_string();
        if self.api_key.len() < 8 {
            return Err(Error::validation(
                "invalid API key; get yours at https://youtubetranscript.dev/dashboard",
            ));
        }

        let parsed = Url::parse(&self.base_url)
            .map_err(|_| Error::validation(format!("invalid base URL: {}", self.base_url)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::validation("base URL must use HTTP or HTTPS"));
        }
        self.base_url = self.base_url.trim_end_matches('/').to_string();

        Ok(self)
    }
}

/// Retry and backoff policy for the transport.
///
/// Retryable failures (network errors, timeouts, 5xx, 429) are re-attempted
/// up to `max_retries` additional times with exponential backoff; a 429
/// carrying a `retry_after` hint overrides the computed delay exactly.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Additional attempts after the first (total requests = max_retries + 1)
    pub max_retries: u32,

    /// First backoff delay; doubles each attempt
    pub base_delay: Duration,

    /// Upper bound on any single backoff delay
    pub max_delay: Duration,

    /// Delay assumed for a 429 that carries no `retry_after`
    pub rate_limit_fallback: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            rate_limit_fallback: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Backoff before re-attempt number `attempt` (0-based): exponential,
    /// capped at `max_delay`, with deterministic jitter seeded from the
    /// attempt index so the schedule is reproducible.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let doubled = self
            .base_delay
            .saturating_mul(1u32.checked_shl(attempt.min(16)).unwrap_or(u32::MAX));
        let capped = doubled.min(self.max_delay);
        capped.mul_f64(jitter_factor(attempt))
    }
}

/// Jitter factor in [0.5, 1.0), derived from the attempt index via a
/// splitmix-style hash.
fn jitter_factor(attempt: u32) -> f64 {
    let mut x = (attempt as u64).wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^= x >> 31;
    0.5 + (x >> 11) as f64 / (1u64 << 53) as f64 * 0.5
}

/// Where the captions come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionSource {
    /// Let the server pick (default)
    Auto,
    /// Only human-uploaded captions
    Manual,
    /// Speech recognition
    Asr,
}

impl CaptionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptionSource::Auto => "auto",
            CaptionSource::Manual => "manual",
            CaptionSource::Asr => "asr",
        }
    }
}

/// Format options forwarded to the transcribe endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FormatOptions {
    pub timestamp: bool,
    pub paragraphs: bool,
    pub words: bool,
}

/// Options for [`Client::transcribe`](crate::Client::transcribe).
/// All fields optional; the server defaults apply when omitted.
#[derive(Debug, Clone, Default)]
pub struct TranscribeOptions {
    /// ISO 639-1 target language (omit for the original language)
    pub language: Option<String>,
    pub source: Option<CaptionSource>,
    pub format: Option<FormatOptions>,
}

/// Options for [`Client::transcribe_asr`](crate::Client::transcribe_asr).
#[derive(Debug, Clone, Default)]
pub struct AsrOptions {
    pub language: Option<String>,
    /// URL to receive the result when the job finishes
    pub webhook_url: Option<String>,
}

/// Options for [`Client::list_transcripts`](crate::Client::list_transcripts).
#[derive(Debug, Clone)]
pub struct ListOptions {
    /// Search by video id, title, or transcript text
    pub search: Option<String>,
    pub language: Option<String>,
    /// "all", "queued", "processing", "succeeded", or "failed"
    pub status: Option<String>,
    pub limit: u32,
    pub page: u32,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            search: None,
            language: None,
            status: None,
            limit: 10,
            page: 1,
        }
    }
}

/// Options for [`Client::get_transcript`](crate::Client::get_transcript).
#[derive(Debug, Clone, Default)]
pub struct GetTranscriptOptions {
    pub language: Option<String>,
    pub source: Option<CaptionSource>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_trims_key_and_base_url() {
        let config = ClientConfig {
            base_url: "https://example.com/api/".to_string(),
            ..ClientConfig::new("  sk_live_12345678  ")
        };
        let config = config.validate().unwrap();
        assert_eq!(config.api_key, "sk_live_12345678");
        assert_eq!(config.base_url, "https://example.com/api");
    }

    #[test]
    fn validate_rejects_short_key() {
        let err = ClientConfig::new("short").validate().unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        for bad in ["not a url", "ftp://example.com"] {
            let config = ClientConfig {
                base_url: bad.to_string(),
                ..ClientConfig::new("sk_live_12345678")
            };
            assert!(matches!(config.validate(), Err(Error::Validation { .. })));
        }
    }

    #[test]
    fn backoff_grows_exponentially_within_bounds() {
        let policy = RetryPolicy::default();
        for attempt in 0..6 {
            let delay = policy.backoff_delay(attempt);
            let ceiling = policy
                .base_delay
                .saturating_mul(1 << attempt)
                .min(policy.max_delay);
            assert!(delay <= ceiling, "attempt {attempt}: {delay:?} > {ceiling:?}");
            assert!(
                delay >= ceiling.mul_f64(0.5),
                "attempt {attempt}: {delay:?} below jitter floor"
            );
        }
    }

    #[test]
    fn backoff_is_deterministic_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(2), policy.backoff_delay(2));
    }

    #[test]
    fn backoff_is_capped() {
        let policy = RetryPolicy::default();
        assert!(policy.backoff_delay(30) <= policy.max_delay);
    }
}
