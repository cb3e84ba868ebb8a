//! Error taxonomy for the YouTubeTranscript.dev API.
//!
//! Every failure the client can surface is one variant of [`Error`], so
//! callers can match exhaustively instead of string-sniffing messages.
//! [`map_status`] is the single place where HTTP status codes and API error
//! bodies are translated into variants.

use std::time::Duration;

use serde_json::Value;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// All errors surfaced by the client.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    /// Network-level failure (connection refused, DNS, broken transfer).
    /// Retried automatically up to the configured budget.
    #[error("network error: {message}")]
    Transport { message: String },

    /// The per-request timeout expired. Counts against the retry budget
    /// like any other retryable failure.
    #[error("request timed out")]
    Timeout,

    /// Invalid or missing API key (401/403). Never retried.
    #[error("authentication failed: {message}")]
    Authentication { message: String },

    /// Account has no credits left (402). Never retried.
    #[error("insufficient credits: {message}")]
    InsufficientCredits { message: String },

    /// Too many requests (429). Retried automatically; surfaced with the
    /// server's `retry_after` once the budget is exhausted.
    #[error("rate limited (retry after {}s): {message}", .retry_after.as_secs())]
    RateLimit {
        retry_after: Duration,
        message: String,
    },

    /// The video has no captions available. An anticipated outcome, not a
    /// fault — callers typically fall back to ASR submission.
    #[error("no captions available: {message}")]
    NoCaptions { message: String },

    /// Any other 4xx/5xx the API returned, status code preserved.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body was not the JSON we expected.
    #[error("failed to parse response: {message}")]
    Parse { message: String },

    /// An ASR job reached the failed state. `reason` is the server-reported
    /// failure reason verbatim.
    #[error("job {job_id} failed: {reason}")]
    JobFailed { job_id: String, reason: String },

    /// The overall wait budget for a job expired. The job may still finish
    /// server-side; re-poll with `get_job` to find out.
    #[error("timed out waiting for job {job_id} after {}s", .waited.as_secs())]
    PollingTimeout { job_id: String, waited: Duration },

    /// Client-side contract violation, raised before any network call.
    #[error("invalid request: {message}")]
    Validation { message: String },
}

impl Error {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Error::Parse {
            message: message.into(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    /// Whether this failure class is eligible for automatic re-attempt
    /// under the backoff policy.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport { .. } | Error::Timeout | Error::RateLimit { .. } => true,
            Error::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// HTTP status code behind this error, when there is one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Authentication { .. } => Some(401),
            Error::InsufficientCredits { .. } => Some(402),
            Error::RateLimit { .. } => Some(429),
            Error::NoCaptions { .. } => Some(404),
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Translate a non-2xx status and its (already decoded) error body into the
/// matching [`Error`] variant. Pure lookup, no I/O.
///
/// `rate_limit_fallback` is used when a 429 body carries no `retry_after`.
pub(crate) fn map_status(status: u16, body: &Value, rate_limit_fallback: Duration) -> Error {
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| body.get("error").and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| format!("API error {status}"));
    let error_code = body.get("error_code").and_then(Value::as_str).unwrap_or("");

    match status {
        401 | 403 => Error::Authentication { message },
        402 => Error::InsufficientCredits { message },
        _ if error_code == "insufficient_credits" => Error::InsufficientCredits { message },
        429 => {
            let retry_after = body
                .get("retry_after")
                .and_then(Value::as_f64)
                .filter(|secs| *secs >= 0.0)
                .map(Duration::from_secs_f64)
                .unwrap_or(rate_limit_fallback);
            Error::RateLimit {
                retry_after,
                message,
            }
        }
        404 if error_code == "no_captions" => Error::NoCaptions { message },
        _ => Error::Api { status, message },
    }
}
