//! Data models for API responses.
//!
//! Everything here is an immutable value object: once a [`Transcript`] is
//! built from a response payload its segment sequence never changes, and the
//! export/search methods are deterministic pure functions of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// One timed span of transcript text.
///
/// `end` is always `>= start`; wire payloads that carry a `duration` instead
/// of an `end` are normalized at deserialization time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SegmentWire")]
pub struct Segment {
    pub text: String,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
}

/// Wire shape for a segment. The API sends either `end` or `duration`.
#[derive(Deserialize)]
struct SegmentWire {
    #[serde(default)]
    text: String,
    #[serde(default)]
    start: f64,
    #[serde(default)]
    end: f64,
    #[serde(default)]
    duration: f64,
}

impl From<SegmentWire> for Segment {
    fn from(wire: SegmentWire) -> Self {
        let end = if wire.end == 0.0 && wire.duration > 0.0 {
            wire.start + wire.duration
        } else {
            wire.end
        };
        Segment {
            text: wire.text,
            start: wire.start,
            end: end.max(wire.start),
        }
    }
}

impl Segment {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end: end.max(start),
        }
    }

    /// Length of the segment in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Start time as `MM:SS`. Minutes roll past 59 rather than into hours.
    pub fn start_mmss(&self) -> String {
        format_mmss(self.start)
    }

    /// Start time as `HH:MM:SS`.
    pub fn start_hms(&self) -> String {
        format_hms(self.start)
    }

    /// Number of whitespace-separated words in the segment text.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| Error::parse(format!("invalid segment: {e}")))
    }
}

/// A complete video transcript: ordered segments for one video/language
/// pair plus derived aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub video_id: String,
    /// ISO 639-1 style language code
    #[serde(default)]
    pub language: String,
    /// Chronologically ordered, non-overlapping segments
    #[serde(default)]
    pub segments: Vec<Segment>,
}

impl Transcript {
    /// Parse a transcript out of an API response.
    ///
    /// The API nests payloads inconsistently across endpoints
    /// (`data.transcript.segments`, `data.segments`, a bare segment list),
    /// so this walks the known shapes instead of deriving.
    pub fn from_response(data: &Value) -> Result<Self> {
        let inner = data.get("data").unwrap_or(data);
        let transcript_obj = inner.get("transcript").unwrap_or(inner);

        let mut raw_segments: Vec<Value> = match transcript_obj {
            Value::Object(map) => map
                .get("segments")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            Value::Array(items) => items.clone(),
            _ => Vec::new(),
        };
        if raw_segments.is_empty() {
            if let Some(items) = inner.get("segments").and_then(Value::as_array) {
                raw_segments = items.clone();
            }
        }

        let segments = raw_segments
            .iter()
            .map(Segment::from_value)
            .collect::<Result<Vec<_>>>()?;

        let field = |name: &str| {
            inner
                .get(name)
                .or_else(|| data.get(name))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        Ok(Transcript {
            video_id: field("video_id"),
            language: field("language"),
            segments,
        })
    }

    /// Total word count, recomputed as the sum of per-segment word counts.
    pub fn word_count(&self) -> usize {
        self.segments.iter().map(Segment::word_count).sum()
    }

    /// Total duration in seconds, taken from the last segment's end.
    /// Zero for an empty transcript.
    pub fn duration(&self) -> f64 {
        self.segments.last().map(|s| s.end).unwrap_or(0.0)
    }

    /// Export as plain text without timestamps, segments joined by a
    /// single space.
    pub fn to_plain_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Export as text with one `[MM:SS] <text>` line per segment.
    pub fn to_timestamped_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| format!("[{}] {}", s.start_mmss(), s.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Export as SRT subtitle format.
    ///
    /// Milliseconds are truncated, not rounded, so a cue end never drifts
    /// past the next cue's start.
    pub fn to_srt(&self) -> String {
        self.segments
            .iter()
            .enumerate()
            .map(|(i, s)| {
                format!(
                    "{}\n{} --> {}\n{}\n",
                    i + 1,
                    srt_timestamp(s.start),
                    srt_timestamp(s.end),
                    s.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Export as WebVTT subtitle format.
    pub fn to_vtt(&self) -> String {
        let mut lines = vec!["WEBVTT".to_string(), String::new()];
        for s in &self.segments {
            lines.push(format!(
                "{} --> {}\n{}\n",
                vtt_timestamp(s.start),
                vtt_timestamp(s.end),
                s.text
            ));
        }
        lines.join("\n")
    }

    /// Find segments whose text contains the query, case-insensitively.
    /// Returns the matching segments in transcript order; an empty query
    /// matches every segment.
    pub fn search(&self, query: &str) -> Vec<&Segment> {
        let needle = query.to_lowercase();
        self.segments
            .iter()
            .filter(|s| s.text.to_lowercase().contains(&needle))
            .collect()
    }
}

/// Status of an asynchronous ASR transcription job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Terminal states admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// A tracked asynchronous ASR transcription request.
///
/// Replaced wholesale with each status fetch, never partially patched.
/// `transcript` is present iff the job completed; `error` iff it failed.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub job_id: String,
    pub status: JobStatus,
    pub video_id: String,
    pub transcript: Option<Transcript>,
    pub error: Option<ErrorInfo>,
}

impl Job {
    pub fn from_response(data: &Value) -> Result<Self> {
        let status_str = data
            .get("status")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::parse("job response missing status"))?;
        let status: JobStatus = serde_json::from_value(Value::String(status_str.to_string()))
            .map_err(|_| Error::parse(format!("unknown job status: {status_str}")))?;

        let job_id = data
            .get("job_id")
            .or_else(|| data.get("request_id"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let video_id = data
            .get("video_id")
            .or_else(|| data.get("data").and_then(|d| d.get("video_id")))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let transcript = if status == JobStatus::Completed {
            Some(Transcript::from_response(data)?)
        } else {
            None
        };

        let error = if status == JobStatus::Failed {
            Some(
                data.get("error")
                    .map(|v| ErrorInfo::from_value(v, &video_id))
                    .unwrap_or_else(|| ErrorInfo {
                        video_id: video_id.clone(),
                        message: "unknown".to_string(),
                        error_code: None,
                    }),
            )
        } else {
            None
        };

        Ok(Job {
            job_id,
            status,
            video_id,
            transcript,
            error,
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Server-reported failure detail for one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    #[serde(default)]
    pub video_id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub error_code: Option<String>,
}

impl ErrorInfo {
    /// The API reports failures either as a bare string or as an object.
    fn from_value(value: &Value, fallback_video_id: &str) -> Self {
        match value {
            Value::String(s) => ErrorInfo {
                video_id: fallback_video_id.to_string(),
                message: s.clone(),
                error_code: None,
            },
            Value::Object(_) => {
                let mut info: ErrorInfo =
                    serde_json::from_value(value.clone()).unwrap_or_else(|_| ErrorInfo {
                        video_id: String::new(),
                        message: value.to_string(),
                        error_code: None,
                    });
                if info.message.is_empty() {
                    if let Some(msg) = value.get("error").and_then(Value::as_str) {
                        info.message = msg.to_string();
                    }
                }
                if info.video_id.is_empty() {
                    info.video_id = fallback_video_id.to_string();
                }
                info
            }
            _ => ErrorInfo {
                video_id: fallback_video_id.to_string(),
                message: "unknown".to_string(),
                error_code: None,
            },
        }
    }
}

/// Per-video outcome inside a [`Batch`].
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    Pending,
    Completed(Transcript),
    Failed(ErrorInfo),
}

impl BatchOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BatchOutcome::Pending)
    }
}

/// One entry of a batch, keyed by video id. Submission order is preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem {
    pub video_id: String,
    pub outcome: BatchOutcome,
}

/// A tracked group of up to 100 transcription requests submitted together.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub batch_id: String,
    pub items: Vec<BatchItem>,
}

impl Batch {
    /// Parse a batch out of an API response.
    ///
    /// `requested` fixes the item order (and marks ids the server has not
    /// mentioned yet as pending); pass the submitted id list on `submit`
    /// and an empty slice when fetching by id.
    pub(crate) fn from_response(data: &Value, requested: &[String]) -> Result<Self> {
        let inner = data.get("data").unwrap_or(data);
        let batch_id = inner
            .get("batch_id")
            .or_else(|| data.get("batch_id"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut outcomes: Vec<(String, BatchOutcome)> = Vec::new();
        if let Some(completed) = inner.get("completed").and_then(Value::as_array) {
            for item in completed {
                let transcript = Transcript::from_response(item)?;
                outcomes.push((
                    transcript.video_id.clone(),
                    BatchOutcome::Completed(transcript),
                ));
            }
        }
        if let Some(failed) = inner.get("failed").and_then(Value::as_array) {
            for item in failed {
                let info = ErrorInfo::from_value(item, "");
                outcomes.push((info.video_id.clone(), BatchOutcome::Failed(info)));
            }
        }
        if let Some(pending) = inner.get("pending").and_then(Value::as_array) {
            for id in pending.iter().filter_map(Value::as_str) {
                outcomes.push((id.to_string(), BatchOutcome::Pending));
            }
        }

        let mut items = Vec::with_capacity(requested.len().max(outcomes.len()));
        for id in requested {
            let outcome = match outcomes.iter().position(|(oid, _)| oid == id) {
                Some(pos) => outcomes.remove(pos).1,
                None => BatchOutcome::Pending,
            };
            items.push(BatchItem {
                video_id: id.clone(),
                outcome,
            });
        }
        for (video_id, outcome) in outcomes {
            items.push(BatchItem { video_id, outcome });
        }

        Ok(Batch { batch_id, items })
    }

    /// Transcripts of the items that completed, in submission order.
    pub fn completed(&self) -> Vec<&Transcript> {
        self.items
            .iter()
            .filter_map(|item| match &item.outcome {
                BatchOutcome::Completed(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    /// Failure details of the items that failed, in submission order.
    pub fn failed(&self) -> Vec<&ErrorInfo> {
        self.items
            .iter()
            .filter_map(|item| match &item.outcome {
                BatchOutcome::Failed(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    /// Video ids still awaiting a terminal outcome.
    pub fn pending(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter(|item| !item.outcome.is_terminal())
            .map(|item| item.video_id.as_str())
            .collect()
    }

    /// Outcome for one video id, if the batch knows it.
    pub fn outcome(&self, video_id: &str) -> Option<&BatchOutcome> {
        self.items
            .iter()
            .find(|item| item.video_id == video_id)
            .map(|item| &item.outcome)
    }

    /// A batch is terminal when every item is completed or failed.
    pub fn is_terminal(&self) -> bool {
        self.items.iter().all(|item| item.outcome.is_terminal())
    }
}

/// Account usage statistics. A read-only snapshot with no identity beyond
/// the fetch that produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    #[serde(default, alias = "credits_left")]
    pub credits_remaining: i64,
    #[serde(default)]
    pub credits_used: i64,
    #[serde(default)]
    pub transcripts_created: i64,
    #[serde(default)]
    pub plan: String,
}

impl Stats {
    pub(crate) fn from_response(data: &Value) -> Result<Self> {
        let inner = data.get("data").unwrap_or(data);
        serde_json::from_value(inner.clone())
            .map_err(|e| Error::parse(format!("invalid stats payload: {e}")))
    }
}

/// One row of the saved-transcript history listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSummary {
    #[serde(default)]
    pub video_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A page of saved transcripts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptPage {
    #[serde(default, alias = "items")]
    pub transcripts: Vec<TranscriptSummary>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total: u64,
}

fn default_page() -> u32 {
    1
}

impl TranscriptPage {
    pub(crate) fn from_response(data: &Value) -> Result<Self> {
        let inner = data.get("data").unwrap_or(data);
        if let Some(list) = inner.as_array() {
            let transcripts: Vec<TranscriptSummary> = list
                .iter()
                .map(|v| {
                    serde_json::from_value(v.clone())
                        .map_err(|e| Error::parse(format!("invalid transcript summary: {e}")))
                })
                .collect::<Result<_>>()?;
            let count = transcripts.len();
            return Ok(TranscriptPage {
                transcripts,
                page: 1,
                limit: count as u32,
                total: count as u64,
            });
        }
        serde_json::from_value(inner.clone())
            .map_err(|e| Error::parse(format!("invalid history payload: {e}")))
    }
}

/// Confirmation of a deletion request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteReceipt {
    #[serde(default, alias = "deleted_count")]
    pub deleted: u64,
}

impl DeleteReceipt {
    pub(crate) fn from_response(data: &Value) -> Result<Self> {
        let inner = data.get("data").unwrap_or(data);
        serde_json::from_value(inner.clone())
            .map_err(|e| Error::parse(format!("invalid delete receipt: {e}")))
    }
}

fn format_mmss(seconds: f64) -> String {
    let total = seconds as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

fn format_hms(seconds: f64) -> String {
    let total = seconds as u64;
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// `HH:MM:SS,mmm` with milliseconds truncated.
fn srt_timestamp(seconds: f64) -> String {
    let (h, m, s, ms) = split_timestamp(seconds);
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}

/// `HH:MM:SS.mmm` with milliseconds truncated.
fn vtt_timestamp(seconds: f64) -> String {
    let (h, m, s, ms) = split_timestamp(seconds);
    format!("{h:02}:{m:02}:{s:02}.{ms:03}")
}

fn split_timestamp(seconds: f64) -> (u64, u64, u64, u64) {
    let total_ms = (seconds.max(0.0) * 1000.0) as u64;
    let ms = total_ms % 1000;
    let total = total_ms / 1000;
    (total / 3600, (total % 3600) / 60, total % 60, ms)
}
