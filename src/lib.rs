//! Rust client for the [YouTubeTranscript.dev](https://youtubetranscript.dev) API.
//!
//! Extract video transcripts, run ASR transcription jobs, submit batches of
//! up to 100 videos, and export the results as plain text, SRT, or WebVTT.
//! Transient failures (network errors, timeouts, 5xx, rate limits) are
//! retried automatically with exponential backoff.
//!
//! # Quick start
//!
//! ```no_run
//! use youtubetranscript::Client;
//!
//! #[tokio::main]
//! async fn main() -> youtubetranscript::Result<()> {
//!     let yt = Client::new("your_api_key")?;
//!
//!     // Extract transcript from existing captions
//!     let transcript = yt.transcribe("dQw4w9WgXcQ", Default::default()).await?;
//!     println!("{}", transcript.to_plain_text());
//!
//!     // No captions? Fall back to ASR and poll to completion.
//!     let job = yt.transcribe_asr("dQw4w9WgXcQ", Default::default()).await?;
//!     let transcript = yt.wait_for_job(&job.job_id).await?;
//!     println!("{}", transcript.to_srt());
//!
//!     Ok(())
//! }
//! ```
//!
//! A blocking variant with the same operation set lives in [`blocking`].
//! Get your API key at <https://youtubetranscript.dev/dashboard>.

pub mod batch;
pub mod blocking;
pub mod client;
pub mod config;
pub mod error;
pub mod jobs;
pub mod models;
pub mod transport;

pub use client::{Client, ClientBuilder};
pub use config::{
    AsrOptions, CaptionSource, ClientConfig, FormatOptions, GetTranscriptOptions, ListOptions,
    RetryPolicy, TranscribeOptions,
};
pub use error::{Error, Result};
pub use models::{
    Batch, BatchItem, BatchOutcome, DeleteReceipt, ErrorInfo, Job, JobStatus, Segment, Stats,
    Transcript, TranscriptPage, TranscriptSummary,
};
