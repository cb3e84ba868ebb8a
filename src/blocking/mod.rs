//! Blocking (sequential) client variant.
//!
//! One core, two schedulers: this module wraps the async [`crate::Client`]
//! in a private current-thread tokio runtime and blocks the calling thread
//! on each operation, so retry, backoff, and polling logic exist exactly
//! once. Polling sleeps block the calling thread for the poll interval.
//!
//! Do not use this client from inside an async runtime — entering a nested
//! runtime panics. Use [`crate::Client`] there instead.

use std::time::Duration;

use crate::config::{
    AsrOptions, GetTranscriptOptions, ListOptions, RetryPolicy, TranscribeOptions,
};
use crate::error::{Error, Result};
use crate::models::{Batch, DeleteReceipt, Job, Stats, Transcript, TranscriptPage};

/// Blocking client for the YouTubeTranscript.dev API.
///
/// ```no_run
/// # fn example() -> youtubetranscript::Result<()> {
/// let yt = youtubetranscript::blocking::Client::new("your_api_key")?;
/// let transcript = yt.transcribe("dQw4w9WgXcQ", Default::default())?;
/// println!("{}", transcript.to_srt());
/// # Ok(())
/// # }
/// ```
pub struct Client {
    inner: crate::Client,
    runtime: tokio::runtime::Runtime,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

impl Client {
    /// Create a blocking client with default configuration.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Builder::new().api_key(api_key).build()
    }

    /// Create a blocking client from the `YOUTUBETRANSCRIPT_API_KEY`
    /// environment variable.
    pub fn from_env() -> Result<Self> {
        let key = std::env::var(crate::client::API_KEY_ENV)
            .map_err(|_| Error::validation(format!("{} is not set", crate::client::API_KEY_ENV)))?;
        Self::new(key)
    }

    pub fn builder() -> Builder {
        Builder::new()
    }

    fn wrap(inner: crate::Client) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Transport {
                message: format!("failed to start runtime: {e}"),
            })?;
        Ok(Self { inner, runtime })
    }

    /// See [`crate::Client::transcribe`].
    pub fn transcribe(&self, video: &str, options: TranscribeOptions) -> Result<Transcript> {
        self.runtime.block_on(self.inner.transcribe(video, options))
    }

    /// See [`crate::Client::transcribe_asr`].
    pub fn transcribe_asr(&self, video: &str, options: AsrOptions) -> Result<Job> {
        self.runtime
            .block_on(self.inner.transcribe_asr(video, options))
    }

    /// See [`crate::Client::get_job`].
    pub fn get_job(&self, job_id: &str) -> Result<Job> {
        self.runtime.block_on(self.inner.get_job(job_id))
    }

    /// See [`crate::Client::wait_for_job`]. The calling thread sleeps
    /// between polls.
    pub fn wait_for_job(&self, job_id: &str) -> Result<Transcript> {
        self.runtime.block_on(self.inner.wait_for_job(job_id))
    }

    /// See [`crate::Client::wait_for_job_with`].
    pub fn wait_for_job_with(
        &self,
        job_id: &str,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<Transcript> {
        self.runtime
            .block_on(self.inner.wait_for_job_with(job_id, poll_interval, timeout))
    }

    /// See [`crate::Client::batch`].
    pub fn batch(&self, video_ids: &[String], language: Option<&str>) -> Result<Batch> {
        self.runtime.block_on(self.inner.batch(video_ids, language))
    }

    /// See [`crate::Client::get_batch`].
    pub fn get_batch(&self, batch_id: &str) -> Result<Batch> {
        self.runtime.block_on(self.inner.get_batch(batch_id))
    }

    /// See [`crate::Client::refresh_batch`].
    pub fn refresh_batch(&self, batch: &mut Batch) -> Result<()> {
        self.runtime.block_on(self.inner.refresh_batch(batch))
    }

    /// See [`crate::Client::list_transcripts`].
    pub fn list_transcripts(&self, options: ListOptions) -> Result<TranscriptPage> {
        self.runtime.block_on(self.inner.list_transcripts(options))
    }

    /// See [`crate::Client::get_transcript`].
    pub fn get_transcript(
        &self,
        video_id: &str,
        options: GetTranscriptOptions,
    ) -> Result<Transcript> {
        self.runtime
            .block_on(self.inner.get_transcript(video_id, options))
    }

    /// See [`crate::Client::stats`].
    pub fn stats(&self) -> Result<Stats> {
        self.runtime.block_on(self.inner.stats())
    }

    /// See [`crate::Client::delete_transcript`].
    pub fn delete_transcript(&self, video_id: &str) -> Result<DeleteReceipt> {
        self.runtime.block_on(self.inner.delete_transcript(video_id))
    }

    /// See [`crate::Client::delete_transcripts`].
    pub fn delete_transcripts(&self, ids: &[String]) -> Result<DeleteReceipt> {
        self.runtime.block_on(self.inner.delete_transcripts(ids))
    }
}

/// Builder for the blocking [`Client`]. Mirrors
/// [`crate::ClientBuilder`].
#[derive(Debug, Default)]
pub struct Builder {
    inner: crate::ClientBuilder,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.inner = self.inner.api_key(api_key);
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.inner = self.inner.base_url(base_url);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.inner = self.inner.timeout(timeout);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.inner = self.inner.max_retries(max_retries);
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.inner = self.inner.retry(retry);
        self
    }

    pub fn build(self) -> Result<Client> {
        Client::wrap(self.inner.build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_validates_like_the_async_client() {
        assert!(matches!(
            Builder::new().build().unwrap_err(),
            Error::Validation { .. }
        ));
        assert!(Client::new("short").is_err());
        assert!(Client::new("sk_live_12345678").is_ok());
    }
}
