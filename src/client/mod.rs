//! Asynchronous client for the YouTubeTranscript.dev API.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::debug;

use crate::batch::BatchCoordinator;
use crate::config::{
    AsrOptions, ClientConfig, GetTranscriptOptions, ListOptions, RetryPolicy, TranscribeOptions,
};
use crate::error::{Error, Result};
use crate::jobs::{job_request, JobPoller};
use crate::models::{Batch, DeleteReceipt, Job, Stats, Transcript, TranscriptPage};
use crate::transport::{ApiRequest, HttpBackend, ReqwestBackend, Transport};

/// Environment variable read by [`Client::from_env`].
pub const API_KEY_ENV: &str = "YOUTUBETRANSCRIPT_API_KEY";

/// Asynchronous client for the YouTubeTranscript.dev API.
///
/// Cheap to clone; all methods take `&self`, so independent operations can
/// be awaited concurrently from the same instance. The client holds no
/// mutable state — configuration is frozen at construction.
///
/// ```no_run
/// use youtubetranscript::Client;
///
/// # async fn example() -> youtubetranscript::Result<()> {
/// let yt = Client::new("your_api_key")?;
/// let transcript = yt.transcribe("dQw4w9WgXcQ", Default::default()).await?;
/// println!("{}", transcript.to_plain_text());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    transport: Transport,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client with default configuration.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        ClientBuilder::new().api_key(api_key).build()
    }

    /// Create a client from the `YOUTUBETRANSCRIPT_API_KEY` environment
    /// variable.
    pub fn from_env() -> Result<Self> {
        let key = std::env::var(API_KEY_ENV)
            .map_err(|_| Error::validation(format!("{API_KEY_ENV} is not set")))?;
        Self::new(key)
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn with_transport(transport: Transport) -> Self {
        Self { transport }
    }

    /// Extract the transcript of a video from existing captions.
    ///
    /// Fails with [`Error::NoCaptions`] when the video has none — callers
    /// typically fall back to [`Client::transcribe_asr`].
    pub async fn transcribe(&self, video: &str, options: TranscribeOptions) -> Result<Transcript> {
        let mut body = json!({ "video": video });
        if let Some(language) = &options.language {
            body["language"] = json!(language);
        }
        if let Some(source) = options.source {
            body["source"] = json!(source.as_str());
        }
        if let Some(format) = options.format {
            body["format"] = json!(format);
        }

        debug!(video, "requesting transcript");
        let data = self
            .transport
            .execute(ApiRequest::post("/transcribe", body))
            .await?;
        Transcript::from_response(&data)
    }

    /// Submit an ASR transcription job (asynchronous server-side
    /// operation). Returns the queued [`Job`]; track it with
    /// [`Client::wait_for_job`] or [`Client::get_job`].
    pub async fn transcribe_asr(&self, video: &str, options: AsrOptions) -> Result<Job> {
        let mut body = json!({ "video": video });
        if let Some(language) = &options.language {
            body["language"] = json!(language);
        }
        if let Some(webhook_url) = &options.webhook_url {
            body["webhook_url"] = json!(webhook_url);
        }

        debug!(video, "submitting ASR job");
        let data = self
            .transport
            .execute(ApiRequest::post("/transcribe/asr", body))
            .await?;
        Job::from_response(&data)
    }

    /// Fetch the current status of an ASR job.
    pub async fn get_job(&self, job_id: &str) -> Result<Job> {
        let data = self.transport.execute(job_request(job_id)).await?;
        Job::from_response(&data)
    }

    /// Poll an ASR job to completion with the default poll interval and
    /// overall timeout.
    pub async fn wait_for_job(&self, job_id: &str) -> Result<Transcript> {
        JobPoller::new(self.transport.clone()).wait(job_id).await
    }

    /// Poll an ASR job to completion with explicit timing.
    pub async fn wait_for_job_with(
        &self,
        job_id: &str,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<Transcript> {
        JobPoller::with_timing(self.transport.clone(), poll_interval, timeout)
            .wait(job_id)
            .await
    }

    /// Submit a batch of 1–100 videos for extraction.
    pub async fn batch(&self, video_ids: &[String], language: Option<&str>) -> Result<Batch> {
        BatchCoordinator::new(self.transport.clone())
            .submit(video_ids, language)
            .await
    }

    /// Fetch the server's current view of a batch.
    pub async fn get_batch(&self, batch_id: &str) -> Result<Batch> {
        BatchCoordinator::new(self.transport.clone())
            .fetch(batch_id)
            .await
    }

    /// Re-fetch a batch and fold fresh outcomes into `batch`, keeping
    /// already-terminal items untouched.
    pub async fn refresh_batch(&self, batch: &mut Batch) -> Result<()> {
        BatchCoordinator::new(self.transport.clone())
            .refresh(batch)
            .await
    }

    /// List saved transcripts, newest first.
    pub async fn list_transcripts(&self, options: ListOptions) -> Result<TranscriptPage> {
        let mut request = ApiRequest::get("/transcripts")
            .query("limit", options.limit.to_string())
            .query("page", options.page.to_string());
        if let Some(search) = &options.search {
            request = request.query("search", search);
        }
        if let Some(language) = &options.language {
            request = request.query("language", language);
        }
        if let Some(status) = &options.status {
            request = request.query("status", status);
        }

        let data = self.transport.execute(request).await?;
        TranscriptPage::from_response(&data)
    }

    /// Fetch a previously extracted transcript by video id.
    pub async fn get_transcript(
        &self,
        video_id: &str,
        options: GetTranscriptOptions,
    ) -> Result<Transcript> {
        let mut request = ApiRequest::get(format!(
            "/transcripts/{}",
            urlencoding::encode(video_id)
        ));
        if let Some(language) = &options.language {
            request = request.query("language", language);
        }
        if let Some(source) = options.source {
            request = request.query("source", source.as_str());
        }

        let data = self.transport.execute(request).await?;
        Transcript::from_response(&data)
    }

    /// Account stats: credits remaining, plan, usage.
    pub async fn stats(&self) -> Result<Stats> {
        let data = self.transport.execute(ApiRequest::get("/stats")).await?;
        Stats::from_response(&data)
    }

    /// Delete all saved transcripts for one video.
    pub async fn delete_transcript(&self, video_id: &str) -> Result<DeleteReceipt> {
        self.delete(json!({ "video_id": video_id })).await
    }

    /// Delete saved transcripts by record ids.
    pub async fn delete_transcripts(&self, ids: &[String]) -> Result<DeleteReceipt> {
        if ids.is_empty() {
            return Err(Error::validation("no transcript ids to delete"));
        }
        self.delete(json!({ "ids": ids })).await
    }

    async fn delete(&self, body: Value) -> Result<DeleteReceipt> {
        let data = self
            .transport
            .execute(ApiRequest::delete("/transcripts", body))
            .await?;
        DeleteReceipt::from_response(&data)
    }
}

/// Builder for [`Client`].
///
/// ```no_run
/// use std::time::Duration;
/// use youtubetranscript::Client;
///
/// # fn example() -> youtubetranscript::Result<()> {
/// let yt = Client::builder()
///     .api_key("your_api_key")
///     .timeout(Duration::from_secs(60))
///     .max_retries(5)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ClientBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    timeout: Option<Duration>,
    retry: Option<RetryPolicy>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Per-request timeout (default 30s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Shorthand for adjusting only the retry count of the default policy.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        let mut retry = self.retry.take().unwrap_or_default();
        retry.max_retries = max_retries;
        self.retry = Some(retry);
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Validate the configuration and construct the client.
    pub fn build(self) -> Result<Client> {
        let api_key = self
            .api_key
            .ok_or_else(|| Error::validation("an API key is required"))?;

        let mut config = ClientConfig::new(api_key);
        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(retry) = self.retry {
            config.retry = retry;
        }
        let config = config.validate()?;

        let backend: Arc<dyn HttpBackend> = Arc::new(ReqwestBackend::new(&config)?);
        Ok(Client::with_transport(Transport::new(
            backend,
            config.retry.clone(),
        )))
    }
}
