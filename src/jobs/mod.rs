//! Polling of asynchronous ASR transcription jobs.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{Job, JobStatus, Transcript};
use crate::transport::{ApiRequest, Transport};

/// Default delay between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default overall wait budget (20 minutes).
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(1200);

pub(crate) fn job_request(job_id: &str) -> ApiRequest {
    ApiRequest::get(format!("/jobs/{}", urlencoding::encode(job_id)))
}

/// Drives a single job from submission to terminal state by repeated
/// status polling.
///
/// Transitions are taken solely from the server's reported status, never
/// inferred client-side. Transport-level failures inside a poll are retried
/// by the transport's own policy and do not reset the overall budget.
pub struct JobPoller {
    transport: Transport,
    poll_interval: Duration,
    timeout: Duration,
}

impl JobPoller {
    pub fn new(transport: Transport) -> Self {
        Self::with_timing(transport, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT)
    }

    pub fn with_timing(transport: Transport, poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            transport,
            poll_interval,
            timeout,
        }
    }

    /// Poll until the job reaches a terminal state.
    ///
    /// Returns the completed [`Transcript`], or [`Error::JobFailed`] with
    /// the server-reported reason. The overall budget is measured from the
    /// first call; exceeding it yields [`Error::PollingTimeout`] — the job
    /// may still complete server-side and can be re-polled with `get_job`.
    pub async fn wait(&self, job_id: &str) -> Result<Transcript> {
        let started = Instant::now();
        loop {
            let data = self.transport.execute(job_request(job_id)).await?;
            let job = Job::from_response(&data)?;
            debug!(job_id, status = ?job.status, "polled job");

            match job.status {
                JobStatus::Completed => {
                    return job.transcript.ok_or_else(|| {
                        Error::parse(format!("job {job_id} completed without a transcript"))
                    });
                }
                JobStatus::Failed => {
                    let reason = job
                        .error
                        .map(|e| e.message)
                        .unwrap_or_else(|| "unknown".to_string());
                    return Err(Error::JobFailed {
                        job_id: job_id.to_string(),
                        reason,
                    });
                }
                JobStatus::Queued | JobStatus::Processing => {
                    let elapsed = started.elapsed();
                    if elapsed >= self.timeout {
                        return Err(Error::PollingTimeout {
                            job_id: job_id.to_string(),
                            waited: elapsed,
                        });
                    }
                    // Never sleep past the deadline, so the timeout fires
                    // on schedule regardless of the poll interval.
                    let remaining = self.timeout - elapsed;
                    tokio::time::sleep(self.poll_interval.min(remaining)).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use crate::transport::{ApiResponse, MockHttpBackend};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn transport(
        responses: impl Fn(u32) -> &'static str + Send + Sync + 'static,
    ) -> (Transport, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let seen = calls.clone();
        let mut backend = MockHttpBackend::new();
        backend.expect_send().returning(move |_| {
            let body = responses(seen.fetch_add(1, Ordering::SeqCst));
            Ok(ApiResponse {
                status: 200,
                body: body.as_bytes().to_vec(),
            })
        });
        (
            Transport::new(Arc::new(backend), RetryPolicy::default()),
            calls,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn waits_through_progression_to_completion() {
        let (transport, calls) = transport(|n| match n {
            0 => r#"{"job_id":"j1","status":"queued"}"#,
            1 => r#"{"job_id":"j1","status":"processing"}"#,
            _ => {
                r#"{"job_id":"j1","status":"completed","data":{"video_id":"v1",
                    "transcript":{"segments":[{"text":"hi","start":0.0,"end":1.0}]}}}"#
            }
        });
        let poller =
            JobPoller::with_timing(transport, Duration::from_secs(5), Duration::from_secs(60));

        let transcript = poller.wait("j1").await.unwrap();
        assert_eq!(transcript.segments.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_job_surfaces_server_reason_verbatim() {
        let (transport, _) =
            transport(|_| r#"{"job_id":"j2","status":"failed","error":"audio track unreadable"}"#);
        let poller = JobPoller::new(transport);

        let err = poller.wait("j2").await.unwrap_err();
        match err {
            Error::JobFailed { job_id, reason } => {
                assert_eq!(job_id, "j2");
                assert_eq!(reason, "audio track unreadable");
            }
            other => panic!("expected JobFailed, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_on_schedule_regardless_of_poll_interval() {
        let (transport, _) = transport(|_| r#"{"job_id":"j3","status":"processing"}"#);
        // Poll interval far larger than the budget: the sleep must be
        // clamped so the timeout still fires at ~1s.
        let poller =
            JobPoller::with_timing(transport, Duration::from_secs(60), Duration::from_secs(1));

        let started = tokio::time::Instant::now();
        let err = poller.wait("j3").await.unwrap_err();
        assert!(matches!(err, Error::PollingTimeout { .. }));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(1));
        assert!(elapsed < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn completed_with_bare_payload_yields_empty_transcript() {
        let (transport, _) = transport(|_| r#"{"job_id":"j4","status":"completed"}"#);
        let poller = JobPoller::new(transport);

        let transcript = poller.wait("j4").await.unwrap();
        assert!(transcript.segments.is_empty());
    }
}
