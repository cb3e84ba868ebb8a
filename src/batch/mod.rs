//! Batch submission and per-video outcome tracking.

use serde_json::json;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::Batch;
use crate::transport::{ApiRequest, Transport};

/// Maximum number of videos per batch request.
pub const MAX_BATCH_SIZE: usize = 100;

pub(crate) fn batch_request(batch_id: &str) -> ApiRequest {
    ApiRequest::get(format!("/batch/{}", urlencoding::encode(batch_id)))
}

/// Submits multi-video batches and aggregates per-video outcomes.
pub struct BatchCoordinator {
    transport: Transport,
}

impl BatchCoordinator {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// Submit 1–100 video ids for extraction.
    ///
    /// The size bounds are enforced client-side before any network call.
    /// The returned [`Batch`] lists every requested id, with items the
    /// server has not resolved yet marked pending.
    pub async fn submit(&self, video_ids: &[String], language: Option<&str>) -> Result<Batch> {
        if video_ids.is_empty() {
            return Err(Error::validation("batch requires at least one video id"));
        }
        if video_ids.len() > MAX_BATCH_SIZE {
            return Err(Error::validation(format!(
                "maximum {MAX_BATCH_SIZE} videos per batch request"
            )));
        }

        let mut body = json!({ "video_ids": video_ids });
        if let Some(lang) = language {
            body["language"] = json!(lang);
        }

        debug!(count = video_ids.len(), "submitting batch");
        let data = self.transport.execute(ApiRequest::post("/batch", body)).await?;
        Batch::from_response(&data, video_ids)
    }

    /// Fetch the server's current view of a batch.
    pub async fn fetch(&self, batch_id: &str) -> Result<Batch> {
        let data = self.transport.execute(batch_request(batch_id)).await?;
        Batch::from_response(&data, &[])
    }

    /// Re-fetch batch state and fold it into `batch`.
    ///
    /// Terminal per-item outcomes are sticky: once an item is completed or
    /// failed it is never overwritten by a later refresh, even if the
    /// server's report regresses.
    pub async fn refresh(&self, batch: &mut Batch) -> Result<()> {
        let fresh = self.fetch(&batch.batch_id).await?;

        for item in &mut batch.items {
            if item.outcome.is_terminal() {
                continue;
            }
            if let Some(outcome) = fresh.outcome(&item.video_id) {
                item.outcome = outcome.clone();
            }
        }
        for fresh_item in fresh.items {
            if batch.outcome(&fresh_item.video_id).is_none() {
                batch.items.push(fresh_item);
            }
        }

        debug!(
            batch_id = %batch.batch_id,
            pending = batch.pending().len(),
            "refreshed batch"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use crate::models::BatchOutcome;
    use crate::transport::{ApiResponse, MockHttpBackend};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

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

    #[tokio::test]
    async fn rejects_size_violations_before_any_network_call() {
        let (transport, calls) = transport(|_| "{}");
        let coordinator = BatchCoordinator::new(transport);

        let err = coordinator.submit(&[], None).await.unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));

        let too_many: Vec<String> = (0..101).map(|i| format!("video{i}")).collect();
        let err = coordinator.submit(&too_many, None).await.unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));

        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let exactly_hundred: Vec<String> = (0..100).map(|i| format!("video{i}")).collect();
        assert!(coordinator.submit(&exactly_hundred, None).await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn submitted_batch_starts_all_pending() {
        let (transport, _) = transport(|_| r#"{"batch_id":"b1"}"#);
        let coordinator = BatchCoordinator::new(transport);

        let batch = coordinator.submit(&ids(&["a", "b"]), Some("en")).await.unwrap();
        assert_eq!(batch.batch_id, "b1");
        assert_eq!(batch.pending(), vec!["a", "b"]);
        assert!(!batch.is_terminal());
    }

    #[tokio::test]
    async fn outcomes_settle_and_stay_sticky_across_refreshes() {
        let (transport, _) = transport(|n| match n {
            // submit: both pending
            0 => r#"{"batch_id":"b2","pending":["a","b"]}"#,
            // first refresh: a completed, b still pending
            1 => {
                r#"{"batch_id":"b2",
                    "completed":[{"video_id":"a","segments":[{"text":"hi","start":0.0,"end":1.0}]}],
                    "pending":["b"]}"#
            }
            // second refresh: b failed, and the server regresses on a
            _ => {
                r#"{"batch_id":"b2",
                    "failed":[{"video_id":"b","message":"no captions","error_code":"no_captions"}],
                    "pending":["a"]}"#
            }
        });
        let coordinator = BatchCoordinator::new(transport);

        let mut batch = coordinator.submit(&ids(&["a", "b"]), None).await.unwrap();
        coordinator.refresh(&mut batch).await.unwrap();

        assert_eq!(batch.completed().len(), 1);
        assert_eq!(batch.completed()[0].video_id, "a");
        assert_eq!(batch.pending(), vec!["b"]);

        coordinator.refresh(&mut batch).await.unwrap();

        // a's completion survives the server regression; b's failure lands
        assert!(matches!(
            batch.outcome("a"),
            Some(BatchOutcome::Completed(_))
        ));
        assert_eq!(batch.failed().len(), 1);
        assert_eq!(batch.failed()[0].video_id, "b");
        assert!(batch.is_terminal());
    }

    #[tokio::test]
    async fn refresh_adopts_items_the_server_adds() {
        let (transport, _) = transport(|n| match n {
            0 => r#"{"batch_id":"b3","pending":["a"]}"#,
            _ => r#"{"batch_id":"b3","pending":["a","extra"]}"#,
        });
        let coordinator = BatchCoordinator::new(transport);

        let mut batch = coordinator.submit(&ids(&["a"]), None).await.unwrap();
        coordinator.refresh(&mut batch).await.unwrap();
        assert!(batch.outcome("extra").is_some());
    }
}
